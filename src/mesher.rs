use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::frames::FrameGeometry;
use crate::geometry::{Polygon3D, Segment3D};

// Helper struct to build a single mesh
#[derive(Default)]
struct MeshData {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    colors: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

impl MeshData {
    fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, self.colors.clone());
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }
}

/// Turns one materialized 3D frame into tube meshes (one per segment) and
/// triangle-fan meshes (one per polygon), bucketed by colour index.
pub struct FrameMeshBuilder {
    // Colour index -> Mesh Data
    buckets: HashMap<u32, MeshData>,
    resolution: u32,
    trunk_color: Vec4,
    tip_color: Vec4,
}

impl Default for FrameMeshBuilder {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            resolution: 8,
            trunk_color: Vec4::new(0.36, 0.25, 0.14, 1.0),
            tip_color: Vec4::new(0.30, 0.62, 0.22, 1.0),
        }
    }
}

impl FrameMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolution(mut self, res: u32) -> Self {
        self.resolution = res.max(3);
        self
    }

    /// Vertex colours are blended from `trunk` at depth 0 to `tip` at the
    /// deepest level of the plant.
    pub fn with_depth_gradient(mut self, trunk: Vec4, tip: Vec4) -> Self {
        self.trunk_color = trunk;
        self.tip_color = tip;
        self
    }

    /// Returns a map of colour index to Mesh
    pub fn build(mut self, frame: &FrameGeometry<glam::DVec3>) -> HashMap<u32, Mesh> {
        for segment in &frame.segments {
            self.add_segment(segment, frame.max_depth);
        }
        for polygon in &frame.polygons {
            self.add_polygon(polygon, frame.max_depth);
        }

        self.buckets
            .into_iter()
            .filter(|(_, v)| !v.indices.is_empty())
            .map(|(k, v)| (k, v.to_mesh()))
            .collect()
    }

    fn depth_color(&self, depth: usize, max_depth: usize) -> Vec4 {
        let t = if max_depth == 0 {
            0.0
        } else {
            depth as f32 / max_depth as f32
        };
        self.trunk_color.lerp(self.tip_color, t.clamp(0.0, 1.0))
    }

    fn add_segment(&mut self, segment: &Segment3D, max_depth: usize) {
        let start = segment.start.as_vec3();
        let end = segment.end.as_vec3();
        // Zero-length segments would produce NaN frames
        if start.distance_squared(end) <= 0.000001 {
            return;
        }

        let tangent = (end - start).normalize();
        let rotation = Self::robust_rotation_arc(Vec3::Y, tangent);
        let radius = (segment.width * 0.5) as f32;
        let color = self.depth_color(segment.depth, max_depth);
        let resolution = self.resolution;

        let bucket = self.buckets.entry(segment.color_index).or_default();
        let bottom_idx = Self::add_ring(bucket, start, rotation, radius, color, resolution);
        let top_idx = Self::add_ring(bucket, end, rotation, radius, color, resolution);
        Self::connect_rings(bucket, bottom_idx, top_idx, resolution);
    }

    fn add_polygon(&mut self, polygon: &Polygon3D, max_depth: usize) {
        let Some(normal) = polygon.normal() else {
            return;
        };
        let normal = normal.as_vec3();
        let color = self.depth_color(polygon.depth, max_depth).to_array();

        let bucket = self.buckets.entry(polygon.color_index).or_default();
        let start_index = bucket.positions.len() as u32;
        for vertex in &polygon.vertices {
            bucket.positions.push(vertex.as_vec3());
            bucket.normals.push(normal);
            bucket.colors.push(color);
        }
        // Fan around the first vertex, both windings so leaves render
        // from either side.
        for i in 1..polygon.vertices.len() as u32 - 1 {
            let (a, b, c) = (start_index, start_index + i, start_index + i + 1);
            bucket.indices.extend_from_slice(&[a, b, c, a, c, b]);
        }
    }

    fn robust_rotation_arc(from: Vec3, to: Vec3) -> Quat {
        const DOT_THRESHOLD: f32 = 0.9999;
        let dot = from.dot(to);
        if dot < -DOT_THRESHOLD {
            let axis = if from.x.abs() < 0.8 {
                Vec3::X.cross(from).normalize()
            } else {
                Vec3::Y.cross(from).normalize()
            };
            return Quat::from_axis_angle(axis, std::f32::consts::PI);
        } else if dot > DOT_THRESHOLD {
            return Quat::IDENTITY;
        }
        Quat::from_rotation_arc(from, to)
    }

    fn add_ring(
        data: &mut MeshData,
        center: Vec3,
        rotation: Quat,
        radius: f32,
        color: Vec4,
        res: u32,
    ) -> u32 {
        let start_index = data.positions.len() as u32;
        let color_array = color.to_array();

        for i in 0..=res {
            let theta = (i as f32 / res as f32) * std::f32::consts::TAU;
            let (sin, cos) = theta.sin_cos();

            let local_pos = Vec3::new(cos * radius, 0.0, sin * radius);
            let local_normal = Vec3::new(cos, 0.0, sin);

            data.positions.push(center + (rotation * local_pos));
            data.normals.push(rotation * local_normal);
            data.colors.push(color_array);
        }
        start_index
    }

    fn connect_rings(data: &mut MeshData, bottom_start: u32, top_start: u32, res: u32) {
        for i in 0..res {
            let bottom_curr = bottom_start + i;
            let bottom_next = bottom_start + i + 1;
            let top_curr = top_start + i;
            let top_next = top_start + i + 1;

            data.indices.push(bottom_curr);
            data.indices.push(top_curr);
            data.indices.push(bottom_next);

            data.indices.push(bottom_next);
            data.indices.push(top_curr);
            data.indices.push(top_next);
        }
    }
}
