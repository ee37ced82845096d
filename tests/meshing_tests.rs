#![cfg(feature = "bevy")]

use bevy::mesh::PrimitiveTopology;
use bevy::prelude::*;
use symbios_growth::glam::DVec3;
use symbios_growth::{BoundingBox, FrameGeometry, FrameMeshBuilder, Polygon, Segment};

fn segment(start: DVec3, end: DVec3, color_index: u32) -> Segment<DVec3> {
    Segment {
        start,
        end,
        depth: 0,
        width: 0.2,
        index: 0,
        color_index,
    }
}

fn frame(segments: Vec<Segment<DVec3>>, polygons: Vec<Polygon<DVec3>>) -> FrameGeometry<DVec3> {
    FrameGeometry {
        frame: 0,
        segments,
        polygons,
        terminals: Vec::new(),
        bounds: BoundingBox::from_points([DVec3::ZERO, DVec3::ONE]),
        max_depth: 0,
    }
}

#[test]
fn test_segment_becomes_tube() {
    let geometry = frame(vec![segment(DVec3::ZERO, DVec3::Y, 0)], Vec::new());
    let meshes = FrameMeshBuilder::default().build(&geometry);

    let mesh = meshes.get(&0).expect("Mesh for colour 0 not generated");
    assert_eq!(mesh.primitive_topology(), PrimitiveTopology::TriangleList);

    let positions = mesh
        .attribute(Mesh::ATTRIBUTE_POSITION)
        .expect("Mesh missing positions");
    let normals = mesh
        .attribute(Mesh::ATTRIBUTE_NORMAL)
        .expect("Mesh missing normals");
    let colors = mesh
        .attribute(Mesh::ATTRIBUTE_COLOR)
        .expect("Mesh missing colors");

    // 2 rings * (8 resolution + 1 duplicate for wrapping) = 18 verts
    assert_eq!(positions.len(), 18);
    assert_eq!(normals.len(), 18);
    assert_eq!(colors.len(), 18);

    // 8 quads * 6 indices = 48 indices
    let indices = mesh.indices().expect("Mesh missing indices");
    assert_eq!(indices.len(), 48);
}

#[test]
fn test_resolution_controls_ring_size() {
    let geometry = frame(vec![segment(DVec3::ZERO, DVec3::X, 0)], Vec::new());
    let meshes = FrameMeshBuilder::new().with_resolution(4).build(&geometry);
    let mesh = &meshes[&0];
    assert_eq!(mesh.attribute(Mesh::ATTRIBUTE_POSITION).unwrap().len(), 10);
    assert_eq!(mesh.indices().unwrap().len(), 24);
}

#[test]
fn test_colour_indices_get_separate_meshes() {
    let geometry = frame(
        vec![
            segment(DVec3::ZERO, DVec3::Y, 0),
            segment(DVec3::Y, DVec3::new(0.0, 2.0, 0.0), 3),
        ],
        Vec::new(),
    );
    let meshes = FrameMeshBuilder::default().build(&geometry);
    assert_eq!(meshes.len(), 2);
    assert!(meshes.contains_key(&0));
    assert!(meshes.contains_key(&3));
}

#[test]
fn test_polygon_becomes_double_sided_fan() {
    let leaf = Polygon {
        vertices: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
        depth: 0,
        color_index: 1,
        index: 0,
        anchor: None,
    };
    let meshes = FrameMeshBuilder::default().build(&frame(Vec::new(), vec![leaf]));
    let mesh = meshes.get(&1).expect("leaf mesh");
    assert_eq!(mesh.attribute(Mesh::ATTRIBUTE_POSITION).unwrap().len(), 3);
    assert_eq!(mesh.indices().unwrap().len(), 6);
}

#[test]
fn test_degenerate_input_is_skipped() {
    let collinear = Polygon {
        vertices: vec![DVec3::ZERO, DVec3::X, DVec3::X * 2.0],
        depth: 0,
        color_index: 0,
        index: 0,
        anchor: None,
    };
    let geometry = frame(vec![segment(DVec3::ONE, DVec3::ONE, 0)], vec![collinear]);
    assert!(FrameMeshBuilder::default().build(&geometry).is_empty());
}

#[test]
fn test_meshes_from_grown_frame() {
    let preset = symbios_growth::get_preset("coral_branch").unwrap();
    let scheduler = symbios_growth::pipeline::grow_3d(
        &preset,
        symbios_growth::GrowthConfig::new().with_frames(10, 2),
        None,
    )
    .unwrap();
    let meshes = FrameMeshBuilder::default().build(&scheduler.frame(9));
    assert!(!meshes.is_empty());
}
