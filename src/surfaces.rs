//! Predefined organ surfaces: disks, cones and bicubic Bézier leaves and
//! petals.
//!
//! A surface is a map from `(u, v) ∈ [0, 1]²` to a point in its local
//! frame, where the organ extends along +Y from the origin and bulges
//! toward +Z. [`Surface::to_polygons`] places a sampled surface on a turtle
//! frame so it can join the polygons of an interpretation.

use std::collections::BTreeMap;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::geometry::Polygon3D;
use crate::turtle3d::Frame;

/// Offset used for finite-difference normals.
const NORMAL_EPSILON: f64 = 1e-3;

/// Golden divergence angle in degrees.
pub const GOLDEN_ANGLE: f64 = 137.5;

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Sixteen control points, row `i` varying along `u`.
pub type ControlGrid = [[DVec3; 4]; 4];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// `u` is the radius fraction, `v` the angle fraction.
    Disk { radius: f64 },
    /// `u` runs from the base to the apex, `v` around the axis.
    Cone { base_radius: f64, height: f64 },
    Bezier { control_points: ControlGrid },
}

impl Shape {
    fn scaled(&self, scale: f64) -> Self {
        match self {
            Shape::Disk { radius } => Shape::Disk {
                radius: radius * scale,
            },
            Shape::Cone {
                base_radius,
                height,
            } => Shape::Cone {
                base_radius: base_radius * scale,
                height: height * scale,
            },
            Shape::Bezier { control_points } => Shape::Bezier {
                control_points: control_points.map(|row| row.map(|p| p * scale)),
            },
        }
    }
}

/// Cubic Bernstein basis `B_{i,3}(t)`.
fn bernstein3(i: usize, t: f64) -> f64 {
    let s = 1.0 - t;
    match i {
        0 => s * s * s,
        1 => 3.0 * t * s * s,
        2 => 3.0 * t * t * s,
        _ => t * t * t,
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// Indexed triangle mesh of a sampled surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<DVec3>,
    pub triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub name: String,
    pub color_index: u32,
    pub shape: Shape,
}

impl Surface {
    pub fn new(name: impl Into<String>, shape: Shape, color_index: u32) -> Self {
        Self {
            name: name.into(),
            color_index,
            shape,
        }
    }

    pub fn disk(name: impl Into<String>, radius: f64, color_index: u32) -> Self {
        Self::new(name, Shape::Disk { radius }, color_index)
    }

    pub fn cone(name: impl Into<String>, base_radius: f64, height: f64, color_index: u32) -> Self {
        Self::new(
            name,
            Shape::Cone {
                base_radius,
                height,
            },
            color_index,
        )
    }

    pub fn bezier(name: impl Into<String>, control_points: ControlGrid, color_index: u32) -> Self {
        Self::new(name, Shape::Bezier { control_points }, color_index)
    }

    /// Point at `(u, v)`.
    pub fn sample(&self, u: f64, v: f64) -> DVec3 {
        match &self.shape {
            Shape::Disk { radius } => {
                let r = u * radius;
                let theta = v * std::f64::consts::TAU;
                DVec3::new(r * theta.cos(), r * theta.sin(), 0.0)
            }
            Shape::Cone {
                base_radius,
                height,
            } => {
                let r = base_radius * (1.0 - u);
                let theta = v * std::f64::consts::TAU;
                DVec3::new(r * theta.cos(), r * theta.sin(), u * height)
            }
            Shape::Bezier { control_points } => {
                let mut point = DVec3::ZERO;
                for (i, row) in control_points.iter().enumerate() {
                    let bu = bernstein3(i, u);
                    for (j, p) in row.iter().enumerate() {
                        point += *p * (bu * bernstein3(j, v));
                    }
                }
                point
            }
        }
    }

    /// Unit normal from forward differences. Degenerate spots (a disk
    /// centre, a cone apex) report +Z.
    pub fn sample_normal(&self, u: f64, v: f64) -> DVec3 {
        let p = self.sample(u, v);
        let du = self.sample((u + NORMAL_EPSILON).min(1.0), v) - p;
        let dv = self.sample(u, (v + NORMAL_EPSILON).min(1.0)) - p;
        du.cross(dv).try_normalize().unwrap_or(DVec3::Z)
    }

    /// `(resolution + 1)²` samples joined into two triangles per grid cell.
    pub fn to_mesh(&self, resolution: u32) -> SurfaceMesh {
        let res = resolution.max(1);
        let step = 1.0 / f64::from(res);
        let mut mesh = SurfaceMesh::default();

        for i in 0..=res {
            for j in 0..=res {
                mesh.vertices
                    .push(self.sample(f64::from(i) * step, f64::from(j) * step));
            }
        }

        let row = res + 1;
        for i in 0..res {
            for j in 0..res {
                let idx = i * row + j;
                mesh.triangles.push([idx, idx + 1, idx + row + 1]);
                mesh.triangles.push([idx, idx + row + 1, idx + row]);
            }
        }
        mesh
    }

    /// Mesh triangles placed on a turtle frame: local X follows Left, Y
    /// follows Heading and Z follows Up. Triangles that collapse to a point
    /// or a line are dropped.
    pub fn to_polygons(
        &self,
        resolution: u32,
        origin: DVec3,
        frame: Frame,
        scale: f64,
    ) -> Vec<Polygon3D> {
        let mesh = self.to_mesh(resolution);
        let place = |p: DVec3| {
            origin + (frame.left * p.x + frame.heading * p.y + frame.up * p.z) * scale
        };

        mesh.triangles
            .iter()
            .map(|&tri| tri.map(|i| place(mesh.vertices[i as usize])))
            .filter(|[a, b, c]| (*b - *a).cross(*c - *a).length_squared() > f64::EPSILON)
            .enumerate()
            .map(|(index, vertices)| Polygon3D {
                vertices: vertices.to_vec(),
                depth: 0,
                color_index: self.color_index,
                index,
                anchor: None,
            })
            .collect()
    }

    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            name: format!("{}_scaled", self.name),
            color_index: self.color_index,
            shape: self.shape.scaled(scale),
        }
    }
}

// ---------------------------------------------------------------------------
// Leaf and petal patches
// ---------------------------------------------------------------------------

fn grid(rows: [[[f64; 3]; 4]; 4], scale: f64) -> ControlGrid {
    rows.map(|row| row.map(|p| DVec3::from_array(p) * scale))
}

/// Heart-shaped leaf, indented at the base.
pub fn cordate_leaf(scale: f64, color_index: u32) -> Surface {
    let control_points = grid(
        [
            [[0.0, 0.0, 0.0], [0.2, 0.1, 0.05], [0.4, 0.1, 0.05], [0.5, 0.0, 0.0]],
            [[0.0, 0.3, 0.0], [0.3, 0.35, 0.1], [0.45, 0.3, 0.08], [0.5, 0.25, 0.0]],
            [[0.0, 0.6, 0.0], [0.25, 0.65, 0.08], [0.4, 0.6, 0.05], [0.5, 0.5, 0.0]],
            [[0.0, 0.8, 0.0], [0.1, 0.85, 0.02], [0.2, 0.9, 0.01], [0.3, 1.0, 0.0]],
        ],
        scale,
    );
    Surface::bezier("leaf_cordate", control_points, color_index)
}

/// Narrow leaf tapering at both ends.
pub fn lanceolate_leaf(scale: f64, color_index: u32) -> Surface {
    let control_points = grid(
        [
            [[0.0, 0.0, 0.0], [0.1, 0.05, 0.02], [0.15, 0.05, 0.02], [0.2, 0.0, 0.0]],
            [[0.0, 0.3, 0.0], [0.15, 0.35, 0.05], [0.2, 0.32, 0.04], [0.25, 0.3, 0.0]],
            [[0.0, 0.6, 0.0], [0.12, 0.65, 0.04], [0.18, 0.62, 0.03], [0.22, 0.6, 0.0]],
            [[0.0, 1.0, 0.0], [0.02, 1.0, 0.01], [0.03, 1.0, 0.01], [0.05, 1.0, 0.0]],
        ],
        scale,
    );
    Surface::bezier("leaf_lanceolate", control_points, color_index)
}

/// Egg-shaped leaf, broadest below the middle.
pub fn ovate_leaf(scale: f64, color_index: u32) -> Surface {
    let control_points = grid(
        [
            [[0.0, 0.0, 0.0], [0.15, 0.05, 0.03], [0.25, 0.05, 0.03], [0.35, 0.0, 0.0]],
            [[0.0, 0.25, 0.0], [0.25, 0.3, 0.08], [0.35, 0.28, 0.06], [0.4, 0.25, 0.0]],
            [[0.0, 0.55, 0.0], [0.2, 0.6, 0.06], [0.3, 0.58, 0.04], [0.35, 0.55, 0.0]],
            [[0.0, 0.9, 0.0], [0.08, 0.95, 0.02], [0.12, 0.98, 0.01], [0.15, 1.0, 0.0]],
        ],
        scale,
    );
    Surface::bezier("leaf_ovate", control_points, color_index)
}

/// One lobe of a palmate leaf.
pub fn palmate_leaf(scale: f64, color_index: u32) -> Surface {
    let control_points = grid(
        [
            [[0.0, 0.0, 0.0], [0.1, 0.1, 0.02], [0.2, 0.1, 0.02], [0.3, 0.0, 0.0]],
            [[0.05, 0.3, 0.01], [0.15, 0.35, 0.05], [0.25, 0.32, 0.04], [0.35, 0.3, 0.01]],
            [[0.1, 0.6, 0.02], [0.18, 0.65, 0.04], [0.28, 0.62, 0.03], [0.4, 0.6, 0.02]],
            [[0.15, 1.0, 0.0], [0.2, 1.0, 0.01], [0.25, 1.0, 0.01], [0.3, 1.0, 0.0]],
        ],
        scale,
    );
    Surface::bezier("leaf_palmate", control_points, color_index)
}

/// Cupped rose petal.
pub fn rose_petal(scale: f64, color_index: u32) -> Surface {
    let control_points = grid(
        [
            [[0.0, 0.0, 0.0], [0.15, 0.05, 0.1], [0.3, 0.05, 0.1], [0.5, 0.0, 0.0]],
            [[0.0, 0.2, 0.1], [0.2, 0.25, 0.15], [0.35, 0.22, 0.12], [0.5, 0.2, 0.05]],
            [[0.0, 0.5, 0.15], [0.18, 0.55, 0.12], [0.32, 0.52, 0.08], [0.5, 0.5, 0.02]],
            [[0.0, 0.8, 0.05], [0.1, 0.85, 0.03], [0.25, 0.9, 0.01], [0.4, 1.0, 0.0]],
        ],
        scale,
    );
    Surface::bezier("petal_rose", control_points, color_index)
}

pub fn tulip_petal(scale: f64, color_index: u32) -> Surface {
    let control_points = grid(
        [
            [[0.0, 0.0, 0.0], [0.1, 0.05, 0.15], [0.2, 0.05, 0.15], [0.3, 0.0, 0.0]],
            [[0.0, 0.3, 0.2], [0.12, 0.35, 0.25], [0.22, 0.32, 0.22], [0.3, 0.3, 0.15]],
            [[0.0, 0.6, 0.15], [0.1, 0.65, 0.18], [0.2, 0.62, 0.15], [0.3, 0.6, 0.08]],
            [[0.0, 1.0, 0.0], [0.05, 1.0, 0.02], [0.15, 1.0, 0.01], [0.2, 1.0, 0.0]],
        ],
        scale,
    );
    Surface::bezier("petal_tulip", control_points, color_index)
}

/// Flat ray floret.
pub fn daisy_petal(scale: f64, color_index: u32) -> Surface {
    let control_points = grid(
        [
            [[0.0, 0.0, 0.0], [0.05, 0.02, 0.01], [0.1, 0.02, 0.01], [0.15, 0.0, 0.0]],
            [[0.0, 0.35, 0.0], [0.06, 0.38, 0.02], [0.12, 0.36, 0.02], [0.15, 0.35, 0.0]],
            [[0.0, 0.7, 0.0], [0.05, 0.72, 0.01], [0.1, 0.71, 0.01], [0.15, 0.7, 0.0]],
            [[0.02, 1.0, 0.0], [0.05, 1.0, 0.0], [0.1, 1.0, 0.0], [0.13, 1.0, 0.0]],
        ],
        scale,
    );
    Surface::bezier("petal_daisy", control_points, color_index)
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// Named surfaces, listed in name order.
///
/// | name | surface |
/// |---|---|
/// | `D` | disk |
/// | `K` | flower centre |
/// | `L`, `Ll`, `Lo`, `Lp` | cordate, lanceolate, ovate, palmate leaf |
/// | `P`, `Pt`, `Pd` | rose, tulip, daisy petal |
/// | `C` | thorn cone |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLibrary {
    surfaces: BTreeMap<String, Surface>,
}

impl Default for SurfaceLibrary {
    fn default() -> Self {
        let mut library = Self::empty();
        library.register("D", Surface::disk("disk", 0.5, 1));
        library.register("K", Surface::disk("flower_center", 0.3, 5));
        library.register("L", cordate_leaf(1.0, 2));
        library.register("Ll", lanceolate_leaf(1.0, 2));
        library.register("Lo", ovate_leaf(1.0, 2));
        library.register("Lp", palmate_leaf(1.0, 2));
        library.register("P", rose_petal(1.0, 3));
        library.register("Pt", tulip_petal(1.0, 3));
        library.register("Pd", daisy_petal(1.0, 4));
        library.register("C", Surface::cone("thorn", 0.2, 0.8, 1));
        library
    }
}

impl SurfaceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            surfaces: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Surface> {
        self.surfaces.get(name)
    }

    /// Adds or replaces a surface.
    pub fn register(&mut self, name: impl Into<String>, surface: Surface) {
        self.surfaces.insert(name.into(), surface);
    }

    pub fn names(&self) -> Vec<&str> {
        self.surfaces.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn scaled(&self, name: &str, scale: f64) -> Option<Surface> {
        self.get(name).map(|s| s.scaled(scale))
    }
}

// ---------------------------------------------------------------------------
// Developmental leaf
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LeafElement {
    Segment { length: f64 },
    Apex { length: f64 },
    BranchStart { angle: f64 },
    BranchEnd,
}

/// Leaf that develops from the tip: every unit of age adds a pair of side
/// lobes below the growing apex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentalLeaf {
    pub branch_angle: f64,
    pub length_scale: f64,
}

impl Default for DevelopmentalLeaf {
    fn default() -> Self {
        Self {
            branch_angle: 45.0,
            length_scale: 1.0,
        }
    }
}

impl DevelopmentalLeaf {
    /// Recursion stops below this depth regardless of age.
    pub const MAX_DEPTH: usize = 10;

    pub fn new(branch_angle: f64, length_scale: f64) -> Self {
        Self {
            branch_angle,
            length_scale,
        }
    }

    pub fn elements_at(&self, age: f64) -> Vec<LeafElement> {
        if age <= 0.0 {
            return vec![LeafElement::Apex { length: 0.0 }];
        }
        let mut elements = Vec::new();
        self.grow(age, 0, &mut elements);
        elements
    }

    fn grow(&self, age: f64, depth: usize, out: &mut Vec<LeafElement>) {
        if age <= 0.0 || depth > Self::MAX_DEPTH {
            out.push(LeafElement::Apex {
                length: 0.01 * self.length_scale,
            });
            return;
        }

        out.push(LeafElement::Segment {
            length: age.min(1.0) * self.length_scale,
        });
        if age > 1.0 {
            for angle in [self.branch_angle, -self.branch_angle] {
                out.push(LeafElement::BranchStart { angle });
                self.grow(age - 1.0, depth + 1, out);
                out.push(LeafElement::BranchEnd);
            }
            self.grow(age - 1.0, depth, out);
        }
    }

    /// Turtle word for the leaf at `age`: `F` per segment, `.` per apex,
    /// `[+`/`[-` and `]` around side lobes.
    pub fn word_at(&self, age: f64) -> String {
        let mut word = String::new();
        for element in self.elements_at(age) {
            match element {
                LeafElement::Segment { .. } => word.push('F'),
                LeafElement::Apex { .. } => word.push('.'),
                LeafElement::BranchStart { angle } if angle > 0.0 => word.push_str("[+"),
                LeafElement::BranchStart { .. } => word.push_str("[-"),
                LeafElement::BranchEnd => word.push(']'),
            }
        }
        word
    }
}

// ---------------------------------------------------------------------------
// Arrangements
// ---------------------------------------------------------------------------

/// Vogel's model: element `i` sits at angle `i · divergence` and radius
/// `c · √(i + 1)`.
pub fn phyllotaxis_positions(count: usize, divergence: f64, c: f64) -> Vec<DVec2> {
    (0..count)
        .map(|i| {
            let angle = (i as f64 * divergence).to_radians();
            let r = c * ((i + 1) as f64).sqrt();
            DVec2::new(r * angle.cos(), r * angle.sin())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetalKind {
    Rose,
    Tulip,
    Daisy,
}

/// A surface placed at `angle` degrees around the flower axis, `distance`
/// from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowerPart {
    pub angle: f64,
    pub distance: f64,
    pub surface: Surface,
}

/// A centre disk followed by `petals` evenly spaced petals just outside it.
pub fn flower_head(
    petals: usize,
    kind: PetalKind,
    center_radius: f64,
    petal_scale: f64,
) -> Vec<FlowerPart> {
    let petal = match kind {
        PetalKind::Rose => rose_petal(petal_scale, 3),
        PetalKind::Tulip => tulip_petal(petal_scale, 3),
        PetalKind::Daisy => daisy_petal(petal_scale, 4),
    };
    let step = if petals == 0 { 0.0 } else { 360.0 / petals as f64 };

    std::iter::once(FlowerPart {
        angle: 0.0,
        distance: 0.0,
        surface: Surface::disk("center", center_radius, 5),
    })
    .chain((0..petals).map(|i| FlowerPart {
        angle: i as f64 * step,
        distance: center_radius * 1.2,
        surface: petal.clone(),
    }))
    .collect()
}
