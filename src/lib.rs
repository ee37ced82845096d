//! Growth animation core for the Symbios L-System ecosystem.
//!
//! This crate turns a plant grammar into a time-ordered sequence of
//! renderable geometry: the grammar is derived into a word, a turtle walks
//! the word to produce segments and polygons, and a growth scheduler decides
//! how much of each segment is visible (and how thick it is) at every frame.
//!
//! # Features
//!
//! - **Standard L-systems**: memoized derivation with a hard length ceiling via
//!   [`LSystem`], plus rule-text parsing with [`parse_rules`].
//! - **Parametric L-systems**: conditional, context-sensitive and stochastic
//!   productions with a closed expression language via [`ParametricLSystem`]
//!   and [`Production`].
//! - **Turtles**: 2D ([`Turtle2D`]) and 3D ([`Turtle3D`]) interpreters with
//!   branch stacks, polygons spanning branch boundaries and [`Tropism`].
//! - **Growth scheduling**: apical-dominance hierarchy reconstruction, easing
//!   curves and secondary thickening via [`GrowthScheduler`].
//! - **Frame batches**: order-preserving parallel frame materialization on a
//!   fixed-size worker pool via [`GrowthScheduler::frames`].
//! - **Timed growth**: continuous-time derivation with growth functions via
//!   [`TimedLSystem`].
//! - **Surfaces**: leaf, petal and disk patches placed on turtle frames via
//!   [`SurfaceLibrary`].
//! - **Presets**: classic grammars from *The Algorithmic Beauty of Plants* via
//!   [`presets`] and one-call helpers in [`pipeline`].
//!
//! # Feature Flags
//!
//! - `bevy`: Enables [`FrameMeshBuilder`] to turn a 3D frame into Bevy meshes.
//!
//! # Example
//!
//! ```no_run
//! use symbios_growth::{GrowthConfig, GrowthScheduler, LSystem, Turtle2D, TurtleConfig};
//!
//! # fn main() -> symbios_growth::Result<()> {
//! let mut system = LSystem::new("F", [('F', "F[+F]F[-F]F")]);
//! let word = system.generate(4)?;
//!
//! let geometry = Turtle2D::new(TurtleConfig::new().with_angle(25.7)).interpret(&word);
//! let scheduler = GrowthScheduler::new(geometry, GrowthConfig::new().with_frames(60, 8))?;
//!
//! for frame in scheduler.frames(0..60, 4)? {
//!     println!("frame {}: {} segments", frame.frame, frame.segments.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod easing;
pub mod error;
pub mod expr;
pub mod frames;
pub mod geometry;
pub mod growth;
pub mod lsystem;
pub mod parametric;
pub mod pipeline;
pub mod presets;
pub mod surfaces;
pub mod symbols;
pub mod timed;
pub mod tropism;
pub mod turtle;
pub mod turtle3d;

#[cfg(feature = "bevy")]
pub mod mesher;

pub use config::{GrowthConfig, GrowthMode};
pub use easing::Easing;
pub use error::{Error, Result};
pub use expr::{Expr, ExprError};
pub use frames::FrameGeometry;
pub use geometry::{
    BoundingBox, Interpretation, Interpretation2D, Interpretation3D, Point, Polygon, Polygon2D,
    Polygon3D, Segment, Segment2D, Segment3D,
};
pub use growth::{GrowthPreview, GrowthScheduler, SegmentGrowthInfo};
pub use lsystem::{LSystem, parse_rules};
pub use parametric::{Module, ParametricLSystem, Production, parse_modules};
pub use presets::{Preset, get_preset, list_presets};
pub use surfaces::{Surface, SurfaceLibrary};
pub use timed::{GrowthFunction, TimedLSystem, TimedModule, TimedProduction};
pub use tropism::{Organ, Tropism};
pub use turtle::{Turtle2D, TurtleConfig};
pub use turtle3d::{Frame, Turtle3D, Turtle3dConfig};

#[cfg(feature = "bevy")]
pub use mesher::FrameMeshBuilder;

/// Re-export of `glam` so callers use the same vector types.
pub use glam;
