//! 3D turtle interpreter.
//!
//! Orientation is an orthonormal Heading/Left/Up frame, starting with the
//! heading along +Y and up along +Z. The symbol set and the stack
//! discipline match the 2D turtle, plus pitch (`&`, `^`), roll (`\`, `/`)
//! and roll-to-horizontal (`$`).

use glam::{DQuat, DVec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::{Interpretation3D, Polygon, Segment};
use crate::parametric::Module;
use crate::symbols::{Command, Instruction, module_instructions, skip_branch, word_instructions};
use crate::tropism::Tropism;

/// Below this length `H × world-up` is too short to define a horizontal
/// left vector.
const HORIZONTAL_EPSILON: f64 = 1e-6;

/// Floor for a step after length variance is applied.
pub const MIN_JITTERED_STEP: f64 = 0.1;

// ---------------------------------------------------------------------------
// Orientation frame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub heading: DVec3,
    pub left: DVec3,
    pub up: DVec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            heading: DVec3::Y,
            left: DVec3::NEG_X,
            up: DVec3::Z,
        }
    }
}

impl Frame {
    pub fn rotated(self, rotation: DQuat) -> Self {
        Self {
            heading: rotation * self.heading,
            left: rotation * self.left,
            up: rotation * self.up,
        }
    }

    /// Turn about Up.
    pub fn yaw(self, degrees: f64) -> Self {
        self.rotated(DQuat::from_axis_angle(self.up, degrees.to_radians()))
            .orthonormalized()
    }

    /// Rotate about Left.
    pub fn pitch(self, degrees: f64) -> Self {
        self.rotated(DQuat::from_axis_angle(self.left, degrees.to_radians()))
            .orthonormalized()
    }

    /// Rotate about Heading.
    pub fn roll(self, degrees: f64) -> Self {
        self.rotated(DQuat::from_axis_angle(self.heading, degrees.to_radians()))
            .orthonormalized()
    }

    /// Rolls so that Left is horizontal. A vertical heading leaves the
    /// frame unchanged.
    pub fn roll_to_horizontal(self) -> Self {
        let horizontal = self.heading.cross(DVec3::Y);
        if horizontal.length() <= HORIZONTAL_EPSILON {
            return self;
        }
        let left = horizontal.normalize();
        Self {
            heading: self.heading,
            left,
            up: self.heading.cross(left),
        }
    }

    /// Gram-Schmidt on H then L; U is rebuilt as `H × L`.
    pub fn orthonormalized(self) -> Self {
        let heading = self.heading.try_normalize().unwrap_or(self.heading);
        let left = (self.left - heading * heading.dot(self.left))
            .try_normalize()
            .unwrap_or(self.left);
        Self {
            heading,
            left,
            up: heading.cross(left),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Turtle3dConfig {
    /// Turn angle (`+`, `-`) in degrees.
    pub angle: f64,
    /// Pitch angle (`&`, `^`) in degrees.
    pub pitch_angle: f64,
    /// Roll angle (`\`, `/`) in degrees.
    pub roll_angle: f64,
    pub step: f64,
    pub start: DVec3,
    pub initial_width: f64,
    pub width_decay: f64,
    pub length_decay: f64,
    pub width_decrement: f64,
    pub tropism: Option<Tropism>,
    /// Relative jitter on every rotation (0.1 is ±10% of the angle).
    pub angle_variance: f64,
    /// Relative jitter on every step. Jittered steps never drop below
    /// `MIN_JITTERED_STEP`.
    pub length_variance: f64,
    /// Seed for the variance jitter; `None` draws a fresh one per call.
    pub seed: Option<u64>,
}

impl Default for Turtle3dConfig {
    fn default() -> Self {
        Self {
            angle: 25.0,
            pitch_angle: 25.0,
            roll_angle: 25.0,
            step: 10.0,
            start: DVec3::ZERO,
            initial_width: 1.0,
            width_decay: 0.7,
            length_decay: 0.9,
            width_decrement: 0.9,
            tropism: None,
            angle_variance: 0.0,
            length_variance: 0.0,
            seed: None,
        }
    }
}

impl Turtle3dConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the turn, pitch and roll angles together.
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self.pitch_angle = angle;
        self.roll_angle = angle;
        self
    }

    pub fn with_pitch_angle(mut self, angle: f64) -> Self {
        self.pitch_angle = angle;
        self
    }

    pub fn with_roll_angle(mut self, angle: f64) -> Self {
        self.roll_angle = angle;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_start(mut self, start: DVec3) -> Self {
        self.start = start;
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.initial_width = width;
        self
    }

    pub fn with_decay(mut self, width_decay: f64, length_decay: f64) -> Self {
        self.width_decay = width_decay;
        self.length_decay = length_decay;
        self
    }

    pub fn with_width_decrement(mut self, factor: f64) -> Self {
        self.width_decrement = factor;
        self
    }

    pub fn with_tropism(mut self, tropism: Tropism) -> Self {
        self.tropism = Some(tropism);
        self
    }

    pub fn with_variance(mut self, angle_variance: f64, length_variance: f64) -> Self {
        self.angle_variance = angle_variance.abs();
        self.length_variance = length_variance.abs();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TurtleState {
    position: DVec3,
    frame: Frame,
    depth: usize,
    width: f64,
    step: f64,
    color_index: u32,
    polygon: Option<Vec<DVec3>>,
}

impl TurtleState {
    fn advance(&mut self, distance: f64) -> DVec3 {
        self.position += self.frame.heading * distance;
        self.position
    }

    fn record_vertex(&mut self) {
        if let Some(vertices) = &mut self.polygon {
            vertices.push(self.position);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Turtle3D {
    config: Turtle3dConfig,
}

impl Turtle3D {
    pub fn new(config: Turtle3dConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Turtle3dConfig {
        &self.config
    }

    pub fn interpret(&self, word: &str) -> Interpretation3D {
        self.run(word_instructions(word))
    }

    pub fn interpret_modules(&self, modules: &[Module]) -> Interpretation3D {
        self.run(module_instructions(modules))
    }

    fn run(&self, mut instructions: impl Iterator<Item = Instruction>) -> Interpretation3D {
        let config = &self.config;
        let mut jitter = Jitter::new(config);

        let mut out = Interpretation3D::default();
        let mut stack: Vec<TurtleState> = Vec::new();
        let mut state = TurtleState {
            position: config.start,
            frame: Frame::default(),
            depth: 0,
            width: config.initial_width,
            step: config.step,
            color_index: 0,
            polygon: None,
        };

        while let Some((symbol, param)) = instructions.next() {
            let Some(command) = Command::from_symbol(symbol) else {
                continue;
            };
            match command {
                Command::Draw => {
                    let start = state.position;
                    let end = state.advance(jitter.step(param.unwrap_or(state.step)));
                    out.segments.push(Segment {
                        start,
                        end,
                        depth: state.depth,
                        width: state.width,
                        index: out.segments.len(),
                        color_index: state.color_index,
                    });
                    if let Some(tropism) = &config.tropism {
                        state.frame = tropism.apply(state.frame).orthonormalized();
                    }
                }
                Command::Move => {
                    state.advance(jitter.step(param.unwrap_or(state.step)));
                    state.record_vertex();
                }
                Command::TurnLeft => {
                    state.frame = state.frame.yaw(jitter.angle(param.unwrap_or(config.angle)))
                }
                Command::TurnRight => {
                    state.frame = state.frame.yaw(-jitter.angle(param.unwrap_or(config.angle)))
                }
                Command::TurnAround => state.frame = state.frame.yaw(180.0),
                Command::PitchDown => {
                    state.frame = state
                        .frame
                        .pitch(-jitter.angle(param.unwrap_or(config.pitch_angle)))
                }
                Command::PitchUp => {
                    state.frame = state
                        .frame
                        .pitch(jitter.angle(param.unwrap_or(config.pitch_angle)))
                }
                Command::RollLeft => {
                    state.frame = state
                        .frame
                        .roll(-jitter.angle(param.unwrap_or(config.roll_angle)))
                }
                Command::RollRight => {
                    state.frame = state
                        .frame
                        .roll(jitter.angle(param.unwrap_or(config.roll_angle)))
                }
                Command::RollToHorizontal => state.frame = state.frame.roll_to_horizontal(),
                Command::Push => {
                    stack.push(state.clone());
                    state.depth += 1;
                    state.width *= config.width_decay;
                    state.step *= config.length_decay;
                }
                Command::Pop => pop_state(&mut state, &mut stack),
                Command::Width => match param {
                    Some(width) => state.width = width,
                    None => state.width *= config.width_decrement,
                },
                Command::Color => match param {
                    Some(color) => state.color_index = color.max(0.0).round() as u32,
                    None => state.color_index += 1,
                },
                Command::PolygonOpen => state.polygon = Some(vec![state.position]),
                Command::PolygonClose => {
                    if let Some(vertices) = state.polygon.take() {
                        if vertices.len() >= 3 {
                            out.polygons.push(Polygon {
                                vertices,
                                depth: state.depth,
                                color_index: state.color_index,
                                index: out.polygons.len(),
                                anchor: out.segments.len().checked_sub(1),
                            });
                        }
                    }
                }
                Command::Vertex => state.record_vertex(),
                Command::Cut => {
                    if skip_branch(&mut instructions) {
                        pop_state(&mut state, &mut stack);
                    }
                }
            }
        }

        debug!(
            segments = out.segments.len(),
            polygons = out.polygons.len(),
            "3D interpretation finished"
        );
        out
    }
}

/// Seeded angle and step variance. Draws nothing when both variances are
/// zero.
struct Jitter {
    rng: StdRng,
    angle_variance: f64,
    length_variance: f64,
}

impl Jitter {
    fn new(config: &Turtle3dConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random)),
            angle_variance: config.angle_variance,
            length_variance: config.length_variance,
        }
    }

    fn angle(&mut self, degrees: f64) -> f64 {
        let spread = (degrees * self.angle_variance).abs();
        if spread > 0.0 {
            degrees + self.rng.gen_range(-spread..=spread)
        } else {
            degrees
        }
    }

    fn step(&mut self, step: f64) -> f64 {
        let spread = (step * self.length_variance).abs();
        if spread > 0.0 {
            (step + self.rng.gen_range(-spread..=spread)).max(MIN_JITTERED_STEP)
        } else {
            step
        }
    }
}

fn pop_state(state: &mut TurtleState, stack: &mut Vec<TurtleState>) {
    let Some(mut restored) = stack.pop() else {
        warn!("unmatched branch close ignored");
        return;
    };
    if state.polygon.is_some() {
        restored.polygon = state.polygon.take();
        restored.color_index = state.color_index;
    }
    *state = restored;
}
