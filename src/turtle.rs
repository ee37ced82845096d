//! 2D turtle interpreter.
//!
//! A single left-to-right scan over the word with one mutable state and an
//! explicit stack of snapshots for `[` / `]`. Headings are in degrees, with
//! 90 pointing up the Y axis.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::{Interpretation2D, Polygon, Segment};
use crate::parametric::Module;
use crate::symbols::{Command, Instruction, module_instructions, skip_branch, word_instructions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurtleConfig {
    /// Turn angle in degrees.
    pub angle: f64,
    pub step: f64,
    pub start: DVec2,
    /// Initial heading in degrees.
    pub heading: f64,
    pub initial_width: f64,
    /// Width multiplier applied on `[`.
    pub width_decay: f64,
    /// Step multiplier applied on `[`.
    pub length_decay: f64,
    /// Width multiplier applied by a bare `!`.
    pub width_decrement: f64,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            angle: 25.0,
            step: 10.0,
            start: DVec2::ZERO,
            heading: 90.0,
            initial_width: 1.0,
            width_decay: 0.7,
            length_decay: 0.9,
            width_decrement: 0.9,
        }
    }
}

impl TurtleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_start(mut self, start: DVec2, heading: f64) -> Self {
        self.start = start;
        self.heading = heading;
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
}

#[derive(Debug, Clone)]
struct TurtleState {
    position: DVec2,
    heading: f64,
    depth: usize,
    width: f64,
    step: f64,
    color_index: u32,
    polygon: Option<Vec<DVec2>>,
}

impl TurtleState {
    fn advance(&mut self, distance: f64) -> DVec2 {
        let (sin, cos) = self.heading.to_radians().sin_cos();
        self.position += DVec2::new(cos, sin) * distance;
        self.position
    }

    fn record_vertex(&mut self) {
        if let Some(vertices) = &mut self.polygon {
            vertices.push(self.position);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Turtle2D {
    config: TurtleConfig,
}

impl Turtle2D {
    pub fn new(config: TurtleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TurtleConfig {
        &self.config
    }

    pub fn interpret(&self, word: &str) -> Interpretation2D {
        self.run(word_instructions(word))
    }

    /// Interprets parametric output; a module's first parameter overrides
    /// the step, angle, width or colour of its command.
    pub fn interpret_modules(&self, modules: &[Module]) -> Interpretation2D {
        self.run(module_instructions(modules))
    }

    fn run(&self, mut instructions: impl Iterator<Item = Instruction>) -> Interpretation2D {
        let config = &self.config;
        let mut out = Interpretation2D::default();
        let mut stack: Vec<TurtleState> = Vec::new();
        let mut state = TurtleState {
            position: config.start,
            heading: config.heading,
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
                    let end = state.advance(param.unwrap_or(state.step));
                    out.segments.push(Segment {
                        start,
                        end,
                        depth: state.depth,
                        width: state.width,
                        index: out.segments.len(),
                        color_index: state.color_index,
                    });
                }
                Command::Move => {
                    state.advance(param.unwrap_or(state.step));
                    state.record_vertex();
                }
                Command::TurnLeft => state.heading += param.unwrap_or(config.angle),
                Command::TurnRight => state.heading -= param.unwrap_or(config.angle),
                Command::TurnAround => state.heading += 180.0,
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
                Command::PitchDown
                | Command::PitchUp
                | Command::RollLeft
                | Command::RollRight
                | Command::RollToHorizontal => {}
            }
        }

        debug!(
            segments = out.segments.len(),
            polygons = out.polygons.len(),
            "2D interpretation finished"
        );
        out
    }
}

/// Restores the last snapshot. An in-progress polygon and its colour
/// survive the pop.
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
