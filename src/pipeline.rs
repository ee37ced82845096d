//! End-to-end helpers: derive a preset, interpret it and schedule its
//! growth.

use std::sync::Arc;

use glam::{DVec2, DVec3};
use tracing::info;

use crate::config::GrowthConfig;
use crate::error::Result;
use crate::geometry::{Interpretation2D, Interpretation3D};
use crate::growth::GrowthScheduler;
use crate::parametric::Module;
use crate::presets::Preset;
use crate::turtle::Turtle2D;
use crate::turtle3d::Turtle3D;

/// A derived word, in the form its grammar engine produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Word {
    Symbols(Arc<str>),
    Modules(Vec<Module>),
}

impl Word {
    pub fn len(&self) -> usize {
        match self {
            Word::Symbols(word) => word.chars().count(),
            Word::Modules(modules) => modules.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the preset's grammar for its configured iterations. `seed` only
/// matters for stochastic presets.
pub fn derive(preset: &Preset, seed: Option<u64>) -> Result<Word> {
    if preset.is_parametric() {
        let mut system = preset.parametric_system()?;
        if let Some(seed) = seed {
            system.reseed(seed);
        }
        Ok(Word::Modules(system.generate(preset.iterations)?))
    } else {
        let mut system = preset.lsystem()?;
        Ok(Word::Symbols(system.generate(preset.iterations)?))
    }
}

pub fn interpret_2d(preset: &Preset, word: &Word) -> Interpretation2D {
    let turtle = Turtle2D::new(preset.turtle_config());
    match word {
        Word::Symbols(symbols) => turtle.interpret(symbols),
        Word::Modules(modules) => turtle.interpret_modules(modules),
    }
}

pub fn interpret_3d(preset: &Preset, word: &Word) -> Interpretation3D {
    let turtle = Turtle3D::new(preset.turtle3d_config());
    match word {
        Word::Symbols(symbols) => turtle.interpret(symbols),
        Word::Modules(modules) => turtle.interpret_modules(modules),
    }
}

pub fn grow_2d(
    preset: &Preset,
    config: GrowthConfig,
    seed: Option<u64>,
) -> Result<GrowthScheduler<DVec2>> {
    let word = derive(preset, seed)?;
    let geometry = interpret_2d(preset, &word);
    info!(
        preset = %preset.name,
        symbols = word.len(),
        segments = geometry.segments.len(),
        "2D plant ready for growth"
    );
    GrowthScheduler::new(geometry, config)
}

pub fn grow_3d(
    preset: &Preset,
    config: GrowthConfig,
    seed: Option<u64>,
) -> Result<GrowthScheduler<DVec3>> {
    let word = derive(preset, seed)?;
    let geometry = interpret_3d(preset, &word);
    info!(
        preset = %preset.name,
        symbols = word.len(),
        segments = geometry.segments.len(),
        polygons = geometry.polygons.len(),
        "3D plant ready for growth"
    );
    GrowthScheduler::new(geometry, config)
}
