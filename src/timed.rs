//! Timed L-systems for continuous growth.
//!
//! Every module carries an age. Time advances in fixed steps; a module whose
//! age reaches its terminal age is rewritten by the production for its
//! symbol, and its daughters start at their own initial ages. Sizes between
//! rewrites come from a [`GrowthFunction`], so a derivation can be sampled
//! at any instant rather than only at whole iterations.
//!
//! ```text
//! (a, β) → (b₁, α₁)(b₂, α₂)…(bₙ, αₙ)
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::parametric::Module;

/// `ln φ`. With this rate the daughters of an exponentially growing module
/// sum to the size of their parent at division.
pub const GOLDEN_GROWTH_RATE: f64 = 0.481_211_825_059_603_45;

/// Ceiling on the number of modules in a timed state.
pub const DEFAULT_MAX_TIMED_MODULES: usize = 1_000_000;

const CONTINUITY_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Growth functions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthFunction {
    /// Zero at the initial age, full size at the terminal age.
    Linear,
    /// `scale · e^(ln φ · age)`. Unbounded.
    #[default]
    Exponential,
    /// Hermite `3t² − 2t³` between the initial and terminal ages.
    Sigmoidal,
    /// Binomial growth of the given degree.
    Polynomial { degree: u32 },
}

pub fn linear_growth(age: f64, min_age: f64, max_age: f64, max_size: f64) -> f64 {
    if max_age <= min_age {
        return max_size;
    }
    max_size * ((age - min_age) / (max_age - min_age)).clamp(0.0, 1.0)
}

pub fn exponential_growth(age: f64, scale: f64) -> f64 {
    scale * (GOLDEN_GROWTH_RATE * age).exp()
}

pub fn sigmoidal_growth(age: f64, min_age: f64, max_age: f64, max_size: f64) -> f64 {
    if max_age <= min_age {
        return max_size;
    }
    let t = ((age - min_age) / (max_age - min_age)).clamp(0.0, 1.0);
    max_size * t * t * (3.0 - 2.0 * t)
}

/// `C(⌊age⌋, degree)` once the age reaches the degree, `age^degree / degree!`
/// before that.
pub fn polynomial_growth(age: f64, degree: u32, scale: f64) -> f64 {
    let n = age.max(0.0).floor();
    if n < f64::from(degree) {
        let factorial: f64 = (1..=degree).map(f64::from).product();
        return scale * age.powi(degree as i32) / factorial;
    }
    let binomial = (0..degree).fold(1.0, |acc, k| {
        acc * (n - f64::from(k)) / f64::from(k + 1)
    });
    scale * binomial
}

/// Nothing for `delay` steps, then a linear rise over `rise` steps.
pub fn delayed_sigmoidal_growth(age: f64, delay: u32, rise: u32, max_size: f64) -> f64 {
    let grown = age - f64::from(delay);
    if grown < 0.0 {
        return 0.0;
    }
    if grown >= f64::from(rise) {
        return max_size;
    }
    max_size * grown / f64::from(rise)
}

// ---------------------------------------------------------------------------
// Modules and productions
// ---------------------------------------------------------------------------

/// A module with an age τ, living from `min_age` (α) to `terminal_age` (β).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedModule {
    pub symbol: char,
    pub age: f64,
    pub params: Vec<f64>,
    pub min_age: f64,
    pub terminal_age: f64,
    pub growth: GrowthFunction,
}

impl TimedModule {
    /// Starts at `age`, which also becomes the minimum age.
    pub fn new(symbol: char, age: f64, terminal_age: f64) -> Self {
        Self {
            symbol,
            age,
            params: Vec::new(),
            min_age: age,
            terminal_age,
            growth: GrowthFunction::default(),
        }
    }

    pub fn with_params(mut self, params: impl Into<Vec<f64>>) -> Self {
        self.params = params.into();
        self
    }

    pub fn with_min_age(mut self, min_age: f64) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn with_growth(mut self, growth: GrowthFunction) -> Self {
        self.growth = growth;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.age >= self.terminal_age
    }

    pub fn remaining_time(&self) -> f64 {
        (self.terminal_age - self.age).max(0.0)
    }

    /// Age normalized to `[0, 1]` over the module's lifetime.
    pub fn age_fraction(&self) -> f64 {
        if self.terminal_age <= self.min_age {
            return 1.0;
        }
        (self.age - self.min_age) / (self.terminal_age - self.min_age)
    }

    /// Size at the current age for a module that reaches `base_size` at
    /// maturity.
    pub fn size(&self, base_size: f64) -> f64 {
        match self.growth {
            GrowthFunction::Linear => {
                linear_growth(self.age, self.min_age, self.terminal_age, base_size)
            }
            GrowthFunction::Exponential => exponential_growth(self.age, base_size),
            GrowthFunction::Sigmoidal => {
                sigmoidal_growth(self.age, self.min_age, self.terminal_age, base_size)
            }
            GrowthFunction::Polynomial { degree } => {
                polynomial_growth(self.age, degree, base_size)
            }
        }
    }

    fn aged(&self, dt: f64) -> Self {
        Self {
            age: self.age + dt,
            ..self.clone()
        }
    }
}

/// One daughter of a timed production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSuccessor {
    pub symbol: char,
    pub initial_age: f64,
    pub params: Vec<f64>,
    /// Falls back to the production's terminal age.
    pub terminal_age: Option<f64>,
}

impl TimedSuccessor {
    pub fn new(symbol: char, initial_age: f64) -> Self {
        Self {
            symbol,
            initial_age,
            params: Vec::new(),
            terminal_age: None,
        }
    }

    pub fn with_params(mut self, params: impl Into<Vec<f64>>) -> Self {
        self.params = params.into();
        self
    }

    pub fn with_terminal_age(mut self, terminal_age: f64) -> Self {
        self.terminal_age = Some(terminal_age);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedProduction {
    pub predecessor: char,
    /// Age β at which the production fires.
    pub terminal_age: f64,
    pub successors: Vec<TimedSuccessor>,
}

impl TimedProduction {
    pub fn new(
        predecessor: char,
        terminal_age: f64,
        successors: impl IntoIterator<Item = TimedSuccessor>,
    ) -> Self {
        Self {
            predecessor,
            terminal_age,
            successors: successors.into_iter().collect(),
        }
    }

    pub fn matches(&self, module: &TimedModule) -> bool {
        module.symbol == self.predecessor && module.is_terminal()
    }

    /// Daughter modules. They inherit the parent's growth function.
    pub fn apply(&self, growth: GrowthFunction) -> Vec<TimedModule> {
        self.successors
            .iter()
            .map(|s| TimedModule {
                symbol: s.symbol,
                age: s.initial_age,
                params: s.params.clone(),
                min_age: s.initial_age,
                terminal_age: s.terminal_age.unwrap_or(self.terminal_age),
                growth,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Deterministic timed L-system.
///
/// A terminal module without a production stays mature: its age is held at
/// its terminal age instead of growing further.
#[derive(Debug, Clone)]
pub struct TimedLSystem {
    axiom: Vec<TimedModule>,
    productions: HashMap<char, TimedProduction>,
    time_step: f64,
    max_modules: usize,
}

impl TimedLSystem {
    /// The first production given for a symbol wins.
    pub fn new(
        axiom: Vec<TimedModule>,
        productions: impl IntoIterator<Item = TimedProduction>,
    ) -> Self {
        let mut index = HashMap::new();
        for production in productions {
            index.entry(production.predecessor).or_insert(production);
        }
        Self {
            axiom,
            productions: index,
            time_step: 0.1,
            max_modules: DEFAULT_MAX_TIMED_MODULES,
        }
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_max_modules(mut self, max_modules: usize) -> Self {
        self.max_modules = max_modules.max(1);
        self
    }

    pub fn axiom(&self) -> &[TimedModule] {
        &self.axiom
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn production(&self, symbol: char) -> Option<&TimedProduction> {
        self.productions.get(&symbol)
    }

    /// States sampled every time step over `duration`, starting with the
    /// axiom and ending with the state at exactly `duration`.
    pub fn derive(&self, duration: f64) -> Result<Vec<Vec<TimedModule>>> {
        self.validate()?;
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "timed derivation duration must be finite and non-negative, got {duration}"
            )));
        }

        let steps = (duration / self.time_step - 1e-9).ceil().max(0.0) as usize;
        let mut states = Vec::with_capacity(steps + 1);
        let mut current = self.axiom.clone();

        for step in 0..steps {
            let elapsed = step as f64 * self.time_step;
            let dt = self.time_step.min(duration - elapsed);
            let next = self.apply_productions(&advance(&current, dt), step + 1)?;
            states.push(std::mem::replace(&mut current, next));
        }
        states.push(current);

        debug!(duration, states = states.len(), "timed derivation finished");
        Ok(states)
    }

    /// Runs until `iterations` production rounds have been applied. When no
    /// module is ready, time jumps to the next terminal age (at least one
    /// time step).
    pub fn derive_to_iteration(&self, iterations: usize) -> Result<Vec<Vec<TimedModule>>> {
        self.validate()?;
        let mut states = Vec::with_capacity(iterations + 1);
        let mut current = self.axiom.clone();

        for iteration in 1..=iterations {
            let ready = current
                .iter()
                .any(|m| m.is_terminal() && self.productions.contains_key(&m.symbol));
            let aged = if ready {
                current.clone()
            } else {
                let wait = current
                    .iter()
                    .filter(|m| !m.is_terminal())
                    .map(TimedModule::remaining_time)
                    .fold(f64::INFINITY, f64::min);
                let wait = if wait.is_finite() { wait } else { self.time_step };
                trace!(iteration, wait, "advancing to next terminal age");
                advance(&current, wait.max(self.time_step))
            };
            let next = self.apply_productions(&aged, iteration)?;
            states.push(std::mem::replace(&mut current, next));
        }
        states.push(current);
        Ok(states)
    }

    fn validate(&self) -> Result<()> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "time step must be positive, got {}",
                self.time_step
            )));
        }
        Ok(())
    }

    fn apply_productions(&self, modules: &[TimedModule], step: usize) -> Result<Vec<TimedModule>> {
        let mut next = Vec::with_capacity(modules.len());
        for module in modules {
            if !module.is_terminal() {
                next.push(module.clone());
            } else if let Some(production) = self.productions.get(&module.symbol) {
                next.extend(production.apply(module.growth));
            } else {
                next.push(TimedModule {
                    age: module.terminal_age,
                    ..module.clone()
                });
            }
            if next.len() > self.max_modules {
                warn!(step, modules = next.len(), limit = self.max_modules, "timed module cap exceeded");
                return Err(Error::ModuleLimit {
                    iteration: step,
                    limit: self.max_modules,
                    modules: next.len(),
                });
            }
        }
        Ok(next)
    }
}

fn advance(modules: &[TimedModule], dt: f64) -> Vec<TimedModule> {
    modules.iter().map(|m| m.aged(dt)).collect()
}

// ---------------------------------------------------------------------------
// Sampling helpers
// ---------------------------------------------------------------------------

/// A module's symbol and parameters with its size at the current age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedModule {
    pub symbol: char,
    pub size: f64,
    pub params: Vec<f64>,
}

/// Unit-scale sizes for every module of a state.
pub fn interpolated_state(modules: &[TimedModule]) -> Vec<SizedModule> {
    modules
        .iter()
        .map(|m| SizedModule {
            symbol: m.symbol,
            size: m.size(1.0),
            params: m.params.clone(),
        })
        .collect()
}

pub fn to_symbol_string(modules: &[TimedModule]) -> String {
    modules.iter().map(|m| m.symbol).collect()
}

fn is_step(symbol: char) -> bool {
    matches!(symbol, 'F' | 'f' | 'G')
}

/// Current length of every step module (`F`, `f`, `G`), keyed by position.
pub fn module_sizes(modules: &[TimedModule], base_size: f64) -> BTreeMap<usize, f64> {
    modules
        .iter()
        .enumerate()
        .filter(|(_, m)| is_step(m.symbol))
        .map(|(i, m)| (i, m.size(base_size)))
        .collect()
}

/// Blends the ages of two states with the same structure. States of
/// different length snap to the nearer one.
pub fn interpolate_states(
    earlier: &[TimedModule],
    later: &[TimedModule],
    t: f64,
) -> Vec<TimedModule> {
    if earlier.len() != later.len() {
        return if t < 0.5 { earlier } else { later }.to_vec();
    }
    earlier
        .iter()
        .zip(later)
        .map(|(a, b)| {
            if a.symbol == b.symbol {
                TimedModule {
                    age: a.age + t * (b.age - a.age),
                    ..a.clone()
                }
            } else if t > 0.5 {
                b.clone()
            } else {
                a.clone()
            }
        })
        .collect()
}

/// Turtle input for a timed state: step modules get their grown length as
/// the first parameter, everything else keeps its parameters.
pub fn to_parametric_modules(modules: &[TimedModule], base_length: f64) -> Vec<Module> {
    modules
        .iter()
        .map(|m| {
            if is_step(m.symbol) {
                Module::new(m.symbol, [m.size(base_length)])
            } else {
                Module::new(m.symbol, m.params.clone())
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Continuity
// ---------------------------------------------------------------------------

/// Size of the parent at its terminal age against the summed sizes of its
/// daughters at their initial ages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Continuity {
    /// `None` when the predecessor has no growth function.
    pub parent: Option<f64>,
    pub children: f64,
}

impl Continuity {
    pub fn holds(&self) -> bool {
        self.parent
            .is_none_or(|parent| (parent - self.children).abs() < CONTINUITY_EPSILON)
    }
}

/// Checks `g(a, β) = Σ g(bᵢ, αᵢ)`. `growth(symbol, age)` returns `None`
/// for symbols without a growth function; those daughters contribute
/// nothing.
pub fn verify_continuity(
    production: &TimedProduction,
    growth: impl Fn(char, f64) -> Option<f64>,
) -> Continuity {
    let parent = growth(production.predecessor, production.terminal_age);
    let children = production
        .successors
        .iter()
        .filter_map(|s| growth(s.symbol, s.initial_age))
        .sum();
    Continuity { parent, children }
}

// ---------------------------------------------------------------------------
// Example systems
// ---------------------------------------------------------------------------

impl TimedLSystem {
    /// Cell division in *Anabaena catenula*. `R` and `L` are vegetative
    /// cells dividing to the right and left, `r` and `l` their young
    /// daughters.
    pub fn anabaena() -> Self {
        let cell = |symbol, age, terminal| {
            TimedSuccessor::new(symbol, age).with_terminal_age(terminal)
        };
        Self::new(
            vec![TimedModule::new('R', 1.0, 2.0).with_growth(GrowthFunction::Linear)],
            [
                TimedProduction::new('R', 2.0, [cell('L', 1.0, 2.0), cell('r', 0.0, 1.0)]),
                TimedProduction::new('L', 2.0, [cell('l', 0.0, 1.0), cell('R', 1.0, 2.0)]),
                TimedProduction::new('r', 1.0, [cell('R', 0.0, 2.0)]),
                TimedProduction::new('l', 1.0, [cell('L', 0.0, 2.0)]),
            ],
        )
    }

    /// `A → F A [+A] [-A]` with sigmoidal internodes that mature over
    /// `growth_time`.
    pub fn branching_tree(growth_time: f64, branch_angle: f64) -> Self {
        let plain = |symbol| TimedSuccessor::new(symbol, 0.0);
        let turn = |symbol| TimedSuccessor::new(symbol, 0.0).with_params([branch_angle]);
        Self::new(
            vec![TimedModule::new('A', 0.0, growth_time).with_growth(GrowthFunction::Sigmoidal)],
            [TimedProduction::new(
                'A',
                growth_time,
                [
                    plain('F'),
                    plain('A'),
                    plain('['),
                    turn('+'),
                    plain('A'),
                    plain(']'),
                    plain('['),
                    turn('-'),
                    plain('A'),
                    plain(']'),
                ],
            )],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_rate_is_ln_phi() {
        let phi = (1.0 + 5f64.sqrt()) / 2.0;
        assert!((GOLDEN_GROWTH_RATE - phi.ln()).abs() < 1e-15);
    }

    #[test]
    fn terminal_module_without_production_stays_mature() {
        let system = TimedLSystem::new(vec![TimedModule::new('F', 0.0, 1.0)], Vec::new())
            .with_time_step(0.5);
        let states = system.derive(3.0).unwrap();
        let last = &states[states.len() - 1][0];
        assert_eq!(last.age, 1.0);
        assert_eq!(last.min_age, 0.0);
    }
}
