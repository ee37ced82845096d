//! Parametric, conditional, context-sensitive and stochastic L-systems.
//!
//! Productions are written in the usual notation:
//!
//! ```text
//! A(l,w) : l > 1 -> !(w)F(l)[&(45)B(l*0.6,w*0.707)]/(137.5)A(l*0.9,w*0.707)
//! B < A > C -> A
//! F(a) → F(a*1.23)
//! ```
//!
//! Conditions and successor parameters are compiled to [`Expr`] once, when
//! the production is parsed. A condition that cannot be evaluated for a
//! given module (unknown name, division by zero, domain error) simply does
//! not match.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::expr::{Expr, Scope};

/// Ceiling on the number of modules in a working word.
pub const DEFAULT_MAX_MODULES: usize = 1_000_000;

const PARAM_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// A symbol with its actual parameters. Immutable once built; derivation
/// produces new modules rather than editing old ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    symbol: char,
    params: Vec<f64>,
}

impl Module {
    pub fn new(symbol: char, params: impl Into<Vec<f64>>) -> Self {
        Self {
            symbol,
            params: params.into(),
        }
    }

    pub fn bare(symbol: char) -> Self {
        Self {
            symbol,
            params: Vec::new(),
        }
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<f64> {
        self.params.get(index).copied()
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| (a - b).abs() < PARAM_TOLERANCE)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)?;
        if !self.params.is_empty() {
            f.write_str("(")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{p}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Parses module text such as `"!(1)F(200)/(45)A(1,10)"`.
///
/// Parameters may be constant expressions (`F(2*pi)`), but may not refer
/// to variables.
pub fn parse_modules(text: &str) -> Result<Vec<Module>> {
    split_modules(text)
        .map_err(|reason| Error::ModuleSyntax {
            text: text.to_string(),
            reason,
        })?
        .into_iter()
        .map(|(symbol, args)| {
            let params = args
                .iter()
                .map(|arg| {
                    Expr::parse(arg)
                        .and_then(|e| e.eval(&()))
                        .map_err(|source| Error::Expression {
                            expression: arg.to_string(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Module::new(symbol, params))
        })
        .collect()
}

/// Writes modules back in text form, e.g. `F(1)[+A(2)]`.
pub fn format_modules(modules: &[Module]) -> String {
    modules.iter().map(Module::to_string).collect()
}

/// The bare symbol string, suitable for the string-based turtles and the
/// standard grammar utilities.
pub fn to_symbol_string(modules: &[Module]) -> String {
    modules.iter().map(|m| m.symbol).collect()
}

/// Parameters of every parameterised module, keyed by position.
pub fn module_params(modules: &[Module]) -> BTreeMap<usize, Vec<f64>> {
    modules
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.params.is_empty())
        .map(|(i, m)| (i, m.params.clone()))
        .collect()
}

pub fn count_symbol(modules: &[Module], symbol: char) -> usize {
    modules.iter().filter(|m| m.symbol == symbol).count()
}

/// Splits `A(x,y)B[C(1)]` into `(symbol, raw argument texts)` pairs.
fn split_modules(text: &str) -> std::result::Result<Vec<(char, Vec<&str>)>, String> {
    let mut modules = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, symbol)) = chars.next() {
        if symbol.is_whitespace() {
            continue;
        }
        if symbol == '(' || symbol == ')' || symbol == ',' {
            return Err(format!("unexpected `{symbol}`"));
        }

        let mut args = Vec::new();
        if let Some(&(open, '(')) = chars.peek() {
            chars.next();
            let mut depth = 1usize;
            let mut arg_start = open + 1;
            let mut closed = false;
            for (i, c) in chars.by_ref() {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            args.push(text[arg_start..i].trim());
                            closed = true;
                            break;
                        }
                    }
                    ',' if depth == 1 => {
                        args.push(text[arg_start..i].trim());
                        arg_start = i + 1;
                    }
                    _ => {}
                }
            }
            if !closed {
                return Err(format!("unclosed parameter list after `{symbol}`"));
            }
            if args.len() == 1 && args[0].is_empty() {
                args.clear();
            } else if args.iter().any(|a| a.is_empty()) {
                return Err(format!("empty parameter in `{symbol}(...)`"));
            }
        }
        modules.push((symbol, args));
    }

    Ok(modules)
}

// ---------------------------------------------------------------------------
// Productions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    When(Expr),
    /// Text that failed to compile. Never matches.
    Invalid(String),
}

/// A successor module whose parameters are expressions over the formals.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleTemplate {
    pub symbol: char,
    pub params: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub predecessor: char,
    pub formals: Vec<String>,
    pub condition: Condition,
    pub successor: Vec<ModuleTemplate>,
    pub weight: f64,
    pub left_context: Option<char>,
    pub right_context: Option<char>,
}

impl Production {
    /// Parses `[L <] pred[(formals)] [> R] [: condition] -> successor`.
    pub fn parse(text: &str) -> Result<Self> {
        let syntax = |reason: &str| Error::RuleSyntax {
            rule: text.to_string(),
            reason: reason.to_string(),
        };

        let (head, successor) = text
            .split_once("->")
            .or_else(|| text.split_once('→'))
            .ok_or_else(|| syntax("missing `->` arrow"))?;

        let (predecessor_part, condition_text) = match head.split_once(':') {
            Some((p, c)) => (p, Some(c.trim())),
            None => (head, None),
        };

        let (left_text, rest) = match predecessor_part.split_once('<') {
            Some((l, r)) => (Some(l), r),
            None => (None, predecessor_part),
        };
        let (predecessor_text, right_text) = match rest.split_once('>') {
            Some((p, r)) => (p, Some(r)),
            None => (rest, None),
        };

        let context = |part: Option<&str>| -> Result<Option<char>> {
            let Some(part) = part else { return Ok(None) };
            let mut chars = part.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Some(c)),
                _ => Err(syntax("context must be a single symbol")),
            }
        };
        let left_context = context(left_text)?;
        let right_context = context(right_text)?;

        let mut parsed = split_modules(predecessor_text).map_err(|reason| Error::RuleSyntax {
            rule: text.to_string(),
            reason,
        })?;
        if parsed.len() != 1 {
            return Err(syntax("predecessor must be exactly one module"));
        }
        let (predecessor, formal_texts) = parsed.remove(0);
        let formals = formal_texts
            .into_iter()
            .map(|name| {
                let valid = name
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphabetic() || c == '_')
                    && name.chars().all(|c| c.is_alphanumeric() || c == '_');
                if valid {
                    Ok(name.to_string())
                } else {
                    Err(syntax("formal parameters must be identifiers"))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let condition = match condition_text {
            None | Some("") | Some("*") => Condition::Always,
            Some(source) => match Expr::parse(source) {
                Ok(expr) => Condition::When(expr),
                Err(err) => {
                    warn!(rule = text, condition = source, error = %err, "condition never matches");
                    Condition::Invalid(source.to_string())
                }
            },
        };

        Ok(Self {
            predecessor,
            formals,
            condition,
            successor: parse_template(successor)?,
            weight: 1.0,
            left_context,
            right_context,
        })
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    fn condition_holds(&self, scope: &ProductionScope<'_>) -> bool {
        match &self.condition {
            Condition::Always => true,
            Condition::When(expr) => match expr.eval_bool(scope) {
                Ok(holds) => holds,
                Err(err) => {
                    trace!(predecessor = %self.predecessor, error = %err, "condition evaluation failed");
                    false
                }
            },
            Condition::Invalid(_) => false,
        }
    }

    fn instantiate(&self, scope: &ProductionScope<'_>) -> Option<Vec<Module>> {
        self.successor
            .iter()
            .map(|template| {
                let params = template
                    .params
                    .iter()
                    .map(|expr| expr.eval(scope))
                    .collect::<std::result::Result<Vec<_>, _>>();
                match params {
                    Ok(params) => Some(Module::new(template.symbol, params)),
                    Err(err) => {
                        trace!(predecessor = %self.predecessor, error = %err, "successor evaluation failed");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Parses a production and attaches a selection weight.
pub fn parse_stochastic_production(text: &str, weight: f64) -> Result<Production> {
    Ok(Production::parse(text)?.with_weight(weight))
}

fn parse_template(text: &str) -> Result<Vec<ModuleTemplate>> {
    split_modules(text)
        .map_err(|reason| Error::RuleSyntax {
            rule: text.to_string(),
            reason,
        })?
        .into_iter()
        .map(|(symbol, args)| {
            let params = args
                .iter()
                .map(|arg| {
                    Expr::parse(arg).map_err(|source| Error::Expression {
                        expression: arg.to_string(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ModuleTemplate { symbol, params })
        })
        .collect()
}

/// Formals bound to a module's actual parameters, then named constants.
struct ProductionScope<'a> {
    formals: &'a [String],
    values: &'a [f64],
    constants: &'a HashMap<String, f64>,
}

impl Scope for ProductionScope<'_> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.formals
            .iter()
            .position(|f| f == name)
            .map(|i| self.values[i])
            .or_else(|| self.constants.get(name).copied())
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

pub struct ParametricLSystem {
    axiom: Vec<Module>,
    productions: Vec<Production>,
    constants: HashMap<String, f64>,
    ignore_symbols: HashSet<char>,
    max_modules: usize,
    seed: Option<u64>,
    last_seed: Option<u64>,
}

impl ParametricLSystem {
    pub fn new(axiom: Vec<Module>) -> Self {
        Self {
            axiom,
            productions: Vec::new(),
            constants: HashMap::new(),
            ignore_symbols: HashSet::new(),
            max_modules: DEFAULT_MAX_MODULES,
            seed: None,
            last_seed: None,
        }
    }

    /// Builds a system from axiom text and production lines.
    pub fn from_text<'a>(
        axiom: &str,
        productions: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let mut system = Self::new(parse_modules(axiom)?);
        for line in productions {
            system.add_production(Production::parse(line)?);
        }
        Ok(system)
    }

    pub fn with_production(mut self, production: Production) -> Self {
        self.productions.push(production);
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: f64) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    /// Symbols skipped when looking for a context neighbour.
    pub fn with_ignore_symbols(mut self, symbols: impl IntoIterator<Item = char>) -> Self {
        self.ignore_symbols.extend(symbols);
        self
    }

    pub fn with_max_modules(mut self, max_modules: usize) -> Self {
        self.max_modules = max_modules.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn add_production(&mut self, production: Production) {
        self.productions.push(production);
    }

    pub fn set_constant(&mut self, name: impl Into<String>, value: f64) {
        self.constants.insert(name.into(), value);
    }

    /// Replaces the seed. The next derivation behaves exactly like one from
    /// a freshly constructed system with this seed.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Seed used by the most recent derivation, including a drawn one.
    pub fn last_seed(&self) -> Option<u64> {
        self.last_seed
    }

    pub fn axiom(&self) -> &[Module] {
        &self.axiom
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn generate(&mut self, iterations: usize) -> Result<Vec<Module>> {
        let seed = self.seed.unwrap_or_else(rand::random);
        self.last_seed = Some(seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut current = self.axiom.clone();
        for iteration in 1..=iterations {
            let mut next = Vec::with_capacity(current.len().saturating_mul(2));
            for index in 0..current.len() {
                match self.rewrite(&current, index, &mut rng) {
                    Some(successor) => next.extend(successor),
                    None => next.push(current[index].clone()),
                }
                if next.len() > self.max_modules {
                    warn!(iteration, modules = next.len(), limit = self.max_modules, "module cap exceeded");
                    return Err(Error::ModuleLimit {
                        iteration,
                        limit: self.max_modules,
                        modules: next.len(),
                    });
                }
            }
            debug!(iteration, modules = next.len(), "parametric derivation step");
            current = next;
        }

        Ok(current)
    }

    fn rewrite(&self, word: &[Module], index: usize, rng: &mut StdRng) -> Option<Vec<Module>> {
        let module = &word[index];
        let mut applicable: Vec<(f64, Vec<Module>)> = Vec::new();

        for production in &self.productions {
            if production.predecessor != module.symbol
                || production.formals.len() != module.params.len()
            {
                continue;
            }
            if let Some(symbol) = production.left_context {
                if self.left_neighbour(word, index) != Some(symbol) {
                    continue;
                }
            }
            if let Some(symbol) = production.right_context {
                if self.right_neighbour(word, index) != Some(symbol) {
                    continue;
                }
            }

            let scope = ProductionScope {
                formals: &production.formals,
                values: &module.params,
                constants: &self.constants,
            };
            if !production.condition_holds(&scope) {
                continue;
            }
            if let Some(successor) = production.instantiate(&scope) {
                applicable.push((production.weight, successor));
            }
        }

        match applicable.len() {
            0 => None,
            1 => applicable.pop().map(|(_, successor)| successor),
            _ => {
                let chosen = WeightedIndex::new(applicable.iter().map(|(w, _)| *w))
                    .map(|dist| dist.sample(rng))
                    .unwrap_or(0);
                Some(applicable.swap_remove(chosen).1)
            }
        }
    }

    fn left_neighbour(&self, word: &[Module], index: usize) -> Option<char> {
        word[..index]
            .iter()
            .rev()
            .map(|m| m.symbol)
            .find(|s| !self.ignore_symbols.contains(s))
    }

    fn right_neighbour(&self, word: &[Module], index: usize) -> Option<char> {
        word[index + 1..]
            .iter()
            .map(|m| m.symbol)
            .find(|s| !self.ignore_symbols.contains(s))
    }
}
