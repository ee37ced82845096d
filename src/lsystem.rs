//! Standard (non-parametric) L-system derivation.
//!
//! Every iteration rewrites each symbol with its successor in a single
//! order-preserving pass. Intermediate words are memoized per grammar so that
//! repeated or incremental requests resume from the deepest cached iteration
//! instead of starting over.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::symbols::Command;

/// Hard ceiling on the length of a derived word.
pub const DEFAULT_MAX_LENGTH: usize = 10_000_000;

/// The length ceiling is checked at least this often while a step is
/// being appended.
const LENGTH_CHECK_INTERVAL: usize = 1_000;

/// Symbol → successor mapping, kept sorted so the grammar has a canonical
/// form.
pub type Rules = BTreeMap<char, String>;

pub struct LSystem {
    axiom: String,
    rules: Rules,
    max_length: usize,
    // Canonical grammar text -> (iteration -> derived word). Only the
    // current grammar's key is ever retained.
    cache: HashMap<String, BTreeMap<usize, Arc<str>>>,
}

impl LSystem {
    pub fn new<S: Into<String>>(
        axiom: impl Into<String>,
        rules: impl IntoIterator<Item = (char, S)>,
    ) -> Self {
        Self {
            axiom: axiom.into(),
            rules: rules.into_iter().map(|(k, v)| (k, v.into())).collect(),
            max_length: DEFAULT_MAX_LENGTH,
            cache: HashMap::new(),
        }
    }

    /// Builds a system from rule text such as `"F:F[-F][+F],X:FX"`.
    pub fn from_text(axiom: impl Into<String>, rules: &str) -> Result<Self> {
        Ok(Self::new(axiom, parse_rules(rules)?))
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(1);
        self
    }

    pub fn axiom(&self) -> &str {
        &self.axiom
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn set_axiom(&mut self, axiom: impl Into<String>) {
        self.axiom = axiom.into();
        self.evict_stale_grammars();
    }

    pub fn add_rule(&mut self, predecessor: char, successor: impl Into<String>) {
        self.rules.insert(predecessor, successor.into());
        self.evict_stale_grammars();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of memoized words for the current grammar.
    pub fn cached_words(&self) -> usize {
        self.cache.values().map(BTreeMap::len).sum()
    }

    /// Derives the word after `iterations` rewrite steps.
    pub fn generate(&mut self, iterations: usize) -> Result<Arc<str>> {
        let key = self.grammar_key();
        let entries = self.cache.entry(key).or_default();

        if let Some(word) = entries.get(&iterations) {
            trace!(iterations, "derivation served from cache");
            return Ok(word.clone());
        }

        let (start, mut current) = match entries.range(..=iterations).next_back() {
            Some((&i, word)) => {
                debug!(resume_from = i, target = iterations, "resuming cached derivation");
                (i, word.clone())
            }
            None => {
                let axiom_length = self.axiom.chars().count();
                if axiom_length > self.max_length {
                    return Err(Error::DerivationLength {
                        iteration: 0,
                        limit: self.max_length,
                        length: axiom_length,
                    });
                }
                let axiom: Arc<str> = Arc::from(self.axiom.as_str());
                entries.insert(0, axiom.clone());
                (0, axiom)
            }
        };

        for iteration in start + 1..=iterations {
            let next = rewrite(&current, &self.rules, self.max_length, iteration)?;
            debug!(iteration, length = next.len(), "derivation step");
            current = Arc::from(next);
            entries.insert(iteration, current.clone());
        }

        Ok(current)
    }

    fn evict_stale_grammars(&mut self) {
        let key = self.grammar_key();
        let before = self.cache.len();
        self.cache.retain(|cached, _| *cached == key);
        if self.cache.len() < before {
            debug!("grammar changed, memoized words released");
        }
    }

    fn grammar_key(&self) -> String {
        let mut key = String::with_capacity(self.axiom.len() + 16 * self.rules.len());
        key.push_str(&self.axiom);
        key.push('\u{0}');
        for (predecessor, successor) in &self.rules {
            key.push(*predecessor);
            key.push(':');
            key.push_str(successor);
            key.push('\u{0}');
        }
        key
    }
}

fn rewrite(word: &str, rules: &Rules, limit: usize, iteration: usize) -> Result<String> {
    let mut output = String::with_capacity(word.len().saturating_mul(2).min(limit));
    let mut length = 0usize;

    for (appended, symbol) in word.chars().enumerate() {
        match rules.get(&symbol) {
            Some(successor) => {
                output.push_str(successor);
                length += successor.chars().count();
            }
            None => {
                output.push(symbol);
                length += 1;
            }
        }

        if (appended + 1) % LENGTH_CHECK_INTERVAL == 0 && length > limit {
            warn!(iteration, length, limit, "derivation length ceiling exceeded");
            return Err(Error::DerivationLength {
                iteration,
                limit,
                length,
            });
        }
    }

    if length > limit {
        warn!(iteration, length, limit, "derivation length ceiling exceeded");
        return Err(Error::DerivationLength {
            iteration,
            limit,
            length,
        });
    }

    Ok(output)
}

/// Parses comma-separated `predecessor:successor` pairs.
///
/// Blank entries are skipped; an entry without `:` or with a predecessor that
/// is not exactly one symbol is an error.
pub fn parse_rules(text: &str) -> Result<Rules> {
    let mut rules = Rules::new();
    for entry in text.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((predecessor, successor)) = entry.split_once(':') else {
            return Err(Error::RuleSyntax {
                rule: entry.to_string(),
                reason: "missing `:` separator".to_string(),
            });
        };
        let mut symbols = predecessor.trim().chars();
        let symbol = match (symbols.next(), symbols.next()) {
            (Some(symbol), None) => symbol,
            _ => {
                return Err(Error::RuleSyntax {
                    rule: entry.to_string(),
                    reason: "predecessor must be exactly one symbol".to_string(),
                });
            }
        };
        rules.insert(symbol, successor.trim().to_string());
    }
    Ok(rules)
}

/// Number of drawn segments the word will produce (ignoring `%` cuts).
pub fn count_segments(word: &str) -> usize {
    word.chars()
        .filter(|c| Command::from_symbol(*c) == Some(Command::Draw))
        .count()
}

/// Number of non-drawing forward moves in the word.
pub fn count_moves(word: &str) -> usize {
    word.chars()
        .filter(|c| Command::from_symbol(*c) == Some(Command::Move))
        .count()
}

/// True when the word uses pitch or roll symbols and needs the 3D turtle.
pub fn is_three_dimensional(word: &str) -> bool {
    word.chars()
        .filter_map(Command::from_symbol)
        .any(Command::is_spatial)
}

pub fn rules_are_three_dimensional(rules: &Rules) -> bool {
    rules.values().any(|successor| is_three_dimensional(successor))
}
