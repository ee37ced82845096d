//! Turtle command alphabet shared by the interpreters and the grammar
//! utilities.
//!
//! | Symbol | Command |
//! |---|---|
//! | `F` | draw forward |
//! | `f`, `G` | move forward without drawing |
//! | `+` / `-` | turn left / right |
//! | `\|` | turn around |
//! | `&` / `^` | pitch down / up (3D) |
//! | `\` / `/` | roll left / right (3D) |
//! | `$` | roll to horizontal (3D) |
//! | `[` / `]` | push / pop state |
//! | `!` | width decrement (or set, with a parameter) |
//! | `'` | colour increment (or set, with a parameter) |
//! | `{` / `}` | polygon open / close |
//! | `.` | polygon vertex mark |
//! | `%` | cut the rest of the branch |
//!
//! Every other character is a placeholder that only drives rewriting.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Draw,
    Move,
    TurnLeft,
    TurnRight,
    TurnAround,
    PitchDown,
    PitchUp,
    RollLeft,
    RollRight,
    RollToHorizontal,
    Push,
    Pop,
    Width,
    Color,
    PolygonOpen,
    PolygonClose,
    Vertex,
    Cut,
}

impl Command {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Some(match symbol {
            'F' => Command::Draw,
            'f' | 'G' => Command::Move,
            '+' => Command::TurnLeft,
            '-' => Command::TurnRight,
            '|' => Command::TurnAround,
            '&' => Command::PitchDown,
            '^' => Command::PitchUp,
            '\\' => Command::RollLeft,
            '/' => Command::RollRight,
            '$' => Command::RollToHorizontal,
            '[' => Command::Push,
            ']' => Command::Pop,
            '!' => Command::Width,
            '\'' => Command::Color,
            '{' => Command::PolygonOpen,
            '}' => Command::PolygonClose,
            '.' => Command::Vertex,
            '%' => Command::Cut,
            _ => return None,
        })
    }

    /// Commands that only have a meaning for the 3D turtle.
    pub fn is_spatial(self) -> bool {
        matches!(
            self,
            Command::PitchDown
                | Command::PitchUp
                | Command::RollLeft
                | Command::RollRight
                | Command::RollToHorizontal
        )
    }
}

/// One interpreter input: a symbol and its first parameter, if any.
pub(crate) type Instruction = (char, Option<f64>);

pub(crate) fn word_instructions(word: &str) -> impl Iterator<Item = Instruction> + '_ {
    word.chars().map(|c| (c, None))
}

pub(crate) fn module_instructions(
    modules: &[crate::parametric::Module],
) -> impl Iterator<Item = Instruction> + '_ {
    modules.iter().map(|m| (m.symbol(), m.param(0)))
}

/// Consumes instructions up to and including the `]` closing the current
/// branch. Returns `false` when the input ends first.
pub(crate) fn skip_branch(instructions: &mut impl Iterator<Item = Instruction>) -> bool {
    let mut depth = 0usize;
    for (symbol, _) in instructions {
        match symbol {
            '[' => depth += 1,
            ']' if depth == 0 => return true,
            ']' => depth -= 1,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_branch_honours_nesting() {
        let mut rest = word_instructions("F[+F]F]G");
        assert!(skip_branch(&mut rest));
        assert_eq!(rest.map(|(c, _)| c).collect::<String>(), "G");
    }

    #[test]
    fn skip_branch_reports_missing_close() {
        let mut rest = word_instructions("F[F]");
        assert!(!skip_branch(&mut rest));
    }
}
