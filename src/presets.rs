//! Built-in plant grammars.
//!
//! Classic bushes and fractals from *The Algorithmic Beauty of Plants*
//! plus a few parametric trees. Use [`list_presets`] to enumerate them and
//! [`get_preset`] to fetch one by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lsystem::{LSystem, Rules};
use crate::parametric::{ParametricLSystem, Production, parse_modules};
use crate::tropism::Tropism;
use crate::turtle::TurtleConfig;
use crate::turtle3d::Turtle3dConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRule {
    pub rule: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Grammar {
    Standard {
        axiom: String,
        rules: Rules,
    },
    Parametric {
        axiom: String,
        productions: Vec<WeightedRule>,
        constants: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub grammar: Grammar,
    /// Turn angle in degrees.
    pub angle: f64,
    pub iterations: usize,
    pub three_dimensional: bool,
    pub base_width: f64,
    pub width_decay: Option<f64>,
    pub tropism: Option<Tropism>,
}

impl Preset {
    fn standard(
        name: &str,
        description: &str,
        axiom: &str,
        rules: &[(char, &str)],
        angle: f64,
        iterations: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            grammar: Grammar::Standard {
                axiom: axiom.to_string(),
                rules: rules.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            },
            angle,
            iterations,
            three_dimensional: false,
            base_width: 1.0,
            width_decay: None,
            tropism: None,
        }
    }

    fn parametric(
        name: &str,
        description: &str,
        axiom: &str,
        productions: &[(&str, f64)],
        angle: f64,
        iterations: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            grammar: Grammar::Parametric {
                axiom: axiom.to_string(),
                productions: productions
                    .iter()
                    .map(|(rule, weight)| WeightedRule {
                        rule: rule.to_string(),
                        weight: *weight,
                    })
                    .collect(),
                constants: BTreeMap::new(),
            },
            angle,
            iterations,
            three_dimensional: false,
            base_width: 1.0,
            width_decay: None,
            tropism: None,
        }
    }

    fn in_3d(mut self) -> Self {
        self.three_dimensional = true;
        self
    }

    fn with_base_width(mut self, width: f64) -> Self {
        self.base_width = width;
        self
    }

    fn with_width_decay(mut self, decay: f64) -> Self {
        self.width_decay = Some(decay);
        self
    }

    fn with_tropism(mut self, tropism: Tropism) -> Self {
        self.tropism = Some(tropism);
        self
    }

    fn with_constant(mut self, name: &str, value: f64) -> Self {
        if let Grammar::Parametric { constants, .. } = &mut self.grammar {
            constants.insert(name.to_string(), value);
        }
        self
    }

    pub fn is_parametric(&self) -> bool {
        matches!(self.grammar, Grammar::Parametric { .. })
    }

    /// Standard grammar engine for this preset; errors for parametric
    /// presets.
    pub fn lsystem(&self) -> Result<LSystem> {
        match &self.grammar {
            Grammar::Standard { axiom, rules } => Ok(LSystem::new(axiom.clone(), rules.clone())),
            Grammar::Parametric { .. } => Err(Error::InvalidConfig(format!(
                "preset `{}` is parametric",
                self.name
            ))),
        }
    }

    /// Parametric engine for this preset; errors for standard presets.
    pub fn parametric_system(&self) -> Result<ParametricLSystem> {
        match &self.grammar {
            Grammar::Standard { .. } => Err(Error::InvalidConfig(format!(
                "preset `{}` is not parametric",
                self.name
            ))),
            Grammar::Parametric {
                axiom,
                productions,
                constants,
            } => {
                let mut system = ParametricLSystem::new(parse_modules(axiom)?);
                for WeightedRule { rule, weight } in productions {
                    system.add_production(Production::parse(rule)?.with_weight(*weight));
                }
                for (name, value) in constants {
                    system.set_constant(name.clone(), *value);
                }
                Ok(system)
            }
        }
    }

    pub fn turtle_config(&self) -> TurtleConfig {
        let mut config = TurtleConfig::new()
            .with_angle(self.angle)
            .with_width(self.base_width);
        if let Some(decay) = self.width_decay {
            config.width_decay = decay;
        }
        config
    }

    pub fn turtle3d_config(&self) -> Turtle3dConfig {
        let mut config = Turtle3dConfig::new()
            .with_angle(self.angle)
            .with_width(self.base_width);
        if let Some(decay) = self.width_decay {
            config.width_decay = decay;
        }
        if let Some(tropism) = self.tropism {
            config = config.with_tropism(tropism);
        }
        config
    }
}

fn all_presets() -> Vec<Preset> {
    vec![
        Preset::standard(
            "abop_1_24a",
            "ABOP 1.24a - classic bush",
            "F",
            &[('F', "F[+F]F[-F]F")],
            25.7,
            5,
        )
        .with_base_width(1.5),
        Preset::standard(
            "abop_1_24b",
            "ABOP 1.24b - vertical branch",
            "F",
            &[('F', "F[+F]F[-F][F]")],
            20.0,
            5,
        ),
        Preset::standard(
            "abop_1_24c",
            "ABOP 1.24c - bilateral symmetry",
            "F",
            &[('F', "FF-[-F+F+F]+[+F-F-F]")],
            22.5,
            4,
        ),
        Preset::standard(
            "abop_1_24d",
            "ABOP 1.24d - asymmetric",
            "X",
            &[('X', "F[+X]F[-X]+X"), ('F', "FF")],
            20.0,
            7,
        ),
        Preset::standard(
            "abop_1_24e",
            "ABOP 1.24e - sympodial growth",
            "X",
            &[('X', "F[+X][-X]FX"), ('F', "FF")],
            25.7,
            7,
        ),
        Preset::standard(
            "abop_1_24f",
            "ABOP 1.24f - elegant plant",
            "X",
            &[('X', "F-[[X]+X]+F[+FX]-X"), ('F', "FF")],
            22.5,
            5,
        ),
        Preset::standard(
            "fern_fractal",
            "Fractal fern pattern",
            "X",
            &[('X', "F+[[X]-X]-F[-FX]+X"), ('F', "FF")],
            25.0,
            6,
        ),
        Preset::standard(
            "dragon_curve",
            "Dragon curve fractal",
            "FX",
            &[('X', "X+YF+"), ('Y', "-FX-Y")],
            90.0,
            12,
        ),
        Preset::standard(
            "koch_snowflake",
            "Koch snowflake",
            "F++F++F",
            &[('F', "F-F++F-F")],
            60.0,
            4,
        ),
        Preset::standard(
            "abop_1_25",
            "ABOP 1.25 - bush with hexagonal leaves",
            "A",
            &[
                ('A', "[&FLA]/////'[&FLA]/////'[&FLA]"),
                ('F', "S/////F"),
                ('S', "FL"),
                ('L', "['''^^{-f+f+f-|-f+f+f}]"),
            ],
            22.5,
            7,
        )
        .in_3d()
        .with_width_decay(0.9),
        Preset::standard(
            "coral_branch",
            "Coral-like branching with combined operators",
            "F",
            &[('F', "F[&+F][^/F][&-F]")],
            45.0,
            5,
        )
        .in_3d(),
        Preset::parametric(
            "stochastic_plant",
            "ABOP p.28 - stochastic plant",
            "F",
            &[
                ("F -> F[-F]F[+F]F", 0.33),
                ("F -> F[-F]F", 0.33),
                ("F -> F[+F]F", 0.34),
            ],
            28.0,
            5,
        ),
        Preset::parametric(
            "monopodial_tree",
            "ABOP fig. 2.6 - monopodial tree",
            "!(1)F(200)/(45)A(100,10)",
            &[
                ("A(l,w) -> !(w)F(l)[&(45)B(l*0.6,w*0.707)]/(137.5)A(l*0.9,w*0.707)", 1.0),
                ("B(l,w) -> !(w)F(l)[-(45)$C(l*0.6,w*0.707)]C(l*0.9,w*0.707)", 1.0),
                ("C(l,w) -> !(w)F(l)[+(45)$B(l*0.6,w*0.707)]B(l*0.9,w*0.707)", 1.0),
            ],
            45.0,
            10,
        )
        .in_3d()
        .with_tropism(Tropism::gravity(0.08)),
        Preset::parametric(
            "sympodial_tree",
            "ABOP fig. 2.7 - sympodial tree",
            "!(1)F(200)A(100,10)",
            &[
                ("A(l,w) -> !(w)F(l)[&(10)$B(l*0.9,w*0.707)]/(180)[&(60)$B(l*0.7,w*0.707)]", 1.0),
                ("B(l,w) -> !(w)F(l)[+(10)$B(l*0.9,w*0.707)][-(60)$B(l*0.7,w*0.707)]", 1.0),
            ],
            35.0,
            9,
        )
        .in_3d()
        .with_tropism(Tropism::gravity(0.12)),
        Preset::parametric(
            "fern_simple",
            "Pinnate fern with alternating delayed leaflets",
            "A(0)",
            &[
                ("A(i) : i > 0 -> A(i-1)", 1.0),
                ("A(i) : i == 0 -> F(1)[+A(b)]F(1)B(0)", 1.0),
                ("B(i) : i > 0 -> B(i-1)", 1.0),
                ("B(i) : i == 0 -> F(1)[-B(b)]F(1)A(0)", 1.0),
                ("F(a) -> F(a*c)", 1.0),
            ],
            45.0,
            12,
        )
        .with_constant("b", 2.0)
        .with_constant("c", 1.23),
        Preset::parametric(
            "fern_delayed",
            "Fern with a four-step apical delay",
            "A(0)",
            &FERN_DELAY_RULES,
            45.0,
            18,
        )
        .with_constant("b", 4.0)
        .with_constant("c", 1.20),
        Preset::parametric(
            "fern_complex",
            "Fern with a six-step apical delay",
            "A(0)",
            &FERN_DELAY_RULES,
            45.0,
            25,
        )
        .with_constant("b", 6.0)
        .with_constant("c", 1.18),
        gravity_tree("tree_gravity_none", "Whorled tree without gravity", None),
        gravity_tree(
            "tree_gravity_moderate",
            "Whorled tree with moderate gravity droop",
            Some(0.12),
        ),
        gravity_tree(
            "tree_gravity_strong",
            "Weeping tree with strong gravity droop",
            Some(0.28),
        ),
    ]
}

const FERN_DELAY_RULES: [(&str, f64); 5] = [
    ("A(i) : i > 0 -> A(i-1)", 1.0),
    ("A(i) : i == 0 -> F(1)[+A(b)]F(1)B(0)", 1.0),
    ("B(i) : i > 0 -> B(i-1)", 1.0),
    ("B(i) : i == 0 -> F(1)[-B(b)]F(1)A(0)", 1.0),
    ("F(a) -> F(a*c)", 1.0),
];

/// Three-way whorled tree with leafy side branches. Only the tropism
/// differs across the gravity series.
fn gravity_tree(name: &str, description: &str, gravity: Option<f64>) -> Preset {
    let preset = Preset::parametric(
        name,
        description,
        "!(1)F(200)A",
        &[
            (
                "A -> !(1.732)F(50)[&(30)$BL][/(120)&(30)$BL][/(240)&(30)$BL]/(45)A",
                1.0,
            ),
            ("B -> !(1)F(40)[+(25)$BL][-(25)$BL]B", 1.0),
            ("L -> ['''&&&{-f+f+f-|-f+f+f}]", 1.0),
            ("F(l) -> F(l)F(l)", 1.0),
        ],
        30.0,
        6,
    )
    .in_3d();
    match gravity {
        Some(susceptibility) => preset.with_tropism(Tropism::gravity(susceptibility)),
        None => preset,
    }
}

pub fn list_presets() -> Vec<String> {
    all_presets().into_iter().map(|p| p.name).collect()
}

pub fn get_preset(name: &str) -> Result<Preset> {
    all_presets()
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::UnknownPreset(name.to_string()))
}
