//! Symbol rewriting and the built-in leaf families.
//!
//! [`expand`] applies one production per symbol per generation. Rules are plain
//! match arms over [`Symbol`]; they may read the [`LeafConfiguration`] and draw
//! from the caller's RNG when `angleJitter` is set.

use crate::config::{LeafConfiguration, names};
use crate::error::{LeafError, LeafResult, ParameterKind};
use crate::symbol::{Growth, Symbol};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Rewrites `axiom` for `generations` passes.
///
/// Terminals are copied (a `Move` has its length scaled by its growth rate),
/// non-terminals are replaced by their production.
pub fn expand<R: Rng>(
    axiom: &[Symbol],
    generations: usize,
    config: &LeafConfiguration,
    rng: &mut R,
) -> LeafResult<Vec<Symbol>> {
    let jitter = angle_jitter(config)?;
    let mut current = axiom.to_vec();

    for generation in 0..generations {
        let mut next = Vec::with_capacity(current.len() * 2);
        for symbol in &current {
            produce(symbol, config, jitter, rng, &mut next)?;
        }
        debug!(
            "Generation {}: {} -> {} symbols",
            generation + 1,
            current.len(),
            next.len()
        );
        current = next;
    }

    Ok(current)
}

/// Largest accepted `angleJitter`, in degrees.
pub const MAX_ANGLE_JITTER: f64 = 180.0;

/// The configured jitter half-width, `0.0` when `angleJitter` is not defined.
///
/// Values outside `[0, MAX_ANGLE_JITTER]` (and NaN) are rejected.
pub fn angle_jitter(config: &LeafConfiguration) -> LeafResult<f64> {
    let jitter = config.double_or(names::ANGLE_JITTER, 0.0);
    if !(0.0..=MAX_ANGLE_JITTER).contains(&jitter) {
        return Err(LeafError::ParameterOutOfRange {
            name: names::ANGLE_JITTER.to_string(),
            value: jitter,
            min: 0.0,
            max: MAX_ANGLE_JITTER,
        });
    }
    Ok(jitter)
}

/// [`expand`] with an RNG seeded from `seed`, for reproducible builds.
pub fn expand_seeded(
    axiom: &[Symbol],
    generations: usize,
    config: &LeafConfiguration,
    seed: u64,
) -> LeafResult<Vec<Symbol>> {
    let mut rng = StdRng::seed_from_u64(seed);
    expand(axiom, generations, config, &mut rng)
}

/// Appends the production of `symbol` to `out`.
fn produce<R: Rng>(
    symbol: &Symbol,
    config: &LeafConfiguration,
    jitter: f64,
    rng: &mut R,
    out: &mut Vec<Symbol>,
) -> LeafResult<()> {
    let mut angle = |base: f64| -> f64 {
        if jitter > 0.0 {
            base + rng.gen_range(-jitter..=jitter)
        } else {
            base
        }
    };

    match *symbol {
        Symbol::Move {
            length,
            growth_rate,
        } => out.push(Symbol::Move {
            length: length * growth_rate,
            growth_rate,
        }),
        Symbol::Down(_)
        | Symbol::Roll(_)
        | Symbol::Pitch(_)
        | Symbol::Yaw(_)
        | Symbol::Branch
        | Symbol::Join
        | Symbol::OpenPolygon
        | Symbol::ClosePolygon
        | Symbol::Vertex => out.push(*symbol),

        Symbol::Growth(Growth::CordateApex { direction }) => {
            let curl = config.double("curlAngle")?;
            let divergence = config.double("divergenceAngle")?;
            out.extend([
                Symbol::Branch,
                Symbol::Roll(angle(direction * curl)),
                Symbol::Pitch(angle(divergence)),
                Symbol::Growth(Growth::CordateApex { direction }),
                Symbol::OpenPolygon,
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Vertex,
                Symbol::Growth(Growth::CordateStalk),
                Symbol::Vertex,
                Symbol::ClosePolygon,
            ]);
        }
        Symbol::Growth(Growth::CordateLobe { direction }) => {
            let curl = config.double("curlAngle")?;
            let divergence = config.double("divergenceAngle")?;
            out.extend([
                Symbol::Branch,
                Symbol::Roll(angle(-direction * curl)),
                Symbol::Pitch(angle(-divergence)),
                Symbol::Growth(Growth::CordateLobe { direction }),
                Symbol::OpenPolygon,
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Branch,
                Symbol::Growth(Growth::CordateStalk),
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Vertex,
                Symbol::Growth(Growth::CordateStalk),
                Symbol::ClosePolygon,
            ]);
        }
        Symbol::Growth(Growth::CordateStalk) => {
            let growth = config.double("growthRate")?;
            out.extend([
                Symbol::Move {
                    length: growth,
                    growth_rate: 1.0,
                },
                Symbol::Growth(Growth::CordateStalk),
            ]);
        }

        Symbol::Growth(Growth::SimpleApex { time_index }) => {
            let main = Symbol::Move {
                length: config.double("mainInitialLength")?,
                growth_rate: config.double("mainGrowthRate")?,
            };
            let main_back = Symbol::Move {
                length: -config.double("mainInitialLength")?,
                growth_rate: config.double("mainGrowthRate")?,
            };
            let lateral = Symbol::Move {
                length: config.double("lateralInitialLength")?,
                growth_rate: config.double("lateralGrowthRate")?,
            };
            let divergence = config.double("divergenceAngle")?;
            let lateral_now = Symbol::Growth(Growth::SimpleLateral { time_index });
            let lateral_prev = Symbol::Growth(Growth::SimpleLateral {
                time_index: time_index - 1.0,
            });

            if time_index.abs() > 1e-4 {
                out.push(main);
            }

            // Right side, lower triangle pair.
            out.extend([
                Symbol::Branch,
                Symbol::OpenPolygon,
                Symbol::Pitch(angle(-divergence)),
                lateral_now,
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Branch,
                Symbol::Vertex,
                main_back,
                Symbol::Vertex,
                Symbol::ClosePolygon,
                Symbol::Join,
            ]);
            // Right side, upper triangle pair.
            out.extend([
                Symbol::Branch,
                Symbol::OpenPolygon,
                main_back,
                Symbol::Vertex,
                Symbol::Pitch(angle(-divergence)),
                lateral,
                lateral_prev,
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Branch,
                Symbol::Pitch(angle(-divergence)),
                lateral_now,
                Symbol::Vertex,
                Symbol::ClosePolygon,
                Symbol::Join,
            ]);
            // Continue the main axis.
            out.extend([
                Symbol::Branch,
                Symbol::Growth(Growth::SimpleApex {
                    time_index: time_index + 1.0,
                }),
                Symbol::Join,
            ]);
            // Left side, lower triangle pair.
            out.extend([
                Symbol::Branch,
                Symbol::OpenPolygon,
                Symbol::Vertex,
                Symbol::Pitch(angle(divergence)),
                lateral_now,
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Branch,
                main_back,
                Symbol::Vertex,
                Symbol::ClosePolygon,
                Symbol::Join,
            ]);
            // Left side, upper triangle pair.
            out.extend([
                Symbol::Branch,
                Symbol::OpenPolygon,
                main_back,
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Branch,
                Symbol::Pitch(angle(divergence)),
                lateral_now,
                Symbol::Vertex,
                Symbol::Join,
                Symbol::Branch,
                main_back,
                Symbol::Pitch(angle(divergence)),
                lateral,
                lateral_prev,
                Symbol::Vertex,
                Symbol::ClosePolygon,
                Symbol::Join,
            ]);
        }
        Symbol::Growth(Growth::SimpleLateral { time_index }) => {
            let decrease = config.double("growthPotentialDecrease")?;
            out.extend([
                Symbol::Move {
                    length: config.double("lateralInitialLength")?,
                    growth_rate: config.double("lateralGrowthRate")?,
                },
                Symbol::Growth(Growth::SimpleLateral {
                    time_index: time_index - decrease,
                }),
            ]);
        }
    }

    Ok(())
}

/// The built-in leaf grammars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafFamily {
    /// A unit quad traced as two triangles. No non-terminals.
    Planar,
    /// Heart-shaped leaf grown from two curling lobes.
    Cordate,
    /// Compound leaf with a main axis and decaying laterals.
    Simple,
}

impl LeafFamily {
    pub const ALL: [LeafFamily; 3] = [LeafFamily::Planar, LeafFamily::Cordate, LeafFamily::Simple];

    pub fn name(self) -> &'static str {
        match self {
            LeafFamily::Planar => "planar",
            LeafFamily::Cordate => "cordate",
            LeafFamily::Simple => "simple",
        }
    }

    /// Parameters this family's axiom and rules read, plus the ones every build needs.
    pub fn required_parameters(self) -> Vec<(&'static str, ParameterKind)> {
        let mut required = vec![
            (names::THICKNESS, ParameterKind::Double),
            (names::ITERATION_NUMBER, ParameterKind::Integer),
            (names::INITIAL_ANGLE, ParameterKind::Double),
        ];
        let specific: &[&'static str] = match self {
            LeafFamily::Planar => &["initialEdgeLength", "mainGrowthRate", "offsetLength"],
            LeafFamily::Cordate => &["divergenceAngle", "curlAngle", "growthRate", "stemLength"],
            LeafFamily::Simple => &[
                "mainInitialLength",
                "mainGrowthRate",
                "lateralInitialLength",
                "lateralGrowthRate",
                "growthPotentialDecrease",
                "divergenceAngle",
            ],
        };
        required.extend(specific.iter().map(|&n| (n, ParameterKind::Double)));
        required
    }

    /// Default values and randomisation intervals.
    pub fn default_configuration(self) -> LeafConfiguration {
        let mut config = LeafConfiguration::new();
        let doubles: &[(&str, f64, f64, f64)] = match self {
            LeafFamily::Planar => &[
                ("initialAngle", 0.0, 0.0, 360.0),
                ("initialEdgeLength", 1.0, 1.0, 1.0),
                ("mainGrowthRate", 1.0, 1.0, 1.0),
                ("offsetLength", 0.0, 0.0, 0.0),
                ("thickness", 0.01, 0.01, 0.01),
            ],
            LeafFamily::Cordate => &[
                ("initialAngle", 90.0, 70.0, 120.0),
                ("divergenceAngle", 15.0, 10.0, 20.0),
                ("curlAngle", 8.0, 3.0, 15.0),
                ("growthRate", 0.1, 0.05, 0.3),
                ("stemLength", 0.0, 0.0, 0.0),
                ("thickness", 0.01, 0.002, 0.06),
            ],
            LeafFamily::Simple => &[
                ("initialAngle", 90.0, 0.0, 360.0),
                ("mainInitialLength", 0.05, 0.01, 0.09),
                ("mainGrowthRate", 0.75, 0.5, 1.1),
                ("lateralInitialLength", 0.02, 0.005, 0.04),
                ("lateralGrowthRate", 0.8, 0.8, 1.3),
                ("growthPotentialDecrease", 1.0, 1.0, 1.0),
                ("divergenceAngle", 75.0, 45.0, 140.0),
                ("thickness", 0.01, 0.002, 0.06),
            ],
        };
        let (iterations, min_iterations, max_iterations) = match self {
            LeafFamily::Planar => (0, 0, 0),
            LeafFamily::Cordate => (5, 3, 5),
            LeafFamily::Simple => (4, 4, 8),
        };

        for &(name, value, min, max) in doubles {
            config.set_parameter(name, value);
            // Intervals above always contain their value.
            let _ = config.set_range(name, min, max);
        }
        config.set_integer_parameter(names::ITERATION_NUMBER, iterations);
        let _ = config.set_integer_range(names::ITERATION_NUMBER, min_iterations, max_iterations);

        config
    }

    /// The initial symbol sequence for this family.
    pub fn axiom(self, config: &LeafConfiguration) -> LeafResult<Vec<Symbol>> {
        let initial_angle = config.double(names::INITIAL_ANGLE)?;

        match self {
            LeafFamily::Planar => {
                let edge = config.double("initialEdgeLength")?;
                let growth_rate = config.double("mainGrowthRate")?;
                let half = Symbol::Move {
                    length: edge / 2.0,
                    growth_rate,
                };
                let full = Symbol::Move {
                    length: edge,
                    growth_rate,
                };
                let triangle = [
                    Symbol::OpenPolygon,
                    Symbol::Pitch(90.0),
                    half,
                    Symbol::Roll(90.0),
                    Symbol::Pitch(90.0),
                    half,
                    Symbol::Vertex,
                    Symbol::Pitch(90.0),
                    full,
                    Symbol::Vertex,
                    Symbol::Pitch(90.0),
                    full,
                    Symbol::Vertex,
                    Symbol::ClosePolygon,
                ];

                let mut axiom = vec![
                    Symbol::Move {
                        length: config.double("offsetLength")?,
                        growth_rate: 1.0,
                    },
                    Symbol::Roll(initial_angle),
                    Symbol::Branch,
                ];
                axiom.extend(triangle);
                axiom.extend([Symbol::Join, Symbol::Branch, Symbol::Roll(180.0)]);
                axiom.extend(triangle);
                axiom.push(Symbol::Join);
                Ok(axiom)
            }
            LeafFamily::Cordate => Ok(vec![
                Symbol::Roll(initial_angle),
                Symbol::Move {
                    length: config.double("stemLength")?,
                    growth_rate: 1.0,
                },
                Symbol::Branch,
                Symbol::Growth(Growth::CordateApex { direction: 1.0 }),
                Symbol::Join,
                Symbol::Branch,
                Symbol::Growth(Growth::CordateLobe { direction: 1.0 }),
                Symbol::Join,
            ]),
            LeafFamily::Simple => Ok(vec![
                Symbol::Roll(initial_angle),
                Symbol::Branch,
                Symbol::Growth(Growth::SimpleApex { time_index: 0.0 }),
                Symbol::Join,
            ]),
        }
    }
}

impl FromStr for LeafFamily {
    type Err = LeafError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeafFamily::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LeafError::InvalidConfiguration(format!("unknown leaf family \"{s}\"")))
    }
}

impl std::fmt::Display for LeafFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
