//! Named, range-bounded leaf parameters.
//!
//! A [`LeafConfiguration`] holds two ordered tables (doubles and integers). Each
//! entry carries a current value and the `[minimum, maximum]` interval that
//! [`randomize_parameters`](LeafConfiguration::randomize_parameters) draws from.
//! Order matters: randomisation walks the tables in insertion order, so two
//! configurations with the same entries produce the same values for the same seed.

use crate::error::{LeafError, LeafResult, ParameterKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Well-known parameter names shared by the grammars and the extruder.
pub mod names {
    /// Total leaf thickness in length units.
    pub const THICKNESS: &str = "thickness";
    /// Number of grammar generations.
    pub const ITERATION_NUMBER: &str = "iterationNumber";
    /// Initial roll applied by every axiom, in degrees.
    pub const INITIAL_ANGLE: &str = "initialAngle";
    /// Optional: vertex merge tolerance (per-axis absolute distance).
    pub const MERGE_TOLERANCE: &str = "mergeTolerance";
    /// Optional: half-width of the uniform jitter applied to rule-produced angles.
    pub const ANGLE_JITTER: &str = "angleJitter";
}

/// A single double parameter with its randomisation interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoubleParameter {
    pub name: String,
    pub value: f64,
    pub minimum: f64,
    pub maximum: f64,
}

/// A single integer parameter with its randomisation interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerParameter {
    pub name: String,
    pub value: i64,
    pub minimum: i64,
    pub maximum: i64,
}

/// Entry of an on-disk configuration document.
///
/// `value` decides the table: a JSON integer becomes an integer parameter,
/// anything with a fractional part or exponent becomes a double.
#[derive(Debug, Deserialize)]
struct ParameterEntry {
    name: String,
    value: serde_json::Number,
    #[serde(default)]
    minimum: Option<serde_json::Number>,
    #[serde(default)]
    maximum: Option<serde_json::Number>,
}

#[derive(Debug, Deserialize)]
struct ConfigurationDocument {
    parameters: Vec<ParameterEntry>,
}

/// The parameter set read by the grammar and the extruder.
///
/// Owned by the surrounding leaf-description system; read-only during a build.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LeafConfiguration {
    doubles: Vec<DoubleParameter>,
    integers: Vec<IntegerParameter>,
}

impl LeafConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document of the form
    /// `{"parameters": [{"name": "thickness", "value": 0.01, "minimum": 0.002, "maximum": 0.06}]}`.
    ///
    /// Entries are applied in order on top of an empty configuration.
    pub fn from_json_str(json: &str) -> LeafResult<Self> {
        let mut config = Self::new();
        config.apply_json_str(json)?;
        Ok(config)
    }

    /// Reads and parses a configuration document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> LeafResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LeafError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Applies a configuration document on top of the current values.
    ///
    /// Existing parameters are overwritten and their ranges replaced when the
    /// entry provides both bounds.
    pub fn apply_json_str(&mut self, json: &str) -> LeafResult<()> {
        let document: ConfigurationDocument = serde_json::from_str(json)?;

        for entry in document.parameters {
            if let Some(value) = entry.value.as_i64() {
                self.set_integer_parameter(&entry.name, value);
                if let (Some(min), Some(max)) = (
                    entry.minimum.as_ref().and_then(|n| n.as_i64()),
                    entry.maximum.as_ref().and_then(|n| n.as_i64()),
                ) {
                    self.set_integer_range(&entry.name, min, max)?;
                }
            } else {
                let value = entry.value.as_f64().ok_or_else(|| {
                    LeafError::InvalidConfiguration(format!(
                        "value of \"{}\" is not representable as a double",
                        entry.name
                    ))
                })?;
                self.set_parameter(&entry.name, value);
                if let (Some(min), Some(max)) = (
                    entry.minimum.as_ref().and_then(|n| n.as_f64()),
                    entry.maximum.as_ref().and_then(|n| n.as_f64()),
                ) {
                    self.set_range(&entry.name, min, max)?;
                }
            }
        }

        Ok(())
    }

    /// Sets a double parameter, creating it with the degenerate range `[value, value]`
    /// if it does not exist. An existing range is widened to include `value`.
    pub fn set_parameter(&mut self, name: &str, value: f64) {
        match self.doubles.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.value = value;
                p.minimum = p.minimum.min(value);
                p.maximum = p.maximum.max(value);
            }
            None => self.doubles.push(DoubleParameter {
                name: name.to_string(),
                value,
                minimum: value,
                maximum: value,
            }),
        }
    }

    /// Sets an integer parameter; same range semantics as [`set_parameter`](Self::set_parameter).
    pub fn set_integer_parameter(&mut self, name: &str, value: i64) {
        match self.integers.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.value = value;
                p.minimum = p.minimum.min(value);
                p.maximum = p.maximum.max(value);
            }
            None => self.integers.push(IntegerParameter {
                name: name.to_string(),
                value,
                minimum: value,
                maximum: value,
            }),
        }
    }

    /// Sets the randomisation interval of a double parameter.
    ///
    /// A missing parameter is created with its value at `min`. The current value
    /// of an existing parameter is clamped into the new interval. Bounds must be
    /// finite and their span representable.
    pub fn set_range(&mut self, name: &str, min: f64, max: f64) -> LeafResult<()> {
        check_double_range(name, min, max)?;

        match self.doubles.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.minimum = min;
                p.maximum = max;
                p.value = p.value.clamp(min, max);
            }
            None => self.doubles.push(DoubleParameter {
                name: name.to_string(),
                value: min,
                minimum: min,
                maximum: max,
            }),
        }
        Ok(())
    }

    /// Sets the randomisation interval of an integer parameter.
    pub fn set_integer_range(&mut self, name: &str, min: i64, max: i64) -> LeafResult<()> {
        check_integer_range(name, min, max)?;

        match self.integers.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.minimum = min;
                p.maximum = max;
                p.value = p.value.clamp(min, max);
            }
            None => self.integers.push(IntegerParameter {
                name: name.to_string(),
                value: min,
                minimum: min,
                maximum: max,
            }),
        }
        Ok(())
    }

    /// Current value of a double parameter.
    pub fn double(&self, name: &str) -> LeafResult<f64> {
        self.find_double(name).map(|p| p.value)
    }

    /// Current value of a double parameter, or `default` when it is not defined.
    pub fn double_or(&self, name: &str, default: f64) -> f64 {
        self.double(name).unwrap_or(default)
    }

    /// Current value of an integer parameter.
    pub fn integer(&self, name: &str) -> LeafResult<i64> {
        self.find_integer(name).map(|p| p.value)
    }

    /// Randomisation interval of a double parameter.
    pub fn range(&self, name: &str) -> LeafResult<(f64, f64)> {
        self.find_double(name).map(|p| (p.minimum, p.maximum))
    }

    /// Randomisation interval of an integer parameter.
    pub fn integer_range(&self, name: &str) -> LeafResult<(i64, i64)> {
        self.find_integer(name).map(|p| (p.minimum, p.maximum))
    }

    /// Double parameter names in insertion order.
    pub fn double_names(&self) -> impl Iterator<Item = &str> {
        self.doubles.iter().map(|p| p.name.as_str())
    }

    /// Integer parameter names in insertion order.
    pub fn integer_names(&self) -> impl Iterator<Item = &str> {
        self.integers.iter().map(|p| p.name.as_str())
    }

    /// Draws every parameter uniformly from its interval.
    ///
    /// The same seed on an identical configuration always yields identical values.
    /// Every interval is checked first; on error no value has been changed.
    pub fn randomize_parameters(&mut self, seed: u64) -> LeafResult<()> {
        for p in &self.doubles {
            check_double_range(&p.name, p.minimum, p.maximum)?;
        }
        for p in &self.integers {
            check_integer_range(&p.name, p.minimum, p.maximum)?;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        for p in &mut self.doubles {
            p.value = rng.gen_range(p.minimum..=p.maximum);
        }
        for p in &mut self.integers {
            p.value = rng.gen_range(p.minimum..=p.maximum);
        }
        Ok(())
    }

    /// Draws a single named parameter from its interval.
    ///
    /// If both a double and an integer parameter share `name`, both are redrawn.
    pub fn randomize_parameter(&mut self, seed: u64, name: &str) -> LeafResult<()> {
        let mut found = false;

        if let Some(p) = self.doubles.iter_mut().find(|p| p.name == name) {
            check_double_range(&p.name, p.minimum, p.maximum)?;
            let mut rng = StdRng::seed_from_u64(seed);
            p.value = rng.gen_range(p.minimum..=p.maximum);
            found = true;
        }
        if let Some(p) = self.integers.iter_mut().find(|p| p.name == name) {
            check_integer_range(&p.name, p.minimum, p.maximum)?;
            let mut rng = StdRng::seed_from_u64(seed);
            p.value = rng.gen_range(p.minimum..=p.maximum);
            found = true;
        }

        if found {
            Ok(())
        } else {
            Err(LeafError::MissingParameter {
                name: name.to_string(),
                kind: ParameterKind::Double,
            })
        }
    }

    /// Checks that every required parameter exists and lies inside its interval.
    pub fn validate(&self, required: &[(&str, ParameterKind)]) -> LeafResult<()> {
        for &(name, kind) in required {
            match kind {
                ParameterKind::Double => {
                    let p = self.find_double(name)?;
                    if !p.value.is_finite() || p.value < p.minimum || p.value > p.maximum {
                        return Err(LeafError::ParameterOutOfRange {
                            name: p.name.clone(),
                            value: p.value,
                            min: p.minimum,
                            max: p.maximum,
                        });
                    }
                }
                ParameterKind::Integer => {
                    let p = self.find_integer(name)?;
                    if p.value < p.minimum || p.value > p.maximum {
                        return Err(LeafError::ParameterOutOfRange {
                            name: p.name.clone(),
                            value: p.value as f64,
                            min: p.minimum as f64,
                            max: p.maximum as f64,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn find_double(&self, name: &str) -> LeafResult<&DoubleParameter> {
        self.doubles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| LeafError::MissingParameter {
                name: name.to_string(),
                kind: ParameterKind::Double,
            })
    }

    fn find_integer(&self, name: &str) -> LeafResult<&IntegerParameter> {
        self.integers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| LeafError::MissingParameter {
                name: name.to_string(),
                kind: ParameterKind::Integer,
            })
    }
}

/// An interval `gen_range` can draw from: finite, ordered, and with a span
/// that does not overflow once scaled by the sampler.
fn check_double_range(name: &str, min: f64, max: f64) -> LeafResult<()> {
    if !(min.is_finite() && max.is_finite()) {
        return Err(LeafError::InvalidConfiguration(format!(
            "range of \"{name}\" must be finite, got [{min}, {max}]"
        )));
    }
    if min > max {
        return Err(LeafError::InvalidConfiguration(format!(
            "range of \"{name}\" has minimum {min} above maximum {max}"
        )));
    }
    if !((max - min) / (1.0 - f64::EPSILON)).is_finite() {
        return Err(LeafError::InvalidConfiguration(format!(
            "range of \"{name}\" is too wide to sample: [{min}, {max}]"
        )));
    }
    Ok(())
}

fn check_integer_range(name: &str, min: i64, max: i64) -> LeafResult<()> {
    if min > max {
        return Err(LeafError::InvalidConfiguration(format!(
            "range of \"{name}\" has minimum {min} above maximum {max}"
        )));
    }
    Ok(())
}

impl std::fmt::Display for LeafConfiguration {
    /// Renders both tables with their current values and intervals.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name_width = self
            .doubles
            .iter()
            .map(|p| p.name.len())
            .chain(self.integers.iter().map(|p| p.name.len()))
            .fold(17, usize::max);
        let value_width = 10;
        let rule = "-".repeat(name_width + 3 * value_width + 13);

        writeln!(f, " {rule}")?;
        writeln!(
            f,
            " | {:>name_width$} : {:>value_width$} | {:>value_width$} | {:>value_width$} |",
            "Double Parameter", "Value", "Minimum", "Maximum"
        )?;
        writeln!(f, " {rule}")?;
        for p in &self.doubles {
            writeln!(
                f,
                " | {:>name_width$} : {:>value_width$} | {:>value_width$} | {:>value_width$} |",
                p.name, p.value, p.minimum, p.maximum
            )?;
        }
        writeln!(f, " {rule}")?;
        writeln!(
            f,
            " | {:>name_width$} : {:>value_width$} | {:>value_width$} | {:>value_width$} |",
            "Integer Parameter", "Value", "Minimum", "Maximum"
        )?;
        writeln!(f, " {rule}")?;
        for p in &self.integers {
            writeln!(
                f,
                " | {:>name_width$} : {:>value_width$} | {:>value_width$} | {:>value_width$} |",
                p.name, p.value, p.minimum, p.maximum
            )?;
        }
        writeln!(f, " {rule}")
    }
}
