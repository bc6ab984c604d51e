use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, Result};

pub const FILE_PREFIX: &str = "ASE_Evaluation_";
pub const FILE_SUFFIX: &str = ".csv";
pub const BASELINE_NAME: &str = "baseline";
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// One of the ranking features whose weight a run can vary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightParameter {
    RequiredType,
    ObjectOrigin,
    SurroundingExpression,
    EnclosingMethodReturnType,
    EnclosingMethodParameterSize,
    EnclosingMethodParameters,
    EnclosingMethodSuper,
}

impl WeightParameter {
    pub const ALL: [WeightParameter; 7] = [
        Self::RequiredType,
        Self::ObjectOrigin,
        Self::SurroundingExpression,
        Self::EnclosingMethodReturnType,
        Self::EnclosingMethodParameterSize,
        Self::EnclosingMethodParameters,
        Self::EnclosingMethodSuper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiredType => "requiredType",
            Self::ObjectOrigin => "objectOrigin",
            Self::SurroundingExpression => "surroundingExpression",
            Self::EnclosingMethodReturnType => "enclosingMethodReturnType",
            Self::EnclosingMethodParameterSize => "enclosingMethodParameterSize",
            Self::EnclosingMethodParameters => "enclosingMethodParameters",
            Self::EnclosingMethodSuper => "enclosingMethodSuper",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for WeightParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightParameter {
    type Err = EvaluationError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|parameter| parameter.as_str() == value)
            .ok_or_else(|| EvaluationError::invalid_identifier(value, "unknown weight parameter"))
    }
}

/// Weight configuration of a run, one value per [`WeightParameter`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
    values: [f64; 7],
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            values: [DEFAULT_WEIGHT; 7],
        }
    }
}

impl Weights {
    pub fn with(parameter: WeightParameter, weight: f64) -> Self {
        let mut weights = Self::default();
        weights.values[parameter.index()] = weight;
        weights
    }

    pub fn get(&self, parameter: WeightParameter) -> f64 {
        self.values[parameter.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeightParameter, f64)> + '_ {
        WeightParameter::ALL
            .into_iter()
            .map(move |parameter| (parameter, self.get(parameter)))
    }
}

impl Serialize for Weights {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (parameter, weight) in self.iter() {
            map.serialize_entry(parameter.as_str(), &weight)?;
        }
        map.end()
    }
}

/// Which configuration a run was evaluated with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunKind {
    Baseline,
    Variant {
        parameter: WeightParameter,
        weight: f64,
    },
}

impl RunKind {
    /// Parse a result file name such as `ASE_Evaluation_requiredType_0.5.csv`.
    ///
    /// The prefix and suffix are optional, so bare identifiers like
    /// `baseline` or `objectOrigin_2` are accepted too.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        Self::from_identifier(run_identifier(file_name))
    }

    pub fn from_identifier(identifier: &str) -> Result<Self> {
        if identifier == BASELINE_NAME {
            return Ok(Self::Baseline);
        }

        let (parameter, weight) = identifier.split_once('_').ok_or_else(|| {
            EvaluationError::invalid_identifier(identifier, "expected <parameter>_<weight>")
        })?;
        let parameter = parameter.parse::<WeightParameter>().map_err(|_| {
            EvaluationError::invalid_identifier(
                identifier,
                format!("unknown weight parameter '{parameter}'"),
            )
        })?;
        let weight = weight
            .parse::<f64>()
            .ok()
            .filter(|weight| weight.is_finite())
            .ok_or_else(|| {
                EvaluationError::invalid_identifier(
                    identifier,
                    format!("weight '{weight}' is not a number"),
                )
            })?;

        Ok(Self::Variant { parameter, weight })
    }

    /// `baseline` or the name of the varied parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Baseline => BASELINE_NAME,
            Self::Variant { parameter, .. } => parameter.as_str(),
        }
    }

    pub fn weights(&self) -> Weights {
        match *self {
            Self::Baseline => Weights::default(),
            Self::Variant { parameter, weight } => Weights::with(parameter, weight),
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::Baseline)
    }

    /// Canonical `baseline` or `<parameter>_<weight>` label. Runs loaded from
    /// disk keep the identifier text of their file name instead.
    pub fn label(&self) -> String {
        match self {
            Self::Baseline => BASELINE_NAME.to_string(),
            Self::Variant { parameter, weight } => format!("{parameter}_{weight:?}"),
        }
    }
}

/// The identifier inside a result file name, e.g. `requiredType_0.50` for
/// `ASE_Evaluation_requiredType_0.50.csv`. Prefix and suffix are optional.
pub fn run_identifier(file_name: &str) -> &str {
    let name = file_name.strip_prefix(FILE_PREFIX).unwrap_or(file_name);
    name.strip_suffix(FILE_SUFFIX).unwrap_or(name)
}
