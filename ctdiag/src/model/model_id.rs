use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

const KIDNEY_LABELS: [&str; 4] = ["Cyst", "Normal", "Stone", "Tumor"];
const CHEST_LABELS: [&str; 4] = [
    "Adenocarcinoma",
    "Large cell carcinoma",
    "Normal",
    "Squamous cell carcinoma",
];

/// The closed set of diagnosis models the crate knows how to serve.
///
/// Every variant carries its label set and weight file stem, so no string
/// key can reach the loader without first being parsed into a variant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ModelId {
    Kidney,
    Chest,
}

impl ModelId {
    pub const COUNT: usize = 2;
    pub const ALL: [ModelId; Self::COUNT] = [ModelId::Kidney, ModelId::Chest];

    /// Position of the variant in [`ModelId::ALL`].
    pub fn index(&self) -> usize {
        match self {
            ModelId::Kidney => 0,
            ModelId::Chest => 1,
        }
    }

    /// Class names in the order of the network's output dimension.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            ModelId::Kidney => &KIDNEY_LABELS,
            ModelId::Chest => &CHEST_LABELS,
        }
    }

    pub fn num_labels(&self) -> usize {
        self.labels().len()
    }

    /// File stem of the persisted weights, e.g. `kidney_diagnose`.
    pub fn weights_stem(&self) -> &'static str {
        match self {
            ModelId::Kidney => "kidney_diagnose",
            ModelId::Chest => "chest_diagnose",
        }
    }

    pub fn weights_file_name(&self) -> String {
        format!("{}.safetensors", self.weights_stem())
    }

    /// Short name used for routes and on the command line.
    pub fn route_name(&self) -> &'static str {
        match self {
            ModelId::Kidney => "kidney",
            ModelId::Chest => "chest",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.route_name())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ModelId::ALL
            .into_iter()
            .find(|model| {
                normalized == model.route_name()
                    || normalized == model.weights_stem()
            })
            .ok_or_else(|| Error::UnknownModel(value.to_string()))
    }
}
