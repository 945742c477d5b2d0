//! Which edge attribute a shortest-path search minimises.

use std::str::FromStr;

use crate::CoreError;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weight {
    /// Travel time in seconds (the default).
    #[default]
    Time,
    /// Edge length in metres.
    Distance,
}

impl Weight {
    /// Label used in logs and configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Weight::Time     => "time",
            Weight::Distance => "distance",
        }
    }
}

impl FromStr for Weight {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "time" | "travel_time" => Ok(Weight::Time),
            "distance" | "length"  => Ok(Weight::Distance),
            other => Err(CoreError::Parse(format!("unknown weight {other:?}"))),
        }
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
