//! Split strategy definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How cut points are chosen for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Cut every `target` seconds, ignoring content
    Fixed,
    /// Cut at the midpoint of the longest silence near each target
    #[default]
    Silence,
    /// Cut at the scene change closest to each target
    Scene,
    /// Pick scene, silence or fixed per file depending on what detection finds
    Smart,
}

impl SplitStrategy {
    pub const ALL: &'static [SplitStrategy] = &[
        SplitStrategy::Fixed,
        SplitStrategy::Silence,
        SplitStrategy::Scene,
        SplitStrategy::Smart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitStrategy::Fixed => "fixed",
            SplitStrategy::Silence => "silence",
            SplitStrategy::Scene => "scene",
            SplitStrategy::Smart => "smart",
        }
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitStrategy {
    type Err = StrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(SplitStrategy::Fixed),
            "silence" => Ok(SplitStrategy::Silence),
            "scene" => Ok(SplitStrategy::Scene),
            "smart" | "auto" => Ok(SplitStrategy::Smart),
            _ => Err(StrategyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown split strategy: {0}")]
pub struct StrategyParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips_display() {
        for strategy in SplitStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<SplitStrategy>().unwrap(), *strategy);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("SCENE".parse::<SplitStrategy>().unwrap(), SplitStrategy::Scene);
        assert_eq!("auto".parse::<SplitStrategy>().unwrap(), SplitStrategy::Smart);
        assert!("chapters".parse::<SplitStrategy>().is_err());
    }

}
