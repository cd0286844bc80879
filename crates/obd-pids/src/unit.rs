//! Speed Unit Selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit used for the vehicle-speed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    /// Kilometres per hour (the raw OBD-II unit)
    Kmh,
    /// Miles per hour
    Mph,
}

impl SpeedUnit {
    /// Parse a collaborator-supplied unit string. Anything that is not
    /// recognizably mph falls back to km/h, the raw bus unit.
    pub fn parse(unit: &str) -> Self {
        match unit.trim().to_ascii_lowercase().as_str() {
            "mph" => SpeedUnit::Mph,
            _ => SpeedUnit::Kmh,
        }
    }
}

impl Default for SpeedUnit {
    fn default() -> Self {
        SpeedUnit::Kmh
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedUnit::Kmh => write!(f, "km/h"),
            SpeedUnit::Mph => write!(f, "mph"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(SpeedUnit::parse("mph"), SpeedUnit::Mph);
        assert_eq!(SpeedUnit::parse(" MPH "), SpeedUnit::Mph);
        assert_eq!(SpeedUnit::parse("km/h"), SpeedUnit::Kmh);
        assert_eq!(SpeedUnit::parse("furlongs"), SpeedUnit::Kmh);
    }

    #[test]
    fn test_display() {
        assert_eq!(SpeedUnit::Kmh.to_string(), "km/h");
        assert_eq!(SpeedUnit::Mph.to_string(), "mph");
    }
}
