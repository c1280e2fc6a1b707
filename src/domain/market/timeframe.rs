use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecast horizon requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl Timeframe {
    /// Returns the horizon length in days
    pub fn to_days(&self) -> u32 {
        match self {
            Timeframe::OneDay => 1,
            Timeframe::SevenDays => 7,
            Timeframe::ThirtyDays => 30,
        }
    }

    /// Wire representation, as accepted in requests
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneDay => "1d",
            Timeframe::SevenDays => "7d",
            Timeframe::ThirtyDays => "30d",
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1d" => Ok(Timeframe::OneDay),
            "7d" => Ok(Timeframe::SevenDays),
            "30d" => Ok(Timeframe::ThirtyDays),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: 1d, 7d, 30d",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_days() {
        assert_eq!(Timeframe::OneDay.to_days(), 1);
        assert_eq!(Timeframe::SevenDays.to_days(), 7);
        assert_eq!(Timeframe::ThirtyDays.to_days(), 30);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("1d").unwrap(), Timeframe::OneDay);
        assert_eq!(Timeframe::from_str("7D").unwrap(), Timeframe::SevenDays);
        assert_eq!(Timeframe::from_str("30d").unwrap(), Timeframe::ThirtyDays);
        assert!(Timeframe::from_str("1h").is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Timeframe::SevenDays).unwrap();
        assert_eq!(json, "\"7d\"");

        let parsed: Timeframe = serde_json::from_str("\"30d\"").unwrap();
        assert_eq!(parsed, Timeframe::ThirtyDays);
        assert!(serde_json::from_str::<Timeframe>("\"90d\"").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for tf in [Timeframe::OneDay, Timeframe::SevenDays, Timeframe::ThirtyDays] {
            assert_eq!(Timeframe::from_str(&tf.to_string()).unwrap(), tf);
        }
    }
}
