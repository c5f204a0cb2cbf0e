//! Bar timeframes and their annualization factors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regular US equity session length.
const SESSION_MINUTES: u32 = 390;
const SESSIONS_PER_YEAR: f64 = 252.0;

/// Spacing of the bars fed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    #[default]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Timeframe {
    /// Short label, identical to the serde name.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1mo",
        }
    }

    /// Bar length in minutes for frames shorter than a session.
    pub fn intraday_minutes(&self) -> Option<u32> {
        match self {
            Timeframe::Minute1 => Some(1),
            Timeframe::Minute5 => Some(5),
            Timeframe::Minute15 => Some(15),
            Timeframe::Minute30 => Some(30),
            Timeframe::Hour1 => Some(60),
            _ => None,
        }
    }

    /// Bars per year, used to annualize per-bar ratios.
    ///
    /// Intraday frames count bars inside 252 sessions of 6.5 hours; a
    /// 4-hour frame splits each session in two.
    pub fn periods_per_year(&self) -> f64 {
        if let Some(minutes) = self.intraday_minutes() {
            return SESSIONS_PER_YEAR * f64::from(SESSION_MINUTES / minutes);
        }
        match self {
            Timeframe::Hour4 => SESSIONS_PER_YEAR * 2.0,
            Timeframe::Weekly => 52.0,
            Timeframe::Monthly => 12.0,
            _ => SESSIONS_PER_YEAR,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "1min" | "minute" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "30m" | "30min" => Ok(Timeframe::Minute30),
            "1h" | "60m" | "hour" => Ok(Timeframe::Hour1),
            "4h" => Ok(Timeframe::Hour4),
            "1d" | "day" | "daily" => Ok(Timeframe::Daily),
            "1w" | "week" | "weekly" => Ok(Timeframe::Weekly),
            "1mo" | "month" | "monthly" => Ok(Timeframe::Monthly),
            other => Err(format!("Unknown timeframe '{other}'")),
        }
    }
}
