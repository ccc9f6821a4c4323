//! Presence status enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use parlor_core::AppError;

/// Reachability status of a user.
///
/// `Online` and `Offline` are derived from the live connection set;
/// `Idle`, `Away` and `Dnd` are explicit choices that stick across
/// reconnects until changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Connected, no explicit status set.
    Online,
    /// Marked idle.
    Idle,
    /// Marked away.
    Away,
    /// Do not disturb.
    Dnd,
    /// No live connection.
    #[default]
    Offline,
}

impl PresenceStatus {
    /// Whether this is an explicit status that survives reconnects.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::Idle | Self::Away | Self::Dnd)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Away => "away",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "away" => Ok(Self::Away),
            "dnd" => Ok(Self::Dnd),
            "offline" => Ok(Self::Offline),
            _ => Err(AppError::validation(format!(
                "Invalid presence status: '{s}'. Expected one of: online, idle, away, dnd, offline"
            ))),
        }
    }
}
