pub mod activities;
pub mod athlete;

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Largest page Strava serves for list endpoints.
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityId(u64);

impl ActivityId {
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ActivityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ActivityId> for u64 {
    fn from(value: ActivityId) -> Self {
        value.0
    }
}

impl Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AthleteId(u64);

impl AthleteId {
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl From<u64> for AthleteId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for AthleteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to an athlete embedded in other resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAthlete {
    pub id: AthleteId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolylineMap {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub summary_polyline: Option<String>,
    #[serde(default)]
    pub polyline: Option<String>,
}
