use super::{ActivityId, MAX_PAGE_SIZE, MetaAthlete, PolylineMap};
use crate::macros::setter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Request, RequestData};

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryActivity {
    pub id: ActivityId,
    pub name: String,
    #[serde(default)]
    pub athlete: Option<MetaAthlete>,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: i64,
    /// Elapsed time in seconds
    pub elapsed_time: i64,
    /// Total elevation gain in meters
    #[serde(default)]
    pub total_elevation_gain: f64,
    /// Legacy activity type, e.g. `Run` or `Ride`
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub sport_type: Option<String>,
    pub start_date: DateTime<Utc>,
    /// Wall-clock start time at the activity's location. Strava encodes it
    /// with a `Z` suffix even though it is not UTC.
    pub start_date_local: DateTime<Utc>,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Offset from UTC in seconds
    #[serde(default)]
    pub utc_offset: Option<f64>,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_state: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,
    #[serde(default)]
    pub achievement_count: u32,
    #[serde(default)]
    pub kudos_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub athlete_count: u32,
    #[serde(default)]
    pub photo_count: u32,
    #[serde(default)]
    pub total_photo_count: u32,
    #[serde(default)]
    pub map: PolylineMap,
    /// Average speed in meters per second
    #[serde(default)]
    pub average_speed: f64,
    /// Max speed in meters per second
    #[serde(default)]
    pub max_speed: f64,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    /// Average temperature in degrees Celsius
    #[serde(default)]
    pub average_temp: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub weighted_average_watts: Option<f64>,
    #[serde(default)]
    pub kilojoules: Option<f64>,
    /// Whether the watts come from a power meter rather than an estimate
    #[serde(default)]
    pub device_watts: Option<bool>,
    #[serde(default)]
    pub has_heartrate: bool,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub pr_count: u32,
    #[serde(default)]
    pub has_kudoed: bool,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub private: bool,
}

impl SummaryActivity {
    pub fn is_type(&self, activity_type: &str) -> bool {
        self.activity_type.eq_ignore_ascii_case(activity_type)
    }
}

// Requests

#[derive(Debug, Clone, Serialize)]
pub struct ListActivities {
    /// Only activities that started before this epoch timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    before: Option<i64>,
    /// Only activities that started after this epoch timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<i64>,
    page: u32,
    per_page: u32,
}

impl Default for ListActivities {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
            page: 1,
            per_page: 30,
        }
    }
}

impl ListActivities {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(opt before: i64);
    setter!(opt after: i64);
    setter!(page: u32);

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.per_page
    }

    /// The same query, one page further.
    pub fn next_page(&self) -> Self {
        let mut next = self.clone();
        next.page += 1;
        next
    }
}

impl Request for ListActivities {
    type Data = Self;
    type Response = Vec<SummaryActivity>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/athlete/activities".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Query(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_page_is_clamped() {
        assert_eq!(ListActivities::new().per_page(500).page_size(), MAX_PAGE_SIZE);
        assert_eq!(ListActivities::new().per_page(0).page_size(), 1);
    }

    #[test]
    fn next_page_keeps_filters() {
        let request = ListActivities::new().after(1_700_000_000).per_page(50);
        let next = request.next_page();

        assert_eq!(next.current_page(), 2);
        assert_eq!(next.page_size(), 50);
        assert_eq!(next.after, Some(1_700_000_000));
        assert_eq!(next.before, None);
    }

    #[test]
    fn deserializes_sparse_activity() {
        let json = r#"{
            "id": 154504250376823,
            "name": "Morning Run",
            "distance": 5012.3,
            "moving_time": 1520,
            "elapsed_time": 1600,
            "type": "Run",
            "start_date": "2024-05-01T05:30:00Z",
            "start_date_local": "2024-05-01T07:30:00Z",
            "map": {"id": "a154504250376823", "summary_polyline": "ki{eFvqfiVqAWQIGEEKAYJgBVqDJ{BHa@jAkN"}
        }"#;

        let activity: SummaryActivity = serde_json::from_str(json).unwrap();

        assert_eq!(activity.id, ActivityId::from(154504250376823));
        assert!(activity.is_type("run"));
        assert_eq!(activity.kudos_count, 0);
        assert_eq!(activity.average_heartrate, None);
        assert!(activity.map.summary_polyline.is_some());
    }
}
