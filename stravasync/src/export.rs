use serde::Serialize;
use std::path::Path;
use strava_api::endpoints::activities::SummaryActivity;

use crate::error::SyncError;

/// One CSV line. Field order is the column order of the export.
#[derive(Debug, Serialize)]
pub struct ActivityRow<'a> {
    id: u64,
    name: &'a str,
    distance: f64,
    moving_time: i64,
    elapsed_time: i64,
    total_elevation_gain: f64,
    #[serde(rename = "type")]
    activity_type: &'a str,
    start_date: String,
    start_date_local: String,
    timezone: Option<&'a str>,
    utc_offset: Option<f64>,
    location_city: Option<&'a str>,
    location_state: Option<&'a str>,
    location_country: Option<&'a str>,
    achievement_count: u32,
    kudos_count: u32,
    comment_count: u32,
    athlete_count: u32,
    photo_count: u32,
    map: Option<&'a str>,
    average_speed: f64,
    max_speed: f64,
    average_cadence: Option<f64>,
    average_temp: Option<f64>,
    average_watts: Option<f64>,
    weighted_average_watts: Option<f64>,
    kilojoules: Option<f64>,
    device_watts: Option<bool>,
    has_heartrate: bool,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
    pr_count: u32,
    total_photo_count: u32,
    has_kudoed: bool,
}

impl<'a> ActivityRow<'a> {
    pub fn from_model(activity: &'a SummaryActivity) -> Self {
        Self {
            id: activity.id.inner(),
            name: &activity.name,
            distance: activity.distance,
            moving_time: activity.moving_time,
            elapsed_time: activity.elapsed_time,
            total_elevation_gain: activity.total_elevation_gain,
            activity_type: &activity.activity_type,
            start_date: activity
                .start_date
                .format("%Y-%m-%d %H:%M:%S%:z")
                .to_string(),
            // Strava encodes local time with a `Z` suffix; it carries no offset
            start_date_local: activity
                .start_date_local
                .naive_utc()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            timezone: activity.timezone.as_deref(),
            utc_offset: activity.utc_offset,
            location_city: activity.location_city.as_deref(),
            location_state: activity.location_state.as_deref(),
            location_country: activity.location_country.as_deref(),
            achievement_count: activity.achievement_count,
            kudos_count: activity.kudos_count,
            comment_count: activity.comment_count,
            athlete_count: activity.athlete_count,
            photo_count: activity.photo_count,
            map: activity.map.summary_polyline.as_deref(),
            average_speed: activity.average_speed,
            max_speed: activity.max_speed,
            average_cadence: activity.average_cadence,
            average_temp: activity.average_temp,
            average_watts: activity.average_watts,
            weighted_average_watts: activity.weighted_average_watts,
            kilojoules: activity.kilojoules,
            device_watts: activity.device_watts,
            has_heartrate: activity.has_heartrate,
            average_heartrate: activity.average_heartrate,
            max_heartrate: activity.max_heartrate,
            pr_count: activity.pr_count,
            total_photo_count: activity.total_photo_count,
            has_kudoed: activity.has_kudoed,
        }
    }
}

/// Replace `path` with a header row plus one row per activity.
///
/// Parent directories are created. An empty activity list still produces
/// the header.
pub fn write_activities_csv(activities: &[SummaryActivity], path: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SyncError::export(parent, e))?;
    }

    let mut wtr = csv::Writer::from_path(path).map_err(|e| SyncError::export(path, e))?;

    if activities.is_empty() {
        // serde only emits headers together with the first record
        wtr.write_record(COLUMNS)
            .map_err(|e| SyncError::export(path, e))?;
    }
    for activity in activities {
        wtr.serialize(ActivityRow::from_model(activity))
            .map_err(|e| SyncError::export(path, e))?;
    }

    wtr.flush().map_err(|e| SyncError::export(path, e))?;
    tracing::info!(rows = activities.len(), path = %path.display(), "Activities exported");
    Ok(())
}

pub const COLUMNS: [&str; 34] = [
    "id",
    "name",
    "distance",
    "moving_time",
    "elapsed_time",
    "total_elevation_gain",
    "type",
    "start_date",
    "start_date_local",
    "timezone",
    "utc_offset",
    "location_city",
    "location_state",
    "location_country",
    "achievement_count",
    "kudos_count",
    "comment_count",
    "athlete_count",
    "photo_count",
    "map",
    "average_speed",
    "max_speed",
    "average_cadence",
    "average_temp",
    "average_watts",
    "weighted_average_watts",
    "kilojoules",
    "device_watts",
    "has_heartrate",
    "average_heartrate",
    "max_heartrate",
    "pr_count",
    "total_photo_count",
    "has_kudoed",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: u64, name: &str) -> SummaryActivity {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "distance": 10000.0,
            "moving_time": 3000,
            "elapsed_time": 3100,
            "total_elevation_gain": 42.5,
            "type": "Run",
            "start_date": "2024-03-10T08:00:00Z",
            "start_date_local": "2024-03-10T09:00:00Z",
            "timezone": "(GMT+01:00) Europe/Paris",
            "utc_offset": 3600.0,
            "map": {"id": "a1", "summary_polyline": "abc"},
            "average_speed": 3.33,
            "max_speed": 5.1,
            "has_heartrate": false
        }))
        .unwrap()
    }

    fn read(path: &Path) -> Vec<csv::StringRecord> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn header_follows_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        write_activities_csv(&[activity(1, "Morning Run")], &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, COLUMNS);
    }

    #[test]
    fn row_renders_values_and_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        write_activities_csv(&[activity(7, "Tempo, hard")], &path).unwrap();

        let rows = read(&path);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], "7");
        assert_eq!(&row[1], "Tempo, hard");
        assert_eq!(&row[6], "Run");
        assert_eq!(&row[7], "2024-03-10 08:00:00+00:00");
        assert_eq!(&row[8], "2024-03-10 09:00:00");
        assert_eq!(&row[11], "");
        assert_eq!(&row[19], "abc");
        assert_eq!(&row[22], "");
        assert_eq!(&row[28], "false");
    }

    #[test]
    fn second_export_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");

        write_activities_csv(&[activity(1, "a"), activity(2, "b"), activity(3, "c")], &path)
            .unwrap();
        write_activities_csv(&[activity(4, "d")], &path).unwrap();

        let rows = read(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "4");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("runs.csv");

        write_activities_csv(&[], &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), COLUMNS.len());
        assert_eq!(read(&path).len(), 0);
    }
}
