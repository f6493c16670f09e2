use strava_api::endpoints::{activities::SummaryActivity, athlete::Athlete};
use strava_api::{Client, Request};

use crate::error::SyncError;

/// Who the access token belongs to.
pub async fn authenticated_athlete(client: &Client) -> Result<Athlete, SyncError> {
    let athlete = client.send(Request::athlete().get()).await?;
    tracing::info!(athlete_id = %athlete.id, "Authenticated as {}", athlete.display_name());
    Ok(athlete)
}

/// Walk the activity list page by page and keep the activities of the
/// given types, in API order (newest first).
///
/// Paging stops at the first empty or short page.
pub async fn fetch_activities(
    client: &Client,
    per_page: u32,
    activity_types: &[String],
) -> Result<Vec<SummaryActivity>, SyncError> {
    let mut request = Request::activities().with_page_size(per_page).list();
    let mut kept = Vec::new();
    let mut seen = 0usize;

    loop {
        tracing::debug!(page = request.current_page(), "Fetching activities");
        let page = client.send(request.clone()).await?;
        let page_len = page.len();
        seen += page_len;

        kept.extend(
            page.into_iter()
                .filter(|activity| activity_types.iter().any(|t| activity.is_type(t))),
        );

        if page_len < request.page_size() as usize {
            break;
        }
        request = request.next_page();
    }

    tracing::info!(
        fetched = seen,
        kept = kept.len(),
        types = ?activity_types,
        "Loaded activities from API"
    );
    Ok(kept)
}
