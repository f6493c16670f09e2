use secrecy::SecretString;
use strava_api::{Client, Request, StravaApiError};

#[tokio::main]
pub async fn main() -> Result<(), StravaApiError> {
    let token = SecretString::from(std::env::var("STRAVA_ACCESS_TOKEN").unwrap_or_default());
    let client = Client::new(&token);

    let athlete = client.send(Request::athlete().get()).await?;
    println!("Authenticated as {}", athlete.display_name());

    let req = Request::activities().with_page_size(10).list();
    for activity in client.send(req).await? {
        println!("{} {} {:.0}m", activity.id, activity.name, activity.distance);
    }
    Ok(())
}
