use super::AthleteId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Request, RequestData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: AthleteId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Athlete {
    pub fn display_name(&self) -> String {
        match (&self.firstname, &self.lastname) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self
                .username
                .clone()
                .unwrap_or_else(|| format!("athlete {}", self.id)),
        }
    }
}

/// The currently authenticated athlete.
#[derive(Default, Debug, Clone, Serialize)]
pub struct GetAthlete;

impl Request for GetAthlete {
    type Data = ();
    type Response = Athlete;

    fn endpoint(&self) -> Cow<'_, str> {
        "/athlete".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Empty
    }
}
