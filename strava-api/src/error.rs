use serde::{Deserialize, Serialize};
use tower_api_client::{Error as ApiError, StatusCode};

#[derive(Debug)]
pub enum StravaApiError {
    Strava(StatusCode, Fault),
    Internal(ApiError),
}

impl StravaApiError {
    /// HTTP status returned by Strava, if the request reached it.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StravaApiError::Strava(status, _) => Some(*status),
            StravaApiError::Internal(_) => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

impl From<ApiError> for StravaApiError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::ClientError(status, body) | ApiError::ServerError(status, body) => {
                // Strava answers most failures with a Fault body, but proxies and
                // rate limiters in front of it may not.
                let fault = serde_json::from_str::<Fault>(&body).unwrap_or(Fault {
                    message: body,
                    errors: Vec::new(),
                });
                StravaApiError::Strava(status, fault)
            }
            e => StravaApiError::Internal(e),
        }
    }
}

impl std::fmt::Display for StravaApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StravaApiError::Internal(e) => write!(f, "Internal error: {}", e),
            StravaApiError::Strava(status, fault) => {
                write!(f, "({}) {}", status, fault.message)?;
                for detail in &fault.errors {
                    write!(f, "; {}.{}: {}", detail.resource, detail.field, detail.code)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for StravaApiError {}

/// Error body returned by the Strava API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    pub message: String,
    #[serde(default)]
    pub errors: Vec<FaultDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultDetail {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub code: String,
}
