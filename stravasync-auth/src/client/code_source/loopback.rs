use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use super::{AuthorizationCodeSource, PromptError, RedirectParams};
use crate::client::oauth_client::AuthorizationUrl;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Authorization Successful</title>
    <style>
        body {
            margin: 0;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
            background: #FC4C02;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
        }
        .container {
            background: white;
            border-radius: 12px;
            padding: 48px;
            text-align: center;
            max-width: 400px;
        }
        h1 { color: #1F2937; font-size: 24px; }
        p { color: #6B7280; line-height: 1.5; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Authorization Successful</h1>
        <p>stravasync can now read your activities. You can close this window and return to your terminal.</p>
    </div>
</body>
</html>"#;

const ERROR_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Authorization Failed</title>
    <style>
        body {
            margin: 0;
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
            background: #1F2937;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
        }
        .container {
            background: white;
            border-radius: 12px;
            padding: 48px;
            text-align: center;
            max-width: 400px;
        }
        h1 { color: #1F2937; font-size: 24px; }
        .error-details {
            background: #FEE2E2;
            border-radius: 8px;
            padding: 16px;
            color: #991B1B;
            font-family: monospace;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Authorization Failed</h1>
        <div class="error-details">{ERROR}</div>
        <p>Close this window and run stravasync again.</p>
    </div>
</body>
</html>"#;

type CodeResult = Result<String, PromptError>;

#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<CodeResult>>>>,
    expected_state: Arc<str>,
}

/// Listens on the redirect URI and captures the authorization code from the
/// provider's callback.
pub struct LoopbackReceiver {
    timeout: Duration,
    open_browser: bool,
}

impl LoopbackReceiver {
    pub fn new(timeout: Duration, open_browser: bool) -> Self {
        Self {
            timeout,
            open_browser,
        }
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn oauth_callback(
    State(callback): State<CallbackState>,
    Query(params): Query<RedirectParams>,
) -> Html<String> {
    let outcome = params.into_code(&callback.expected_state);
    let page = match &outcome {
        Ok(_) => SUCCESS_HTML.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "OAuth callback rejected");
            ERROR_HTML_TEMPLATE.replace("{ERROR}", &escape_html(&e.to_string()))
        }
    };

    // Only the first callback counts
    let pending = callback.sender.lock().ok().and_then(|mut slot| slot.take());
    if let Some(tx) = pending {
        let _ = tx.send(outcome);
    }

    Html(page)
}

#[async_trait]
impl AuthorizationCodeSource for LoopbackReceiver {
    async fn obtain_authorization_code(
        &self,
        request: &AuthorizationUrl,
    ) -> Result<String, PromptError> {
        let redirect = &request.redirect_uri;
        let host = redirect
            .host_str()
            .ok_or_else(|| PromptError::Listener(format!("no host in {}", redirect)))?
            .to_string();
        let port = redirect
            .port_or_known_default()
            .ok_or_else(|| PromptError::Listener(format!("no port in {}", redirect)))?;

        let listener = tokio::net::TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| PromptError::Listener(format!("cannot bind {}:{}: {}", host, port, e)))?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route(redirect.path(), get(oauth_callback))
            .layer(TraceLayer::new_for_http())
            .with_state(CallbackState {
                sender: Arc::new(Mutex::new(Some(code_tx))),
                expected_state: Arc::from(request.state.as_str()),
            });

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(%host, port, "Waiting for authorization redirect");
        println!("\n=== Strava Authorization Required ===\n");
        println!("Open this URL in your browser to authorize stravasync:");
        println!("{}\n", request.url);

        if self.open_browser {
            if let Err(e) = open::that(request.url.as_str()) {
                tracing::debug!(error = %e, "Could not open browser");
            }
        }

        let outcome = tokio::time::timeout(self.timeout, code_rx).await;

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
            tracing::debug!("Redirect listener did not shut down in time");
        }

        match outcome {
            Err(_) => Err(PromptError::Timeout(self.timeout.as_secs())),
            Ok(Err(_)) => Err(PromptError::Listener(
                "listener stopped before the redirect arrived".to_string(),
            )),
            Ok(Ok(code)) => code,
        }
    }
}
