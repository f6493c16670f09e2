use async_trait::async_trait;
use std::io::Write;

use super::{extract_code, AuthorizationCodeSource, PromptError};
use crate::client::oauth_client::AuthorizationUrl;

/// Asks the user to paste the authorization code into the terminal.
pub struct ConsolePrompt {
    open_browser: bool,
}

impl ConsolePrompt {
    pub fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl AuthorizationCodeSource for ConsolePrompt {
    async fn obtain_authorization_code(
        &self,
        request: &AuthorizationUrl,
    ) -> Result<String, PromptError> {
        println!("\n=== Strava Authorization Required ===\n");
        println!("Go to the following URL to authenticate:");
        println!("{}\n", request.url);

        if self.open_browser {
            if let Err(e) = open::that(request.url.as_str()) {
                tracing::debug!(error = %e, "Could not open browser");
            }
        }

        println!("After approving, your browser is sent to {}.", request.redirect_uri);
        print!("Enter the authorization code from the URL (or paste the whole URL): ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            return Err(PromptError::EmptyInput);
        }

        extract_code(&input, &request.state)
    }
}
