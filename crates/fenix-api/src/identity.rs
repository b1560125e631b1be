// Identity endpoint: refresh-token grant
//
// The token endpoint is not bearer-authorized. It expects the *current*
// access token as a Basic credential, and a form-encoded refresh grant.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::FenixClient;
use crate::error::Error;

/// Form body of `POST /connect/token`.
#[derive(Debug, Serialize)]
struct RefreshForm<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    refresh_token: &'a str,
}

/// Inputs to a refresh-token grant.
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub client_id: String,
}

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl FenixClient {
    /// Exchange a refresh token for a new token pair.
    ///
    /// `POST {identity}/connect/token`
    pub async fn refresh_token(&self, grant: &RefreshGrant) -> Result<TokenResponse, Error> {
        let url = self.identity_url("connect/token")?;
        debug!("POST {url} (refresh grant)");

        let form = RefreshForm {
            grant_type: "refresh_token",
            client_id: &grant.client_id,
            refresh_token: grant.refresh_token.expose_secret(),
        };

        let mut basic = reqwest::header::HeaderValue::from_str(&format!(
            "Basic {}",
            grant.access_token.expose_secret()
        ))
        .map_err(|e| Error::InvalidToken(e.to_string()))?;
        basic.set_sensitive(true);

        let resp = self
            .http()
            .post(url)
            .header(reqwest::header::AUTHORIZATION, basic)
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        self.handle_response(resp).await
    }
}
