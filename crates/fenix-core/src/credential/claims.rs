// ── Access-token claims ──
//
// The access token is a JWT. Only its payload is read; the signature is not
// verified because the token is only ever sent back to the issuer.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::CoreError;

/// Claims the bridge relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry, epoch seconds.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "sub", default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT.
    pub fn decode(token: &str) -> Result<Self, CoreError> {
        let payload = token.split('.').nth(1).ok_or_else(|| CoreError::CredentialDecode {
            reason: "missing payload segment".into(),
        })?;
        // Some issuers pad the segment even though JWTs should not.
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| CoreError::CredentialDecode {
                reason: format!("payload is not base64url: {e}"),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| CoreError::CredentialDecode {
            reason: format!("payload is not a claims object: {e}"),
        })
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }
}

/// The bearer credential pair plus the claims decoded from it.
///
/// Claims are always derived from `access_token`; there is no way to set them
/// independently. A token that does not decode yields a degraded credential
/// which still carries the tokens but has no claims.
#[derive(Debug)]
pub struct Credential {
    access_token: SecretString,
    refresh_token: SecretString,
    claims: Result<TokenClaims, String>,
}

impl Credential {
    pub fn new(access_token: SecretString, refresh_token: SecretString) -> Self {
        let claims = TokenClaims::decode(access_token.expose_secret()).map_err(|e| match e {
            CoreError::CredentialDecode { reason } => reason,
            other => other.to_string(),
        });
        Self {
            access_token,
            refresh_token,
            claims,
        }
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    pub fn claims(&self) -> Option<&TokenClaims> {
        self.claims.as_ref().ok()
    }

    pub fn is_degraded(&self) -> bool {
        self.claims.is_err()
    }

    /// The decode error of a degraded credential.
    pub fn decode_error(&self) -> Option<CoreError> {
        self.claims
            .as_ref()
            .err()
            .map(|reason| CoreError::CredentialDecode {
                reason: reason.clone(),
            })
    }
}

/// Copy a secret without routing it through `Debug` or `Display`.
pub(crate) fn duplicate(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}
