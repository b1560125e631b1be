// ── Credential lifecycle ──
//
// Owns the bearer credential: predicts expiry from the decoded claims,
// exchanges the refresh token before the access token lapses, and persists
// every replacement. Readers get a consistent snapshot through `ArcSwap`;
// a refresh swaps in a whole new `Credential`, never a half-updated one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fenix_api::{FenixClient, RefreshGrant, TokenResponse};

use super::claims::{Credential, TokenClaims, duplicate};
use super::store::{CredentialStore, StoredCredential};
use crate::error::CoreError;

/// Default lead time before `exp` at which a refresh is attempted.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(3600);

// ── Token endpoint seam ──────────────────────────────────────────────

/// Anything that can run the refresh-token grant.
pub trait TokenEndpoint: Send + Sync {
    fn exchange(
        &self,
        grant: &RefreshGrant,
    ) -> impl Future<Output = Result<TokenResponse, fenix_api::Error>> + Send;
}

impl TokenEndpoint for FenixClient {
    fn exchange(
        &self,
        grant: &RefreshGrant,
    ) -> impl Future<Output = Result<TokenResponse, fenix_api::Error>> + Send {
        self.refresh_token(grant)
    }
}

impl<T: TokenEndpoint> TokenEndpoint for Arc<T> {
    fn exchange(
        &self,
        grant: &RefreshGrant,
    ) -> impl Future<Output = Result<TokenResponse, fenix_api::Error>> + Send {
        (**self).exchange(grant)
    }
}

// ── RefreshOutcome ───────────────────────────────────────────────────

/// What a call to [`CredentialManager::refresh_if_needed`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Token not near expiry, or no `client_id` claim to refresh with.
    Skipped,
    Refreshed,
    /// The exchange failed; the previous credential is still in place.
    Failed,
    /// Another refresh was already running.
    InFlight,
}

// ── CredentialManager ────────────────────────────────────────────────

pub struct CredentialManager<E> {
    credential: ArcSwap<Credential>,
    store: Box<dyn CredentialStore>,
    endpoint: E,
    skew: Duration,
    refreshing: Mutex<()>,
}

impl<E: TokenEndpoint> CredentialManager<E> {
    /// Create a manager seeded with a configured token pair. Nothing is read
    /// or written until [`initialize`](Self::initialize).
    pub fn new(
        seed_access: SecretString,
        seed_refresh: SecretString,
        store: Box<dyn CredentialStore>,
        endpoint: E,
    ) -> Self {
        Self {
            credential: ArcSwap::from_pointee(Credential::new(seed_access, seed_refresh)),
            store,
            endpoint,
            skew: DEFAULT_REFRESH_SKEW,
            refreshing: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Load the persisted pair, or persist the seed on first boot.
    ///
    /// Returns `CredentialDecode` if the resulting access token is not a JWT.
    /// The manager stays usable in that case: `current_token()` still hands
    /// out the undecodable token and every expiry check reports near expiry.
    pub fn initialize(&self) -> Result<(), CoreError> {
        match self.store.load() {
            Ok(Some(stored)) => {
                debug!("using persisted credentials");
                self.credential.store(Arc::new(Credential::new(
                    stored.access_token,
                    stored.refresh_token,
                )));
            }
            Ok(None) => {
                let seed = self.credential.load_full();
                info!("no persisted credentials, storing configured tokens");
                if let Err(e) = self.persist(&seed) {
                    warn!(error = %e, "could not persist initial credentials");
                }
            }
            Err(e) => {
                warn!(error = %e, "could not read persisted credentials, using configured tokens");
            }
        }

        let current = self.credential.load();
        if let Some(err) = current.decode_error() {
            warn!(error = %err, "access token could not be decoded, refresh disabled");
            return Err(err);
        }
        if let Some(expires) = current.claims().and_then(TokenClaims::expires_at_utc) {
            info!(expires_at = %expires, "credentials ready");
        }
        Ok(())
    }

    // ── Read access ──────────────────────────────────────────────────

    pub fn current_token(&self) -> SecretString {
        duplicate(self.credential.load().access_token())
    }

    pub fn claims(&self) -> Option<TokenClaims> {
        self.credential.load().claims().cloned()
    }

    pub fn subject_id(&self) -> Option<String> {
        self.claims().and_then(|c| c.subject_id)
    }

    pub fn skew(&self) -> Duration {
        self.skew
    }

    pub fn is_near_expiry(&self) -> bool {
        self.is_near_expiry_at(Utc::now())
    }

    /// `now + skew >= exp`. A credential without claims is always near expiry.
    pub fn is_near_expiry_at(&self, now: DateTime<Utc>) -> bool {
        let skew = i64::try_from(self.skew.as_secs()).unwrap_or(i64::MAX);
        self.credential
            .load()
            .claims()
            .is_none_or(|c| now.timestamp().saturating_add(skew) >= c.expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.credential
            .load()
            .claims()
            .is_none_or(|c| Utc::now().timestamp() >= c.expires_at)
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Exchange the refresh token if the access token is near expiry.
    ///
    /// Failures are logged and leave the current credential untouched; the
    /// next scheduled check tries again.
    pub async fn refresh_if_needed(&self) -> RefreshOutcome {
        let Ok(_guard) = self.refreshing.try_lock() else {
            debug!("token refresh already in flight");
            return RefreshOutcome::InFlight;
        };

        if !self.is_near_expiry() {
            debug!("access token not near expiry");
            return RefreshOutcome::Skipped;
        }

        let current = self.credential.load_full();
        let Some(client_id) = current.claims().and_then(|c| c.client_id.clone()) else {
            warn!("access token has no client_id claim, cannot refresh");
            return RefreshOutcome::Skipped;
        };

        let grant = RefreshGrant {
            access_token: duplicate(current.access_token()),
            refresh_token: duplicate(current.refresh_token()),
            client_id,
        };

        match self.endpoint.exchange(&grant).await {
            Ok(tokens) => {
                let next = Arc::new(Credential::new(tokens.access_token, tokens.refresh_token));
                if let Some(err) = next.decode_error() {
                    warn!(error = %err, "refreshed access token could not be decoded");
                }
                self.credential.store(Arc::clone(&next));
                if let Err(e) = self.persist(&next) {
                    warn!(error = %e, "refreshed credentials not persisted");
                }
                info!("access token refreshed");
                RefreshOutcome::Refreshed
            }
            Err(source) => {
                let err = CoreError::Refresh {
                    message: source.to_string(),
                    source: Some(source),
                };
                warn!(error = %err, "token refresh failed, keeping current credentials");
                RefreshOutcome::Failed
            }
        }
    }

    fn persist(&self, credential: &Credential) -> Result<(), CoreError> {
        self.store.save(&StoredCredential {
            access_token: duplicate(credential.access_token()),
            refresh_token: duplicate(credential.refresh_token()),
        })
    }
}
