// Fenix cloud HTTP client
//
// Wraps `reqwest::Client` with base-URL handling for the two cloud hosts
// (business/IoT API and identity) plus status and body decoding. Endpoint
// groups (installations, thermostat, identity) are implemented as inherent
// methods in separate files to keep this module focused on transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Production business/IoT API host.
pub const DEFAULT_API_URL: &str = "https://vs2-fe-apim-prod.azure-api.net";

/// Production identity host (token endpoint).
pub const DEFAULT_IDENTITY_URL: &str = "https://vs2-fe-identity-prod.azurewebsites.net";

/// Base URLs of the two cloud surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api: Url,
    pub identity: Url,
}

impl Endpoints {
    pub fn new(api: &str, identity: &str) -> Result<Self, Error> {
        Ok(Self {
            api: Url::parse(api)?,
            identity: Url::parse(identity)?,
        })
    }

    /// The public production hosts.
    pub fn production() -> Result<Self, Error> {
        Self::new(DEFAULT_API_URL, DEFAULT_IDENTITY_URL)
    }

    /// Point both surfaces at the same host (mock servers, proxies).
    pub fn single(base: &str) -> Result<Self, Error> {
        Self::new(base, base)
    }
}

/// Raw HTTP client for the Fenix cloud.
///
/// Stateless with respect to credentials: every authorized call takes the
/// bearer token as an argument so the caller can rotate it freely.
#[derive(Debug, Clone)]
pub struct FenixClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl FenixClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(endpoints: Endpoints, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, endpoints })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{api}/{path}`
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        join(&self.endpoints.api, path)
    }

    /// `{identity}/{path}`
    pub(crate) fn identity_url(&self, path: &str) -> Result<Url, Error> {
        join(&self.endpoints.identity, path)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authorized GET, decoding the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &SecretString,
    ) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        self.handle_response(resp).await
    }

    /// Authorized PUT with a JSON body; the response body is discarded.
    pub(crate) async fn put_no_response<B: Serialize + Sync>(
        &self,
        url: Url,
        token: &SecretString,
        body: &B,
    ) -> Result<(), Error> {
        debug!("PUT {url}");

        let resp = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let resp = check_status(resp).await?;
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            let preview = preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    pub(crate) async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        check_status(resp).await.map(|_| ())
    }
}

fn join(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: if body.is_empty() {
                "bearer token rejected".into()
            } else {
                preview(&body).to_owned()
            },
        });
    }

    Err(Error::Api {
        status: status.as_u16(),
        message: preview(&body).to_owned(),
    })
}
