//! `fenix token`: inspect the stored access token and refresh it on demand.

use chrono::{DateTime, Utc};
use serde::Serialize;

use fenix_core::{FenixCredentials, RefreshOutcome};

use crate::cli::{GlobalOpts, TokenArgs, TokenCommand};
use crate::error::CliError;
use crate::output;

use super::connect;

#[derive(Debug, Serialize)]
struct TokenStatus {
    decodable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    near_expiry: bool,
    expired: bool,
    refresh_skew_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh: Option<&'static str>,
}

impl TokenStatus {
    fn read(credentials: &FenixCredentials) -> Self {
        let claims = credentials.claims();
        Self {
            decodable: claims.is_some(),
            subject_id: claims.as_ref().and_then(|c| c.subject_id.clone()),
            client_id: claims.as_ref().and_then(|c| c.client_id.clone()),
            expires_at: claims.as_ref().and_then(|c| c.expires_at_utc()),
            near_expiry: credentials.is_near_expiry(),
            expired: credentials.is_expired(),
            refresh_skew_secs: credentials.skew().as_secs(),
            refresh: None,
        }
    }
}

fn outcome_label(outcome: RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::Skipped => "not needed",
        RefreshOutcome::Refreshed => "refreshed",
        RefreshOutcome::Failed => "failed",
        RefreshOutcome::InFlight => "already in progress",
    }
}

fn detail(status: &TokenStatus) -> String {
    let or_dash = |v: Option<&str>| v.unwrap_or("-").to_owned();
    let mut lines = vec![
        format!("Decodable:    {}", status.decodable),
        format!("Subject:      {}", or_dash(status.subject_id.as_deref())),
        format!("Client:       {}", or_dash(status.client_id.as_deref())),
        format!(
            "Expires:      {}",
            status
                .expires_at
                .map_or_else(|| "-".to_owned(), |t| t.to_rfc3339())
        ),
        format!("Near expiry:  {}", status.near_expiry),
        format!("Expired:      {}", status.expired),
        format!("Refresh skew: {}s", status.refresh_skew_secs),
    ];
    if let Some(refresh) = status.refresh {
        lines.push(format!("Refresh:      {refresh}"));
    }
    lines.join("\n")
}

pub async fn handle(args: TokenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (session, _) = connect(global)?;
    let credentials = session.credentials();

    let refresh = match args.command.unwrap_or(TokenCommand::Show) {
        TokenCommand::Show => None,
        TokenCommand::Refresh => Some(credentials.refresh_if_needed().await),
    };

    let mut status = TokenStatus::read(credentials);
    status.refresh = refresh.map(outcome_label);

    let out = output::render_single(&global.output, &status, detail, |s| {
        s.expires_at.map(|t| t.to_rfc3339()).unwrap_or_default()
    })?;
    output::print_output(&out, global.quiet);

    if refresh == Some(RefreshOutcome::Failed) {
        return Err(CliError::AuthFailed {
            source: fenix_core::CoreError::Refresh {
                message: "the identity endpoint rejected the refresh token".into(),
                source: None,
            },
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_marks_missing_claims() {
        let status = TokenStatus {
            decodable: false,
            subject_id: None,
            client_id: None,
            expires_at: None,
            near_expiry: true,
            expired: true,
            refresh_skew_secs: 3600,
            refresh: Some(outcome_label(RefreshOutcome::Skipped)),
        };
        let text = detail(&status);
        assert!(text.contains("Subject:      -"));
        assert!(text.contains("Refresh skew: 3600s"));
        assert!(text.contains("Refresh:      not needed"));
    }
}
