#![allow(clippy::unwrap_used)]
// Integration tests for `FenixClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fenix_api::{Endpoints, Error, FenixClient, RefreshGrant};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FenixClient) {
    let server = MockServer::start().await;
    let client = FenixClient::with_client(
        reqwest::Client::new(),
        Endpoints::single(&server.uri()).unwrap(),
    );
    (server, client)
}

fn token() -> SecretString {
    SecretString::from("access-abc".to_string())
}

// ── Installations ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sensors_flattens_homes_and_rooms() {
    let (server, client) = setup().await;

    let body = json!([
        {
            "rooms": [
                { "sensors": [ { "S1": "dev-1", "S2": "Bathroom" } ] },
                { "sensors": [
                    { "S1": "dev-2", "S2": "Kitchen" },
                    { "S1": "dev-3", "S2": "Hall" }
                ] }
            ]
        },
        { "rooms": [] }
    ]);

    Mock::given(method("GET"))
        .and(path("/businessmodule/v1/installations/admins/user-42"))
        .and(header("authorization", "Bearer access-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let sensors = client.list_sensors(&token(), "user-42").await.unwrap();

    let ids: Vec<&str> = sensors.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["dev-1", "dev-2", "dev-3"]);
    assert_eq!(sensors[1].name, "Kitchen");
}

#[tokio::test]
async fn test_list_sensors_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/businessmodule/v1/installations/admins/user-42"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_sensors(&token(), "user-42").await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

// ── Thermostat content ──────────────────────────────────────────────

#[tokio::test]
async fn test_get_thermostat_content() {
    let (server, client) = setup().await;

    let body = json!({
        "At": { "value": 500, "divFactor": 10 },
        "Sp": { "value": 550, "divFactor": 10 },
        "Dm": { "value": 1 },
        "Ty": { "value": "TFT" },
        "Sv": { "value": "1.2.3" }
    });

    Mock::given(method("GET"))
        .and(path("/iotmanagement/v1/configuration/dev-1/dev-1/v1.0/content"))
        .and(header("authorization", "Bearer access-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let content = client.get_thermostat(&token(), "dev-1").await.unwrap();
    assert!((content.actual.scaled() - 50.0).abs() < 1e-9);
    assert!((content.setpoint.scaled() - 55.0).abs() < 1e-9);
    assert_eq!(content.mode.as_i64(), Some(1));
    assert_eq!(content.software_version.as_text(), "1.2.3");
}

#[tokio::test]
async fn test_get_thermostat_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/iotmanagement/v1/configuration/dev-1/dev-1/v1.0/content"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"At\": 3}"))
        .mount(&server)
        .await;

    let result = client.get_thermostat(&token(), "dev-1").await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

#[tokio::test]
async fn test_get_thermostat_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/iotmanagement/v1/configuration/dev-1/dev-1/v1.0/content"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.get_thermostat(&token(), "dev-1").await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.status(), Some(503));
}

// ── Config writes ───────────────────────────────────────────────────

#[tokio::test]
async fn test_set_setpoint_sends_manual_mode_and_tenths() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/iotmanagement/v1/devices/twin/properties/config/replace"))
        .and(header("authorization", "Bearer access-abc"))
        .and(body_json(json!({
            "Id_deviceId": "dev-1",
            "S1": "dev-1",
            "configurationVersion": "v1.0",
            "data": [
                { "timestamp": null, "wattsType": "Dm", "wattsTypeValue": 6 },
                { "timestamp": null, "wattsType": "Ma", "wattsTypeValue": 680 }
            ]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_setpoint(&token(), "dev-1", 68.0).await.unwrap();
}

#[tokio::test]
async fn test_set_mode_code_sends_single_entry() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/iotmanagement/v1/devices/twin/properties/config/replace"))
        .and(body_json(json!({
            "Id_deviceId": "dev-9",
            "S1": "dev-9",
            "configurationVersion": "v1.0",
            "data": [ { "timestamp": null, "wattsType": "Dm", "wattsTypeValue": 0 } ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.set_mode_code(&token(), "dev-9", 0).await.unwrap();
}

// ── Token endpoint ──────────────────────────────────────────────────

fn grant() -> RefreshGrant {
    RefreshGrant {
        access_token: token(),
        refresh_token: SecretString::from("refresh-xyz".to_string()),
        client_id: "app-client".into(),
    }
}

#[tokio::test]
async fn test_refresh_token_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(header("authorization", "Basic access-abc"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("client_id=app-client"))
        .and(body_string_contains("refresh_token=refresh-xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client.refresh_token(&grant()).await.unwrap();
    assert_eq!(tokens.access_token.expose_secret(), "new-access");
    assert_eq!(tokens.refresh_token.expose_secret(), "new-refresh");
    assert_eq!(tokens.expires_in, Some(3600));
}

#[tokio::test]
async fn test_refresh_token_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("{\"error\":\"invalid_grant\"}"))
        .mount(&server)
        .await;

    let result = client.refresh_token(&grant()).await;
    assert!(
        matches!(result, Err(Error::TokenExchange { status: 400, .. })),
        "expected TokenExchange error, got: {result:?}"
    );
}
