//! HTTP Token Source Tests
//!
//! Tests for:
//! - Service principal client-credentials requests and error mapping
//! - Managed identity requests against IMDS and App Service endpoints

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sqlsso_token::{
    ManagedIdentityTokenSource, ServicePrincipalTokenSource, TokenError, TokenSource,
};

const SQL_AUDIENCE: &str = "https://database.windows.net/";
const PG_AUDIENCE: &str = "https://ossrdbms-aad.database.windows.net";

#[tokio::test]
async fn test_service_principal_requests_default_scope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app-id"))
        .and(body_string_contains("scope=https%3A%2F%2Fdatabase.windows.net%2F.default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "sp-token"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source =
        ServicePrincipalTokenSource::new(&mock_server.uri(), "contoso", "app-id", "s3cret");
    let token = source.acquire(SQL_AUDIENCE).await.unwrap();

    assert_eq!(token.secret(), "sp-token");
}

#[tokio::test]
async fn test_service_principal_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "sp-token"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let source =
        ServicePrincipalTokenSource::new(&mock_server.uri(), "contoso", "app-id", "s3cret");
    source.acquire(PG_AUDIENCE).await.unwrap();
    source.acquire(PG_AUDIENCE).await.unwrap();
}

#[tokio::test]
async fn test_service_principal_error_description_surfaces() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contoso/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&mock_server)
        .await;

    let source = ServicePrincipalTokenSource::new(&mock_server.uri(), "contoso", "app-id", "wrong");
    let err = source.acquire(SQL_AUDIENCE).await.unwrap_err();

    match err {
        TokenError::NoCredentials(message) => {
            assert!(message.contains("invalid_client"));
            assert!(message.contains("AADSTS7000215"));
            assert!(!message.contains("wrong"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_service_principal_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let source =
        ServicePrincipalTokenSource::new(&mock_server.uri(), "contoso", "app-id", "s3cret");
    let result = source.acquire(SQL_AUDIENCE).await;

    assert!(matches!(result, Err(TokenError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_imds_request_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/identity/oauth2/token"))
        .and(header("Metadata", "true"))
        .and(query_param("resource", PG_AUDIENCE))
        .and(query_param("api-version", "2018-02-01"))
        .and(query_param("client_id", "uami-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "mi-token",
            "expires_in": "86399",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = ManagedIdentityTokenSource::with_imds_endpoint(
        &format!("{}/metadata/identity/oauth2/token", mock_server.uri()),
        Some("uami-client".to_string()),
    );
    let token = source.acquire(PG_AUDIENCE).await.unwrap();

    assert_eq!(token.secret(), "mi-token");
}

#[tokio::test]
async fn test_app_service_identity_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/msi/token"))
        .and(header("X-IDENTITY-HEADER", "identity-secret"))
        .and(query_param("api-version", "2019-08-01"))
        .and(query_param("resource", SQL_AUDIENCE))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "app-service-token"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = ManagedIdentityTokenSource::with_app_service_endpoint(
        &format!("{}/msi/token", mock_server.uri()),
        "identity-secret",
        None,
    );
    let token = source.acquire(SQL_AUDIENCE).await.unwrap();

    assert_eq!(token.secret(), "app-service-token");
}

#[tokio::test]
async fn test_managed_identity_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Identity not found"))
        .mount(&mock_server)
        .await;

    let source = ManagedIdentityTokenSource::with_imds_endpoint(&mock_server.uri(), None);
    let result = source.acquire(SQL_AUDIENCE).await;

    assert!(matches!(result, Err(TokenError::NoCredentials(_))));
}
