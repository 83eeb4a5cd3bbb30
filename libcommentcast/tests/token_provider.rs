//! Token provider behaviour against a stubbed OAuth endpoint

use std::time::Duration;

use anyhow::Result;
use libcommentcast::error::TokenError;
use libcommentcast::token::{AccessTokenSource, TokenProvider, TokenRecord, TokenStore};
use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/oauth/token";

fn provider(server: &MockServer, store: TokenStore) -> TokenProvider {
    TokenProvider::new(
        reqwest::Client::new(),
        format!("{}{}", server.uri(), TOKEN_PATH),
        "id",
        SecretString::from("secret".to_string()),
        store,
    )
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 3600,
        "scope": "",
        "token_type": "bearer"
    })
}

async fn mount_mint(server: &MockServer, access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", "Basic aWQ6c2VjcmV0"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access, "minted-refresh")))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mint_when_store_is_empty() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let store = TokenStore::new(dir.path().join("keys.json"));
    mount_mint(&server, "minted-access", 1).await;

    let before = now_millis();
    let token = provider(&server, store.clone()).access_token().await?;
    let after = now_millis();

    assert_eq!(token, "minted-access");
    let stored = store.load()?.expect("token pair persisted");
    assert_eq!(stored.access_token, "minted-access");
    assert_eq!(stored.refresh_token, "minted-refresh");
    assert!(stored.expires_at_millis >= before + 3_600_000);
    assert!(stored.expires_at_millis <= after + 3_600_000);
    Ok(())
}

#[tokio::test]
async fn test_cache_hit_never_mints_again() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    mount_mint(&server, "minted-access", 1).await;

    let provider = provider(&server, TokenStore::new(dir.path().join("keys.json")));
    for _ in 0..3 {
        assert_eq!(provider.access_token().await?, "minted-access");
    }
    Ok(())
}

#[tokio::test]
async fn test_valid_stored_token_needs_no_network() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let store = TokenStore::new(dir.path().join("keys.json"));
    store.save(&TokenRecord {
        access_token: "stored-access".to_string(),
        refresh_token: "stored-refresh".to_string(),
        expires_at_millis: now_millis() + 3_600_000,
    })?;

    let token = provider(&server, store).access_token().await?;

    assert_eq!(token, "stored-access");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_replaced() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let store = TokenStore::new(dir.path().join("keys.json"));
    store.save(&TokenRecord {
        access_token: "old-access".to_string(),
        refresh_token: "old-refresh".to_string(),
        expires_at_millis: now_millis() - 1_000,
    })?;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .and(body_string_contains("client_id=id"))
        .and(body_string_contains("client_secret=secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new-access", "new-refresh")))
        .expect(1)
        .mount(&server)
        .await;

    let before = now_millis();
    let token = provider(&server, store.clone()).access_token().await?;

    assert_eq!(token, "new-access");
    let stored = store.load()?.expect("token pair persisted");
    assert_eq!(stored.access_token, "new-access");
    assert_eq!(stored.refresh_token, "new-refresh");
    assert!(stored.expires_at_millis >= before + 3_600_000);

    let raw = std::fs::read_to_string(store.path())?;
    assert!(!raw.contains("old-access"));
    assert!(!raw.contains("old-refresh"));
    Ok(())
}

#[tokio::test]
async fn test_refresh_without_new_refresh_token_keeps_old_one() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let store = TokenStore::new(dir.path().join("keys.json"));
    store.save(&TokenRecord {
        access_token: "old-access".to_string(),
        refresh_token: "long-lived-refresh".to_string(),
        expires_at_millis: 0,
    })?;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "new-access", "expires_in": 3600})),
        )
        .expect(1)
        .mount(&server)
        .await;

    provider(&server, store.clone()).access_token().await?;

    let stored = store.load()?.expect("token pair persisted");
    assert_eq!(stored.refresh_token, "long-lived-refresh");
    Ok(())
}

#[tokio::test]
async fn test_rejected_refresh_falls_back_to_mint() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let store = TokenStore::new(dir.path().join("keys.json"));
    store.save(&TokenRecord {
        access_token: "old-access".to_string(),
        refresh_token: "revoked-refresh".to_string(),
        expires_at_millis: 0,
    })?;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_mint(&server, "fresh-access", 1).await;

    let token = provider(&server, store.clone()).access_token().await?;

    assert_eq!(token, "fresh-access");
    assert_eq!(store.load()?.expect("stored").refresh_token, "minted-refresh");
    Ok(())
}

#[tokio::test]
async fn test_rejected_mint_is_terminal() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let store = TokenStore::new(dir.path().join("keys.json"));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server, store.clone())
        .access_token()
        .await
        .expect_err("mint must fail");

    assert!(matches!(
        err,
        TokenError::UpstreamRejected {
            grant: "client_credentials",
            status: 401
        }
    ));
    assert!(err.is_terminal());
    assert!(store.load()?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_malformed_token_payload() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = provider(&server, TokenStore::new(dir.path().join("keys.json")))
        .access_token()
        .await
        .expect_err("payload is not JSON");

    assert!(matches!(err, TokenError::Malformed(_)));
    assert!(!err.is_terminal());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_callers_share_one_mint() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("shared-access", "shared-refresh"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server, TokenStore::new(dir.path().join("keys.json")));
    let (first, second) = tokio::join!(provider.access_token(), provider.access_token());

    assert_eq!(first?, "shared-access");
    assert_eq!(second?, "shared-access");
    Ok(())
}
