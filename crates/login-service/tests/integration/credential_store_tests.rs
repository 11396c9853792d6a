//! Integration tests for the PostgreSQL credential store
//!
//! These need a PostgreSQL instance (`DATABASE_URL`) and are ignored by
//! default.

use chrono::{TimeZone, Utc};
use login_service::repositories::api_client_authorizations::CredentialStore;
use login_test_utils::*;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_find_by_secret_returns_row(pool: PgPool) -> Result<(), anyhow::Error> {
    let expires = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
    insert_credential(&pool, TEST_TOKEN_UUID, TEST_TOKEN_SECRET, Some(r#"["all"]"#), Some(expires))
        .await?;

    let mut tx = pool.begin().await?;
    let row = (*tx)
        .find_by_secret(TEST_TOKEN_SECRET)
        .await?
        .expect("row must exist");

    assert_eq!(row.uuid, TEST_TOKEN_UUID);
    assert_eq!(row.expires_at, Some(expires));
    assert_eq!(row.scopes.as_deref(), Some(r#"["all"]"#));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_find_by_secret_missing_row(pool: PgPool) -> Result<(), anyhow::Error> {
    let mut tx = pool.begin().await?;
    let row = (*tx).find_by_secret("no-such-secret").await?;

    assert!(row.is_none());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_find_by_secret_sees_uncommitted_insert(pool: PgPool) -> Result<(), anyhow::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO api_client_authorizations (uuid, api_token) VALUES ($1, $2)")
        .bind(TEST_TOKEN_UUID)
        .bind(TEST_TOKEN_SECRET)
        .execute(&mut *tx)
        .await?;

    let row = (*tx).find_by_secret(TEST_TOKEN_SECRET).await?;

    assert!(row.is_some());
    assert_eq!(row.and_then(|r| r.scopes), None);
    Ok(())
}
