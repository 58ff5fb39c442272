/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! User lookup and provisioning keyed by (provider, subject).
//!
//! Expects a `users` table with columns `id BIGSERIAL`, `email` (unique),
//! `username` (unique), `name`, `picture`, `provider`, `subject_id`,
//! `created_at` and `updated_at`.

use async_trait::async_trait;
use auth_types::Provider;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::oauth::IdentityClaims;

/// Row returned from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub name: String,
    pub picture: String,
    pub provider: String,
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolves the local user for a freshly authenticated identity.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Return the user linked to `(provider, claims.subject)`, creating it on
    /// first login.
    async fn find_or_create(
        &self,
        provider: Provider,
        claims: &IdentityClaims,
    ) -> Result<UserRecord, sqlx::Error>;
}

/// [`UserDirectory`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_or_create(
        &self,
        provider: Provider,
        claims: &IdentityClaims,
    ) -> Result<UserRecord, sqlx::Error> {
        if let Some(user) =
            find_by_provider_subject(&self.pool, provider.as_str(), &claims.subject).await?
        {
            return Ok(user);
        }

        match insert_user(&self.pool, provider.as_str(), claims, &claims.username).await {
            Err(err) if is_unique_violation(&err) => {
                // Display names are not unique; retry once with a subject-derived suffix.
                let username = disambiguated_username(&claims.username, &claims.subject);
                tracing::info!(provider = %provider, "username taken, retrying with suffix");
                insert_user(&self.pool, provider.as_str(), claims, &username).await
            }
            other => other,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn disambiguated_username(username: &str, subject: &str) -> String {
    let suffix: String = subject
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("{username}-{suffix}")
}

/// Fetch the user linked to a provider identity.
pub async fn find_by_provider_subject(
    pool: &PgPool,
    provider: &str,
    subject_id: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, username, name, picture, provider, subject_id, created_at, updated_at
        FROM users
        WHERE provider = $1 AND subject_id = $2
        "#,
    )
    .bind(provider)
    .bind(subject_id)
    .fetch_optional(pool)
    .await
}

/// Insert a new user for a provider identity.
pub async fn insert_user(
    pool: &PgPool,
    provider: &str,
    claims: &IdentityClaims,
    username: &str,
) -> Result<UserRecord, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users (email, username, name, picture, provider, subject_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING id, email, username, name, picture, provider, subject_id, created_at, updated_at
        "#,
    )
    .bind(&claims.email)
    .bind(username)
    .bind(&claims.name)
    .bind(&claims.picture)
    .bind(provider)
    .bind(&claims.subject)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_uses_alphanumeric_subject_prefix() {
        assert_eq!(
            disambiguated_username("Jane Doe", "a1-b2_c3d4e5f6g7"),
            "Jane Doe-a1b2c3d4"
        );
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
