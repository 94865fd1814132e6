use anyhow::Context;
use axum::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Identity, IdentityError, IdentityProvider};
use crate::auth::password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

#[derive(Debug, FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    password_hash: String,
    email_confirmed_at: Option<OffsetDateTime>,
}

/// Identity provider backed by the application's own Postgres database.
/// Messages mirror the hosted provider so clients see the same text.
#[derive(Clone)]
pub struct LocalIdentity {
    db: PgPool,
}

impl LocalIdentity {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<IdentityRow>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, email, password_hash, email_confirmed_at
            FROM identities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find identity by email")?;
        Ok(row)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    #[instrument(skip(self, password))]
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        email_confirm: bool,
    ) -> Result<Identity, IdentityError> {
        if !is_valid_email(email) {
            return Err(IdentityError::rejected(
                "Unable to validate email address: invalid format",
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::rejected(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters."
            )));
        }

        let hash = hash_password(password)?;
        let confirmed_at = email_confirm.then(OffsetDateTime::now_utc);

        let created = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            INSERT INTO identities (email, password_hash, email_confirmed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email
            "#,
        )
        .bind(email)
        .bind(&hash)
        .bind(confirmed_at)
        .fetch_optional(&self.db)
        .await
        .context("insert identity")?;

        match created {
            Some((id, email)) => {
                debug!(%id, "identity created");
                Ok(Identity { id, email })
            }
            None => Err(IdentityError::rejected(
                "A user with this email address has already been registered",
            )),
        }
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let Some(row) = self.find_by_email(email).await? else {
            return Err(IdentityError::rejected(INVALID_CREDENTIALS));
        };
        if !verify_password(password, &row.password_hash)? {
            return Err(IdentityError::rejected(INVALID_CREDENTIALS));
        }
        if row.email_confirmed_at.is_none() {
            return Err(IdentityError::rejected("Email not confirmed"));
        }
        Ok(Identity {
            id: row.id,
            email: row.email,
        })
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        let res = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete identity")?;
        if res.rows_affected() == 0 {
            return Err(IdentityError::rejected("User not found"));
        }
        Ok(())
    }
}
