//! Identity providers: the external authority that owns credentials.
//!
//! The rest of the application only ever sees an [`Identity`] (the provider
//! issued id plus the email it registered); display data lives in our own
//! profile table keyed by that id.

use std::sync::Arc;

use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::IdentityConfig;

pub mod gotrue;
pub mod local;

pub use gotrue::GoTrueIdentity;
pub use local::LocalIdentity;

/// Account as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider understood the request and refused it. Carries the
    /// provider's own message when it sent one.
    #[error("{}", .0.as_deref().unwrap_or("rejected by identity provider"))]
    Rejected(Option<String>),
    #[error("identity provider unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl IdentityError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(Some(msg.into()))
    }

    /// Provider supplied message, if any.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            IdentityError::Rejected(msg) => msg.as_deref(),
            IdentityError::Unavailable(_) => None,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account. `email_confirm = true` marks the address as
    /// verified so the user can sign in immediately.
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        email_confirm: bool,
    ) -> Result<Identity, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError>;
}

pub fn from_config(cfg: &IdentityConfig, db: &PgPool) -> Arc<dyn IdentityProvider> {
    match cfg {
        IdentityConfig::Local => Arc::new(LocalIdentity::new(db.clone())),
        IdentityConfig::GoTrue { url, service_key } => {
            Arc::new(GoTrueIdentity::new(url, service_key))
        }
    }
}
