//! Adapter for a hosted GoTrue-compatible auth service (the Supabase auth API).
//!
//! Uses the service-role key, so it can create pre-confirmed accounts and
//! delete them again through the admin endpoints.

use anyhow::Context;
use axum::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{Identity, IdentityError, IdentityProvider};

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: GoTrueUser,
}

/// GoTrue has used several field names for its error text over time.
#[derive(Debug, Default, Deserialize)]
struct GoTrueErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl GoTrueErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Clone)]
pub struct GoTrueIdentity {
    http: Client,
    base_url: String,
    service_key: String,
}

impl GoTrueIdentity {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(&self, req: RequestBuilder, what: &'static str) -> Result<Response, IdentityError> {
        let res = self.authorized(req).send().await.context(what)?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body: GoTrueErrorBody = res.json().await.unwrap_or_default();
        let message = body.into_message();
        if status.is_server_error() {
            warn!(%status, ?message, what, "identity provider error");
            return Err(IdentityError::Unavailable(anyhow::anyhow!(
                "{what}: {status} {}",
                message.unwrap_or_default()
            )));
        }
        debug!(%status, ?message, what, "identity provider rejected request");
        Err(IdentityError::Rejected(message))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentity {
    #[instrument(skip(self, password))]
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        email_confirm: bool,
    ) -> Result<Identity, IdentityError> {
        let req = self.http.post(self.url("/admin/users")).json(&json!({
            "email": email,
            "password": password,
            "email_confirm": email_confirm,
        }));
        let user: GoTrueUser = self
            .send(req, "gotrue create user")
            .await?
            .json()
            .await
            .context("decode gotrue user")?;
        Ok(Identity {
            id: user.id,
            email: user.email.unwrap_or_else(|| email.to_string()),
        })
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let req = self
            .http
            .post(self.url("/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = self
            .send(req, "gotrue password grant")
            .await?
            .json()
            .await
            .context("decode gotrue token response")?;
        Ok(Identity {
            id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
        })
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        let req = self.http.delete(self.url(&format!("/admin/users/{id}")));
        self.send(req, "gotrue delete user").await?;
        Ok(())
    }
}
