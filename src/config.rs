use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which identity backend signs users up and checks their passwords.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdentityConfig {
    /// Credentials live in our own `identities` table.
    Local,
    /// Hosted GoTrue-compatible auth service (e.g. Supabase).
    GoTrue { url: String, service_key: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub identity: IdentityConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "taskboard".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "taskboard-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let identity = identity_from_env()?;
        Ok(Self {
            database_url,
            jwt,
            identity,
        })
    }

    /// Provider name, safe to log.
    pub fn identity_kind(&self) -> &'static str {
        match self.identity {
            IdentityConfig::Local => "local",
            IdentityConfig::GoTrue { .. } => "gotrue",
        }
    }
}

fn identity_from_env() -> anyhow::Result<IdentityConfig> {
    let kind = std::env::var("IDENTITY_PROVIDER").unwrap_or_else(|_| "local".into());
    parse_identity(
        &kind,
        std::env::var("GOTRUE_URL").ok(),
        std::env::var("GOTRUE_SERVICE_KEY").ok(),
    )
}

fn parse_identity(
    kind: &str,
    url: Option<String>,
    service_key: Option<String>,
) -> anyhow::Result<IdentityConfig> {
    match kind.trim().to_lowercase().as_str() {
        "local" => Ok(IdentityConfig::Local),
        "gotrue" | "supabase" => Ok(IdentityConfig::GoTrue {
            url: url.context("GOTRUE_URL is required when IDENTITY_PROVIDER=gotrue")?,
            service_key: service_key
                .context("GOTRUE_SERVICE_KEY is required when IDENTITY_PROVIDER=gotrue")?,
        }),
        other => anyhow::bail!("unknown IDENTITY_PROVIDER `{other}`"),
    }
}
