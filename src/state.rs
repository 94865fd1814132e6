use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::repo::{PgProfiles, ProfileRepo},
    config::AppConfig,
    identity::{self, IdentityProvider},
    todos::repo::{PgTodos, TodoRepo},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileRepo>,
    pub todos: Arc<dyn TodoRepo>,
}

impl AppState {
    /// Postgres-backed state; the identity provider is chosen by config.
    pub fn postgres(config: Arc<AppConfig>, db: PgPool) -> Self {
        let identity = identity::from_config(&config.identity, &db);
        Self {
            identity,
            profiles: Arc::new(PgProfiles::new(db.clone())),
            todos: Arc::new(PgTodos::new(db)),
            config,
        }
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepo>,
        todos: Arc<dyn TodoRepo>,
    ) -> Self {
        Self {
            config,
            identity,
            profiles,
            todos,
        }
    }
}
