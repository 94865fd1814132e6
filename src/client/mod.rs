//! Client side of taskboard: the state a front end keeps between requests.
//!
//! Nothing here renders anything. A front end (the bundled CLI, or any
//! other) owns a [`SessionStore`] and a [`TodoListView`], asks the
//! [`guard`] whether it may show a protected screen, and forwards user
//! actions to the view, which talks to the server through [`TodoApi`].

pub mod api;
pub mod form;
pub mod guard;
pub mod session;
pub mod todo_list;

pub use api::{ApiClient, AuthApi, TodoApi};
pub use form::TodoForm;
pub use guard::{guard, Gate};
pub use session::{
    FileStorage, MemoryStorage, Session, SessionState, SessionStorage, SessionStore, SESSION_KEY,
};
pub use todo_list::{Filter, StatusFilter, TodoListView};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("session storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error("invalid session data: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// The server no longer accepts our token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }
}
