pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod identity;
pub mod state;
pub mod todos;

#[cfg(test)]
pub(crate) mod test_util;

pub use app::build_app;
pub use config::AppConfig;
pub use state::AppState;
