use super::session::{Session, SessionState};

/// What a protected screen should do for the current session.
#[derive(Debug, PartialEq, Eq)]
pub enum Gate<'a> {
    /// Session not restored yet; render nothing so we don't bounce a
    /// logged-in user to the login screen.
    Wait,
    RedirectToLogin,
    Render(&'a Session),
}

pub fn guard(state: &SessionState) -> Gate<'_> {
    match state {
        SessionState::Loading => Gate::Wait,
        SessionState::Anonymous => Gate::RedirectToLogin,
        SessionState::Authenticated(session) => Gate::Render(session),
    }
}
