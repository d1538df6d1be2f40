use super::request::Attempt;
use super::ApiError;

/// What to do with a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Hand the error to the caller unchanged
    Propagate,
    /// Refresh the access token and replay the request once
    RefreshAndReplay,
}

/// Only a 401 on the first attempt earns a refresh. Everything else,
/// including any failure of the replay itself, goes back to the caller.
pub fn on_failure(error: &ApiError, attempt: Attempt) -> FailureAction {
    if error.is_unauthorized() && !attempt.is_replay() {
        FailureAction::RefreshAndReplay
    } else {
        FailureAction::Propagate
    }
}
