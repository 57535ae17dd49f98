//! Outcome tracking for a fetch step that has a fallback source.

/// How a fetch step with a fallback concluded.
///
/// Each step makes at most one attempt at its primary source and, only if
/// that fails, one attempt at its fallback. There is exactly one transition
/// per attempt, so the outcome can be tested without any HTTP plumbing.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// The primary source answered.
    Primary(T),
    /// The primary source failed and the fallback answered.
    Fallback(T),
    /// Both the primary source and the fallback failed.
    Failed,
}

impl<T> FetchOutcome<T> {
    /// The fetched value, if either source answered.
    pub fn into_value(self) -> Option<T> {
        match self {
            FetchOutcome::Primary(value) | FetchOutcome::Fallback(value) => Some(value),
            FetchOutcome::Failed => None,
        }
    }
}
