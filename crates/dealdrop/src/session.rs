use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SelectPlatform,
    EnterPlatformName,
    EnterCode,
    EnterDetails,
}

/// In-memory submission dialog state for one user. Lost on restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSession {
    pub platform: Option<String>,
    pub code: Option<String>,
    pub step: Step,
}

impl SubmissionSession {
    pub fn new() -> Self {
        Self {
            platform: None,
            code: None,
            step: Step::SelectPlatform,
        }
    }
}

impl Default for SubmissionSession {
    fn default() -> Self {
        Self::new()
    }
}

pub type SessionSlot = Arc<Mutex<Option<SubmissionSession>>>;

/// One slot per user id. The slot mutex serializes every inbound event for
/// that user; events for distinct users proceed concurrently.
#[derive(Debug, Default)]
pub struct Sessions {
    inner: DashMap<i64, SessionSlot>,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Slots are never removed once created: a second slot for the same
    /// user would mean two locks guarding one user's state.
    pub fn slot(&self, user_id: i64) -> SessionSlot {
        self.inner.entry(user_id).or_default().clone()
    }
}
