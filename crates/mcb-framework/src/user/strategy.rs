//! Policies governing a user's in-flight tasks.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens when a new task arrives for a user who already has some.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnAddStrategy {
    /// Cancel every in-flight task, then start the new one.
    #[default]
    Interrupt,
    /// Run the new task alongside the others, up to the mapping's capacity.
    Stack,
    /// Drop the new task while any other is still running.
    IgnoreWhileBusy,
}

/// What happens when a task completes normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnEndStrategy {
    /// The task's slot is released; the session stays open for later tasks.
    #[default]
    End,
}

/// What happens when a task outlives the mapping's timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnTimeoutStrategy {
    /// The task resolves to [`SessionError::TimedOut`](crate::error::SessionError::TimedOut).
    #[default]
    Raise,
    /// The whole session ends: every other in-flight task is cancelled.
    End,
}

/// Per-handler rules for running tasks inside a user's session.
///
/// ```rust,ignore
/// manifest
///     .command("/quiz", run_quiz)
///     .user_mapping(UserMapping::new().ignore_while_busy().timeout(Duration::from_secs(60), OnTimeoutStrategy::End));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserMapping {
    pub on_add: OnAddStrategy,
    pub on_end: OnEndStrategy,
    pub on_timeout: OnTimeoutStrategy,
    /// `None` means tasks may run indefinitely.
    pub timeout: Option<Duration>,
    /// Upper bound on concurrent tasks under [`OnAddStrategy::Stack`].
    pub capacity: Option<usize>,
}

impl UserMapping {
    /// Interrupt on add, release on end, raise on timeout, no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(mut self) -> Self {
        self.on_add = OnAddStrategy::Interrupt;
        self
    }

    /// Stack new tasks, optionally bounded.
    pub fn stack(mut self, capacity: Option<usize>) -> Self {
        self.on_add = OnAddStrategy::Stack;
        self.capacity = capacity;
        self
    }

    pub fn ignore_while_busy(mut self) -> Self {
        self.on_add = OnAddStrategy::IgnoreWhileBusy;
        self
    }

    /// Bounds each task's run time and picks what a timeout does.
    pub fn timeout(mut self, after: Duration, strategy: OnTimeoutStrategy) -> Self {
        self.timeout = Some(after);
        self.on_timeout = strategy;
        self
    }
}
