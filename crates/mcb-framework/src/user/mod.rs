//! Per-user task bookkeeping.
//!
//! Handlers registered with a [`UserMapping`] run as detached tasks inside the
//! sender's [`BotUser`] session. The mapping's strategies decide what happens
//! when tasks overlap, finish, or run too long. Sessions live in a
//! [`UserSessions`] owned by the dispatcher; nothing here is global.

mod session;
mod strategy;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::debug;

pub use session::{Admission, BotUser, Rejection};
pub use strategy::{OnAddStrategy, OnEndStrategy, OnTimeoutStrategy, UserMapping};

use mcb_core::User;

/// Size at which creating a session first sweeps out idle ones.
const SWEEP_THRESHOLD: usize = 1024;

/// All known user sessions, keyed by user id.
///
/// A session nobody holds but the map is idle: every running task keeps its
/// own handle to its session. Idle sessions are forgotten when the map grows
/// past a high-water mark, so the map tracks active users rather than every
/// user ever seen.
pub struct UserSessions {
    users: RwLock<HashMap<i64, Arc<BotUser>>>,
    sweep_at: AtomicUsize,
}

impl Default for UserSessions {
    fn default() -> Self {
        Self {
            users: RwLock::default(),
            sweep_at: AtomicUsize::new(SWEEP_THRESHOLD),
        }
    }
}

impl UserSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `user`, creating it on first contact.
    pub fn session(&self, user: &User) -> Arc<BotUser> {
        if let Some(session) = self.users.read().get(&user.id) {
            return Arc::clone(session);
        }
        let mut users = self.users.write();
        if !users.contains_key(&user.id) && users.len() >= self.sweep_at.load(Ordering::Relaxed) {
            let dropped = sweep(&mut users);
            self.sweep_at
                .store((users.len() * 2).max(SWEEP_THRESHOLD), Ordering::Relaxed);
            debug!(dropped, remaining = users.len(), "idle user sessions swept");
        }
        Arc::clone(
            users
                .entry(user.id)
                .or_insert_with(|| Arc::new(BotUser::new(user.clone()))),
        )
    }

    pub fn get(&self, user_id: i64) -> Option<Arc<BotUser>> {
        self.users.read().get(&user_id).cloned()
    }

    /// Ends and forgets a user's session. Returns `false` if there was none.
    pub fn remove(&self, user_id: i64) -> bool {
        let removed = self.users.write().remove(&user_id);
        match removed {
            Some(session) => {
                session.end();
                true
            }
            None => false,
        }
    }

    /// Forgets every idle session. Returns how many were dropped.
    pub fn prune_idle(&self) -> usize {
        sweep(&mut self.users.write())
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

// The write lock is held, so no new handle to an entry can appear meanwhile.
fn sweep(users: &mut HashMap<i64, Arc<BotUser>>) -> usize {
    let before = users.len();
    users.retain(|_, session| Arc::strong_count(session) > 1);
    before - users.len()
}

impl std::fmt::Debug for UserSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSessions")
            .field("users", &self.len())
            .finish()
    }
}
