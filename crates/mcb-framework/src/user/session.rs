//! A single user's session and its in-flight tasks.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::strategy::{OnAddStrategy, OnTimeoutStrategy, UserMapping};
use crate::error::{HandlerResult, SessionError, SessionResult};
use mcb_core::User;

/// Why a task was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// [`OnAddStrategy::IgnoreWhileBusy`] and another task is running.
    Busy,
    /// [`OnAddStrategy::Stack`] and the capacity is reached.
    Full { capacity: usize },
}

/// Outcome of submitting a task to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The task is running; `interrupted` tasks were cancelled to make room.
    Started { interrupted: usize },
    Rejected(Rejection),
}

struct TaskSlot {
    id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<SessionResult>,
}

struct SessionState {
    next_id: u64,
    generation: u64,
    root: CancellationToken,
    tasks: Vec<TaskSlot>,
}

impl SessionState {
    fn prune(&mut self) {
        self.tasks.retain(|slot| !slot.handle.is_finished());
    }
}

/// Bookkeeping for one user: the tasks running on their behalf.
///
/// Sessions are owned by [`UserSessions`](super::UserSessions); different
/// users never share one, so tasks for different users never contend.
pub struct BotUser {
    user: User,
    state: Mutex<SessionState>,
}

impl BotUser {
    pub fn new(user: User) -> Self {
        Self {
            user,
            state: Mutex::new(SessionState {
                next_id: 0,
                generation: 0,
                root: CancellationToken::new(),
                tasks: Vec::new(),
            }),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        let mut state = self.state.lock();
        state.prune();
        state.tasks.len()
    }

    /// How many times this session has been ended.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Starts `task` under the rules of `mapping`.
    ///
    /// Admission is decided and the task spawned under one lock, so two
    /// concurrent submissions cannot both see an idle session.
    pub fn submit(
        self: &Arc<Self>,
        handler: &str,
        mapping: &UserMapping,
        task: BoxFuture<'static, HandlerResult>,
    ) -> Admission {
        let mut state = self.state.lock();
        state.prune();

        let mut interrupted = 0;
        match mapping.on_add {
            OnAddStrategy::Interrupt => {
                for slot in &state.tasks {
                    slot.cancel.cancel();
                }
                interrupted = state.tasks.len();
            }
            OnAddStrategy::Stack => {
                if let Some(capacity) = mapping.capacity
                    && state.tasks.len() >= capacity
                {
                    warn!(user = self.user.id, handler, capacity, "session full, task rejected");
                    return Admission::Rejected(Rejection::Full { capacity });
                }
            }
            OnAddStrategy::IgnoreWhileBusy => {
                if !state.tasks.is_empty() {
                    debug!(user = self.user.id, handler, "session busy, task ignored");
                    return Admission::Rejected(Rejection::Busy);
                }
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        let cancel = state.root.child_token();
        let handle = tokio::spawn(Arc::clone(self).run(
            id,
            handler.to_owned(),
            *mapping,
            cancel.clone(),
            task,
        ));
        state.tasks.push(TaskSlot { id, cancel, handle });

        debug!(user = self.user.id, handler, task = id, interrupted, "task started");
        Admission::Started { interrupted }
    }

    /// Ends the session: every in-flight task is cancelled.
    ///
    /// Returns the number of tasks that were still running. The session can
    /// accept new tasks afterwards.
    pub fn end(&self) -> usize {
        self.end_except(None)
    }

    fn end_except(&self, keep: Option<u64>) -> usize {
        let mut state = self.state.lock();
        state.prune();

        // Every task of this generation holds a child of the root token, including
        // tasks a concurrent `join` has already taken out of the list.
        let cancelled = state
            .tasks
            .iter()
            .filter(|slot| Some(slot.id) != keep)
            .count();
        state.root.cancel();
        state.root = CancellationToken::new();
        state.generation += 1;

        info!(user = self.user.id, cancelled, "session ended");
        cancelled
    }

    /// Waits for every tracked task and returns their results in start order.
    pub async fn join(&self) -> Vec<SessionResult> {
        let slots = std::mem::take(&mut self.state.lock().tasks);
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            results.push(match slot.handle.await {
                Ok(result) => result,
                Err(join_error) => Err(SessionError::Aborted {
                    user: self.user.id,
                    reason: join_error.to_string(),
                }),
            });
        }
        results
    }

    async fn run(
        self: Arc<Self>,
        id: u64,
        handler: String,
        mapping: UserMapping,
        cancel: CancellationToken,
        task: BoxFuture<'static, HandlerResult>,
    ) -> SessionResult {
        let user = self.user.id;
        let bounded = async move {
            match mapping.timeout {
                Some(after) => tokio::time::timeout(after, task).await.map_err(|_| after),
                None => Ok(task.await),
            }
        };

        let result = match cancel.run_until_cancelled(bounded).await {
            None => Err(SessionError::Cancelled { handler, user }),
            Some(Ok(Ok(()))) => Ok(()),
            Some(Ok(Err(source))) => Err(SessionError::Handler {
                handler,
                user,
                source,
            }),
            Some(Err(after)) => self.on_timeout(id, handler, mapping.on_timeout, after),
        };

        match &result {
            Ok(()) => debug!(user, task = id, "task finished"),
            Err(SessionError::Cancelled { .. }) => debug!(user, task = id, "task cancelled"),
            Err(err) => error!(user, task = id, "{err}"),
        }
        result
    }

    fn on_timeout(
        &self,
        id: u64,
        handler: String,
        strategy: OnTimeoutStrategy,
        after: Duration,
    ) -> SessionResult {
        match strategy {
            OnTimeoutStrategy::Raise => Err(SessionError::TimedOut {
                handler,
                user: self.user.id,
                after,
            }),
            OnTimeoutStrategy::End => {
                self.end_except(Some(id));
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for BotUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BotUser")
            .field("user", &self.user.id)
            .field("tasks", &state.tasks.len())
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use futures::FutureExt;
    use tokio::sync::oneshot;

    fn session() -> Arc<BotUser> {
        Arc::new(BotUser::new(User {
            id: 7,
            ..Default::default()
        }))
    }

    fn forever() -> BoxFuture<'static, HandlerResult> {
        futures::future::pending().boxed()
    }

    fn immediate() -> BoxFuture<'static, HandlerResult> {
        async { Ok(()) }.boxed()
    }

    #[tokio::test]
    async fn test_completed_task_releases_slot() {
        let user = session();
        let admission = user.submit("quick", &UserMapping::new(), immediate());
        assert_eq!(admission, Admission::Started { interrupted: 0 });

        let results = user.join().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
        assert_eq!(user.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_interrupt_cancels_running_task() {
        let user = session();
        user.submit("first", &UserMapping::new(), forever());

        let admission = user.submit("second", &UserMapping::new(), immediate());
        assert_eq!(admission, Admission::Started { interrupted: 1 });

        let results = user.join().await;
        assert!(matches!(results[0], Err(SessionError::Cancelled { .. })));
        assert!(results[1].is_ok());
    }

    #[tokio::test]
    async fn test_ignore_while_busy() {
        let user = session();
        let mapping = UserMapping::new().ignore_while_busy();
        let (release, wait) = oneshot::channel::<()>();

        let blocked = async move {
            let _ = wait.await;
            Ok(())
        }
        .boxed();
        user.submit("first", &mapping, blocked);

        assert_eq!(
            user.submit("second", &mapping, immediate()),
            Admission::Rejected(Rejection::Busy)
        );

        release.send(()).unwrap();
        let results = user.join().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());

        assert_eq!(
            user.submit("third", &mapping, immediate()),
            Admission::Started { interrupted: 0 }
        );
    }

    #[tokio::test]
    async fn test_stack_respects_capacity() {
        let user = session();
        let mapping = UserMapping::new().stack(Some(2));

        for _ in 0..2 {
            let admission = user.submit("stacked", &mapping, forever());
            assert_eq!(admission, Admission::Started { interrupted: 0 });
        }

        assert_eq!(
            user.submit("stacked", &mapping, immediate()),
            Admission::Rejected(Rejection::Full { capacity: 2 })
        );
        assert_eq!(user.in_flight(), 2);

        assert_eq!(user.end(), 2);
        let results = user.join().await;
        assert!(results.iter().all(|r| matches!(r, Err(SessionError::Cancelled { .. }))));
    }

    #[tokio::test]
    async fn test_timeout_raises() {
        let user = session();
        let mapping = UserMapping::new().timeout(Duration::from_millis(20), OnTimeoutStrategy::Raise);
        user.submit("slow", &mapping, forever());

        let results = user.join().await;
        assert!(matches!(
            &results[0],
            Err(SessionError::TimedOut { user: 7, .. })
        ));
        assert_eq!(user.generation(), 0);
    }

    #[tokio::test]
    async fn test_timeout_ends_session() {
        let user = session();
        let stacked = UserMapping::new().stack(None);
        user.submit("background", &stacked, forever());

        let mapping = UserMapping::new()
            .stack(None)
            .timeout(Duration::from_millis(20), OnTimeoutStrategy::End);
        user.submit("slow", &mapping, forever());

        let results = user.join().await;
        assert!(matches!(results[0], Err(SessionError::Cancelled { .. })));
        assert!(results[1].is_ok());
        assert_eq!(user.generation(), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_is_reported() {
        let user = session();
        let failing = async { Err(HandlerError::failed("nope")) }.boxed();
        user.submit("failing", &UserMapping::new(), failing);

        let results = user.join().await;
        assert!(matches!(&results[0], Err(SessionError::Handler { .. })));
    }

    #[tokio::test]
    async fn test_new_tasks_run_after_end() {
        let user = session();
        user.submit("first", &UserMapping::new(), forever());
        user.end();

        user.submit("second", &UserMapping::new().stack(None), immediate());
        let results = user.join().await;
        assert!(matches!(results[0], Err(SessionError::Cancelled { .. })));
        assert!(results[1].is_ok());
    }
}
