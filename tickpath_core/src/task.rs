// Completion handle for a started search.
//
// Synchronous searches hand back an already-completed task. Asynchronous ones
// hand back a task backed by a one-shot `crossbeam_channel` that the worker
// fills when the search ends. The worker side is a `Completion`; dropping it
// raises a shared `done` flag, so the task can tell a finished worker from a
// busy one without receiving. If the worker disappears without sending (the
// pool was torn down under it), the task resolves to `Failed` with an empty
// path between the requested endpoints.

use crate::geometry::Position;
use crate::path::Path;
use crate::result::{PathState, PathfinderResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug)]
enum TaskState {
    /// `None` once the result was taken.
    Ready(Option<PathfinderResult>),
    Pending {
        rx: Receiver<PathfinderResult>,
        done: Arc<AtomicBool>,
    },
}

/// Worker half of a pending task. Raises the task's `done` flag when
/// dropped, whether or not a result was sent.
#[derive(Debug)]
pub(crate) struct Completion {
    tx: Sender<PathfinderResult>,
    done: Arc<AtomicBool>,
}

impl Completion {
    pub(crate) fn complete(self, result: PathfinderResult) {
        // The receiver may be gone if the caller dropped the task.
        let _ = self.tx.send(result);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct PathfindingTask {
    start: Position,
    target: Position,
    state: TaskState,
}

impl PathfindingTask {
    pub(crate) fn ready(start: &Position, target: &Position, result: PathfinderResult) -> Self {
        Self {
            start: start.clone(),
            target: target.clone(),
            state: TaskState::Ready(Some(result)),
        }
    }

    /// A task still waiting on its worker, plus the worker's half.
    pub(crate) fn pending(start: &Position, target: &Position) -> (Self, Completion) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let done = Arc::new(AtomicBool::new(false));
        let task = Self {
            start: start.clone(),
            target: target.clone(),
            state: TaskState::Pending {
                rx,
                done: Arc::clone(&done),
            },
        };
        (task, Completion { tx, done })
    }

    /// Whether a result is available (or the worker is gone).
    pub fn is_finished(&self) -> bool {
        match &self.state {
            TaskState::Ready(_) => true,
            TaskState::Pending { rx, done } => !rx.is_empty() || done.load(Ordering::Acquire),
        }
    }

    /// Take the result if it is available. Later calls return `None`.
    pub fn try_take(&mut self) -> Option<PathfinderResult> {
        let received = match &mut self.state {
            TaskState::Ready(slot) => return slot.take(),
            TaskState::Pending { rx, .. } => rx.try_recv(),
        };
        let result = match received {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => lost_worker(&self.start, &self.target),
        };
        self.state = TaskState::Ready(None);
        Some(result)
    }

    /// Block until the search ends.
    pub fn wait(self) -> PathfinderResult {
        let Self {
            start,
            target,
            state,
        } = self;
        match state {
            TaskState::Ready(Some(result)) => result,
            TaskState::Ready(None) => {
                tracing::warn!("waited on a task whose result was already taken");
                failed(&start, &target)
            }
            TaskState::Pending { rx, .. } => match rx.recv() {
                Ok(result) => result,
                Err(_) => lost_worker(&start, &target),
            },
        }
    }

    /// Block for at most `timeout`. On timeout the task is handed back.
    pub fn wait_timeout(mut self, timeout: Duration) -> Result<PathfinderResult, Self> {
        let received = match &mut self.state {
            TaskState::Ready(slot) => return slot.take().ok_or(self),
            TaskState::Pending { rx, .. } => rx.recv_timeout(timeout),
        };
        match received {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => Ok(lost_worker(&self.start, &self.target)),
        }
    }
}

fn lost_worker(start: &Position, target: &Position) -> PathfinderResult {
    tracing::warn!(%start, %target, "search worker vanished without a result");
    failed(start, target)
}

fn failed(start: &Position, target: &Position) -> PathfinderResult {
    PathfinderResult::new(
        PathState::Failed,
        Path::empty(start.clone(), target.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Environment, EnvironmentId};

    fn endpoints() -> (Position, Position) {
        let env = Environment::new(EnvironmentId(0), "test", -64, 320).shared();
        (
            Position::new(&env, 0.0, 0.0, 0.0),
            Position::new(&env, 9.0, 0.0, 0.0),
        )
    }

    fn found(start: &Position) -> PathfinderResult {
        PathfinderResult::new(
            PathState::Found,
            Path::from_positions(vec![start.clone()]).unwrap(),
        )
    }

    #[test]
    fn ready_task_is_finished() {
        let (start, target) = endpoints();
        let mut task = PathfindingTask::ready(&start, &target, found(&start));
        assert!(task.is_finished());
        assert_eq!(task.try_take().unwrap().state(), PathState::Found);
        assert!(task.try_take().is_none());
    }

    #[test]
    fn pending_task_resolves_when_sent() {
        let (start, target) = endpoints();
        let (mut task, completion) = PathfindingTask::pending(&start, &target);
        assert!(!task.is_finished());
        assert!(task.try_take().is_none());
        completion.tx.send(found(&start)).unwrap();
        assert!(task.is_finished());
        assert_eq!(task.wait().state(), PathState::Found);
    }

    #[test]
    fn wait_timeout_hands_task_back() {
        let (start, target) = endpoints();
        let (task, completion) = PathfindingTask::pending(&start, &target);
        let task = task.wait_timeout(Duration::from_millis(5)).unwrap_err();
        completion.complete(found(&start));
        let result = task.wait_timeout(Duration::from_secs(5)).unwrap();
        assert!(result.is_successful());
    }

    #[test]
    fn vanished_worker_means_failed() {
        let (start, target) = endpoints();
        let (task, completion) = PathfindingTask::pending(&start, &target);
        drop(completion);
        assert!(task.is_finished());
        let result = task.wait();
        assert_eq!(result.state(), PathState::Failed);
        assert!(result.path().is_empty());
        assert_eq!(result.path().end(), &target);
    }

    #[test]
    fn dropped_completion_finishes_task() {
        let (start, target) = endpoints();
        let (mut task, completion) = PathfindingTask::pending(&start, &target);
        assert!(!task.is_finished());
        drop(completion);
        assert!(task.is_finished());
        let result = task.try_take().unwrap();
        assert_eq!(result.state(), PathState::Failed);
        assert!(task.try_take().is_none());
    }

    #[test]
    fn completed_task_stays_finished_after_worker_exits() {
        let (start, target) = endpoints();
        let (task, completion) = PathfindingTask::pending(&start, &target);
        completion.complete(found(&start));
        assert!(task.is_finished());
        assert_eq!(task.wait().state(), PathState::Found);
    }
}
