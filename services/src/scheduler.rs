//! Deadline Scheduler.
//!
//! A single task owns a min-heap of `(deadline, assignment id)` and sleeps
//! until the nearest one, never longer than `max_timer` at a time, so far
//! deadlines are reached by re-arming. Due entries are fired on their own
//! task: the archiver runs, and on success the id is added to the upload log.
//! The upload log is checked again under the per-id lock right before
//! archiving, which keeps archival at most once even if an id is queued twice.
//!
//! Nothing in the heap survives a restart; [`restart_sweep`] rebuilds it from
//! the persisted assignments.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use db::KeyedLocks;
use db::models::assignment;
use db::repositories::{AssignmentRepository, UploadLogRepository};
use db::StoreError;
use tokio::sync::mpsc;

use crate::collaborators::Archiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Already in the upload log; nothing to do.
    AlreadyArchived,
    /// Deadline has passed; archival starts right away.
    Immediate,
    /// Queued for its deadline.
    Armed,
}

struct Entry {
    id: String,
    deadline: DateTime<Utc>,
}

/// Cheap, cloneable front door to the scheduler task.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Entry>,
    upload_log: UploadLogRepository,
}

impl SchedulerHandle {
    /// Registers an assignment's deadline.
    pub async fn schedule(
        &self,
        assignment: &assignment::Model,
    ) -> Result<ScheduleOutcome, StoreError> {
        self.schedule_at(assignment, Utc::now()).await
    }

    pub async fn schedule_at(
        &self,
        assignment: &assignment::Model,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, StoreError> {
        if self.upload_log.contains(&assignment.id).await? {
            return Ok(ScheduleOutcome::AlreadyArchived);
        }

        let entry = Entry {
            id: assignment.id.clone(),
            deadline: assignment.deadline,
        };
        if self.tx.send(entry).is_err() {
            tracing::error!(assignment_id = %assignment.id, "scheduler is not running");
        }

        if assignment.is_expired(now) {
            Ok(ScheduleOutcome::Immediate)
        } else {
            Ok(ScheduleOutcome::Armed)
        }
    }
}

#[derive(Clone)]
struct FireContext {
    store: AssignmentRepository,
    upload_log: UploadLogRepository,
    archiver: Arc<dyn Archiver>,
    locks: KeyedLocks,
}

/// Timer cap used when none, or zero, is configured.
pub const DEFAULT_MAX_TIMER: Duration = Duration::from_secs(86_400);

fn effective_max_timer(max_timer: Duration) -> Duration {
    if max_timer.is_zero() {
        tracing::warn!("scheduler timer cap of zero, using {:?}", DEFAULT_MAX_TIMER);
        DEFAULT_MAX_TIMER
    } else {
        max_timer
    }
}

pub struct DeadlineScheduler {
    ctx: FireContext,
    rx: mpsc::UnboundedReceiver<Entry>,
    queue: BinaryHeap<Reverse<(DateTime<Utc>, String)>>,
    queued: HashSet<String>,
    max_timer: Duration,
}

impl DeadlineScheduler {
    pub fn new(
        store: AssignmentRepository,
        upload_log: UploadLogRepository,
        archiver: Arc<dyn Archiver>,
        max_timer: Duration,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SchedulerHandle {
            tx,
            upload_log: upload_log.clone(),
        };
        let scheduler = Self {
            ctx: FireContext {
                store,
                upload_log,
                archiver,
                locks: KeyedLocks::new(),
            },
            rx,
            queue: BinaryHeap::new(),
            queued: HashSet::new(),
            max_timer: effective_max_timer(max_timer),
        };
        (scheduler, handle)
    }

    /// Services the queue until every handle is dropped and nothing is left.
    pub async fn run(mut self) {
        let mut accepting = true;
        loop {
            self.fire_due(Utc::now());

            if !accepting && self.queue.is_empty() {
                tracing::info!("deadline scheduler stopped");
                return;
            }

            let sleep_for = self.next_sleep(Utc::now());
            tokio::select! {
                entry = self.rx.recv(), if accepting => match entry {
                    Some(entry) => self.enqueue(entry),
                    None => accepting = false,
                },
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }

    fn enqueue(&mut self, entry: Entry) {
        if !self.queued.insert(entry.id.clone()) {
            return;
        }
        tracing::debug!(assignment_id = %entry.id, deadline = %entry.deadline, "deadline armed");
        self.queue.push(Reverse((entry.deadline, entry.id)));
    }

    fn next_sleep(&self, now: DateTime<Utc>) -> Duration {
        match self.queue.peek() {
            Some(Reverse((deadline, _))) => (*deadline - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.max_timer),
            None => self.max_timer,
        }
    }

    fn fire_due(&mut self, now: DateTime<Utc>) {
        while let Some(Reverse((deadline, _))) = self.queue.peek() {
            if *deadline > now {
                break;
            }
            let Some(Reverse((_, id))) = self.queue.pop() else {
                break;
            };
            self.queued.remove(&id);
            tokio::spawn(fire(self.ctx.clone(), id));
        }
    }
}

async fn fire(ctx: FireContext, id: String) {
    let _guard = ctx.locks.lock(&id).await;

    match ctx.upload_log.contains(&id).await {
        Ok(true) => {
            tracing::debug!(assignment_id = %id, "already archived");
            return;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(assignment_id = %id, error = %e, "upload log unreadable, archival postponed");
            return;
        }
    }

    match ctx.store.find(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(assignment_id = %id, "assignment removed before its deadline, nothing to archive");
            return;
        }
        Err(e) => {
            tracing::error!(assignment_id = %id, error = %e, "assignment unreadable, archival postponed");
            return;
        }
    }

    if let Err(e) = ctx.archiver.archive(&id).await {
        tracing::error!(assignment_id = %id, error = ?e, "archival failed, will retry on next restart");
        return;
    }

    match ctx.upload_log.record(&id, Utc::now()).await {
        Ok(()) => tracing::info!(assignment_id = %id, "assignment archived"),
        Err(e) => tracing::error!(assignment_id = %id, error = %e, "archived but upload log write failed"),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub armed: usize,
    pub immediate: usize,
    pub already_archived: usize,
    pub failed: usize,
}

/// Re-registers every persisted assignment. Run once at boot.
pub async fn restart_sweep(
    store: &AssignmentRepository,
    handle: &SchedulerHandle,
) -> Result<SweepReport, StoreError> {
    let mut report = SweepReport::default();
    let now = Utc::now();
    for assignment in store.list_all().await? {
        match handle.schedule_at(&assignment, now).await {
            Ok(ScheduleOutcome::Armed) => report.armed += 1,
            Ok(ScheduleOutcome::Immediate) => report.immediate += 1,
            Ok(ScheduleOutcome::AlreadyArchived) => report.already_archived += 1,
            Err(e) => {
                report.failed += 1;
                tracing::error!(assignment_id = %assignment.id, error = %e, "could not reschedule");
            }
        }
    }
    tracing::info!(?report, "restart sweep finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timer_cap_uses_the_default() {
        assert_eq!(effective_max_timer(Duration::ZERO), DEFAULT_MAX_TIMER);
        assert_eq!(
            effective_max_timer(Duration::from_millis(50)),
            Duration::from_millis(50)
        );
    }
}
