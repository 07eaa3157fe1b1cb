//! Reminder Engine.
//!
//! Every `interval` the engine looks at each open assignment. A window is due
//! when `now` lies within `margin` of `deadline - offset`. Non-compliant roster
//! users whose flag for a due window is unset get one notification, and the
//! flag is set. Flags are merged back in one write at the end of the tick.
//! A failed delivery leaves the flag unset so the next tick inside the same
//! window tries again. Windows that fell inside downtime are not replayed.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use db::models::reminder_state::Window;
use db::repositories::{AssignmentRepository, ReminderRepository};
use tokio::time::MissedTickBehavior;
use util::config::AppConfig;

use crate::collaborators::{Notification, Notifier, Roster};
use crate::messages;

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub interval: StdDuration,
    pub long_offset: Duration,
    pub short_offset: Duration,
    pub margin: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: StdDuration::from_secs(60),
            long_offset: Duration::hours(2),
            short_offset: Duration::minutes(10),
            margin: Duration::seconds(60),
        }
    }
}

/// Offsets and margins beyond a year are treated as misconfiguration.
const MAX_OFFSET_DAYS: i64 = 365;

impl ReminderConfig {
    /// Out-of-range values fall back to the defaults instead of failing.
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        let defaults = Self::default();
        let interval = match cfg.reminder_interval_secs {
            secs @ 1..=86_400 => StdDuration::from_secs(secs),
            secs => {
                tracing::warn!(secs, "REMINDER_INTERVAL_SECS out of range, using default");
                defaults.interval
            }
        };
        Self {
            interval,
            long_offset: bounded(
                "REMINDER_LONG_WINDOW_MINS",
                Duration::try_minutes(cfg.reminder_long_window_mins),
                defaults.long_offset,
            ),
            short_offset: bounded(
                "REMINDER_SHORT_WINDOW_MINS",
                Duration::try_minutes(cfg.reminder_short_window_mins),
                defaults.short_offset,
            ),
            margin: bounded(
                "REMINDER_MARGIN_SECS",
                Duration::try_seconds(cfg.reminder_margin_secs),
                defaults.margin,
            ),
        }
    }

    pub fn offset(&self, window: Window) -> Duration {
        match window {
            Window::Long => self.long_offset,
            Window::Short => self.short_offset,
        }
    }

    /// `[deadline - offset - margin, deadline - offset + margin]`, inclusive.
    pub fn is_due(&self, window: Window, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let boundary = deadline - self.offset(window);
        boundary - self.margin <= now && now <= boundary + self.margin
    }

    pub fn due_windows(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Vec<Window> {
        [Window::Long, Window::Short]
            .into_iter()
            .filter(|w| self.is_due(*w, deadline, now))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReminder {
    pub assignment_id: String,
    pub user_id: String,
    pub window: Window,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub sent: Vec<SentReminder>,
    pub delivery_failures: usize,
    pub skipped_assignments: usize,
    pub aborted: bool,
}

#[derive(Clone)]
pub struct ReminderEngine {
    store: AssignmentRepository,
    reminders: ReminderRepository,
    roster: Arc<dyn Roster>,
    notifier: Arc<dyn Notifier>,
    config: ReminderConfig,
}

impl ReminderEngine {
    pub fn new(
        store: AssignmentRepository,
        reminders: ReminderRepository,
        roster: Arc<dyn Roster>,
        notifier: Arc<dyn Notifier>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            store,
            reminders,
            roster,
            notifier,
            config,
        }
    }

    /// Ticks forever. A tick never fails; problems are logged inside it.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = self.tick_at(Utc::now()).await;
            if !report.sent.is_empty() || report.delivery_failures > 0 {
                tracing::info!(
                    sent = report.sent.len(),
                    failed = report.delivery_failures,
                    skipped = report.skipped_assignments,
                    "reminder tick"
                );
            }
        }
    }

    /// One self-contained tick evaluated at `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        let users = match self.roster.eligible_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = ?e, "roster unavailable, skipping reminder tick");
                report.aborted = true;
                return report;
            }
        };
        let ids = match self.store.list_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "assignment list unavailable, skipping reminder tick");
                report.aborted = true;
                return report;
            }
        };
        let state = match self.reminders.load().await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "reminder state unavailable, skipping reminder tick");
                report.aborted = true;
                return report;
            }
        };

        for id in ids {
            let assignment = match self.store.load(&id).await {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!(assignment_id = %id, error = %e, "skipping assignment this tick");
                    report.skipped_assignments += 1;
                    continue;
                }
            };
            if assignment.is_expired(now) {
                continue;
            }
            let windows = self.config.due_windows(assignment.deadline, now);
            if windows.is_empty() {
                continue;
            }

            for user_id in &users {
                if assignment.is_compliant(user_id) {
                    continue;
                }
                let flags = state.flags(&assignment.id, user_id);
                for window in windows.iter().copied().filter(|w| !flags.is_sent(*w)) {
                    let content = messages::reminder(
                        user_id,
                        &assignment.id,
                        assignment.submission(user_id).is_some(),
                        assignment.deadline - now,
                    );
                    let notification =
                        Notification::reminder(&assignment.id, user_id, window, content);
                    match self.notifier.notify(&notification).await {
                        Ok(()) => report.sent.push(SentReminder {
                            assignment_id: assignment.id.clone(),
                            user_id: user_id.clone(),
                            window,
                        }),
                        Err(e) => {
                            tracing::warn!(
                                assignment_id = %assignment.id,
                                user_id = %user_id,
                                %window,
                                error = ?e,
                                "reminder delivery failed"
                            );
                            report.delivery_failures += 1;
                        }
                    }
                }
            }
        }

        if !report.sent.is_empty() {
            let sent = report.sent.clone();
            let merged = self
                .reminders
                .update(move |state| {
                    for s in &sent {
                        state.mark(&s.assignment_id, &s.user_id, s.window);
                    }
                })
                .await;
            if let Err(e) = merged {
                tracing::error!(error = %e, "failed to persist reminder flags");
            }
        }

        report
    }
}

fn bounded(key: &str, value: Option<Duration>, default: Duration) -> Duration {
    match value {
        Some(d) if d >= Duration::zero() && d <= Duration::days(MAX_OFFSET_DAYS) => d,
        _ => {
            tracing::warn!(key, "reminder setting out of range, using default");
            default
        }
    }
}
