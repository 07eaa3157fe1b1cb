//! Wires the stores, grader, scheduler and reminder loop into one running
//! process. A presentation layer embeds [`Engine`] and drives it through
//! [`Engine::assignments`] and [`Engine::submissions`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use code_runner::{FsTestCases, Grader, JavaToolchain};
use db::repositories::{AssignmentRepository, ReminderRepository, UploadLogRepository};
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use services::archiver::FsArchiver;
use services::assignments::AssignmentService;
use services::collaborators::{Notifier, Roster};
use services::notifier::{LogNotifier, WebhookNotifier};
use services::reminder::{ReminderConfig, ReminderEngine};
use services::roster::StaticRoster;
use services::scheduler::{DeadlineScheduler, SweepReport, restart_sweep};
use services::submissions::SubmissionService;
use tokio::task::JoinHandle;
use util::config::AppConfig;
use util::execution_config::ExecutionConfig;
use util::paths::{archive_root, storage_root, testcase_root, workspace_root};
use util::time::offset_from_hours;

pub struct Engine {
    pub assignments: AssignmentService,
    pub submissions: SubmissionService,
    pub sweep: SweepReport,
    scheduler_task: JoinHandle<()>,
    reminder_task: JoinHandle<()>,
}

impl Engine {
    /// Opens the database, applies migrations, starts the background loops
    /// and re-arms every persisted deadline.
    pub async fn start(config: &AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_path)
            .await
            .with_context(|| format!("opening database at {}", config.database_path))?;
        Migrator::up(&db, None).await.context("applying migrations")?;

        let store = AssignmentRepository::new(db.clone());
        let upload_log = UploadLogRepository::new(db.clone());
        let reminders = ReminderRepository::new(db);

        let storage = storage_root(config);

        if config.eligible_user_ids.is_empty() {
            tracing::warn!("ELIGIBLE_USER_IDS is empty; reminders have nobody to notify");
        }
        let roster: Arc<dyn Roster> = Arc::new(StaticRoster::new(config.eligible_user_ids.clone()));
        let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => {
                tracing::info!("no webhook configured, reminders are only logged");
                Arc::new(LogNotifier)
            }
        };
        let archiver = Arc::new(FsArchiver::new(
            store.clone(),
            storage.clone(),
            archive_root(config),
            config.archive_folder_name.clone(),
        ));

        let exec = ExecutionConfig::from_app_config(config);
        let grader = Grader::new(
            Arc::new(JavaToolchain::new(exec.java)),
            Arc::new(FsTestCases::new(testcase_root(config))),
            exec.execution,
            workspace_root(config),
        );

        let (scheduler, handle) = DeadlineScheduler::new(
            store.clone(),
            upload_log.clone(),
            archiver,
            Duration::from_secs(config.scheduler_max_timer_secs),
        );
        let scheduler_task = tokio::spawn(scheduler.run());
        let sweep = restart_sweep(&store, &handle)
            .await
            .context("re-arming persisted deadlines")?;

        let reminder_engine = ReminderEngine::new(
            store.clone(),
            reminders.clone(),
            roster.clone(),
            notifier,
            ReminderConfig::from_app_config(config),
        );
        let reminder_task = tokio::spawn(reminder_engine.run());

        let submissions = SubmissionService::new(
            store.clone(),
            reminders.clone(),
            roster.clone(),
            grader,
            storage,
        );
        let assignments = AssignmentService::new(
            store,
            upload_log,
            reminders,
            roster,
            handle,
            offset_from_hours(config.timezone_offset_hours),
        );

        Ok(Self {
            assignments,
            submissions,
            sweep,
            scheduler_task,
            reminder_task,
        })
    }

    /// Stops the background loops. Archival already in flight is abandoned
    /// and picked up again by the next restart sweep.
    pub fn shutdown(self) {
        self.reminder_task.abort();
        self.scheduler_task.abort();
    }
}
