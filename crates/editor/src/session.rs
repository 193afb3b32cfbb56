use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use storage::{DatasetKind, DatasetStore, IntegrityReport, SaveReport, StorageError, Table};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{EditorError, Result, ValidationError};
use crate::grid::{CommitContext, Committed};
use crate::scheduler::{SaveIndicator, SaveOutcome};
use crate::tab::{DatasetTab, TabView};

/// The window toolkit, as far as the session needs it.
pub trait EditorUi: Send + 'static {
    fn indicator_changed(&mut self, kind: DatasetKind, indicator: &SaveIndicator);

    /// Blocking message box in a real UI.
    fn error(&mut self, title: &str, message: &str);
}

/// UI that only logs; used by the command line.
#[derive(Debug, Default)]
pub struct LogUi;

impl EditorUi for LogUi {
    fn indicator_changed(&mut self, kind: DatasetKind, indicator: &SaveIndicator) {
        debug!(dataset = %kind, ?indicator, "Save indicator changed");
    }

    fn error(&mut self, title: &str, message: &str) {
        warn!("{}: {}", title, message);
    }
}

enum Command {
    Commit {
        kind: DatasetKind,
        row: usize,
        column: String,
        value: String,
        reply: oneshot::Sender<std::result::Result<Committed, ValidationError>>,
    },
    InsertRow {
        kind: DatasetKind,
        reply: oneshot::Sender<usize>,
    },
    DeleteRow {
        kind: DatasetKind,
        row: usize,
        reply: oneshot::Sender<bool>,
    },
    Search {
        kind: DatasetKind,
        query: String,
        reply: oneshot::Sender<TabView>,
    },
    LoadMore {
        kind: DatasetKind,
        reply: oneshot::Sender<TabView>,
    },
    View {
        kind: DatasetKind,
        reply: oneshot::Sender<TabView>,
    },
    SelectEvent(Option<String>),
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle for talking to a running [`Session`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| EditorError::SessionClosed)?;
        rx.await.map_err(|_| EditorError::SessionClosed)
    }

    pub async fn commit(
        &self,
        kind: DatasetKind,
        row: usize,
        column: &str,
        value: &str,
    ) -> Result<Committed> {
        let (column, value) = (column.to_string(), value.to_string());
        let committed = self
            .request(|reply| Command::Commit {
                kind,
                row,
                column,
                value,
                reply,
            })
            .await?;
        Ok(committed?)
    }

    pub async fn insert_row(&self, kind: DatasetKind) -> Result<usize> {
        self.request(|reply| Command::InsertRow { kind, reply }).await
    }

    pub async fn delete_row(&self, kind: DatasetKind, row: usize) -> Result<bool> {
        self.request(|reply| Command::DeleteRow { kind, row, reply })
            .await
    }

    pub async fn search(&self, kind: DatasetKind, query: &str) -> Result<TabView> {
        let query = query.to_string();
        self.request(|reply| Command::Search { kind, query, reply })
            .await
    }

    pub async fn load_more(&self, kind: DatasetKind) -> Result<TabView> {
        self.request(|reply| Command::LoadMore { kind, reply }).await
    }

    pub async fn view(&self, kind: DatasetKind) -> Result<TabView> {
        self.request(|reply| Command::View { kind, reply }).await
    }

    pub async fn select_event(&self, event: Option<String>) -> Result<()> {
        self.tx
            .send(Command::SelectEvent(event))
            .await
            .map_err(|_| EditorError::SessionClosed)
    }

    /// Flushes every tab and stops the session.
    pub async fn close(&self) -> Result<()> {
        self.request(|reply| Command::Close { reply }).await
    }
}

/// Owns the three tabs and runs every edit, timer and save completion on a
/// single task. Saves themselves run on the blocking pool, one per tab.
pub struct Session<U: EditorUi> {
    store: Arc<DatasetStore>,
    config: SessionConfig,
    competitors: DatasetTab,
    results: DatasetTab,
    events: DatasetTab,
    selected_event: Option<String>,
    ui: U,
    saves: JoinSet<(DatasetKind, std::result::Result<SaveReport, JoinError>)>,
    shown: HashMap<DatasetKind, SaveIndicator>,
    rx: mpsc::Receiver<Command>,
}

impl<U: EditorUi> Session<U> {
    /// Loads all datasets. Never fails: unreadable files come up empty.
    pub fn open(store: Arc<DatasetStore>, config: SessionConfig, ui: U) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(64);

        let competitors = DatasetTab::new(
            DatasetKind::Competitors,
            store.load(DatasetKind::Competitors),
            &config,
        );
        let results = DatasetTab::new(
            DatasetKind::Results,
            store.load(DatasetKind::Results),
            &config,
        );
        let events = DatasetTab::new(DatasetKind::Events, store.load(DatasetKind::Events), &config);

        IntegrityReport::duplicates_only(results.table()).log_warnings();
        info!(
            competitors = competitors.counts().total,
            results = results.counts().total,
            events = events.counts().total,
            "Opened data directory {}",
            store.config().data_dir.display()
        );

        let session = Self {
            store,
            config,
            competitors,
            results,
            events,
            selected_event: None,
            ui,
            saves: JoinSet::new(),
            shown: HashMap::new(),
            rx,
        };
        (session, SessionHandle { tx })
    }

    /// Opens the session and runs it on a new task.
    pub fn spawn(
        store: Arc<DatasetStore>,
        config: SessionConfig,
        ui: U,
    ) -> (SessionHandle, task::JoinHandle<()>) {
        let (session, handle) = Self::open(store, config, ui);
        (handle, tokio::spawn(session.run()))
    }

    fn tab(&self, kind: DatasetKind) -> &DatasetTab {
        match kind {
            DatasetKind::Competitors => &self.competitors,
            DatasetKind::Results => &self.results,
            DatasetKind::Events => &self.events,
        }
    }

    fn tab_mut(&mut self, kind: DatasetKind) -> &mut DatasetTab {
        match kind {
            DatasetKind::Competitors => &mut self.competitors,
            DatasetKind::Results => &mut self.results,
            DatasetKind::Events => &mut self.events,
        }
    }

    pub async fn run(mut self) {
        loop {
            let deadline = self.next_deadline();
            let far = Instant::now() + Duration::from_secs(3600);

            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(Command::Close { reply }) => {
                        self.close().await;
                        let _ = reply.send(());
                        return;
                    }
                    Some(command) => self.handle(command, Instant::now()),
                    None => {
                        self.close().await;
                        return;
                    }
                },
                Some(done) = self.saves.join_next(), if !self.saves.is_empty() => match done {
                    Ok((kind, report)) => self.save_finished(kind, report, Instant::now()),
                    Err(e) => error!("Save task was cancelled: {}", e),
                },
                _ = sleep_until(deadline.unwrap_or(far)), if deadline.is_some() => {}
            }

            self.on_tick(Instant::now());
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        DatasetKind::all()
            .iter()
            .filter_map(|&kind| self.tab(kind).scheduler().next_deadline())
            .min()
    }

    fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::Commit {
                kind,
                row,
                column,
                value,
                reply,
            } => {
                let result = self.commit(kind, row, &column, &value, now);
                if let Err(e) = &result {
                    debug!(dataset = %kind, row, column = %column, "Edit rejected: {}", e);
                }
                let _ = reply.send(result);
            }
            Command::InsertRow { kind, reply } => {
                let _ = reply.send(self.tab_mut(kind).insert_row());
            }
            Command::DeleteRow { kind, row, reply } => {
                let _ = reply.send(self.tab_mut(kind).delete_row(row, now));
            }
            Command::Search { kind, query, reply } => {
                let tab = self.tab_mut(kind);
                tab.set_query(&query);
                let _ = reply.send(tab.view());
            }
            Command::LoadMore { kind, reply } => {
                let tab = self.tab_mut(kind);
                tab.load_more();
                let _ = reply.send(tab.view());
            }
            Command::View { kind, reply } => {
                let _ = reply.send(self.tab(kind).view());
            }
            Command::SelectEvent(event) => {
                debug!(event = ?event, "Selected event");
                self.selected_event = event.filter(|e| !e.trim().is_empty());
            }
            Command::Close { .. } => {}
        }
    }

    fn commit(
        &mut self,
        kind: DatasetKind,
        row: usize,
        column: &str,
        value: &str,
        now: Instant,
    ) -> std::result::Result<Committed, ValidationError> {
        let stamp_time = Local::now().naive_local();
        let selected = self.selected_event.as_deref();
        match kind {
            DatasetKind::Results => {
                let ctx = CommitContext {
                    competitors: Some(self.competitors.table()),
                    selected_event: selected,
                    now: stamp_time,
                };
                self.results.commit(row, column, value, &ctx, now)
            }
            DatasetKind::Competitors => {
                let ctx = CommitContext {
                    competitors: None,
                    selected_event: selected,
                    now: stamp_time,
                };
                self.competitors.commit(row, column, value, &ctx, now)
            }
            DatasetKind::Events => {
                let ctx = CommitContext {
                    competitors: None,
                    selected_event: selected,
                    now: stamp_time,
                };
                self.events.commit(row, column, value, &ctx, now)
            }
        }
    }

    fn on_tick(&mut self, now: Instant) {
        for &kind in DatasetKind::all() {
            let tab = self.tab_mut(kind);
            tab.scheduler_mut().tick(now);
            if tab.scheduler().is_due(now) && tab.scheduler_mut().start_save() {
                let snapshot = tab.snapshot();
                self.spawn_save(kind, snapshot);
            }
            self.publish(kind);
        }
    }

    fn spawn_save(&mut self, kind: DatasetKind, snapshot: Table) {
        debug!(dataset = %kind, rows = snapshot.len(), "Starting background save");
        let store = self.store.clone();
        self.saves.spawn(async move {
            let report = task::spawn_blocking(move || store.save_or_recover(kind, &snapshot)).await;
            (kind, report)
        });
    }

    fn save_finished(
        &mut self,
        kind: DatasetKind,
        report: std::result::Result<SaveReport, JoinError>,
        now: Instant,
    ) {
        let report = report.unwrap_or_else(|e| {
            error!(dataset = %kind, "Save task failed: {}", e);
            SaveReport {
                result: Err(StorageError::Io(std::io::Error::other(format!(
                    "save task failed: {}",
                    e
                )))),
                recovery: None,
            }
        });

        let outcome = match &report.result {
            Ok(()) => SaveOutcome::Saved,
            Err(_) => SaveOutcome::Failed {
                recovery: report.recovery.clone(),
            },
        };
        let effects = self.tab_mut(kind).scheduler_mut().finish_save(outcome, now);
        if effects.rearmed {
            debug!(dataset = %kind, "Edits arrived during save; scheduled another");
        }

        if effects.notify {
            if let Some(message) = report.failure_message(kind) {
                self.ui.error("Save failed", &message);
            }
        }
        self.publish(kind);
    }

    fn publish(&mut self, kind: DatasetKind) {
        let current = self.tab(kind).scheduler().indicator().clone();
        if self.shown.get(&kind) != Some(&current) {
            self.ui.indicator_changed(kind, &current);
            self.shown.insert(kind, current);
        }
    }

    /// Cancels timers, waits a bounded time for running saves, then writes
    /// the full contents of every tab one last time.
    async fn close(&mut self) {
        for &kind in DatasetKind::all() {
            self.tab_mut(kind).scheduler_mut().cancel();
        }

        if !self.saves.is_empty() {
            let wait = self.config.close_wait;
            let finished = tokio::time::timeout(wait, async {
                while let Some(done) = self.saves.join_next().await {
                    if let Ok((kind, report)) = done {
                        self.save_finished(kind, report, Instant::now());
                    }
                }
            })
            .await;
            if finished.is_err() {
                warn!("A save was still running after {:?}; saving again anyway", wait);
                self.saves.detach_all();
            }
        }

        for &kind in DatasetKind::all() {
            let tab = self.tab_mut(kind);
            tab.scheduler_mut().start_save();
            let snapshot = tab.snapshot();
            let store = self.store.clone();

            let report = task::spawn_blocking(move || store.save_or_recover(kind, &snapshot)).await;
            match report {
                Ok(report) => {
                    if let Some(message) = report.failure_message(kind) {
                        self.ui.error("Save failed", &message);
                    }
                    let outcome = match report.result {
                        Ok(()) => SaveOutcome::Saved,
                        Err(_) => SaveOutcome::Failed {
                            recovery: report.recovery,
                        },
                    };
                    self.tab_mut(kind).scheduler_mut().finish_save(outcome, Instant::now());
                }
                Err(e) => error!(dataset = %kind, "Final save task failed: {}", e),
            }
            self.publish(kind);
        }
        info!("Editing session closed");
    }
}
