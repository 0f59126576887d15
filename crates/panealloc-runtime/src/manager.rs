//! Pane lifecycle manager.
//!
//! One worker task owns all allocation state and processes commands strictly
//! in arrival order, so concurrent session events never interleave their
//! snapshot → decide → execute sequences. tmux calls run on the blocking pool.
//!
//! Timers (deferred retry, liveness reconcile) only enqueue commands; they
//! never touch state themselves.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use panealloc_core::deferred::{DEFERRED_TTL, MAX_DEFERRED_SESSIONS};
use panealloc_core::{
    CapacityConfig, DeferredQueue, EnqueueOutcome, PaneAction, SessionRegistry, TrackedSession,
    WindowState, decide_close_action, decide_spawn_actions,
};
use panealloc_tmux::{ActionExecutor, ActionOutcome, TmuxCommandRunner, TmuxError};

use crate::events::SessionCreated;
use crate::status::SessionStatusProbe;
use crate::ticker::Ticker;

/// Consecutive failed snapshots after which deferred retries stop.
pub const MAX_FAILED_SNAPSHOTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// When false, session events are ignored entirely.
    pub enabled: bool,
    pub deferred_retry_interval: Duration,
    pub deferred_ttl: Duration,
    pub deferred_capacity: usize,
    pub readiness_poll_interval: Duration,
    pub readiness_timeout: Duration,
    pub liveness_interval: Duration,
    pub status_stale_after: chrono::Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            deferred_retry_interval: Duration::from_secs(1),
            deferred_ttl: DEFERRED_TTL,
            deferred_capacity: MAX_DEFERRED_SESSIONS,
            readiness_poll_interval: Duration::from_millis(500),
            readiness_timeout: Duration::from_secs(10),
            liveness_interval: Duration::from_secs(5),
            status_stale_after: chrono::Duration::seconds(30),
        }
    }
}

#[derive(Debug)]
pub enum ManagerCommand {
    SessionCreated { session_id: String, title: String },
    SessionDeleted { session_id: String },
    DeferredTick,
    LivenessTick,
    Inspect { reply: oneshot::Sender<ManagerView> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Point-in-time view of the manager, served by `list_sessions`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerView {
    pub tracked: Vec<TrackedSession>,
    pub deferred: Vec<DeferredView>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeferredView {
    pub session_id: String,
    pub title: String,
    pub age_secs: u64,
}

/// Cloneable handle to the manager worker.
#[derive(Clone)]
pub struct PaneManager {
    tx: mpsc::UnboundedSender<ManagerCommand>,
    pending: Arc<Mutex<HashSet<String>>>,
    enabled: bool,
}

impl PaneManager {
    /// Spawn the worker. The returned handle resolves once the worker exits,
    /// either after [`PaneManager::shutdown`] or when every handle is dropped.
    pub fn start<R, P>(
        executor: ActionExecutor<R>,
        probe: P,
        settings: ManagerSettings,
    ) -> (Self, JoinHandle<()>)
    where
        R: TmuxCommandRunner + 'static,
        P: SessionStatusProbe + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(Mutex::new(HashSet::new()));
        let enabled = settings.enabled;
        let worker = Worker {
            capacity: executor.settings().capacity.clone(),
            executor: Arc::new(executor),
            probe: Arc::new(probe),
            sessions: SessionRegistry::new(),
            deferred: DeferredQueue::new(settings.deferred_capacity, settings.deferred_ttl),
            pending: Arc::clone(&pending),
            deferred_ticker: None,
            liveness_ticker: None,
            failed_snapshots: 0,
            tx: tx.downgrade(),
            settings,
        };
        let handle = tokio::spawn(worker.run(rx));
        (
            Self {
                tx,
                pending,
                enabled,
            },
            handle,
        )
    }

    /// Queue a created event. Returns whether it was accepted.
    ///
    /// Root sessions, disabled managers and sessions already waiting in the
    /// queue are ignored.
    pub fn session_created(&self, event: &SessionCreated) -> bool {
        if !self.enabled {
            tracing::debug!(session_id = %event.id, "pane allocation disabled, ignoring");
            return false;
        }
        if !event.is_worker() {
            tracing::debug!(session_id = %event.id, "session has no parent, ignoring");
            return false;
        }
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if !pending.insert(event.id.clone()) {
                tracing::debug!(session_id = %event.id, "session already pending");
                return false;
            }
        }
        let sent = self
            .tx
            .send(ManagerCommand::SessionCreated {
                session_id: event.id.clone(),
                title: event.display_title().to_string(),
            })
            .is_ok();
        if !sent {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&event.id);
        }
        sent
    }

    pub fn session_deleted(&self, session_id: &str) -> bool {
        if !self.enabled {
            return false;
        }
        self.tx
            .send(ManagerCommand::SessionDeleted {
                session_id: session_id.to_string(),
            })
            .is_ok()
    }

    /// `None` once the worker has stopped.
    pub async fn inspect(&self) -> Option<ManagerView> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(ManagerCommand::Inspect { reply }).ok()?;
        rx.await.ok()
    }

    /// Stop timers, drop deferred sessions and close every tracked pane.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(ManagerCommand::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

enum AttachOutcome {
    Attached,
    NoCapacity(String),
    SnapshotUnavailable,
    /// An eviction went through but the spawn did not; worth retrying.
    RolledBack,
    Failed,
}

struct Worker<R, P> {
    executor: Arc<ActionExecutor<R>>,
    probe: Arc<P>,
    capacity: CapacityConfig,
    settings: ManagerSettings,
    sessions: SessionRegistry,
    deferred: DeferredQueue,
    pending: Arc<Mutex<HashSet<String>>>,
    deferred_ticker: Option<Ticker<ManagerCommand>>,
    liveness_ticker: Option<Ticker<ManagerCommand>>,
    failed_snapshots: u32,
    tx: mpsc::WeakUnboundedSender<ManagerCommand>,
}

impl<R, P> Worker<R, P>
where
    R: TmuxCommandRunner + 'static,
    P: SessionStatusProbe + 'static,
{
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ManagerCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                ManagerCommand::SessionCreated { session_id, title } => {
                    self.on_session_created(&session_id, &title).await;
                    self.pending
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&session_id);
                }
                ManagerCommand::SessionDeleted { session_id } => {
                    self.on_session_deleted(&session_id).await;
                }
                ManagerCommand::DeferredTick => {
                    self.on_deferred_tick().await;
                    if let Some(ticker) = &self.deferred_ticker {
                        ticker.finish_tick();
                    }
                }
                ManagerCommand::LivenessTick => {
                    self.on_liveness_tick().await;
                    if let Some(ticker) = &self.liveness_ticker {
                        ticker.finish_tick();
                    }
                }
                ManagerCommand::Inspect { reply } => {
                    let _ = reply.send(self.view());
                }
                ManagerCommand::Shutdown { reply } => {
                    self.cleanup().await;
                    let _ = reply.send(());
                    return;
                }
            }
        }
        self.stop_deferred_ticker();
        self.stop_liveness_ticker();
    }

    // ─── Events ─────────────────────────────────────────────────────

    async fn on_session_created(&mut self, session_id: &str, title: &str) {
        if self.sessions.contains(session_id) || self.deferred.contains(session_id) {
            tracing::debug!(session_id, "session already known, ignoring");
            return;
        }
        match self.try_attach(session_id, title).await {
            AttachOutcome::Attached => {}
            AttachOutcome::NoCapacity(reason) => {
                tracing::info!(session_id, reason = %reason, "no room for pane, deferring");
                self.defer(session_id, title);
            }
            AttachOutcome::SnapshotUnavailable | AttachOutcome::RolledBack => {
                self.defer(session_id, title);
            }
            AttachOutcome::Failed => {
                tracing::warn!(session_id, "could not attach session");
            }
        }
    }

    async fn on_session_deleted(&mut self, session_id: &str) {
        if self.deferred.remove(session_id).is_some() {
            tracing::info!(session_id, "dropped deferred session");
            if self.deferred.is_empty() {
                self.stop_deferred_ticker();
            }
        }
        if self.sessions.contains(session_id) {
            self.close_tracked(session_id).await;
        }
    }

    async fn on_deferred_tick(&mut self) {
        let now = Instant::now().into_std();
        for expired in self.deferred.pop_expired(now) {
            tracing::info!(
                session_id = %expired.session_id,
                "deferred session expired before a pane was available"
            );
        }
        let Some(head) = self.deferred.front().cloned() else {
            self.stop_deferred_ticker();
            return;
        };

        match self.try_attach(&head.session_id, &head.title).await {
            AttachOutcome::Attached => {
                self.failed_snapshots = 0;
                self.deferred.remove(&head.session_id);
            }
            AttachOutcome::SnapshotUnavailable => {
                self.failed_snapshots += 1;
                if self.failed_snapshots >= MAX_FAILED_SNAPSHOTS {
                    tracing::warn!(
                        attempts = self.failed_snapshots,
                        "window snapshot keeps failing, pausing deferred retries"
                    );
                    self.stop_deferred_ticker();
                }
            }
            AttachOutcome::NoCapacity(reason) => {
                self.failed_snapshots = 0;
                tracing::debug!(
                    session_id = %head.session_id,
                    reason = %reason,
                    "still no room"
                );
            }
            AttachOutcome::RolledBack | AttachOutcome::Failed => {
                self.failed_snapshots = 0;
            }
        }
        if self.deferred.is_empty() {
            self.stop_deferred_ticker();
        }
    }

    async fn on_liveness_tick(&mut self) {
        let state = match self.snapshot().await {
            Ok(state) => state,
            Err(e) => {
                tracing::debug!("liveness check skipped: {e}");
                return;
            }
        };

        let now = Utc::now();
        let mut vanished = Vec::new();
        let mut seen = Vec::new();
        let mut stale = Vec::new();
        for session in self.sessions.sessions() {
            if !state.contains_pane(&session.pane_id) {
                vanished.push(session.session_id.clone());
            } else if self.probe.has_status(&session.session_id) {
                seen.push(session.session_id.clone());
            } else if session.last_seen_at > session.created_at
                && now - session.last_seen_at > self.settings.status_stale_after
            {
                stale.push(session.session_id.clone());
            }
        }

        for session_id in vanished {
            tracing::info!(session_id = %session_id, "pane disappeared, forgetting session");
            self.sessions.untrack(&session_id);
        }
        for session_id in seen {
            self.sessions.mark_seen(&session_id, now);
        }
        for session_id in stale {
            tracing::info!(session_id = %session_id, "session no longer reported, closing pane");
            self.close_tracked(&session_id).await;
        }
        if self.sessions.is_empty() {
            self.stop_liveness_ticker();
        }
    }

    // ─── Allocation ─────────────────────────────────────────────────

    async fn try_attach(&mut self, session_id: &str, title: &str) -> AttachOutcome {
        let state = match self.snapshot().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(session_id, "window snapshot failed: {e}");
                return AttachOutcome::SnapshotUnavailable;
            }
        };

        let mappings = self.sessions.mappings();
        let decision = decide_spawn_actions(&state, session_id, title, &self.capacity, &mappings);
        if !decision.can_spawn {
            return AttachOutcome::NoCapacity(decision.reason.unwrap_or_default());
        }
        if let Some(reason) = &decision.reason {
            tracing::info!(session_id, reason = %reason, "making room for new pane");
        }
        self.execute_plan(session_id, title, decision.actions).await
    }

    async fn execute_plan(
        &mut self,
        session_id: &str,
        title: &str,
        actions: Vec<PaneAction>,
    ) -> AttachOutcome {
        let mut evicted = false;
        let mut attached = None;
        let mut partial = None;

        for action in actions {
            let outcome = self.execute(action.clone()).await;
            match action {
                PaneAction::Close {
                    session_id: old, ..
                } => {
                    if outcome.success {
                        self.sessions.untrack(&old);
                        evicted = true;
                    }
                }
                PaneAction::Replace { old_session_id, .. } => {
                    if outcome.success {
                        self.sessions.untrack(&old_session_id);
                        attached = outcome.pane_id;
                    } else {
                        partial = outcome.pane_id;
                    }
                }
                PaneAction::Spawn { .. } => {
                    if outcome.success {
                        attached = outcome.pane_id;
                    } else {
                        partial = outcome.pane_id;
                    }
                }
            }
        }

        let Some(pane_id) = attached else {
            if let Some(pane_id) = partial {
                tracing::debug!(session_id, pane_id = %pane_id, "closing partially created pane");
                self.execute(PaneAction::Close {
                    pane_id,
                    session_id: session_id.to_string(),
                })
                .await;
            }
            return if evicted {
                AttachOutcome::RolledBack
            } else {
                AttachOutcome::Failed
            };
        };

        if !self.wait_until_ready(session_id).await {
            tracing::info!(session_id, "session not reporting status yet, tracking anyway");
        }
        self.sessions.track(session_id, &pane_id, title, Utc::now());
        tracing::info!(
            session_id,
            pane_id = %pane_id,
            tracked = self.sessions.len(),
            "session attached"
        );
        self.ensure_liveness_ticker();
        AttachOutcome::Attached
    }

    async fn wait_until_ready(&self, session_id: &str) -> bool {
        let deadline = Instant::now() + self.settings.readiness_timeout;
        loop {
            if self.probe.has_status(session_id) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.settings.readiness_poll_interval).await;
        }
    }

    async fn close_tracked(&mut self, session_id: &str) {
        let mappings = self.sessions.mappings();
        match self.snapshot().await {
            Ok(state) => match decide_close_action(&state, session_id, &mappings) {
                Some(action) => {
                    if !self.execute(action).await.success {
                        tracing::warn!(session_id, "could not close pane");
                    }
                }
                None => tracing::debug!(session_id, "pane already gone"),
            },
            Err(e) => tracing::warn!(session_id, "window snapshot failed, not closing: {e}"),
        }
        self.sessions.untrack(session_id);
        if self.sessions.is_empty() {
            self.stop_liveness_ticker();
        }
    }

    fn defer(&mut self, session_id: &str, title: &str) {
        match self
            .deferred
            .enqueue(session_id, title, Instant::now().into_std())
        {
            EnqueueOutcome::Queued => {
                tracing::info!(session_id, queued = self.deferred.len(), "session deferred");
                self.ensure_deferred_ticker();
            }
            EnqueueOutcome::AlreadyQueued => {}
            EnqueueOutcome::Full => {
                tracing::warn!(session_id, "deferred queue full, dropping session");
            }
        }
    }

    async fn cleanup(&mut self) {
        self.stop_deferred_ticker();
        self.stop_liveness_ticker();
        if !self.deferred.is_empty() {
            tracing::info!(dropped = self.deferred.len(), "discarding deferred sessions");
            self.deferred.clear();
        }
        for session in self.sessions.drain() {
            let outcome = self
                .execute(PaneAction::Close {
                    pane_id: session.pane_id.clone(),
                    session_id: session.session_id.clone(),
                })
                .await;
            if !outcome.success {
                tracing::warn!(
                    session_id = %session.session_id,
                    pane_id = %session.pane_id,
                    "could not close pane on shutdown"
                );
            }
        }
    }

    fn view(&self) -> ManagerView {
        let now = Instant::now().into_std();
        let mut pending: Vec<String> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        pending.sort();
        ManagerView {
            tracked: self.sessions.sessions().into_iter().cloned().collect(),
            deferred: self
                .deferred
                .iter()
                .map(|d| DeferredView {
                    session_id: d.session_id.clone(),
                    title: d.title.clone(),
                    age_secs: d.age(now).as_secs(),
                })
                .collect(),
            pending,
        }
    }

    // ─── tmux ───────────────────────────────────────────────────────

    async fn snapshot(&self) -> Result<WindowState, TmuxError> {
        let executor = Arc::clone(&self.executor);
        tokio::task::spawn_blocking(move || executor.snapshot())
            .await
            .map_err(|e| TmuxError::CommandFailed(format!("snapshot task failed: {e}")))?
    }

    async fn execute(&self, action: PaneAction) -> ActionOutcome {
        let executor = Arc::clone(&self.executor);
        let kind = action.kind();
        match tokio::task::spawn_blocking(move || executor.execute(&action)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(action = kind, "tmux task failed: {e}");
                ActionOutcome::default()
            }
        }
    }

    // ─── Timers ─────────────────────────────────────────────────────

    fn ensure_deferred_ticker(&mut self) {
        if self.deferred_ticker.is_none() {
            self.failed_snapshots = 0;
            self.deferred_ticker = Some(Ticker::start(
                self.settings.deferred_retry_interval,
                self.tx.clone(),
                || ManagerCommand::DeferredTick,
            ));
        }
    }

    fn stop_deferred_ticker(&mut self) {
        if let Some(ticker) = self.deferred_ticker.take() {
            ticker.stop();
        }
    }

    fn ensure_liveness_ticker(&mut self) {
        if self.liveness_ticker.is_none() {
            self.liveness_ticker = Some(Ticker::start(
                self.settings.liveness_interval,
                self.tx.clone(),
                || ManagerCommand::LivenessTick,
            ));
        }
    }

    fn stop_liveness_ticker(&mut self) {
        if let Some(ticker) = self.liveness_ticker.take() {
            ticker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_tmux::FakeTmux;
    use crate::status::StatusRegistry;
    use panealloc_tmux::{AttachSettings, DEFAULT_ATTACH_COMMAND};

    fn start(
        tmux: &Arc<FakeTmux>,
        statuses: &StatusRegistry,
        settings: ManagerSettings,
    ) -> (PaneManager, JoinHandle<()>) {
        let executor = ActionExecutor::new(
            Arc::clone(tmux),
            AttachSettings {
                reference_pane: "%0".to_string(),
                capacity: CapacityConfig::default(),
                server_url: "http://127.0.0.1:4096".to_string(),
                attach_command: DEFAULT_ATTACH_COMMAND.to_string(),
            },
        );
        PaneManager::start(executor, statuses.clone(), settings)
    }

    fn child(id: &str) -> SessionCreated {
        SessionCreated {
            id: id.to_string(),
            parent_id: Some("ses_root".to_string()),
            title: Some(format!("task {id}")),
        }
    }

    /// Statuses reported up front so readiness is immediate.
    fn ready(ids: &[&str]) -> StatusRegistry {
        let statuses = StatusRegistry::new();
        for id in ids {
            statuses.update(id, "busy", Utc::now());
        }
        statuses
    }

    async fn view(manager: &PaneManager) -> ManagerView {
        manager.inspect().await.expect("manager running")
    }

    // ─── Attach / detach ────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn spawn_then_delete_leaves_nothing_tracked() {
        let tmux = FakeTmux::new(220, 44);
        let (manager, _worker) = start(&tmux, &ready(&["ses_a"]), ManagerSettings::default());

        assert!(manager.session_created(&child("ses_a")));
        let v = view(&manager).await;
        assert_eq!(v.tracked.len(), 1);
        assert_eq!(v.tracked[0].pane_id, "%1");
        assert!(v.pending.is_empty());
        assert_eq!(tmux.title_of("%1").as_deref(), Some("task ses_a"));

        assert!(manager.session_deleted("ses_a"));
        let v = view(&manager).await;
        assert!(v.tracked.is_empty());
        assert_eq!(tmux.kill_targets(), vec!["%1".to_string()]);
        assert_eq!(tmux.pane_ids(), vec!["%0".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_unknown_session_is_a_noop() {
        let tmux = FakeTmux::new(220, 44);
        let (manager, _worker) = start(&tmux, &ready(&[]), ManagerSettings::default());

        manager.session_deleted("ses_never_seen");
        let v = view(&manager).await;
        assert!(v.tracked.is_empty());
        assert_eq!(tmux.count("kill-pane"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn root_sessions_are_ignored() {
        let tmux = FakeTmux::new(220, 44);
        let (manager, _worker) = start(&tmux, &ready(&[]), ManagerSettings::default());

        let root = SessionCreated {
            id: "ses_root".to_string(),
            parent_id: None,
            title: None,
        };
        assert!(!manager.session_created(&root));
        let v = view(&manager).await;
        assert!(v.tracked.is_empty());
        assert_eq!(tmux.count("list-panes"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_manager_ignores_events() {
        let tmux = FakeTmux::new(220, 44);
        let settings = ManagerSettings {
            enabled: false,
            ..ManagerSettings::default()
        };
        let (manager, _worker) = start(&tmux, &ready(&["ses_a"]), settings);

        assert!(!manager.session_created(&child("ses_a")));
        assert!(view(&manager).await.tracked.is_empty());
        assert_eq!(tmux.count("split-window"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_created_events_spawn_once() {
        let tmux = FakeTmux::new(220, 44);
        let (manager, _worker) = start(&tmux, &ready(&["ses_a"]), ManagerSettings::default());

        assert!(manager.session_created(&child("ses_a")));
        assert!(!manager.session_created(&child("ses_a")), "still pending");
        view(&manager).await;
        assert!(manager.session_created(&child("ses_a")), "accepted again once processed");

        let v = view(&manager).await;
        assert_eq!(v.tracked.len(), 1);
        assert_eq!(tmux.count("split-window"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attaches_without_status_after_readiness_timeout() {
        let tmux = FakeTmux::new(220, 44);
        let (manager, _worker) = start(&tmux, &ready(&[]), ManagerSettings::default());

        manager.session_created(&child("ses_quiet"));
        let v = view(&manager).await;
        assert_eq!(v.tracked.len(), 1);
        assert_eq!(v.tracked[0].session_id, "ses_quiet");
    }

    // ─── Deferral ───────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn narrow_window_defers_until_room_appears() {
        let tmux = FakeTmux::new(60, 44);
        let (manager, _worker) = start(&tmux, &ready(&["ses_a"]), ManagerSettings::default());

        manager.session_created(&child("ses_a"));
        let v = view(&manager).await;
        assert!(v.tracked.is_empty());
        assert_eq!(v.deferred.len(), 1);
        assert_eq!(v.deferred[0].session_id, "ses_a");
        assert_eq!(tmux.count("split-window"), 0);

        tmux.set_window_width(220);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let v = view(&manager).await;
        assert!(v.deferred.is_empty());
        assert_eq!(v.tracked.len(), 1);
        assert_eq!(tmux.count("split-window"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_a_deferred_session_drops_it() {
        let tmux = FakeTmux::new(60, 44);
        let (manager, _worker) = start(&tmux, &ready(&[]), ManagerSettings::default());

        manager.session_created(&child("ses_a"));
        assert_eq!(view(&manager).await.deferred.len(), 1);

        manager.session_deleted("ses_a");
        tmux.set_window_width(220);
        tokio::time::sleep(Duration::from_secs(3)).await;

        let v = view(&manager).await;
        assert!(v.deferred.is_empty());
        assert!(v.tracked.is_empty());
        assert_eq!(tmux.count("split-window"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deferred_session_is_never_promoted() {
        let tmux = FakeTmux::new(60, 44);
        let (manager, _worker) = start(&tmux, &ready(&["ses_a"]), ManagerSettings::default());

        manager.session_created(&child("ses_a"));
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(view(&manager).await.deferred.len(), 1);

        tmux.set_window_width(220);
        tokio::time::advance(DEFERRED_TTL + Duration::from_secs(1)).await;

        let mut v = view(&manager).await;
        for _ in 0..10 {
            if v.deferred.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            v = view(&manager).await;
        }
        assert!(v.deferred.is_empty());
        assert!(v.tracked.is_empty());
        assert_eq!(tmux.count("split-window"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_snapshot_failures_pause_retries() {
        let tmux = FakeTmux::new(60, 44);
        let (manager, _worker) = start(&tmux, &ready(&[]), ManagerSettings::default());

        manager.session_created(&child("ses_a"));
        assert_eq!(view(&manager).await.deferred.len(), 1);

        tmux.fail_snapshots(true);
        let before = tmux.count("list-panes");
        tokio::time::sleep(Duration::from_millis(6500)).await;

        assert_eq!(
            tmux.count("list-panes") - before,
            MAX_FAILED_SNAPSHOTS as usize
        );
        assert_eq!(view(&manager).await.deferred.len(), 1, "entry is kept");
    }

    // ─── Eviction ───────────────────────────────────────────────────

    async fn tracked_ids(manager: &PaneManager) -> Vec<String> {
        let mut ids: Vec<String> = view(manager)
            .await
            .tracked
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        ids.sort();
        ids
    }

    async fn fill_four(manager: &PaneManager) {
        for id in ["s0", "s1", "s2", "s3"] {
            manager.session_created(&child(id));
            view(manager).await;
        }
        assert_eq!(view(manager).await.tracked.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn full_grid_closes_oldest_and_forgets_it() {
        let tmux = FakeTmux::new(220, 44);
        let statuses = ready(&["s0", "s1", "s2", "s3", "s4"]);
        let (manager, _worker) = start(&tmux, &statuses, ManagerSettings::default());
        fill_four(&manager).await;

        manager.session_created(&child("s4"));
        assert_eq!(tracked_ids(&manager).await, vec!["s1", "s2", "s3", "s4"]);
        assert_eq!(tmux.kill_targets(), vec!["%1".to_string()]);
        assert!(view(&manager).await.deferred.is_empty());
        assert_eq!(tmux.count("respawn-pane"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn narrow_agent_area_reuses_oldest_pane() {
        let tmux = FakeTmux::new(170, 44);
        let (manager, _worker) =
            start(&tmux, &ready(&["ses_a", "ses_b"]), ManagerSettings::default());

        manager.session_created(&child("ses_a"));
        assert_eq!(tracked_ids(&manager).await, vec!["ses_a"]);

        manager.session_created(&child("ses_b"));
        let v = view(&manager).await;
        assert_eq!(v.tracked.len(), 1);
        assert_eq!(v.tracked[0].session_id, "ses_b");
        assert_eq!(v.tracked[0].pane_id, "%1");
        assert_eq!(tmux.count("respawn-pane"), 1);
        assert_eq!(tmux.count("split-window"), 1);
        assert_eq!(tmux.count("kill-pane"), 0);
        assert_eq!(tmux.title_of("%1").as_deref(), Some("task ses_b"));
        assert_eq!(tmux.pane_ids(), vec!["%0".to_string(), "%1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_spawn_after_eviction_defers_session() {
        let tmux = FakeTmux::new(220, 44);
        let statuses = ready(&["s0", "s1", "s2", "s3", "s4"]);
        let (manager, _worker) = start(&tmux, &statuses, ManagerSettings::default());
        fill_four(&manager).await;

        tmux.fail_splits(true);
        manager.session_created(&child("s4"));
        let v = view(&manager).await;
        let deferred: Vec<&str> = v.deferred.iter().map(|d| d.session_id.as_str()).collect();
        assert_eq!(deferred, vec!["s4"]);
        assert_eq!(tracked_ids(&manager).await, vec!["s1", "s2", "s3"]);
        assert_eq!(tmux.kill_targets(), vec!["%1".to_string()]);
    }

    // ─── Liveness ───────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn vanished_pane_is_forgotten_without_kill() {
        let tmux = FakeTmux::new(220, 44);
        let (manager, _worker) = start(&tmux, &ready(&["ses_a"]), ManagerSettings::default());

        manager.session_created(&child("ses_a"));
        assert_eq!(view(&manager).await.tracked.len(), 1);

        tmux.kill_externally("%1");
        tokio::time::sleep(Duration::from_millis(5500)).await;

        assert!(view(&manager).await.tracked.is_empty());
        assert_eq!(tmux.count("kill-pane"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_that_stops_reporting_is_closed() {
        let tmux = FakeTmux::new(220, 44);
        let statuses = ready(&["ses_a"]);
        let settings = ManagerSettings {
            status_stale_after: chrono::Duration::zero(),
            ..ManagerSettings::default()
        };
        let (manager, _worker) = start(&tmux, &statuses, settings);

        manager.session_created(&child("ses_a"));
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(view(&manager).await.tracked.len(), 1, "seen on first check");

        statuses.remove("ses_a");
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(view(&manager).await.tracked.is_empty());
        assert_eq!(tmux.kill_targets(), vec!["%1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn never_reporting_session_is_not_reaped() {
        let tmux = FakeTmux::new(220, 44);
        let settings = ManagerSettings {
            status_stale_after: chrono::Duration::zero(),
            ..ManagerSettings::default()
        };
        let (manager, _worker) = start(&tmux, &ready(&[]), settings);

        manager.session_created(&child("ses_a"));
        tokio::time::sleep(Duration::from_secs(16)).await;

        assert_eq!(view(&manager).await.tracked.len(), 1);
        assert_eq!(tmux.count("kill-pane"), 0);
    }

    // ─── Shutdown ───────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_every_tracked_pane() {
        let tmux = FakeTmux::new(220, 44);
        let (manager, worker) =
            start(&tmux, &ready(&["ses_a", "ses_b"]), ManagerSettings::default());

        manager.session_created(&child("ses_a"));
        manager.session_created(&child("ses_b"));
        let tracked: Vec<String> = view(&manager)
            .await
            .tracked
            .into_iter()
            .map(|s| s.pane_id)
            .collect();
        assert!(!tracked.is_empty());

        manager.shutdown().await;
        worker.await.expect("worker exits");

        let mut killed = tmux.kill_targets();
        killed.sort();
        let mut expected = tracked;
        expected.sort();
        assert_eq!(killed, expected);
        assert!(manager.inspect().await.is_none());
    }
}
