//! A backend that records every call and keeps a committed side-effect table.
//!
//! Statements executed inside a transaction are staged and only move to the
//! committed table on commit, so atomicity can be checked by counting rows.
//! Failures are injected by statement substring.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dbplugin::config::ConnectionConfig;
use dbplugin::connection::{Backend, BackendConnection, BackendTransaction};
use dbplugin::errors::BackendError;

pub const ROTATE_TEMPLATE: &str = "ALTER USER '{{username}}'@'%' IDENTIFIED BY '{{password}}'";
pub const REVOKE_TEMPLATE: &str = "REVOKE ALL ON *.* FROM '{{name}}'@'%'; DROP USER '{{name}}'@'%'";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect,
    Ping,
    Begin(u64),
    Exec { tx: u64, statement: String, prepared: bool },
    Commit(u64),
    CommitFailed(u64),
    Rollback(u64),
    Close,
}

/// Failure injection knobs
#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub fail_on: Vec<String>,
    pub not_preparable: Vec<String>,
    pub hang_on: Vec<String>,
    pub refuse_connect: bool,
    pub refuse_begin: bool,
    /// begin fails the way a lazy pool does when the server is unreachable
    pub unreachable_on_begin: bool,
    pub fail_ping: bool,
    pub fail_commit: bool,
    pub exec_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    committed: Vec<String>,
    next_tx: u64,
    faults: Faults,
}

/// Shared view of everything the backend saw.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<State>>);

impl Recorder {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, event: Event) {
        self.state().events.push(event);
    }

    fn faults(&self) -> Faults {
        self.state().faults.clone()
    }

    pub fn set_faults(&self, update: impl FnOnce(&mut Faults)) {
        update(&mut self.state().faults);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    /// Statements that have been committed, in commit order
    pub fn committed(&self) -> Vec<String> {
        self.state().committed.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Exec { statement, .. } => Some(statement),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.state().events.iter().filter(|e| predicate(e)).count()
    }

    /// True when no backend I/O of any kind happened
    pub fn is_untouched(&self) -> bool {
        self.state().events.is_empty()
    }
}

pub struct RecordingBackend {
    recorder: Recorder,
}

impl RecordingBackend {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    fn type_name(&self) -> &'static str {
        "recording"
    }

    fn default_rotation_statements(&self) -> &'static [&'static str] {
        &[ROTATE_TEMPLATE]
    }

    fn default_revocation_statements(&self) -> &'static [&'static str] {
        &[REVOKE_TEMPLATE]
    }

    async fn connect(
        &self,
        _config: &ConnectionConfig,
    ) -> Result<Box<dyn BackendConnection>, BackendError> {
        if self.recorder.faults().refuse_connect {
            return Err(BackendError::connection("connection refused"));
        }
        self.recorder.record(Event::Connect);
        Ok(Box::new(RecordingConnection {
            recorder: self.recorder.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct RecordingConnection {
    recorder: Recorder,
    closed: AtomicBool,
}

#[async_trait]
impl BackendConnection for RecordingConnection {
    async fn ping(&self) -> Result<(), BackendError> {
        self.recorder.record(Event::Ping);
        if self.recorder.faults().fail_ping {
            return Err(BackendError::connection("dial tcp: connection refused"));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn BackendTransaction>, BackendError> {
        let faults = self.recorder.faults();
        if faults.unreachable_on_begin {
            return Err(BackendError::connection(
                "pool timed out while waiting for an open connection",
            ));
        }
        if faults.refuse_begin {
            return Err(BackendError::other("too many connections"));
        }
        let id = {
            let mut state = self.recorder.state();
            state.next_tx += 1;
            let id = state.next_tx;
            state.events.push(Event::Begin(id));
            id
        };
        Ok(Box::new(RecordingTransaction {
            recorder: self.recorder.clone(),
            id,
            staged: Vec::new(),
            resolved: false,
        }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.recorder.record(Event::Close);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct RecordingTransaction {
    recorder: Recorder,
    id: u64,
    staged: Vec<String>,
    resolved: bool,
}

impl RecordingTransaction {
    async fn run(&mut self, statement: &str, prepared: bool) -> Result<(), BackendError> {
        let faults = self.recorder.faults();
        if let Some(delay) = faults.exec_delay {
            tokio::time::sleep(delay).await;
        }

        self.recorder.record(Event::Exec { tx: self.id, statement: statement.to_string(), prepared });

        let matches = |patterns: &[String]| patterns.iter().any(|p| statement.contains(p.as_str()));
        if matches(&faults.hang_on) {
            std::future::pending::<()>().await;
        }
        if prepared && matches(&faults.not_preparable) {
            return Err(BackendError::not_preparable(
                "Error 1295: This command is not supported in the prepared statement protocol yet",
            ));
        }
        if matches(&faults.fail_on) {
            return Err(BackendError::other(format!("Error 1064: syntax error near '{}'", statement)));
        }

        self.staged.push(statement.to_string());
        Ok(())
    }
}

#[async_trait]
impl BackendTransaction for RecordingTransaction {
    async fn prepare_and_execute(&mut self, statement: &str) -> Result<(), BackendError> {
        self.run(statement, true).await
    }

    async fn execute_unprepared(&mut self, statement: &str) -> Result<(), BackendError> {
        self.run(statement, false).await
    }

    async fn commit(self: Box<Self>) -> Result<(), BackendError> {
        let mut this = self;
        this.resolved = true;
        let staged = std::mem::take(&mut this.staged);

        let mut state = this.recorder.state();
        if state.faults.fail_commit {
            state.events.push(Event::CommitFailed(this.id));
            return Err(BackendError::connection("commit failed: connection reset"));
        }
        state.committed.extend(staged);
        state.events.push(Event::Commit(this.id));
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), BackendError> {
        let mut this = self;
        this.resolved = true;
        this.recorder.record(Event::Rollback(this.id));
        Ok(())
    }
}

impl Drop for RecordingTransaction {
    fn drop(&mut self) {
        if !self.resolved {
            self.recorder.record(Event::Rollback(self.id));
        }
    }
}
