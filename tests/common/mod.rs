#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sql_bridge::driver::{ColumnDescription, Cursor, DriverHandle, Transport};
use sql_bridge::mssql::MssqlOptions;
use sql_bridge::{RowValues, SqlBridgeError};

/// Everything a connection asked of the driver, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect { autocommit: bool },
    SetAutocommit(bool),
    Commit,
    Rollback,
    Execute { sql: String, bindings: Vec<RowValues> },
    Close,
}

/// Canned result for statements containing `needle`.
#[derive(Debug, Clone)]
struct Response {
    needle: String,
    description: Vec<ColumnDescription>,
    rows: Vec<Vec<RowValues>>,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    responses: Vec<Response>,
    failures: Vec<(String, String)>,
    refuse_connect: Option<String>,
    fail_commit: bool,
    fail_autocommit_restore: bool,
}

/// In-memory transport that records every call and answers from a script.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<State>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Answer statements containing `needle` with `columns` and `rows`.
    pub fn respond(&self, needle: &str, columns: &[&str], rows: Vec<Vec<RowValues>>) {
        self.state().responses.push(Response {
            needle: needle.to_string(),
            description: columns.iter().map(|c| ColumnDescription::new(*c)).collect(),
            rows,
        });
    }

    /// Fail statements containing `needle` with an execution error carrying `message`.
    pub fn fail_on(&self, needle: &str, message: &str) {
        self.state()
            .failures
            .push((needle.to_string(), message.to_string()));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn refuse_connections(&self, message: &str) {
        self.state().refuse_connect = Some(message.to_string());
    }

    pub fn fail_commits(&self, fail: bool) {
        self.state().fail_commit = fail;
    }

    /// Make `set_autocommit(true)` fail, as a server dropping the link right after a commit would.
    pub fn fail_autocommit_restore(&self, fail: bool) {
        self.state().fail_autocommit_restore = fail;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn clear(&self) {
        self.state().events.clear();
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.state().events.iter().filter(|e| *e == wanted).count()
    }

    pub fn connects(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Connect { .. }))
            .count()
    }

    /// `(sql, bindings)` of every executed statement.
    pub fn executed(&self) -> Vec<(String, Vec<RowValues>)> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Execute { sql, bindings } => Some((sql.clone(), bindings.clone())),
                _ => None,
            })
            .collect()
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn connect(
        &self,
        _options: &MssqlOptions,
        autocommit: bool,
    ) -> Result<Box<dyn DriverHandle>, SqlBridgeError> {
        let mut state = self.state();
        if let Some(message) = &state.refuse_connect {
            return Err(SqlBridgeError::ConnectionError(message.clone()));
        }
        state.events.push(Event::Connect { autocommit });
        Ok(Box::new(RecordingHandle {
            state: Arc::clone(&self.state),
            autocommit,
        }))
    }
}

struct RecordingHandle {
    state: Arc<Mutex<State>>,
    autocommit: bool,
}

#[async_trait]
impl DriverHandle for RecordingHandle {
    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), SqlBridgeError> {
        let mut state = lock(&self.state);
        if enabled && state.fail_autocommit_restore {
            return Err(SqlBridgeError::ConnectionError(
                "connection reset by peer".to_string(),
            ));
        }
        state.events.push(Event::SetAutocommit(enabled));
        drop(state);
        self.autocommit = enabled;
        Ok(())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    async fn commit(&mut self) -> Result<(), SqlBridgeError> {
        let mut state = lock(&self.state);
        if state.fail_commit {
            return Err(SqlBridgeError::ExecutionError(
                "commit refused by server".to_string(),
            ));
        }
        state.events.push(Event::Commit);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlBridgeError> {
        lock(&self.state).events.push(Event::Rollback);
        Ok(())
    }

    fn cursor(&mut self) -> Box<dyn Cursor + '_> {
        Box::new(RecordingCursor {
            state: Arc::clone(&self.state),
            description: None,
            pending: VecDeque::new(),
        })
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        lock(&self.state).events.push(Event::Close);
        Ok(())
    }
}

struct RecordingCursor {
    state: Arc<Mutex<State>>,
    description: Option<Vec<ColumnDescription>>,
    pending: VecDeque<Vec<RowValues>>,
}

#[async_trait]
impl Cursor for RecordingCursor {
    async fn execute(&mut self, sql: &str, bindings: &[RowValues]) -> Result<(), SqlBridgeError> {
        let mut state = lock(&self.state);
        state.events.push(Event::Execute {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
        });
        if let Some((_, message)) = state.failures.iter().find(|(n, _)| sql.contains(n.as_str())) {
            return Err(SqlBridgeError::ExecutionError(message.clone()));
        }
        match state.responses.iter().find(|r| sql.contains(r.needle.as_str())) {
            Some(response) => {
                self.description = Some(response.description.clone());
                self.pending = response.rows.iter().cloned().collect();
            }
            None => {
                self.description = None;
                self.pending.clear();
            }
        }
        Ok(())
    }

    fn description(&self) -> Option<&[ColumnDescription]> {
        self.description.as_deref()
    }

    async fn fetch_one(&mut self) -> Result<Option<Vec<RowValues>>, SqlBridgeError> {
        Ok(self.pending.pop_front())
    }

    async fn fetch_all(&mut self) -> Result<Vec<Vec<RowValues>>, SqlBridgeError> {
        Ok(self.pending.drain(..).collect())
    }
}

pub fn options() -> MssqlOptions {
    MssqlOptions::builder()
        .host("localhost")
        .database("testing")
        .user("sa")
        .password("secret")
        .finish()
}
