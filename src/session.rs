//! Conversation history: one current session plus an archive, most recently
//! updated first.
//!
//! The store has a single owner and every mutation goes through `&mut self`,
//! which keeps append, archive and delete strictly ordered. The archive is
//! written to its [`HistoryStore`] after every mutation.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StoreError;
use crate::storage::write_json_atomically;
use crate::types::{Originator, SessionId, TurnId};

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub text: String,
    pub originator: Originator,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    id: SessionId,
    turns: Vec<ConversationTurn>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl ConversationSession {
    /// Fresh, empty session.
    #[must_use]
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: SessionId::new(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Turns in chronological order.
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }

    fn push(&mut self, text: String, originator: Originator) -> TurnId {
        let now = OffsetDateTime::now_utc();
        let turn = ConversationTurn {
            id: TurnId::new(),
            text,
            originator,
            created_at: now,
        };
        let id = turn.id;
        self.turns.push(turn);
        self.updated_at = now;
        id
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Durable storage for the archived sessions.
pub trait HistoryStore {
    /// Read the archive. An absent archive is `Ok(vec![])`.
    fn load(&self) -> Result<Vec<ConversationSession>, StoreError>;

    /// Replace the stored archive with `sessions`.
    fn save(&self, sessions: &[ConversationSession]) -> Result<(), StoreError>;
}

/// Archive kept as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileHistory {
    fn load(&self) -> Result<Vec<ConversationSession>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, sessions: &[ConversationSession]) -> Result<(), StoreError> {
        write_json_atomically(&self.path, sessions)
    }
}

/// Archive held in memory only.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    sessions: Mutex<Vec<ConversationSession>>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing archive.
    #[must_use]
    pub fn with_sessions(sessions: Vec<ConversationSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
        }
    }

    /// What was last saved.
    #[must_use]
    pub fn saved(&self) -> Vec<ConversationSession> {
        self.sessions.lock().clone()
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> Result<Vec<ConversationSession>, StoreError> {
        Ok(self.sessions.lock().clone())
    }

    fn save(&self, sessions: &[ConversationSession]) -> Result<(), StoreError> {
        *self.sessions.lock() = sessions.to_vec();
        Ok(())
    }
}

/// Current conversation plus the archive of earlier ones.
///
/// The current session's id never appears in the archive.
#[derive(Debug)]
pub struct SessionStore<H> {
    history: H,
    current: ConversationSession,
    archived: Vec<ConversationSession>,
}

impl<H: HistoryStore> SessionStore<H> {
    /// Opens the store, loading the archive. An unreadable archive starts
    /// empty instead of failing.
    pub fn open(history: H) -> Self {
        let archived = history.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Chat history unreadable; starting empty");
            Vec::new()
        });
        Self {
            history,
            current: ConversationSession::new(),
            archived,
        }
    }

    #[must_use]
    pub fn current(&self) -> &ConversationSession {
        &self.current
    }

    /// Archived sessions, most recently updated first.
    #[must_use]
    pub fn archived(&self) -> &[ConversationSession] {
        &self.archived
    }

    #[must_use]
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Appends a turn to the current session.
    ///
    /// # Errors
    ///
    /// Returns the persistence error, if any. The turn is kept in memory either way.
    pub fn append_turn(
        &mut self,
        text: impl Into<String>,
        originator: Originator,
    ) -> Result<TurnId, StoreError> {
        let id = self.current.push(text.into(), originator);
        self.persist()?;
        Ok(id)
    }

    /// Archives the current session (if it has turns) and starts an empty one.
    ///
    /// # Errors
    ///
    /// Returns the persistence error, if any.
    pub fn start_new_session(&mut self) -> Result<(), StoreError> {
        let previous = std::mem::take(&mut self.current);
        self.archive(previous);
        self.persist()
    }

    /// Makes an archived session current, archiving the current one first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionNotFound`] if `id` is not archived, or the
    /// persistence error.
    pub fn load_session(&mut self, id: SessionId) -> Result<(), StoreError> {
        if self.current.id == id {
            return Ok(());
        }
        let pos = self
            .archived
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::SessionNotFound(id))?;

        let target = self.archived.remove(pos);
        let previous = std::mem::replace(&mut self.current, target);
        self.archive(previous);
        self.persist()
    }

    /// Deletes a session. Deleting the current one replaces it with an empty session.
    ///
    /// # Errors
    ///
    /// Returns the persistence error, if any.
    pub fn delete_session(&mut self, id: SessionId) -> Result<(), StoreError> {
        self.archived.retain(|s| s.id != id);
        if self.current.id == id {
            self.current = ConversationSession::new();
        }
        self.persist()
    }

    /// Drops the whole archive and resets the current session.
    ///
    /// # Errors
    ///
    /// Returns the persistence error, if any.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.archived.clear();
        self.current = ConversationSession::new();
        self.persist()
    }

    /// Folds the current session into the archive and writes it out.
    ///
    /// # Errors
    ///
    /// Returns the persistence error, if any.
    pub fn close(mut self) -> Result<(), StoreError> {
        let current = std::mem::take(&mut self.current);
        self.archive(current);
        self.persist()
    }

    /// Inserts at the head, replacing any entry with the same id. Empty sessions are dropped.
    fn archive(&mut self, session: ConversationSession) {
        if session.is_empty() {
            return;
        }
        tracing::debug!(session_id = %session.id, turns = session.turns.len(), "Archiving session");
        self.archived.retain(|s| s.id != session.id);
        self.archived.insert(0, session);
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.history.save(&self.archived).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to persist chat history");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore<MemoryHistory> {
        SessionStore::open(MemoryHistory::new())
    }

    fn texts(session: &ConversationSession) -> Vec<&str> {
        session.turns().iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn new_session_archives_turns_in_order() {
        let mut s = store();
        s.append_turn("hi", Originator::User).unwrap();
        s.append_turn("hello", Originator::Assistant).unwrap();
        s.start_new_session().unwrap();

        assert!(s.current().is_empty());
        assert_eq!(s.archived().len(), 1);
        let head = &s.archived()[0];
        assert_eq!(texts(head), vec!["hi", "hello"]);
        assert_eq!(head.turns()[0].originator, Originator::User);
        assert_eq!(head.turns()[1].originator, Originator::Assistant);
        assert_eq!(s.history().saved(), s.archived());
    }

    #[test]
    fn new_session_after_n_turns() {
        let mut s = store();
        let n = 25;
        for i in 0..n {
            s.append_turn(format!("m{i}"), Originator::User).unwrap();
        }
        s.start_new_session().unwrap();

        assert_eq!(s.archived().len(), 1);
        let expected: Vec<String> = (0..n).map(|i| format!("m{i}")).collect();
        let got: Vec<String> = s.archived()[0]
            .turns()
            .iter()
            .map(|t| t.text.clone())
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn empty_current_is_not_archived() {
        let mut s = store();
        s.start_new_session().unwrap();
        s.start_new_session().unwrap();
        assert!(s.archived().is_empty());
    }

    #[test]
    fn archive_is_most_recent_first() {
        let mut s = store();
        s.append_turn("first", Originator::User).unwrap();
        s.start_new_session().unwrap();
        s.append_turn("second", Originator::User).unwrap();
        s.start_new_session().unwrap();

        assert_eq!(texts(&s.archived()[0]), vec!["second"]);
        assert_eq!(texts(&s.archived()[1]), vec!["first"]);
    }

    #[test]
    fn updated_at_moves_with_appends() {
        let mut s = store();
        let created = s.current().created_at();
        s.append_turn("x", Originator::User).unwrap();
        assert!(s.current().updated_at() >= created);
    }

    #[test]
    fn load_session_swaps_current_out() {
        let mut s = store();
        s.append_turn("old", Originator::User).unwrap();
        let old_id = s.current().id();
        s.start_new_session().unwrap();
        s.append_turn("new", Originator::User).unwrap();
        let new_id = s.current().id();

        s.load_session(old_id).unwrap();

        assert_eq!(s.current().id(), old_id);
        assert_eq!(texts(s.current()), vec!["old"]);
        assert_eq!(s.archived().len(), 1);
        assert_eq!(s.archived()[0].id(), new_id);
        assert!(s.archived().iter().all(|a| a.id() != s.current().id()));
    }

    #[test]
    fn load_then_archive_replaces_existing_entry() {
        let mut s = store();
        s.append_turn("a", Originator::User).unwrap();
        let id = s.current().id();
        s.start_new_session().unwrap();
        s.load_session(id).unwrap();
        s.append_turn("b", Originator::Assistant).unwrap();
        s.start_new_session().unwrap();

        assert_eq!(s.archived().len(), 1);
        assert_eq!(s.archived()[0].id(), id);
        assert_eq!(texts(&s.archived()[0]), vec!["a", "b"]);
    }

    #[test]
    fn load_unknown_session_fails() {
        let mut s = store();
        let err = s.load_session(SessionId::new()).unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[test]
    fn delete_current_leaves_archive_alone() {
        let mut s = store();
        s.append_turn("keep me", Originator::User).unwrap();
        s.start_new_session().unwrap();
        s.append_turn("doomed", Originator::User).unwrap();
        let doomed = s.current().id();
        let before = s.archived().to_vec();

        s.delete_session(doomed).unwrap();

        assert!(s.current().is_empty());
        assert_ne!(s.current().id(), doomed);
        assert_eq!(s.archived(), before.as_slice());
    }

    #[test]
    fn delete_archived_session() {
        let mut s = store();
        s.append_turn("one", Originator::User).unwrap();
        let one = s.current().id();
        s.start_new_session().unwrap();
        s.append_turn("two", Originator::User).unwrap();
        s.start_new_session().unwrap();

        s.delete_session(one).unwrap();
        assert_eq!(s.archived().len(), 1);
        assert_eq!(texts(&s.archived()[0]), vec!["two"]);
        assert_eq!(s.history().saved().len(), 1);
    }

    #[test]
    fn clear_all_empties_everything() {
        let mut s = store();
        s.append_turn("x", Originator::User).unwrap();
        s.start_new_session().unwrap();
        s.append_turn("y", Originator::User).unwrap();
        s.clear_all().unwrap();

        assert!(s.archived().is_empty());
        assert!(s.current().is_empty());
        assert!(s.history().saved().is_empty());
    }

    #[test]
    fn open_loads_existing_archive() {
        let mut s = store();
        s.append_turn("persisted", Originator::User).unwrap();
        s.start_new_session().unwrap();
        let saved = s.history().saved();

        let reopened = SessionStore::open(MemoryHistory::with_sessions(saved));
        assert_eq!(reopened.archived().len(), 1);
        assert_eq!(texts(&reopened.archived()[0]), vec!["persisted"]);
        assert!(reopened.current().is_empty());
    }

    #[test]
    fn json_file_round_trip_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat_sessions.json");

        let mut s = SessionStore::open(JsonFileHistory::new(&path));
        s.append_turn("hi", Originator::User).unwrap();
        s.append_turn("hello", Originator::Assistant).unwrap();
        s.close().unwrap();

        let reopened = SessionStore::open(JsonFileHistory::new(&path));
        assert_eq!(reopened.archived().len(), 1);
        assert_eq!(texts(&reopened.archived()[0]), vec!["hi", "hello"]);
    }

    #[test]
    fn corrupt_history_file_means_no_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_sessions.json");
        fs::write(&path, b"{not json").unwrap();

        let s = SessionStore::open(JsonFileHistory::new(&path));
        assert!(s.archived().is_empty());
    }

    #[test]
    fn missing_history_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonFileHistory::new(dir.path().join("absent.json"));
        assert!(history.load().unwrap().is_empty());
    }
}
