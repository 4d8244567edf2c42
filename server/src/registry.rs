//! Session and room bookkeeping for the trivia server
//!
//! This module owns the server-side view of every connected client:
//! - Session lifecycle (register on login, unregister on disconnect)
//! - Username uniqueness among simultaneously connected sessions
//! - Room membership, with rooms created on first join and deleted when empty
//! - Message delivery to one session, one room, or every connected session
//!
//! All of it lives in a single structure so that `Session.room` and room
//! membership are always mutated under the same lock and can never disagree.
//! Scores and attempt timing are deliberately absent here: they are owned by
//! each connection's handler (see the `quiz` module) and only folded into the
//! leaderboard at attempt boundaries.

use crate::question_bank::QuestionBank;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Unique session identifier assigned by the server.
pub type SessionId = u32;

/// Registration failure: the display name is held by a live session.
///
/// The name becomes available again the instant its holder disconnects.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("username taken")]
pub struct NameTaken;

/// Failure attaching a session to a room.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    /// The room name does not resolve in the question bank.
    #[error("invalid room name")]
    UnknownRoom,
    /// The session disappeared between dispatch and attach.
    #[error("unknown session")]
    UnknownSession,
}

/// Server-side record of one connected client.
///
/// The outbox is the sending half of the connection's writer channel; a
/// failed send means the writer task is gone and the session is dead.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier assigned at registration
    pub id: SessionId,
    /// Display name, unique among currently connected sessions
    pub username: String,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Room the session is currently attached to, if any
    pub room: Option<String>,
    outbox: UnboundedSender<String>,
}

/// Connected sessions and room membership behind one exclusive-access boundary.
///
/// Handlers reach the registry through an `Arc<RwLock<Registry>>`; critical
/// sections stay short and never hold the guard across an `.await`.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, Session>,
    rooms: HashMap<String, HashSet<SessionId>>,
    next_session_id: SessionId,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            rooms: HashMap::new(),
            next_session_id: 1,
        }
    }

    /// Registers a freshly logged-in session.
    ///
    /// Fails with [`NameTaken`] if the display name collides with a session
    /// that is still connected. On success the session starts idle, attached
    /// to no room.
    pub fn register(
        &mut self,
        username: &str,
        addr: SocketAddr,
        outbox: UnboundedSender<String>,
    ) -> Result<SessionId, NameTaken> {
        if self.sessions.values().any(|s| s.username == username) {
            return Err(NameTaken);
        }

        let id = self.next_session_id;
        self.next_session_id += 1;

        self.sessions.insert(
            id,
            Session {
                id,
                username: username.to_string(),
                addr,
                room: None,
                outbox,
            },
        );
        info!("Session {} registered as '{}' from {}", id, username, addr);

        Ok(id)
    }

    /// Removes a session, detaching it from its room first.
    ///
    /// Idempotent: returns `None` if the session was already gone. The
    /// username is released immediately.
    pub fn unregister(&mut self, id: SessionId) -> Option<Session> {
        self.leave(id);
        let session = self.sessions.remove(&id)?;
        info!("Session {} ('{}') disconnected", id, session.username);
        Some(session)
    }

    /// Attaches a session to a room, creating the room on demand.
    ///
    /// The room must resolve in the question bank. A session attached to
    /// another room is detached from it first, keeping membership and
    /// `Session.room` consistent; the quiz flow guarantees this does not
    /// happen mid-attempt.
    pub fn join(
        &mut self,
        id: SessionId,
        room: &str,
        bank: &QuestionBank,
    ) -> Result<(), JoinError> {
        if !bank.contains(room) {
            return Err(JoinError::UnknownRoom);
        }
        if !self.sessions.contains_key(&id) {
            return Err(JoinError::UnknownSession);
        }

        self.leave(id);
        if let Some(session) = self.sessions.get_mut(&id) {
            session.room = Some(room.to_string());
            self.rooms.entry(room.to_string()).or_default().insert(id);
            debug!("Session {} joined room '{}'", id, room);
        }
        Ok(())
    }

    /// Detaches a session from its current room, if any.
    ///
    /// Idempotent; deletes the room once its last member leaves.
    pub fn leave(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        let Some(room) = session.room.take() else {
            return;
        };

        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(&room);
                debug!("Room '{}' is empty, removed", room);
            }
        }
    }

    /// Queues a message for one session.
    ///
    /// Returns false if the session is gone or its writer has shut down.
    pub fn send_to(&self, id: SessionId, message: &str) -> bool {
        match self.sessions.get(&id) {
            Some(session) => session.outbox.send(message.to_string()).is_ok(),
            None => false,
        }
    }

    /// Delivers a message to every session attached to a room.
    ///
    /// A delivery failure to one recipient never aborts delivery to the
    /// rest; the failed recipients are returned so the caller can remove
    /// them.
    pub fn broadcast_room(&self, room: &str, message: &str) -> Vec<SessionId> {
        let mut stale = Vec::new();
        if let Some(members) = self.rooms.get(room) {
            for &id in members {
                if !self.send_to(id, message) {
                    warn!("Dropping unreachable session {} from room '{}'", id, room);
                    stale.push(id);
                }
            }
        }
        stale
    }

    /// Delivers a message to every connected session in every room and idle.
    pub fn broadcast_all(&self, message: &str) -> Vec<SessionId> {
        let mut stale = Vec::new();
        for (&id, session) in &self.sessions {
            if session.outbox.send(message.to_string()).is_err() {
                warn!("Dropping unreachable session {} ('{}')", id, session.username);
                stale.push(id);
            }
        }
        stale
    }

    /// Number of sessions currently attached to a room.
    pub fn room_len(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    /// Returns the number of currently connected sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
