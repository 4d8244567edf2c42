//! # Trivia Server Library
//!
//! Authoritative server for the multi-room, real-time trivia game. Many
//! clients connect concurrently over plain TCP, pick a topic room, are
//! driven through that room's fixed question sequence, accumulate points,
//! and watch a live cross-room leaderboard.
//!
//! ## Architecture
//!
//! One tokio task per connection, so a stalled client never blocks another.
//! Each connection is split into a handler that owns the reading half and a
//! writer task fed through an outbox channel; broadcasts are sends on those
//! channels. The two shared mutable structures, the session/room registry
//! and the leaderboard, each live behind an `RwLock` with short critical
//! sections, closing the lost-update races a thread-per-connection design
//! with bare shared maps would have.
//!
//! ## Module Organization
//!
//! - [`question_bank`]: parses the pre-generated CSV dataset into an
//!   immutable room-to-ordered-question-list mapping; any malformed row is
//!   fatal at startup.
//! - [`registry`]: connected sessions, username uniqueness, and room
//!   membership behind one exclusive-access boundary, plus room-scoped and
//!   global delivery.
//! - [`quiz`]: the per-session state machine
//!   (`Idle -> AwaitingAnswer(i) -> Completed`, `Disconnected` absorbing)
//!   and scoring: 10 points per correct answer.
//! - [`leaderboard`]: cumulative per-username totals across all attempts,
//!   partial ones included, with ranked top-10 snapshots.
//! - [`network`]: TCP acceptor, per-connection command dispatch, and the
//!   graceful-shutdown coordinator that folds every in-flight attempt
//!   before releasing the listener.

pub mod leaderboard;
pub mod network;
pub mod question_bank;
pub mod quiz;
pub mod registry;
