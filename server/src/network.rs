//! TCP acceptor, per-connection command dispatch, and graceful shutdown
//!
//! One listening endpoint; every accepted connection gets an independent
//! tokio task so a slow or silent client never blocks the others. Each
//! connection is split into a reading half driven by the handler and a
//! writer task fed through an unbounded outbox channel, which is also how
//! room and leaderboard broadcasts reach a session without touching its
//! socket directly.
//!
//! A handler only ever blocks awaiting its own client's next line, always
//! inside a `tokio::select!` against the shutdown signal, so a termination
//! request unblocks every session and forces it through the disconnect path
//! (partial scores folded) before the listener is released.

use crate::leaderboard::Leaderboard;
use crate::question_bank::QuestionBank;
use crate::quiz::{self, QuizAttempt, SessionState};
use crate::registry::{Registry, SessionId};
use log::{debug, error, info, warn};
use shared::{Command, HELP_TEXT};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinSet;

/// Notice sent to every connected session when the server begins shutdown.
pub const SHUTDOWN_NOTICE: &str = "Server is shutting down. Disconnecting...";

/// State shared by every connection handler.
///
/// The question bank is immutable after load; the registry and leaderboard
/// are the two mutable structures and each sits behind its own lock with
/// short critical sections (never held across an `.await`).
pub struct ServerState {
    bank: QuestionBank,
    registry: RwLock<Registry>,
    leaderboard: RwLock<Leaderboard>,
}

/// Handle for requesting graceful shutdown from outside the accept loop.
#[derive(Clone)]
pub struct ShutdownHandle(broadcast::Sender<()>);

impl ShutdownHandle {
    /// Requests shutdown. Safe to call more than once and from any task.
    pub fn signal(&self) {
        let _ = self.0.send(());
    }
}

/// The trivia server: bound listener plus shared state.
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Server {
    /// Binds the listening endpoint and prepares shared state.
    ///
    /// The bank must already be fully loaded; a bad dataset is a startup
    /// failure and never reaches this point.
    pub async fn bind(addr: &str, bank: QuestionBank) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Quiz server listening on {}", listener.local_addr()?);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            listener,
            state: Arc::new(ServerState {
                bank,
                registry: RwLock::new(Registry::new()),
                leaderboard: RwLock::new(Leaderboard::new()),
            }),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Address the server is actually listening on (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns a handle that triggers graceful shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Accept loop: spawns one handler per connection until shutdown, then
    /// drains every session through the disconnect path and releases the
    /// listener.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut handlers = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let state = Arc::clone(&self.state);
                            let shutdown = self.shutdown_tx.subscribe();
                            handlers.spawn(handle_connection(stream, addr, state, shutdown));
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown requested, draining {} session handler(s)", handlers.len());
                    break;
                }
            }
        }

        // No new connections from here on. Re-send the signal so a handler
        // spawned in the same select round as the shutdown still observes
        // it. Each handler queues the notice on its own outbox when it sees
        // the signal; this broadcast only covers sessions that have not
        // reached their select point yet, then we wait for the handlers to
        // fold and exit.
        let _ = self.shutdown_tx.send(());
        {
            let registry = self.state.registry.read().await;
            registry.broadcast_all(SHUTDOWN_NOTICE);
        }
        while handlers.join_next().await.is_some() {}

        info!("All sessions drained, quiz server stopped");
        Ok(())
    }
}

/// Result of advancing an in-flight quiz attempt by one step.
enum StepOutcome {
    /// Attempt still in flight, or completed back to idle
    Continue(SessionState),
    /// Read failure or EOF mid-attempt; partial score already folded
    Disconnected,
    /// Shutdown observed mid-attempt; partial score already folded
    ShuttingDown,
}

type LineReader = Lines<BufReader<OwnedReadHalf>>;

/// Lifecycle of one client connection, from name prompt to teardown.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
    mut shutdown: broadcast::Receiver<()>,
) {
    debug!("Connection from {}", addr);

    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_outbox(write_half, outbox_rx));

    if let Some((session_id, username)) =
        login(&mut lines, &outbox_tx, addr, &state, &mut shutdown).await
    {
        command_loop(
            session_id,
            &username,
            &mut lines,
            &outbox_tx,
            &state,
            &mut shutdown,
        )
        .await;

        // Idempotent: the session may already be gone if a broadcast to it
        // failed and pruned it first.
        let mut registry = state.registry.write().await;
        registry.unregister(session_id);
    }

    // Dropping our sender lets the writer drain queued messages (goodbye,
    // rejection notices) before it closes the socket.
    drop(outbox_tx);
    let _ = writer.await;
    debug!("Connection from {} closed", addr);
}

/// Writer task: turns queued messages into `\n`-terminated lines on the
/// socket. Exits when every sender is gone or the peer stops accepting
/// writes.
async fn write_outbox(mut write_half: OwnedWriteHalf, mut outbox: UnboundedReceiver<String>) {
    while let Some(mut message) = outbox.recv().await {
        message.push('\n');
        if let Err(e) = write_half.write_all(message.as_bytes()).await {
            debug!("Write failed, abandoning connection: {}", e);
            return;
        }
    }
    let _ = write_half.shutdown().await;
}

/// Queues one message for the connection. Failures are ignored here; a dead
/// writer surfaces as a failed read in the handler loop.
fn send(outbox: &UnboundedSender<String>, message: &str) {
    let _ = outbox.send(message.to_string());
}

/// Prompts for a display name and registers the session.
///
/// Returns `None` (closing the connection) on EOF, an empty name, a name
/// collision, or shutdown during the prompt.
async fn login(
    lines: &mut LineReader,
    outbox: &UnboundedSender<String>,
    addr: SocketAddr,
    state: &Arc<ServerState>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Option<(SessionId, String)> {
    send(outbox, "Enter your name:");

    let line = tokio::select! {
        line = lines.next_line() => line.ok().flatten()?,
        _ = shutdown.recv() => {
            send(outbox, SHUTDOWN_NOTICE);
            return None;
        }
    };
    let username = line.trim();
    if username.is_empty() {
        return None;
    }

    let registered = {
        let mut registry = state.registry.write().await;
        registry.register(username, addr, outbox.clone())
    };
    match registered {
        Ok(id) => {
            send(outbox, "Welcome to Quiz Server! Type /help for commands");
            Some((id, username.to_string()))
        }
        Err(_) => {
            warn!("Rejected duplicate username '{}' from {}", username, addr);
            send(outbox, "Username taken. Try again later.");
            None
        }
    }
}

/// Session state machine: dispatches commands while idle and steps through
/// the question sequence while a quiz attempt is in flight.
///
/// Returns when the client logs out, the connection drops, or shutdown is
/// observed; any in-flight partial score has been folded by then.
async fn command_loop(
    id: SessionId,
    username: &str,
    lines: &mut LineReader,
    outbox: &UnboundedSender<String>,
    state: &Arc<ServerState>,
    shutdown: &mut broadcast::Receiver<()>,
) {
    let mut session = SessionState::Idle;

    loop {
        session = match session {
            SessionState::Idle => {
                let line = tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => line,
                        // EOF or read error while idle: nothing to fold
                        _ => return,
                    },
                    _ = shutdown.recv() => {
                        // Queued before teardown so the writer delivers the
                        // notice even if this handler unregisters before the
                        // accept loop's broadcast runs
                        send(outbox, SHUTDOWN_NOTICE);
                        return;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match Command::parse(&line) {
                    Command::Help => {
                        send(outbox, HELP_TEXT);
                        SessionState::Idle
                    }
                    Command::Join(room) => {
                        let joined = {
                            let mut registry = state.registry.write().await;
                            registry.join(id, &room, &state.bank)
                        };
                        match joined {
                            Ok(()) => {
                                send(outbox, &format!("Joined {}! Starting quiz...", room));
                                info!("'{}' started a quiz in '{}'", username, room);
                                SessionState::InQuiz(QuizAttempt::new(&room))
                            }
                            Err(e) => {
                                debug!("'{}' failed to join '{}': {}", username, room, e);
                                send(outbox, "Invalid room name");
                                SessionState::Idle
                            }
                        }
                    }
                    Command::JoinMissingRoom => {
                        send(outbox, "Usage: /join [room_name]");
                        SessionState::Idle
                    }
                    Command::ListRooms => {
                        let mut listing = String::from("Available rooms:");
                        for room in state.bank.room_names() {
                            listing.push('\n');
                            listing.push_str(room);
                        }
                        send(outbox, &listing);
                        SessionState::Idle
                    }
                    Command::Leaderboard => {
                        broadcast_leaderboard(state).await;
                        SessionState::Idle
                    }
                    Command::Logout => {
                        send(outbox, "Goodbye!");
                        return;
                    }
                    Command::Unknown => {
                        send(outbox, "Unknown command. Type /help for list");
                        SessionState::Idle
                    }
                }
            }

            SessionState::InQuiz(attempt) => {
                match step_attempt(id, username, attempt, lines, outbox, state, shutdown).await {
                    StepOutcome::Continue(next) => next,
                    StepOutcome::Disconnected | StepOutcome::ShuttingDown => return,
                }
            }
        };
    }
}

/// Advances an in-flight attempt by one question, or completes it.
async fn step_attempt(
    id: SessionId,
    username: &str,
    mut attempt: QuizAttempt,
    lines: &mut LineReader,
    outbox: &UnboundedSender<String>,
    state: &Arc<ServerState>,
    shutdown: &mut broadcast::Receiver<()>,
) -> StepOutcome {
    let Some(question) = attempt.current_question(&state.bank) else {
        // Every question answered: Completed, back to Idle
        fold_completed(id, username, attempt, outbox, state).await;
        return StepOutcome::Continue(SessionState::Idle);
    };

    send(outbox, &quiz::format_question(attempt.question_number(), question));

    let answer = tokio::select! {
        line = lines.next_line() => match line {
            Ok(Some(line)) => line,
            _ => {
                fold_disconnected(id, username, attempt, state).await;
                return StepOutcome::Disconnected;
            }
        },
        _ = shutdown.recv() => {
            send(outbox, SHUTDOWN_NOTICE);
            fold_disconnected(id, username, attempt, state).await;
            return StepOutcome::ShuttingDown;
        }
    };

    if let Some(feedback) = attempt.submit_answer(&answer, &state.bank) {
        send(outbox, &feedback.message());
    }
    StepOutcome::Continue(SessionState::InQuiz(attempt))
}

/// Completed-attempt fold: leaderboard credit, summary to the client, leave
/// the room, global leaderboard broadcast. The session is idle afterwards
/// and may immediately re-join.
async fn fold_completed(
    id: SessionId,
    username: &str,
    attempt: QuizAttempt,
    outbox: &UnboundedSender<String>,
    state: &Arc<ServerState>,
) {
    let summary = attempt.finish();
    info!(
        "'{}' completed a quiz with {} points in {:.1}s",
        username,
        summary.score,
        summary.elapsed.as_secs_f64()
    );

    {
        let mut leaderboard = state.leaderboard.write().await;
        leaderboard.add(username, summary.score as u64);
    }
    send(outbox, &quiz::completion_message(&summary));
    {
        let mut registry = state.registry.write().await;
        registry.leave(id);
    }
    broadcast_leaderboard(state).await;
}

/// Disconnected-attempt fold: the partial score counts exactly as a final
/// one. The room hears the final score, the session leaves it, and the
/// refreshed leaderboard goes out globally. No further messages are sent to
/// the disconnected client itself.
async fn fold_disconnected(
    id: SessionId,
    username: &str,
    attempt: QuizAttempt,
    state: &Arc<ServerState>,
) {
    let room = attempt.room().to_string();
    let summary = attempt.finish();
    info!(
        "'{}' disconnected mid-quiz in '{}' with {} points",
        username, room, summary.score
    );

    {
        let mut leaderboard = state.leaderboard.write().await;
        leaderboard.add(username, summary.score as u64);
    }
    broadcast_room_and_prune(state, &room, &quiz::partial_score_message(username, &summary)).await;
    {
        let mut registry = state.registry.write().await;
        registry.leave(id);
    }
    broadcast_leaderboard(state).await;
}

/// Pushes the refreshed top-10 snapshot to every connected session in every
/// room. Deliberately global, not room-scoped.
async fn broadcast_leaderboard(state: &Arc<ServerState>) {
    let snapshot = {
        let leaderboard = state.leaderboard.read().await;
        leaderboard.render_top()
    };
    let stale = {
        let registry = state.registry.read().await;
        registry.broadcast_all(&snapshot)
    };
    prune(state, stale).await;
}

/// Room-scoped broadcast with unreachable-recipient cleanup.
async fn broadcast_room_and_prune(state: &Arc<ServerState>, room: &str, message: &str) {
    let stale = {
        let registry = state.registry.read().await;
        registry.broadcast_room(room, message)
    };
    prune(state, stale).await;
}

/// Removes sessions whose writers are gone. Their own handlers still own
/// folding any partial score, so this only frees the username and room slot
/// early.
async fn prune(state: &Arc<ServerState>, stale: Vec<SessionId>) {
    if stale.is_empty() {
        return;
    }
    let mut registry = state.registry.write().await;
    for id in stale {
        registry.unregister(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bank() -> QuestionBank {
        let csv = "\
room,question,option1,option2,option3,option4,answer
Algorithms,Q1,a,b,c,d,1
";
        QuestionBank::from_reader(csv.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let server = Server::bind("127.0.0.1:0", test_bank()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_run() {
        let server = Server::bind("127.0.0.1:0", test_bank()).await.unwrap();
        let shutdown = server.shutdown_handle();

        let handle = tokio::spawn(server.run());
        shutdown.signal();
        // Signalling twice must be harmless
        shutdown.signal();

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_not_lost() {
        let server = Server::bind("127.0.0.1:0", test_bank()).await.unwrap();
        let shutdown = server.shutdown_handle();
        shutdown.signal();

        server.run().await.unwrap();
    }
}
