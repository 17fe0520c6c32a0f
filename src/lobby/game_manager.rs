use crate::game::{
    new_session, parse_board_size, Color, Commands, PlayerInfo, PlayerQuitReason, SessionConfig,
};
use crate::lobby::client_connection::ClientConnection;
use crate::lobby::game_session::{connect_player_game, ExitState};
use crate::lobby::messages::{Messages, Responses};
use async_std::channel::{bounded, Receiver, Sender};
use async_std::sync::Mutex;
use async_std::task;
use futures::{select, Stream, StreamExt};
use log::{info, warn};
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;

/// the single player waiting to be paired
struct WaitingPlayer {
    info: PlayerInfo,
    color: Color,
    board_size: usize,
    paired: Sender<Commands>,
}

enum Pairing {
    Paired(Commands),
    Waiting(Receiver<Commands>),
}

enum LobbyExit {
    Play(ClientConnection, Commands),
    Leave,
}

enum WaitEvent {
    Paired(Option<Commands>),
    Player(Option<Messages>),
}

enum Waited {
    Paired(ClientConnection, Commands),
    Withdrawn(ClientConnection),
    Left,
}

#[derive(Clone)]
pub(crate) struct GameManager {
    waiting: Arc<Mutex<Option<WaitingPlayer>>>,
    counter: Arc<AtomicU64>,
    session_config: SessionConfig,
}

impl GameManager {
    pub fn new(session_config: SessionConfig) -> Self {
        GameManager {
            waiting: Arc::new(Mutex::new(None)),
            counter: Arc::new(AtomicU64::default()),
            session_config,
        }
    }

    /// Serve a connection: lobby, match, back to lobby, until it leaves.
    pub fn accept_connection(&self, conn: ClientConnection) {
        let manager = self.clone();
        task::spawn(async move {
            let mut conn = conn;
            loop {
                let (player, commands) = match manager.lobby(conn).await {
                    LobbyExit::Play(player, commands) => (player, commands),
                    LobbyExit::Leave => break,
                };
                match connect_player_game(player, commands).await {
                    ExitState::EnterLobby(player) => conn = player,
                    ExitState::ExitGame => break,
                }
            }
        });
    }

    async fn lobby(&self, mut conn: ClientConnection) -> LobbyExit {
        while let Some(msg) = conn.next().await {
            match msg {
                Messages::RequestGame { color, board_size } => {
                    match self.request_game(&conn, color, &board_size).await {
                        Pairing::Paired(commands) => return LobbyExit::Play(conn, commands),
                        Pairing::Waiting(paired) => {
                            let _ = conn.sender().send(Responses::WaitingForOpponent).await;
                            match self.wait_for_opponent(conn, paired).await {
                                Waited::Paired(player, commands) => {
                                    return LobbyExit::Play(player, commands)
                                }
                                Waited::Withdrawn(player) => conn = player,
                                Waited::Left => return LobbyExit::Leave,
                            }
                        }
                    }
                }
                Messages::Exit => return LobbyExit::Leave,
                other => {
                    let _ = conn
                        .sender()
                        .send(Responses::Error(format!(
                            "unexpected message in lobby: {:?}",
                            other
                        )))
                        .await;
                }
            }
        }
        LobbyExit::Leave
    }

    /// Take the waiting slot, or pair with whoever holds it.
    ///
    /// The first requester's color and board size are used.
    async fn request_game(
        &self,
        conn: &ClientConnection,
        color: Option<Color>,
        board_size: &str,
    ) -> Pairing {
        let me = PlayerInfo::new(conn.player_id(), conn.player_name());
        let mut waiting = self.waiting.lock().await;
        // the waiting player may have vanished
        let opponent = waiting.take().filter(|w| !w.paired.is_closed());
        match opponent {
            None => {
                let (paired, receiver) = bounded(1);
                let color = color.unwrap_or(Color::Black);
                let board_size = parse_board_size(board_size);
                info!(
                    "{} waits for an opponent ({}, {}x{})",
                    me.name, color, board_size, board_size
                );
                waiting.replace(WaitingPlayer {
                    info: me,
                    color,
                    board_size,
                    paired,
                });
                Pairing::Waiting(receiver)
            }
            Some(opponent) => {
                drop(waiting);
                let session_id = self.counter.fetch_add(1, SeqCst);
                let (black, white) = match opponent.color {
                    Color::Black => (opponent.info.clone(), me),
                    Color::White => (me, opponent.info.clone()),
                };
                info!(
                    "session {}: {} (black) vs {} (white) on {}x{}",
                    session_id, black.name, white.name, opponent.board_size, opponent.board_size
                );
                let (black_cmd, white_cmd) = new_session(
                    session_id,
                    black,
                    white,
                    opponent.board_size,
                    self.session_config.clone(),
                );
                let (theirs, mine) = match opponent.color {
                    Color::Black => (black_cmd, white_cmd),
                    Color::White => (white_cmd, black_cmd),
                };
                if let Err(e) = opponent.paired.send(theirs).await {
                    warn!("{} left before pairing completed", opponent.info.name);
                    e.into_inner().quit(PlayerQuitReason::Disconnected).await;
                }
                Pairing::Paired(mine)
            }
        }
    }

    /// wait in the slot until paired, withdrawn, or gone
    async fn wait_for_opponent(&self, conn: ClientConnection, paired: Receiver<Commands>) -> Waited {
        let mut player = conn.fuse();
        let mut paired = paired.fuse();
        loop {
            let event = select! {
                commands = paired.next() => WaitEvent::Paired(commands),
                msg = player.next() => WaitEvent::Player(msg),
            };
            let reason = match event {
                WaitEvent::Paired(Some(commands)) => {
                    return Waited::Paired(player.into_inner(), commands)
                }
                // slot dropped without a match
                WaitEvent::Paired(None) => return Waited::Withdrawn(player.into_inner()),
                WaitEvent::Player(Some(Messages::Quit)) => PlayerQuitReason::QuitSession,
                WaitEvent::Player(Some(Messages::Exit)) => PlayerQuitReason::ExitGame,
                WaitEvent::Player(None) => PlayerQuitReason::Disconnected,
                WaitEvent::Player(Some(other)) => {
                    let _ = player
                        .get_ref()
                        .sender()
                        .send(Responses::Error(format!(
                            "unexpected message while waiting: {:?}",
                            other
                        )))
                        .await;
                    continue;
                }
            };
            let player = player.into_inner();
            let back_to_lobby = matches!(reason, PlayerQuitReason::QuitSession);
            self.withdraw(&player, paired, reason).await;
            return if back_to_lobby {
                Waited::Withdrawn(player)
            } else {
                Waited::Left
            };
        }
    }

    /// Leave the waiting slot, abandoning a match that was set up meanwhile.
    async fn withdraw<S>(&self, conn: &ClientConnection, mut paired: S, reason: PlayerQuitReason)
    where
        S: Stream<Item = Commands> + Unpin,
    {
        let mut waiting = self.waiting.lock().await;
        let ours = waiting
            .as_ref()
            .map_or(false, |w| w.info.id == conn.player_id());
        if ours {
            waiting.take();
            info!("{} stops waiting", conn.player_name());
            return;
        }
        drop(waiting);
        // already paired, the commands are on their way
        if let Some(commands) = paired.next().await {
            commands.quit(reason).await;
        }
    }
}
