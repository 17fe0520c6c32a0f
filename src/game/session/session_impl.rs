use crate::game::board::Color::{self, Black, White};
use crate::game::session::api::{
    Commands, EndReport, PlayerInfo, PlayerQuitReason, PlayerResponse, SessionConfig, TurnReport,
};
use crate::game::session::messages::{
    broadcast_to_players, message_receiver, message_sender, PlayerAction, SessionMessage,
    SessionResponse,
};
use crate::game::session::referee::{GameEnd, MatchEvent, Referee};
use crate::game::session::utility::TimeoutGate;
use crate::CHANNEL_SIZE;
use anyhow::Result;
use async_std::channel::{bounded, Sender};
use async_std::sync::Mutex;
use async_std::task;
use futures::StreamExt;
#[allow(unused_imports)]
use log::trace;
use log::{error, info, warn};
use std::sync::Arc;

/// start a new match session
pub fn new_session(
    session_id: u64,
    black: PlayerInfo,
    white: PlayerInfo,
    board_size: usize,
    session_config: SessionConfig,
) -> (Commands, Commands) {
    // player channels
    let (black_action, black_actions) = bounded(CHANNEL_SIZE);
    let (white_action, white_actions) = bounded(CHANNEL_SIZE);
    let (black_response, black_listener) = bounded(CHANNEL_SIZE);
    let (white_response, white_listener) = bounded(CHANNEL_SIZE);
    let (timer_sender, timer) = bounded(CHANNEL_SIZE);
    let mut messages = message_receiver(black_actions, white_actions, timer);
    let responses = message_sender(black_response, white_response);
    let session = MatchSession::new(session_id, board_size, black, white, responses);
    let board_size = session.board_size;
    info!(
        "game session {} launched on {}x{} with black player {} and white player {}",
        session_id, board_size, board_size, session.players.0.id, session.players.1.id
    );
    let commands = (
        Commands::new(
            Black,
            board_size,
            (&session.players.0, &session.players.1),
            black_action,
            black_listener,
        ),
        Commands::new(
            White,
            board_size,
            (&session.players.1, &session.players.0),
            white_action,
            white_listener,
        ),
    );

    task::spawn(async move {
        let mut timer = TurnTimer::new(session_config.play_timeout(), timer_sender);
        if let Err(e) = session.start().await {
            error!("game session {} failed to start: {}", session_id, e);
            return;
        }
        timer.arm(session.turn().await).await;
        while let Some(message) = messages.next().await {
            #[cfg(debug_assertions)]
            trace!("message {:?} received by session {}", message, session_id);
            let result = match message {
                SessionMessage::Player(color, action) => {
                    handle_player_message(&session, color, action).await
                }
                SessionMessage::Timeout(color, move_number) => {
                    session.end_timeout_at(color, move_number).await
                }
            };
            if let Err(e) = result {
                error!("game session {} routing error: {}", session_id, e);
                break;
            }
            match session.turn().await {
                Some(turn) => timer.arm(Some(turn)).await,
                None => break,
            }
        }
        timer.arm(None).await;
        info!("game session {} ended", session_id);
    });
    commands
}

/// return Error only when it cannot send
async fn handle_player_message(
    session: &MatchSession,
    color: Color,
    action: PlayerAction,
) -> Result<()> {
    match action {
        PlayerAction::Play(token) => session.confirm_move(color, &token).await,
        PlayerAction::Quit(reason) => {
            log_quit_reason(session, color, &reason);
            match reason {
                PlayerQuitReason::QuitSession => session.end_aborted_game(color).await,
                PlayerQuitReason::ExitGame
                | PlayerQuitReason::Disconnected
                | PlayerQuitReason::Error(_) => session.end_game_exit(color).await,
            }
        }
    }
}

/// The monitor around a `Referee`.
///
/// Each operation holds the lock while it applies the referee operation and
/// routes the resulting events, so players observe events in the order the
/// operations were applied.
#[derive(Clone)]
pub struct MatchSession {
    session_id: u64,
    board_size: usize,
    referee: Arc<Mutex<Referee>>,
    players: Arc<(PlayerInfo, PlayerInfo)>,
    responses: Sender<SessionResponse>,
}

impl MatchSession {
    pub(crate) fn new(
        session_id: u64,
        board_size: usize,
        black: PlayerInfo,
        white: PlayerInfo,
        responses: Sender<SessionResponse>,
    ) -> Self {
        let referee = Referee::new(board_size);
        MatchSession {
            session_id,
            board_size: referee.board().size(),
            referee: Arc::new(Mutex::new(referee)),
            players: Arc::new((black, white)),
            responses,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let referee = self.referee.lock().await;
        self.route(referee.start()).await
    }

    pub async fn confirm_move(&self, color: Color, token: &str) -> Result<()> {
        let mut referee = self.referee.lock().await;
        let events = referee.confirm_move(color, token);
        self.route(events).await
    }

    pub async fn end_aborted_game(&self, color: Color) -> Result<()> {
        let mut referee = self.referee.lock().await;
        let events = referee.end_aborted_game(color);
        self.route(events).await
    }

    pub async fn end_game_exit(&self, color: Color) -> Result<()> {
        let mut referee = self.referee.lock().await;
        let events = referee.end_game_exit(color);
        self.route(events).await
    }

    pub async fn end_timeout(&self, color: Color) -> Result<()> {
        let mut referee = self.referee.lock().await;
        let events = referee.end_timeout(color);
        self.route(events).await
    }

    /// time out `color` only if it is still to move at `move_number`
    pub(crate) async fn end_timeout_at(&self, color: Color, move_number: usize) -> Result<()> {
        let mut referee = self.referee.lock().await;
        if referee.turn() != Some((color, move_number)) {
            return Ok(());
        }
        warn!(
            "player {} timed out in game session {}",
            self.player(color).id,
            self.session_id
        );
        let events = referee.end_timeout(color);
        self.route(events).await
    }

    pub async fn turn(&self) -> Option<(Color, usize)> {
        self.referee.lock().await.turn()
    }

    fn player(&self, color: Color) -> &PlayerInfo {
        match color {
            Black => &self.players.0,
            White => &self.players.1,
        }
    }

    async fn route(&self, events: Vec<MatchEvent>) -> Result<()> {
        let responses = &self.responses;
        for event in events {
            match event {
                MatchEvent::TurnConfirmed {
                    mover,
                    played,
                    next,
                } => {
                    let report = TurnReport {
                        mover,
                        mover_name: self.player(mover).name.clone(),
                        played,
                        next,
                        next_name: self.player(next).name.clone(),
                    };
                    broadcast_to_players(PlayerResponse::Turn(report), responses).await?;
                }
                MatchEvent::InvalidMove { submitter, reason } => {
                    responses
                        .send(SessionResponse::Player(
                            submitter,
                            PlayerResponse::InvalidMove(reason),
                        ))
                        .await?;
                }
                MatchEvent::GameEnded(end) => {
                    let report = self.end_report(end);
                    info!("game session {} ended: {}", self.session_id, report);
                    broadcast_to_players(PlayerResponse::GameEnded(report), responses).await?;
                }
            }
        }
        Ok(())
    }

    fn end_report(&self, end: GameEnd) -> EndReport {
        let (winner, loser) = match end.winner {
            Some(White) => (White, Black),
            _ => (Black, White),
        };
        let score = |color: Color| match color {
            Black => end.black_score,
            White => end.white_score,
        };
        EndReport {
            cause: end.cause,
            winner: end.winner,
            winner_name: self.player(winner).name.clone(),
            winner_score: score(winner),
            loser_name: self.player(loser).name.clone(),
            loser_score: score(loser),
        }
    }
}

/// The per-turn alarm.
///
/// Re-armed whenever the player to move or the ply changes.
struct TurnTimer {
    delay: Option<std::time::Duration>,
    sender: Sender<SessionMessage>,
    armed_for: Option<(Color, usize)>,
    gate: Option<TimeoutGate<SessionMessage>>,
}

impl TurnTimer {
    fn new(delay: Option<std::time::Duration>, sender: Sender<SessionMessage>) -> Self {
        TurnTimer {
            delay,
            sender,
            armed_for: None,
            gate: None,
        }
    }

    /// arm for `turn`, or disarm with `None`
    async fn arm(&mut self, turn: Option<(Color, usize)>) {
        if self.armed_for == turn {
            return;
        }
        if let Some(gate) = self.gate.take() {
            gate.cancel().await;
        }
        self.armed_for = turn;
        if let (Some((color, move_number)), Some(delay)) = (turn, self.delay) {
            self.gate = Some(TimeoutGate::new(
                Some(delay),
                self.sender.clone(),
                SessionMessage::Timeout(color, move_number),
            ));
        }
    }
}

fn log_quit_reason(session: &MatchSession, color: Color, reason: &PlayerQuitReason) {
    let player_id = session.player(color).id;
    let session_id = session.session_id;
    match reason {
        PlayerQuitReason::QuitSession => {
            info!("player {} quit game session {}", player_id, session_id)
        }
        PlayerQuitReason::ExitGame => {
            info!("player {} exit game session {}", player_id, session_id)
        }
        PlayerQuitReason::Disconnected => {
            warn!(
                "player {} disconnected from game session {}",
                player_id, session_id
            )
        }
        PlayerQuitReason::Error(e) => error!(
            "player {} error in game session {}. Error: {}",
            player_id, session_id, e
        ),
    }
}

#[cfg(test)]
mod test_session {
    use super::*;
    use crate::game::board::Position;
    use crate::game::session::api::{EndCause, InvalidMove, Played};
    use async_std::channel::Receiver;
    use futures::executor::block_on;
    use std::time::Duration;

    fn players() -> (PlayerInfo, PlayerInfo) {
        (PlayerInfo::new(1, "alice"), PlayerInfo::new(2, "bob"))
    }

    fn start(board_size: usize, play_timeout: u64) -> (Commands, Commands) {
        let (black, white) = players();
        new_session(0, black, white, board_size, SessionConfig { play_timeout })
    }

    async fn next_turn(listener: &Receiver<PlayerResponse>) -> TurnReport {
        match listener.recv().await {
            Ok(PlayerResponse::Turn(report)) => report,
            other => panic!("expected a turn report, got {:?}", other),
        }
    }

    async fn next_end(listener: &Receiver<PlayerResponse>) -> EndReport {
        match listener.recv().await {
            Ok(PlayerResponse::GameEnded(report)) => report,
            other => panic!("expected an end report, got {:?}", other),
        }
    }

    #[test]
    fn commands_carry_match_info() {
        let (black, white) = start(30, 0);
        assert_eq!(black.color(), Black);
        assert_eq!(white.color(), White);
        assert_eq!(black.board_size(), 19);
        assert_eq!(black.name(), "alice");
        assert_eq!(black.opponent_name(), "bob");
        assert_eq!(white.opponent_name(), "alice");
    }

    #[test]
    fn play_and_double_pass() {
        let (mut black, mut white) = start(9, 0);
        let black_rsp = black.get_listener().unwrap();
        let white_rsp = white.get_listener().unwrap();
        block_on(async {
            for listener in [&black_rsp, &white_rsp] {
                let first = next_turn(listener).await;
                assert_eq!(first.played, Played::First);
                assert_eq!(first.next, Black);
                assert_eq!(first.next_name, "alice");
            }
            black.play("4_4").await;
            for listener in [&black_rsp, &white_rsp] {
                let turn = next_turn(listener).await;
                assert_eq!(turn.played, Played::Stone(Position::new(4, 4)));
                assert_eq!(turn.next, White);
            }
            black.play("5_5").await;
            assert_eq!(
                black_rsp.recv().await.unwrap(),
                PlayerResponse::InvalidMove(InvalidMove::NotYourTurn)
            );
            white.pass().await;
            for listener in [&black_rsp, &white_rsp] {
                assert_eq!(next_turn(listener).await.played, Played::Pass);
            }
            black.pass().await;
            for listener in [&black_rsp, &white_rsp] {
                let end = next_end(listener).await;
                assert_eq!(end.cause, EndCause::Finished);
                assert_eq!(end.winner, Some(Black));
                assert_eq!(end.winner_name, "alice");
                assert_eq!((end.winner_score, end.loser_score), (81, 0));
            }
        })
    }

    #[test]
    fn disconnect_ends_match() {
        let (mut black, mut white) = start(9, 0);
        let black_rsp = black.get_listener().unwrap();
        let white_rsp = white.get_listener().unwrap();
        drop(white_rsp);
        block_on(async {
            next_turn(&black_rsp).await;
            drop(white);
            let end = next_end(&black_rsp).await;
            assert_eq!(end.cause, EndCause::Aborted);
            assert_eq!(end.winner, Some(Black));
            assert_eq!(end.loser_name, "bob");
            assert_eq!(end.loser_score, 0);
        })
    }

    #[test]
    fn quit_session_aborts() {
        let (mut black, mut white) = start(9, 0);
        let black_rsp = black.get_listener().unwrap();
        let white_rsp = white.get_listener().unwrap();
        block_on(async {
            next_turn(&black_rsp).await;
            next_turn(&white_rsp).await;
            black.quit(PlayerQuitReason::QuitSession).await;
            for listener in [&black_rsp, &white_rsp] {
                let end = next_end(listener).await;
                assert_eq!(end.cause, EndCause::Aborted);
                assert_eq!(end.winner, Some(White));
            }
        })
    }

    #[test]
    fn player_times_out() {
        let (mut black, mut white) = start(9, 1);
        let black_rsp = black.get_listener().unwrap();
        let white_rsp = white.get_listener().unwrap();
        block_on(async {
            next_turn(&black_rsp).await;
            next_turn(&white_rsp).await;
            black.play("2_2").await;
            next_turn(&black_rsp).await;
            next_turn(&white_rsp).await;
            // white never answers
            for listener in [&black_rsp, &white_rsp] {
                let end = next_end(listener).await;
                assert_eq!(end.cause, EndCause::Timeout);
                assert_eq!(end.winner, Some(Black));
                assert_eq!((end.winner_score, end.loser_score), (81, 0));
            }
            // the session is over, nothing else arrives
            black.play("3_3").await;
            task::sleep(Duration::from_millis(100)).await;
            assert!(black_rsp.try_recv().is_err());
        })
    }

    #[test]
    fn forfeit_routes_one_end_report() {
        let (responses, delivered) = bounded(16);
        let (black, white) = players();
        let session = MatchSession::new(0, 9, black, white, responses);
        block_on(async {
            session.end_timeout(White).await.unwrap();
            session.end_game_exit(Black).await.unwrap();
            session.end_aborted_game(Black).await.unwrap();
            assert_eq!(session.turn().await, None);
            let mut ends = Vec::new();
            while let Ok(SessionResponse::Player(to, PlayerResponse::GameEnded(end))) =
                delivered.try_recv()
            {
                ends.push((to, end));
            }
            assert_eq!(ends.len(), 2);
            for (_, end) in ends {
                assert_eq!(end.cause, EndCause::Timeout);
                assert_eq!(end.winner, Some(Black));
            }
        })
    }

    #[test]
    fn concurrent_operations_are_serialized() {
        let (responses, delivered) = bounded(1024);
        let (black, white) = players();
        let session = MatchSession::new(0, 9, black, white, responses);
        block_on(async {
            session.start().await.unwrap();
            let mut handles = Vec::new();
            for (color, row) in [(Black, 0), (White, 7)] {
                let session = session.clone();
                handles.push(task::spawn(async move {
                    for attempt in 0..40 {
                        let token = format!("{}_{}", row + attempt / 9 % 2, attempt % 9);
                        session.confirm_move(color, &token).await.unwrap();
                        task::yield_now().await;
                    }
                }));
            }
            for handle in handles {
                handle.await;
            }
            let move_number = session.referee.lock().await.move_number();
            drop(session);
            let mut movers = Vec::new();
            while let Ok(SessionResponse::Player(to, rsp)) = delivered.try_recv() {
                if let (Black, PlayerResponse::Turn(report)) = (to, rsp) {
                    if report.played != Played::First {
                        movers.push(report.mover);
                    }
                }
            }
            assert_eq!(movers.len(), move_number);
            // confirmed turns strictly alternate, black first
            for (i, mover) in movers.iter().enumerate() {
                let expected = if i % 2 == 0 { Black } else { White };
                assert_eq!(*mover, expected);
            }
        })
    }
}
