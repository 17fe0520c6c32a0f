use crate::game::{Commands, PlayerQuitReason, PlayerResponse};
use crate::lobby::client_connection::ClientConnection;
use crate::lobby::messages::{Messages, Responses};
use async_std::channel::Sender;
use futures::{select, StreamExt};
use log::{info, warn};

pub(crate) enum ExitState {
    EnterLobby(ClientConnection),
    ExitGame,
}

enum NextStep {
    Continue,
    /// quit sent, keep forwarding until the session reports the end
    AwaitEnd,
    EnterLobby,
    ExitGame,
}

/// Bridge one connection and its `Commands` until the match ends.
pub(crate) async fn connect_player_game(
    player: ClientConnection,
    mut command: Commands,
) -> ExitState {
    let player_sender = player.sender().clone();
    let _ = player_sender
        .send(Responses::GameStarted {
            color: command.color(),
            board_size: command.board_size(),
            opponent: command.opponent_name().to_string(),
        })
        .await;
    let session_rsp = match command.get_listener() {
        Some(listener) => listener,
        None => {
            warn!("session listener of {} already taken", command.name());
            command.quit(PlayerQuitReason::Error("no listener".to_string())).await;
            return ExitState::EnterLobby(player);
        }
    };
    let mut player = player.fuse();
    let mut session = session_rsp.fuse();
    let mut quitting = false;
    loop {
        let next_step = select! {
            msg = player.next() => {
                if quitting {
                    // only wait for the end report
                    match msg {
                        Some(_) => NextStep::Continue,
                        None => NextStep::ExitGame,
                    }
                } else {
                    handle_command(msg, &command, &player_sender).await
                }
            }
            rsp = session.next() => {
                handle_session_response(rsp, &player_sender).await
            }
        };
        match next_step {
            NextStep::Continue => {}
            NextStep::AwaitEnd => quitting = true,
            NextStep::EnterLobby => break ExitState::EnterLobby(player.into_inner()),
            NextStep::ExitGame => break ExitState::ExitGame,
        }
    }
}

async fn handle_command(
    msg: Option<Messages>,
    command: &Commands,
    player_sender: &Sender<Responses>,
) -> NextStep {
    match msg {
        Some(Messages::Move(token)) => {
            command.play(&token).await;
            NextStep::Continue
        }
        Some(Messages::Quit) => {
            info!("{} quits the match", command.name());
            command.quit(PlayerQuitReason::QuitSession).await;
            NextStep::AwaitEnd
        }
        Some(Messages::Exit) => {
            command.quit(PlayerQuitReason::ExitGame).await;
            NextStep::ExitGame
        }
        Some(other) => {
            let _ = player_sender
                .send(Responses::Error(format!("unexpected message in game: {:?}", other)))
                .await;
            NextStep::Continue
        }
        None => {
            command.quit(PlayerQuitReason::Disconnected).await;
            NextStep::ExitGame
        }
    }
}

// the player being gone is handled on the command side
async fn handle_session_response(
    rsp: Option<PlayerResponse>,
    player_sender: &Sender<Responses>,
) -> NextStep {
    match rsp {
        Some(rsp) => {
            let ended = matches!(rsp, PlayerResponse::GameEnded(_));
            let _ = player_sender.send(Responses::from(rsp)).await;
            if ended {
                NextStep::EnterLobby
            } else {
                NextStep::Continue
            }
        }
        // session task stopped without a report
        None => NextStep::EnterLobby,
    }
}
