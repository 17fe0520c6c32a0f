mod api;
mod messages;
mod referee;
mod session_impl;
mod utility;

pub use api::*;
pub use referee::{GameEnd, MatchEvent, MatchState, Referee};
pub use session_impl::{new_session, MatchSession};
