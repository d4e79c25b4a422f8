mod command;
mod round;
mod service;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use command::{Command, parse_id_arg};
pub use round::PlayRound;
pub use service::{Session, SessionState};
pub use view::{Prompt, RoundOutcome, SessionEvent, SessionReply};
