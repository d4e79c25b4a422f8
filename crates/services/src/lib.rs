#![forbid(unsafe_code)]

pub mod error;
pub mod quiz_service;
pub mod sessions;

pub use quiz_core::Clock;

pub use error::{ErrorKind, QuizServiceError, SessionError};
pub use quiz_service::QuizService;

pub use sessions::{
    Command, PlayRound, Prompt, RoundOutcome, Session, SessionEvent, SessionReply, SessionState,
    parse_id_arg,
};
