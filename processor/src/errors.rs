//! Errors of the script engine.
//!
//! - [ScriptError] describes why a single run ended in a non-successful terminal state. It is
//!   never returned from [crate::Sequencer::step]; the step reports the terminal state and the
//!   error is kept for inspection through [crate::Sequencer::last_error].
//! - [ExecutionError] is returned by the run helpers, which drive the engine for whole scripts.

use apb_script_core::DecodeError;

// SCRIPT ERROR
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("input ended while an operation still required operand bytes")]
    IncompleteOperation,
    #[error("operand bytes were presented before a start command")]
    NotStarted,
    #[error("start command presented while a script was running")]
    UnexpectedStart,
    #[error("bus fault on {} of address {address:#010x}", if *write { "write" } else { "read" })]
    BusFault { address: u32, write: bool },
    #[error("poll of address {address:#010x} gave up after {attempts} attempts")]
    PollExhausted { address: u32, attempts: u32 },
}

// EXECUTION ERROR
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("script did not finish within {0} cycles")]
    CycleLimitExceeded(u32),
}
