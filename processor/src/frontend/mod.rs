//! Front ends which feed command words into a [crate::Sequencer].
//!
//! Both front ends hold at most one command word and present it to the sequencer every cycle
//! until the sequencer is done with it: `data` and `data-last` words are held until all of their
//! payload bytes have been consumed, any other word is presented exactly once. A held word is
//! dropped when the sequencer reports a terminal state.

use apb_script_core::{CommandWord, ScriptResponse};

mod autonomous;
mod stream;

pub use autonomous::{
    AutonomousFrontEnd, CommandRom, CommandStore, ProcessorRequest, ProcessorResponse,
};
pub use stream::{StreamFrontEnd, StreamRequest, StreamResponse};

// HELD WORD
// ================================================================================================

/// The command word a front end is currently presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeldWord(CommandWord);

impl HeldWord {
    fn word(&self) -> CommandWord {
        self.0
    }

    /// Applies the sequencer's response to the presented word and returns true once the word is
    /// spent.
    fn apply(&mut self, response: &ScriptResponse) -> bool {
        if response.state.is_terminal() || !self.0.is_data() {
            return true;
        }
        self.0.consume(response.bytes_consumed);
        self.0.num_data_valid() == 0
    }
}

/// Presents the held word, or an idle word if none is held, and applies the response to it.
///
/// Returns the response together with the word that was spent this cycle, if any.
fn present(
    held: &mut Option<HeldWord>,
    sequencer: &mut crate::Sequencer,
    target: &mut impl crate::ApbTarget,
) -> (ScriptResponse, Option<CommandWord>) {
    let word = held.map(|held| held.word()).unwrap_or(CommandWord::IDLE);
    let response = sequencer.step(word, target);
    let spent = match held.as_mut().map(|current| current.apply(&response)) {
        Some(true) => {
            *held = None;
            Some(word)
        },
        _ => None,
    };
    (response, spent)
}
