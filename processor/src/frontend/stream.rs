use apb_script_core::{CommandWord, ScriptResponse};

use super::{HeldWord, present};
use crate::{ApbTarget, Sequencer};

// STREAM INTERFACE
// ================================================================================================

/// A command word offered by the stream client.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub valid: bool,
    pub word: CommandWord,
}

impl StreamRequest {
    pub const fn idle() -> Self {
        Self { valid: false, word: CommandWord::IDLE }
    }

    pub const fn offer(word: CommandWord) -> Self {
        Self { valid: true, word }
    }
}

/// Flow control returned to the stream client.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamResponse {
    /// The offered word was taken this cycle; the client may offer the next one.
    pub acknowledge: bool,
    /// A word is held or a run is in progress.
    pub busy: bool,
}

// STREAM FRONT END
// ================================================================================================

/// A front end fed by a client which pushes command words over a valid/acknowledge handshake.
///
/// An offered word is taken on any cycle in which no word is held and no bus transaction is
/// outstanding, and presented to the sequencer in that same cycle.
#[derive(Debug, Default)]
pub struct StreamFrontEnd {
    sequencer: Sequencer,
    held: Option<HeldWord>,
}

impl StreamFrontEnd {
    pub fn new(sequencer: Sequencer) -> Self {
        Self { sequencer, held: None }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Returns true if a word is held.
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    /// Executes one cycle.
    pub fn step(
        &mut self,
        request: StreamRequest,
        target: &mut impl ApbTarget,
    ) -> (StreamResponse, ScriptResponse) {
        let acknowledge = request.valid && self.held.is_none() && self.sequencer.can_accept();
        if acknowledge {
            self.held = Some(HeldWord(request.word));
        }

        let (response, _) = present(&mut self.held, &mut self.sequencer, target);
        let busy = self.held.is_some() || !self.sequencer.is_idle();
        (StreamResponse { acknowledge, busy }, response)
    }
}
