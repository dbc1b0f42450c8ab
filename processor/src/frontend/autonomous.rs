use alloc::vec::Vec;

use apb_script_core::{CommandWord, Opcode, Payload, ScriptCommand, ScriptResponse};

use super::{HeldWord, present};
use crate::{ApbTarget, Sequencer};

// COMMAND STORE
// ================================================================================================

/// Word-addressed storage holding command words for the autonomous front end.
pub trait CommandStore {
    /// Returns the number of cycles between issuing a fetch and its word becoming available.
    fn latency(&self) -> u8 {
        0
    }

    /// Returns the word at `address`, or `None` if the address is outside the store.
    fn fetch(&self, address: u16) -> Option<CommandWord>;
}

impl<T: CommandStore + ?Sized> CommandStore for &T {
    fn latency(&self) -> u8 {
        (**self).latency()
    }

    fn fetch(&self, address: u16) -> Option<CommandWord> {
        (**self).fetch(address)
    }
}

/// A read-only command store backed by a vector of words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRom {
    words: Vec<CommandWord>,
    latency: u8,
}

impl CommandRom {
    pub fn new(words: impl IntoIterator<Item = CommandWord>) -> Self {
        Self { words: words.into_iter().collect(), latency: 0 }
    }

    /// Sets the number of cycles each fetch takes.
    pub fn with_latency(mut self, latency: u8) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl CommandStore for CommandRom {
    fn latency(&self) -> u8 {
        self.latency
    }

    fn fetch(&self, address: u16) -> Option<CommandWord> {
        self.words.get(address as usize).copied()
    }
}

// PROCESSOR INTERFACE
// ================================================================================================

/// A request from the host processor to run the script stored at `address`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorRequest {
    pub valid: bool,
    pub address: u16,
}

impl ProcessorRequest {
    pub const fn idle() -> Self {
        Self { valid: false, address: 0 }
    }

    pub const fn run(address: u16) -> Self {
        Self { valid: true, address }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorResponse {
    /// The request was accepted this cycle.
    pub acknowledge: bool,
    /// Words are being fetched or a run is in progress.
    pub busy: bool,
}

// AUTONOMOUS FRONT END
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchState {
    Stopped,
    /// A fetch of the word at the instruction pointer completes after `remaining` more cycles.
    Fetching { remaining: u8 },
    /// The fetched word is being presented.
    Presenting,
}

/// A front end which runs scripts from a [CommandStore] on request of a host processor.
///
/// After accepting a request, the front end fetches words from consecutive store addresses
/// starting at the requested one and presents each like a stream client would. Fetching stops
/// after the `data-last` word has been spent or when the sequencer reports a terminal state.
/// A fetch outside the store ends the run with an empty `data-last`.
#[derive(Debug)]
pub struct AutonomousFrontEnd<S> {
    store: S,
    sequencer: Sequencer,
    fetch: FetchState,
    pointer: u16,
    held: Option<HeldWord>,
}

impl<S: CommandStore> AutonomousFrontEnd<S> {
    pub fn new(store: S, sequencer: Sequencer) -> Self {
        Self {
            store,
            sequencer,
            fetch: FetchState::Stopped,
            pointer: 0,
            held: None,
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the address of the next word to fetch.
    pub fn instruction_pointer(&self) -> u16 {
        self.pointer
    }

    /// Executes one cycle.
    pub fn step(
        &mut self,
        request: ProcessorRequest,
        target: &mut impl ApbTarget,
    ) -> (ProcessorResponse, ScriptResponse) {
        let acknowledge =
            request.valid && self.fetch == FetchState::Stopped && self.sequencer.is_idle();
        if acknowledge {
            tracing::debug!(address = request.address, "running stored script");
            self.pointer = request.address;
            self.fetch = FetchState::Fetching { remaining: self.store.latency() };
        }

        self.advance_fetch();
        let (response, spent) = present(&mut self.held, &mut self.sequencer, target);

        if response.state.is_terminal() {
            self.held = None;
            self.fetch = FetchState::Stopped;
        } else if let Some(word) = spent {
            self.fetch = if word.opcode_bits() == Opcode::DataLast as u8 {
                FetchState::Stopped
            } else {
                FetchState::Fetching { remaining: self.store.latency() }
            };
        }

        let busy = self.fetch != FetchState::Stopped || !self.sequencer.is_idle();
        (ProcessorResponse { acknowledge, busy }, response)
    }

    /// Counts down an outstanding fetch and loads the fetched word once it arrives.
    fn advance_fetch(&mut self) {
        let FetchState::Fetching { remaining } = self.fetch else {
            return;
        };
        if remaining > 0 {
            self.fetch = FetchState::Fetching { remaining: remaining - 1 };
            return;
        }

        let word = match self.store.fetch(self.pointer) {
            Some(word) => word,
            None => {
                tracing::warn!(address = self.pointer, "fetch outside the command store");
                CommandWord::from(ScriptCommand::DataLast(Payload::EMPTY))
            },
        };
        self.pointer = self.pointer.wrapping_add(1);
        self.held = Some(HeldWord(word));
        self.fetch = FetchState::Presenting;
    }
}
