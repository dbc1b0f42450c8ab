use apb_script_core::{CommandWord, DecodeError, MAX_BYTES_CONSUMED, Payload, ScriptCommand};
use smallvec::SmallVec;

// CONSTANTS
// ================================================================================================

/// Number of operand bytes the unpacker buffers ahead of the sequencer.
pub const QUEUE_CAPACITY: usize = 8;

// COMMAND UNPACKER
// ================================================================================================

/// Decodes command words and buffers the operand bytes of the current run.
///
/// Operand bytes are taken from a presented `data`/`data-last` payload in pulses of at most
/// [MAX_BYTES_CONSUMED] bytes. After every pulse the unpacker rests for one cycle, which gives the
/// caller a full cycle to shift the remaining payload down before the next pulse.
///
/// The input of a run is closed once the complete window of a `data-last` command has been taken.
#[derive(Debug, Default)]
pub struct CommandUnpacker {
    queue: SmallVec<[u8; QUEUE_CAPACITY]>,
    input_closed: bool,
    /// A pulse was generated in the current cycle.
    pulsed: bool,
    /// A pulse was generated in the previous cycle.
    resting: bool,
}

impl CommandUnpacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a command word.
    ///
    /// # Errors
    /// Returns an error if the word carries an opcode above 4, or a data count above 6.
    pub fn unpack(word: CommandWord) -> Result<ScriptCommand, DecodeError> {
        ScriptCommand::try_from(word)
    }

    // STATE MUTATORS
    // --------------------------------------------------------------------------------------------

    /// Advances the unpacker to the next cycle. Must be called once at the start of every cycle.
    pub fn tick(&mut self) {
        self.resting = self.pulsed;
        self.pulsed = false;
    }

    /// Discards all operand bytes and reopens the input, as at the start of a new run.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.input_closed = false;
    }

    /// Takes as many bytes from `payload` as the pulse budget and the queue allow, and returns
    /// the number of bytes taken.
    ///
    /// If `last` is set and the whole payload was taken, or the payload is empty, the input of
    /// the current run is closed.
    pub fn take(&mut self, payload: &Payload, last: bool) -> u8 {
        if self.input_closed {
            return 0;
        }
        if payload.is_empty() {
            self.input_closed = last;
            return 0;
        }
        if self.resting || self.pulsed {
            return 0;
        }

        let count = payload
            .len()
            .min(MAX_BYTES_CONSUMED as usize)
            .min(QUEUE_CAPACITY - self.queue.len());
        if count == 0 {
            return 0;
        }
        self.queue.extend_from_slice(&payload.as_slice()[..count]);
        self.pulsed = true;
        self.input_closed = last && count == payload.len();
        count as u8
    }

    /// Removes and returns the `N` oldest bytes of the queue, if that many are buffered.
    pub fn pop<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.queue.len() < N {
            return None;
        }
        let mut bytes = [0; N];
        for (dst, src) in bytes.iter_mut().zip(self.queue.drain(..N)) {
            *dst = src;
        }
        Some(bytes)
    }

    /// Removes `width` bytes (at most 4) and returns them as a little-endian value.
    pub fn pop_le(&mut self, width: usize) -> Option<u32> {
        if width > 4 || self.queue.len() < width {
            return None;
        }
        let value = self
            .queue
            .drain(..width)
            .enumerate()
            .fold(0, |acc, (i, byte)| acc | u32::from(byte) << (8 * i));
        Some(value)
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the number of buffered operand bytes.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns true once the final operand byte of the run has been taken.
    pub fn input_closed(&self) -> bool {
        self.input_closed
    }
}

// TESTS
// ================================================================================================
