//! The request/response channel between a front end and the script engine.
//!
//! Each cycle the front end presents one [CommandWord]: an opcode plus up to six payload bytes.
//! The engine answers with a [ScriptResponse] which reports the run state, how many of the
//! presented payload bytes it has taken, and any read data being returned.
//!
//! The packed layout of a [CommandWord] is:
//!
//! ```text
//!  63      54 53  51 50   48 47                                0
//! +----------+------+-------+-----------------------------------+
//! | reserved |  op  | count |  data (byte 0 in bits 7..0)       |
//! +----------+------+-------+-----------------------------------+
//! ```

use core::fmt;

use crate::{errors::DecodeError, script::DataWidth};

// CONSTANTS
// ================================================================================================

/// The maximum number of payload bytes a single command word can carry.
pub const MAX_PAYLOAD_BYTES: usize = 6;

/// The maximum number of payload bytes the engine consumes in a single cycle.
pub const MAX_BYTES_CONSUMED: u8 = 3;

const DATA_BITS: u32 = 48;
const DATA_MASK: u64 = (1 << DATA_BITS) - 1;
const COUNT_SHIFT: u32 = 48;
const OPCODE_SHIFT: u32 = 51;
const FIELD_MASK: u64 = 0b111;

// OPCODE
// ================================================================================================

/// Operation tag of a command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Idle = 0,
    Start = 1,
    StartClear = 2,
    Data = 3,
    DataLast = 4,
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Start),
            2 => Ok(Self::StartClear),
            3 => Ok(Self::Data),
            4 => Ok(Self::DataLast),
            _ => Err(DecodeError::MalformedOpcode(value)),
        }
    }
}

// PAYLOAD
// ================================================================================================

/// Up to [MAX_PAYLOAD_BYTES] operand bytes carried by a `data` or `data-last` command.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: [u8; MAX_PAYLOAD_BYTES],
    len: u8,
}

impl Payload {
    pub const EMPTY: Self = Self { bytes: [0; MAX_PAYLOAD_BYTES], len: 0 };

    /// Returns a payload holding `bytes`.
    ///
    /// # Errors
    /// Returns an error if more than [MAX_PAYLOAD_BYTES] bytes are provided.
    pub fn new(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() > MAX_PAYLOAD_BYTES {
            return Err(DecodeError::InvalidByteCount(bytes.len() as u8));
        }
        let mut payload = Self::EMPTY;
        payload.bytes[..bytes.len()].copy_from_slice(bytes);
        payload.len = bytes.len() as u8;
        Ok(payload)
    }

    /// Returns a payload holding the first [MAX_PAYLOAD_BYTES] bytes of `chunk`.
    pub(crate) fn from_chunk(chunk: &[u8]) -> Self {
        let len = chunk.len().min(MAX_PAYLOAD_BYTES);
        let mut payload = Self::EMPTY;
        payload.bytes[..len].copy_from_slice(&chunk[..len]);
        payload.len = len as u8;
        payload
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub const fn len(&self) -> usize {
        self.len as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn from_bits(data: u64, len: u8) -> Self {
        let mut payload = Self::EMPTY;
        for (i, byte) in payload.bytes.iter_mut().take(len as usize).enumerate() {
            *byte = (data >> (8 * i)) as u8;
        }
        payload.len = len;
        payload
    }

    fn to_bits(self) -> u64 {
        self.as_slice()
            .iter()
            .enumerate()
            .fold(0, |acc, (i, byte)| acc | (u64::from(*byte) << (8 * i)))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

// SCRIPT COMMAND
// ================================================================================================

/// A decoded command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCommand {
    /// No operation; never produces a transaction or an operand byte.
    Idle,
    /// Begins a new script run.
    Start,
    /// Begins a new script run, discarding any state left over from previous runs.
    StartClear,
    /// Supplies operand bytes of the current run.
    Data(Payload),
    /// Supplies the final operand bytes of the current run. An empty payload is a legal way to
    /// end the run (or abort it, if an operation is still waiting for operand bytes).
    DataLast(Payload),
}

impl ScriptCommand {
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Idle => Opcode::Idle,
            Self::Start => Opcode::Start,
            Self::StartClear => Opcode::StartClear,
            Self::Data(_) => Opcode::Data,
            Self::DataLast(_) => Opcode::DataLast,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Data(payload) | Self::DataLast(payload) => Some(payload),
            _ => None,
        }
    }
}

impl TryFrom<CommandWord> for ScriptCommand {
    type Error = DecodeError;

    fn try_from(word: CommandWord) -> Result<Self, Self::Error> {
        let opcode = Opcode::try_from(word.opcode_bits())?;
        let payload = || {
            let count = word.num_data_valid();
            if count as usize > MAX_PAYLOAD_BYTES {
                return Err(DecodeError::InvalidByteCount(count));
            }
            Ok(Payload::from_bits(word.data(), count))
        };
        Ok(match opcode {
            Opcode::Idle => Self::Idle,
            Opcode::Start => Self::Start,
            Opcode::StartClear => Self::StartClear,
            Opcode::Data => Self::Data(payload()?),
            Opcode::DataLast => Self::DataLast(payload()?),
        })
    }
}

// COMMAND WORD
// ================================================================================================

/// A packed command word, as stored in a command store or pushed by a stream client.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandWord(u64);

impl CommandWord {
    pub const IDLE: Self = Self(0);

    /// Packs the raw fields of a command word; out-of-range bits of each field are dropped.
    pub const fn new(opcode: u8, num_data_valid: u8, data: u64) -> Self {
        Self(
            ((opcode as u64 & FIELD_MASK) << OPCODE_SHIFT)
                | ((num_data_valid as u64 & FIELD_MASK) << COUNT_SHIFT)
                | (data & DATA_MASK),
        )
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    pub const fn opcode_bits(&self) -> u8 {
        ((self.0 >> OPCODE_SHIFT) & FIELD_MASK) as u8
    }

    pub const fn num_data_valid(&self) -> u8 {
        ((self.0 >> COUNT_SHIFT) & FIELD_MASK) as u8
    }

    pub const fn data(&self) -> u64 {
        self.0 & DATA_MASK
    }

    /// Returns true if this word carries a `data` or `data-last` opcode.
    pub const fn is_data(&self) -> bool {
        matches!(self.opcode_bits(), 3 | 4)
    }

    /// Removes the `count` lowest payload bytes, as a client does after the engine reported
    /// them consumed.
    pub fn consume(&mut self, count: u8) {
        let remaining = self.num_data_valid().saturating_sub(count);
        let data = if count as u32 >= DATA_BITS / 8 {
            0
        } else {
            self.data() >> (8 * count as u32)
        };
        *self = Self::new(self.opcode_bits(), remaining, data);
    }
}

impl From<ScriptCommand> for CommandWord {
    fn from(command: ScriptCommand) -> Self {
        let opcode = command.opcode() as u8;
        match command.payload() {
            Some(payload) => Self::new(opcode, payload.len() as u8, payload.to_bits()),
            None => Self::new(opcode, 0, 0),
        }
    }
}

impl fmt::Debug for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandWord({:#016x})", self.0)
    }
}

// SCRIPT RESPONSE
// ================================================================================================

/// Run state reported by the engine each cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseState {
    #[default]
    Idle,
    Running,
    Completed,
    PollFailed,
    Errored,
}

impl ResponseState {
    /// Returns true for the states which end a script run.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::PollFailed | Self::Errored)
    }
}

impl fmt::Display for ResponseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::PollFailed => "poll failed",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Data returned by a read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadData {
    pub width: DataWidth,
    pub value: u32,
}

impl ReadData {
    /// The `bytes_valid` code of the response channel: 1, 2 or 3 for 8, 16 or 32 bit data.
    pub const fn bytes_valid(&self) -> u8 {
        self.width.response_code()
    }
}

/// The engine's response for one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptResponse {
    pub state: ResponseState,
    /// Number of payload bytes taken from the presented command word this cycle. Never non-zero
    /// on two consecutive cycles.
    pub bytes_consumed: u8,
    pub result: Option<ReadData>,
}

impl ScriptResponse {
    pub const fn bytes_valid(&self) -> u8 {
        match &self.result {
            Some(data) => data.bytes_valid(),
            None => 0,
        }
    }
}

// TESTS
// ================================================================================================
