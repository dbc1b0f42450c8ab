//! Script operations and the byte stream they compile to.
//!
//! A script is a sequence of operations. Each operation is encoded as an [OpHeader] followed,
//! for writes, by the data to write. Transaction addresses are formed from the low address byte
//! carried by the operation and the upper 24 bits held in the engine's address register, which
//! is loaded by `set` operations (see [Script::select_address]).

use alloc::vec::Vec;

use crate::{
    command::{MAX_PAYLOAD_BYTES, Payload, ScriptCommand},
    errors::ScriptBuildError,
};

mod header;
pub use header::{OpHeader, TransferHeader};

// DATA WIDTH
// ================================================================================================

/// Width of the data moved by a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataWidth {
    Bits8,
    Bits16,
    Bits32,
}

impl DataWidth {
    /// Returns the width selected by a 2-bit header code; code 3 is reserved.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Bits8),
            1 => Some(Self::Bits16),
            2 => Some(Self::Bits32),
            _ => None,
        }
    }

    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::Bits8),
            16 => Some(Self::Bits16),
            32 => Some(Self::Bits32),
            _ => None,
        }
    }

    pub const fn code(&self) -> u8 {
        match self {
            Self::Bits8 => 0,
            Self::Bits16 => 1,
            Self::Bits32 => 2,
        }
    }

    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bits8 => 1,
            Self::Bits16 => 2,
            Self::Bits32 => 4,
        }
    }

    pub const fn bits(&self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// The `bytes_valid` code used on the response channel.
    pub const fn response_code(&self) -> u8 {
        self.code() + 1
    }

    pub const fn mask(&self) -> u32 {
        match self {
            Self::Bits32 => u32::MAX,
            _ => (1 << self.bits()) - 1,
        }
    }
}

// SCRIPT REGISTER
// ================================================================================================

/// A byte of one of the engine registers written by `set` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptRegister {
    /// Byte 1, 2 or 3 of the transaction address (byte 0 comes from each operation).
    AddressByte(u8),
    /// Byte 0..=3 of the number of idle cycles between poll attempts.
    PollDelay(u8),
    /// Byte 0..=3 of the maximum number of poll attempts.
    PollCount(u8),
}

impl ScriptRegister {
    const ADDRESS: u8 = 0;
    const POLL_DELAY: u8 = 2;
    const POLL_COUNT: u8 = 3;

    pub(crate) fn subclass(&self) -> u8 {
        let (register, byte) = match *self {
            Self::AddressByte(byte) => (Self::ADDRESS, byte),
            Self::PollDelay(byte) => (Self::POLL_DELAY, byte),
            Self::PollCount(byte) => (Self::POLL_COUNT, byte),
        };
        register << 2 | (byte & 0b11)
    }

    pub(crate) fn from_subclass(subclass: u8) -> Option<Self> {
        let byte = subclass & 0b11;
        match subclass >> 2 {
            Self::ADDRESS if byte != 0 => Some(Self::AddressByte(byte)),
            Self::POLL_DELAY => Some(Self::PollDelay(byte)),
            Self::POLL_COUNT => Some(Self::PollCount(byte)),
            _ => None,
        }
    }

    /// Returns the bit offset of this byte within its 32-bit register.
    pub const fn shift(&self) -> u32 {
        match *self {
            Self::AddressByte(byte) | Self::PollDelay(byte) | Self::PollCount(byte) => {
                8 * (byte as u32 & 0b11)
            },
        }
    }

    fn validate(&self) -> Result<(), ScriptBuildError> {
        match *self {
            Self::AddressByte(byte) if !(1..=3).contains(&byte) => {
                Err(ScriptBuildError::InvalidAddressByte(byte))
            },
            Self::PollDelay(byte) | Self::PollCount(byte) if byte > 3 => {
                Err(ScriptBuildError::InvalidRegisterByte(byte))
            },
            _ => Ok(()),
        }
    }
}

// SCRIPT OPERATION
// ================================================================================================

/// A single script operation, including the data of writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    Set {
        register: ScriptRegister,
        value: u8,
    },
    Poll {
        address: u8,
        bit: u8,
        until_set: bool,
    },
    Read {
        address: u8,
        width: DataWidth,
        count: u8,
        increment: bool,
    },
    Write {
        address: u8,
        width: DataWidth,
        data: Vec<u32>,
        increment: bool,
    },
}

impl ScriptOp {
    /// Returns the header of this operation.
    pub fn header(&self) -> OpHeader {
        match self {
            Self::Set { register, value } => OpHeader::Set { register: *register, value: *value },
            Self::Poll { address, bit, until_set } => OpHeader::Poll {
                address: *address,
                bit: *bit,
                until_set: *until_set,
            },
            Self::Read { address, width, count, increment } => OpHeader::Read(TransferHeader {
                address: *address,
                width: *width,
                count: *count,
                increment: *increment,
            }),
            Self::Write { address, width, data, increment } => OpHeader::Write(TransferHeader {
                address: *address,
                width: *width,
                count: data.len() as u8,
                increment: *increment,
            }),
        }
    }

    /// Returns the number of bus transactions this operation issues, or `None` for polls whose
    /// count depends on the polled value.
    pub fn transaction_count(&self) -> Option<usize> {
        match self {
            Self::Set { .. } => Some(0),
            Self::Poll { .. } => None,
            Self::Read { count, .. } => Some(*count as usize),
            Self::Write { data, .. } => Some(data.len()),
        }
    }

    fn validate(&self) -> Result<(), ScriptBuildError> {
        match self {
            Self::Set { register, .. } => register.validate(),
            Self::Poll { bit, .. } if *bit >= 32 => Err(ScriptBuildError::InvalidPollBit(*bit)),
            Self::Poll { .. } => Ok(()),
            Self::Read { count, .. } => check_transfer_count(*count as usize),
            Self::Write { data, .. } => check_transfer_count(data.len()),
        }
    }

    fn encode_into(&self, target: &mut Vec<u8>) {
        target.extend_from_slice(&self.header().encode());
        if let Self::Write { width, data, .. } = self {
            for value in data {
                target.extend_from_slice(&value.to_le_bytes()[..width.bytes()]);
            }
        }
    }
}

fn check_transfer_count(count: usize) -> Result<(), ScriptBuildError> {
    if (1..=8).contains(&count) {
        Ok(())
    } else {
        Err(ScriptBuildError::InvalidTransferCount(count))
    }
}

// SCRIPT
// ================================================================================================

/// An ordered list of validated script operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    ops: Vec<ScriptOp>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation to the script.
    ///
    /// # Errors
    /// Returns an error if the operation cannot be encoded: a transfer of zero or more than
    /// eight values, a poll bit above 31, or a register byte outside its register.
    pub fn push(&mut self, op: ScriptOp) -> Result<&mut Self, ScriptBuildError> {
        op.validate()?;
        self.ops.push(op);
        Ok(self)
    }

    /// Loads the upper 24 bits of `address` into the address register.
    pub fn select_address(&mut self, address: u32) -> &mut Self {
        for byte in 1..=3u8 {
            self.ops.push(ScriptOp::Set {
                register: ScriptRegister::AddressByte(byte),
                value: (address >> (8 * byte)) as u8,
            });
        }
        self
    }

    /// Sets the number of idle cycles between poll attempts.
    pub fn set_poll_delay(&mut self, cycles: u32) -> &mut Self {
        self.set_register(ScriptRegister::PollDelay, cycles)
    }

    /// Sets the maximum number of read attempts of each poll operation.
    pub fn set_poll_count(&mut self, attempts: u32) -> &mut Self {
        self.set_register(ScriptRegister::PollCount, attempts)
    }

    pub fn poll(
        &mut self,
        address: u8,
        bit: u8,
        until_set: bool,
    ) -> Result<&mut Self, ScriptBuildError> {
        self.push(ScriptOp::Poll { address, bit, until_set })
    }

    pub fn read(
        &mut self,
        address: u8,
        width: DataWidth,
        count: usize,
        increment: bool,
    ) -> Result<&mut Self, ScriptBuildError> {
        check_transfer_count(count)?;
        self.push(ScriptOp::Read { address, width, count: count as u8, increment })
    }

    pub fn write(
        &mut self,
        address: u8,
        width: DataWidth,
        data: &[u32],
        increment: bool,
    ) -> Result<&mut Self, ScriptBuildError> {
        self.push(ScriptOp::Write { address, width, data: data.to_vec(), increment })
    }

    pub fn ops(&self) -> &[ScriptOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the script byte stream.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for op in &self.ops {
            op.encode_into(&mut bytes);
        }
        bytes
    }

    /// Returns the command sequence which runs this script: a `start-clear`, the byte stream in
    /// six-byte `data` chunks, and a final `data-last` holding the remaining bytes.
    pub fn to_commands(&self) -> Vec<ScriptCommand> {
        let bytes = self.to_bytes();
        let mut commands = vec![ScriptCommand::StartClear];
        let mut chunks = bytes.chunks(MAX_PAYLOAD_BYTES).peekable();
        if chunks.peek().is_none() {
            commands.push(ScriptCommand::DataLast(Payload::EMPTY));
        }
        while let Some(chunk) = chunks.next() {
            let payload = Payload::from_chunk(chunk);
            if chunks.peek().is_some() {
                commands.push(ScriptCommand::Data(payload));
            } else {
                commands.push(ScriptCommand::DataLast(payload));
            }
        }
        commands
    }

    /// Returns the number of bus transactions the script issues, or `None` if it polls.
    pub fn transaction_count(&self) -> Option<usize> {
        self.ops.iter().map(ScriptOp::transaction_count).sum()
    }

    fn set_register(&mut self, register: fn(u8) -> ScriptRegister, value: u32) -> &mut Self {
        for byte in 0..4u8 {
            self.ops.push(ScriptOp::Set {
                register: register(byte),
                value: (value >> (8 * byte)) as u8,
            });
        }
        self
    }
}

// TESTS
// ================================================================================================
