use super::{DataWidth, ScriptRegister};
use crate::errors::DecodeError;

// CONSTANTS
// ================================================================================================

const CLASS_SHIFT: u8 = 6;
const CLASS_SET: u8 = 0;
const CLASS_POLL: u8 = 1;
const CLASS_READ: u8 = 2;
const CLASS_WRITE: u8 = 3;

const SUBCLASS_MASK: u8 = 0x3f;
const INCREMENT_FLAG: u8 = 1 << 5;
const POLL_SET_FLAG: u8 = 1 << 5;
const POLL_BIT_MASK: u8 = 0x1f;
const COUNT_SHIFT: u8 = 2;
const COUNT_MASK: u8 = 0b111;
const WIDTH_MASK: u8 = 0b11;

// OPERATION HEADER
// ================================================================================================

/// Parameters shared by read and write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferHeader {
    /// Low byte of the first transaction address.
    pub address: u8,
    pub width: DataWidth,
    /// Number of transactions, 1 to 8. A count of 0 encodes as 8.
    pub count: u8,
    /// Whether the address advances after each transaction.
    pub increment: bool,
}

impl TransferHeader {
    fn subclass(&self) -> u8 {
        let increment = if self.increment { INCREMENT_FLAG } else { 0 };
        increment | (self.count.wrapping_sub(1) & COUNT_MASK) << COUNT_SHIFT | self.width.code()
    }

    fn from_subclass(opcode: u8, address: u8) -> Result<Self, DecodeError> {
        let width = DataWidth::from_code(opcode & WIDTH_MASK)
            .ok_or(DecodeError::MalformedHeader { opcode })?;
        Ok(Self {
            address,
            width,
            count: ((opcode >> COUNT_SHIFT) & COUNT_MASK) + 1,
            increment: opcode & INCREMENT_FLAG != 0,
        })
    }
}

/// The two-byte header which starts every script operation.
///
/// The first byte holds the operation class in bits 7..6 and a class-specific subclass in bits
/// 5..0; the second byte is the operand (an address low byte, or the value of a set operation).
/// Writes are followed by `count * width` little-endian data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpHeader {
    /// Sets one byte of an engine register; issues no transaction.
    Set { register: ScriptRegister, value: u8 },
    /// Reads `address` until bit `bit` equals `until_set`, within the poll budget.
    Poll { address: u8, bit: u8, until_set: bool },
    Read(TransferHeader),
    Write(TransferHeader),
}

impl OpHeader {
    /// The number of bytes in an encoded header.
    pub const SIZE: usize = 2;

    /// Decodes an operation header.
    ///
    /// # Errors
    /// Returns an error if the header selects an unknown register or a reserved data width.
    pub fn decode(bytes: [u8; Self::SIZE]) -> Result<Self, DecodeError> {
        let [opcode, operand] = bytes;
        let subclass = opcode & SUBCLASS_MASK;
        match opcode >> CLASS_SHIFT {
            CLASS_SET => {
                let register = ScriptRegister::from_subclass(subclass)
                    .ok_or(DecodeError::MalformedHeader { opcode })?;
                Ok(Self::Set { register, value: operand })
            },
            CLASS_POLL => Ok(Self::Poll {
                address: operand,
                bit: subclass & POLL_BIT_MASK,
                until_set: subclass & POLL_SET_FLAG != 0,
            }),
            CLASS_READ => TransferHeader::from_subclass(opcode, operand).map(Self::Read),
            _ => TransferHeader::from_subclass(opcode, operand).map(Self::Write),
        }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        match self {
            Self::Set { register, value } => {
                [CLASS_SET << CLASS_SHIFT | register.subclass(), *value]
            },
            Self::Poll { address, bit, until_set } => {
                let set = if *until_set { POLL_SET_FLAG } else { 0 };
                [CLASS_POLL << CLASS_SHIFT | set | (bit & POLL_BIT_MASK), *address]
            },
            Self::Read(transfer) => {
                [CLASS_READ << CLASS_SHIFT | transfer.subclass(), transfer.address]
            },
            Self::Write(transfer) => {
                [CLASS_WRITE << CLASS_SHIFT | transfer.subclass(), transfer.address]
            },
        }
    }

    /// Returns the number of data bytes which follow this header in the script stream.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Write(transfer) => transfer.count as usize * transfer.width.bytes(),
            _ => 0,
        }
    }
}

// TESTS
// ================================================================================================
