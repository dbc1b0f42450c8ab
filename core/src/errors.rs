// DECODE ERROR
// ================================================================================================

/// Errors raised while unpacking command words or script headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("command word carries malformed opcode {0}")]
    MalformedOpcode(u8),
    #[error("command word declares {0} valid data bytes, but at most 6 are allowed")]
    InvalidByteCount(u8),
    #[error("script operation header {opcode:#04x} is malformed")]
    MalformedHeader { opcode: u8 },
}

// SCRIPT BUILD ERROR
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScriptBuildError {
    #[error("a transfer must move between 1 and 8 values, but {0} were requested")]
    InvalidTransferCount(usize),
    #[error("poll bit index must be below 32, but was {0}")]
    InvalidPollBit(u8),
    #[error("address byte index must be 1, 2 or 3, but was {0}")]
    InvalidAddressByte(u8),
    #[error("register byte index must be below 4, but was {0}")]
    InvalidRegisterByte(u8),
    #[error("command image needs {0} words, but the store holds at most 65536")]
    ImageOverflow(usize),
}
