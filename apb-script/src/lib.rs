#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

// EXPORTS
// ================================================================================================

pub use apb_script_core::{
    Access, ApbRequest, ApbResponse, BusTransaction, CommandImage, CommandWord, DataWidth,
    DecodeError, OpHeader, Opcode, Payload, ReadData, ResponseState, Script, ScriptBuildError,
    ScriptCommand, ScriptOp, ScriptRegister, ScriptResponse,
};
pub use apb_script_processor::{
    ApbTarget, AutonomousFrontEnd, CommandRom, CommandStore, ExecutionError, MemoryTarget,
    OptionsError, ProcessorRequest, ProcessorResponse, ScriptError, ScriptOptions, ScriptReport,
    Sequencer, StreamFrontEnd, StreamRequest, StreamResponse, execute_from_store, execute_script,
    execute_words,
};
