#![no_std]

#[macro_use]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

/// This is an implementation of `std::assert_matches::assert_matches`
/// so it can be removed when that feature stabilizes upstream
#[macro_export]
macro_rules! assert_matches {
    ($left:expr, $(|)? $( $pattern:pat_param )|+ $( if $guard: expr )? $(,)?) => {
        match $left {
            $( $pattern )|+ $( if $guard )? => {}
            ref left_val => {
                panic!(r#"
assertion failed: `(left matches right)`
    left: `{:?}`,
    right: `{}`"#, left_val, stringify!($($pattern)|+ $(if $guard)?));
            }
        }
    };

    ($left:expr, $(|)? $( $pattern:pat_param )|+ $( if $guard: expr )?, $msg:literal $(,)?) => {
        match $left {
            $( $pattern )|+ $( if $guard )? => {}
            ref left_val => {
                panic!(concat!(r#"
assertion failed: `(left matches right)`
    left: `{:?}`,
    right: `{}`
"#, $msg), left_val, stringify!($($pattern)|+ $(if $guard)?));
            }
        }
    };
}

pub mod apb;
pub mod command;
pub mod errors;
pub mod image;
pub mod script;

// RE-EXPORTS
// ================================================================================================

pub use apb::{Access, ApbRequest, ApbResponse, BusTransaction, Retirement};
pub use command::{
    CommandWord, MAX_BYTES_CONSUMED, MAX_PAYLOAD_BYTES, Opcode, Payload, ReadData, ResponseState,
    ScriptCommand, ScriptResponse,
};
pub use errors::{DecodeError, ScriptBuildError};
pub use image::CommandImage;
pub use script::{DataWidth, OpHeader, Script, ScriptOp, ScriptRegister, TransferHeader};
