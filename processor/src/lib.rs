#![no_std]

#[macro_use]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

use alloc::vec::Vec;

use apb_script_core::{CommandWord, ReadData, ResponseState, Script};

mod bus;
mod errors;
mod options;
mod sequencer;
mod target;
mod unpacker;

pub mod frontend;

#[cfg(test)]
mod tests;

// RE-EXPORTS
// ================================================================================================

pub use apb_script_core::{
    Access, ApbRequest, ApbResponse, BusTransaction, DataWidth, Payload, ScriptCommand,
    ScriptResponse,
};
pub use bus::BusMaster;
pub use errors::{ExecutionError, ScriptError};
pub use frontend::{
    AutonomousFrontEnd, CommandRom, CommandStore, ProcessorRequest, ProcessorResponse,
    StreamFrontEnd, StreamRequest, StreamResponse,
};
pub use options::{OptionsError, ScriptOptions};
pub use sequencer::Sequencer;
pub use target::{ApbTarget, MemoryTarget};
pub use unpacker::{CommandUnpacker, QUEUE_CAPACITY};

// SCRIPT REPORT
// ================================================================================================

/// The outcome of a script run driven to its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    /// The terminal state of the run.
    pub state: ResponseState,
    /// The error which ended the run, if it did not complete.
    pub error: Option<ScriptError>,
    /// Data returned by read operations, in issue order.
    pub results: Vec<ReadData>,
    /// Number of cycles stepped, including the cycle reporting the terminal state.
    pub cycles: u32,
    /// Number of bus transactions issued during the run.
    pub transactions: usize,
}

impl ScriptReport {
    pub fn is_completed(&self) -> bool {
        self.state == ResponseState::Completed
    }
}

/// Collects the per-cycle responses of a run until it reaches a terminal state.
struct ReportBuilder {
    results: Vec<ReadData>,
    cycles: u32,
    max_cycles: u32,
    first_transaction: usize,
}

impl ReportBuilder {
    fn new(sequencer: &Sequencer) -> Self {
        Self {
            results: Vec::new(),
            cycles: 0,
            max_cycles: sequencer.options().max_cycles(),
            first_transaction: sequencer.transactions_issued(),
        }
    }

    /// Records a cycle and returns the report if it ended the run.
    fn record(
        &mut self,
        response: &ScriptResponse,
        sequencer: &Sequencer,
    ) -> Result<Option<ScriptReport>, ExecutionError> {
        self.cycles += 1;
        self.results.extend(response.result);
        if response.state.is_terminal() {
            let error = match response.state {
                ResponseState::Completed => None,
                _ => sequencer.last_error(),
            };
            return Ok(Some(ScriptReport {
                state: response.state,
                error,
                results: core::mem::take(&mut self.results),
                cycles: self.cycles,
                transactions: sequencer.transactions_issued() - self.first_transaction,
            }));
        }
        if self.cycles >= self.max_cycles {
            return Err(ExecutionError::CycleLimitExceeded(self.max_cycles));
        }
        Ok(None)
    }
}

// RUN HELPERS
// ================================================================================================

/// Runs `script` against `target` on a stream-fed engine and returns the outcome.
///
/// The script is pushed as the command sequence of [Script::to_commands]; the client waits
/// `idle_gap` cycles after each acknowledged word before offering the next one.
///
/// # Errors
/// Returns an error if the run does not reach a terminal state within the configured number of
/// cycles.
#[tracing::instrument("execute_script", skip_all, fields(ops = script.ops().len(), idle_gap))]
pub fn execute_script(
    script: &Script,
    target: &mut impl ApbTarget,
    options: ScriptOptions,
    idle_gap: u32,
) -> Result<ScriptReport, ExecutionError> {
    let words: Vec<CommandWord> =
        script.to_commands().into_iter().map(CommandWord::from).collect();
    execute_words(&words, target, options, idle_gap)
}

/// Pushes raw command `words` into a stream-fed engine until the run they start terminates.
///
/// # Errors
/// Returns an error if the run does not reach a terminal state within the configured number of
/// cycles.
pub fn execute_words(
    words: &[CommandWord],
    target: &mut impl ApbTarget,
    options: ScriptOptions,
    idle_gap: u32,
) -> Result<ScriptReport, ExecutionError> {
    let mut frontend = StreamFrontEnd::new(Sequencer::new(options));
    let mut report = ReportBuilder::new(frontend.sequencer());
    let mut next = 0;
    let mut gap: u32 = 0;

    loop {
        let request = match words.get(next) {
            Some(word) if gap == 0 => StreamRequest::offer(*word),
            _ => StreamRequest::idle(),
        };
        gap = gap.saturating_sub(1);

        let (flow, response) = frontend.step(request, target);
        if flow.acknowledge {
            next += 1;
            gap = idle_gap;
        }
        if let Some(report) = report.record(&response, frontend.sequencer())? {
            tracing::debug!(state = %report.state, cycles = report.cycles, "run finished");
            return Ok(report);
        }
    }
}

/// Runs the script stored at `address` of `store` against `target` on an autonomous engine.
///
/// # Errors
/// Returns an error if the run does not reach a terminal state within the configured number of
/// cycles.
#[tracing::instrument("execute_from_store", skip(store, target, options))]
pub fn execute_from_store(
    store: &impl CommandStore,
    address: u16,
    target: &mut impl ApbTarget,
    options: ScriptOptions,
) -> Result<ScriptReport, ExecutionError> {
    let mut frontend = AutonomousFrontEnd::new(store, Sequencer::new(options));
    let mut report = ReportBuilder::new(frontend.sequencer());
    let mut request = ProcessorRequest::run(address);

    loop {
        let (flow, response) = frontend.step(request, target);
        if flow.acknowledge {
            request = ProcessorRequest::idle();
        }
        if let Some(report) = report.record(&response, frontend.sequencer())? {
            tracing::debug!(state = %report.state, cycles = report.cycles, "run finished");
            return Ok(report);
        }
    }
}
