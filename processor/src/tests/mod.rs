use alloc::vec::Vec;

use apb_script_core::{CommandWord, ResponseState, Script, ScriptCommand, ScriptResponse};

use super::*;

mod scenarios;

// HELPERS
// ================================================================================================

const CYCLE_LIMIT: u32 = 10_000;

fn payload(bytes: &[u8]) -> Payload {
    Payload::new(bytes).unwrap()
}

fn data(bytes: &[u8]) -> CommandWord {
    ScriptCommand::Data(payload(bytes)).into()
}

fn data_last(bytes: &[u8]) -> CommandWord {
    ScriptCommand::DataLast(payload(bytes)).into()
}

fn start() -> CommandWord {
    ScriptCommand::Start.into()
}

fn start_clear() -> CommandWord {
    ScriptCommand::StartClear.into()
}

fn words_of(script: &Script) -> Vec<CommandWord> {
    script.to_commands().into_iter().map(CommandWord::from).collect()
}

/// Offers `words` to `frontend` back to back and steps until a terminal state is reported.
///
/// Returns every response of the run, the last one being the terminal response.
fn feed(
    frontend: &mut StreamFrontEnd,
    target: &mut MemoryTarget,
    words: &[CommandWord],
) -> Vec<ScriptResponse> {
    let mut responses = Vec::new();
    let mut next = 0;
    for _ in 0..CYCLE_LIMIT {
        let request = match words.get(next) {
            Some(word) => StreamRequest::offer(*word),
            None => StreamRequest::idle(),
        };
        let (flow, response) = frontend.step(request, target);
        if flow.acknowledge {
            next += 1;
        }
        responses.push(response);
        if response.state.is_terminal() {
            return responses;
        }
    }
    panic!("run did not terminate within {CYCLE_LIMIT} cycles");
}

fn terminal(responses: &[ScriptResponse]) -> ResponseState {
    responses.last().map(|response| response.state).unwrap_or_default()
}
