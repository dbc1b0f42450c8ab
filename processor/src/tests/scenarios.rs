use apb_script_core::{DecodeError, ReadData};
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;

// END TO END SCENARIOS
// ================================================================================================

/// A 16-bit write whose header and data arrive in a single `data` word, followed by an empty
/// `data-last`.
fn write16_words() -> Vec<CommandWord> {
    vec![start(), data(&[0xc1, 0x00, 0x34, 0x12]), data_last(&[])]
}

#[test]
fn write_then_empty_data_last_completes() {
    let mut target = MemoryTarget::new();
    let report = execute_words(&write16_words(), &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(report.state, ResponseState::Completed);
    assert_eq!(report.error, None);
    assert_eq!(report.transactions, 1);
    // the data-last word is only acknowledged once the write has retired
    assert_eq!(report.cycles, 8);
    assert_eq!(target.transactions().copied().collect::<Vec<_>>(), vec![
        BusTransaction::write(0x00, 0x1234)
    ]);
}

#[test]
fn write_to_faulting_target_errors() {
    let mut target = MemoryTarget::new().with_fault(0x00);
    let report = execute_words(&write16_words(), &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(report.state, ResponseState::Errored);
    assert_eq!(report.error, Some(ScriptError::BusFault { address: 0, write: true }));
    assert_eq!(target.load(0), 0);
}

#[test]
fn data_last_without_start_errors() {
    let words = [CommandWord::IDLE, CommandWord::IDLE, data_last(&[])];
    let mut target = MemoryTarget::new();
    let report = execute_words(&words, &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(report.state, ResponseState::Errored);
    assert_eq!(report.error, Some(ScriptError::NotStarted));
    assert_eq!(report.cycles, 3);
    assert_eq!(report.transactions, 0);
}

#[test]
fn reads_are_reported_in_order() {
    let mut target = MemoryTarget::new();
    target.store(0x2000_0010, 0xaaaa_1111);
    target.store(0x2000_0012, 0xbbbb_2222);

    let mut script = Script::new();
    script.select_address(0x2000_0000);
    script.read(0x10, DataWidth::Bits16, 2, true).unwrap();
    let options = ScriptOptions::new(1024, 0, 2, None).unwrap();
    let report = execute_script(&script, &mut target, options, 1).unwrap();

    assert!(report.is_completed());
    assert_eq!(report.results, vec![
        ReadData { width: DataWidth::Bits16, value: 0x1111 },
        ReadData { width: DataWidth::Bits16, value: 0x2222 },
    ]);
    assert!(report.results.iter().all(|data| data.bytes_valid() == 2));
}

#[test]
fn transactions_follow_script_order() {
    let mut script = Script::new();
    script.select_address(0x4000_0100);
    script.write(0x00, DataWidth::Bits32, &[1, 2, 3], true).unwrap();
    script.read(0x04, DataWidth::Bits32, 1, false).unwrap();
    script.write(0x20, DataWidth::Bits8, &[0xff, 0x1ff], false).unwrap();

    let mut target = MemoryTarget::new().with_wait_states(2);
    let options = ScriptOptions::new(1024, 0, 4, None).unwrap();
    let report = execute_script(&script, &mut target, options, 0).unwrap();

    assert!(report.is_completed());
    assert_eq!(Some(report.transactions), script.transaction_count());
    assert_eq!(target.transactions().copied().collect::<Vec<_>>(), vec![
        BusTransaction::write(0x4000_0100, 1),
        BusTransaction::write(0x4000_0104, 2),
        BusTransaction::write(0x4000_0108, 3),
        BusTransaction::read(0x4000_0104),
        BusTransaction::write(0x4000_0120, 0xff),
        BusTransaction::write(0x4000_0120, 0xff),
    ]);
    assert_eq!(report.results, vec![ReadData { width: DataWidth::Bits32, value: 2 }]);
}

#[rstest]
// write32 header followed by only two of its data bytes
#[case(vec![start_clear(), data_last(&[0xc2, 0x00, 0x01, 0x02])])]
// a lone header byte
#[case(vec![start_clear(), data_last(&[0x80])])]
// partial header, then an empty data-last
#[case(vec![start(), data(&[0x80]), data_last(&[])])]
// two 32-bit values cut short by an empty data-last
#[case(vec![start(), data(&[0xc6, 0x00, 0x01, 0x02, 0x03, 0x04]), data_last(&[])])]
fn short_data_last_errors(#[case] words: Vec<CommandWord>) {
    let mut target = MemoryTarget::new();
    let report = execute_words(&words, &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(report.state, ResponseState::Errored);
    assert_eq!(report.error, Some(ScriptError::IncompleteOperation));
}

#[rstest]
#[case(data_last(&[]), ScriptError::IncompleteOperation)]
#[case(start(), ScriptError::UnexpectedStart)]
#[case(CommandWord::new(5, 0, 0), ScriptError::Decode(DecodeError::MalformedOpcode(5)))]
fn failed_run_drains_outstanding_transaction(
    #[case] last: CommandWord,
    #[case] expected: ScriptError,
) {
    let mut sequencer = Sequencer::default();
    let mut target = MemoryTarget::new().with_wait_states(5);

    // two 32-bit writes with data for the first one only; the first write is issued on the
    // fourth cycle
    sequencer.step(start(), &mut target);
    let mut word = data(&[0xc6, 0x00, 0x01, 0x00, 0x00, 0x00]);
    for _ in 0..3 {
        let response = sequencer.step(word, &mut target);
        word.consume(response.bytes_consumed);
    }
    assert_eq!(word.num_data_valid(), 0);
    assert_eq!(sequencer.transactions_issued(), 1);

    let mut states = Vec::new();
    let mut response = sequencer.step(last, &mut target);
    for _ in 0..CYCLE_LIMIT {
        if response.state.is_terminal() {
            break;
        }
        states.push(response.state);
        response = sequencer.step(CommandWord::IDLE, &mut target);
    }

    // setup cycle and five wait states, then the write retires
    assert_eq!(states, vec![ResponseState::Running; 6]);
    assert_eq!(response.state, ResponseState::Errored);
    assert_eq!(sequencer.last_error(), Some(expected));
    assert_eq!(target.transactions().copied().collect::<Vec<_>>(), vec![
        BusTransaction::write(0x00, 1)
    ]);
    assert_eq!(sequencer.transactions_issued(), 1);
    assert!(sequencer.can_accept());
}

#[rstest]
#[case(CommandWord::new(5, 0, 0), DecodeError::MalformedOpcode(5))]
#[case(CommandWord::new(7, 2, 0xffff), DecodeError::MalformedOpcode(7))]
#[case(CommandWord::new(3, 7, 0), DecodeError::InvalidByteCount(7))]
fn malformed_words_error(#[case] word: CommandWord, #[case] expected: DecodeError) {
    let mut target = MemoryTarget::new();
    let report = execute_words(&[start(), word], &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(report.state, ResponseState::Errored);
    assert_eq!(report.error, Some(ScriptError::Decode(expected)));
}

#[test]
fn malformed_header_errors() {
    let mut target = MemoryTarget::new();
    // read with the reserved width code
    let words = [start(), data_last(&[0x83, 0x00])];
    let report = execute_words(&words, &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(
        report.error,
        Some(ScriptError::Decode(DecodeError::MalformedHeader { opcode: 0x83 }))
    );
    assert_eq!(report.transactions, 0);
}

#[test]
fn start_while_running_errors() {
    let mut target = MemoryTarget::new();
    let report =
        execute_words(&[start(), data(&[0x80]), start()], &mut target, ScriptOptions::default(), 0)
            .unwrap();

    assert_eq!(report.error, Some(ScriptError::UnexpectedStart));
}

#[test]
fn empty_script_completes_without_transactions() {
    let mut target = MemoryTarget::new();
    let report = execute_script(&Script::new(), &mut target, ScriptOptions::default(), 0).unwrap();

    assert!(report.is_completed());
    assert_eq!(report.transactions, 0);
}

#[test]
fn unterminated_run_hits_cycle_limit() {
    let mut target = MemoryTarget::new();
    let options = ScriptOptions::new(1024, 0, 1, Some(64)).unwrap();
    let result = execute_words(&[start(), data(&[0x80])], &mut target, options, 0);

    assert_eq!(result, Err(ExecutionError::CycleLimitExceeded(64)));
}

// POLLING
// ================================================================================================

#[rstest]
#[case(1)]
#[case(3)]
#[case(16)]
fn unsatisfied_poll_fails_after_budget(#[case] budget: u32) {
    let mut script = Script::new();
    script.set_poll_count(budget);
    script.poll(0x08, 4, true).unwrap();
    // never reached
    script.write(0x00, DataWidth::Bits8, &[1], false).unwrap();

    let mut target = MemoryTarget::new();
    let report = execute_script(&script, &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(report.state, ResponseState::PollFailed);
    assert_eq!(report.error, Some(ScriptError::PollExhausted { address: 0x08, attempts: budget }));
    assert_eq!(report.transactions, budget as usize);
    assert!(target.transactions().all(|tx| *tx == BusTransaction::read(0x08)));
}

#[rstest]
#[case(4, 1)]
#[case(4, 4)]
#[case(8, 5)]
fn satisfied_poll_stops_at_first_match(#[case] budget: u32, #[case] ready_on: usize) {
    let mut target = MemoryTarget::new();
    let mut values = vec![0xffff_fffe; ready_on - 1];
    values.push(0x1);
    target.script_reads(0x08, values);

    let mut script = Script::new();
    script.set_poll_count(budget);
    script.poll(0x08, 0, true).unwrap();
    let report = execute_script(&script, &mut target, ScriptOptions::default(), 0).unwrap();

    assert!(report.is_completed());
    assert_eq!(report.transactions, ready_on);
    assert!(report.results.is_empty());
}

#[test]
fn zero_poll_count_allows_one_attempt() {
    let options = ScriptOptions::default().with_poll_count(0);
    let mut script = Script::new();
    script.poll(0x00, 0, false).unwrap();
    let mut target = MemoryTarget::new();
    target.store(0x00, 1);

    let report = execute_script(&script, &mut target, options, 0).unwrap();
    assert_eq!(report.state, ResponseState::PollFailed);
    assert_eq!(report.transactions, 1);
}

#[test]
fn poll_delay_spaces_attempts() {
    let mut script = Script::new();
    script.set_poll_count(3);
    script.poll(0x00, 0, true).unwrap();

    let run = |delay: u32| {
        let options = ScriptOptions::default().with_poll_delay(delay);
        execute_script(&script, &mut MemoryTarget::new(), options, 0).unwrap()
    };
    let (fast, slow) = (run(0), run(5));

    assert_eq!(fast.transactions, 3);
    assert_eq!(slow.transactions, 3);
    // two gaps of five idle cycles between the three attempts
    assert_eq!(slow.cycles, fast.cycles + 10);
}

// REGISTERS
// ================================================================================================

#[test]
fn start_keeps_registers_and_start_clear_resets_them() {
    let mut frontend = StreamFrontEnd::default();
    let mut target = MemoryTarget::new();

    let mut first = Script::new();
    first.select_address(0x1000_0000);
    first.read(0x04, DataWidth::Bits32, 1, false).unwrap();
    let responses = feed(&mut frontend, &mut target, &words_of(&first));
    assert_eq!(terminal(&responses), ResponseState::Completed);

    let mut second = Script::new();
    second.read(0x08, DataWidth::Bits32, 1, false).unwrap();
    let mut words = words_of(&second);
    words[0] = start();
    assert_eq!(terminal(&feed(&mut frontend, &mut target, &words)), ResponseState::Completed);
    let words = words_of(&second);
    assert_eq!(terminal(&feed(&mut frontend, &mut target, &words)), ResponseState::Completed);

    assert_eq!(target.transactions().copied().collect::<Vec<_>>(), vec![
        BusTransaction::read(0x1000_0004),
        BusTransaction::read(0x1000_0008),
        BusTransaction::read(0x08),
    ]);
}

#[test]
fn start_clear_discards_state_of_failed_run() {
    let mut frontend = StreamFrontEnd::default();
    let mut target = MemoryTarget::new();

    // the malformed header aborts the run with write data still queued behind it
    let failed = [start_clear(), data(&[0x01, 0x30, 0xc3, 0x00, 0xee, 0xee])];
    let responses = feed(&mut frontend, &mut target, &failed);
    assert_eq!(terminal(&responses), ResponseState::Errored);
    assert!(frontend.sequencer().last_error().is_some());
    assert!(!frontend.is_holding());

    let mut script = Script::new();
    script.write(0x10, DataWidth::Bits8, &[0x5a], false).unwrap();
    let responses = feed(&mut frontend, &mut target, &words_of(&script));

    assert_eq!(terminal(&responses), ResponseState::Completed);
    assert_eq!(frontend.sequencer().last_error(), None);
    assert_eq!(target.transactions().copied().collect::<Vec<_>>(), vec![
        BusTransaction::write(0x10, 0x5a)
    ]);
}

#[test]
fn start_keeps_last_error() {
    let mut frontend = StreamFrontEnd::default();
    let mut target = MemoryTarget::new();
    feed(&mut frontend, &mut target, &[start(), data_last(&[0x80])]);
    assert_eq!(frontend.sequencer().last_error(), Some(ScriptError::IncompleteOperation));

    let responses = feed(&mut frontend, &mut target, &[start(), data_last(&[])]);
    assert_eq!(terminal(&responses), ResponseState::Completed);
    assert_eq!(frontend.sequencer().last_error(), Some(ScriptError::IncompleteOperation));
}

#[rstest]
#[case::poll_failed(ResponseState::PollFailed)]
#[case::completed(ResponseState::Completed)]
fn start_clear_after_terminal_state_runs_only_new_script(#[case] first_state: ResponseState) {
    let mut frontend = StreamFrontEnd::default();
    let mut target = MemoryTarget::new();

    // a failing poll leaves the write queued behind it
    let mut first = Script::new();
    first.set_poll_count(1);
    first.poll(0x08, 4, first_state == ResponseState::PollFailed).unwrap();
    first.write(0x00, DataWidth::Bits8, &[1], false).unwrap();
    let responses = feed(&mut frontend, &mut target, &words_of(&first));
    assert_eq!(terminal(&responses), first_state);
    let before = target.transactions().count();

    let mut second = Script::new();
    second.write(0x10, DataWidth::Bits8, &[0x5a], false).unwrap();
    let words = words_of(&second);
    assert_eq!(words[0], start_clear());
    let responses = feed(&mut frontend, &mut target, &words);

    assert_eq!(terminal(&responses), ResponseState::Completed);
    assert_eq!(frontend.sequencer().last_error(), None);
    assert_eq!(target.transactions().skip(before).copied().collect::<Vec<_>>(), vec![
        BusTransaction::write(0x10, 0x5a)
    ]);
}
