use apb_script::{
    BusTransaction, CommandImage, CommandRom, DataWidth, MemoryTarget, ResponseState, Script,
    ScriptError, ScriptOptions, execute_from_store, execute_script,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Initializes a peripheral, waits for it to become ready and reads back its status.
fn bring_up() -> Script {
    let mut script = Script::new();
    script.select_address(0x4000_0000);
    script.write(0x00, DataWidth::Bits32, &[0x0000_0001], false).unwrap();
    script.set_poll_delay(1);
    script.poll(0x04, 31, true).unwrap();
    script.read(0x08, DataWidth::Bits8, 4, true).unwrap();
    script
}

fn peripheral() -> MemoryTarget {
    let mut target = MemoryTarget::new().with_wait_states(1);
    target.script_reads(0x4000_0004, [0, 0, 0x8000_0000]);
    for (offset, value) in [0x11, 0x22, 0x33, 0x44].into_iter().enumerate() {
        target.store(0x4000_0008 + offset as u32, value);
    }
    target
}

#[rstest]
#[case::stream(false)]
#[case::store(true)]
fn both_front_ends_agree(#[case] from_store: bool) {
    let script = bring_up();
    let mut target = peripheral();
    let report = if from_store {
        let mut image = CommandImage::new();
        image.push("other", &Script::new()).unwrap();
        let address = image.push("bring_up", &script).unwrap();
        let rom = CommandRom::new(image.words().iter().copied()).with_latency(1);
        execute_from_store(&rom, address, &mut target, ScriptOptions::default()).unwrap()
    } else {
        execute_script(&script, &mut target, ScriptOptions::default(), 2).unwrap()
    };

    assert_eq!(report.state, ResponseState::Completed);
    assert_eq!(report.transactions, 1 + 3 + 4);
    assert_eq!(report.results.iter().map(|data| data.value).collect::<Vec<_>>(), vec![
        0x11, 0x22, 0x33, 0x44
    ]);
    assert_eq!(target.transactions().next(), Some(&BusTransaction::write(0x4000_0000, 1)));
}

#[test]
fn exhausted_poll_skips_remaining_operations() {
    let script = bring_up();
    let mut target = peripheral();
    let options = ScriptOptions::default().with_poll_count(2);
    let report = execute_script(&script, &mut target, options, 0).unwrap();

    assert_eq!(report.state, ResponseState::PollFailed);
    assert_eq!(
        report.error,
        Some(ScriptError::PollExhausted { address: 0x4000_0004, attempts: 2 })
    );
    assert_eq!(report.transactions, 3);
    assert!(report.results.is_empty());
}

#[test]
fn faulting_read_errors() {
    let mut target = peripheral().with_fault(0x4000_000a);
    let report = execute_script(&bring_up(), &mut target, ScriptOptions::default(), 0).unwrap();

    assert_eq!(report.state, ResponseState::Errored);
    assert_eq!(report.error, Some(ScriptError::BusFault { address: 0x4000_000a, write: false }));
    // the two reads before the fault still delivered their data
    assert_eq!(report.results.len(), 2);
}
