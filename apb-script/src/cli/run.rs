use std::{path::PathBuf, time::Instant};

use apb_script::{
    CommandImage, CommandRom, ScriptOptions, ScriptReport, execute_from_store, execute_script,
};
use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Report, WrapErr};

use super::data::ScriptFile;

/// Front end which feeds the script into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrontEnd {
    /// Push the command words over the stream interface
    Stream,
    /// Place the script in a command store and run it from there
    Store,
}

#[derive(Debug, Clone, Parser)]
#[command(about = "Run a script against a memory target")]
pub struct RunCmd {
    /// Path to the script file
    #[arg(value_parser)]
    script_file: PathBuf,

    /// Front end used to feed the script
    #[arg(short = 'f', long = "front-end", value_enum, default_value = "stream")]
    front_end: FrontEnd,

    /// Poll attempts before a poll fails, unless the script sets it
    #[arg(long = "poll-count", default_value_t = ScriptOptions::DEFAULT_POLL_COUNT)]
    poll_count: u32,

    /// Idle cycles between poll attempts, unless the script sets it
    #[arg(long = "poll-delay", default_value_t = 0)]
    poll_delay: u32,

    /// Address increment of incrementing reads and writes
    #[arg(long = "address-stride", default_value_t = 1)]
    address_stride: u32,

    /// Wait states the memory target inserts into every transaction
    #[arg(short = 'w', long = "wait-states", default_value_t = 0)]
    wait_states: u32,

    /// Cycles each command store fetch takes
    #[arg(long = "store-latency", default_value_t = 0)]
    store_latency: u8,

    /// Idle cycles the stream client waits between command words
    #[arg(long = "idle-gap", default_value_t = 0)]
    idle_gap: u32,

    /// Maximum number of cycles the run may take
    #[arg(short = 'm', long = "max-cycles")]
    max_cycles: Option<u32>,
}

impl RunCmd {
    pub fn execute(&self) -> Result<(), Report> {
        println!("===============================================================================");
        println!("Run script: {}", self.script_file.display());
        println!("-------------------------------------------------------------------------------");

        let file = ScriptFile::read(&self.script_file)?;
        let script = file.script()?;
        let mut target = file.target(self.wait_states);
        let options = ScriptOptions::new(
            self.poll_count,
            self.poll_delay,
            self.address_stride,
            self.max_cycles,
        )
        .into_diagnostic()
        .wrap_err("Invalid engine options")?;

        let now = Instant::now();
        let report = match self.front_end {
            FrontEnd::Stream => execute_script(&script, &mut target, options, self.idle_gap),
            FrontEnd::Store => {
                let mut image = CommandImage::new();
                let address = image.push("script", &script).into_diagnostic()?;
                let rom = CommandRom::new(image.words().iter().copied())
                    .with_latency(self.store_latency);
                execute_from_store(&rom, address, &mut target, options)
            },
        }
        .into_diagnostic()
        .wrap_err("Failed to run script")?;

        print_report(&report);
        println!("Executed in {} ms", now.elapsed().as_millis());

        if report.is_completed() {
            return Ok(());
        }
        let reason = report.error.map(|error| error.to_string()).unwrap_or_default();
        Err(Report::msg(format!("script {}: {reason}", report.state)))
    }
}

fn print_report(report: &ScriptReport) {
    println!("Status: {}", report.state);
    println!("Cycles: {}", report.cycles);
    println!("Transactions: {}", report.transactions);
    for (index, data) in report.results.iter().enumerate() {
        let digits = data.width.bytes() * 2;
        println!("Read {index}: {:#0width$x}", data.value, width = digits + 2);
    }
}
