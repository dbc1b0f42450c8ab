use std::{fs, path::Path};

use apb_script::{DataWidth, MemoryTarget, Script};
use miette::{IntoDiagnostic, Report, WrapErr};
use serde::Deserialize;

// SCRIPT FILE
// ================================================================================================

/// A script together with the memory target it runs against, as read from a JSON file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptFile {
    /// Initial `[address, value]` pairs of the target memory.
    #[serde(default)]
    pub memory: Vec<(u32, u32)>,
    /// Addresses at which every transaction faults.
    #[serde(default)]
    pub faults: Vec<u32>,
    /// Values successive reads of an address return.
    #[serde(default)]
    pub reads: Vec<ScriptedReads>,
    pub ops: Vec<OpSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedReads {
    pub address: u32,
    pub values: Vec<u32>,
}

/// One script operation. Read and write widths are given in bits.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpSpec {
    Select {
        address: u32,
    },
    PollDelay {
        cycles: u32,
    },
    PollCount {
        attempts: u32,
    },
    Poll {
        address: u8,
        bit: u8,
        #[serde(default = "default_until_set")]
        until_set: bool,
    },
    Read {
        address: u8,
        width: u32,
        #[serde(default = "default_count")]
        count: usize,
        #[serde(default)]
        increment: bool,
    },
    Write {
        address: u8,
        width: u32,
        data: Vec<u32>,
        #[serde(default)]
        increment: bool,
    },
}

fn default_until_set() -> bool {
    true
}

fn default_count() -> usize {
    1
}

impl ScriptFile {
    /// Reads and parses a script file.
    pub fn read(path: &Path) -> Result<Self, Report> {
        let contents = fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read script file `{}`", path.display()))?;
        serde_json::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to parse script file `{}`", path.display()))
    }

    /// Builds the script described by the file.
    pub fn script(&self) -> Result<Script, Report> {
        let mut script = Script::new();
        for (index, op) in self.ops.iter().enumerate() {
            let result = match op {
                OpSpec::Select { address } => Ok(script.select_address(*address)),
                OpSpec::PollDelay { cycles } => Ok(script.set_poll_delay(*cycles)),
                OpSpec::PollCount { attempts } => Ok(script.set_poll_count(*attempts)),
                OpSpec::Poll { address, bit, until_set } => script.poll(*address, *bit, *until_set),
                OpSpec::Read { address, width, count, increment } => {
                    script.read(*address, parse_width(*width, index)?, *count, *increment)
                },
                OpSpec::Write { address, width, data, increment } => {
                    script.write(*address, parse_width(*width, index)?, data, *increment)
                },
            };
            result.into_diagnostic().wrap_err_with(|| format!("Invalid operation {index}"))?;
        }
        Ok(script)
    }

    /// Returns a memory target initialized from the file.
    pub fn target(&self, wait_states: u32) -> MemoryTarget {
        let mut target = self
            .faults
            .iter()
            .fold(MemoryTarget::new().with_wait_states(wait_states), |target, address| {
                target.with_fault(*address)
            });
        for (address, value) in &self.memory {
            target.store(*address, *value);
        }
        for reads in &self.reads {
            target.script_reads(reads.address, reads.values.iter().copied());
        }
        target
    }
}

fn parse_width(bits: u32, index: usize) -> Result<DataWidth, Report> {
    DataWidth::from_bits(bits).ok_or_else(|| {
        Report::msg(format!("Invalid operation {index}: width must be 8, 16 or 32, but was {bits}"))
    })
}

// TESTS
// ================================================================================================
