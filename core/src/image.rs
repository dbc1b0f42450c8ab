use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::fmt::Write;

use crate::{CommandWord, Script, errors::ScriptBuildError};

// CONSTANTS
// ================================================================================================

/// Number of words addressable by a 16-bit command store address.
pub const MAX_IMAGE_WORDS: usize = 1 << 16;

/// Number of hex digits used to render a command word; covers the 54 defined bits.
const WORD_HEX_DIGITS: usize = 14;

// COMMAND IMAGE
// ================================================================================================

/// A command store image holding one or more scripts at consecutive word addresses.
///
/// Each script is stored as the command words returned by [Script::to_commands], so an
/// autonomous front end started at a script's address runs exactly that script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandImage {
    words: Vec<CommandWord>,
    entries: Vec<ImageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageEntry {
    label: String,
    address: u16,
    len: usize,
}

impl CommandImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `script` to the image and returns the store address of its first word.
    ///
    /// # Errors
    /// Returns an error if the script does not fit into the 16-bit store address space.
    pub fn push(&mut self, label: &str, script: &Script) -> Result<u16, ScriptBuildError> {
        let commands = script.to_commands();
        let end = self.words.len() + commands.len();
        if end > MAX_IMAGE_WORDS {
            return Err(ScriptBuildError::ImageOverflow(end));
        }

        let address = self.words.len() as u16;
        self.words.extend(commands.into_iter().map(CommandWord::from));
        self.entries.push(ImageEntry {
            label: label.to_string(),
            address,
            len: end - address as usize,
        });
        Ok(address)
    }

    pub fn words(&self) -> &[CommandWord] {
        &self.words
    }

    /// Returns the store address of the script with the given label.
    pub fn address_of(&self, label: &str) -> Option<u16> {
        self.entries.iter().find(|entry| entry.label == label).map(|entry| entry.address)
    }

    /// Returns the label of the script starting at `address`.
    pub fn label(&self, address: u16) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.address == address)
            .map(|entry| entry.label.as_str())
    }

    /// Renders the image in the `$readmemh` text format: one `@address` line per script followed
    /// by its words in hex.
    pub fn to_mem_string(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let start = entry.address as usize;
            // writing into a String cannot fail
            let _ = writeln!(out, "// {}", entry.label);
            let _ = writeln!(out, "@{:04x}", entry.address);
            for word in &self.words[start..start + entry.len] {
                let _ = writeln!(out, "{:0width$x}", word.as_raw(), width = WORD_HEX_DIGITS);
            }
        }
        out
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{DataWidth, ScriptCommand};

    #[test]
    fn scripts_are_placed_back_to_back() {
        let mut first = Script::new();
        first.read(0x10, DataWidth::Bits32, 1, false).unwrap();
        let second = Script::new();

        let mut image = CommandImage::new();
        assert_eq!(image.push("first", &first), Ok(0));
        assert_eq!(image.push("second", &second), Ok(2));

        assert_eq!(image.words().len(), 4);
        assert_eq!(image.address_of("second"), Some(2));
        assert_eq!(image.label(0), Some("first"));
        assert_eq!(image.label(1), None);
        assert_eq!(
            ScriptCommand::try_from(image.words()[3]),
            Ok(ScriptCommand::DataLast(crate::Payload::EMPTY))
        );
    }

    #[test]
    fn mem_rendering() {
        let mut script = Script::new();
        script.read(0x10, DataWidth::Bits8, 1, false).unwrap();
        let mut image = CommandImage::new();
        image.push("probe", &script).unwrap();

        // start-clear, then data-last carrying the two header bytes 0x80 0x10
        let expected = "// probe\n@0000\n10000000000000\n22000000001080\n";
        assert_eq!(image.to_mem_string(), expected);
    }
}
