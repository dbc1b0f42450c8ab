use std::{fs, path::PathBuf};

use apb_script::CommandImage;
use clap::Parser;
use miette::{IntoDiagnostic, Report, WrapErr};

use super::data::ScriptFile;

#[derive(Debug, Clone, Parser)]
#[command(about = "Assemble script files into a command store image")]
pub struct AssembleCmd {
    /// Paths to the script files, placed in the image in the given order
    #[arg(required = true, value_parser)]
    script_files: Vec<PathBuf>,

    /// Path to the output `.mem` file; the image is printed if omitted
    #[arg(short = 'o', long = "output", value_parser)]
    output_file: Option<PathBuf>,
}

impl AssembleCmd {
    pub fn execute(&self) -> Result<(), Report> {
        let mut image = CommandImage::new();
        for path in &self.script_files {
            let script = ScriptFile::read(path)?.script()?;
            let label = path.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
            let address = image
                .push(&label, &script)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to place `{}`", path.display()))?;
            tracing::debug!(%label, address, words = script.to_commands().len(), "placed script");
        }

        let mem = image.to_mem_string();
        match &self.output_file {
            Some(path) => {
                fs::write(path, mem).into_diagnostic().wrap_err_with(|| {
                    format!("Failed to write image to `{}`", path.display())
                })?;
                println!(
                    "Assembled {} scripts ({} words) into {}",
                    self.script_files.len(),
                    image.words().len(),
                    path.display()
                );
            },
            None => print!("{mem}"),
        }
        Ok(())
    }
}
