mod assemble;
mod data;
mod run;

pub use assemble::AssembleCmd;
pub use run::RunCmd;
