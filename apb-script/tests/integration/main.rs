mod cli;
mod exec;
