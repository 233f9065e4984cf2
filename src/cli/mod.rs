//! CLI module for doubtq - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
