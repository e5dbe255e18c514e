//! CLI module for slotgrab - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
