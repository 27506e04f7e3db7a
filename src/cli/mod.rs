//! CLI module for slotbook - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
