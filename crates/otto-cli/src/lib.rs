//! Otto CLI library.
//!
//! Thin clap wiring over `otto-runtime`: every subcommand opens the store
//! named by the resolved [`RuntimeConfig`](otto_runtime::RuntimeConfig) and
//! calls one runtime operation.

pub mod cli;
pub mod commands;
