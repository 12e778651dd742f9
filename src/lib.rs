//! `repoledger` command-line front end for the shared repository ledger.

pub mod config;
pub mod ledger_cli;

pub use config::Config;
