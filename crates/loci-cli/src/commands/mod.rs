//! Subcommand implementations.

pub mod cat;
pub mod match_cmd;
pub mod resolve;
pub mod root;
pub mod status;
