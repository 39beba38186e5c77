//! One module per `credstore` subcommand.

pub mod clear;
pub mod completions;
pub mod delete_storage;
pub mod get;
pub mod list;
pub mod remove;
pub mod rotate;
pub mod set;
pub mod status;
pub mod version;
