// src/commands/mod.rs
//! Command handlers for the ralph CLI

mod packages;
mod project;
mod query;
mod sources;

pub use packages::{cmd_check, cmd_install, cmd_remove};
pub use project::{cmd_new, cmd_verify};
pub use query::{cmd_info, cmd_search};
pub use sources::{
    cmd_sources_add, cmd_sources_list, cmd_sources_remove, cmd_sources_show, cmd_sources_update,
};
