//! CLI command implementations

pub mod output;
pub mod play;
pub mod relay;
pub mod settings;
pub mod store;
pub mod terminal;
