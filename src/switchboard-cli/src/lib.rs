//! Switchboard CLI library module.
//!
//! The `switchboard` binary is a terminal stand-in for an in-app debug
//! screen: it loads configurations, lists and evaluates entities, and edits
//! them through the same forms a graphical tool would use. Overrides are
//! written to the debug cache and picked up again by the next invocation.
//!
//! # Module Organization
//!
//! - `cli/` - CLI argument parsing and command dispatch
//! - `session` - Storage, config and registry wiring for one invocation
//! - `client` - Configuration client reading a JSON file
//! - `render` - Text rendering of listings and edit rows
//! - `styled_output` - Status messages on stderr

pub mod cli;
pub mod client;
pub mod render;
pub mod session;
pub mod styled_output;
