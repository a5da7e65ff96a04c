//! # spigot-core
//!
//! Chain-agnostic core for spigot: client configuration and the session
//! phase machine.

pub mod config;
pub mod phase;
