//! # spigot-app
//!
//! The session controller: composes provider detection, artifact binding,
//! chain reads, and faucet mutations into observable state and
//! user-triggerable actions.

pub mod session;
pub mod view;

pub use session::{deposit_amount, withdraw_amount, AppCommand, Session, SessionController, SessionError};
pub use view::{AppView, ChainView};
