//! Session management: the controller, its events, and builtin commands.

pub mod command;
pub mod controller;
pub mod event;

pub use command::{BuiltinCommand, ParsedInput, builtin_commands, parse_input};
pub use controller::{SendOutcome, SessionController};
pub use event::SessionEvent;
