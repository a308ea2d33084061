//! Terminal presentation: setup, drawing and the message log.
pub mod messages;
pub mod terminal;
pub mod ui;

pub use messages::MessageLog;
