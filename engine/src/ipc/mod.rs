//! IPC module for UI communication with a running session

mod protocol;
mod server;

pub use protocol::{read_message, write_message, Notification, Request, Response, MAX_MESSAGE_LEN};
pub use server::{Server, SessionLink};
