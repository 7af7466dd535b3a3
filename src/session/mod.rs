//! Streaming sessions: one per open client connection.

pub mod connection;
pub mod stream;

pub use connection::{CloseReason, ConnectionSession, SessionState};
pub use stream::SessionStream;
