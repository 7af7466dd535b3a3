//! Bus adapter: inbound envelope decoding and acknowledgment.

pub mod adapter;

pub use adapter::{BusAdapter, DecodeError, PushAck, PushEnvelope, PushMessage};
