//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire, matching the notification
//! documents the clients already consume.

pub mod notification_dto;
pub mod stream_dto;
pub mod system_dto;

pub use notification_dto::*;
pub use stream_dto::*;
pub use system_dto::*;
