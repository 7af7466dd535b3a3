//! # pushify-broadcaster
//!
//! Real-time notification broadcaster: keeps a registry of live
//! Server-Sent Events streams and fans out notification events pushed by a
//! message bus to the streams they address.
//!
//! Delivery is best-effort. Durability lives in the notification store;
//! clients that were offline reconcile through `GET /notifications` after
//! reconnecting.
//!
//! ## Architecture
//!
//! ```text
//! Message bus (HTTP push)          Clients (SSE)
//!     │                                 │
//!     ├── BusAdapter (bus/)             ├── Stream handler (api/)
//!     │                                 │
//!     ├── EventDispatcher (dispatch/)   ├── ConnectionSession (session/)
//!     │         │                       │
//!     │         └──── ChannelRegistry (domain/) ────┘
//!     │
//!     └── NotificationStore (persistence/): PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod bus;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod session;
