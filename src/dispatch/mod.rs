//! Dispatch layer: recipient resolution and fan-out.

pub mod dispatcher;
pub mod resolver;

pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use resolver::RecipientResolver;
