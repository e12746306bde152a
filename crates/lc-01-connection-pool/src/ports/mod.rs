//! # Ports
//!
//! The pool only talks to nodes through these traits; the tonic adapter and
//! the mocks both implement them.

pub mod outbound;

pub use outbound::{MockConnector, MockNodeScript, NodeChannel, NodeConnector, SubscriptionStream};
