//! # Requests
//!
//! Payload building, endorsement, routing and the built-in contract
//! vocabulary.

pub mod builder;
pub mod dispatcher;
pub mod system;

pub use builder::{add_endorsement, set_payer, sign_request, PayloadBuilder};
pub use dispatcher::{decode_result, Deadlines, RequestDispatcher};
