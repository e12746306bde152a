//! # Adapters
//!
//! - `grpc`: tonic implementation of the channel ports
//! - `tls`: trust-root and client-identity loading

pub mod grpc;
pub mod tls;

pub use grpc::{map_status, GrpcChannel, GrpcConnector, SEND_REQUEST_PATH, SUBSCRIBE_PATH};
pub use tls::{client_tls_config, load_trust_roots, ClientIdentity};
