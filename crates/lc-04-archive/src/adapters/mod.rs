//! # Adapters
//!
//! - `iterator`: node-backed `BlockIterator`
//! - `grpc`: archive service, streaming and single-write
//! - `http`: archive service gateway, read-only
//! - `sql`: MySQL and in-memory stores
//! - `any`: the backend enum the session holds

pub mod any;
pub mod grpc;
pub mod http;
pub mod iterator;
pub mod sql;

pub use any::AnyArchiveBackend;
pub use grpc::GrpcArchiveBackend;
pub use http::HttpArchiveBackend;
pub use iterator::NodeBlockIterator;
pub use sql::{ArchiveTable, BlockRow, MemoryArchiveTable, MySqlArchiveTable, SqlArchiveBackend};
