//! # Session Container
//!
//! Client configuration and the session that wires the four subsystems
//! together.

pub mod config;
pub mod session;

pub use config::{AuthType, ClientConfig, ConfigError, NodeConfig, RpcClientConfig};
pub use session::{Session, SessionBuilder};
