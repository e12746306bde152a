//! # Ledger Client
//!
//! The session applications link against to talk to a permissioned chain.
//!
//! ## Subsystems
//!
//! | ID | Crate | Role in the session |
//! |----|-------|---------------------|
//! | 1 | `lc-01-connection-pool` | every node call |
//! | 2 | `lc-02-tx-dispatcher` | synchronous invoke results (`enableTxResultDispatcher`) |
//! | 3 | `lc-03-canonical-query` | majority reads (`enableSyncCanonicalTxResult`) |
//! | 4 | `lc-04-archive` | archive / restore and archived reads |
//!
//! ## Usage
//!
//! ```no_run
//! use ledger_client::{ClientConfig, Session};
//!
//! # async fn run() -> Result<(), ledger_client::ClientError> {
//! let config = ClientConfig::from_yaml_file("./client.yml")?;
//! ledger_client::logging::init(&config.log).ok();
//! let session = Session::connect(config).await?;
//! let height = session.get_current_block_height().await?;
//! println!("chain at {}", height);
//! session.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! ledger-client/
//! ├── container/       # ClientConfig, Session, SessionBuilder
//! ├── request/         # payload builder, request dispatcher, system contracts
//! ├── adapters/        # pool-backed BlockSource / ArchiveNode, MockLedger
//! ├── identity.rs      # signer and TLS identity from config
//! ├── errors.rs        # ClientError
//! └── logging.rs       # tracing subscriber bootstrap
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod container;
pub mod errors;
pub mod identity;
pub mod logging;
pub mod request;

// Re-exports
pub use adapters::{MockLedger, MockNetwork, PoolArchiveNode, PoolBlockSource};
pub use container::{
    AuthType, ClientConfig, ConfigError, NodeConfig, RpcClientConfig, Session, SessionBuilder,
};
pub use errors::ClientError;
pub use identity::{build_signer, tls_identity};
pub use logging::{LogConfig, LoggingError};
pub use request::{
    add_endorsement, decode_result, set_payer, sign_request, Deadlines, PayloadBuilder,
    RequestDispatcher,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
