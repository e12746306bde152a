//! # Adapters

pub mod pool_fetcher;

pub use pool_fetcher::PoolFetcher;
