//! # Application Layer

pub mod pipeline;

pub use pipeline::ArchivePipeline;
