//! # webhdfs
//!
//! WebHDFS client library with multi-namenode failover and parallel bulk
//! transfers.
//!
//! The client speaks the WebHDFS REST protocol over plain blocking HTTP and
//! provides:
//!
//! - **Failover dispatch** across an ordered list of namenode endpoints,
//!   remembering the last healthy one
//! - **Typed operations** for the full metadata and data surface (status,
//!   listings, create/append/open, rename, ACLs, ...)
//! - **Bulk transfers** of files and directory trees with a configurable
//!   worker pool, staging paths, and cleanup on failure
//! - **Path conveniences**: a per-client root for relative paths and
//!   `#LATEST` markers resolving to the most recent entry
//!
//! ## Example
//!
//! ```rust,no_run
//! use webhdfs::{Client, TransferOptions};
//!
//! fn main() -> webhdfs::Result<()> {
//!     let config = webhdfs::Config::load(webhdfs::Config::locate(None)?)?;
//!     let client = Client::from_config(&config, Some("prod"))?;
//!     client.upload(
//!         "data/reports",
//!         "/ingest/reports",
//!         &TransferOptions::new().concurrency(4),
//!     )?;
//!     for entry in client.list("/ingest")? {
//!         println!("{}", entry);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod glob;
pub mod transfer;
pub mod transport;
pub mod writer;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenient access
pub use client::{
    AclStatus, Auth, Client, ClientBuilder, ContentSummary, FileChecksum, FileStatus, FileType,
};
pub use config::Config;
pub use error::{HdfsError, Result};
pub use self::glob::glob;
pub use transfer::{ProgressFn, ProgressState, TransferEvent, TransferOptions, DEFAULT_CHUNK_SIZE};
pub use writer::{RecordWriter, WriterOptions};
