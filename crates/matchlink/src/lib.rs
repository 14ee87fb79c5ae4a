//! Control library for match-action table pipelines over generic netlink.
//!
//! A match-action pipeline (in a kernel module or a userspace dataplane
//! daemon) exposes its tables, headers, actions, and ports through a
//! generic netlink family. This crate speaks that protocol: it resolves
//! the family, encodes table/rule/port records into the nested attribute
//! wire format, and decodes multi-part replies back into typed records.
//!
//! # Example
//!
//! ```ignore
//! use matchlink::netlink::genl::mat::MatConnection;
//!
//! #[tokio::main]
//! async fn main() -> matchlink::Result<()> {
//!     let conn = MatConnection::resolve(0, 0).await?;
//!     let pipeline = conn.load_pipeline().await?;
//!
//!     for table in pipeline.tables() {
//!         println!("{}: {}", table.uid, table.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod netlink;

// Re-export common types at crate root for convenience
pub use netlink::{Error, Result};
