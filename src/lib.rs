//! # mcset
//! A dynamic server set for distributed key-value cache clients.
//!
//! This is a convenience package which includes the sub-projects of mcset:
//!
//! ### Features
//! - `mcset_ring` - A deterministic consistent hash ring over opaque member identifiers.
//! - `mcset_servers` - The `ServerSet`, kept in sync with an external `Watcher` by a background task.
//!
//! ## Basic Example
//!
//! ```rust
//! use mcset::servers::{ChannelWatcher, ServerSet, Watcher};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let watcher = ChannelWatcher::new(["127.0.0.1:11211", "127.0.0.1:11212"]);
//!     let servers = ServerSet::with_watcher(watcher.clone());
//!
//!     let addr = servers.pick_server("user:42")?;
//!     println!("user:42 lives on {addr}");
//!
//!     watcher.close();
//!     Ok(())
//! }
//! ```

#[cfg(feature = "mcset-ring")]
pub use mcset_ring as ring;
#[cfg(feature = "mcset-servers")]
pub use mcset_servers as servers;
