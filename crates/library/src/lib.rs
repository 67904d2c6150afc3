//! The comic library engine.
//!
//! - [`scan`] finds comic units under a library root and lists their pages.
//! - [`thumbnail`] keeps the on-disk thumbnail cache.
//! - [`sync`] reconciles the catalog with what is on disk.
//! - [`resolve`] turns a catalogued page into something a viewer can show.
//!
//! All of them work through a shared [`Context`].

mod context;
pub mod error;
mod progress;
pub mod resolve;
mod root;
pub mod scan;
pub mod sync;
#[cfg(test)]
mod testing;
pub mod thumbnail;

pub use crate::context::Context;
pub use crate::progress::{Observer, ScanError, ScanProgress, SyncProgress, SyncStatus};
pub use crate::resolve::{Resolved, Resolver, ResolverSettings, Variant};
pub use crate::root::{Root, roots_from_config};
pub use crate::sync::{RootReport, SyncReport, Synchronizer};
pub use crate::thumbnail::{ThumbnailCache, ThumbnailSettings};
