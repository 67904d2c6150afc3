//! Storage access for the comic library.
//!
//! Everything the engine knows about the filesystem goes through a
//! [`StorageBackend`]: listing the immediate children of a directory, reading
//! and writing whole files, and reading modification times. On top of that the
//! [`archive`] module reads image entries out of ZIP-based comic containers,
//! and [`media`] decides which file names count as pages, documents or
//! archives.

pub mod archive;
pub mod backend;
pub mod error;
pub mod media;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::{DirEntry, EntryKind, FileInfo};
pub use crate::path::{is_sub_path, to_slash, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
