//! Persisted catalog of comic units and their pages.
//!
//! The catalog is derived state: the library folders are the source of
//! truth, and a full sync rebuilds it from scratch if the database is lost.
//! The only data that can't be rebuilt is what the reader records about
//! themselves (favorites, view counts, bookmarks, last opened), which is why
//! an upsert never touches those columns.
//!
//! # Architecture
//! - **Comics**: one row per unit, unique by absolute `path`.
//! - **Pages**: one row per page, unique by `(comic_id, page_number)` and
//!   deleted together with their comic.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{ComicUnit, NewComic, NewPage, PageDescriptor, SourceKind};
pub use crate::repo::Repository;
