//! Finding comic units under a library root and listing their pages.
//!
//! [`walk`] streams every candidate unit beneath a root, along with an error
//! for every directory it couldn't read; [`discover`] collects the same into
//! vectors. [`list_pages`] turns one candidate into its ordered page list.

pub mod error;
mod pages;
mod walk;

pub use self::pages::list_pages;
pub use self::walk::{Candidate, Discovery, discover, walk};
