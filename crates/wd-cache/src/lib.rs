//! Content-addressed document cache for webdoc.
//!
//! [`CacheManager`] maps a source document plus a target [`Format`] to a
//! previously converted artifact stored as `<sha1>.<ext>` directly under the
//! cache root. Keys are derived from the full document bytes, the format token
//! and a deployment secret ([`key_for`]), so entries are immutable: an entry
//! is only ever created or deleted, never updated in place.
//!
//! # Concurrency
//!
//! [`CacheManager::get_or_convert`] runs at most one conversion per key at a
//! time; concurrent callers for the same key wait for it and read the stored
//! entry. Plain [`CacheManager::get`] and [`CacheManager::set`] take no locks.
//! Writes are staged and renamed into place, so a reader never observes a
//! partially written entry.
//!
//! # Example
//!
//! ```no_run
//! use wd_cache::{CacheConfig, CacheManager};
//! use wd_document::{Document, Format};
//!
//! let cache = CacheManager::new(CacheConfig::new(".wd/cache", "secret"))?;
//! let mut source = Document::open("letter.odt", Format::Odt)?;
//!
//! match cache.get(&mut source, Format::Pdf)? {
//!     Some(hit) => println!("cached at {}", hit.path().display()),
//!     None => println!("miss"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`Format`]: wd_document::Format

mod error;
mod flight;
mod key;
mod manager;

pub use error::CacheError;
pub use key::key_for;
pub use manager::{CacheConfig, CacheManager, Converter, STAGING_DIR};
