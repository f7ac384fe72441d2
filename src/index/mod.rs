//! Persisted index of downloaded documents.
//!
//! Provides:
//! - Index rows and record keys
//! - CSV load/save and last-write-wins merging
//! - SHA-256 content hashing

pub mod hash;
pub mod record;
pub mod store;

pub use hash::sha256_file;
pub use record::{record_key, DownloadRecord};
pub use store::{load_index, merge_records, save_index, IndexStore};
