//! Filesystem module.
//!
//! Provides:
//! - Year-bucketed document directories
//! - Filename sanitization and collision avoidance

pub mod naming;
pub mod paths;

pub use naming::{
    document_filename, make_unique_filename, make_unique_filename_by, numbered_filename,
    sanitize_title,
};
pub use paths::{document_dir, ensure_dir, year_folder};
