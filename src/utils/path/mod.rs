//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `resolve_path`, `has_extension`)

pub mod fs;

pub use fs::{has_extension, normalize_path, resolve_path};
