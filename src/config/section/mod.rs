//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hswatch.toml`:
//!
//! | Module    | TOML Section                       | Purpose                        |
//! |-----------|------------------------------------|--------------------------------|
//! | `build`   | `[build]`                          | Build tool invocation          |
//! | `editor`  | `[editor]`                         | Open files, re-analysis hook   |
//! | `package` | `[[package]]`, `[[package.component]]` | Project model              |
//! | `session` | `[[session]]`                      | Interactive sessions           |
//! | `watch`   | `[watch]`                          | Debounce window, extensions    |

mod build;
mod editor;
mod package;
mod session;
mod watch;

pub use build::BuildConfig;
pub use editor::{EditorConfig, FILE_PLACEHOLDER};
pub use package::PackageConfig;
pub use session::SessionConfig;
pub use watch::WatchConfig;
