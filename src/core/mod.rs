//! Core types - pure abstractions shared across the codebase.

mod component;
mod state;

pub use component::{
    ComponentInfo, ProjectId, StanzaType, TargetSet, default_target, display_targets,
};
pub use state::{is_shutdown, register_shutdown, setup_shutdown_handler};
