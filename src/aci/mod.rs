//! ACI-specific conventions shared by the container and compose services.

pub mod naming;

pub use naming::{container_id, group_and_container_name, verify_single_container_name};
