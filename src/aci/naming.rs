//! Container id codec
//!
//! ACI schedules containers inside container groups; the CLI exposes a flat
//! container id instead. A compose service maps to `<group>_<container>`, a
//! single `run` container to a group of one whose id is the bare group name.

use anyhow::Result;

pub const COMPOSE_CONTAINER_SEPARATOR: char = '_';

/// Flat container id for a (group, container) pair.
pub fn container_id(group_name: &str, container_name: &str, single_container_group: bool) -> String {
    if single_container_group {
        group_name.to_string()
    } else {
        format!(
            "{}{}{}",
            group_name, COMPOSE_CONTAINER_SEPARATOR, container_name
        )
    }
}

/// Split a flat container id back into (group name, container name).
///
/// The container name is the segment after the last separator; everything
/// before it is the group name, so project names containing underscores
/// survive the round trip. An id without a separator denotes a
/// single-container group where both names are the id itself.
pub fn group_and_container_name(container_id: &str) -> (String, String) {
    match container_id.rfind(COMPOSE_CONTAINER_SEPARATOR) {
        Some(idx) => (
            container_id[..idx].to_string(),
            container_id[idx + 1..].to_string(),
        ),
        None => (container_id.to_string(), container_id.to_string()),
    }
}

/// A single-container name is used verbatim as the group name, so it may not
/// contain the compose separator.
pub fn verify_single_container_name(name: &str) -> Result<()> {
    if name.contains(COMPOSE_CONTAINER_SEPARATOR) {
        anyhow::bail!(
            "invalid container name. ACI container name cannot include {:?}",
            COMPOSE_CONTAINER_SEPARATOR.to_string()
        );
    }
    Ok(())
}
