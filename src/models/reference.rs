use super::{Entity, EntityId};

/// Shown wherever a foreign reference does not resolve
pub const PLACEHOLDER: &str = "N/A";

/// Label of the referenced record, or the placeholder when the id is absent or unknown
pub fn resolve_reference<T, F>(items: &[T], id: Option<EntityId>, label: F) -> String
where
    T: Entity,
    F: Fn(&T) -> String,
{
    id.and_then(|id| items.iter().find(|item| item.id() == id))
        .map(label)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Display helper for optional embedded labels
pub fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|s| !s.trim().is_empty()).unwrap_or(PLACEHOLDER)
}
