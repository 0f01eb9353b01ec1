//! Pure list transforms behind the controller: filter, then sort, then page.

use std::cmp::Ordering;

use super::view_state::{SortDirection, ViewState};
use crate::models::Entity;

/// Items with at least one searchable field containing `term`, case-insensitively.
/// The term is matched as given, whitespace included; only an empty term matches everything.
pub fn filter_items<'a, T: Entity>(items: &'a [T], term: &str) -> Vec<&'a T> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable sort: equal keys keep their incoming relative order in both directions
pub fn sort_items<T: Entity>(items: &mut [&T], key: &str, direction: SortDirection) {
    // Decorate once so sort values are not rebuilt per comparison
    let mut keyed: Vec<_> = items.iter().map(|item| (item.sort_value(key), *item)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare(a, b, direction));
    for (slot, (_, item)) in items.iter_mut().zip(keyed) {
        *slot = item;
    }
}

fn compare<V: Ord>(a: &V, b: &V, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => a.cmp(b),
        SortDirection::Desc => b.cmp(a),
    }
}

/// `items[index*size .. index*size+size]`, clipped; out of range yields an empty slice
pub fn page_items<T>(items: &[T], index: usize, size: usize) -> &[T] {
    let size = size.max(1);
    let start = index.saturating_mul(size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(size).min(items.len());
    &items[start..end]
}

/// Number of pages needed for `len` items; zero items still make one (empty) page
pub fn page_count(len: usize, size: usize) -> usize {
    let size = size.max(1);
    len.div_ceil(size).max(1)
}

/// Full pipeline for a view state: filtered and sorted, not yet paged
pub fn arrange<'a, T: Entity>(items: &'a [T], view: &ViewState) -> Vec<&'a T> {
    let mut out = filter_items(items, &view.search_term);
    sort_items(&mut out, &view.sort_key, view.sort_direction);
    out
}
