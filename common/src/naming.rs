//! Keeps customer names unique per measurement date by appending
//! `" Size N"` instead of rejecting the save.
//!
//! The lookup and the following write are separate statements, so two
//! concurrent saves can still pick the same suffix. The store's unique index
//! catches that and the service retries once.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{error::StoreError, store::CustomerStore};

const SIZE_MARKER: &str = " Size ";

/// `"Rajesh Size 2"` → `"Rajesh"`; names without the marker are returned whole.
pub fn base_name(name: &str) -> &str {
    name.split_once(SIZE_MARKER)
        .map_or(name, |(base, _)| base)
}

/// `"Rajesh Size 2"` → `"Rajesh"`, but only when the marker ends the name
/// with a number. `"Ravi Size Large"` is left whole.
pub fn strip_size_suffix(name: &str) -> &str {
    match name.rsplit_once(SIZE_MARKER) {
        Some((base, digits)) if is_suffix_number(digits) => base,
        _ => name,
    }
}

fn is_suffix_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Picks the final name given the names already saved on the same date
/// whose prefix matches the base name.
pub fn resolve_name(proposed: &str, candidates: &[String]) -> String {
    let wanted = proposed.to_lowercase();
    if !candidates.iter().any(|name| name.to_lowercase() == wanted) {
        return proposed.to_string();
    }

    let base = base_name(proposed);
    let taken: BTreeSet<u64> = candidates
        .iter()
        .filter_map(|name| size_suffix(name, base))
        .collect();

    // Once the highest size is u64::MAX, the lowest free one from 2 is used.
    let next = taken
        .last()
        .map_or(Some(2), |&highest| highest.max(1).checked_add(1))
        .unwrap_or_else(|| (2..).find(|n| !taken.contains(n)).unwrap_or(2));

    format!("{}{}{}", base, SIZE_MARKER, next)
}

/// The `N` of `"<base> Size <N>"`, compared case-insensitively.
fn size_suffix(name: &str, base: &str) -> Option<u64> {
    let name = name.to_lowercase();
    let marker = SIZE_MARKER.to_lowercase();
    let rest = name
        .strip_prefix(&base.to_lowercase())?
        .strip_prefix(marker.as_str())?;
    if !is_suffix_number(rest) {
        return None;
    }
    rest.parse().ok()
}

/// Looks up same-date candidates and resolves `proposed` against them.
/// `exclude` is the record being updated, so it never collides with itself.
pub async fn resolve_unique_name<S: CustomerStore>(
    store: &S,
    proposed: &str,
    date: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<String, StoreError> {
    let candidates = store
        .name_candidates(base_name(proposed), date, exclude)
        .await?;
    Ok(resolve_name(proposed, &candidates))
}
