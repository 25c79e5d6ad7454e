use shared::domain::{RegistrationRecord, ViewCriteria};

/// Derive the display sequence from the canonical record list.
///
/// Type filter and free-text search compose as a logical AND. Order is
/// whatever the canonical list carries; the engine filters, it never sorts,
/// so relative order is always preserved. Changing the sort order is a data
/// source concern, not a derivation concern.
pub fn derive(records: &[RegistrationRecord], criteria: &ViewCriteria) -> Vec<RegistrationRecord> {
    let needle = criteria.search_text.to_lowercase();
    records
        .iter()
        .filter(|record| criteria.type_filter.admits(&record.registration_type))
        .filter(|record| needle.is_empty() || matches_search(record, &needle))
        .cloned()
        .collect()
}

/// Case-insensitive substring containment over name, email, and company.
/// An absent company never matches, regardless of the needle.
fn matches_search(record: &RegistrationRecord, needle: &str) -> bool {
    record.name.to_lowercase().contains(needle)
        || record.email.to_lowercase().contains(needle)
        || record
            .company
            .as_deref()
            .is_some_and(|company| company.to_lowercase().contains(needle))
}

#[cfg(test)]
#[path = "tests/derive_tests.rs"]
mod tests;
