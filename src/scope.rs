use crate::models::{AccessScope, ConsultationRecord};

/// Narrows the record universe to what the scope may see.
///
/// A restricted scope with no units sees nothing.
pub fn select<'a>(
    records: &'a [ConsultationRecord],
    scope: &AccessScope,
) -> Vec<&'a ConsultationRecord> {
    match scope {
        AccessScope::FullAccess => records.iter().collect(),
        AccessScope::RestrictedToUnits(units) => {
            if units.is_empty() {
                return Vec::new();
            }
            records
                .iter()
                .filter(|record| record.unit_ids.iter().any(|id| units.contains(id)))
                .collect()
        }
    }
}
