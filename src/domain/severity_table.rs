//! Severity table. Immutable condition -> tier mapping, built once at startup.

use super::entities::{SeverityEntry, SeverityTier, normalize_condition};
use std::collections::HashMap;
use tracing::warn;

/// Safety-net mapping used when the tabular source cannot be loaded.
const FALLBACK_ENTRIES: &[(&str, SeverityTier)] = &[
    ("cellulitis", SeverityTier::High),
    ("chickenpox", SeverityTier::High),
    ("shingles", SeverityTier::High),
    ("ringworm", SeverityTier::Medium),
    ("athlete foot", SeverityTier::Medium),
    ("nail fungus", SeverityTier::Medium),
    ("dry scalp", SeverityTier::Low),
    ("skin dryness", SeverityTier::Low),
    ("acne", SeverityTier::Low),
];

/// Read-only condition -> tier lookup.
#[derive(Debug, Clone, Default)]
pub struct SeverityTable {
    entries: HashMap<String, SeverityTier>,
}

impl SeverityTable {
    /// Build from entries. Later duplicates overwrite earlier ones; each overwrite is logged.
    pub fn from_entries(entries: impl IntoIterator<Item = SeverityEntry>) -> Self {
        let mut map = HashMap::new();
        for entry in entries {
            if let Some(previous) = map.insert(entry.condition.clone(), entry.tier) {
                if previous != entry.tier {
                    warn!(
                        condition = %entry.condition,
                        previous = %previous,
                        current = %entry.tier,
                        "duplicate severity entry, keeping the later row"
                    );
                } else {
                    warn!(condition = %entry.condition, "duplicate severity entry");
                }
            }
        }
        Self { entries: map }
    }

    /// The hardcoded safety-net table.
    pub fn fallback() -> Self {
        Self::from_entries(
            FALLBACK_ENTRIES
                .iter()
                .map(|(condition, tier)| SeverityEntry::new(condition, *tier)),
        )
    }

    /// Tier for a condition name. Unmatched names are `Unknown`, not an error.
    pub fn lookup(&self, condition: &str) -> SeverityTier {
        self.entries
            .get(&normalize_condition(condition))
            .copied()
            .unwrap_or(SeverityTier::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
