//! In-progress report selections.
//!
//! A [`Draft`] always holds exactly one entry per loaded reference marker. Stored results that
//! name a marker outside the loaded set, or a genotype the marker does not offer, are dropped
//! when the draft is built.

use crate::models::{GenotypeOption, ReferenceMarker, StoredResult};
use snplab_types::{GenotypeId, MarkerId};
use std::collections::BTreeMap;

/// The user's selection for one marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftEntry {
    pub genotype_id: Option<GenotypeId>,
    pub genotype_name: Option<String>,
}

impl DraftEntry {
    pub fn is_filled(&self) -> bool {
        self.genotype_id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    entries: BTreeMap<MarkerId, DraftEntry>,
}

impl Draft {
    /// One empty entry per marker.
    pub fn empty_for(markers: &[ReferenceMarker]) -> Self {
        Self {
            entries: markers
                .iter()
                .map(|m| (m.id, DraftEntry::default()))
                .collect(),
        }
    }

    /// Entries pre-filled from a stored report.
    ///
    /// # Returns
    ///
    /// The draft and the number of stored results that were discarded as stale.
    pub fn from_stored(markers: &[ReferenceMarker], results: &[StoredResult]) -> (Self, usize) {
        let mut draft = Self::empty_for(markers);
        let mut dropped = 0;

        for result in results {
            let option = markers
                .iter()
                .find(|m| m.id == result.reference_snp_id)
                .and_then(|m| m.option(result.genotype_id));
            match option {
                Some(option) => {
                    if let Some(entry) = draft.entries.get_mut(&result.reference_snp_id) {
                        entry.genotype_id = Some(option.id);
                        entry.genotype_name = Some(option.name.clone());
                    }
                }
                None => {
                    tracing::debug!(
                        "dropping stale stored result marker={} genotype={}",
                        result.reference_snp_id,
                        result.genotype_id
                    );
                    dropped += 1;
                }
            }
        }

        (draft, dropped)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, marker: MarkerId) -> Option<&DraftEntry> {
        self.entries.get(&marker)
    }

    pub fn entries(&self) -> impl Iterator<Item = (MarkerId, &DraftEntry)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    pub fn contains(&self, marker: MarkerId) -> bool {
        self.entries.contains_key(&marker)
    }

    /// Record `option` for `marker`. Returns `false` when the marker is not in the draft.
    pub fn set(&mut self, marker: MarkerId, option: &GenotypeOption) -> bool {
        match self.entries.get_mut(&marker) {
            Some(entry) => {
                entry.genotype_id = Some(option.id);
                entry.genotype_name = Some(option.name.clone());
                true
            }
            None => false,
        }
    }

    /// Return `marker`'s entry to empty. Returns `false` when the marker is not in the draft.
    pub fn unset(&mut self, marker: MarkerId) -> bool {
        match self.entries.get_mut(&marker) {
            Some(entry) => {
                *entry = DraftEntry::default();
                true
            }
            None => false,
        }
    }

    /// Markers that still have no genotype, in id order.
    pub fn missing(&self) -> Vec<MarkerId> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_filled())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.values().all(DraftEntry::is_filled)
    }

    /// Only the filled entries, as sent to the backend.
    pub fn selections(&self) -> BTreeMap<MarkerId, GenotypeId> {
        self.entries
            .iter()
            .filter_map(|(id, e)| e.genotype_id.map(|g| (*id, g)))
            .collect()
    }

    /// Empty every entry, keeping one key per marker.
    pub fn clear(&mut self) {
        for entry in self.entries.values_mut() {
            *entry = DraftEntry::default();
        }
    }
}
