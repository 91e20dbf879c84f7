//! Per-marker interpretation cache with sequence-tagged requests.
//!
//! Every request for a marker's interpretation is issued through [`InterpretationCache::begin`],
//! which hands out a [`PendingInterpretation`] carrying a sequence number. Replies are applied
//! with [`InterpretationCache::resolve`] or [`InterpretationCache::fail`]; a reply whose sequence
//! number is not the latest issued for its marker is discarded. Replies for different markers
//! never interfere.
//!
//! Sequence numbers come from a single counter that survives [`InterpretationCache::reset`], so
//! a reply issued before a reset can never match a request issued after it.

use snplab_types::{GenotypeId, MarkerId};
use std::collections::HashMap;

/// Cached state of one marker's interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Interpretation {
    #[default]
    Absent,
    Loading,
    Resolved(String),
}

impl Interpretation {
    pub fn text(&self) -> Option<&str> {
        match self {
            Interpretation::Resolved(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Interpretation::Loading)
    }
}

/// Ticket for one in-flight interpretation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInterpretation {
    marker: MarkerId,
    genotype: GenotypeId,
    seq: u64,
}

impl PendingInterpretation {
    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    pub fn genotype(&self) -> GenotypeId {
        self.genotype
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What happened to a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer request for the same marker exists; the reply was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct Slot {
    state: Interpretation,
    latest: u64,
}

#[derive(Debug, Default)]
pub struct InterpretationCache {
    slots: HashMap<MarkerId, Slot>,
    next_seq: u64,
}

impl InterpretationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, marker: MarkerId) -> &Interpretation {
        const ABSENT: &Interpretation = &Interpretation::Absent;
        self.slots.get(&marker).map(|s| &s.state).unwrap_or(ABSENT)
    }

    /// Mark `marker` loading and issue a ticket that supersedes all earlier ones for it.
    pub fn begin(&mut self, marker: MarkerId, genotype: GenotypeId) -> PendingInterpretation {
        let seq = self.bump();
        let slot = self.slots.entry(marker).or_default();
        slot.latest = seq;
        slot.state = Interpretation::Loading;
        PendingInterpretation {
            marker,
            genotype,
            seq,
        }
    }

    /// Store `text` if `ticket` is still the latest request for its marker.
    pub fn resolve(&mut self, ticket: PendingInterpretation, text: String) -> ApplyOutcome {
        match self.current_slot(ticket) {
            Some(slot) => {
                slot.state = Interpretation::Resolved(text);
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Superseded,
        }
    }

    /// Return the marker to absent if `ticket` is still the latest request for it.
    pub fn fail(&mut self, ticket: PendingInterpretation) -> ApplyOutcome {
        match self.current_slot(ticket) {
            Some(slot) => {
                slot.state = Interpretation::Absent;
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Superseded,
        }
    }

    /// Drop `marker`'s state and orphan any request in flight for it.
    pub fn invalidate(&mut self, marker: MarkerId) {
        let seq = self.bump();
        let slot = self.slots.entry(marker).or_default();
        slot.latest = seq;
        slot.state = Interpretation::Absent;
    }

    /// Forget every marker. In-flight tickets become stale.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    pub fn is_current(&self, ticket: PendingInterpretation) -> bool {
        self.slots
            .get(&ticket.marker)
            .is_some_and(|s| s.latest == ticket.seq)
    }

    fn current_slot(&mut self, ticket: PendingInterpretation) -> Option<&mut Slot> {
        self.slots
            .get_mut(&ticket.marker)
            .filter(|s| s.latest == ticket.seq)
    }

    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
