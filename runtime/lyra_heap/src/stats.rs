//! Heap statistics.

/// Counters maintained across the heap's lifetime.
///
/// Reported in overflow diagnostics and useful for tuning the initial
/// capacity of an embedding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Collections run so far.
    pub collections: u64,
    /// Slots allocated over the heap's lifetime.
    pub total_allocated: u64,
    /// Slots copied by collections over the heap's lifetime.
    pub total_copied: u64,
    /// Live slots after the most recent collection.
    pub live_slots: usize,
    /// Current region capacity in slots.
    pub capacity: usize,
}
