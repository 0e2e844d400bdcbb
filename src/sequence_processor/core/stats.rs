/// Counts kept by the reading loop, separate from the QC statistics themselves.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub too_short: u64,
    pub cancelled: bool,
}

impl ProcessingStats {
    pub fn absorb(&mut self, other: &ProcessingStats) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.too_short += other.too_short;
        self.cancelled |= other.cancelled;
    }
}
