use super::pair::ReadPair;
use super::sequence::SequenceRecord;
use crate::error::Result;

/// Something that consumes records one at a time and can be split across
/// workers and folded back together.
pub trait SequenceProcessor: Send + Clone + 'static {
    fn process_record(&mut self, record: &SequenceRecord) -> Result<()>;

    fn process_pair(&mut self, pair: &ReadPair) -> Result<()> {
        if let Some(left) = pair.left() {
            self.process_record(left)?;
        }
        if let Some(right) = pair.right() {
            self.process_record(right)?;
        }
        Ok(())
    }

    fn get_min_length(&self) -> usize;

    /// An empty processor with the same configuration, used to seed workers.
    fn fork(&self) -> Self;

    fn supports_parallel(&self) -> bool {
        false
    }

    fn merge_processor(&mut self, other: &Self) -> Result<()>;
}
