use crate::error::Result;
use crate::sequence_processor::core::SequenceRecord;

/// One independent summary inside the accumulator. Records reaching a
/// collector have already been validated, so observing one cannot fail.
pub trait StatsCollector: Send + Clone + 'static {
    /// Fold one record into the summary.
    fn process_record(&mut self, record: &SequenceRecord);

    /// Merge statistics from another collector of the same type. Fails only
    /// when the two were configured differently.
    fn merge_with(&mut self, other: &Self) -> Result<()>;
}

/// `num / den`, or 0 when nothing was counted.
pub(crate) fn fraction(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
