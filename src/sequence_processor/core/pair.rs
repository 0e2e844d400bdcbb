use super::sequence::{SequenceRecord, Strand, MAX_PHRED};
use serde::{Deserialize, Serialize};

/// Shortest mate overlap accepted by [`ReadPair::merge`].
const MIN_MERGE_OVERLAP: usize = 30;
const HIGH_QUAL: u8 = 30;
const LOW_QUAL: u8 = 15;
const MAX_LOW_QUAL_DIFFS: usize = 3;

/// Mate 1 / mate 2 of a fragment. Either side may be absent, which is how
/// single-end data flows through the same code paths.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadPair {
    left: Option<SequenceRecord>,
    right: Option<SequenceRecord>,
}

impl ReadPair {
    pub fn new(left: Option<SequenceRecord>, right: Option<SequenceRecord>) -> Self {
        Self { left, right }
    }

    pub fn paired(left: SequenceRecord, right: SequenceRecord) -> Self {
        Self::new(Some(left), Some(right))
    }

    pub fn single(record: SequenceRecord) -> Self {
        Self::new(Some(record), None)
    }

    pub fn left(&self) -> Option<&SequenceRecord> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&SequenceRecord> {
        self.right.as_ref()
    }

    pub fn is_paired(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn replace_left(&mut self, record: Option<SequenceRecord>) -> Option<SequenceRecord> {
        std::mem::replace(&mut self.left, record)
    }

    pub fn replace_right(&mut self, record: Option<SequenceRecord>) -> Option<SequenceRecord> {
        std::mem::replace(&mut self.right, record)
    }

    pub fn into_parts(self) -> (Option<SequenceRecord>, Option<SequenceRecord>) {
        (self.left, self.right)
    }

    /// Merge overlapping mates into a single forward-strand record.
    ///
    /// The right mate is reverse-complemented and its prefix is aligned against
    /// the left mate's suffix, starting from the shortest allowed overlap. A
    /// mismatch between a >=Q30 and a <=Q15 base is treated as a sequencing
    /// error; any other mismatch, or a third error, rejects that overlap length.
    /// Returns `None` when no overlap is found or a side is missing.
    pub fn merge(&self) -> Option<SequenceRecord> {
        let left = self.left.as_ref()?;
        let rc_right = self.right.as_ref()?.reverse_complement();

        let (seq_l, qual_l) = (left.bases(), left.quality());
        let (seq_r, qual_r) = (rc_right.bases(), rc_right.quality());
        let max_overlap = seq_l.len().min(seq_r.len());

        let (overlap, diff) = (MIN_MERGE_OVERLAP..=max_overlap).find_map(|olen| {
            let offset = seq_l.len() - olen;
            let mut diff = 0;
            let mut low_qual_diff = 0;
            for i in 0..olen {
                if seq_l[offset + i] == seq_r[i] {
                    continue;
                }
                diff += 1;
                if is_error_pair(qual_l[offset + i], qual_r[i]) {
                    low_qual_diff += 1;
                }
                if diff > low_qual_diff || low_qual_diff >= MAX_LOW_QUAL_DIFFS {
                    return None;
                }
            }
            Some((olen, diff))
        })?;

        let offset = seq_l.len() - overlap;
        let mut bases = seq_l[..offset].to_vec();
        bases.extend_from_slice(seq_r);
        let mut quality = qual_l[..offset].to_vec();
        quality.extend_from_slice(qual_r);

        for i in 0..overlap {
            let (bl, ql) = (seq_l[offset + i], qual_l[offset + i]);
            let (br, qr) = (seq_r[i], qual_r[i]);
            if bl != br {
                if ql >= HIGH_QUAL && qr <= LOW_QUAL {
                    bases[offset + i] = bl;
                    quality[offset + i] = ql;
                }
            } else {
                quality[offset + i] = ql.saturating_add(qr).min(MAX_PHRED);
            }
        }

        let name = format!(
            "{} merged offset: {} overlap: {} diff: {}",
            left.name(),
            offset,
            overlap,
            diff
        );
        SequenceRecord::new(name, bases, Strand::Forward, quality).ok()
    }
}

fn is_error_pair(q1: u8, q2: u8) -> bool {
    (q1 >= HIGH_QUAL && q2 <= LOW_QUAL) || (q1 <= LOW_QUAL && q2 >= HIGH_QUAL)
}
