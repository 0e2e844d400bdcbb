use crate::sequence_processor::core::*;
use anyhow::{bail, Context, Result};
use bio::io::fastq;
use log::{debug, warn};
use niffler::get_reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const READ_BUFFER: usize = 16 * 1024 * 1024;

type FastqRecords = fastq::Records<BufReader<Box<dyn Read>>>;

/// Single-end FASTQ input; gzip, bzip2 and xz are detected from the stream.
pub struct FastqReader {
    path: PathBuf,
    records: FastqRecords,
    phred64: bool,
    skipped: u64,
}

impl FastqReader {
    pub fn new(path: &Path, phred64: bool) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open FASTQ file {}", path.display()))?;
        let (inner_reader, compression) = get_reader(Box::new(file))
            .with_context(|| format!("Failed to detect compression of {}", path.display()))?;
        debug!("Reading {} ({:?})", path.display(), compression);

        let buffered = BufReader::with_capacity(READ_BUFFER, inner_reader);
        Ok(Self {
            path: path.to_path_buf(),
            records: fastq::Reader::from_bufread(buffered).records(),
            phred64,
            skipped: 0,
        })
    }

    fn next_raw(&mut self) -> Result<Option<fastq::Record>> {
        match self.records.next() {
            None => Ok(None),
            Some(record) => record
                .map(Some)
                .with_context(|| format!("Malformed FASTQ in {}", self.path.display())),
        }
    }

    fn convert(&self, raw: &fastq::Record) -> crate::error::Result<SequenceRecord> {
        let name = match raw.desc() {
            Some(desc) => format!("{} {}", raw.id(), desc),
            None => raw.id().to_string(),
        };
        SequenceRecord::from_raw(name, raw.seq(), Strand::Forward, raw.qual(), self.phred64)
    }

    /// Next well-formed record. Records whose quality line cannot be used
    /// are logged and counted in [`SequenceReader::skipped`].
    pub fn next_record(&mut self) -> Result<Option<SequenceRecord>> {
        while let Some(raw) = self.next_raw()? {
            match self.convert(&raw) {
                Ok(record) => return Ok(Some(record)),
                Err(e) => {
                    warn!("Skipping record {}: {}", raw.id(), e);
                    self.skipped += 1;
                }
            }
        }
        Ok(None)
    }
}

impl SequenceReader for FastqReader {
    fn next_pair(&mut self) -> Result<Option<ReadPair>> {
        Ok(self.next_record()?.map(ReadPair::single))
    }

    fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// Two mate files read in lockstep.
pub struct FastqPairReader {
    left: FastqReader,
    right: FastqReader,
    skipped: u64,
}

impl FastqPairReader {
    pub fn new(left: &Path, right: &Path, phred64: bool) -> Result<Self> {
        Ok(Self {
            left: FastqReader::new(left, phred64)?,
            right: FastqReader::new(right, phred64)?,
            skipped: 0,
        })
    }
}

impl SequenceReader for FastqPairReader {
    /// Mates are converted together so that dropping a bad record never
    /// shifts one file against the other.
    fn next_pair(&mut self) -> Result<Option<ReadPair>> {
        loop {
            let (raw_left, raw_right) = match (self.left.next_raw()?, self.right.next_raw()?) {
                (None, None) => return Ok(None),
                (Some(l), Some(r)) => (l, r),
                (Some(_), None) => bail!(
                    "Paired files are out of sync: {} has more records than {}",
                    self.left.path.display(),
                    self.right.path.display()
                ),
                (None, Some(_)) => bail!(
                    "Paired files are out of sync: {} has more records than {}",
                    self.right.path.display(),
                    self.left.path.display()
                ),
            };

            match (self.left.convert(&raw_left), self.right.convert(&raw_right)) {
                (Ok(left), Ok(right)) => return Ok(Some(ReadPair::paired(left, right))),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Skipping pair {}: {}", raw_left.id(), e);
                    self.skipped += 1;
                }
            }
        }
    }

    fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fastq_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_records_with_description() {
        let file = fastq_file("@r1 1:N:0:ACGT\nacgt\n+\nIIII\n@r2\nTTGA\n+\n!!!!\n");
        let mut reader = FastqReader::new(file.path(), false).unwrap();

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.name(), "r1 1:N:0:ACGT");
        assert_eq!(first.bases(), b"ACGT");
        assert_eq!(first.quality(), &[40, 40, 40, 40]);
        assert_eq!(first.first_index(), "ACGT");

        let pair = reader.next_pair().unwrap().unwrap();
        assert!(!pair.is_paired());
        assert_eq!(pair.left().unwrap().name(), "r2");
        assert!(reader.next_pair().unwrap().is_none());
    }

    #[test]
    fn test_bad_quality_is_skipped_and_counted() {
        let file = fastq_file("@bad\nACGT\n+\nI II\n@good\nACGT\n+\nIIII\n");
        let mut reader = FastqReader::new(file.path(), false).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.name(), "good");
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_phred64_input() {
        let file = fastq_file("@r\nAC\n+\nhh\n");
        let mut reader = FastqReader::new(file.path(), true).unwrap();
        assert_eq!(reader.next_record().unwrap().unwrap().quality(), &[40, 40]);
    }

    #[test]
    fn test_pair_reader_keeps_mates_together() {
        let left = fastq_file("@a/1\nACGT\n+\nIIII\n@b/1\nGGCC\n+\nIIII\n");
        let right = fastq_file("@a/2\nTTTT\n+\nI II\n@b/2\nAATT\n+\nIIII\n");
        let mut reader = FastqPairReader::new(left.path(), right.path(), false).unwrap();

        let pair = reader.next_pair().unwrap().unwrap();
        assert!(pair.is_paired());
        assert_eq!(pair.left().unwrap().name(), "b/1");
        assert_eq!(pair.right().unwrap().name(), "b/2");
        assert_eq!(reader.skipped(), 1);
        assert!(reader.next_pair().unwrap().is_none());
    }

    #[test]
    fn test_pair_reader_detects_out_of_sync_files() {
        let left = fastq_file("@a/1\nACGT\n+\nIIII\n@b/1\nGGCC\n+\nIIII\n");
        let right = fastq_file("@a/2\nTTTT\n+\nIIII\n");
        let mut reader = FastqPairReader::new(left.path(), right.path(), false).unwrap();
        assert!(reader.next_pair().unwrap().is_some());
        let err = reader.next_pair().unwrap_err();
        assert!(err.to_string().contains("out of sync"));
    }
}
