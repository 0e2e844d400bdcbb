use fqlib_tools::export::formats::qc::report_digest;
use fqlib_tools::sequence_processor::core::SequenceReader;
use fqlib_tools::sequence_processor::readers::{FastqPairReader, FastqReader};
use fqlib_tools::sequence_processor::CancellationToken;
use fqlib_tools::{AccumulatorState, ReadPair, StatsAccumulator, StatsParams};
use indicatif::ProgressBar;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FRAGMENT_LEN: usize = 80;
const READ_LEN: usize = 60;

fn complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            other => other,
        })
        .collect()
}

fn fragment(i: usize) -> Vec<u8> {
    let mut state = (i as u64 + 1).wrapping_mul(0x9E3779B97F4A7C15);
    (0..FRAGMENT_LEN)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            b"ACGT"[(state % 4) as usize]
        })
        .collect()
}

fn quality(i: usize) -> String {
    (0..READ_LEN)
        .map(|j| (b'!' + 10 + ((i * 7 + j * 3) % 31) as u8) as char)
        .collect()
}

/// Writes `count` mate pairs and returns the two file paths.
fn write_pairs(dir: &TempDir, count: usize) -> (PathBuf, PathBuf) {
    let r1 = dir.path().join("reads_R1.fastq");
    let r2 = dir.path().join("reads_R2.fastq");
    let mut f1 = std::fs::File::create(&r1).expect("create R1");
    let mut f2 = std::fs::File::create(&r2).expect("create R2");
    for i in 0..count {
        let frag = fragment(i % (count / 3 + 1));
        let mate1 = &frag[..READ_LEN];
        let mate2 = complement(&frag[FRAGMENT_LEN - READ_LEN..]);
        let qual = quality(i);
        writeln!(f1, "@pair{i} 1:N:0:ACGTACGT").expect("write R1");
        writeln!(f1, "{}\n+\n{}", String::from_utf8_lossy(mate1), qual).expect("write R1");
        writeln!(f2, "@pair{i} 2:N:0:ACGTACGT").expect("write R2");
        writeln!(f2, "{}\n+\n{}", String::from_utf8_lossy(&mate2), qual).expect("write R2");
    }
    (r1, r2)
}

fn run_single(path: &Path, threads: usize) -> StatsAccumulator {
    let mut acc = StatsAccumulator::new(StatsParams::default()).expect("valid params");
    let mut reader = FastqReader::new(path, false).expect("open FASTQ");
    let stats = reader
        .read_sequences_with_threads(&mut acc, &ProgressBar::hidden(), threads, &CancellationToken::new())
        .expect("read FASTQ");
    assert_eq!(stats.processed, acc.total_reads());
    assert!(!stats.cancelled);
    acc
}

fn run_paired(r1: &Path, r2: &Path, threads: usize) -> StatsAccumulator {
    let mut acc = StatsAccumulator::new(StatsParams::default()).expect("valid params");
    let mut reader = FastqPairReader::new(r1, r2, false).expect("open FASTQ pair");
    let stats = reader
        .read_sequences_with_threads(&mut acc, &ProgressBar::hidden(), threads, &CancellationToken::new())
        .expect("read FASTQ pair");
    assert_eq!(stats.processed, acc.total_pairs());
    acc
}

#[test]
fn threaded_single_end_run_matches_single_thread() {
    let dir = TempDir::new().expect("tempdir");
    let (r1, _) = write_pairs(&dir, 2500);

    let mut single = run_single(&r1, 1);
    let mut threaded = run_single(&r1, 4);
    let expected = single.finalize();
    let actual = threaded.finalize();

    assert_eq!(expected.total_reads, 2500);
    assert_eq!(expected.total_bases, 2500 * READ_LEN as u64);
    assert_eq!(actual, expected);
    assert_eq!(
        report_digest(&actual).expect("digest"),
        report_digest(&expected).expect("digest")
    );
}

#[test]
fn paired_run_reports_overlap_and_duplication() {
    let dir = TempDir::new().expect("tempdir");
    let (r1, r2) = write_pairs(&dir, 1500);

    let mut single = run_paired(&r1, &r2, 1);
    let mut threaded = run_paired(&r1, &r2, 3);
    let report = single.finalize();
    assert_eq!(threaded.finalize(), report);

    assert_eq!(report.total_pairs, 1500);
    assert_eq!(report.total_reads, 3000);
    let overlap = report.pair_overlap.as_ref().expect("pairs were ingested");
    // 60bp mates of an 80bp fragment overlap by 40bp
    assert_eq!(overlap.overlapped, 1500);
    assert_eq!(overlap.insert_sizes.get(&FRAGMENT_LEN), Some(&1500));
    assert_eq!(overlap.adapter_read_through, 0);
    // every fragment appears three times
    assert!(report.duplication.rate > 0.6);
}

#[test]
fn cancelled_run_stops_before_first_record() {
    let dir = TempDir::new().expect("tempdir");
    let (r1, _) = write_pairs(&dir, 10);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut acc = StatsAccumulator::new(StatsParams::default()).expect("valid params");
    let mut reader = FastqReader::new(&r1, false).expect("open FASTQ");
    let stats = reader
        .read_sequences_single_thread(&mut acc, &ProgressBar::hidden(), &cancel)
        .expect("read FASTQ");
    assert!(stats.cancelled);
    assert_eq!(stats.processed, 0);
    assert_eq!(acc.state(), AccumulatorState::Empty);
}

/// Cancels the shared token as it hands out the `stop_after`th pair.
struct CancelAfter<'a> {
    inner: FastqReader,
    stop_after: u64,
    yielded: u64,
    cancel: &'a CancellationToken,
}

impl SequenceReader for CancelAfter<'_> {
    fn next_pair(&mut self) -> anyhow::Result<Option<ReadPair>> {
        let pair = self.inner.next_pair()?;
        if pair.is_some() {
            self.yielded += 1;
            if self.yielded == self.stop_after {
                self.cancel.cancel();
            }
        }
        Ok(pair)
    }
}

#[test]
fn cancelled_mid_stream_leaves_a_mergeable_accumulator() {
    let dir = TempDir::new().expect("tempdir");
    let (r1, _) = write_pairs(&dir, 300);

    let cancel = CancellationToken::new();
    let mut reader = CancelAfter {
        inner: FastqReader::new(&r1, false).expect("open FASTQ"),
        stop_after: 120,
        yielded: 0,
        cancel: &cancel,
    };
    let mut partial = StatsAccumulator::new(StatsParams::default()).expect("valid params");
    let stats = reader
        .read_sequences_single_thread(&mut partial, &ProgressBar::hidden(), &cancel)
        .expect("read FASTQ");
    assert!(stats.cancelled);
    assert_eq!(stats.processed, 120);
    assert_eq!(partial.state(), AccumulatorState::Accumulating);
    assert_eq!(partial.total_reads(), 120);

    // pick up where the cancelled run stopped
    let mut rest = StatsAccumulator::new(StatsParams::default()).expect("valid params");
    let stats = reader
        .read_sequences_single_thread(&mut rest, &ProgressBar::hidden(), &CancellationToken::new())
        .expect("read FASTQ");
    assert!(!stats.cancelled);
    assert_eq!(stats.processed, 180);

    let expected = run_single(&r1, 1).finalize();

    let mut forward = partial.clone();
    forward.merge(&rest).expect("merge rest");
    let mut backward = rest.clone();
    backward.merge(&partial).expect("merge partial");

    assert_eq!(forward.finalize(), expected);
    assert_eq!(backward.finalize(), expected);
}

#[test]
fn gzip_input_is_read_transparently() {
    let dir = TempDir::new().expect("tempdir");
    let (r1, _) = write_pairs(&dir, 50);
    let plain = std::fs::read(&r1).expect("read plain");

    let gz_path = dir.path().join("reads.fastq.gz");
    let gz = std::fs::File::create(&gz_path).expect("create gz");
    let mut writer = niffler::get_writer(Box::new(gz), niffler::Format::Gzip, niffler::Level::Six)
    .expect("gzip writer");
    writer.write_all(&plain).expect("compress");
    drop(writer);

    let mut from_plain = run_single(&r1, 1);
    let mut from_gz = run_single(&gz_path, 1);
    assert_eq!(from_gz.finalize(), from_plain.finalize());
}
