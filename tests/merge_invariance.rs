use fqlib_tools::{ReadPair, SequenceRecord, StatsAccumulator, StatsParams, Strand};

// Reads are generated from a fixed LCG so every run sees the same input:
// random bases, a few Ns, a recurring adapter and some exact duplicates.
const ADAPTER: &[u8] = b"AGATCGGAAGAGCACACGTCTGAACTCCAGTCAC";

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn generate_reads(count: usize, seed: u64) -> Vec<SequenceRecord> {
    let mut rng = Lcg(seed);
    let mut reads: Vec<SequenceRecord> = Vec::with_capacity(count);
    for i in 0..count {
        if i % 17 == 5 && !reads.is_empty() {
            let source = &reads[rng.below(reads.len() as u64) as usize];
            let copy = SequenceRecord::new(
                format!("dup{i}"),
                source.bases().to_vec(),
                Strand::Forward,
                source.quality().to_vec(),
            )
            .expect("valid duplicate");
            reads.push(copy);
            continue;
        }

        let len = 30 + rng.below(70) as usize;
        let mut bases: Vec<u8> = (0..len)
            .map(|_| match rng.below(50) {
                0 => b'N',
                x => b"ACGT"[(x % 4) as usize],
            })
            .collect();
        if i % 7 == 0 {
            let start = len.saturating_sub(ADAPTER.len()).min(len / 2);
            let n = (len - start).min(ADAPTER.len());
            bases[start..start + n].copy_from_slice(&ADAPTER[..n]);
        }
        let quality: Vec<u8> = (0..len).map(|_| 2 + rng.below(40) as u8).collect();
        reads.push(
            SequenceRecord::new(format!("read{i}"), bases, Strand::Forward, quality)
                .expect("valid read"),
        );
    }
    reads
}

fn params() -> StatsParams {
    StatsParams {
        overrep_sample_rate: 3,
        probe_lengths: vec![10, 20],
        ..StatsParams::default()
    }
}

fn accumulate<'a>(reads: impl IntoIterator<Item = &'a SequenceRecord>) -> StatsAccumulator {
    let mut acc = StatsAccumulator::new(params()).expect("valid params");
    for read in reads {
        acc.ingest(read).expect("ingest");
    }
    acc
}

#[test]
fn partitioned_ingestion_matches_single_pass() {
    let reads = generate_reads(600, 42);
    let expected = accumulate(&reads).finalize();
    assert_eq!(expected.total_reads, 600);

    for parts in [1usize, 2, 3, 5, 8] {
        let chunk = reads.len().div_ceil(parts);
        let partials: Vec<_> = reads.chunks(chunk).map(accumulate).collect();

        let mut forward = StatsAccumulator::new(params()).expect("valid params");
        for p in &partials {
            forward.merge(p).expect("merge");
        }
        let mut backward = StatsAccumulator::new(params()).expect("valid params");
        for p in partials.iter().rev() {
            backward.merge(p).expect("merge");
        }

        let forward = forward.finalize();
        assert_eq!(forward, expected, "forward merge with {parts} partitions");
        assert_eq!(backward.finalize(), expected, "reverse merge with {parts} partitions");
        assert_eq!(forward.total_bases, expected.total_bases);
        assert_eq!(forward.gc_bases, expected.gc_bases);
    }
}

#[test]
fn interleaved_partitions_and_shuffled_order_agree() {
    let reads = generate_reads(400, 7);
    let expected = accumulate(&reads).finalize();

    // round-robin partitions, each ingested back to front
    let mut partials: Vec<StatsAccumulator> = (0..3)
        .map(|_| StatsAccumulator::new(params()).expect("valid params"))
        .collect();
    for (i, read) in reads.iter().enumerate().rev() {
        partials[i % 3].ingest(read).expect("ingest");
    }

    // ((p2 + p0) + p1)
    let mut left = partials[2].clone();
    left.merge(&partials[0]).expect("merge");
    left.merge(&partials[1]).expect("merge");

    // (p1 + (p0 + p2))
    let mut inner = partials[0].clone();
    inner.merge(&partials[2]).expect("merge");
    let mut right = partials[1].clone();
    right.merge(&inner).expect("merge");

    assert_eq!(left.finalize(), expected);
    assert_eq!(right.finalize(), expected);
}

#[test]
fn adapter_shows_up_in_overrepresented_sequences() {
    let reads = generate_reads(600, 42);
    let report = accumulate(&reads).finalize();
    let ten = report
        .overrepresented
        .probes
        .iter()
        .find(|p| p.probe_len == 10)
        .expect("probe length 10 is configured");
    assert!(ten.probes > 0);
    let top = &ten.sequences[0];
    assert!(top.count >= ten.sequences.last().expect("non-empty").count);
    assert!(top.fold_enrichment > 1.0);
    // sequences are ranked by count, then alphabetically
    for w in ten.sequences.windows(2) {
        assert!(
            w[0].count > w[1].count || (w[0].count == w[1].count && w[0].sequence < w[1].sequence)
        );
    }
}

#[test]
fn pair_ingestion_is_partition_invariant() {
    let reads = generate_reads(300, 99);
    let pairs: Vec<ReadPair> = reads
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| ReadPair::paired(c[0].clone(), c[1].reverse_complement()))
        .collect();

    let mut single = StatsAccumulator::new(params()).expect("valid params");
    for pair in &pairs {
        single.ingest_pair(pair).expect("ingest pair");
    }
    let expected = single.finalize();
    assert_eq!(expected.total_pairs, 150);
    assert_eq!(expected.total_reads, 300);

    let mut a = StatsAccumulator::new(params()).expect("valid params");
    let mut b = StatsAccumulator::new(params()).expect("valid params");
    for (i, pair) in pairs.iter().enumerate() {
        if i % 2 == 0 {
            a.ingest_pair(pair).expect("ingest pair");
        } else {
            b.ingest_pair(pair).expect("ingest pair");
        }
    }
    b.merge(&a).expect("merge");
    assert_eq!(b.finalize(), expected);
}
