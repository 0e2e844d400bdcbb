use super::pair::ReadPair;
use super::processor::SequenceProcessor;
use super::stats::ProcessingStats;
use crate::sequence_processor::threading::{merge_processors, pair_name, CancellationToken, ThreadPool};
use anyhow::Result;
use indicatif::ProgressBar;
use log::{info, warn};

const BATCH_SIZE: usize = 1000;

/// A producer of fragments. Implementors only supply `next_pair`; the
/// driving loops are shared.
pub trait SequenceReader {
    /// Next fragment, `Ok(None)` at end of input.
    fn next_pair(&mut self) -> Result<Option<ReadPair>>;

    /// Records dropped by the reader itself because they could not be built.
    fn skipped(&self) -> u64 {
        0
    }

    fn read_sequences_single_thread<P: SequenceProcessor>(
        &mut self,
        processor: &mut P,
        progress: &ProgressBar,
        cancel: &CancellationToken,
    ) -> Result<ProcessingStats> {
        let mut stats = ProcessingStats::default();
        let min_length = processor.get_min_length();

        loop {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            let Some(pair) = self.next_pair()? else {
                break;
            };

            if !long_enough(&pair, min_length) {
                stats.too_short += 1;
                continue;
            }

            match processor.process_pair(&pair) {
                Ok(()) => stats.processed += 1,
                Err(e) if e.is_validation() => {
                    warn!("Skipping record {}: {}", pair_name(&pair), e);
                    stats.errors += 1;
                }
                Err(e) => return Err(e.into()),
            }

            if stats.processed % 10_000 == 0 {
                progress.set_position(stats.processed);
            }
        }

        stats.skipped += self.skipped();
        progress.set_position(stats.processed);
        Ok(stats)
    }

    fn read_sequences_with_threads<P: SequenceProcessor>(
        &mut self,
        processor: &mut P,
        progress: &ProgressBar,
        num_threads: usize,
        cancel: &CancellationToken,
    ) -> Result<ProcessingStats> {
        if num_threads <= 1 || !processor.supports_parallel() {
            return self.read_sequences_single_thread(processor, progress, cancel);
        }

        info!("Processing with {} worker threads", num_threads);
        let pool = ThreadPool::new(processor, num_threads, cancel.clone())?;
        let mut stats = ProcessingStats::default();
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let min_length = processor.get_min_length();
        let mut sent = 0u64;

        loop {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            let Some(pair) = self.next_pair()? else {
                break;
            };

            if !long_enough(&pair, min_length) {
                stats.too_short += 1;
                continue;
            }

            batch.push(pair);
            if batch.len() >= BATCH_SIZE {
                sent += batch.len() as u64;
                // a closed channel means a worker failed; finish() reports why
                if pool.send(std::mem::take(&mut batch)).is_err() {
                    break;
                }
                progress.set_position(sent);
            }
        }

        if !batch.is_empty() {
            sent += batch.len() as u64;
            if pool.send(batch).is_err() {
                warn!("Workers stopped before the final batch was sent");
            }
        }
        progress.set_position(sent);

        let (thread_stats, processors) = pool.finish()?;
        stats.absorb(&thread_stats);
        stats.skipped += self.skipped();

        merge_processors(processors, processor)?;

        Ok(stats)
    }
}

fn long_enough(pair: &ReadPair, min_length: usize) -> bool {
    pair.left()
        .into_iter()
        .chain(pair.right())
        .all(|r| r.len() >= min_length)
}
