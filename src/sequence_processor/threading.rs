use super::core::*;
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Sender};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Shared abort flag, checked before every record.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type WorkerResult<P> = crate::error::Result<(P, ProcessingStats)>;

/// Fixed set of workers, each owning its own forked processor.
pub struct ThreadPool<P: SequenceProcessor> {
    handles: Vec<thread::JoinHandle<WorkerResult<P>>>,
    tx: Sender<Vec<ReadPair>>,
    num_threads: usize,
}

impl<P: SequenceProcessor> ThreadPool<P> {
    pub fn new(template: &P, num_threads: usize, cancel: CancellationToken) -> Result<Self> {
        let (tx, rx) = bounded::<Vec<ReadPair>>(num_threads * 2);
        let mut handles = Vec::with_capacity(num_threads);

        for worker_id in 0..num_threads {
            let rx = rx.clone();
            let cancel = cancel.clone();
            let mut worker_processor = template.fork();
            let handle = thread::Builder::new()
                .name(format!("qc-worker-{worker_id}"))
                .spawn(move || -> WorkerResult<P> {
                    let mut local_stats = ProcessingStats::default();
                    while let Ok(batch) = rx.recv() {
                        for pair in &batch {
                            if cancel.is_cancelled() {
                                local_stats.cancelled = true;
                                break;
                            }
                            match worker_processor.process_pair(pair) {
                                Ok(()) => local_stats.processed += 1,
                                Err(e) if e.is_validation() => {
                                    warn!("Skipping record {}: {}", pair_name(pair), e);
                                    local_stats.errors += 1;
                                }
                                Err(e) => return Err(e),
                            }
                        }
                    }
                    debug!(
                        "Worker {} finished after {} records",
                        worker_id, local_stats.processed
                    );
                    Ok((worker_processor, local_stats))
                })?;
            handles.push(handle);
        }

        Ok(ThreadPool {
            handles,
            tx,
            num_threads,
        })
    }

    pub fn send(&self, batch: Vec<ReadPair>) -> Result<()> {
        Ok(self.tx.send(batch)?)
    }

    pub fn finish(self) -> Result<(ProcessingStats, Vec<P>)> {
        drop(self.tx);

        let collect_progress = ProgressBarBuilder::new("Collecting results")
            .with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .with_tick()
            .build()?;

        let mut stats = ProcessingStats::default();
        let mut processors = Vec::with_capacity(self.handles.len());

        for (idx, handle) in self.handles.into_iter().enumerate() {
            collect_progress.set_message(format!(
                "Collecting worker {} of {}",
                idx + 1,
                self.num_threads
            ));

            let (worker_processor, worker_stats) = handle
                .join()
                .map_err(|_| anyhow!("worker thread {} panicked", idx))??;
            processors.push(worker_processor);
            stats.absorb(&worker_stats);
            collect_progress.inc(1);
        }

        collect_progress.finish_and_clear();
        Ok((stats, processors))
    }
}

/// Pairwise merge rounds until one processor is left. Each round merges
/// neighbours on scoped threads, so W partials need about log2(W) rounds.
pub fn tree_reduce<P: SequenceProcessor>(mut processors: Vec<P>) -> Result<Option<P>> {
    let merge_progress = ProgressBarBuilder::new("Merging results")
        .with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .with_tick()
        .build()?;

    let mut round = 0;
    while processors.len() > 1 {
        round += 1;
        merge_progress.set_message(format!(
            "Merge round {} ({} partial results)",
            round,
            processors.len()
        ));

        let mut pairs = Vec::with_capacity(processors.len() / 2);
        let mut carry = None;
        let mut iter = processors.into_iter();
        loop {
            match (iter.next(), iter.next()) {
                (Some(a), Some(b)) => pairs.push((a, b)),
                (Some(a), None) => {
                    carry = Some(a);
                    break;
                }
                _ => break,
            }
        }

        let mut next = Vec::with_capacity(pairs.len() + 1);
        thread::scope(|scope| -> Result<()> {
            let handles: Vec<_> = pairs
                .into_iter()
                .map(|(mut a, b)| scope.spawn(move || a.merge_processor(&b).map(|_| a)))
                .collect();
            for handle in handles {
                let merged = handle
                    .join()
                    .map_err(|_| anyhow!("merge thread panicked"))??;
                next.push(merged);
            }
            Ok(())
        })?;
        next.extend(carry);
        processors = next;
    }

    merge_progress.finish_and_clear();
    debug!("Reduced partial results in {} merge rounds", round);
    Ok(processors.pop())
}

pub fn merge_processors<P: SequenceProcessor>(
    processors: Vec<P>,
    main_processor: &mut P,
) -> Result<()> {
    if let Some(reduced) = tree_reduce(processors)? {
        main_processor.merge_processor(&reduced)?;
    }
    Ok(())
}

pub(crate) fn pair_name(pair: &ReadPair) -> &str {
    pair.left()
        .or(pair.right())
        .map_or("<unnamed>", |r| r.name())
}
