use crate::cli::StatsArgs;
use crate::config::QcConfig;
use crate::export::formats::qc::QcExport;
use crate::export::{AnalysisExport, ExportMetadata};
use crate::sequence_processor::collectors::{ReportPayload, StatsAccumulator};
use crate::sequence_processor::core::{ProcessingStats, SequenceReader};
use crate::sequence_processor::readers::{FastqPairReader, FastqReader};
use crate::sequence_processor::threading::CancellationToken;
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::{bail, Result};
use log::info;

fn resolve_config(args: &StatsArgs) -> Result<QcConfig> {
    let mut config = match &args.config {
        Some(path) => QcConfig::from_file(path)?,
        None => QcConfig::load(),
    };
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(kmer_len) = args.kmer_len {
        config.stats.kmer_len = kmer_len;
    }
    if let Some(rate) = args.sample_rate {
        config.stats.overrep_sample_rate = rate;
    }
    if let Some(top_n) = args.top_n {
        config.stats.top_n = top_n;
    }
    config.phred64 |= args.phred64;
    Ok(config)
}

pub fn run(args: StatsArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let mut accumulator = StatsAccumulator::new(config.stats.clone())?;
    let threads = config.threads.max(1);
    let cancel = CancellationToken::new();

    let progress = ProgressBarBuilder::new("Reading FASTQ")
        .with_template("{spinner:.green} [{elapsed_precise}] {msg} {pos} records ({per_sec})")
        .with_tick()
        .build()?;

    let stats = match &args.input2 {
        Some(input2) => {
            info!(
                "Collecting paired-end statistics from {} and {}",
                args.input1.display(),
                input2.display()
            );
            let mut reader = FastqPairReader::new(&args.input1, input2, config.phred64)?;
            reader.read_sequences_with_threads(&mut accumulator, &progress, threads, &cancel)?
        }
        None => {
            info!("Collecting statistics from {}", args.input1.display());
            let mut reader = FastqReader::new(&args.input1, config.phred64)?;
            reader.read_sequences_with_threads(&mut accumulator, &progress, threads, &cancel)?
        }
    };
    progress.finish_with_message(format!("Read {} records", stats.processed));

    let report = accumulator.finalize();
    if report.total_reads == 0 {
        bail!("No valid reads found in {}", args.input1.display());
    }

    print_summary(&report, &stats);

    let mut inputs = vec![args.input1.display().to_string()];
    inputs.extend(args.input2.iter().map(|p| p.display().to_string()));
    let export = QcExport::new(&config.stats, config.phred64, &stats, report)?;
    println!("Report digest: {}", export.hexdigest);

    AnalysisExport::qc(
        export,
        ExportMetadata {
            sample_id: args.sample_id.clone(),
            inputs,
            tags: Vec::new(),
        },
    )
    .write_json(&args.output_file)?;
    info!("Report written to {}", args.output_file.display());

    Ok(())
}

fn print_summary(report: &ReportPayload, stats: &ProcessingStats) {
    println!("Reads:      {}", report.total_reads);
    println!("Bases:      {}", report.total_bases);
    if report.total_pairs > 0 {
        println!("Pairs:      {}", report.total_pairs);
    }
    println!(
        "Length:     {}-{} (mean {:.1})",
        report.min_read_length, report.max_read_length, report.mean_read_length
    );
    println!("GC:         {:.2}%", report.gc_percent);
    println!("Q20 bases:  {:.2}%", report.q20_percent);
    println!("Q30 bases:  {:.2}%", report.q30_percent);
    println!("Duplication {:.2}%", 100.0 * report.duplication.rate);
    if let Some(overlap) = &report.pair_overlap {
        println!(
            "Overlapping pairs: {:.2}% (adapter read-through {:.2}%)",
            100.0 * overlap.overlap_fraction,
            100.0 * overlap.adapter_fraction
        );
    }
    if stats.skipped + stats.errors > 0 {
        println!(
            "Skipped {} unreadable and {} invalid records",
            stats.skipped, stats.errors
        );
    }
}
