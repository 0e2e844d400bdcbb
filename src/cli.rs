use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect quality-control statistics from single or paired FASTQ files
    Stats(StatsArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct StatsArgs {
    /// FASTQ file (mate 1 for paired data); .gz, .bz2 and .xz are accepted
    pub input1: PathBuf,

    /// Mate 2 FASTQ file
    #[arg(long = "in2")]
    pub input2: Option<PathBuf>,

    /// Output file for the JSON report
    #[arg(short = 'o', long = "output", default_value = "qc_report.json")]
    pub output_file: PathBuf,

    /// Worker threads (overrides the config file)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Config file to use instead of the user config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// K-mer length for the diversity table
    #[arg(long)]
    pub kmer_len: Option<usize>,

    /// Sample one read in N for overrepresentation analysis (0 disables it)
    #[arg(long)]
    pub sample_rate: Option<u64>,

    /// Number of ranked entries kept in the report
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Quality scores are Phred+64 encoded
    #[arg(long)]
    pub phred64: bool,

    /// Sample name stored in the report metadata
    #[arg(long)]
    pub sample_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stats_arguments() {
        let args = Args::try_parse_from([
            "fqlib-tools",
            "stats",
            "r1.fq.gz",
            "--in2",
            "r2.fq.gz",
            "-o",
            "out.json",
            "--threads",
            "4",
            "--kmer-len",
            "7",
            "--phred64",
        ])
        .unwrap();
        let Commands::Stats(stats) = args.command;
        assert_eq!(stats.input1, PathBuf::from("r1.fq.gz"));
        assert_eq!(stats.input2, Some(PathBuf::from("r2.fq.gz")));
        assert_eq!(stats.output_file, PathBuf::from("out.json"));
        assert_eq!(stats.threads, Some(4));
        assert_eq!(stats.kmer_len, Some(7));
        assert!(stats.phred64);
        assert_eq!(stats.sample_rate, None);
    }

    #[test]
    fn test_output_has_default() {
        let args = Args::try_parse_from(["fqlib-tools", "stats", "reads.fq"]).unwrap();
        let Commands::Stats(stats) = args.command;
        assert_eq!(stats.output_file, PathBuf::from("qc_report.json"));
        assert!(!stats.phred64);
    }
}
