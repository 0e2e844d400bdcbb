use clap::Parser;
use env_logger::Env;
use fqlib_tools::{cli, commands};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();

    let result = match args.command {
        cli::Commands::Stats(stats_args) => commands::stats::run(stats_args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
