use std::{fmt::Display, str::FromStr};

use clap::Parser;
use spn_bench_lib::logger::{LogLevel, Logger};

use crate::{benchmark::benchmark, explore::explore, filter::filter, generate::generate};

pub mod benchmark;
pub mod explore;
pub mod filter;
pub mod generate;

#[derive(Parser, Debug)]
#[command(name = "SPN Benchmark Generator")]
#[command(version = "0.1")]
#[command(about = "Generate benchmark datasets of stochastic Petri nets", long_about = None)]
pub struct Args {
    /// Mode target: a dataset folder for generate/benchmark, an SPN matrix
    /// JSON file for filter/explore.
    target: Option<String>,

    #[arg(short, long, default_value_t = Mode::Generate)]
    mode: Mode,

    #[arg(short, long, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Emit the reachability graph as Graphviz DOT in explore mode.
    #[arg(long, default_value_t = false)]
    dot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Generate,
    Filter,
    Explore,
    Benchmark,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generate" | "gen" => Ok(Mode::Generate),
            "filter" => Ok(Mode::Filter),
            "explore" | "reach" => Ok(Mode::Explore),
            "benchmark" | "bench" => Ok(Mode::Benchmark),
            _ => Err(anyhow::anyhow!("Invalid mode: {}", s)),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Generate => write!(f, "generate"),
            Mode::Filter => write!(f, "filter"),
            Mode::Explore => write!(f, "explore"),
            Mode::Benchmark => write!(f, "benchmark"),
        }
    }
}

fn main() {
    let args = Args::parse();
    let logger = Logger::new(args.log_level, "spn-bench".to_string(), None);

    match run(&logger, &args) {
        Ok(_) => logger.info("done"),
        Err(e) => {
            logger.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

fn run(logger: &Logger, args: &Args) -> anyhow::Result<()> {
    match args.mode {
        Mode::Generate => generate(logger, args),
        Mode::Filter => filter(logger, args),
        Mode::Explore => explore(logger, args),
        Mode::Benchmark => benchmark(logger, args),
    }
}
