use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;
use clap::{Parser, Subcommand, ValueEnum};
use anyhow::{Result, Context};
use log::{info, error};
use simple_logger::SimpleLogger;

use testreport::core::color::ColorChoice;
use testreport::core::config::{OutputTarget, RunConfig};
use testreport::core::dispatcher::Dispatcher;
use testreport::replay::{read_transcript, replay};
use testreport::reporters::ReporterKind;


#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tests run concurrently
    #[arg(short, long)]
    parallel: bool,

    /// Emit JSON lines instead of text
    #[arg(short, long)]
    machine: bool,

    /// Only show non-passing tests and the summary
    #[arg(short, long)]
    quiet: bool,

    #[arg(long, value_enum)]
    color: Option<ColorArg>,

    /// Write the report to this file
    #[arg(short, long, conflicts_with = "split")]
    output: Option<PathBuf>,

    /// Write every message to its own file `<PREFIX><n>`
    #[arg(long, value_name = "PREFIX")]
    split: Option<PathBuf>,

    /// Log diagnostics of the reporter itself to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}


#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => ColorChoice::Auto,
            ColorArg::Always => ColorChoice::Always,
            ColorArg::Never => ColorChoice::Never,
        }
    }
}


#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded run (JSON lines) through the selected reporter
    Replay {
        transcript: PathBuf,
    },

    /// Show which reporter each (parallel, machine) combination selects
    Reporters,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    if let Err(e) = SimpleLogger::new().with_level(log_level).init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Reporters => {
            print_reporters();
            Ok(0)
        }
        Commands::Replay { transcript } => {
            let config = load_config(cli)?;
            info!("testreport v{} using {}", env!("CARGO_PKG_VERSION"), config.reporter_kind());

            let file = File::open(transcript)
                .with_context(|| format!("Failed to open transcript {}", transcript.display()))?;
            let events = read_transcript(BufReader::new(file))
                .context("Failed to read transcript")?;

            let dispatcher = Dispatcher::from_config(&config)
                .context("Failed to open report output")?;
            let totals = replay(&dispatcher, &events, config.parallel)
                .context("Reporting failed")?;

            Ok(match totals {
                Some(totals) if totals.has_failures() => 1,
                _ => 0,
            })
        }
    }
}


fn load_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if cli.parallel {
        config.parallel = true;
    }

    if cli.machine {
        config.machine_output = true;
    }

    if cli.quiet {
        config.quiet = true;
    }

    if let Some(color) = cli.color {
        config.color = color.into();
    }

    if let Some(path) = &cli.output {
        config.output = OutputTarget::File(path.clone());
    }

    if let Some(prefix) = &cli.split {
        config.output = OutputTarget::Split(prefix.clone());
    }

    Ok(config)
}


fn print_reporters() {
    println!("parallel  machine  reporter");
    println!("========  =======  ========");
    for kind in ReporterKind::ALL {
        println!("{:<8}  {:<7}  {}", kind.is_parallel(), kind.is_machine(), kind);
    }
}
