// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  apilog: batch analytics over exported API access logs
//
//  analyze   JSON array of records → JSON report on stdout
//  generate  synthetic batch with an injected rate-limit burst
//  config    effective configuration as YAML
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod generate;

use anyhow::Context;
use apilog_analytics::Analyzer;
use apilog_core::config::{AnalyzerConfig, ReportMode};
use apilog_core::error::ApilogError;
use apilog_core::record::read_batch;
use apilog_observability::logger::{LogFormat, init_tracing};
use apilog_observability::metrics::MetricsCollector;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "apilog", version, about = "Batch analytics over API access logs")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "apilog.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Diagnostic log format (text or json)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a JSON array of log records and print the report
    Analyze {
        /// Input file; `-` reads stdin
        file: PathBuf,

        /// Override the configured report mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,

        /// Print run metrics (Prometheus text format) to stderr
        #[arg(long)]
        metrics: bool,
    },
    /// Write a synthetic log batch
    Generate {
        #[arg(short = 'n', long, default_value_t = 10_000)]
        count: usize,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// RNG seed for reproducible batches
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the effective configuration as YAML
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    RateLimits,
    Caching,
}

impl From<ModeArg> for ReportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::RateLimits => ReportMode::RateLimits,
            ModeArg::Caching => ReportMode::Caching,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Tracing ──
    if let Err(e) = init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let log_format = cli.log_format;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            match log_format {
                LogFormat::Text => eprintln!("error: {e:#}"),
                LogFormat::Json => eprintln!("{}", error_body(&e, code)),
            }
            ExitCode::from(code)
        }
    }
}

/// Exit code of the first `ApilogError` in the chain, `1` otherwise.
fn exit_code(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<ApilogError>())
        .map_or(1, |err| u8::try_from(err.exit_code()).unwrap_or(1))
}

/// One-line JSON error for `--log-format json`.
fn error_body(e: &anyhow::Error, code: u8) -> String {
    serde_json::json!({ "error": format!("{e:#}"), "code": code }).to_string()
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Analyze {
            file,
            mode,
            pretty,
            metrics,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(mode) = mode {
                config.mode = mode.into();
            }
            analyze(&file, config, pretty, metrics)
        }
        Command::Generate {
            count,
            output,
            seed,
        } => generate_batch(count, output.as_deref(), seed),
        Command::Config => {
            let config = load_config(&cli.config)?;
            let yaml = serde_yaml::to_string(&config).context("failed to render config")?;
            io::stdout().write_all(yaml.as_bytes())?;
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<AnalyzerConfig> {
    if path.exists() {
        info!(path = %path.display(), "Loading config file");
    } else {
        info!("No config file found, using defaults");
    }
    AnalyzerConfig::load(path).with_context(|| format!("invalid config {}", path.display()))
}

fn analyze(file: &Path, config: AnalyzerConfig, pretty: bool, metrics: bool) -> anyhow::Result<()> {
    // ── Input ──
    let (batch, skipped) = if file == Path::new("-") {
        read_batch(io::stdin().lock())
    } else {
        let handle =
            File::open(file).with_context(|| format!("cannot open {}", file.display()))?;
        read_batch(BufReader::new(handle))
    }
    .with_context(|| format!("cannot read log batch from {}", file.display()))?;

    if skipped > 0 {
        warn!(skipped, "Ignoring non-object entries in input array");
    }
    info!(records = batch.len(), mode = config.mode.as_str(), "Loaded log batch");

    // ── Engine ──
    let collector = MetricsCollector::new(metrics)?;
    let analyzer = Analyzer::new(config)?;
    let run = analyzer.run(&batch, chrono::Utc::now());
    collector.record_run(&run);
    collector.record_skipped(skipped);

    // ── Output ──
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if pretty {
        serde_json::to_writer_pretty(&mut out, &run.report)?;
    } else {
        serde_json::to_writer(&mut out, &run.report)?;
    }
    writeln!(out)?;
    out.flush()?;

    if collector.is_enabled() {
        eprint!("{}", collector.render());
    }
    Ok(())
}

fn generate_batch(count: usize, output: Option<&Path>, seed: Option<u64>) -> anyhow::Result<()> {
    let opts = generate::GeneratorOptions {
        count,
        seed,
        ..Default::default()
    };
    let batch = generate::generate(&opts)?;

    match output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut out, &batch)?;
            writeln!(out)?;
            out.flush()?;
            info!(records = batch.len(), path = %path.display(), "Generated log batch");
        }
        None => {
            let mut out = BufWriter::new(io::stdout().lock());
            serde_json::to_writer_pretty(&mut out, &batch)?;
            writeln!(out)?;
            out.flush()?;
        }
    }
    Ok(())
}
