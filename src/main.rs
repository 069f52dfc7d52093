use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use readahead_bench::cli::{Cli, OutputFormat};
use readahead_bench::config::BenchConfig;
use readahead_bench::csv_output::CsvOutput;
use readahead_bench::driver::{Driver, RunSummary};
use readahead_bench::json_output::JsonSink;
use readahead_bench::report::ReportSink;
use readahead_bench::table_output::TableOutput;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<BenchConfig> {
    let mut config = match &cli.config {
        Some(path) => BenchConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BenchConfig::default(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run<S: ReportSink>(cli: &Cli, config: BenchConfig, sink: S) -> Result<RunSummary> {
    let mut driver = Driver::new(config, sink)
        .reuse_fixture(cli.reuse_fixture)
        .keep_fixture(cli.keep_fixture);
    driver.run(cli.suite).context("benchmark run failed")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(&cli)?;
    let iterations = config.iterations;
    let stdout = io::stdout().lock();

    let summary = match cli.format {
        OutputFormat::Text => run(&cli, config, TableOutput::new(stdout))?,
        OutputFormat::Json => run(&cli, config, JsonSink::new(stdout, iterations))?,
        OutputFormat::Csv => run(&cli, config, CsvOutput::new(stdout))?,
    };

    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "some scenarios failed");
    }
    Ok(())
}
