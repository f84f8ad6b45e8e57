// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Command line front end: count a record file, or generate one to count.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use parcms::common::random::RandomSource;
use parcms::common::random::XorShift64;
use parcms::config::JobConfig;
use parcms::config::check_delta;
use parcms::config::check_epsilon;
use parcms::error::Error;
use parcms::exec_log::FileExecutionLogger;
use parcms::hash::DEFAULT_SEED;
use parcms::record::RecordFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "parcms")]
#[command(about = "Approximate per-key counts of large record files with Count-Min sketches", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sketch a record file in parallel and append the run summary to a log.
    Count(CountArgs),
    /// Write a file of random IPv4 addresses.
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug)]
struct CountArgs {
    /// Binary file of fixed-width records.
    input: PathBuf,
    /// CSV log the run summary is appended to (created if missing).
    output: PathBuf,
    /// Additive error bound, as a fraction of the total count.
    #[arg(value_parser = parse_epsilon)]
    epsilon: f64,
    /// Probability that the error bound is exceeded.
    #[arg(value_parser = parse_delta)]
    delta: f64,

    /// Number of workers [default: available parallelism].
    #[arg(short, long)]
    workers: Option<usize>,
    /// Read buffer capacity per worker, in records [default: 1 MiB worth].
    #[arg(long)]
    buffer_records: Option<usize>,
    /// Record layout of the input.
    #[arg(long, default_value_t = RecordFormat::Ipv4)]
    record_format: RecordFormat,
    /// Sketch width; overrides epsilon when given together with --depth. Epsilon and delta
    /// are validated either way.
    #[arg(long, requires = "depth")]
    width: Option<usize>,
    /// Sketch depth; overrides delta when given together with --width.
    #[arg(long, requires = "width")]
    depth: Option<usize>,
    /// Seed of the hash family.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Read the next chunk while the current one is being sketched.
    #[arg(long)]
    read_ahead: bool,
    /// Print the estimated count of these addresses.
    #[arg(short, long = "query", value_name = "IPV4")]
    queries: Vec<Ipv4Addr>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Packed records.
    Bin,
    /// One dotted-quad address per line.
    Text,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Number of addresses to write.
    count: u64,
    /// Destination file (overwritten).
    output: PathBuf,
    /// Output encoding.
    #[arg(long, value_enum, default_value_t = OutputFormat::Bin)]
    format: OutputFormat,
    /// Record layout used with `--format bin`.
    #[arg(long, default_value_t = RecordFormat::Ipv4)]
    record_format: RecordFormat,
    /// Seed of the address generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Count(args) => count(args),
        Command::Generate(args) => generate(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_epsilon(value: &str) -> Result<f64, String> {
    let epsilon = value.parse::<f64>().map_err(|err| err.to_string())?;
    check_epsilon(epsilon).map_err(|err| err.message().to_string())
}

fn parse_delta(value: &str) -> Result<f64, String> {
    let delta = value.parse::<f64>().map_err(|err| err.to_string())?;
    check_delta(delta).map_err(|err| err.message().to_string())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn count(args: CountArgs) -> Result<(), Error> {
    let mut builder = JobConfig::builder(args.input)
        .epsilon_delta(args.epsilon, args.delta)
        .record_format(args.record_format)
        .seed(args.seed)
        .read_ahead(args.read_ahead);
    if let (Some(width), Some(depth)) = (args.width, args.depth) {
        builder = builder.dimensions(width, depth);
    }
    if let Some(workers) = args.workers {
        builder = builder.workers(workers);
    }
    if let Some(records) = args.buffer_records {
        builder = builder.buffer_records(records);
    }
    let config = builder.build()?;

    let logger = FileExecutionLogger::new(args.output);
    let report = parcms::job::run_and_log(&config, &logger)?;

    let sketch = &report.sketch;
    println!(
        "{} records, {} workers, {:.6}s, sketch {}x{}",
        report.total_records,
        report.workers.len(),
        report.elapsed.as_secs_f64(),
        sketch.width(),
        sketch.depth()
    );
    for addr in args.queries {
        let key = u32::from(addr);
        println!(
            "{addr}\t{}\t[{}, {}]",
            sketch.estimate(key),
            sketch.lower_bound(key),
            sketch.upper_bound(key)
        );
    }
    Ok(())
}

fn generate(args: GenerateArgs) -> Result<(), Error> {
    let file = File::create(&args.output)
        .map_err(|err| Error::from(err).with_context("path", args.output.display()))?;
    let mut out = BufWriter::new(file);
    let mut rng = XorShift64::seeded(args.seed);
    let mut record = Vec::with_capacity(args.record_format.width());

    for _ in 0..args.count {
        let addr = Ipv4Addr::new(
            rng.next_in_range(1, 254) as u8,
            rng.next_below(256) as u8,
            rng.next_below(256) as u8,
            rng.next_below(256) as u8,
        );
        match args.format {
            OutputFormat::Bin => {
                record.clear();
                args.record_format.encode(u32::from(addr), &mut record);
                out.write_all(&record)?;
            }
            OutputFormat::Text => writeln!(out, "{addr}")?,
        }
    }
    out.flush()?;

    tracing::info!(
        count = args.count,
        path = %args.output.display(),
        format = ?args.format,
        "generated addresses"
    );
    Ok(())
}
