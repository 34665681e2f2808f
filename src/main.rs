//! Purpose: `nvmite` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, prints results.
//! Invariants: Machine-readable output goes to stdout; tables and logs to stderr.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod bench;
mod info_json;

use bench::{run_bench, BenchArgs, BenchFormat};
use info_json::pool_info_json;
use nvmite::core::error::{to_exit_code, Error, ErrorKind};
use nvmite::core::pool::{Pool, PoolOptions};

#[derive(Parser)]
#[command(name = "nvmite", version, about = "Persistent-memory pool tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create (or grow) a pool file and print its info.
    Create(CreateArgs),
    /// Print a diagnostics snapshot for an existing pool file.
    Info(InfoArgs),
    /// Run the component benchmarks.
    Bench(BenchCliArgs),
}

#[derive(Args)]
struct CreateArgs {
    path: PathBuf,
    /// Pool capacity, e.g. 1GiB, 256MiB, or a plain byte count.
    #[arg(long, default_value = "1GiB")]
    size: String,
    /// Head-of-pool log reservation.
    #[arg(long, default_value = "30MiB")]
    log_cap: String,
    /// Require the path to live on a DAX-capable mount.
    #[arg(long)]
    strict_pmem: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InfoArgs {
    path: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BenchCliArgs {
    #[arg(long)]
    work_dir: Option<PathBuf>,
    #[arg(long, default_value = "256MiB")]
    pool_size: String,
    /// Carve-out capacities to bench, comma separated.
    #[arg(long = "buf-cap", value_delimiter = ',', default_value = "30MiB")]
    buf_caps: Vec<String>,
    /// Appended value sizes to bench, comma separated.
    #[arg(long = "value-size", value_delimiter = ',', default_value = "128,1KiB")]
    value_sizes: Vec<String>,
    #[arg(long, default_value_t = 10_000)]
    inserts: u64,
    /// json | table | both
    #[arg(long, default_value = "table")]
    format: String,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("nvmite: {err}");
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), Error> {
    match Cli::parse().command {
        Command::Create(args) => run_create(args),
        Command::Info(args) => run_info(args),
        Command::Bench(args) => run_bench_cli(args),
    }
}

fn run_create(args: CreateArgs) -> Result<(), Error> {
    let options = PoolOptions {
        size: parse_size(&args.size)?,
        log_cap: parse_size(&args.log_cap)?,
        strict_pmem: args.strict_pmem,
    };
    let pool = Pool::open(&args.path, options)?;
    emit_info(&pool, args.json)
}

fn run_info(args: InfoArgs) -> Result<(), Error> {
    // The backing file carries no header, so capacity comes from the file
    // itself and carve accounting is known only to the engine that owns the
    // pool; a cold snapshot reports the mapped geometry.
    let size = std::fs::metadata(&args.path)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(&args.path).with_source(err))?
        .len();
    let pool = Pool::open(&args.path, PoolOptions::new(size).with_log_cap(0))?;
    emit_info(&pool, args.json)
}

fn run_bench_cli(args: BenchCliArgs) -> Result<(), Error> {
    let mut buf_caps = Vec::new();
    for raw in &args.buf_caps {
        buf_caps.push(parse_size(raw)?);
    }
    let mut value_sizes = Vec::new();
    for raw in &args.value_sizes {
        value_sizes.push(parse_size(raw)? as usize);
    }
    run_bench(
        BenchArgs {
            work_dir: args.work_dir,
            pool_size: parse_size(&args.pool_size)?,
            buf_caps,
            value_sizes,
            inserts: args.inserts,
            format: BenchFormat::parse(&args.format)?,
        },
        env!("CARGO_PKG_VERSION"),
    )
}

fn emit_info(pool: &Pool, json: bool) -> Result<(), Error> {
    let info = pool.info()?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&pool_info_json(&info))
                .unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("{info}");
    }
    Ok(())
}

fn parse_size(input: &str) -> Result<u64, Error> {
    let trimmed = input.trim();
    let (digits, multiplier) = if let Some(rest) = trimmed.strip_suffix("GiB") {
        (rest, 1024 * 1024 * 1024)
    } else if let Some(rest) = trimmed.strip_suffix("MiB") {
        (rest, 1024 * 1024)
    } else if let Some(rest) = trimmed.strip_suffix("KiB") {
        (rest, 1024)
    } else if let Some(rest) = trimmed.strip_suffix('G') {
        (rest, 1024 * 1024 * 1024)
    } else if let Some(rest) = trimmed.strip_suffix('M') {
        (rest, 1024 * 1024)
    } else if let Some(rest) = trimmed.strip_suffix('K') {
        (rest, 1024)
    } else if let Some(rest) = trimmed.strip_suffix('B') {
        (rest, 1)
    } else {
        (trimmed, 1)
    };

    let value: u64 = digits.trim().parse().map_err(|_| {
        Error::new(ErrorKind::Usage).with_message(format!("invalid size: {input:?}"))
    })?;
    value.checked_mul(multiplier).ok_or_else(|| {
        Error::new(ErrorKind::Usage).with_message(format!("size overflows: {input:?}"))
    })
}
