// Benchmark harness for nvmite.
//
// Purpose:
// - Provide a simple, repeatable baseline for core operations (append,
//   allocate/free cycling, reopen + recover).
// - Emit machine-readable JSON to stdout and a human-readable table to stderr.
//
// Design notes:
// - Exercises only the public pool/buffer interface; the storage engine's own
//   workload benchmarks live with the engine, not here.
// - Keep benchmarks "good enough" for trend tracking, not lab-grade profiling.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use nvmite::core::error::{Error, ErrorKind};
use nvmite::core::pool::{Pool, PoolOptions};

#[derive(Clone, Debug)]
pub struct BenchArgs {
    pub work_dir: Option<PathBuf>,
    pub pool_size: u64,
    pub buf_caps: Vec<u64>,
    pub value_sizes: Vec<usize>,
    pub inserts: u64,
    pub format: BenchFormat,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BenchFormat {
    Json,
    Table,
    Both,
}

impl BenchFormat {
    pub fn parse(input: &str) -> Result<Self, Error> {
        match input.trim() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            "both" => Ok(Self::Both),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message("invalid --format (use json|table|both)")),
        }
    }
}

pub fn run_bench(args: BenchArgs, program_version: &str) -> Result<(), Error> {
    let work_dir = args.work_dir.clone().unwrap_or_else(default_work_dir);
    std::fs::create_dir_all(&work_dir)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(&work_dir).with_source(err))?;

    let mut results = Vec::new();
    for buf_cap in &args.buf_caps {
        for value_size in &args.value_sizes {
            let pool_path = work_dir.join(format!("bench-{buf_cap}-{value_size}.nvm"));
            results.push(bench_append(
                &pool_path,
                args.pool_size,
                *buf_cap,
                *value_size,
                args.inserts,
            )?);
        }
        let pool_path = work_dir.join(format!("bench-cycle-{buf_cap}.nvm"));
        results.push(bench_alloc_free(&pool_path, args.pool_size, *buf_cap)?);
        let pool_path = work_dir.join(format!("bench-recover-{buf_cap}.nvm"));
        results.push(bench_recover(&pool_path, args.pool_size, *buf_cap)?);
    }

    let output = json!({
        "name": "nvmite",
        "version": program_version,
        "ts_unix_ms": now_ms(),
        "system": system_json(),
        "params": {
            "pool_size": args.pool_size,
            "buf_caps": args.buf_caps,
            "value_sizes": args.value_sizes,
            "inserts": args.inserts,
            "work_dir": work_dir.display().to_string(),
            "debug_build": cfg!(debug_assertions),
        },
        "results": results,
    });

    emit_bench_output(output, args.format)
}

fn bench_append(
    pool_path: &Path,
    pool_size: u64,
    buf_cap: u64,
    value_size: usize,
    inserts: u64,
) -> Result<Value, Error> {
    let _ = std::fs::remove_file(pool_path);
    let pool = Pool::open(pool_path, PoolOptions::new(pool_size).with_log_cap(0))?;

    let value = vec![0xA5u8; value_size];
    let mut buf = pool.allocate(buf_cap)?;
    let mut rolls = 0u64;

    let start = Instant::now();
    for _ in 0..inserts {
        match buf.insert(&value) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::Capacity => {
                // Buffer full: reclaim and roll to a fresh carve, the way the
                // engine rolls memtable generations.
                pool.free(buf.base_address())?;
                buf = pool.allocate(buf_cap)?;
                buf.insert(&value)?;
                rolls += 1;
            }
            Err(err) => return Err(err),
        }
    }
    let dur = start.elapsed();

    let notes = format!("{rolls} buffer rolls");
    Ok(result_entry(
        "append",
        pool_size,
        buf_cap,
        value_size as u64,
        inserts,
        dur,
        Some(notes.as_str()),
    ))
}

fn bench_alloc_free(pool_path: &Path, pool_size: u64, buf_cap: u64) -> Result<Value, Error> {
    const CYCLES: u64 = 10_000;

    let _ = std::fs::remove_file(pool_path);
    let pool = Pool::open(pool_path, PoolOptions::new(pool_size).with_log_cap(0))?;

    let start = Instant::now();
    for _ in 0..CYCLES {
        let buf = pool.allocate(buf_cap)?;
        pool.free(buf.base_address())?;
    }
    let dur = start.elapsed();

    Ok(result_entry(
        "alloc_free",
        pool_size,
        buf_cap,
        0,
        CYCLES,
        dur,
        Some("carve + reclaim cycle"),
    ))
}

fn bench_recover(pool_path: &Path, pool_size: u64, buf_cap: u64) -> Result<Value, Error> {
    const CARVES: u64 = 8;

    let _ = std::fs::remove_file(pool_path);
    let options = PoolOptions::new(pool_size).with_log_cap(0);

    let mut records = Vec::new();
    {
        let pool = Pool::open(pool_path, options)?;
        for _ in 0..CARVES {
            let mut buf = pool.allocate(buf_cap)?;
            buf.insert(b"recover-bench-record")?;
            records.push((buf.base_address(), buf.size()));
        }
    }

    let start = Instant::now();
    let pool = Pool::open(pool_path, options)?;
    let handles = pool.recover(&records)?;
    let dur = start.elapsed();

    Ok(result_entry(
        "recover",
        pool_size,
        buf_cap,
        0,
        handles.len() as u64,
        dur,
        Some("reopen + reconstruct carves"),
    ))
}

fn emit_bench_output(value: Value, format: BenchFormat) -> Result<(), Error> {
    match format {
        BenchFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
            );
            Ok(())
        }
        BenchFormat::Table => emit_table(&value),
        BenchFormat::Both => {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
            );
            emit_table(&value)
        }
    }
}

fn emit_table(value: &Value) -> Result<(), Error> {
    let mut stderr = io::stderr().lock();
    writeln!(stderr, "nvmite bench (table)").map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write bench table")
            .with_source(err)
    })?;

    let results = value
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::new(ErrorKind::Internal).with_message("bench results missing"))?;

    writeln!(
        stderr,
        "{:>10}  {:>10}  {:>10}  {:>8}  {:>10}  {:>10}  {}",
        "bench", "buf_cap", "value", "ops", "us/op", "mb/s", "notes"
    )
    .map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write bench table header")
            .with_source(err)
    })?;

    for item in results {
        let bench = item.get("bench").and_then(|v| v.as_str()).unwrap_or("?");
        let buf_cap = item.get("buf_cap").and_then(|v| v.as_u64()).unwrap_or(0);
        let value_bytes = item
            .get("value_bytes")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let ops = item.get("ops").and_then(|v| v.as_u64()).unwrap_or(0);
        let us_per_op = item
            .get("us_per_op")
            .and_then(|v| v.as_f64())
            .unwrap_or(f64::NAN);
        let mb_per_sec = item
            .get("mb_per_sec")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let notes = item.get("notes").and_then(|v| v.as_str()).unwrap_or("");

        writeln!(
            stderr,
            "{:>10}  {:>10}  {:>10}  {:>8}  {:>10.2}  {:>10.1}  {}",
            bench,
            format_bytes(buf_cap),
            format_bytes(value_bytes),
            ops,
            us_per_op,
            mb_per_sec,
            notes
        )
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write bench table row")
                .with_source(err)
        })?;
    }

    Ok(())
}

fn result_entry(
    bench: &str,
    pool_size: u64,
    buf_cap: u64,
    value_bytes: u64,
    ops: u64,
    duration: Duration,
    notes: Option<&str>,
) -> Value {
    let dur_us = duration.as_secs_f64() * 1_000_000.0;
    let op_count = if ops == 0 { 1 } else { ops } as f64;
    let us_per_op = dur_us / op_count;
    let mb = (value_bytes as f64 * ops as f64) / (1024.0 * 1024.0);
    let secs = duration.as_secs_f64().max(1e-9);

    let mut map = BTreeMap::new();
    map.insert("bench".to_string(), json!(bench));
    map.insert("pool_size".to_string(), json!(pool_size));
    map.insert("buf_cap".to_string(), json!(buf_cap));
    map.insert("value_bytes".to_string(), json!(value_bytes));
    map.insert("ops".to_string(), json!(ops));
    map.insert("duration_ms".to_string(), json!(dur_us / 1000.0));
    map.insert("us_per_op".to_string(), json!(us_per_op));
    map.insert("ops_per_sec".to_string(), json!(op_count / secs));
    map.insert("mb_per_sec".to_string(), json!(mb / secs));
    if let Some(notes) = notes {
        map.insert("notes".to_string(), json!(notes));
    }
    Value::Object(map.into_iter().collect())
}

fn system_json() -> Value {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    json!({
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "cpus": cpus,
    })
}

fn default_work_dir() -> PathBuf {
    let pid = std::process::id();
    let ts = now_ms();
    PathBuf::from(".scratch").join(format!("nvmite-bench-{pid}-{ts}"))
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis()
}

fn format_bytes(value: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;

    let v = value as f64;
    if v >= GB {
        format!("{:.1}GiB", v / GB)
    } else if v >= MB {
        format!("{:.1}MiB", v / MB)
    } else if v >= KB {
        format!("{:.1}KiB", v / KB)
    } else {
        format!("{value}B")
    }
}
