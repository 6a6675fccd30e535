use std::path::PathBuf;
use std::process;

use caress_raw::{CaressError, ParseStatus, RawfileSession, ReadOptions, Section, Values};
use clap::Parser;

#[derive(Parser)]
#[command(name = "caress-dump", about = "List the data units of a CARESS raw data file")]
struct Cli {
    /// Path to the raw data file
    file: PathBuf,

    /// Report 64-bit integers as doubles
    #[arg(long)]
    int64_as_double: bool,

    /// Treat the file as still being written
    #[arg(long)]
    monitoring: bool,

    /// Number of decoded values to print per unit
    #[arg(long, default_value_t = 4)]
    values: usize,

    /// Read SECTION:START:COUNT items of every unit large enough
    #[arg(long, value_parser = parse_partition)]
    partition: Option<(Section, u64, u64)>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_partition(s: &str) -> Result<(Section, u64, u64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [section, start, count] = parts.as_slice() else {
        return Err("expected SECTION:START:COUNT".to_string());
    };
    let section = match *section {
        "1" => Section::First,
        "2" => Section::Second,
        other => return Err(format!("section must be 1 or 2, got {}", other)),
    };
    let start = start.parse::<u64>().map_err(|e| format!("bad start: {}", e))?;
    let count = count.parse::<u64>().map_err(|e| format!("bad count: {}", e))?;
    Ok((section, start, count))
}

fn preview(values: &Values, n: usize) -> String {
    fn list<T: std::fmt::Debug>(v: &[T], n: usize) -> String {
        let shown: Vec<String> = v.iter().take(n).map(|x| format!("{:?}", x)).collect();
        let more = if v.len() > n { format!(" ... (+{})", v.len() - n) } else { String::new() };
        format!("[{}]{}", shown.join(", "), more)
    }
    match values {
        Values::Int16(v) => list(v, n),
        Values::Int32(v) => list(v, n),
        Values::Int64(v) => list(v, n),
        Values::Float32(v) => list(v, n),
        Values::Float64(v) => list(v, n),
        Values::Text(s) => format!("{:?}", s),
        Values::Empty => "-".to_string(),
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let options = ReadOptions::new()
        .int64_as_double(cli.int64_as_double)
        .monitoring(cli.monitoring);

    println!("Reading CARESS file: {}", cli.file.display());
    println!("{}", "=".repeat(60));

    let mut session = match RawfileSession::open_with(&cli.file, options) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("\nERROR: Failed to open data file");
            eprintln!("  {}", e);
            process::exit(1);
        }
    };

    let mut units = 0usize;
    let mut failed = 0usize;
    let outcome = loop {
        let unit = match session.next_unit() {
            Ok(ParseStatus::Unit(unit)) => unit,
            Ok(status) => break status,
            Err(e) if e.is_fatal() || matches!(e, CaressError::Io(_)) => {
                eprintln!("\nERROR: Cannot continue reading data file");
                eprintln!("  {}", e);
                process::exit(1);
            }
            Err(e) => {
                eprintln!("  warning: {}", e);
                failed += 1;
                continue;
            }
        };
        units += 1;
        let last = if session.is_last_of_element() { " *" } else { "" };
        let kind = unit.element_kind.map_or("-".to_string(), |k| k.to_string());
        print!(
            "{:>5} {:<8} {:<10} {:<10} {:<10} {:>8}{}",
            unit.element_number,
            kind,
            unit.element,
            unit.node,
            unit.value_type.to_string(),
            unit.count,
            last
        );
        if cli.values > 0 {
            match session.read_values(&unit) {
                Ok(values) => print!("  {}", preview(&values, cli.values)),
                Err(e) => print!("  <{}>", e),
            }
        }
        println!();

        if let Some((section, start, count)) = cli.partition {
            let fits = start.checked_add(count).is_some_and(|end| unit.count >= end);
            if unit.value_type.width() > 0 && fits {
                match session.read_partition(&unit, section, start, count, unit.value_type) {
                    Ok(bytes) => println!(
                        "      partition [{}, {}): {} bytes",
                        start,
                        start + count,
                        bytes.len()
                    ),
                    Err(e) => println!("      partition failed: {}", e),
                }
            }
        }
    };

    println!("\n{}", "=".repeat(60));
    match outcome {
        ParseStatus::PreliminaryEof => println!("Stopped at preliminary end of file."),
        _ => println!("SUCCESS! Reading completed."),
    }
    println!("{}", "=".repeat(60));
    println!("\nStatistics:");
    println!("  Data units: {}", units);
    println!("  Element descriptors: {}", session.descriptor_count());
    if failed > 0 {
        println!("  Units with errors: {}", failed);
    }
    session.close();
}
