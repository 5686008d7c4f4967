use std::fs::File;
use std::io::BufReader;
use std::time::Instant;
use clap::Parser;
use log::{debug, LevelFilter};
use memhier::config::HierarchyConfig;
use memhier::io::load_trace;
use memhier::simulator::Simulator;

#[derive(Parser, Debug)]
#[command(about = String::from("Direct mapped cache simulator over a file backed main memory"))]
struct Args {
    /// JSON hierarchy configuration
    config: String,
    /// Trace of `R <address>` and `W <address> <word>` lines
    trace: String,

    #[arg(short, long)]
    performance: bool,

    /// Log verbosity, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(level_filter(args.verbose))
        .init()
        .map_err(|e| format!("Couldn't initialise logging: {e}"))?;
    let config_file = File::open(&args.config).map_err(|e| format!("Couldn't open the config file at path {}: {e}", args.config))?;
    let config: HierarchyConfig = serde_json::from_reader(BufReader::new(config_file)).map_err(|e| format!("Couldn't parse the config file: {e}"))?;
    debug!("Parsed input configuration: {config:?}");
    let mut simulator = Simulator::new(&config).map_err(|e| format!("Couldn't build the hierarchy: {e}"))?;
    let trace = load_trace(&args.trace).map_err(|e| e.to_string())?;
    let trace = std::str::from_utf8(&trace).map_err(|e| format!("The trace file isn't valid UTF-8: {e}"))?;
    let result = simulator.simulate(trace).map_err(|e| format!("Simulation failed: {e}"))?;
    println!("{}", serde_json::to_string_pretty(result).map_err(|e| format!("Couldn't serialise the output {e}"))?);
    if args.performance {
        let end = Instant::now();
        let simulation_time = simulator.get_execution_time();
        let total_time = end - start;
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_filter(0), LevelFilter::Warn);
        assert_eq!(level_filter(2), LevelFilter::Debug);
        assert_eq!(level_filter(9), LevelFilter::Trace);
    }

    #[test]
    fn parses_arguments() {
        let args = Args::try_parse_from(["memsim", "config.json", "accesses.trace", "-vv", "--performance"]).unwrap();
        assert_eq!(args.config, "config.json");
        assert_eq!(args.trace, "accesses.trace");
        assert_eq!(args.verbose, 2);
        assert!(args.performance);
    }
}
