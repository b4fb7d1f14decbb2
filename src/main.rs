use clap::Parser;
use mobility_analytics::AnalyticsError;
use mobility_analytics::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        // Dropping the run future on Ctrl-C leaves the result document as it
        // was: it is only written once at the end of a run.
        tokio::select! {
            result = commands::run(args) => result,
            signal = tokio::signal::ctrl_c() => {
                let reason = match signal {
                    Ok(()) => "run interrupted by user".to_string(),
                    Err(e) => format!("signal handler failed: {}", e),
                };
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(AnalyticsError::interrupted(reason).into())
            }
        }
    });

    match result {
        Ok(_summary) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Mobility Analytics - Taxi and Rideshare Trip Analysis");
    println!("=====================================================");
    println!();
    println!("Clean and enrich a month of taxi and rideshare trips, aggregate demand,");
    println!("market share and segments, and train duration, tip and demand models.");
    println!();
    println!("USAGE:");
    println!("    mobility_analytics <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    analyze     Full analysis with the tip and demand models");
    println!("    duration    Train the duration model and merge it into the results");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Analyze a month of trips:");
    println!("    mobility_analytics analyze --taxi yellow_2024-01.parquet \\");
    println!("        --rideshare fhvhv_2024-01.parquet --zones taxi_zone_lookup.csv");
    println!();
    println!("    # Add the duration model to the same result document:");
    println!("    mobility_analytics duration --taxi yellow_2024-01.parquet");
    println!();
    println!("For detailed help on any command, use:");
    println!("    mobility_analytics <COMMAND> --help");
}
