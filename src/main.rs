//! Ping-pong Latency Benchmark - Main CLI Application
//!
//! Runs the initiator and responder either in one process or as two
//! processes connected over TCP, and prints one latency per line on stdout.

use clap::Parser;
use pingpong_latency::{
    app::App,
    cli::Cli,
    error::{AppError, ErrorReporter},
};
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue together with the command line you used.");
        process::exit(1);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    if let Err(e) = run_application(cli).await {
        eprint!("Error: ");
        reporter.report_error(&e);

        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

async fn run_application(cli: Cli) -> Result<(), AppError> {
    App::new(cli)?.run().await
}

/// Print category-specific hints after an error
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) | AppError::Parse(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Units must be one of s, ms, us, ns");
            eprintln!("  - Message size must be at least 1 byte");
            eprintln!("  - Run with --env-help to list PINGPONG_* variables");
        }
        AppError::Setup(_) => {
            eprintln!();
            eprintln!("Connection help:");
            eprintln!("  - Start the responder first: pingpong --transport tcp --rank 1");
            eprintln!("  - Use the same --address on both ends");
            eprintln!("  - Raise --connect-timeout if the responder starts slowly");
        }
        AppError::Transport(_) | AppError::Protocol(_) => {
            eprintln!();
            eprintln!("Exchange troubleshooting:");
            eprintln!("  - Check that the peer is still running");
            eprintln!("  - Run the same pingpong version on both ends");
        }
        AppError::Allocation(_) => {
            eprintln!();
            eprintln!("Memory help:");
            eprintln!("  - Shorten --duration or lower --iterations");
            eprintln!("  - Reduce --page-size");
        }
        _ => {}
    }
}
