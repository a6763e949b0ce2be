//! Main application orchestration and execution

use crate::{
    cli::Cli,
    clock::MonotonicClock,
    config::{display_config_summary, load_config, validate_config, EnvManager, ValidationLevel},
    error::{AppError, ErrorContext, Result},
    log_debug,
    executor::{run_initiator, run_local, run_responder, RunOutcome},
    logging::{ErrorEventLogger, LoggerFactory, RunLogger, TransportLogger},
    models::{Config, RunConfig},
    output::{ReportFormatter, ReportSummary, RunBanner},
    protocol::{INITIATOR_RANK, RESPONDER_RANK},
    transport::TcpTransport,
    types::TransportMode,
};
use std::io::{self, BufWriter};

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

/// Loggers shared by one invocation
struct Loggers {
    run: RunLogger,
    transport: TransportLogger,
    errors: ErrorEventLogger,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;
        Ok(Self { cli })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        if self.cli.env_help {
            println!("{}", EnvManager::display_env_help());
            return Ok(());
        }
        if let Some(path) = &self.cli.write_env_example {
            EnvManager::save_example_env_file(path)?;
            eprintln!("Wrote example configuration to {}", path.display());
            return Ok(());
        }

        if self.cli.debug {
            eprintln!("{}", crate::build_info::describe());
            eprintln!("{}", self.cli.get_config_summary());
        }

        let config = load_config(self.cli.clone())?;
        let warnings = validate_config(&config)?;

        if config.debug {
            eprintln!("Configuration Summary:");
            eprintln!("{}", display_config_summary(&config));
        }

        for warning in &warnings {
            if warning.level != ValidationLevel::Info || config.verbose || config.debug {
                eprintln!("{}", warning.format(config.enable_color));
            }
        }

        if !crate::build_info::OPTIMIZED && (config.verbose || config.debug) {
            eprintln!("Note: unoptimized build, latencies include debug overhead");
        }

        let factory = LoggerFactory::new(config.clone());
        let app_logger = factory.create_logger("APP").await;
        log_debug!(
            app_logger,
            "Session {} with {} warnings, {} transport",
            factory.session_id(),
            warnings.len(),
            config.transport
        );
        let loggers = Loggers {
            run: factory.create_run_logger().await,
            transport: factory.create_transport_logger().await,
            errors: factory.create_error_logger().await,
        };

        match Self::execute(&config, config.run_config(), &loggers).await {
            Ok(()) => Ok(()),
            Err(e) => {
                loggers.errors.log_error(&e, Some("Run aborted")).await;
                Err(e)
            }
        }
    }

    async fn execute(config: &Config, run: RunConfig, loggers: &Loggers) -> Result<()> {
        let banner = RunBanner::new(config.enable_color);

        match (config.transport, config.rank) {
            (TransportMode::Local, _) => {
                loggers.transport.log_local_pair().await;
                if config.verbose {
                    eprintln!("{}", banner.header(&run, "local"));
                }
                loggers.run.log_run_start(&run).await;

                let outcome = run_local(run, MonotonicClock::new(), Some(loggers.run.clone())).await?;
                Self::finish(config, &run, outcome, loggers, &banner).await
            }
            (TransportMode::Tcp, 1) => {
                loggers.transport.log_listening(&config.address, RESPONDER_RANK).await;
                let transport = TcpTransport::listen(&config.address, RESPONDER_RANK, INITIATOR_RANK).await?;
                loggers.transport.log_connection(&config.address, true, None).await;

                let summary = run_responder(transport, Some(loggers.run.clone())).await?;
                loggers.run.log_responder_summary(&summary).await;
                if config.verbose {
                    eprintln!(
                        "Responder done: {} payloads handled, {} echoed",
                        summary.handled, summary.echoed
                    );
                }
                Ok(())
            }
            (TransportMode::Tcp, 0) => {
                let transport = match TcpTransport::connect(
                    &config.address,
                    INITIATOR_RANK,
                    RESPONDER_RANK,
                    config.connect_timeout(),
                )
                .await
                {
                    Ok(transport) => transport,
                    Err(e) => {
                        let reason = e.to_string();
                        loggers.transport.log_connection(&config.address, false, Some(&reason)).await;
                        return Err(e);
                    }
                };
                loggers.transport.log_connection(&config.address, true, None).await;

                if config.verbose {
                    eprintln!("{}", banner.header(&run, &format!("tcp {}", config.address)));
                }
                loggers.run.log_run_start(&run).await;

                let outcome = run_initiator(transport, run, MonotonicClock::new(), Some(loggers.run.clone())).await?;
                Self::finish(config, &run, outcome, loggers, &banner).await
            }
            (TransportMode::Tcp, rank) => Err(AppError::validation(format!("Rank must be 0 or 1, got {}", rank))),
        }
    }

    /// Print the report and the closing summaries
    async fn finish(
        config: &Config,
        run: &RunConfig,
        mut outcome: RunOutcome,
        loggers: &Loggers,
        banner: &RunBanner,
    ) -> Result<()> {
        let ledger = std::mem::take(&mut outcome.ledger);
        let report = write_stdout_report(run, ledger)?;

        loggers.run.log_run_summary(&outcome, report.lines).await;
        if let Some(responder) = &outcome.responder {
            loggers.run.log_responder_summary(responder).await;
        }
        if config.verbose {
            eprintln!("{}", banner.footer(&report, outcome.elapsed, outcome.responder.as_ref()));
        }
        Ok(())
    }
}

fn write_stdout_report(run: &RunConfig, ledger: crate::ledger::Ledger) -> Result<ReportSummary> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    ReportFormatter::from_run(run)
        .write_report(ledger, &mut out)
        .context("Writing report to stdout")
}
