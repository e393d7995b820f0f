//! `grimoireplot` command-line entry point.
//!
//! # Responsibility
//! - Run the dashboard server.
//! - Push sample or live-updating plots to a running server.

mod live;
mod samples;

use clap::{Args, Parser, Subcommand};
use grimoire_client::{push_plot_blocking, PushTarget};
use grimoire_core::{init_logging, GrimoireConfig};
use log::error;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "grimoireplot",
    version,
    about = "GrimoirePlot - Live dashboard for Plotly-compatible plots"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the GrimoirePlot server
    Serve(ServeArgs),
    /// Push sample plots to test the server
    PushSamples(PushSamplesArgs),
    /// Test live plot updates by adding datapoints over time
    LiveTest(LiveTestArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Host to bind (default: from GRIMOIRE_SERVER)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (default: from GRIMOIRE_SERVER)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Server host (default: from GRIMOIRE_SERVER)
    #[arg(long)]
    host: Option<String>,
    /// Server port (default: from GRIMOIRE_SERVER)
    #[arg(long)]
    port: Option<u16>,
    /// Grimoire secret for authentication (default: GRIMOIRE_SECRET)
    #[arg(long)]
    secret: Option<String>,
}

impl TargetArgs {
    fn target(&self, config: &GrimoireConfig) -> PushTarget {
        if self.host.is_none() && self.port.is_none() {
            let secret = self.secret.clone().unwrap_or_else(|| config.secret.clone());
            return PushTarget::new(config.server_url.clone(), secret);
        }
        let host = self.host.as_deref().unwrap_or(&config.host);
        let port = self.port.unwrap_or(config.port);
        PushTarget::new(
            format!("http://{host}:{port}"),
            self.secret.clone().unwrap_or_else(|| config.secret.clone()),
        )
    }
}

#[derive(Debug, Args)]
struct PushSamplesArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Name of the grimoire to create
    #[arg(long, default_value = "test_grimoire")]
    grimoire_name: String,
}

#[derive(Debug, Args)]
struct LiveTestArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Name of the grimoire to create
    #[arg(long, default_value = "live_test")]
    grimoire_name: String,
    /// Interval between datapoints in seconds
    #[arg(long, default_value = "0.2", value_parser = parse_interval)]
    interval: Duration,
    /// Maximum number of points to add (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_points: u64,
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    if seconds <= 0.0 {
        return Err("interval must be positive".to_string());
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GrimoireConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(config.log_level, config.log_dir.as_deref()) {
        eprintln!("logging setup failed: {err}");
        return ExitCode::FAILURE;
    }
    config.log_defaults();

    match cli.command {
        Command::Serve(args) => serve(config, args),
        Command::PushSamples(args) => push_samples(&config, &args),
        Command::LiveTest(args) => live_test(&config, &args),
    }
}

fn serve(mut config: GrimoireConfig, args: ServeArgs) -> ExitCode {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("GrimoirePlot listening on http://{}", config.bind_address());
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    match runtime.block_on(grimoire_server::serve(config, shutdown)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_serve module=cli status=error error={err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn push_samples(config: &GrimoireConfig, args: &PushSamplesArgs) -> ExitCode {
    let target = args.target.target(config);
    let samples = samples::sample_plots();
    let separator = "-".repeat(40);

    println!("Pushing {} sample plots to {}", samples.len(), target.server);
    println!("Grimoire: {}", args.grimoire_name);
    println!("{separator}");

    let mut failures = 0;
    for (chapter, plot, figure) in &samples {
        match push_plot_blocking(&target, &args.grimoire_name, chapter, plot, figure) {
            Ok(_) => println!("  [OK] {chapter}/{plot}"),
            Err(err) => {
                failures += 1;
                println!("  [FAIL] {chapter}/{plot}: {err}");
            }
        }
    }

    println!("{separator}");
    println!("Done!");
    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn live_test(config: &GrimoireConfig, args: &LiveTestArgs) -> ExitCode {
    let target = args.target.target(config);
    let separator = "-".repeat(40);

    println!("Starting live test to {}", target.server);
    println!("Grimoire: {}", args.grimoire_name);
    println!(
        "Adding one datapoint every {} seconds to 2 plots",
        args.interval.as_secs_f64()
    );
    println!("Press Ctrl+C to stop");
    println!("{separator}");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    let points = runtime.block_on(live::run_live_test(
        &target,
        &args.grimoire_name,
        args.interval,
        args.max_points,
    ));

    println!("{separator}");
    println!("Stopped after {points} points");
    println!("Done!");
    ExitCode::SUCCESS
}
