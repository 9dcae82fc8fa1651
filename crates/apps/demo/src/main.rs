mod config;
mod console;

use std::sync::Arc;

use catalog::{InMemoryMapProvider, MapProvider};
use clap::Parser;
use session::{
    BootstrapEvent, BootstrapGate, DatasetSessionCoordinator, HttpSampleSource, SampleDataSource,
    StaticSampleSource,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Args, DemoConfig};
use crate::console::Command;

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = DemoConfig::from_env(Args::parse());
    info!("starting with {:?}", config.map);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {e}"))?;
    runtime.block_on(run(config))
}

async fn run(config: DemoConfig) -> Result<(), String> {
    let provider: Arc<dyn MapProvider> =
        Arc::new(InMemoryMapProvider::new().with_startup_delay(config.map_init_delay));
    let source: Arc<dyn SampleDataSource> = match &config.sample_url {
        Some(url) => Arc::new(
            HttpSampleSource::new(url.clone(), config.fetch_timeout)
                .map_err(|e| format!("cannot build HTTP client: {e}"))?,
        ),
        None => Arc::new(StaticSampleSource::builtin().with_delay(config.sample_delay)),
    };

    let gate = BootstrapGate::start(provider, config.map.clone(), source);
    let mut coordinator = DatasetSessionCoordinator::new();

    match config.script {
        Some(script) => run_script(gate, &mut coordinator, &script).await,
        None => run_interactive(gate, &mut coordinator).await,
    }
}

/// Waits for startup, then runs each command in order.
async fn run_script(
    gate: BootstrapGate,
    coordinator: &mut DatasetSessionCoordinator,
    script: &[String],
) -> Result<(), String> {
    let readiness = gate.drive(coordinator).await;
    println!("{readiness}");
    for line in script {
        println!("> {line}");
        if !handle_line(coordinator, line) {
            break;
        }
    }
    Ok(())
}

/// Reads commands from stdin while startup is still in flight.
async fn run_interactive(
    gate: BootstrapGate,
    coordinator: &mut DatasetSessionCoordinator,
) -> Result<(), String> {
    println!("{}", console::HELP);
    println!("Controls disabled. {}", coordinator.readiness());

    let mut gate = Some(gate);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = next_bootstrap_event(&mut gate) => match event {
                Some(event) => on_bootstrap_event(coordinator, event),
                None => {
                    gate = None;
                    coordinator.on_bootstrap_closed();
                    if !coordinator.controls_enabled() {
                        println!("{}", coordinator.readiness());
                    }
                }
            },
            line = lines.next_line() => {
                let line = line.map_err(|e| format!("cannot read stdin: {e}"))?;
                match line {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        if !handle_line(coordinator, &line) {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
    Ok(())
}

async fn next_bootstrap_event(gate: &mut Option<BootstrapGate>) -> Option<BootstrapEvent> {
    match gate {
        Some(gate) => gate.next_event().await,
        None => std::future::pending().await,
    }
}

fn on_bootstrap_event(coordinator: &mut DatasetSessionCoordinator, event: BootstrapEvent) {
    let failed = matches!(event, BootstrapEvent::Failed(_));
    coordinator.apply(event);
    let readiness = coordinator.readiness();
    if failed {
        warn!("startup failed");
        println!("{readiness}");
    } else if readiness.is_ready() {
        println!("Ready. Controls enabled.");
    } else {
        println!("Controls disabled. {readiness}");
    }
}

/// Returns `false` when the user asked to quit.
fn handle_line(coordinator: &mut DatasetSessionCoordinator, line: &str) -> bool {
    match line.parse::<Command>() {
        Ok(Command::Quit) => return false,
        Ok(Command::Help) => println!("{}", console::HELP),
        Ok(Command::Status) => print!("{}", console::status(coordinator)),
        Ok(Command::Op(op)) => println!("{}", console::run_op(coordinator, op)),
        Err(e) => println!("{e}"),
    }
    true
}
