mod config;
mod consts;
mod dashboard;
mod error_classifier;
mod events;
mod logging;
mod patient;
mod runtime;
mod store;
mod ui;

use crate::config::{Config, get_config_path};
use crate::dashboard::DashboardController;
use crate::patient::calc_age;
use crate::runtime::start_controller;
use crate::store::StoreClient;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{error::Error, io, path::Path};
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Command-line arguments
struct Args {
    /// Command to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the dashboard
    Start {
        /// Run without the terminal UI, logging events to the console.
        #[arg(long)]
        headless: bool,
    },
    /// Create a patient without starting the dashboard.
    AddPatient {
        /// Patient name; must be non-empty after trimming.
        #[arg(long, value_name = "NAME")]
        name: String,

        /// Birth date as an ISO calendar date, YYYY-MM-DD.
        #[arg(long, value_name = "BIRTH_DATE")]
        birth_date: Option<String>,
    },
    /// Print the totals and the most recent patients, then exit.
    Summary,
    /// Save store connection settings (URL and access key) to the config file.
    Connect {
        /// Base URL of the registry store.
        #[arg(long, value_name = "URL")]
        url: String,

        /// Access key for the registry store.
        #[arg(long, value_name = "KEY")]
        key: String,
    },
    /// Remove the saved connection settings.
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    log::set_max_level(logging::get_rust_log_level().into());

    let config_path = get_config_path()?;
    let args = Args::parse();
    match args.command {
        Command::Start { headless } => start(headless, &config_path).await,
        Command::AddPatient { name, birth_date } => {
            add_patient(&config_path, &name, birth_date.as_deref()).await
        }
        Command::Summary => summary(&config_path).await,
        Command::Connect { url, key } => {
            let config = Config::new(url, key);
            config.save(&config_path)?;
            println!("Connection settings saved to {}", config_path.display());
            Ok(())
        }
        Command::Disconnect => {
            println!("Removing saved connection settings...");
            Config::clear(&config_path).map_err(Into::into)
        }
    }
}

/// Builds the controller against the configured store. Configuration errors
/// are fatal here, before any query is attempted.
fn connect_controller(config_path: &Path) -> Result<(DashboardController, String), Box<dyn Error>> {
    let config = Config::resolve(config_path).map_err(|e| format!("{}", e))?;
    let host = display_host(&config.url);
    let client = StoreClient::new(config);
    Ok((DashboardController::new(Box::new(client)), host))
}

fn display_host(url: &str) -> String {
    url.trim_end_matches('/')
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .to_string()
}

async fn add_patient(
    config_path: &Path,
    name: &str,
    birth_date: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let (mut controller, _) = connect_controller(config_path)?;
    match controller.create_patient(name, birth_date).await {
        Ok(()) => {
            // The patient is saved; a failed reload only costs the totals.
            if let Err(e) = controller.refresh().await {
                println!("Patient {} created.", name.trim());
                eprintln!("Warning: could not refresh totals: {}", e);
                return Ok(());
            }
            let view = controller.view();
            println!(
                "Patient {} created ({} patients total).",
                name.trim(),
                view.total_patients
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to create patient: {}", e);
            Err(e.into())
        }
    }
}

async fn summary(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let (mut controller, host) = connect_controller(config_path)?;
    controller.refresh().await?;

    let view = controller.view();
    println!("Store: {}", host);
    println!("Total patients: {}", view.total_patients);
    println!("Total visits: {}", view.total_visits);
    println!("Most recent patients ({}):", view.snapshot.len());
    for patient in &view.snapshot {
        let born = patient
            .birth_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  born {} ({})",
            patient.name,
            born,
            calc_age(patient.birth_date)
        );
    }
    Ok(())
}

/// Starts the dashboard: spawns the controller task, then hands the channel
/// ends to either the TUI or the headless console loop.
async fn start(headless: bool, config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = Config::resolve(config_path).map_err(|e| format!("{}", e))?;
    let host = display_host(&config.url);
    let client = StoreClient::new(config);

    // Create shutdown channel - only one shutdown signal needed
    let (shutdown_sender, _) = broadcast::channel(1);
    let handles = start_controller(Box::new(client), shutdown_sender.subscribe());

    if headless {
        run_headless(handles, shutdown_sender).await
    } else {
        run_tui(host, handles, shutdown_sender).await
    }
}

/// Headless mode: log events to the console until Ctrl+C.
async fn run_headless(
    mut handles: runtime::ControllerHandles,
    shutdown_sender: broadcast::Sender<()>,
) -> Result<(), Box<dyn Error>> {
    // Trigger shutdown on Ctrl+C
    let shutdown_sender_clone = shutdown_sender.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_sender_clone.send(());
        }
    });

    let mut shutdown_receiver = shutdown_sender.subscribe();

    // Event loop: log events to console until shutdown
    loop {
        tokio::select! {
            Some(event) = handles.event_receiver.recv() => {
                if event.should_display() {
                    println!("{}", event);
                }
            }
            // Drain view updates so the controller never hits a full queue.
            Some(_) = handles.update_receiver.recv() => {}
            _ = shutdown_receiver.recv() => {
                break;
            }
        }
    }

    println!("Shutting down...");
    handles.join_handle.await?;
    Ok(())
}

/// TUI mode: alternate screen, raw mode, and the ratatui event loop.
async fn run_tui(
    host: String,
    handles: runtime::ControllerHandles,
    shutdown_sender: broadcast::Sender<()>,
) -> Result<(), Box<dyn Error>> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Initialize the terminal with Crossterm backend.
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = ui::App::new(
        host,
        handles.command_sender,
        handles.update_receiver,
        handles.event_receiver,
        shutdown_sender.clone(),
    );
    let res = ui::run(&mut terminal, app).await;

    // Clean up the terminal after running the application.
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // The UI sends the shutdown signal on quit; send again in case it
    // returned through an error path, then wait for the controller.
    let _ = shutdown_sender.send(());
    handles.join_handle.await?;

    res?;
    Ok(())
}
