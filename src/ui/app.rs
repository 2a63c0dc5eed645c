//! Main application state and UI loop
//!
//! Contains the App struct and main UI event handling logic

use crate::dashboard::{DashboardView, LoadPhase, SavePhase};
use crate::events::Event as ControllerEvent;
use crate::runtime::Command;
use crate::ui::dashboard::{DashboardState, render_dashboard};
use crate::ui::form::{FormState, render_form};
use crate::ui::splash::render_splash;
use crossterm::event::{self, Event, KeyCode};
use ratatui::{Frame, Terminal, backend::Backend};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};

/// The different screens in the application.
#[derive(Debug)]
pub enum Screen {
    /// Splash screen shown at the start of the application.
    Splash,
    /// Dashboard screen displaying the snapshot, counters and activity log.
    Dashboard,
    /// New-patient form, rendered over the dashboard state.
    NewPatient(Box<FormState>),
}

/// Application state
#[derive(Debug)]
pub struct App {
    /// The current screen being displayed in the application.
    current_screen: Screen,

    /// Dashboard state shared by every screen.
    dashboard: DashboardState,

    /// Sends commands to the controller task.
    command_sender: mpsc::Sender<Command>,

    /// Receives view updates from the controller task.
    update_receiver: mpsc::Receiver<DashboardView>,

    /// Receives activity-log events from the controller task.
    event_receiver: mpsc::Receiver<ControllerEvent>,

    /// Broadcasts shutdown signal to the controller task.
    shutdown_sender: broadcast::Sender<()>,
}

impl App {
    /// Creates a new instance of the application.
    pub fn new(
        store_host: String,
        command_sender: mpsc::Sender<Command>,
        update_receiver: mpsc::Receiver<DashboardView>,
        event_receiver: mpsc::Receiver<ControllerEvent>,
        shutdown_sender: broadcast::Sender<()>,
    ) -> Self {
        Self {
            current_screen: Screen::Splash,
            dashboard: DashboardState::new(store_host),
            command_sender,
            update_receiver,
            event_receiver,
            shutdown_sender,
        }
    }

    /// Applies a controller view update, closing or annotating the form when
    /// a submission has settled.
    fn apply_view(&mut self, view: DashboardView) {
        let close_form = matches!(
            (&self.current_screen, &view.save_phase),
            (Screen::NewPatient(form), SavePhase::Ready) if form.submitted
        );
        if close_form {
            self.current_screen = Screen::Dashboard;
        } else if let Screen::NewPatient(form) = &mut self.current_screen {
            if form.submitted {
                if let SavePhase::Failed(msg) = &view.save_phase {
                    form.error = Some(msg.clone());
                    form.submitted = false;
                }
            }
        }
        self.dashboard.view = view;
    }

    fn saving(&self) -> bool {
        self.dashboard.view.save_phase == SavePhase::Saving
    }

    fn loading(&self) -> bool {
        self.dashboard.view.load_phase == LoadPhase::Loading
    }
}

/// Runs the application UI in a loop, handling events and rendering the
/// appropriate screen.
pub async fn run<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> std::io::Result<()> {
    let splash_start = Instant::now();
    let splash_duration = Duration::from_secs(2);

    // UI event loop
    loop {
        // Apply controller view updates
        while let Ok(view) = app.update_receiver.try_recv() {
            app.apply_view(view);
        }

        // Queue all incoming events for the activity log
        while let Ok(event) = app.event_receiver.try_recv() {
            app.dashboard.add_event(event);
        }

        terminal.draw(|f| render(f, &app))?;

        // Handle splash-to-dashboard transition
        if let Screen::Splash = app.current_screen {
            if splash_start.elapsed() >= splash_duration {
                app.current_screen = Screen::Dashboard;
                continue;
            }
        }

        // Poll for key events
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                // Skip events that are not KeyEventKind::Press
                if key.kind == event::KeyEventKind::Release {
                    continue;
                }

                let mut close_form = false;
                match &mut app.current_screen {
                    Screen::Splash => {
                        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                            let _ = app.shutdown_sender.send(());
                            return Ok(());
                        }
                        // Any other key press skips the splash screen
                        app.current_screen = Screen::Dashboard;
                    }
                    Screen::Dashboard => match key.code {
                        KeyCode::Esc | KeyCode::Char('q') => {
                            let _ = app.shutdown_sender.send(());
                            return Ok(());
                        }
                        KeyCode::Char('r') => {
                            // Ignore re-entrant refreshes while one is in flight
                            if !app.loading() {
                                let _ = app.command_sender.try_send(Command::Refresh);
                            }
                        }
                        KeyCode::Char('n') => {
                            app.current_screen = Screen::NewPatient(Box::new(FormState::new()));
                        }
                        _ => {}
                    },
                    Screen::NewPatient(form) => {
                        let saving = app.dashboard.view.save_phase == SavePhase::Saving;
                        match key.code {
                            KeyCode::Esc => close_form = true,
                            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
                            KeyCode::Backspace => {
                                form.active_value_mut().pop();
                            }
                            KeyCode::Enter => {
                                if !saving && !form.submitted {
                                    form.error = None;
                                    form.submitted = true;
                                    let birth_date = Some(form.birth_date.trim().to_string())
                                        .filter(|s| !s.is_empty());
                                    let _ = app.command_sender.try_send(Command::CreatePatient {
                                        name: form.name.clone(),
                                        birth_date,
                                    });
                                }
                            }
                            KeyCode::Char(c) => form.active_value_mut().push(c),
                            _ => {}
                        }
                    }
                }
                if close_form {
                    app.current_screen = Screen::Dashboard;
                }
            }
        }
    }
}

/// Renders the current screen based on the application state.
fn render(f: &mut Frame, app: &App) {
    match &app.current_screen {
        Screen::Splash => render_splash(f),
        Screen::Dashboard => render_dashboard(f, &app.dashboard),
        Screen::NewPatient(form) => {
            render_dashboard(f, &app.dashboard);
            render_form(f, form, app.saving());
        }
    }
}
