//! Controller task plumbing.
//!
//! The dashboard controller runs in its own tokio task so the UI never blocks
//! on the network. Commands flow in over an mpsc channel; cloned view state
//! and activity-log events flow back out. A shutdown broadcast stops the
//! task; an in-flight operation finishes against the controller's own state
//! and its result is dropped with the task, never delivered to a torn-down
//! UI.

use crate::consts::cli_consts::EVENT_QUEUE_SIZE;
use crate::dashboard::{DashboardController, DashboardView, LoadPhase, SavePhase};
use crate::error_classifier::ErrorClassifier;
use crate::events::{Event, EventType};
use crate::logging::LogLevel;
use crate::store::Store;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Commands the UI can issue against the controller.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Command {
    Refresh,
    CreatePatient {
        name: String,
        birth_date: Option<String>,
    },
}

/// Channel ends handed to the UI (or the headless console loop).
pub struct ControllerHandles {
    pub command_sender: mpsc::Sender<Command>,
    pub update_receiver: mpsc::Receiver<DashboardView>,
    pub event_receiver: mpsc::Receiver<Event>,
    pub join_handle: JoinHandle<()>,
}

/// Spawns the controller task and performs the initial load.
pub fn start_controller(
    store: Box<dyn Store>,
    mut shutdown_receiver: broadcast::Receiver<()>,
) -> ControllerHandles {
    let (command_sender, mut command_receiver) = mpsc::channel::<Command>(EVENT_QUEUE_SIZE);
    let (update_sender, update_receiver) = mpsc::channel::<DashboardView>(EVENT_QUEUE_SIZE);
    let (event_sender, event_receiver) = mpsc::channel::<Event>(EVENT_QUEUE_SIZE);

    let join_handle = tokio::spawn(async move {
        let mut controller = DashboardController::new(store);
        let classifier = ErrorClassifier::new();

        // Initial load, same path as a manual refresh.
        handle_refresh(&mut controller, &classifier, &update_sender, &event_sender).await;

        loop {
            tokio::select! {
                _ = shutdown_receiver.recv() => break,
                command = command_receiver.recv() => match command {
                    None => break,
                    Some(Command::Refresh) => {
                        handle_refresh(&mut controller, &classifier, &update_sender, &event_sender)
                            .await;
                    }
                    Some(Command::CreatePatient { name, birth_date }) => {
                        handle_create(
                            &mut controller,
                            &classifier,
                            &update_sender,
                            &event_sender,
                            &name,
                            birth_date.as_deref(),
                        )
                        .await;
                    }
                },
            }
        }

        push_event(
            &event_sender,
            Event::loader(
                "Dashboard controller stopped".to_string(),
                EventType::Shutdown,
                LogLevel::Info,
            ),
        );
    });

    ControllerHandles {
        command_sender,
        update_receiver,
        event_receiver,
        join_handle,
    }
}

/// Non-blocking sends: if the UI is gone or saturated, state and log lines
/// are dropped rather than stalling the controller.
fn push_view(update_sender: &mpsc::Sender<DashboardView>, controller: &DashboardController) {
    let _ = update_sender.try_send(controller.view());
}

fn push_event(event_sender: &mpsc::Sender<Event>, event: Event) {
    let _ = event_sender.try_send(event);
}

async fn handle_refresh(
    controller: &mut DashboardController,
    classifier: &ErrorClassifier,
    update_sender: &mpsc::Sender<DashboardView>,
    event_sender: &mpsc::Sender<Event>,
) {
    push_event(
        event_sender,
        Event::loader(
            "Refreshing dashboard...".to_string(),
            EventType::Refresh,
            LogLevel::Info,
        ),
    );
    controller.load_phase = LoadPhase::Loading;
    push_view(update_sender, controller);

    match controller.refresh().await {
        Ok(()) => {
            let view = controller.view();
            push_event(
                event_sender,
                Event::loader(
                    format!(
                        "Loaded {} patients ({} total, {} visits)",
                        view.snapshot.len(),
                        view.total_patients,
                        view.total_visits
                    ),
                    EventType::Success,
                    LogLevel::Info,
                ),
            );
        }
        Err(e) => {
            let log_level = classifier.classify_store_error(&e);
            push_event(
                event_sender,
                Event::loader(
                    format!("Failed to refresh dashboard: {}", e),
                    EventType::Error,
                    log_level,
                ),
            );
        }
    }
    push_view(update_sender, controller);
}

async fn handle_create(
    controller: &mut DashboardController,
    classifier: &ErrorClassifier,
    update_sender: &mpsc::Sender<DashboardView>,
    event_sender: &mpsc::Sender<Event>,
    name: &str,
    birth_date: Option<&str>,
) {
    let patient = match controller.prepare_patient(name, birth_date) {
        Ok(patient) => patient,
        Err(e) => {
            push_event(
                event_sender,
                Event::creator(e.to_string(), EventType::Error, LogLevel::Warn),
            );
            push_view(update_sender, controller);
            return;
        }
    };

    // Publish the in-flight save before awaiting so the form can show it.
    controller.save_phase = SavePhase::Saving;
    push_view(update_sender, controller);

    match controller.submit_patient(patient).await {
        Ok(()) => {
            push_event(
                event_sender,
                Event::creator(
                    format!("Patient {} created", name.trim()),
                    EventType::Success,
                    LogLevel::Info,
                ),
            );
            push_view(update_sender, controller);
            // The patient is saved at this point. The reload is its own
            // operation and reports its own failure through the loader.
            handle_refresh(controller, classifier, update_sender, event_sender).await;
        }
        Err(e) => {
            let log_level = classifier.classify_store_error(&e);
            push_event(
                event_sender,
                Event::creator(
                    format!("Failed to save patient: {}", e),
                    EventType::Error,
                    log_level,
                ),
            );
            push_view(update_sender, controller);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Source;
    use crate::store::MockStore;
    use crate::store::error::StoreError;

    fn refresh_ok(store: &mut MockStore, times: usize) {
        store
            .expect_list_recent_patients()
            .times(times)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_count_patients()
            .times(times)
            .returning(|| Ok(0));
        store.expect_count_visits().times(times).returning(|| Ok(0));
    }

    #[tokio::test]
    // Startup performs one load and publishes the resulting view.
    async fn test_start_controller_performs_initial_load() {
        let mut store = MockStore::new();
        refresh_ok(&mut store, 1);

        let (shutdown_sender, _) = broadcast::channel(1);
        let mut handles = start_controller(Box::new(store), shutdown_sender.subscribe());

        // Loading view first, then the committed one.
        let first = handles.update_receiver.recv().await.unwrap();
        assert_eq!(first.load_phase, LoadPhase::Loading);
        let second = handles.update_receiver.recv().await.unwrap();
        assert_eq!(second.load_phase, LoadPhase::Ready);

        let _ = shutdown_sender.send(());
        handles.join_handle.await.unwrap();
    }

    #[tokio::test]
    // A create command inserts, reloads once, and publishes the saved state.
    async fn test_create_command_round_trip() {
        let mut store = MockStore::new();
        refresh_ok(&mut store, 2); // initial load + post-create reload
        store.expect_insert_patient().times(1).returning(|_| Ok(()));

        let (shutdown_sender, _) = broadcast::channel(1);
        let mut handles = start_controller(Box::new(store), shutdown_sender.subscribe());

        handles
            .command_sender
            .send(Command::CreatePatient {
                name: "Ana".to_string(),
                birth_date: None,
            })
            .await
            .unwrap();

        // Drain views until the save phase reports completion.
        let mut saved = false;
        for _ in 0..10 {
            let view = handles.update_receiver.recv().await.unwrap();
            if view.save_phase == SavePhase::Ready {
                saved = true;
                break;
            }
        }
        assert!(saved, "never observed a completed save");

        let _ = shutdown_sender.send(());
        handles.join_handle.await.unwrap();
    }

    #[tokio::test]
    // Dropping the command sender stops the task without a shutdown signal,
    // and the task announces its exit with a shutdown event.
    async fn test_controller_stops_when_commands_close() {
        let mut store = MockStore::new();
        refresh_ok(&mut store, 1);

        let (shutdown_sender, _) = broadcast::channel(1);
        let mut handles = start_controller(Box::new(store), shutdown_sender.subscribe());

        drop(handles.command_sender);
        handles.join_handle.await.unwrap();

        let mut last = None;
        while let Ok(event) = handles.event_receiver.try_recv() {
            last = Some(event);
        }
        assert!(
            matches!(last, Some(event) if event.event_type == EventType::Shutdown),
            "last event should announce the shutdown"
        );
    }

    #[tokio::test]
    // The in-flight save is visible to the UI: a view carrying the saving
    // phase is published before the completed one.
    async fn test_create_publishes_saving_view_before_completion() {
        let mut store = MockStore::new();
        refresh_ok(&mut store, 2); // initial load + post-create reload
        store.expect_insert_patient().times(1).returning(|_| Ok(()));

        let (shutdown_sender, _) = broadcast::channel(1);
        let mut handles = start_controller(Box::new(store), shutdown_sender.subscribe());

        handles
            .command_sender
            .send(Command::CreatePatient {
                name: "Ana".to_string(),
                birth_date: None,
            })
            .await
            .unwrap();
        drop(handles.command_sender);
        handles.join_handle.await.unwrap();

        let mut phases = Vec::new();
        while let Ok(view) = handles.update_receiver.try_recv() {
            phases.push(view.save_phase);
        }
        let saving = phases.iter().position(|p| *p == SavePhase::Saving);
        let ready = phases.iter().position(|p| *p == SavePhase::Ready);
        assert!(saving.is_some(), "no published view carried an in-flight save");
        assert!(ready.is_some(), "no published view carried a completed save");
        assert!(saving < ready, "the saving view must precede the completed one");
    }

    #[tokio::test]
    // A reload failure after a successful insert is the loader's error. The
    // save still completes, so the form must not invite a duplicate retry.
    async fn test_reload_failure_after_insert_is_not_a_save_failure() {
        let mut store = MockStore::new();
        store.expect_insert_patient().times(1).returning(|_| Ok(()));
        store
            .expect_list_recent_patients()
            .times(2)
            .returning(|_| Ok(Vec::new()));
        store.expect_count_patients().times(2).returning(|| Ok(0));
        let mut visits = mockall::Sequence::new();
        store
            .expect_count_visits()
            .times(1)
            .in_sequence(&mut visits)
            .returning(|| Ok(0));
        store
            .expect_count_visits()
            .times(1)
            .in_sequence(&mut visits)
            .returning(|| {
                Err(StoreError::Http {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            });

        let (shutdown_sender, _) = broadcast::channel(1);
        let mut handles = start_controller(Box::new(store), shutdown_sender.subscribe());

        handles
            .command_sender
            .send(Command::CreatePatient {
                name: "Ana".to_string(),
                birth_date: None,
            })
            .await
            .unwrap();
        drop(handles.command_sender);
        handles.join_handle.await.unwrap();

        let mut last_view = None;
        while let Ok(view) = handles.update_receiver.try_recv() {
            last_view = Some(view);
        }
        let view = last_view.unwrap();
        assert_eq!(view.save_phase, SavePhase::Ready);
        assert!(matches!(view.load_phase, LoadPhase::Failed(_)));

        let mut events = Vec::new();
        while let Ok(event) = handles.event_receiver.try_recv() {
            events.push(event);
        }
        assert!(
            events
                .iter()
                .any(|e| e.source == Source::Creator && e.event_type == EventType::Success),
            "the save must be reported as a success"
        );
        assert!(
            !events
                .iter()
                .any(|e| e.source == Source::Creator && e.event_type == EventType::Error),
            "the save must not be reported as failed"
        );
        assert!(
            events
                .iter()
                .any(|e| e.source == Source::Loader && e.event_type == EventType::Error),
            "the reload failure must be reported by the loader"
        );
    }
}
