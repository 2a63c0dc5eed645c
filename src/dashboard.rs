//! Dashboard controller: concurrent loading and patient creation.
//!
//! One controller instance owns the dashboard state. `refresh` fans out the
//! three read queries, joins them, and commits all three results together;
//! `create_patient` validates locally and submits the insert. Callers reload
//! after a successful save, so a reload failure is never mistaken for a
//! failed save. Nothing here retries; a failure surfaces once and leaves the
//! previous state on screen.

use crate::consts::cli_consts::SNAPSHOT_LIMIT;
use crate::patient::{NewPatient, Patient};
use crate::store::Store;
use crate::store::error::StoreError;
use chrono::NaiveDate;
use thiserror::Error;

/// Phase of the refresh operation. Replaces a free `loading` boolean so the
/// error case cannot coexist with a supposedly clean load.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Phase of the create operation, independent of the load phase.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum SavePhase {
    #[default]
    Idle,
    Saving,
    Ready,
    Failed(String),
}

#[derive(Debug, Error)]
pub enum CreateError {
    /// Rejected locally; no store call was made.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub const NAME_REQUIRED: &str = "name required";
pub const BAD_BIRTH_DATE: &str = "birth date must be an ISO date (YYYY-MM-DD)";

/// Everything the UI needs to render the dashboard, cloned out of the
/// controller after each operation.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub snapshot: Vec<Patient>,
    pub total_patients: u64,
    pub total_visits: u64,
    pub load_phase: LoadPhase,
    pub save_phase: SavePhase,
}

pub struct DashboardController {
    store: Box<dyn Store>,
    snapshot: Vec<Patient>,
    total_patients: u64,
    total_visits: u64,
    pub load_phase: LoadPhase,
    pub save_phase: SavePhase,
}

impl DashboardController {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self {
            store,
            snapshot: Vec::new(),
            total_patients: 0,
            total_visits: 0,
            load_phase: LoadPhase::default(),
            save_phase: SavePhase::default(),
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            snapshot: self.snapshot.clone(),
            total_patients: self.total_patients,
            total_visits: self.total_visits,
            load_phase: self.load_phase.clone(),
            save_phase: self.save_phase.clone(),
        }
    }

    /// Issues the three reads concurrently and commits the snapshot and both
    /// counters only after all three succeed. Any failure leaves the
    /// previously displayed values untouched.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        self.load_phase = LoadPhase::Loading;

        let result = futures::try_join!(
            self.store.list_recent_patients(SNAPSHOT_LIMIT),
            self.store.count_patients(),
            self.store.count_visits(),
        );

        match result {
            Ok((snapshot, total_patients, total_visits)) => {
                self.snapshot = snapshot;
                self.total_patients = total_patients;
                self.total_visits = total_visits;
                self.load_phase = LoadPhase::Ready;
                Ok(())
            }
            Err(e) => {
                self.load_phase = LoadPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Validates the form input without touching the store.
    ///
    /// An empty trimmed name or an unparsable birth date fails here with no
    /// store call; the save phase carries the message for the form.
    pub fn prepare_patient(
        &mut self,
        name: &str,
        birth_date: Option<&str>,
    ) -> Result<NewPatient, CreateError> {
        let name = name.trim();
        if name.is_empty() {
            self.save_phase = SavePhase::Failed(NAME_REQUIRED.to_string());
            return Err(CreateError::Validation(NAME_REQUIRED.to_string()));
        }

        let birth_date = match birth_date.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    self.save_phase = SavePhase::Failed(BAD_BIRTH_DATE.to_string());
                    return Err(CreateError::Validation(BAD_BIRTH_DATE.to_string()));
                }
            },
        };

        Ok(NewPatient {
            name: name.to_string(),
            birth_date,
        })
    }

    /// Submits a prepared insert. A store failure preserves the caller's form
    /// state for retry; only the phase and error message change here.
    pub async fn submit_patient(&mut self, patient: NewPatient) -> Result<(), StoreError> {
        self.save_phase = SavePhase::Saving;
        match self.store.insert_patient(patient).await {
            Ok(()) => {
                self.save_phase = SavePhase::Ready;
                Ok(())
            }
            Err(e) => {
                self.save_phase = SavePhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Validates and submits a single insert. The snapshot and counters are
    /// not reloaded here; refresh separately once the save has succeeded.
    pub async fn create_patient(
        &mut self,
        name: &str,
        birth_date: Option<&str>,
    ) -> Result<(), CreateError> {
        let patient = self.prepare_patient(name, birth_date)?;
        self.submit_patient(patient).await?;
        Ok(())
    }
}
