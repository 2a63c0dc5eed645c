// Module declarations
mod app;
pub mod dashboard;
mod form;
pub mod splash;
// Re-exports for external use
pub use app::{App, run};
