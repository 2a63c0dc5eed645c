pub mod cli_consts {
    //! Dashboard Configuration Constants
    //!
    //! This module contains all configuration constants for the dashboard,
    //! organized by functional area for clarity and maintainability.

    // =============================================================================
    // SNAPSHOT CONFIGURATION
    // =============================================================================

    /// Maximum number of patients held in the dashboard snapshot, newest first.
    pub const SNAPSHOT_LIMIT: u32 = 50;

    // =============================================================================
    // QUEUE CONFIGURATION
    // =============================================================================

    /// The maximum number of events to keep in the activity logs.
    pub const MAX_ACTIVITY_LOGS: usize = 100;

    /// Buffer size of the channels between the controller task and the UI.
    pub const EVENT_QUEUE_SIZE: usize = 100;

    // =============================================================================
    // NETWORK CONFIGURATION
    // =============================================================================

    /// HTTP client timeouts. No retry or backoff happens above the transport;
    /// a failed request surfaces directly as a store error.
    pub mod http {
        use std::time::Duration;

        /// Connect timeout for store requests (seconds)
        pub const CONNECT_TIMEOUT_SECS: u64 = 10;

        /// End-to-end timeout for store requests (seconds)
        pub const REQUEST_TIMEOUT_SECS: u64 = 10;

        pub const fn connect_timeout() -> Duration {
            Duration::from_secs(CONNECT_TIMEOUT_SECS)
        }

        pub const fn request_timeout() -> Duration {
            Duration::from_secs(REQUEST_TIMEOUT_SECS)
        }
    }
}
