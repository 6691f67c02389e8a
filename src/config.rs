use std::time::Duration;

/// Name used in log events when none is configured.
pub const DEFAULT_NAME: &str = "mpsc-coordinator";

/// Construction parameters for a [`Coordinator`](crate::Coordinator).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tokio_mpsc_coordinator::CoordinatorConfig;
///
/// let config = CoordinatorConfig::new(4)
///     .with_name("ingest")
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.expected_producers, 4);
/// assert_eq!(config.name, "ingest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Number of producers that must each signal completion once.
    pub expected_producers: usize,
    /// Value of the `coordinator` field on every log event.
    pub name: String,
    /// Upper bound applied by `wait_and_close`. `None` waits forever.
    pub shutdown_timeout: Option<Duration>,
}

impl CoordinatorConfig {
    /// Creates a configuration for `expected_producers` producers with default settings.
    ///
    /// # Arguments
    ///
    /// * `expected_producers` - The number of producers that will signal completion.
    pub fn new(expected_producers: usize) -> Self {
        Self {
            expected_producers,
            ..Self::default()
        }
    }

    /// Sets the name used in log events.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bounds how long `wait_and_close` waits before giving up.
    ///
    /// # Arguments
    ///
    /// * `timeout` - The longest time shutdown may take.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            expected_producers: 0,
            name: DEFAULT_NAME.to_string(),
            shutdown_timeout: None,
        }
    }
}
