//! Daemon configuration.

use sysd_core::{SysdError, SysdResult, TaskPriority};

/// Timing and priority settings of the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Steady-state polling period
    pub period_ms: u32,
    /// How long device locks are held at startup before user code runs
    pub startup_hold_ms: u32,
    /// Priority of the daemon task itself
    pub daemon_priority: TaskPriority,
    /// Priority of the user task in the phase slot
    pub phase_priority: TaskPriority,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            period_ms: 2,
            startup_hold_ms: 2,
            daemon_priority: TaskPriority::DAEMON,
            phase_priority: TaskPriority::DEFAULT,
        }
    }
}

impl DaemonConfig {
    /// Creates a new daemon configuration builder.
    pub fn builder() -> DaemonConfigBuilder {
        DaemonConfigBuilder::default()
    }
}

/// Builder for [`DaemonConfig`]
#[derive(Debug, Default)]
pub struct DaemonConfigBuilder {
    config: DaemonConfig,
}

impl DaemonConfigBuilder {
    /// Sets the polling period in milliseconds.
    pub fn period_ms(mut self, period_ms: u32) -> Self {
        self.config.period_ms = period_ms;
        self
    }

    /// Sets the startup lock hold in milliseconds.
    pub fn startup_hold_ms(mut self, hold_ms: u32) -> Self {
        self.config.startup_hold_ms = hold_ms;
        self
    }

    /// Sets the daemon task priority.
    pub fn daemon_priority(mut self, priority: TaskPriority) -> Self {
        self.config.daemon_priority = priority;
        self
    }

    /// Sets the user task priority.
    pub fn phase_priority(mut self, priority: TaskPriority) -> Self {
        self.config.phase_priority = priority;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// The period must be at least one millisecond, and the daemon must
    /// outrank the user task so its loop keeps running while user code
    /// spins.
    pub fn build(self) -> SysdResult<DaemonConfig> {
        if self.config.period_ms == 0 {
            return Err(SysdError::InvalidPeriod);
        }
        if self.config.daemon_priority <= self.config.phase_priority {
            return Err(SysdError::InvalidPriority);
        }
        Ok(self.config)
    }
}
