use std::time::Duration;

use envconfig::Envconfig;
use serde::Serialize;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:4444")]
    pub bind: String,

    /// Start in test mode: the process stops itself shortly after starting.
    #[envconfig(from = "WAVEPIPE_TEST", default = "false")]
    pub test_mode: bool,

    #[envconfig(from = "WAVEPIPE_TEST_DELAY_SECS", default = "10")]
    pub test_mode_delay_secs: u64,

    /// Development only: downstream handlers skip authentication.
    #[envconfig(from = "WAVEPIPE_DEBUG", default = "false")]
    pub debug: bool,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,
}

impl Config {
    pub fn test_mode_delay(&self) -> Duration {
        Duration::from_secs(self.test_mode_delay_secs)
    }

    pub fn mode(&self) -> AppMode {
        AppMode {
            debug: self.debug,
            test: self.test_mode,
        }
    }
}

/// Environment markers handed to the running application instead of being read
/// from process-wide state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AppMode {
    pub debug: bool,
    pub test: bool,
}
