// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const NO_TIMING_ENV_VAR_NAME: &str = "OPCODE_PROFILER_NO_TIMING";
const NO_STACKS_ENV_VAR_NAME: &str = "OPCODE_PROFILER_NO_STACKS";

static TIMING_DISABLED_BY_ENV: Lazy<bool> =
    Lazy::new(|| std::env::var(NO_TIMING_ENV_VAR_NAME).is_ok());
static STACKS_DISABLED_BY_ENV: Lazy<bool> =
    Lazy::new(|| std::env::var(NO_STACKS_ENV_VAR_NAME).is_ok());

/// What a profiling session measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Read the clock around every measurement. When off only counts, gas and sizes are kept.
    pub timing: bool,
    /// Aggregate per call-stack samples for flame graphs.
    pub call_stacks: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            timing: true,
            call_stacks: true,
        }
    }
}

impl ProfilerConfig {
    /// Defaults, with `OPCODE_PROFILER_NO_TIMING` / `OPCODE_PROFILER_NO_STACKS` applied.
    /// The environment is read once per process.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if *TIMING_DISABLED_BY_ENV {
            config.timing = false;
        }
        if *STACKS_DISABLED_BY_ENV {
            config.call_stacks = false;
        }
        config
    }

    pub fn without_timing(mut self) -> Self {
        self.timing = false;
        self
    }

    pub fn without_call_stacks(mut self) -> Self {
        self.call_stacks = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_disables_features() {
        let config = ProfilerConfig::default()
            .without_timing()
            .without_call_stacks();
        assert!(!config.timing);
        assert!(!config.call_stacks);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ProfilerConfig = serde_json::from_str(r#"{"timing": false}"#).unwrap();
        assert_eq!(
            config,
            ProfilerConfig {
                timing: false,
                call_stacks: true,
            }
        );
    }
}
