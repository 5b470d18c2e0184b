// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Misuse of the recording protocol. These indicate a wiring bug in the caller and are never
/// expected in a correctly instrumented VM; recording calls panic with this message and
/// lifecycle calls return it for the caller to unwrap.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("profiler already running")]
    AlreadyRunning,

    #[error("profiler not running")]
    NotRunning,

    #[error("cannot reset a running profiler")]
    ResetWhileRunning,

    #[error("EndOp called without a matching BeginOp")]
    EndOpWithoutBegin,

    #[error("EndStore called without a matching BeginStore")]
    EndStoreWithoutBegin,

    #[error("EndNative called without a matching BeginNative")]
    EndNativeWithoutBegin,

    #[error("EndSubOp called without a matching BeginSubOp")]
    EndSubOpWithoutBegin,

    #[error("SetOpContext called outside of a BeginOp/EndOp pair")]
    ContextWithoutOp,

    #[error("PopFrame called on an empty call stack")]
    FrameUnderflow,

    #[error("concurrent lifecycle transition on the global profiler")]
    ConcurrentTransition,
}

/// Errors surfaced by exporters. These happen under caller control (bad section names, I/O,
/// values that do not fit a fixed-width record) and are always returned, never panicked.
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown CSV section {0:?}")]
    UnknownSection(String),

    #[error("{field} value {value} of {name} does not fit a {width}-bit record field")]
    RecordOverflow {
        name: String,
        field: &'static str,
        value: u64,
        width: u32,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
}

pub type ProfilerResult<T> = Result<T, ProfilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn stop_idle() -> ProfilerResult<()> {
        let mut profiler = crate::profiler::Profiler::default();
        profiler.stop()?;
        Ok(())
    }

    #[test]
    fn protocol_violations_convert() {
        let err = ProfilerError::from(ProtocolViolation::NotRunning);
        assert!(matches!(
            err,
            ProfilerError::Protocol(ProtocolViolation::NotRunning)
        ));
        assert_eq!(err.to_string(), "profiler not running");

        assert!(matches!(
            stop_idle(),
            Err(ProfilerError::Protocol(ProtocolViolation::NotRunning))
        ));
    }

    #[test]
    fn overflow_message_names_the_field() {
        let err = ProfilerError::RecordOverflow {
            name: "OpAdd".to_string(),
            field: "count",
            value: 1 << 40,
            width: 32,
        };
        assert_eq!(
            err.to_string(),
            "count value 1099511627776 of OpAdd does not fit a 32-bit record field"
        );
    }
}
