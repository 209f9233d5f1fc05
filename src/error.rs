//! Error types for the timer loop and its drivers
//!
//! Actions themselves never fail; these only surface where the host drives
//! time or parses configuration.

use crate::timers::TimeMs;
use thiserror::Error;

/// Errors raised while advancing a timer loop
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimerError {
    #[error("update to {time}ms ran more than {limit} callbacks, likely infinite scheduling")]
    Runaway { time: TimeMs, limit: usize },
}

/// Errors raised by the engine driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error("{operation} is not available in {mode} mode")]
    WrongMode {
        operation: &'static str,
        mode: &'static str,
    },
    #[error("timer error: {0}")]
    Timer(#[from] TimerError),
}

/// Errors parsing an easing curve
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EasingError {
    #[error("unknown easing curve: {0}")]
    UnknownCurve(String),
    #[error("invalid cubic-bezier: {0}")]
    InvalidBezier(String),
    #[error("invalid steps: {0}")]
    InvalidSteps(String),
}
