use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by an external symbol decoder
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decoder reported an error
    #[error("decoder failed: {0}")]
    Failed(String),
    /// The decoder panicked
    #[error("decoder panicked: {0}")]
    Panicked(String),
}

/// Capture device and worker failures
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Device could not be acquired
    #[error("failed to open capture device: {0}")]
    OpenFailed(String),
    /// One frame could not be read
    #[error("frame read failed: {0}")]
    ReadFailed(String),
    /// `start` called on a running loop
    #[error("capture loop is already running")]
    AlreadyRunning,
    /// Thread creation failed
    #[error("failed to spawn capture worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
    /// No worker to talk to
    #[error("capture worker exited unexpectedly")]
    WorkerGone,
    /// Invalid inspection command
    #[error(transparent)]
    Inspection(#[from] InspectionError),
}

/// A device control could not be applied
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Control not available
    #[error("control {0} is not supported by this device")]
    Unsupported(&'static str),
    /// Device refused the value
    #[error("control {control} rejected: {reason}")]
    Rejected {
        /// Control name
        control: &'static str,
        /// Device message
        reason: String,
    },
}

/// Invalid parameter update
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    /// No such parameter
    #[error("unknown parameter: {0}")]
    UnknownField(String),
    /// Value outside the documented range
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        /// Parameter name
        field: &'static str,
        /// Rejected value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Value of the wrong JSON type
    #[error("parameter {field} has the wrong type")]
    WrongType {
        /// Parameter name
        field: String,
    },
}

/// Configuration snapshot persistence failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No snapshot file in the directory
    #[error("no configuration file found in {}", .0.display())]
    NotFound(PathBuf),
    /// Not valid JSON
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Offending file
        path: PathBuf,
        /// JSON error
        #[source]
        source: serde_json::Error,
    },
    /// Valid JSON, but not a usable snapshot
    #[error("invalid configuration in {}: {reason}", path.display())]
    InvalidStructure {
        /// Offending file
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },
    /// Every slot number is taken
    #[error("configuration slots exhausted (1..={0} all in use)")]
    LimitReached(u32),
    /// Filesystem failure
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Rejected inspection request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InspectionError {
    /// Expected count outside 1..=8
    #[error("expected code count {0} is outside 1..=8")]
    ExpectedOutOfRange(u32),
    /// Timeout outside 1..=300 seconds
    #[error("timeout {0}s is outside 1..=300")]
    TimeoutOutOfRange(u64),
}
