//! Error types.

use dsim_core::SimulationError;

/// Invalid platform description or run configuration.
///
/// These errors are detected before the simulation starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Run configuration has zero workers.
    #[error("at least one worker is required")]
    NoWorkers,
    /// Platform has too few hosts or VMs for the requested placement.
    #[error("not enough {kind} on the platform: {required} required, {available} available")]
    NotEnoughResources {
        /// `hosts` or `VMs`.
        kind: &'static str,
        /// Required number of resources.
        required: usize,
        /// Number of resources on the platform.
        available: usize,
    },
    /// Link or VM refers to a host which is not declared.
    #[error("unknown host `{0}`")]
    UnknownHost(String),
    /// Host or VM name is used more than once or coincides with an actor name.
    #[error("duplicate name `{0}`")]
    DuplicateName(String),
    /// Parameter value is out of its valid range.
    #[error("invalid {param} of `{name}`: {value}")]
    InvalidValue {
        /// Name of the configured entity.
        name: String,
        /// Parameter name.
        param: &'static str,
        /// Parameter value.
        value: f64,
    },
    /// VM has zero cores.
    #[error("VM `{0}` has no cores")]
    NoCores(String),
    /// Platform file cannot be read.
    #[error("cannot read platform file {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Platform description is not valid YAML of the expected structure.
    #[error("cannot parse platform description {path}: {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Error returned by [`run`](crate::run::run).
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Invalid configuration, no simulation was performed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Simulation did not complete normally.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
