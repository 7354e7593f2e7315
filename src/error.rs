use thiserror::Error;

/// Top-level error type for the wall fitting pipeline.
#[derive(Debug, Error)]
pub enum RampartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Caller contract violations detected before any stage runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid option `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("required polygon `{0}` needs at least 3 finite vertices")]
    MissingPolygon(&'static str),

    #[error("failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Geometry that cannot be sampled at all.
///
/// Per-sample degeneracies are recoverable and only show up in diagnostics;
/// these variants cover inputs that leave a stage with nothing to work from.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("no ray from the center hits polygon `{0}`")]
    NoRadialHits(&'static str),

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Convenience type alias for results using [`RampartError`].
pub type Result<T> = std::result::Result<T, RampartError>;
