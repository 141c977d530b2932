//! Custom error types for `geosplit` operations.
//!
//! Errors are scoped to the level at which they are handled: engine errors come from the
//! raster-access collaborator, task errors turn a single subdataset into a `Failed` result,
//! container errors skip one input file, and manifest/overview errors are logged without
//! affecting the rest of the run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for `geosplit` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum GeoSplitError {
    /// The container could not be opened or exposes no subdatasets
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// The manifest could not be persisted
    #[error(transparent)]
    ManifestWrite(#[from] ManifestWriteError),

    /// The overview preview could not be produced
    #[error(transparent)]
    Overview(#[from] OverviewBuildError),

    /// Raster engine errors outside of any task (initialization, lifecycle)
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors reported by a [`RasterEngine`](crate::engine::RasterEngine) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A container or sub-resource could not be opened
    #[error("Failed to open '{reference}': {message}")]
    Open {
        /// Path or engine reference string of the resource
        reference: String,
        /// Engine-provided reason
        message: String,
    },

    /// Reading raster data or metadata failed
    #[error("Failed to read '{reference}': {message}")]
    Read {
        /// Path or engine reference string of the resource
        reference: String,
        /// Engine-provided reason
        message: String,
    },

    /// Producing an output artifact failed
    #[error("Failed to write '{reference}': {message}")]
    Write {
        /// Destination path of the artifact
        reference: String,
        /// Engine-provided reason
        message: String,
    },

    /// The engine cannot perform the requested operation at all
    #[error("{operation} is not supported: {message}")]
    Unsupported {
        /// Name of the rejected operation
        operation: String,
        /// Why it is unsupported
        message: String,
    },

    /// Engine-wide configuration could not be applied
    #[error("Engine configuration failed: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },
}

impl EngineError {
    /// Shorthand for [`EngineError::Open`].
    pub fn open(reference: impl Into<String>, message: impl ToString) -> Self {
        Self::Open {
            reference: reference.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for [`EngineError::Read`].
    pub fn read(reference: impl Into<String>, message: impl ToString) -> Self {
        Self::Read {
            reference: reference.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for [`EngineError::Write`].
    pub fn write(reference: impl Into<String>, message: impl ToString) -> Self {
        Self::Write {
            reference: reference.into(),
            message: message.to_string(),
        }
    }
}

/// Errors fatal to a single container.
///
/// The batch driver catches these, logs them, and continues with the next input.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The container file could not be opened by the engine
    #[error("Failed to open container '{path}': {source}")]
    Open {
        /// The container path
        path: PathBuf,
        /// The underlying engine error
        #[source]
        source: EngineError,
    },

    /// The container opened but lists no subdatasets
    #[error("No subdatasets found in the file: '{path}'")]
    NoSubdatasets {
        /// The container path
        path: PathBuf,
    },
}

/// Errors that fail one conversion task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The raster engine rejected the subdataset
    #[error("Failed to convert '{name}': {source}")]
    Engine {
        /// Display name of the subdataset
        name: String,
        /// The underlying engine error
        #[source]
        source: EngineError,
    },

    /// Local filesystem failure while preparing or writing the output
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The path being created or written
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// Sample buffer could not be encoded as JSON
    #[error("Failed to encode '{name}' as JSON: {source}")]
    Serialize {
        /// Display name of the subdataset
        name: String,
        /// The underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// The manifest file could not be created or written.
#[derive(Debug, Error)]
#[error("Could not write manifest file '{path}': {source}")]
pub struct ManifestWriteError {
    /// Target manifest path
    pub path: PathBuf,
    /// The underlying error
    #[source]
    pub source: std::io::Error,
}

/// Errors raised while building the overview preview.
#[derive(Debug, Error)]
pub enum OverviewBuildError {
    /// The scoped temporary directory for the mosaic could not be created
    #[error("Failed to create a temporary mosaic directory: {0}")]
    Workspace(#[source] std::io::Error),

    /// Stacking the converted bands into a mosaic failed
    #[error("Failed to build band mosaic: {0}")]
    Mosaic(#[source] EngineError),

    /// Rendering the downsampled preview failed
    #[error("Failed to render overview '{path}': {source}")]
    Preview {
        /// Target preview path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: EngineError,
    },

    /// The preview's parent directory could not be created
    #[error("Failed to prepare overview directory '{path}': {source}")]
    Io {
        /// The directory being created
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors.
///
/// These errors occur when options or configuration are invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

impl GeoSplitError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Container(e) => e.user_message(),
            Self::ManifestWrite(e) => e.to_string(),
            Self::Overview(e) => format!("Overview skipped: {e}"),
            Self::Engine(e) => format!("Raster engine error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Container(e) => e.recovery_suggestion(),
            Self::Engine(EngineError::Unsupported { .. }) => {
                Some("Rebuild geosplit with `--features gdal` to enable GDAL raster access.".to_string())
            },
            Self::ManifestWrite(_) => {
                Some("Check that the output directory is writable.".to_string())
            },
            Self::Config(_) => Some("Run `geosplit --help` to see accepted values.".to_string()),
            _ => None,
        }
    }
}

impl ContainerError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Open { path, source } => {
                format!("Could not open {}: {source}", path.display())
            },
            Self::NoSubdatasets { path } => {
                format!("{} does not contain any subdatasets", path.display())
            },
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Open {
                source: EngineError::Unsupported { .. },
                ..
            } => Some(
                "Rebuild geosplit with `--features gdal` to enable GDAL raster access.".to_string(),
            ),
            Self::Open { .. } => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
            Self::NoSubdatasets { .. } => Some(
                "Only multi-subdataset containers (e.g. HDF5, NetCDF) can be split.".to_string(),
            ),
        }
    }
}

/// Extension trait for adding path context to I/O errors raised inside a task.
pub trait IoErrorExt<T> {
    /// Wrap an I/O failure into [`TaskError::Io`] naming `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskError::Io`] if the underlying operation fails.
    fn with_path_context(self, path: impl Into<PathBuf>) -> std::result::Result<T, TaskError>;
}

impl<T> IoErrorExt<T> for std::io::Result<T> {
    fn with_path_context(self, path: impl Into<PathBuf>) -> std::result::Result<T, TaskError> {
        self.map_err(|source| TaskError::Io {
            path: path.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_open_message_and_suggestion() {
        let err = ContainerError::Open {
            path: PathBuf::from("scene.h5"),
            source: EngineError::open("scene.h5", "no such file"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open container 'scene.h5': Failed to open 'scene.h5': no such file"
        );
        assert!(
            err.recovery_suggestion()
                .unwrap()
                .contains("file path is correct")
        );
    }

    #[test]
    fn test_unsupported_engine_suggests_gdal_feature() {
        let err = GeoSplitError::from(ContainerError::Open {
            path: PathBuf::from("scene.h5"),
            source: EngineError::Unsupported {
                operation: "open_container".to_string(),
                message: "built without GDAL".to_string(),
            },
        });
        assert!(err.recovery_suggestion().unwrap().contains("--features gdal"));
    }

    #[test]
    fn test_no_subdatasets_user_message() {
        let err = GeoSplitError::from(ContainerError::NoSubdatasets {
            path: PathBuf::from("plain.tif"),
        });
        assert_eq!(err.user_message(), "plain.tif does not contain any subdatasets");
    }

    #[test]
    fn test_with_path_context() {
        let io: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = io.with_path_context("out/scene").unwrap_err();
        assert!(matches!(err, TaskError::Io { ref path, .. } if path == &PathBuf::from("out/scene")));
        assert!(err.to_string().contains("out/scene"));
    }

    #[test]
    fn test_config_error_message_and_suggestion() {
        let err = GeoSplitError::from(ConfigError::InvalidOption {
            option: "block size".to_string(),
            message: "500 is not a power of two".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "Configuration error: Invalid block size option: 500 is not a power of two"
        );
        assert!(err.recovery_suggestion().unwrap().contains("--help"));
    }

    #[test]
    fn test_manifest_write_suggests_writable_directory() {
        let err = GeoSplitError::from(ManifestWriteError {
            path: PathBuf::from("out/scene/manifest.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert!(err.user_message().contains("out/scene/manifest.json"));
        assert!(err.recovery_suggestion().unwrap().contains("writable"));
    }
}
