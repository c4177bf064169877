//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::WeldConfig;
use crate::error::WeldError;
use config::{Environment, File};
use std::path::Path;
use tracing::debug;

/// Prefix of environment overrides, e.g. `WELD__GENERATION__MODEL`.
pub const ENV_PREFIX: &str = "WELD";
pub const ENV_SEPARATOR: &str = "__";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace_root`.
    ///
    /// Lowest to highest: built-in defaults, global file, `weld.toml`,
    /// `weld.{WELD_ENV}.toml`, `WELD__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<WeldConfig, WeldError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config: WeldConfig = builder
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        debug!(
            workspace = %workspace_root.display(),
            providers = config.providers.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load a single explicit file over the defaults, skipping discovery.
    pub fn load_from_file(path: &Path) -> Result<WeldConfig, WeldError> {
        if !path.exists() {
            return Err(WeldError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config: WeldConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Load and validate, folding validation errors into one config error.
    pub fn load_validated(
        workspace_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<WeldConfig, WeldError> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load(workspace_root)?,
        };
        config.validate().map_err(|errors| {
            WeldError::Config(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        Ok(config)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
