// src/config/validate.rs

use crate::config::model::{Manifest, RawManifest};
use crate::errors::{BootError, Result};

impl TryFrom<RawManifest> for Manifest {
    type Error = crate::errors::BootError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;
        Ok(Manifest::new_unchecked(raw.config, raw.task))
    }
}

/// Manifest-level checks. Graph-level problems (cycles, no start task) are
/// reported by the graph builder when the run is built.
pub fn validate_raw_manifest(cfg: &RawManifest) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_dependencies(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawManifest) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(BootError::ConfigError(
            "manifest must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawManifest) -> Result<()> {
    if cfg.config.workers == Some(0) {
        return Err(BootError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawManifest) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if name.trim().is_empty() {
            return Err(BootError::ConfigError(
                "task names must not be empty".to_string(),
            ));
        }
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(BootError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(BootError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}
