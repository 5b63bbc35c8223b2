//! Per-run output directory naming.
//!
//! Sweep runs are told apart by their directory name, which strings together
//! an abbreviation and the value of each selected parameter. Parameters that
//! are not selected do not show up in the name, so two runs that only differ
//! in those write into the same directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use void::Void;

use crate::error::LauncherError;
use crate::params::RunConfig;
use crate::serde::string_or_mapping;

/// One parameter that goes into the output name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameField {
    /// Parameter to read the value from.
    pub field: String,
    /// Token written in front of the value.
    pub abbrev: String,
}

impl NameField {
    pub fn new(field: &str, abbrev: &str) -> Self {
        Self {
            field: field.to_string(),
            abbrev: abbrev.to_string(),
        }
    }
}

impl FromStr for NameField {
    type Err = Void;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s, s))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameFieldSpec(#[serde(deserialize_with = "string_or_mapping")] pub NameField);

/// `output` section of the launch file.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSpec {
    /// Directory the run directories are created under.
    pub root: PathBuf,
    /// Parameters that make up the run directory name, in order.
    #[serde(default)]
    pub fields: Vec<NameFieldSpec>,
}

impl OutputSpec {
    pub fn fields(&self) -> Vec<NameField> {
        self.fields.iter().map(|spec| spec.0.clone()).collect()
    }

    /// Full path of the run directory, made absolute so every worker sees
    /// the same path.
    pub fn run_dir(&self, exp_name: &str, config: &RunConfig) -> Result<PathBuf, LauncherError> {
        let name = output_name(exp_name, &self.fields(), config)?;
        absolute(&self.root.join(name))
    }
}

/// Resolve a relative path against the current directory.
pub fn absolute(path: &Path) -> Result<PathBuf, LauncherError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| LauncherError::OutputDir {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

/// Build the run name: `exp_name` followed by `.<abbrev><value>` for each
/// selected field.
pub fn output_name(
    exp_name: &str,
    fields: &[NameField],
    config: &RunConfig,
) -> Result<String, LauncherError> {
    let mut name = exp_name.to_string();
    for NameField { field, abbrev } in fields {
        let value = config
            .get(field)
            .ok_or_else(|| LauncherError::UnknownNameField(field.clone()))?;
        name.push('.');
        name.push_str(abbrev);
        name.push_str(&value.to_string());
    }
    Ok(name)
}

/// Create the run directory and its parents. An existing directory is fine.
pub fn prepare_output_dir(path: &Path) -> Result<(), LauncherError> {
    fs::create_dir_all(path).map_err(|source| LauncherError::OutputDir {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Output directory {} ready", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::params::{topology_params, ParamValue};

    fn lasso_config() -> RunConfig {
        let mut algorithm: HashMap<String, ParamValue> = HashMap::new();
        algorithm.insert("lambda".to_string(), 0.1.into());
        algorithm.insert("learning_rate".to_string(), 0.002.into());
        algorithm.insert("staleness".to_string(), 2i64.into());
        algorithm.insert("num_epochs".to_string(), 400i64.into());
        algorithm.insert("num_unused_rows".to_string(), 0i64.into());
        algorithm.insert("X_file".to_string(), "/l0/data/x".into());
        RunConfig::merge(topology_params("/hosts", 1, 3), algorithm)
    }

    fn lasso_fields() -> Vec<NameField> {
        vec![
            NameField::new("num_clients", "N"),
            NameField::new("num_threads", "T"),
            NameField::new("lambda", "L"),
            NameField::new("learning_rate", "lr"),
            NameField::new("staleness", "S"),
            NameField::new("num_epochs", "E"),
            NameField::new("num_unused_rows", "UR"),
        ]
    }

    #[test]
    fn test_output_name() {
        let name = output_name("synth-100m", &lasso_fields(), &lasso_config()).unwrap();
        assert_eq!(name, "synth-100m.N3.T1.L0.1.lr0.002.S2.E400.UR0");
    }

    #[test]
    fn test_output_name_is_pure() {
        let config = lasso_config();
        let first = output_name("exp", &lasso_fields(), &config).unwrap();
        let second = output_name("exp", &lasso_fields(), &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_selected_field_changes_name() {
        let base = output_name("exp", &lasso_fields(), &lasso_config()).unwrap();
        let mut changed = lasso_config();
        changed.insert("staleness", 3i64);
        assert_ne!(base, output_name("exp", &lasso_fields(), &changed).unwrap());
    }

    #[test]
    fn test_unselected_field_does_not_change_name() {
        let base = output_name("exp", &lasso_fields(), &lasso_config()).unwrap();
        let mut changed = lasso_config();
        changed.insert("X_file", "/elsewhere");
        assert_eq!(base, output_name("exp", &lasso_fields(), &changed).unwrap());
    }

    #[test]
    fn test_unknown_field() {
        let fields = vec![NameField::new("momentum", "M")];
        match output_name("exp", &fields, &lasso_config()) {
            Err(LauncherError::UnknownNameField(field)) => assert_eq!(field, "momentum"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_fields_from_yaml() {
        let spec: OutputSpec =
            serde_yaml::from_str("root: out\nfields:\n  - {field: lambda, abbrev: L}\n  - staleness\n")
                .unwrap();
        assert_eq!(
            spec.fields(),
            vec![NameField::new("lambda", "L"), NameField::new("staleness", "staleness")]
        );
    }

    #[test]
    fn test_prepare_output_dir_twice() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("output").join("exp.N3");
        prepare_output_dir(&dir).unwrap();
        prepare_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
