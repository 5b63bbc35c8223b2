//! Run parameters and their serialization into worker flags.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use serde::Deserialize;

/// A single parameter value. Rendered to a string only when flags are built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Bool(value) => write!(f, "{}", value),
            ParamValue::Int(value) => write!(f, "{}", value),
            ParamValue::Float(value) => write!(f, "{}", value),
            ParamValue::Str(value) => write!(f, "{}", value),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

/// Parameters describing the cluster rather than the algorithm.
pub fn topology_params(
    hostfile: &str,
    num_threads: usize,
    num_clients: usize,
) -> HashMap<String, ParamValue> {
    let mut params = HashMap::new();
    params.insert("hostfile".to_string(), hostfile.into());
    params.insert("num_threads".to_string(), num_threads.into());
    params.insert("num_clients".to_string(), num_clients.into());
    params
}

/// Flat mapping from flag name to value handed to every worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    params: HashMap<String, ParamValue>,
}

impl RunConfig {
    /// Merge topology and algorithm parameters. Algorithm parameters win on a
    /// name collision.
    pub fn merge(
        topology: HashMap<String, ParamValue>,
        algorithm: HashMap<String, ParamValue>,
    ) -> Self {
        let mut params = topology;
        for (key, value) in algorithm {
            if params.contains_key(&key) {
                tracing::warn!("Parameter '{}' overrides a topology parameter", key);
            }
            params.insert(key, value);
        }
        Self { params }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The configuration seen by one client. The template is left untouched.
    pub fn for_client(&self, client_id: usize) -> Self {
        let mut config = self.clone();
        config.insert("client_id", client_id);
        config
    }

    /// One `--name=value` token per parameter, sorted by name.
    pub fn to_flags(&self) -> Vec<String> {
        self.params
            .iter()
            .sorted_by_key(|(key, _)| *key)
            .map(|(key, value)| format!("--{}={}", key, value))
            .collect()
    }
}

/// Escape a string for safe use in a shell command.
///
/// Wraps the value in single quotes and escapes any embedded single quotes
/// using the `'\''` idiom. Strings made only of safe characters are returned
/// bare.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '%' | ':' | '=' | ',' | '+')
    }) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn algorithm() -> HashMap<String, ParamValue> {
        let mut params = HashMap::new();
        params.insert("lambda".to_string(), 0.1.into());
        params.insert("staleness".to_string(), 2i64.into());
        params.insert("global_data".to_string(), false.into());
        params.insert("X_file".to_string(), "/l0/data/x".into());
        params
    }

    #[test]
    fn test_value_display() {
        assert_eq!(ParamValue::from(0.1).to_string(), "0.1");
        assert_eq!(ParamValue::from(0.002).to_string(), "0.002");
        assert_eq!(ParamValue::from(400i64).to_string(), "400");
        assert_eq!(ParamValue::from(false).to_string(), "false");
        assert_eq!(ParamValue::from("x y").to_string(), "x y");
    }

    #[test]
    fn test_value_from_yaml() {
        let values: Vec<ParamValue> = serde_yaml::from_str("[true, 3, 0.5, hello, '7']").unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Bool(true),
                ParamValue::Int(3),
                ParamValue::Float(0.5),
                ParamValue::Str("hello".to_string()),
                ParamValue::Str("7".to_string()),
            ]
        );
    }

    #[test]
    fn test_flags_one_per_key_sorted() {
        let config = RunConfig::merge(topology_params("/hosts", 1, 3), algorithm());
        let flags = config.to_flags();
        assert_eq!(
            flags,
            vec![
                "--X_file=/l0/data/x",
                "--global_data=false",
                "--hostfile=/hosts",
                "--lambda=0.1",
                "--num_clients=3",
                "--num_threads=1",
                "--staleness=2",
            ]
        );
    }

    #[test]
    fn test_algorithm_wins_on_collision() {
        let mut algorithm = algorithm();
        algorithm.insert("num_threads".to_string(), 8i64.into());
        let config = RunConfig::merge(topology_params("/hosts", 1, 3), algorithm);
        assert_eq!(config.get("num_threads"), Some(&ParamValue::Int(8)));
        let count = config
            .to_flags()
            .iter()
            .filter(|flag| flag.starts_with("--num_threads="))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_for_client_does_not_touch_template() {
        let template = RunConfig::merge(topology_params("/hosts", 1, 2), HashMap::new());
        let first = template.for_client(0);
        let second = template.for_client(1);
        assert_eq!(template.get("client_id"), None);
        assert_eq!(first.get("client_id"), Some(&ParamValue::Int(0)));
        assert_eq!(second.get("client_id"), Some(&ParamValue::Int(1)));
        assert_eq!(second.len(), template.len() + 1);
    }

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("--lambda=0.1"), "--lambda=0.1");
        assert_eq!(shell_escape("--name=a b"), "'--name=a b'");
        assert_eq!(shell_escape("it's"), "'it'\\''s'");
        assert_eq!(shell_escape(""), "''");
        assert_eq!(shell_escape("$(rm -rf /)"), "'$(rm -rf /)'");
    }
}
