use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Merges parameter layers key-by-key, later layers winning:
/// `defaults` → JSON object in `config_file` → inline JSON object.
///
/// Pure apart from reading `config_file`; resolving the same inputs twice
/// yields the same map.
pub fn resolve_params(
    defaults: Map<String, Value>,
    config_file: Option<&Path>,
    inline: Option<&str>,
) -> Result<Map<String, Value>> {
    let mut params = defaults;

    if let Some(path) = config_file {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let layer: Value = serde_json::from_reader(BufReader::new(file))?;
        merge_layer(&mut params, layer, &path.display().to_string())?;
    }

    if let Some(text) = inline {
        let layer: Value = serde_json::from_str(text)?;
        merge_layer(&mut params, layer, "inline config")?;
    }

    Ok(params)
}

/// Overwrites each key of `layer` into `params`; `layer` must be a JSON object.
pub fn merge_layer(params: &mut Map<String, Value>, layer: Value, origin: &str) -> Result<()> {
    match layer {
        Value::Object(entries) => {
            for (key, value) in entries {
                params.insert(key, value);
            }
            Ok(())
        }
        other => Err(Error::Config(format!(
            "{} must be a JSON object, got {}",
            origin,
            json_kind(&other)
        ))),
    }
}

/// Writes the resolved parameters as a single JSON object.
pub fn write_params(path: &Path, params: &Map<String, Value>) -> Result<()> {
    let file = File::options()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, params)?;
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Reads back a params file written by `write_params`.
pub fn read_params(path: &Path) -> Result<Map<String, Value>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;
    let mut params = Map::new();
    merge_layer(&mut params, value, &path.display().to_string())?;
    Ok(params)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> Map<String, Value> {
        match json!({ "hidden_size": 100, "patience": 25 }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn file_layer_overrides_defaults_key_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        File::create(&path).unwrap().write_all(br#"{"hidden_size": 50}"#).unwrap();

        let params = resolve_params(defaults(), Some(&path), Some("{}")).unwrap();
        assert_eq!(params["hidden_size"], json!(50));
        assert_eq!(params["patience"], json!(25));
    }

    #[test]
    fn inline_layer_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        File::create(&path).unwrap()
            .write_all(br#"{"hidden_size": 50, "task_id": 3}"#).unwrap();

        let params = resolve_params(defaults(), Some(&path), Some(r#"{"hidden_size": 7}"#)).unwrap();
        assert_eq!(params["hidden_size"], json!(7));
        assert_eq!(params["task_id"], json!(3));
        assert_eq!(params["patience"], json!(25));
    }

    #[test]
    fn resolution_is_idempotent() {
        let inline = Some(r#"{"patience": 3}"#);
        let first = resolve_params(defaults(), None, inline).unwrap();
        let second = resolve_params(defaults(), None, inline).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_object_layer_is_rejected() {
        let err = resolve_params(defaults(), None, Some("[1, 2]")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = resolve_params(defaults(), Some(Path::new("/nonexistent/cfg.json")), None).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn params_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_params.json");
        let params = resolve_params(defaults(), None, Some(r#"{"learning_rate": 0.001}"#)).unwrap();

        write_params(&path, &params).unwrap();
        assert_eq!(read_params(&path).unwrap(), params);
        // Run files are never reused.
        assert!(write_params(&path, &params).is_err());
    }
}
