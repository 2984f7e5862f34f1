use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::run_context::RunContext;
use crate::data::record::GraphRecord;
use crate::data::schema::SchemaAccumulator;
use crate::error::{Error, Result};
use crate::model::core::GraphModel;

/// Reads graph splits from a data directory and hands them to a model.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    data_dir: PathBuf,
    restrict: Option<usize>,
    tie_fwd_bkwd: bool,
}

impl DatasetLoader {
    /// `restrict` keeps only that many leading records of each split; `None`
    /// or `Some(0)` keeps everything.
    pub fn new(data_dir: impl Into<PathBuf>, restrict: Option<usize>, tie_fwd_bkwd: bool) -> Self {
        DatasetLoader { data_dir: data_dir.into(), restrict, tie_fwd_bkwd }
    }

    pub fn from_context(context: &RunContext) -> Self {
        DatasetLoader::new(
            context.options().data_dir.clone(),
            context.options().restrict_data,
            context.config().tie_fwd_bkwd,
        )
    }

    /// Decodes, truncates, and validates one split. Any malformed record
    /// fails the whole split.
    pub fn read_records(&self, file_name: &str) -> Result<Vec<GraphRecord>> {
        let path = self.data_dir.join(file_name);
        log::info!("Loading data from {}", path.display());

        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let mut records: Vec<GraphRecord> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| decode_error(&path, e))?;

        if let Some(n) = self.restrict.filter(|&n| n > 0) {
            records.truncate(n);
        }

        if records.is_empty() {
            return Err(Error::data_format(&path, "contains no graph records"));
        }
        for (i, record) in records.iter().enumerate() {
            record.validate()
                .map_err(|reason| Error::data_format(&path, format!("record {}: {}", i, reason)))?;
        }

        log::debug!("{} records kept from {}", records.len(), path.display());
        Ok(records)
    }

    /// Loads one split: folds it into `schema` and lets `model` transform it.
    pub fn load<M: GraphModel>(
        &self,
        file_name: &str,
        model: &M,
        schema: SchemaAccumulator,
    ) -> Result<(M::Dataset, SchemaAccumulator)> {
        let records = self.read_records(file_name)?;
        let schema = schema.observe(&records, self.tie_fwd_bkwd);
        let dataset = model.process_raw_graphs(records, &schema.schema())?;
        Ok((dataset, schema))
    }
}

fn decode_error(path: &Path, e: serde_json::Error) -> Error {
    if e.is_io() {
        Error::io(path, e.into())
    } else {
        Error::data_format(path, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_split(dir: &Path, name: &str, body: &str) {
        File::create(dir.join(name)).unwrap().write_all(body.as_bytes()).unwrap();
    }

    fn numbered_split(n: usize) -> String {
        let records: Vec<String> = (0..n)
            .map(|i| format!(
                r#"{{"graph": [[0, 1, 1]], "node_features": [[{i}.0], [0.0]], "targets": [[{i}.0]]}}"#
            ))
            .collect();
        format!("[{}]", records.join(","))
    }

    #[test]
    fn truncation_keeps_a_strict_prefix() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), "train.json", &numbered_split(9));

        let loader = DatasetLoader::new(dir.path(), Some(5), true);
        let records = loader.read_records("train.json").unwrap();
        let firsts: Vec<f64> = records.iter().map(|r| r.node_features[0][0]).collect();
        assert_eq!(firsts, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn zero_restriction_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), "train.json", &numbered_split(4));
        let loader = DatasetLoader::new(dir.path(), Some(0), true);
        assert_eq!(loader.read_records("train.json").unwrap().len(), 4);
    }

    #[test]
    fn missing_node_features_is_a_data_format_error() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), "bad.json", r#"[{"graph": [[0, 1, 1]]}]"#);
        let err = DatasetLoader::new(dir.path(), None, true).read_records("bad.json").unwrap_err();
        assert!(matches!(err, Error::DataFormat { .. }), "{}", err);
    }

    #[test]
    fn empty_record_list_is_a_data_format_error() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), "empty.json", "[]");
        let err = DatasetLoader::new(dir.path(), None, true).read_records("empty.json").unwrap_err();
        assert!(matches!(err, Error::DataFormat { .. }));
    }

    #[test]
    fn invalid_record_names_its_index() {
        let dir = tempfile::tempdir().unwrap();
        write_split(
            dir.path(),
            "bad.json",
            r#"[{"graph": [[0, 1, 1]], "node_features": [[1.0], [1.0]]},
                {"graph": [[0, 1, 4]], "node_features": [[1.0], [1.0]]}]"#,
        );
        let err = DatasetLoader::new(dir.path(), None, true).read_records("bad.json").unwrap_err();
        assert!(err.to_string().contains("record 1"), "{}", err);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatasetLoader::new(dir.path(), None, true).read_records("nope.json").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
