use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{Error, Result};
use crate::train::epoch_stats::EpochLogEntry;

/// The per-run epoch log.
///
/// The whole list is rewritten after every epoch, so the file on disk
/// always holds every completed epoch and nothing half-written.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    entries: Vec<EpochLogEntry>,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RunLog {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[EpochLogEntry] {
        &self.entries
    }

    /// Appends `entry` and persists the full list. An entry holding a
    /// non-finite value is refused and the file keeps its previous content,
    /// since JSON has no encoding for it.
    pub fn record(&mut self, entry: EpochLogEntry) -> Result<()> {
        if !(entry.train_results.is_finite()
            && entry.valid_results.is_finite()
            && entry.time.is_finite()
            && entry.valid_error_rate.is_finite())
        {
            return Err(Error::Numerical(format!("epoch {} has non-finite results", entry.epoch)));
        }
        self.entries.push(entry);
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
            let mut writer = BufWriter::new(file);
            let mut ser = serde_json::Serializer::with_formatter(
                &mut writer,
                PrettyFormatter::with_indent(b"    "),
            );
            self.entries.serialize(&mut ser)?;
            writer.flush().map_err(|e| Error::io(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| Error::io(&self.path, e))
    }

    /// Reads a log file written by `record`.
    pub fn read(path: &Path) -> Result<Vec<EpochLogEntry>> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
