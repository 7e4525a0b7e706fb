use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::decoder::FrameRecord;
use crate::shared::constants::{CSV_COLUMNS, NUM_LANDMARKS};

/// Column names: frame_idx, time_sec, then x_i, y_i, z_i, v_i per landmark.
pub fn header() -> Vec<String> {
    let mut cols = Vec::with_capacity(CSV_COLUMNS);
    cols.push("frame_idx".to_string());
    cols.push("time_sec".to_string());
    for i in 0..NUM_LANDMARKS {
        cols.push(format!("x_{}", i));
        cols.push(format!("y_{}", i));
        cols.push(format!("z_{}", i));
        cols.push(format!("v_{}", i));
    }
    cols
}

/// One wide row per frame. NaN is written as `NaN`, never dropped, so every
/// row has the same width. Floats always carry a decimal point (`0.0`, `1.0`).
pub fn row(record: &FrameRecord) -> Vec<String> {
    let mut fields = Vec::with_capacity(CSV_COLUMNS);
    fields.push(record.frame_idx.to_string());
    fields.push(format!("{:?}", record.time_sec));
    for lm in record.landmarks.iter() {
        fields.extend(lm.values().iter().map(|v| format!("{:?}", v)));
    }
    fields
}

/// Wide-format landmark table. The header goes out on construction.
pub struct LandmarkTable<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl LandmarkTable<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV: {}", path.display()))?;
        Self::new(file)
    }
}

impl<W: Write> LandmarkTable<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(header())?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write(&mut self, record: &FrameRecord) -> Result<()> {
        self.writer.write_record(row(record))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush CSV: {}", e.error()))
    }
}
