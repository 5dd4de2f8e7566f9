use protrl_core::{
    Result,
    callbacks::{MetricsRecord, MetricsSink},
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use tracing::info;

/// Emits every record as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn log(&mut self, record: &MetricsRecord) -> Result<()> {
        let scalars = record
            .scalars
            .iter()
            .map(|(key, value)| format!("{key}={value:.4}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!(name = %record.name, timestep = record.timestep, "{scalars}");
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesSink {
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl MetricsSink for JsonLinesSink {
    fn log(&mut self, record: &MetricsRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<MetricsRecord>,
}

impl MetricsSink for MemorySink {
    fn log(&mut self, record: &MetricsRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
