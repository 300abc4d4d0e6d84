//! MemorySink - keeps the layout and rows in memory

use contracts::{MergeError, MergeLayout, MergeRow, RowSink};

#[derive(Debug, Default)]
pub struct MemorySink {
    layout: Option<MergeLayout>,
    rows: Vec<MergeRow>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> Option<&MergeLayout> {
        self.layout.as_ref()
    }

    pub fn rows(&self) -> &[MergeRow] {
        &self.rows
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl RowSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn begin(&mut self, layout: &MergeLayout) -> Result<(), MergeError> {
        self.layout = Some(layout.clone());
        Ok(())
    }

    fn write(&mut self, row: &MergeRow) -> Result<(), MergeError> {
        if self.layout.is_none() || self.finished {
            return Err(MergeError::sink_write("memory", "sink is not open"));
        }
        self.rows.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, MergeError> {
        self.finished = true;
        Ok(self.rows.len() as u64)
    }
}
