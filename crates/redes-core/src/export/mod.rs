//! Files written into the output directory.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{PipelineError, Result};

pub mod charts;
pub mod graph_formats;
pub mod raster;
pub mod report;
pub mod tables;

/// Write raw bytes, creating parent directories.
pub fn write_bytes(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| PipelineError::export(path, e))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Write a rendered text document, creating parent directories.
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    write_bytes(path, contents.as_bytes())
}

/// Pretty-printed JSON document.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| PipelineError::export(path, e))?;
    write_text(path, &json)
}

/// Output directory that remembers every file written into it, by path
/// relative to the root.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
    written: Vec<String>,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn written(&self) -> &[String] {
        &self.written
    }

    pub fn csv<T: Serialize>(&mut self, rel: &str, rows: &[T]) -> Result<()> {
        tables::write_csv(&self.path(rel), rows)?;
        self.record(rel);
        Ok(())
    }

    pub fn text(&mut self, rel: &str, contents: &str) -> Result<()> {
        write_text(&self.path(rel), contents)?;
        self.record(rel);
        Ok(())
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, rel: &str, value: &T) -> Result<()> {
        write_json(&self.path(rel), value)?;
        self.record(rel);
        Ok(())
    }

    /// Write a chart as `{stem}.svg` plus its raster `{stem}.png`.
    pub fn chart(&mut self, stem: &str, svg: &str) -> Result<()> {
        self.text(&format!("{stem}.svg"), svg)?;
        let png = format!("{stem}.png");
        raster::write_png(&self.path(&png), svg)?;
        self.record(&png);
        Ok(())
    }

    fn record(&mut self, rel: &str) {
        if !self.written.iter().any(|w| w == rel) {
            self.written.push(rel.to_string());
        }
    }
}
