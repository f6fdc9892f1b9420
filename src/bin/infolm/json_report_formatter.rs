use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ReportMeta {
    pub model_dir: String,
    pub measure: String,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub temperature: f64,
    pub max_length: usize,
    pub batch_size: usize,
    pub idf: bool,
    pub device: String,
    pub generated_at: String,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// `null` when the corpus score is not finite.
    pub corpus_score: Option<f64>,
    pub sentence_scores: Vec<Option<f64>>,
}

pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report output directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create report file '{}': {err}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, report).map_err(|err| {
        format!(
            "Failed to serialize report JSON '{}': {err}",
            path.display()
        )
    })?;
    file.write_all(b"\n")
        .map_err(|err| format!("Failed to finalize report file '{}': {err}", path.display()))?;
    Ok(())
}
