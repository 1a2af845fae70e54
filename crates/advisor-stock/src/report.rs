//! Writes the Analysis and Recommendation documents

use crate::config::OutputSettings;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Persists stage outputs into the configured output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    analysis_path: PathBuf,
    recommendation_path: PathBuf,
}

impl ReportWriter {
    pub fn new(settings: &OutputSettings) -> Self {
        Self {
            analysis_path: settings.analysis_path(),
            recommendation_path: settings.recommendation_path(),
        }
    }

    pub fn analysis_path(&self) -> &Path {
        &self.analysis_path
    }

    pub fn recommendation_path(&self) -> &Path {
        &self.recommendation_path
    }

    /// Write the analysis text verbatim, replacing any earlier file
    pub async fn write_analysis(&self, text: &str) -> Result<PathBuf> {
        write(&self.analysis_path, text).await?;
        Ok(self.analysis_path.clone())
    }

    /// Write the recommendation text verbatim, replacing any earlier file
    pub async fn write_recommendation(&self, text: &str) -> Result<PathBuf> {
        write(&self.recommendation_path, text).await?;
        Ok(self.recommendation_path.clone())
    }
}

async fn write(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text).await?;
    info!("Wrote {} ({} bytes)", path.display(), text.len());
    Ok(())
}
