use std::io::Write;

use async_trait::async_trait;
use clap::ValueEnum;

use super::tables::projects_table;
use crate::error::{PersistError, PersistFailure};
use crate::feed;
use crate::persist::PersistenceProvider;
use crate::status::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PreviewFormat {
    Table,
    Xml,
    Json,
}

/// Renders the aggregated projects instead of publishing them.
pub struct PreviewSink<W> {
    format: PreviewFormat,
    out: std::sync::Mutex<W>,
}

impl<W: Write + Send> PreviewSink<W> {
    pub fn new(format: PreviewFormat, out: W) -> Self {
        Self {
            format,
            out: std::sync::Mutex::new(out),
        }
    }

    fn render(&self, projects: &[Project]) -> Result<Vec<u8>, PersistFailure> {
        let rendered = match self.format {
            PreviewFormat::Table => format!("{}\n", projects_table(projects)).into_bytes(),
            PreviewFormat::Xml => feed::encode_to_vec(projects)?,
            PreviewFormat::Json => {
                let mut json = serde_json::to_vec_pretty(projects).map_err(std::io::Error::from)?;
                json.push(b'\n');
                json
            }
        };
        Ok(rendered)
    }
}

#[async_trait]
impl<W: Write + Send> PersistenceProvider for PreviewSink<W> {
    async fn persist_projects(&self, projects: &[Project]) -> Result<(), PersistError> {
        let rendered = self
            .render(projects)
            .map_err(|e| PersistError::new(self.target(), e))?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| PersistError::new(self.target(), std::io::Error::other("output lock poisoned")))?;
        out.write_all(&rendered)
            .and_then(|()| out.flush())
            .map_err(|e| PersistError::new(self.target(), e))
    }

    fn target(&self) -> String {
        "stdout".to_string()
    }
}
