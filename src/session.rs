//! Per-user session state.
//!
//! A [`Session`] is an explicit value owned by whoever drives the user
//! interaction (the CLI here). It holds the active pipeline, the dataset it was
//! built from and the credential for the question-answering service. Nothing
//! is global, so independent sessions never interfere.

use crate::ai::{self, TextGenerator};
use crate::config::AppConfig;
use crate::error::{Result, TableTalkError};
use crate::export::{self, ExportFormat};
use crate::ingest;
use crate::pipeline::{ApplyOutcome, Operation, Pipeline};
use crate::table::{TableSummary, summarize};
use secrecy::SecretString;

/// Result of [`Session::upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A new pipeline was created from the file
    Loaded { rows: usize, columns: usize },

    /// The same file name is already active; pipeline and history were kept
    Unchanged,
}

pub struct Session {
    config: AppConfig,
    api_key: Option<SecretString>,
    filename: Option<String>,
    pipeline: Option<Pipeline>,
}

impl Session {
    pub fn new(config: AppConfig, api_key: Option<SecretString>) -> Self {
        Self {
            config,
            api_key,
            filename: None,
            pipeline: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    fn missing_credentials() -> TableTalkError {
        TableTalkError::Config(format!(
            "API key not configured: set {} (or add it to a .env file)",
            crate::config::API_KEY_VARS.join(" or ")
        ))
    }

    /// Gate for upload, transform and export when the config asks for it.
    fn require_credentials_for_data(&self) -> Result<()> {
        if self.config.require_credentials_for_all && !self.has_credentials() {
            return Err(Self::missing_credentials());
        }
        Ok(())
    }

    fn active(&self) -> Result<&Pipeline> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| TableTalkError::Other("No dataset loaded".to_owned()))
    }

    fn active_mut(&mut self) -> Result<&mut Pipeline> {
        self.pipeline
            .as_mut()
            .ok_or_else(|| TableTalkError::Other("No dataset loaded".to_owned()))
    }

    /// Ingest `bytes` and start a fresh pipeline, unless `filename` is the
    /// dataset already loaded.
    ///
    /// # Errors
    ///
    /// Ingest failures leave any existing pipeline in place.
    pub fn upload(&mut self, filename: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        self.require_credentials_for_data()?;

        if self.pipeline.is_some() && self.filename.as_deref() == Some(filename) {
            tracing::debug!(file = filename, "Dataset already loaded");
            return Ok(UploadOutcome::Unchanged);
        }

        let table = ingest::load(bytes, filename)?;
        let outcome = UploadOutcome::Loaded {
            rows: table.height(),
            columns: table.width(),
        };
        match &mut self.pipeline {
            Some(pipeline) => pipeline.initialize(table),
            None => self.pipeline = Some(Pipeline::new(table)),
        }
        self.filename = Some(filename.to_owned());
        Ok(outcome)
    }

    /// # Errors
    ///
    /// See [`Pipeline::apply`]; also fails when nothing is loaded.
    pub fn apply(&mut self, op: &Operation) -> Result<ApplyOutcome> {
        self.require_credentials_for_data()?;
        self.active_mut()?.apply(op)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.require_credentials_for_data()?;
        self.active_mut()?.reset();
        Ok(())
    }

    pub fn summary(&self) -> Result<TableSummary> {
        summarize(self.active()?.current(), self.config.preview_rows)
    }

    /// Answer a question about the current table.
    ///
    /// # Errors
    ///
    /// Requires credentials regardless of `require_credentials_for_all`.
    pub async fn ask(&self, generator: &dyn TextGenerator, question: &str) -> Result<String> {
        if !self.has_credentials() {
            return Err(Self::missing_credentials());
        }
        let summary = self.summary()?;
        ai::ask(generator, &summary, question).await
    }

    /// Serialize the current table and its history.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>> {
        self.require_credentials_for_data()?;
        let pipeline = self.active()?;
        export::export(pipeline.current(), pipeline.log(), format)
    }

    /// Download name for the current dataset (`<stem>.<ext>`).
    pub fn export_file_name(&self, stem: Option<&str>, format: ExportFormat) -> String {
        let stem = stem.map(str::to_owned).unwrap_or_else(|| {
            self.filename
                .as_deref()
                .and_then(|f| std::path::Path::new(f).file_stem())
                .and_then(|s| s.to_str())
                .map_or_else(|| "transformed_data".to_owned(), |s| format!("{s}_transformed"))
        });
        export::file_name(&stem, format)
    }
}
