//! Explicit per-run context handed to every stage.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::PipelineConfig;
use crate::observability::{LogSink, NullSink};

/// Configuration and log sink for one run.
#[derive(Clone)]
pub struct PipelineContext {
    /// Run configuration.
    pub config: PipelineConfig,
    /// Destination for leveled log messages.
    pub sink: Arc<dyn LogSink>,
    processing_date: Option<NaiveDate>,
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .field("processing_date", &self.processing_date)
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Context with the given configuration that discards log messages.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NullSink),
            processing_date: None,
        }
    }

    /// Replace the log sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Pin the date recorded in batch metadata instead of reading the local clock.
    pub fn with_processing_date(mut self, date: NaiveDate) -> Self {
        self.processing_date = Some(date);
        self
    }

    /// Date recorded in batch metadata.
    pub fn processing_date(&self) -> NaiveDate {
        self.processing_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
