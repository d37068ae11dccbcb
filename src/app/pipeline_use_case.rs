use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::app::ports::{DatasetWriterPort, ReportSinkPort, RowReaderPort};
use crate::common::constants;
use crate::config::Config;
use crate::pipeline::engine::{EngineRun, PipelineEngine, PipelineState};
use crate::pipeline::processing::profile::ProfileReport;
use crate::pipeline::report;

/// Use case for the single orchestrated pipeline run: reads rows through
/// the reader port, drives the engine through its stages, and routes the
/// finalized artifacts to the writer and sink ports. Every run hands the
/// sink a finalized execution report, whether it saved or aborted.
pub struct PipelineUseCase {
    config: Config,
    reader: Box<dyn RowReaderPort>,
    writer: Box<dyn DatasetWriterPort>,
    sink: Box<dyn ReportSinkPort>,
}

impl PipelineUseCase {
    pub fn new(
        config: Config,
        reader: Box<dyn RowReaderPort>,
        writer: Box<dyn DatasetWriterPort>,
        sink: Box<dyn ReportSinkPort>,
    ) -> Self {
        Self {
            config,
            reader,
            writer,
            sink,
        }
    }

    /// Run the full pipeline. Returns the terminal engine run; callers map
    /// Saved/Aborted to their exit status.
    pub async fn run(&self) -> Result<EngineRun> {
        let dataset = self.reader.read().await.map_err(|e| anyhow!(e))?;
        info!(rows = dataset.len(), "dataset loaded");

        let engine = PipelineEngine::new(self.config.clone());
        let mut run = engine.run(dataset);

        // Stage reports are produced for both terminal states
        self.write_stage_reports(&run).await?;

        if run.is_aborted() {
            warn!("pipeline aborted; no dataset artifacts written");
            self.write_execution_report(&run).await?;
            return Ok(run);
        }

        // Save: cleaned + masked datasets, then the finalized report
        self.writer
            .write_dataset(constants::CLEANED_DATASET_FILE, &run.cleaned)
            .await
            .map_err(|e| anyhow!(e))?;
        let masked = run
            .masked
            .as_ref()
            .ok_or_else(|| anyhow!("non-aborted run produced no masked dataset"))?;
        self.writer
            .write_dataset(constants::MASKED_DATASET_FILE, masked)
            .await
            .map_err(|e| anyhow!(e))?;

        engine.mark_saved(&mut run);
        self.write_execution_report(&run).await?;

        info!(run_id = %run.report.run_id, "pipeline run saved");
        Ok(run)
    }

    /// Profile the raw dataset without running the pipeline
    pub async fn profile(&self) -> Result<ProfileReport> {
        let dataset = self.reader.read().await.map_err(|e| anyhow!(e))?;
        let profile = crate::pipeline::processing::profile::run(&dataset, &self.config.cleaning);
        self.sink
            .write_report(
                constants::QUALITY_PROFILE_REPORT,
                &report::render_quality_profile(&profile),
            )
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(profile)
    }

    /// The finalized execution report goes out in both human-readable and
    /// machine-readable form
    async fn write_execution_report(&self, run: &EngineRun) -> Result<()> {
        self.sink
            .write_report(
                constants::EXECUTION_REPORT,
                &report::render_execution_report(&run.report),
            )
            .await
            .map_err(|e| anyhow!(e))?;
        self.sink
            .write_report(
                constants::EXECUTION_REPORT_JSON,
                &report::render_execution_json(&run.report)?,
            )
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn write_stage_reports(&self, run: &EngineRun) -> Result<()> {
        self.sink
            .write_report(
                constants::QUALITY_PROFILE_REPORT,
                &report::render_quality_profile(&run.profile),
            )
            .await
            .map_err(|e| anyhow!(e))?;
        self.sink
            .write_report(
                constants::CLEANING_LOG_REPORT,
                &report::render_cleaning_log(&run.clean_summary, run.cleaned.len()),
            )
            .await
            .map_err(|e| anyhow!(e))?;
        self.sink
            .write_report(
                constants::VALIDATION_RESULTS_REPORT,
                &report::render_validation_results(&run.validation),
            )
            .await
            .map_err(|e| anyhow!(e))?;
        if let Some(exposure) = &run.exposure {
            self.sink
                .write_report(
                    constants::PII_DETECTION_REPORT,
                    &report::render_pii_report(exposure),
                )
                .await
                .map_err(|e| anyhow!(e))?;
        }
        if let (Some(masked), Some(mask_summary)) = (&run.masked, &run.mask_summary) {
            self.sink
                .write_report(
                    constants::MASKED_SAMPLE_REPORT,
                    &report::render_masked_sample(masked, mask_summary, &self.config.masking),
                )
                .await
                .map_err(|e| anyhow!(e))?;
        }
        Ok(())
    }
}
