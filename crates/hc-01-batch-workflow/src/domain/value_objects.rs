//! # Value Objects
//!
//! Result payloads carried by `complete` and the subsystem configuration.

use super::errors::{WorkflowError, WorkflowResult};
use super::identity::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SUFFIX_LEN};
use super::state_machine::Evidence;
use serde::{Deserialize, Serialize};
use shared_types::{
    ActorId, BatchAttributes, BatchId, BatchStatus, ProcessingStep, QualityTest, Role,
    TestOutcome, Timestamp,
};

/// Processor's report for `processing -> awaiting_test`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub process_type: String,
    pub input_quantity: f64,
    pub output_quantity: f64,
    pub temperature_c: Option<f64>,
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub notes: String,
}

/// Laboratory's result for `tested -> completed | rejected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub moisture_content: f64,
    pub purity: f64,
    pub pesticide_level: f64,
    pub overall_result: TestOutcome,
    #[serde(default)]
    pub notes: String,
}

/// Payload of a `complete` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionReport {
    Processing(ProcessingReport),
    QualityTest(TestReport),
}

impl CompletionReport {
    /// The role allowed to file this report.
    pub fn role(&self) -> Role {
        match self {
            CompletionReport::Processing(_) => Role::Processor,
            CompletionReport::QualityTest(_) => Role::Laboratory,
        }
    }

    /// Target status and the evidence this report provides.
    pub fn outcome(&self) -> (BatchStatus, Evidence) {
        match self {
            CompletionReport::Processing(_) => {
                (BatchStatus::AwaitingTest, Evidence::ProcessingReport)
            }
            CompletionReport::QualityTest(report) if report.overall_result.is_pass() => {
                (BatchStatus::Completed, Evidence::PassingTest)
            }
            CompletionReport::QualityTest(_) => (BatchStatus::Rejected, Evidence::FailingTest),
        }
    }

    /// Reject non-finite or out-of-range metrics.
    pub fn validate(&self) -> WorkflowResult<()> {
        match self {
            CompletionReport::Processing(report) => {
                require(!report.process_type.trim().is_empty(), "process_type is required")?;
                require(
                    non_negative(report.input_quantity),
                    "input_quantity must be a non-negative number",
                )?;
                require(
                    non_negative(report.output_quantity),
                    "output_quantity must be a non-negative number",
                )?;
                require(
                    report.temperature_c.map_or(true, f64::is_finite),
                    "temperature_c must be a number",
                )
            }
            CompletionReport::QualityTest(report) => {
                require(percent(report.moisture_content), "moisture_content must be 0..=100")?;
                require(percent(report.purity), "purity must be 0..=100")?;
                require(
                    non_negative(report.pesticide_level),
                    "pesticide_level must be a non-negative number",
                )
            }
        }
    }

    /// The processing step record for this report.
    pub fn processing_step(
        report: &ProcessingReport,
        batch_id: &BatchId,
        sequence: u32,
        processor_id: &ActorId,
        now: Timestamp,
    ) -> ProcessingStep {
        ProcessingStep {
            batch_id: batch_id.clone(),
            sequence,
            processor_id: processor_id.clone(),
            process_type: report.process_type.clone(),
            input_quantity: report.input_quantity,
            output_quantity: report.output_quantity,
            temperature_c: report.temperature_c,
            duration_minutes: report.duration_minutes,
            notes: report.notes.clone(),
            recorded_at: now,
            ledger_ref: None,
        }
    }

    /// The quality test record for this report.
    pub fn quality_test(
        report: &TestReport,
        batch_id: &BatchId,
        sequence: u32,
        lab_id: &ActorId,
        now: Timestamp,
    ) -> QualityTest {
        QualityTest {
            batch_id: batch_id.clone(),
            sequence,
            lab_id: lab_id.clone(),
            moisture_content: report.moisture_content,
            purity: report.purity,
            pesticide_level: report.pesticide_level,
            overall_result: report.overall_result,
            notes: report.notes.clone(),
            tested_at: now,
            ledger_ref: None,
        }
    }
}

fn require(condition: bool, message: &str) -> WorkflowResult<()> {
    if condition {
        Ok(())
    } else {
        Err(WorkflowError::Validation(message.to_string()))
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn percent(value: f64) -> bool {
    non_negative(value) && value <= 100.0
}

/// Validate collector-supplied attributes.
pub fn validate_attributes(attributes: &BatchAttributes) -> WorkflowResult<()> {
    require(
        !attributes.herb_species.trim().is_empty(),
        "herb_species is required",
    )?;
    require(
        attributes.quantity.is_finite() && attributes.quantity > 0.0,
        "quantity must be a positive number",
    )?;
    require(!attributes.location.trim().is_empty(), "location is required")
}

/// Workflow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Id candidates tried before `IdGenerationExhausted`.
    pub id_max_attempts: u32,
    /// Random suffix length of generated ids.
    pub id_suffix_len: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            id_max_attempts: DEFAULT_MAX_ATTEMPTS,
            id_suffix_len: DEFAULT_SUFFIX_LEN,
        }
    }
}
