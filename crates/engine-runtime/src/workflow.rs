use crate::{
    error::{RunError, WorkflowError},
    executor::{Executor, RunReport, TaskSpec},
    factory,
};
use engine_config::{report::summary::SummaryReport, settings::templates::TemplateLibrary};
use engine_core::connectors::provider::CompletionProvider;
use engine_processing::{error::SetupError, sink::ResultSink};
use model::{jobs::RowRange, records::table::Table};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A named, ordered list of prompt steps run over one table.
///
/// ```yaml
/// name: clean-contacts
/// input: contacts.csv
/// steps:
///   - name: phones
///     targets: [phone]
///     template: Format Phone Number
///   - name: summary
///     targets: [summary]
///     context: [name, phone]
///     ensure_columns: true
///     user_prompt: "One line about {context}"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// Applies to every step that does not set its own range
    #[serde(default)]
    pub rows: Option<RowRange>,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub rows: Option<RowRange>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
    /// Name of a template from the settings library, used instead of `user_prompt`
    #[serde(default)]
    pub template: Option<String>,
    /// Create missing target columns before the step runs
    #[serde(default)]
    pub ensure_columns: bool,
}

impl WorkflowDefinition {
    pub fn from_yaml(text: &str) -> Result<Self, WorkflowError> {
        let definition: WorkflowDefinition = serde_yaml::from_str(text)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_path(path: &Path) -> Result<Self, WorkflowError> {
        let text = std::fs::read_to_string(path).map_err(|source| WorkflowError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Structural checks that need no table.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::Invalid("workflow name is empty".into()));
        }
        if self.steps.is_empty() {
            return Err(WorkflowError::Invalid(format!(
                "workflow '{}' has no steps",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(WorkflowError::Invalid(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
            if step.targets.is_empty() {
                return Err(WorkflowError::Invalid(format!(
                    "step '{}' has no target columns",
                    step.name
                )));
            }
            match (&step.user_prompt, &step.template) {
                (Some(_), Some(_)) => {
                    return Err(WorkflowError::Invalid(format!(
                        "step '{}' sets both user_prompt and template",
                        step.name
                    )));
                }
                (None, None) => {
                    return Err(WorkflowError::Invalid(format!(
                        "step '{}' needs a user_prompt or a template",
                        step.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Stable id of the step at `idx`: same workflow, same position, same id.
    pub fn step_id(&self, idx: usize) -> String {
        let mut h = blake3::Hasher::new();
        h.update(self.name.as_bytes());
        h.update(b":");
        h.update(idx.to_string().as_bytes());
        if let Some(step) = self.steps.get(idx) {
            h.update(b":");
            h.update(step.name.as_bytes());
        }
        format!("stp-{}", &h.finalize().to_hex()[..16])
    }
}

impl WorkflowStep {
    fn task(
        &self,
        default_rows: Option<RowRange>,
        templates: &TemplateLibrary,
    ) -> Result<TaskSpec, WorkflowError> {
        let user_prompt = match (&self.user_prompt, &self.template) {
            (Some(prompt), _) => prompt.clone(),
            (None, Some(name)) => templates
                .resolve(name)
                .map_err(|e| WorkflowError::Invalid(format!("step '{}': {e}", self.name)))?
                .to_string(),
            (None, None) => {
                return Err(WorkflowError::Invalid(format!(
                    "step '{}' needs a user_prompt or a template",
                    self.name
                )));
            }
        };

        Ok(TaskSpec {
            rows: self.rows.or(default_rows),
            targets: self.targets.clone(),
            context: self.context.clone(),
            system_prompt: self.system_prompt.clone(),
            user_prompt,
        })
    }

    fn ensure_columns(&self, table: &mut Table) {
        for target in &self.targets {
            if table.add_column(target.as_str()) {
                info!(step = %self.name, column = %target, "Added target column");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub workflow: String,
    pub reports: Vec<SummaryReport>,
    /// True when a step was cancelled; later steps did not run
    pub cancelled: bool,
}

impl WorkflowReport {
    pub fn steps_run(&self) -> usize {
        self.reports.len()
    }
}

/// Runs workflow steps one after another against the same table.
pub struct WorkflowRunner<'a> {
    executor: &'a Executor,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
        sink: &mut ResultSink,
        provider: Arc<dyn CompletionProvider>,
        cancel: CancellationToken,
    ) -> Result<WorkflowReport, RunError> {
        definition.validate()?;
        let templates = &self.executor.settings().templates;

        let mut report = WorkflowReport {
            workflow: definition.name.clone(),
            reports: Vec::with_capacity(definition.steps.len()),
            cancelled: false,
        };

        for (idx, step) in definition.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let step_id = definition.step_id(idx);
            let task = step.task(definition.rows, templates)?;
            if step.ensure_columns {
                step.ensure_columns(sink.table_mut());
            }

            info!(
                workflow = %definition.name,
                step = %step.name,
                step_id = %step_id,
                "Running workflow step"
            );
            let RunReport { outcome, summary } = match self
                .executor
                .run_task(&task, sink, provider.clone(), cancel.clone())
                .await
            {
                Ok(run) => run,
                Err(RunError::Setup(source)) => return Err(step_error(step, source)),
                Err(e) => return Err(e),
            };

            report.reports.push(summary.with_step(step_id));
            if outcome.cancelled {
                warn!(
                    workflow = %definition.name,
                    step = %step.name,
                    "Step cancelled, remaining steps will not run"
                );
                report.cancelled = true;
                break;
            }
        }

        Ok(report)
    }

    /// Loads the workflow input (or `input` when given), runs every step and
    /// leaves the file saved according to the auto-save setting.
    pub async fn run_file(
        &self,
        definition: &WorkflowDefinition,
        input: Option<&Path>,
        provider: Arc<dyn CompletionProvider>,
        cancel: CancellationToken,
    ) -> Result<WorkflowReport, RunError> {
        let path = input
            .map(Path::to_path_buf)
            .or_else(|| definition.input.clone())
            .ok_or_else(|| {
                WorkflowError::Invalid(format!(
                    "workflow '{}' has no input file",
                    definition.name
                ))
            })?;

        let store = factory::create_store(&path)?;
        let table = store.load()?;
        let mut sink = ResultSink::with_store(table, store);
        self.run(definition, &mut sink, provider, cancel).await
    }
}

fn step_error(step: &WorkflowStep, source: SetupError) -> RunError {
    WorkflowError::Step {
        step: step.name.clone(),
        source,
    }
    .into()
}
