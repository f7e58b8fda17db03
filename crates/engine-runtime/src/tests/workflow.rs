use super::{EchoProvider, executor, settings};
use crate::{
    error::{RunError, WorkflowError},
    workflow::{WorkflowDefinition, WorkflowRunner},
};
use engine_processing::{error::SetupError, sink::ResultSink};
use model::records::table::Table;
use std::fs;
use tokio_util::sync::CancellationToken;

const CONTACTS: &str = r#"
name: tidy-contacts
steps:
  - name: names
    targets: [name]
    template: To Uppercase
  - name: greeting
    targets: [greeting]
    context: [name]
    ensure_columns: true
    user_prompt: "Write a greeting for {cell}"
"#;

fn contacts() -> Table {
    Table::from_rows(
        vec!["name".into()],
        vec![vec!["ada".into()], vec!["grace".into()]],
    )
    .unwrap()
}

#[test]
fn parses_and_validates_yaml() {
    let definition = WorkflowDefinition::from_yaml(CONTACTS).unwrap();
    assert_eq!(definition.steps.len(), 2);
    assert!(definition.steps[1].ensure_columns);
    assert_eq!(definition.steps[0].template.as_deref(), Some("To Uppercase"));
}

#[test]
fn rejects_steps_without_a_prompt() {
    let yaml = "name: w\nsteps:\n  - name: a\n    targets: [x]\n";
    assert!(matches!(
        WorkflowDefinition::from_yaml(yaml),
        Err(WorkflowError::Invalid(_))
    ));
}

#[test]
fn rejects_duplicate_step_names() {
    let yaml = r#"
name: w
steps:
  - { name: a, targets: [x], user_prompt: p }
  - { name: a, targets: [y], user_prompt: p }
"#;
    let err = WorkflowDefinition::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("duplicate step name 'a'"));
}

#[test]
fn step_ids_are_stable() {
    let definition = WorkflowDefinition::from_yaml(CONTACTS).unwrap();
    let id = definition.step_id(0);
    assert!(id.starts_with("stp-"));
    assert_eq!(id.len(), 20);
    assert_eq!(id, definition.step_id(0));
    assert_ne!(id, definition.step_id(1));
}

#[tokio::test]
async fn later_steps_see_earlier_results() {
    let definition = WorkflowDefinition::from_yaml(CONTACTS).unwrap();
    let executor = executor(settings());
    let provider = EchoProvider::new();
    let mut sink = ResultSink::in_memory(contacts());

    let report = WorkflowRunner::new(&executor)
        .run(&definition, &mut sink, provider.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.steps_run(), 2);
    assert_eq!(report.reports[0].step.as_deref(), Some(definition.step_id(0).as_str()));
    assert_eq!(sink.table().cell(0, "name"), Some("ADA"));
    assert!(sink.table().has_column("greeting"));
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn missing_column_without_ensure_names_the_step() {
    let yaml = r#"
name: w
steps:
  - { name: notes, targets: [notes], user_prompt: p }
"#;
    let definition = WorkflowDefinition::from_yaml(yaml).unwrap();
    let executor = executor(settings());
    let mut sink = ResultSink::in_memory(contacts());

    let err = WorkflowRunner::new(&executor)
        .run(&definition, &mut sink, EchoProvider::new(), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RunError::Workflow(WorkflowError::Step { step, source }) => {
            assert_eq!(step, "notes");
            assert_eq!(source, SetupError::UnknownColumn("notes".into()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cancelled_token_stops_before_the_first_step() {
    let definition = WorkflowDefinition::from_yaml(CONTACTS).unwrap();
    let executor = executor(settings());
    let provider = EchoProvider::new();
    let mut sink = ResultSink::in_memory(contacts());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = WorkflowRunner::new(&executor)
        .run(&definition, &mut sink, provider.clone(), cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.steps_run(), 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn run_file_uses_the_workflow_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.csv");
    fs::write(&path, "name\nada\n").unwrap();

    let yaml = format!(
        "name: w\ninput: {}\nsteps:\n  - {{ name: up, targets: [name], template: to uppercase }}\n",
        path.display()
    );
    let definition = WorkflowDefinition::from_yaml(&yaml).unwrap();
    let executor = executor(settings());

    let report = WorkflowRunner::new(&executor)
        .run_file(&definition, None, EchoProvider::new(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.reports[0].succeeded, 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), "name\nADA\n");
}
