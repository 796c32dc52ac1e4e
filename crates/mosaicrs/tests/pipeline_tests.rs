//! End-to-end task runs over the built-in and instrumented steps.

mod common;

use serde_json::{json, Value};

use common::harness::parse_progress;
use common::{DefinitionBuilder, DocumentsBuilder, TestHarness};
use mosaicrs::TaskState;

#[test]
fn test_stemmer_end_to_end() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("dogs")
        .step("1", "stemmer", json!({"input": "full-text", "output": "cleaned-text"}))
        .build();
    let documents = DocumentsBuilder::new().document("running dogs", "eng").build();

    let task = harness.task(definition, documents);
    task.start().unwrap();
    assert!(task.wait(common::harness::WAIT));

    let status = task.status();
    assert_eq!(status.state, TaskState::Completed);
    assert_eq!(status.pipeline_percentage, 1.0);
    assert_eq!(status.step_percentage, 1.0);
    assert_eq!(status.pipeline_progress, "1/1");
    let rows = status.result.unwrap();
    assert_eq!(rows[0]["cleaned-text"], json!("run dog"));
    assert_eq!(rows[0]["full-text"], json!("running dogs"));

    let table = task.result_table().unwrap();
    assert_eq!(table.history().len(), 1);
    assert_eq!(table.text_column(), Some("cleaned-text"));
}

#[test]
fn test_unsupported_language_passes_text_through() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "stemmer", json!({"input": "full-text"}))
        .build();
    let documents = DocumentsBuilder::new().document("running dogs", "xx").build();

    let status = harness.run(definition, documents);

    assert_eq!(status.state, TaskState::Completed);
    assert_eq!(status.result.unwrap()[0]["cleaned-text"], json!("running dogs"));
    assert!(status
        .log
        .iter()
        .any(|entry| entry.message == "Languages: xx are not supported for stemming."));
}

#[test]
fn test_steps_run_in_numeric_key_order() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("10", "record", json!({"label": "ten"}))
        .step("2", "record", json!({"label": "two"}))
        .step("-1", "record", json!({"label": "minus one"}))
        .build();

    let status = harness.run(definition, DocumentsBuilder::new().build());

    assert_eq!(status.state, TaskState::Completed);
    assert_eq!(harness.recorded(), vec!["minus one", "two", "ten"]);
}

#[test]
fn test_duplicate_inputs_are_served_from_cache() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "slow_upper", json!({"input": "full-text"}))
        .build();
    let documents = DocumentsBuilder::new()
        .document("alpha", "eng")
        .document("beta", "eng")
        .document("alpha", "eng")
        .document("alpha", "eng")
        .build();

    let task = harness.task(definition, documents);
    task.start().unwrap();
    assert!(task.wait(common::harness::WAIT));

    assert_eq!(harness.invocations(), 2);
    let stats = task.cache_stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);

    let upper: Vec<Value> = task
        .status()
        .result
        .unwrap()
        .iter()
        .map(|row| row["upper"].clone())
        .collect();
    assert_eq!(upper, vec![json!("ALPHA"), json!("BETA"), json!("ALPHA"), json!("ALPHA")]);
}

#[test]
fn test_cache_is_shared_across_steps_of_one_task() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "slow_upper", json!({"input": "full-text", "output": "first"}))
        .step("2", "slow_upper", json!({"input": "full-text", "output": "second"}))
        .build();
    let documents = DocumentsBuilder::new().numbered(5).build();

    let status = harness.run(definition, documents);

    assert_eq!(status.state, TaskState::Completed);
    assert_eq!(harness.invocations(), 5);
    let rows = status.result.unwrap();
    assert_eq!(rows[3]["first"], rows[3]["second"]);
}

#[test]
fn test_cache_does_not_leak_between_tasks() {
    let harness = TestHarness::new();
    let definition = || {
        DefinitionBuilder::new("q")
            .step("1", "slow_upper", json!({"input": "full-text"}))
            .build()
    };

    harness.run(definition(), DocumentsBuilder::new().numbered(3).build());
    harness.run(definition(), DocumentsBuilder::new().numbered(3).build());

    assert_eq!(harness.invocations(), 6);
}

#[test]
fn test_history_is_append_only_and_isolated() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "text_cleaner", json!({"input": "full-text", "lowercase": true}))
        .step("2", "stemmer", json!({"input": "cleaned-text"}))
        .build();
    let documents = DocumentsBuilder::new().document("Running, DOGS!", "eng").build();

    let task = harness.task(definition, documents);
    task.start().unwrap();
    assert!(task.wait(common::harness::WAIT));

    let mut table = task.result_table().unwrap();
    assert_eq!(table.history().keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(
        table.history_entry(1).unwrap().cell(0, "cleaned-text"),
        Some(&json!("running dogs"))
    );
    assert_eq!(
        table.history_entry(2).unwrap().cell(0, "cleaned-text"),
        Some(&json!("run dog"))
    );

    // Later edits to the live table never reach recorded snapshots.
    table.documents.remove_column("cleaned-text");
    assert!(table.history_entry(2).unwrap().has_column("cleaned-text"));
    assert!(task.result_table().unwrap().documents.has_column("cleaned-text"));
}

#[test]
fn test_missing_input_column_is_logged_not_fatal() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "text_cleaner", json!({"input": "summary"}))
        .build();

    let status = harness.run(definition, DocumentsBuilder::new().numbered(2).build());

    assert_eq!(status.state, TaskState::Completed);
    assert!(status.log[0].message.contains("'summary'"));
    assert!(!status.result.unwrap()[0].contains_key("cleaned-text"));
}

#[test]
fn test_document_statistics_fill_metadata() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "text_cleaner", json!({"input": "full-text"}))
        .step("2", "document_statistics", json!({}))
        .build();
    let documents = DocumentsBuilder::new()
        .document("...", "eng")
        .document("text", "eng")
        .build();

    let status = harness.run(definition, documents);

    let metadata = status.metadata.unwrap();
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[0]["column"], json!("cleaned-text"));
    assert_eq!(metadata[0]["emptyTexts"], json!(1));
}

#[test]
fn test_progress_is_monotonic() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "slow_upper", json!({"input": "full-text"}))
        .step("2", "record", json!({"label": "after"}))
        .build();
    let task = harness.task(definition, DocumentsBuilder::new().numbered(200).build());
    task.start().unwrap();

    let mut last_pipeline = 0.0;
    let mut last_step = (String::new(), 0);
    loop {
        let status = task.status();
        assert!(status.pipeline_percentage >= last_pipeline);
        last_pipeline = status.pipeline_percentage;

        let (current, total) = parse_progress(&status.step_progress);
        assert!(current <= total || total == 0);
        if status.current_step == last_step.0 {
            assert!(current >= last_step.1, "step progress went backwards");
        }
        last_step = (status.current_step.clone(), current);

        if status.is_finished() {
            assert_eq!(status.state, TaskState::Completed);
            assert_eq!(status.pipeline_percentage, 1.0);
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}

#[test]
fn test_status_is_consistent_while_running() {
    let harness = TestHarness::new();
    let definition = DefinitionBuilder::new("q")
        .step("1", "slow_upper", json!({"input": "full-text"}))
        .build();
    let task = harness.task(definition, DocumentsBuilder::new().numbered(1000).build());
    task.start().unwrap();

    let status = common::harness::wait_until(&task, |s| s.current_step == "Slow Upper");
    assert_eq!(status.state, TaskState::Running);
    assert!(status.result.is_none());
    assert!(status.started_at.is_some());
    assert!(status.finished_at.is_none());

    task.cancel().unwrap();
    assert_eq!(task.state(), TaskState::Cancelled);
}
