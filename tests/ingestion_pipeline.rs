use std::fs;
use std::path::Path;

use datamodeler_lib::infrastructure::artifact_store::StoreLock;
use datamodeler_lib::application::use_cases::schema_registry::MergeOutcome;
use datamodeler_lib::{AppError, DatasetOutcome, IngestConfig, IngestionUseCase, ReconcilePolicy};
use tempfile::TempDir;

fn staging(files: &[(&str, &str)]) -> (TempDir, IngestConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = IngestConfig::rooted_at(dir.path());
    fs::create_dir_all(&config.staging_dir).unwrap();
    for (name, content) in files {
        fs::write(config.staging_dir.join(name), content).unwrap();
    }
    (dir, config)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

const CSV: &str = "Notes,ID,Name,IsActive,Count,CreatedDate\n\
\"first\nline\",1,Ann,1,1,2020-05-01\n\
plain,2,Bob,0,0,\n";

const JSON: &str = r#"[{"title": "x", "price": "9.5"}, {"title": "y", "price": ""}]"#;

const XML: &str = "<catalog><books><book><isbn>978</isbn><published>2021-03-04</published></book>\
<book><isbn>979</isbn><published>2022-01-01</published></book></books></catalog>";

#[tokio::test]
async fn second_pass_leaves_artifacts_byte_identical() {
    let (_dir, config) = staging(&[
        ("data-A.csv", CSV),
        ("data-B.json", JSON),
        ("data-C.xml", XML),
    ]);
    let use_case = IngestionUseCase::new(config.clone()).unwrap();

    let first = use_case.run_pass().await.unwrap();
    assert_eq!(first.entities, vec!["A", "B", "C"]);
    let model = read(&config.model_file);
    let service = read(&config.service_file);

    let second = use_case.run_pass().await.unwrap();
    assert!(!second.service_written);
    assert!(second.datasets.iter().all(|d| matches!(
        &d.outcome,
        DatasetOutcome::Merged { merge } if !merge.changed_registry()
    )));
    assert_eq!(read(&config.model_file), model);
    assert_eq!(read(&config.service_file), service);
    assert_eq!(model.matches("entity A : managed").count(), 1);
}

#[tokio::test]
async fn csv_dataset_types_and_single_primary_key() {
    let (_dir, config) = staging(&[("data-A.csv", CSV)]);
    IngestionUseCase::new(config.clone())
        .unwrap()
        .run_pass()
        .await
        .unwrap();

    let model = read(&config.model_file);
    assert!(model.starts_with("namespace data;\nusing { managed } from '@sap/cds/common';\n"));
    assert!(model.contains(
        "\nentity A : managed {\n\
         \tkey ID : Integer;\n\
         \tNotes  : String;\n\
         \tdatasource_id  : Decimal;\n\
         \tName  : String;\n\
         \tIsActive  : Boolean;\n\
         \tCount  : Decimal;\n\
         \tCreatedDate  : DateTime;\n\
         }\n"
    ));
    assert_eq!(model.matches("key ").count(), 1);

    // The wrapped value was joined and the file rewritten in place
    let csv = read(&config.staging_dir.join("data-A.csv"));
    assert!(csv.starts_with("Notes,datasource_id,Name,IsActive,Count,CreatedDate\n"));
    assert!(csv.contains("\"first line\""));
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn service_lists_entities_in_model_order() {
    let (_dir, config) = staging(&[("data-A.json", JSON), ("data-B.json", JSON)]);
    IngestionUseCase::new(config.clone())
        .unwrap()
        .run_pass()
        .await
        .unwrap();

    assert_eq!(
        read(&config.service_file),
        "using { data as my } from '../db/schema';\n\
         service CatalogService @(path:'/data') {\n\
         \t@readonly entity A as SELECT from my.A {*} excluding { createdAt, createdBy, modifiedAt, modifiedBy };\n\
         \t@readonly entity B as SELECT from my.B {*} excluding { createdAt, createdBy, modifiedAt, modifiedBy };\n\
         }\n"
    );
}

#[tokio::test]
async fn xml_collection_and_json_skip_votes() {
    let (_dir, config) = staging(&[("data-B.json", JSON), ("data-C.xml", XML)]);
    IngestionUseCase::new(config.clone())
        .unwrap()
        .run_pass()
        .await
        .unwrap();

    let model = read(&config.model_file);
    assert!(model.contains("entity B : managed {\n\tkey ID : Integer;\n\ttitle  : String;\n\tprice  : Decimal;\n}\n"));
    assert!(model.contains("entity C : managed {\n\tkey ID : Integer;\n\tisbn  : Decimal;\n\tpublished  : DateTime;\n}\n"));
}

#[tokio::test]
async fn broken_workbook_does_not_abort_pass() {
    let (_dir, config) = staging(&[
        ("data-A.json", JSON),
        ("data-Book.xlsx", "PK not really a workbook"),
    ]);
    let report = IngestionUseCase::new(config.clone())
        .unwrap()
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.entities, vec!["A"]);
    let book = &report.datasets[1];
    assert_eq!(book.outcome, DatasetOutcome::Empty);
    assert!(book.degraded.is_some());
}

#[tokio::test]
async fn version_policy_registers_new_shape_separately() {
    let (_dir, mut config) = staging(&[("data-A.json", r#"[{"x": "1"}]"#)]);
    config.reconcile_policy = ReconcilePolicy::Version;
    let use_case = IngestionUseCase::new(config.clone()).unwrap();
    use_case.run_pass().await.unwrap();

    fs::write(config.staging_dir.join("data-A.json"), r#"[{"x": "1", "y": "true"}]"#).unwrap();
    let report = use_case.run_pass().await.unwrap();

    assert_eq!(report.entities, vec!["A", "A_v2"]);
    assert!(read(&config.service_file).contains("entity A_v2 as SELECT from my.A_v2"));
}

#[tokio::test]
async fn held_writer_lock_fails_the_pass() {
    let (_dir, config) = staging(&[("data-A.json", JSON)]);
    let _lock = StoreLock::acquire(&config.model_file).unwrap();

    let err = IngestionUseCase::new(config.clone())
        .unwrap()
        .run_pass()
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::LockError(_)));
    assert!(!config.model_file.exists());
}

#[tokio::test]
async fn renamed_id_column_is_stable_across_passes() {
    let (_dir, config) = staging(&[("data-A.csv", "ID,Name\n1,Ann\n")]);
    let use_case = IngestionUseCase::new(config.clone()).unwrap();
    let csv_path = config.staging_dir.join("data-A.csv");

    use_case.run_pass().await.unwrap();
    let model = read(&config.model_file);
    assert_eq!(read(&csv_path), "datasource_id,Name\n1,Ann\n");

    let second = use_case.run_pass().await.unwrap();
    assert_eq!(
        second.datasets[0].outcome,
        DatasetOutcome::Merged {
            merge: MergeOutcome::Unchanged { entity: "A".into() }
        }
    );
    assert_eq!(read(&csv_path), "datasource_id,Name\n1,Ann\n");
    assert_eq!(read(&config.model_file), model);
    assert!(!model.contains("datasourceid"));
}

#[tokio::test]
async fn existing_model_text_is_kept_verbatim() {
    let (_dir, config) = staging(&[("data-A.json", JSON)]);
    let existing = "namespace data;\nusing { managed } from '@sap/cds/common';\n\n\
                    // maintained by hand\n\
                    entity Books : managed {\n\
                    \tkey ID : Integer;\n\
                    \ttitle : String(111);\n\
                    \tauthor : Association to Authors;\n\
                    }\n";
    fs::create_dir_all(config.model_file.parent().unwrap()).unwrap();
    fs::write(&config.model_file, existing).unwrap();

    let report = IngestionUseCase::new(config.clone())
        .unwrap()
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.entities, vec!["Books", "A"]);
    let model = read(&config.model_file);
    assert!(model.starts_with(existing));
    assert!(model.ends_with("\nentity A : managed {\n\tkey ID : Integer;\n\ttitle  : String;\n\tprice  : Decimal;\n}\n"));
}

#[tokio::test]
async fn leading_blank_lines_do_not_erase_csv() {
    let (_dir, config) = staging(&[
        ("data-A.csv", "\nName,Count\nAnn,1\n"),
        ("data-B.csv", "\n  \n"),
    ]);
    let report = IngestionUseCase::new(config.clone())
        .unwrap()
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.entities, vec!["A"]);
    assert_eq!(read(&config.staging_dir.join("data-A.csv")), "Name,Count\nAnn,1\n");

    let blank = &report.datasets[1];
    assert_eq!(blank.outcome, DatasetOutcome::Empty);
    assert!(blank.degraded.is_some());
    assert_eq!(read(&config.staging_dir.join("data-B.csv")), "\n  \n");
}
