//! Integration tests for the Excel adapter feeding the processor: a
//! workbook is written to disk, adapted through calamine, and processed
//! into the in-memory store.

use geosheet_core::attributes::{Attribute, AttributeKind, AttributeSet, KeyAttributeIdentity};
use geosheet_service::bounds::KeyColumnBounds;
use geosheet_service::excel::open_sheet;
use geosheet_service::store::MemoryStore;
use geosheet_service::update::NoopContextUpdater;
use geosheet_service::SheetProcessor;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Workbook;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn plot_processor() -> SheetProcessor {
    let attributes = AttributeSet::new(
        vec![
            Attribute::column("plot_no", AttributeKind::Integer, 0),
            Attribute::column("name", AttributeKind::String, 1),
        ],
        KeyAttributeIdentity::new("plot_no"),
    )
    .expect("attribute names are unique");
    SheetProcessor::new(
        "plot",
        attributes,
        Box::new(KeyColumnBounds::new(0).skip_header_rows(1)),
        Box::new(NoopContextUpdater),
    )
}

fn write_survey_workbook(path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("plots")?;

    worksheet.write_string(0, 0, "plot")?;
    worksheet.write_string(0, 1, "name")?;
    worksheet.write_number(1, 0, 1.0)?;
    worksheet.write_string(1, 1, "Wet meadow")?;
    worksheet.write_number(2, 0, 2.0)?;
    worksheet.write_string(2, 1, "Fen")?;
    // A trailing note two rows below the data; the blank row in between
    // ends the data region before the note is ever looked at.
    worksheet.write_string(4, 1, "surveyed 2024")?;

    workbook.save(path)?;
    Ok(())
}

#[tokio::test]
async fn excel_worksheet_flows_into_the_store() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("survey.xlsx");
    write_survey_workbook(&path)?;

    let sheet = open_sheet(&path, Some("plots"))?;
    let store = MemoryStore::new();
    plot_processor().process(&sheet, &store).await?;

    let records = store.records("plot");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id().as_str(), "plot.1");
    assert_eq!(records[0].value("name"), Some(&json!("Wet meadow")));
    assert_eq!(records[1].id().as_str(), "plot.2");
    assert_eq!(records[1].value("name"), Some(&json!("Fen")));
    // Numeric cells come back as floats from the workbook and are
    // coerced to integers by the attribute kind.
    assert_eq!(records[0].value("plot_no"), Some(&json!(1)));
    Ok(())
}

#[tokio::test]
async fn reprocessing_the_same_workbook_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("survey.xlsx");
    write_survey_workbook(&path)?;

    let store = MemoryStore::new();
    let processor = plot_processor();

    processor.process(&open_sheet(&path, None)?, &store).await?;
    let first_pass = store.records("plot");
    let journal_after_first = store.journal().len();

    processor.process(&open_sheet(&path, None)?, &store).await?;
    assert_eq!(store.records("plot"), first_pass);
    assert_eq!(store.journal().len(), journal_after_first);
    Ok(())
}

#[test]
fn missing_worksheet_is_a_sheet_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("survey.xlsx");
    write_survey_workbook(&path).expect("workbook written");

    let err = open_sheet(&path, Some("no-such-sheet")).unwrap_err();
    assert!(matches!(err, geosheet_service::ProcessError::Sheet(_)));
}
