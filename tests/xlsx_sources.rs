use std::fs;
use std::io::Write;
use std::path::Path;

use datamodeler_lib::infrastructure::xlsx::convert_xlsx_to_csv;
use datamodeler_lib::{DatasetOutcome, IngestConfig, IngestionUseCase};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Towns" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Sheet with text, integer, fractional, boolean and text-date cells.
/// The second town name carries a comma so the CSV writer has to quote it.
const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Town</t></is></c><c r="B1" t="inlineStr"><is><t>Population</t></is></c><c r="C1" t="inlineStr"><is><t>Area km2</t></is></c><c r="D1" t="inlineStr"><is><t>Capital</t></is></c><c r="E1" t="inlineStr"><is><t>Founded</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Nakuru</t></is></c><c r="B2"><v>570674</v></c><c r="C2"><v>290.5</v></c><c r="D2" t="b"><v>0</v></c><c r="E2" t="inlineStr"><is><t>1904-01-01</t></is></c></row>
<row r="3"><c r="A3" t="inlineStr"><is><t>Mombasa, Old Town</t></is></c><c r="B3"><v>1208333</v></c><c r="C3"><v>219</v></c><c r="D3" t="b"><v>1</v></c><c r="E3" t="inlineStr"><is><t>1593-06-01</t></is></c></row>
</sheetData></worksheet>"#;

const EXPECTED_CSV: &str = "Town,Population,Area km2,Capital,Founded\n\
Nakuru,570674,290.5,false,1904-01-01\n\
\"Mombasa, Old Town\",1208333,219,true,1593-06-01\n";

fn write_workbook(path: &Path) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", SHEET),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn workbook_is_converted_to_csv_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let xlsx = dir.path().join("data-Towns.xlsx");
    write_workbook(&xlsx);

    let csv = convert_xlsx_to_csv(&xlsx).unwrap();

    assert_eq!(csv, dir.path().join("data-Towns.csv"));
    assert!(!xlsx.exists());
    assert_eq!(fs::read_to_string(&csv).unwrap(), EXPECTED_CSV);
}

#[tokio::test]
async fn staged_workbook_is_ingested_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let config = IngestConfig::rooted_at(dir.path());
    fs::create_dir_all(&config.staging_dir).unwrap();
    write_workbook(&config.staging_dir.join("data-Towns.xlsx"));

    let use_case = IngestionUseCase::new(config.clone()).unwrap();
    let report = use_case.run_pass().await.unwrap();

    let towns = &report.datasets[0];
    assert_eq!(towns.entity.as_deref(), Some("Towns"));
    assert_eq!(towns.records, 2);
    assert!(towns.degraded.is_none());
    assert!(matches!(towns.outcome, DatasetOutcome::Merged { .. }));

    // Header sanitized in the converted file, workbook gone
    let csv = fs::read_to_string(config.staging_dir.join("data-Towns.csv")).unwrap();
    assert!(csv.starts_with("Town,Population,Areakm2,Capital,Founded\n"));
    assert!(!config.staging_dir.join("data-Towns.xlsx").exists());

    let model = fs::read_to_string(&config.model_file).unwrap();
    assert!(model.contains(
        "entity Towns : managed {\n\
         \tkey ID : Integer;\n\
         \tTown  : String;\n\
         \tPopulation  : Decimal;\n\
         \tAreakm2  : Decimal;\n\
         \tCapital  : Boolean;\n\
         \tFounded  : DateTime;\n\
         }\n"
    ));

    // The next pass reads the CSV left behind and changes nothing
    let second = use_case.run_pass().await.unwrap();
    assert_eq!(second.entities, vec!["Towns"]);
    assert_eq!(fs::read_to_string(&config.model_file).unwrap(), model);
}
