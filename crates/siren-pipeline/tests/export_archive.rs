//! Export pipeline surface tests

use serde::Serialize;
use siren_pipeline::export::ChunkedExporter;

#[derive(Serialize)]
struct Row {
    #[serde(rename = "incidentNumber")]
    incident_number: i64,
    zone: String,
    alarm: String,
}

fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| Row {
            incident_number: i as i64,
            zone: format!("{}", i % 16),
            alarm: if i % 5 == 0 { "BAR".into() } else { "BA".into() },
        })
        .collect()
}

#[test]
fn export_respects_max_rows_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = ChunkedExporter::new(1000);

    let manifest = exporter.export("alerts_2025-03-22", &rows(2500), dir.path()).unwrap();
    assert_eq!(manifest.len(), 3);

    let mut total = 0usize;
    for path in manifest.files() {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers, csv::StringRecord::from(vec!["incidentNumber", "zone", "alarm"]));

        let count = reader.records().count();
        assert!(count <= 1000);
        total += count;
    }
    assert_eq!(total, 2500);
}

#[test]
fn archive_bundles_manifest_files() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = ChunkedExporter::new(400);

    let manifest = exporter.export("alerts_2025-03-23", &rows(900), dir.path()).unwrap();
    let zip_path = dir.path().join("alerts_2025-03-23.zip");
    exporter.archive(&manifest, &zip_path).unwrap();

    let archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
    assert_eq!(archive.len(), manifest.len());
}
