//! Chunked CSV export and archiving
//!
//! Serializes a result set into one or more CSV files, each holding at most
//! `max_rows_per_file` data rows plus a header row, then bundles every file
//! from the manifest into a single deflate-compressed zip. Fail-fast: the
//! first write or archive error aborts the export and no archive is
//! produced. Intermediate files are not implicitly cleaned up; callers
//! remove them on error.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::error::{PipelineError, Result};

/// Ordered list of files produced by one export run
#[derive(Debug, Clone)]
pub struct ExportManifest {
    files: Vec<PathBuf>,
}

impl ExportManifest {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Size-bounded CSV exporter
#[derive(Debug, Clone)]
pub struct ChunkedExporter {
    max_rows_per_file: usize,
}

impl ChunkedExporter {
    pub fn new(max_rows_per_file: usize) -> Self {
        Self {
            max_rows_per_file: max_rows_per_file.max(1),
        }
    }

    /// Write `rows` to `<out_dir>/<base_name>_part_<n>.csv` files, at most
    /// `max_rows_per_file` data rows each plus a header row. N rows yield
    /// ceil(N / max) files; zero rows yield an empty manifest.
    pub fn export<S: Serialize>(
        &self,
        base_name: &str,
        rows: &[S],
        out_dir: &Path,
    ) -> Result<ExportManifest> {
        std::fs::create_dir_all(out_dir)?;

        let chunks: Vec<&[S]> = rows.chunks(self.max_rows_per_file).collect();

        let mut files = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let path = out_dir.join(format!("{}_part_{}.csv", base_name, index + 1));
            write_csv(&path, chunk)?;
            debug!(path = %path.display(), rows = chunk.len(), "export file written");
            files.push(path);
        }

        info!(
            base = %base_name,
            files = files.len(),
            rows = rows.len(),
            "export files written"
        );
        Ok(ExportManifest { files })
    }

    /// Bundle every manifest file into a single zip at `zip_path`
    pub fn archive(&self, manifest: &ExportManifest, zip_path: &Path) -> Result<PathBuf> {
        let file =
            File::create(zip_path).map_err(|e| PipelineError::export(zip_path, e))?;
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in manifest.files() {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    PipelineError::export(
                        path.clone(),
                        io::Error::new(io::ErrorKind::InvalidInput, "non-UTF-8 file name"),
                    )
                })?;

            zip.start_file(name, options)
                .map_err(|e| PipelineError::export(path.clone(), e))?;
            let mut source =
                File::open(path).map_err(|e| PipelineError::export(path.clone(), e))?;
            io::copy(&mut source, &mut zip)
                .map_err(|e| PipelineError::export(path.clone(), e))?;
        }

        zip.finish()
            .map_err(|e| PipelineError::export(zip_path, e))?;

        info!(
            archive = %zip_path.display(),
            entries = manifest.len(),
            "archive written"
        );
        Ok(zip_path.to_path_buf())
    }
}

fn write_csv<S: Serialize>(path: &Path, rows: &[S]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| PipelineError::export(path, e))?;

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| PipelineError::export(path, e))?;
    }

    writer.flush().map_err(|e| PipelineError::export(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestRow {
        id: i64,
        zone: String,
    }

    fn rows(n: usize) -> Vec<TestRow> {
        (0..n)
            .map(|i| TestRow {
                id: i as i64,
                zone: format!("Z{}", i % 8),
            })
            .collect()
    }

    #[test]
    fn test_export_splits_at_bound() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ChunkedExporter::new(100);

        let manifest = exporter.export("alerts", &rows(250), dir.path()).unwrap();
        assert_eq!(manifest.len(), 3);

        // each file: header plus at most 100 data rows
        for (index, path) in manifest.files().iter().enumerate() {
            let content = std::fs::read_to_string(path).unwrap();
            let lines = content.lines().count();
            let expected = if index < 2 { 101 } else { 51 };
            assert_eq!(lines, expected);
            assert!(content.starts_with("id,zone"));
        }
    }

    #[test]
    fn test_export_empty_rows_yields_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ChunkedExporter::new(100);

        let manifest = exporter.export("alerts", &rows(0), dir.path()).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_export_exact_multiple() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ChunkedExporter::new(50);

        let manifest = exporter.export("alerts", &rows(100), dir.path()).unwrap();
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_archive_contains_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ChunkedExporter::new(40);

        let manifest = exporter.export("alerts", &rows(100), dir.path()).unwrap();
        let zip_path = dir.path().join("alerts.zip");
        exporter.archive(&manifest, &zip_path).unwrap();

        let archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), manifest.len());
        let names: Vec<_> = archive.file_names().collect();
        assert!(names.contains(&"alerts_part_1.csv"));
        assert!(names.contains(&"alerts_part_3.csv"));
    }
}
