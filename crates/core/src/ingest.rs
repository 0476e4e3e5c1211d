use crate::error::IngestError;
use crate::extractor::DocumentExtractor;
use crate::models::{DocumentFingerprint, DocumentFormat, ExtractionResult};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| DocumentFormat::from_filename(name).is_some());

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Stable document id derived from the source path, for callers that do not
/// assign their own.
pub fn derive_document_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn fingerprint_document(
    path: &Path,
    declared_filename: &str,
    document_id: &str,
) -> Result<DocumentFingerprint, IngestError> {
    if declared_filename.is_empty() {
        return Err(IngestError::MissingFileName(format!(
            "path missing filename: {}",
            path.display()
        )));
    }

    let format = DocumentFormat::from_filename(declared_filename)
        .ok_or_else(|| IngestError::UnsupportedFormat(declared_filename.to_string()))?;
    let checksum = digest_file(path)?;

    Ok(DocumentFingerprint {
        document_id: document_id.to_string(),
        filename: declared_filename.to_string(),
        source_path: path.to_string_lossy().to_string(),
        format,
        checksum,
        ingested_at: Utc::now(),
    })
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

pub struct ExtractionBatch {
    pub documents: Vec<(DocumentFingerprint, ExtractionResult)>,
    pub skipped: Vec<SkippedDocument>,
}

/// Extracts every supported document under `folder`, best-effort: a file
/// that fails to parse lands in the skip list with its reason and the rest
/// of the batch continues.
pub fn extract_folder_best_effort(
    folder: &Path,
    extractor: &DocumentExtractor,
) -> Result<ExtractionBatch, IngestError> {
    let files = discover_documents(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no supported documents found in {}",
            folder.display()
        )));
    }

    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for path in files {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        let result = extractor.extract(&path, &filename);
        if !result.success {
            skipped.push(SkippedDocument {
                reason: result
                    .error
                    .unwrap_or_else(|| "unknown extraction failure".to_string()),
                path,
            });
            continue;
        }

        match fingerprint_document(&path, &filename, &derive_document_id(&path)) {
            Ok(fingerprint) => documents.push((fingerprint, result)),
            Err(error) => skipped.push(SkippedDocument {
                reason: error.to_string(),
                path,
            }),
        }
    }

    Ok(ExtractionBatch { documents, skipped })
}

#[cfg(test)]
mod tests {
    use super::{digest_file, discover_documents, extract_folder_best_effort};
    use crate::extractor::DocumentExtractor;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_format_filtered() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.xlsx")).and_then(|mut file| file.write_all(b"fake"))?;
        File::create(nested.join("c.txt")).and_then(|mut file| file.write_all(b"skip me"))?;

        let files = discover_documents(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file_path = dir.path().join("a.pdf");
        fs::write(&file_path, b"abc")?;

        let first = digest_file(&file_path)?;
        let second = digest_file(&file_path)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn batch_fails_without_supported_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = extract_folder_best_effort(dir.path(), &DocumentExtractor::default());
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn best_effort_skips_unreadable_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;

        let batch = extract_folder_best_effort(dir.path(), &DocumentExtractor::default())?;

        assert_eq!(batch.documents.len(), 0);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(
            batch.skipped[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("unreadable.pdf")
        );
        Ok(())
    }
}
