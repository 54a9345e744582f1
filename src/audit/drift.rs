//! Drift detection — compare generated files on disk to manifest hashes.
//!
//! Catches hand-edits or deletions of managed generated code. Skeletons are
//! exempt: they are handed over to the consumer at generation time.

use super::hasher;
use crate::core::types::{FileRole, Manifest};
use std::path::Path;

/// A single drift finding.
#[derive(Debug, Clone)]
pub struct DriftFinding {
    pub rel_path: String,
    pub unit: String,
    pub expected_hash: String,
    pub actual_hash: String,
    pub detail: String,
}

/// Check one managed file against its recorded hash.
pub fn check_file_drift(
    out_dir: &Path,
    rel_path: &str,
    unit: &str,
    expected_hash: &str,
) -> Option<DriftFinding> {
    let path = out_dir.join(rel_path);
    if !path.exists() {
        return Some(DriftFinding {
            rel_path: rel_path.to_string(),
            unit: unit.to_string(),
            expected_hash: expected_hash.to_string(),
            actual_hash: "MISSING".to_string(),
            detail: format!("{} does not exist", rel_path),
        });
    }

    let actual = hasher::hash_file(&path).unwrap_or_else(|e| format!("ERROR:{}", e));
    if actual != expected_hash {
        return Some(DriftFinding {
            rel_path: rel_path.to_string(),
            unit: unit.to_string(),
            expected_hash: expected_hash.to_string(),
            actual_hash: actual,
            detail: format!("{} content changed", rel_path),
        });
    }
    None
}

/// Check every managed file in the manifest for drift.
pub fn detect_drift(manifest: &Manifest, out_dir: &Path) -> Vec<DriftFinding> {
    let mut findings = Vec::new();
    for (rel_path, record) in &manifest.files {
        if record.role != FileRole::Managed {
            continue;
        }
        if let Some(finding) = check_file_drift(out_dir, rel_path, &record.unit, &record.hash) {
            findings.push(finding);
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FileRecord;
    use indexmap::IndexMap;

    fn manifest(files: IndexMap<String, FileRecord>) -> Manifest {
        Manifest {
            schema: "1.0".to_string(),
            name: "t".to_string(),
            generated_at: "2026-08-06T12:00:00Z".to_string(),
            generator: "fragua 0.3.1".to_string(),
            files,
        }
    }

    #[test]
    fn test_no_drift() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("com")).unwrap();
        std::fs::write(dir.path().join("com/A.java"), "class A {}").unwrap();

        let mut files = IndexMap::new();
        files.insert(
            "com/A.java".to_string(),
            FileRecord {
                unit: "format/A".to_string(),
                role: FileRole::Managed,
                hash: hasher::hash_string("class A {}"),
            },
        );
        assert!(detect_drift(&manifest(files), dir.path()).is_empty());
    }

    #[test]
    fn test_edited_file_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A.java"), "class A { int hacked; }").unwrap();

        let mut files = IndexMap::new();
        files.insert(
            "A.java".to_string(),
            FileRecord {
                unit: "format/A".to_string(),
                role: FileRole::Managed,
                hash: hasher::hash_string("class A {}"),
            },
        );
        let findings = detect_drift(&manifest(files), dir.path());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].detail.contains("content changed"));
    }

    #[test]
    fn test_missing_file_detected() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = IndexMap::new();
        files.insert(
            "Gone.java".to_string(),
            FileRecord {
                unit: "format/Gone".to_string(),
                role: FileRole::Managed,
                hash: "blake3:abc".to_string(),
            },
        );
        let findings = detect_drift(&manifest(files), dir.path());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].actual_hash, "MISSING");
    }

    #[test]
    fn test_skeletons_exempt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Step.java"), "edited by hand").unwrap();

        let mut files = IndexMap::new();
        files.insert(
            "Step.java".to_string(),
            FileRecord {
                unit: "operation/Op".to_string(),
                role: FileRole::Skeleton,
                hash: hasher::hash_string("original skeleton"),
            },
        );
        assert!(detect_drift(&manifest(files), dir.path()).is_empty());
    }
}
