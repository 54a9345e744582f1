//! Manifest management — load, save (atomic), path derivation.

use super::error::{GenError, Result};
use super::types::Manifest;
use crate::audit::eventlog::now_iso8601;
use std::path::{Path, PathBuf};

/// Manifest path within the output directory.
pub fn manifest_path(out_dir: &Path) -> PathBuf {
    out_dir.join("fragua.lock.yaml")
}

/// Load the manifest for an output directory. Returns None if absent.
pub fn load_manifest(out_dir: &Path) -> Result<Option<Manifest>> {
    let path = manifest_path(out_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| {
        GenError::malformed("manifest", format!("cannot read {}: {}", path.display(), e))
    })?;
    let manifest: Manifest = serde_yaml_ng::from_str(&content).map_err(|e| {
        GenError::malformed("manifest", format!("invalid manifest {}: {}", path.display(), e))
    })?;
    Ok(Some(manifest))
}

/// Save the manifest atomically (write to temp, then rename).
pub fn save_manifest(out_dir: &Path, manifest: &Manifest) -> Result<()> {
    let path = manifest_path(out_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GenError::EmissionIo {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let yaml = serde_yaml_ng::to_string(manifest).map_err(|e| GenError::EmissionIo {
        path: path.clone(),
        source: std::io::Error::other(e),
    })?;

    let tmp_path = path.with_extension("lock.yaml.tmp");
    std::fs::write(&tmp_path, &yaml).map_err(|e| GenError::EmissionIo {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, &path).map_err(|e| GenError::EmissionIo { path, source: e })?;

    Ok(())
}

/// Create a fresh manifest for a schema.
pub fn new_manifest(name: &str) -> Manifest {
    Manifest {
        schema: "1.0".to_string(),
        name: name.to_string(),
        generated_at: now_iso8601(),
        generator: format!("fragua {}", env!("CARGO_PKG_VERSION")),
        files: indexmap::IndexMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FileRecord, FileRole};

    #[test]
    fn test_load_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_manifest(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = new_manifest("payments");
        manifest.files.insert(
            "com/acme/PaymentService.java".to_string(),
            FileRecord {
                unit: "operation/Payment".to_string(),
                role: FileRole::Managed,
                hash: "blake3:abc".to_string(),
            },
        );
        save_manifest(dir.path(), &manifest).unwrap();

        let loaded = load_manifest(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.name, "payments");
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(
            loaded.files["com/acme/PaymentService.java"].unit,
            "operation/Payment"
        );
        // No temp file left behind.
        assert!(!manifest_path(dir.path())
            .with_extension("lock.yaml.tmp")
            .exists());
    }

    #[test]
    fn test_invalid_manifest_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(manifest_path(dir.path()), "not: [valid: {{").unwrap();
        assert!(load_manifest(dir.path()).is_err());
    }

    #[test]
    fn test_new_manifest_stamps_generator() {
        let manifest = new_manifest("t");
        assert!(manifest.generator.starts_with("fragua "));
        assert!(manifest.generated_at.ends_with('Z'));
    }
}
