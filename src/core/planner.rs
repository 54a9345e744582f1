//! Plan generation — diff rendered output against the files on disk.
//!
//! Managed files compare by content hash: absent → Create, different →
//! Update, identical → NoOp (re-running on unchanged input is an all-NoOp
//! plan). Skeletons are generated once: an existing skeleton is always
//! Keep, whatever its content, because the consumer owns it after handover.

use super::types::{EmitPlan, FileAction, PlannedFile, RenderedFile};
use crate::audit::hasher;
use std::path::Path;

/// Plan the emission of rendered files into an output directory.
pub fn plan(name: &str, files: &[RenderedFile], out_dir: &Path, force: bool) -> EmitPlan {
    let mut planned = Vec::new();
    let mut to_create = 0u32;
    let mut to_update = 0u32;
    let mut unchanged = 0u32;
    let mut kept = 0u32;

    for file in files {
        let on_disk = out_dir.join(&file.rel_path);
        let action = if !file.managed {
            if on_disk.exists() {
                FileAction::Keep
            } else {
                FileAction::Create
            }
        } else if !on_disk.exists() {
            FileAction::Create
        } else if force {
            FileAction::Update
        } else {
            let rendered = hasher::hash_string(&file.text);
            match hasher::hash_file(&on_disk) {
                Ok(actual) if actual == rendered => FileAction::NoOp,
                _hash_mismatch_or_unreadable => FileAction::Update,
            }
        };

        match action {
            FileAction::Create => to_create += 1,
            FileAction::Update => to_update += 1,
            FileAction::NoOp => unchanged += 1,
            FileAction::Keep => kept += 1,
        }

        planned.push(PlannedFile {
            rel_path: file.rel_path.clone(),
            unit: file.unit.clone(),
            action,
        });
    }

    EmitPlan {
        name: name.to_string(),
        files: planned,
        to_create,
        to_update,
        unchanged,
        kept,
    }
}
