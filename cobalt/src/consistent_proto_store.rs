//! Crash-consistent single-message persistence.
//!
//! Three files back every store: `<path>`, `<path>.tmp`, `<path>.override`.
//! A write never touches `<path>` directly — it lands in `.tmp`, gets moved
//! onto `.override`, and only then does the primary get replaced. A crash
//! between any two steps leaves one of the three files holding a complete,
//! valid message, so `read` always recovers either the new value or the old
//! one, never a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use prost::Message;

use crate::status::{Status, StatusCode};

pub struct ConsistentProtoStore {
    primary: PathBuf,
    tmp: PathBuf,
    r#override: PathBuf,
}

impl ConsistentProtoStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let primary = path.as_ref().to_path_buf();
        let mut tmp = primary.clone();
        tmp.set_extension(extend(&primary, "tmp"));
        let mut r#override = primary.clone();
        r#override.set_extension(extend(&primary, "override"));
        Self {
            primary,
            tmp,
            r#override,
        }
    }

    /// Writes `message`, replacing whatever was previously stored.
    pub fn write<M: Message>(&self, message: &M) -> Result<(), Status> {
        let bytes = message.encode_to_vec();
        fs::write(&self.tmp, &bytes)
            .map_err(|e| Status::new(StatusCode::WriteFailed, format!("write tmp: {e}")))?;
        fs::rename(&self.tmp, &self.r#override)
            .map_err(|e| Status::new(StatusCode::WriteFailed, format!("tmp -> override: {e}")))?;
        // Primary may not exist on the first write; that's fine.
        let _ = fs::remove_file(&self.primary);
        fs::rename(&self.r#override, &self.primary)
            .map_err(|e| Status::new(StatusCode::WriteFailed, format!("override -> primary: {e}")))?;
        Ok(())
    }

    /// Reads the stored message. Prefers `.override` if present — its
    /// existence means a prior write was interrupted after step 2 but
    /// before step 4 — falling back to the primary file. Returns
    /// `NotFound` if neither file exists.
    pub fn read<M: Message + Default>(&self) -> Result<M, Status> {
        let bytes = if self.r#override.exists() {
            fs::read(&self.r#override)
        } else if self.primary.exists() {
            fs::read(&self.primary)
        } else {
            return Err(Status::new(StatusCode::NotFound, "no data has ever been written"));
        }
        .map_err(|e| Status::new(StatusCode::Other, format!("read: {e}")))?;

        M::decode(bytes.as_slice())
            .map_err(|e| Status::new(StatusCode::Other, format!("corrupt proto: {e}")))
    }

    /// Removes every file this store owns. Used when a report is deleted
    /// entirely rather than just overwritten.
    pub fn delete(&self) -> Result<(), Status> {
        for path in [&self.primary, &self.tmp, &self.r#override] {
            if path.exists() {
                fs::remove_file(path)
                    .map_err(|e| Status::new(StatusCode::WriteFailed, format!("delete {path:?}: {e}")))?;
            }
        }
        Ok(())
    }
}

fn extend(path: &Path, suffix: &str) -> String {
    match path.extension() {
        Some(ext) => format!("{}.{suffix}", ext.to_string_lossy()),
        None => suffix.to_string(),
    }
}
