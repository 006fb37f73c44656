//! JSON snapshot persistence for [`Tables`](crate::Tables).
//!
//! The snapshot is written to a sibling temp file and renamed over the
//! previous one, so a crash mid-write leaves the last good snapshot intact.

use crate::{StoreError, Tables};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Load a snapshot; `None` when the file does not exist yet.
pub fn load(path: &Path) -> Result<Option<Tables>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let tables: Tables = serde_json::from_str(&contents)?;
    Ok(Some(tables))
}

pub fn save(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        let data = serde_json::to_vec_pretty(tables)?;
        file.write_all(&data)?;
        file.sync_data()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
