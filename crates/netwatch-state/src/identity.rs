//! Identity store — the durable list of monitored addresses.
//!
//! Plain text, one record per line: `address,name,group,short_label`.
//! Short records are padded with empty fields rather than rejected; blank
//! lines and `#` comments are skipped. New devices are appended.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::device::{DeviceIdentity, is_valid_address};
use crate::error::{StateError, StateResult};

const FIELDS: usize = 4;

/// File-backed identity store.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the file, or `None` if it does not exist yet.
    fn read(&self) -> StateResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Rewrite the file with every short record padded to four fields.
    ///
    /// Blank lines are dropped. The file is only rewritten when at least one
    /// record needed padding. Returns whether a rewrite happened.
    pub fn normalize(&self) -> StateResult<bool> {
        let Some(content) = self.read()? else {
            return Ok(false);
        };

        let mut padded = 0usize;
        let mut lines = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                lines.push(line.to_string());
                continue;
            }
            let mut parts: Vec<&str> = line.split(',').collect();
            if parts.len() < FIELDS {
                parts.resize(FIELDS, "");
                padded += 1;
            }
            lines.push(parts.join(","));
        }

        if padded == 0 {
            return Ok(false);
        }

        let mut out = lines.join("\n");
        out.push('\n');
        fs::write(&self.path, out).map_err(|e| self.io_err(e))?;
        info!(path = ?self.path, records = padded, "identity store normalised");
        Ok(true)
    }

    /// Load every identity in file order. A missing file yields no devices.
    pub fn load(&self) -> StateResult<Vec<DeviceIdentity>> {
        let Some(content) = self.read()? else {
            debug!(path = ?self.path, "identity store absent, starting empty");
            return Ok(Vec::new());
        };
        let identities: Vec<DeviceIdentity> = content.lines().filter_map(parse_record).collect();
        info!(path = ?self.path, devices = identities.len(), "identity store loaded");
        Ok(identities)
    }

    /// Append one identity record, creating the file if needed.
    pub fn append(&self, identity: &DeviceIdentity) -> StateResult<()> {
        let persist_err = |source| StateError::Persist {
            address: identity.address.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(persist_err)?;

        // Keep records on their own line even if the file was hand-edited
        // without a trailing newline.
        let needs_newline = if file.metadata().map_err(persist_err)?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).map_err(persist_err)?;
            file.read_exact(&mut last).map_err(persist_err)?;
            last[0] != b'\n'
        } else {
            false
        };

        let mut line = String::new();
        if needs_newline {
            line.push('\n');
        }
        line.push_str(&format_record(identity));
        line.push('\n');
        file.write_all(line.as_bytes()).map_err(persist_err)?;
        debug!(address = %identity.address, "identity persisted");
        Ok(())
    }
}

/// Parse one line of the identity file. Returns `None` for blank lines,
/// comments, and records without a usable address.
pub fn parse_record(line: &str) -> Option<DeviceIdentity> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut parts = line.split(',');
    let address = parts.next().unwrap_or_default().trim();
    if !is_valid_address(address) {
        return None;
    }
    let name = parts.next();
    let group = parts.next();
    let short_label = parts.next();
    Some(DeviceIdentity::new(address, name, group, short_label))
}

fn format_record(identity: &DeviceIdentity) -> String {
    format!(
        "{},{},{},{}",
        identity.address, identity.name, identity.group, identity.short_label
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(content: &str) -> (tempfile::TempDir, IdentityStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ips.txt");
        fs::write(&path, content).unwrap();
        (dir, IdentityStore::new(path))
    }

    #[test]
    fn short_record_is_padded_on_load() {
        let (_dir, store) = store_with("10.0.0.1,router,Core,R1\n10.0.0.2,switch,Access\n");
        let ids = store.load().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].short_label, "R1");
        assert_eq!(ids[1].name, "switch");
        assert_eq!(ids[1].group, "Access");
        assert_eq!(ids[1].short_label, "");
    }

    #[test]
    fn empty_fields_get_defaults() {
        let (_dir, store) = store_with("10.0.0.3,,,\n10.0.0.4\n");
        let ids = store.load().unwrap();
        assert_eq!(ids[0].name, "10.0.0.3");
        assert_eq!(ids[0].group, "Default");
        assert_eq!(ids[1].name, "10.0.0.4");
        assert_eq!(ids[1].short_label, "");
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let (_dir, store) = store_with("# devices\n\n10.0.0.1,a,b,c\n   \n");
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn option_like_addresses_skipped() {
        let (_dir, store) = store_with("-f,flood,Bad,\n10.0.0.1,a,b,c\n");
        let ids = store.load().unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].address, "10.0.0.1");
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join("absent.txt"));
        assert!(store.load().unwrap().is_empty());
        assert!(!store.normalize().unwrap());
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let store = IdentityStore::new(dir.path());
        assert!(matches!(store.load(), Err(StateError::Io { .. })));
    }

    #[test]
    fn normalize_pads_and_rewrites() {
        let (_dir, store) = store_with("10.0.0.1,a,b,c\n10.0.0.2,x\n\n# note\n");
        assert!(store.normalize().unwrap());
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "10.0.0.1,a,b,c\n10.0.0.2,x,,\n# note\n");
    }

    #[test]
    fn normalize_leaves_complete_file_alone() {
        let original = "10.0.0.1,a,b,c\n\n10.0.0.2,x,y,z";
        let (_dir, store) = store_with(original);
        assert!(!store.normalize().unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);
    }

    #[test]
    fn append_creates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join("ips.txt"));
        store
            .append(&DeviceIdentity::new("10.0.0.5", None, None, None))
            .unwrap();
        store
            .append(&DeviceIdentity::new("10.0.0.6", Some("cam"), Some("CCTV"), Some("C6")))
            .unwrap();
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "10.0.0.5,10.0.0.5,Default,\n10.0.0.6,cam,CCTV,C6\n");
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn append_after_missing_trailing_newline() {
        let (_dir, store) = store_with("10.0.0.1,a,b,c");
        store
            .append(&DeviceIdentity::new("10.0.0.2", None, None, None))
            .unwrap();
        let ids = store.load().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1].address, "10.0.0.2");
    }
}
