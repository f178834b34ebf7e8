//! Mount table snapshots

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

/// One mounted filesystem
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MountEntry {
    /// Device identifier, `major:minor` on Linux
    pub device: String,
    /// Canonical mount path
    pub path: PathBuf,
}

impl MountEntry {
    pub fn new(device: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            path: path.into(),
        }
    }
}

/// Set of mounted filesystems at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountSnapshot {
    entries: BTreeSet<MountEntry>,
}

/// Entries present on only one side of two snapshots
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MountDiff {
    /// In the old snapshot only
    pub removed: Vec<MountEntry>,
    /// In the new snapshot only
    pub added: Vec<MountEntry>,
}

impl MountDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

impl MountSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, entry: &MountEntry) -> bool {
        self.entries.contains(entry)
    }

    /// Compare against a newer snapshot
    pub fn diff(&self, newer: &MountSnapshot) -> MountDiff {
        MountDiff {
            removed: self.entries.difference(&newer.entries).cloned().collect(),
            added: newer.entries.difference(&self.entries).cloned().collect(),
        }
    }
}

impl FromIterator<MountEntry> for MountSnapshot {
    fn from_iter<I: IntoIterator<Item = MountEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Source of mount table snapshots
pub trait MountTable: Send {
    fn snapshot(&self) -> io::Result<MountSnapshot>;
}

/// The running system's mount table
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMountTable;

impl MountTable for SystemMountTable {
    fn snapshot(&self) -> io::Result<MountSnapshot> {
        crate::platform::read_mount_table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_by_device_and_path() {
        let old: MountSnapshot = [
            MountEntry::new("8:1", "/"),
            MountEntry::new("8:2", "/mnt/a"),
            MountEntry::new("8:3", "/mnt/b"),
        ]
        .into_iter()
        .collect();

        // same path, new device: one removal and one addition
        let new: MountSnapshot = [
            MountEntry::new("8:1", "/"),
            MountEntry::new("8:4", "/mnt/b"),
            MountEntry::new("8:5", "/mnt/c"),
        ]
        .into_iter()
        .collect();

        let diff = old.diff(&new);
        assert_eq!(
            diff.removed,
            vec![MountEntry::new("8:2", "/mnt/a"), MountEntry::new("8:3", "/mnt/b")]
        );
        assert_eq!(
            diff.added,
            vec![MountEntry::new("8:4", "/mnt/b"), MountEntry::new("8:5", "/mnt/c")]
        );
    }

    #[test]
    fn test_identical_snapshots() {
        let snap: MountSnapshot = [MountEntry::new("0:1", "/")].into_iter().collect();
        assert!(snap.diff(&snap.clone()).is_empty());
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_system_table_reads() {
        // an empty table is fine where no mount table is exposed
        assert!(SystemMountTable.snapshot().is_ok());
    }
}
