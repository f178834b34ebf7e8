//! Event filter pipeline
//!
//! Stages run in order and the first failing stage rejects the event:
//! event allow-list, file checks (skipped when the path is gone), include
//! list, exclude list. A matching include pattern accepts the event
//! outright, so include wins over exclude.

use crate::event::Event;
use fmon_core::{FileType, WatcherSpec};
use nix::unistd::{access, AccessFlags, Gid, Group, Uid, User};
use std::fs;
use std::os::unix::fs::MetadataExt;
use tracing::{debug, error};

/// Run `event` through the filter of `spec`
pub fn accepts(spec: &WatcherSpec, event: &Event) -> bool {
    if !spec.allows(event.kind) {
        return ignored(event, "event type");
    }

    if !event.kind.path_is_gone() {
        if let Err(reason) = check_file(spec, event) {
            return ignored(event, reason);
        }
    }

    if !spec.include.is_empty() {
        if spec.include.matches(&event.rfile) {
            return true;
        }
        return ignored(event, "include");
    }

    if spec.exclude.matches(&event.rfile) {
        return ignored(event, "exclude");
    }

    true
}

fn ignored(event: &Event, reason: &str) -> bool {
    debug!(watcher = %event.watcher, event = %event.kind, file = %event.file.display(), reason, "event ignored");
    false
}

/// Checks that need the file to exist
fn check_file(spec: &WatcherSpec, event: &Event) -> Result<(), &'static str> {
    let root = fs::metadata(&spec.path).map_err(|e| {
        error!(watcher = %spec.name, path = %spec.path.display(), "unable to get file info: {}", e);
        "stat"
    })?;
    let file = fs::symlink_metadata(&event.file).map_err(|e| {
        error!(watcher = %spec.name, path = %event.file.display(), "unable to get file info: {}", e);
        "stat"
    })?;

    if spec.mount && file.dev() != root.dev() {
        return Err("mount");
    }

    let mut required = AccessFlags::empty();
    if spec.readable {
        required |= AccessFlags::R_OK;
    }
    if spec.writable {
        required |= AccessFlags::W_OK;
    }
    if spec.executable {
        required |= AccessFlags::X_OK;
    }
    if !required.is_empty() && access(&event.file, required).is_err() {
        return Err("permissions");
    }

    if let Some(size) = spec.size {
        if !file.is_dir() && !size.matches(file.len()) {
            return Err("size");
        }
    }

    if let Some(wanted) = spec.file_type {
        if FileType::of(&file.file_type()) != Some(wanted) {
            return Err("type");
        }
    }

    if let Some(user) = &spec.user {
        if resolve_user(user) != Some(file.uid()) {
            return Err("user");
        }
    }

    if let Some(group) = &spec.group {
        if resolve_group(group) != Some(file.gid()) {
            return Err("group");
        }
    }

    Ok(())
}

/// Resolve a user name, falling back to a numeric id that must exist
fn resolve_user(user: &str) -> Option<u32> {
    if let Ok(Some(found)) = User::from_name(user) {
        return Some(found.uid.as_raw());
    }

    let id: u32 = user.parse().ok()?;
    match User::from_uid(Uid::from_raw(id)) {
        Ok(Some(found)) => Some(found.uid.as_raw()),
        _ => {
            debug!(user, "unable to resolve user");
            None
        }
    }
}

/// Resolve a group name, falling back to a numeric id that must exist
fn resolve_group(group: &str) -> Option<u32> {
    if let Ok(Some(found)) = Group::from_name(group) {
        return Some(found.gid.as_raw());
    }

    let id: u32 = group.parse().ok()?;
    match Group::from_gid(Gid::from_raw(id)) {
        Ok(Some(found)) => Some(found.gid.as_raw()),
        _ => {
            debug!(group, "unable to resolve group");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmon_core::{EventKind, PatternList, SizePredicate};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn spec(root: &Path) -> WatcherSpec {
        WatcherSpec::new("w", root)
    }

    fn event(spec: &WatcherSpec, kind: EventKind, file: PathBuf) -> Event {
        Event::new(spec, kind, file)
    }

    #[test]
    fn test_allow_list_rejects_first() {
        let temp_dir = TempDir::new().unwrap();
        let mut s = spec(temp_dir.path());
        s.events = vec![EventKind::Created];

        let file = temp_dir.path().join("a");
        fs::write(&file, b"x").unwrap();

        assert!(accepts(&s, &event(&s, EventKind::Created, file.clone())));
        assert!(!accepts(&s, &event(&s, EventKind::Changed, file)));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let temp_dir = TempDir::new().unwrap();
        let mut s = spec(temp_dir.path());
        s.include = PatternList::new(["*.log"]).unwrap();
        s.exclude = PatternList::new(["debug*"]).unwrap();

        let file = temp_dir.path().join("debug.log");
        fs::write(&file, b"x").unwrap();
        assert!(accepts(&s, &event(&s, EventKind::Created, file)));

        let other = temp_dir.path().join("debug.txt");
        fs::write(&other, b"x").unwrap();
        assert!(!accepts(&s, &event(&s, EventKind::Created, other)));
    }

    #[test]
    fn test_exclude_only() {
        let temp_dir = TempDir::new().unwrap();
        let mut s = spec(temp_dir.path());
        s.exclude = PatternList::new(["*.tmp"]).unwrap();

        let kept = temp_dir.path().join("a.txt");
        let dropped = temp_dir.path().join("a.tmp");
        fs::write(&kept, b"x").unwrap();
        fs::write(&dropped, b"x").unwrap();

        assert!(accepts(&s, &event(&s, EventKind::Created, kept)));
        assert!(!accepts(&s, &event(&s, EventKind::Created, dropped)));
    }

    #[test]
    fn test_size_predicate() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("blob");
        fs::write(&file, vec![0u8; 2048]).unwrap();

        let mut s = spec(temp_dir.path());
        s.size = Some("+1k".parse::<SizePredicate>().unwrap());
        assert!(accepts(&s, &event(&s, EventKind::Changed, file.clone())));

        s.size = Some("+4k".parse::<SizePredicate>().unwrap());
        assert!(!accepts(&s, &event(&s, EventKind::Changed, file)));

        // directories are exempt from size checks
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).unwrap();
        assert!(accepts(&s, &event(&s, EventKind::Created, dir)));
    }

    #[test]
    fn test_type_rejects_directory_for_regular() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sub");
        fs::create_dir(&dir).unwrap();

        let mut s = spec(temp_dir.path());
        s.file_type = Some(FileType::Regular);
        s.include = PatternList::new(["*"]).unwrap();

        assert!(!accepts(&s, &event(&s, EventKind::Created, dir)));
    }

    #[test]
    fn test_type_detects_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        let link = temp_dir.path().join("link");
        fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let mut s = spec(temp_dir.path());
        s.file_type = Some(FileType::Symlink);
        assert!(accepts(&s, &event(&s, EventKind::Created, link)));
        assert!(!accepts(&s, &event(&s, EventKind::Created, target)));
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let s = spec(temp_dir.path());
        let gone = temp_dir.path().join("gone");

        assert!(!accepts(&s, &event(&s, EventKind::Created, gone.clone())));
        // deleted events skip the file checks
        assert!(accepts(&s, &event(&s, EventKind::Deleted, gone.clone())));
        assert!(accepts(&s, &event(&s, EventKind::Unmounted, gone)));
    }

    #[test]
    fn test_owner_checks() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("owned");
        fs::write(&file, b"x").unwrap();
        let metadata = fs::metadata(&file).unwrap();
        let (uid, gid) = (metadata.uid(), metadata.gid());

        let mut s = spec(temp_dir.path());
        s.user = Some(uid.to_string());
        s.group = Some(gid.to_string());
        assert!(accepts(&s, &event(&s, EventKind::Created, file.clone())));

        s.user = Some("no-such-user-fmon".to_string());
        assert!(!accepts(&s, &event(&s, EventKind::Created, file)));
    }

    #[test]
    fn test_mount_boundary_same_device() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a");
        fs::write(&file, b"x").unwrap();

        let mut s = spec(temp_dir.path());
        s.mount = true;
        assert!(accepts(&s, &event(&s, EventKind::Created, file)));
    }

    #[test]
    fn test_readable_flag() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a");
        fs::write(&file, b"x").unwrap();

        let mut s = spec(temp_dir.path());
        s.readable = true;
        assert!(accepts(&s, &event(&s, EventKind::Created, file)));
    }
}
