//! Watcher rule model
//!
//! A `WatcherSpec` is produced once by validation and never mutated
//! afterwards. Every predicate the event filter needs is already parsed
//! into a typed form here, so the filter never sees raw strings.

use crate::patterns::PatternList;
use std::fmt;
use std::os::unix::fs::FileTypeExt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of a normalized watcher event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Writer finished with the file (changes-done hint)
    Changing,
    /// File content changed
    Changed,
    /// File or directory created
    Created,
    /// File or directory deleted
    Deleted,
    /// Metadata (permissions, owner, times) changed
    AttributeChanged,
    /// A filesystem was mounted at the path
    Mounted,
    /// A filesystem was unmounted from the path
    Unmounted,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Changing,
        EventKind::Changed,
        EventKind::Created,
        EventKind::Deleted,
        EventKind::AttributeChanged,
        EventKind::Mounted,
        EventKind::Unmounted,
    ];

    /// Configuration name of the event, also used for `$event`
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Changing => "changing",
            EventKind::Changed => "changed",
            EventKind::Created => "created",
            EventKind::Deleted => "deleted",
            EventKind::AttributeChanged => "attribute_changed",
            EventKind::Mounted => "mounted",
            EventKind::Unmounted => "unmounted",
        }
    }

    /// Whether the event path is expected to be gone when the event arrives
    pub fn path_is_gone(&self) -> bool {
        matches!(self, EventKind::Deleted | EventKind::Unmounted)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Size comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCmp {
    Equal,
    Greater,
    Less,
}

/// Unit of a size magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Bytes,
    KiB,
    MiB,
    GiB,
}

impl SizeUnit {
    pub fn multiplier(&self) -> u64 {
        match self {
            SizeUnit::Bytes => 1,
            SizeUnit::KiB => 1024,
            SizeUnit::MiB => 1024 * 1024,
            SizeUnit::GiB => 1024 * 1024 * 1024,
        }
    }
}

/// File size predicate, e.g. `+2k` (strictly greater than 2 KiB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePredicate {
    pub cmp: SizeCmp,
    pub magnitude: u64,
    pub unit: SizeUnit,
}

impl SizePredicate {
    /// Threshold in bytes
    pub fn bytes(&self) -> u64 {
        self.magnitude.saturating_mul(self.unit.multiplier())
    }

    /// Check a file length against the predicate
    pub fn matches(&self, len: u64) -> bool {
        let threshold = self.bytes();
        match self.cmp {
            SizeCmp::Equal => len == threshold,
            SizeCmp::Greater => len > threshold,
            SizeCmp::Less => len < threshold,
        }
    }
}

impl FromStr for SizePredicate {
    type Err = ();

    /// Parse `[+|-|=]N[b|k|K|M|G]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (cmp, rest) = match s.chars().next() {
            Some('+') => (SizeCmp::Greater, &s[1..]),
            Some('-') => (SizeCmp::Less, &s[1..]),
            Some('=') => (SizeCmp::Equal, &s[1..]),
            _ => (SizeCmp::Equal, s),
        };

        let (digits, unit) = match rest.chars().last() {
            Some('b') => (&rest[..rest.len() - 1], SizeUnit::Bytes),
            Some('k') | Some('K') => (&rest[..rest.len() - 1], SizeUnit::KiB),
            Some('M') => (&rest[..rest.len() - 1], SizeUnit::MiB),
            Some('G') => (&rest[..rest.len() - 1], SizeUnit::GiB),
            _ => (rest, SizeUnit::Bytes),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(());
        }

        let magnitude = digits.parse().map_err(|_| ())?;
        Ok(SizePredicate { cmp, magnitude, unit })
    }
}

/// Required file type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Block,
    Char,
    Directory,
    Fifo,
    Regular,
    Symlink,
    Socket,
}

impl FileType {
    /// Map a file mode to its type symbol, `None` for unrecognized modes
    pub fn of(file_type: &std::fs::FileType) -> Option<FileType> {
        if file_type.is_symlink() {
            Some(FileType::Symlink)
        } else if file_type.is_dir() {
            Some(FileType::Directory)
        } else if file_type.is_file() {
            Some(FileType::Regular)
        } else if file_type.is_block_device() {
            Some(FileType::Block)
        } else if file_type.is_char_device() {
            Some(FileType::Char)
        } else if file_type.is_fifo() {
            Some(FileType::Fifo)
        } else if file_type.is_socket() {
            Some(FileType::Socket)
        } else {
            None
        }
    }

    /// One-letter symbol, as used by find(1)
    pub fn symbol(&self) -> &'static str {
        match self {
            FileType::Block => "b",
            FileType::Char => "c",
            FileType::Directory => "d",
            FileType::Fifo => "p",
            FileType::Regular => "f",
            FileType::Symlink => "l",
            FileType::Socket => "s",
        }
    }
}

impl FromStr for FileType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "b" | "block" => Ok(FileType::Block),
            "c" | "char" => Ok(FileType::Char),
            "d" | "dir" | "directory" => Ok(FileType::Directory),
            "p" | "fifo" => Ok(FileType::Fifo),
            "f" | "regular" | "file" => Ok(FileType::Regular),
            "l" | "symlink" => Ok(FileType::Symlink),
            "s" | "socket" => Ok(FileType::Socket),
            _ => Err(()),
        }
    }
}

/// What to do with an event that passed the filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    /// Command template with `$name`, `$path`, `$event`, `$file`, `$rfile`
    pub exec: Option<String>,
    /// Print the path followed by a newline
    pub print: bool,
    /// Print the path followed by a NUL byte
    pub print0: bool,
}

/// A validated watcher rule
#[derive(Debug, Clone)]
pub struct WatcherSpec {
    /// Unique watcher name
    pub name: String,
    /// Canonical root path
    pub path: PathBuf,
    pub recursive: bool,
    /// Maximum directory depth below the root (0 = unlimited)
    pub max_depth: u32,
    /// Only accept files on the same filesystem as the root
    pub mount: bool,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub size: Option<SizePredicate>,
    pub file_type: Option<FileType>,
    /// Owning user, by name or numeric id
    pub user: Option<String>,
    /// Owning group, by name or numeric id
    pub group: Option<String>,
    /// Event allow-list (empty = all events)
    pub events: Vec<EventKind>,
    pub include: PatternList,
    pub exclude: PatternList,
    pub action: Action,
}

impl WatcherSpec {
    /// Minimal rule for `path`: non-recursive, no filters, no action
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            recursive: false,
            max_depth: 0,
            mount: false,
            readable: false,
            writable: false,
            executable: false,
            size: None,
            file_type: None,
            user: None,
            group: None,
            events: Vec::new(),
            include: PatternList::default(),
            exclude: PatternList::default(),
            action: Action::default(),
        }
    }

    /// Whether `kind` passes the event allow-list
    pub fn allows(&self, kind: EventKind) -> bool {
        self.events.is_empty() || self.events.contains(&kind)
    }

    /// Whether a directory at `depth` below the root may be watched
    pub fn within_depth(&self, depth: u32) -> bool {
        self.max_depth == 0 || depth <= self.max_depth
    }
}
