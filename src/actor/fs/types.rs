use std::path::PathBuf;

use notify::EventKind;
use notify::event::{MetadataKind, ModifyKind};

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
    /// Read-only access. Never worth a reload.
    Access,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Remove => "remove",
            Self::Access => "access",
        }
    }

    pub fn is_access(self) -> bool {
        matches!(self, Self::Access)
    }
}

impl From<EventKind> for ChangeKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Create,
            EventKind::Remove(_) => Self::Remove,
            EventKind::Access(_) => Self::Access,
            // atime bumps show up as metadata modifications on some backends
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)) => Self::Access,
            EventKind::Modify(_) | EventKind::Any | EventKind::Other => Self::Modify,
        }
    }
}

/// A raw filesystem event, reduced to what the coalescer looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }
}

impl From<notify::Event> for ChangeEvent {
    fn from(event: notify::Event) -> Self {
        Self {
            kind: event.kind.into(),
            paths: event.paths,
        }
    }
}

/// One debounced notification: the burst it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coalesced {
    /// Qualifying events folded into this notification
    pub events: usize,
    /// Distinct paths touched during the window
    pub paths: Vec<PathBuf>,
}
