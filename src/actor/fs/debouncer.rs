use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use super::types::{ChangeEvent, Coalesced};

pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// How long to sleep when nothing is pending.
const IDLE_SLEEP: Duration = Duration::from_secs(86400);

/// Debounce timer state.
///
/// `Idle --event--> Pending`, `Pending --event--> Pending` (deadline restarted),
/// `Pending --deadline--> Idle` (one notification).
#[derive(Debug)]
pub(super) enum DebounceState {
    Idle,
    Pending {
        deadline: Instant,
        events: usize,
        paths: FxHashSet<PathBuf>,
    },
}

/// Pure debouncer: timing and noise filtering only.
///
/// Owned by a single task, so every transition is serialized.
pub(super) struct Debouncer {
    pub(super) state: DebounceState,
    window: Duration,
    ignore_temp_files: bool,
}

impl Debouncer {
    pub(super) fn new(window: Duration, ignore_temp_files: bool) -> Self {
        Self {
            state: DebounceState::Idle,
            window,
            ignore_temp_files,
        }
    }

    /// Feed one raw event. Returns `true` if it (re)started the timer.
    pub(super) fn on_event(&mut self, event: &ChangeEvent, now: Instant) -> bool {
        if event.kind.is_access() {
            return false;
        }

        let relevant: Vec<&PathBuf> = event
            .paths
            .iter()
            .filter(|p| !(self.ignore_temp_files && is_temp_file(p)))
            .collect();

        // Backends occasionally emit path-less events; they still count.
        if relevant.is_empty() && !event.paths.is_empty() {
            crate::debug!("watch"; "ignored temp: {:?}", event.paths);
            return false;
        }

        let deadline = now + self.window;
        match &mut self.state {
            DebounceState::Idle => {
                self.state = DebounceState::Pending {
                    deadline,
                    events: 1,
                    paths: relevant.into_iter().cloned().collect(),
                };
            }
            DebounceState::Pending {
                deadline: pending,
                events,
                paths,
            } => {
                *pending = deadline;
                *events += 1;
                paths.extend(relevant.into_iter().cloned());
            }
        }
        true
    }

    /// Fire if the quiet period has elapsed, returning to `Idle`.
    pub(super) fn fire_if_ready(&mut self, now: Instant) -> Option<Coalesced> {
        match &self.state {
            DebounceState::Pending { deadline, .. } if now >= *deadline => {}
            _ => return None,
        }

        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { events, paths, .. } => {
                let mut paths: Vec<_> = paths.into_iter().collect();
                paths.sort();
                Some(Coalesced { events, paths })
            }
            DebounceState::Idle => None,
        }
    }

    /// Precise sleep duration until the pending deadline.
    pub(super) fn sleep_duration(&self, now: Instant) -> Duration {
        match &self.state {
            DebounceState::Idle => IDLE_SLEEP,
            DebounceState::Pending { deadline, .. } => deadline.saturating_duration_since(now),
        }
    }

    pub(super) fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
