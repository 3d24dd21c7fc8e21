//! Application status lifecycle — the five stages and the append-only
//! transition history.
//!
//! The stages form a labeled set, not a pipeline: any status may follow any
//! other (a Rejected application can be reopened to Interview), so there is
//! deliberately no transition table or edge guard here. The only rule is
//! that a real change appends one history entry and a same-status request
//! appends nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current lifecycle stage of a job application.
/// Wire strings are stable: `"Applied" | "Interview" | "Offer" | "Rejected" | "Ghosted"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Applied,
    Interview,
    Offer,
    Rejected,
    Ghosted,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Applied,
        Status::Interview,
        Status::Offer,
        Status::Rejected,
        Status::Ghosted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Interview => "Interview",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
            Status::Ghosted => "Ghosted",
        }
    }

    /// Case-sensitive parse of a wire string. `None` for anything outside
    /// the closed set.
    pub fn parse(raw: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Applied
    }
}

/// One immutable log line of the status history: which status the record
/// moved to, when, and an optional caller-supplied note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: Status,
    pub changed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Outcome of comparing a requested status against the current one.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Requested status equals the current one. The operation still
    /// succeeds, but history must not grow.
    Noop,
    /// A real change; the entry goes on the end of the history and the
    /// record's status becomes the entry's status.
    Change(HistoryEntry),
}

/// Decides whether a requested status is a no-op or a real transition.
/// Pure: the caller is responsible for making the decision and the write
/// atomic against the same snapshot (see `jobs::engine`).
pub fn plan_transition(
    current: Status,
    requested: Status,
    note: Option<String>,
    at: DateTime<Utc>,
) -> Transition {
    if requested == current {
        Transition::Noop
    } else {
        Transition::Change(HistoryEntry {
            status: requested,
            changed_at: at,
            note,
        })
    }
}
