//! Task state machine and flag bitmasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Poll-observed execution state of a stage task.
///
/// Transitions are `Ready -> Working -> {Finished | Error}`; both
/// `Finished` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Constructed, not yet started.
    #[default]
    Ready,
    /// Running on its own thread(s).
    Working,
    /// Failed; the owning pipeline is abandoned.
    Error,
    /// Completed successfully.
    Finished,
}

impl TaskState {
    /// Returns true if no further transition can occur.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Finished)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Working => write!(f, "working"),
            Self::Error => write!(f, "error"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Completion flags persisted on a stage record.
///
/// `COMPLETED` is shared by every kind; `GEOREFERENCED` is an orthogonal
/// bit only photo-orientation records carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordFlags(u32);

impl RecordFlags {
    /// No work has completed for this record.
    pub const NOT_COMPLETED: Self = Self(0);
    /// The stage producing this record finished.
    pub const COMPLETED: Self = Self(1);
    /// A georeference transform was produced (photo orientation only).
    pub const GEOREFERENCED: Self = Self(1 << 1);

    /// Returns the raw bit pattern.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if the completed bit is set.
    #[must_use]
    pub fn is_completed(self) -> bool {
        self.contains(Self::COMPLETED)
    }

    /// Returns true if the georeference bit is set.
    #[must_use]
    pub fn is_georeferenced(self) -> bool {
        self.contains(Self::GEOREFERENCED)
    }
}

impl BitOr for RecordFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RecordFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Stage-specific result bits reported by a finished task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResultFlags(u32);

impl ResultFlags {
    /// No result bits set.
    pub const NONE: Self = Self(0);
    /// Photo orientation produced a georeference transform.
    pub const GEOREFERENCE: Self = Self(1);

    /// Builds flags from a raw bit pattern.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bit pattern.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ResultFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ResultFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_is_terminal() {
        assert!(TaskState::Error.is_terminal());
        assert!(TaskState::Finished.is_terminal());
        assert!(!TaskState::Ready.is_terminal());
        assert!(!TaskState::Working.is_terminal());
    }

    #[test]
    fn test_task_state_display() {
        assert_eq!(TaskState::Ready.to_string(), "ready");
        assert_eq!(TaskState::Working.to_string(), "working");
        assert_eq!(TaskState::Finished.to_string(), "finished");
    }

    #[test]
    fn test_task_state_serialize() {
        let json = serde_json::to_string(&TaskState::Working).unwrap();
        assert_eq!(json, r#""working""#);
    }

    #[test]
    fn test_record_flags_bits() {
        let mut flags = RecordFlags::COMPLETED;
        assert!(flags.is_completed());
        assert!(!flags.is_georeferenced());

        flags |= RecordFlags::GEOREFERENCED;
        assert!(flags.is_completed());
        assert!(flags.is_georeferenced());
        assert_eq!(flags.bits(), 0b11);

        assert!(!RecordFlags::NOT_COMPLETED.is_completed());
    }

    #[test]
    fn test_result_flags_contains() {
        let code = ResultFlags::from_bits(0b101);
        assert!(code.contains(ResultFlags::GEOREFERENCE));
        assert!(!ResultFlags::NONE.contains(ResultFlags::GEOREFERENCE));
    }
}
