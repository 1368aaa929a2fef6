use std::fmt;

use super::manager::SlotId;
use super::validator::ValidationReport;

/// Errors that can occur during save, load, delete and recovery operations
#[derive(Debug, Clone)]
pub enum SaveError {
    /// Slot id outside the configured slot space
    InvalidSlot(String),

    /// Nothing is stored under the slot's key
    NoSave(SlotId),

    /// The record failed full validation (structural or semantic)
    ValidationError(ValidationReport),

    /// The record couldn't be turned into a blob
    SerializationError(String),

    /// A stored blob couldn't be turned back into a record
    DeserializationError(String),

    /// The storage backend failed to read, write or remove a key
    StorageError(String),

    /// No valid backup or fallback save was found
    RecoveryExhausted(String),
}

impl SaveError {
    /// True for failures that mean "the stored data is unreadable"
    ///
    /// These are the failures a load answers with a recovery attempt.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SaveError::ValidationError(_) | SaveError::DeserializationError(_)
        )
    }

    /// Validation report attached to the error, if any
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            SaveError::ValidationError(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::InvalidSlot(msg) => write!(f, "Invalid save slot: {}", msg),
            SaveError::NoSave(slot) => write!(f, "No save in slot {}", slot),
            SaveError::ValidationError(report) => {
                write!(f, "Save data failed validation: {}", report.summary())
            }
            SaveError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SaveError::DeserializationError(msg) => write!(f, "Corrupted save data: {}", msg),
            SaveError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            SaveError::RecoveryExhausted(msg) => write!(f, "Recovery failed: {}", msg),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(err: std::io::Error) -> Self {
        SaveError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(err: serde_json::Error) -> Self {
        SaveError::SerializationError(err.to_string())
    }
}

impl From<SaveError> for String {
    fn from(error: SaveError) -> Self {
        error.to_string()
    }
}
