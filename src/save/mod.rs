//! Save/Load system for the dungeon crawler
//!
//! This module provides the persistence core:
//! - Compact save blobs (JSON with token-substitution compression)
//! - Two-tier validation (quick structural gate + full report)
//! - Three manual slots and one auto-save slot
//! - Timer and event driven auto-saves with rotating backups
//! - Recovery of damaged slots from backups or the auto-save
//!
//! # Architecture
//!
//! - `types`: Save record data structures
//! - `codec`: Record <-> blob conversion
//! - `validator`: Save data checks and reports
//! - `manager`: SaveManager for slot operations
//! - `recovery`: Backup rotation and slot recovery
//! - `autosave`: AutoSaveScheduler (when to write the auto slot)
//! - `storage`: Key/value backends (memory, files)
//! - `saveable`: Traits the game implements for the save system
//! - `events`: Lifecycle events for UI code
//! - `clock`, `config`, `error`: supporting pieces
//!
//! # Example Usage
//!
//! ```ignore
//! let backend = FileBackend::new("saves")?;
//! let mut manager = SaveManager::new(backend, Rc::new(SystemClock), SaveConfig::default());
//!
//! // Save game
//! manager.save_game(SlotId::Manual(1), &game, &SaveOptions::default())?;
//!
//! // Load game
//! let loaded = manager.load_game(SlotId::Manual(1))?;
//! game.restore(&loaded.record)?;
//!
//! // Once per frame
//! scheduler.update(&mut manager, &game);
//! ```

pub mod autosave;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod recovery;
pub mod saveable;
pub mod storage;
pub mod types;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use autosave::{AutoSaveScheduler, AutoSaveTrigger, IntervalTask, SkipReason, check_state_gate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SaveConfig;
pub use error::SaveError;
pub use events::{EventListeners, ListenerId, SaveEvent, SaveEventKind};
pub use manager::{
    LoadOutcome, RecoveryNotice, SaveManager, SaveOptions, SaveReceipt, SlotId, SlotListing,
    SlotStatus, SlotSummary,
};
pub use recovery::{RecoveryReport, RecoverySource};
pub use saveable::{GameStateProvider, PreviewCapture};
pub use storage::{FileBackend, MemoryBackend, StorageBackend};
pub use types::*;
pub use validator::{SaveValidator, Section, ValidationDetails, ValidationIssue, ValidationReport};
