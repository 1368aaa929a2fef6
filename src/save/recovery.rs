//! Auto-save backups and recovery
//!
//! The auto slot keeps a fixed number of rotating backups. Every write to the
//! auto slot first shifts the chain down by one (the oldest falls off) and
//! copies the current auto-save into backup 1.
//!
//! Loading never writes; `recover_save` is the explicit operation that puts a
//! good copy back into a damaged slot.

use std::fmt;

use super::error::SaveError;
use super::events::SaveEvent;
use super::manager::{CheckedSave, SaveManager, SlotId};
use super::storage::StorageBackend;
use super::types::SaveMetadata;

/// Where recovered data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoverySource {
    /// Rotation backup, 1 = most recent
    Backup(usize),
    /// The auto-save slot (used for damaged manual slots)
    AutoSave,
}

impl fmt::Display for RecoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverySource::Backup(index) => write!(f, "backup {}", index),
            RecoverySource::AutoSave => f.write_str("auto-save"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryReport {
    pub slot: SlotId,
    pub source: RecoverySource,
    pub metadata: SaveMetadata,
}

impl<B: StorageBackend> SaveManager<B> {
    /// Shifts the backup chain and copies the current auto-save into backup 1
    ///
    /// A missing source clears its target, so the chain never holds a copy
    /// older than its neighbours.
    pub fn rotate_backups(&mut self) -> Result<(), SaveError> {
        let count = self.config().backup_count;
        if count == 0 {
            return Ok(());
        }

        for index in (2..=count).rev() {
            let source = self.config().backup_key(index - 1);
            let target = self.config().backup_key(index);
            self.copy_or_clear(&source, &target)?;
        }

        let auto_key = self.config().auto_key.clone();
        let first = self.config().backup_key(1);
        self.copy_or_clear(&auto_key, &first)?;

        log::debug!("Rotated {} auto-save backups", count);
        Ok(())
    }

    /// Number of backups currently stored
    pub fn backup_count(&self) -> Result<usize, SaveError> {
        let mut stored = 0;
        for index in 1..=self.config().backup_count {
            if self.backend().contains(&self.config().backup_key(index))? {
                stored += 1;
            }
        }
        Ok(stored)
    }

    /// Repairs a slot from its fallback
    ///
    /// The auto slot is restored from its newest valid backup. A manual slot
    /// is restored from the auto-save. The backup chain is not rotated.
    pub fn recover_save(&mut self, slot: SlotId) -> Result<RecoveryReport, SaveError> {
        let key = self.slot_key(slot)?;

        let (save, source) = match slot {
            SlotId::Auto => {
                let (index, save) = self.find_valid_backup().ok_or_else(|| {
                    SaveError::RecoveryExhausted("no valid auto-save backup".to_string())
                })?;
                (save, RecoverySource::Backup(index))
            }
            SlotId::Manual(_) => {
                let auto_key = self.config().auto_key.clone();
                let save = self.read_checked(&auto_key).map_err(|e| {
                    SaveError::RecoveryExhausted(format!("no valid auto-save to recover from ({})", e))
                })?;
                (save, RecoverySource::AutoSave)
            }
        };

        self.backend_mut().set(&key, &save.blob)?;
        log::info!("Recovered slot {} from {}", slot, source);
        self.emit(SaveEvent::SaveRecovered { slot, source });

        Ok(RecoveryReport {
            slot,
            source,
            metadata: save.record.metadata,
        })
    }

    /// Newest backup that decodes and validates
    pub(crate) fn find_valid_backup(&self) -> Option<(usize, CheckedSave)> {
        (1..=self.config().backup_count).find_map(|index| {
            let key = self.config().backup_key(index);
            match self.read_checked(&key) {
                Ok(save) => Some((index, save)),
                Err(SaveError::NoSave(_)) => None,
                Err(e) => {
                    log::warn!("Skipping auto-save backup {}: {}", index, e);
                    None
                }
            }
        })
    }

    fn copy_or_clear(&mut self, source: &str, target: &str) -> Result<(), SaveError> {
        match self.backend().get(source)? {
            Some(bytes) => self.backend_mut().set(target, &bytes),
            None => self.backend_mut().remove(target),
        }
    }
}
