//! Save manager for handling save/load operations
//!
//! This module provides the SaveManager struct which handles:
//! - Mapping slot ids (3 manual + 1 auto) to backend keys
//! - Saving: assemble record -> validate -> serialize -> write
//! - Loading: read -> decode -> validate, with fallback on corruption
//! - Deleting, existence checks and slot listings
//!
//! Backup rotation and explicit recovery live in `recovery.rs`; they are
//! further `impl` blocks on the same struct.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::clock::Clock;
use super::codec;
use super::config::SaveConfig;
use super::error::SaveError;
use super::events::{EventListeners, SaveEvent};
use super::recovery::RecoverySource;
use super::saveable::{GameStateProvider, PreviewCapture};
use super::storage::StorageBackend;
use super::types::*;
use super::validator::{SaveValidator, ValidationIssue, ValidationReport};

/// Logical save slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotId {
    /// Player-selected slot, numbered from 1
    Manual(u8),
    /// The single system-managed slot
    Auto,
}

impl SlotId {
    pub fn is_auto(&self) -> bool {
        matches!(self, SlotId::Auto)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Manual(slot) => write!(f, "{}", slot),
            SlotId::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for SlotId {
    type Err = SaveError;

    /// Parses `"auto"` or a slot number; the range is checked by the manager
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(SlotId::Auto);
        }
        s.parse::<u8>()
            .map(SlotId::Manual)
            .map_err(|_| SaveError::InvalidSlot(format!("'{}' is not a slot number or 'auto'", s)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Ask the preview collaborator for an image
    pub capture_preview: bool,
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReceipt {
    pub slot: SlotId,
    pub duration: Duration,
    /// Blob size in bytes
    pub size: usize,
    pub metadata: SaveMetadata,
    pub warnings: Vec<ValidationIssue>,
}

/// Why a load returned data from somewhere other than the requested slot
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryNotice {
    pub source: RecoverySource,
    /// What was wrong with the requested slot
    pub reason: String,
}

/// Result of a successful load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub slot: SlotId,
    pub record: SaveRecord,
    pub duration: Duration,
    pub warnings: Vec<ValidationIssue>,
    pub recovered: Option<RecoveryNotice>,
}

/// What a save slot menu shows for one slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSummary {
    pub timestamp: u64,
    pub location: String,
    pub party_level: u32,
    pub party_size: usize,
    pub gold: u64,
    pub playtime: u64,
    pub version: String,
    pub preview: Option<String>,
}

impl SlotSummary {
    fn from_record(record: &SaveRecord) -> Self {
        SlotSummary {
            timestamp: record.metadata.timestamp,
            location: record.metadata.location.clone(),
            party_level: record.metadata.party_level,
            party_size: record.party.size(),
            gold: record.party.gold,
            playtime: record.metadata.playtime,
            version: record.metadata.version.clone(),
            preview: record.metadata.preview.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotStatus {
    Empty,
    Present(SlotSummary),
    Corrupted { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotListing {
    pub slot: SlotId,
    pub status: SlotStatus,
}

/// A stored blob that decoded and validated
pub(crate) struct CheckedSave {
    pub blob: Vec<u8>,
    pub record: SaveRecord,
    pub report: ValidationReport,
}

pub struct SaveManager<B: StorageBackend> {
    backend: B,
    clock: Rc<dyn Clock>,
    config: SaveConfig,
    validator: SaveValidator,
    preview: Option<Box<dyn PreviewCapture>>,
    listeners: EventListeners,
}

impl<B: StorageBackend> SaveManager<B> {
    /// Creates a SaveManager over a storage backend
    pub fn new(backend: B, clock: Rc<dyn Clock>, config: SaveConfig) -> Self {
        let validator = SaveValidator::new(config.required_version.clone());
        SaveManager {
            backend,
            clock,
            config,
            validator,
            preview: None,
            listeners: EventListeners::new(),
        }
    }

    /// Attaches the renderer hook used for save previews
    pub fn with_preview(mut self, preview: Box<dyn PreviewCapture>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn validator(&self) -> &SaveValidator {
        &self.validator
    }

    pub fn clock(&self) -> &Rc<dyn Clock> {
        &self.clock
    }

    /// Listener registry for save lifecycle events
    pub fn events_mut(&mut self) -> &mut EventListeners {
        &mut self.listeners
    }

    /// Every slot: manual slots in order, then the auto slot
    pub fn slots(&self) -> Vec<SlotId> {
        (1..=self.config.manual_slots)
            .map(SlotId::Manual)
            .chain(std::iter::once(SlotId::Auto))
            .collect()
    }

    /// Checks that a slot id is inside the configured slot space
    pub fn validate_slot(&self, slot: SlotId) -> Result<(), SaveError> {
        match slot {
            SlotId::Auto => Ok(()),
            SlotId::Manual(n) if (1..=self.config.manual_slots).contains(&n) => Ok(()),
            SlotId::Manual(n) => Err(SaveError::InvalidSlot(format!(
                "slot {} is outside 1..={}",
                n, self.config.manual_slots
            ))),
        }
    }

    /// Backend key for a slot
    pub fn slot_key(&self, slot: SlotId) -> Result<String, SaveError> {
        self.validate_slot(slot)?;
        Ok(match slot {
            SlotId::Manual(n) => self.config.manual_key(n),
            SlotId::Auto => self.config.auto_key.clone(),
        })
    }

    /// Saves the live game state into a slot
    ///
    /// The record is validated before anything is written; a record that
    /// fails validation is never persisted. Writes to the auto slot rotate
    /// its backups first.
    pub fn save_game(
        &mut self,
        slot: SlotId,
        state: &dyn GameStateProvider,
        options: &SaveOptions,
    ) -> Result<SaveReceipt, SaveError> {
        let key = self.slot_key(slot)?;
        let started = Instant::now();

        let result = self.write_record(slot, &key, state, options);

        match &result {
            Ok((metadata, size, _)) => {
                log::info!("Game saved to slot {} ({} bytes)", slot, size);
                self.emit(SaveEvent::GameSaved {
                    slot,
                    duration: started.elapsed(),
                    size: *size,
                    metadata: metadata.clone(),
                });
            }
            Err(e) => {
                log::error!("Save to slot {} failed: {}", slot, e);
                self.emit(SaveEvent::SaveError {
                    slot,
                    error: e.to_string(),
                });
            }
        }

        result.map(|(metadata, size, warnings)| SaveReceipt {
            slot,
            duration: started.elapsed(),
            size,
            metadata,
            warnings,
        })
    }

    /// Loads a slot
    ///
    /// If the slot's data is corrupted, a manual slot falls back to the
    /// auto-save and the auto slot falls back to its newest valid backup.
    /// A fallback is reported through `LoadOutcome::recovered`.
    pub fn load_game(&mut self, slot: SlotId) -> Result<LoadOutcome, SaveError> {
        let key = self.slot_key(slot)?;
        let started = Instant::now();

        let result = match self.read_checked(&key) {
            Ok(save) => Ok((save, None)),
            Err(e) if e.is_corruption() => {
                log::warn!("Slot {} is unreadable: {}", slot, e);
                match self.fallback_for(slot) {
                    Some((save, source)) => {
                        log::warn!("Loaded slot {} from {}", slot, source);
                        let notice = RecoveryNotice {
                            source,
                            reason: e.to_string(),
                        };
                        Ok((save, Some(notice)))
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok((save, recovered)) => {
                for warning in &save.report.warnings {
                    log::warn!("Slot {}: {}", slot, warning);
                }
                self.emit(SaveEvent::GameLoaded {
                    slot,
                    duration: started.elapsed(),
                    metadata: save.record.metadata.clone(),
                    recovered: recovered.as_ref().map(|notice| notice.source),
                });
                Ok(LoadOutcome {
                    slot,
                    record: save.record,
                    duration: started.elapsed(),
                    warnings: save.report.warnings,
                    recovered,
                })
            }
            Err(e) => {
                log::error!("Load of slot {} failed: {}", slot, e);
                self.emit(SaveEvent::LoadError {
                    slot,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Loads a slot and applies it to the live game
    pub fn load_into(
        &mut self,
        slot: SlotId,
        state: &mut dyn GameStateProvider,
    ) -> Result<LoadOutcome, SaveError> {
        let outcome = self.load_game(slot)?;
        state.restore(&outcome.record)?;
        Ok(outcome)
    }

    /// Deletes a slot; deleting an empty slot is not an error
    pub fn delete_save(&mut self, slot: SlotId) -> Result<(), SaveError> {
        let key = self.slot_key(slot)?;
        self.backend.remove(&key)?;
        log::info!("Deleted save in slot {}", slot);
        self.emit(SaveEvent::SaveDeleted { slot });
        Ok(())
    }

    /// Whether anything is stored in a slot (the data isn't decoded)
    pub fn has_save(&self, slot: SlotId) -> Result<bool, SaveError> {
        let key = self.slot_key(slot)?;
        self.backend.contains(&key)
    }

    /// Display metadata for every slot
    ///
    /// A slot that can't be read or validated is reported as corrupted; the
    /// other slots are still listed.
    pub fn get_all_save_metadata(&self) -> Vec<SlotListing> {
        self.slots()
            .into_iter()
            .map(|slot| {
                let status = match self.slot_key(slot).and_then(|key| self.read_checked(&key)) {
                    Ok(save) => SlotStatus::Present(SlotSummary::from_record(&save.record)),
                    Err(SaveError::NoSave(_)) => SlotStatus::Empty,
                    Err(e) => SlotStatus::Corrupted {
                        error: e.to_string(),
                    },
                };
                SlotListing { slot, status }
            })
            .collect()
    }

    pub(crate) fn emit(&mut self, event: SaveEvent) {
        self.listeners.emit(&event);
    }

    /// Decodes and validates a blob
    pub(crate) fn check_blob(&self, blob: Vec<u8>) -> Result<CheckedSave, SaveError> {
        let value = codec::decode_value(&blob)?;
        let report = self.validator.validate(&value);
        if !report.is_valid {
            return Err(SaveError::ValidationError(report));
        }
        let record = codec::record_from_value(value)?;
        Ok(CheckedSave {
            blob,
            record,
            report,
        })
    }

    /// Reads a key and checks what is stored there
    pub(crate) fn read_checked(&self, key: &str) -> Result<CheckedSave, SaveError> {
        let blob = self
            .backend
            .get(key)?
            .ok_or_else(|| SaveError::NoSave(self.slot_for_key(key)))?;
        self.check_blob(blob)
    }

    fn slot_for_key(&self, key: &str) -> SlotId {
        self.slots()
            .into_iter()
            .find(|slot| self.slot_key(*slot).is_ok_and(|k| k == key))
            .unwrap_or(SlotId::Auto)
    }

    /// Read-only fallback used by `load_game`
    fn fallback_for(&self, slot: SlotId) -> Option<(CheckedSave, RecoverySource)> {
        match slot {
            SlotId::Manual(_) => self
                .read_checked(&self.config.auto_key)
                .ok()
                .map(|save| (save, RecoverySource::AutoSave)),
            SlotId::Auto => self
                .find_valid_backup()
                .map(|(index, save)| (save, RecoverySource::Backup(index))),
        }
    }

    fn write_record(
        &mut self,
        slot: SlotId,
        key: &str,
        state: &dyn GameStateProvider,
        options: &SaveOptions,
    ) -> Result<(SaveMetadata, usize, Vec<ValidationIssue>), SaveError> {
        let record = self.assemble_record(state, options);

        let report = self.validator.validate_record(&record);
        if !report.is_valid {
            return Err(SaveError::ValidationError(report));
        }

        let blob = codec::serialize(&record)?;

        if slot.is_auto() {
            self.rotate_backups()?;
        }
        self.backend.set(key, &blob)?;

        Ok((record.metadata, blob.len(), report.warnings))
    }

    /// Builds a fresh record from the live game
    fn assemble_record(&mut self, state: &dyn GameStateProvider, options: &SaveOptions) -> SaveRecord {
        let now = self.clock.now_ms();
        let party = state.party_snapshot();

        let mut progress = state.progress_snapshot();
        progress.last_saved_at = now;
        if progress.game_started_at == 0 {
            progress.game_started_at = now;
        }

        let preview = if options.capture_preview {
            self.capture_preview()
        } else {
            None
        };

        SaveRecord {
            metadata: SaveMetadata {
                version: CURRENT_SAVE_VERSION.to_string(),
                timestamp: now,
                playtime: state.playtime_ms(),
                location: state.location_label(),
                party_level: party.average_level(),
                preview,
            },
            party,
            inventory: state.inventory_snapshot(),
            world: state.world_snapshot(),
            progress,
            settings: state.settings_snapshot(),
        }
    }

    fn capture_preview(&mut self) -> Option<String> {
        let preview = self.preview.as_mut()?;
        let captured = preview
            .render_frame()
            .and_then(|()| preview.encode_frame());

        match captured {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Preview capture failed, saving without one: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::events::SaveEventKind;
    use crate::save::storage::MemoryBackend;
    use crate::save::test_support::{FakeGame, sample_record, test_manager};
    use crate::save::validator::Section;
    use serde_json::json;
    use std::cell::RefCell;

    struct StubPreview {
        fail: bool,
    }

    impl PreviewCapture for StubPreview {
        fn render_frame(&mut self) -> Result<(), String> {
            if self.fail {
                Err("no GPU".to_string())
            } else {
                Ok(())
            }
        }

        fn encode_frame(&mut self) -> Result<String, String> {
            Ok("data:image/png;base64,AAAA".to_string())
        }
    }

    fn record_events(manager: &mut SaveManager<MemoryBackend>) -> Rc<RefCell<Vec<SaveEventKind>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        manager
            .events_mut()
            .subscribe(move |event| sink.borrow_mut().push(event.kind()));
        seen
    }

    fn corrupt(manager: &mut SaveManager<MemoryBackend>, key: &str) {
        let blob = manager.backend().get(key).unwrap().unwrap();
        let truncated = blob[..blob.len() / 2].to_vec();
        manager.backend_mut().set(key, &truncated).unwrap();
    }

    #[test]
    fn test_slot_id_parsing() {
        assert_eq!("auto".parse::<SlotId>().unwrap(), SlotId::Auto);
        assert_eq!(" AUTO ".parse::<SlotId>().unwrap(), SlotId::Auto);
        assert_eq!("2".parse::<SlotId>().unwrap(), SlotId::Manual(2));
        assert!(matches!("two".parse::<SlotId>(), Err(SaveError::InvalidSlot(_))));
        assert!(matches!("-1".parse::<SlotId>(), Err(SaveError::InvalidSlot(_))));
        assert_eq!(SlotId::Manual(3).to_string(), "3");
        assert_eq!(SlotId::Auto.to_string(), "auto");
    }

    #[test]
    fn test_invalid_slots_never_touch_backend() {
        let (mut manager, _clock) = test_manager();
        let game = FakeGame::new();

        for slot in [SlotId::Manual(0), SlotId::Manual(4)] {
            assert!(matches!(
                manager.save_game(slot, &game, &SaveOptions::default()),
                Err(SaveError::InvalidSlot(_))
            ));
            assert!(matches!(manager.load_game(slot), Err(SaveError::InvalidSlot(_))));
            assert!(matches!(manager.delete_save(slot), Err(SaveError::InvalidSlot(_))));
            assert!(manager.has_save(slot).is_err());
        }
        assert_eq!(manager.backend().write_count(), 0);
    }

    #[test]
    fn test_save_then_load_manual_slot() {
        let (mut manager, _clock) = test_manager();
        let game = FakeGame::new().with_gold(150);

        let receipt = manager
            .save_game(SlotId::Manual(2), &game, &SaveOptions::default())
            .unwrap();
        assert!(receipt.size > 0);
        assert_eq!(receipt.metadata.party_level, game.party.average_level());

        let loaded = manager.load_game(SlotId::Manual(2)).unwrap();
        assert_eq!(loaded.record.party.gold, 150);
        assert_eq!(loaded.record.party.size(), 2);
        assert!(loaded.recovered.is_none());
    }

    #[test]
    fn test_save_stamps_progress_timestamps() {
        let (mut manager, clock) = test_manager();
        let game = FakeGame::new();

        manager
            .save_game(SlotId::Manual(1), &game, &SaveOptions::default())
            .unwrap();
        let record = manager.load_game(SlotId::Manual(1)).unwrap().record;

        assert_eq!(record.metadata.timestamp, clock.now_ms());
        assert_eq!(record.progress.last_saved_at, clock.now_ms());
        assert_eq!(record.progress.game_started_at, game.progress.game_started_at);
    }

    #[test]
    fn test_invalid_record_is_not_written() {
        let (mut manager, _clock) = test_manager();
        let events = record_events(&mut manager);
        let mut game = FakeGame::new();
        game.party.characters = vec![None, None];

        let result = manager.save_game(SlotId::Manual(1), &game, &SaveOptions::default());

        let report = result.unwrap_err().report().cloned().unwrap();
        assert!(report.errors_in(Section::Party).count() > 0);
        assert!(!manager.has_save(SlotId::Manual(1)).unwrap());
        assert_eq!(*events.borrow(), vec![SaveEventKind::SaveError]);
    }

    #[test]
    fn test_storage_failure_is_reported() {
        let (mut manager, _clock) = test_manager();
        manager.backend_mut().set_fail_writes(true);

        let result = manager.save_game(SlotId::Manual(1), &FakeGame::new(), &SaveOptions::default());
        assert!(matches!(result, Err(SaveError::StorageError(_))));
    }

    #[test]
    fn test_load_missing_slot() {
        let (mut manager, _clock) = test_manager();
        let events = record_events(&mut manager);

        assert!(matches!(
            manager.load_game(SlotId::Manual(1)),
            Err(SaveError::NoSave(SlotId::Manual(1)))
        ));
        assert_eq!(*events.borrow(), vec![SaveEventKind::LoadError]);
    }

    #[test]
    fn test_corrupted_manual_slot_falls_back_to_auto_save() {
        let (mut manager, _clock) = test_manager();
        let events = record_events(&mut manager);
        let game = FakeGame::new();
        let options = SaveOptions::default();

        manager.save_game(SlotId::Manual(1), &game, &options).unwrap();
        let auto = manager.save_game(SlotId::Auto, &game, &options).unwrap();
        let key = manager.slot_key(SlotId::Manual(1)).unwrap();
        corrupt(&mut manager, &key);

        let loaded = manager.load_game(SlotId::Manual(1)).unwrap();
        assert_eq!(loaded.record.metadata, auto.metadata);
        let notice = loaded.recovered.unwrap();
        assert_eq!(notice.source, RecoverySource::AutoSave);
        assert!(!notice.reason.is_empty());
        assert_eq!(events.borrow().last(), Some(&SaveEventKind::GameLoaded));
    }

    #[test]
    fn test_save_with_only_warnings_loads_as_is() {
        let (mut manager, _clock) = test_manager();
        manager
            .save_game(SlotId::Auto, &FakeGame::new().with_gold(999), &SaveOptions::default())
            .unwrap();

        let mut data = serde_json::to_value(sample_record()).unwrap();
        data["inventory"]["slots"][0]["item"]
            .as_object_mut()
            .unwrap()
            .remove("type");
        data["inventory"]["slots"][5]["quantity"] = json!(0);
        data["inventory"]["slots"][7] = json!("rubble");
        data["metadata"]["playtime"] = json!(-5);
        data["metadata"].as_object_mut().unwrap().remove("location");
        data["party"]["formation"] = json!("wedge");
        data["party"]["characters"][0]["stats"] = json!("strong");
        data["world"]["direction"] = json!(9);
        data["world"]["floor"] = json!(-1);
        data["progress"].as_object_mut().unwrap().remove("game_started_at");
        data["progress"]["completed_quests"] = json!("all of them");
        data["settings"] = json!({ "difficulty": "nightmare" });
        data["mods"] = json!({});

        let report = manager.validator().validate(&data);
        assert!(report.is_valid, "{}", report.summary());
        assert!(report.warnings.len() >= 10);

        let key = manager.slot_key(SlotId::Manual(1)).unwrap();
        let blob = codec::encode_value(&data).unwrap();
        manager.backend_mut().set(&key, &blob).unwrap();

        let loaded = manager.load_game(SlotId::Manual(1)).unwrap();
        assert!(loaded.recovered.is_none());
        assert_eq!(loaded.warnings.len(), report.warnings.len());

        let record = loaded.record;
        assert_eq!(record.party.gold, 150);
        assert_eq!(record.inventory.slots[0].as_ref().unwrap().item.item_type, "");
        assert_eq!(record.inventory.slots[5].as_ref().unwrap().quantity, 0);
        assert!(record.inventory.slots[7].is_none());
        assert_eq!(record.metadata.playtime, 0);
        assert_eq!(record.metadata.location, "");
        assert_eq!(record.party.formation, Formation::default());
        assert_eq!(record.party.characters[0].as_ref().unwrap().stats, None);
        assert_eq!(record.world.direction, 9);
        assert_eq!(record.world.floor, 0);
        assert_eq!(record.progress.game_started_at, 0);
        assert!(record.progress.completed_quests.is_empty());
        assert_eq!(record.settings, SaveSettings::default());
    }

    #[test]
    fn test_corrupted_manual_slot_without_auto_save_fails() {
        let (mut manager, _clock) = test_manager();
        let game = FakeGame::new();

        manager
            .save_game(SlotId::Manual(1), &game, &SaveOptions::default())
            .unwrap();
        let key = manager.slot_key(SlotId::Manual(1)).unwrap();
        corrupt(&mut manager, &key);

        assert!(matches!(
            manager.load_game(SlotId::Manual(1)),
            Err(SaveError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (mut manager, _clock) = test_manager();
        let events = record_events(&mut manager);
        let game = FakeGame::new();

        manager
            .save_game(SlotId::Manual(3), &game, &SaveOptions::default())
            .unwrap();
        assert!(manager.has_save(SlotId::Manual(3)).unwrap());

        manager.delete_save(SlotId::Manual(3)).unwrap();
        manager.delete_save(SlotId::Manual(3)).unwrap();
        assert!(!manager.has_save(SlotId::Manual(3)).unwrap());
        assert_eq!(
            *events.borrow(),
            vec![
                SaveEventKind::GameSaved,
                SaveEventKind::SaveDeleted,
                SaveEventKind::SaveDeleted
            ]
        );
    }

    #[test]
    fn test_metadata_listing_survives_corruption() {
        let (mut manager, _clock) = test_manager();
        let game = FakeGame::new().with_gold(75);
        let options = SaveOptions::default();

        manager.save_game(SlotId::Manual(1), &game, &options).unwrap();
        manager.save_game(SlotId::Manual(2), &game, &options).unwrap();
        let key = manager.slot_key(SlotId::Manual(2)).unwrap();
        corrupt(&mut manager, &key);

        let listing = manager.get_all_save_metadata();
        assert_eq!(listing.len(), 4);

        match &listing[0].status {
            SlotStatus::Present(summary) => {
                assert_eq!(summary.gold, 75);
                assert_eq!(summary.party_size, 2);
                assert_eq!(summary.location, game.location);
            }
            other => panic!("slot 1 should be present, got {:?}", other),
        }
        assert!(matches!(listing[1].status, SlotStatus::Corrupted { .. }));
        assert_eq!(listing[2].status, SlotStatus::Empty);
        assert_eq!(listing[3].slot, SlotId::Auto);
        assert_eq!(listing[3].status, SlotStatus::Empty);
    }

    #[test]
    fn test_preview_capture() {
        let (manager, _clock) = test_manager();
        let mut manager = manager.with_preview(Box::new(StubPreview { fail: false }));
        let options = SaveOptions {
            capture_preview: true,
        };

        let receipt = manager
            .save_game(SlotId::Manual(1), &FakeGame::new(), &options)
            .unwrap();
        assert!(receipt.metadata.preview.unwrap().starts_with("data:image/png"));
    }

    #[test]
    fn test_preview_failure_is_not_fatal() {
        let (manager, _clock) = test_manager();
        let mut manager = manager.with_preview(Box::new(StubPreview { fail: true }));
        let options = SaveOptions {
            capture_preview: true,
        };

        let receipt = manager
            .save_game(SlotId::Manual(1), &FakeGame::new(), &options)
            .unwrap();
        assert_eq!(receipt.metadata.preview, None);
    }

    #[test]
    fn test_load_into_restores_game() {
        let (mut manager, _clock) = test_manager();
        let saved = FakeGame::new().with_gold(321);
        manager
            .save_game(SlotId::Manual(1), &saved, &SaveOptions::default())
            .unwrap();

        let mut fresh = FakeGame::new();
        manager.load_into(SlotId::Manual(1), &mut fresh).unwrap();

        assert_eq!(fresh.party.gold, 321);
        assert_eq!(fresh.inventory.gold, 321);
    }
}
