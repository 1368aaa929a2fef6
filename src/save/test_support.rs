//! Shared fixtures for the save system's unit tests

use std::rc::Rc;

use serde_json::json;

use super::clock::ManualClock;
use super::config::SaveConfig;
use super::error::SaveError;
use super::manager::SaveManager;
use super::saveable::GameStateProvider;
use super::storage::MemoryBackend;
use super::types::*;

/// Test clock start (Nov 2023); timestamps must be positive
pub const START_MS: u64 = 1_700_000_000_000;

/// A fully statted character
pub fn character(id: &str, name: &str, class: &str, level: u32) -> CharacterSnapshot {
    let mut character = CharacterSnapshot::new(id, name, class, level);
    character.stats = json!({
        "hp": { "current": 40, "max": 50 },
        "mp": { "current": 12, "max": 20 },
        "attack": 11,
        "defense": 8,
        "speed": 6,
        "magic": 4
    })
    .as_object()
    .cloned();
    character.equipment = json!({
        "weapon": { "id": "short_sword", "name": "Short Sword", "type": "weapon" },
        "armor": null
    })
    .as_object()
    .cloned();
    character
}

fn party(gold: u64) -> PartySnapshot {
    PartySnapshot {
        characters: vec![
            Some(character("hero_1", "Aria", "warrior", 5)),
            Some(character("hero_2", "Bram", "mage", 4)),
            None,
            None,
        ],
        formation: Formation {
            front: vec!["hero_1".to_string()],
            back: vec!["hero_2".to_string()],
        },
        gold,
    }
}

fn inventory(gold: u64) -> InventorySnapshot {
    let mut inventory = InventorySnapshot::empty(gold);
    inventory.slots[0] = Some(InventorySlot {
        item: ItemSnapshot::new("potion", "Healing Potion", "consumable"),
        quantity: 3,
    });
    inventory.slots[5] = Some(InventorySlot {
        item: ItemSnapshot::new("key_iron", "Iron Key", "key"),
        quantity: 1,
    });
    inventory
}

fn world() -> WorldSnapshot {
    WorldSnapshot {
        zone: "sunken_crypt".to_string(),
        floor: 2,
        position: Position { x: 4.5, z: -2.25 },
        direction: 1,
        visited: ["sunken_crypt:1", "sunken_crypt:2"].iter().map(|s| s.to_string()).collect(),
        cleared: ["sunken_crypt:1"].iter().map(|s| s.to_string()).collect(),
        opened: ["chest_1_3"].iter().map(|s| s.to_string()).collect(),
    }
}

fn progress() -> ProgressSnapshot {
    ProgressSnapshot {
        completed_quests: vec!["rat_problem".to_string()],
        unlocked_areas: vec!["sunken_crypt".to_string()],
        defeated_bosses: Vec::new(),
        game_started_at: START_MS - 3_600_000,
        last_saved_at: START_MS - 60_000,
    }
}

/// A record that validates with no errors and no warnings
pub fn sample_record() -> SaveRecord {
    let party = party(150);
    SaveRecord {
        metadata: SaveMetadata {
            version: CURRENT_SAVE_VERSION.to_string(),
            timestamp: START_MS,
            playtime: 3_600_000,
            location: "Sunken Crypt - Floor 2".to_string(),
            party_level: party.average_level(),
            preview: None,
        },
        party,
        inventory: inventory(150),
        world: world(),
        progress: progress(),
        settings: SaveSettings::default(),
    }
}

/// In-memory stand-in for the live game
#[derive(Debug, Clone)]
pub struct FakeGame {
    pub party: PartySnapshot,
    pub inventory: InventorySnapshot,
    pub world: WorldSnapshot,
    pub progress: ProgressSnapshot,
    pub settings: SaveSettings,
    pub location: String,
    pub playtime: u64,
    pub combat: bool,
    pub transition: bool,
    pub restored: Option<SaveRecord>,
}

impl FakeGame {
    pub fn new() -> Self {
        let record = sample_record();
        FakeGame {
            party: record.party,
            inventory: record.inventory,
            world: record.world,
            progress: record.progress,
            settings: record.settings,
            location: record.metadata.location,
            playtime: record.metadata.playtime,
            combat: false,
            transition: false,
            restored: None,
        }
    }

    /// Sets party and inventory gold together so they stay consistent
    pub fn with_gold(mut self, gold: u64) -> Self {
        self.party.gold = gold;
        self.inventory.gold = gold;
        self
    }

    pub fn in_combat(mut self) -> Self {
        self.combat = true;
        self
    }

    pub fn in_transition(mut self) -> Self {
        self.transition = true;
        self
    }

    /// Drops every party member to zero HP
    pub fn knocked_out(mut self) -> Self {
        for member in self.party.characters.iter_mut().flatten() {
            if let Some(stats) = member.stats.as_mut() {
                stats.insert("hp".to_string(), json!({ "current": 0, "max": 50 }));
            }
        }
        self
    }
}

impl GameStateProvider for FakeGame {
    fn party_snapshot(&self) -> PartySnapshot {
        self.party.clone()
    }

    fn inventory_snapshot(&self) -> InventorySnapshot {
        self.inventory.clone()
    }

    fn world_snapshot(&self) -> WorldSnapshot {
        self.world.clone()
    }

    fn progress_snapshot(&self) -> ProgressSnapshot {
        self.progress.clone()
    }

    fn settings_snapshot(&self) -> SaveSettings {
        self.settings.clone()
    }

    fn location_label(&self) -> String {
        self.location.clone()
    }

    fn playtime_ms(&self) -> u64 {
        self.playtime
    }

    fn is_combat_active(&self) -> bool {
        self.combat
    }

    fn is_transition_active(&self) -> bool {
        self.transition
    }

    fn restore(&mut self, record: &SaveRecord) -> Result<(), SaveError> {
        self.party = record.party.clone();
        self.inventory = record.inventory.clone();
        self.world = record.world.clone();
        self.progress = record.progress.clone();
        self.settings = record.settings.clone();
        self.restored = Some(record.clone());
        Ok(())
    }
}

/// A manager over an empty `MemoryBackend`, with a clock set to `START_MS`
pub fn test_manager() -> (SaveManager<MemoryBackend>, ManualClock) {
    let clock = ManualClock::new(START_MS);
    let manager = SaveManager::new(MemoryBackend::new(), Rc::new(clock.clone()), SaveConfig::default());
    (manager, clock)
}
