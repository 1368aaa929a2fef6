//! Save record data types
//!
//! This module defines the `SaveRecord`, the unit of persistence, and every
//! section it is built from. A record is assembled fresh from live snapshots at
//! the moment of saving and is never mutated after it has been serialized;
//! loading always produces a newly reconstructed record.
//!
//! All types derive Serde traits. The JSON field names produced here are the
//! same names the validator inspects and the codec's compression dictionary
//! abbreviates, so renaming a field is a format change.
//!
//! Rebuilding a record from loaded data is as forgiving as the validator:
//! anything the validator only warns about (or doesn't check at all) is
//! coerced to a usable value instead of failing the load. See `lenient`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

/// Format version written into every new save
pub const CURRENT_SAVE_VERSION: &str = "1.0.0";

/// Number of inventory slots in every record
pub const INVENTORY_SIZE: usize = 40;

/// Maximum number of (non-empty) party members
pub const MAX_PARTY_SIZE: usize = 4;

/// The root save record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub metadata: SaveMetadata,
    pub party: PartySnapshot,
    pub inventory: InventorySnapshot,
    pub world: WorldSnapshot,
    pub progress: ProgressSnapshot,
    /// Unreadable settings fall back to defaults
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub settings: SaveSettings,
}

/// Display and compatibility information about a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub version: String,
    /// Creation time, epoch milliseconds
    #[serde(deserialize_with = "lenient::whole_number")]
    pub timestamp: u64,
    /// Accumulated playtime in milliseconds
    #[serde(default, deserialize_with = "lenient::whole_number")]
    pub playtime: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub location: String,
    /// Rounded average level of the party at save time
    #[serde(default, deserialize_with = "lenient::small_number")]
    pub party_level: u32,
    /// Encoded preview image (data URL), if one was captured
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_text"
    )]
    pub preview: Option<String>,
}

/// Snapshot of one party member
///
/// The party collaborator owns the shape of a character; the save system only
/// relies on the identifying fields below. Anything else the collaborator
/// emits is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    pub class: String,
    pub level: u32,
    /// Dropped on load when it isn't an object
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_object"
    )]
    pub stats: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CharacterSnapshot {
    /// Creates a character with no stats or equipment
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        class: impl Into<String>,
        level: u32,
    ) -> Self {
        CharacterSnapshot {
            id: id.into(),
            name: name.into(),
            class: class.into(),
            level,
            stats: None,
            equipment: None,
            extra: Map::new(),
        }
    }

    /// Current HP as recorded in `stats.hp.current`
    pub fn current_hp(&self) -> Option<f64> {
        self.stats
            .as_ref()?
            .get("hp")?
            .get("current")?
            .as_f64()
    }

    /// A character at zero HP (or below) can't act
    ///
    /// Characters without HP information are treated as able to act.
    pub fn is_incapacitated(&self) -> bool {
        self.current_hp().is_some_and(|hp| hp <= 0.0)
    }
}

/// Front/back row placement by character id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    #[serde(default)]
    pub front: Vec<String>,
    #[serde(default)]
    pub back: Vec<String>,
}

/// Party section of a save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartySnapshot {
    /// Party slots in order; `None` marks an empty slot
    pub characters: Vec<Option<CharacterSnapshot>>,
    #[serde(default, deserialize_with = "lenient::formation")]
    pub formation: Formation,
    #[serde(default, deserialize_with = "lenient::whole_number")]
    pub gold: u64,
}

impl PartySnapshot {
    /// Iterates over the occupied party slots
    pub fn members(&self) -> impl Iterator<Item = &CharacterSnapshot> {
        self.characters.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn size(&self) -> usize {
        self.members().count()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// True when nobody in the party can act (an empty party counts)
    pub fn is_incapacitated(&self) -> bool {
        self.members().all(CharacterSnapshot::is_incapacitated)
    }

    /// Rounded average level of the occupied slots, 0 for an empty party
    pub fn average_level(&self) -> u32 {
        let size = self.size();
        if size == 0 {
            return 0;
        }
        let total: u64 = self.members().map(|c| u64::from(c.level)).sum();
        (total as f64 / size as f64).round() as u32
    }

    /// Ids used in the formation that don't match any party member
    pub fn dangling_formation_ids(&self) -> Vec<&str> {
        let known: HashSet<&str> = self.members().map(|c| c.id.as_str()).collect();
        self.formation
            .front
            .iter()
            .chain(self.formation.back.iter())
            .map(String::as_str)
            .filter(|id| !known.contains(id))
            .collect()
    }
}

/// An item as stored in an inventory slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub item_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, item_type: impl Into<String>) -> Self {
        ItemSnapshot {
            id: id.into(),
            name: name.into(),
            item_type: item_type.into(),
            extra: Map::new(),
        }
    }
}

/// One occupied inventory slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item: ItemSnapshot,
    #[serde(default, deserialize_with = "lenient::small_number")]
    pub quantity: u32,
}

/// Inventory section of a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Exactly `INVENTORY_SIZE` entries once normalized; slots without a
    /// usable item load as empty
    #[serde(deserialize_with = "lenient::inventory_slots")]
    pub slots: Vec<Option<InventorySlot>>,
    /// Mirrors `PartySnapshot::gold`
    #[serde(default, deserialize_with = "lenient::whole_number")]
    pub gold: u64,
}

impl InventorySnapshot {
    /// Creates an inventory with every slot empty
    pub fn empty(gold: u64) -> Self {
        InventorySnapshot {
            slots: vec![None; INVENTORY_SIZE],
            gold,
        }
    }

    /// Pads with empty slots or drops excess slots to reach `INVENTORY_SIZE`
    pub fn normalize(&mut self) {
        self.slots.resize(INVENTORY_SIZE, None);
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for InventorySnapshot {
    fn default() -> Self {
        Self::empty(0)
    }
}

/// Player position on the floor plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

/// World section of a save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default, deserialize_with = "lenient::text")]
    pub zone: String,
    #[serde(default, deserialize_with = "lenient::small_number")]
    pub floor: u32,
    pub position: Position,
    /// Facing: 0 = north, 1 = east, 2 = south, 3 = west
    #[serde(default, deserialize_with = "lenient::direction")]
    pub direction: u8,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub visited: BTreeSet<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub cleared: BTreeSet<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub opened: BTreeSet<String>,
}

/// Quest and exploration progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub completed_quests: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub unlocked_areas: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub defeated_bosses: Vec<String>,
    /// Epoch milliseconds when this playthrough began
    #[serde(default, deserialize_with = "lenient::whole_number")]
    pub game_started_at: u64,
    /// Epoch milliseconds of the save that produced this record
    #[serde(default, deserialize_with = "lenient::whole_number")]
    pub last_saved_at: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Player preferences stored alongside the game (not gameplay-critical)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    pub difficulty: Difficulty,
    pub auto_save: bool,
    pub auto_save_interval_secs: u64,
}

impl Default for SaveSettings {
    fn default() -> Self {
        SaveSettings {
            difficulty: Difficulty::Normal,
            auto_save: true,
            auto_save_interval_secs: 300,
        }
    }
}

/// Forgiving field deserializers for loaded saves
///
/// Each one accepts any JSON value and coerces it: numbers are clamped into
/// range (negative or non-numeric becomes 0), non-text becomes its JSON text
/// (null becomes empty), and malformed optional sections become their
/// default.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    use super::{Formation, InventorySlot, ItemSnapshot};

    fn number(value: &Value) -> u64 {
        match value {
            // float -> int casts saturate, and NaN becomes 0
            Value::Number(n) => n.as_u64().unwrap_or_else(|| n.as_f64().map_or(0, |f| f as u64)),
            _ => 0,
        }
    }

    fn to_text(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn to_list<C: FromIterator<String>>(value: Value) -> C {
        match value {
            Value::Array(items) => items.into_iter().map(to_text).collect(),
            _ => std::iter::empty().collect(),
        }
    }

    pub fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(number(&Value::deserialize(deserializer)?))
    }

    pub fn small_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let n = number(&Value::deserialize(deserializer)?);
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    pub fn direction<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let n = number(&Value::deserialize(deserializer)?);
        Ok(u8::try_from(n).unwrap_or(u8::MAX))
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(to_text(Value::deserialize(deserializer)?))
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    pub fn optional_object<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Map<String, Value>>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(None),
        }
    }

    pub fn text_list<'de, D, C>(deserializer: D) -> Result<C, D::Error>
    where
        D: Deserializer<'de>,
        C: FromIterator<String>,
    {
        Ok(to_list(Value::deserialize(deserializer)?))
    }

    pub fn formation<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Formation, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(mut rows) => Ok(Formation {
                front: rows.remove("front").map(to_list).unwrap_or_default(),
                back: rows.remove("back").map(to_list).unwrap_or_default(),
            }),
            _ => Ok(Formation::default()),
        }
    }

    fn inventory_slot(value: Value) -> Option<InventorySlot> {
        let Value::Object(mut slot) = value else {
            return None;
        };
        let item = match slot.remove("item") {
            Some(item @ Value::Object(_)) => serde_json::from_value::<ItemSnapshot>(item).ok()?,
            _ => return None,
        };
        let quantity = slot.get("quantity").map_or(0, number);
        Some(InventorySlot {
            item,
            quantity: u32::try_from(quantity).unwrap_or(u32::MAX),
        })
    }

    pub fn inventory_slots<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Option<InventorySlot>>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Array(slots) => Ok(slots.into_iter().map(inventory_slot).collect()),
            _ => Err(serde::de::Error::custom("inventory slots must be a list")),
        }
    }

    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned + Default,
    {
        Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
    }
}
