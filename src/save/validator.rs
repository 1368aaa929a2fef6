//! Save data validation
//!
//! Two tiers:
//! - `quick_validate`: a cheap structural gate (sections present, party not
//!   empty, inventory of the right length). Anything it rejects is also
//!   rejected by full validation.
//! - `validate`: section-by-section checks producing a `ValidationReport`
//!   with blocking errors and advisory warnings.
//!
//! Both tiers work on raw decoded data (`serde_json::Value`) so that damaged
//! saves can be inspected before a typed record is rebuilt from them.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use super::types::{CURRENT_SAVE_VERSION, INVENTORY_SIZE, MAX_PARTY_SIZE, SaveRecord};

/// Character classes a save may contain
pub const CHARACTER_CLASSES: &[&str] = &["warrior", "mage", "cleric", "rogue", "ranger", "paladin"];

/// Stats every character is expected to carry
pub const REQUIRED_STATS: &[&str] = &["hp", "mp", "attack", "defense", "speed", "magic"];

/// Stats stored as `{ current, max }` gauges rather than plain numbers
const GAUGE_STATS: &[&str] = &["hp", "mp"];

pub const MIN_LEVEL: u64 = 1;
pub const MAX_LEVEL: u64 = 100;

/// Facing values run 0 (north) through 3 (west)
pub const MAX_DIRECTION: u64 = 3;

const CHARACTER_FIELDS: &[&str] = &["id", "name", "class", "level"];
const ITEM_FIELDS: &[&str] = &["id", "name", "type"];
const PROGRESS_LISTS: &[&str] = &["completed_quests", "unlocked_areas", "defeated_bosses"];
const PROGRESS_TIMESTAMPS: &[&str] = &["game_started_at", "last_saved_at"];

/// Which part of a save an issue was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Record,
    Metadata,
    Party,
    Inventory,
    World,
    Progress,
    Settings,
    CrossReference,
    Compatibility,
}

impl Section {
    /// Sections that must be present for a save to be usable at all
    pub const REQUIRED: [Section; 5] = [
        Section::Metadata,
        Section::Party,
        Section::Inventory,
        Section::World,
        Section::Progress,
    ];

    /// Top-level key of the section, for the ones stored as one
    pub fn key(&self) -> &'static str {
        match self {
            Section::Record => "record",
            Section::Metadata => "metadata",
            Section::Party => "party",
            Section::Inventory => "inventory",
            Section::World => "world",
            Section::Progress => "progress",
            Section::Settings => "settings",
            Section::CrossReference => "cross-reference",
            Section::Compatibility => "compatibility",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single error or warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub section: Section,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.section, self.message)
    }
}

/// Facts gathered while validating, for display and logging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationDetails {
    pub version: Option<String>,
    pub character_count: usize,
    pub occupied_slots: usize,
    pub sections_checked: Vec<Section>,
}

/// Outcome of full validation
///
/// Errors make the data invalid; warnings never do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub details: ValidationDetails,
}

impl ValidationReport {
    /// Errors in one section
    pub fn errors_in(&self, section: Section) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().filter(move |issue| issue.section == section)
    }

    /// Warnings in one section
    pub fn warnings_in(&self, section: Section) -> impl Iterator<Item = &ValidationIssue> {
        self.warnings.iter().filter(move |issue| issue.section == section)
    }

    /// One-line description of the errors
    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            return "no errors".to_string();
        }
        self.errors
            .iter()
            .map(ValidationIssue::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Collects issues while walking the data
#[derive(Default)]
struct Findings {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Findings {
    fn error(&mut self, section: Section, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            section,
            message: message.into(),
        });
    }

    fn warn(&mut self, section: Section, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            section,
            message: message.into(),
        });
    }
}

fn non_negative(value: Option<&Value>) -> bool {
    value.and_then(Value::as_f64).is_some_and(|n| n >= 0.0)
}

fn positive(value: Option<&Value>) -> bool {
    value.and_then(Value::as_f64).is_some_and(|n| n > 0.0)
}

fn missing_fields<'a>(object: &Map<String, Value>, fields: &[&'a str]) -> Vec<&'a str> {
    fields
        .iter()
        .copied()
        .filter(|field| object.get(*field).is_none_or(Value::is_null))
        .collect()
}

/// Validates decoded save data
#[derive(Debug, Clone)]
pub struct SaveValidator {
    required_version: String,
    inventory_size: usize,
    max_party_size: usize,
}

impl SaveValidator {
    /// Creates a validator that expects saves of `required_version`
    pub fn new(required_version: impl Into<String>) -> Self {
        SaveValidator {
            required_version: required_version.into(),
            inventory_size: INVENTORY_SIZE,
            max_party_size: MAX_PARTY_SIZE,
        }
    }

    pub fn required_version(&self) -> &str {
        &self.required_version
    }

    /// Cheap structural check
    ///
    /// Confirms the required sections exist, metadata carries a version and
    /// a timestamp, the party has 1..=4 character objects with their
    /// identifying fields, the inventory has exactly the required number of
    /// slots and the player position is numeric. Class, level and equipment
    /// are left to the full check.
    pub fn quick_validate(&self, data: &Value) -> bool {
        let Some(root) = data.as_object() else {
            return false;
        };

        let sections_present = Section::REQUIRED
            .iter()
            .all(|section| root.get(section.key()).is_some_and(Value::is_object));
        if !sections_present {
            return false;
        }

        let metadata_ok = data.pointer("/metadata/version").is_some_and(Value::is_string)
            && positive(data.pointer("/metadata/timestamp"));

        let party_ok = data
            .pointer("/party/characters")
            .and_then(Value::as_array)
            .is_some_and(|characters| {
                let present: Vec<&Value> = characters.iter().filter(|c| !c.is_null()).collect();
                !present.is_empty()
                    && present.len() <= self.max_party_size
                    && present.iter().all(|c| {
                        c.as_object()
                            .is_some_and(|c| missing_fields(c, CHARACTER_FIELDS).is_empty())
                    })
            });

        let inventory_ok = data
            .pointer("/inventory/slots")
            .and_then(Value::as_array)
            .is_some_and(|slots| slots.len() == self.inventory_size);

        let position_ok = data
            .pointer("/world/position")
            .and_then(Value::as_object)
            .is_some_and(|p| ["x", "z"].iter().all(|axis| p.get(*axis).is_some_and(Value::is_number)));

        metadata_ok && party_ok && inventory_ok && position_ok
    }

    /// Full validation of raw decoded data
    pub fn validate(&self, data: &Value) -> ValidationReport {
        let mut findings = Findings::default();
        let mut details = ValidationDetails::default();

        let Some(root) = data.as_object() else {
            findings.error(Section::Record, "save data is not an object");
            return Self::finish(findings, details);
        };

        for key in root.keys() {
            let known = Section::REQUIRED
                .iter()
                .chain(std::iter::once(&Section::Settings))
                .any(|section| section.key() == key);
            if !known {
                findings.warn(Section::Record, format!("unknown section '{}' will be ignored", key));
            }
        }

        for section in Section::REQUIRED {
            match root.get(section.key()) {
                Some(Value::Object(object)) => {
                    details.sections_checked.push(section);
                    match section {
                        Section::Metadata => self.check_metadata(object, &mut findings),
                        Section::Party => self.check_party(object, &mut findings, &mut details),
                        Section::Inventory => {
                            self.check_inventory(object, &mut findings, &mut details)
                        }
                        Section::World => self.check_world(object, &mut findings),
                        Section::Progress => self.check_progress(object, &mut findings),
                        _ => {}
                    }
                }
                Some(_) => findings.error(section, format!("{} section is not an object", section)),
                None => findings.error(section, format!("{} section is missing", section)),
            }
        }

        if let Some(settings) = root.get(Section::Settings.key()) {
            if !settings.is_object() {
                findings.warn(Section::Settings, "settings section is not an object");
            }
        }

        self.check_cross_references(data, &mut findings);
        details.sections_checked.push(Section::CrossReference);

        if let Some(Value::Object(metadata)) = root.get(Section::Metadata.key()) {
            details.version = metadata
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string);
            self.check_compatibility(metadata, &mut findings);
            details.sections_checked.push(Section::Compatibility);
        }

        Self::finish(findings, details)
    }

    /// Full validation of an in-memory record
    pub fn validate_record(&self, record: &SaveRecord) -> ValidationReport {
        match serde_json::to_value(record) {
            Ok(value) => self.validate(&value),
            Err(e) => {
                let mut findings = Findings::default();
                findings.error(Section::Record, format!("record could not be encoded: {}", e));
                Self::finish(findings, ValidationDetails::default())
            }
        }
    }

    fn finish(findings: Findings, details: ValidationDetails) -> ValidationReport {
        ValidationReport {
            is_valid: findings.errors.is_empty(),
            errors: findings.errors,
            warnings: findings.warnings,
            details,
        }
    }

    fn check_metadata(&self, metadata: &Map<String, Value>, findings: &mut Findings) {
        const S: Section = Section::Metadata;

        if let Some(version) = metadata.get("version") {
            if !version.is_string() {
                findings.error(S, "version must be a string");
            }
        }

        match metadata.get("timestamp") {
            None | Some(Value::Null) => findings.error(S, "timestamp is missing"),
            Some(ts) if !ts.is_number() => findings.error(S, "timestamp must be a number"),
            Some(ts) if !positive(Some(ts)) => findings.error(S, "timestamp must be positive"),
            Some(_) => {}
        }

        if !non_negative(metadata.get("playtime")) {
            findings.warn(S, "playtime should be a non-negative number");
        }
        if !non_negative(metadata.get("party_level")) {
            findings.warn(S, "party_level should be a non-negative number");
        }
    }

    fn check_party(
        &self,
        party: &Map<String, Value>,
        findings: &mut Findings,
        details: &mut ValidationDetails,
    ) {
        const S: Section = Section::Party;

        match party.get("characters") {
            Some(Value::Array(characters)) => {
                let present: Vec<(usize, &Value)> = characters
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| !c.is_null())
                    .collect();
                details.character_count = present.len();

                if present.is_empty() {
                    findings.error(S, "party has no characters");
                } else if present.len() > self.max_party_size {
                    findings.error(
                        S,
                        format!(
                            "party has {} characters (at most {} allowed)",
                            present.len(),
                            self.max_party_size
                        ),
                    );
                }

                for (index, character) in present {
                    self.check_character(index, character, findings);
                }
            }
            Some(_) => findings.error(S, "characters must be a list"),
            None => findings.error(S, "characters list is missing"),
        }

        match party.get("formation") {
            None => {}
            Some(Value::Object(formation)) => {
                for row in ["front", "back"] {
                    if formation.get(row).is_some_and(|r| !r.is_array()) {
                        findings.warn(S, format!("formation {} row must be a list", row));
                    }
                }
            }
            Some(_) => findings.warn(S, "formation must be an object"),
        }

        if !non_negative(party.get("gold")) {
            findings.warn(S, "party gold should be a non-negative number");
        }
    }

    fn check_character(&self, index: usize, character: &Value, findings: &mut Findings) {
        const S: Section = Section::Party;

        let Some(character) = character.as_object() else {
            findings.error(S, format!("character {} is not an object", index));
            return;
        };

        for field in missing_fields(character, CHARACTER_FIELDS) {
            findings.error(S, format!("character {} is missing '{}'", index, field));
        }

        if let Some(class) = character.get("class").filter(|c| !c.is_null()) {
            match class.as_str() {
                Some(name) if CHARACTER_CLASSES.contains(&name) => {}
                Some(name) => findings.error(S, format!("character {} has unknown class '{}'", index, name)),
                None => findings.error(S, format!("character {} class must be a string", index)),
            }
        }

        if let Some(level) = character.get("level").filter(|l| !l.is_null()) {
            let in_range = level
                .as_u64()
                .is_some_and(|l| (MIN_LEVEL..=MAX_LEVEL).contains(&l));
            if !in_range {
                findings.error(
                    S,
                    format!(
                        "character {} level must be a whole number between {} and {}",
                        index, MIN_LEVEL, MAX_LEVEL
                    ),
                );
            }
        }

        match character.get("stats") {
            None | Some(Value::Null) => {}
            Some(Value::Object(stats)) => self.check_stats(index, stats, findings),
            Some(_) => findings.warn(S, format!("character {} stats must be an object", index)),
        }

        match character.get("equipment") {
            None | Some(Value::Null) => {}
            Some(Value::Object(equipment)) => {
                for (slot, item) in equipment {
                    if !(item.is_null() || item.is_object()) {
                        findings.error(
                            S,
                            format!("character {} equipment slot '{}' must be an object", index, slot),
                        );
                    }
                }
            }
            Some(_) => findings.error(S, format!("character {} equipment must be an object", index)),
        }
    }

    fn check_stats(&self, index: usize, stats: &Map<String, Value>, findings: &mut Findings) {
        const S: Section = Section::Party;

        for key in REQUIRED_STATS {
            let Some(stat) = stats.get(*key) else {
                findings.warn(S, format!("character {} is missing stat '{}'", index, key));
                continue;
            };
            let valid = if GAUGE_STATS.contains(key) {
                stat.is_object() || stat.is_number()
            } else {
                stat.is_number()
            };
            if !valid {
                findings.warn(S, format!("character {} stat '{}' is invalid", index, key));
            }
        }

        if let Some(Value::Object(hp)) = stats.get("hp") {
            let current = hp.get("current").and_then(Value::as_f64);
            let max = hp.get("max").and_then(Value::as_f64);
            match (current, max) {
                (Some(current), Some(max)) => {
                    if current < 0.0 || max < 0.0 {
                        findings.warn(S, format!("character {} has negative HP values", index));
                    } else if current > max {
                        findings.warn(
                            S,
                            format!("character {} HP {} exceeds maximum {}", index, current, max),
                        );
                    }
                }
                _ => findings.warn(S, format!("character {} HP needs numeric current and max", index)),
            }
        }
    }

    fn check_inventory(
        &self,
        inventory: &Map<String, Value>,
        findings: &mut Findings,
        details: &mut ValidationDetails,
    ) {
        const S: Section = Section::Inventory;

        match inventory.get("slots") {
            Some(Value::Array(slots)) => {
                if slots.len() != self.inventory_size {
                    findings.error(
                        S,
                        format!(
                            "inventory must have exactly {} slots (found {})",
                            self.inventory_size,
                            slots.len()
                        ),
                    );
                }

                for (index, slot) in slots.iter().enumerate().filter(|(_, s)| !s.is_null()) {
                    details.occupied_slots += 1;
                    Self::check_inventory_slot(index, slot, findings);
                }
            }
            Some(_) => findings.error(S, "inventory slots must be a list"),
            None => findings.error(S, "inventory slots are missing"),
        }

        if !non_negative(inventory.get("gold")) {
            findings.warn(S, "inventory gold should be a non-negative number");
        }
    }

    fn check_inventory_slot(index: usize, slot: &Value, findings: &mut Findings) {
        const S: Section = Section::Inventory;

        let Some(slot) = slot.as_object() else {
            findings.warn(S, format!("slot {} is not an object", index));
            return;
        };

        if !positive(slot.get("quantity")) {
            findings.warn(S, format!("slot {} quantity should be greater than 0", index));
        }

        match slot.get("item") {
            Some(Value::Object(item)) => {
                for field in missing_fields(item, ITEM_FIELDS) {
                    findings.warn(S, format!("slot {} item is missing '{}'", index, field));
                }
            }
            _ => findings.warn(S, format!("slot {} has no item", index)),
        }
    }

    fn check_world(&self, world: &Map<String, Value>, findings: &mut Findings) {
        const S: Section = Section::World;

        match world.get("position") {
            Some(Value::Object(position)) => {
                for axis in ["x", "z"] {
                    if !position.get(axis).is_some_and(Value::is_number) {
                        findings.error(S, format!("player position {} must be a number", axis));
                    }
                }
            }
            Some(_) => findings.error(S, "player position must be an object"),
            None => findings.error(S, "player position is missing"),
        }

        let direction_ok = world
            .get("direction")
            .and_then(Value::as_u64)
            .is_some_and(|d| d <= MAX_DIRECTION);
        if !direction_ok {
            findings.warn(S, format!("direction should be between 0 and {}", MAX_DIRECTION));
        }

        if !non_negative(world.get("floor")) {
            findings.warn(S, "floor should be a non-negative number");
        }
    }

    fn check_progress(&self, progress: &Map<String, Value>, findings: &mut Findings) {
        const S: Section = Section::Progress;

        for key in PROGRESS_LISTS {
            if progress.get(*key).is_some_and(|v| !v.is_array()) {
                findings.warn(S, format!("{} should be a list", key));
            }
        }

        for key in PROGRESS_TIMESTAMPS {
            if !positive(progress.get(*key)) {
                findings.warn(S, format!("{} should be a positive timestamp", key));
            }
        }
    }

    fn check_cross_references(&self, data: &Value, findings: &mut Findings) {
        const S: Section = Section::CrossReference;

        let party_gold = data.pointer("/party/gold").and_then(Value::as_f64);
        let inventory_gold = data.pointer("/inventory/gold").and_then(Value::as_f64);
        if let (Some(party_gold), Some(inventory_gold)) = (party_gold, inventory_gold) {
            if party_gold != inventory_gold {
                findings.warn(
                    S,
                    format!(
                        "party gold {} does not match inventory gold {}",
                        party_gold, inventory_gold
                    ),
                );
            }
        }

        let Some(formation) = data.pointer("/party/formation").and_then(Value::as_object) else {
            return;
        };
        let ids: HashSet<&str> = data
            .pointer("/party/characters")
            .and_then(Value::as_array)
            .map(|characters| {
                characters
                    .iter()
                    .filter_map(|c| c.get("id").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        for row in ["front", "back"] {
            let Some(members) = formation.get(row).and_then(Value::as_array) else {
                continue;
            };
            for member in members {
                let id = member.as_str().map_or_else(|| member.to_string(), str::to_string);
                if !ids.contains(id.as_str()) {
                    findings.warn(
                        S,
                        format!("formation {} row references unknown character '{}'", row, id),
                    );
                }
            }
        }
    }

    fn check_compatibility(&self, metadata: &Map<String, Value>, findings: &mut Findings) {
        const S: Section = Section::Compatibility;

        match metadata.get("version") {
            None | Some(Value::Null) => findings.error(S, "save version is missing"),
            Some(Value::String(version)) if *version != self.required_version => findings.warn(
                S,
                format!(
                    "save version {} differs from required version {}",
                    version, self.required_version
                ),
            ),
            _ => {}
        }
    }
}

impl Default for SaveValidator {
    fn default() -> Self {
        Self::new(CURRENT_SAVE_VERSION)
    }
}
