//! Collaborator interfaces consumed by the save system
//!
//! The save system never looks inside the game's party, inventory, world or
//! quest systems. It asks them for plain snapshots when saving and hands a
//! loaded record back when restoring.
//!
//! # Example
//!
//! ```ignore
//! impl GameStateProvider for Game {
//!     fn party_snapshot(&self) -> PartySnapshot {
//!         self.party.to_snapshot()
//!     }
//!     // ...
//!     fn restore(&mut self, record: &SaveRecord) -> Result<(), SaveError> {
//!         self.party.apply_snapshot(&record.party)?;
//!         // ...
//!         Ok(())
//!     }
//! }
//! ```

use super::error::SaveError;
use super::types::*;

/// Live game state, as seen by the save system
pub trait GameStateProvider {
    fn party_snapshot(&self) -> PartySnapshot;

    fn inventory_snapshot(&self) -> InventorySnapshot;

    fn world_snapshot(&self) -> WorldSnapshot;

    fn progress_snapshot(&self) -> ProgressSnapshot;

    fn settings_snapshot(&self) -> SaveSettings {
        SaveSettings::default()
    }

    /// Human-readable location for save slot listings
    fn location_label(&self) -> String;

    /// Accumulated playtime in milliseconds
    fn playtime_ms(&self) -> u64;

    /// Auto-saves are held back while a fight is running
    fn is_combat_active(&self) -> bool {
        false
    }

    /// Auto-saves are held back during blocking animations and transitions
    fn is_transition_active(&self) -> bool {
        false
    }

    /// Applies a loaded record to the live game
    fn restore(&mut self, record: &SaveRecord) -> Result<(), SaveError>;
}

/// Renderer hook used to attach a preview image to a save
///
/// Failures are never fatal; the save just goes without a preview.
pub trait PreviewCapture {
    /// Renders the current frame so it can be encoded
    fn render_frame(&mut self) -> Result<(), String>;

    /// Encodes the last rendered frame (a data URL or similar text form)
    fn encode_frame(&mut self) -> Result<String, String>;
}
