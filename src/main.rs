use std::path::PathBuf;
use std::rc::Rc;

use serde_json::json;

use crawler_save::{
    AutoSaveScheduler, AutoSaveTrigger, CharacterSnapshot, Clock, FileBackend, Formation,
    GameStateProvider, InventorySlot, InventorySnapshot, ItemSnapshot, PartySnapshot, Position,
    ProgressSnapshot, SaveConfig, SaveError, SaveEvent, SaveManager, SaveOptions, SaveRecord,
    SlotId, SlotStatus, SystemClock, WorldSnapshot,
};

const USAGE: &str = "\
Usage: crawler_save [--dir DIR] [--config FILE] <command>

Commands:
  list               Show every save slot
  save N             Save the demo party into manual slot N
  load SLOT          Load a slot (N or 'auto')
  delete SLOT        Delete a slot
  recover SLOT       Repair a slot from its backups or the auto-save
  autosave TRIGGER   Run one auto-save (timer, victory, zone_transition, level_up, shutdown)";

/// Stand-in for the running game, so the save system can be driven from a terminal
struct DemoGame {
    party: PartySnapshot,
    inventory: InventorySnapshot,
    world: WorldSnapshot,
    progress: ProgressSnapshot,
    started_at: u64,
}

impl DemoGame {
    fn new(now: u64) -> Self {
        let hero = |id: &str, name: &str, class: &str, level: u32| {
            let mut character = CharacterSnapshot::new(id, name, class, level);
            character.stats = json!({
                "hp": { "current": 30 + level * 5, "max": 30 + level * 5 },
                "mp": { "current": 10, "max": 10 },
                "attack": 8 + level,
                "defense": 5 + level,
                "speed": 6,
                "magic": 3
            })
            .as_object()
            .cloned();
            character
        };

        let gold = 120;
        let mut inventory = InventorySnapshot::empty(gold);
        inventory.slots[0] = Some(InventorySlot {
            item: ItemSnapshot::new("potion", "Healing Potion", "consumable"),
            quantity: 5,
        });

        DemoGame {
            party: PartySnapshot {
                characters: vec![
                    Some(hero("hero_1", "Aria", "warrior", 6)),
                    Some(hero("hero_2", "Bram", "cleric", 5)),
                    Some(hero("hero_3", "Cato", "rogue", 5)),
                    None,
                ],
                formation: Formation {
                    front: vec!["hero_1".to_string(), "hero_3".to_string()],
                    back: vec!["hero_2".to_string()],
                },
                gold,
            },
            inventory,
            world: WorldSnapshot {
                zone: "old_mine".to_string(),
                floor: 1,
                position: Position { x: 3.0, z: 7.5 },
                direction: 2,
                ..WorldSnapshot::default()
            },
            progress: ProgressSnapshot {
                game_started_at: now,
                ..ProgressSnapshot::default()
            },
            started_at: now,
        }
    }
}

impl GameStateProvider for DemoGame {
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

    fn location_label(&self) -> String {
        format!("Old Mine - Floor {}", self.world.floor)
    }

    fn playtime_ms(&self) -> u64 {
        self.progress.last_saved_at.saturating_sub(self.started_at)
    }

    fn restore(&mut self, record: &SaveRecord) -> Result<(), SaveError> {
        self.party = record.party.clone();
        self.inventory = record.inventory.clone();
        self.world = record.world.clone();
        self.progress = record.progress.clone();
        Ok(())
    }
}

struct Args {
    dir: Option<PathBuf>,
    config: Option<PathBuf>,
    command: Vec<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        dir: None,
        config: None,
        command: Vec::new(),
    };

    let mut raw = std::env::args().skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--dir" => args.dir = Some(raw.next().ok_or("--dir needs a value")?.into()),
            "--config" => args.config = Some(raw.next().ok_or("--config needs a value")?.into()),
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => args.command.push(arg),
        }
    }

    Ok(args)
}

fn parse_slot(text: Option<&String>) -> Result<SlotId, String> {
    let text = text.ok_or("missing slot")?;
    Ok(text.parse::<SlotId>()?)
}

fn main() -> Result<(), String> {
    env_logger::init();

    let args = parse_args()?;
    let config = args.config.map(SaveConfig::load).unwrap_or_default();

    let save_dir = args
        .dir
        .or_else(FileBackend::default_location)
        .unwrap_or_else(|| PathBuf::from("./saves"));
    let backend = FileBackend::new(&save_dir)
        .map_err(|e| format!("Failed to open save directory: {}", e))?;
    log::info!("Using save directory {}", save_dir.display());

    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let mut manager = SaveManager::new(backend, clock.clone(), config.clone());
    manager.events_mut().subscribe(|event| match event {
        SaveEvent::GameSaved { slot, size, .. } => println!("✓ Saved slot {} ({} bytes)", slot, size),
        SaveEvent::GameLoaded { slot, recovered: Some(source), .. } => {
            println!("! Slot {} was damaged, loaded from {}", slot, source)
        }
        SaveEvent::SaveRecovered { slot, source } => println!("✓ Recovered slot {} from {}", slot, source),
        SaveEvent::AutoSaveFailed { error, .. } | SaveEvent::AutoSaveError { error, .. } => {
            eprintln!("Auto-save failed: {}", error)
        }
        _ => {}
    });

    let mut game = DemoGame::new(clock.now_ms());

    let command: Vec<&String> = args.command.iter().collect();
    match command.first().map(|c| c.as_str()) {
        Some("list") => {
            for listing in manager.get_all_save_metadata() {
                match listing.status {
                    SlotStatus::Empty => println!("[{}] empty", listing.slot),
                    SlotStatus::Present(summary) => {
                        let saved = chrono::DateTime::from_timestamp_millis(summary.timestamp as i64)
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "?".to_string());
                        println!(
                            "[{}] {} | party lv {} x{} | {} gold | {}",
                            listing.slot,
                            summary.location,
                            summary.party_level,
                            summary.party_size,
                            summary.gold,
                            saved
                        );
                    }
                    SlotStatus::Corrupted { error } => println!("[{}] corrupted: {}", listing.slot, error),
                }
            }
        }
        Some("save") => {
            let slot = parse_slot(command.get(1).copied())?;
            if slot.is_auto() {
                return Err("use 'autosave TRIGGER' to write the auto slot".to_string());
            }
            manager.save_game(slot, &game, &SaveOptions::default())?;
        }
        Some("load") => {
            let slot = parse_slot(command.get(1).copied())?;
            let outcome = manager.load_into(slot, &mut game)?;
            println!("Loading game...");
            println!("  - Location: {}", outcome.record.metadata.location);
            println!("  - Party: {} members, level {}", outcome.record.party.size(), outcome.record.metadata.party_level);
            println!("  - Gold: {}", outcome.record.party.gold);
            for warning in &outcome.warnings {
                println!("  - Warning: {}", warning);
            }
        }
        Some("delete") => {
            let slot = parse_slot(command.get(1).copied())?;
            manager.delete_save(slot)?;
            println!("✓ Deleted slot {}", slot);
        }
        Some("recover") => {
            let slot = parse_slot(command.get(1).copied())?;
            manager.recover_save(slot)?;
        }
        Some("autosave") => {
            let trigger: AutoSaveTrigger = command.get(1).ok_or("missing trigger")?.parse()?;
            let mut scheduler = AutoSaveScheduler::new(&config, clock);
            let saved = match trigger {
                AutoSaveTrigger::Shutdown => scheduler.on_shutdown(&mut manager, &game),
                other => scheduler.perform_auto_save(&mut manager, &game, other),
            };
            if saved {
                println!("✓ Auto-save ({}) written", trigger);
            } else {
                println!("Auto-save ({}) skipped", trigger);
            }
        }
        _ => return Err(USAGE.to_string()),
    }

    Ok(())
}
