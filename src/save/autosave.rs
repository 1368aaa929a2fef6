//! Auto-save scheduling
//!
//! `AutoSaveScheduler` decides *when* the auto slot is written. Each attempt
//! goes through the same checks before anything touches storage:
//!
//! 1. the scheduler is enabled
//! 2. the trigger's throttle has passed (full interval for the timer, the
//!    shared cooldown for game events, nothing for shutdown)
//! 3. the game is in a saveable state (party able to act, no combat, no
//!    blocking transition)
//!
//! A skipped attempt is normal and only logged at debug level. The write
//! itself goes through `SaveManager::save_game(SlotId::Auto, ..)`, which
//! rotates the backups.
//!
//! The scheduler is polled from the game loop. Nothing here spawns threads;
//! `update` is expected to be called once per frame.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::clock::Clock;
use super::config::SaveConfig;
use super::error::SaveError;
use super::events::SaveEvent;
use super::manager::{SaveManager, SaveOptions, SlotId};
use super::saveable::GameStateProvider;
use super::storage::StorageBackend;

/// Why an auto-save was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AutoSaveTrigger {
    Timer,
    Victory,
    ZoneTransition,
    LevelUp,
    Shutdown,
}

impl AutoSaveTrigger {
    /// Game events share the event cooldown; the timer has its own interval
    pub fn is_event(&self) -> bool {
        !matches!(self, AutoSaveTrigger::Timer)
    }
}

impl fmt::Display for AutoSaveTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutoSaveTrigger::Timer => "timer",
            AutoSaveTrigger::Victory => "victory",
            AutoSaveTrigger::ZoneTransition => "zone_transition",
            AutoSaveTrigger::LevelUp => "level_up",
            AutoSaveTrigger::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for AutoSaveTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timer" => Ok(AutoSaveTrigger::Timer),
            "victory" => Ok(AutoSaveTrigger::Victory),
            "zone_transition" | "zone" => Ok(AutoSaveTrigger::ZoneTransition),
            "level_up" | "levelup" => Ok(AutoSaveTrigger::LevelUp),
            "shutdown" => Ok(AutoSaveTrigger::Shutdown),
            other => Err(format!("unknown auto-save trigger '{}'", other)),
        }
    }
}

/// Why an auto-save attempt was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    /// Timer attempt before a full interval since the last auto-save
    IntervalNotElapsed { remaining_ms: u64 },
    /// Event attempt inside the shared event cooldown
    CooldownActive { remaining_ms: u64 },
    EmptyParty,
    PartyIncapacitated,
    CombatActive,
    TransitionActive,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => f.write_str("auto-save is disabled"),
            SkipReason::IntervalNotElapsed { remaining_ms } => {
                write!(f, "interval not elapsed ({}ms left)", remaining_ms)
            }
            SkipReason::CooldownActive { remaining_ms } => {
                write!(f, "event cooldown active ({}ms left)", remaining_ms)
            }
            SkipReason::EmptyParty => f.write_str("party is empty"),
            SkipReason::PartyIncapacitated => f.write_str("party is incapacitated"),
            SkipReason::CombatActive => f.write_str("combat is active"),
            SkipReason::TransitionActive => f.write_str("a transition is in progress"),
        }
    }
}

/// Refuses auto-saves while the game is in a state that shouldn't be captured
pub fn check_state_gate(state: &dyn GameStateProvider) -> Result<(), SkipReason> {
    let party = state.party_snapshot();
    if party.is_empty() {
        return Err(SkipReason::EmptyParty);
    }
    if party.is_incapacitated() {
        return Err(SkipReason::PartyIncapacitated);
    }
    if state.is_combat_active() {
        return Err(SkipReason::CombatActive);
    }
    if state.is_transition_active() {
        return Err(SkipReason::TransitionActive);
    }
    Ok(())
}

/// Repeating deadline that can be paused and resumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTask {
    interval_ms: u64,
    next_due: Option<u64>,
    /// Time left when paused
    paused_remaining: Option<u64>,
}

impl IntervalTask {
    pub fn new(interval_ms: u64) -> Self {
        IntervalTask {
            interval_ms,
            next_due: None,
            paused_remaining: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// (Re)starts the countdown from `now`
    pub fn start(&mut self, now: u64) {
        self.next_due = Some(now.saturating_add(self.interval_ms));
        self.paused_remaining = None;
    }

    /// Pauses, remembering how much of the interval was left
    pub fn stop(&mut self, now: u64) {
        if let Some(due) = self.next_due.take() {
            self.paused_remaining = Some(due.saturating_sub(now));
        }
    }

    /// Continues a paused countdown; does nothing unless paused
    pub fn resume(&mut self, now: u64) {
        if let Some(remaining) = self.paused_remaining.take() {
            self.next_due = Some(now.saturating_add(remaining));
        }
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
        self.paused_remaining = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_remaining.is_some()
    }

    /// True once per elapsed interval; the next deadline starts from `now`
    pub fn poll(&mut self, now: u64) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now.saturating_add(self.interval_ms));
                true
            }
            _ => false,
        }
    }
}

pub struct AutoSaveScheduler {
    clock: Rc<dyn Clock>,
    interval_ms: u64,
    cooldown_ms: u64,
    enabled: bool,
    capture_preview: bool,
    timer: IntervalTask,
    last_save_at: Option<u64>,
    last_event_at: Option<u64>,
    pending: BTreeSet<AutoSaveTrigger>,
}

impl AutoSaveScheduler {
    pub fn new(config: &SaveConfig, clock: Rc<dyn Clock>) -> Self {
        let interval_ms = whole_millis(config.auto_save_interval());
        AutoSaveScheduler {
            clock,
            interval_ms,
            cooldown_ms: whole_millis(config.event_cooldown()),
            enabled: config.auto_save_enabled,
            capture_preview: config.capture_preview_on_auto_save,
            timer: IntervalTask::new(interval_ms),
            last_save_at: None,
            last_event_at: None,
            pending: BTreeSet::new(),
        }
    }

    /// Starts the periodic timer
    pub fn start(&mut self) {
        self.timer.start(self.clock.now_ms());
        log::debug!("Auto-save timer started ({}ms)", self.interval_ms);
    }

    /// Pauses the periodic timer (e.g. while a menu is open)
    pub fn stop(&mut self) {
        self.timer.stop(self.clock.now_ms());
    }

    pub fn resume(&mut self) {
        self.timer.resume(self.clock.now_ms());
    }

    /// Stops the timer and forgets any pending triggers
    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.pending.clear();
    }

    pub fn timer(&self) -> &IntervalTask {
        &self.timer
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::info!("Auto-save {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Time of the last successful auto-save
    pub fn last_save_at(&self) -> Option<u64> {
        self.last_save_at
    }

    pub fn pending(&self) -> impl Iterator<Item = &AutoSaveTrigger> {
        self.pending.iter()
    }

    /// Queues a trigger for the next `update`
    pub fn notify(&mut self, trigger: AutoSaveTrigger) {
        self.pending.insert(trigger);
    }

    /// Polls the timer and handles queued triggers
    ///
    /// Everything pending collapses into a single attempt, so one update
    /// writes at most once. Event triggers are tried before the timer, and
    /// a trigger still inside its throttle window gives way to the next one.
    /// Returns true if an auto-save was written.
    pub fn update<B: StorageBackend>(
        &mut self,
        manager: &mut SaveManager<B>,
        state: &dyn GameStateProvider,
    ) -> bool {
        let now = self.clock.now_ms();
        if self.timer.poll(now) {
            self.pending.insert(AutoSaveTrigger::Timer);
        }

        let pending = std::mem::take(&mut self.pending);
        let (mut candidates, timer): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(AutoSaveTrigger::is_event);
        candidates.extend(timer);

        let trigger = candidates
            .iter()
            .copied()
            .find(|trigger| self.check_throttle(*trigger, now).is_ok())
            .or_else(|| candidates.first().copied());

        match trigger {
            Some(trigger) => self.perform_auto_save(manager, state, trigger),
            None => false,
        }
    }

    /// Runs one auto-save attempt for a trigger
    ///
    /// Returns true if the auto slot was written. Skips and failures both
    /// return false; failures are also reported as events.
    pub fn perform_auto_save<B: StorageBackend>(
        &mut self,
        manager: &mut SaveManager<B>,
        state: &dyn GameStateProvider,
        trigger: AutoSaveTrigger,
    ) -> bool {
        let now = self.clock.now_ms();

        if let Err(reason) = self.check_throttle(trigger, now).and_then(|()| check_state_gate(state)) {
            log::debug!("Auto-save ({}) skipped: {}", trigger, reason);
            return false;
        }

        let options = SaveOptions {
            capture_preview: self.capture_preview,
        };

        match manager.save_game(SlotId::Auto, state, &options) {
            Ok(receipt) => {
                self.last_save_at = Some(now);
                if trigger.is_event() {
                    self.last_event_at = Some(now);
                }
                if self.timer.is_running() {
                    self.timer.start(now);
                }
                self.pending.clear();

                log::info!("Auto-save ({}) completed", trigger);
                manager.emit(SaveEvent::AutoSaveCompleted {
                    trigger,
                    duration: receipt.duration,
                    size: receipt.size,
                });
                true
            }
            Err(error @ SaveError::ValidationError(_)) => {
                log::warn!("Auto-save ({}) refused: {}", trigger, error);
                manager.emit(SaveEvent::AutoSaveFailed {
                    trigger,
                    error: error.to_string(),
                });
                false
            }
            Err(error) => {
                log::error!("Auto-save ({}) failed: {}", trigger, error);
                manager.emit(SaveEvent::AutoSaveError {
                    trigger,
                    error: error.to_string(),
                });
                false
            }
        }
    }

    /// Best-effort save on the way out; skips the event cooldown but not
    /// the state gate
    pub fn on_shutdown<B: StorageBackend>(
        &mut self,
        manager: &mut SaveManager<B>,
        state: &dyn GameStateProvider,
    ) -> bool {
        self.timer.cancel();
        let saved = self.perform_auto_save(manager, state, AutoSaveTrigger::Shutdown);
        self.pending.clear();
        saved
    }

    fn check_throttle(&self, trigger: AutoSaveTrigger, now: u64) -> Result<(), SkipReason> {
        if !self.enabled {
            return Err(SkipReason::Disabled);
        }

        match trigger {
            AutoSaveTrigger::Shutdown => Ok(()),
            AutoSaveTrigger::Timer => match remaining(self.last_save_at, self.interval_ms, now) {
                0 => Ok(()),
                remaining_ms => Err(SkipReason::IntervalNotElapsed { remaining_ms }),
            },
            _ => match remaining(self.last_event_at, self.cooldown_ms, now) {
                0 => Ok(()),
                remaining_ms => Err(SkipReason::CooldownActive { remaining_ms }),
            },
        }
    }
}

/// Milliseconds left of `window` since `since`; 0 when it has passed
fn remaining(since: Option<u64>, window: u64, now: u64) -> u64 {
    since.map_or(0, |since| since.saturating_add(window).saturating_sub(now))
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl fmt::Debug for AutoSaveScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSaveScheduler")
            .field("interval_ms", &self.interval_ms)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("enabled", &self.enabled)
            .field("timer", &self.timer)
            .field("last_save_at", &self.last_save_at)
            .field("last_event_at", &self.last_event_at)
            .field("pending", &self.pending)
            .finish()
    }
}
