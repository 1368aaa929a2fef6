//! Save lifecycle events
//!
//! `SaveManager` owns an `EventListeners` registry and reports every save,
//! load, delete, auto-save and recovery outcome through it. UI code subscribes
//! here instead of polling.

use std::fmt;
use std::time::Duration;

use super::autosave::AutoSaveTrigger;
use super::manager::SlotId;
use super::recovery::RecoverySource;
use super::types::SaveMetadata;

#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    GameSaved {
        slot: SlotId,
        duration: Duration,
        size: usize,
        metadata: SaveMetadata,
    },
    SaveError {
        slot: SlotId,
        error: String,
    },
    GameLoaded {
        slot: SlotId,
        duration: Duration,
        metadata: SaveMetadata,
        /// Set when the data came from a fallback instead of the slot itself
        recovered: Option<RecoverySource>,
    },
    LoadError {
        slot: SlotId,
        error: String,
    },
    SaveDeleted {
        slot: SlotId,
    },
    AutoSaveCompleted {
        trigger: AutoSaveTrigger,
        duration: Duration,
        size: usize,
    },
    /// The auto-save record was refused by validation
    AutoSaveFailed {
        trigger: AutoSaveTrigger,
        error: String,
    },
    /// Storage or encoding broke during an auto-save
    AutoSaveError {
        trigger: AutoSaveTrigger,
        error: String,
    },
    SaveRecovered {
        slot: SlotId,
        source: RecoverySource,
    },
}

/// Event discriminant, for filtered subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveEventKind {
    GameSaved,
    SaveError,
    GameLoaded,
    LoadError,
    SaveDeleted,
    AutoSaveCompleted,
    AutoSaveFailed,
    AutoSaveError,
    SaveRecovered,
}

impl SaveEvent {
    pub fn kind(&self) -> SaveEventKind {
        match self {
            SaveEvent::GameSaved { .. } => SaveEventKind::GameSaved,
            SaveEvent::SaveError { .. } => SaveEventKind::SaveError,
            SaveEvent::GameLoaded { .. } => SaveEventKind::GameLoaded,
            SaveEvent::LoadError { .. } => SaveEventKind::LoadError,
            SaveEvent::SaveDeleted { .. } => SaveEventKind::SaveDeleted,
            SaveEvent::AutoSaveCompleted { .. } => SaveEventKind::AutoSaveCompleted,
            SaveEvent::AutoSaveFailed { .. } => SaveEventKind::AutoSaveFailed,
            SaveEvent::AutoSaveError { .. } => SaveEventKind::AutoSaveError,
            SaveEvent::SaveRecovered { .. } => SaveEventKind::SaveRecovered,
        }
    }

    /// Slot the event is about; auto-save events are always the auto slot
    pub fn slot(&self) -> SlotId {
        match self {
            SaveEvent::GameSaved { slot, .. }
            | SaveEvent::SaveError { slot, .. }
            | SaveEvent::GameLoaded { slot, .. }
            | SaveEvent::LoadError { slot, .. }
            | SaveEvent::SaveDeleted { slot }
            | SaveEvent::SaveRecovered { slot, .. } => *slot,
            SaveEvent::AutoSaveCompleted { .. }
            | SaveEvent::AutoSaveFailed { .. }
            | SaveEvent::AutoSaveError { .. } => SlotId::Auto,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&SaveEvent)>;

struct Listener {
    id: ListenerId,
    filter: Option<SaveEventKind>,
    callback: Callback,
}

/// Typed listener registry
#[derive(Default)]
pub struct EventListeners {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listens to every event
    pub fn subscribe(&mut self, callback: impl FnMut(&SaveEvent) + 'static) -> ListenerId {
        self.add(None, Box::new(callback))
    }

    /// Listens to one kind of event
    pub fn subscribe_to(
        &mut self,
        kind: SaveEventKind,
        callback: impl FnMut(&SaveEvent) + 'static,
    ) -> ListenerId {
        self.add(Some(kind), Box::new(callback))
    }

    /// Returns false if the listener was already gone
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    /// Delivers an event to every matching listener, in subscription order
    pub fn emit(&mut self, event: &SaveEvent) {
        let kind = event.kind();
        for listener in self.listeners.iter_mut() {
            if listener.filter.is_none_or(|filter| filter == kind) {
                (listener.callback)(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn add(&mut self, filter: Option<SaveEventKind>, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            filter,
            callback,
        });
        id
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
