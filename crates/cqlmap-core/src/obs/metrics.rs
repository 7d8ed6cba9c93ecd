use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Process-wide counters since the last reset.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct EventState {
    pub(crate) ops: EventOps,
    pub(crate) types: BTreeMap<String, TypeCounters>,
    pub(crate) since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            types: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Resolver
    pub descriptors_resolved: u64,
    pub resolution_failures: u64,
    pub variants_registered: u64,

    // Codec registry
    pub codecs_synthesized: u64,
    pub codecs_loaded: u64,
    pub codecs_registered: u64,
    pub codecs_deregistered: u64,

    // Statements
    pub statements_compiled: u64,
    pub statement_cache_hits: u64,
    pub primitives_emitted: u64,

    // Schema planning
    pub schema_plans: u64,
    pub keyspaces_planned: u64,
    pub types_planned: u64,
    pub tables_planned: u64,
    pub classes_skipped: u64,
}

///
/// TypeCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TypeCounters {
    pub statements_compiled: u64,
    pub statement_cache_hits: u64,
    pub codecs_registered: u64,
    pub skipped: u64,
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// `None` when the requested window starts after the current one.
    pub counters: Option<EventOps>,
    pub type_counters: BTreeMap<String, TypeCounters>,
    pub since_ms: u64,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    f(&EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Counters for one type, created on first use.
pub(crate) fn type_entry<'a>(state: &'a mut EventState, type_name: &str) -> &'a mut TypeCounters {
    state.types.entry(type_name.to_string()).or_default()
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot of the counters, empty when `window_start_ms` is after the start
/// of the current window.
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    with_state(|m| {
        if window_start_ms.is_some_and(|start| start > m.since_ms) {
            return EventReport {
                since_ms: m.since_ms,
                ..EventReport::default()
            };
        }

        EventReport {
            counters: Some(m.ops.clone()),
            type_counters: m.types.clone(),
            since_ms: m.since_ms,
        }
    })
}
