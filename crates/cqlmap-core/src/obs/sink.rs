//! Metrics sink boundary.
//!
//! Resolver, codec, statement and planner code never touch the counters
//! directly. All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, sync::Arc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Arc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// StatementKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[remain::sorted]
pub enum StatementKind {
    Batch,
    CreateIndex,
    CreateKeyspace,
    CreateSchema,
    CreateSchemas,
    CreateTable,
    CreateType,
    Delete,
    Group,
    Insert,
    Select,
    Sequence,
    Truncate,
    Update,
}

impl StatementKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::CreateIndex => "create index",
            Self::CreateKeyspace => "create keyspace",
            Self::CreateSchema => "create schema",
            Self::CreateSchemas => "create schemas",
            Self::CreateTable => "create table",
            Self::CreateType => "create type",
            Self::Delete => "delete",
            Self::Group => "group",
            Self::Insert => "insert",
            Self::Select => "select",
            Self::Sequence => "sequence",
            Self::Truncate => "truncate",
            Self::Update => "update",
        }
    }
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    DescriptorResolved {
        type_name: &'static str,
    },
    ResolutionFailed {
        type_name: &'static str,
    },
    VariantRegistered {
        root: &'static str,
        variant: &'static str,
    },
    CodecSynthesized {
        type_name: &'static str,
    },
    CodecLoaded {
        type_name: &'static str,
    },
    CodecRegistered {
        type_name: &'static str,
    },
    CodecDeregistered {
        type_name: &'static str,
    },
    StatementCompiled {
        kind: StatementKind,
        type_name: Option<&'static str>,
        primitives: u64,
    },
    StatementCacheHit {
        kind: StatementKind,
        type_name: Option<&'static str>,
    },
    SchemaPlanned {
        keyspaces: u64,
        types: u64,
        tables: u64,
    },
    ClassSkipped {
        type_name: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the process-wide counters.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::DescriptorResolved { .. } => {
                m.ops.descriptors_resolved = m.ops.descriptors_resolved.saturating_add(1);
            }
            MetricsEvent::ResolutionFailed { .. } => {
                m.ops.resolution_failures = m.ops.resolution_failures.saturating_add(1);
            }
            MetricsEvent::VariantRegistered { .. } => {
                m.ops.variants_registered = m.ops.variants_registered.saturating_add(1);
            }
            MetricsEvent::CodecSynthesized { .. } => {
                m.ops.codecs_synthesized = m.ops.codecs_synthesized.saturating_add(1);
            }
            MetricsEvent::CodecLoaded { .. } => {
                m.ops.codecs_loaded = m.ops.codecs_loaded.saturating_add(1);
            }
            MetricsEvent::CodecRegistered { type_name } => {
                m.ops.codecs_registered = m.ops.codecs_registered.saturating_add(1);
                let entry = metrics::type_entry(m, type_name);
                entry.codecs_registered = entry.codecs_registered.saturating_add(1);
            }
            MetricsEvent::CodecDeregistered { .. } => {
                m.ops.codecs_deregistered = m.ops.codecs_deregistered.saturating_add(1);
            }
            MetricsEvent::StatementCompiled {
                type_name,
                primitives,
                ..
            } => {
                m.ops.statements_compiled = m.ops.statements_compiled.saturating_add(1);
                m.ops.primitives_emitted = m.ops.primitives_emitted.saturating_add(primitives);
                if let Some(type_name) = type_name {
                    let entry = metrics::type_entry(m, type_name);
                    entry.statements_compiled = entry.statements_compiled.saturating_add(1);
                }
            }
            MetricsEvent::StatementCacheHit { type_name, .. } => {
                m.ops.statement_cache_hits = m.ops.statement_cache_hits.saturating_add(1);
                if let Some(type_name) = type_name {
                    let entry = metrics::type_entry(m, type_name);
                    entry.statement_cache_hits = entry.statement_cache_hits.saturating_add(1);
                }
            }
            MetricsEvent::SchemaPlanned {
                keyspaces,
                types,
                tables,
            } => {
                m.ops.schema_plans = m.ops.schema_plans.saturating_add(1);
                m.ops.keyspaces_planned = m.ops.keyspaces_planned.saturating_add(keyspaces);
                m.ops.types_planned = m.ops.types_planned.saturating_add(types);
                m.ops.tables_planned = m.ops.tables_planned.saturating_add(tables);
            }
            MetricsEvent::ClassSkipped { type_name } => {
                m.ops.classes_skipped = m.ops.classes_skipped.saturating_add(1);
                let entry = metrics::type_entry(m, type_name);
                entry.skipped = entry.skipped.saturating_add(1);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current counters.
///
/// `window_start_ms` filters by the start of the current window, not by
/// per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink for the current thread.
pub fn with_metrics_sink<T>(sink: Arc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Arc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        panic::{AssertUnwindSafe, catch_unwind},
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
    }

    impl MetricsSink for CountingSink {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn hit() -> MetricsEvent {
        MetricsEvent::StatementCacheHit {
            kind: StatementKind::Select,
            type_name: None,
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        let outer = Arc::new(CountingSink::default());
        let inner = Arc::new(CountingSink::default());

        with_metrics_sink(outer.clone(), || {
            record(hit());
            assert_eq!(outer.calls.load(Ordering::SeqCst), 1);

            with_metrics_sink(inner.clone(), || record(hit()));

            // inner override was restored to the outer one
            record(hit());
        });

        assert_eq!(outer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        let sink = Arc::new(CountingSink::default());

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(sink.clone(), || {
                record(hit());
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();

        assert!(panicked);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn global_sink_accumulates_type_counters() {
        GLOBAL_METRICS_SINK.record(MetricsEvent::ClassSkipped {
            type_name: "obs::tests::Skipped",
        });

        let report = metrics_report(None);
        let skipped = report
            .type_counters
            .get("obs::tests::Skipped")
            .expect("type counters should be present");
        assert!(skipped.skipped >= 1);
        assert!(report.counters.is_some_and(|c| c.classes_skipped >= 1));
    }

    #[test]
    fn metrics_report_window_start_after_window_returns_empty() {
        let since = metrics::with_state(|m| m.since_ms);
        let report = metrics_report(Some(since.saturating_add(60_000)));

        assert!(report.counters.is_none());
        assert!(report.type_counters.is_empty());
    }
}
