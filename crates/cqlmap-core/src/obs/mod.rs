//! Observability: in-process counters and the sink boundary every
//! instrumented path reports through.
//!
//! Structured logs go through `tracing`; the crate never installs a
//! subscriber.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, TypeCounters};
pub use sink::{
    MetricsEvent, MetricsSink, StatementKind, metrics_report, metrics_reset_all, with_metrics_sink,
};
