// Observability: stage instrumentation over the metrics facade

pub mod metrics;
