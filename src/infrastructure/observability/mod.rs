//! Push-based observability: a prometheus registry rendered on demand and
//! JSON session snapshots in the log. Nothing listens for requests.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
