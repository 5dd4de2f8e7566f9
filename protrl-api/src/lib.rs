// builders + design loop + training callbacks and metric sinks
pub mod builders;
pub mod callbacks;
pub mod design;
pub mod evaluation;
pub mod sinks;

pub use callbacks::{EpisodeMetricsCallback, ProgressCallback};
pub use design::{DesignStep, Designer};
pub use evaluation::{ComparisonConfig, ComparisonReport, SourceReport, compare_sources};
pub use sinks::{JsonLinesSink, MemorySink, TracingSink};
