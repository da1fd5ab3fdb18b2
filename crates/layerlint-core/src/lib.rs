pub mod analyzer;
pub mod config;
pub mod duplicate;
pub mod graph;
pub mod layer;
pub mod pipeline;
pub mod rule_spec;
pub mod structural;
pub mod summary;
pub mod textual;
pub mod types;

pub use analyzer::{count_lines, ExtractError, ModuleExtractor};
pub use config::Config;
pub use graph::{DependencyGraph, ImportResolution};
pub use layer::LayerClassifier;
pub use pipeline::{AnalysisPipeline, FullAnalysis};
pub use rule_spec::{RuleSpec, RuleSpecError};
pub use summary::{AnalysisResult, LayerStats, SeverityCounts};
pub use types::*;
