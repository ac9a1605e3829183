pub mod relay;

pub use relay::{
    Channel, FetchConfig, HistoryConfig, MetricsConfig, OcrConfig, OcrEngine, PipelineConfig,
    PublishConfig, RelayConfig, SourceConfig, SourceKind,
};
