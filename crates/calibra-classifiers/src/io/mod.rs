pub mod csv_reader;
pub mod metadata;
pub mod report;
pub mod store;

pub use csv_reader::{read_dataset, read_table, CsvReaderConfig, TabularData};
pub use metadata::ModelMetadata;
pub use report::{MetricsReport, TrainingSummary};
pub use store::{ArtifactStore, DirectoryStore, MemoryStore, Persist};
