pub mod catalog;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod table;
pub mod trend;
