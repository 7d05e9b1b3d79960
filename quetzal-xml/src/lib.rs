pub mod export;
pub mod import;
pub mod schema;

pub use export::{export, ExportError, DATE_FORMAT};
pub use import::{DocumentError, ImportFailure, ImportSummary, RecordError, XmlImporter};
