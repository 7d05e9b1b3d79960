use quick_xml::se::{QuoteLevel, Serializer};
use serde::Serialize;
use thiserror::Error;

use quetzal_core::models::ExportRow;

use crate::schema::{ExportDoc, ExportRecord};

/// Wire format for reservation date-times, both directions.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

#[derive(Debug, Error)]
#[error("export serialization failed: {0}")]
pub struct ExportError(#[from] quick_xml::SeError);

/// Serializes the rows (expected newest-first, as the store returns them)
/// into a `<flightReservation>` document. Full quoting so `&`, `<`, `>`,
/// `"` and `'` are all entity-escaped.
pub fn export(rows: &[ExportRow]) -> Result<String, ExportError> {
    let doc = ExportDoc {
        records: rows.iter().map(ExportRecord::from_row).collect(),
    };

    let mut body = String::new();
    let mut serializer = Serializer::new(&mut body);
    serializer.set_quote_level(QuoteLevel::Full);
    doc.serialize(serializer)?;

    Ok(format!("{XML_DECL}{body}"))
}
