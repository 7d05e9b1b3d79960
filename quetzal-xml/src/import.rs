use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, TimeZone, Utc};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use quetzal_booking::{ImportRecord, ReservationEngine};
use quetzal_core::BookingError;

use crate::schema::{FlightReservationDoc, RawRecord, ReservationsDoc};
use crate::DATE_FORMAT;

/// Document-level failures, the only ones that abort a batch.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not well-formed XML: {0}")]
    MalformedDocument(String),

    #[error("root element <{0}> matches no recognized schema")]
    UnrecognizedSchema(String),
}

/// Per-record failures, captured into the summary and never raised.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("seat label {0:?} must be one uppercase letter and one or two digits")]
    InvalidSeatFormat(String),

    #[error("id number {0:?} is not 13 digits")]
    InvalidCui(String),

    #[error("reservation date {0:?} does not match DD/MM/YYYY HH:MM")]
    InvalidDate(String),

    #[error("seat {0} is already occupied")]
    SeatAlreadyOccupied(String),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

#[derive(Debug)]
pub struct ImportFailure {
    /// 1-based position of the record in the document.
    pub index: usize,
    pub seat: Option<String>,
    pub reason: RecordError,
}

#[derive(Debug)]
pub struct ImportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<ImportFailure>,
    pub elapsed: Duration,
}

/// Bulk XML import. Records are independent: each one is validated and
/// committed in isolation, and a failure is recorded while processing
/// moves on to the next record. Every imported record lands on the one
/// configured flight.
pub struct XmlImporter {
    engine: ReservationEngine,
    flight_id: Uuid,
}

impl XmlImporter {
    pub fn new(engine: ReservationEngine, flight_id: Uuid) -> Self {
        Self { engine, flight_id }
    }

    pub async fn import(&self, xml: &str) -> Result<ImportSummary, DocumentError> {
        let started = Instant::now();
        let records = parse_document(xml)?;
        let total = records.len();

        let mut succeeded = 0;
        let mut failures = Vec::new();
        for (position, raw) in records.into_iter().enumerate() {
            let index = position + 1;
            let seat = raw.seat_number.clone();
            match self.import_record(raw).await {
                Ok(()) => succeeded += 1,
                Err(reason) => {
                    warn!(record = index, seat = seat.as_deref(), %reason, "import record failed");
                    failures.push(ImportFailure {
                        index,
                        seat,
                        reason,
                    });
                }
            }
        }

        let elapsed = started.elapsed();
        info!(
            total,
            succeeded,
            failed = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "import batch finished"
        );
        Ok(ImportSummary {
            total,
            succeeded,
            failed: failures.len(),
            failures,
            elapsed,
        })
    }

    async fn import_record(&self, raw: RawRecord) -> Result<(), RecordError> {
        let mut missing = Vec::new();
        let seat = required(raw.seat_number, "seatNumber", &mut missing);
        let name = required(raw.passenger_name, "passengerName", &mut missing);
        let email = required(raw.user, "user", &mut missing);
        let cui = required(raw.id_number, "idNumber", &mut missing);
        let luggage = required(raw.has_luggage, "hasLuggage", &mut missing);
        let date_text = required(raw.reservation_date, "reservationDate", &mut missing);
        if !missing.is_empty() {
            return Err(RecordError::MissingFields(missing));
        }

        if !seat_format_ok(&seat) {
            return Err(RecordError::InvalidSeatFormat(seat));
        }
        // Bulk records only get the shape check, not the full checksum.
        if cui.len() != 13 || !cui.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RecordError::InvalidCui(cui));
        }

        let naive = NaiveDateTime::parse_from_str(&date_text, DATE_FORMAT)
            .map_err(|_| RecordError::InvalidDate(date_text))?;
        let reserved_at = Utc.from_utc_datetime(&naive);

        let record = ImportRecord {
            seat_label: seat,
            passenger_name: name,
            email,
            cui,
            has_luggage: luggage.eq_ignore_ascii_case("true"),
            reserved_at,
        };

        match self.engine.import_reservation(self.flight_id, record).await {
            Ok(_) => Ok(()),
            Err(BookingError::SeatUnavailable { seat, .. }) => {
                Err(RecordError::SeatAlreadyOccupied(seat))
            }
            Err(other) => Err(RecordError::Booking(other)),
        }
    }
}

fn required(value: Option<String>, name: &str, missing: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

/// One uppercase letter, then one or two digits with no leading zero.
fn seat_format_ok(label: &str) -> bool {
    let bytes = label.as_bytes();
    match bytes {
        [row, first] => row.is_ascii_uppercase() && (b'1'..=b'9').contains(first),
        [row, first, second] => {
            row.is_ascii_uppercase()
                && (b'1'..=b'9').contains(first)
                && second.is_ascii_digit()
        }
        _ => false,
    }
}

/// Sniffs the root element, then deserializes the matching schema.
fn parse_document(xml: &str) -> Result<Vec<RawRecord>, DocumentError> {
    let root = root_element(xml)?;
    let malformed = |e: quick_xml::DeError| DocumentError::MalformedDocument(e.to_string());

    match root.as_str() {
        "reservations" => from_str::<ReservationsDoc>(xml)
            .map(|doc| doc.records)
            .map_err(malformed),
        "flightReservation" => from_str::<FlightReservationDoc>(xml)
            .map(|doc| doc.records)
            .map_err(malformed),
        _ => Err(DocumentError::UnrecognizedSchema(root)),
    }
}

fn root_element(xml: &str) -> Result<String, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return String::from_utf8(e.name().as_ref().to_vec())
                    .map_err(|e| DocumentError::MalformedDocument(e.to_string()));
            }
            Ok(Event::Eof) => {
                return Err(DocumentError::MalformedDocument("no root element".into()));
            }
            Err(e) => return Err(DocumentError::MalformedDocument(e.to_string())),
            Ok(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use quetzal_catalog::FareRules;
    use quetzal_core::models::{Flight, TripType};
    use quetzal_core::BookingStore;
    use quetzal_store::MemoryBookingStore;

    async fn importer() -> (XmlImporter, Arc<MemoryBookingStore>) {
        let store = Arc::new(MemoryBookingStore::new());
        let flight = Flight {
            id: Uuid::new_v4(),
            origin: "Guatemala City".into(),
            destination: "Madrid".into(),
            trip_type: TripType::OneWay,
            active: true,
            base_price: 500.0,
        };
        store.seed_flight(flight.clone()).await;
        let engine = ReservationEngine::new(store.clone(), FareRules::default());
        (XmlImporter::new(engine, flight.id), store)
    }

    fn record(seat: &str, cui: &str, date: &str) -> String {
        format!(
            "<reservation>\
             <seatNumber>{seat}</seatNumber>\
             <passengerName>Ana Morales</passengerName>\
             <user>ana@gmail.com</user>\
             <idNumber>{cui}</idNumber>\
             <hasLuggage>TRUE</hasLuggage>\
             <reservationDate>{date}</reservationDate>\
             </reservation>"
        )
    }

    #[tokio::test]
    async fn records_fail_independently() {
        let (importer, _) = importer().await;

        // Record 2 carries a 12-digit id number.
        let xml = format!(
            "<reservations>{}{}{}</reservations>",
            record("A3", "1234567801018", "15/09/2026 08:30"),
            record("A4", "123456780101", "15/09/2026 08:31"),
            record("A5", "2997585801017", "15/09/2026 08:32"),
        );

        let summary = importer.import(&xml).await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let failure = &summary.failures[0];
        assert_eq!(failure.index, 2);
        assert_eq!(failure.seat.as_deref(), Some("A4"));
        assert!(matches!(failure.reason, RecordError::InvalidCui(_)));
    }

    #[tokio::test]
    async fn accepts_the_flight_reservation_schema() {
        let (importer, _) = importer().await;

        let xml = "<flightReservation><flightSeat>\
                   <seatNumber>G2</seatNumber>\
                   <passengerName>Luis</passengerName>\
                   <user>luis@outlook.com</user>\
                   <idNumber>1234567801018</idNumber>\
                   <hasLuggage>false</hasLuggage>\
                   <reservationDate>15/09/2026 09:00</reservationDate>\
                   </flightSeat></flightReservation>";

        let summary = importer.import(xml).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn malformed_document_aborts_the_batch() {
        let (importer, _) = importer().await;
        let err = importer
            .import("<reservations><reservation>")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));

        let err = importer.import("not xml at all").await.unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[tokio::test]
    async fn unknown_root_is_rejected_by_name() {
        let (importer, _) = importer().await;
        let err = importer
            .import("<bookingList><reservation/></bookingList>")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnrecognizedSchema(root) if root == "bookingList"));
    }

    #[tokio::test]
    async fn missing_fields_are_listed_by_name() {
        let (importer, _) = importer().await;

        let xml = "<reservations><reservation>\
                   <seatNumber>A3</seatNumber>\
                   <idNumber>1234567801018</idNumber>\
                   <hasLuggage>true</hasLuggage>\
                   <reservationDate>15/09/2026 08:30</reservationDate>\
                   </reservation></reservations>";

        let summary = importer.import(xml).await.unwrap();
        assert_eq!(summary.failed, 1);
        match &summary.failures[0].reason {
            RecordError::MissingFields(names) => {
                assert_eq!(names, &["passengerName".to_string(), "user".to_string()]);
            }
            other => panic!("expected missing fields, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_seat_and_date_are_tagged() {
        let (importer, _) = importer().await;

        let xml = format!(
            "<reservations>{}{}{}</reservations>",
            record("3A", "1234567801018", "15/09/2026 08:30"),
            record("A03", "1234567801018", "15/09/2026 08:30"),
            record("A3", "1234567801018", "2026-09-15 08:30"),
        );

        let summary = importer.import(&xml).await.unwrap();
        assert_eq!(summary.failed, 3);
        assert!(matches!(summary.failures[0].reason, RecordError::InvalidSeatFormat(_)));
        assert!(matches!(summary.failures[1].reason, RecordError::InvalidSeatFormat(_)));
        assert!(matches!(summary.failures[2].reason, RecordError::InvalidDate(_)));
    }

    #[tokio::test]
    async fn duplicate_seat_on_the_same_day_is_a_conflict() {
        let (importer, _) = importer().await;

        let xml = format!(
            "<reservations>{}{}</reservations>",
            record("F5", "1234567801018", "15/09/2026 08:30"),
            record("F5", "2997585801017", "15/09/2026 11:00"),
        );

        let summary = importer.import(&xml).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        match &summary.failures[0].reason {
            RecordError::SeatAlreadyOccupied(seat) => assert_eq!(seat, "F5"),
            other => panic!("expected occupied seat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_seat_on_different_days_imports_cleanly() {
        let (importer, _) = importer().await;

        let xml = format!(
            "<reservations>{}{}</reservations>",
            record("F5", "1234567801018", "15/09/2026 08:30"),
            record("F5", "2997585801017", "16/09/2026 08:30"),
        );

        let summary = importer.import(&xml).await.unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn export_round_trips_through_import() {
        let (importer, store) = importer().await;

        let xml = format!(
            "<reservations>{}{}{}</reservations>",
            record("A3", "1234567801018", "15/09/2026 08:30"),
            record("C1", "2997585801017", "15/09/2026 09:45"),
            record("I7", "1234567801018", "16/09/2026 07:00"),
        );
        let summary = importer.import(&xml).await.unwrap();
        assert_eq!(summary.succeeded, 3);

        let rows = store.export_rows().await.unwrap();
        let exported = crate::export(&rows).unwrap();

        // A fresh store accepts every exported record.
        let (fresh_importer, _) = self::importer().await;
        let reimported = fresh_importer.import(&exported).await.unwrap();
        assert_eq!(reimported.total, 3);
        assert_eq!(reimported.failed, 0);
        assert_eq!(reimported.succeeded, 3);
    }

    #[tokio::test]
    async fn escaped_names_survive_the_round_trip() {
        let (importer, store) = importer().await;
        let reserved_at = Utc::now();

        importer
            .engine
            .import_reservation(
                importer.flight_id,
                ImportRecord {
                    seat_label: "D2".into(),
                    passenger_name: "P\u{e9}rez & <Hijos>".into(),
                    email: "perez@gmail.com".into(),
                    cui: "1234567801018".into(),
                    has_luggage: false,
                    reserved_at,
                },
            )
            .await
            .unwrap();

        let exported = crate::export(&store.export_rows().await.unwrap()).unwrap();
        assert!(exported.contains("P\u{e9}rez &amp; &lt;Hijos&gt;"));

        let (fresh_importer, fresh_store) = self::importer().await;
        let summary = fresh_importer.import(&exported).await.unwrap();
        assert_eq!(summary.failed, 0);

        let rows = fresh_store.export_rows().await.unwrap();
        assert_eq!(rows[0].passenger_name, "P\u{e9}rez & <Hijos>");
    }
}
