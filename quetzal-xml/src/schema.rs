//! Wire shapes for the two recognized import schemas and the export
//! document. Both import roots hold the same flat per-seat record; the
//! export always writes the `<flightReservation>` form.

use serde::{Deserialize, Serialize};

use quetzal_core::models::ExportRow;

/// `<reservations><reservation>...</reservation></reservations>`
#[derive(Debug, Deserialize)]
#[serde(rename = "reservations")]
pub struct ReservationsDoc {
    #[serde(rename = "reservation", default)]
    pub records: Vec<RawRecord>,
}

/// `<flightReservation><flightSeat>...</flightSeat></flightReservation>`
#[derive(Debug, Deserialize)]
#[serde(rename = "flightReservation")]
pub struct FlightReservationDoc {
    #[serde(rename = "flightSeat", default)]
    pub records: Vec<RawRecord>,
}

/// One record as it appears on the wire. Every field is optional so a
/// record with gaps still deserializes and the gaps can be reported by
/// name instead of sinking the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "seatNumber")]
    pub seat_number: Option<String>,
    #[serde(rename = "passengerName")]
    pub passenger_name: Option<String>,
    #[serde(rename = "user")]
    pub user: Option<String>,
    #[serde(rename = "idNumber")]
    pub id_number: Option<String>,
    #[serde(rename = "hasLuggage")]
    pub has_luggage: Option<String>,
    #[serde(rename = "reservationDate")]
    pub reservation_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "flightReservation")]
pub struct ExportDoc {
    #[serde(rename = "flightSeat")]
    pub records: Vec<ExportRecord>,
}

#[derive(Debug, Serialize)]
pub struct ExportRecord {
    #[serde(rename = "seatNumber")]
    pub seat_number: String,
    #[serde(rename = "passengerName")]
    pub passenger_name: String,
    #[serde(rename = "user")]
    pub user: String,
    #[serde(rename = "idNumber")]
    pub id_number: String,
    #[serde(rename = "hasLuggage")]
    pub has_luggage: String,
    #[serde(rename = "reservationDate")]
    pub reservation_date: String,
}

impl ExportRecord {
    pub fn from_row(row: &ExportRow) -> Self {
        Self {
            seat_number: row.seat_label.clone(),
            passenger_name: row.passenger_name.clone(),
            user: row.email.clone(),
            id_number: row.cui.clone(),
            has_luggage: if row.has_luggage { "true" } else { "false" }.to_string(),
            reservation_date: row.reserved_at.format(crate::DATE_FORMAT).to_string(),
        }
    }
}
