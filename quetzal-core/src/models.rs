use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a flight sells one-way or round-trip fares. Round-trip doubles
/// each passenger fare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

/// Cabin class of a seat. Columns 1-2 of every row are business, the rest
/// economy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Business,
    Economy,
}

/// How the seats of a reservation were chosen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Manual,
    Automatic,
    Import,
}

/// A user account. VIP status is derived: it flips to true when the
/// lifetime reservation counter reaches the threshold and is never unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_vip: bool,
    pub lifetime_reservations: i32,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating an account (import path only in this core; live
/// registration belongs to the account subsystem).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
}

/// Read-only flight reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub trip_type: TripType,
    pub active: bool,
    pub base_price: f64,
}

/// One seat of the static cabin catalog. Occupancy is contextual (per
/// date/destination), not a property of the seat itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub label: String,
    pub class: CabinClass,
    pub base_price: f64,
}

/// A committed reservation, hydrated with its passenger rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub account_id: Uuid,
    pub flight_id: Uuid,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub total_price: f64,
    pub selection_method: SelectionMethod,
    pub passenger_count: i32,
    pub created_at: DateTime<Utc>,
    pub passengers: Vec<Passenger>,
}

/// A passenger row, child of a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub full_name: String,
    pub cui: String,
    pub department: String,
    pub municipality: String,
    pub seat_label: String,
    pub cabin_class: CabinClass,
    pub has_luggage: bool,
    pub final_price: f64,
}

/// Fully validated and priced reservation, ready to be committed in one
/// atomic store transaction. `destination` is carried so the store can
/// re-check seat conflicts under the same transaction that inserts the
/// passenger rows.
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub account_id: Uuid,
    pub flight_id: Uuid,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub reserved_at: DateTime<Utc>,
    pub total_price: f64,
    pub selection_method: SelectionMethod,
    /// Live bookings count +1 toward the loyalty threshold; imports do not.
    pub bump_loyalty: bool,
    /// Lifetime reservation count at which the VIP flag flips.
    pub vip_threshold: i32,
    pub passengers: Vec<PassengerDraft>,
}

/// Passenger data carried by a draft.
#[derive(Debug, Clone)]
pub struct PassengerDraft {
    pub full_name: String,
    pub cui: String,
    pub department: String,
    pub municipality: String,
    pub seat_label: String,
    pub cabin_class: CabinClass,
    pub has_luggage: bool,
    pub final_price: f64,
}

/// One flat passenger record as exported to XML: passenger joined to its
/// reservation and owning account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    pub seat_label: String,
    pub passenger_name: String,
    pub email: String,
    pub cui: String,
    pub has_luggage: bool,
    pub reserved_at: DateTime<Utc>,
}
