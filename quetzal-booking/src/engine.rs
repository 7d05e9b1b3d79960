use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use quetzal_catalog::seatmap::{class_for_column, seat_column};
use quetzal_catalog::{FareEngine, FareRules};
use quetzal_core::cui;
use quetzal_core::models::{
    Account, NewAccount, PassengerDraft, Reservation, ReservationDraft, Seat, SelectionMethod,
    TripType,
};
use quetzal_core::{BookingError, BookingStore, StoreError};

use crate::availability::SeatAvailability;

/// A reservation-creation payload, already authenticated as a specific
/// account by the session layer. `seat_labels` is index-aligned with
/// `passengers`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub flight_id: Uuid,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub selection_method: SelectionMethod,
    pub passengers: Vec<PassengerInput>,
    pub seat_labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassengerInput {
    pub full_name: String,
    pub cui: String,
    pub department: String,
    pub municipality: String,
    pub has_luggage: bool,
}

/// One validated record from a bulk-import document. Format checks (seat
/// label shape, 13-digit CUI, date parsing) happen at the interchange
/// boundary; this carries the already-parsed values.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub seat_label: String,
    pub passenger_name: String,
    pub email: String,
    pub cui: String,
    pub has_luggage: bool,
    pub reserved_at: DateTime<Utc>,
}

const PLACEHOLDER_LOCATION: &str = "not specified";
const TEMP_CREDENTIAL_LEN: usize = 24;

/// Orchestrates reservation creation: validation, seat allocation, fare
/// computation and the single atomic store commit.
///
/// All validation happens before the transaction opens; only persistence
/// runs inside it. The store re-checks seat conflicts under that
/// transaction, so concurrent requests for the same seat/date/destination
/// resolve to exactly one winner.
pub struct ReservationEngine {
    store: Arc<dyn BookingStore>,
    availability: SeatAvailability,
    fares: FareEngine,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn BookingStore>, rules: FareRules) -> Self {
        Self {
            availability: SeatAvailability::new(store.clone()),
            fares: FareEngine::new(rules),
            store,
        }
    }

    pub fn availability(&self) -> &SeatAvailability {
        &self.availability
    }

    /// Creates a reservation for the authenticated account.
    pub async fn create_reservation(
        &self,
        account_id: Uuid,
        request: ReservationRequest,
    ) -> Result<Reservation, BookingError> {
        if request.passengers.is_empty() {
            return Err(BookingError::InvalidRequest(
                "reservation needs at least one passenger".into(),
            ));
        }
        if request.passengers.len() != request.seat_labels.len() {
            return Err(BookingError::InvalidRequest(format!(
                "{} passengers but {} seats selected",
                request.passengers.len(),
                request.seat_labels.len()
            )));
        }

        let flight = self
            .store
            .flight(request.flight_id)
            .await?
            .filter(|f| f.active)
            .ok_or(BookingError::FlightNotFound(request.flight_id))?;

        // Availability first: the whole request is rejected on the first
        // conflicting seat, no partial allocation.
        let mut seats = Vec::with_capacity(request.seat_labels.len());
        for label in &request.seat_labels {
            let seat = self
                .availability
                .ensure_free(label, request.departure_date, &flight.destination)
                .await?;
            seats.push(seat);
        }

        let round_trip = flight.trip_type == TripType::RoundTrip;
        let mut fares = Vec::with_capacity(request.passengers.len());
        let mut passengers = Vec::with_capacity(request.passengers.len());
        for (input, seat) in request.passengers.iter().zip(&seats) {
            cui::validate(&input.cui).map_err(|reason| BookingError::InvalidCui {
                passenger: input.full_name.clone(),
                reason,
            })?;

            let fare = self
                .fares
                .passenger_fare(seat.base_price, input.has_luggage, round_trip);
            fares.push(fare);
            passengers.push(PassengerDraft {
                full_name: input.full_name.clone(),
                cui: input.cui.clone(),
                department: input.department.clone(),
                municipality: input.municipality.clone(),
                seat_label: seat.label.clone(),
                cabin_class: seat.class,
                has_luggage: input.has_luggage,
                final_price: fare,
            });
        }

        // VIP status as of the start of the transaction; a promotion
        // triggered by this reservation never discounts it.
        let account = self
            .store
            .account(account_id)
            .await?
            .ok_or(StoreError::AccountMissing(account_id))?;
        let total = self.fares.reservation_total(&fares, account.is_vip);

        let draft = ReservationDraft {
            account_id,
            flight_id: flight.id,
            destination: flight.destination.clone(),
            departure_date: request.departure_date,
            return_date: request.return_date,
            reserved_at: Utc::now(),
            total_price: total,
            selection_method: request.selection_method,
            bump_loyalty: true,
            vip_threshold: self.fares.rules().vip_threshold,
            passengers,
        };

        let reservation = self
            .store
            .commit_reservation(draft)
            .await
            .map_err(BookingError::from_commit)?;

        info!(
            reservation_id = %reservation.id,
            account_id = %account_id,
            destination = %flight.destination,
            passengers = reservation.passenger_count,
            total = reservation.total_price,
            "reservation created"
        );
        Ok(reservation)
    }

    /// Picks `count` free seats for a date/destination, preferring a
    /// contiguous run within one row, falling back to the first free
    /// seats in cabin order.
    pub async fn auto_assign_seats(
        &self,
        date: NaiveDate,
        destination: &str,
        count: usize,
    ) -> Result<Vec<String>, BookingError> {
        if count == 0 {
            return Err(BookingError::InvalidRequest(
                "cannot auto-assign zero seats".into(),
            ));
        }

        let catalog = self.store.seats().await?;
        let free = self
            .availability
            .free_seats(&catalog, date, destination)
            .await?;
        if free.len() < count {
            return Err(BookingError::InvalidRequest(format!(
                "only {} free seats for {destination} on {date}, {count} requested",
                free.len()
            )));
        }

        if let Some(run) = contiguous_run(&free, count) {
            return Ok(run);
        }

        Ok(free.iter().take(count).map(|s| s.label.clone()).collect())
    }

    /// Persists one bulk-import record: account resolved (or created) by
    /// email, a single-passenger reservation with the import selection
    /// tag, zero total and no loyalty bump. The seat conflict is scoped
    /// to the record's date and the import flight's destination, the same
    /// policy live booking uses.
    pub async fn import_reservation(
        &self,
        flight_id: Uuid,
        record: ImportRecord,
    ) -> Result<Reservation, BookingError> {
        let flight = self
            .store
            .flight(flight_id)
            .await?
            .filter(|f| f.active)
            .ok_or(BookingError::FlightNotFound(flight_id))?;

        let date = record.reserved_at.date_naive();
        if self
            .store
            .seat_occupied(&record.seat_label, date, &flight.destination)
            .await?
        {
            return Err(BookingError::SeatUnavailable {
                seat: record.seat_label,
                date,
                destination: flight.destination,
            });
        }

        let column = seat_column(&record.seat_label).ok_or_else(|| {
            BookingError::InvalidRequest(format!("malformed seat label {}", record.seat_label))
        })?;

        let account = self.resolve_account(&record.email).await?;

        let draft = ReservationDraft {
            account_id: account.id,
            flight_id: flight.id,
            destination: flight.destination.clone(),
            departure_date: date,
            return_date: None,
            reserved_at: record.reserved_at,
            total_price: 0.0,
            selection_method: SelectionMethod::Import,
            bump_loyalty: false,
            vip_threshold: self.fares.rules().vip_threshold,
            passengers: vec![PassengerDraft {
                full_name: record.passenger_name,
                cui: record.cui,
                department: PLACEHOLDER_LOCATION.into(),
                municipality: PLACEHOLDER_LOCATION.into(),
                seat_label: record.seat_label,
                cabin_class: class_for_column(column),
                has_luggage: record.has_luggage,
                final_price: 0.0,
            }],
        };

        self.store
            .commit_reservation(draft)
            .await
            .map_err(BookingError::from_commit)
    }

    /// Finds the account for an email, creating one with a
    /// system-generated temporary credential when none exists.
    pub async fn resolve_account(&self, email: &str) -> Result<Account, BookingError> {
        if let Some(account) = self.store.account_by_email(email).await? {
            return Ok(account);
        }

        warn!(email, "no account for imported record, creating one");
        let account = self
            .store
            .create_account(NewAccount {
                email: email.to_string(),
                password_hash: temp_credential(),
            })
            .await?;
        Ok(account)
    }
}

/// A run of `count` seats in the same row with consecutive columns.
fn contiguous_run(free: &[Seat], count: usize) -> Option<Vec<String>> {
    let mut by_row: Vec<(char, Vec<(u8, &Seat)>)> = Vec::new();
    for seat in free {
        let row = seat.label.chars().next()?;
        let column = seat_column(&seat.label)?;
        match by_row.iter_mut().find(|(r, _)| *r == row) {
            Some((_, seats)) => seats.push((column, seat)),
            None => by_row.push((row, vec![(column, seat)])),
        }
    }

    for (_, mut seats) in by_row {
        seats.sort_by_key(|(column, _)| *column);
        for window in seats.windows(count) {
            let consecutive = window
                .windows(2)
                .all(|pair| pair[1].0 == pair[0].0 + 1);
            if consecutive {
                return Some(window.iter().map(|(_, s)| s.label.clone()).collect());
            }
        }
    }
    None
}

fn temp_credential() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_CREDENTIAL_LEN)
        .map(char::from)
        .collect()
}
