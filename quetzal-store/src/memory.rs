use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use uuid::Uuid;

use quetzal_catalog::standard_cabin;
use quetzal_core::models::{
    Account, ExportRow, Flight, NewAccount, Passenger, Reservation, ReservationDraft, Seat,
};
use quetzal_core::{BookingStore, StoreError};

/// In-memory implementation of the store, used by tests and local runs.
///
/// A single mutex guards all tables, so every commit is serialized; this
/// gives the same one-winner-per-seat guarantee the Postgres store gets
/// from its unique constraint.
pub struct MemoryBookingStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    flights: Vec<Flight>,
    seats: Vec<Seat>,
    accounts: Vec<Account>,
    reservations: Vec<StoredReservation>,
}

/// Destination is carried alongside the reservation because occupancy is
/// scoped to it and the model row only holds the flight id.
struct StoredReservation {
    reservation: Reservation,
    destination: String,
}

impl Inner {
    fn occupied(&self, seat_label: &str, date: NaiveDate, destination: &str) -> bool {
        self.reservations.iter().any(|stored| {
            stored.reservation.departure_date == date
                && stored.destination == destination
                && stored
                    .reservation
                    .passengers
                    .iter()
                    .any(|p| p.seat_label == seat_label)
        })
    }
}

impl MemoryBookingStore {
    /// An empty store pre-seeded with the standard cabin layout.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                seats: standard_cabin(),
                ..Inner::default()
            }),
        }
    }

    pub async fn seed_flight(&self, flight: Flight) {
        self.inner.lock().await.flights.push(flight);
    }

    pub async fn seed_account(&self, account: Account) {
        self.inner.lock().await.accounts.push(account);
    }
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.flights.iter().find(|f| f.id == id).cloned())
    }

    async fn seat(&self, label: &str) -> Result<Option<Seat>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.seats.iter().find(|s| s.label == label).cloned())
    }

    async fn seats(&self) -> Result<Vec<Seat>, StoreError> {
        Ok(self.inner.lock().await.seats.clone())
    }

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::Backend(format!(
                "account {} already exists",
                account.email
            )));
        }

        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            is_vip: false,
            lifetime_reservations: 0,
            verified: false,
            created_at: chrono::Utc::now(),
        };
        inner.accounts.push(created.clone());
        Ok(created)
    }

    async fn seat_occupied(
        &self,
        seat_label: &str,
        date: NaiveDate,
        destination: &str,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.occupied(seat_label, date, destination))
    }

    async fn commit_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, StoreError> {
        let mut inner = self.inner.lock().await;

        // No state is touched until every seat of the draft clears, so a
        // conflict mid-draft leaves nothing behind.
        let mut claimed: Vec<&str> = Vec::with_capacity(draft.passengers.len());
        for p in &draft.passengers {
            if inner.occupied(&p.seat_label, draft.departure_date, &draft.destination)
                || claimed.contains(&p.seat_label.as_str())
            {
                return Err(StoreError::SeatTaken {
                    seat: p.seat_label.clone(),
                    date: draft.departure_date,
                    destination: draft.destination.clone(),
                });
            }
            claimed.push(&p.seat_label);
        }

        let account = inner
            .accounts
            .iter_mut()
            .find(|a| a.id == draft.account_id)
            .ok_or(StoreError::AccountMissing(draft.account_id))?;
        if draft.bump_loyalty {
            account.lifetime_reservations += 1;
            if account.lifetime_reservations >= draft.vip_threshold {
                account.is_vip = true;
            }
        }

        let reservation_id = Uuid::new_v4();
        let passengers: Vec<Passenger> = draft
            .passengers
            .iter()
            .map(|p| Passenger {
                id: Uuid::new_v4(),
                reservation_id,
                full_name: p.full_name.clone(),
                cui: p.cui.clone(),
                department: p.department.clone(),
                municipality: p.municipality.clone(),
                seat_label: p.seat_label.clone(),
                cabin_class: p.cabin_class,
                has_luggage: p.has_luggage,
                final_price: p.final_price,
            })
            .collect();

        let reservation = Reservation {
            id: reservation_id,
            account_id: draft.account_id,
            flight_id: draft.flight_id,
            departure_date: draft.departure_date,
            return_date: draft.return_date,
            total_price: draft.total_price,
            selection_method: draft.selection_method,
            passenger_count: passengers.len() as i32,
            created_at: draft.reserved_at,
            passengers,
        };

        inner.reservations.push(StoredReservation {
            reservation: reservation.clone(),
            destination: draft.destination,
        });
        Ok(reservation)
    }

    async fn export_rows(&self) -> Result<Vec<ExportRow>, StoreError> {
        let inner = self.inner.lock().await;

        let mut rows = Vec::new();
        for stored in &inner.reservations {
            let reservation = &stored.reservation;
            let account = inner
                .accounts
                .iter()
                .find(|a| a.id == reservation.account_id)
                .ok_or(StoreError::AccountMissing(reservation.account_id))?;
            for passenger in &reservation.passengers {
                rows.push(ExportRow {
                    seat_label: passenger.seat_label.clone(),
                    passenger_name: passenger.full_name.clone(),
                    email: account.email.clone(),
                    cui: passenger.cui.clone(),
                    has_luggage: passenger.has_luggage,
                    reserved_at: reservation.created_at,
                });
            }
        }

        rows.sort_by(|a, b| b.reserved_at.cmp(&a.reserved_at));
        Ok(rows)
    }
}
