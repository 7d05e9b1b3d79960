use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use quetzal_catalog::standard_cabin;
use quetzal_core::models::{
    Account, CabinClass, ExportRow, Flight, NewAccount, Passenger, Reservation, ReservationDraft,
    Seat, SelectionMethod, TripType,
};
use quetzal_core::{BookingStore, StoreError};

pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts the static cabin layout into the seats table. Run once at
    /// startup, after migrations.
    pub async fn ensure_cabin(&self) -> Result<(), StoreError> {
        for (ordinal, seat) in standard_cabin().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO seats (label, class, base_price, ordinal)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (label) DO UPDATE
                SET class = EXCLUDED.class,
                    base_price = EXCLUDED.base_price,
                    ordinal = EXCLUDED.ordinal
                "#,
            )
            .bind(&seat.label)
            .bind(cabin_class_text(seat.class))
            .bind(seat.base_price)
            .bind(ordinal as i32)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        }
        info!("cabin layout synchronized");
        Ok(())
    }

    /// Upserts a flight. Flights are reference data maintained by
    /// operations tooling, not by the booking flow.
    pub async fn upsert_flight(&self, flight: &Flight) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, origin, destination, trip_type, active, base_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET origin = EXCLUDED.origin,
                destination = EXCLUDED.destination,
                trip_type = EXCLUDED.trip_type,
                active = EXCLUDED.active,
                base_price = EXCLUDED.base_price
            "#,
        )
        .bind(flight.id)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(trip_type_text(flight.trip_type))
        .bind(flight.active)
        .bind(flight.base_price)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

// Row structs for runtime query_as; enums travel as text.
#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    origin: String,
    destination: String,
    trip_type: String,
    active: bool,
    base_price: f64,
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    label: String,
    class: String,
    base_price: f64,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    is_vip: bool,
    lifetime_reservations: i32,
    verified: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ExportRowDb {
    seat_label: String,
    full_name: String,
    email: String,
    cui: String,
    has_luggage: bool,
    created_at: DateTime<Utc>,
}

impl FlightRow {
    fn into_model(self) -> Result<Flight, StoreError> {
        Ok(Flight {
            id: self.id,
            origin: self.origin,
            destination: self.destination,
            trip_type: trip_type_from(&self.trip_type)?,
            active: self.active,
            base_price: self.base_price,
        })
    }
}

impl SeatRow {
    fn into_model(self) -> Result<Seat, StoreError> {
        Ok(Seat {
            label: self.label,
            class: cabin_class_from(&self.class)?,
            base_price: self.base_price,
        })
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            is_vip: row.is_vip,
            lifetime_reservations: row.lifetime_reservations,
            verified: row.verified,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError> {
        let row = sqlx::query_as::<_, FlightRow>(
            "SELECT id, origin, destination, trip_type, active, base_price FROM flights WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(FlightRow::into_model).transpose()
    }

    async fn seat(&self, label: &str) -> Result<Option<Seat>, StoreError> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT label, class, base_price FROM seats WHERE label = $1",
        )
        .bind(label)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(SeatRow::into_model).transpose()
    }

    async fn seats(&self) -> Result<Vec<Seat>, StoreError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT label, class, base_price FROM seats ORDER BY ordinal",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(SeatRow::into_model).collect()
    }

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, password_hash, is_vip, lifetime_reservations, verified, created_at
            FROM accounts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(Account::from))
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, password_hash, is_vip, lifetime_reservations, verified, created_at
            FROM accounts WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(Account::from))
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (id, email, password_hash, is_vip, lifetime_reservations, verified, created_at)
            VALUES ($1, $2, $3, FALSE, 0, FALSE, now())
            RETURNING id, email, password_hash, is_vip, lifetime_reservations, verified, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Account::from(row))
    }

    async fn seat_occupied(
        &self,
        seat_label: &str,
        date: NaiveDate,
        destination: &str,
    ) -> Result<bool, StoreError> {
        let (occupied,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM passengers
                WHERE seat_label = $1 AND departure_date = $2 AND destination = $3
            )
            "#,
        )
        .bind(seat_label)
        .bind(date)
        .bind(destination)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(occupied)
    }

    #[instrument(skip(self, draft), fields(account_id = %draft.account_id, flight_id = %draft.flight_id))]
    async fn commit_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Conflicts found here fail fast; anything that slips past races
        // down to the passengers_seat_slot constraint below.
        for passenger in &draft.passengers {
            let (occupied,): (bool,) = sqlx::query_as(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM passengers
                    WHERE seat_label = $1 AND departure_date = $2 AND destination = $3
                )
                "#,
            )
            .bind(&passenger.seat_label)
            .bind(draft.departure_date)
            .bind(&draft.destination)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend)?;

            if occupied {
                return Err(StoreError::SeatTaken {
                    seat: passenger.seat_label.clone(),
                    date: draft.departure_date,
                    destination: draft.destination.clone(),
                });
            }
        }

        let reservation_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, account_id, flight_id, departure_date, return_date,
                 total_price, selection_method, passenger_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(reservation_id)
        .bind(draft.account_id)
        .bind(draft.flight_id)
        .bind(draft.departure_date)
        .bind(draft.return_date)
        .bind(draft.total_price)
        .bind(selection_method_text(draft.selection_method))
        .bind(draft.passengers.len() as i32)
        .bind(draft.reserved_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let mut passengers = Vec::with_capacity(draft.passengers.len());
        for p in &draft.passengers {
            let passenger_id = Uuid::new_v4();
            let inserted = sqlx::query(
                r#"
                INSERT INTO passengers
                    (id, reservation_id, full_name, cui, department, municipality,
                     seat_label, cabin_class, has_luggage, final_price,
                     departure_date, destination)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(passenger_id)
            .bind(reservation_id)
            .bind(&p.full_name)
            .bind(&p.cui)
            .bind(&p.department)
            .bind(&p.municipality)
            .bind(&p.seat_label)
            .bind(cabin_class_text(p.cabin_class))
            .bind(p.has_luggage)
            .bind(p.final_price)
            .bind(draft.departure_date)
            .bind(&draft.destination)
            .execute(&mut *tx)
            .await;

            if let Err(err) = inserted {
                // The losing side of a concurrent commit lands here.
                if is_seat_conflict(&err) {
                    return Err(StoreError::SeatTaken {
                        seat: p.seat_label.clone(),
                        date: draft.departure_date,
                        destination: draft.destination.clone(),
                    });
                }
                return Err(backend(err));
            }

            passengers.push(Passenger {
                id: passenger_id,
                reservation_id,
                full_name: p.full_name.clone(),
                cui: p.cui.clone(),
                department: p.department.clone(),
                municipality: p.municipality.clone(),
                seat_label: p.seat_label.clone(),
                cabin_class: p.cabin_class,
                has_luggage: p.has_luggage,
                final_price: p.final_price,
            });
        }

        if draft.bump_loyalty {
            let updated = sqlx::query(
                r#"
                UPDATE accounts
                SET lifetime_reservations = lifetime_reservations + 1,
                    is_vip = is_vip OR lifetime_reservations + 1 >= $2
                WHERE id = $1
                "#,
            )
            .bind(draft.account_id)
            .bind(draft.vip_threshold)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            if updated.rows_affected() == 0 {
                return Err(StoreError::AccountMissing(draft.account_id));
            }
        } else {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
                    .bind(draft.account_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(backend)?;
            if !exists {
                return Err(StoreError::AccountMissing(draft.account_id));
            }
        }

        tx.commit().await.map_err(backend)?;

        Ok(Reservation {
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
        })
    }

    async fn export_rows(&self) -> Result<Vec<ExportRow>, StoreError> {
        let rows = sqlx::query_as::<_, ExportRowDb>(
            r#"
            SELECT p.seat_label, p.full_name, a.email, p.cui, p.has_luggage, r.created_at
            FROM passengers p
            JOIN reservations r ON r.id = p.reservation_id
            JOIN accounts a ON a.id = r.account_id
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .map(|row| ExportRow {
                seat_label: row.seat_label,
                passenger_name: row.full_name,
                email: row.email,
                cui: row.cui,
                has_luggage: row.has_luggage,
                reserved_at: row.created_at,
            })
            .collect())
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Unique violations on passengers_seat_slot and serialization failures
/// both mean another transaction won the seat.
fn is_seat_conflict(err: &sqlx::Error) -> bool {
    match err.as_database_error() {
        Some(db) => db.is_unique_violation() || db.code().as_deref() == Some("40001"),
        None => false,
    }
}

fn trip_type_text(t: TripType) -> &'static str {
    match t {
        TripType::OneWay => "one_way",
        TripType::RoundTrip => "round_trip",
    }
}

fn trip_type_from(s: &str) -> Result<TripType, StoreError> {
    match s {
        "one_way" => Ok(TripType::OneWay),
        "round_trip" => Ok(TripType::RoundTrip),
        other => Err(StoreError::Backend(format!("unknown trip type {other}"))),
    }
}

fn cabin_class_text(c: CabinClass) -> &'static str {
    match c {
        CabinClass::Business => "business",
        CabinClass::Economy => "economy",
    }
}

fn cabin_class_from(s: &str) -> Result<CabinClass, StoreError> {
    match s {
        "business" => Ok(CabinClass::Business),
        "economy" => Ok(CabinClass::Economy),
        other => Err(StoreError::Backend(format!("unknown cabin class {other}"))),
    }
}

fn selection_method_text(m: SelectionMethod) -> &'static str {
    match m {
        SelectionMethod::Manual => "manual",
        SelectionMethod::Automatic => "automatic",
        SelectionMethod::Import => "import",
    }
}
