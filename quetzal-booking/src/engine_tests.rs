use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use quetzal_catalog::FareRules;
use quetzal_core::models::{Account, Flight, SelectionMethod, TripType};
use quetzal_core::{BookingError, BookingStore};
use quetzal_store::MemoryBookingStore;

use crate::engine::{ImportRecord, PassengerInput, ReservationEngine, ReservationRequest};

fn flight(destination: &str, trip_type: TripType) -> Flight {
    Flight {
        id: Uuid::new_v4(),
        origin: "Guatemala City".into(),
        destination: destination.into(),
        trip_type,
        active: true,
        base_price: 500.0,
    }
}

fn account(is_vip: bool, lifetime_reservations: i32) -> Account {
    Account {
        id: Uuid::new_v4(),
        email: "ana@gmail.com".into(),
        password_hash: "hash".into(),
        is_vip,
        lifetime_reservations,
        verified: true,
        created_at: Utc::now(),
    }
}

fn passenger(name: &str, cui: &str, has_luggage: bool) -> PassengerInput {
    PassengerInput {
        full_name: name.into(),
        cui: cui.into(),
        department: "Guatemala".into(),
        municipality: "Mixco".into(),
        has_luggage,
    }
}

// CUIs with correct check digits for the 0101 region suffix.
const VALID_CUI: &str = "1234567801018";
const OTHER_CUI: &str = "2997585801017";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn setup(trip_type: TripType) -> (ReservationEngine, Flight, Account) {
    let store = Arc::new(MemoryBookingStore::new());
    let f = flight("Madrid", trip_type);
    let a = account(false, 0);
    store.seed_flight(f.clone()).await;
    store.seed_account(a.clone()).await;
    let engine = ReservationEngine::new(store, FareRules::default());
    (engine, f, a)
}

fn request(flight_id: Uuid, seats: &[&str], passengers: Vec<PassengerInput>) -> ReservationRequest {
    ReservationRequest {
        flight_id,
        departure_date: date(2026, 9, 15),
        return_date: None,
        selection_method: SelectionMethod::Manual,
        passengers,
        seat_labels: seats.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn books_a_round_trip_business_seat_with_luggage() {
    let (engine, flight, acct) = setup(TripType::RoundTrip).await;

    let reservation = engine
        .create_reservation(
            acct.id,
            request(flight.id, &["I1"], vec![passenger("Ana", VALID_CUI, true)]),
        )
        .await
        .unwrap();

    // (800 base + 100 luggage) doubled for the return leg.
    assert_eq!(reservation.total_price, 1800.0);
    assert_eq!(reservation.passenger_count, 1);
    assert_eq!(reservation.passengers[0].seat_label, "I1");
    assert_eq!(reservation.passengers[0].final_price, 1800.0);
}

#[tokio::test]
async fn rejects_empty_passenger_list() {
    let (engine, flight, acct) = setup(TripType::OneWay).await;

    let err = engine
        .create_reservation(acct.id, request(flight.id, &[], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidRequest(_)));
}

#[tokio::test]
async fn rejects_seat_count_mismatch() {
    let (engine, flight, acct) = setup(TripType::OneWay).await;

    let err = engine
        .create_reservation(
            acct.id,
            request(
                flight.id,
                &["A3"],
                vec![
                    passenger("Ana", VALID_CUI, false),
                    passenger("Luis", OTHER_CUI, false),
                ],
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidRequest(_)));
}

#[tokio::test]
async fn rejects_unknown_flight() {
    let (engine, _, acct) = setup(TripType::OneWay).await;

    let bogus = Uuid::new_v4();
    let err = engine
        .create_reservation(
            acct.id,
            request(bogus, &["A3"], vec![passenger("Ana", VALID_CUI, false)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::FlightNotFound(id) if id == bogus));
}

#[tokio::test]
async fn rejects_seat_taken_on_same_date_and_destination() {
    let (engine, flight, acct) = setup(TripType::OneWay).await;

    engine
        .create_reservation(
            acct.id,
            request(flight.id, &["A3"], vec![passenger("Ana", VALID_CUI, false)]),
        )
        .await
        .unwrap();

    let err = engine
        .create_reservation(
            acct.id,
            request(flight.id, &["A3"], vec![passenger("Luis", OTHER_CUI, false)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable { seat, .. } if seat == "A3"));
}

#[tokio::test]
async fn same_seat_is_free_on_a_different_date() {
    let (engine, flight, acct) = setup(TripType::OneWay).await;

    engine
        .create_reservation(
            acct.id,
            request(flight.id, &["A3"], vec![passenger("Ana", VALID_CUI, false)]),
        )
        .await
        .unwrap();

    let mut later = request(flight.id, &["A3"], vec![passenger("Luis", OTHER_CUI, false)]);
    later.departure_date = date(2026, 9, 16);
    assert!(engine.create_reservation(acct.id, later).await.is_ok());
}

#[tokio::test]
async fn rejects_invalid_cui_before_committing() {
    let (engine, flight, acct) = setup(TripType::OneWay).await;

    let err = engine
        .create_reservation(
            acct.id,
            request(
                flight.id,
                &["A3"],
                vec![passenger("Ana", "1234567890101", false)],
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidCui { .. }));

    // Nothing was persisted, the seat stays free.
    assert!(engine
        .create_reservation(
            acct.id,
            request(flight.id, &["A3"], vec![passenger("Ana", VALID_CUI, false)]),
        )
        .await
        .is_ok());
}

#[tokio::test]
async fn fifth_reservation_promotes_without_discounting_itself() {
    let store = Arc::new(MemoryBookingStore::new());
    let flight = flight("Madrid", TripType::OneWay);
    let acct = account(false, 4);
    store.seed_flight(flight.clone()).await;
    store.seed_account(acct.clone()).await;
    let engine = ReservationEngine::new(store.clone(), FareRules::default());

    let reservation = engine
        .create_reservation(
            acct.id,
            request(flight.id, &["A3"], vec![passenger("Ana", VALID_CUI, false)]),
        )
        .await
        .unwrap();

    // The triggering reservation pays full fare.
    assert_eq!(reservation.total_price, 500.0);

    let promoted = store.account(acct.id).await.unwrap().unwrap();
    assert!(promoted.is_vip);
    assert_eq!(promoted.lifetime_reservations, 5);

    // The next one gets the VIP rate.
    let mut next = request(flight.id, &["A4"], vec![passenger("Ana", VALID_CUI, false)]);
    next.departure_date = date(2026, 9, 20);
    let discounted = engine.create_reservation(acct.id, next).await.unwrap();
    assert_eq!(discounted.total_price, 450.0);
}

#[tokio::test]
async fn concurrent_requests_for_one_seat_yield_a_single_winner() {
    let (engine, flight, acct) = setup(TripType::OneWay).await;
    let engine = Arc::new(engine);

    let a = {
        let engine = engine.clone();
        let req = request(flight.id, &["C5"], vec![passenger("Ana", VALID_CUI, false)]);
        tokio::spawn(async move { engine.create_reservation(acct.id, req).await })
    };
    let b = {
        let engine = engine.clone();
        let req = request(flight.id, &["C5"], vec![passenger("Luis", OTHER_CUI, false)]);
        tokio::spawn(async move { engine.create_reservation(acct.id, req).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(BookingError::SeatUnavailable { seat, .. }) if seat == "C5"
    )));
}

#[tokio::test]
async fn auto_assignment_prefers_a_contiguous_row() {
    let (engine, flight, acct) = setup(TripType::OneWay).await;
    let day = date(2026, 9, 15);

    // Break up row I so the contiguous run must come from elsewhere.
    engine
        .create_reservation(
            acct.id,
            request(flight.id, &["I2"], vec![passenger("Ana", VALID_CUI, false)]),
        )
        .await
        .unwrap();

    let seats = engine
        .auto_assign_seats(day, &flight.destination, 3)
        .await
        .unwrap();
    assert_eq!(seats.len(), 3);

    let row = seats[0].chars().next().unwrap();
    assert!(seats.iter().all(|s| s.starts_with(row)));
    let columns: Vec<u8> = seats.iter().map(|s| s[1..].parse().unwrap()).collect();
    assert!(columns.windows(2).all(|w| w[1] == w[0] + 1));
}

#[tokio::test]
async fn auto_assignment_fails_when_cabin_cannot_fit_the_party() {
    let (engine, flight, _) = setup(TripType::OneWay).await;

    let err = engine
        .auto_assign_seats(date(2026, 9, 15), &flight.destination, 43)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidRequest(_)));
}

#[tokio::test]
async fn import_creates_account_and_zero_priced_reservation() {
    let store = Arc::new(MemoryBookingStore::new());
    let flight = flight("Madrid", TripType::OneWay);
    store.seed_flight(flight.clone()).await;
    let engine = ReservationEngine::new(store.clone(), FareRules::default());

    let reserved_at = "2026-09-15T08:30:00Z".parse().unwrap();
    let reservation = engine
        .import_reservation(
            flight.id,
            ImportRecord {
                seat_label: "G4".into(),
                passenger_name: "Carla Paz".into(),
                email: "carla@outlook.com".into(),
                cui: VALID_CUI.into(),
                has_luggage: true,
                reserved_at,
            },
        )
        .await
        .unwrap();

    assert_eq!(reservation.total_price, 0.0);
    assert_eq!(reservation.selection_method, SelectionMethod::Import);

    let created = store
        .account_by_email("carla@outlook.com")
        .await
        .unwrap()
        .unwrap();
    // Imports never count toward loyalty.
    assert_eq!(created.lifetime_reservations, 0);
    assert_eq!(created.id, reservation.account_id);
}

#[tokio::test]
async fn import_conflicts_with_a_live_booking_on_the_same_day() {
    let store = Arc::new(MemoryBookingStore::new());
    let flight = flight("Madrid", TripType::OneWay);
    let acct = account(false, 0);
    store.seed_flight(flight.clone()).await;
    store.seed_account(acct.clone()).await;
    let engine = ReservationEngine::new(store, FareRules::default());

    engine
        .create_reservation(
            acct.id,
            request(flight.id, &["F2"], vec![passenger("Ana", VALID_CUI, false)]),
        )
        .await
        .unwrap();

    let err = engine
        .import_reservation(
            flight.id,
            ImportRecord {
                seat_label: "F2".into(),
                passenger_name: "Carla Paz".into(),
                email: "carla@outlook.com".into(),
                cui: VALID_CUI.into(),
                has_luggage: false,
                reserved_at: "2026-09-15T10:00:00Z".parse().unwrap(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable { seat, .. } if seat == "F2"));
}
