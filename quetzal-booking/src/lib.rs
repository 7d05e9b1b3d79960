pub mod availability;
pub mod engine;

#[cfg(test)]
mod engine_tests;

pub use availability::SeatAvailability;
pub use engine::{ImportRecord, PassengerInput, ReservationEngine, ReservationRequest};
