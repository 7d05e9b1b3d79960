pub mod cui;
pub mod error;
pub mod models;
pub mod repository;

pub use error::BookingError;
pub use repository::{BookingStore, StoreError};
