pub mod pricing;
pub mod seatmap;

pub use pricing::{FareEngine, FareRules};
pub use seatmap::{class_for_column, is_valid_seat_label, standard_cabin};
