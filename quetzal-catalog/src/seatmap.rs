//! The static cabin layout: six rows `I G F D C A`, seven columns each.
//! Columns 1-2 are business, 3-7 economy.

use quetzal_core::models::{CabinClass, Seat};

/// Row letters of the cabin, front to back.
pub const ROW_LETTERS: [char; 6] = ['I', 'G', 'F', 'D', 'C', 'A'];

/// Columns per row.
pub const COLUMNS: u8 = 7;

/// Last column that still counts as business class.
pub const BUSINESS_COLUMNS: u8 = 2;

const BUSINESS_BASE_PRICE: f64 = 800.0;
const ECONOMY_BASE_PRICE: f64 = 500.0;

/// A seat label is one uppercase ASCII letter followed by one or two
/// digits without a leading zero (`A1` .. `Z99`).
pub fn is_valid_seat_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match bytes {
        [row, col] => row.is_ascii_uppercase() && (b'1'..=b'9').contains(col),
        [row, c1, c2] => {
            row.is_ascii_uppercase() && (b'1'..=b'9').contains(c1) && c2.is_ascii_digit()
        }
        _ => false,
    }
}

/// Column number of a seat label, if the label is well-formed.
pub fn seat_column(label: &str) -> Option<u8> {
    if !is_valid_seat_label(label) {
        return None;
    }
    label[1..].parse().ok()
}

/// Cabin class by column: columns 1-2 business, 3+ economy. This is the
/// rule the import path uses when the seat is not in the catalog.
pub fn class_for_column(column: u8) -> CabinClass {
    if column <= BUSINESS_COLUMNS {
        CabinClass::Business
    } else {
        CabinClass::Economy
    }
}

/// The full 42-seat catalog with per-seat base prices, used to seed
/// stores in tests and local development.
pub fn standard_cabin() -> Vec<Seat> {
    let mut seats = Vec::with_capacity(ROW_LETTERS.len() * COLUMNS as usize);
    for row in ROW_LETTERS {
        for column in 1..=COLUMNS {
            let class = class_for_column(column);
            seats.push(Seat {
                label: format!("{row}{column}"),
                class,
                base_price: match class {
                    CabinClass::Business => BUSINESS_BASE_PRICE,
                    CabinClass::Economy => ECONOMY_BASE_PRICE,
                },
            });
        }
    }
    seats
}
