use serde::{Deserialize, Serialize};

/// Tunable fare parameters. Defaults match the production tariff: Q100
/// luggage surcharge, 10% VIP discount, VIP status after 5 reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareRules {
    /// Flat surcharge per passenger travelling with luggage, in quetzales.
    pub luggage_fee: f64,

    /// Multiplier applied to the reservation total for VIP accounts.
    pub vip_discount: f64,

    /// Lifetime reservation count at which an account becomes VIP.
    pub vip_threshold: i32,
}

impl Default for FareRules {
    fn default() -> Self {
        Self {
            luggage_fee: 100.0,
            vip_discount: 0.9,
            vip_threshold: 5,
        }
    }
}

/// Computes passenger fares and reservation totals.
pub struct FareEngine {
    rules: FareRules,
}

impl FareEngine {
    pub fn new(rules: FareRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &FareRules {
        &self.rules
    }

    /// Final fare for one passenger: seat base price, plus the luggage
    /// surcharge when applicable, doubled on round-trip flights. Callers
    /// must not round before summing into the reservation total.
    pub fn passenger_fare(&self, seat_base: f64, has_luggage: bool, round_trip: bool) -> f64 {
        let mut fare = seat_base;
        if has_luggage {
            fare += self.rules.luggage_fee;
        }
        if round_trip {
            fare *= 2.0;
        }
        fare
    }

    /// Reservation total: sum of the passenger fares, discounted when the
    /// owning account was VIP at the start of the transaction. A VIP
    /// promotion triggered by this very reservation does not discount it.
    pub fn reservation_total(&self, fares: &[f64], is_vip: bool) -> f64 {
        let sum: f64 = fares.iter().sum();
        if is_vip {
            sum * self.rules.vip_discount
        } else {
            sum
        }
    }
}

impl Default for FareEngine {
    fn default() -> Self {
        Self::new(FareRules::default())
    }
}
