//! Instrument codes and pip scaling.

/// Default pips per unit price for four-decimal currency pairs.
pub const DEFAULT_PIP_FACTOR: u32 = 10_000;

/// Pips per unit price for a quoted instrument.
///
/// Rules are applied in order and the last match wins: default 10000,
/// anything containing `JPY` is 100, anything containing `XAU` is 10.
pub fn pip_factor(instrument: &str) -> u32 {
    let mut factor = DEFAULT_PIP_FACTOR;
    if instrument.contains("JPY") {
        factor = 100;
    }
    if instrument.contains("XAU") {
        factor = 10;
    }
    factor
}

/// Convert a pip distance into a price distance for `instrument`.
pub fn pips_to_price(instrument: &str, pips: f64) -> f64 {
    pips / pip_factor(instrument) as f64
}
