//! Domain types for fxreshape

pub mod bar;
pub mod instrument;

pub use bar::{Bar, RawBar, TIMESTAMP_FORMAT};
pub use instrument::{pip_factor, pips_to_price, DEFAULT_PIP_FACTOR};

/// Instrument code alias (e.g. `EURUSD`, `XAUUSD`).
pub type Instrument = String;
