//! Provider traits and implementations.
//!
//! Each provider abstracts an external dependency, allowing tests to inject
//! mock implementations while production code uses real implementations.

mod clock;
mod env;

pub use clock::{ClockProvider, MockClock, RealClock};
pub use env::{EnvProvider, MockEnv, RealEnv};
