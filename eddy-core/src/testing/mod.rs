//! Deterministic testing support.
//!
//! Production code reaches time and the environment only through providers.
//! This module holds those provider traits, their real and mock
//! implementations, and a [`TestContextBuilder`] that wires the mocks into a
//! [`Context`](crate::traits::Context).
//!
//! # Example
//!
//! ```ignore
//! use eddy_core::testing::TestContextBuilder;
//!
//! #[tokio::test]
//! async fn loop_times_out() {
//!     let test = TestContextBuilder::new().build().unwrap();
//!     let out = node.execute(test.context(), msg.clone()).await.unwrap();
//!     test.clock.advance_millis(1_000);
//!     // ...
//! }
//! ```

pub mod context;
pub mod providers;

pub use context::{TestContext, TestContextBuilder};
pub use providers::{ClockProvider, EnvProvider, MockClock, MockEnv, RealClock, RealEnv};
