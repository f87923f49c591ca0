//! Ritual phase progression.
//!
//! A ritual walks a fixed, linear sequence of phases from `preparation` to
//! `renewal`, then ends in one of two absorbing states: `completed` (only
//! from `renewal`) or `abandoned` (from anywhere). Some phases carry a
//! maximum dwell; when it runs out they either advance on their own or
//! simply stop the clock and wait for the user.

mod machine;
mod timer;
mod types;

pub use machine::PhaseMachine;
pub use timer::{Expiry, PhaseTimer};
pub use types::*;
