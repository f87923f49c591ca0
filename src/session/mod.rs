//! Session entry data model.
//!
//! A [`SessionEntry`] records one user-initiated pass through the ritual:
//! what bond it was about, how charged it felt before and after, which
//! phases were visited, how the voice readings went and which vow, if any,
//! came out of it. Finalized entries are handed to a [`SessionSink`].

mod sink;
mod types;

pub use sink::SessionSink;
pub use types::*;
