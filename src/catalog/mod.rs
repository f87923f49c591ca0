//! Read-only ritual content.
//!
//! Scripts are plain data: a TOML content pack is parsed once at startup into
//! a composite-key map, and the UI asks for the script of the current step
//! with `(bond, approach, phase)`.
//!
//! # Example
//!
//! ```ignore
//! use ritual_engine::catalog::default_catalog;
//! use ritual_engine::{Approach, BondType, Phase};
//!
//! let catalog = default_catalog();
//! let script = catalog.get_script(BondType::Karmic, Approach::Spiritual, Phase::Cutting);
//! println!("{}: {}", script.title, script.body);
//! for phrase in &script.voice_phrases {
//!     println!("  read aloud: {}", phrase);
//! }
//! ```

mod content;
mod lookup;
mod types;

pub use content::{default_catalog, load_catalog};
pub use lookup::ContentCatalog;
pub use types::*;
