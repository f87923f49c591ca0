//! TOML content pack loading.
//!
//! Provides two loading methods:
//! - `default_catalog()` - Loads the content pack compiled into the binary
//! - `load_catalog(path)` - Loads a custom content pack from a file path

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::lookup::ContentCatalog;
use super::types::CatalogConfig;

/// Default content embedded in the binary at compile time.
/// Loaded from `config/ritual_content.toml`.
const DEFAULT_CONTENT: &str = include_str!("../../config/ritual_content.toml");

/// Load a content pack from a TOML file at the given path.
///
/// # Example
/// ```ignore
/// let catalog = load_catalog(Path::new("/path/to/content_fr.toml"))?;
/// ```
pub fn load_catalog(path: &Path) -> Result<ContentCatalog> {
    let content = std::fs::read_to_string(path)?;
    let config: CatalogConfig = toml::from_str(&content)?;
    let catalog = ContentCatalog::from_config(config)?;
    info!("Loaded {} scripts from {:?}", catalog.len(), path);
    Ok(catalog)
}

/// Get the content pack embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_catalog() -> ContentCatalog {
    let config: CatalogConfig =
        toml::from_str(DEFAULT_CONTENT).expect("embedded ritual_content.toml must be valid TOML");
    ContentCatalog::from_config(config).expect("embedded ritual_content.toml must be consistent")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;
    use crate::session::{Approach, BondType};

    #[test]
    fn test_default_catalog_covers_every_phase() {
        let catalog = default_catalog();
        assert!(!catalog.is_empty());
        assert!(
            catalog.missing_phases().is_empty(),
            "Missing defaults for {:?}",
            catalog.missing_phases()
        );
    }

    #[test]
    fn test_liberation_requires_reading() {
        let catalog = default_catalog();
        for approach in [Approach::Secular, Approach::Spiritual, Approach::Traditional] {
            let script = catalog.get_script(BondType::RomanticPartner, approach, Phase::Liberation);
            assert!(
                script.requires_reading(),
                "{:?} liberation should have voice phrases",
                approach
            );
        }
    }

    #[test]
    fn test_ancestral_scripts_override_defaults() {
        let catalog = default_catalog();
        let generic = catalog.get_script(BondType::Parent, Approach::Secular, Phase::Liberation);
        let ancestral =
            catalog.get_script(BondType::AncestralLoyalty, Approach::Secular, Phase::Liberation);
        let ancestral_traditional = catalog.get_script(
            BondType::AncestralLoyalty,
            Approach::Traditional,
            Phase::Liberation,
        );

        assert_ne!(generic.title, ancestral.title);
        assert_ne!(ancestral.title, ancestral_traditional.title);
    }

    #[test]
    fn test_renewal_suggests_vows() {
        let catalog = default_catalog();
        let renewal = catalog.get_script(BondType::Sibling, Approach::Spiritual, Phase::Renewal);
        assert!(!renewal.suggested_vows.is_empty());
        for vow in &renewal.suggested_vows {
            assert!(!vow.title.is_empty());
            assert!(vow.duration_days > 0);
        }
    }

    #[test]
    fn test_scripts_have_text() {
        let catalog = default_catalog();
        for phase in Phase::ORDINAL {
            let script = catalog.get_script(BondType::Friendship, Approach::Secular, phase);
            assert!(!script.title.is_empty(), "{} title empty", phase);
            assert!(!script.body.is_empty(), "{} body empty", phase);
        }
    }
}
