//! Slug → adjustment lookup.
//!
//! The set of adjustments is closed, so the registry is a fixed table built
//! once. Strict lookups fail on unknown slugs; [`Registry::get_or_default`]
//! falls back to the configured default for loose user input.

use super::{AdjustmentError, AdjustmentKind};

/// Adjustment used when a loose lookup misses, unless configured otherwise.
pub const DEFAULT_ADJUSTMENT: AdjustmentKind = AdjustmentKind::Fit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<(&'static str, AdjustmentKind)>,
    default: AdjustmentKind,
}

impl Registry {
    /// Every built-in adjustment, with `default` as the fallback.
    pub fn standard(default: AdjustmentKind) -> Self {
        Self {
            entries: AdjustmentKind::ALL
                .into_iter()
                .map(|kind| (kind.slug(), kind))
                .collect(),
            default,
        }
    }

    pub fn get(&self, slug: &str) -> Option<AdjustmentKind> {
        self.entries
            .iter()
            .find(|(key, _)| *key == slug)
            .map(|(_, kind)| *kind)
    }

    /// Strict lookup as a `Result`.
    pub fn lookup(&self, slug: &str) -> Result<AdjustmentKind, AdjustmentError> {
        self.get(slug)
            .ok_or_else(|| AdjustmentError::UnknownAdjustment(slug.to_string()))
    }

    pub fn get_or_default(&self, slug: &str) -> AdjustmentKind {
        self.get(slug).unwrap_or(self.default)
    }

    pub fn default_kind(&self) -> AdjustmentKind {
        self.default
    }

    pub fn slugs(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(slug, _)| *slug)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard(DEFAULT_ADJUSTMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registers_every_kind() {
        let registry = Registry::default();
        assert_eq!(
            registry.slugs().collect::<Vec<_>>(),
            vec!["fit", "crop", "ratiocrop", "namedcrop", "fill"]
        );
        assert_eq!(registry.get("namedcrop"), Some(AdjustmentKind::NamedCrop));
    }

    #[test]
    fn strict_lookup_fails_on_unknown() {
        let registry = Registry::default();
        assert_eq!(registry.get("thumbnail"), None);
        assert_eq!(
            registry.lookup("thumbnail"),
            Err(AdjustmentError::UnknownAdjustment("thumbnail".to_string()))
        );
    }

    #[test]
    fn loose_lookup_uses_configured_default() {
        assert_eq!(Registry::default().get_or_default("nope"), AdjustmentKind::Fit);
        let registry = Registry::standard(AdjustmentKind::Fill);
        assert_eq!(registry.get_or_default("nope"), AdjustmentKind::Fill);
        assert_eq!(registry.get_or_default("crop"), AdjustmentKind::Crop);
    }

    #[test]
    fn slugs_are_case_sensitive() {
        assert_eq!(Registry::default().get("Fit"), None);
    }
}
