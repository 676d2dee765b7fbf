//! Generator Settings
//!
//! Generator-wide configuration, deserializable with every field defaulted.

use loom_graph::DEFAULT_MAX_VARIANTS;
use serde::Deserialize;

/// Generator-wide knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Cap on the keyword product of one pass.
    pub max_variants: usize,
    /// Emit `// ACTIVE FIELDS:` listings in the `Defines` fragment.
    pub debug_active_fields: bool,
    /// Prefix generated source with an auto-generated banner.
    pub header_comment: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_variants: DEFAULT_MAX_VARIANTS,
            debug_active_fields: false,
            header_comment: true,
        }
    }
}

impl GeneratorSettings {
    #[must_use]
    pub fn with_max_variants(mut self, max_variants: usize) -> Self {
        self.max_variants = max_variants;
        self
    }

    #[must_use]
    pub fn with_debug_active_fields(mut self, enabled: bool) -> Self {
        self.debug_active_fields = enabled;
        self
    }

    #[must_use]
    pub fn with_header_comment(mut self, enabled: bool) -> Self {
        self.header_comment = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_deserialize() {
        let settings: GeneratorSettings = serde_json::from_str(r#"{ "max_variants": 16 }"#).unwrap();
        assert_eq!(settings.max_variants, 16);
        assert!(settings.header_comment);
        assert!(!settings.debug_active_fields);
    }
}
