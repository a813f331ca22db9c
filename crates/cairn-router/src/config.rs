//! Router policy configuration (spec §4.4, validated per spec §7's `ConfigurationInvalid`).

/// Policy knobs for the ROUTE node. Re-clarification threshold `R` MUST be strictly less
/// than `similarity_threshold` `T` — "this prevents oscillation at the boundary" (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterConfig {
    pub similarity_threshold: f32,
    pub reclarify_threshold: f32,
    pub max_clarify: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            reclarify_threshold: 0.4,
            max_clarify: 2,
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> Result<(), cairn_error::Error> {
        if self.reclarify_threshold >= self.similarity_threshold {
            return Err(cairn_error::Error::ConfigurationInvalid(format!(
                "reclarify_threshold ({}) must be strictly less than similarity_threshold ({})",
                self.reclarify_threshold, self.similarity_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RouterConfig::default().validate().is_ok());
    }

    #[test]
    fn reclarify_at_or_above_similarity_is_invalid() {
        let cfg = RouterConfig { similarity_threshold: 0.5, reclarify_threshold: 0.5, max_clarify: 2 };
        assert!(cfg.validate().is_err());
    }
}
