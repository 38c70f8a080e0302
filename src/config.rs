use crate::error::{GeoStatError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Linear rescale of population onto a marker-size range.
///
/// The defaults are calibrated to the 1990-2020 World Bank population table
/// (smallest: Tuvalu, largest: China) and must stay as they are for output to
/// match earlier runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescaleConfig {
    pub min_pop: f64,
    pub max_pop: f64,
    pub scale_range: f64,
    pub offset: f64,
}

impl Default for RescaleConfig {
    fn default() -> Self {
        Self {
            min_pop: 8913.0,
            max_pop: 1_397_715_000.0,
            scale_range: 120.0,
            offset: 10.0,
        }
    }
}

impl RescaleConfig {
    /// Read overrides from a JSON object; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GeoStatError::MissingFile(path.to_path_buf()));
        }
        let cfg: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_pop > self.min_pop) {
            return Err(GeoStatError::InvalidConfig(format!(
                "max_pop ({}) must exceed min_pop ({})",
                self.max_pop, self.min_pop
            )));
        }
        Ok(())
    }

    pub fn rescale(&self, pop: f64) -> f64 {
        ((pop - self.min_pop) * self.scale_range) / (self.max_pop - self.min_pop) + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rescale_endpoints() {
        let cfg = RescaleConfig::default();
        assert!((cfg.rescale(8913.0) - 10.0).abs() < 1e-12);
        assert!((cfg.rescale(1_397_715_000.0) - 130.0).abs() < 1e-9);
        assert!(cfg.rescale(1e6) < cfg.rescale(2e6));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("rescale.json");
        std::fs::write(&p, r#"{"offset": 0.0}"#).unwrap();
        let cfg = RescaleConfig::from_json_file(&p).unwrap();
        assert_eq!(cfg.offset, 0.0);
        assert_eq!(cfg.min_pop, 8913.0);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let cfg = RescaleConfig { min_pop: 10.0, max_pop: 10.0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(GeoStatError::InvalidConfig(_))));
    }
}
