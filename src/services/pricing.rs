use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;

pub const METERS_PER_BLOCK: f64 = 100.0;

/// Billable blocks for a distance. Partial blocks count as whole ones.
pub fn blocks_for_distance(distance_meters: f64) -> u64 {
    (distance_meters.max(0.0) / METERS_PER_BLOCK).ceil() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub max_blocks: u64,
    pub price: u64,
}

/// Step function from block count to price, with a ceiling rate for
/// anything past the last tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    tiers: Vec<PriceTier>,
    fallback_price: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceTableFile {
    tiers: Vec<PriceTier>,
    fallback_price: u64,
}

impl PriceTable {
    pub fn new(tiers: Vec<PriceTier>, fallback_price: u64) -> Result<Self, ConfigError> {
        let last = tiers
            .last()
            .ok_or_else(|| ConfigError::PriceTable("no tiers configured".to_string()))?;
        if fallback_price < last.price {
            return Err(ConfigError::PriceTable(format!(
                "fallback price {} is below the last tier price {}",
                fallback_price, last.price
            )));
        }
        for pair in tiers.windows(2) {
            if pair[1].max_blocks <= pair[0].max_blocks {
                return Err(ConfigError::PriceTable(format!(
                    "tier maxBlocks must be strictly ascending ({} after {})",
                    pair[1].max_blocks, pair[0].max_blocks
                )));
            }
            if pair[1].price < pair[0].price {
                return Err(ConfigError::PriceTable(format!(
                    "tier prices must not decrease ({} after {})",
                    pair[1].price, pair[0].price
                )));
            }
        }
        Ok(PriceTable {
            tiers,
            fallback_price,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: PriceTableFile =
            serde_json::from_str(json).map_err(|e| ConfigError::PriceTable(e.to_string()))?;
        PriceTable::new(file.tiers, file.fallback_price)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::PriceTable(format!("cannot read {}: {}", path.display(), e))
        })?;
        PriceTable::from_json(&json)
    }

    pub fn price_for(&self, blocks: u64) -> u64 {
        self.tiers
            .iter()
            .find(|tier| tier.max_blocks >= blocks)
            .map_or(self.fallback_price, |tier| tier.price)
    }

    pub fn tiers(&self) -> &[PriceTier] {
        &self.tiers
    }

    pub fn fallback_price(&self) -> u64 {
        self.fallback_price
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        let tiers = [
            (5, 1800),
            (10, 2000),
            (15, 2500),
            (20, 2800),
            (25, 3000),
            (30, 3200),
            (35, 3500),
            (40, 3800),
            (45, 4000),
            (50, 4300),
            (55, 4600),
            (60, 4900),
        ]
        .into_iter()
        .map(|(max_blocks, price)| PriceTier { max_blocks, price })
        .collect();
        PriceTable {
            tiers,
            fallback_price: 5500,
        }
    }
}
