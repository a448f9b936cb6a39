//! Static price table and cost estimation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::ProviderKind;

/// Relative price tier of a model variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Premium,
    Mid,
    Economy,
}

/// USD per 1K tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub tier: PriceTier,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl PriceRow {
    /// Negative prices are clamped to zero
    pub fn new(tier: PriceTier, input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            tier,
            input_per_1k: input_per_1k.max(0.0),
            output_per_1k: output_per_1k.max(0.0),
        }
    }

    /// Single rate for families without an input/output split
    pub fn blended(tier: PriceTier, per_1k: f64) -> Self {
        Self::new(tier, per_1k, per_1k)
    }
}

/// Estimated cost of one call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

/// Immutable per-provider price table. Unknown providers use the premium
/// (`openai`) row.
#[derive(Debug, Clone)]
pub struct PriceTable {
    rows: HashMap<String, PriceRow>,
    fallback: PriceRow,
}

impl Default for PriceTable {
    fn default() -> Self {
        let premium = PriceRow::new(PriceTier::Premium, 0.01, 0.03);
        let rows = HashMap::from([
            (ProviderKind::OpenAi.as_str().to_string(), premium),
            (
                ProviderKind::Gpt35.as_str().to_string(),
                PriceRow::new(PriceTier::Economy, 0.0005, 0.0015),
            ),
            (
                ProviderKind::ClaudeSonnet.as_str().to_string(),
                PriceRow::new(PriceTier::Mid, 0.003, 0.015),
            ),
            (
                ProviderKind::ClaudeHaiku.as_str().to_string(),
                PriceRow::new(PriceTier::Economy, 0.00025, 0.00125),
            ),
            (
                ProviderKind::Gemini.as_str().to_string(),
                PriceRow::blended(PriceTier::Mid, 0.0035),
            ),
            (
                ProviderKind::GeminiLight.as_str().to_string(),
                PriceRow::blended(PriceTier::Economy, 0.00035),
            ),
        ]);

        Self {
            rows,
            fallback: premium,
        }
    }
}

impl PriceTable {
    /// Replace or add a row
    pub fn with_row(mut self, provider: impl Into<String>, row: PriceRow) -> Self {
        let provider = provider.into();
        if provider == ProviderKind::OpenAi.as_str() {
            self.fallback = row;
        }
        self.rows.insert(provider, row);
        self
    }

    pub fn row(&self, provider: &str) -> PriceRow {
        self.rows.get(provider).copied().unwrap_or(self.fallback)
    }

    /// Estimate the cost of a call. Pure and deterministic; never negative.
    pub fn estimate(
        &self,
        provider: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> CostBreakdown {
        let row = self.row(provider);
        let input_cost = prompt_tokens as f64 / 1000.0 * row.input_per_1k;
        let output_cost = completion_tokens as f64 / 1000.0 * row.output_per_1k;

        CostBreakdown {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_providers_are_deterministic_and_non_negative() {
        let table = PriceTable::default();
        for kind in ProviderKind::ALL {
            let a = table.estimate(kind.as_str(), 1000, 1000);
            let b = table.estimate(kind.as_str(), 1000, 1000);
            assert_eq!(a, b);
            assert!(a.total_cost >= 0.0);
            assert!(a.total_cost > 0.0, "{kind} should have a price");
        }
    }

    #[test]
    fn test_unknown_provider_uses_premium_rate() {
        let table = PriceTable::default();
        let unknown = table.estimate("mystery-model", 1000, 1000);
        let openai = table.estimate("openai", 1000, 1000);
        assert_eq!(unknown, openai);
        assert!((unknown.total_cost - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_premium_costs_more_than_economy() {
        let table = PriceTable::default();
        let premium = table.estimate("openai", 1000, 1000).total_cost;
        let economy = table.estimate("gpt35", 1000, 1000).total_cost;
        assert!(premium > economy);
    }

    #[test]
    fn test_gemini_rate_is_blended() {
        let row = PriceTable::default().row("gemini");
        assert_eq!(row.input_per_1k, row.output_per_1k);
    }

    #[test]
    fn test_zero_tokens_cost_nothing() {
        let cost = PriceTable::default().estimate("gemini-light", 0, 0);
        assert_eq!(cost, CostBreakdown::default());
    }

    #[test]
    fn test_override_clamps_negative_prices() {
        let table =
            PriceTable::default().with_row("custom", PriceRow::new(PriceTier::Mid, -1.0, 0.002));
        let cost = table.estimate("custom", 1000, 1000);
        assert_eq!(cost.input_cost, 0.0);
        assert!((cost.output_cost - 0.002).abs() < 1e-12);
    }
}
