//! Stub provider for testing and offline mode

use async_trait::async_trait;
use product_scout_domain::{LlmProvider, Prompt, ProviderError, ProviderReply, TokenUsage};

/// Stub provider that returns configurable responses
pub struct StubProvider {
    response: Option<String>,
    error: Option<ProviderError>,
    model: String,
}

impl StubProvider {
    /// Create a stub that answers with a complete report built from the
    /// first line of the user prompt
    pub fn canned() -> Self {
        Self {
            response: None,
            error: None,
            model: "stub".to_string(),
        }
    }

    /// Create a stub that returns a specific raw text
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            error: None,
            model: "stub".to_string(),
        }
    }

    /// Create a stub that always returns an error
    pub fn with_error(error: ProviderError) -> Self {
        Self {
            response: None,
            error: Some(error),
            model: "stub".to_string(),
        }
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::canned()
    }
}

fn canned_report(product: &str) -> String {
    serde_json::json!({
        "productInfo": {
            "basic": {
                "fullName": product,
                "manufacturer": "Stub Manufacturer",
                "category": "Stub Category",
                "price": {"current": "9,800", "original": "12,800"},
                "releaseDate": "2024-01-01"
            },
            "goodPoints": [
                {"point": "Build quality", "description": format!("{} feels solid in the hand", product)},
                {"point": "Battery life", "description": "Lasts a full day of typical use"},
                {"point": "Value", "description": "Competitive price for the feature set"}
            ],
            "badPoints": [
                {"point": "Weight", "description": "Heavier than comparable models"},
                {"point": "Accessories", "description": "Charger sold separately"},
                {"point": "Availability", "description": "Limited color options"}
            ],
            "specifications": {
                "dimensions": "150 x 70 x 8 mm",
                "weight": "180 g",
                "materials": ["aluminium", "glass"],
                "standards": ["USB-C"],
                "additionalSpecs": {"source": "stub"}
            }
        }
    })
    .to_string()
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<ProviderReply, ProviderError> {
        if let Some(ref error) = self.error {
            return Err(error.clone());
        }

        let content = match &self.response {
            Some(response) => response.clone(),
            None => canned_report(prompt.user.lines().next().unwrap_or_default().trim()),
        };

        let prompt_tokens = ((prompt.system.len() + prompt.user.len()) / 4) as u64;
        let completion_tokens = (content.len() / 4) as u64;

        Ok(ProviderReply {
            content,
            usage: TokenUsage::new(prompt_tokens, completion_tokens),
            model: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt {
            system: "Return JSON".to_string(),
            user: "iPhone 15 Pro\n\nReference URLs:\nhttps://apple.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_canned_report_uses_query() {
        let reply = StubProvider::canned().complete(&prompt()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply.content).unwrap();

        assert_eq!(value["productInfo"]["basic"]["fullName"], "iPhone 15 Pro");
        assert_eq!(value["productInfo"]["goodPoints"].as_array().unwrap().len(), 3);
        assert!(reply.usage.total() > 0);
    }

    #[tokio::test]
    async fn test_with_error() {
        let stub = StubProvider::with_error(ProviderError::Timeout);
        assert_eq!(stub.complete(&prompt()).await.unwrap_err(), ProviderError::Timeout);
    }

    #[tokio::test]
    async fn test_with_response() {
        let stub = StubProvider::with_response("not json");
        assert_eq!(stub.complete(&prompt()).await.unwrap().content, "not json");
    }
}
