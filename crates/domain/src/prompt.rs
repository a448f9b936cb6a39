//! Prompt construction for product analysis

use crate::model::{Prompt, NOT_AVAILABLE};

/// Build the system prompt. The provider must answer with a single JSON object
/// matching the report schema and nothing else.
pub fn build_system_prompt(reference_url_count: usize) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are a product information specialist. Based on the product name or description provided by the user, produce a detailed product report.\n\n");

    prompt.push_str("## Output Format\n");
    prompt.push_str("Respond with ONLY a JSON object (no markdown, no prose) with this structure:\n");
    prompt.push_str(
        r#"{
  "productInfo": {
    "basic": {
      "fullName": "full product name",
      "manufacturer": "manufacturer",
      "category": "category",
      "price": { "current": "current price", "original": "list price" },
      "releaseDate": "release date"
    },
    "goodPoints": [
      { "point": "short title", "description": "detailed explanation" }
    ],
    "badPoints": [
      { "point": "short title", "description": "detailed explanation" }
    ],
    "specifications": {
      "dimensions": "dimensions",
      "weight": "weight",
      "materials": ["material"],
      "powerSource": "power source",
      "standards": ["standard"],
      "warranty": "warranty",
      "additionalSpecs": { "spec name": "value" }
    },
    "metaInfo": {
      "extractionDate": "ISO 8601 date",
      "sourceUrls": ["reference URLs you actually used"]
    }
  }
}"#,
    );
    prompt.push_str("\n\n");

    prompt.push_str("## Rules\n");
    prompt.push_str("- List exactly 3 goodPoints and exactly 3 badPoints.\n");
    prompt.push_str(
        "- If information is scarce, answer from general knowledge but never state anything clearly wrong.\n",
    );
    prompt.push_str(&format!(
        "- If a field is unknown, leave it empty or write \"{}\".\n",
        NOT_AVAILABLE
    ));
    prompt.push_str(&format!(
        "- If the user provides several URLs, only use the first {} of them.\n",
        reference_url_count
    ));

    prompt
}

/// Build the user prompt: the query, followed by a delimited reference URL
/// section when `urls` is non-empty
pub fn build_user_prompt(query: &str, urls: &[String]) -> String {
    let mut prompt = query.to_string();

    if !urls.is_empty() {
        prompt.push_str("\n\nReference URLs:\n");
        prompt.push_str(&urls.join("\n"));
    }

    prompt
}

pub fn build_prompt(query: &str, urls: &[String], reference_url_count: usize) -> Prompt {
    Prompt {
        system: build_system_prompt(reference_url_count),
        user: build_user_prompt(query, urls),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_demands_json_only() {
        let prompt = build_system_prompt(4);
        assert!(prompt.contains("ONLY a JSON object"));
        assert!(prompt.contains("\"goodPoints\""));
        assert!(prompt.contains("first 4 of them"));
        assert!(prompt.contains(NOT_AVAILABLE));
    }

    #[test]
    fn test_user_prompt_without_urls_is_query() {
        assert_eq!(build_user_prompt("iPhone 15 Pro", &[]), "iPhone 15 Pro");
    }

    #[test]
    fn test_user_prompt_appends_reference_section() {
        let urls = vec!["https://a.example".to_string(), "https://b.example".to_string()];
        let prompt = build_user_prompt("compare https://a.example", &urls);
        assert_eq!(
            prompt,
            "compare https://a.example\n\nReference URLs:\nhttps://a.example\nhttps://b.example"
        );
    }
}
