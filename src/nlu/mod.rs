//! Language-understanding collaborator boundary.
//!
//! The conversation service's JSON is decoded exactly once, here, into a
//! typed [`RecognizedIntent`]; nothing downstream ever touches raw JSON.

use crate::catalog::filter::parse_price;
use crate::config::NluConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const API_VERSION: &str = "2022-10-01-preview";

// ── Typed result ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ShowAll,
    FilterByBrand,
    FilterByPrice,
    ContinueOrExit,
    Unrecognized,
}

impl Intent {
    fn from_category(category: &str) -> Self {
        match category {
            "ShowAllShoes" => Intent::ShowAll,
            "FilterByBrand" => Intent::FilterByBrand,
            "FilterByPrice" => Intent::FilterByPrice,
            "ContinueOrExit" => Intent::ContinueOrExit,
            _ => Intent::Unrecognized,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntentEntity {
    pub category: String,
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct RecognizedIntent {
    pub intent: Intent,
    pub confidence: f64,
    pub entities: Vec<IntentEntity>,
}

impl RecognizedIntent {
    pub fn unrecognized() -> Self {
        Self {
            intent: Intent::Unrecognized,
            confidence: 0.0,
            entities: Vec::new(),
        }
    }

    /// First non-empty brand entity, if any.
    pub fn brand(&self) -> Option<String> {
        self.entities
            .iter()
            .filter(|e| e.category.eq_ignore_ascii_case("brand"))
            .map(|e| e.text.trim())
            .find(|t| !t.is_empty())
            .map(String::from)
    }

    /// Map price entities plus their operator token to bounds.
    ///
    /// "sotto"/"meno di" bound from above, "sopra"/"più di" from below,
    /// "tra" with two numbers gives both bounds; a bare number is read as a
    /// ceiling, which is how people quote budgets.
    pub fn price_range(&self) -> (Option<f64>, Option<f64>) {
        let prices: Vec<f64> = self
            .entities
            .iter()
            .filter(|e| {
                e.category.eq_ignore_ascii_case("number")
                    || e.category.eq_ignore_ascii_case("price")
            })
            .filter_map(|e| parse_price(&e.text))
            .collect();

        if prices.is_empty() {
            return (None, None);
        }

        let operator = self
            .entities
            .iter()
            .find(|e| e.category.eq_ignore_ascii_case("priceOperator"))
            .map(|e| e.text.trim().to_lowercase())
            .unwrap_or_default();

        match operator.as_str() {
            "sotto" | "meno di" => (None, Some(prices[0])),
            "sopra" | "più di" => (Some(prices[0]), None),
            "tra" if prices.len() >= 2 => {
                let lo = prices[0].min(prices[1]);
                let hi = prices[0].max(prices[1]);
                (Some(lo), Some(hi))
            }
            _ => (None, Some(prices[0])),
        }
    }
}

// ── Recognizer contract ───────────────────────────────────────────────────────

#[async_trait]
pub trait IntentRecognizer: Send + Sync {
    /// Precondition gate: the dialog refuses to start against an
    /// unconfigured recognizer.
    fn is_configured(&self) -> bool;

    async fn recognize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<RecognizedIntent>;
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    result: AnalyzeResult,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    prediction: Prediction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    top_intent: String,
    #[serde(default)]
    intents: Vec<WireIntent>,
    #[serde(default)]
    entities: Vec<WireEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIntent {
    category: String,
    #[serde(default)]
    confidence_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntity {
    category: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence_score: f64,
}

impl From<Prediction> for RecognizedIntent {
    fn from(p: Prediction) -> Self {
        if p.top_intent.is_empty() {
            return Self::unrecognized();
        }

        let confidence = p
            .intents
            .iter()
            .find(|i| i.category == p.top_intent)
            .map(|i| i.confidence_score)
            .unwrap_or(0.0);

        Self {
            intent: Intent::from_category(&p.top_intent),
            confidence,
            entities: p
                .entities
                .into_iter()
                .map(|e| IntentEntity {
                    category: e.category,
                    text: e.text,
                    confidence: e.confidence_score,
                })
                .collect(),
        }
    }
}

// ── HTTP recognizer ───────────────────────────────────────────────────────────

pub struct CluRecognizer {
    client: reqwest::Client,
    config: NluConfig,
}

impl CluRecognizer {
    pub fn new(config: &NluConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Nlu(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/language/:analyze-conversations?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            API_VERSION
        )
    }
}

#[async_trait]
impl IntentRecognizer for CluRecognizer {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn recognize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<RecognizedIntent> {
        if !self.is_configured() {
            return Err(Error::Configuration(
                "language service is not configured".into(),
            ));
        }

        let body = serde_json::json!({
            "kind": "Conversation",
            "analysisInput": {
                "conversationItem": {
                    "id": "1",
                    "text": text,
                    "modality": "text",
                    "language": self.config.language,
                    "participantId": "user",
                }
            },
            "parameters": {
                "projectName": self.config.project_name,
                "deploymentName": self.config.deployment_name,
                "verbose": true,
                "stringIndexType": "TextElement_V8",
            }
        });

        let request = self
            .client
            .post(self.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
            .json(&body)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            resp = request => resp.map_err(|e| Error::Nlu(format!("request failed: {}", e)))?,
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let snippet: String = detail.chars().take(200).collect();
            return Err(Error::Nlu(format!("HTTP {}: {}", status, snippet)));
        }

        let decoded: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| Error::Nlu(format!("malformed response: {}", e)))?;

        let recognized: RecognizedIntent = decoded.result.prediction.into();
        debug!(
            "Recognized intent {:?} (confidence {:.2}, {} entities)",
            recognized.intent,
            recognized.confidence,
            recognized.entities.len()
        );
        Ok(recognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(category: &str, text: &str) -> IntentEntity {
        IntentEntity {
            category: category.to_string(),
            text: text.to_string(),
            confidence: 1.0,
        }
    }

    #[test]
    fn wire_response_decodes_into_typed_intent() {
        let json = r#"{
            "kind": "ConversationResult",
            "result": {
                "query": "Mostrami le Nike",
                "prediction": {
                    "topIntent": "FilterByBrand",
                    "projectKind": "Conversation",
                    "intents": [
                        {"category": "FilterByBrand", "confidenceScore": 0.93},
                        {"category": "ShowAllShoes", "confidenceScore": 0.41}
                    ],
                    "entities": [
                        {"category": "Brand", "text": "Nike", "offset": 12, "length": 4, "confidenceScore": 0.99}
                    ]
                }
            }
        }"#;

        let decoded: AnalyzeResponse = serde_json::from_str(json).unwrap();
        let recognized: RecognizedIntent = decoded.result.prediction.into();

        assert_eq!(recognized.intent, Intent::FilterByBrand);
        assert!((recognized.confidence - 0.93).abs() < 1e-9);
        assert_eq!(recognized.brand().as_deref(), Some("Nike"));
    }

    #[test]
    fn unknown_top_intent_maps_to_unrecognized() {
        assert_eq!(Intent::from_category("OrderPizza"), Intent::Unrecognized);
        assert_eq!(Intent::from_category(""), Intent::Unrecognized);
    }

    #[test]
    fn price_range_honours_operator_tokens() {
        let below = RecognizedIntent {
            intent: Intent::FilterByPrice,
            confidence: 0.9,
            entities: vec![entity("priceOperator", "sotto"), entity("number", "200")],
        };
        assert_eq!(below.price_range(), (None, Some(200.0)));

        let above = RecognizedIntent {
            intent: Intent::FilterByPrice,
            confidence: 0.9,
            entities: vec![entity("priceOperator", "più di"), entity("number", "150")],
        };
        assert_eq!(above.price_range(), (Some(150.0), None));

        let between = RecognizedIntent {
            intent: Intent::FilterByPrice,
            confidence: 0.9,
            entities: vec![
                entity("priceOperator", "tra"),
                entity("number", "300"),
                entity("number", "100"),
            ],
        };
        assert_eq!(between.price_range(), (Some(100.0), Some(300.0)));
    }

    #[test]
    fn bare_price_reads_as_a_ceiling() {
        let bare = RecognizedIntent {
            intent: Intent::FilterByPrice,
            confidence: 0.9,
            entities: vec![entity("number", "120€")],
        };
        assert_eq!(bare.price_range(), (None, Some(120.0)));
    }

    #[test]
    fn missing_entities_yield_no_bounds_and_no_brand() {
        let empty = RecognizedIntent::unrecognized();
        assert_eq!(empty.price_range(), (None, None));
        assert!(empty.brand().is_none());

        let blank_brand = RecognizedIntent {
            intent: Intent::FilterByBrand,
            confidence: 0.9,
            entities: vec![entity("Brand", "   ")],
        };
        assert!(blank_brand.brand().is_none());
    }
}
