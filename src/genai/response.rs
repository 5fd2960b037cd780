use serde::Deserialize;

use crate::genai::provider::ProviderError;

/// Outcome of one `generateContent` call, before it is turned into a string.
pub type ProviderResult = Result<GenerateContentResponse, ProviderError>;

/// Response envelope. Every level is optional so a missing field surfaces as
/// [`ProviderError::MalformedResponse`] instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Entry of the provider's model listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == "generateContent")
    }
}

/// Text of `candidates[0].content.parts[0].text`.
pub fn reply_text(response: &GenerateContentResponse) -> Result<String, ProviderError> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| ProviderError::malformed("missing candidates[0]"))?;
    let content = candidate
        .content
        .as_ref()
        .ok_or_else(|| ProviderError::malformed("missing candidates[0].content"))?;
    let part = content
        .parts
        .first()
        .ok_or_else(|| ProviderError::malformed("missing candidates[0].content.parts[0]"))?;
    part.text
        .clone()
        .ok_or_else(|| ProviderError::malformed("missing candidates[0].content.parts[0].text"))
}

/// Projects a provider outcome onto display text. Never fails: errors become
/// `Error: ...` strings.
pub fn extract(result: ProviderResult) -> String {
    match result.and_then(|response| reply_text(&response)) {
        Ok(text) => text,
        Err(err) => format_error(&err),
    }
}

pub fn format_error(err: &ProviderError) -> String {
    format!("Error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn parse(body: &str) -> GenerateContentResponse {
        serde_json::from_str(body).expect("test body should be valid JSON")
    }

    #[test]
    fn extracts_first_candidate_text_unmodified() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"  Hi there!\n"},{"text":"ignored"}]}},{"content":{"parts":[{"text":"second"}]}}]}"#,
        );
        assert_eq!(extract(Ok(response)), "  Hi there!\n");
    }

    #[test]
    fn api_failure_mentions_status_and_body() {
        let text = extract(Err(ProviderError::Api {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "rate limited".to_string(),
        }));
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn missing_levels_are_reported_as_malformed() {
        let cases = [
            (r#"{}"#, "candidates[0]"),
            (r#"{"candidates":[{}]}"#, "candidates[0].content"),
            (r#"{"candidates":[{"content":{"parts":[]}}]}"#, "parts[0]"),
            (r#"{"candidates":[{"content":{"parts":[{"inline_data":{}}]}}]}"#, "parts[0].text"),
        ];
        for (body, path) in cases {
            let err = reply_text(&parse(body)).unwrap_err();
            assert!(matches!(err, ProviderError::MalformedResponse { .. }));
            let text = extract(Ok(parse(body)));
            assert!(text.starts_with("Error: malformed response"), "{text}");
            assert!(text.contains(path), "{text} should name {path}");
        }
    }

    #[test]
    fn model_info_filters_on_generate_content() {
        let list: ModelList = serde_json::from_str(
            r#"{"models":[
                {"name":"models/gemini-2.5-flash","supportedGenerationMethods":["generateContent","countTokens"]},
                {"name":"models/embedding-001","supportedGenerationMethods":["embedContent"]}
            ]}"#,
        )
        .expect("valid listing");
        let names: Vec<_> = list
            .models
            .iter()
            .filter(|model| model.supports_generate_content())
            .map(|model| model.name.as_str())
            .collect();
        assert_eq!(names, vec!["models/gemini-2.5-flash"]);
    }
}
