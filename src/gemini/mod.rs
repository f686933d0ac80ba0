//! Gemini integration for comment-insight analysis and script outlines.
//!
//! One structured-output call (title + comments → JSON matching a declared
//! schema) and one free-text call (keyword + context → markdown outline).

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Prompt size bound: only the first N comments are embedded (truncation,
/// not sampling).
const MAX_PROMPT_COMMENTS: usize = 40;

/// Returned instead of an empty outline when the service produces no text.
const OUTLINE_FALLBACK: &str = "목차 생성에 실패했습니다.";

/// Structured insight produced from a video's title and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: String,
    pub audience_reaction: String,
    pub top_keywords: Vec<String>,
    pub recommendations: Vec<RecommendedTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedTopic {
    pub keyword: String,
    pub description: String,
}

/// Client for the Gemini generateContent REST API.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Analyze a video's comments: sentiment, audience reaction, top
    /// keywords, and content-idea recommendations, all in Korean.
    ///
    /// The response must conform to the declared JSON schema; anything that
    /// doesn't decode surfaces as `MalformedResponse` — no reprompt.
    pub fn analyze(&self, title: &str, comments: &[String]) -> Result<AnalysisResult> {
        let prompt = build_analysis_prompt(title, comments);
        let config = json!({
            "responseMimeType": "application/json",
            "responseSchema": analysis_response_schema(),
        });
        let text = self.generate(&prompt, Some(config))?;
        parse_analysis(&text)
    }

    /// Generate a markdown script outline for a chosen recommendation
    /// keyword, grounded in the prior audience-reaction narrative.
    pub fn generate_outline(&self, keyword: &str, context: &str) -> Result<String> {
        let prompt = build_outline_prompt(keyword, context);
        let text = self.generate(&prompt, None)?;
        Ok(outline_or_fallback(text))
    }

    /// One generateContent round trip. Returns the candidate text, which may
    /// be empty; callers decide what empty means.
    fn generate(&self, prompt: &str, generation_config: Option<serde_json::Value>) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(Error::MissingCredential(
                "Gemini API key is missing. Set it in config or pass --gemini-api-key.".to_string(),
            ));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "sending generateContent request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(remote_error(status, &body));
        }

        let text = parse_generate_body(&body)?;
        debug!(chars = text.len(), "generateContent response received");
        Ok(text)
    }
}

// ── Prompts & schema ───────────────────────────────────────────────────────

fn build_analysis_prompt(title: &str, comments: &[String]) -> String {
    let comment_block = comments
        .iter()
        .take(MAX_PROMPT_COMMENTS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "다음 유튜브 영상의 제목과 댓글을 분석하여 시청자 반응을 요약하고 새로운 콘텐츠 아이디어를 제안해 주세요.\n\
         영상 제목: {title}\n\
         댓글 내용: {comment_block}\n\
         \n\
         **모든 응답은 반드시 한국어로 작성해 주세요.**\n\
         \n\
         다음 형식의 JSON으로 응답해 주세요:\n\
         - sentiment: 전체적인 시청자 분위기 (1문장)\n\
         - audienceReaction: 사람들이 왜 이 영상을 좋아하거나 싫어했는지에 대한 구체적인 분석 요약.\n\
         - topKeywords: 사용자들이 가장 많이 언급한 핵심 키워드/주제 5개 리스트.\n\
         - recommendations: 영상 제작을 추천하는 5개의 구체적인 주제/키워드. 각 항목은 'keyword'(키워드)와 'description'(추천 이유)을 포함해야 함."
    )
}

fn build_outline_prompt(keyword: &str, context: &str) -> String {
    format!(
        "다음 주제에 대해 전문적인 유튜브 대본 목차를 한국어로 작성해 주세요.\n\
         대상 주제: {keyword}\n\
         참고 배경(시청자 맥락): {context}\n\
         \n\
         **반드시 한국어로 작성해 주세요.**\n\
         \n\
         포함 내용:\n\
         1. 인트로/훅 (첫 5초, 시청자를 사로잡는 멘트)\n\
         2. 도입부 (영상 소개)\n\
         3. 본문 구성 (3~5개의 핵심 포인트)\n\
         4. 결론 및 행동 유도 (구독/좋아요 등)\n\
         \n\
         가독성이 좋게 마크다운(Markdown) 형식을 사용해 주세요. 임팩트 있고 간결하게 작성해 주세요."
    )
}

/// Declared output shape for the analysis call. Items of the
/// recommendations array require both sub-fields.
fn analysis_response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "sentiment": {"type": "STRING"},
            "audienceReaction": {"type": "STRING"},
            "topKeywords": {"type": "ARRAY", "items": {"type": "STRING"}},
            "recommendations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "keyword": {"type": "STRING"},
                        "description": {"type": "STRING"}
                    },
                    "required": ["keyword", "description"]
                }
            }
        },
        "required": ["sentiment", "audienceReaction", "topKeywords", "recommendations"]
    })
}

// ── Request/response types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ── Decoding ───────────────────────────────────────────────────────────────

/// Non-2xx responses carry a `{"error": {"message": ...}}` envelope; surface
/// the message verbatim when present.
fn remote_error(status: reqwest::StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => Error::RemoteApi(envelope.error.message),
        Err(_) => Error::RemoteApi(format!("Gemini API returned {status}")),
    }
}

/// Concatenate the first candidate's text parts. Missing candidates or
/// parts yield an empty string, not an error.
fn parse_generate_body(body: &str) -> Result<String> {
    let resp: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| Error::RemoteApi(format!("Unexpected response from Gemini API: {e}")))?;

    let text = resp
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    Ok(text)
}

fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    serde_json::from_str(text).map_err(|e| Error::MalformedResponse(e.to_string()))
}

fn outline_or_fallback(text: String) -> String {
    if text.trim().is_empty() {
        OUTLINE_FALLBACK.to_string()
    } else {
        text
    }
}
