//! Request and response bodies for the ApexVision backend endpoints.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

// ── Identity exchange ──────────────────────────────────────────────

/// Body of `POST /google_login`.
///
/// `provider`, `email` and `name` are only sent for Apple-origin exchanges.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response of `POST /google_login`. A missing `user_id` means the exchange failed.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user_id: Option<String>,
}

// ── Chat ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    #[serde(rename = "userInput")]
    pub user_input: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub status: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    /// The assistant's reply, or the server-reported error message.
    ///
    /// # Errors
    ///
    /// Returns the message to show when `status` is not `"success"` or no reply came back.
    pub fn into_reply(self) -> Result<String, String> {
        match (self.status.as_str(), self.response) {
            ("success", Some(reply)) => Ok(reply),
            (status, _) => Err(self
                .error
                .unwrap_or_else(|| format!("Unexpected response status: {status}"))),
        }
    }
}

// ── Image analysis ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysisRequest {
    /// Data URL of the image (`data:image/jpeg;base64,...`).
    pub image: String,
    #[serde(rename = "useMathpix")]
    pub use_mathpix: bool,
}

impl ImageAnalysisRequest {
    /// Builds the request from raw JPEG bytes.
    #[must_use]
    pub fn from_jpeg(jpeg: &[u8], use_mathpix: bool) -> Self {
        Self {
            image: format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)),
            use_mathpix,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageAnalysisResponse {
    pub answer: String,
    #[serde(default)]
    pub error: Option<String>,
}

// ── Exam prediction ────────────────────────────────────────────────

/// One uploaded study material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMaterial {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPredictionRequest {
    pub course_name: String,
    pub professor_name: String,
    pub materials: Vec<CourseMaterial>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExamPredictionResponse {
    pub predictions: Vec<ExamPrediction>,
    pub course_name: String,
    pub professor_name: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamPrediction {
    pub question: String,
    pub topic: String,
    pub difficulty: String,
    pub reasoning: String,
    pub study_tips: String,
}

/// Response of `GET /exam_prediction/check_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExamLimitResponse {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamAnswerRequest {
    pub question: String,
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExamAnswerResponse {
    pub answer: String,
    pub question: String,
    pub topic: String,
}

// ── Essay writer ───────────────────────────────────────────────────

/// Options for `POST /generate_essay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EssaySettings {
    pub topic: String,
    pub word_count: u32,
    pub essay_type: String,
    pub academic_level: String,
    pub citation_style: String,
    pub tone: String,
    pub include_citations: bool,
    pub include_outline: bool,
}

impl Default for EssaySettings {
    fn default() -> Self {
        Self {
            topic: String::new(),
            word_count: 500,
            essay_type: "Argumentative".into(),
            academic_level: "High School".into(),
            citation_style: "MLA".into(),
            tone: "Formal".into(),
            include_citations: true,
            include_outline: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EssayResponse {
    /// Base64-encoded PDF.
    #[serde(rename = "pdfData")]
    pub pdf_data: String,
    pub title: String,
}

impl EssayResponse {
    /// Decodes the PDF, tolerating a `data:` URL prefix.
    ///
    /// # Errors
    ///
    /// Returns the base64 error if `pdfData` is not valid base64.
    pub fn pdf_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let encoded = match self.pdf_data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.pdf_data.as_str(),
        };
        STANDARD.decode(encoded.trim())
    }
}

// ── Study guide, flashcards, math, code ────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StudyGuideRequest {
    #[serde(rename = "userInput")]
    pub user_input: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudyGuideResponse {
    pub study_guide: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// `{message}` body shared by `/flashcards`, `/math` and `/code`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardsResponse {
    /// JSON array of cards, encoded as a string.
    pub flashcards: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl FlashcardsResponse {
    /// Parses the embedded card list.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `flashcards` is not an array of `{front, back}`.
    pub fn cards(&self) -> Result<Vec<Flashcard>, serde_json::Error> {
        serde_json::from_str(&self.flashcards)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// Response of `/math` and `/code`.
#[derive(Debug, Clone, Deserialize)]
pub struct SolutionResponse {
    pub solution: String,
    #[serde(default)]
    pub error: Option<String>,
}

// ── Leaderboard ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSubmission {
    pub streak: u32,
    pub daily_questions: u32,
    pub total_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardSubmitResponse {
    pub rank: u32,
    pub total_users: u32,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub user_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub streak: u32,
    pub daily_questions: u32,
    pub total_days: u32,
    pub score: u32,
    pub rank: u32,
}
