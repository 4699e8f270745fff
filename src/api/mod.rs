//! Typed wrappers over [`Dispatcher::execute`], one per backend endpoint.
//!
//! Every wrapper differs only in path, method and body/response shape. None of
//! them touch entitlement state.

mod models;

pub use models::*;

use crate::dispatch::Dispatcher;
use crate::error::NetworkError;
use crate::types::UserId;

/// Backend endpoint paths.
pub mod endpoints {
    pub const LOGIN: &str = "/google_login";
    pub const CHAT: &str = "/get_gpt_response";
    pub const ANALYZE_IMAGE: &str = "/analyze_image";
    pub const EXAM_PREDICTION: &str = "/exam_prediction";
    pub const EXAM_LIMIT: &str = "/exam_prediction/check_limit";
    pub const EXAM_ANSWER: &str = "/generate_answer";
    pub const ESSAY: &str = "/generate_essay";
    pub const STUDY_GUIDE: &str = "/study_guide_module";
    pub const FLASHCARDS: &str = "/flashcards";
    pub const MATH: &str = "/math";
    pub const CODE: &str = "/code";
    pub const LEADERBOARD_SUBMIT: &str = "/leaderboard/submit";
    pub const LEADERBOARD_GLOBAL: &str = "/leaderboard/global";
}

impl Dispatcher {
    /// Exchanges a provider token for a durable backend user id. Unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn exchange_identity(
        &self,
        request: &LoginRequest,
    ) -> Result<LoginResponse, NetworkError> {
        self.post(endpoints::LOGIN, request, None).await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn chat(
        &self,
        user_id: &UserId,
        user_input: impl Into<String>,
    ) -> Result<ChatResponse, NetworkError> {
        let body = ChatRequest {
            user_input: user_input.into(),
        };
        self.post(endpoints::CHAT, &body, Some(user_id)).await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn analyze_image(
        &self,
        user_id: &UserId,
        request: &ImageAnalysisRequest,
    ) -> Result<ImageAnalysisResponse, NetworkError> {
        self.post(endpoints::ANALYZE_IMAGE, request, Some(user_id))
            .await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn predict_exam(
        &self,
        user_id: &UserId,
        request: &ExamPredictionRequest,
    ) -> Result<ExamPredictionResponse, NetworkError> {
        self.post(endpoints::EXAM_PREDICTION, request, Some(user_id))
            .await
    }

    /// Exam-prediction usage for the current period. Does not consume quota.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn check_exam_limit(
        &self,
        user_id: &UserId,
    ) -> Result<ExamLimitResponse, NetworkError> {
        self.get(endpoints::EXAM_LIMIT, Some(user_id)).await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn generate_exam_answer(
        &self,
        user_id: &UserId,
        request: &ExamAnswerRequest,
    ) -> Result<ExamAnswerResponse, NetworkError> {
        self.post(endpoints::EXAM_ANSWER, request, Some(user_id))
            .await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn generate_essay(
        &self,
        user_id: &UserId,
        settings: &EssaySettings,
    ) -> Result<EssayResponse, NetworkError> {
        self.post(endpoints::ESSAY, settings, Some(user_id)).await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn study_guide(
        &self,
        user_id: &UserId,
        conversation: impl Into<String>,
    ) -> Result<StudyGuideResponse, NetworkError> {
        let body = StudyGuideRequest {
            user_input: conversation.into(),
        };
        self.post(endpoints::STUDY_GUIDE, &body, Some(user_id))
            .await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn flashcards(
        &self,
        user_id: &UserId,
        topic: impl Into<String>,
    ) -> Result<FlashcardsResponse, NetworkError> {
        let body = MessageRequest {
            message: topic.into(),
        };
        self.post(endpoints::FLASHCARDS, &body, Some(user_id))
            .await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn solve_math(
        &self,
        user_id: &UserId,
        question: impl Into<String>,
    ) -> Result<SolutionResponse, NetworkError> {
        let body = MessageRequest {
            message: question.into(),
        };
        self.post(endpoints::MATH, &body, Some(user_id)).await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn code_help(
        &self,
        user_id: &UserId,
        prompt: impl Into<String>,
    ) -> Result<SolutionResponse, NetworkError> {
        let body = MessageRequest {
            message: prompt.into(),
        };
        self.post(endpoints::CODE, &body, Some(user_id)).await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn submit_leaderboard(
        &self,
        user_id: &UserId,
        submission: &LeaderboardSubmission,
    ) -> Result<LeaderboardSubmitResponse, NetworkError> {
        self.post(endpoints::LEADERBOARD_SUBMIT, submission, Some(user_id))
            .await
    }

    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport, status or decode failure.
    pub async fn leaderboard(&self, user_id: &UserId) -> Result<LeaderboardResponse, NetworkError> {
        self.get(endpoints::LEADERBOARD_GLOBAL, Some(user_id)).await
    }
}
