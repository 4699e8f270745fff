//! Process-wide entry point wiring sign-in, quota, dispatch and history together.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::RwLock;

use crate::api::{
    EssayResponse, EssaySettings, ExamAnswerRequest, ExamAnswerResponse, ExamLimitResponse,
    ExamPredictionRequest, ExamPredictionResponse, FlashcardsResponse, ImageAnalysisRequest,
    ImageAnalysisResponse, LeaderboardResponse, LeaderboardSubmitResponse, SolutionResponse,
    StudyGuideResponse,
};
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::entitlement::{EntitlementCache, UserDocumentStore};
use crate::error::{Error, NetworkError};
use crate::identity::{FederatedAuth, GoogleSignIn, IdentityBroker};
use crate::policy::{self, QuotaVerdict};
use crate::preferences::PreferenceStore;
use crate::session::{HistoryStore, JsonFileHistory, SessionStore};
use crate::stats::UserStats;
use crate::types::{Originator, UserId};

/// User-facing feature, used to key the latest error shown inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Chat,
    ImageAnalysis,
    ExamPrediction,
    ExamLimit,
    ExamAnswer,
    Essay,
    StudyGuide,
    Flashcards,
    Math,
    Code,
    Leaderboard,
}

impl Feature {
    /// Whether a successful call counts against the user's request quota.
    #[must_use]
    pub fn consumes_quota(self) -> bool {
        !matches!(self, Self::ExamLimit | Self::Leaderboard)
    }
}

/// Explicitly constructed services for one process.
///
/// Build once at startup and pass by reference to whatever needs it.
pub struct ApexClient<G, F, D> {
    config: ClientConfig,
    broker: IdentityBroker<G, F, D>,
    errors: RwLock<HashMap<Feature, String>>,
}

impl<G, F, D> ApexClient<G, F, D>
where
    G: GoogleSignIn,
    F: FederatedAuth,
    D: UserDocumentStore,
{
    #[must_use]
    pub fn new(config: ClientConfig, google: G, federated: F, documents: D) -> Self {
        let dispatcher = Dispatcher::new(config.base_url().clone());
        Self::with_dispatcher(config, dispatcher, google, federated, documents)
    }

    /// Same as [`new`](Self::new) with a caller-built dispatcher.
    #[must_use]
    pub fn with_dispatcher(
        config: ClientConfig,
        dispatcher: Dispatcher,
        google: G,
        federated: F,
        documents: D,
    ) -> Self {
        let entitlements = EntitlementCache::new(documents, config.default_free_requests());
        Self {
            broker: IdentityBroker::new(dispatcher, google, federated, entitlements),
            config,
            errors: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn broker(&self) -> &IdentityBroker<G, F, D> {
        &self.broker
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        self.broker.dispatcher()
    }

    #[must_use]
    pub fn entitlements(&self) -> &EntitlementCache<D> {
        self.broker.entitlements()
    }

    /// Chat history at the configured path.
    #[must_use]
    pub fn open_sessions(&self) -> SessionStore<JsonFileHistory> {
        SessionStore::open(JsonFileHistory::new(self.config.history_path()))
    }

    /// Preferences at the configured path.
    #[must_use]
    pub fn open_preferences(&self) -> PreferenceStore {
        PreferenceStore::open(self.config.preferences_path())
    }

    /// Verdict for the next request, computed from the current entitlement.
    #[must_use]
    pub fn verdict(&self) -> QuotaVerdict {
        policy::evaluate(&self.entitlements().snapshot())
    }

    #[must_use]
    pub fn can_make_request(&self) -> bool {
        self.verdict().allowed
    }

    #[must_use]
    pub fn is_mastermind(&self) -> bool {
        policy::is_mastermind(&self.entitlements().snapshot().tier)
    }

    /// Latest error message for `feature`, cleared by its next success.
    #[must_use]
    pub fn last_error(&self, feature: Feature) -> Option<String> {
        self.errors.read().get(&feature).cloned()
    }

    fn record_error(&self, feature: Feature, message: String) {
        tracing::warn!(?feature, error = %message, "Feature call failed");
        self.errors.write().insert(feature, message);
    }

    /// Admits a call for `feature`: a signed-in user, and quota left if the
    /// feature consumes it. Refusals are recorded as the feature's error.
    fn admit(&self, feature: Feature) -> Result<UserId, Error> {
        let admitted = match self.broker.user_id() {
            None => Err(Error::NotAuthenticated),
            Some(user_id) if feature.consumes_quota() => {
                let verdict = self.verdict();
                if verdict.allowed {
                    Ok(user_id)
                } else {
                    Err(Error::QuotaExceeded(verdict))
                }
            }
            Some(user_id) => Ok(user_id),
        };
        admitted.inspect_err(|e| self.record_error(feature, e.to_string()))
    }

    /// Gate, dispatch, then refresh: the path every feature call takes.
    async fn run<T, Fut>(
        &self,
        feature: Feature,
        call: impl FnOnce(UserId) -> Fut,
    ) -> Result<T, Error>
    where
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        let user_id = self.admit(feature)?;
        self.dispatch(feature, call(user_id)).await
    }

    async fn dispatch<T>(
        &self,
        feature: Feature,
        call: impl Future<Output = Result<T, NetworkError>>,
    ) -> Result<T, Error> {
        match call.await {
            Ok(value) => {
                self.errors.write().remove(&feature);
                if feature.consumes_quota() {
                    self.broker.refresh_entitlements().await;
                }
                Ok(value)
            }
            Err(e) => {
                self.record_error(feature, e.to_string());
                Err(e.into())
            }
        }
    }

    // ── Features ──────────────────────────────────────────────────

    /// Sends `text` in the current session and records the reply.
    ///
    /// The user turn is appended before dispatch. On failure an assistant turn
    /// `"Error: ..."` is appended instead of a reply. Persistence failures are
    /// logged by the store and do not fail the call.
    ///
    /// Streaks are not tracked here: the caller owns its [`UserStats`] and
    /// calls [`UserStats::record_question`] after a successful reply.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthenticated`], [`Error::QuotaExceeded`] (nothing appended),
    /// [`Error::Network`], or [`Error::Backend`] when the payload reports an error.
    pub async fn send_chat<H: HistoryStore>(
        &self,
        sessions: &mut SessionStore<H>,
        text: impl Into<String>,
    ) -> Result<String, Error> {
        let text = text.into();
        let user_id = self.admit(Feature::Chat)?;

        sessions.append_turn(text.clone(), Originator::User).ok();

        let outcome = self
            .dispatch(Feature::Chat, self.dispatcher().chat(&user_id, text))
            .await
            .and_then(|response| response.into_reply().map_err(Error::Backend));

        match outcome {
            Ok(reply) => {
                sessions.append_turn(reply.clone(), Originator::Assistant).ok();
                Ok(reply)
            }
            Err(e) => {
                if let Error::Backend(message) = &e {
                    self.record_error(Feature::Chat, message.clone());
                }
                sessions
                    .append_turn(format!("Error: {e}"), Originator::Assistant)
                    .ok();
                Err(e)
            }
        }
    }

    /// Mathpix is only honoured for mastermind plans; otherwise the flag is cleared.
    ///
    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn analyze_image(
        &self,
        mut request: ImageAnalysisRequest,
    ) -> Result<ImageAnalysisResponse, Error> {
        request.use_mathpix &= self.is_mastermind();
        self.run(Feature::ImageAnalysis, |user| async move {
            self.dispatcher().analyze_image(&user, &request).await
        })
        .await
    }

    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn predict_exam(
        &self,
        request: &ExamPredictionRequest,
    ) -> Result<ExamPredictionResponse, Error> {
        self.run(Feature::ExamPrediction, |user| async move {
            self.dispatcher().predict_exam(&user, request).await
        })
        .await
    }

    /// Does not consume quota.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthenticated`] or [`Error::Network`].
    pub async fn check_exam_limit(&self) -> Result<ExamLimitResponse, Error> {
        self.run(Feature::ExamLimit, |user| async move {
            self.dispatcher().check_exam_limit(&user).await
        })
        .await
    }

    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn generate_exam_answer(
        &self,
        request: &ExamAnswerRequest,
    ) -> Result<ExamAnswerResponse, Error> {
        self.run(Feature::ExamAnswer, |user| async move {
            self.dispatcher().generate_exam_answer(&user, request).await
        })
        .await
    }

    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn generate_essay(&self, settings: &EssaySettings) -> Result<EssayResponse, Error> {
        self.run(Feature::Essay, |user| async move {
            self.dispatcher().generate_essay(&user, settings).await
        })
        .await
    }

    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn study_guide(
        &self,
        conversation: impl Into<String>,
    ) -> Result<StudyGuideResponse, Error> {
        let conversation = conversation.into();
        self.run(Feature::StudyGuide, |user| async move {
            self.dispatcher().study_guide(&user, conversation).await
        })
        .await
    }

    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn flashcards(&self, topic: impl Into<String>) -> Result<FlashcardsResponse, Error> {
        let topic = topic.into();
        self.run(Feature::Flashcards, |user| async move {
            self.dispatcher().flashcards(&user, topic).await
        })
        .await
    }

    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn solve_math(&self, question: impl Into<String>) -> Result<SolutionResponse, Error> {
        let question = question.into();
        self.run(Feature::Math, |user| async move {
            self.dispatcher().solve_math(&user, question).await
        })
        .await
    }

    /// # Errors
    ///
    /// See [`send_chat`](Self::send_chat).
    pub async fn code_help(&self, prompt: impl Into<String>) -> Result<SolutionResponse, Error> {
        let prompt = prompt.into();
        self.run(Feature::Code, |user| async move {
            self.dispatcher().code_help(&user, prompt).await
        })
        .await
    }

    /// Submits the local streak. Does not consume quota.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthenticated`] or [`Error::Network`].
    pub async fn submit_leaderboard(
        &self,
        stats: &UserStats,
    ) -> Result<LeaderboardSubmitResponse, Error> {
        let submission = stats.submission();
        self.run(Feature::Leaderboard, |user| async move {
            self.dispatcher()
                .submit_leaderboard(&user, &submission)
                .await
        })
        .await
    }

    /// # Errors
    ///
    /// [`Error::NotAuthenticated`] or [`Error::Network`].
    pub async fn leaderboard(&self) -> Result<LeaderboardResponse, Error> {
        self.run(Feature::Leaderboard, |user| async move {
            self.dispatcher().leaderboard(&user).await
        })
        .await
    }
}
