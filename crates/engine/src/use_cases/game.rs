//! Game coordinator.
//!
//! Owns every live game and drives the four model-backed operations through
//! the `GameState` transitions. The session lock is only held while reading
//! or applying state. Play calls (scenario, choice, analysis) and coach calls
//! each allow one request in flight per game; an overlapping request of the
//! same kind is rejected. Different games never wait on each other.
//!
//! Games that go untouched for longer than the idle timeout are removed by
//! `sweep_idle`.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use trailwise_domain::{
    ChatMessage, Conversation, DomainError, EvaluationResult, GameId, GamePhase, GameState,
    ScenarioRequest, RETRY_CHOICE_ID,
};

use crate::infrastructure::ports::ClockPort;

use super::analysis::{AnalysisReporter, ANALYSIS_FAILED};
use super::coach::ChatCoach;
use super::evaluation::ChoiceEvaluator;
use super::scenario::ScenarioGenerator;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Game not found: {0}")]
    NotFound(GameId),
    #[error("Game {0} already has a request in progress")]
    Busy(GameId),
    #[error(transparent)]
    InvalidTransition(#[from] DomainError),
    #[error("Unknown choice: {0}")]
    UnknownChoice(String),
}

/// Result of `GameCoordinator::choose`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// `None` when the choice retried scenario generation instead of taking a turn.
    pub result: Option<EvaluationResult>,
    pub state: GameState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachReply {
    pub reply: String,
    pub conversation: Conversation,
}

struct GameSession {
    state: GameState,
    conversation: Conversation,
    last_request: Option<ScenarioRequest>,
    analysis: Option<String>,
}

impl GameSession {
    fn new() -> Self {
        Self {
            state: GameState::new(),
            conversation: Conversation::new(),
            last_request: None,
            analysis: None,
        }
    }
}

/// Idle timeout used unless `with_idle_timeout` overrides it.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

struct SessionSlot {
    session: Mutex<GameSession>,
    play: AtomicBool,
    chat: AtomicBool,
    /// Unix millis of the last request that touched this game.
    last_touched: AtomicI64,
}

impl SessionSlot {
    fn new(now_millis: i64) -> Self {
        Self {
            session: Mutex::new(GameSession::new()),
            play: AtomicBool::new(false),
            chat: AtomicBool::new(false),
            last_touched: AtomicI64::new(now_millis),
        }
    }

    fn claim_play(&self, id: GameId) -> Result<BusyGuard<'_>, GameError> {
        BusyGuard::claim(&self.play, id)
    }

    fn claim_chat(&self, id: GameId) -> Result<BusyGuard<'_>, GameError> {
        BusyGuard::claim(&self.chat, id)
    }

    fn in_flight(&self) -> bool {
        self.play.load(Ordering::Acquire) || self.chat.load(Ordering::Acquire)
    }

    fn touch(&self, now_millis: i64) {
        self.last_touched.fetch_max(now_millis, Ordering::AcqRel);
    }

    fn idle_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.last_touched.load(Ordering::Acquire))
    }
}

/// Clears the busy flag when the call settles, including on early return.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn claim(flag: &'a AtomicBool, id: GameId) -> Result<Self, GameError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GameError::Busy(id))?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct GameCoordinator {
    sessions: DashMap<GameId, Arc<SessionSlot>>,
    scenarios: ScenarioGenerator,
    evaluator: ChoiceEvaluator,
    reporter: AnalysisReporter,
    coach: ChatCoach,
    clock: Arc<dyn ClockPort>,
    idle_timeout_millis: i64,
}

impl GameCoordinator {
    pub fn new(
        scenarios: ScenarioGenerator,
        evaluator: ChoiceEvaluator,
        reporter: AnalysisReporter,
        coach: ChatCoach,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            scenarios,
            evaluator,
            reporter,
            coach,
            clock,
            idle_timeout_millis: duration_millis(DEFAULT_IDLE_TIMEOUT),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout_millis = duration_millis(idle_timeout);
        self
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn slot(&self, id: GameId) -> Result<Arc<SessionSlot>, GameError> {
        let slot = self
            .sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(GameError::NotFound(id))?;
        slot.touch(self.now_millis());
        Ok(slot)
    }

    /// Remove games idle for at least the idle timeout. Games with a call in
    /// flight are kept. Returns the number of games removed.
    pub fn sweep_idle(&self) -> usize {
        let now = self.now_millis();
        let before = self.sessions.len();
        self.sessions.retain(|id, slot| {
            let idle = slot.idle_millis(now);
            let keep = idle < self.idle_timeout_millis || slot.in_flight();
            if !keep {
                tracing::info!(game_id = %id, idle_ms = idle, "Expiring idle game");
            }
            keep
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Start a new game at the disclaimer.
    pub fn create_game(&self) -> GameId {
        let id = GameId::new();
        self.sessions.insert(id, Arc::new(SessionSlot::new(self.now_millis())));
        tracing::info!(game_id = %id, "Game created");
        id
    }

    /// Discard a game. In-flight calls finish against the detached session.
    pub fn end_game(&self, id: GameId) -> Result<(), GameError> {
        self.sessions.remove(&id).ok_or(GameError::NotFound(id))?;
        tracing::info!(game_id = %id, "Game ended");
        Ok(())
    }

    pub fn game_count(&self) -> usize {
        self.sessions.len()
    }

    pub async fn snapshot(&self, id: GameId) -> Result<GameState, GameError> {
        let slot = self.slot(id)?;
        let session = slot.session.lock().await;
        Ok(session.state.clone())
    }

    pub async fn conversation(&self, id: GameId) -> Result<Conversation, GameError> {
        let slot = self.slot(id)?;
        let session = slot.session.lock().await;
        Ok(session.conversation.clone())
    }

    pub async fn accept_disclaimer(&self, id: GameId) -> Result<GameState, GameError> {
        let slot = self.slot(id)?;
        let mut session = slot.session.lock().await;
        session.state.accept_disclaimer()?;
        Ok(session.state.clone())
    }

    /// Abandon the current run. Allowed while a call is in flight; its result
    /// is then rejected when it tries to apply.
    pub async fn return_to_menu(&self, id: GameId) -> Result<GameState, GameError> {
        let slot = self.slot(id)?;
        let mut session = slot.session.lock().await;
        session.state.return_to_menu()?;
        session.analysis = None;
        tracing::info!(game_id = %id, "Returned to menu");
        Ok(session.state.clone())
    }

    /// Generate a scenario and start playing it. The game always becomes
    /// playable, on the fallback scenario if generation failed.
    pub async fn start_scenario(
        &self,
        id: GameId,
        request: ScenarioRequest,
    ) -> Result<GameState, GameError> {
        let slot = self.slot(id)?;
        let _busy = slot.claim_play(id)?;

        {
            let mut session = slot.session.lock().await;
            session.state.begin_loading()?;
            session.analysis = None;
            session.last_request = Some(request.clone());
        }

        tracing::info!(
            game_id = %id,
            mode = %request.mode,
            difficulty = %request.difficulty,
            environment = %request.environment,
            "Starting scenario"
        );
        let scenario = self.scenarios.generate(&request).await;

        let mut session = slot.session.lock().await;
        session.state.scenario_loaded(scenario)?;
        Ok(session.state.clone())
    }

    /// Take the choice with `choice_id` in the current scenario.
    ///
    /// On the fallback scenario the retry choice regenerates the scenario from
    /// the last request instead of being evaluated.
    pub async fn choose(&self, id: GameId, choice_id: &str) -> Result<TurnOutcome, GameError> {
        let slot = self.slot(id)?;
        let _busy = slot.claim_play(id)?;

        let (scenario, scores, history, retry_request) = {
            let session = slot.session.lock().await;
            let state = &session.state;
            let scenario = match (state.phase(), state.current_scenario()) {
                (GamePhase::Playing, Some(scenario)) => scenario.clone(),
                (phase, _) => {
                    return Err(DomainError::invalid_state_transition(phase, "choose an action").into())
                }
            };

            let retry_request = if scenario.is_fallback() && choice_id == RETRY_CHOICE_ID {
                Some(
                    session
                        .last_request
                        .clone()
                        .ok_or_else(|| GameError::UnknownChoice(choice_id.to_string()))?,
                )
            } else {
                None
            };

            (scenario, *state.scores(), state.history().to_vec(), retry_request)
        };

        if let Some(request) = retry_request {
            tracing::info!(game_id = %id, "Retrying scenario generation");
            let scenario = self.scenarios.generate(&request).await;
            let mut session = slot.session.lock().await;
            session.state.replace_scenario(scenario)?;
            return Ok(TurnOutcome {
                result: None,
                state: session.state.clone(),
            });
        }

        let choice = scenario
            .find_choice(choice_id)
            .ok_or_else(|| GameError::UnknownChoice(choice_id.to_string()))?;

        let result = self
            .evaluator
            .evaluate(&scenario, &choice.text, &scores, &history)
            .await;

        let mut session = slot.session.lock().await;
        session.state.record_turn(choice.text.clone(), &result)?;
        if result.is_game_over {
            tracing::info!(
                game_id = %id,
                turns = session.state.total_turns(),
                reason = ?result.game_over_reason,
                "Game over"
            );
        }

        Ok(TurnOutcome {
            result: Some(result),
            state: session.state.clone(),
        })
    }

    /// The end-of-game report, generated once per finished run.
    pub async fn analysis(&self, id: GameId) -> Result<String, GameError> {
        let slot = self.slot(id)?;
        let _busy = slot.claim_play(id)?;

        let (history, scores) = {
            let session = slot.session.lock().await;
            let phase = session.state.phase();
            if phase != GamePhase::Summary {
                return Err(DomainError::invalid_state_transition(phase, "analyze the game").into());
            }
            if let Some(report) = &session.analysis {
                return Ok(report.clone());
            }
            (session.state.history().to_vec(), *session.state.scores())
        };

        let report = self.reporter.report(&history, &scores).await;

        let mut session = slot.session.lock().await;
        if report != ANALYSIS_FAILED && session.state.phase() == GamePhase::Summary {
            session.analysis = Some(report.clone());
        }
        Ok(report)
    }

    /// Send a message to the coach and return its reply with the conversation so far.
    pub async fn chat(&self, id: GameId, text: impl Into<String>) -> Result<CoachReply, GameError> {
        let slot = self.slot(id)?;
        let _busy = slot.claim_chat(id)?;

        let (messages, context): (Vec<ChatMessage>, String) = {
            let mut session = slot.session.lock().await;
            session.conversation.push(ChatMessage::user(text));
            (
                session.conversation.messages().to_vec(),
                session.state.coach_context(),
            )
        };

        let reply = self.coach.reply(&messages, &context).await;

        let mut session = slot.session.lock().await;
        session.conversation.push(ChatMessage::model(reply.clone()));
        Ok(CoachReply {
            reply,
            conversation: session.conversation.clone(),
        })
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use trailwise_domain::{GameMode, ScoreCategory, COACH_GREETING};

    use crate::infrastructure::clock::{FixedClock, ManualClock};
    use crate::infrastructure::ports::LlmPort;
    use crate::test_fixtures::llm_mocks::{
        GatedLlm, ScriptedLlm, ANALYSIS_MODEL, COACH_MODEL, DESERT_SCENARIO, EVALUATION_MODEL,
        HEATSTROKE_OUTCOME, SCENARIO_MODEL, SHADE_OUTCOME,
    };

    fn coordinator(llm: Arc<dyn LlmPort>) -> GameCoordinator {
        let clock = Arc::new(FixedClock(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()));
        coordinator_with_clock(llm, clock)
    }

    fn coordinator_with_clock(llm: Arc<dyn LlmPort>, clock: Arc<dyn ClockPort>) -> GameCoordinator {
        GameCoordinator::new(
            ScenarioGenerator::new(llm.clone(), clock.clone(), SCENARIO_MODEL),
            ChoiceEvaluator::new(llm.clone(), EVALUATION_MODEL),
            AnalysisReporter::new(llm.clone(), ANALYSIS_MODEL),
            ChatCoach::new(llm, COACH_MODEL),
            clock,
        )
    }

    fn start_time() -> chrono::DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn desert_request() -> ScenarioRequest {
        ScenarioRequest::new("Easy", "Desert", GameMode::HeatWave)
    }

    async fn playing_game(coordinator: &GameCoordinator) -> GameId {
        let id = coordinator.create_game();
        coordinator.accept_disclaimer(id).await.unwrap();
        coordinator.start_scenario(id, desert_request()).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_new_game_starts_at_disclaimer() {
        let coordinator = coordinator(Arc::new(ScriptedLlm::new()));
        let id = coordinator.create_game();

        let state = coordinator.snapshot(id).await.unwrap();
        assert_eq!(state.phase(), GamePhase::Disclaimer);

        let conversation = coordinator.conversation(id).await.unwrap();
        assert_eq!(conversation.messages(), &[ChatMessage::model(COACH_GREETING)]);
    }

    #[tokio::test]
    async fn test_start_scenario_moves_to_playing() {
        let llm = Arc::new(ScriptedLlm::new().reply(SCENARIO_MODEL, DESERT_SCENARIO));
        let coordinator = coordinator(llm);
        let id = coordinator.create_game();
        coordinator.accept_disclaimer(id).await.unwrap();

        let state = coordinator.start_scenario(id, desert_request()).await.unwrap();

        assert_eq!(state.phase(), GamePhase::Playing);
        let scenario = state.current_scenario().unwrap();
        assert_eq!(scenario.title, "Noon in the Wash");
        assert_eq!(scenario.turn_count, 1);
    }

    #[tokio::test]
    async fn test_start_scenario_requires_menu() {
        let coordinator = coordinator(Arc::new(ScriptedLlm::new()));
        let id = coordinator.create_game();

        let err = coordinator
            .start_scenario(id, desert_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_choose_applies_turn_and_advances() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .reply(SCENARIO_MODEL, DESERT_SCENARIO)
                .reply(EVALUATION_MODEL, SHADE_OUTCOME),
        );
        let coordinator = coordinator(llm.clone());
        let id = playing_game(&coordinator).await;

        let outcome = coordinator.choose(id, "a").await.unwrap();

        let result = outcome.result.unwrap();
        assert_eq!(result.outcome_text, "You wait out the heat under a ledge.");
        let state = outcome.state;
        assert_eq!(state.phase(), GamePhase::Playing);
        assert_eq!(state.total_turns(), 1);
        assert_eq!(state.scores().get(ScoreCategory::Weather), 3);
        assert_eq!(state.scores().get(ScoreCategory::Timing), -1);
        assert_eq!(state.history()[0].choice, "Rest in shade until evening");
        let scenario = state.current_scenario().unwrap();
        assert_eq!(scenario.description, "The sun is setting and the air is cooling.");
        assert_eq!(scenario.choices.len(), 1);
        assert_eq!(scenario.choices[0].text, "Hike out by headlamp");
        assert_eq!(scenario.turn_count, 2);

        let prompt = &llm.requests()[1].prompt;
        assert!(prompt.contains("\"Rest in shade until evening\""));
    }

    #[tokio::test]
    async fn test_continuation_without_choices_stays_playable() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .reply(SCENARIO_MODEL, DESERT_SCENARIO)
                .reply(
                    EVALUATION_MODEL,
                    r#"{"outcomeText": "You sit tight.", "isGameOver": false,
                        "nextScenarioDescription": "Night falls."}"#,
                ),
        );
        let coordinator = coordinator(llm);
        let id = playing_game(&coordinator).await;

        let outcome = coordinator.choose(id, "a").await.unwrap();

        assert_eq!(outcome.state.phase(), GamePhase::Playing);
        let scenario = outcome.state.current_scenario().unwrap();
        assert_eq!(scenario.description, "Night falls.");
        assert_eq!(scenario.turn_count, 2);
        let ids: Vec<&str> = scenario.choices.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        // The kept choices can still be played.
        let next = coordinator.choose(id, "b").await.unwrap();
        assert_eq!(next.state.total_turns(), 2);
    }

    #[tokio::test]
    async fn test_game_over_then_analysis_is_cached() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .reply(SCENARIO_MODEL, DESERT_SCENARIO)
                .reply(EVALUATION_MODEL, HEATSTROKE_OUTCOME)
                .reply(ANALYSIS_MODEL, "## Key Turning Points"),
        );
        let coordinator = coordinator(llm.clone());
        let id = playing_game(&coordinator).await;

        let outcome = coordinator.choose(id, "b").await.unwrap();
        assert_eq!(outcome.state.phase(), GamePhase::Summary);
        assert_eq!(outcome.state.game_over_reason(), Some("Heatstroke"));

        let first = coordinator.analysis(id).await.unwrap();
        let second = coordinator.analysis(id).await.unwrap();
        assert_eq!(first, "## Key Turning Points");
        assert_eq!(second, first);
        assert_eq!(llm.calls_to(ANALYSIS_MODEL), 1);
    }

    #[tokio::test]
    async fn test_failed_analysis_is_not_cached() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .reply(SCENARIO_MODEL, DESERT_SCENARIO)
                .reply(EVALUATION_MODEL, HEATSTROKE_OUTCOME),
        );
        let coordinator = coordinator(llm.clone());
        let id = playing_game(&coordinator).await;
        coordinator.choose(id, "b").await.unwrap();

        assert_eq!(coordinator.analysis(id).await.unwrap(), ANALYSIS_FAILED);
        assert_eq!(coordinator.analysis(id).await.unwrap(), ANALYSIS_FAILED);
        assert_eq!(llm.calls_to(ANALYSIS_MODEL), 2);
    }

    #[tokio::test]
    async fn test_analysis_requires_summary() {
        let llm = Arc::new(ScriptedLlm::new().reply(SCENARIO_MODEL, DESERT_SCENARIO));
        let coordinator = coordinator(llm);
        let id = playing_game(&coordinator).await;

        assert!(matches!(
            coordinator.analysis(id).await,
            Err(GameError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_choice_is_rejected_without_a_call() {
        let llm = Arc::new(ScriptedLlm::new().reply(SCENARIO_MODEL, DESERT_SCENARIO));
        let coordinator = coordinator(llm.clone());
        let id = playing_game(&coordinator).await;

        let err = coordinator.choose(id, "z").await.unwrap_err();

        assert!(matches!(err, GameError::UnknownChoice(ref c) if c == "z"));
        assert_eq!(llm.calls_to(EVALUATION_MODEL), 0);
        assert_eq!(coordinator.snapshot(id).await.unwrap().total_turns(), 0);
    }

    #[tokio::test]
    async fn test_retry_on_fallback_regenerates_scenario() {
        // First generation fails (prose reply), the retry succeeds.
        let llm = Arc::new(
            ScriptedLlm::new()
                .reply(SCENARIO_MODEL, "The ranger station is not responding.")
                .reply(SCENARIO_MODEL, DESERT_SCENARIO),
        );
        let coordinator = coordinator(llm.clone());
        let id = playing_game(&coordinator).await;

        let state = coordinator.snapshot(id).await.unwrap();
        assert!(state.current_scenario().unwrap().is_fallback());

        let outcome = coordinator.choose(id, RETRY_CHOICE_ID).await.unwrap();

        assert!(outcome.result.is_none());
        assert_eq!(outcome.state.total_turns(), 0);
        assert_eq!(outcome.state.current_scenario().unwrap().title, "Noon in the Wash");
        assert_eq!(llm.calls_to(SCENARIO_MODEL), 2);
        assert!(llm.requests()[1].prompt.contains("Heat Wave"));
    }

    #[tokio::test]
    async fn test_chat_appends_both_sides() {
        let llm = Arc::new(ScriptedLlm::new().reply(COACH_MODEL, "Drink before you are thirsty."));
        let coordinator = coordinator(llm.clone());
        let id = coordinator.create_game();

        let reply = coordinator.chat(id, "How much water?").await.unwrap();

        assert_eq!(reply.reply, "Drink before you are thirsty.");
        let messages = reply.conversation.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::user("How much water?"));
        assert_eq!(messages[2], ChatMessage::model("Drink before you are thirsty."));
        assert!(llm.requests()[0].prompt.contains("Game phase: disclaimer"));
    }

    #[tokio::test]
    async fn test_concurrent_call_on_same_game_is_busy() {
        let gated = Arc::new(GatedLlm::new("Stay put."));
        let coordinator = Arc::new(coordinator(gated.clone()));
        let id = coordinator.create_game();
        let other = coordinator.create_game();

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.chat(id, "first").await })
        };
        gated.started.notified().await;

        assert!(matches!(
            coordinator.chat(id, "second").await,
            Err(GameError::Busy(busy)) if busy == id
        ));
        // Reads are not blocked by the in-flight call.
        assert_eq!(
            coordinator.snapshot(id).await.unwrap().phase(),
            GamePhase::Disclaimer
        );
        assert!(coordinator.accept_disclaimer(other).await.is_ok());

        gated.release.notify_one();
        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.reply, "Stay put.");

        // The flag clears once the call settles.
        gated.release.notify_one();
        assert!(coordinator.chat(id, "third").await.is_ok());
    }

    #[tokio::test]
    async fn test_chat_is_allowed_while_turn_is_pending() {
        let gated = Arc::new(GatedLlm::new(SHADE_OUTCOME));
        let scripted = Arc::new(
            ScriptedLlm::new()
                .reply(SCENARIO_MODEL, DESERT_SCENARIO)
                .reply(COACH_MODEL, "Shade first, then water."),
        );
        let clock = Arc::new(FixedClock(start_time()));
        let coordinator = Arc::new(GameCoordinator::new(
            ScenarioGenerator::new(scripted.clone(), clock.clone(), SCENARIO_MODEL),
            ChoiceEvaluator::new(gated.clone(), EVALUATION_MODEL),
            AnalysisReporter::new(scripted.clone(), ANALYSIS_MODEL),
            ChatCoach::new(scripted, COACH_MODEL),
            clock,
        ));
        let id = playing_game(&coordinator).await;

        let turn = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.choose(id, "a").await })
        };
        gated.started.notified().await;

        let reply = coordinator.chat(id, "Should I rest?").await.unwrap();
        assert_eq!(reply.reply, "Shade first, then water.");
        assert!(matches!(
            coordinator.choose(id, "b").await,
            Err(GameError::Busy(busy)) if busy == id
        ));

        gated.release.notify_one();
        let outcome = turn.await.unwrap().unwrap();
        assert_eq!(outcome.state.total_turns(), 1);
        assert_eq!(coordinator.conversation(id).await.unwrap().messages().len(), 3);
    }

    #[tokio::test]
    async fn test_return_to_menu_discards_in_flight_turn() {
        let gated = Arc::new(GatedLlm::new(SHADE_OUTCOME));
        let scripted = Arc::new(ScriptedLlm::new().reply(SCENARIO_MODEL, DESERT_SCENARIO));
        let clock = Arc::new(FixedClock(start_time()));
        let coordinator = Arc::new(GameCoordinator::new(
            ScenarioGenerator::new(scripted, clock.clone(), SCENARIO_MODEL),
            ChoiceEvaluator::new(gated.clone(), EVALUATION_MODEL),
            AnalysisReporter::new(gated.clone(), ANALYSIS_MODEL),
            ChatCoach::new(gated.clone(), COACH_MODEL),
            clock,
        ));
        let id = playing_game(&coordinator).await;

        let turn = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.choose(id, "a").await })
        };
        gated.started.notified().await;

        let state = coordinator.return_to_menu(id).await.unwrap();
        assert_eq!(state.phase(), GamePhase::Menu);

        gated.release.notify_one();
        assert!(matches!(
            turn.await.unwrap(),
            Err(GameError::InvalidTransition(_))
        ));
        let state = coordinator.snapshot(id).await.unwrap();
        assert_eq!(state.phase(), GamePhase::Menu);
        assert!(state.history().is_empty());
    }

    #[tokio::test]
    async fn test_end_game_removes_session() {
        let coordinator = coordinator(Arc::new(ScriptedLlm::new()));
        let id = coordinator.create_game();

        coordinator.end_game(id).unwrap();

        assert_eq!(coordinator.game_count(), 0);
        assert!(matches!(coordinator.snapshot(id).await, Err(GameError::NotFound(_))));
        assert!(matches!(coordinator.end_game(id), Err(GameError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sweep_expires_only_idle_games() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let coordinator = coordinator_with_clock(Arc::new(ScriptedLlm::new()), clock.clone())
            .with_idle_timeout(Duration::from_secs(600));
        let stale = coordinator.create_game();
        let active = coordinator.create_game();

        clock.advance(chrono::Duration::seconds(400));
        assert_eq!(coordinator.sweep_idle(), 0);
        coordinator.snapshot(active).await.unwrap();

        clock.advance(chrono::Duration::seconds(300));
        assert_eq!(coordinator.sweep_idle(), 1);

        assert_eq!(coordinator.game_count(), 1);
        assert!(matches!(coordinator.snapshot(stale).await, Err(GameError::NotFound(_))));
        assert!(coordinator.snapshot(active).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_keeps_game_with_call_in_flight() {
        let gated = Arc::new(GatedLlm::new("Stay put."));
        let clock = Arc::new(ManualClock::new(start_time()));
        let coordinator = Arc::new(
            coordinator_with_clock(gated.clone(), clock.clone())
                .with_idle_timeout(Duration::from_secs(60)),
        );
        let id = coordinator.create_game();

        let chat = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.chat(id, "Still there?").await })
        };
        gated.started.notified().await;

        clock.advance(chrono::Duration::seconds(120));
        assert_eq!(coordinator.sweep_idle(), 0);

        gated.release.notify_one();
        chat.await.unwrap().unwrap();

        clock.advance(chrono::Duration::seconds(120));
        assert_eq!(coordinator.sweep_idle(), 1);
        assert_eq!(coordinator.game_count(), 0);
    }
}
