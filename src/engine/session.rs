//! Runtime driver for a single play session.
//!
//! A session owns a working copy of the player's record, a matcher-equipped
//! snapshot of its task list, and the round clock. UI intents and clock
//! signals are funneled into one event loop, so answers, replays, ticks, and
//! the deadline are all handled on a single logical thread. Progress is
//! persisted after every answered round, before the next round renders, so a
//! crash can lose at most one round.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::GameConfiguration,
    dao::{
        models::{AnswerEntity, PlayerEntity, TaskEntity},
        player_store::PlayerStore,
    },
    engine::{
        PhaseSnapshot, SharedState,
        clock::{ClockSignal, RoundClock},
        dispatcher::{Dispatcher, Intent, IntentTopic},
        matcher::AnswerMatcher,
        state_machine::{SessionEvent, SessionStateMachine},
    },
    error::ServiceError,
    services::sse_events,
};

/// Identity produced by the registration phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Display name, already trimmed and non-empty.
    pub name: String,
    /// Email as submitted; canonicalized by the store on every access.
    pub email: String,
}

/// One playable round: the immutable task plus its session-local matcher.
struct Round {
    task: TaskEntity,
    matcher: AnswerMatcher,
}

/// Final state of a finished session, handed to the result phase.
pub struct SessionOutcome {
    /// The player record as of session end.
    pub record: PlayerEntity,
    /// Resume cursor the session started from.
    pub start_index: usize,
    /// Score the player carried into the session; `None` for a fresh record.
    pub prev_score: Option<u32>,
}

enum Command {
    Intent(Intent),
    Clock(ClockSignal),
}

/// A single Registration→Play→Ended cycle for one player.
pub struct PlaySession {
    id: Uuid,
    config: GameConfiguration,
    record: PlayerEntity,
    rounds: Vec<Round>,
    current_round: usize,
    start_index: usize,
    prev_score: Option<u32>,
    machine: SessionStateMachine,
}

impl PlaySession {
    /// Seed a session for `profile` from the store.
    ///
    /// An existing record is resumed in place: its task list and answer log
    /// win over the freshly shuffled `tasks`, and its score is remembered as
    /// `prev_score` so the result phase can show the session delta. Unknown
    /// identities get a new record built from `tasks`.
    pub async fn start(
        store: &Arc<dyn PlayerStore>,
        profile: UserProfile,
        config: GameConfiguration,
        tasks: Vec<TaskEntity>,
    ) -> Result<Self, ServiceError> {
        let (record, prev_score) = match store.find(profile.email.clone()).await? {
            Some(record) => {
                let carried = record.score;
                (record, Some(carried))
            }
            None => (
                store
                    .initialize(profile.name, profile.email, tasks)
                    .await?,
                None,
            ),
        };

        let rounds = record
            .tasks
            .iter()
            .cloned()
            .map(|task| Round {
                matcher: AnswerMatcher::new(&task.right_answer),
                task,
            })
            .collect::<Vec<_>>();

        let start_index = record.answers.len();
        let mut machine = SessionStateMachine::new();
        machine.apply(SessionEvent::Registered {
            resume_index: start_index,
        })?;

        Ok(Self {
            id: Uuid::new_v4(),
            config,
            record,
            rounds,
            current_round: start_index,
            start_index,
            prev_score,
            machine,
        })
    }

    /// Resume cursor this session starts from.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Score carried into the session, when resuming an existing record.
    pub fn prev_score(&self) -> Option<u32> {
        self.prev_score
    }

    /// Drive the session until every round is answered, the clock expires, or
    /// an end intent arrives. Resolves exactly once with the final record.
    pub async fn run(mut self, state: &SharedState) -> Result<SessionOutcome, ServiceError> {
        let store = state.require_player_store().await?;
        let dispatcher = state.dispatcher();

        let (intent_tx, mut intents) = mpsc::unbounded_channel();
        let (clock_tx, mut clock_signals) = mpsc::unbounded_channel();
        let mut clock = RoundClock::new(self.config.round_time, clock_tx);

        info!(
            session = %self.id,
            email = %self.record.email,
            rounds = self.rounds.len(),
            resume = self.start_index,
            "session started"
        );

        attach_forwarder(dispatcher, IntentTopic::End, &intent_tx);
        self.publish_phase(state).await;

        let mut ended = self.render_round(state, &intent_tx, &mut clock).await?;
        while !ended {
            let command = tokio::select! {
                intent = intents.recv() => intent.map(Command::Intent),
                signal = clock_signals.recv() => signal.map(Command::Clock),
            };
            let Some(command) = command else { break };

            ended = match command {
                Command::Intent(Intent::Answer { text }) => {
                    self.handle_answer(state, &store, &intent_tx, &mut clock, text)
                        .await?
                }
                Command::Intent(Intent::Replay) => {
                    sse_events::broadcast_round_replay(
                        state,
                        &self.rounds[self.current_round].task.prompt,
                    );
                    false
                }
                Command::Intent(Intent::End) => {
                    info!(session = %self.id, "session ended by intent");
                    self.machine.apply(SessionEvent::Abort)?;
                    true
                }
                Command::Intent(other) => {
                    debug!(session = %self.id, intent = ?other, "ignoring unexpected intent");
                    false
                }
                Command::Clock(ClockSignal::Tick { remaining_secs }) => {
                    sse_events::broadcast_clock_tick(state, remaining_secs);
                    false
                }
                Command::Clock(ClockSignal::Deadline) => {
                    info!(session = %self.id, "round clock expired; ending session");
                    self.machine.apply(SessionEvent::Deadline)?;
                    true
                }
            };
        }

        self.finish(state, &mut clock).await;

        Ok(SessionOutcome {
            record: self.record,
            start_index: self.start_index,
            prev_score: self.prev_score,
        })
    }

    /// Present the round under the cursor, or end the session when the round
    /// list is exhausted. Returns whether the session ended.
    async fn render_round(
        &mut self,
        state: &SharedState,
        intent_tx: &mpsc::UnboundedSender<Intent>,
        clock: &mut RoundClock,
    ) -> Result<bool, ServiceError> {
        if self.current_round == self.rounds.len() {
            self.machine.apply(SessionEvent::Complete)?;
            return Ok(true);
        }

        let round = &self.rounds[self.current_round];
        sse_events::broadcast_round_presented(
            state,
            self.id,
            self.current_round,
            self.rounds.len(),
            &round.task.prompt,
        );

        let dispatcher = state.dispatcher();
        attach_forwarder(dispatcher, IntentTopic::Answer, intent_tx);
        attach_forwarder(dispatcher, IntentTopic::Replay, intent_tx);
        clock.start();
        self.publish_phase(state).await;

        Ok(false)
    }

    /// Evaluate an answer for the current round, persist progress, and render
    /// the next round. Returns whether the session ended.
    async fn handle_answer(
        &mut self,
        state: &SharedState,
        store: &Arc<dyn PlayerStore>,
        intent_tx: &mpsc::UnboundedSender<Intent>,
        clock: &mut RoundClock,
        text: String,
    ) -> Result<bool, ServiceError> {
        // No intents are accepted for this round while it is being scored.
        let dispatcher = state.dispatcher();
        dispatcher.detach(IntentTopic::Answer);
        dispatcher.detach(IntentTopic::Replay);

        let text = text.trim();
        let round = &self.rounds[self.current_round];
        let accepted = !text.is_empty()
            && round
                .matcher
                .score(text)
                .iter()
                .any(|(similarity, _)| *similarity >= self.config.error_sensitivity);

        self.record.answers.push(AnswerEntity {
            user_input: (!text.is_empty()).then(|| text.to_string()),
            is_right: accepted,
        });

        let points = if accepted { round.task.factor } else { 0 };
        self.record.score += points;
        self.current_round += 1;
        self.machine.apply(SessionEvent::Advance)?;

        info!(
            session = %self.id,
            round = self.current_round - 1,
            accepted,
            points,
            score = self.record.score,
            "answer evaluated"
        );

        // Persist before the next round renders; a crash from here on loses
        // at most the round currently being played.
        let saved = store
            .save_progress(
                self.record.email.clone(),
                self.record.score,
                self.record.answers.clone(),
            )
            .await?;
        self.record.updated_at = saved.updated_at;

        self.render_round(state, intent_tx, clock).await
    }

    /// Detach every session listener, stop the clock, and publish the final
    /// phase.
    async fn finish(&mut self, state: &SharedState, clock: &mut RoundClock) {
        let dispatcher = state.dispatcher();
        dispatcher.detach(IntentTopic::Answer);
        dispatcher.detach(IntentTopic::Replay);
        dispatcher.detach(IntentTopic::End);
        clock.stop();

        self.publish_phase(state).await;
        info!(session = %self.id, score = self.record.score, "session finished");
    }

    async fn publish_phase(&self, state: &SharedState) {
        state
            .set_phase_snapshot(PhaseSnapshot {
                phase: self.machine.phase(),
                total_rounds: Some(self.rounds.len()),
                session: Some(self.id),
            })
            .await;
        sse_events::broadcast_phase_changed(state).await;
    }
}

fn attach_forwarder(
    dispatcher: &Dispatcher,
    topic: IntentTopic,
    intent_tx: &mpsc::UnboundedSender<Intent>,
) {
    let intent_tx = intent_tx.clone();
    dispatcher.attach(
        topic,
        Arc::new(move |intent| {
            let _ = intent_tx.send(intent);
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::player_store::memory::MemoryStore,
        engine::{AppState, state_machine::SessionPhase},
    };
    use std::time::Duration;
    use tokio::time::sleep;

    fn game_config(time_ms: u64, error_sensitivity: f32) -> GameConfiguration {
        GameConfiguration {
            level: "developer".into(),
            round_time: Duration::from_millis(time_ms),
            error_sensitivity,
        }
    }

    fn task(answer: &str, factor: u32) -> TaskEntity {
        TaskEntity {
            prompt: format!("videos/{answer}.mp4"),
            right_answer: answer.into(),
            factor,
        }
    }

    fn profile(name: &str, email: &str) -> UserProfile {
        UserProfile {
            name: name.into(),
            email: email.into(),
        }
    }

    async fn state_with_store() -> (SharedState, Arc<dyn PlayerStore>) {
        let state = AppState::new(AppConfig::default());
        let store: Arc<dyn PlayerStore> = Arc::new(MemoryStore::new());
        state.install_player_store(store.clone()).await;
        (state, store)
    }

    /// Retry until the active phase has a listener for the intent's topic.
    async fn publish_when_listening(state: &SharedState, intent: Intent) {
        loop {
            if state.dispatcher().publish(intent.clone()).is_ok() {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_playthrough_scores_and_persists() {
        let (state, store) = state_with_store().await;
        let session = PlaySession::start(
            &store,
            profile("Al", "a@b.com"),
            game_config(10_000, 0.8),
            vec![task("git", 5)],
        )
        .await
        .unwrap();

        assert_eq!(session.start_index(), 0);
        assert_eq!(session.prev_score(), None);

        let run = tokio::spawn({
            let state = state.clone();
            async move { session.run(&state).await }
        });

        publish_when_listening(&state, Intent::Answer { text: "git".into() }).await;

        let outcome = run.await.unwrap().unwrap();
        assert_eq!(outcome.record.score, 5);
        assert_eq!(outcome.record.answers.len(), 1);
        assert_eq!(outcome.record.answers[0].user_input.as_deref(), Some("git"));
        assert!(outcome.record.answers[0].is_right);
        assert_eq!(outcome.prev_score, None);

        // Progress was written round-by-round, not just at session end.
        let stored = store.find("a@b.com".into()).await.unwrap().unwrap();
        assert_eq!(stored.score, 5);
        assert_eq!(state.phase_snapshot().await.phase, SessionPhase::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn fully_answered_record_ends_with_zero_rounds() {
        let (state, store) = state_with_store().await;
        store
            .initialize("Al".into(), "a@b.com".into(), vec![task("git", 5)])
            .await
            .unwrap();
        store
            .save_progress(
                "a@b.com".into(),
                5,
                vec![AnswerEntity {
                    user_input: Some("git".into()),
                    is_right: true,
                }],
            )
            .await
            .unwrap();

        let session = PlaySession::start(
            &store,
            profile("Al", "a@b.com"),
            game_config(10_000, 0.8),
            vec![task("docker", 3)],
        )
        .await
        .unwrap();
        assert_eq!(session.start_index(), 1);

        // No intents are published; the session must resolve on its own.
        let outcome = session.run(&state).await.unwrap();
        assert_eq!(outcome.record.answers.len(), 1);
        assert_eq!(outcome.record.score, 5);
        assert_eq!(outcome.prev_score, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn second_playthrough_carries_prev_score() {
        let (state, store) = state_with_store().await;
        // A finished first playthrough followed by a fresh task assignment:
        // the new task set resets the answer log while the saved score stays.
        store
            .initialize("Al".into(), "a@b.com".into(), vec![task("docker", 3)])
            .await
            .unwrap();
        store
            .save_progress("a@b.com".into(), 5, Vec::new())
            .await
            .unwrap();

        let session = PlaySession::start(
            &store,
            profile("Al", "a@b.com"),
            game_config(10_000, 0.8),
            vec![task("ignored", 1)],
        )
        .await
        .unwrap();
        assert_eq!(session.prev_score(), Some(5));
        assert_eq!(session.start_index(), 0);

        let run = tokio::spawn({
            let state = state.clone();
            async move { session.run(&state).await }
        });
        publish_when_listening(
            &state,
            Intent::Answer {
                text: "docker".into(),
            },
        )
        .await;

        let outcome = run.await.unwrap().unwrap();
        assert_eq!(outcome.record.score, 8);
        assert_eq!(outcome.prev_score, Some(5));
        assert_eq!(outcome.record.score - outcome.prev_score.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_and_empty_answers_award_nothing() {
        let (state, store) = state_with_store().await;
        let session = PlaySession::start(
            &store,
            profile("Al", "a@b.com"),
            game_config(60_000, 0.8),
            vec![task("git", 5), task("docker", 3)],
        )
        .await
        .unwrap();

        let run = tokio::spawn({
            let state = state.clone();
            async move { session.run(&state).await }
        });

        publish_when_listening(&state, Intent::Answer { text: "   ".into() }).await;
        publish_when_listening(
            &state,
            Intent::Answer {
                text: "docker".into(),
            },
        )
        .await;

        let outcome = run.await.unwrap().unwrap();
        assert_eq!(outcome.record.answers.len(), 2);
        // Whitespace-only input becomes the "no answer" sentinel and is never
        // accepted, regardless of similarity scoring.
        assert_eq!(outcome.record.answers[0].user_input, None);
        assert!(!outcome.record.answers[0].is_right);
        assert!(outcome.record.answers[1].is_right);

        // Score is exactly the sum of accepted factors.
        let expected: u32 = outcome
            .record
            .answers
            .iter()
            .zip(&outcome.record.tasks)
            .filter(|(answer, _)| answer.is_right)
            .map(|(_, task)| task.factor)
            .sum();
        assert_eq!(outcome.record.score, expected);
        assert_eq!(outcome.record.score, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_expiry_ends_the_session() {
        let (state, store) = state_with_store().await;
        let session = PlaySession::start(
            &store,
            profile("Al", "a@b.com"),
            game_config(3_000, 0.8),
            vec![task("git", 5)],
        )
        .await
        .unwrap();

        let run = tokio::spawn({
            let state = state.clone();
            async move { session.run(&state).await }
        });

        // Never answer; the deadline must resolve the session by itself.
        let outcome = run.await.unwrap().unwrap();
        assert!(outcome.record.answers.is_empty());
        assert_eq!(outcome.record.score, 0);
        assert_eq!(state.phase_snapshot().await.phase, SessionPhase::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn end_intent_aborts_the_session() {
        let (state, store) = state_with_store().await;
        let session = PlaySession::start(
            &store,
            profile("Al", "a@b.com"),
            game_config(60_000, 0.8),
            vec![task("git", 5)],
        )
        .await
        .unwrap();

        let run = tokio::spawn({
            let state = state.clone();
            async move { session.run(&state).await }
        });

        publish_when_listening(&state, Intent::End).await;

        let outcome = run.await.unwrap().unwrap();
        assert!(outcome.record.answers.is_empty());

        // Session listeners are gone once the session resolves.
        assert!(state.dispatcher().publish(Intent::End).is_err());
        assert!(
            state
                .dispatcher()
                .publish(Intent::Answer { text: "git".into() })
                .is_err()
        );
    }
}
