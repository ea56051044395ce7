use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use memo_core::Clock;
use memo_core::grading::AnswerRecord;
use memo_core::model::{Blank, BlankKey, PracticeBundle, PracticeMaterial, PracticeProgress, SessionId};
use tracing::{debug, info, trace, warn};

use super::audio::{AudioDelivery, AudioEvent, AudioEventKind, AudioPlayback, PlaybackError};
use super::sink::{NoopProgressSink, ProgressSink, ProgressUpdate};
use super::state::{PracticePhase, PracticeSnapshot, SessionState};
use super::subscriptions::Subscriptions;
use crate::error::PracticeError;

/// Seconds subtracted from a blank's start time so playback stops just
/// before the word is sung.
pub const DEFAULT_LEAD_IN_SECS: f64 = 0.2;

const SUBSCRIBED_EVENTS: [AudioEventKind; 2] = [AudioEventKind::TimeUpdate, AudioEventKind::Ended];

/// Result of grading one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub key: BlankKey,
    pub is_correct: bool,
    pub expected: String,
    pub submitted: String,
    /// True only the first time this blank is answered correctly.
    pub newly_completed: bool,
}

/// Audio-synchronized fill-in-the-blank practice for one generated song.
///
/// Playback runs until the next blank's cue point, pauses for an answer,
/// grades it, and resumes from where it stopped. All transitions happen
/// inside the command methods and `on_audio_event`; the host delivers one
/// call at a time.
pub struct PracticeSession {
    session_id: Option<SessionId>,
    material: Arc<PracticeMaterial>,
    audio: Rc<dyn AudioPlayback>,
    sink: Arc<dyn ProgressSink>,
    clock: Clock,
    lead_in: f64,
    phase: PracticePhase,
    state: SessionState,
    subscriptions: Option<Subscriptions>,
}

impl PracticeSession {
    /// Create a session over already validated material.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::PlaybackUnavailable` if `audio` is `None`.
    pub fn new(
        material: Arc<PracticeMaterial>,
        audio: Option<Rc<dyn AudioPlayback>>,
    ) -> Result<Self, PracticeError> {
        let audio = audio.ok_or(PracticeError::PlaybackUnavailable(PlaybackError::Missing))?;
        Ok(Self {
            session_id: None,
            material,
            audio,
            sink: Arc::new(NoopProgressSink),
            clock: Clock::default(),
            lead_in: DEFAULT_LEAD_IN_SECS,
            phase: PracticePhase::Idle,
            state: SessionState::default(),
            subscriptions: None,
        })
    }

    /// Validate a bundle from the generation service and create a session.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Construction` for malformed blank or lyric
    /// data and `PracticeError::PlaybackUnavailable` for a missing handle.
    pub fn from_bundle(
        bundle: PracticeBundle,
        audio: Option<Rc<dyn AudioPlayback>>,
    ) -> Result<Self, PracticeError> {
        let session_id = bundle.session_id;
        let material = bundle.into_material()?;
        Ok(Self::new(Arc::new(material), audio)?.with_session_id(session_id))
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: Option<SessionId>) -> Self {
        self.session_id = session_id;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Override the lead-in. Negative or non-finite values fall back to the default.
    #[must_use]
    pub fn with_lead_in(mut self, secs: f64) -> Self {
        self.lead_in = if secs.is_finite() && secs >= 0.0 {
            secs
        } else {
            DEFAULT_LEAD_IN_SECS
        };
        self
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    #[must_use]
    pub fn phase(&self) -> PracticePhase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn material(&self) -> &PracticeMaterial {
        &self.material
    }

    #[must_use]
    pub fn lead_in(&self) -> f64 {
        self.lead_in
    }

    #[must_use]
    pub fn total_blanks(&self) -> usize {
        self.material.blanks.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == PracticePhase::Complete
    }

    /// Whether this attempt is currently listening to the audio handle.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.subscriptions.is_some()
    }

    /// The blank the session is waiting on or has just graded.
    #[must_use]
    pub fn current_blank(&self) -> Option<&Blank> {
        self.material.blanks.get(self.state.current_blank_index)
    }

    #[must_use]
    pub fn snapshot(&self) -> PracticeSnapshot {
        PracticeSnapshot {
            phase: self.phase,
            current_blank_index: self.state.current_blank_index,
            completed_count: self.state.completed_count,
            graded_count: self.state.graded_count(),
            total_blanks: self.total_blanks(),
            is_playing: self.state.is_playing,
            is_awaiting_input: self.state.is_awaiting_input,
        }
    }

    /// Attach to the audio handle.
    ///
    /// A song without blanks completes immediately.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::InvalidTransition` unless idle and not yet
    /// started, or `PlaybackUnavailable` when the handle is not usable.
    pub fn start(&mut self) -> Result<PracticePhase, PracticeError> {
        if self.phase != PracticePhase::Idle || self.subscriptions.is_some() {
            return Err(self.invalid("start"));
        }
        if !self.audio.is_ready() {
            return Err(PracticeError::PlaybackUnavailable(PlaybackError::NotReady(
                "audio handle reports not ready".into(),
            )));
        }
        let subscriptions = Subscriptions::acquire(Rc::clone(&self.audio), &SUBSCRIBED_EVENTS)
            .map_err(PracticeError::PlaybackUnavailable)?;
        self.subscriptions = Some(subscriptions);
        info!(
            session_id = ?self.session_id,
            total_blanks = self.total_blanks(),
            "practice session started"
        );

        if self.material.blanks.is_empty() {
            self.complete();
        }
        Ok(self.phase)
    }

    /// Start playback from `Idle`, attaching first if needed.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::InvalidTransition` outside `Idle` and
    /// propagates start/playback errors.
    pub fn begin_practice(&mut self) -> Result<PracticePhase, PracticeError> {
        if self.phase != PracticePhase::Idle {
            return Err(self.invalid("begin practice"));
        }
        if self.subscriptions.is_none() && self.start()? == PracticePhase::Complete {
            return Ok(PracticePhase::Complete);
        }

        self.audio.play()?;
        self.state.is_playing = true;
        self.transition(PracticePhase::Playing);
        self.check_cue(self.audio.current_position());
        Ok(self.phase)
    }

    /// Route one audio event into the state machine.
    ///
    /// Events for subscriptions this attempt does not own, and events that
    /// do not apply to the current phase, are ignored.
    pub fn on_audio_event(&mut self, delivery: AudioDelivery) -> PracticePhase {
        let owned = self
            .subscriptions
            .as_ref()
            .is_some_and(|subs| subs.owns(delivery.subscription));
        if !owned {
            trace!(subscription = ?delivery.subscription, "ignoring event from a stale subscription");
            return self.phase;
        }

        match (delivery.event, self.phase) {
            (AudioEvent::TimeUpdate { position }, PracticePhase::Playing) => {
                self.check_cue(position);
            }
            (AudioEvent::Ended, PracticePhase::Playing) => {
                self.state.is_playing = false;
                self.force_remaining();
            }
            (AudioEvent::Ended, PracticePhase::AwaitingInput | PracticePhase::Graded) => {
                self.state.is_playing = false;
                self.state.audio_ended = true;
            }
            (event, phase) => {
                trace!(?event, %phase, "ignoring audio event");
            }
        }
        self.phase
    }

    /// Grade an answer for the current blank.
    ///
    /// Allowed while awaiting input and again after grading; a blank is
    /// only ever counted once. Empty input is graded as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::InvalidTransition` in any other phase.
    pub fn submit_answer(&mut self, text: &str) -> Result<GradeOutcome, PracticeError> {
        if !matches!(self.phase, PracticePhase::AwaitingInput | PracticePhase::Graded) {
            return Err(self.invalid("submit an answer"));
        }
        let Some(blank) = self.material.blanks.get(self.state.current_blank_index) else {
            return Err(self.invalid("submit an answer"));
        };

        let key = blank.key();
        let expected = blank.original_word().to_owned();
        let answer = AnswerRecord::grade(text, &expected);
        let outcome = GradeOutcome {
            key,
            is_correct: answer.is_correct,
            expected,
            submitted: answer.submitted_text.clone(),
            newly_completed: false,
        };
        let newly_completed = self.state.record(key, answer);

        self.state.is_awaiting_input = false;
        self.transition(PracticePhase::Graded);
        debug!(%key, correct = outcome.is_correct, "blank graded");

        if newly_completed {
            self.emit_progress();
        }
        Ok(GradeOutcome {
            newly_completed,
            ..outcome
        })
    }

    /// Move past the graded blank and resume playback.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::InvalidTransition` outside `Graded`, or a
    /// playback error if the player refuses to resume (state is unchanged).
    pub fn continue_to_next(&mut self) -> Result<PracticePhase, PracticeError> {
        if self.phase != PracticePhase::Graded {
            return Err(self.invalid("continue"));
        }

        let next = self.state.current_blank_index + 1;
        if next >= self.total_blanks() {
            self.state.current_blank_index = next;
            self.complete();
            return Ok(self.phase);
        }
        if self.state.audio_ended {
            self.state.current_blank_index = next;
            self.force_remaining();
            return Ok(self.phase);
        }

        self.audio.play()?;
        self.state.current_blank_index = next;
        self.state.is_playing = true;
        self.transition(PracticePhase::Playing);
        // Cues closer together than the lead-in are already due.
        self.check_cue(self.audio.current_position());
        Ok(self.phase)
    }

    /// Throw away the attempt and return to `Idle`.
    ///
    /// Subscriptions are released before this returns, so no event from
    /// the old attempt can reach the next one. Playback is paused and
    /// rewound to the start.
    pub fn restart(&mut self) -> PracticePhase {
        self.subscriptions = None;
        self.audio.pause();
        self.audio.seek(0.0);
        self.state = SessionState::default();
        self.transition(PracticePhase::Idle);
        self.phase
    }

    /// Lines the learner may see: everything up to the furthest line any
    /// reached blank sits on. All lines once complete.
    #[must_use]
    pub fn visible_lyrics(&self) -> &[String] {
        let lyrics = &self.material.lyrics;
        if self.phase == PracticePhase::Complete || self.material.blanks.is_empty() {
            return lyrics.lines();
        }
        let reached = self
            .state
            .current_blank_index
            .min(self.total_blanks().saturating_sub(1));
        let last_line = self.material.blanks.as_slice()[..=reached]
            .iter()
            .map(Blank::line_index)
            .max()
            .unwrap_or(0);
        lyrics.visible_through(last_line)
    }

    /// Visible lines with graded blanks filled in by their correct word.
    #[must_use]
    pub fn rendered_lyrics(&self) -> Vec<String> {
        let visible = self.visible_lyrics().len();
        (0..visible)
            .filter_map(|line| {
                let revealed: Vec<(usize, &str)> = self
                    .material
                    .blanks
                    .iter()
                    .filter(|b| b.line_index() == line && self.state.answers.contains_key(&b.key()))
                    .map(|b| (b.word_position(), b.original_word()))
                    .collect();
                self.material.lyrics.render_line(line, &revealed)
            })
            .collect()
    }

    fn check_cue(&mut self, position: f64) {
        let Some(blank) = self.material.blanks.get(self.state.current_blank_index) else {
            return;
        };
        if position < blank.cue_time(self.lead_in) {
            return;
        }
        self.audio.pause();
        self.state.is_playing = false;
        self.state.is_awaiting_input = true;
        debug!(index = self.state.current_blank_index, position, "paused at cue");
        self.transition(PracticePhase::AwaitingInput);
    }

    /// Grade every blank not yet reached as unanswered and finish.
    fn force_remaining(&mut self) {
        let start = self.state.current_blank_index;
        let mut forced = 0_usize;
        for blank in self.material.blanks.as_slice().iter().skip(start) {
            if !self.state.answers.contains_key(&blank.key()) {
                self.state.record(blank.key(), AnswerRecord::unanswered());
                forced += 1;
            }
        }
        if forced > 0 {
            debug!(forced, "audio ended before the remaining cues");
        }
        self.state.current_blank_index = self.total_blanks();
        self.complete();
    }

    fn complete(&mut self) {
        self.state.is_playing = false;
        self.state.is_awaiting_input = false;
        self.transition(PracticePhase::Complete);
        info!(
            session_id = ?self.session_id,
            completed = self.state.completed_count,
            total = self.total_blanks(),
            "practice session complete"
        );
        self.emit_progress();
    }

    fn emit_progress(&self) {
        let progress = match PracticeProgress::from_counts(
            self.state.completed_count,
            self.total_blanks(),
            self.clock.now(),
        ) {
            Ok(progress) => progress,
            Err(err) => {
                warn!(error = %err, "could not build progress summary");
                return;
            }
        };
        let update = ProgressUpdate {
            session_id: self.session_id,
            progress,
        };
        if let Err(err) = self.sink.record(update) {
            warn!(error = %err, "dropping progress update");
        }
    }

    fn transition(&mut self, to: PracticePhase) {
        if self.phase != to {
            debug!(from = %self.phase, %to, "practice transition");
        }
        self.phase = to;
    }

    fn invalid(&self, action: &'static str) -> PracticeError {
        PracticeError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("session_id", &self.session_id)
            .field("phase", &self.phase)
            .field("total_blanks", &self.total_blanks())
            .field("state", &self.state)
            .field("listening", &self.subscriptions.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::PersistenceError;
    use crate::practice::audio::{ManualPlayback, SubscriptionId};
    use memo_core::model::{BlankRecord, BlankSet, PracticedLyrics};
    use memo_core::time::fixed_clock;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<ProgressUpdate>>,
    }

    impl RecordingSink {
        fn counts(&self) -> Vec<(u32, u32)> {
            self.updates
                .lock()
                .unwrap()
                .iter()
                .map(|u| (u.progress.completed_blanks(), u.progress.total_blanks()))
                .collect()
        }
    }

    impl ProgressSink for RecordingSink {
        fn record(&self, update: ProgressUpdate) -> Result<(), PersistenceError> {
            self.updates.lock().unwrap().push(update);
            Ok(())
        }
    }

    struct FailingSink;

    impl ProgressSink for FailingSink {
        fn record(&self, _update: ProgressUpdate) -> Result<(), PersistenceError> {
            Err(PersistenceError::WriterClosed)
        }
    }

    fn material(records: Vec<BlankRecord>, lines: &[&str]) -> Arc<PracticeMaterial> {
        Arc::new(PracticeMaterial {
            lyrics: PracticedLyrics::new(lines.iter().map(|l| (*l).to_owned()).collect()),
            blanks: BlankSet::from_records(records, lines.len()).unwrap(),
        })
    }

    fn biology() -> Arc<PracticeMaterial> {
        material(
            vec![
                BlankRecord::new("mitochondria", 4.0, 0, 2),
                BlankRecord::new("energy", 9.5, 1, 1),
            ],
            &["Inside the ____ lives", "Making ____ for the cell", "Final chorus"],
        )
    }

    fn session_with(
        material: Arc<PracticeMaterial>,
        duration: f64,
    ) -> (PracticeSession, Rc<ManualPlayback>, Arc<RecordingSink>) {
        let audio = Rc::new(ManualPlayback::new(duration));
        let sink = Arc::new(RecordingSink::default());
        let handle: Rc<dyn AudioPlayback> = audio.clone();
        let session = PracticeSession::new(material, Some(handle))
            .unwrap()
            .with_sink(sink.clone())
            .with_clock(fixed_clock());
        (session, audio, sink)
    }

    const STEP: f64 = 0.25;

    /// Advance the player in quarter-second steps, feeding events to the session.
    fn play_for(session: &mut PracticeSession, audio: &ManualPlayback, secs: f64) {
        let steps = (secs / STEP).round() as usize;
        for _ in 0..steps {
            for delivery in audio.advance(STEP) {
                session.on_audio_event(delivery);
            }
        }
    }

    #[test]
    fn missing_audio_refuses_to_construct() {
        let err = PracticeSession::new(biology(), None).unwrap_err();
        assert!(matches!(
            err,
            PracticeError::PlaybackUnavailable(PlaybackError::Missing)
        ));
    }

    #[test]
    fn malformed_bundle_refuses_to_construct() {
        let bundle = PracticeBundle {
            lyrics: vec!["one line".into()],
            blanks: Some(vec![BlankRecord::new("word", 1.0, 3, 0)]),
            ..PracticeBundle::default()
        };
        let audio: Rc<dyn AudioPlayback> = Rc::new(ManualPlayback::new(10.0));
        let err = PracticeSession::from_bundle(bundle, Some(audio)).unwrap_err();
        assert!(matches!(err, PracticeError::Construction(_)));
    }

    #[test]
    fn unready_audio_refuses_to_start() {
        let (mut session, audio, _) = session_with(biology(), 20.0);
        audio.set_ready(false);
        assert!(matches!(
            session.start(),
            Err(PracticeError::PlaybackUnavailable(_))
        ));
        assert_eq!(session.phase(), PracticePhase::Idle);
        assert!(!session.is_listening());
    }

    #[test]
    fn zero_blanks_complete_without_playback() {
        let (mut session, audio, sink) = session_with(material(Vec::new(), &["la la"]), 20.0);
        assert_eq!(session.start().unwrap(), PracticePhase::Complete);
        assert!(!audio.is_playing());
        assert_eq!(sink.counts(), vec![(0, 0)]);
        assert_eq!(session.visible_lyrics().len(), 1);
    }

    #[test]
    fn worked_example_flows_to_complete() {
        let (mut session, audio, sink) = session_with(biology(), 30.0);
        assert_eq!(session.begin_practice().unwrap(), PracticePhase::Playing);

        play_for(&mut session, &audio, 3.75);
        assert_eq!(session.phase(), PracticePhase::Playing);
        play_for(&mut session, &audio, 0.25);
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);
        assert!(!audio.is_playing());
        assert!(session.state().is_awaiting_input());
        assert_eq!(session.state().current_blank_index(), 0);

        let outcome = session.submit_answer("Mitochondria").unwrap();
        assert!(outcome.is_correct);
        assert!(outcome.newly_completed);
        assert_eq!(session.state().completed_count(), 1);
        assert_eq!(session.phase(), PracticePhase::Graded);

        let paused_at = audio.current_position();
        assert_eq!(session.continue_to_next().unwrap(), PracticePhase::Playing);
        assert!(audio.is_playing());
        assert_eq!(audio.current_position(), paused_at);

        play_for(&mut session, &audio, 5.25);
        assert_eq!(session.phase(), PracticePhase::Playing);
        play_for(&mut session, &audio, 0.25);
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);
        assert_eq!(session.state().current_blank_index(), 1);

        let outcome = session.submit_answer("").unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.expected, "energy");

        assert_eq!(session.continue_to_next().unwrap(), PracticePhase::Complete);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.completed_count, 1);
        assert_eq!(snapshot.total_blanks, 2);
        assert_eq!(snapshot.graded_count, 2);
        assert_eq!(sink.counts(), vec![(1, 2), (1, 2)]);
    }

    #[test]
    fn early_end_force_grades_remaining_blanks() {
        let records = vec![
            BlankRecord::new("one", 5.0, 0, 0),
            BlankRecord::new("two", 8.0, 0, 1),
            BlankRecord::new("three", 12.0, 0, 2),
        ];
        let (mut session, audio, sink) = session_with(material(records, &["____ ____ ____"]), 2.0);
        session.begin_practice().unwrap();

        play_for(&mut session, &audio, 3.0);
        assert_eq!(session.phase(), PracticePhase::Complete);
        assert_eq!(session.state().graded_count(), 3);
        assert_eq!(session.state().completed_count(), 0);
        assert!(
            session
                .state()
                .answers()
                .values()
                .all(|answer| answer.is_unanswered() && !answer.is_correct)
        );
        assert_eq!(sink.counts(), vec![(0, 3)]);
    }

    #[test]
    fn end_while_graded_finishes_on_continue() {
        let records = vec![
            BlankRecord::new("one", 1.0, 0, 0),
            BlankRecord::new("two", 8.0, 0, 1),
        ];
        let (mut session, audio, _) = session_with(material(records, &["____ ____"]), 10.0);
        session.begin_practice().unwrap();
        play_for(&mut session, &audio, 1.0);
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);
        session.submit_answer("one").unwrap();

        // Subscription 2 is the ended listener.
        session.on_audio_event(AudioDelivery {
            subscription: SubscriptionId::new(2),
            event: AudioEvent::Ended,
        });
        assert_eq!(session.phase(), PracticePhase::Graded);

        assert_eq!(session.continue_to_next().unwrap(), PracticePhase::Complete);
        assert_eq!(session.state().graded_count(), 2);
        assert_eq!(session.state().completed_count(), 1);
    }

    #[test]
    fn close_cues_pause_immediately_on_resume() {
        let records = vec![
            BlankRecord::new("one", 2.0, 0, 0),
            BlankRecord::new("two", 2.1, 0, 1),
        ];
        let (mut session, audio, _) = session_with(material(records, &["____ ____"]), 10.0);
        session.begin_practice().unwrap();
        play_for(&mut session, &audio, 2.0);
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);
        session.submit_answer("one").unwrap();

        assert_eq!(
            session.continue_to_next().unwrap(),
            PracticePhase::AwaitingInput
        );
        assert_eq!(session.state().current_blank_index(), 1);
        assert!(!audio.is_playing());
    }

    #[test]
    fn cue_at_zero_pauses_on_begin() {
        let (mut session, audio, _) =
            session_with(material(vec![BlankRecord::new("hey", 0.1, 0, 0)], &["____"]), 5.0);
        assert_eq!(session.begin_practice().unwrap(), PracticePhase::AwaitingInput);
        assert!(!audio.is_playing());
    }

    #[test]
    fn resubmission_does_not_double_count() {
        let (mut session, audio, sink) = session_with(biology(), 30.0);
        session.begin_practice().unwrap();
        play_for(&mut session, &audio, 4.0);

        session.submit_answer(" mitochondria ").unwrap();
        let again = session.submit_answer("MITOCHONDRIA").unwrap();
        assert!(again.is_correct);
        assert!(!again.newly_completed);
        session.submit_answer("wrong").unwrap();

        assert_eq!(session.state().completed_count(), 1);
        assert_eq!(sink.counts(), vec![(1, 2)]);
    }

    #[test]
    fn stray_events_are_ignored() {
        let (mut session, audio, _) = session_with(biology(), 30.0);
        session.begin_practice().unwrap();
        play_for(&mut session, &audio, 4.0);
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);

        // A position update while paused must not move anything.
        session.on_audio_event(AudioDelivery {
            subscription: SubscriptionId::new(1),
            event: AudioEvent::TimeUpdate { position: 50.0 },
        });
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);
        assert_eq!(session.state().current_blank_index(), 0);

        // Unknown subscription.
        session.on_audio_event(AudioDelivery {
            subscription: SubscriptionId::new(99),
            event: AudioEvent::Ended,
        });
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);
    }

    #[test]
    fn commands_in_wrong_phase_are_rejected() {
        let (mut session, _, _) = session_with(biology(), 30.0);
        assert!(matches!(
            session.submit_answer("x"),
            Err(PracticeError::InvalidTransition {
                phase: PracticePhase::Idle,
                ..
            })
        ));
        assert!(session.continue_to_next().is_err());
        session.begin_practice().unwrap();
        assert!(session.begin_practice().is_err());
        assert!(session.start().is_err());
    }

    #[test]
    fn restart_from_complete_resets_and_drops_old_listeners() {
        let (mut session, audio, _) = session_with(biology(), 30.0);
        session.begin_practice().unwrap();
        play_for(&mut session, &audio, 4.0);
        session.submit_answer("mitochondria").unwrap();
        session.continue_to_next().unwrap();
        play_for(&mut session, &audio, 6.0);
        session.submit_answer("energy").unwrap();
        assert_eq!(session.continue_to_next().unwrap(), PracticePhase::Complete);
        assert_eq!(session.state().completed_count(), 2);

        let stale = SubscriptionId::new(1);
        assert_eq!(session.restart(), PracticePhase::Idle);
        assert_eq!(session.state().completed_count(), 0);
        assert_eq!(session.state().current_blank_index(), 0);
        assert!(session.state().answers().is_empty());
        assert_eq!(audio.subscriber_count(), 0);
        assert_eq!(audio.current_position(), 0.0);

        session.begin_practice().unwrap();
        assert_eq!(audio.subscriber_count(), 2);
        session.on_audio_event(AudioDelivery {
            subscription: stale,
            event: AudioEvent::TimeUpdate { position: 9.9 },
        });
        assert_eq!(session.phase(), PracticePhase::Playing);
    }

    #[test]
    fn persistence_failure_does_not_block() {
        let audio: Rc<dyn AudioPlayback> = Rc::new(ManualPlayback::new(30.0));
        let mut session = PracticeSession::new(biology(), Some(audio))
            .unwrap()
            .with_sink(Arc::new(FailingSink));
        session.begin_practice().unwrap();
        for position in [1.0, 3.9] {
            session.on_audio_event(AudioDelivery {
                subscription: SubscriptionId::new(1),
                event: AudioEvent::TimeUpdate { position },
            });
        }
        let outcome = session.submit_answer("mitochondria").unwrap();
        assert!(outcome.is_correct);
        assert_eq!(session.state().completed_count(), 1);
        assert_eq!(session.phase(), PracticePhase::Graded);
    }

    #[test]
    fn lyrics_reveal_progressively() {
        let (mut session, audio, _) = session_with(biology(), 30.0);
        assert_eq!(session.visible_lyrics().len(), 1);

        session.begin_practice().unwrap();
        play_for(&mut session, &audio, 4.0);
        session.submit_answer("nope").unwrap();
        assert_eq!(session.rendered_lyrics(), vec!["Inside the mitochondria lives"]);

        session.continue_to_next().unwrap();
        assert_eq!(session.visible_lyrics().len(), 2);
        assert_eq!(session.rendered_lyrics()[1], "Making ____ for the cell");

        play_for(&mut session, &audio, 6.0);
        session.submit_answer("energy").unwrap();
        session.continue_to_next().unwrap();
        assert_eq!(session.visible_lyrics().len(), 3);
    }

    #[test]
    fn lead_in_override_moves_the_cue() {
        let (session, audio, _) = session_with(biology(), 30.0);
        let mut session = session.with_lead_in(1.0);
        session.begin_practice().unwrap();
        play_for(&mut session, &audio, 3.0);
        assert_eq!(session.phase(), PracticePhase::AwaitingInput);

        let fallback = PracticeSession::new(biology(), Some(audio as Rc<dyn AudioPlayback>))
            .unwrap()
            .with_lead_in(f64::NAN);
        assert_eq!(fallback.lead_in(), DEFAULT_LEAD_IN_SECS);
    }
}
