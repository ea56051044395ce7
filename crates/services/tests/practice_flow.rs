use std::rc::Rc;
use std::sync::Arc;

use memo_core::model::{PracticeBundle, SessionId};
use memo_core::time::fixed_now;
use services::practice::{AudioPlayback, ManualPlayback};
use services::{AppServices, Clock, PracticePhase, PracticeSession, ServicesConfig};

const BUNDLE: &str = r#"{
    "session_id": "6f9619ff-8b86-4011-8b3c-0a1b2c3d4e5f",
    "subject": "Biology",
    "concepts": ["mitochondria", "ATP"],
    "music_genre": "pop",
    "lyrics": ["Inside the mitochondria lives", "Making energy for the cell"],
    "practiced_lyrics": ["Inside the ____ lives", "Making ____ for the cell"],
    "blanks": [
        {"original_word": "energy", "start_time": 9.5, "line_index": 1, "word_position": 1},
        {"original_word": "mitochondria", "start_time": 4.0, "line_index": 0, "word_position": 2}
    ],
    "audio_url": "https://cdn.example.com/biology.mp3"
}"#;

fn drive(session: &mut PracticeSession, audio: &ManualPlayback, secs: f64) {
    let steps = (secs / 0.25).round() as usize;
    for _ in 0..steps {
        for delivery in audio.advance(0.25) {
            session.on_audio_event(delivery);
        }
    }
}

#[tokio::test]
async fn practice_attempt_persists_progress() {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()), ServicesConfig::default());
    let (sink, writer) = services.progress_writer();

    let bundle: PracticeBundle = serde_json::from_str(BUNDLE).unwrap();
    let session_id = bundle.session_id.unwrap();
    let audio = Rc::new(ManualPlayback::new(30.0));
    let handle: Rc<dyn AudioPlayback> = audio.clone();
    let mut session = PracticeSession::from_bundle(bundle, Some(handle))
        .unwrap()
        .with_sink(Arc::new(sink))
        .with_clock(services.clock());

    session.begin_practice().unwrap();
    drive(&mut session, &audio, 4.0);
    assert_eq!(session.phase(), PracticePhase::AwaitingInput);
    assert_eq!(session.current_blank().unwrap().original_word(), "mitochondria");
    assert!(session.submit_answer("Mitochondria").unwrap().is_correct);
    session.continue_to_next().unwrap();

    drive(&mut session, &audio, 6.0);
    assert_eq!(session.phase(), PracticePhase::AwaitingInput);
    assert!(!session.submit_answer("").unwrap().is_correct);
    assert_eq!(session.continue_to_next().unwrap(), PracticePhase::Complete);
    drop(session);

    let stats = writer.run().await;
    assert_eq!(stats.local.saved, 2);
    assert_eq!(stats.local.failed, 0);

    let rows = services.recent_progress(10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].session_id, session_id);
    assert_eq!(rows[0].progress.completed_blanks(), 1);
    assert_eq!(rows[0].progress.total_blanks(), 2);
    assert!((rows[0].progress.completion_rate() - 0.5).abs() < f64::EPSILON);
    assert_eq!(rows[0].progress.last_practiced_at(), fixed_now());
}

#[tokio::test]
async fn early_end_still_persists_a_summary() {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()), ServicesConfig::default());
    let (sink, writer) = services.progress_writer();

    let mut bundle: PracticeBundle = serde_json::from_str(BUNDLE).unwrap();
    let session_id = SessionId::random();
    bundle.session_id = Some(session_id);
    let audio = Rc::new(ManualPlayback::new(2.0));
    let handle: Rc<dyn AudioPlayback> = audio.clone();
    let mut session = PracticeSession::from_bundle(bundle, Some(handle))
        .unwrap()
        .with_sink(Arc::new(sink));

    session.begin_practice().unwrap();
    drive(&mut session, &audio, 3.0);
    assert!(session.is_complete());
    assert_eq!(session.snapshot().graded_count, 2);
    drop(session);

    writer.run().await;
    let rows = services.recent_progress(10).await.unwrap();
    assert_eq!(rows[0].session_id, session_id);
    assert_eq!(rows[0].progress.completed_blanks(), 0);
}

#[test]
fn bundle_without_blanks_field_is_rejected() {
    let bundle: PracticeBundle =
        serde_json::from_str(r#"{"practiced_lyrics": ["just a line"]}"#).unwrap();
    let audio: Rc<dyn AudioPlayback> = Rc::new(ManualPlayback::new(10.0));
    assert!(matches!(
        PracticeSession::from_bundle(bundle, Some(audio)),
        Err(services::PracticeError::Construction(_))
    ));
}
