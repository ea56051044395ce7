//! Terminal front-end for one practice attempt.
//!
//! A `ManualPlayback` stands in for the audio element: a tokio interval
//! moves its playhead in real time and answers are read from stdin.

use std::rc::Rc;
use std::time::Duration;

use memo_core::model::{Blank, PracticeMaterial};
use services::practice::{AudioPlayback, ManualPlayback};
use services::{PracticePhase, PracticeSession};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

const TICK: Duration = Duration::from_millis(100);
const RESTART_COMMAND: &str = ":restart";

pub struct TerminalPractice {
    session: PracticeSession,
    audio: Rc<ManualPlayback>,
    input: Lines<BufReader<Stdin>>,
    input_closed: bool,
}

impl TerminalPractice {
    pub fn new(session: PracticeSession, audio: Rc<ManualPlayback>) -> Self {
        Self {
            session,
            audio,
            input: BufReader::new(tokio::io::stdin()).lines(),
            input_closed: false,
        }
    }

    /// Create a playback handle for `duration` seconds of audio.
    pub fn playback(duration: f64) -> (Rc<ManualPlayback>, Rc<dyn AudioPlayback>) {
        let audio = Rc::new(ManualPlayback::new(duration));
        let handle: Rc<dyn AudioPlayback> = audio.clone();
        (audio, handle)
    }

    /// Play the song through, prompting at every blank.
    pub async fn run(mut self) -> Result<PracticeSession, Box<dyn std::error::Error>> {
        println!(
            "Listening... {} blanks. Type `{RESTART_COMMAND}` at a prompt to start over.",
            self.session.total_blanks()
        );
        self.session.begin_practice()?;
        let mut ticker = tokio::time::interval(TICK);

        loop {
            match self.session.phase() {
                PracticePhase::Complete => break,
                PracticePhase::Playing => {
                    ticker.tick().await;
                    for delivery in self.audio.advance(TICK.as_secs_f64()) {
                        self.session.on_audio_event(delivery);
                    }
                }
                PracticePhase::AwaitingInput => self.prompt().await?,
                PracticePhase::Graded => {
                    self.session.continue_to_next()?;
                }
                PracticePhase::Idle => {
                    self.session.begin_practice()?;
                }
            }
        }

        self.print_summary();
        Ok(self.session)
    }

    async fn prompt(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!();
        for line in self.session.rendered_lyrics() {
            println!("  {line}");
        }
        print!("> ");
        let answer = self.read_answer().await?;

        if answer.trim() == RESTART_COMMAND {
            self.session.restart();
            println!("Starting over.");
            return Ok(());
        }

        let outcome = self.session.submit_answer(&answer)?;
        if outcome.is_correct {
            println!("Correct: {}", outcome.expected);
        } else {
            println!("The word was: {}", outcome.expected);
        }
        Ok(())
    }

    /// Next stdin line. End of input counts as an empty answer.
    async fn read_answer(&mut self) -> Result<String, std::io::Error> {
        use std::io::Write;
        std::io::stdout().flush()?;
        if self.input_closed {
            return Ok(String::new());
        }
        match self.input.next_line().await? {
            Some(line) => Ok(line),
            None => {
                debug!("stdin closed; remaining blanks are submitted empty");
                self.input_closed = true;
                Ok(String::new())
            }
        }
    }

    fn print_summary(&self) {
        let snapshot = self.session.snapshot();
        println!();
        for line in self.session.rendered_lyrics() {
            println!("  {line}");
        }
        println!(
            "Done: {} of {} blanks correct.",
            snapshot.completed_count, snapshot.total_blanks
        );
    }
}

/// Seconds of audio to simulate when the length is not given.
pub fn default_duration(material: &PracticeMaterial) -> f64 {
    material
        .blanks
        .iter()
        .map(Blank::start_time)
        .fold(0.0, f64::max)
        + 5.0
}
