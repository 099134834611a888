//! Core session state machine implementation
//!
//! Owns the session aggregate and every controller. Mediates turn-taking
//! between playback and capture, asks for feedback on submission, and
//! drives completion on exhaustion, expiry, or leave.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::session::{CompletionReason, Phase, Session, SessionSummary};
use crate::bank::{Question, QuestionBank};
use crate::capabilities::{RecognitionEvent, SynthesisEvent, UtteranceId};
use crate::capture::{CaptureController, CaptureError, CaptureUpdate, Toggle};
use crate::clock::{ClockTick, SessionClock};
use crate::config::SessionConfig;
use crate::engagement::{EngagementMetrics, EngagementMonitor};
use crate::events::{Command, SessionEvent};
use crate::feedback::FeedbackSynthesizer;
use crate::playback::{PlaybackController, PlaybackEnd, Speak};

const ACTIVE: [Phase; 3] = [Phase::AskingQuestion, Phase::Capturing, Phase::ReviewingFeedback];

/// Why a command was rejected; the session is left unchanged
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("not allowed while {0}")]
    InvalidPhase(Phase),

    #[error("stop recording first")]
    StillRecording,

    #[error("wait for the question to finish playing")]
    PlaybackInProgress,

    #[error("the answer is empty")]
    EmptyAnswer,

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Controllers handed to the machine; it becomes their only owner
pub struct Controllers {
    pub playback: PlaybackController,
    pub capture: CaptureController,
    pub engagement: EngagementMonitor,
    pub feedback: FeedbackSynthesizer,
}

/// Everything the run loop listens to
pub struct MachineInputs {
    pub commands: mpsc::Receiver<Command>,
    pub synthesis: mpsc::UnboundedReceiver<SynthesisEvent>,
    pub recognition: mpsc::UnboundedReceiver<RecognitionEvent>,
}

/// The state machine that drives one interview session
pub struct SessionMachine {
    config: SessionConfig,
    bank: QuestionBank,
    /// Questions with their reference answers, parallel to `session.questions`
    questions: Vec<Question>,
    session: Session,
    playback: PlaybackController,
    capture: CaptureController,
    engagement: EngagementMonitor,
    clock: SessionClock,
    feedback: FeedbackSynthesizer,
    /// Utterance that reads the current question, while it plays
    question_utterance: Option<UtteranceId>,
    phase_entered_at: Option<Instant>,
    event_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<Session>,
}

impl SessionMachine {
    pub fn new(
        config: SessionConfig,
        bank: QuestionBank,
        controllers: Controllers,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Session::default());
        Self {
            config,
            bank,
            questions: Vec::new(),
            session: Session::default(),
            playback: controllers.playback,
            capture: controllers.capture,
            engagement: controllers.engagement,
            clock: SessionClock::new(),
            feedback: controllers.feedback,
            question_utterance: None,
            phase_entered_at: None,
            event_tx,
            snapshot_tx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Receiver that always holds the latest session snapshot
    pub fn snapshots(&self) -> watch::Receiver<Session> {
        self.snapshot_tx.subscribe()
    }

    /// Run until the session completes or the command channel closes
    pub async fn run(&mut self, mut inputs: MachineInputs) {
        info!(phase = %self.session.phase, "session machine started");

        while self.session.phase != Phase::Complete {
            tokio::select! {
                command = inputs.commands.recv() => match command {
                    Some(command) => {
                        let _ = self.handle_command(command);
                    }
                    None => {
                        info!("command channel closed");
                        break;
                    }
                },
                Some(event) = inputs.synthesis.recv() => self.on_synthesis_event(event),
                Some(event) = inputs.recognition.recv() => self.on_recognition_event(event),
                tick = self.clock.next_tick() => self.on_clock_tick(tick),
                metrics = self.engagement.next_sample() => self.on_engagement(metrics),
            }
        }

        info!(phase = %self.session.phase, "session machine stopped");
    }

    /// Apply one UI command
    pub fn handle_command(&mut self, command: Command) -> Result<(), SessionError> {
        debug!(%command, phase = %self.session.phase, "command received");
        let name = command.to_string();

        let result = match command {
            Command::Confirm => self.confirm(),
            Command::SubmitAnswer => self.submit_answer(),
            Command::NextQuestion => self.next_question(),
            Command::PreviousQuestion => self.previous_question(),
            Command::ToggleCapture => self.toggle_capture(),
            Command::ToggleCamera => self.toggle_camera(),
            Command::EditAnswer { text } => self.edit_answer(&text),
            Command::PausePlayback => {
                if !self.playback.pause() {
                    debug!("nothing to pause");
                }
                self.sync_playback();
                Ok(())
            }
            Command::ResumePlayback => {
                self.playback.resume();
                self.sync_playback();
                Ok(())
            }
            Command::ListenReference => self.listen_reference(),
            Command::Leave => {
                self.complete(CompletionReason::Abandoned);
                Ok(())
            }
        };

        if let Err(e) = &result {
            warn!(command = %name, phase = %self.session.phase, error = %e, "command rejected");
            self.emit(SessionEvent::CommandRejected {
                command: name,
                reason: e.to_string(),
            });
        }
        self.publish();
        result
    }

    /// Completion of an utterance; unlocks capture after a question
    pub fn on_synthesis_event(&mut self, event: SynthesisEvent) {
        let Some(end) = self.playback.handle_event(event) else {
            return;
        };
        self.sync_playback();

        let finished = match end {
            PlaybackEnd::Completed(id) | PlaybackEnd::Cancelled(id) => Some(id),
            PlaybackEnd::Skipped => None,
        };
        if self.session.phase == Phase::AskingQuestion
            && finished.is_some()
            && finished == self.question_utterance
        {
            debug!(?end, "question playback finished");
            self.question_utterance = None;
            self.transition_to(Phase::Capturing);
        }
        self.publish();
    }

    pub fn on_recognition_event(&mut self, event: RecognitionEvent) {
        match self.capture.handle_event(event) {
            Some(CaptureUpdate::Transcript(text)) => {
                let index = self.session.current_index;
                self.session.answers[index] = text.clone();
                self.session.transcript = text.clone();
                self.emit(SessionEvent::TranscriptUpdated { index, text });
            }
            Some(CaptureUpdate::Ended) => self.capture_closed(),
            Some(CaptureUpdate::Failed(error)) => self.capture_failed(error),
            None => return,
        }
        self.publish();
    }

    pub fn on_engagement(&mut self, metrics: EngagementMetrics) {
        if !self.session.phase.is_active() {
            return;
        }
        self.session.latest_engagement = Some(metrics.clone());
        self.emit(SessionEvent::EngagementUpdated { metrics });
        self.publish();
    }

    pub fn on_clock_tick(&mut self, tick: ClockTick) {
        match tick {
            ClockTick::Remaining { seconds } => {
                self.session.remaining_seconds = Some(seconds);
                self.emit(SessionEvent::ClockTick {
                    remaining_seconds: seconds,
                });
            }
            ClockTick::Expired => {
                self.session.remaining_seconds = Some(0);
                self.emit(SessionEvent::ClockTick {
                    remaining_seconds: 0,
                });
                info!("time expired");
                self.complete(CompletionReason::TimeExpired);
            }
        }
        self.publish();
    }

    /// Release every device and timer; the session is abandoned if still open
    pub fn teardown(&mut self) {
        if self.session.phase == Phase::Complete {
            self.release_all();
        } else {
            self.complete(CompletionReason::Abandoned);
        }
        self.publish();
    }

    fn confirm(&mut self) -> Result<(), SessionError> {
        self.require(&[Phase::Configuring])?;

        let questions = self
            .bank
            .questions(self.config.domain(), self.config.question_limit());
        let count = questions.len();
        self.session.questions = questions.iter().map(|q| q.text.clone()).collect();
        self.session.answers = vec![String::new(); count];
        self.session.feedback = vec![None; count];
        self.session.current_index = 0;
        self.session.manual_entry = !self.capture.is_available();
        self.questions = questions;

        let duration = self.config.duration_seconds();
        if let Some(seconds) = duration {
            self.clock.start(seconds);
            self.session.remaining_seconds = Some(seconds);
        }

        info!(
            domain = self.config.domain(),
            questions = count,
            duration_seconds = ?duration,
            "session started"
        );
        self.emit(SessionEvent::SessionStarted {
            questions: count,
            duration_seconds: duration,
        });
        self.ask_current();
        Ok(())
    }

    /// Speak the current question; capture opens once it has been heard
    fn ask_current(&mut self) {
        let index = self.session.current_index;
        let text = self.questions[index].text.clone();
        self.session.transcript = self.session.answers[index].clone();
        self.transition_to(Phase::AskingQuestion);
        self.emit(SessionEvent::QuestionAsked {
            index,
            total: self.questions.len(),
            text: text.clone(),
        });

        match self.playback.speak(&text) {
            Speak::Started(id) => {
                self.question_utterance = Some(id);
                self.sync_playback();
            }
            Speak::Skipped => {
                self.question_utterance = None;
                self.sync_playback();
                self.transition_to(Phase::Capturing);
            }
        }
    }

    fn toggle_capture(&mut self) -> Result<(), SessionError> {
        self.require(&[Phase::Capturing])?;
        if self.playback.is_speaking() {
            return Err(SessionError::PlaybackInProgress);
        }

        let index = self.session.current_index;
        match self.capture.toggle() {
            Ok(Toggle::Started(take)) => {
                self.session.recording = true;
                self.session.manual_entry = false;
                self.session.transcript.clear();
                debug!(take = take.0, index, "take opened");
                self.emit(SessionEvent::CaptureStarted { index });
            }
            Ok(Toggle::Stopped) => self.capture_closed(),
            Err(error) => self.capture_failed(error),
        }
        Ok(())
    }

    /// Show the stored answer again once a take is over
    fn capture_closed(&mut self) {
        let index = self.session.current_index;
        self.session.recording = false;
        self.session.transcript = self.session.current_answer().unwrap_or_default().to_string();
        self.emit(SessionEvent::CaptureStopped { index });
    }

    fn capture_failed(&mut self, error: CaptureError) {
        warn!(%error, "voice capture unavailable, typed entry enabled");
        self.session.recording = false;
        self.session.manual_entry = error.needs_manual_entry();
        if let Some(answer) = self.session.current_answer().map(str::to_string) {
            self.session.transcript = answer;
        }
        self.emit(SessionEvent::CaptureUnavailable {
            reason: error.to_string(),
        });
    }

    fn edit_answer(&mut self, text: &str) -> Result<(), SessionError> {
        self.require(&[Phase::Capturing])?;
        let text = self.capture.set_manual(text)?;

        let index = self.session.current_index;
        self.session.answers[index] = text.clone();
        self.session.transcript = text.clone();
        debug!(index, chars = text.len(), "answer edited");
        self.emit(SessionEvent::TranscriptUpdated { index, text });
        Ok(())
    }

    fn submit_answer(&mut self) -> Result<(), SessionError> {
        self.require(&[Phase::Capturing])?;
        if self.capture.is_recording() {
            return Err(SessionError::StillRecording);
        }
        let index = self.session.current_index;
        let answer = self.session.current_answer().unwrap_or_default().trim();
        if answer.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }

        let report = self.feedback.synthesize(
            &self.questions[index],
            answer,
            self.session.latest_engagement.as_ref(),
        );
        info!(
            index,
            content_score = report.content_score,
            delivery_score = report.delivery_score,
            "answer submitted"
        );
        self.session.feedback[index] = Some(report.clone());
        self.transition_to(Phase::ReviewingFeedback);
        self.emit(SessionEvent::FeedbackReady { index, report });
        Ok(())
    }

    fn next_question(&mut self) -> Result<(), SessionError> {
        self.require(&[Phase::ReviewingFeedback])?;
        self.playback.cancel();
        self.sync_playback();

        if self.session.is_last_question() {
            self.complete(CompletionReason::QuestionsExhausted);
        } else {
            self.session.current_index += 1;
            self.ask_current();
        }
        Ok(())
    }

    fn previous_question(&mut self) -> Result<(), SessionError> {
        self.require(&[Phase::AskingQuestion, Phase::Capturing])?;
        if self.session.current_index == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        if self.capture.is_recording() {
            return Err(SessionError::StillRecording);
        }
        if self.playback.is_speaking() {
            return Err(SessionError::PlaybackInProgress);
        }

        self.session.current_index -= 1;
        self.ask_current();
        Ok(())
    }

    fn toggle_camera(&mut self) -> Result<(), SessionError> {
        self.require(&ACTIVE)?;

        if self.engagement.is_active() {
            self.engagement.stop();
            self.session.camera_on = false;
            self.emit(SessionEvent::CameraStopped);
            return Ok(());
        }
        match self.engagement.start() {
            Ok(()) => {
                self.session.camera_on = true;
                self.emit(SessionEvent::CameraStarted);
            }
            Err(error) => {
                warn!(%error, "camera unavailable, continuing without it");
                self.session.camera_on = false;
                self.emit(SessionEvent::CameraUnavailable {
                    reason: error.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Read the reference answer aloud; the phase does not change
    fn listen_reference(&mut self) -> Result<(), SessionError> {
        self.require(&[Phase::ReviewingFeedback])?;
        let index = self.session.current_index;
        if let Some(report) = &self.session.feedback[index] {
            let reference = report.reference_answer.clone();
            self.playback.speak(&reference);
            self.sync_playback();
        }
        Ok(())
    }

    fn complete(&mut self, reason: CompletionReason) {
        if self.session.phase == Phase::Complete {
            return;
        }
        self.release_all();
        self.transition_to(Phase::Complete);

        let summary = SessionSummary::new(&self.session, reason);
        info!(?reason, answered = summary.answered, "session complete");
        self.emit(SessionEvent::SessionComplete { reason, summary });
    }

    /// Stop the clock, capture, playback and camera; idempotent
    fn release_all(&mut self) {
        self.clock.stop();

        if self.capture.is_recording() {
            self.capture.stop();
            self.capture_closed();
        } else {
            self.capture.stop();
        }

        self.playback.cancel();
        self.question_utterance = None;
        self.sync_playback();

        if self.engagement.is_active() {
            self.engagement.stop();
            self.emit(SessionEvent::CameraStopped);
        }
        self.session.camera_on = false;
    }

    fn require(&self, allowed: &[Phase]) -> Result<(), SessionError> {
        if allowed.contains(&self.session.phase) {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase(self.session.phase))
        }
    }

    fn sync_playback(&mut self) {
        self.session.speaking = self.playback.is_speaking();
        self.session.playback_paused = self.playback.is_paused();
    }

    /// Perform a phase transition
    fn transition_to(&mut self, new_phase: Phase) {
        let old_phase = self.session.phase;
        if old_phase == new_phase {
            return;
        }
        let duration_ms = self
            .phase_entered_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %old_phase,
            to = %new_phase,
            duration_ms = duration_ms,
            index = self.session.current_index,
            "phase transition"
        );

        self.session.phase = new_phase;
        self.phase_entered_at = Some(Instant::now());
        self.emit(SessionEvent::PhaseChanged {
            from: old_phase,
            to: new_phase,
        });
    }

    fn emit(&self, event: SessionEvent) {
        debug!(%event, "emitting session event");
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.session.clone());
    }
}
