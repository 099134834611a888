//! mock-interview: console front end for the interview session engine
//!
//! Runs one session against console stand-ins for the host:
//! - The interviewer's voice is printed to stdout
//! - Lines typed while recording are treated as dictation
//! - The camera is a biased random classifier
//! - An IPC socket exposes snapshots, commands and events to other UIs

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mock_interview::bank::QuestionBank;
use mock_interview::capabilities::simulated::{
    ConsoleRecognizer, ConsoleSynthesizer, DictationFeed, RandomClassifier, SimulatedDevices,
};
use mock_interview::capabilities::{MediaDevices, SpeechSynthesizer};
use mock_interview::capture::CaptureController;
use mock_interview::clock::format_remaining;
use mock_interview::config::{Config, SessionMode};
use mock_interview::engagement::{EngagementMonitor, EngagementSampler};
use mock_interview::events::{Command, SessionEvent};
use mock_interview::feedback::{FeedbackSynthesizer, HeuristicScorer};
use mock_interview::ipc::{Server, SessionLink};
use mock_interview::lifecycle::ShutdownSignal;
use mock_interview::playback::PlaybackController;
use mock_interview::state::{Controllers, MachineInputs, Session, SessionMachine, SessionSummary};

const HELP: &str = "\
commands:
  start          confirm the configuration and begin
  rec            start or stop recording
  cam            turn the camera on or off
  submit         submit the current answer
  next / prev    move between questions
  pause / resume pause or resume the interviewer
  listen         hear the reference answer
  edit <text>    replace the answer with typed text
  status         show the session
  quit           leave the session
any other line is dictation while recording, otherwise a typed answer";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so they stay out of the console transcript
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "mock-interview starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, mode = ?config.session.mode(), "configuration loaded");

    let bank = match &config.question_bank {
        Some(path) => QuestionBank::with_file(path)?,
        None => QuestionBank::builtin(),
    };

    let mut domains: Vec<String> = bank.domains().map(str::to_string).collect();
    domains.sort();
    if !domains.iter().any(|d| d == config.session.domain()) {
        warn!(
            domain = config.session.domain(),
            "domain not in question bank, default questions will be used"
        );
    }

    let mut shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    // Host capabilities -> state machine
    let (synth_tx, synthesis) = mpsc::unbounded_channel();
    let (recognition_tx, recognition) = mpsc::unbounded_channel();
    // UI (console and IPC) -> state machine
    let (command_tx, commands) = mpsc::channel::<Command>(32);
    // State machine -> console and IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<SessionEvent>(64);

    let devices: Arc<dyn MediaDevices> =
        Arc::new(SimulatedDevices::new(config.host.microphone, config.host.camera));
    let synthesizer = config
        .host
        .speech_output
        .then(|| Box::new(ConsoleSynthesizer::new(synth_tx)) as Box<dyn SpeechSynthesizer>);
    if synthesizer.is_none() {
        warn!("speech output disabled, questions will only be shown");
    }
    let (recognizer, dictation) = ConsoleRecognizer::new(recognition_tx);

    let controllers = Controllers {
        playback: PlaybackController::new(synthesizer, config.speech.clone()),
        capture: CaptureController::new(Some(Box::new(recognizer)), Arc::clone(&devices)),
        engagement: EngagementMonitor::new(
            devices,
            Box::new(RandomClassifier::new()),
            EngagementSampler::new(&config.engagement),
            config.engagement.sample_period,
        ),
        feedback: FeedbackSynthesizer::new(Box::new(HeuristicScorer)),
    };

    let mut machine =
        SessionMachine::new(config.session.clone(), bank, controllers, event_tx.clone());
    let snapshots = machine.snapshots();
    let mut summary_rx = event_tx.subscribe();

    let server = Server::new(
        &config.socket_path,
        SessionLink {
            snapshots: snapshots.clone(),
            commands: command_tx.clone(),
            events: event_tx.clone(),
        },
    )?;

    print_intro(&config, &domains);
    info!("session initialized, entering main loop");

    let inputs = MachineInputs {
        commands,
        synthesis,
        recognition,
    };

    // Main event loop
    tokio::select! {
        // Run the state machine until the session completes
        _ = machine.run(inputs) => {
            info!("session machine exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Read commands and dictation from stdin
        result = console_input(command_tx, dictation, snapshots) => {
            if let Err(e) = result {
                error!(?e, "console input error");
            }
        }

        // Render session events
        _ = print_events(event_tx.subscribe()) => {
            info!("event printer exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    machine.teardown();
    server.shutdown().await;

    loop {
        match summary_rx.try_recv() {
            Ok(SessionEvent::SessionComplete { summary, .. }) => print_summary(&summary),
            Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    info!("mock-interview stopped");

    Ok(())
}

/// What one console line asks for
#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput {
    Command(Command),
    Status,
    Help,
    Text(String),
}

fn parse_console_line(line: &str) -> Option<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let command = match line {
        "start" => Command::Confirm,
        "rec" => Command::ToggleCapture,
        "cam" => Command::ToggleCamera,
        "submit" => Command::SubmitAnswer,
        "next" => Command::NextQuestion,
        "prev" => Command::PreviousQuestion,
        "pause" => Command::PausePlayback,
        "resume" => Command::ResumePlayback,
        "listen" => Command::ListenReference,
        "quit" => Command::Leave,
        "status" => return Some(ConsoleInput::Status),
        "help" => return Some(ConsoleInput::Help),
        _ => match line.strip_prefix("edit ") {
            Some(text) => Command::EditAnswer {
                text: text.to_string(),
            },
            None => return Some(ConsoleInput::Text(line.to_string())),
        },
    };
    Some(ConsoleInput::Command(command))
}

async fn console_input(
    commands: mpsc::Sender<Command>,
    dictation: DictationFeed,
    snapshots: watch::Receiver<Session>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_console_line(&line) {
            None => continue,
            Some(ConsoleInput::Command(command)) => command,
            Some(ConsoleInput::Status) => {
                print_status(&snapshots.borrow());
                continue;
            }
            Some(ConsoleInput::Help) => {
                println!("{}", HELP);
                continue;
            }
            Some(ConsoleInput::Text(text)) => {
                if dictation.speak_line(&text) {
                    continue;
                }
                Command::EditAnswer { text }
            }
        };
        commands
            .send(command)
            .await
            .context("session machine stopped")?;
    }

    info!("stdin closed, leaving session");
    commands
        .send(Command::Leave)
        .await
        .context("session machine stopped")?;
    std::future::pending::<()>().await;
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::SessionStarted { questions, .. } => {
            println!("Session started with {} questions.", questions)
        }
        SessionEvent::QuestionAsked { index, total, text } => {
            println!("\nQuestion {}/{}: {}", index + 1, total, text)
        }
        SessionEvent::PhaseChanged { to, .. } => println!("  [{}]", to),
        SessionEvent::CaptureStarted { .. } => println!("  Recording... type what you say."),
        SessionEvent::CaptureStopped { .. } => println!("  Recording stopped."),
        SessionEvent::TranscriptUpdated { text, .. } => println!("  Answer: {}", text),
        SessionEvent::CaptureUnavailable { reason } => {
            println!("  Voice input unavailable ({}). Type your answer instead.", reason)
        }
        SessionEvent::CameraStarted => println!("  Camera on."),
        SessionEvent::CameraStopped => println!("  Camera off."),
        SessionEvent::CameraUnavailable { reason } => {
            println!("  Camera unavailable ({}).", reason)
        }
        SessionEvent::EngagementUpdated { .. } => {}
        SessionEvent::ClockTick { remaining_seconds } => {
            if remaining_seconds % 60 == 0 || *remaining_seconds <= 10 {
                println!("  Time remaining: {}", format_remaining(*remaining_seconds))
            }
        }
        SessionEvent::FeedbackReady { report, .. } => {
            println!(
                "\n  Content {}/100, delivery {}/100",
                report.content_score, report.delivery_score
            );
            for strength in &report.strengths {
                println!("  + {}", strength);
            }
            for improvement in &report.improvements {
                println!("  - {}", improvement);
            }
            println!("  Reference: {}", report.reference_answer);
        }
        SessionEvent::CommandRejected { command, reason } => {
            println!("  Cannot {}: {}", command.replace('_', " "), reason)
        }
        SessionEvent::SessionComplete { reason, .. } => {
            println!("\nSession complete ({:?}).", reason)
        }
    }
}

fn print_intro(config: &Config, domains: &[String]) {
    match config.session.mode() {
        SessionMode::QuestionCount { limit } => println!(
            "Mock interview: {} questions, domain '{}'.",
            limit,
            config.session.domain()
        ),
        SessionMode::Duration { seconds } => println!(
            "Mock interview: {} minutes, domain '{}'.",
            seconds / 60,
            config.session.domain()
        ),
    }
    println!("Available domains: {}.", domains.join(", "));
    println!("{}\n\nType 'start' when ready.", HELP);
}

fn print_status(session: &Session) {
    println!("  Phase: {}", session.phase);
    if let Some(question) = session.current_question() {
        println!(
            "  Question {}/{}: {}",
            session.current_index + 1,
            session.questions.len(),
            question
        );
    }
    println!("  Answer: {}", session.transcript);
    if let Some(seconds) = session.remaining_seconds {
        println!("  Time remaining: {}", format_remaining(seconds));
    }
    if let Some(metrics) = &session.latest_engagement {
        println!(
            "  Eye contact {}, posture {}, confidence {}, attentiveness {} ({})",
            metrics.eye_contact,
            metrics.posture,
            metrics.confidence,
            metrics.attentiveness,
            metrics.expression
        );
        for advisory in &metrics.advisories {
            println!("  ! {}", advisory);
        }
    }
    let flags = [
        (session.recording, "recording"),
        (session.speaking, "speaking"),
        (session.camera_on, "camera on"),
        (session.manual_entry, "typed entry"),
    ];
    let active: Vec<&str> = flags.iter().filter(|(on, _)| *on).map(|(_, name)| *name).collect();
    if !active.is_empty() {
        println!("  [{}]", active.join(", "));
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("\n=== Interview summary ({:?}) ===", summary.reason);
    println!(
        "Answered {} of {} questions.",
        summary.answered,
        summary.entries.len()
    );
    if let (Some(content), Some(delivery)) = (summary.mean_content, summary.mean_delivery) {
        println!("Average content {}/100, delivery {}/100.", content, delivery);
    }
    for (index, entry) in summary.entries.iter().enumerate() {
        println!("\n{}. {}", index + 1, entry.question);
        if entry.answer.is_empty() {
            println!("   (no answer)");
        } else {
            println!("   {}", entry.answer);
        }
        if let Some(report) = &entry.report {
            println!(
                "   content {}/100, delivery {}/100",
                report.content_score, report.delivery_score
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_console_commands() {
        assert_eq!(
            parse_console_line("start"),
            Some(ConsoleInput::Command(Command::Confirm))
        );
        assert_eq!(
            parse_console_line("  rec "),
            Some(ConsoleInput::Command(Command::ToggleCapture))
        );
        assert_eq!(parse_console_line("status"), Some(ConsoleInput::Status));
        assert_eq!(parse_console_line("   "), None);
    }

    #[test]
    fn test_parse_edit_and_free_text() {
        assert_eq!(
            parse_console_line("edit  my typed answer"),
            Some(ConsoleInput::Command(Command::EditAnswer {
                text: " my typed answer".to_string()
            }))
        );
        assert_eq!(
            parse_console_line("closures capture their environment"),
            Some(ConsoleInput::Text(
                "closures capture their environment".to_string()
            ))
        );
    }
}
