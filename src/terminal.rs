use std::io::BufRead;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::shutdown::shutdown_signal;
use crate::platform::{ClipboardAction, KeyChord, PlatformSignal};
use crate::schemas::test::TestDefinition;
use crate::session::{
    NotificationLevel, SessionHandle, SessionOutcome, SessionView, UiEvent,
};

const HELP: &str = "\
Commands:
  answer <n> <text>   answer question n (numbered from 1)
  show                print the timer and questions
  submit              submit the exam
  cancel              abandon the attempt and discard saved progress
  quit                leave now, progress is kept
  copy | cut | paste  clipboard actions
  key <chord>         key press, for example ctrl+c, f12, esc
  hide                switch away from the exam
  metrics             print session metrics
  help                this text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Answer { index: usize, value: String },
    Show,
    Submit,
    Cancel,
    Quit,
    Signal(PlatformSignal),
    Metrics,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum InputError {
    #[error("unknown command '{0}', type 'help' for the list")]
    Unknown(String),
    #[error("usage: answer <question number> <text>")]
    AnswerUsage,
    #[error("usage: key <chord>, for example ctrl+c")]
    KeyUsage,
}

/// Parses one line typed by the student. Blank lines yield `None`.
pub(crate) fn parse_input(line: &str) -> Result<Option<Input>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let input = match command.to_ascii_lowercase().as_str() {
        "answer" | "a" => {
            let (number, value) = rest.split_once(char::is_whitespace).ok_or(InputError::AnswerUsage)?;
            let number: usize = number.parse().map_err(|_| InputError::AnswerUsage)?;
            let index = number.checked_sub(1).ok_or(InputError::AnswerUsage)?;
            Input::Answer { index, value: value.trim().to_string() }
        }
        "show" => Input::Show,
        "submit" => Input::Submit,
        "cancel" => Input::Cancel,
        "quit" | "exit" => Input::Quit,
        "copy" => Input::Signal(PlatformSignal::Clipboard(ClipboardAction::Copy)),
        "cut" => Input::Signal(PlatformSignal::Clipboard(ClipboardAction::Cut)),
        "paste" => Input::Signal(PlatformSignal::Clipboard(ClipboardAction::Paste)),
        "key" => Input::Signal(PlatformSignal::Key(KeyChord::parse(rest).ok_or(InputError::KeyUsage)?)),
        "hide" => Input::Signal(PlatformSignal::VisibilityChanged { hidden: true }),
        "metrics" => Input::Metrics,
        "help" | "?" => Input::Help,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(input))
}

pub(crate) fn render_view(view: &SessionView, test: &TestDefinition) -> String {
    let mut out = format!(
        "{} [{}]  time left {}{}  violations {}",
        view.test_name,
        view.test_id,
        view.clock,
        if view.time_critical { " (hurry)" } else { "" },
        view.violation_count,
    );

    if let Some(message) = &view.blocking_message {
        out.push_str(&format!("\n\n{message}"));
        return out;
    }
    if !view.camera_ready {
        out.push_str("\n\nWaiting for camera...");
        return out;
    }

    for (index, question) in test.questions.iter().enumerate() {
        out.push_str(&format!("\n\n{}. {}", index + 1, question.text));
        let choices = question.choices();
        if !choices.is_empty() {
            out.push_str(&format!("\n   options: {}", choices.join(" / ")));
        }
        if let Some(answer) = view.answers.get(&index) {
            out.push_str(&format!("\n   your answer: {answer}"));
        }
    }
    out
}

fn print_event(event: &UiEvent) {
    match event {
        UiEvent::Notify(notification) => {
            let level = match notification.level {
                NotificationLevel::Success => "ok",
                NotificationLevel::Error => "error",
                NotificationLevel::Warning => "warning",
                NotificationLevel::Info => "info",
            };
            println!("[{level}] {}", notification.message);
        }
        UiEvent::Navigate(route) => println!("-> {route}"),
    }
}

fn drain_events(ui: &mut mpsc::UnboundedReceiver<UiEvent>) {
    while let Ok(event) = ui.try_recv() {
        print_event(&event);
    }
}

/// Blocking stdin reads run on a plain thread so they never hold up runtime
/// shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to read stdin");
                    break;
                }
            }
        }
    });
    rx
}

async fn leave(handle: SessionHandle, ui: &mut mpsc::UnboundedReceiver<UiEvent>) -> SessionOutcome {
    let outcome = handle.unmount().await;
    drain_events(ui);
    outcome
}

/// Runs the session from the terminal until it ends, the student quits or a
/// shutdown signal arrives.
pub(crate) async fn drive(
    handle: SessionHandle,
    mut ui: mpsc::UnboundedReceiver<UiEvent>,
) -> SessionOutcome {
    let mut lines = spawn_stdin_reader();
    let mut view = handle.view();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    println!("{HELP}\n");
    println!("{}", render_view(&handle.current(), handle.test()));

    loop {
        tokio::select! {
            reason = &mut shutdown => {
                tracing::info!(reason = reason.as_str(), "Leaving exam, progress kept");
                return leave(handle, &mut ui).await;
            }
            Some(event) = ui.recv() => print_event(&event),
            changed = view.changed() => {
                if changed.is_err() || view.borrow_and_update().phase.is_terminal() {
                    break;
                }
            }
            line = lines.recv() => {
                let Some(line) = line else {
                    tracing::info!("stdin closed, leaving exam");
                    return leave(handle, &mut ui).await;
                };
                match parse_input(&line) {
                    Ok(Some(Input::Answer { index, value })) => {
                        match handle.answer(index, value).await {
                            Ok(()) => println!("saved answer {}", index + 1),
                            Err(err) => println!("answer not saved: {err}"),
                        }
                    }
                    Ok(Some(Input::Show)) => println!("{}", render_view(&handle.current(), handle.test())),
                    Ok(Some(Input::Submit)) => handle.submit(),
                    Ok(Some(Input::Cancel)) => handle.cancel(),
                    Ok(Some(Input::Quit)) => {
                        if let Some(prompt) = handle.confirm_leave() {
                            println!("{prompt} Progress is saved; run again to resume.");
                        }
                        return leave(handle, &mut ui).await;
                    }
                    Ok(Some(Input::Signal(signal))) => {
                        if handle.signal(signal) {
                            println!("(blocked)");
                        }
                    }
                    Ok(Some(Input::Metrics)) => match crate::core::metrics::render() {
                        Some(rendered) => println!("{rendered}"),
                        None => println!("metrics are disabled, set PROCTOR_METRICS_ENABLED=1"),
                    },
                    Ok(Some(Input::Help)) => println!("{HELP}"),
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
        }
    }

    let outcome = handle.finished().await;
    drain_events(&mut ui);
    outcome
}
