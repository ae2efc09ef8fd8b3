use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use validator::Validate;

use crate::core::config::Settings;
use crate::core::{metrics, time};
use crate::platform::{Camera, CameraError, CameraHandle, Fullscreen, MediaStream, PlatformSignal};
use crate::schemas::submission::{CheatingReport, SubmitPayload, SubmitReceipt};
use crate::schemas::test::TestDefinition;
use crate::schemas::user::CurrentUser;
use crate::services::{ProctoringLog, ServiceError, SessionStore, TestService};
use crate::session::bootstrap::{bootstrap, Bootstrap};
use crate::session::countdown::{Countdown, CountdownState};
use crate::session::error::{AnswerRejected, SessionError};
use crate::session::events::{Notification, NotificationLevel, SessionPhase, SessionView, UiEvent};
use crate::session::persistence::Persister;
use crate::session::state::ExamSession;
use crate::session::submission::{SessionOutcome, SubmissionLatch, SubmissionTrigger};
use crate::session::violation::{ViolationEvent, ViolationKind, ViolationPolicy, ViolationVerdict};


pub const LEAVE_WARNING: &str = "Your exam is still in progress.";

const CAMERA_BLOCKED_MESSAGE: &str =
    "Enable camera to begin. Questions will appear once camera is active.";
const CAMERA_DENIED_NOTICE: &str = "Camera permission denied. Enable camera to start the exam.";
const SUBMITTED_NOTICE: &str = "Test submitted and evaluated!";
const TERMINATED_NOTICE: &str = "Exam terminated due to repeated violations";
const SUBMIT_FAILED_NOTICE: &str = "Submission failed";
const SUBMIT_TRANSPORT_NOTICE: &str = "Server error during submission";

type AcquireFuture =
    Pin<Box<dyn Future<Output = Result<Box<dyn MediaStream>, CameraError>> + Send>>;

/// Collaborators a session talks to. Cheap to clone.
#[derive(Clone)]
pub struct SessionDeps {
    pub tests: Arc<dyn TestService>,
    pub proctoring_log: Arc<dyn ProctoringLog>,
    pub store: Arc<dyn SessionStore>,
    pub camera: Arc<dyn Camera>,
    pub fullscreen: Arc<dyn Fullscreen>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub policy: ViolationPolicy,
    pub tick: Duration,
    pub persist_debounce: Duration,
    pub time_critical_seconds: u64,
    pub home_route: String,
    pub notification_duration: Duration,
    /// How long a finished session waits for an in-flight termination
    /// report before giving up on it.
    pub report_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: ViolationPolicy::default(),
            tick: Duration::from_secs(1),
            persist_debounce: Duration::from_millis(16),
            time_critical_seconds: 300,
            home_route: String::from("/student-home"),
            notification_duration: Duration::from_secs(3),
            report_grace: Duration::from_secs(10),
        }
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            policy: ViolationPolicy::from(settings.proctoring()),
            tick: settings.session().tick(),
            persist_debounce: settings.session().persist_debounce(),
            time_critical_seconds: settings.session().time_critical_seconds,
            home_route: settings.session().home_route.clone(),
            notification_duration: settings.session().notification_duration(),
            report_grace: settings.api().request_timeout(),
        }
    }
}

#[derive(Debug)]
enum SessionCommand {
    Answer {
        index: usize,
        value: String,
        reply: oneshot::Sender<Result<(), AnswerRejected>>,
    },
    Submit,
    Cancel,
    Signal(PlatformSignal),
    Unmount,
}

/// Starts exam sessions against one set of collaborators.
#[derive(Clone)]
pub struct SessionController {
    deps: SessionDeps,
    config: SessionConfig,
}

impl SessionController {
    pub fn new(deps: SessionDeps, config: SessionConfig) -> Self {
        Self { deps, config }
    }

    /// Loads the test, restores any persisted attempt and spawns the session
    /// task. Camera acquisition and the countdown begin immediately.
    pub async fn start(
        &self,
        user: CurrentUser,
        test_id: &str,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<UiEvent>), SessionError> {
        user.validate().map_err(SessionError::InvalidUser)?;

        let Bootstrap { test, session, restored } =
            bootstrap(self.deps.tests.as_ref(), self.deps.store.as_ref(), test_id, &user.id).await?;
        let test = Arc::new(test);

        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (camera_ended_tx, camera_ended_rx) = mpsc::channel(1);
        let latch = SubmissionLatch::new();

        let countdown = Countdown::start(self.config.tick);
        let initial = render_view(
            &test,
            &session,
            countdown.state(),
            SessionPhase::AwaitingCamera,
            false,
            None,
            self.config.time_critical_seconds,
        );
        let (view_tx, view_rx) = watch::channel(initial);

        let camera = self.deps.camera.clone();
        let acquiring: AcquireFuture = Box::pin(async move { camera.acquire().await });

        let persister = Persister::new(
            self.deps.store.clone(),
            session.storage_key(),
            self.config.persist_debounce,
        );

        tracing::info!(
            test_id = session.test_id(),
            student_id = session.student_id(),
            restored,
            "Exam session started"
        );

        let actor = SessionActor {
            user,
            test: test.clone(),
            session,
            deps: self.deps.clone(),
            config: self.config.clone(),
            latch: latch.clone(),
            countdown,
            persister,
            acquiring: Some(acquiring),
            camera: CameraHandle::empty(),
            camera_ready: false,
            camera_watch: None,
            report: None,
            camera_ended_tx,
            camera_ended: camera_ended_rx,
            fullscreen_armed: false,
            phase: SessionPhase::AwaitingCamera,
            blocking_message: None,
            view: view_tx,
            ui: ui_tx,
        };
        let task = tokio::spawn(actor.run(commands_rx));

        Ok((SessionHandle { commands: commands_tx, view: view_rx, test, latch, task }, ui_rx))
    }
}

/// Caller side of a running session. Dropping it tears the session down.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    test: Arc<TestDefinition>,
    latch: SubmissionLatch,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub async fn answer(&self, index: usize, value: impl Into<String>) -> Result<(), AnswerRejected> {
        let (reply, response) = oneshot::channel();
        let command = SessionCommand::Answer { index, value: value.into(), reply };
        if self.commands.send(command).is_err() {
            return Err(AnswerRejected::SessionClosed);
        }
        response.await.unwrap_or(Err(AnswerRejected::SessionClosed))
    }

    pub fn submit(&self) {
        self.send(SessionCommand::Submit);
    }

    pub fn cancel(&self) {
        self.send(SessionCommand::Cancel);
    }

    /// Forwards a platform signal and tells the adapter whether to suppress
    /// the default action.
    pub fn signal(&self, signal: PlatformSignal) -> bool {
        let block = signal.should_block(self.latch.is_engaged());
        self.send(SessionCommand::Signal(signal));
        block
    }

    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    pub fn current(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn is_submitted(&self) -> bool {
        self.latch.is_engaged()
    }

    /// Prompt to show before the page is left, if leaving would abandon the
    /// attempt.
    pub fn confirm_leave(&self) -> Option<&'static str> {
        if self.latch.is_engaged() || !self.view.borrow().phase.guards_leave() {
            None
        } else {
            Some(LEAVE_WARNING)
        }
    }

    /// Tears the session down, keeping its cache. A session that already
    /// ended reports its real outcome.
    pub async fn unmount(self) -> SessionOutcome {
        let Self { commands, task, .. } = self;
        let _ = commands.send(SessionCommand::Unmount);
        drop(commands);
        join_outcome(task.await)
    }

    /// Waits for the session to end on its own (submission or cancellation).
    pub async fn finished(self) -> SessionOutcome {
        let Self { commands, task, .. } = self;
        let outcome = join_outcome(task.await);
        drop(commands);
        outcome
    }

    fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Session already ended; command dropped");
        }
    }
}

fn join_outcome(joined: Result<SessionOutcome, JoinError>) -> SessionOutcome {
    joined.unwrap_or_else(|err| {
        tracing::error!(error = %err, "Session task join failed");
        SessionOutcome::Unmounted
    })
}

fn render_view(
    test: &TestDefinition,
    session: &ExamSession,
    countdown: CountdownState,
    phase: SessionPhase,
    camera_ready: bool,
    blocking_message: Option<&str>,
    time_critical_seconds: u64,
) -> SessionView {
    let seconds_remaining = session.seconds_remaining();
    SessionView {
        phase,
        test_id: session.test_id().to_string(),
        test_name: test.display_name().to_string(),
        seconds_remaining,
        countdown,
        clock: time::format_clock(Some(seconds_remaining)),
        time_critical: time::is_time_critical(seconds_remaining, time_critical_seconds),
        violation_count: session.violation_count(),
        answers: session.answers().clone(),
        camera_ready,
        blocking_message: blocking_message.map(str::to_string),
    }
}

fn submit_failure_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Rejected(message) => message.clone(),
        ServiceError::Transport { .. } => SUBMIT_TRANSPORT_NOTICE.to_string(),
        _ => SUBMIT_FAILED_NOTICE.to_string(),
    }
}

async fn acquisition(slot: &mut Option<AcquireFuture>) -> Result<Box<dyn MediaStream>, CameraError> {
    match slot.as_mut() {
        Some(acquiring) => acquiring.await,
        None => std::future::pending().await,
    }
}

/// Drives the submit call while draining commands that arrive meanwhile.
async fn await_submission(
    tests: &dyn TestService,
    test_id: &str,
    payload: &SubmitPayload,
    commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
) -> Result<SubmitReceipt, ServiceError> {
    let submit = tests.submit(test_id, payload);
    tokio::pin!(submit);
    let mut commands_open = true;

    loop {
        tokio::select! {
            result = &mut submit => return result,
            command = commands.recv(), if commands_open => match command {
                Some(SessionCommand::Answer { reply, .. }) => {
                    let _ = reply.send(Err(AnswerRejected::SessionClosed));
                }
                Some(command) => {
                    tracing::debug!(?command, "Ignoring command while submission is in flight");
                }
                None => commands_open = false,
            },
        }
    }
}

/// Sole owner of the session state. Every mutation runs on this task.
struct SessionActor {
    user: CurrentUser,
    test: Arc<TestDefinition>,
    session: ExamSession,
    deps: SessionDeps,
    config: SessionConfig,
    latch: SubmissionLatch,
    countdown: Countdown,
    persister: Persister,
    acquiring: Option<AcquireFuture>,
    camera: CameraHandle,
    camera_ready: bool,
    camera_watch: Option<JoinHandle<()>>,
    report: Option<JoinHandle<()>>,
    camera_ended_tx: mpsc::Sender<()>,
    camera_ended: mpsc::Receiver<()>,
    fullscreen_armed: bool,
    phase: SessionPhase,
    blocking_message: Option<String>,
    view: watch::Sender<SessionView>,
    ui: mpsc::UnboundedSender<UiEvent>,
}

impl SessionActor {
    async fn run(mut self, commands: mpsc::UnboundedReceiver<SessionCommand>) -> SessionOutcome {
        let outcome = self.drive(commands).await;
        self.settle_report().await;
        outcome
    }

    /// Waits for the termination report once the UI has been released, so an
    /// exiting process does not cancel it mid-flight.
    async fn settle_report(&mut self) {
        let Some(report) = self.report.take() else {
            return;
        };
        match tokio::time::timeout(self.config.report_grace, report).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "Termination report task failed"),
            Err(_) => tracing::warn!(
                test_id = self.session.test_id(),
                grace_ms = self.config.report_grace.as_millis() as u64,
                "Termination report still pending, no longer waiting"
            ),
        }
    }

    async fn drive(&mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) -> SessionOutcome {
        // A previous load may have ended without a successful submit.
        if self.config.policy.is_exhausted(self.session.violation_count()) {
            tracing::warn!(
                test_id = self.session.test_id(),
                violations = self.session.violation_count(),
                "Restored session is past the violation limit"
            );
            if let Some(outcome) = self.submit(SubmissionTrigger::Terminated, &mut commands).await {
                return outcome;
            }
        }
        if self.session.seconds_remaining() == 0 {
            if let Some(outcome) = self.submit(SubmissionTrigger::TimerExpired, &mut commands).await {
                return outcome;
            }
        }

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let outcome = match command {
                        Some(SessionCommand::Answer { index, value, reply }) => {
                            let _ = reply.send(self.apply_answer(index, value));
                            None
                        }
                        Some(SessionCommand::Submit) => {
                            self.submit(SubmissionTrigger::Manual, &mut commands).await
                        }
                        Some(SessionCommand::Cancel) => Some(self.cancel().await),
                        Some(SessionCommand::Signal(signal)) => {
                            self.on_signal(signal, &mut commands).await
                        }
                        Some(SessionCommand::Unmount) | None => Some(self.teardown().await),
                    };
                    if let Some(outcome) = outcome {
                        return outcome;
                    }
                }
                acquired = acquisition(&mut self.acquiring) => {
                    self.acquiring = None;
                    self.on_camera(acquired);
                }
                Some(()) = self.camera_ended.recv() => {
                    if let Some(outcome) =
                        self.record_violation(ViolationKind::CameraOff, &mut commands).await
                    {
                        return outcome;
                    }
                }
                _ = self.countdown.tick() => {
                    if let Some(outcome) = self.on_tick(&mut commands).await {
                        return outcome;
                    }
                }
                _ = self.persister.due() => {
                    let snapshot = self.session.snapshot();
                    self.persister.flush(&snapshot).await;
                }
            }
        }
    }

    fn apply_answer(&mut self, index: usize, value: String) -> Result<(), AnswerRejected> {
        if self.latch.is_engaged() {
            return Err(AnswerRejected::SessionClosed);
        }
        if !self.camera_ready {
            return Err(AnswerRejected::CameraNotReady);
        }
        self.test.check_answer(index, &value)?;

        self.session.record_answer(index, value);
        self.persister.schedule();
        self.publish();
        Ok(())
    }

    async fn on_tick(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Option<SessionOutcome> {
        let remaining = self.session.tick();
        metrics::set_seconds_remaining(remaining);
        self.persister.schedule();
        self.publish();

        if remaining == 0 {
            tracing::info!(test_id = self.session.test_id(), "Time is up");
            return self.submit(SubmissionTrigger::TimerExpired, commands).await;
        }
        None
    }

    async fn on_signal(
        &mut self,
        signal: PlatformSignal,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Option<SessionOutcome> {
        let kind = match signal {
            PlatformSignal::VisibilityChanged { hidden } => hidden.then_some(ViolationKind::TabSwitch),
            PlatformSignal::FullscreenChanged { active } => {
                // The first change is the session's own fullscreen request.
                let armed = mem::replace(&mut self.fullscreen_armed, true);
                (armed && !active).then_some(ViolationKind::FullscreenExit)
            }
            PlatformSignal::Key(chord) => chord.is_cheat_key().then_some(ViolationKind::CheatKey),
            PlatformSignal::Clipboard(action) => {
                tracing::debug!(?action, "Clipboard action blocked");
                Some(ViolationKind::Clipboard)
            }
        };

        match kind {
            Some(kind) => self.record_violation(kind, commands).await,
            None => None,
        }
    }

    async fn record_violation(
        &mut self,
        kind: ViolationKind,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Option<SessionOutcome> {
        let event = ViolationEvent::now(kind);
        let count = self.session.record_violation(event)?;
        metrics::record_violation(kind);
        tracing::warn!(
            test_id = self.session.test_id(),
            student_id = self.session.student_id(),
            violation = kind.as_str(),
            count,
            at = %time::format_offset(event.at),
            "Proctoring violation detected"
        );
        self.persister.schedule();

        match self.config.policy.evaluate(count) {
            ViolationVerdict::Warn { count, final_warning } => {
                let message = self.config.policy.warning_message(kind, count, final_warning);
                self.notify(Notification::transient(
                    NotificationLevel::Warning,
                    message,
                    self.config.notification_duration,
                ));
                self.publish();
                None
            }
            ViolationVerdict::Terminate { count } => {
                tracing::error!(
                    test_id = self.session.test_id(),
                    student_id = self.session.student_id(),
                    violation = kind.as_str(),
                    count,
                    "Violation limit reached, terminating exam"
                );
                metrics::record_termination(kind);
                self.report_termination(kind);
                self.submit(SubmissionTrigger::Terminated, commands).await
            }
        }
    }

    fn report_termination(&mut self, kind: ViolationKind) {
        let log = self.deps.proctoring_log.clone();
        let report = CheatingReport {
            student_id: self.session.student_id().to_string(),
            test_id: self.session.test_id().to_string(),
            event: kind,
        };
        self.report = Some(tokio::spawn(async move {
            if let Err(err) = log.report(&report).await {
                metrics::record_report_failure();
                tracing::warn!(
                    test_id = %report.test_id,
                    student_id = %report.student_id,
                    error = %err,
                    "Failed to report exam termination"
                );
            }
        }));
    }

    fn on_camera(&mut self, acquired: Result<Box<dyn MediaStream>, CameraError>) {
        match acquired {
            Ok(stream) => {
                self.camera = CameraHandle::new(stream);
                if let Some(mut ended) = self.camera.track_ended() {
                    let notify = self.camera_ended_tx.clone();
                    self.camera_watch = Some(tokio::spawn(async move {
                        let ended_now = ended.wait_for(|ended| *ended).await.is_ok();
                        if ended_now {
                            let _ = notify.send(()).await;
                        }
                    }));
                }

                self.camera_ready = true;
                self.phase = SessionPhase::Active;
                self.blocking_message = None;
                tracing::info!(test_id = self.session.test_id(), "Camera active, questions unlocked");

                let fullscreen = self.deps.fullscreen.clone();
                tokio::spawn(async move {
                    if let Err(err) = fullscreen.request_fullscreen().await {
                        tracing::debug!(error = %err, "Fullscreen request declined");
                    }
                });
            }
            Err(err) => {
                tracing::error!(
                    test_id = self.session.test_id(),
                    error = %err,
                    "Camera acquisition failed, exam blocked"
                );
                self.phase = SessionPhase::CameraBlocked;
                self.blocking_message = Some(CAMERA_BLOCKED_MESSAGE.to_string());
                self.notify(Notification::persistent(NotificationLevel::Error, CAMERA_DENIED_NOTICE));
            }
        }
        self.publish();
    }

    /// Runs the single submission for this session. Returns `None` when a
    /// submission already happened.
    async fn submit(
        &mut self,
        trigger: SubmissionTrigger,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Option<SessionOutcome> {
        if !self.latch.engage() {
            tracing::debug!(trigger = trigger.as_str(), "Submission already started");
            return None;
        }

        self.session.mark_submitted();
        self.countdown.stop();
        self.release_camera();
        self.phase = SessionPhase::Submitting;
        self.publish();
        let snapshot = self.session.snapshot();
        self.persister.flush(&snapshot).await;

        let payload = SubmitPayload::new(
            &self.user,
            self.session.answers().clone(),
            self.session.seconds_remaining(),
        );
        tracing::info!(
            test_id = self.session.test_id(),
            trigger = trigger.as_str(),
            answered = payload.answers.len(),
            time_left = payload.time_left,
            "Submitting exam"
        );

        let result =
            await_submission(self.deps.tests.as_ref(), self.session.test_id(), &payload, commands)
                .await;
        let violation = match trigger {
            SubmissionTrigger::Terminated => self.session.last_violation(),
            SubmissionTrigger::Manual | SubmissionTrigger::TimerExpired => None,
        };

        let outcome = match result {
            Ok(receipt) => {
                metrics::record_submission(trigger, "submitted");
                self.persister.clear().await;
                tracing::info!(test_id = self.session.test_id(), trigger = trigger.as_str(), "Exam submitted");
                if trigger == SubmissionTrigger::Terminated {
                    self.notify_error(TERMINATED_NOTICE);
                } else {
                    self.notify(Notification::transient(
                        NotificationLevel::Success,
                        SUBMITTED_NOTICE,
                        self.config.notification_duration,
                    ));
                }
                self.phase = SessionPhase::Submitted;
                SessionOutcome::Submitted { trigger, receipt, violation }
            }
            Err(err) => {
                metrics::record_submission(trigger, "failed");
                tracing::error!(
                    test_id = self.session.test_id(),
                    trigger = trigger.as_str(),
                    error = %err,
                    "Exam submission failed, progress kept for retry"
                );
                let reason = submit_failure_message(&err);
                self.notify_error(&reason);
                if trigger == SubmissionTrigger::Terminated {
                    self.notify_error(TERMINATED_NOTICE);
                }
                self.phase = SessionPhase::SubmitFailed;
                SessionOutcome::SubmitFailed { trigger, reason, violation }
            }
        };

        self.navigate_home();
        self.publish();
        Some(outcome)
    }

    async fn cancel(&mut self) -> SessionOutcome {
        tracing::info!(test_id = self.session.test_id(), "Exam cancelled");
        self.countdown.stop();
        self.release_camera();
        self.persister.clear().await;
        self.phase = SessionPhase::Cancelled;
        self.navigate_home();
        self.publish();
        SessionOutcome::Cancelled
    }

    async fn teardown(&mut self) -> SessionOutcome {
        self.countdown.stop();
        self.release_camera();
        let snapshot = self.session.snapshot();
        self.persister.flush(&snapshot).await;
        self.phase = SessionPhase::Unmounted;
        self.publish();
        tracing::info!(
            test_id = self.session.test_id(),
            seconds_remaining = self.session.seconds_remaining(),
            "Exam session torn down, progress kept"
        );
        SessionOutcome::Unmounted
    }

    fn release_camera(&mut self) {
        if let Some(watch) = self.camera_watch.take() {
            watch.abort();
        }
        self.acquiring = None;
        self.camera.release();
        self.camera_ready = false;
    }

    fn notify(&self, notification: Notification) {
        if self.ui.send(UiEvent::Notify(notification)).is_err() {
            tracing::debug!("UI receiver dropped, notification discarded");
        }
    }

    fn notify_error(&self, message: &str) {
        self.notify(Notification::transient(
            NotificationLevel::Error,
            message,
            self.config.notification_duration,
        ));
    }

    fn navigate_home(&self) {
        if self.ui.send(UiEvent::Navigate(self.config.home_route.clone())).is_err() {
            tracing::debug!("UI receiver dropped, navigation discarded");
        }
    }

    fn publish(&self) {
        self.view.send_replace(render_view(
            &self.test,
            &self.session,
            self.countdown.state(),
            self.phase,
            self.camera_ready,
            self.blocking_message.as_deref(),
            self.config.time_critical_seconds,
        ));
    }
}
