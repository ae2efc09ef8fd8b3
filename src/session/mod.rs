//! The proctored exam session: one actor task owns the attempt and every
//! producer (timer, camera watcher, platform signals, the student) talks to it
//! through a [`SessionHandle`].

pub mod bootstrap;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod events;
pub(crate) mod persistence;
pub mod state;
pub mod submission;
pub mod violation;

pub use bootstrap::{bootstrap, Bootstrap};
pub use controller::{SessionConfig, SessionController, SessionDeps, SessionHandle, LEAVE_WARNING};
pub use countdown::CountdownState;
pub use error::{AnswerRejected, SessionError};
pub use events::{Notification, NotificationLevel, SessionPhase, SessionView, UiEvent};
pub use state::{storage_key, ExamSession, SessionSnapshot};
pub use submission::{SessionOutcome, SubmissionLatch, SubmissionTrigger};
pub use violation::{ViolationEvent, ViolationKind, ViolationPolicy, ViolationVerdict};
