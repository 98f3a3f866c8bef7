//! Live, timed section driven by a single actor task.
//!
//! [`LiveSection::spawn`] starts a [`SectionSession`] and moves it, together
//! with its [`SectionTimer`], into one tokio task. Clock ticks and caller
//! commands reach the session through the same `select!` loop, so at most
//! one mutation is ever in flight.
//!
//! The task resolves to the [`SectionResult`] when the section completes,
//! or to [`EngineError::SessionTornDown`] if it is torn down first. Either
//! way the timer is cancelled before the task returns. A completed section
//! is reported to the [`ResultSink`] once; a torn-down one is not.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::question::{QuestionDescriptor, Section};
use crate::session::{AnswerOutcome, SectionResult, SectionSession, SessionSnapshot, TickOutcome};
use crate::sink::{NoopSink, ResultSink};
use crate::timer::SectionTimer;

/// Pending commands before callers wait on the actor.
const COMMAND_BUFFER: usize = 16;

enum Command {
    Submit {
        is_correct: bool,
        reply: oneshot::Sender<Result<AnswerOutcome>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Teardown,
}

// ============================================================================
// LiveSectionHandle
// ============================================================================

/// Cloneable handle for talking to a running live section.
#[derive(Debug, Clone)]
pub struct LiveSectionHandle {
    section: Section,
    commands: mpsc::Sender<Command>,
}

impl LiveSectionHandle {
    /// Submits the graded answer to the question on offer.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SessionClosed` if the section has already
    /// finished, or a misuse error from the session.
    pub async fn submit_answer(&self, is_correct: bool) -> Result<AnswerOutcome> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Submit { is_correct, reply })
            .await
            .map_err(|_| self.closed_error())?;
        response.await.map_err(|_| self.closed_error())?
    }

    /// Reads the current state of the section.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SessionClosed` if the section has already finished.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| self.closed_error())?;
        response.await.map_err(|_| self.closed_error())
    }

    /// Asks the section to stop without completing.
    ///
    /// Returns `false` if the section had already finished.
    pub async fn teardown(&self) -> bool {
        self.commands.send(Command::Teardown).await.is_ok()
    }

    /// Returns `true` once the actor has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Waits until the actor has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await;
    }

    /// Section this handle talks to.
    #[must_use]
    pub const fn section(&self) -> Section {
        self.section
    }

    const fn closed_error(&self) -> EngineError {
        EngineError::SessionClosed {
            section: self.section,
        }
    }
}

// ============================================================================
// LiveSection
// ============================================================================

/// A section running on its own task with a live clock.
#[derive(Debug)]
pub struct LiveSection {
    handle: LiveSectionHandle,
    first_question: Option<QuestionDescriptor>,
    task: JoinHandle<Result<SectionResult>>,
}

impl LiveSection {
    /// Starts `session` and spawns its actor, ticking every `tick_interval`.
    ///
    /// The result is not reported anywhere; use
    /// [`LiveSection::spawn_with_sink`] to record it.
    ///
    /// # Errors
    ///
    /// Returns the session's misuse error if it was already started.
    pub fn spawn<R>(session: SectionSession<R>, tick_interval: Duration) -> Result<Self>
    where
        R: Rng + Send + 'static,
    {
        Self::spawn_with_sink(session, tick_interval, Arc::new(NoopSink))
    }

    /// Like [`LiveSection::spawn`], but reports the completed section to `sink`:
    /// one result payload and one attempt for the section.
    ///
    /// If the pool holds no valid question the section completes at once,
    /// no timer is started and [`LiveSection::first_question`] is `None`.
    ///
    /// # Errors
    ///
    /// Returns the session's misuse error if it was already started.
    pub fn spawn_with_sink<R>(
        mut session: SectionSession<R>,
        tick_interval: Duration,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self>
    where
        R: Rng + Send + 'static,
    {
        let section = session.section();
        let first_question = session.start()?;
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);

        let task = if session.is_completed() {
            drop(receiver);
            tokio::spawn(async move { finished_result(&session, sink.as_ref()) })
        } else {
            let actor = Actor {
                session,
                timer: SectionTimer::start(tick_interval),
                commands: receiver,
                sink,
            };
            tokio::spawn(actor.run())
        };

        Ok(Self {
            handle: LiveSectionHandle { section, commands },
            first_question,
            task,
        })
    }

    /// Returns a new handle to the section.
    #[must_use]
    pub fn handle(&self) -> LiveSectionHandle {
        self.handle.clone()
    }

    /// The question offered when the section started.
    #[must_use]
    pub const fn first_question(&self) -> Option<&QuestionDescriptor> {
        self.first_question.as_ref()
    }

    /// Waits for the section to finish.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SessionTornDown` if the section was torn down
    /// and `EngineError::SessionClosed` if its task was lost.
    pub async fn finished(self) -> Result<SectionResult> {
        let Self { handle, task, .. } = self;
        let section = handle.section;
        let outcome = task.await;
        drop(handle);
        outcome.unwrap_or_else(|e| {
            warn!(%section, error = %e, "Live section task failed");
            Err(EngineError::SessionClosed { section })
        })
    }
}

/// Takes the result of a completed session and reports it to `sink`.
fn finished_result<R>(session: &SectionSession<R>, sink: &dyn ResultSink) -> Result<SectionResult> {
    let section = session.section();
    let result = session
        .result()
        .ok_or(EngineError::SessionClosed { section })?;

    if let Err(e) = sink.record_result(&result.payload()) {
        warn!(%section, error = %e, "Failed to record section result");
    }
    if let Err(e) = sink.increment_attempts(section) {
        warn!(%section, error = %e, "Failed to count attempt");
    }
    Ok(result)
}

// ============================================================================
// Actor
// ============================================================================

struct Actor<R> {
    session: SectionSession<R>,
    timer: SectionTimer,
    commands: mpsc::Receiver<Command>,
    sink: Arc<dyn ResultSink>,
}

impl<R: Rng> Actor<R> {
    async fn run(mut self) -> Result<SectionResult> {
        loop {
            tokio::select! {
                Some(()) = self.timer.next_tick() => {
                    let section = self.session.section();
                    match self.session.tick() {
                        Ok(TickOutcome::Completed(_)) => return self.finish(),
                        Ok(TickOutcome::Running { remaining_seconds }) => {
                            debug!(%section, remaining_seconds, "Tick");
                        }
                        Err(e) => warn!(%section, error = %e, "Tick rejected"),
                    }
                }

                command = self.commands.recv() => {
                    match command {
                        Some(Command::Submit { is_correct, reply }) => {
                            let outcome = self.session.submit_answer(is_correct);
                            let completed = matches!(outcome, Ok(AnswerOutcome::Completed(_)));
                            if reply.send(outcome).is_err() {
                                debug!(section = %self.session.section(), "Caller went away");
                            }
                            if completed {
                                return self.finish();
                            }
                        }
                        Some(Command::Snapshot { reply }) => {
                            let _ = reply.send(self.session.snapshot());
                        }
                        Some(Command::Teardown) | None => return self.tear_down(),
                    }
                }
            }
        }
    }

    fn finish(mut self) -> Result<SectionResult> {
        self.timer.cancel();
        finished_result(&self.session, self.sink.as_ref())
    }

    fn tear_down(mut self) -> Result<SectionResult> {
        self.timer.cancel();
        let section = self.session.section();
        let answered = self.session.history().len();
        let remaining_seconds = self.session.remaining_seconds();
        info!(%section, answered, remaining_seconds, "Live section torn down");
        Err(EngineError::SessionTornDown { section, answered })
    }
}
