use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use crossbeam_channel::{never, select, tick, unbounded, Receiver, Sender};

use crate::fetcher::{self, CommentSource, FetchOptions};
use crate::ranking::Ranking;
use crate::target::Target;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// A failed cycle is attempted again at most this many times.
pub const MAX_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Fetching,
    Settled,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("poller: background loop has stopped")]
    Stopped,
}

/// Ticket for one fetch cycle, tagged with the generation it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub generation: u64,
    pub target: Target,
}

/// What the controller publishes after every transition.
#[derive(Debug, Clone, Default)]
pub struct PollUpdate {
    pub state: PollState,
    pub target: Option<Target>,
    pub ranking: Option<Arc<Ranking>>,
    pub error: Option<String>,
    pub last_success: Option<DateTime<Local>>,
}

impl PollUpdate {
    pub fn is_fetching(&self) -> bool {
        self.state == PollState::Fetching
    }

    /// True until the first cycle for the current target has succeeded.
    pub fn is_loading(&self) -> bool {
        self.target.is_some() && self.ranking.is_none() && self.error.is_none()
    }
}

/// Polling state machine. Holds no timers and performs no I/O.
#[derive(Debug, Default)]
pub struct Controller {
    target: Option<Target>,
    generation: u64,
    in_flight: bool,
    state: PollState,
    ranking: Option<Arc<Ranking>>,
    error: Option<String>,
    last_success: Option<DateTime<Local>>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Replaces the target. Results of earlier cycles are ignored from here on.
    /// Returns the first cycle for a new target.
    pub fn set_target(&mut self, target: Option<Target>) -> Option<Cycle> {
        self.generation += 1;
        self.target = target;
        self.in_flight = false;
        self.ranking = None;
        self.error = None;
        self.last_success = None;
        if self.target.is_some() {
            self.begin()
        } else {
            self.state = PollState::Idle;
            None
        }
    }

    /// Timer tick. Skipped while a cycle of the current generation is in flight.
    pub fn tick(&mut self) -> Option<Cycle> {
        if self.target.is_none() || self.in_flight {
            return None;
        }
        self.begin()
    }

    fn begin(&mut self) -> Option<Cycle> {
        let target = self.target.clone()?;
        self.in_flight = true;
        self.state = PollState::Fetching;
        Some(Cycle {
            generation: self.generation,
            target,
        })
    }

    /// Applies a finished cycle. Returns `false` when the result is stale.
    pub fn complete(&mut self, generation: u64, result: Result<Ranking, String>) -> bool {
        if generation != self.generation || !self.in_flight {
            return false;
        }
        self.in_flight = false;
        self.state = PollState::Settled;
        match result {
            Ok(ranking) => {
                self.ranking = Some(Arc::new(ranking));
                self.error = None;
                self.last_success = Some(Local::now());
            }
            Err(err) => {
                self.error = Some(err);
            }
        }
        true
    }

    pub fn snapshot(&self) -> PollUpdate {
        PollUpdate {
            state: self.state,
            target: self.target.clone(),
            ranking: self.ranking.clone(),
            error: self.error.clone(),
            last_success: self.last_success,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    /// Extra attempts of a failed cycle before it is reported as failed.
    /// Values above [`MAX_RETRIES`] are capped.
    pub retries: u32,
    pub fetch: FetchOptions,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            retries: MAX_RETRIES,
            fetch: FetchOptions::default(),
        }
    }
}

/// Runs one cycle, retrying up to `retries` times (never more than [`MAX_RETRIES`]).
pub fn run_cycle<S>(source: &S, target: &Target, options: &PollOptions) -> Result<Ranking>
where
    S: CommentSource + ?Sized,
{
    let retries = options.retries.min(MAX_RETRIES);
    let mut attempt = 0;
    loop {
        match fetcher::fetch_all_comments(source, target, options.fetch) {
            Ok(ranking) => return Ok(ranking),
            Err(err) if attempt < retries => {
                attempt += 1;
                tracing::warn!(
                    post = %target,
                    attempt,
                    error = %format!("{err:#}"),
                    "comment cycle failed, retrying"
                );
            }
            Err(err) => return Err(err),
        }
    }
}

enum Command {
    SetTarget(Option<Target>),
    Stop,
}

struct CycleDone {
    generation: u64,
    result: Result<Ranking, String>,
}

enum Event {
    Command(Command),
    Tick,
    Done(CycleDone),
}

type UpdateCallback = Box<dyn Fn(PollUpdate) + Send>;

/// Background scheduler around [`Controller`].
pub struct Poller {
    commands: Sender<Command>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<S, F>(source: Arc<S>, options: PollOptions, on_update: F) -> Self
    where
        S: CommentSource + ?Sized + 'static,
        F: Fn(PollUpdate) + Send + 'static,
    {
        let (commands, command_rx) = unbounded();
        let callback: UpdateCallback = Box::new(on_update);
        let handle = thread::spawn(move || run_loop(source, options, callback, command_rx));
        Self {
            commands,
            handle: Some(handle),
        }
    }

    /// Starts polling `target` immediately, or stops polling when `None`.
    pub fn set_target(&self, target: Option<Target>) -> Result<(), PollError> {
        self.commands
            .send(Command::SetTarget(target))
            .map_err(|_| PollError::Stopped)
    }

    pub fn stop(&mut self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<S>(
    source: Arc<S>,
    options: PollOptions,
    on_update: UpdateCallback,
    commands: Receiver<Command>,
) where
    S: CommentSource + ?Sized + 'static,
{
    let (done_tx, done_rx) = unbounded::<CycleDone>();
    let mut controller = Controller::new();
    let mut ticker: Receiver<std::time::Instant> = never();

    loop {
        let event = select! {
            recv(commands) -> msg => match msg {
                Ok(command) => Event::Command(command),
                Err(_) => Event::Command(Command::Stop),
            },
            recv(ticker) -> _ => Event::Tick,
            recv(done_rx) -> msg => match msg {
                Ok(done) => Event::Done(done),
                Err(_) => Event::Command(Command::Stop),
            },
        };

        match event {
            Event::Command(Command::Stop) => break,
            Event::Command(Command::SetTarget(target)) => {
                if controller.target() == target.as_ref() {
                    continue;
                }
                ticker = if target.is_some() {
                    tick(options.interval)
                } else {
                    never()
                };
                match &target {
                    Some(target) => tracing::info!(post = %target, "polling target"),
                    None => tracing::info!("polling stopped"),
                }
                if let Some(cycle) = controller.set_target(target) {
                    spawn_cycle(source.clone(), options, cycle, done_tx.clone());
                }
                on_update(controller.snapshot());
            }
            Event::Tick => match controller.tick() {
                Some(cycle) => {
                    spawn_cycle(source.clone(), options, cycle, done_tx.clone());
                    on_update(controller.snapshot());
                }
                None => tracing::debug!("poll tick skipped, cycle still in flight"),
            },
            Event::Done(done) => {
                if controller.complete(done.generation, done.result) {
                    on_update(controller.snapshot());
                } else {
                    tracing::debug!(generation = done.generation, "discarding stale cycle result");
                }
            }
        }
    }
}

fn spawn_cycle<S>(source: Arc<S>, options: PollOptions, cycle: Cycle, done: Sender<CycleDone>)
where
    S: CommentSource + ?Sized + 'static,
{
    thread::spawn(move || {
        let result = run_cycle(source.as_ref(), &cycle.target, &options).map_err(|err| {
            tracing::warn!(
                post = %cycle.target,
                error = %format!("{err:#}"),
                "comment cycle failed"
            );
            format!("{err:#}")
        });
        let _ = done.send(CycleDone {
            generation: cycle.generation,
            result,
        });
    });
}
