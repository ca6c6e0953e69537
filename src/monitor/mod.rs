//! The monitoring actor: one per target, on its own thread.
//!
//! An actor opens the counters of its target, then waits for either a control
//! command or a tick. Every tick reads and resets all counters and sends one
//! [`Payload`] to the sink. The [`TERM`] command, or closing the channels,
//! stops the actor once the ticks already queued are handled.

use std::io;
use std::panic;
use std::thread::{self, JoinHandle};

use futures::channel::mpsc::{self, TrySendError, UnboundedReceiver, UnboundedSender};
use futures::executor::block_on;
use futures::{select_biased, StreamExt};
use tracing::{error, info, info_span};

use crate::config::MonitoringConfig;
use crate::count::Pmu;
use crate::error::{Chain, Error};
use crate::payload::Payload;
use crate::sample::Backend;
use crate::session::SessionTree;


/// Control command stopping an actor.
pub const TERM: &str = "$TERM";

/// Broadcasts tick timestamps to every subscribed actor.
#[derive(Debug, Default)]
pub struct Ticker {
    subscribers: Vec<UnboundedSender<u64>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<u64> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `timestamp` to every subscriber, returns how many are still listening.
    pub fn tick(&mut self, timestamp: u64) -> usize {
        self.subscribers.retain(|it| it.unbounded_send(timestamp).is_ok());
        self.subscribers.len()
    }
}

/// Monitoring actor of one target.
pub struct Monitor<P> {
    config: MonitoringConfig,
    pmu: P,
    backend: Option<Box<dyn Backend>>,
}

impl<P: Pmu> Monitor<P> {
    pub fn new(config: MonitoringConfig, pmu: P) -> Self {
        Self {
            config,
            pmu,
            backend: None,
        }
    }

    /// Symbolizes sampled call chains through `backend`.
    pub fn with_symbols(mut self, backend: impl Backend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Runs the actor on the current thread until it is terminated.
    ///
    /// Fails without entering the loop if the target name cannot be resolved or
    /// the counters cannot be opened. Failing ticks are logged and skipped.
    pub fn run(
        self,
        mut control: UnboundedReceiver<String>,
        mut ticks: UnboundedReceiver<u64>,
        sink: UnboundedSender<Payload>,
    ) -> Result<(), Error> {
        let name = match self.config.target.name() {
            Ok(name) => name,
            Err(e) => {
                let e = Error::TargetName(e);
                error!(error = %Chain(&e), "cannot create perf context");
                return Err(e);
            }
        };

        let span = info_span!("perf", name = %name);
        let _enter = span.enter();

        let mut tree = match SessionTree::build(&self.pmu, &self.config, self.backend.as_deref()) {
            Ok(tree) => tree,
            Err(e) => {
                error!(error = %Chain(&e), "cannot initialize perf monitoring");
                return Err(e);
            }
        };
        tree.enable();
        info!(groups = tree.groups().len(), cgroup = tree.is_cgroup(), "monitoring started");

        let mut on_tick = |timestamp: u64| match tree.collect(timestamp, &name) {
            Ok(payload) => {
                if sink.unbounded_send(payload).is_err() {
                    error!(timestamp, "reporting sink closed, payload dropped");
                }
            }
            Err(e) => error!(timestamp, error = %Chain(&e), "failed to populate payload"),
        };

        block_on(async {
            loop {
                select_biased! {
                    command = control.next() => match command {
                        Some(command) if command == TERM => {
                            info!("bye!");
                            break;
                        }
                        Some(command) => error!(command = %command, "invalid control command"),
                        None => {
                            info!("control channel closed");
                            break;
                        }
                    },
                    timestamp = ticks.next() => match timestamp {
                        Some(timestamp) => on_tick(timestamp),
                        None => {
                            info!("ticker closed");
                            break;
                        }
                    },
                }
            }

            // Ticks queued before the stop are still reported, later ones are refused.
            ticks.close();
            while let Some(timestamp) = ticks.next().await {
                on_tick(timestamp);
            }
        });

        Ok(())
    }
}

impl<P: Pmu + Send + 'static> Monitor<P> {
    /// Runs the actor on a new thread.
    pub fn spawn(self, ticks: UnboundedReceiver<u64>, sink: UnboundedSender<Payload>) -> io::Result<MonitorHandle> {
        let (control, rx) = mpsc::unbounded();
        let thread = thread::Builder::new()
            .name("perf-monitor".into())
            .spawn(move || self.run(rx, ticks, sink))?;
        Ok(MonitorHandle { control, thread })
    }
}

/// Control side of a spawned actor.
pub struct MonitorHandle {
    control: UnboundedSender<String>,
    thread: JoinHandle<Result<(), Error>>,
}

impl MonitorHandle {
    pub fn send(&self, command: impl Into<String>) -> Result<(), TrySendError<String>> {
        self.control.unbounded_send(command.into())
    }

    /// Stops the actor and waits for it, returning how it ended.
    pub fn terminate(self) -> Result<(), Error> {
        // Fails only if the actor is already gone, which join reports.
        let _ = self.control.unbounded_send(TERM.into());
        match self.thread.join() {
            Ok(result) => result,
            Err(e) => panic::resume_unwind(e),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}
