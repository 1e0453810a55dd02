#![deny(missing_docs)]
//! Native worker thread harness.
//!
//! A [`NativeWorker`] owns one dedicated OS thread that pulls commands from a
//! port, hands each to a [`WorkerEngine`], and pushes the resulting reports
//! back. The host never blocks on the worker: it submits with
//! [`NativeWorker::try_submit`] and collects reports with
//! [`NativeWorker::drain`] from its own loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, trace};
use smallvec::SmallVec;
use transport::{
    make_port_pair, ConsumerPort, ProducerPort, SubmitOutcome, TransportError, TransportResult,
};

/// How long the worker parks waiting for a command before re-checking the stop flag.
const IDLE_POLL: Duration = Duration::from_millis(20);

/// Engine executed on the worker thread.
pub trait WorkerEngine: Send + 'static {
    /// Command type accepted by the engine.
    type Cmd: Send + 'static;
    /// Report type produced by the engine.
    type Rep: Send + 'static;

    /// Handles a single command, appending any reports to `out`.
    fn handle(&mut self, cmd: Self::Cmd, out: &mut Vec<Self::Rep>);

    /// Short engine name used for the thread name and logs.
    fn name(&self) -> &'static str;
}

/// Construction options for a [`NativeWorker`].
#[derive(Clone, Debug, Default)]
pub struct WorkerOptions {
    /// Optional bound on queued commands; `None` is unbounded.
    pub cmd_capacity: Option<usize>,
}

/// Handle to a running worker thread.
pub struct NativeWorker<Cmd, Rep> {
    cmd_tx: Option<ProducerPort<Cmd>>,
    rep_rx: ConsumerPort<Rep>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    name: &'static str,
}

impl<Cmd: Send + 'static, Rep: Send + 'static> NativeWorker<Cmd, Rep> {
    /// Spawns `engine` on a dedicated thread.
    ///
    /// Fails only when the platform refuses to create the thread or the
    /// options are invalid; callers treat that as "no worker available".
    pub fn spawn<E>(engine: E, options: WorkerOptions) -> std::io::Result<Self>
    where
        E: WorkerEngine<Cmd = Cmd, Rep = Rep>,
    {
        let cmd = make_port_pair::<Cmd>(options.cmd_capacity).map_err(invalid_input)?;
        let rep = make_port_pair::<Rep>(None).map_err(invalid_input)?;
        let stop = Arc::new(AtomicBool::new(false));
        let name = engine.name();

        let join = thread::Builder::new()
            .name(format!("{name}-worker"))
            .spawn({
                let stop = Arc::clone(&stop);
                let cmd_rx = cmd.consumer;
                let rep_tx = rep.producer;
                move || run_engine(engine, cmd_rx, rep_tx, stop)
            })?;

        debug!("worker.spawned name={name}");
        Ok(Self {
            cmd_tx: Some(cmd.producer),
            rep_rx: rep.consumer,
            stop,
            join: Some(join),
            name,
        })
    }

    /// Attempts to hand a command to the worker without blocking.
    pub fn try_submit(&self, cmd: Cmd) -> Result<SubmitOutcome, (SubmitOutcome, Cmd)> {
        match &self.cmd_tx {
            Some(tx) => tx.try_send(cmd),
            None => Err((SubmitOutcome::Closed, cmd)),
        }
    }

    /// Collects up to `max` finished reports.
    ///
    /// Returns [`TransportError::Closed`] once the worker thread has exited and
    /// every report it produced has been drained.
    pub fn drain(&self, max: usize) -> TransportResult<SmallVec<[Rep; 8]>> {
        self.rep_rx.drain(max)
    }

    /// Returns `true` while the worker thread is still running.
    pub fn is_alive(&self) -> bool {
        self.join
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Engine name reported at spawn time.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signals the worker to exit and detaches it.
    ///
    /// A command already executing runs to completion on the detached thread,
    /// but its reports have nowhere to go once the handle is dropped. Safe to
    /// call more than once.
    pub fn terminate(&mut self) {
        if self.cmd_tx.take().is_none() && self.join.is_none() {
            return;
        }
        self.stop.store(true, Ordering::Release);
        self.join.take();
        debug!("worker.terminated name={}", self.name);
    }

    /// Signals the worker to exit and waits for the thread to finish.
    pub fn terminate_and_join(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.cmd_tx.take();
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

impl<Cmd, Rep> Drop for NativeWorker<Cmd, Rep> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.cmd_tx.take();
    }
}

fn run_engine<E: WorkerEngine>(
    mut engine: E,
    cmd_rx: ConsumerPort<E::Cmd>,
    rep_tx: ProducerPort<E::Rep>,
    stop: Arc<AtomicBool>,
) {
    let mut out = Vec::new();
    while !stop.load(Ordering::Acquire) {
        let cmd = match cmd_rx.recv_timeout(IDLE_POLL) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(TransportError::Closed) | Err(TransportError::InvalidCapacity(_)) => break,
        };

        engine.handle(cmd, &mut out);
        for rep in out.drain(..) {
            if rep_tx.try_send(rep).is_err() {
                trace!("worker.reports_dropped name={}", engine.name());
                return;
            }
        }
    }
    trace!("worker.exit name={}", engine.name());
}

fn invalid_input(err: TransportError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
}
