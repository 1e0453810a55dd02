//! Root orchestrator: owns the grid, drives the scheduler and executor, and
//! publishes state.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use hub::RuntimeStreams;
use life_core::GridModel;
use log::{debug, error, info, trace};
use service_abi::{Cell, RequestId, StepCmd, StepOutcome, StepRep, SubmitOutcome};
use services_stepper::StepService;
use world::{
    find_steady_state, Checkpoint, CheckpointStore, EngineMode, PerformanceCaps,
    PopulationTracker, RunMode, RunModeController, StabilityEvent, StabilityPattern,
    StateHistory, SteadyState, Telemetry,
};

use crate::clock::{Clock, MonotonicClock};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::executor::StepExecutor;
use crate::scheduler::{BatchOutcome, FrameAction, LoopPacing, LoopScheduler, SkipReason};

/// Reports drained from the executor per poll.
const REPORT_BUDGET: usize = 16;

/// Callback receiving errors the loop survives.
pub type ErrorHook = Box<dyn FnMut(&RuntimeError) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Loop { epoch: u64 },
    Manual,
}

#[derive(Clone, Copy, Debug)]
struct PendingRequest {
    request_id: RequestId,
    generations: u32,
    started_at: f64,
    origin: Origin,
}

/// Game of Life runtime.
///
/// All state lives here and changes only through `&mut self` methods, so
/// applying a batch result and applying a manual edit never interleave.
/// Every out-of-band mutation bumps the request counter, which turns any
/// batch still in flight into a stale result that is dropped on arrival.
pub struct GameRuntime {
    clock: Arc<dyn Clock>,
    executor: Box<dyn StepExecutor>,
    model: GridModel,
    engine_mode: EngineMode,
    run_modes: RunModeController,
    caps: PerformanceCaps,
    default_caps: PerformanceCaps,
    checkpoints: CheckpointStore,
    population: PopulationTracker,
    state_history: StateHistory,
    last_period: u32,
    hash_cell_ceiling: usize,
    hash_lookback: usize,
    scheduler: LoopScheduler,
    request_counter: RequestId,
    current: Option<PendingRequest>,
    outstanding: HashMap<RequestId, Origin>,
    streams: RuntimeStreams,
    on_error: Option<ErrorHook>,
    shut_down: bool,
}

impl GameRuntime {
    pub fn builder() -> GameRuntimeBuilder {
        GameRuntimeBuilder::new()
    }

    pub fn streams(&self) -> &RuntimeStreams {
        &self.streams
    }

    pub fn generation(&self) -> u64 {
        self.model.generation()
    }

    pub fn live_cells(&self) -> Vec<Cell> {
        self.model.live_cells()
    }

    pub fn population(&self) -> usize {
        self.model.population()
    }

    pub fn is_cell_alive(&self, x: i32, y: i32) -> bool {
        self.model.is_cell_alive(x, y)
    }

    pub fn engine_mode(&self) -> EngineMode {
        self.engine_mode
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_modes.run_mode()
    }

    pub fn skip_exponent(&self) -> u32 {
        self.run_modes.skip_exponent()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn telemetry(&self) -> Telemetry {
        *self.streams.telemetry.get()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        self.checkpoints.checkpoints()
    }

    pub fn performance_caps(&self) -> PerformanceCaps {
        self.caps
    }

    pub fn population_history(&self) -> Vec<usize> {
        self.population.history()
    }

    pub fn stability(&self) -> Option<StabilityEvent> {
        (*self.streams.stability.get()).clone()
    }

    pub fn scheduler(&self) -> &LoopScheduler {
        &self.scheduler
    }

    /// Id of the newest request; older results are stale.
    pub fn request_counter(&self) -> RequestId {
        self.request_counter
    }

    /// True while a current (non-stale) batch is outstanding.
    pub fn has_pending_step(&self) -> bool {
        self.current.is_some()
    }

    /// Batch size the next manual step or loop dispatch starts from.
    pub fn batch_size(&self) -> u32 {
        self.run_modes.batch_size(self.engine_mode)
    }

    /// Current frame pacing derived from mode and caps.
    pub fn pacing(&self) -> LoopPacing {
        let render_base = self.run_modes.render_interval_ms(self.engine_mode);
        LoopPacing {
            base_batch: self.run_modes.batch_size(self.engine_mode),
            max_batch: self.run_modes.max_batch_size(self.engine_mode),
            render_interval_ms: self.caps.render_interval_ms(render_base) as f64,
            generation_interval_ms: self.caps.generation_interval_ms(),
        }
    }

    /// Starts the loop. In hashlife mode this forces a checkpoint capture.
    pub fn start(&mut self) {
        self.resume(true);
    }

    fn resume(&mut self, force_capture: bool) {
        if self.shut_down || self.scheduler.is_running() {
            return;
        }
        debug!(
            "runtime.start engine={} generation={} population={}",
            self.engine_mode,
            self.model.generation(),
            self.model.population()
        );
        if self.engine_mode == EngineMode::Hashlife {
            self.maybe_capture_checkpoint(force_capture);
        }
        self.scheduler.start();
        self.streams.running.publish_if_changed(true);
    }

    pub fn pause(&mut self) {
        debug!(
            "runtime.pause running={} in_flight={} generation={}",
            self.scheduler.is_running(),
            self.current.is_some(),
            self.model.generation()
        );
        self.streams.running.publish_if_changed(false);
        self.invalidate_pending();
        self.scheduler.stop();
    }

    pub fn toggle_run(&mut self) {
        if self.scheduler.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Requests one batch at the current base size.
    ///
    /// Returns `false` if a batch is already outstanding or was refused.
    pub fn step(&mut self) -> bool {
        if self.shut_down || self.current.is_some() {
            return false;
        }
        let batch = self.batch_size();
        self.dispatch(batch, Origin::Manual)
    }

    /// Host frame callback: applies finished batches and runs the scheduler.
    pub fn on_frame(&mut self, timestamp_ms: f64) -> FrameAction {
        self.poll_results();
        if !self.scheduler.is_running() {
            return FrameAction::Skip(SkipReason::Stopped);
        }
        if matches!(self.current, Some(PendingRequest { origin: Origin::Manual, .. })) {
            return FrameAction::Skip(SkipReason::InFlight);
        }

        let pacing = self.pacing();
        let now = self.clock.now_ms();
        let action = self.scheduler.on_frame(timestamp_ms, now, &pacing);
        if let FrameAction::Dispatch { batch } = action {
            let epoch = self.scheduler.epoch();
            if self.dispatch(batch, Origin::Loop { epoch }) {
                self.poll_results();
            }
        }
        action
    }

    /// [`GameRuntime::on_frame`] stamped with the runtime's clock.
    pub fn tick(&mut self) -> FrameAction {
        let now = self.clock.now_ms();
        self.on_frame(now)
    }

    /// Drains finished batches from the executor and applies current ones.
    ///
    /// Returns how many reports were processed.
    pub fn poll_results(&mut self) -> usize {
        let reports = self.executor.drain(REPORT_BUDGET);
        let count = reports.len();
        for report in reports {
            self.apply_report(report);
        }
        count
    }

    /// Polls until no current batch is outstanding or `timeout` passes.
    ///
    /// Returns `true` when nothing is left outstanding.
    pub fn wait_for_pending(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll_results();
            if self.current.is_none() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_micros(200));
        }
    }

    pub fn clear(&mut self) {
        debug!("runtime.clear generation={}", self.model.generation());
        self.model.clear();
        self.publish_grid();
        self.population.clear();
        self.streams.population_history.publish(Vec::new());
        self.checkpoints.clear();
        self.streams.checkpoints.publish(Vec::new());
        self.reset_exact_history();
        self.streams.stability.publish_if_changed(None);
        self.update_telemetry(|t| {
            t.advanced_since_render = 0;
            t.effective_batch_size = 1;
            t.worker_elapsed_ms = 0.0;
        });
        self.pause();
    }

    pub fn set_engine_mode(&mut self, mode: EngineMode) {
        debug!(
            "engine.switch.request from={} to={mode} running={}",
            self.engine_mode,
            self.scheduler.is_running()
        );
        if self.engine_mode == mode {
            return;
        }
        let was_running = self.scheduler.is_running();
        self.pause();

        self.executor.shutdown();
        self.outstanding.clear();
        self.invalidate_pending();

        self.engine_mode = mode;
        self.checkpoints.clear();
        self.streams.checkpoints.publish(Vec::new());
        self.reset_exact_history();
        self.population.reset_with(self.model.population());
        self.streams
            .population_history
            .publish(self.population.history());
        if mode == EngineMode::Normal {
            self.update_telemetry(|t| {
                t.advanced_since_render = 0;
                t.effective_batch_size = 1;
            });
        }
        self.streams.engine_mode.publish(mode);

        if was_running {
            self.resume(false);
        }
        debug!("engine.switch.applied target={mode} was_running={was_running}");
    }

    pub fn set_run_mode(&mut self, mode: RunMode) {
        debug!("hashlife.mode.request from={} to={mode}", self.run_modes.run_mode());
        if self.run_modes.run_mode() == mode {
            return;
        }
        let was_running = self.scheduler.is_running();
        if was_running {
            self.pause();
        }
        self.run_modes.set_run_mode(mode);
        self.streams.run_mode.publish(mode);
        self.streams
            .skip_exponent
            .publish_if_changed(self.run_modes.skip_exponent());
        if was_running {
            self.resume(false);
        }
    }

    /// Sets the skip exponent, clamped to `[0, 15]` and the run mode's bounds.
    pub fn set_skip_exponent(&mut self, exponent: i64) {
        let previous = self.run_modes.skip_exponent();
        debug!("hashlife.skip.request from={previous} to={exponent}");
        let was_running = self.scheduler.is_running();
        if was_running {
            self.pause();
        }
        let applied = self.run_modes.set_skip_exponent(exponent);
        self.streams.skip_exponent.publish_if_changed(applied);
        if was_running {
            self.resume(false);
        }
    }

    /// Applies a batch size as the skip exponent `floor(log2(size))`.
    pub fn set_generation_batch_size(&mut self, size: u32) {
        let applied = self.run_modes.set_batch_size(size);
        self.streams.skip_exponent.publish_if_changed(applied);
        self.restart_loop_if_running();
    }

    /// Replaces the grid with a checkpoint. Unknown ids return `false`.
    pub fn restore_checkpoint(&mut self, id: u64) -> bool {
        debug!(
            "checkpoint.restore.request id={id} running={} generation={}",
            self.scheduler.is_running(),
            self.model.generation()
        );
        let Some(checkpoint) = self.checkpoints.restore_checkpoint(id).cloned() else {
            debug!("checkpoint.restore.miss id={id}");
            return false;
        };
        self.pause();
        self.model
            .set_live_cells(checkpoint.cells.iter().copied(), checkpoint.generation);
        self.sync_now(true);
        debug!(
            "checkpoint.restore.applied id={id} generation={} live_count={}",
            checkpoint.generation, checkpoint.live_count
        );
        true
    }

    /// Republishes grid state. With `reset_history` the population history
    /// restarts from the current count and a checkpoint capture is forced.
    pub fn sync_now(&mut self, reset_history: bool) {
        self.publish_grid();
        if self.engine_mode == EngineMode::Hashlife {
            self.maybe_capture_checkpoint(reset_history);
        }
        if reset_history {
            self.population.reset_with(self.model.population());
            self.streams
                .population_history
                .publish(self.population.history());
            self.reset_exact_history();
        }
    }

    /// Replaces the grid wholesale.
    pub fn load_cells<I>(&mut self, cells: I, generation: u64)
    where
        I: IntoIterator<Item = Cell>,
    {
        self.invalidate_pending();
        self.model.set_live_cells(cells, generation);
        debug!(
            "runtime.load generation={generation} population={}",
            self.model.population()
        );
        self.sync_into_run_loop(true);
    }

    pub fn set_cell_alive(&mut self, x: i32, y: i32, alive: bool) {
        self.invalidate_pending();
        self.model.set_cell_alive(x, y, alive);
        self.sync_into_run_loop(false);
    }

    /// Flips a cell and returns its new state.
    pub fn toggle_cell(&mut self, x: i32, y: i32) -> bool {
        self.invalidate_pending();
        let alive = self.model.toggle_cell(x, y);
        self.sync_into_run_loop(false);
        alive
    }

    pub fn set_max_fps(&mut self, fps: u32) {
        self.update_caps(|caps| caps.with_max_fps(fps));
    }

    pub fn set_max_gps(&mut self, gps: u32) {
        self.update_caps(|caps| caps.with_max_gps(gps));
    }

    pub fn set_fps_cap_enabled(&mut self, enabled: bool) {
        self.update_caps(|caps| PerformanceCaps {
            enable_fps_cap: enabled,
            ..caps
        });
    }

    pub fn set_gps_cap_enabled(&mut self, enabled: bool) {
        self.update_caps(|caps| PerformanceCaps {
            enable_gps_cap: enabled,
            ..caps
        });
    }

    /// Restores the caps the runtime was built with.
    pub fn reset_preferences(&mut self) {
        let defaults = self.default_caps;
        self.update_caps(|_| defaults);
    }

    pub fn set_detect_stable_population(&mut self, enabled: bool) {
        self.population.set_detect_stable(enabled);
        if !enabled {
            self.reset_exact_history();
        }
    }

    pub fn set_population_window(&mut self, window: usize) {
        self.population.set_window_size(window);
    }

    pub fn set_population_tolerance(&mut self, tolerance: f64) {
        self.population.set_tolerance(tolerance);
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.population.set_max_history(max_history);
        self.streams
            .population_history
            .publish(self.population.history());
    }

    /// Clears a stability event, then either stays paused or resumes.
    pub fn dismiss_stability(&mut self, keep_paused: bool) {
        self.streams.stability.publish_if_changed(None);
        if keep_paused {
            self.pause();
        } else {
            self.resume(false);
        }
    }

    /// Looks for an exact repeat within `max_generations` on a copy of the grid.
    pub fn probe_steady_state(&self, max_generations: u64) -> Option<SteadyState> {
        find_steady_state(self.model.live(), max_generations, self.hash_lookback)
    }

    /// Pauses and terminates the executor. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.pause();
        self.executor.shutdown();
        self.outstanding.clear();
        self.shut_down = true;
        info!("runtime.shutdown generation={}", self.model.generation());
    }

    fn dispatch(&mut self, batch: u32, origin: Origin) -> bool {
        self.request_counter = self.request_counter.next();
        let request_id = self.request_counter;
        let cmd = StepCmd::new(request_id, self.model.live_cells(), batch);
        let generations = cmd.generations;
        match self.executor.try_submit(cmd) {
            SubmitOutcome::Accepted => {
                trace!("step.dispatch id={request_id} generations={generations} origin={origin:?}");
                self.current = Some(PendingRequest {
                    request_id,
                    generations,
                    started_at: self.clock.now_ms(),
                    origin,
                });
                self.outstanding.insert(request_id, origin);
                true
            }
            outcome => {
                error!("step.rejected id={request_id} outcome={outcome:?}");
                self.report_error(RuntimeError::SubmitRejected {
                    request_id,
                    outcome,
                });
                self.complete_loop(origin, BatchOutcome::Failed);
                false
            }
        }
    }

    fn apply_report(&mut self, report: StepRep) {
        let request_id = report.request_id();
        let origin = self.outstanding.remove(&request_id);
        let pending = match self.current.take() {
            Some(pending) if pending.request_id == request_id => pending,
            other => {
                self.current = other;
                trace!(
                    "step.result.stale id={request_id} current={}",
                    self.request_counter
                );
                if let Some(origin) = origin {
                    self.complete_loop(origin, BatchOutcome::Discarded);
                }
                return;
            }
        };

        match report {
            StepRep::Done(outcome) => {
                let elapsed_ms = if outcome.elapsed_ms.is_finite() {
                    outcome.elapsed_ms
                } else {
                    self.clock.now_ms() - pending.started_at
                };
                self.apply_outcome(outcome, elapsed_ms);
                self.complete_loop(pending.origin, BatchOutcome::Applied { elapsed_ms });
            }
            StepRep::Failed { failure, .. } => {
                error!("step.failed id={request_id} error={failure}");
                self.report_error(RuntimeError::StepFailed {
                    request_id,
                    failure,
                });
                self.complete_loop(pending.origin, BatchOutcome::Failed);
            }
        }
    }

    fn apply_outcome(&mut self, outcome: StepOutcome, elapsed_ms: f64) {
        let generations = outcome.generations;
        let next_generation = self
            .model
            .generation()
            .saturating_add(u64::from(generations));
        self.model.set_live_cells(outcome.cells, next_generation);
        self.publish_grid();
        self.streams.telemetry.publish(Telemetry {
            worker_elapsed_ms: elapsed_ms,
            effective_batch_size: generations,
            advanced_since_render: generations,
            worker_used: outcome.worker_used,
        });
        if self.engine_mode == EngineMode::Hashlife {
            self.maybe_capture_checkpoint(false);
        }
        self.track_population(generations);
    }

    fn track_population(&mut self, generations: u32) {
        let population = self.model.population();
        if self.population.config().detect_stable {
            if generations == 1 && population <= self.hash_cell_ceiling {
                self.last_period = self.state_history.observe(self.model.live());
            } else {
                self.reset_exact_history();
            }
        }

        let flat = self.population.record(population);
        self.streams
            .population_history
            .publish(self.population.history());
        if !flat {
            return;
        }

        let pattern = StabilityPattern::from_period(self.last_period)
            .unwrap_or(StabilityPattern::StablePopulation);
        let event = StabilityEvent {
            pattern,
            generation: self.model.generation(),
            population,
            period: pattern.period(),
        };
        info!(
            "stability.detected pattern=\"{pattern}\" generation={} population={population}",
            event.generation
        );
        self.streams.stability.publish(Some(event));
        self.pause();
    }

    fn maybe_capture_checkpoint(&mut self, force: bool) {
        if self.engine_mode != EngineMode::Hashlife {
            return;
        }
        let population = self.model.population();
        if population == 0 || population > self.checkpoints.config().max_cells {
            return;
        }
        let cells = self.model.live_cells();
        let now_ms = self.clock.now_ms().max(0.0) as u64;
        if let Ok(checkpoint) =
            self.checkpoints
                .add_checkpoint(self.model.generation(), &cells, now_ms, force)
        {
            trace!(
                "checkpoint.capture id={} generation={}",
                checkpoint.id,
                checkpoint.generation
            );
            self.streams
                .checkpoints
                .publish(self.checkpoints.checkpoints().to_vec());
        }
    }

    fn sync_into_run_loop(&mut self, reset_history: bool) {
        self.reset_exact_history();
        self.sync_now(reset_history);
        self.restart_loop_if_running();
    }

    fn restart_loop_if_running(&mut self) {
        if self.scheduler.is_running() {
            self.scheduler.start();
        }
    }

    fn invalidate_pending(&mut self) {
        self.request_counter = self.request_counter.next();
        self.current = None;
    }

    fn complete_loop(&mut self, origin: Origin, outcome: BatchOutcome) {
        if let Origin::Loop { epoch } = origin {
            if epoch == self.scheduler.epoch() {
                self.scheduler.complete(outcome);
            }
        }
    }

    fn reset_exact_history(&mut self) {
        self.state_history.clear();
        self.last_period = 0;
    }

    fn publish_grid(&self) {
        self.streams
            .live_cells
            .publish(Arc::from(self.model.live_cells()));
        self.streams
            .generation
            .publish_if_changed(self.model.generation());
    }

    fn update_telemetry(&self, update: impl FnOnce(&mut Telemetry)) {
        let mut telemetry = *self.streams.telemetry.get();
        update(&mut telemetry);
        self.streams.telemetry.publish(telemetry);
    }

    fn update_caps(&mut self, update: impl FnOnce(PerformanceCaps) -> PerformanceCaps) {
        self.caps = update(self.caps);
        self.streams.performance_caps.publish_if_changed(self.caps);
        self.restart_loop_if_running();
    }

    fn report_error(&mut self, err: RuntimeError) {
        if let Some(hook) = self.on_error.as_mut() {
            hook(&err);
        }
    }
}

impl Drop for GameRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder wiring a [`GameRuntime`] from its collaborators.
pub struct GameRuntimeBuilder {
    config: RuntimeConfig,
    clock: Option<Arc<dyn Clock>>,
    executor: Option<Box<dyn StepExecutor>>,
    on_error: Option<ErrorHook>,
}

impl GameRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            clock: None,
            executor: None,
            on_error: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Overrides the executor built from `config.stepper`.
    pub fn executor<E: StepExecutor + 'static>(mut self, executor: E) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&RuntimeError) + Send + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Result<GameRuntime> {
        let config = self.config;
        if config.hash_lookback == 0 {
            bail!("hash_lookback must be at least 1");
        }
        if config.checkpoints.max_checkpoints == 0 {
            bail!("checkpoint ring needs room for at least one entry");
        }
        if config.stepper.inline_chunk == 0 {
            bail!("inline_chunk must be at least 1");
        }

        let mut run_modes = RunModeController::new();
        run_modes.set_run_mode(config.run_mode);
        if let Some(exponent) = config.skip_exponent {
            if exponent > world::run_mode::MAX_SKIP_EXPONENT {
                bail!("skip exponent {exponent} exceeds 15");
            }
            run_modes.set_skip_exponent(i64::from(exponent));
        }

        let caps = PerformanceCaps {
            enable_fps_cap: config.caps.enable_fps_cap,
            enable_gps_cap: config.caps.enable_gps_cap,
            ..PerformanceCaps::default()
        }
        .with_max_fps(config.caps.max_fps)
        .with_max_gps(config.caps.max_gps);

        let executor = match self.executor {
            Some(executor) => executor,
            None => Box::new(StepService::new(config.stepper.clone())),
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let streams = RuntimeStreams::new(
            config.engine_mode,
            run_modes.run_mode(),
            run_modes.skip_exponent(),
        );
        streams.performance_caps.publish(caps);

        debug!(
            "runtime.build engine={} run_mode={} skip_exponent={}",
            config.engine_mode,
            run_modes.run_mode(),
            run_modes.skip_exponent()
        );
        Ok(GameRuntime {
            clock,
            executor,
            model: GridModel::new(),
            engine_mode: config.engine_mode,
            run_modes,
            caps,
            default_caps: caps,
            checkpoints: CheckpointStore::new(config.checkpoints),
            population: PopulationTracker::new(config.population),
            state_history: StateHistory::new(config.hash_lookback),
            last_period: 0,
            hash_cell_ceiling: config.hash_cell_ceiling,
            hash_lookback: config.hash_lookback,
            scheduler: LoopScheduler::new(),
            request_counter: RequestId::default(),
            current: None,
            outstanding: HashMap::new(),
            streams,
            on_error: self.on_error,
            shut_down: false,
        })
    }
}

impl Default for GameRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
