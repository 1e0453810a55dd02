//! Command-line driver for the Game of Life runtime.

mod patterns;

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use app::{FrameAction, GameRuntime, RuntimeConfig, RuntimeError};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use patterns::Pattern;
use services_stepper::{OffloadStrategy, StepperConfig};
use world::{EngineMode, PerformanceCaps, PopulationConfig, RunMode};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Text rendering helpers used by the CLI commands.
mod render {
    use service_abi::Cell;
    use world::{EngineMode, RunMode, StabilityEvent, SteadyState, Telemetry};

    /// Runtime state printed after a run.
    #[derive(Clone, Debug)]
    pub struct Summary {
        pub generation: u64,
        pub population: usize,
        pub engine: EngineMode,
        pub run_mode: RunMode,
        pub skip_exponent: u32,
        pub telemetry: Telemetry,
        pub checkpoints: usize,
        pub stability: Option<StabilityEvent>,
    }

    pub fn summary(s: &Summary) -> String {
        let mut lines = vec![
            format!("generation {}, population {}", s.generation, s.population),
            match s.engine {
                EngineMode::Hashlife => format!(
                    "engine hashlife, run mode {}, skip 2^{}",
                    s.run_mode, s.skip_exponent
                ),
                EngineMode::Normal => "engine normal".to_string(),
            },
            format!(
                "last batch {} generations in {:.2} ms {}",
                s.telemetry.effective_batch_size,
                s.telemetry.worker_elapsed_ms,
                if s.telemetry.worker_used {
                    "on worker"
                } else {
                    "inline"
                }
            ),
        ];
        if s.engine == EngineMode::Hashlife {
            lines.push(format!("checkpoints {}", s.checkpoints));
        }
        lines.push(match &s.stability {
            Some(event) => format!(
                "stability: {} at generation {}",
                event.pattern, event.generation
            ),
            None => "stability: none".to_string(),
        });
        lines.join("\n")
    }

    /// Widest or tallest bounding box [`grid`] will draw.
    pub const MAX_GRID_EXTENT: u64 = 256;

    /// Format the bounding box of `cells` as `#`/`.` rows.
    ///
    /// Boxes wider or taller than [`MAX_GRID_EXTENT`] are summarised instead.
    pub fn grid(cells: &[Cell]) -> String {
        let Some(first) = cells.first() else {
            return "(empty)".to_string();
        };
        let (mut min, mut max) = (*first, *first);
        for cell in cells {
            min.x = min.x.min(cell.x);
            min.y = min.y.min(cell.y);
            max.x = max.x.max(cell.x);
            max.y = max.y.max(cell.y);
        }
        let width = (i64::from(max.x) - i64::from(min.x) + 1) as u64;
        let height = (i64::from(max.y) - i64::from(min.y) + 1) as u64;
        if width > MAX_GRID_EXTENT || height > MAX_GRID_EXTENT {
            return format!(
                "({} cells spanning {width}x{height}, too large to draw)",
                cells.len()
            );
        }
        let (width, height) = (width as usize, height as usize);
        let mut rows = vec![vec!['.'; width]; height];
        for cell in cells {
            let col = (i64::from(cell.x) - i64::from(min.x)) as usize;
            let row = (i64::from(cell.y) - i64::from(min.y)) as usize;
            rows[row][col] = '#';
        }
        rows.into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn steady_state(found: Option<&SteadyState>, max_generations: u64) -> String {
        match found {
            Some(steady) => format!(
                "{} after {} generations",
                steady.pattern, steady.generations
            ),
            None => format!("no exact repeat within {max_generations} generations"),
        }
    }
}

/// Drive the Game of Life runtime from the terminal.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run Game of Life patterns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the adaptive loop for a number of frames and print a summary.
    Run(RunArgs),
    /// Search for an exact repeat without running the loop.
    Probe {
        #[arg(short, long, value_enum, default_value_t = Pattern::Glider)]
        pattern: Pattern,
        /// Generations to search.
        #[arg(long, default_value_t = 256)]
        max_generations: u64,
    },
    /// Print a pattern's starting cells.
    Show {
        #[arg(value_enum)]
        pattern: Pattern,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(short, long, value_enum, default_value_t = Pattern::Glider)]
    pattern: Pattern,
    #[arg(long, value_enum, default_value_t = EngineArg::Normal)]
    engine: EngineArg,
    #[arg(long, value_enum, default_value_t = RunModeArg::Cruise)]
    run_mode: RunModeArg,
    /// Skip exponent; defaults to the run mode's preset.
    #[arg(long)]
    skip: Option<u32>,
    /// Frame callbacks to issue.
    #[arg(short, long, default_value_t = 120)]
    frames: u32,
    /// Milliseconds between frame callbacks.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Step on the calling thread instead of a worker.
    #[arg(long)]
    inline: bool,
    /// Pause when the population goes flat.
    #[arg(long)]
    detect_stable: bool,
    /// Samples compared by the flat-population check.
    #[arg(long, default_value_t = 50)]
    window: usize,
    /// Cap generations per second.
    #[arg(long)]
    max_gps: Option<u32>,
    /// Print the final grid.
    #[arg(long)]
    show: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EngineArg {
    /// One generation per manual step.
    Normal,
    /// Power-of-two batches.
    Hashlife,
}

impl From<EngineArg> for EngineMode {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Normal => EngineMode::Normal,
            EngineArg::Hashlife => EngineMode::Hashlife,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RunModeArg {
    Explore,
    Cruise,
    Warp,
}

impl From<RunModeArg> for RunMode {
    fn from(arg: RunModeArg) -> Self {
        match arg {
            RunModeArg::Explore => RunMode::Explore,
            RunModeArg::Cruise => RunMode::Cruise,
            RunModeArg::Warp => RunMode::Warp,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Probe {
            pattern,
            max_generations,
        } => handle_probe(pattern, max_generations),
        Command::Show { pattern } => {
            println!("{}", render::grid(&pattern.cells()));
            Ok(())
        }
    }
}

fn runtime_config(args: &RunArgs) -> RuntimeConfig {
    let strategy = if args.inline {
        OffloadStrategy::Inline
    } else {
        OffloadStrategy::Thread
    };
    let caps = match args.max_gps {
        Some(gps) => PerformanceCaps {
            enable_gps_cap: true,
            ..PerformanceCaps::default()
        }
        .with_max_gps(gps),
        None => PerformanceCaps::default(),
    };
    RuntimeConfig {
        engine_mode: args.engine.into(),
        run_mode: args.run_mode.into(),
        skip_exponent: args.skip,
        population: PopulationConfig {
            detect_stable: args.detect_stable,
            window_size: args.window,
            ..PopulationConfig::default()
        },
        caps,
        stepper: StepperConfig {
            strategy,
            ..StepperConfig::default()
        },
        ..RuntimeConfig::default()
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    if args.frames == 0 {
        bail!("--frames must be at least 1");
    }
    let mut runtime = GameRuntime::builder()
        .config(runtime_config(&args))
        .on_error(|err: &RuntimeError| warn!("runtime.error {err}"))
        .build()
        .context("failed to build runtime")?;
    runtime.load_cells(args.pattern.cells(), 0);
    runtime.start();

    let frame = Duration::from_millis(args.frame_ms);
    let mut dispatched = 0u32;
    for _ in 0..args.frames {
        if !runtime.is_running() {
            break;
        }
        if let FrameAction::Dispatch { .. } = runtime.tick() {
            dispatched += 1;
        }
        thread::sleep(frame);
    }
    if !runtime.wait_for_pending(SETTLE_TIMEOUT) {
        warn!("cli.settle.timeout generation={}", runtime.generation());
    }
    runtime.pause();
    info!("cli.run.done dispatched={dispatched}");

    let summary = render::Summary {
        generation: runtime.generation(),
        population: runtime.population(),
        engine: runtime.engine_mode(),
        run_mode: runtime.run_mode(),
        skip_exponent: runtime.skip_exponent(),
        telemetry: runtime.telemetry(),
        checkpoints: runtime.checkpoints().len(),
        stability: runtime.stability(),
    };
    println!("{}", render::summary(&summary));
    if args.show {
        println!("{}", render::grid(&runtime.live_cells()));
    }
    runtime.shutdown();
    Ok(())
}

fn handle_probe(pattern: Pattern, max_generations: u64) -> Result<()> {
    let mut runtime = GameRuntime::builder()
        .config(RuntimeConfig {
            stepper: StepperConfig {
                strategy: OffloadStrategy::Inline,
                ..StepperConfig::default()
            },
            ..RuntimeConfig::default()
        })
        .build()?;
    runtime.load_cells(pattern.cells(), 0);
    let found = runtime.probe_steady_state(max_generations);
    println!("{}", render::steady_state(found.as_ref(), max_generations));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use insta::assert_snapshot;
    use service_abi::Cell;
    use world::{StabilityEvent, StabilityPattern, Telemetry};

    fn sample_summary() -> render::Summary {
        render::Summary {
            generation: 128,
            population: 5,
            engine: EngineMode::Hashlife,
            run_mode: RunMode::Cruise,
            skip_exponent: 7,
            telemetry: Telemetry {
                worker_elapsed_ms: 0.42,
                effective_batch_size: 128,
                advanced_since_render: 128,
                worker_used: true,
            },
            checkpoints: 2,
            stability: Some(StabilityEvent {
                pattern: StabilityPattern::Oscillator(2),
                generation: 3,
                population: 3,
                period: 2,
            }),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "life-cli",
            "run",
            "--pattern",
            "r-pentomino",
            "--engine",
            "hashlife",
            "--run-mode",
            "warp",
            "--inline",
            "--max-gps",
            "20",
        ])
        .expect("parses");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.pattern, Pattern::RPentomino);
        let config = runtime_config(&args);
        assert_eq!(config.engine_mode, EngineMode::Hashlife);
        assert_eq!(config.run_mode, RunMode::Warp);
        assert_eq!(config.stepper.strategy, OffloadStrategy::Inline);
        assert!(config.caps.enable_gps_cap);
        assert_eq!(config.caps.max_gps, 20);
    }

    #[test]
    fn summary_render_matches_expectation() {
        assert_snapshot!(render::summary(&sample_summary()), @r"
        generation 128, population 5
        engine hashlife, run mode cruise, skip 2^7
        last batch 128 generations in 0.42 ms on worker
        checkpoints 2
        stability: Oscillator (Period 2) at generation 3
        ");
    }

    #[test]
    fn normal_summary_omits_hashlife_details() {
        let summary = render::Summary {
            engine: EngineMode::Normal,
            telemetry: Telemetry {
                worker_used: false,
                ..Telemetry::default()
            },
            stability: None,
            ..sample_summary()
        };
        assert_snapshot!(render::summary(&summary), @r"
        generation 128, population 5
        engine normal
        last batch 1 generations in 0.00 ms inline
        stability: none
        ");
    }

    #[test]
    fn grid_render_matches_expectation() {
        assert_snapshot!(render::grid(&Pattern::Glider.cells()), @r"
        ..#
        #.#
        .##
        ");
        assert_snapshot!(render::grid(&[]), @"(empty)");
    }

    #[test]
    fn distant_cells_are_summarised_not_drawn() {
        let cells = [Cell::new(i32::MIN, 0), Cell::new(i32::MAX, 3)];
        assert_eq!(
            render::grid(&cells),
            "(2 cells spanning 4294967296x4, too large to draw)"
        );
        let edge = render::MAX_GRID_EXTENT as i32 - 1;
        let drawn = render::grid(&[Cell::new(0, 0), Cell::new(edge, 0)]);
        assert_eq!(drawn.len(), render::MAX_GRID_EXTENT as usize);
    }

    #[test]
    fn probe_classifies_patterns() {
        let runtime_found = |pattern: Pattern| {
            let mut runtime = GameRuntime::builder()
                .config(RuntimeConfig {
                    stepper: StepperConfig {
                        strategy: OffloadStrategy::Inline,
                        ..StepperConfig::default()
                    },
                    ..RuntimeConfig::default()
                })
                .build()
                .expect("runtime builds");
            runtime.load_cells(pattern.cells(), 0);
            runtime.probe_steady_state(16)
        };
        assert_eq!(
            render::steady_state(runtime_found(Pattern::Block).as_ref(), 16),
            "Still Life after 1 generations"
        );
        assert_eq!(
            render::steady_state(runtime_found(Pattern::Glider).as_ref(), 16),
            "no exact repeat within 16 generations"
        );
    }
}
