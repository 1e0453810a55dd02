//! Mode, telemetry and cap types shared by the runtime and its observers.
#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the runtime advances the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// One generation per step request.
    #[default]
    Normal,
    /// Power-of-two batches sized by the run mode and skip exponent.
    Hashlife,
}

impl EngineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineMode::Normal => "normal",
            EngineMode::Hashlife => "hashlife",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(EngineMode::Normal),
            "hashlife" => Ok(EngineMode::Hashlife),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Hashlife pacing preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Explore,
    #[default]
    Cruise,
    Warp,
}

impl RunMode {
    pub const ALL: [RunMode; 3] = [RunMode::Explore, RunMode::Cruise, RunMode::Warp];

    /// Exponent bounds and render rate for this preset.
    pub const fn config(self) -> RunModeConfig {
        match self {
            RunMode::Explore => RunModeConfig {
                min_exponent: 0,
                max_exponent: 9,
                default_exponent: 4,
                render_fps: 30,
            },
            RunMode::Cruise => RunModeConfig {
                min_exponent: 2,
                max_exponent: 12,
                default_exponent: 7,
                render_fps: 20,
            },
            RunMode::Warp => RunModeConfig {
                min_exponent: 6,
                max_exponent: 15,
                default_exponent: 11,
                render_fps: 8,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Explore => "explore",
            RunMode::Cruise => "cruise",
            RunMode::Warp => "warp",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// Error returned when parsing an engine or run mode name fails.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown mode `{0}`")]
pub struct UnknownMode(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunModeConfig {
    pub min_exponent: u32,
    pub max_exponent: u32,
    pub default_exponent: u32,
    pub render_fps: u32,
}

impl RunModeConfig {
    /// Clamps `exponent` into `[min_exponent, max_exponent]`.
    pub fn clamp_exponent(&self, exponent: i64) -> u32 {
        exponent.clamp(i64::from(self.min_exponent), i64::from(self.max_exponent)) as u32
    }
}

/// Measurements from the most recently applied batch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub worker_elapsed_ms: f64,
    pub effective_batch_size: u32,
    pub advanced_since_render: u32,
    pub worker_used: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            worker_elapsed_ms: 0.0,
            effective_batch_size: 1,
            advanced_since_render: 0,
            worker_used: true,
        }
    }
}

/// Render and generation rate caps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceCaps {
    pub max_fps: u32,
    pub max_gps: u32,
    pub enable_fps_cap: bool,
    pub enable_gps_cap: bool,
}

impl PerformanceCaps {
    pub const FPS_RANGE: (u32, u32) = (1, 120);
    pub const GPS_RANGE: (u32, u32) = (1, 60);

    pub fn with_max_fps(mut self, fps: u32) -> Self {
        self.max_fps = fps.clamp(Self::FPS_RANGE.0, Self::FPS_RANGE.1);
        self
    }

    pub fn with_max_gps(mut self, gps: u32) -> Self {
        self.max_gps = gps.clamp(Self::GPS_RANGE.0, Self::GPS_RANGE.1);
        self
    }

    /// Applies the FPS cap, if enabled, on top of a mode's render interval.
    pub fn render_interval_ms(&self, base_ms: u64) -> u64 {
        if !self.enable_fps_cap {
            return base_ms;
        }
        let capped = (1000 / u64::from(self.max_fps.max(1))).max(1);
        base_ms.max(capped)
    }

    /// Minimum milliseconds per generation, or zero when uncapped.
    pub fn generation_interval_ms(&self) -> f64 {
        if !self.enable_gps_cap {
            return 0.0;
        }
        1000.0 / f64::from(self.max_gps.max(1))
    }
}

impl Default for PerformanceCaps {
    fn default() -> Self {
        Self {
            max_fps: 60,
            max_gps: 30,
            enable_fps_cap: false,
            enable_gps_cap: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_by_name() {
        assert_eq!("hashlife".parse::<EngineMode>(), Ok(EngineMode::Hashlife));
        assert_eq!("warp".parse::<RunMode>(), Ok(RunMode::Warp));
        assert!("turbo".parse::<RunMode>().is_err());
    }

    #[test]
    fn caps_only_apply_when_enabled() {
        let caps = PerformanceCaps::default();
        assert_eq!(caps.render_interval_ms(16), 16);
        assert_eq!(caps.generation_interval_ms(), 0.0);

        let caps = PerformanceCaps {
            enable_fps_cap: true,
            enable_gps_cap: true,
            ..PerformanceCaps::default()
        }
        .with_max_fps(10)
        .with_max_gps(500);
        assert_eq!(caps.render_interval_ms(16), 100);
        assert_eq!(caps.render_interval_ms(125), 125);
        assert_eq!(caps.max_gps, 60);
        assert!((caps.generation_interval_ms() - 1000.0 / 60.0).abs() < 1e-9);
    }
}
