//! Configuration loading and typed config structures for Crowdgrid runs.
//!
//! A run is described by `crowdgrid-config.yaml`: a seed, a tick budget,
//! and one tagged `scenario` section. Every field has a default, so an
//! empty file (or no file at all) runs the unidirectional metro station.
//!
//! ```yaml
//! seed: 7
//! ticks: 500
//! scenario:
//!   kind: flag_war
//!   attackers: { left: 3, right: 2 }
//! ```

use std::path::Path;

use serde::Deserialize;

use crowdgrid_agents::MovementConfig;
use crowdgrid_types::PerSide;
use crowdgrid_world::{Connectivity, DistanceMetric};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the single random stream of the run.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Ticks the engine runs before stopping.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Which scenario to build, and its parameters.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

const fn default_seed() -> u64 {
    42
}

const fn default_ticks() -> u64 {
    1000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            ticks: default_ticks(),
            scenario: ScenarioConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML or does
    /// not match the expected structure.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the content is not valid YAML or
    /// does not match the expected structure.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// The scenario to build, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioConfig {
    /// Crowd flow through a metro station.
    Metro(MetroConfig),
    /// Greedy capture the flag with jails.
    CaptureFlag(CaptureFlagConfig),
    /// Capture the flag with A* attackers and projectiles.
    FlagWar(FlagWarConfig),
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::Metro(MetroConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Metro
// ---------------------------------------------------------------------------

/// Portal arrangement of the metro station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetroLayout {
    /// Separate entries and exits on each side.
    #[default]
    Unidirectional,
    /// Gates that both admit and discharge.
    Bidirectional,
}

impl MetroLayout {
    /// Goal metric used when none is configured.
    pub const fn default_metric(self) -> DistanceMetric {
        match self {
            Self::Unidirectional => DistanceMetric::Diagonal,
            Self::Bidirectional => DistanceMetric::Manhattan,
        }
    }

    /// Goal weight used when none is configured.
    pub const fn default_goal_weight(self) -> f64 {
        match self {
            Self::Unidirectional => 1.0,
            Self::Bidirectional => 2.0,
        }
    }

    /// Jitter used when none is configured.
    pub const fn default_jitter(self) -> f64 {
        match self {
            Self::Unidirectional => 1e-4,
            Self::Bidirectional => 0.0,
        }
    }
}

/// Metro station parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetroConfig {
    /// Board width in cells.
    #[serde(default = "default_metro_width")]
    pub width: i32,

    /// Board height in cells.
    #[serde(default = "default_metro_height")]
    pub height: i32,

    /// Portal arrangement.
    #[serde(default)]
    pub layout: MetroLayout,

    /// Per-tick admission probability of each entry or gate.
    #[serde(default = "default_admission")]
    pub admission: PerSide<f64>,

    /// Entry rows on the left (x = 0) and right (x = width - 1) walls.
    #[serde(default = "default_entry_rows")]
    pub entry_rows: PerSide<Vec<i32>>,

    /// Exit rows on the left and right walls.
    #[serde(default = "default_exit_rows")]
    pub exit_rows: PerSide<Vec<i32>>,

    /// Gate rows on the left and right walls (bidirectional layout).
    #[serde(default = "default_gate_rows")]
    pub gate_rows: PerSide<Vec<i32>>,

    /// Distance used toward the goal portals. Layout default when unset.
    #[serde(default)]
    pub goal_metric: Option<DistanceMetric>,

    /// Weight of the goal distance. Layout default when unset.
    #[serde(default)]
    pub goal_weight: Option<f64>,

    /// Stay penalty of every walker.
    #[serde(default = "default_impatience")]
    pub impatience: f64,

    /// Tie-breaking jitter bound. Layout default when unset.
    #[serde(default)]
    pub jitter: Option<f64>,

    /// Maintain the crowd pressure field.
    #[serde(default)]
    pub track_pressure: bool,

    /// Weight of crowd pressure in the walker cost.
    #[serde(default)]
    pub pressure_weight: f64,
}

const fn default_metro_width() -> i32 {
    45
}

const fn default_metro_height() -> i32 {
    30
}

const fn default_admission() -> PerSide<f64> {
    PerSide::new(0.15, 0.15)
}

fn default_entry_rows() -> PerSide<Vec<i32>> {
    PerSide::new((19..=22).collect(), (7..=10).collect())
}

fn default_exit_rows() -> PerSide<Vec<i32>> {
    PerSide::new((23..=26).collect(), (3..=6).collect())
}

fn default_gate_rows() -> PerSide<Vec<i32>> {
    PerSide::new((21..=26).collect(), (3..=8).collect())
}

const fn default_impatience() -> f64 {
    1.0
}

impl Default for MetroConfig {
    fn default() -> Self {
        Self {
            width: default_metro_width(),
            height: default_metro_height(),
            layout: MetroLayout::default(),
            admission: default_admission(),
            entry_rows: default_entry_rows(),
            exit_rows: default_exit_rows(),
            gate_rows: default_gate_rows(),
            goal_metric: None,
            goal_weight: None,
            impatience: default_impatience(),
            jitter: None,
            track_pressure: false,
            pressure_weight: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Capture the flag
// ---------------------------------------------------------------------------

/// Greedy capture-the-flag parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptureFlagConfig {
    /// Board width in cells.
    #[serde(default = "default_flag_width")]
    pub width: i32,

    /// Board height in cells.
    #[serde(default = "default_flag_height")]
    pub height: i32,

    /// Players per team.
    #[serde(default = "default_capture_players")]
    pub players: usize,

    /// Jail cells per team.
    #[serde(default = "default_jails")]
    pub jails: usize,

    /// Cells in each delivery column.
    #[serde(default = "default_delivery_size")]
    pub delivery_size: usize,

    /// Activation probability of every player.
    #[serde(default = "default_capture_speed")]
    pub speed: f64,

    /// Defenders allowed per team at once.
    #[serde(default = "default_max_defenders")]
    pub max_defenders: usize,

    /// Stay penalty and jitter.
    #[serde(default)]
    pub movement: MovementConfig,
}

const fn default_flag_width() -> i32 {
    40
}

const fn default_flag_height() -> i32 {
    27
}

const fn default_capture_players() -> usize {
    6
}

const fn default_jails() -> usize {
    5
}

const fn default_delivery_size() -> usize {
    5
}

const fn default_capture_speed() -> f64 {
    1.0
}

const fn default_max_defenders() -> usize {
    3
}

impl Default for CaptureFlagConfig {
    fn default() -> Self {
        Self {
            width: default_flag_width(),
            height: default_flag_height(),
            players: default_capture_players(),
            jails: default_jails(),
            delivery_size: default_delivery_size(),
            speed: default_capture_speed(),
            max_defenders: default_max_defenders(),
            movement: MovementConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Flag war
// ---------------------------------------------------------------------------

/// Flag-war parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlagWarConfig {
    /// Board width in cells.
    #[serde(default = "default_flag_width")]
    pub width: i32,

    /// Board height in cells.
    #[serde(default = "default_flag_height")]
    pub height: i32,

    /// Players per team.
    #[serde(default = "default_war_players")]
    pub players: usize,

    /// How many of each team's players attack; the rest defend.
    #[serde(default = "default_attackers")]
    pub attackers: PerSide<usize>,

    /// Cells in each outer delivery column.
    #[serde(default = "default_delivery_size")]
    pub delivery_size: usize,

    /// Activation probability of every player.
    #[serde(default = "default_war_speed")]
    pub speed: f64,

    /// Neighborhood players move in.
    #[serde(default)]
    pub connectivity: Connectivity,

    /// Ticks a hit player stays locked.
    #[serde(default = "default_lock_ticks")]
    pub lock_ticks: u32,

    /// Cells a shot flies before it expires.
    #[serde(default = "default_shot_lifetime")]
    pub shot_lifetime: u32,

    /// Chance per turn that a defender fires at its carried-off flag.
    #[serde(default = "default_shoot_probability")]
    pub shoot_probability: f64,

    /// Resting value of both threat fields; keeps A* edge costs positive.
    #[serde(default = "default_field_baseline")]
    pub field_baseline: i32,

    /// Stay penalty and jitter for greedy steps.
    #[serde(default)]
    pub movement: MovementConfig,
}

const fn default_war_players() -> usize {
    8
}

const fn default_attackers() -> PerSide<usize> {
    PerSide::new(2, 2)
}

const fn default_war_speed() -> f64 {
    0.5
}

const fn default_lock_ticks() -> u32 {
    4
}

const fn default_shot_lifetime() -> u32 {
    100
}

const fn default_shoot_probability() -> f64 {
    0.3
}

const fn default_field_baseline() -> i32 {
    1
}

impl Default for FlagWarConfig {
    fn default() -> Self {
        Self {
            width: default_flag_width(),
            height: default_flag_height(),
            players: default_war_players(),
            attackers: default_attackers(),
            delivery_size: default_delivery_size(),
            speed: default_war_speed(),
            connectivity: Connectivity::Moore,
            lock_ticks: default_lock_ticks(),
            shot_lifetime: default_shot_lifetime(),
            shoot_probability: default_shoot_probability(),
            field_baseline: default_field_baseline(),
            movement: MovementConfig::default(),
        }
    }
}
