//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "rill";
const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration for a liquid simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Propagation timing, settling, and randomness.
    pub sim: SimConfig,
    /// Continuous liquid injection.
    pub source: SourceConfig,
    /// Default world oracle parameters.
    pub world: WorldConfig,
    /// Mesh builder settings.
    pub mesh: MeshConfig,
    /// Liquid cells placed before the first step.
    pub seeds: Vec<SeedConfig>,
    /// Headless runner settings.
    pub run: RunConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Propagation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds between propagation steps.
    pub propagation_delay: f64,
    /// Seconds without change after which the liquid counts as settled.
    pub settle_threshold: f64,
    /// Seed for the spreading tie-break and injection RNG.
    pub rng_seed: u64,
}

/// Where an enabled source places new liquid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceMode {
    /// Always the same cell.
    Fixed { x: i32, y: i32, z: i32 },
    /// A random cell in `[min_x, max_x) × [min_z, max_z)` at height `y`.
    RandomArea {
        min_x: i32,
        max_x: i32,
        min_z: i32,
        max_z: i32,
        y: i32,
    },
}

/// Continuous injection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub enabled: bool,
    pub mode: SourceMode,
    /// Chance per step that the source fires (0.0 - 1.0).
    pub probability: f64,
    /// Material id of injected liquid (positive).
    pub liquid_id: i32,
}

/// Flat world oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Cells below this height are solid.
    pub ground_height: i32,
    /// Material id of the ground (negative).
    pub solid_id: i32,
}

/// How side faces treat a solid neighbor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SolidFacePolicy {
    /// Solids count as empty: side faces against terrain are drawn.
    #[default]
    Expose,
    /// Solids count as fuller than any liquid: side faces against terrain are
    /// culled.
    Cull,
}

/// Mesh builder settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshConfig {
    /// Number of cells the output buffers are sized for at startup.
    pub initial_capacity: usize,
    /// Growth factor applied when the tracked cell count exceeds capacity.
    pub capacity_scaling: f32,
    /// Face rule for solid neighbors.
    pub solid_faces: SolidFacePolicy,
    /// Build meshes on the worker thread instead of inline.
    pub background: bool,
}

/// A liquid cell placed at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedConfig {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub id: i32,
    pub volume: u8,
}

/// Headless runner settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Number of frames to simulate.
    pub frames: u32,
    /// Simulated seconds per frame.
    pub frame_dt: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write JSON logs to the log directory (debug builds only).
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            source: SourceConfig::default(),
            world: WorldConfig::default(),
            mesh: MeshConfig::default(),
            seeds: default_seeds(),
            run: RunConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

/// The starting scene: a stack of partial cells above the origin and one full
/// cell off to the side.
fn default_seeds() -> Vec<SeedConfig> {
    [
        (0, 1, 0, 7),
        (0, 3, 0, 2),
        (0, 5, 0, 2),
        (0, 7, 0, 4),
        (0, 9, 0, 1),
        (2, 9, 1, 7),
    ]
    .into_iter()
    .map(|(x, y, z, volume)| SeedConfig {
        x,
        y,
        z,
        id: 1,
        volume,
    })
    .collect()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            propagation_delay: 1.0,
            settle_threshold: 3.0,
            rng_seed: 42,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: SourceMode::RandomArea {
                min_x: 0,
                max_x: 10,
                min_z: 0,
                max_z: 10,
                y: 8,
            },
            probability: 0.9,
            liquid_id: 1,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ground_height: 0,
            solid_id: -1,
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
            capacity_scaling: 1.5,
            solid_faces: SolidFacePolicy::Expose,
            background: true,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_dt: 1.0 / 60.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// The per-user config directory, e.g. `~/.config/rill` on Linux.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join(APP_NAME))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Checks the ranges the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sim.propagation_delay.is_nan() || self.sim.propagation_delay < 0.0 {
            return Err(invalid("sim.propagation_delay", "must be >= 0"));
        }
        if self.sim.settle_threshold.is_nan() || self.sim.settle_threshold < 0.0 {
            return Err(invalid("sim.settle_threshold", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.source.probability) {
            return Err(invalid("source.probability", "must be within 0.0..=1.0"));
        }
        if self.source.liquid_id <= 0 {
            return Err(invalid("source.liquid_id", "liquid ids are positive"));
        }
        if let SourceMode::RandomArea {
            min_x,
            max_x,
            min_z,
            max_z,
            ..
        } = self.source.mode
            && (min_x >= max_x || min_z >= max_z)
        {
            return Err(invalid("source.mode", "random area must not be empty"));
        }
        if self.world.solid_id >= 0 {
            return Err(invalid("world.solid_id", "solid ids are negative"));
        }
        if self.mesh.initial_capacity == 0 {
            return Err(invalid("mesh.initial_capacity", "must be at least 1"));
        }
        if self.mesh.capacity_scaling.is_nan() || self.mesh.capacity_scaling <= 1.0 {
            return Err(invalid("mesh.capacity_scaling", "must be greater than 1.0"));
        }
        if let Some(seed) = self.seeds.iter().find(|s| s.id <= 0 || s.volume == 0) {
            return Err(invalid(
                "seeds",
                format!(
                    "seed at ({}, {}, {}) needs a positive id and volume",
                    seed.x, seed.y, seed.z
                ),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("propagation_delay: 1.0"));
        assert!(ron_str.contains("initial_capacity: 256"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_seeds_match_starting_scene() {
        let config = Config::default();
        assert_eq!(config.seeds.len(), 6);
        assert_eq!(
            config.seeds[0],
            SeedConfig {
                x: 0,
                y: 1,
                z: 0,
                id: 1,
                volume: 7
            }
        );
        let total: u32 = config.seeds.iter().map(|s| s.volume as u32).sum();
        assert_eq!(total, 23);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(sim: (), world: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.mesh, MeshConfig::default());
        assert_eq!(config.source, SourceConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let ron_str = "(sim: (settle_threshold: 10.0))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.sim.settle_threshold, 10.0);
        assert_eq!(config.sim.propagation_delay, 1.0);
    }

    #[test]
    fn test_fixed_source_parses() {
        let ron_str = "(source: (mode: Fixed(x: 1, y: 6, z: -2)))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.source.mode, SourceMode::Fixed { x: 1, y: 6, z: -2 });
    }

    #[test]
    fn test_solid_face_policy_parses() {
        let ron_str = "(mesh: (solid_faces: Cull))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.mesh.solid_faces, SolidFacePolicy::Cull);
        assert_eq!(Config::default().mesh.solid_faces, SolidFacePolicy::Expose);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.sim.rng_seed = 7;
        config.seeds.truncate(1);
        config.mesh.background = false;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.sim.propagation_delay = 0.25;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().sim.propagation_delay, 0.25);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.mesh.capacity_scaling = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "mesh.capacity_scaling",
                ..
            })
        ));

        let mut config = Config::default();
        config.source.probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.world.solid_id = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.seeds[2].volume = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source.mode = SourceMode::RandomArea {
            min_x: 4,
            max_x: 4,
            min_z: 0,
            max_z: 1,
            y: 3,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(sim: (settle_threshold: -1.0))").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
