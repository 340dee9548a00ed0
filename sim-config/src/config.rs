use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_WORLD_CONFIG_REL_PATH: &str = "default.toml";
const TIER_KEYS: [&str; 3] = ["green", "yellow", "red"];
const MIN_GRID_WIDTH: u32 = 3;
const MAX_WALL_DENSITY: f32 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageDelivery {
    /// Visible to recipients that act later in the same turn.
    #[default]
    Instant,
    /// Visible from the next turn on.
    Deferred,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Coordinated,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierConfig {
    pub robots: u32,
    pub wastes: u32,
    pub radioactivity_threshold: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit: Option<[i32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    pub green: TierConfig,
    pub yellow: TierConfig,
    pub red: TierConfig,
    #[serde(default)]
    pub wall_density: f32,
    #[serde(default)]
    pub message_delivery: MessageDelivery,
    #[serde(default)]
    pub policy: PolicyKind,
}

impl Default for WorldConfig {
    fn default() -> Self {
        default_world_config()
    }
}

impl WorldConfig {
    /// Tier settings in green, yellow, red order.
    pub fn tiers(&self) -> [&TierConfig; 3] {
        [&self.green, &self.yellow, &self.red]
    }

    pub fn tiers_mut(&mut self) -> [&mut TierConfig; 3] {
        [&mut self.green, &mut self.yellow, &mut self.red]
    }

    pub fn thresholds(&self) -> [f32; 3] {
        self.tiers().map(|tier| tier.radioactivity_threshold)
    }

    /// Deposit cell of the tier at `tier_index`. Defaults to the easternmost
    /// column of the tier's zone, halfway down the grid.
    pub fn deposit(&self, tier_index: usize) -> [i32; 2] {
        self.tiers()[tier_index].deposit.unwrap_or_else(|| {
            let (_, end) = zone_columns(self.grid_width, tier_index);
            [end as i32 - 1, (self.grid_height / 2) as i32]
        })
    }
}

/// Half-open column range `[start, end)` of the zone at `zone_index`.
pub fn zone_columns(grid_width: u32, zone_index: usize) -> (u32, u32) {
    let zone = zone_index as u32;
    (grid_width * zone / 3, grid_width * (zone + 1) / 3)
}

/// Index of the zone a column belongs to.
pub fn zone_of_column(grid_width: u32, x: u32) -> usize {
    (0..3)
        .find(|zone| x < zone_columns(grid_width, *zone).1)
        .unwrap_or(2)
}

pub fn world_config_from_toml_str(raw: &str) -> Result<WorldConfig, toml::de::Error> {
    let mut value: toml::Value = toml::from_str(raw)?;
    normalize_world_config_toml(&mut value);
    value.try_into()
}

pub fn default_world_config() -> WorldConfig {
    world_config_from_toml_str(include_str!("../default.toml"))
        .expect("default world config TOML must deserialize")
}

pub fn default_world_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_WORLD_CONFIG_REL_PATH)
}

pub fn load_default_world_config() -> Result<WorldConfig> {
    load_world_config_from_path(&default_world_config_path())
}

pub fn load_world_config_from_path(path: &Path) -> Result<WorldConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read world config from {}", path.display()))?;
    world_config_from_toml_str(&raw)
        .context("world config TOML failed schema deserialization")
        .with_context(|| format!("failed to parse world config from {}", path.display()))
}

pub fn validate_world_config(config: &WorldConfig) -> Result<(), String> {
    if config.grid_width < MIN_GRID_WIDTH {
        return Err(format!("grid_width must be at least {MIN_GRID_WIDTH}"));
    }
    if config.grid_height == 0 {
        return Err("grid_height must be greater than zero".to_owned());
    }
    if !config.wall_density.is_finite() || !(0.0..=MAX_WALL_DENSITY).contains(&config.wall_density)
    {
        return Err(format!(
            "wall_density must be within [0, {MAX_WALL_DENSITY}]"
        ));
    }

    let mut previous_threshold = 0.0;
    for (key, tier) in TIER_KEYS.iter().zip(config.tiers()) {
        let threshold = tier.radioactivity_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(format!("{key}.radioactivity_threshold must be within (0, 1]"));
        }
        if threshold <= previous_threshold {
            return Err(format!(
                "{key}.radioactivity_threshold must exceed the previous tier's threshold"
            ));
        }
        previous_threshold = threshold;

        if let Some([x, y]) = tier.deposit {
            if x < 0 || y < 0 || x >= config.grid_width as i32 || y >= config.grid_height as i32 {
                return Err(format!("{key}.deposit [{x}, {y}] is outside the grid"));
            }
        }
    }

    for (idx, key) in TIER_KEYS.iter().enumerate() {
        let [x, y] = config.deposit(idx);
        if zone_of_column(config.grid_width, x as u32) > idx {
            return Err(format!(
                "{key}.deposit [{x}, {y}] lies in a zone the {key} robots cannot enter"
            ));
        }
        if let Some(other) = (0..idx).find(|other| config.deposit(*other) == [x, y]) {
            return Err(format!(
                "{key}.deposit [{x}, {y}] is already the {} deposit",
                TIER_KEYS[other]
            ));
        }
    }

    let cells = config.grid_width as u64 * config.grid_height as u64;
    let robots: u64 = config.tiers().iter().map(|tier| tier.robots as u64).sum();
    let wastes: u64 = config.tiers().iter().map(|tier| tier.wastes as u64).sum();
    if robots > cells || wastes > cells {
        return Err("robot and waste counts must each fit on the grid".to_owned());
    }
    Ok(())
}

/// Maps the flat batch-config layout (`grid_size`, `green_robots`, ...) onto
/// the tiered schema. Keys already present in the tiered form win.
fn normalize_world_config_toml(value: &mut toml::Value) {
    let Some(table) = value.as_table_mut() else {
        return;
    };

    if let Some(size) = table.remove("grid_size") {
        table.entry("grid_width").or_insert_with(|| size.clone());
        table.entry("grid_height").or_insert(size);
    }

    for (idx, key) in TIER_KEYS.iter().enumerate() {
        let robots = table.remove(&format!("{key}_robots"));
        let wastes = table.remove(&format!("{key}_wastes"));
        let Some(tier_table) = table
            .entry(*key)
            .or_insert_with(|| toml::Value::Table(Default::default()))
            .as_table_mut()
        else {
            continue;
        };
        if let Some(robots) = robots {
            tier_table.entry("robots").or_insert(robots);
        }
        if let Some(wastes) = wastes {
            tier_table.entry("wastes").or_insert(wastes);
        }
        tier_table
            .entry("radioactivity_threshold")
            .or_insert_with(|| toml::Value::Float(default_threshold(idx)));
    }
}

fn default_threshold(tier_index: usize) -> f64 {
    (tier_index as f64 + 1.0) / 3.0
}
