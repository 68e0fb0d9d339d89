//! TOML configuration for the world: grid extent, gameplay tunables and the
//! per-archetype stat tables read by the unit factory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use battlegrid_core::UnitKind;
use battlegrid_spatial::GridError;
use battlegrid_system_gameplay::GameplayConfig;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating a [`WorldConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {path}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid TOML for this schema.
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A numeric setting is negative or not finite.
    #[error("{field} must be a finite non-negative number, got {value}")]
    InvalidValue {
        /// Dotted path of the offending key.
        field: String,
        /// Rejected value.
        value: f32,
    },
    /// A setting used as a divisor is zero, negative or not finite.
    #[error("{field} must be a finite positive number, got {value}")]
    NotPositive {
        /// Dotted path of the offending key.
        field: String,
        /// Rejected value.
        value: f32,
    },
    /// The grid section describes an unusable grid.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Extent and resolution of the spatial grid.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// World width in world units.
    pub width: f32,
    /// World height in world units.
    pub height: f32,
    /// Edge length of one grid cell.
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            cell_size: 10.0,
        }
    }
}

/// Resolved stats of one unit archetype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitStats {
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Maximum hit points.
    pub hp: f32,
    /// Flat damage reduction.
    pub shield: f32,
    /// Damage per hit or per projectile.
    pub damage: f32,
    /// Attack reach.
    pub range: f32,
    /// Seconds between attacks.
    pub attack_cooldown: f32,
    /// Projectile flight speed.
    pub projectile_speed: f32,
    /// Area radius of siege projectiles.
    pub damage_radius: f32,
    /// Hit points restored per heal pulse.
    pub heal_amount: f32,
    /// Heal pulse radius.
    pub heal_range: f32,
    /// Seconds between heal pulses.
    pub heal_cooldown: f32,
    /// Distance kept from the followed ally.
    pub follow_range: f32,
    /// Radius searched for an ally to follow.
    pub follow_search_radius: f32,
    /// Seconds between ally searches.
    pub follow_target_cooldown: f32,
}

impl UnitStats {
    /// Built-in stats used for keys the configuration leaves out.
    #[must_use]
    pub fn defaults(kind: UnitKind) -> Self {
        let mut stats = Self {
            speed: 10.0,
            hp: 100.0,
            shield: 0.0,
            damage: 0.0,
            range: 0.0,
            attack_cooldown: 0.0,
            projectile_speed: 15.0,
            damage_radius: 0.0,
            heal_amount: 10.0,
            heal_range: 5.0,
            heal_cooldown: 2.0,
            follow_range: 2.0,
            follow_search_radius: 10.0,
            follow_target_cooldown: 2.0,
        };
        match kind {
            UnitKind::Footman => {
                stats.damage = 10.0;
                stats.range = 1.5;
                stats.attack_cooldown = 1.0;
            }
            UnitKind::Archer => {
                stats.damage = 8.0;
                stats.range = 10.0;
                stats.attack_cooldown = 2.0;
            }
            UnitKind::Ballista => {
                stats.damage = 50.0;
                stats.range = 15.0;
                stats.attack_cooldown = 5.0;
                stats.damage_radius = 3.0;
            }
            UnitKind::Healer => {}
        }
        stats
    }

    fn fields(&self) -> [(&'static str, f32); 14] {
        [
            ("speed", self.speed),
            ("hp", self.hp),
            ("shield", self.shield),
            ("damage", self.damage),
            ("range", self.range),
            ("attack_cooldown", self.attack_cooldown),
            ("projectile_speed", self.projectile_speed),
            ("damage_radius", self.damage_radius),
            ("heal_amount", self.heal_amount),
            ("heal_range", self.heal_range),
            ("heal_cooldown", self.heal_cooldown),
            ("follow_range", self.follow_range),
            ("follow_search_radius", self.follow_search_radius),
            ("follow_target_cooldown", self.follow_target_cooldown),
        ]
    }
}

/// A `[[units]]` table as written; absent keys take the archetype default.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct UnitTable {
    speed: Option<f32>,
    hp: Option<f32>,
    shield: Option<f32>,
    damage: Option<f32>,
    range: Option<f32>,
    attack_cooldown: Option<f32>,
    projectile_speed: Option<f32>,
    damage_radius: Option<f32>,
    heal_amount: Option<f32>,
    heal_range: Option<f32>,
    heal_cooldown: Option<f32>,
    follow_range: Option<f32>,
    follow_search_radius: Option<f32>,
    follow_target_cooldown: Option<f32>,
}

impl UnitTable {
    fn resolve(self, kind: UnitKind) -> UnitStats {
        let base = UnitStats::defaults(kind);
        UnitStats {
            speed: self.speed.unwrap_or(base.speed),
            hp: self.hp.unwrap_or(base.hp),
            shield: self.shield.unwrap_or(base.shield),
            damage: self.damage.unwrap_or(base.damage),
            range: self.range.unwrap_or(base.range),
            attack_cooldown: self.attack_cooldown.unwrap_or(base.attack_cooldown),
            projectile_speed: self.projectile_speed.unwrap_or(base.projectile_speed),
            damage_radius: self.damage_radius.unwrap_or(base.damage_radius),
            heal_amount: self.heal_amount.unwrap_or(base.heal_amount),
            heal_range: self.heal_range.unwrap_or(base.heal_range),
            heal_cooldown: self.heal_cooldown.unwrap_or(base.heal_cooldown),
            follow_range: self.follow_range.unwrap_or(base.follow_range),
            follow_search_radius: self
                .follow_search_radius
                .unwrap_or(base.follow_search_radius),
            follow_target_cooldown: self
                .follow_target_cooldown
                .unwrap_or(base.follow_target_cooldown),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawWorldConfig {
    grid: GridConfig,
    gameplay: GameplayConfig,
    units: Option<Vec<UnitTable>>,
}

/// Complete world configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawWorldConfig")]
pub struct WorldConfig {
    /// Spatial grid extent and resolution.
    pub grid: GridConfig,
    /// Tick pipeline tunables.
    pub gameplay: GameplayConfig,
    /// Stats per archetype, indexed by [`UnitKind::index`]. Archetypes past
    /// the end of the list spawn without combat components.
    pub units: Vec<UnitStats>,
}

impl From<RawWorldConfig> for WorldConfig {
    fn from(raw: RawWorldConfig) -> Self {
        let units = match raw.units {
            Some(tables) => tables
                .into_iter()
                .zip(UnitKind::ALL)
                .map(|(table, kind)| table.resolve(kind))
                .collect(),
            None => UnitKind::ALL.into_iter().map(UnitStats::defaults).collect(),
        };
        Self {
            grid: raw.grid,
            gameplay: raw.gameplay,
            units,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        RawWorldConfig::default().into()
    }
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Stats of `kind`, if the configuration provides them.
    #[must_use]
    pub fn unit(&self, kind: UnitKind) -> Option<&UnitStats> {
        self.units.get(kind.index())
    }

    /// Rejects negative or non-finite numeric settings, and zero where the
    /// value divides a distance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = [
            ("grid.width", self.grid.width),
            ("grid.height", self.grid.height),
            ("grid.cell_size", self.grid.cell_size),
        ];
        for (field, value) in grid {
            check_positive(field.to_owned(), value)?;
        }
        let gameplay = [
            ("gameplay.targeting_interval", self.gameplay.targeting_interval),
            ("gameplay.arrival_threshold", self.gameplay.arrival_threshold),
            ("gameplay.impact_radius", self.gameplay.impact_radius),
        ];
        for (field, value) in gameplay {
            check(field.to_owned(), value)?;
        }
        for (kind, stats) in UnitKind::ALL.iter().zip(&self.units) {
            for (field, value) in stats.fields() {
                check(format!("units.{kind:?}.{field}"), value)?;
            }
            check_positive(format!("units.{kind:?}.projectile_speed"), stats.projectile_speed)?;
        }
        Ok(())
    }
}

fn check_positive(field: String, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn check(field: String, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}
