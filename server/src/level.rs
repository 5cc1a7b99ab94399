//! Level geometry loading and validation.
//!
//! Levels are persisted as a JSON array of axis-aligned boxes. Each record
//! stores its top-left corner; bodies are created around the box center.

use log::{debug, info};
use serde::Deserialize;
use shared::body::{LABEL_GOAL, LABEL_JOIN_GAME_ZONE, LABEL_SPAWN_ZONE, LABEL_STARTING_ZONE};
use shared::{BodyError, BodyId, Bounds, PhysicsWorld, SimpleBody, Vector2D};
use std::path::{Path, PathBuf};
use thiserror::Error;

const EMBEDDED_LEVEL: &str = include_str!("../levels/level1.json");

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed level data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("level has no {0}")]
    MissingZone(&'static str),
    #[error("level has more than one {0}")]
    DuplicateZone(&'static str),
    #[error("record {index} is invalid: {source}")]
    InvalidRecord { index: usize, source: BodyError },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneType {
    #[default]
    Unset,
    StartingZone,
    /// Older level files call the goal an ending zone.
    EndingZone,
    Goal,
    JoinGameZone,
    SpawnZone,
}

impl ZoneType {
    /// Body label for zone records, `None` for plain platforms.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ZoneType::Unset => None,
            ZoneType::StartingZone => Some(LABEL_STARTING_ZONE),
            ZoneType::EndingZone | ZoneType::Goal => Some(LABEL_GOAL),
            ZoneType::JoinGameZone => Some(LABEL_JOIN_GAME_ZONE),
            ZoneType::SpawnZone => Some(LABEL_SPAWN_ZONE),
        }
    }

    fn fill_color(&self) -> &'static str {
        match self {
            ZoneType::Unset => "gray",
            ZoneType::StartingZone => "rgba(0, 0, 255, 0.5)",
            ZoneType::EndingZone | ZoneType::Goal => "rgba(255, 0, 0, 0.5)",
            ZoneType::JoinGameZone => "rgba(0, 255, 0, 0.5)",
            ZoneType::SpawnZone => "rgba(255, 255, 0, 0.5)",
        }
    }
}

fn default_static() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    /// Top-left corner.
    pub position: Vector2D,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "type", default)]
    pub zone_type: ZoneType,
    #[serde(default = "default_static")]
    pub is_static: bool,
}

impl LevelRecord {
    pub fn center(&self) -> Vector2D {
        Vector2D::new(self.position.x + self.width / 2.0, self.position.y + self.height / 2.0)
    }

    /// Body template for this record. Zones are static sensors.
    pub fn template(&self) -> SimpleBody {
        match self.zone_type.label() {
            Some(label) => SimpleBody::rectangle(self.center(), self.width, self.height, true)
                .with_label(label)
                .with_sensor(true)
                .with_colors(self.zone_type.fill_color(), "black"),
            None => SimpleBody::rectangle(self.center(), self.width, self.height, self.is_static),
        }
    }
}

/// World-space boxes of the four zones every level must have.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelZones {
    pub starting: Bounds,
    pub goal: Bounds,
    pub join: Bounds,
    pub spawn: Bounds,
}

impl LevelZones {
    pub fn spawn_point(&self) -> Vector2D {
        self.spawn.center()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    records: Vec<LevelRecord>,
}

impl Level {
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let records: Vec<LevelRecord> = serde_json::from_str(json)?;
        let level = Level { records };
        level.validate()?;
        Ok(level)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let json = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let level = Self::from_json(&json)?;
        info!("Loaded level from {} ({} records)", path.display(), level.records.len());
        Ok(level)
    }

    /// The level compiled into the server binary.
    pub fn embedded() -> Result<Self, LevelError> {
        Self::from_json(EMBEDDED_LEVEL)
    }

    pub fn records(&self) -> &[LevelRecord] {
        &self.records
    }

    /// Rounds every record's corner to the nearest multiple of `grid`.
    pub fn snapped(mut self, grid: f32) -> Self {
        for record in &mut self.records {
            record.position = record.position.snap_to_grid(grid);
        }
        self
    }

    fn validate(&self) -> Result<(), LevelError> {
        for (index, record) in self.records.iter().enumerate() {
            record
                .template()
                .geometry()
                .map_err(|source| LevelError::InvalidRecord { index, source })?;
        }

        for label in [LABEL_STARTING_ZONE, LABEL_GOAL, LABEL_JOIN_GAME_ZONE, LABEL_SPAWN_ZONE] {
            let count = self
                .records
                .iter()
                .filter(|record| record.zone_type.label() == Some(label))
                .count();
            match count {
                0 => return Err(LevelError::MissingZone(label)),
                1 => {}
                _ => return Err(LevelError::DuplicateZone(label)),
            }
        }
        Ok(())
    }

    /// Spawns every record into `world` and returns the zone boxes.
    pub fn instantiate(&self, world: &mut PhysicsWorld) -> Result<LevelZones, LevelError> {
        let mut zone_ids: Vec<(&'static str, BodyId)> = Vec::new();

        for (index, record) in self.records.iter().enumerate() {
            let id = world
                .spawn(&record.template())
                .map_err(|source| LevelError::InvalidRecord { index, source })?;
            if let Some(label) = record.zone_type.label() {
                zone_ids.push((label, id));
            }
        }

        let zone = |label: &'static str| -> Result<Bounds, LevelError> {
            zone_ids
                .iter()
                .find(|(zone_label, _)| *zone_label == label)
                .and_then(|(_, id)| world.bounds(*id))
                .ok_or(LevelError::MissingZone(label))
        };

        let zones = LevelZones {
            starting: zone(LABEL_STARTING_ZONE)?,
            goal: zone(LABEL_GOAL)?,
            join: zone(LABEL_JOIN_GAME_ZONE)?,
            spawn: zone(LABEL_SPAWN_ZONE)?,
        };
        debug!("Level zones: {:?}", zones);
        Ok(zones)
    }
}
