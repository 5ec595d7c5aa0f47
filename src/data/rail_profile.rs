//! Schienenprofile: Querschnitt einer Schiene mit benannten Bezugspunkten.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use glam::Vec2;
use serde::Deserialize;

/// Rechteckblock eines vereinfachten Profils als `[Breite, Höhe]`.
pub type Block = [f32; 2];

/// Vereinfachtes Profil aus Fuß, Steg und Kopf.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RailBlocks {
    pub foot: Block,
    pub web: Block,
    pub head: Block,
}

impl RailBlocks {
    /// Profilhöhe vom Fuß bis zur Schienenoberkante.
    pub fn total_height(&self) -> f32 {
        self.foot[1] + self.web[1] + self.head[1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RailShape {
    Simple(RailBlocks),
    /// Unbekannter Typ, nur Bezugspunkte
    Generic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RailProfile {
    pub name: String,
    pub shape: RailShape,
    references: BTreeMap<String, Vec2>,
}

/// JSON-Form: `{"name", "type", "blocks": {...}, "references": {"gauge": [x, y]}}`
#[derive(Deserialize)]
struct RawRailProfile {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    blocks: Option<RailBlocks>,
    #[serde(default)]
    references: BTreeMap<String, [f32; 2]>,
}

impl RailProfile {
    pub fn new(name: impl Into<String>, shape: RailShape) -> Self {
        Self {
            name: name.into(),
            shape,
            references: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawRailProfile =
            serde_json::from_str(json).context("Schienenprofil ist kein gültiges JSON")?;
        let shape = match raw.kind.as_str() {
            "simple" => {
                let Some(blocks) = raw.blocks else {
                    bail!("Profil '{}': Typ 'simple' ohne Blöcke", raw.name);
                };
                RailShape::Simple(blocks)
            }
            _ => RailShape::Generic,
        };
        let references = raw
            .references
            .into_iter()
            .map(|(name, [x, y])| (name, Vec2::new(x, y)))
            .collect();
        Ok(Self {
            name: raw.name,
            shape,
            references,
        })
    }

    pub fn add_reference(&mut self, name: impl Into<String>, position: Vec2) {
        self.references.insert(name.into(), position);
    }

    /// Bezugspunkt im Profilquerschnitt.
    pub fn reference(&self, name: &str) -> Option<Vec2> {
        self.references.get(name).copied()
    }
}
