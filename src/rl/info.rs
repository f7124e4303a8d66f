// src/rl/info.rs
//
// Per-episode info log: one record per converged unit, keyed by instance
// tag, in placement order. For post-episode inspection only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stream::StreamSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum UnitRecord {
    Mixer {
        outlet: StreamSummary,
    },
    Heater {
        temperature: f64,
        pressure: f64,
        outlet: StreamSummary,
    },
    Cooler {
        temperature: f64,
        outlet: StreamSummary,
    },
    Reactor {
        adiabatic: bool,
        diameter: f64,
        length: f64,
        outlet: StreamSummary,
    },
    Column {
        stages: u32,
        distillate_rate: f64,
        distillate: StreamSummary,
        bottoms: StreamSummary,
    },
    PurgeColumn {
        stages: u32,
        distillate_rate: f64,
        distillate: StreamSummary,
        bottoms: StreamSummary,
    },
    RecycleColumn {
        stages: u32,
        distillate_rate: f64,
        recycle_ratio: f64,
        distillate: StreamSummary,
        recycle: StreamSummary,
    },
    TriColumn {
        stages: u32,
        distillate_rate: f64,
        distillate: StreamSummary,
        bottoms: StreamSummary,
    },
    Flash {
        temperature: f64,
        pressure: f64,
        vapor: StreamSummary,
        liquid: StreamSummary,
    },
    FlashRecycle {
        temperature: f64,
        pressure: f64,
        recycle_ratio: f64,
        recycle: StreamSummary,
        liquid: StreamSummary,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoEntry {
    pub tag: String,
    pub record: UnitRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoLog {
    entries: Vec<InfoEntry>,
}

impl InfoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Tags are unique within an episode.
    pub fn insert(&mut self, tag: impl Into<String>, record: UnitRecord) {
        self.entries.push(InfoEntry {
            tag: tag.into(),
            record,
        });
    }

    pub fn get(&self, tag: &str) -> Option<&UnitRecord> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| &e.record)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InfoEntry> {
        self.entries.iter()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tag.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// One line per unit: `<tag>: <record json>`.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InfoLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let body = serde_json::to_string(&entry.record).map_err(|_| fmt::Error)?;
            writeln!(f, "{}: {}", entry.tag, body)?;
        }
        Ok(())
    }
}
