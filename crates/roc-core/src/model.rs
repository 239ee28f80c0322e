use crate::stage::{normalize, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    pub stage: String,
    pub message: String,
    pub percent: f64,
    pub bytes_done: u64,
    pub bytes_total: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodingDetail {
    pub codec: String,
    pub preset: String,
    pub fps: f64,
    pub eta_seconds: u64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationDetail {
    pub passed: bool,
    pub messages: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A child of a multi-part item: one episode of a season. Movies carry no
/// units (or one implicit unit, the item itself).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Unit {
    pub season: u32,
    pub episode: u32,
    pub stage: String,
    pub output_file: String,
    pub ripped_file: String,
    pub encoded_file: String,
    pub final_file: String,
    /// Explicit signal from the daemon; highest-priority resolver input.
    pub active: bool,
    pub source_title: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Unit {
    pub fn normalized_stage(&self) -> Stage {
        normalize(&self.stage)
    }

    pub fn label(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// One work-queue entry: a movie or a TV season with child episodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub progress: Progress,
    pub source_file: String,
    pub ripped_file: String,
    pub encoded_file: String,
    pub subtitled_file: String,
    pub final_file: String,
    pub encoding: Option<EncodingDetail>,
    pub validation: Option<ValidationDetail>,
    pub episodes: Vec<Unit>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Item {
    /// The progress payload is fresher than the coarse status when present.
    pub fn active_stage(&self) -> Stage {
        if self.progress.stage.trim().is_empty() {
            normalize(&self.status)
        } else {
            normalize(&self.progress.stage)
        }
    }

    /// Non-empty artifact path recorded for a stage's output, if that stage
    /// produces one. Path presence is a stronger completion signal than
    /// inferred stage order.
    pub fn artifact_path(&self, stage: Stage) -> Option<&str> {
        let path = match stage {
            Stage::Ripped => self.ripped_file.as_str(),
            Stage::Encoded => self.encoded_file.as_str(),
            Stage::Subtitled => self.subtitled_file.as_str(),
            Stage::Final => self.final_file.as_str(),
            _ => return None,
        };
        if path.trim().is_empty() {
            None
        } else {
            Some(path)
        }
    }

    pub fn totals(&self) -> Totals {
        Totals::from_units(&self.episodes)
    }
}

/// Milestone counts over an item's children. Monotone by construction:
/// `finished <= encoded <= ripped <= planned`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub planned: usize,
    pub ripped: usize,
    pub encoded: usize,
    pub finished: usize,
}

impl Totals {
    pub fn from_units(units: &[Unit]) -> Self {
        let mut totals = Totals {
            planned: units.len(),
            ..Totals::default()
        };
        for unit in units {
            let idx = unit.normalized_stage().index();
            if idx >= Stage::Ripped.index() {
                totals.ripped += 1;
            }
            if idx >= Stage::Encoded.index() {
                totals.encoded += 1;
            }
            if idx >= Stage::Final.index() {
                totals.finished += 1;
            }
        }
        totals
    }

    pub fn is_ordered(&self) -> bool {
        self.finished <= self.encoded && self.encoded <= self.ripped && self.ripped <= self.planned
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueSnapshot {
    pub items: Vec<Item>,
}

/// One structured event from the shared daemon stream (sequence-cursor mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEvent {
    pub seq: u64,
    pub ts: Option<DateTime<Utc>>,
    pub level: String,
    pub component: String,
    pub lane: String,
    pub request_id: String,
    pub item_id: Option<i64>,
    pub message: String,
}

impl LogEvent {
    pub fn render(&self) -> String {
        let mut line = String::new();
        if let Some(ts) = self.ts {
            line.push_str(&ts.format("%H:%M:%S").to_string());
            line.push(' ');
        }
        if !self.level.is_empty() {
            line.push_str(&self.level.to_ascii_uppercase());
            line.push(' ');
        }
        if !self.component.is_empty() {
            line.push_str(&self.component);
            line.push(' ');
        }
        if let Some(item_id) = self.item_id {
            line.push_str(&format!("item={item_id} "));
        }
        line.push_str(&self.message);
        line
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogBatch {
    pub events: Vec<LogEvent>,
    pub next: u64,
}

/// Chunk of a per-item log file (offset-cursor mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogFileChunk {
    pub lines: Vec<String>,
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(stage: &str) -> Unit {
        Unit {
            stage: stage.to_string(),
            ..Unit::default()
        }
    }

    #[test]
    fn totals_from_units_are_ordered() {
        let units = vec![
            unit("final"),
            unit("encoded"),
            unit("encoding"),
            unit("ripped"),
            unit("planned"),
        ];
        let totals = Totals::from_units(&units);
        assert_eq!(totals.planned, 5);
        assert_eq!(totals.ripped, 4);
        assert_eq!(totals.encoded, 2);
        assert_eq!(totals.finished, 1);
        assert!(totals.is_ordered());
    }

    #[test]
    fn active_stage_prefers_progress_over_status() {
        let item = Item {
            status: "ripping".to_string(),
            progress: Progress {
                stage: "encoding".to_string(),
                ..Progress::default()
            },
            ..Item::default()
        };
        assert_eq!(item.active_stage(), Stage::Encoding);

        let item = Item {
            status: "ripping".to_string(),
            ..Item::default()
        };
        assert_eq!(item.active_stage(), Stage::Ripping);
    }

    #[test]
    fn artifact_path_ignores_blank_fields() {
        let item = Item {
            ripped_file: "/out/disc.mkv".to_string(),
            encoded_file: "   ".to_string(),
            ..Item::default()
        };
        assert_eq!(item.artifact_path(Stage::Ripped), Some("/out/disc.mkv"));
        assert_eq!(item.artifact_path(Stage::Encoded), None);
        assert_eq!(item.artifact_path(Stage::Ripping), None);
    }

    #[test]
    fn item_payload_tolerates_unknown_fields() {
        let raw = r#"{
            "id": 42,
            "title": "Some Season",
            "status": "encoding",
            "discFingerprint": "abc123",
            "episodes": [
                {"season": 1, "episode": 2, "stage": "ripped", "makemkvTitle": 4}
            ]
        }"#;
        let item: Item = serde_json::from_str(raw).expect("deserialize item");
        assert_eq!(item.id, 42);
        assert_eq!(item.episodes.len(), 1);
        assert_eq!(item.episodes[0].normalized_stage(), Stage::Ripped);
        assert!(item.extra.contains_key("discFingerprint"));
    }

    #[test]
    fn log_event_render_includes_context() {
        let event = LogEvent {
            seq: 7,
            level: "warn".to_string(),
            component: "encoder".to_string(),
            item_id: Some(3),
            message: "fell behind realtime".to_string(),
            ..LogEvent::default()
        };
        let line = event.render();
        assert!(line.contains("WARN"));
        assert!(line.contains("encoder"));
        assert!(line.contains("item=3"));
        assert!(line.ends_with("fell behind realtime"));
    }
}
