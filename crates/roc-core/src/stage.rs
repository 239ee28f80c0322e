use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical pipeline stages in processing order. The ordering is load-bearing:
/// progress counting and resolver tie-breaking both compare stage indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planned,
    Identifying,
    Identified,
    Ripping,
    Ripped,
    Encoding,
    Encoded,
    Subtitling,
    Subtitled,
    Organizing,
    Final,
}

pub const STAGE_ORDER: [Stage; 11] = [
    Stage::Planned,
    Stage::Identifying,
    Stage::Identified,
    Stage::Ripping,
    Stage::Ripped,
    Stage::Encoding,
    Stage::Encoded,
    Stage::Subtitling,
    Stage::Subtitled,
    Stage::Organizing,
    Stage::Final,
];

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Planned => "planned",
            Stage::Identifying => "identifying",
            Stage::Identified => "identified",
            Stage::Ripping => "ripping",
            Stage::Ripped => "ripped",
            Stage::Encoding => "encoding",
            Stage::Encoded => "encoded",
            Stage::Subtitling => "subtitling",
            Stage::Subtitled => "subtitled",
            Stage::Organizing => "organizing",
            Stage::Final => "final",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_final(self) -> bool {
        matches!(self, Stage::Final)
    }

    /// The resting stage a unit sits in before this activity begins. Used by
    /// the resolver's pipeline-adjacency strategy: a season actively ripping
    /// has its next episode waiting in `planned`, not `identified`.
    pub fn preceding_rest(self) -> Option<Stage> {
        match self {
            Stage::Ripping => Some(Stage::Planned),
            Stage::Encoding => Some(Stage::Ripped),
            Stage::Subtitling => Some(Stage::Encoded),
            Stage::Organizing => Some(Stage::Subtitled),
            _ => None,
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Planned
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an arbitrary daemon status token to a canonical stage. Total and pure:
/// unrecognized or empty input maps to `Planned`, never an error.
///
/// Exact-token rules run before prefix rules so that terminal tokens like
/// `"ripped"` are not reclassified as their in-progress counterparts.
pub fn normalize(raw: &str) -> Stage {
    let token = raw.trim().to_ascii_lowercase();
    if token.is_empty() {
        return Stage::Planned;
    }

    if token == "episode_identifying" || token.contains("episode identification") {
        return Stage::Identifying;
    }
    if token == "episode_identified" || token.contains("episode identified") {
        return Stage::Identified;
    }

    match token.as_str() {
        "subtitled" => return Stage::Subtitled,
        "encoded" => return Stage::Encoded,
        "ripped" => return Stage::Ripped,
        "identifying" => return Stage::Identifying,
        "identified" => return Stage::Identified,
        _ => {}
    }

    if token.starts_with("subtitl") {
        return Stage::Subtitling;
    }
    if token.starts_with("encod") {
        return Stage::Encoding;
    }
    if token.starts_with("rip") {
        return Stage::Ripping;
    }
    if token == "organizing" {
        return Stage::Organizing;
    }

    match token.as_str() {
        "final" | "completed" | "complete" | "success" | "done" => Stage::Final,
        _ => Stage::Planned,
    }
}
