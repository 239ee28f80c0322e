use crate::model::{Item, Totals, Unit};
use crate::stage::{Stage, STAGE_ORDER};

/// Per-stage projection handed to the presentation layer. A cell that is
/// neither complete nor untouched (`count > 0`) renders as in-progress, a
/// distinct state from both complete and pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCell {
    pub stage: Stage,
    pub count: usize,
    pub planned: usize,
    pub complete: bool,
    pub current: bool,
}

impl StageCell {
    pub fn partial(&self) -> bool {
        !self.complete && self.count > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineView {
    pub stages: Vec<StageCell>,
}

impl PipelineView {
    pub fn current(&self) -> Option<&StageCell> {
        self.stages.iter().find(|cell| cell.current)
    }

    pub fn cell(&self, stage: Stage) -> Option<&StageCell> {
        self.stages.iter().find(|cell| cell.stage == stage)
    }

    /// Milestone-counts mode: used when only aggregate totals are known for a
    /// multi-unit item. Covers the four milestone stages the totals describe.
    pub fn from_totals(active: Stage, totals: &Totals) -> Self {
        let planned = totals.planned;
        let cells = [
            (Stage::Planned, totals.planned),
            (Stage::Ripped, totals.ripped),
            (Stage::Encoded, totals.encoded),
            (Stage::Final, totals.finished),
        ];
        let mut stages: Vec<StageCell> = cells
            .iter()
            .map(|&(stage, count)| StageCell {
                stage,
                count,
                planned,
                complete: count >= planned,
                current: false,
            })
            .collect();
        mark_current(&mut stages, active);
        PipelineView { stages }
    }

    /// Multi-unit mode: each stage counts the units that have reached or
    /// passed it, so counts are monotone non-increasing along the pipeline.
    pub fn from_units(active: Stage, units: &[Unit]) -> Self {
        let planned = units.len();
        let indices: Vec<usize> = units
            .iter()
            .map(|unit| unit.normalized_stage().index())
            .collect();
        let mut stages: Vec<StageCell> = STAGE_ORDER
            .iter()
            .map(|&stage| {
                let count = indices.iter().filter(|&&idx| idx >= stage.index()).count();
                StageCell {
                    stage,
                    count,
                    planned,
                    complete: count >= planned,
                    current: false,
                }
            })
            .collect();
        mark_current(&mut stages, active);
        PipelineView { stages }
    }

    /// Single-unit mode: completion is inferred from stage order against the
    /// active stage, with a recorded artifact path overriding the inference
    /// when present.
    pub fn from_item_evidence(active: Stage, item: &Item) -> Self {
        let active_idx = active.index();
        let mut stages: Vec<StageCell> = STAGE_ORDER
            .iter()
            .map(|&stage| {
                let complete =
                    item.artifact_path(stage).is_some() || stage.index() < active_idx;
                StageCell {
                    stage,
                    count: usize::from(complete),
                    planned: 1,
                    complete,
                    current: false,
                }
            })
            .collect();
        mark_current(&mut stages, active);
        PipelineView { stages }
    }
}

/// The first cell in canonical order that is not complete and whose stage is
/// the item's active stage becomes current. When nothing matches (active stage
/// unmapped or already complete) no cell is current.
fn mark_current(cells: &mut [StageCell], active: Stage) {
    if let Some(cell) = cells
        .iter_mut()
        .find(|cell| !cell.complete && cell.stage == active)
    {
        cell.current = true;
    }
}

/// Project an item into per-stage completion state. Multi-unit items use
/// their children's normalized stages; items without children fall back to
/// path evidence plus order inference.
pub fn project(item: &Item) -> PipelineView {
    let active = item.active_stage();
    if item.episodes.is_empty() {
        PipelineView::from_item_evidence(active, item)
    } else {
        PipelineView::from_units(active, &item.episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Progress;

    fn unit(stage: &str) -> Unit {
        Unit {
            stage: stage.to_string(),
            ..Unit::default()
        }
    }

    #[test]
    fn totals_scenario_marks_three_way_state() {
        let totals = Totals {
            planned: 10,
            ripped: 10,
            encoded: 6,
            finished: 2,
        };
        let view = PipelineView::from_totals(Stage::Encoded, &totals);

        let ripped = view.cell(Stage::Ripped).expect("ripped cell");
        assert!(ripped.complete);

        let encoded = view.cell(Stage::Encoded).expect("encoded cell");
        assert!(!encoded.complete);
        assert!(encoded.current);
        assert_eq!(encoded.count, 6);

        let finished = view.cell(Stage::Final).expect("final cell");
        assert!(!finished.complete);
        assert!(!finished.current);
        assert!(finished.partial());
    }

    #[test]
    fn ordered_totals_never_complete_later_before_earlier() {
        for planned in 0..=4usize {
            for ripped in 0..=planned {
                for encoded in 0..=ripped {
                    for finished in 0..=encoded {
                        let totals = Totals {
                            planned,
                            ripped,
                            encoded,
                            finished,
                        };
                        assert!(totals.is_ordered());
                        let view = PipelineView::from_totals(Stage::Planned, &totals);
                        let mut seen_incomplete = false;
                        for cell in &view.stages {
                            if seen_incomplete {
                                assert!(
                                    !cell.complete,
                                    "stage {} complete after an incomplete stage",
                                    cell.stage
                                );
                            }
                            if !cell.complete {
                                seen_incomplete = true;
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn unit_scan_counts_reached_or_passed() {
        let units = vec![unit("final"), unit("encoding"), unit("ripped"), unit("planned")];
        let view = PipelineView::from_units(Stage::Encoding, &units);

        assert_eq!(view.cell(Stage::Planned).unwrap().count, 4);
        assert_eq!(view.cell(Stage::Ripping).unwrap().count, 3);
        assert_eq!(view.cell(Stage::Encoding).unwrap().count, 2);
        assert_eq!(view.cell(Stage::Encoded).unwrap().count, 1);
        assert_eq!(view.cell(Stage::Final).unwrap().count, 1);

        let current = view.current().expect("current stage");
        assert_eq!(current.stage, Stage::Encoding);
        assert!(current.partial());
    }

    #[test]
    fn single_unit_path_evidence_beats_order_inference() {
        let item = Item {
            status: "encoding".to_string(),
            ripped_file: "/rips/movie.mkv".to_string(),
            ..Item::default()
        };
        let view = project(&item);

        // ripped is complete via path even though order inference alone would
        // already pass it; encoding is current via order.
        assert!(view.cell(Stage::Ripped).unwrap().complete);
        assert!(!view.cell(Stage::Encoded).unwrap().complete);
        let current = view.current().expect("current stage");
        assert_eq!(current.stage, Stage::Encoding);
    }

    #[test]
    fn single_unit_path_marks_future_stage_complete() {
        // Conflicting evidence: final artifact recorded while still encoding.
        // Path wins for that stage; order inference covers the rest.
        let item = Item {
            status: "encoding".to_string(),
            final_file: "/library/movie.mkv".to_string(),
            ..Item::default()
        };
        let view = project(&item);
        assert!(view.cell(Stage::Final).unwrap().complete);
        assert!(!view.cell(Stage::Encoded).unwrap().complete);
    }

    #[test]
    fn no_current_stage_when_active_is_unmapped() {
        let item = Item {
            status: "mystery_state".to_string(), // normalizes to planned
            progress: Progress {
                stage: String::new(),
                ..Progress::default()
            },
            episodes: vec![unit("ripped"), unit("ripped")],
            ..Item::default()
        };
        let view = project(&item);
        // planned cell counts every unit, so it is complete and cannot match
        assert!(view.current().is_none());
    }

    #[test]
    fn multi_unit_all_final_has_no_current() {
        let item = Item {
            status: "completed".to_string(),
            episodes: vec![unit("final"), unit("done")],
            ..Item::default()
        };
        let view = project(&item);
        assert!(view.stages.iter().all(|cell| cell.complete));
        assert!(view.current().is_none());
    }
}
