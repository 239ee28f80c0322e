use crate::model::{Item, Unit};
use crate::stage::Stage;

/// One resolution heuristic. Strategies are evaluated strictly in the order
/// they appear in `STRATEGIES`; reordering them changes which episode gets
/// highlighted under ambiguous states, so additions go at the right rank.
type Strategy = fn(&Item, &[Unit], Stage) -> Option<usize>;

const STRATEGIES: &[Strategy] = &[
    explicit_flag,
    path_match,
    stage_match,
    adjacent_stage_match,
    first_unfinished,
];

/// Determine which unit is currently being worked on. Deterministic, never
/// panics, and returns a valid index whenever `units` is non-empty: if every
/// strategy declines (all units final), the last index is returned.
pub fn resolve_active_unit(item: &Item, units: &[Unit]) -> Option<usize> {
    if units.is_empty() {
        return None;
    }
    let active = item.active_stage();
    for strategy in STRATEGIES {
        if let Some(idx) = strategy(item, units, active) {
            return Some(idx);
        }
    }
    Some(units.len() - 1)
}

fn explicit_flag(_item: &Item, units: &[Unit], _active: Stage) -> Option<usize> {
    units.iter().position(|unit| unit.active)
}

#[derive(Debug, Clone, Copy)]
enum MatchTier {
    Exact,
    CaseInsensitive,
    Suffix,
    Basename,
}

const MATCH_TIERS: [MatchTier; 4] = [
    MatchTier::Exact,
    MatchTier::CaseInsensitive,
    MatchTier::Suffix,
    MatchTier::Basename,
];

fn paths_match(tier: MatchTier, a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    match tier {
        MatchTier::Exact => a == b,
        MatchTier::CaseInsensitive => a.eq_ignore_ascii_case(b),
        MatchTier::Suffix => {
            let a = a.to_ascii_lowercase();
            let b = b.to_ascii_lowercase();
            a.ends_with(&b) || b.ends_with(&a)
        }
        MatchTier::Basename => basename(a).eq_ignore_ascii_case(basename(b)),
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn non_empty(path: &str) -> Option<&str> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Stage-gated file-path matching. Each tier is applied across every unit
/// before falling to the next, so an exact match anywhere in the list beats a
/// basename match earlier in it.
fn path_match(item: &Item, units: &[Unit], active: Stage) -> Option<usize> {
    match active {
        Stage::Ripping => {
            let target = non_empty(&item.ripped_file)?;
            for tier in MATCH_TIERS {
                for (idx, unit) in units.iter().enumerate() {
                    if paths_match(tier, &unit.ripped_file, target)
                        || paths_match(tier, &unit.output_file, target)
                    {
                        return Some(idx);
                    }
                }
            }
            None
        }
        Stage::Encoding | Stage::Subtitling => {
            let target =
                non_empty(&item.encoded_file).or_else(|| non_empty(&item.source_file))?;
            let input = non_empty(&item.source_file);
            for tier in MATCH_TIERS {
                for (idx, unit) in units.iter().enumerate() {
                    if paths_match(tier, &unit.encoded_file, target)
                        || paths_match(tier, &unit.output_file, target)
                    {
                        return Some(idx);
                    }
                }
                if let Some(input) = input {
                    for (idx, unit) in units.iter().enumerate() {
                        if paths_match(tier, &unit.ripped_file, input) {
                            return Some(idx);
                        }
                    }
                }
            }
            None
        }
        _ => None,
    }
}

fn stage_match(_item: &Item, units: &[Unit], active: Stage) -> Option<usize> {
    units
        .iter()
        .position(|unit| unit.normalized_stage() == active)
}

fn adjacent_stage_match(_item: &Item, units: &[Unit], active: Stage) -> Option<usize> {
    let rest = active.preceding_rest()?;
    units.iter().position(|unit| unit.normalized_stage() == rest)
}

fn first_unfinished(_item: &Item, units: &[Unit], _active: Stage) -> Option<usize> {
    units
        .iter()
        .position(|unit| !unit.normalized_stage().is_final())
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

    fn item(status: &str) -> Item {
        Item {
            status: status.to_string(),
            ..Item::default()
        }
    }

    #[test]
    fn explicit_flag_wins_over_everything() {
        let mut ripping = unit("ripping");
        ripping.ripped_file = "/rips/s01e01.mkv".to_string();
        let mut flagged = unit("final");
        flagged.active = true;

        let mut item = item("ripping");
        item.ripped_file = "/rips/s01e01.mkv".to_string();

        let units = vec![ripping, flagged];
        assert_eq!(resolve_active_unit(&item, &units), Some(1));
    }

    #[test]
    fn ripping_path_match_exact() {
        let mut target = unit("planned");
        target.ripped_file = "/rips/s01e03.mkv".to_string();
        let units = vec![unit("planned"), target, unit("planned")];

        let mut item = item("ripping");
        item.ripped_file = "/rips/s01e03.mkv".to_string();

        assert_eq!(resolve_active_unit(&item, &units), Some(1));
    }

    #[test]
    fn exact_match_beats_earlier_basename_match() {
        let mut basename_only = unit("planned");
        basename_only.ripped_file = "/other/dir/s01e03.mkv".to_string();
        let mut exact = unit("planned");
        exact.ripped_file = "/rips/s01e03.mkv".to_string();
        let units = vec![basename_only, exact];

        let mut item = item("ripping");
        item.ripped_file = "/rips/s01e03.mkv".to_string();

        assert_eq!(resolve_active_unit(&item, &units), Some(1));
    }

    #[test]
    fn case_insensitive_and_suffix_tiers() {
        let mut upper = unit("planned");
        upper.output_file = "/RIPS/S01E05.MKV".to_string();
        let units = vec![unit("final"), upper];

        let mut by_case = item("ripping");
        by_case.ripped_file = "/rips/s01e05.mkv".to_string();
        assert_eq!(resolve_active_unit(&by_case, &units), Some(1));

        let mut tail = unit("planned");
        tail.ripped_file = "staging/s02e01.mkv".to_string();
        let units = vec![tail];
        let mut by_suffix = item("ripping");
        by_suffix.ripped_file = "/mnt/pool/staging/s02e01.mkv".to_string();
        assert_eq!(resolve_active_unit(&by_suffix, &units), Some(0));
    }

    #[test]
    fn encoding_matches_input_path_against_ripped_outputs() {
        let mut ripped = unit("ripped");
        ripped.ripped_file = "/rips/s01e02.mkv".to_string();
        let units = vec![unit("encoded"), ripped];

        let mut item = item("encoding");
        item.source_file = "/rips/s01e02.mkv".to_string();

        assert_eq!(resolve_active_unit(&item, &units), Some(1));
    }

    #[test]
    fn stage_match_when_no_paths_line_up() {
        let units = vec![unit("encoded"), unit("encoding"), unit("ripped")];
        assert_eq!(resolve_active_unit(&item("encoding"), &units), Some(1));
    }

    #[test]
    fn adjacency_falls_back_to_preceding_rest_stage() {
        // Nothing is "ripping", so the episode still waiting in planned is next.
        let units = vec![unit("ripped"), unit("planned")];
        assert_eq!(resolve_active_unit(&item("ripping"), &units), Some(1));

        let units = vec![unit("encoded"), unit("ripped")];
        assert_eq!(resolve_active_unit(&item("encoding"), &units), Some(1));
    }

    #[test]
    fn fallback_picks_first_non_final_unit() {
        // No subtitling unit and no encoded unit to match adjacency against.
        let units = vec![unit("final"), unit("ripped"), unit("done")];
        assert_eq!(resolve_active_unit(&item("subtitling"), &units), Some(1));
    }

    #[test]
    fn all_final_returns_last_index() {
        let units = vec![unit("final"), unit("completed"), unit("done")];
        assert_eq!(resolve_active_unit(&item("completed"), &units), Some(2));
    }

    #[test]
    fn empty_units_resolve_to_none() {
        assert_eq!(resolve_active_unit(&item("ripping"), &[]), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut a = unit("planned");
        a.ripped_file = "/pool/s01e04.mkv".to_string();
        let mut b = unit("planned");
        b.ripped_file = "/rips/s01e04.mkv".to_string();
        let units = vec![a, b];

        let mut item = item("ripping");
        item.ripped_file = "s01e04.mkv".to_string();

        let first = resolve_active_unit(&item, &units);
        for _ in 0..10 {
            assert_eq!(resolve_active_unit(&item, &units), first);
        }
    }
}
