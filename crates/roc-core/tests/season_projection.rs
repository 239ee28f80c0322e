use roc_core::{project, resolve_active_unit, Item, Stage};

fn season_mid_encode() -> Item {
    let raw = r#"{
        "id": 7,
        "title": "Example Season 1",
        "status": "encoding",
        "progress": {"stage": "encoding", "message": "pass 1", "percent": 42.5},
        "sourceFile": "/rips/example/s01e03.mkv",
        "episodes": [
            {"season": 1, "episode": 1, "stage": "final",
             "rippedFile": "/rips/example/s01e01.mkv",
             "encodedFile": "/encoded/example/s01e01.mkv"},
            {"season": 1, "episode": 2, "stage": "encoded",
             "rippedFile": "/rips/example/s01e02.mkv",
             "encodedFile": "/encoded/example/s01e02.mkv"},
            {"season": 1, "episode": 3, "stage": "ripped",
             "rippedFile": "/rips/example/s01e03.mkv"},
            {"season": 1, "episode": 4, "stage": "planned"}
        ]
    }"#;
    serde_json::from_str(raw).expect("season payload deserializes")
}

#[test]
fn season_snapshot_projects_and_resolves_consistently() {
    let item = season_mid_encode();
    assert_eq!(item.active_stage(), Stage::Encoding);

    let view = project(&item);
    assert!(view.cell(Stage::Planned).unwrap().complete);
    assert_eq!(view.cell(Stage::Ripped).unwrap().count, 3);
    assert!(!view.cell(Stage::Ripped).unwrap().complete);
    assert_eq!(view.cell(Stage::Encoded).unwrap().count, 2);
    assert!(view.cell(Stage::Encoded).unwrap().partial());

    let current = view.current().expect("current stage");
    assert_eq!(current.stage, Stage::Encoding);
    assert_eq!(current.count, 2);

    // The input hint points at episode 3's ripped output, so the resolver
    // lands on it via the path-match cascade.
    let active = resolve_active_unit(&item, &item.episodes).expect("active unit");
    assert_eq!(active, 2);
    assert_eq!(item.episodes[active].label(), "S01E03");
}

#[test]
fn totals_ordering_invariant_holds_for_the_snapshot() {
    let item = season_mid_encode();
    let totals = item.totals();
    assert!(totals.is_ordered());
    assert_eq!(totals.planned, 4);
    assert_eq!(totals.ripped, 3);
    assert_eq!(totals.encoded, 2);
    assert_eq!(totals.finished, 1);
}
