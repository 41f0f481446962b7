use stocktake::core::error::StocktakeError;
use stocktake::subsystems::items;
use tempfile::tempdir;

#[test]
fn create_and_list_round_trip() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    let bolt = items::create_item(root, "ada", "M4 hex bolts", 200, Some("M4-HEX"))
        .expect("create bolt");
    let washer = items::create_item(root, "ada", "Washers", 50, None).expect("create washer");
    assert_eq!(bolt.quantity, 200);
    assert_eq!(bolt.code.as_deref(), Some("M4-HEX"));
    assert!(washer.code.is_none());

    let all = items::list_items(root).expect("list");
    assert_eq!(all.len(), 2);
    // Name-ordered, case-insensitive.
    assert_eq!(all[0].name, "M4 hex bolts");
    assert_eq!(all[1].name, "Washers");

    let fetched = items::get_item(root, &bolt.id).expect("get").expect("present");
    assert_eq!(fetched, bolt);
    assert!(items::get_item(root, "no-such-id").expect("get").is_none());
}

#[test]
fn list_is_empty_without_a_database() {
    let tmp = tempdir().expect("tempdir");
    assert!(items::list_items(tmp.path()).expect("list").is_empty());
}

#[test]
fn empty_name_is_rejected_and_nothing_persists() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    match items::create_item(root, "ada", "   ", 5, None) {
        Err(StocktakeError::ValidationError(msg)) => assert!(msg.contains("name")),
        other => panic!("expected ValidationError, got {:?}", other),
    }
    assert!(items::list_items(root).expect("list").is_empty());
}

#[test]
fn negative_quantity_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    match items::create_item(root, "ada", "Widget", -1, None) {
        Err(StocktakeError::ValidationError(msg)) => assert!(msg.contains("negative")),
        other => panic!("expected ValidationError, got {:?}", other),
    }
}

#[test]
fn update_replaces_fields_and_rejects_missing_items() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    let mut item = items::create_item(root, "ada", "Widget", 3, None).expect("create");
    item.name = "Widget v2".to_string();
    item.quantity = 7;
    item.code = Some("W-2".to_string());
    let updated = items::update_item(root, "ada", &item).expect("update");
    assert_eq!(updated.name, "Widget v2");
    assert_eq!(updated.quantity, 7);
    assert_eq!(updated.code.as_deref(), Some("W-2"));

    let mut ghost = updated.clone();
    ghost.id = "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string();
    match items::update_item(root, "ada", &ghost) {
        Err(StocktakeError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn codes_are_unique_among_live_items() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    let first = items::create_item(root, "ada", "Bolts", 10, Some("SKU-1")).expect("create");
    match items::create_item(root, "ada", "Nuts", 10, Some("SKU-1")) {
        Err(StocktakeError::ValidationError(msg)) => assert!(msg.contains("SKU-1")),
        other => panic!("expected duplicate code rejection, got {:?}", other),
    }

    // An item keeps its own code across updates.
    let same = items::update_item(root, "ada", &first).expect("self update");
    assert_eq!(same.code.as_deref(), Some("SKU-1"));

    // Deleting frees the code for reuse.
    items::delete_item(root, "ada", &first.id).expect("delete");
    items::create_item(root, "ada", "Nuts", 10, Some("SKU-1")).expect("code reusable");

    let found = items::find_by_code(root, "SKU-1").expect("find").expect("present");
    assert_eq!(found.name, "Nuts");
}

#[test]
fn malformed_codes_are_rejected() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    match items::create_item(root, "ada", "Bolts", 1, Some("has spaces")) {
        Err(StocktakeError::ValidationError(_)) => {}
        other => panic!("expected ValidationError, got {:?}", other),
    }
    // Blank code collapses to no code.
    let item = items::create_item(root, "ada", "Bolts", 1, Some("  ")).expect("create");
    assert!(item.code.is_none());
}

#[test]
fn delete_is_permanent_and_strict() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    let item = items::create_item(root, "ada", "Widget", 1, None).expect("create");
    items::delete_item(root, "ada", &item.id).expect("delete");
    assert!(items::get_item(root, &item.id).expect("get").is_none());

    match items::delete_item(root, "ada", &item.id) {
        Err(StocktakeError::NotFound(_)) => {}
        other => panic!("expected NotFound on double delete, got {:?}", other),
    }
}

#[test]
fn set_quantity_touches_updated_at_only() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    let item = items::create_item(root, "ada", "Widget", 5, Some("W-1")).expect("create");
    let bumped = items::set_quantity(root, "ada", &item.id, 6).expect("set quantity");
    assert_eq!(bumped.quantity, 6);
    assert_eq!(bumped.name, item.name);
    assert_eq!(bumped.code, item.code);
    assert_eq!(bumped.created_at, item.created_at);
}

#[test]
fn rebuild_replays_the_event_log() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    items::initialize_inventory_db(root).expect("init");

    let a = items::create_item(root, "ada", "Alpha", 3, Some("A-1")).expect("create a");
    let b = items::create_item(root, "ada", "Beta", 9, None).expect("create b");
    items::set_quantity(root, "ada", &a.id, 0).expect("deplete a");
    items::delete_item(root, "ada", &b.id).expect("delete b");

    let before = items::list_items(root).expect("list before");
    let replayed = items::rebuild_from_events(root, "ada").expect("rebuild");
    assert_eq!(replayed, 1);

    let after = items::list_items(root).expect("list after");
    assert_eq!(after, before);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, a.id);
    assert_eq!(after[0].quantity, 0);
}

#[test]
fn rebuild_without_a_log_is_an_error() {
    let tmp = tempdir().expect("tempdir");
    match items::rebuild_from_events(tmp.path(), "ada") {
        Err(StocktakeError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}
