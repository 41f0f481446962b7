use std::fs;
use stocktake::subsystems::accounts;
use stocktake::subsystems::notify::{
    self, JournalChannel, NotificationGate, NotifyChannel, NotifyPrefs,
};
use tempfile::tempdir;

#[test]
fn prefs_default_to_fully_opted_out() {
    let prefs = NotifyPrefs::default();
    assert!(!prefs.should_notify());
    assert!(prefs.should_prompt());
}

#[test]
fn ack_suppresses_the_prompt_without_enabling_alerts() {
    let prefs = NotifyPrefs {
        receive_notifications: false,
        prompt_suppressed: true,
    };
    assert!(!prefs.should_notify());
    assert!(!prefs.should_prompt());

    // Opting in makes the prompt moot either way.
    let enabled = NotifyPrefs {
        receive_notifications: true,
        prompt_suppressed: false,
    };
    assert!(enabled.should_notify());
    assert!(!enabled.should_prompt());
}

#[test]
fn prefs_persist_per_user() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");
    accounts::register(root, "ada", "pw").expect("register");
    accounts::register(root, "bob", "pw").expect("register");

    // A fresh account starts opted out.
    let initial = notify::load_prefs(root, "ada").expect("load");
    assert!(!initial.should_notify());
    assert!(initial.should_prompt());

    let enabled = NotifyPrefs {
        receive_notifications: true,
        prompt_suppressed: false,
    };
    notify::save_prefs(root, "ada", &enabled).expect("save");

    let reloaded = notify::load_prefs(root, "ada").expect("reload");
    assert_eq!(reloaded, enabled);

    // Neighbours are untouched.
    assert!(!notify::load_prefs(root, "bob").expect("load bob").should_notify());
}

#[test]
fn prefs_for_unknown_user_read_as_opted_out() {
    let tmp = tempdir().expect("tempdir");
    let prefs = notify::load_prefs(tmp.path(), "nobody").expect("load");
    assert_eq!(prefs, NotifyPrefs::default());
}

#[test]
fn journal_channel_appends_records() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();

    let channel = JournalChannel::new(root);
    channel.send("ops", "first").expect("send");
    channel.send("ops", "second").expect("send");

    let raw = fs::read_to_string(notify::journal_path(root)).expect("journal");
    assert_eq!(raw.lines().count(), 2);

    let recent = notify::recent_journal(root, 10).expect("recent");
    assert_eq!(recent, vec!["first".to_string(), "second".to_string()]);

    // Capped reads keep the newest entries.
    let capped = notify::recent_journal(root, 1).expect("capped");
    assert_eq!(capped, vec!["second".to_string()]);
}

#[test]
fn recent_journal_is_empty_without_a_log() {
    let tmp = tempdir().expect("tempdir");
    assert!(notify::recent_journal(tmp.path(), 5).expect("recent").is_empty());
}

#[test]
fn gate_formats_the_depletion_message() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();

    let channel = JournalChannel::new(root);
    let prefs = NotifyPrefs {
        receive_notifications: true,
        prompt_suppressed: false,
    };
    let gate = NotificationGate::new(&channel, "inventory-alerts", prefs);
    assert!(gate.should_notify());
    gate.notify("M4 hex bolts").expect("notify");

    let recent = notify::recent_journal(root, 1).expect("recent");
    assert_eq!(
        recent[0],
        "Inventory alert: \"M4 hex bolts\" is out of stock."
    );
}

#[test]
fn gate_respects_opt_out() {
    let tmp = tempdir().expect("tempdir");
    let channel = JournalChannel::new(tmp.path());
    let gate = NotificationGate::new(&channel, "ops", NotifyPrefs::default());
    assert!(!gate.should_notify());
}
