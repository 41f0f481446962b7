use std::fs;
use stocktake::core::error::StocktakeError;
use stocktake::subsystems::accounts;
use stocktake::subsystems::authz::Role;
use tempfile::tempdir;

#[test]
fn register_and_authenticate_round_trip() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");

    let user = accounts::register(root, "ada", "correct horse").expect("register");
    assert_eq!(user.username, "ada");
    assert_eq!(user.role, "User");

    let back = accounts::authenticate(root, "ada", "correct horse").expect("auth");
    assert_eq!(back.username, "ada");
    assert_eq!(back.role(), Role::User);
}

#[test]
fn duplicate_usernames_are_rejected() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");

    accounts::register(root, "ada", "pw-one").expect("first register");
    match accounts::register(root, "ada", "pw-two") {
        Err(StocktakeError::DuplicateUser) => {}
        other => panic!("expected DuplicateUser, got {:?}", other),
    }
    // Case-folded collisions count too.
    match accounts::register(root, " ADA ", "pw-three") {
        Err(StocktakeError::DuplicateUser) => {}
        other => panic!("expected DuplicateUser, got {:?}", other),
    }

    // The original credential still works.
    accounts::authenticate(root, "ada", "pw-one").expect("original still valid");
}

#[test]
fn bad_credentials_are_indistinguishable() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");
    accounts::register(root, "ada", "right").expect("register");

    let wrong_password = accounts::authenticate(root, "ada", "wrong").unwrap_err();
    let unknown_user = accounts::authenticate(root, "nobody", "right").unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert!(matches!(wrong_password, StocktakeError::InvalidCredentials));
}

#[test]
fn usernames_are_case_normalized() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");

    let user = accounts::register(root, "  Ada ", "pw").expect("register");
    assert_eq!(user.username, "ada");
    accounts::authenticate(root, "ADA", "pw").expect("case-folded login");
    let found = accounts::get_user(root, "aDa").expect("get").expect("present");
    assert_eq!(found.username, "ada");
}

#[test]
fn empty_username_or_password_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");

    assert!(matches!(
        accounts::register(root, "   ", "pw"),
        Err(StocktakeError::ValidationError(_))
    ));
    assert!(matches!(
        accounts::register(root, "ada", ""),
        Err(StocktakeError::ValidationError(_))
    ));
}

#[test]
fn explicit_roles_are_stored() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");

    let admin =
        accounts::register_with_role(root, "boss", "pw", Role::Admin).expect("register admin");
    assert_eq!(admin.role, "Admin");
    assert_eq!(admin.role(), Role::Admin);

    let auditor = accounts::register_with_role(root, "auditor", "pw", Role::SuperUser)
        .expect("register superuser");
    assert_eq!(auditor.role(), Role::SuperUser);
}

#[test]
fn passwords_are_stored_as_argon2_hashes_only() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");

    let plaintext = "hunter2-but-longer";
    accounts::register(root, "ada", plaintext).expect("register");

    let user = accounts::get_user(root, "ada").expect("get").expect("present");
    assert!(user.password_hash.starts_with("$argon2"));
    assert_ne!(user.password_hash, plaintext);

    let raw = fs::read(accounts::accounts_db_path(root)).expect("read db file");
    let needle = plaintext.as_bytes();
    let leaked = raw.windows(needle.len()).any(|w| w == needle);
    assert!(!leaked, "plaintext password must never reach disk");
}

#[test]
fn serialized_users_omit_the_hash() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    accounts::initialize_accounts_db(root).expect("init");

    let user = accounts::register(root, "ada", "pw").expect("register");
    let json = serde_json::to_value(&user).expect("serialize");
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["username"], "ada");
}

#[test]
fn missing_database_reads_as_no_user() {
    let tmp = tempdir().expect("tempdir");
    assert!(accounts::get_user(tmp.path(), "ada").expect("get").is_none());
}
