mod support;

use predicates::str::contains;

use support::TestStore;

#[test]
fn theme_defaults_to_light_and_toggles() {
    let store = TestStore::new();

    store
        .cmd()
        .arg("theme")
        .assert()
        .success()
        .stdout(contains("tasklink theme: light"));

    assert_eq!(store.json(&["theme", "toggle"])["theme"], "dark");
    assert_eq!(store.json(&["theme", "show"])["theme"], "dark");
    assert_eq!(store.json(&["theme", "set", "LIGHT"])["theme"], "light");
}

#[test]
fn theme_does_not_change_link() {
    let store = TestStore::new();
    store.add("Task");
    let before = store.address();

    store.json(&["theme", "set", "dark"]);
    assert_eq!(store.address(), before);
}

#[test]
fn theme_survives_import() {
    let source = TestStore::new();
    source.add("Shared");
    let url = source.json(&["link"])["url"]
        .as_str()
        .expect("url")
        .to_string();

    let target = TestStore::new();
    target.json(&["theme", "set", "dark"]);
    target.json(&["open", &url]);
    assert_eq!(target.json(&["theme"])["theme"], "dark");
}

#[test]
fn unknown_theme_is_user_error() {
    let store = TestStore::new();
    store
        .cmd()
        .args(["theme", "set", "blue"])
        .assert()
        .code(2)
        .stderr(contains("unknown theme 'blue'"));
}
