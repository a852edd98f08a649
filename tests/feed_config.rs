// tests/feed_config.rs
use std::fs;
use std::path::Path;

use quake_watch::feed::config::load_config_from;
use quake_watch::feed::profiles::Profile;
use quake_watch::AlertKind;

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let p = dir.join(name);
    fs::write(&p, body).expect("write config");
    p
}

const TWO_SOURCES: &str = r#"
[[sources]]
id = "eew"
url = "http://localhost/eew.json"
format = "json"
interval_secs = 20
alert = "eew"
profile = { kind = "eew" }

[[sources]]
id = "hypocenter"
url = "http://localhost/hypo.json"
format = "json"
interval_secs = 20
profile = { kind = "fields", fields = [{ field = "depth", path = "Body.Earthquake.Hypocenter.Depth" }] }
"#;

#[test]
fn repo_configs_load() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
    for name in ["sources.toml", "sources.coalesced.toml"] {
        let cfg = load_config_from(&root.join(name)).expect(name);
        assert_eq!(cfg.sources.len(), 5, "{name}");
        let seismic = cfg.source("seismic-intensity").expect("seismic source");
        assert_eq!(seismic.alert, Some(AlertKind::SeismicIntensity));
        match &seismic.profile {
            Profile::Fields(p) => {
                assert!(p.alert_on_report);
                assert!(p.entries.is_some());
            }
            other => panic!("unexpected profile {other:?}"),
        }
    }
}

#[test]
fn source_title_defaults_to_id() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&write(tmp.path(), "a.toml", TWO_SOURCES)).unwrap();
    assert_eq!(cfg.source("eew").unwrap().title(), "eew");
    assert_eq!(cfg.playback.silent_secs, 10);
    assert!(cfg.groups.is_empty());
}

#[test]
fn group_with_unknown_member_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let body = format!(
        "{TWO_SOURCES}\n[[groups]]\nid = \"g\"\ninterval_secs = 20\nmembers = [\"eew\", \"nope\"]\n"
    );
    let err = load_config_from(&write(tmp.path(), "g.toml", &body)).unwrap_err();
    assert!(format!("{err:#}").contains("unknown source `nope`"), "{err:#}");
}

#[test]
fn source_in_two_group_slots_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let body = format!(
        "{TWO_SOURCES}\n[[groups]]\nid = \"g\"\ninterval_secs = 20\nmembers = [\"eew\"]\nslow = [{{ source = \"eew\", refresh_every_secs = 60 }}]\n"
    );
    assert!(load_config_from(&write(tmp.path(), "g.toml", &body)).is_err());
}

#[test]
fn zero_interval_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let body = TWO_SOURCES.replacen("interval_secs = 20", "interval_secs = 0", 1);
    assert!(load_config_from(&write(tmp.path(), "z.toml", &body)).is_err());
}

#[test]
fn grouped_sources_leave_the_independent_list() {
    let tmp = tempfile::tempdir().unwrap();
    let body = format!(
        "{TWO_SOURCES}\n[[groups]]\nid = \"g\"\ninterval_secs = 15\nmembers = [\"eew\"]\nslow = [{{ source = \"hypocenter\", refresh_every_secs = 60 }}]\n"
    );
    let plan = load_config_from(&write(tmp.path(), "g.toml", &body))
        .unwrap()
        .plan()
        .unwrap();
    assert!(plan.independent.is_empty());
    assert_eq!(plan.groups[0].members[0].id, "eew");
    assert_eq!(plan.groups[0].slow[0].source.id, "hypocenter");
}
