// Drives the compiled binary against a throwaway database and config.

use assert_cmd::Command;
use std::path::Path;
use tempfile::{tempdir, TempDir};

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
        }
    }

    fn db(&self) -> std::path::PathBuf {
        self.dir.path().join("commutes.db")
    }

    fn cmd(&self, args: &[&str]) -> std::process::Output {
        Command::cargo_bin("commute-pro")
            .unwrap()
            .arg("--db")
            .arg(self.db())
            .arg("--config")
            .arg(self.dir.path().join("config.json"))
            .args(args)
            .env("RUST_LOG", "off")
            .output()
            .unwrap()
    }

    fn ok(&self, args: &[&str]) -> String {
        let out = self.cmd(args);
        assert!(
            out.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).unwrap()
    }

    fn fails(&self, args: &[&str]) -> String {
        let out = self.cmd(args);
        assert_eq!(out.status.code(), Some(1), "{:?} should fail", args);
        String::from_utf8(out.stderr).unwrap()
    }
}

#[test]
fn add_log_and_report() {
    let env = Env::new();

    let out = env.ok(&["commute", "add", "home to work", "--mode", "Bike"]);
    assert!(out.starts_with("Created Home To Work (bike)"), "{out}");

    env.ok(&["log", "home to work", "2:05", "--date", "2024-01-02 08:30"]);
    env.ok(&["log", "Home To Work", "135", "--date", "2024-01-03"]);

    let stats: serde_json::Value =
        serde_json::from_str(&env.ok(&["stats", "home to work", "--json"])).unwrap();
    assert_eq!(stats["count"], 2);
    assert_eq!(stats["best_secs"], 125.0);
    assert_eq!(stats["average_secs"], 130.0);

    let listing = env.ok(&["sessions", "home to work"]);
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("2024-01-03"));
    assert!(lines[2].starts_with('*'));
    assert!(lines[2].contains("02:05"));

    let list = env.ok(&["commute", "list"]);
    assert!(list.contains("Home To Work"));
    assert!(list.contains("best 02:05"));
}

#[test]
fn export_writes_csv_and_json() {
    let env = Env::new();
    env.ok(&["commute", "add", "gym", "--mode", "run"]);
    env.ok(&["log", "gym", "10:00", "--date", "2024-02-01"]);

    let csv = env.ok(&["export", "gym"]);
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("id,commute,date,duration_secs,mode"));
    let row = lines.next().unwrap();
    assert!(row.contains(",Gym,2024-02-01T12:00:00"), "{row}");
    assert!(row.ends_with(",600.0,run"), "{row}");
    assert_eq!(lines.next(), None);

    let out = env.dir.path().join("gym.json");
    env.ok(&["export", "gym", "--format", "json", "--out", out.to_str().unwrap()]);
    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(Path::new(&out)).unwrap()).unwrap();
    assert_eq!(json["commute"]["name"], "Gym");
    assert_eq!(json["sessions"][0]["duration_secs"], 600.0);
}

#[test]
fn deleting_and_clearing() {
    let env = Env::new();
    env.ok(&["commute", "add", "home"]);
    env.ok(&["log", "home", "100", "--date", "2024-01-01"]);
    env.ok(&["log", "home", "110", "--date", "2024-01-02"]);

    let out = env.ok(&["clear", "home"]);
    assert!(out.contains("Removed 2 sessions"));
    assert!(env.ok(&["sessions", "home"]).contains("No sessions"));

    env.ok(&["commute", "delete", "home"]);
    let err = env.fails(&["stats", "home"]);
    assert!(err.contains("No commute named 'home'"), "{err}");
}

#[test]
fn bad_input_is_reported() {
    let env = Env::new();
    let err = env.fails(&["commute", "add", "home", "--mode", "zeppelin"]);
    assert!(err.contains("'zeppelin' is not one of the configured modes"), "{err}");

    env.ok(&["commute", "add", "home"]);
    let err = env.fails(&["log", "home", "soon"]);
    assert!(err.contains("not a duration"), "{err}");

    let err = env.fails(&["log", "home", "999999999999999999:00:00"]);
    assert!(err.contains("not a duration"), "{err}");

    let err = env.fails(&["log", "home", "0"]);
    assert!(err.contains("shorter than 1s"), "{err}");
    assert!(env.ok(&["sessions", "home"]).contains("No sessions"));

    let err = env.fails(&["session", "delete", "not-an-id"]);
    assert!(err.contains("not a session id"), "{err}");
}

#[test]
fn config_init_then_show() {
    let env = Env::new();
    let out = env.ok(&["config", "init"]);
    assert!(out.contains("Wrote default config"));
    assert!(env.dir.path().join("config.json").exists());

    let shown = env.ok(&["config", "show"]);
    let body: String = shown.lines().skip(1).collect::<Vec<_>>().join("\n");
    let cfg: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cfg["default_mode"], "walk");
    assert_eq!(cfg["missing_mode"], "commute");
}
