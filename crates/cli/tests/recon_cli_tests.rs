// End-to-end tests for `roster run` / `roster validate`.
// Run with: cargo test -p roster-cli --test recon_cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn roster() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_roster"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Copy the fixture rosters into `dir` and write `config` next to them.
fn stage(dir: &Path, config: &str) -> PathBuf {
    for csv in ["hr.csv", "insurer.csv", "internal.csv", "carry-add.csv", "carry-offboard.csv"] {
        std::fs::copy(fixture(csv), dir.join(csv)).unwrap();
    }
    let path = dir.join("run.recon.toml");
    std::fs::write(&path, config).unwrap();
    path
}

#[test]
fn run_prints_json_and_summary() {
    let out = roster()
        .args(["run", "--json"])
        .arg(fixture("acme-gmc.recon.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["meta"]["way"], 3);
    assert_eq!(json["meta"]["config_name"], "Acme GMC 2026");
    assert_eq!(json["summary"]["perfect_matches"], 2);
    assert_eq!(json["summary"]["bucket_counts"]["confirmed_offboard"], 1);
    assert_eq!(json["buckets"].as_array().unwrap().len(), 9);
    assert_eq!(json["buckets"][0]["kind"], "perfect_match");
    assert_eq!(json["buckets"][0]["members"][0]["user_id"], "U100");

    let err = stderr(&out);
    assert!(err.contains("3-way recon 'Acme GMC 2026'"), "{err}");
    assert!(err.contains("confirmed_offboard"), "{err}");
}

#[test]
fn fail_on_actions_sets_exit_code() {
    let out = roster()
        .args(["run", "--fail-on-actions"])
        .arg(fixture("acme-gmc.recon.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(62));
    assert!(stderr(&out).contains("members need follow-up"));
}

#[test]
fn output_file_written() {
    let dir = tempfile::tempdir().unwrap();
    let result_path = dir.path().join("result.json");
    let out = roster()
        .arg("run")
        .arg(fixture("acme-two-way.recon.toml"))
        .arg("--output")
        .arg(&result_path)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(out.stdout.is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&result_path).unwrap()).unwrap();
    assert_eq!(json["meta"]["way"], 2);
}

#[test]
fn config_output_path_resolved_next_to_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = std::fs::read_to_string(fixture("acme-gmc.recon.toml")).unwrap();
    let config_path = stage(dir.path(), &format!("{config}\n[output]\njson = \"out.json\"\n"));

    let out = roster().arg("run").arg(&config_path).output().unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(dir.path().join("out.json").exists());
}

#[test]
fn verbose_run_logs_unresolved_slab() {
    let dir = tempfile::tempdir().unwrap();
    let config = std::fs::read_to_string(fixture("acme-gmc.recon.toml")).unwrap();
    let config_path = stage(
        dir.path(),
        &format!(
            "{config}\n[carry_over.offboard]\nfile = \"carry-offboard.csv\"\ncolumns = {{ name = \"Member Name\", employee_id = \"Employee Code\", sum_insured = \"Sum Insured\" }}\n"
        ),
    );

    let out = roster().args(["-v", "run"]).arg(&config_path).output().unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("WARN"), "{err}");
    assert!(err.contains("no slab for sum insured '700000'"), "{err}");
    assert!(err.contains("INFO"), "{err}");
    assert!(err.contains("1 member(s) without a matching slab"), "{err}");
}

#[test]
fn invalid_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = stage(dir.path(), "name = \"broken\"\npolicy_type = \"GMC\"\n");
    let out = roster().arg("validate").arg(&config_path).output().unwrap();
    assert_eq!(out.status.code(), Some(60));
    assert!(stderr(&out).contains("config parse error"));
}

#[test]
fn missing_roster_file_is_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = std::fs::read_to_string(fixture("acme-gmc.recon.toml"))
        .unwrap()
        .replace("file = \"internal.csv\"", "file = \"nope.csv\"");
    let config_path = stage(dir.path(), &config);

    let out = roster().arg("run").arg(&config_path).output().unwrap();
    assert_eq!(out.status.code(), Some(61));
    assert!(stderr(&out).contains("nope.csv"));
}

#[test]
fn missing_column_is_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = std::fs::read_to_string(fixture("acme-gmc.recon.toml"))
        .unwrap()
        .replace("user_id       = \"user_id\"", "user_id       = \"uid\"");
    let config_path = stage(dir.path(), &config);

    let out = roster().arg("run").arg(&config_path).output().unwrap();
    assert_eq!(out.status.code(), Some(61));
    assert!(stderr(&out).contains("roster 'internal': missing column 'uid'"));
}

#[test]
fn validate_reports_profile() {
    let out = roster()
        .arg("validate")
        .arg(fixture("acme-gmc.recon.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let err = stderr(&out);
    assert!(err.contains("valid: recon 'Acme GMC 2026' (GMC)"), "{err}");
    assert!(err.contains("9 matching key(s)"), "{err}");
}
