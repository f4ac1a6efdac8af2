use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_values-gen")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Temp dir holding copies of the fixture values file and README.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in ["values.yaml", "README.md"] {
        std::fs::copy(fixture_path(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// -- generate --

#[test]
fn generate_writes_every_artifact() {
    let dir = workspace();

    cmd()
        .current_dir(dir.path())
        .args(["generate", "-v", "values.yaml", "-m", "app"])
        .args(["-g", "api/types.go", "-c", "crd.yaml", "-s", "values.schema.json", "-r", "README.md"])
        .assert()
        .success()
        .stderr(predicate::str::contains("write Go structs"))
        .stderr(predicate::str::contains("write CRD resource"))
        .stderr(predicate::str::contains("write JSON schema"))
        .stderr(predicate::str::contains("update README parameters"));

    let go = std::fs::read_to_string(dir.path().join("api/types.go")).unwrap();
    assert!(go.contains("package app\n"));
    assert!(go.contains("type Image struct {"));
    assert!(go.contains("// +kubebuilder:validation:Enum=\"Always\";\"IfNotPresent\"\ntype PullPolicy string\n"));
    assert!(go.contains("\tResources *k8sRuntime.RawExtension `json:\"resources,omitempty\"`\n"));

    let crd = std::fs::read_to_string(dir.path().join("crd.yaml")).unwrap();
    assert!(crd.contains("name: configs.values.helm.io"));

    let schema: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("values.schema.json")).unwrap()).unwrap();
    assert_eq!(schema["title"], "Chart Values");
    // annotation defaults win over the sample value
    assert_eq!(schema["properties"]["replicaCount"]["default"], 1);
    assert_eq!(
        schema["properties"]["image"]["properties"]["pullPolicy"]["enum"],
        serde_json::json!(["Always", "IfNotPresent"])
    );
    assert_eq!(schema["properties"]["resources"]["x-kubernetes-preserve-unknown-fields"], true);

    let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
    assert!(readme.starts_with("# app\n\nAn example chart.\n\n## Parameters\n\n### Common\n"), "{readme}");
    assert!(readme.contains("### Backup\n"), "{readme}");
    assert!(!readme.contains("_generated_"), "{readme}");
    assert!(readme.contains("`image.tag`"), "{readme}");
    assert!(readme.contains("`latest`"), "{readme}");
    assert!(readme.contains("`0 2 * * *`"), "{readme}");
    assert!(readme.ends_with("\n## License\n\nApache-2.0\n"), "{readme}");
}

#[test]
fn generate_is_idempotent_on_the_readme() {
    let dir = workspace();
    let run = || {
        cmd()
            .current_dir(dir.path())
            .args(["generate", "-r", "README.md", "-q"])
            .assert()
            .success()
            .stderr(predicate::str::is_empty());
        std::fs::read_to_string(dir.path().join("README.md")).unwrap()
    };
    let once = run();
    assert_eq!(run(), once);
}

#[test]
fn generate_requires_an_output() {
    let dir = workspace();

    cmd()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no output specified"));
}

#[test]
fn undefined_types_abort_the_run() {
    let dir = TempDir::new().unwrap();
    let values = write(dir.path(), "values.yaml", "## @param {Foo} a\n## @param {[]Foo} b\n");

    cmd()
        .args(["generate", "-v", values.to_str().unwrap(), "-g"])
        .arg(dir.path().join("types.go"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("undefined types: Foo"));

    assert!(!dir.path().join("types.go").exists());
}

#[test]
fn invalid_values_write_nothing() {
    let dir = workspace();
    let mut values = std::fs::read_to_string(dir.path().join("values.yaml")).unwrap();
    values.push_str("extra: true\n");
    write(dir.path(), "values.yaml", &values);

    cmd()
        .current_dir(dir.path())
        .args(["generate", "-g", "types.go", "-s", "values.schema.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parameter 'extra' is not defined in schema"));

    assert!(!dir.path().join("types.go").exists());
    assert!(!dir.path().join("values.schema.json").exists());
}

#[test]
fn missing_parameters_section_is_reported() {
    let dir = workspace();
    write(dir.path(), "README.md", "# app\n\n## Usage\n");

    cmd()
        .current_dir(dir.path())
        .args(["generate", "-r", "README.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parameters section not found"));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("README.md")).unwrap(),
        "# app\n\n## Usage\n"
    );
}

#[test]
fn orphan_fields_are_warnings() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "values.yaml", "## @field {int} stray\n## @param {int} n=1\n");

    cmd()
        .current_dir(dir.path())
        .args(["generate", "-g", "types.go"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning:"))
        .stderr(predicate::str::contains("values.yaml:1"));
}

// -- check --

#[test]
fn check_accepts_valid_files() {
    cmd()
        .args(["check", &fixture_path("values.yaml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn check_reports_each_file_of_a_glob() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.yaml", "## @param {int} n\nn: 1\n");
    write(dir.path(), "bad.yaml", "## @param {int} n\nm: 1\n");
    let pattern = format!("{}/*.yaml", dir.path().display());

    cmd()
        .args(["check", &pattern])
        .assert()
        .failure()
        .stdout(predicate::str::contains("good.yaml"))
        .stdout(predicate::str::contains("parameter 'm' is not defined in schema"));
}

#[test]
fn check_rejects_globs_matching_nothing() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.yaml", dir.path().display());

    cmd()
        .args(["check", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("matched no files"));
}
