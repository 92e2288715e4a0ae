use assert_cmd::cargo::{self};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

const SCHEMA: &str = r#"{
    "traces": {"scatter": {"attributes": {
        "x": {"valType": "data_array"},
        "opacity": {"valType": "number", "min": 0, "max": 1, "dflt": 1}
    }}},
    "layout": {"layoutAttributes": {
        "title": {"valType": "string"},
        "width": {"valType": "number", "min": 10, "dflt": 700},
        "annotations": {"role": "object", "items": {"annotation": {
            "text": {"valType": "string"},
            "x": {"valType": "number", "dflt": 0.5}
        }}}
    }}
}"#;

fn plotattrs() -> assert_cmd::Command {
    let mut cmd = cargo::cargo_bin_cmd!("plotattrs");
    cmd.env_remove("PLOTATTRS_LOG").args(["--schema", SCHEMA]);
    cmd
}

#[test]
fn prints_help() {
    let mut cmd = cargo::cargo_bin_cmd!("plotattrs");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("plotattrs").and(contains("locate")));
}

#[test]
fn locates_container_items() {
    plotattrs()
        .args(["--no-pretty", "locate", "annotations[2].text"])
        .assert()
        .success()
        .stdout(contains(r#"{"array":"annotations","index":2,"property":"text"}"#));
}

#[test]
fn locate_reports_false_outside_containers() {
    plotattrs()
        .args(["locate", "title"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn resolve_replaces_invalid_values_with_defaults() {
    plotattrs()
        .args([
            "--no-pretty",
            "resolve",
            "--figure",
            r#"{"data": [{"type": "scatter", "opacity": 3}], "layout": {"width": 5}}"#,
        ])
        .assert()
        .success()
        .stdout(contains(r#""width":700"#).and(contains(r#""opacity":1"#)));
}

#[test]
fn toml_figure_files_are_accepted() {
    let name = format!("plotattrs-figure-{}.toml", std::process::id());
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, "[layout]\nwidth = 5\ntitle = \"t\"\n").unwrap();
    plotattrs()
        .args(["--no-pretty", "-o", "-", "resolve", "--figure"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("width = 700").or(contains(r#""width":700"#)));
    let _ = std::fs::remove_file(path);
}

#[test]
fn edit_inserts_items_and_reports_redraws() {
    plotattrs()
        .args([
            "--no-pretty",
            "edit",
            "--figure",
            r#"{"layout": {"annotations": [{"text": "a"}]}}"#,
            "--updates",
            r#"{"annotations[1]": {"text": "b"}, "title": "plot"}"#,
        ])
        .assert()
        .success()
        .stdout(contains(r#"[{"text":"a"},{"text":"b"}]"#).and(contains(r#""title":"plot""#)))
        .stderr(contains("annotations").and(contains("attributes: title")));
}

#[test]
fn template_keeps_style_and_drops_data() {
    plotattrs()
        .args([
            "--no-pretty",
            "template",
            "--figure",
            r#"{"data": [{"type": "scatter", "x": [1, 2], "opacity": 0.5}],
                "layout": {"annotations": [{"name": "note", "text": "hi"}]}}"#,
        ])
        .assert()
        .success()
        .stdout(
            contains(r#""scatter":[{"opacity":0.5}]"#)
                .and(contains(r#""name":"note""#))
                .and(contains(r#""x":[1,2]"#).not()),
        );
}

#[test]
fn validate_lists_template_issues() {
    plotattrs()
        .args([
            "--no-pretty",
            "validate",
            "--figure",
            r#"{"data": [{"type": "scatter"}], "layout": {}}"#,
            "--template",
            r#"{"layout": {"width": 500}}"#,
        ])
        .assert()
        .success()
        .stdout(contains(r#""code":"noData""#));
}

#[test]
fn missing_schema_is_reported() {
    let mut cmd = cargo::cargo_bin_cmd!("plotattrs");
    cmd.args(["locate", "annotations[0]"])
        .assert()
        .failure()
        .stderr(contains("--schema"));
}

#[test]
fn two_stdin_inputs_are_rejected() {
    plotattrs()
        .args(["edit", "--figure", "-", "--updates", "-"])
        .assert()
        .failure()
        .stderr(contains("only one input can be read from stdin"));
}
