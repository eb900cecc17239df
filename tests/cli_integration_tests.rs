mod utils;

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use ticketsmith::constants::{exit_codes, TEMPLATE_ROOT_ENV};
use utils::{add_template, write_file};

fn ticketsmith(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ticketsmith"))
        .env_remove(TEMPLATE_ROOT_ENV)
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn generate_prints_rendered_text() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "Bug: {{ title }}")]);
    let ctx = write_file(dir.path(), "ctx/input.json", r#"{"title": "crash on start"}"#);

    let output = ticketsmith(
        dir.path(),
        &["generate", "jira", "bug", "rust", "--context", ctx.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS), "{}", stderr(&output));
    assert_eq!(stdout(&output), "Bug: crash on start\n");
}

#[test]
fn generate_json_reports_fallback_path() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "component", "custom", &[("Summary", "{{ name }}")]);
    let inputs = tempfile::tempdir().unwrap();
    let ctx = write_file(inputs.path(), "input.yaml", "name: Button\n");

    let output = ticketsmith(
        dir.path(),
        &["generate", "jira", "component", "react", "-c", ctx.to_str().unwrap(), "--format", "json"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS), "{}", stderr(&output));

    let json: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["renderedText"], "Button");
    assert_eq!(json["templateId"], "jira/component/custom@1");
    assert_eq!(
        json["fallbackPathTaken"],
        serde_json::json!(["exact-miss", "platform+docType-default-hit"])
    );
}

#[test]
fn ignored_yaml_under_the_root_is_not_a_template() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "ticketsmith.yaml", "schemaVersion: v1\nignore: [\"ctx/**\"]\n");
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "Bug: {{ title }}")]);
    let ctx = write_file(dir.path(), "ctx/input.yaml", "title: crash on start\n");

    let output = ticketsmith(
        dir.path(),
        &["generate", "jira", "bug", "rust", "--context", ctx.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS), "{}", stderr(&output));
    assert_eq!(stdout(&output), "Bug: crash on start\n");
}

#[test]
fn unignored_yaml_under_the_root_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "x")]);
    write_file(dir.path(), "ctx/input.yaml", "title: crash on start\n");

    let output = ticketsmith(dir.path(), &["generate", "jira", "bug", "rust"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(stderr(&output).contains("input.yaml"), "{}", stderr(&output));
}

#[test]
fn generate_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "to a file")]);
    let target = dir.path().join("out/bug.md");

    let output = ticketsmith(
        dir.path(),
        &["generate", "jira", "bug", "rust", "--output", target.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS), "{}", stderr(&output));
    assert_eq!(std::fs::read_to_string(target).unwrap(), "to a file");
}

#[test]
fn strict_render_failure_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "{{ missing.path }}")]);

    let output = ticketsmith(dir.path(), &["generate", "jira", "bug", "rust", "--strict"]);
    assert_eq!(output.status.code(), Some(exit_codes::RENDER_FAILURE));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("missing.path"));
}

#[test]
fn lenient_warnings_go_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "[{{ missing }}]")]);

    let output = ticketsmith(dir.path(), &["generate", "jira", "bug", "rust"]);
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS));
    assert_eq!(stdout(&output), "[]\n");
    assert!(stderr(&output).contains("Unresolved variable 'missing'"));
}

#[test]
fn usage_errors_exit_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = ticketsmith(dir.path(), &["generate", "jira"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));

    let output = ticketsmith(dir.path(), &["generate", "a", "b", "c", "--format", "xml"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(stderr(&output).contains("invalid value 'xml'"), "{}", stderr(&output));
}

#[test]
fn unreadable_context_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "x")]);
    let ctx = write_file(dir.path(), "ctx/list.json", "[1, 2]");

    let output = ticketsmith(
        dir.path(),
        &["generate", "jira", "bug", "rust", "--context", ctx.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(stderr(&output).contains("Invalid render context"));
}

#[test]
fn list_shows_templates_and_fragments() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "x")]);
    add_template(dir.path(), "any", "epic", "go", &[("Summary", "y")]);
    utils::add_fragment(dir.path(), "jira-base", &[("Footer", "z")], &[]);

    let output = ticketsmith(dir.path(), &["list"]);
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("jira / bug / rust  v1"), "{text}");
    assert!(text.contains("any / epic / go  v1"), "{text}");
    assert!(text.contains("Fragments: jira-base"), "{text}");
}

#[test]
fn root_can_come_from_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "from env")]);

    let output = Command::new(env!("CARGO_BIN_EXE_ticketsmith"))
        .env(TEMPLATE_ROOT_ENV, dir.path())
        .args(["generate", "jira", "bug", "rust"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS), "{}", stderr(&output));
    assert_eq!(stdout(&output), "from env\n");
}

#[test]
fn validate_passes_a_clean_tree() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "{{ title | upper }}")]);

    let output = ticketsmith(dir.path(), &["validate"]);
    assert_eq!(output.status.code(), Some(exit_codes::SUCCESS), "{}", stderr(&output));
}

#[test]
fn validate_reports_every_problem_and_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "{{ title | shout }}")]);
    add_template(dir.path(), "jira", "story", "rust", &[("Summary", "{{#each items}}")]);

    let output = ticketsmith(dir.path(), &["validate", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    let errors = stderr(&output);
    assert!(errors.contains("Unknown filter 'shout'"), "{errors}");
    assert!(errors.contains("Unbalanced block 'each'"), "{errors}");
    assert!(errors.contains("2 problem(s)"), "{errors}");
}
