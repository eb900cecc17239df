mod utils;

use serde_json::json;
use std::sync::Arc;
use test_log::test;
use ticketsmith::cache::ResolutionCache;
use ticketsmith::config::EngineConfig;
use ticketsmith::context::RenderContext;
use ticketsmith::error::Error;
use ticketsmith::{Engine, ResolutionRequest, Strictness};
use utils::{add_fragment, add_template, template_yaml_with, write_file};

fn context(value: serde_json::Value) -> RenderContext {
    RenderContext::new(value).unwrap()
}

#[test]
fn falls_back_to_platform_default_for_unknown_tech_stack() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "component", "custom", &[("Summary", "{{ name }}")]);

    let engine = Engine::load(dir.path()).unwrap();
    let output = engine
        .generate(
            &ResolutionRequest::new("jira", "component", "react"),
            &context(json!({ "name": "Button" })),
        )
        .unwrap();

    assert_eq!(output.template_id, "jira/component/custom@1");
    assert_eq!(output.fallback_path_taken, vec!["exact-miss", "platform+docType-default-hit"]);
    assert_eq!(output.rendered_text, "Button");
}

#[test]
fn exact_match_always_wins() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "component", "custom", &[("Summary", "platform default")]);
    add_template(dir.path(), "any", "component", "react", &[("Summary", "tech default")]);
    add_template(dir.path(), "jira", "component", "react", &[("Summary", "exact")]);

    let engine = Engine::load(dir.path()).unwrap();
    let output = engine
        .generate(&engine.request("jira", "component", "react"), &RenderContext::default())
        .unwrap();
    assert_eq!(output.rendered_text, "exact");
    assert_eq!(output.fallback_path_taken, vec!["exact-hit"]);
}

#[test]
fn every_tuple_resolves_to_something() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "any", "bug", "go", &[("Summary", "go bug")]);
    let engine = Engine::load(dir.path()).unwrap();

    for (platform, document_type, tech_stack) in
        [("jira", "bug", "go"), ("github", "epic", "rust"), ("", "", "")]
    {
        let output = engine
            .generate(&engine.request(platform, document_type, tech_stack), &RenderContext::default())
            .unwrap();
        assert!(!output.fallback_path_taken.is_empty());
        assert!(output.fallback_path_taken.last().unwrap().ends_with("-hit"));
    }
}

#[test]
fn child_sections_override_base_sections_in_place() {
    let dir = tempfile::tempdir().unwrap();
    add_fragment(dir.path(), "jira-base", &[("A", "x"), ("B", "base only")], &[]);
    write_file(
        dir.path(),
        "jira/story/rust.yaml",
        &template_yaml_with("jira", "story", "rust", &[("A", "y")], json!({}), &["jira-base"]),
    );

    let engine = Engine::load(dir.path()).unwrap();
    let output = engine
        .generate(&engine.request("jira", "story", "rust"), &RenderContext::default())
        .unwrap();

    let sections: Vec<(&str, &str)> =
        output.sections.iter().map(|s| (s.name.as_str(), s.text.as_str())).collect();
    assert_eq!(sections, vec![("A", "y"), ("B", "base only")]);
    assert_eq!(output.rendered_text, "y\n\nbase only");
}

#[test]
fn cyclic_inheritance_fails_only_the_affected_template() {
    let dir = tempfile::tempdir().unwrap();
    add_fragment(dir.path(), "a", &[("A", "a")], &["b"]);
    add_fragment(dir.path(), "b", &[("B", "b")], &["a"]);
    write_file(
        dir.path(),
        "jira/bug/rust.yaml",
        &template_yaml_with("jira", "bug", "rust", &[("Summary", "x")], json!({}), &["a"]),
    );
    add_template(dir.path(), "jira", "task", "rust", &[("Summary", "still fine")]);

    let engine = Engine::load(dir.path()).unwrap();
    assert_eq!(engine.store().broken().len(), 1);

    let err = engine
        .generate(&engine.request("jira", "bug", "rust"), &RenderContext::default())
        .unwrap_err();
    assert!(matches!(err.error, Error::CyclicInheritanceError { .. }), "{err}");
    assert_eq!(err.template_id, "jira/bug/rust@1");
    assert!(err.degraded.is_none());

    let output = engine
        .generate(&engine.request("jira", "task", "rust"), &RenderContext::default())
        .unwrap();
    assert_eq!(output.rendered_text, "still fine");
}

#[test]
fn satisfied_context_leaves_no_template_tokens() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "jira/component/react.yaml",
        &template_yaml_with(
            "jira",
            "component",
            "react",
            &[
                ("Summary", "{{ component.name | pascal_case }} component"),
                ("Props", "{{#each props}}- {{ name }}: {{ type }}{{#if @last}}{{else}}\n{{/if}}{{/each}}"),
                ("Owner", "{{#if owner}}Owned by {{ owner | upper }}{{#else}}Unowned{{/if}}"),
            ],
            json!({
                "component.name": { "required": true },
                "props": { "required": true },
                "owner": { "required": false },
            }),
            &[],
        ),
    );

    let engine = Engine::load(dir.path()).unwrap();
    let request = engine.request("jira", "component", "react").with_strictness(Strictness::Strict);
    let output = engine
        .generate(
            &request,
            &context(json!({
                "component": { "name": "date picker" },
                "props": [{ "name": "value", "type": "Date" }, { "name": "onChange", "type": "fn" }],
                "owner": "ui-team",
            })),
        )
        .unwrap();

    assert!(!output.rendered_text.contains("{{"));
    assert_eq!(
        output.rendered_text,
        "DatePicker component\n\n- value: Date\n- onChange: fn\n\nOwned by UI-TEAM"
    );
    assert!(output.warnings.is_empty());
}

#[test]
fn strict_mode_reports_the_unresolved_path() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "{{missing.path}}")]);

    let engine = Engine::load(dir.path()).unwrap();
    let request = engine.request("jira", "bug", "rust").with_strictness(Strictness::Strict);
    let err = engine.generate(&request, &RenderContext::default()).unwrap_err();
    match err.error {
        Error::UnresolvedVariableError { path } => assert_eq!(path, "missing.path"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(engine.cache().is_empty());
}

#[test]
fn lenient_mode_renders_empty_and_warns() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "[{{missing.path}}]")]);

    let engine = Engine::load(dir.path()).unwrap();
    let output = engine
        .generate(&engine.request("jira", "bug", "rust"), &RenderContext::default())
        .unwrap();
    assert_eq!(output.rendered_text, "[]");
    assert_eq!(output.warnings.len(), 1);
    assert!(output.warnings[0].contains("missing.path"));
}

#[test]
fn cached_output_matches_first_render() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "component", "custom", &[("Summary", "{{ title | upper }}")]);

    let engine = Engine::load(dir.path()).unwrap();
    let request = engine.request("jira", "component", "react");
    let ctx = context(json!({ "title": "cache me" }));

    let first = engine.generate(&request, &ctx).unwrap();
    assert_eq!(engine.cache().len(), 1);
    let second = engine.generate(&request, &ctx).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.fallback_path_taken, second.fallback_path_taken);
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn concurrent_generation_agrees_and_caches_once() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "{{ title | upper }} for {{ owner }}")]);

    let engine = Engine::load(dir.path()).unwrap();
    let request = engine.request("jira", "bug", "rust");
    let ctx = context(json!({ "title": "crash", "owner": "ann" }));

    let outputs: Vec<_> = std::thread::scope(|scope| {
        let (engine, request, ctx) = (&engine, &request, &ctx);
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    (0..25).map(|_| engine.generate(request, ctx).unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();
        workers.into_iter().flat_map(|worker| worker.join().unwrap()).collect()
    });

    assert_eq!(outputs.len(), 200);
    assert!(outputs.iter().all(|output| *output == outputs[0]));
    assert_eq!(outputs[0].rendered_text, "CRASH for ann");
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn concurrent_generation_with_distinct_contexts_keeps_one_entry_each() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "#{{ n }}")]);

    let engine = Engine::load(dir.path()).unwrap();
    let request = engine.request("jira", "bug", "rust");

    std::thread::scope(|scope| {
        for n in 0..6 {
            let (engine, request) = (&engine, &request);
            scope.spawn(move || {
                let ctx = context(json!({ "n": n }));
                for _ in 0..20 {
                    assert_eq!(engine.generate(request, &ctx).unwrap().rendered_text, format!("#{n}"));
                }
            });
        }
    });

    assert_eq!(engine.cache().len(), 6);
}

#[test]
fn reload_during_concurrent_generation_serves_whole_stores() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "v1")]);

    let engine = Engine::load(dir.path()).unwrap();
    let request = engine.request("jira", "bug", "rust");
    let ctx = RenderContext::default();

    std::thread::scope(|scope| {
        let (engine, request, ctx) = (&engine, &request, &ctx);
        let readers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    (0..50)
                        .map(|_| engine.generate(request, ctx).unwrap().rendered_text)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for version in ["v2", "v3"] {
            add_template(dir.path(), "jira", "bug", "rust", &[("Summary", version)]);
            engine.reload().unwrap();
        }

        for reader in readers {
            for text in reader.join().unwrap() {
                assert!(["v1", "v2", "v3"].contains(&text.as_str()), "{text}");
            }
        }
    });

    assert_eq!(engine.generate(&request, &ctx).unwrap().rendered_text, "v3");
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn reload_picks_up_changes_and_clears_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "before")]);

    let engine = Engine::load(dir.path()).unwrap();
    let request = engine.request("jira", "bug", "rust");
    assert_eq!(engine.generate(&request, &RenderContext::default()).unwrap().rendered_text, "before");
    assert_eq!(engine.cache().len(), 1);

    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "after")]);
    engine.reload().unwrap();
    assert!(engine.cache().is_empty());
    assert_eq!(engine.generate(&request, &RenderContext::default()).unwrap().rendered_text, "after");
}

#[test]
fn failed_reload_keeps_the_current_store() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "stable")]);
    let engine = Engine::load(dir.path()).unwrap();

    write_file(dir.path(), "jira/broken.yaml", "platform: [\n");
    assert!(matches!(engine.reload(), Err(Error::ParseError { .. })));

    let output = engine
        .generate(&engine.request("jira", "bug", "rust"), &RenderContext::default())
        .unwrap();
    assert_eq!(output.rendered_text, "stable");
}

#[test]
fn reload_if_changed_notices_new_files() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "bug")]);
    let engine = Engine::load(dir.path()).unwrap();
    assert!(!engine.reload_if_changed().unwrap());

    add_template(dir.path(), "jira", "story", "rust", &[("Summary", "story")]);
    assert!(engine.reload_if_changed().unwrap());
    let output = engine
        .generate(&engine.request("jira", "story", "rust"), &RenderContext::default())
        .unwrap();
    assert_eq!(output.fallback_path_taken, vec!["exact-hit"]);
}

#[test]
fn degraded_fallback_is_configured_at_the_root() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "ticketsmith.yaml", "schemaVersion: v1\ndegraded_fallback: true\n");
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "{{ items | first }}")]);

    let engine = Engine::load(dir.path()).unwrap();
    assert!(engine.config().degraded_fallback);
    let err = engine
        .generate(&engine.request("jira", "bug", "rust"), &context(json!({ "items": 3, "title": "Crash" })))
        .unwrap_err();

    assert!(matches!(err.error, Error::TypeMismatchError { .. }));
    let degraded = err.degraded.unwrap();
    assert_eq!(degraded.template_id, "builtin/default@1");
    assert_eq!(degraded.rendered_text, "Crash\n\nNo description provided.");
}

#[test]
fn engines_can_share_one_cache() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "shared")]);
    let cache = Arc::new(ResolutionCache::with_ttl_secs(60));

    let a = Engine::load_with_cache(dir.path(), EngineConfig::default(), Arc::clone(&cache)).unwrap();
    let b = Engine::load_with_cache(dir.path(), EngineConfig::default(), Arc::clone(&cache)).unwrap();
    a.generate(&a.request("jira", "bug", "rust"), &RenderContext::default()).unwrap();
    assert_eq!(b.cache().len(), 1);
}

#[test]
fn duplicate_templates_abort_the_load() {
    let dir = tempfile::tempdir().unwrap();
    add_template(dir.path(), "jira", "bug", "rust", &[("Summary", "one")]);
    write_file(
        dir.path(),
        "copies/bug.yaml",
        &utils::template_yaml("jira", "bug", "rust", &[("Summary", "two")]),
    );
    assert!(matches!(Engine::load(dir.path()), Err(Error::DuplicateDefinitionError { .. })));
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Engine::load(dir.path().join("nope")),
        Err(Error::TemplateRootDoesNotExist { .. })
    ));
}
