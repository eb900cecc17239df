#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// YAML for a resolvable template with the given sections and no variables.
pub fn template_yaml(platform: &str, document_type: &str, tech_stack: &str, sections: &[(&str, &str)]) -> String {
    template_yaml_with(platform, document_type, tech_stack, sections, json!({}), &[])
}

/// YAML for a resolvable template with a variable schema and base fragments.
pub fn template_yaml_with(
    platform: &str,
    document_type: &str,
    tech_stack: &str,
    sections: &[(&str, &str)],
    variables: Value,
    base_refs: &[&str],
) -> String {
    let document = json!({
        "platform": platform,
        "documentType": document_type,
        "techStack": tech_stack,
        "version": "1",
        "baseRefs": base_refs,
        "variables": variables,
        "sections": section_list(sections),
    });
    serde_yaml::to_string(&document).unwrap()
}

/// YAML for a fragment.
pub fn fragment_yaml(name: &str, sections: &[(&str, &str)], base_refs: &[&str]) -> String {
    let document = json!({
        "fragment": name,
        "version": "1",
        "baseRefs": base_refs,
        "sections": section_list(sections),
    });
    serde_yaml::to_string(&document).unwrap()
}

fn section_list(sections: &[(&str, &str)]) -> Value {
    Value::Array(
        sections
            .iter()
            .map(|(name, body)| json!({ "name": name, "body": body }))
            .collect(),
    )
}

/// Writes a template for `(platform, documentType, techStack)` under `root`.
pub fn add_template(root: &Path, platform: &str, document_type: &str, tech_stack: &str, sections: &[(&str, &str)]) -> PathBuf {
    write_file(
        root,
        &format!("{platform}/{document_type}/{tech_stack}.yaml"),
        &template_yaml(platform, document_type, tech_stack, sections),
    )
}

/// Writes a fragment named `name` under `root/fragments`.
pub fn add_fragment(root: &Path, name: &str, sections: &[(&str, &str)], base_refs: &[&str]) -> PathBuf {
    write_file(root, &format!("fragments/{name}.yaml"), &fragment_yaml(name, sections, base_refs))
}
