#![cfg(feature = "cli")]
use assert_cmd::Command;
use rstest::rstest;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn copy_fixture(dir: &std::path::Path, name: &str) {
    let content = fs::read_to_string(format!("tests/fixtures/{name}")).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

fn read_output(path: &std::path::Path) -> Value {
    let text = fs::read_to_string(path).unwrap();
    serde_yaml::from_str(&text).unwrap()
}

fn assert_no_origins(value: &Value) {
    match value {
        Value::Object(map) => {
            assert!(!map.contains_key("x-origin"), "x-origin left in {value}");
            map.values().for_each(assert_no_origins);
        }
        Value::Array(arr) => arr.iter().for_each(assert_no_origins),
        _ => {}
    }
}

#[rstest]
#[case("normalized.yaml")]
#[case("normalized.json")]
fn normalizes_a_bundled_document(#[case] output_name: &str) {
    let dir = tempdir().unwrap();
    copy_fixture(dir.path(), "bundled_basic.yaml");
    let output_path = dir.path().join(output_name);

    Command::cargo_bin("asyncapi2components")
        .unwrap()
        .current_dir(dir.path())
        .arg("bundled_basic.yaml")
        .arg(output_name)
        .assert()
        .success();

    let out = read_output(&output_path);

    assert_eq!(
        out["channels"]["pets"]["messages"]["petCreated"]["payload"]["$ref"],
        Value::String("#/components/schemas/Pet".into())
    );
    assert_eq!(
        out["components"]["schemas"]["Pet"]["properties"]["name"]["type"],
        Value::String("string".into())
    );
    assert_eq!(
        out["operations"]["receivePet"]["channel"]["$ref"],
        Value::String("#/channels/pets".into())
    );
    assert_no_origins(&out);
}

#[test]
fn loads_discriminator_mapping_targets_on_demand() {
    let dir = tempdir().unwrap();
    copy_fixture(dir.path(), "animal_bundle.yaml");
    copy_fixture(dir.path(), "Pet.yaml");
    copy_fixture(dir.path(), "Owner.yaml");
    let output_path = dir.path().join("out.yaml");

    Command::cargo_bin("asyncapi2components")
        .unwrap()
        .current_dir(dir.path())
        .arg("animal_bundle.yaml")
        .arg("out.yaml")
        .assert()
        .success();

    let out = read_output(&output_path);
    let schemas = &out["components"]["schemas"];

    assert_eq!(schemas["Animal"]["discriminator"], Value::String("kind".into()));
    assert_eq!(
        schemas["Animal"]["x-discriminator-mapping"]["pet"],
        Value::String("#/components/schemas/Pet".into())
    );
    // Pet.yaml was loaded and dereferenced: its owner ref was inlined from
    // Owner.yaml, hoisted, and re-referenced locally.
    assert_eq!(
        schemas["Pet"]["properties"]["owner"]["$ref"],
        Value::String("#/components/schemas/Owner".into())
    );
    assert_eq!(
        schemas["Owner"]["properties"]["id"]["type"],
        Value::String("string".into())
    );
    assert_no_origins(&out);
}

#[test]
fn unresolvable_mapping_values_are_left_verbatim() {
    let dir = tempdir().unwrap();
    copy_fixture(dir.path(), "animal_bundle.yaml");
    // No Pet.yaml on disk: the mapping value must survive untouched.
    let output_path = dir.path().join("out.yaml");

    Command::cargo_bin("asyncapi2components")
        .unwrap()
        .current_dir(dir.path())
        .arg("animal_bundle.yaml")
        .arg("out.yaml")
        .assert()
        .success();

    let out = read_output(&output_path);
    assert_eq!(
        out["components"]["schemas"]["Animal"]["x-discriminator-mapping"]["pet"],
        Value::String("./Pet.yaml".into())
    );
}

#[test]
fn fails_on_unreadable_input() {
    let dir = tempdir().unwrap();

    Command::cargo_bin("asyncapi2components")
        .unwrap()
        .current_dir(dir.path())
        .arg("does_not_exist.yaml")
        .arg("out.yaml")
        .assert()
        .failure();
}
