use std::fs;

use jsinline_core::TransformOptions;
use jsinline_driver::{diagnostics_json, load_options, transform_file, transform_text, DriverError};

#[test]
fn options_load_from_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("jsinline.toml");
    fs::write(&path, "max-expansions = 5\nproject-objects = false\n").expect("write config");

    let options = load_options(&path).expect("load options");
    assert_eq!(
        options,
        TransformOptions {
            max_expansions: 5,
            project_objects: false,
            ..TransformOptions::default()
        }
    );
}

#[test]
fn unknown_option_keys_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("jsinline.toml");
    fs::write(&path, "inline = true\n").expect("write config");

    let err = load_options(&path).expect_err("unknown key");
    assert!(matches!(err, DriverError::Config(_)), "{err}");
}

#[test]
fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = transform_file(&dir.path().join("absent.js"), &TransformOptions::default())
        .expect_err("missing file");
    assert!(matches!(err, DriverError::Io(_)), "{err}");
}

#[test]
fn file_is_transformed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("input.js");
    fs::write(
        &path,
        "/** @inline */\nfunction square(v) {\n  return v * v;\n}\nconst result = square(side());\nexport_(result);\n",
    )
    .expect("write input");

    let output = transform_file(&path, &TransformOptions::default()).expect("transform");
    assert!(!output.has_errors());
    insta::assert_snapshot!(output.code, @r"
    const _v = side();
    const result = _v * _v;
    export_(result);
    ");
    assert_eq!(output.stats.functions_inlined, 1);
    assert_eq!(output.stats.hoisted_bindings, 1);
}

#[test]
fn parse_errors_keep_the_input() {
    let source = "f(;";
    let output = transform_text("broken.js", source, &TransformOptions::default())
        .expect("transform");
    assert!(output.has_errors());
    assert_eq!(output.code, source);
}

#[test]
fn json_report_carries_diagnostics_and_stats() {
    let source = "/** @inline */\nasync function load(a) {\n  return a;\n}\nf(load(1));";
    let output = transform_text("report.js", source, &TransformOptions::default())
        .expect("transform");
    let json: serde_json::Value =
        serde_json::from_str(&diagnostics_json(&output).expect("json")).expect("parse json");

    assert_eq!(json["path"], "report.js");
    assert_eq!(json["diagnostics"][0]["code"], "I0101");
    assert_eq!(json["stats"]["functions_inlined"], 0);
}

#[test]
fn fatal_transform_errors_surface() {
    let options = TransformOptions {
        max_expansions: 1,
        ..TransformOptions::default()
    };
    let err = transform_text("loop.js", "f(((a) => a)(((b) => b)(1)));", &options)
        .expect_err("limit");
    assert!(matches!(err, DriverError::Transform(_)), "{err}");
}

#[test]
fn json_failures_have_their_own_variant() {
    let err: DriverError = serde_json::from_str::<serde_json::Value>("{")
        .expect_err("truncated json")
        .into();
    assert!(matches!(err, DriverError::Json(_)), "{err}");
}
