use jsinline_core::{transform_source, TransformOptions, TransformStats, TransformedSource};

fn transform(source: &str) -> TransformedSource {
    let output = transform_source(source, &TransformOptions::default()).expect("transform");
    assert!(
        output.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        output.diagnostics
    );
    output
}

fn codes(output: &TransformedSource) -> Vec<&str> {
    output
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.code.as_str())
        .collect()
}

#[test]
fn marked_function_is_inlined_at_its_call() {
    let output = transform(
        "/** @inline */
function add(a, b) {
  return a + b;
}
const x = add(1, 3);",
    );
    insta::assert_snapshot!(output.code, @"const x = 1 + 3;");
}

#[test]
fn local_constants_are_inlined_without_residue() {
    let output = transform(
        "/** @inline */
function sum(a, b) {
  const c = 10;
  return a + b + c;
}
f(sum(1, 2));",
    );
    insta::assert_snapshot!(output.code, @"f(1 + 2 + 10);");
}

#[test]
fn repeated_closures_get_independent_bindings() {
    let output = transform(
        "/** @inline */
function constant(value) {
  return () => value;
}
const one = constant(g());
const two = constant(h());",
    );
    insta::assert_snapshot!(output.code, @r"
    const _value = g();
    const one = () => _value;
    const _value2 = h();
    const two = () => _value2;
    ");
    assert_eq!(output.stats.hoisted_bindings, 2);
}

#[test]
fn literal_property_reads_are_projected() {
    let output = transform("f({ name: \"Steve\", age: 35 }.name);");
    insta::assert_snapshot!(output.code, @r#"f("Steve");"#);
}

#[test]
fn bound_object_is_removed_when_only_read() {
    let output = transform("const obj = { t: 1, u: 2 };\nf(obj.t, obj.u);");
    insta::assert_snapshot!(output.code, @"f(1, 2);");

    let escaping = "const obj = { t: 1, u: 2 };\nconsole.log(obj, obj.t);";
    assert_eq!(transform(escaping).code, escaping);
}

#[test]
fn function_mutating_a_parameter_is_never_inlined() {
    let output = transform_source(
        "/** @inline */
function bump(a) {
  a = a + 1;
  return a;
}
f(bump(1));",
        &TransformOptions::default(),
    )
    .expect("transform");
    assert_eq!(codes(&output), ["I0102"]);
    assert!(output.code.contains("function bump(a)"));
    assert!(output.code.ends_with("f(bump(1));"));
    assert_eq!(output.stats, TransformStats::default());
}

#[test]
fn effectful_arguments_run_once_in_order() {
    let output = transform(
        "/** @inline */
function twice(v, w) {
  return [v, v, w];
}
const pair = twice(first(), second());",
    );
    insta::assert_snapshot!(output.code, @r"
    const _v = first(), _w = second();
    const pair = [_v, _v, _w];
    ");
}

#[test]
fn effects_are_not_moved_ahead_of_reads() {
    let output = transform(
        "/** @inline */
function square(v) {
  return v * v;
}
const o = { p: 1 };
f(o.p, square(bump(o)));",
    );
    insta::assert_snapshot!(output.code, @r"
    const o = { p: 1 };
    f(o.p, (v => {
      return v * v;
    })(bump(o)));
    ");
    assert_eq!(output.stats.expansions, 0);
}

#[test]
fn function_returning_its_argument() {
    let output = transform(
        "/** @inline */
function all(...xs) {
  return xs;
}
/** @inline */
function id(a) {
  return a;
}
f(id(1), all(g(), 2));",
    );
    insta::assert_snapshot!(output.code, @"f(1, [g(), 2]);");
}

#[test]
fn inline_functions_compose() {
    let output = transform(
        "/** @inline */
function double(x) {
  return x * 2;
}
/** @inline */
function quadruple(x) {
  return double(double(x));
}
f(quadruple(n));",
    );
    insta::assert_snapshot!(output.code, @"f(n * 2 * 2);");
    assert_eq!(output.stats.functions_inlined, 2);
}

#[test]
fn projection_after_expansion() {
    let output = transform(
        "/** @inline */
function point(x, y) {
  return { x, y };
}
f(point(1, 2).y);",
    );
    insta::assert_snapshot!(output.code, @"f(2);");
}

#[test]
fn capture_at_the_call_site_is_avoided() {
    let output = transform(
        "const scale = 3;
/** @inline */
function scaled(v) {
  return v * scale;
}
function g(scale) {
  return scaled(scale);
}",
    );
    insta::assert_snapshot!(output.code, @r"
    const scale = 3;
    function g(_scale) {
      return _scale * scale;
    }
    ");
}

#[test]
fn unrelated_functions_with_the_same_name() {
    let output = transform(
        "function a() {
  /** @inline */
  function k() {
    return 1;
  }
  return k();
}
function b() {
  /** @inline */
  function k() {
    return 2;
  }
  return k();
}",
    );
    insta::assert_snapshot!(output.code, @r"
    function a() {
      return 1;
    }
    function b() {
      return 2;
    }
    ");
}

#[test]
fn short_circuit_blocks_hoisting() {
    let source = "/** @inline */
function both(v) {
  return v + v;
}
x = c && both(g());";
    let output = transform(source);
    insta::assert_snapshot!(output.code, @r"
    x = c && (v => {
      return v + v;
    })(g());
    ");
    assert_eq!(output.stats.expansions, 0);
}

#[test]
fn bare_return_aborts_the_transform() {
    let result = transform_source(
        "/** @inline */
function nothing() {
  return;
}
f(nothing());",
        &TransformOptions::default(),
    );
    let error = result.expect_err("fatal");
    assert!(error.to_string().contains("returns without a value"), "{error}");
}

#[test]
fn parse_errors_leave_the_source_alone() {
    let source = "const = 1;";
    let output = transform_source(source, &TransformOptions::default()).expect("transform");
    assert_eq!(output.code, source);
    assert!(jsinline_core::diagnostics_have_errors(&output.diagnostics));
}

#[test]
fn custom_annotation_tag() {
    let options: TransformOptions = toml::from_str("annotation = \"expand\"").expect("options");
    let source = "/** @expand */
function one() {
  return 1;
}
/** @inline */
function two() {
  return 2;
}
f(one(), two());";
    let output = transform_source(source, &options).expect("transform");
    assert!(output.code.ends_with("f(1, two());"), "{}", output.code);
}

#[test]
fn stats_serialize_for_reports() {
    let output = transform(
        "/** @inline */
function add(a, b) {
  return a + b;
}
const obj = { t: add(1, 2) };
f(obj.t);",
    );
    insta::assert_snapshot!(output.code, @"f(1 + 2);");
    insta::assert_ron_snapshot!(output.stats, @r"
    TransformStats(
      functions_inlined: 1,
      expansions: 1,
      hoisted_bindings: 0,
      projections: 1,
      simplified_bindings: 0,
    )
    ");
}
