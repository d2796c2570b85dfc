use crate::ast::{Ast, BinaryOp, Node, NodeId};

/// Static name of a property key, when it can be known without running the program.
///
/// Non-computed identifiers name themselves. String and number literals name their
/// canonical string form; computed keys may additionally be `true`/`false`/`null`/`undefined`
/// or a `+` concatenation involving a string.
pub fn property_name(ast: &Ast, key: NodeId, computed: bool) -> Option<String> {
    if !computed {
        if let Some(name) = ast.ident_name(key) {
            return Some(name.to_string());
        }
    }
    static_string(ast, key, computed).map(|value| value.text)
}

struct StaticValue {
    text: String,
    is_string: bool,
}

fn static_string(ast: &Ast, id: NodeId, computed: bool) -> Option<StaticValue> {
    let text = |text: String, is_string| Some(StaticValue { text, is_string });
    match ast.node(id) {
        Node::Str { value, .. } => text(value.clone(), true),
        Node::Number { raw } => text(canonical_number(raw)?, false),
        Node::Bool { value } if computed => text(value.to_string(), false),
        Node::Null if computed => text("null".to_string(), false),
        Node::Ident { name } if computed && name == "undefined" => {
            text("undefined".to_string(), false)
        }
        Node::Binary {
            op: BinaryOp::Add,
            left,
            right,
        } if computed => {
            let left = static_string(ast, *left, true)?;
            let right = static_string(ast, *right, true)?;
            if !left.is_string && !right.is_string {
                return None;
            }
            text(left.text + &right.text, true)
        }
        _ => None,
    }
}

/// The string a number literal converts to as a property key. Only integers below 2^53 and
/// plain decimals are handled; anything needing exponent notation is left unknown.
fn canonical_number(raw: &str) -> Option<String> {
    let cleaned = raw.replace('_', "");
    let value = match cleaned.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => u64::from_str_radix(&cleaned[2..], 16).ok()? as f64,
        Some("0o") => u64::from_str_radix(&cleaned[2..], 8).ok()? as f64,
        Some("0b") => u64::from_str_radix(&cleaned[2..], 2).ok()? as f64,
        _ => cleaned.parse::<f64>().ok()?,
    };
    if !value.is_finite() || value.abs() >= 9_007_199_254_740_992.0 {
        return None;
    }
    if value.fract() == 0.0 {
        return Some(format!("{}", value as i64));
    }
    if value.abs() < 1e-6 {
        return None;
    }
    Some(format!("{value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    /// Name of the first property key of `({ ... })`.
    fn first_key(source: &str) -> Option<String> {
        let (ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        ast.descendants(ast.root())
            .into_iter()
            .find_map(|id| match ast.node(id) {
                Node::Property { key, computed, .. } => Some(property_name(&ast, *key, *computed)),
                _ => None,
            })
            .flatten()
    }

    #[test]
    fn plain_keys() {
        assert_eq!(first_key("({ a: 1 });").as_deref(), Some("a"));
        assert_eq!(first_key("({ 'a b': 1 });").as_deref(), Some("a b"));
        assert_eq!(first_key("({ 1.50: 1 });").as_deref(), Some("1.5"));
        assert_eq!(first_key("({ 0x10: 1 });").as_deref(), Some("16"));
    }

    #[test]
    fn computed_keys() {
        assert_eq!(first_key("({ ['a']: 1 });").as_deref(), Some("a"));
        assert_eq!(first_key("({ ['a' + 1]: 1 });").as_deref(), Some("a1"));
        assert_eq!(first_key("({ [null]: 1 });").as_deref(), Some("null"));
        assert_eq!(first_key("({ [undefined]: 1 });").as_deref(), Some("undefined"));
        assert_eq!(first_key("({ [true]: 1 });").as_deref(), Some("true"));
    }

    #[test]
    fn unknown_keys() {
        assert_eq!(first_key("({ [a]: 1 });"), None);
        assert_eq!(first_key("({ [1 + 2]: 1 });"), None);
        assert_eq!(first_key("({ [f()]: 1 });"), None);
        assert_eq!(first_key("({ 1e300: 1 });"), None);
    }

    #[test]
    fn member_properties() {
        let (ast, _) = parse_program("a.b; a['c']; a[d];");
        let names: Vec<_> = ast
            .descendants(ast.root())
            .into_iter()
            .filter_map(|id| match ast.node(id) {
                Node::Member {
                    property, computed, ..
                } => Some(property_name(&ast, *property, *computed)),
                _ => None,
            })
            .collect();
        assert_eq!(names, [Some("b".to_string()), Some("c".to_string()), None]);
    }
}
