use crate::ast::{Ast, Node, NodeId};

use super::property_name::property_name;

/// Outcome of looking a property up in an object literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The entry that supplies the property's value.
    Value(NodeId),
    /// No entry of the literal can produce the property.
    Absent,
    /// A spread of unknown shape, a dynamic key or a method decides the value.
    Unknown,
}

/// Folds over the entries of object literal `object` in source order, the way the literal
/// itself is evaluated: later entries overwrite earlier ones.
pub fn property_value(ast: &Ast, object: NodeId, name: &str) -> Resolution {
    let Node::Object { properties } = ast.node(object) else {
        return Resolution::Unknown;
    };
    properties
        .iter()
        .fold(Resolution::Absent, |current, entry| match ast.node(*entry) {
            Node::Property {
                key,
                value,
                computed,
                method,
                ..
            } => match property_name(ast, *key, *computed) {
                None => Resolution::Unknown,
                Some(key_name) if key_name == name && *method => Resolution::Unknown,
                Some(key_name) if key_name == name => Resolution::Value(*value),
                Some(_) => current,
            },
            Node::Spread { arg } => match ast.node(*arg) {
                Node::Object { .. } => match property_value(ast, *arg, name) {
                    Resolution::Absent => current,
                    inner => inner,
                },
                _ => Resolution::Unknown,
            },
            _ => Resolution::Unknown,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::printer::print_node;

    fn lookup(source: &str, name: &str) -> Option<String> {
        let (ast, diagnostics) = parse_program(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let object = ast
            .descendants(ast.root())
            .into_iter()
            .find(|id| matches!(ast.node(*id), Node::Object { .. }))
            .expect("object literal");
        match property_value(&ast, object, name) {
            Resolution::Value(value) => Some(print_node(&ast, value)),
            Resolution::Absent => Some("<absent>".to_string()),
            Resolution::Unknown => None,
        }
    }

    #[test]
    fn last_write_wins() {
        assert_eq!(lookup("({ a: 1, b: 2, a: 3 });", "a").as_deref(), Some("3"));
        assert_eq!(lookup("({ a: 1 });", "z").as_deref(), Some("<absent>"));
    }

    #[test]
    fn literal_spreads_are_searched() {
        assert_eq!(lookup("({ a: 1, ...{ a: 2 } });", "a").as_deref(), Some("2"));
        assert_eq!(lookup("({ a: 1, ...{ b: 2 } });", "a").as_deref(), Some("1"));
    }

    #[test]
    fn dynamic_entries_invalidate_until_overridden() {
        assert_eq!(lookup("({ a: 1, ...rest });", "a"), None);
        assert_eq!(lookup("({ ...rest, a: 1 });", "a").as_deref(), Some("1"));
        assert_eq!(lookup("({ a: 1, [k]: 2 });", "a"), None);
        assert_eq!(lookup("({ [k]: 2, a: 1 });", "a").as_deref(), Some("1"));
    }

    #[test]
    fn methods_are_unknown() {
        assert_eq!(lookup("({ a() { return 1; } });", "a"), None);
    }
}
