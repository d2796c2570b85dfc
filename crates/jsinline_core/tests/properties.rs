use jsinline_core::{diagnostics_have_errors, parse_program, transform_source, TransformOptions};
use proptest::prelude::*;

const PARAMS: [&str; 3] = ["a", "b", "c"];

fn body_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        prop::sample::select(PARAMS.to_vec()).prop_map(str::to_string),
        (0u32..100).prop_map(|n| n.to_string()),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("{l} + {r}")),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("[{l}, {r}]")),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(t, c, a)| format!("({t} ? {c} : {a})")),
            inner.clone().prop_map(|e| format!("(() => {e})")),
        ]
    })
}

/// `effectN()` when the argument at `N` has an effect, a literal otherwise.
fn arguments_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 3)
}

fn program(body: &str, effects: &[bool]) -> String {
    let args: Vec<String> = effects
        .iter()
        .enumerate()
        .map(|(index, effect)| {
            if *effect {
                format!("effect{index}()")
            } else {
                format!("{}", index + 1)
            }
        })
        .collect();
    format!(
        "/** @inline */\nfunction k(a, b, c) {{\n  return {body};\n}}\nconst result = k({});",
        args.join(", ")
    )
}

fn token_soup() -> impl Strategy<Value = String> {
    let token = prop::sample::select(vec![
        "a", "1", "'s'", "(", ")", "{", "}", "[", "]", ";", ",", "=", "+", "=>", "?", ":", ".",
        "...", "&&", "const", "let", "function", "return", "if", "else", "while", "new", "\n",
        "/** @inline */",
    ]);
    prop::collection::vec(token, 0..48).prop_map(|tokens| tokens.join(" "))
}

proptest! {
    #[test]
    fn parser_never_panics_on_token_soup(source in token_soup()) {
        let _ = parse_program(&source);
    }

    #[test]
    fn effects_run_once_and_in_order(body in body_strategy(), effects in arguments_strategy()) {
        let source = program(&body, &effects);
        let output = transform_source(&source, &TransformOptions::default())
            .expect("transform");
        prop_assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

        let mut last = 0;
        for (index, effect) in effects.iter().enumerate() {
            let call = format!("effect{index}()");
            let count = output.code.matches(&call).count();
            prop_assert_eq!(count, usize::from(*effect), "{}", output.code);
            if let Some(position) = output.code.find(&call) {
                prop_assert!(position >= last, "{}", output.code);
                last = position;
            }
        }
        prop_assert!(!output.code.contains("function k"), "{}", output.code);
    }

    #[test]
    fn transform_is_idempotent(body in body_strategy(), effects in arguments_strategy()) {
        let source = program(&body, &effects);
        let once = transform_source(&source, &TransformOptions::default())
            .expect("first transform");
        let (_, diagnostics) = parse_program(&once.code);
        prop_assert!(!diagnostics_have_errors(&diagnostics), "{}", once.code);

        let twice = transform_source(&once.code, &TransformOptions::default())
            .expect("second transform");
        prop_assert_eq!(once.code, twice.code);
    }
}
