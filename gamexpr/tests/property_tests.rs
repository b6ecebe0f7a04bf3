use std::collections::HashMap;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use gamexpr::script::{eval_str, expand, Expander, Value};

fn no_vars() -> HashMap<String, Value> {
    HashMap::new()
}

proptest! {
    /// Evaluation returns Ok or Err on any input, never panics.
    #[test]
    fn eval_does_not_panic(s in "\\PC*") {
        let _ = eval_str(&s, &no_vars());
    }

    /// Expression-shaped noise: digits, operators, parens, words.
    #[test]
    fn eval_does_not_panic_on_operator_soup(s in "[0-9a-z().,\"+*/%^<>=!&|?: -]{0,40}") {
        let _ = eval_str(&s, &no_vars());
    }

    #[test]
    fn expand_does_not_panic(s in "\\PC*") {
        let mut e = Expander::with_rng(StdRng::seed_from_u64(0)).max_passes(64);
        let _ = e.expand(&s, &no_vars());
        let _ = e.try_expand(&s, &no_vars());
        let _ = e.format(&s, &no_vars());
    }

    /// Text with no `{` or `[` is returned unchanged.
    #[test]
    fn brace_free_text_is_unchanged(s in "[^\\[{]*") {
        prop_assert_eq!(expand(&s, &no_vars()), s);
    }

    #[test]
    fn shuffle_always_picks_an_option(
        options in prop::collection::vec("[a-z]{1,8}", 1..6),
        seed in any::<u64>(),
    ) {
        let template = format!("{{~{}}}", options.join("|"));
        let mut e = Expander::with_rng(StdRng::seed_from_u64(seed));
        let out = e.expand(&template, &no_vars());
        prop_assert!(options.contains(&out), "{} -> {}", template, out);
    }

    #[test]
    fn indexed_conditional_clamps(
        options in prop::collection::vec("[a-z]{1,8}", 1..6),
        x in -100i64..100,
    ) {
        let mut vars = no_vars();
        vars.insert("x".to_owned(), Value::from(x));
        let template = format!("{{?x:{}}}", options.join("|"));
        let expected = &options[x.clamp(0, options.len() as i64 - 1) as usize];
        prop_assert_eq!(&expand(&template, &vars), expected);
    }

    /// Small integer arithmetic agrees with `i64`.
    #[test]
    fn integer_arithmetic_matches_i64(a in -999i64..999, b in -999i64..999) {
        let vars = no_vars();
        let sum = eval_str(&format!("{a}+{b}"), &vars).unwrap();
        let diff = eval_str(&format!("{a}-{b}"), &vars).unwrap();
        let prod = eval_str(&format!("{a}*{b}"), &vars).unwrap();
        prop_assert_eq!(sum, Value::from(a + b));
        prop_assert_eq!(diff, Value::from(a - b));
        prop_assert_eq!(prod, Value::from(a * b));
    }

    #[test]
    fn comparison_matches_i64(a in -999i64..999, b in -999i64..999) {
        let vars = no_vars();
        prop_assert_eq!(eval_str(&format!("{a}<{b}"), &vars).unwrap(), Value::from(a < b));
        prop_assert_eq!(eval_str(&format!("{a}>={b}"), &vars).unwrap(), Value::from(a >= b));
        prop_assert_eq!(eval_str(&format!("{a}<>{b}"), &vars).unwrap(), Value::from(a != b));
    }

    /// Numeric results print in plain decimal form.
    #[test]
    fn results_are_plain_decimals(a in 1i64..100_000, b in 1i64..1000) {
        let out = eval_str(&format!("{a}/{b}"), &no_vars()).unwrap().to_string();
        prop_assert!(!out.contains(['e', 'E']), "{}", out);
        prop_assert!(!(out.contains('.') && out.ends_with('0')), "{}", out);
    }
}
