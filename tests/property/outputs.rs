// tests/property/outputs.rs

use proptest::prelude::*;
use serde_json::{Value, json};

use airdev::outputs::{
    ChunkBuffer, JsPath, OutputCommand, ParseOptions, PathComponent, apply_output_command,
    parse_line,
};

// Small JSON documents: scalars, arrays and objects up to a few levels deep.
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _\\-\"'\\\\]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn path_component() -> impl Strategy<Value = PathComponent> {
    prop_oneof![
        "[a-zA-Z_$][a-zA-Z0-9_$]{0,6}".prop_map(PathComponent::Key),
        "[ -~]{0,8}".prop_map(PathComponent::Key),
        (0usize..50).prop_map(PathComponent::Index),
    ]
}

/// Split `s` into non-empty pieces at the given char offsets.
fn split_at_offsets(s: &str, mut cuts: Vec<usize>) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    cuts.retain(|c| *c > 0 && *c < chars.len());
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(chars.len())) {
        pieces.push(chars[start..cut].iter().collect());
        start = cut;
    }
    pieces
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Lines without the output marker never produce a command.
    #[test]
    fn plain_lines_are_not_commands(line in "[^a]{0,40}|a[^i].{0,30}") {
        airdev_test_utils::init_tracing();
        let mut chunks = ChunkBuffer::new();
        let parsed = parse_line(&mut chunks, &line, &ParseOptions::default());
        prop_assert!(matches!(parsed, Ok(None)));
        prop_assert_eq!(chunks.pending(), 0);
    }

    /// `set` with an empty path replaces the document with exactly the value.
    #[test]
    fn root_set_replaces_the_document(before in json_value(), value in json_value()) {
        let line = format!("airplane_output_set {}", serde_json::to_string(&value).unwrap());
        let parsed = parse_line(&mut ChunkBuffer::new(), &line, &ParseOptions::default())
            .unwrap()
            .unwrap();

        let mut doc = before;
        apply_output_command(parsed, &mut doc).unwrap();
        prop_assert_eq!(doc, value);
    }

    /// Splitting a command into chunks does not change what it means.
    #[test]
    fn chunked_lines_match_the_unchunked_line(
        value in json_value(),
        cuts in prop::collection::vec(0usize..200, 0..6),
        key in "[a-z0-9]{1,8}",
    ) {
        let line = format!("airplane_output_append:items {}", serde_json::to_string(&value).unwrap());
        let opts = ParseOptions::default();
        let direct = parse_line(&mut ChunkBuffer::new(), &line, &opts).unwrap();

        let mut chunks = ChunkBuffer::new();
        for piece in split_at_offsets(&line, cuts) {
            let chunk_line = format!("airplane_chunk:{key} {piece}");
            prop_assert_eq!(parse_line(&mut chunks, &chunk_line, &opts).unwrap(), None);
        }
        prop_assert_eq!(chunks.pending(), 1);
        let reassembled = parse_line(&mut chunks, &format!("airplane_chunk_end:{key}"), &opts).unwrap();

        prop_assert_eq!(chunks.pending(), 0);
        prop_assert_eq!(reassembled, direct);
    }

    /// Repeated appends keep their order.
    #[test]
    fn appends_accumulate_in_order(values in prop::collection::vec(json_value(), 1..8)) {
        let mut doc = Value::Null;
        let mut chunks = ChunkBuffer::new();
        for value in &values {
            let line = format!("airplane_output_append:a.b {}", serde_json::to_string(value).unwrap());
            let parsed = parse_line(&mut chunks, &line, &ParseOptions::default()).unwrap().unwrap();
            apply_output_command(parsed, &mut doc).unwrap();
        }
        prop_assert_eq!(doc, json!({"a": {"b": values}}));
    }

    /// A failed command leaves the document exactly as it was.
    #[test]
    fn failed_commands_do_not_touch_the_document(
        doc in json_value(),
        index in 0usize..10,
        op in prop_oneof![Just("set"), Just("append")],
        path in prop_oneof![
            Just("x.y[{i}].z"),
            Just("[{i}]"),
            Just("[{i}].k"),
            Just("x[{i}]"),
        ],
    ) {
        let before = doc.clone();
        let mut doc = doc;
        let path = path.replace("{i}", &index.to_string());
        let line = format!("airplane_output_{op}:{path} 1");
        let parsed = parse_line(&mut ChunkBuffer::new(), &line, &ParseOptions::default())
            .unwrap()
            .unwrap();

        if apply_output_command(parsed, &mut doc).is_err() {
            prop_assert_eq!(doc, before);
        }
    }

    /// Indexing into a root that is not an array always fails.
    #[test]
    fn indexing_a_non_array_root_fails(
        doc in json_value().prop_filter("non-array root", |v| !v.is_array()),
        index in 0usize..10,
        op in prop_oneof![Just("set"), Just("append")],
    ) {
        let before = doc.clone();
        let mut doc = doc;
        let line = format!("airplane_output_{op}:[{index}] 1");
        let parsed = parse_line(&mut ChunkBuffer::new(), &line, &ParseOptions::default())
            .unwrap()
            .unwrap();

        prop_assert!(apply_output_command(parsed, &mut doc).is_err());
        prop_assert_eq!(doc, before);
    }

    /// Displayed paths parse back to the same components.
    #[test]
    fn displayed_paths_parse_back(components in prop::collection::vec(path_component(), 0..5)) {
        let path = JsPath::new(components);
        let shown = path.to_string();
        prop_assert_eq!(JsPath::parse(&shown).unwrap(), path);
    }

    /// Lines longer than the limit are rejected whole.
    #[test]
    fn line_limit_is_enforced(value in "[a-z]{0,64}", limit in 1usize..80) {
        let line = format!("airplane_output_set {}", serde_json::to_string(&value).unwrap());
        let parsed = parse_line(
            &mut ChunkBuffer::new(),
            &line,
            &ParseOptions { max_line_bytes: limit },
        );
        if line.len() > limit {
            prop_assert!(parsed.is_err());
        } else {
            let parsed = parsed.unwrap().unwrap();
            prop_assert!(matches!(parsed.command, OutputCommand::Set { .. }), "expected OutputCommand::Set");
            prop_assert_eq!(parsed.value, Value::String(value));
        }
    }
}
