// tests/outputs_protocol.rs

use serde_json::{Value, json};

use airdev::outputs::{
    ChunkBuffer, JsPath, OutputCommand, OutputError, ParseOptions, ParsedLine, PathComponent,
    apply_output_command, parse_line,
};

fn parse(text: &str) -> Option<ParsedLine> {
    let mut chunks = ChunkBuffer::new();
    parse_line(&mut chunks, text, &ParseOptions::default()).unwrap()
}

fn legacy_name(line: &ParsedLine) -> &str {
    match &line.command {
        OutputCommand::Legacy { name } => name,
        other => panic!("expected legacy command, got {other:?}"),
    }
}

/// Parse and apply every line in order, panicking on any error.
fn run_lines(doc: Value, lines: &[&str]) -> Value {
    let mut doc = doc;
    let mut chunks = ChunkBuffer::new();
    for line in lines {
        if let Some(parsed) = parse_line(&mut chunks, line, &ParseOptions::default()).unwrap() {
            apply_output_command(parsed, &mut doc).unwrap();
        }
    }
    doc
}

#[test]
fn legacy_lines_parse_name_and_value() {
    let cases: &[(&str, &str, Value)] = &[
        ("airplane_output hello", "output", json!("hello")),
        ("airplane_output: true", "output", json!(true)),
        ("airplane_output:named [1, 2, 3]", "named", json!([1, 2, 3])),
        ("airplane_output \"hello world\"", "output", json!("hello world")),
        ("airplane_output:my_output   hello world  ", "my_output", json!("hello world")),
        ("airplane_output:tabs \thello\tworld", "tabs", json!("hello\tworld")),
        ("airplane_output: ", "output", json!("")),
        ("airplane_output ", "output", json!("")),
        ("airplane_output:\"output value\" hello", "output value", json!("hello")),
        ("airplane_output:\"\" hello", "output", json!("hello")),
        ("airplane_output:'output value' \"hello\"", "output value", json!("hello")),
        ("airplane_output:'' hello", "output", json!("hello")),
        ("airplane_output:''' hello", "'''", json!("hello")),
    ];

    for (text, name, value) in cases {
        let line = parse(text).unwrap_or_else(|| panic!("no command parsed from {text:?}"));
        assert_eq!(legacy_name(&line), *name, "name for {text:?}");
        assert_eq!(&line.value, value, "value for {text:?}");
        assert_eq!(line.size, text.len(), "size for {text:?}");
    }
}

#[test]
fn structured_lines_parse_path_and_value() {
    let cases: &[(&str, Vec<PathComponent>, Value)] = &[
        (r#" "hello""#, vec![], json!("hello")),
        (": true", vec![], json!(true)),
        (":named [1, 2, 3]", vec![PathComponent::Key("named".into())], json!([1, 2, 3])),
        (
            r#":my_output   "hello world"  "#,
            vec![PathComponent::Key("my_output".into())],
            json!("hello world"),
        ),
        (
            r#":a.b.c[5][4]["asdf"]["\"]"] "test""#,
            vec![
                PathComponent::Key("a".into()),
                PathComponent::Key("b".into()),
                PathComponent::Key("c".into()),
                PathComponent::Index(5),
                PathComponent::Index(4),
                PathComponent::Key("asdf".into()),
                PathComponent::Key("\"]".into()),
            ],
            json!("test"),
        ),
        (
            r#":["json[\""] {"b":[],"a":true,"\"] ":3}"#,
            vec![PathComponent::Key("json[\"".into())],
            json!({"b": [], "a": true, "\"] ": 3}),
        ),
    ];

    for (suffix, components, value) in cases {
        for (marker, is_set) in [("airplane_output_set", true), ("airplane_output_append", false)] {
            let text = format!("{marker}{suffix}");
            let line = parse(&text).unwrap_or_else(|| panic!("no command parsed from {text:?}"));
            let expected_path = JsPath::new(components.clone());
            match (&line.command, is_set) {
                (OutputCommand::Set { path }, true) | (OutputCommand::Append { path }, false) => {
                    assert_eq!(path, &expected_path, "path for {text:?}");
                }
                (other, _) => panic!("unexpected command {other:?} for {text:?}"),
            }
            assert_eq!(&line.value, value, "value for {text:?}");
        }
    }
}

#[test]
fn structured_value_keeps_key_order() {
    let line = parse(r#"airplane_output_set {"z":1,"a":2,"m":3}"#).unwrap();
    let keys: Vec<&String> = line.value.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["z", "a", "m"]);
}

#[test]
fn malformed_structured_line_is_unknown_format() {
    let mut chunks = ChunkBuffer::new();
    let opts = ParseOptions::default();

    for text in [
        "airplane_output_set not json",
        "airplane_output_append:a.b",
        "airplane_output_set:a[x] 1",
    ] {
        match parse_line(&mut chunks, text, &opts) {
            Err(OutputError::UnknownFormat(_)) => {}
            other => panic!("expected UnknownFormat for {text:?}, got {other:?}"),
        }
    }
}

#[test]
fn non_output_lines_are_ignored() {
    assert_eq!(parse("hello world"), None);
    assert_eq!(parse(""), None);
    assert_eq!(parse("  airplane_output hello"), None);
}

#[test]
fn bare_marker_appends_empty_string() {
    let line = parse("airplane_output").unwrap();
    assert_eq!(legacy_name(&line), "output");
    assert_eq!(line.value, json!(""));
}

#[test]
fn chunks_are_reassembled_per_key() {
    let doc = run_lines(
        Value::Null,
        &[
            "airplane_chunk:asdf airplane_output:asdf ",
            "airplane_chunk:ghjkl airplane_output_set:ghjkl ",
            "airplane_chunk:asdf hello",
            r#"airplane_chunk:ghjkl ["ghjkl"]"#,
            "airplane_chunk:asdf  world",
            "airplane_chunk_end:asdf",
            "airplane_chunk_end:ghjkl",
        ],
    );
    assert_eq!(doc, json!({"asdf": ["hello world"], "ghjkl": ["ghjkl"]}));
}

#[test]
fn chunk_lines_yield_nothing_until_end() {
    let mut chunks = ChunkBuffer::new();
    let opts = ParseOptions::default();

    let first = parse_line(&mut chunks, "airplane_chunk:k airplane_output_set ", &opts).unwrap();
    assert_eq!(first, None);
    assert_eq!(chunks.pending(), 1);

    let second = parse_line(&mut chunks, "airplane_chunk:k 42", &opts).unwrap();
    assert_eq!(second, None);

    let end = parse_line(&mut chunks, "airplane_chunk_end:k", &opts)
        .unwrap()
        .unwrap();
    assert_eq!(end.value, json!(42));
    assert_eq!(chunks.pending(), 0);
}

#[test]
fn invalid_chunk_line_is_an_error() {
    let mut chunks = ChunkBuffer::new();
    match parse_line(&mut chunks, "airplane_chunkxyz", &ParseOptions::default()) {
        Err(OutputError::InvalidChunk(_)) => {}
        other => panic!("expected InvalidChunk, got {other:?}"),
    }
}

#[test]
fn line_limit_applies_to_effective_line() {
    let opts = ParseOptions { max_line_bytes: 10 };

    let cases: &[&[&str]] = &[
        &[
            "airplane_chunk:asdf airplane_output:asdf ",
            "airplane_chunk:asdf hello world",
            "airplane_chunk_end:asdf",
        ],
        &[r#"airplane_output_set "abcdefghijklmnopqrstuvwxyz""#],
        &[r#"airplane_output_append "abcdefghijklmnopqrstuvwxyz""#],
    ];

    for lines in cases {
        let mut chunks = ChunkBuffer::new();
        for (i, text) in lines.iter().enumerate() {
            let result = parse_line(&mut chunks, text, &opts);
            if i == lines.len() - 1 {
                assert_eq!(result, Err(OutputError::LineTooLong));
            } else {
                assert_eq!(result, Ok(None));
            }
        }
    }
}

#[test]
fn line_limit_allows_lines_within_budget() {
    let mut chunks = ChunkBuffer::new();
    let opts = ParseOptions {
        max_line_bytes: 100,
    };
    let line = parse_line(&mut chunks, r#"airplane_output_set:["json[\""] {"a":true}"#, &opts)
        .unwrap()
        .unwrap();
    assert_eq!(line.value, json!({"a": true}));
}

#[test]
fn set_creates_intermediate_objects() {
    let doc = run_lines(Value::Null, &[r#"airplane_output_set:a.b "c""#]);
    assert_eq!(doc, json!({"a": {"b": "c"}}));
}

#[test]
fn set_with_empty_path_replaces_document() {
    let doc = run_lines(json!({"old": 1}), &["airplane_output_set [1,2]"]);
    assert_eq!(doc, json!([1, 2]));
}

#[test]
fn set_into_existing_array_index() {
    let doc = run_lines(json!({"a": [1, 2, 3]}), &[r#"airplane_output_set:a[1] {"x":true}"#]);
    assert_eq!(doc, json!({"a": [1, {"x": true}, 3]}));
}

#[test]
fn append_to_root_array() {
    let doc = run_lines(json!([true, 1, null]), &[r#"airplane_output_append {"c":"d"}"#]);
    assert_eq!(doc, json!([true, 1, null, {"c": "d"}]));
}

#[test]
fn append_creates_missing_array() {
    let doc = run_lines(
        Value::Null,
        &["airplane_output_append:rows 1", "airplane_output_append:rows 2"],
    );
    assert_eq!(doc, json!({"rows": [1, 2]}));
}

#[test]
fn legacy_appends_twice_to_same_key() {
    let doc = run_lines(json!({}), &["airplane_output asdf", "airplane_output testing"]);
    assert_eq!(doc, json!({"output": ["asdf", "testing"]}));
}

#[test]
fn apply_errors_leave_document_untouched() {
    let cases: &[(Value, &str, OutputError)] = &[
        (json!({"a": 1}), "airplane_output_set:a.b 2", OutputError::ExpectedObject),
        (json!({"a": {}}), "airplane_output_set:a[0] 2", OutputError::ExpectedArray),
        (
            json!({"a": [1]}),
            "airplane_output_set:a[3] 2",
            OutputError::IndexOutOfRange { index: 3, len: 1 },
        ),
        (
            json!({"a": "text"}),
            "airplane_output_append:a 2",
            OutputError::ExpectedArrayAtAppendPoint,
        ),
        (json!([1]), "airplane_output hello", OutputError::ExpectedObjectAtRoot),
        (json!({"output": 5}), "airplane_output hello", OutputError::ExpectedArray),
    ];

    for (doc, text, expected) in cases {
        let mut current = doc.clone();
        let line = parse(text).unwrap();
        let err = apply_output_command(line, &mut current).unwrap_err();
        assert_eq!(&err, expected, "error for {text:?}");
        assert_eq!(&current, doc, "document changed by {text:?}");
    }
}

#[test]
fn js_path_round_trips_through_display() {
    let path: JsPath = r#"a.b[0]["with space"]['q\'d']"#.parse().unwrap();
    assert_eq!(
        path.components(),
        &[
            PathComponent::Key("a".into()),
            PathComponent::Key("b".into()),
            PathComponent::Index(0),
            PathComponent::Key("with space".into()),
            PathComponent::Key("q'd".into()),
        ]
    );

    let reparsed: JsPath = path.to_string().parse().unwrap();
    assert_eq!(reparsed, path);
}

#[test]
fn js_path_rejects_malformed_input() {
    for text in ["a.", "a[", "a[x]", r#"a["open"#, "a]"] {
        match JsPath::parse(text) {
            Err(OutputError::InvalidPath { .. }) => {}
            other => panic!("expected InvalidPath for {text:?}, got {other:?}"),
        }
    }
    assert!(JsPath::parse("").unwrap().is_empty());
}
