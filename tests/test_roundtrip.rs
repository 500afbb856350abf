mod util;

use factok::{AnnotatedSpan, Options};
use util::{assert_round_trip, init_env, untrained};

#[test]
fn test_plain_round_trips() {
    init_env();
    let tokenizer = untrained(Options::default());
    for line in [
        "This is a test.",
        "They sent a tax to Ayodhya because we had defeated them in that famous 'Ashomedha' to rend it.",
        "1°C! This is a test, iPods cost    $3.14, or ९३ or 二十 at 13¾°C, for camelCase, PascalCase, and NSStrings, plus a longword.",
        "२०१४ से २०१९ तक",
        "你好 世界。",
        "Mixed 你好abc World!",
        "  leading and trailing  ",
        "double  spaces   inside",
        "don't stop, it's well-known!",
        "ALL CAPS AND A WORD",
        "Straße STRASSE straße",
        "-<<<>>>{{{}}}",
        "a\tb\u{a0}c",
        "ⓐ ☺ ¾",
        "",
    ] {
        assert_round_trip(&tokenizer, line);
    }
}

#[test]
fn test_round_trips_across_options() {
    init_env();
    for options in [
        Options { right_word_glue: true, ..Options::default() },
        Options { distinguish_initial_and_internal_pieces: true, ..Options::default() },
        Options { single_letter_case_factors: true, ..Options::default() },
        Options { context_dependent_single_letter_cap: true, ..Options::default() },
        Options { split_han: true, ..Options::default() },
    ] {
        let tokenizer = untrained(options);
        for line in [
            "This is A TEST with camelCase and 3.14!",
            "你好 世界。 abc",
            "I A M here",
        ] {
            assert_round_trip(&tokenizer, line);
        }
    }
}

#[test]
fn test_word_beg_mark_decodes_to_underscores() {
    init_env();
    let tokenizer = untrained(Options::default());
    let line = "\u{2581}\u{2581}\u{2581}\u{2581}\u{2581}\u{2581}\u{2581}";
    let encoded = tokenizer.encode(line).unwrap();
    let decoded = tokenizer.decode(&encoded.tokens).unwrap();
    assert_eq!(decoded.text, "_______");
}

#[test]
fn test_phrase_fix_forces_surfaces() {
    init_env();
    let tokenizer = untrained(Options::default());
    let line = "They sent a tax to Ayodhya because we had defeated them in that famous \
                'Ashomedha' to rend it.";
    let spans = vec![
        AnnotatedSpan::phrase_fix(12, 14, "First Class"),
        AnnotatedSpan::phrase_fix(27, 7, "Economy Class"),
    ];
    let encoded = tokenizer.encode_with(line, &spans, &[], 7).unwrap();
    let decoded = tokenizer.decode_with(&encoded.tokens, Some(&encoded.package), None).unwrap();
    assert_ne!(decoded.text, line);
    assert!(decoded.text.contains("First Class"));
    assert!(decoded.text.contains("Economy Class"));
    let forced = decoded
        .segments
        .iter()
        .map(|s| &decoded.text[s.range.0..s.range.1])
        .filter(|s| *s == "First Class" || *s == "Economy Class")
        .count();
    assert_eq!(forced, 2, "exactly two force-decoded tokens");
}

#[test]
fn test_phrase_fix_indices_deterministic() {
    init_env();
    let tokenizer = untrained(Options::default());
    let line = "pay this in cash now";
    let spans = vec![AnnotatedSpan::phrase_fix(12, 4, "Bargeld")];
    let one = tokenizer.encode_with(line, &spans, &[], 42).unwrap();
    let two = tokenizer.encode_with(line, &spans, &[], 42).unwrap();
    assert_eq!(one.tokens, two.tokens);
    let other = tokenizer.encode_with(line, &spans, &[], 43).unwrap();
    assert_eq!(one.tokens.len(), other.tokens.len());
}

#[test]
fn test_html_tag_spans_are_deleted() {
    init_env();
    let tokenizer = untrained(Options::default());
    let line = "Tag <b>bold</b> yeah<br>! W<b>o</b>rd <br> here.";
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(start) = line[from..].find('<') {
        let start = from + start;
        let end = start + line[start..].find('>').unwrap() + 1;
        spans.push(AnnotatedSpan::deletion(start, end - start));
        from = end;
    }
    let encoded = tokenizer.encode_with(line, &spans, &[], 0).unwrap();
    let decoded = tokenizer.decode_with(&encoded.tokens, Some(&encoded.package), None).unwrap();
    assert_eq!(decoded.text, "Tag bold yeah! Word  here.");
}

#[test]
fn test_encode_as_if_substitutes() {
    init_env();
    let tokenizer = untrained(Options::default());
    let line = "the colour here";
    let spans = vec![AnnotatedSpan::encode_as_if(4, 6, "color")];
    let encoded = tokenizer.encode_with(line, &spans, &[], 0).unwrap();
    let decoded = tokenizer.decode(&encoded.tokens).unwrap();
    assert_eq!(decoded.text, "the color here");
}

#[test]
fn test_inline_fixes_with_factors() {
    init_env();
    let tokenizer = untrained(Options { inline_fixes: true, ..Options::default() });
    let line = "pay in cash now";
    let spans = vec![AnnotatedSpan::phrase_fix(7, 4, "Bargeld")];
    let encoded = tokenizer.encode_with(line, &spans, &[], 0).unwrap();
    assert!(encoded.tokens.iter().any(|t| t.contains("|iw")), "source half is tagged");
    assert!(encoded.tokens.iter().any(|t| t.contains("|ir")), "replacement half is tagged");
    let decoded = tokenizer.decode_with(&encoded.tokens, Some(&encoded.package), None).unwrap();
    assert_eq!(decoded.text, "pay in Bargeld now");
}

#[test]
fn test_inline_fixes_with_tags() {
    init_env();
    let tokenizer = untrained(Options {
        inline_fixes: true,
        inline_fix_use_tags: true,
        ..Options::default()
    });
    let line = "pay in cash now";
    let spans = vec![AnnotatedSpan::phrase_fix(7, 4, "Bargeld")];
    let encoded = tokenizer.encode_with(line, &spans, &[], 0).unwrap();
    let open = encoded.tokens.iter().position(|t| t == "<IOPEN>").unwrap();
    let delim = encoded.tokens.iter().position(|t| t == "<IDELIM>").unwrap();
    let close = encoded.tokens.iter().position(|t| t == "<ICLOSE>").unwrap();
    assert!(open < delim && delim < close);
    let decoded = tokenizer.decode_with(&encoded.tokens, Some(&encoded.package), None).unwrap();
    assert_eq!(decoded.text, "pay in Bargeld now");
}

#[test]
fn test_digit_serialized_class_indices() {
    init_env();
    let tokenizer = untrained(Options {
        serialize_indices_and_unrepresentables: true,
        ..Options::default()
    });
    let line = "pay in cash now";
    let spans = vec![AnnotatedSpan::phrase_fix(7, 4, "Bargeld")];
    let encoded = tokenizer.encode_with(line, &spans, &[], 0).unwrap();
    assert!(encoded.tokens.iter().any(|t| t == "<#>"), "digit runs are terminated");
    assert!(
        encoded.tokens.iter().all(|t| !t.contains("|index")),
        "no index factors on the wire: {:?}",
        encoded.tokens
    );
    let decoded = tokenizer.decode_with(&encoded.tokens, Some(&encoded.package), None).unwrap();
    assert_eq!(decoded.text, "pay in Bargeld now");
}

#[test]
fn test_overlapping_spans_fail() {
    init_env();
    let tokenizer = untrained(Options::default());
    let spans = vec![
        AnnotatedSpan::phrase_fix(0, 5, "x"),
        AnnotatedSpan::phrase_fix(3, 4, "y"),
    ];
    assert!(tokenizer.encode_with("overlap here", &spans, &[], 0).is_err());
}

#[test]
fn test_wire_format_is_parseable() {
    init_env();
    let tokenizer = untrained(Options::default());
    let encoded = tokenizer.encode("Hello, world!  Mixed 你好 ९३.").unwrap();
    let line = encoded.line();
    let tokens: Vec<&str> = line.split(' ').collect();
    let decoded = tokenizer.decode(&tokens).unwrap();
    assert_eq!(decoded.text, "Hello, world!  Mixed 你好 ९३.");
}

#[test]
fn test_sentence_annotations() {
    init_env();
    let options = Options {
        sentence_annotations: vec![factok::SentenceAnnotationType {
            name:   "domain".to_string(),
            values: vec!["news".to_string(), "chat".to_string()],
        }],
        ..Options::default()
    };
    let tokenizer = untrained(options);
    let annotations = vec![("domain".to_string(), "news".to_string())];
    let encoded = tokenizer.encode_with("Hello there", &[], &annotations, 0).unwrap();
    assert_eq!(encoded.tokens[0], "<SLA:domain=news>");
    let decoded = tokenizer.decode(&encoded.tokens).unwrap();
    assert_eq!(decoded.text, "Hello there");
    let unknown = vec![("genre".to_string(), "news".to_string())];
    assert!(tokenizer.encode_with("Hello there", &[], &unknown, 0).is_err());
}

#[test]
fn test_decode_is_strict_about_factors() {
    init_env();
    let tokenizer = untrained(Options::default());
    assert!(tokenizer.decode(&["HELLO|zz"]).is_err());
    assert!(tokenizer.decode(&["\\xZZ|wb"]).is_err());
}

#[test]
fn test_alignment_projection() {
    init_env();
    use factok::{Alignment, AlignmentLink};
    let tokenizer = untrained(Options::default());
    let encoded = tokenizer.encode("Hello world").unwrap();
    assert_eq!(encoded.tokens.len(), 2);
    let alignment = Alignment::new(vec![
        AlignmentLink { source: 0, target: 1, confidence: 0.9 },
        AlignmentLink { source: 1, target: 0, confidence: 0.8 },
    ]);
    let decoded = tokenizer
        .decode_with(&encoded.tokens, Some(&encoded.package), Some(&alignment))
        .unwrap();
    assert_eq!(decoded.text, "Hello world");
    let segments = &decoded.segments;
    assert_eq!(segments[1].source_ranges, vec![(0, 5)]);
    assert_eq!(segments[0].source_ranges, vec![(6, 11)]);
}
