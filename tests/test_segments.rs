mod util;

use factok::{segments, Options};
use util::init_env;

fn count(line: &str) -> usize {
    segments(line, &Options::default()).len()
}

#[test]
fn test_reserved_delimiter_run() {
    init_env();
    assert_eq!(count("-<<<>>>{{{}}}"), 9);
}

#[test]
fn test_mixed_sentence() {
    init_env();
    let line = "1°C! This is a test, iPods cost    $3.14, or ९३ or 二十 at 13¾°C, for \
                camelCase, PascalCase, and NSStrings, plus a longword.";
    assert_eq!(count(line), 70);
}

#[test]
fn test_devanagari_digits() {
    init_env();
    let line = "२०१४ से २०१९ तक";
    assert_eq!(count(line), 13);
    let digits = segments(line, &Options::default())
        .iter()
        .map(|&(start, end)| &line[start..end])
        .filter(|part| part.chars().all(|c| c.is_numeric()))
        .count();
    assert_eq!(digits, 8, "every Devanagari digit is its own segment");
}

#[test]
fn test_segments_tile_the_line() {
    init_env();
    for line in [
        "Tag <b>bold</b> yeah<br>! W<b>o</b>rd <br> here.",
        "They sent a tax to Ayodhya because we had defeated them.",
        "1°C!  येह ठीक  है 你好",
        " ",
        "",
    ] {
        let parts = segments(line, &Options::default());
        let mut covered = 0;
        for (start, end) in parts {
            assert_eq!(start, covered, "segments tile {:?}", line);
            assert!(end > start || line.is_empty());
            covered = end;
        }
        assert_eq!(covered, line.len());
    }
}

#[test]
fn test_determinism() {
    init_env();
    let line = "This is a test, iPods cost $3.14 at 13¾°C.";
    let first = segments(line, &Options::default());
    for _ in 0..3 {
        assert_eq!(segments(line, &Options::default()), first);
    }
}
