//! Renaming of submitted public classes.
//!
//! Each source unit's `public class X` becomes `public class U{user}_{ts}`
//! (with an `_{i}` suffix when an archive carries several units) and the file
//! is renamed to match. References to a renamed class from any unit of the
//! same submission are rewritten too, so multi-file archives still compile.
//! String and char literals and comments are never touched.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static PUBLIC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+(?:(?:final|abstract)\s+)*class\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .expect("valid regex")
});

static ENTRY_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+static\s+void\s+main\s*\(").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// File name the unit is written under (`{class}.java`).
    pub file_name: String,
    /// Class the unit declares after renaming, if it declares a public one.
    pub class_name: Option<String>,
    pub source: String,
}

impl SourceUnit {
    pub fn has_entry_point(&self) -> bool {
        ENTRY_POINT.is_match(&self.source)
    }
}

/// Prefix shared by every class of one invocation.
pub fn class_base(user_id: &str, invocation_millis: i64) -> String {
    let user: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("U{user}_{invocation_millis}")
}

/// Renames the public class of every `(original file name, source)` pair.
pub fn normalize_sources(base: &str, raw: Vec<(String, String)>) -> Vec<SourceUnit> {
    let multi = raw.len() > 1;
    let mut renames: HashMap<String, String> = HashMap::new();
    let mut staged = Vec::with_capacity(raw.len());

    for (i, (file_name, source)) in raw.into_iter().enumerate() {
        let new_name = if multi {
            format!("{base}_{i}")
        } else {
            base.to_string()
        };
        let masked = mask_non_code(&source);
        let old_name = PUBLIC_CLASS
            .captures(&masked)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        if let Some(old) = &old_name {
            renames.insert(old.clone(), new_name.clone());
        }
        staged.push((file_name, old_name.map(|_| new_name), source, masked));
    }

    let reference = rename_pattern(&renames);
    staged
        .into_iter()
        .map(|(file_name, class_name, source, masked)| {
            let source = match &reference {
                Some(re) => rewrite_code(re, &renames, &source, &masked),
                None => source,
            };
            let file_name = match &class_name {
                Some(class) => format!("{class}.java"),
                None => file_name,
            };
            SourceUnit {
                file_name,
                class_name,
                source,
            }
        })
        .collect()
}

fn rename_pattern(renames: &HashMap<String, String>) -> Option<Regex> {
    if renames.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = renames.keys().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).ok()
}

/// Replaces matches found in `masked` at the same byte offsets of `source`.
fn rewrite_code(
    re: &Regex,
    renames: &HashMap<String, String>,
    source: &str,
    masked: &str,
) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for m in re.find_iter(masked) {
        let Some(new) = renames.get(m.as_str()) else {
            continue;
        };
        out.push_str(&source[last..m.start()]);
        out.push_str(new);
        last = m.end();
    }
    out.push_str(&source[last..]);
    out
}

/// Copy of `source` with the bytes of comments and string, text block and
/// char literals blanked to spaces. Byte offsets line up with `source`.
fn mask_non_code(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    while i < bytes.len() {
        let end = match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                find_from(bytes, i + 2, b"\n").unwrap_or(bytes.len())
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                find_from(bytes, i + 2, b"*/").map_or(bytes.len(), |j| j + 2)
            }
            b'"' if bytes[i..].starts_with(b"\"\"\"") => literal_end(bytes, i + 3, b"\"\"\""),
            b'"' => literal_end(bytes, i + 1, b"\""),
            b'\'' => literal_end(bytes, i + 1, b"'"),
            _ => {
                i += 1;
                continue;
            }
        };
        out[i..end].fill(b' ');
        i = end;
    }
    // Every blanked span starts and ends on an ASCII delimiter.
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

fn find_from(bytes: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(start..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + start)
}

/// End (exclusive) of a literal whose body starts at `start`. Single-line
/// literals stop at an unescaped newline when left unterminated.
fn literal_end(bytes: &[u8], start: usize, close: &[u8]) -> usize {
    let single_line = close.len() == 1;
    let mut j = start;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' if single_line => return j,
            _ if bytes[j..].starts_with(close) => return j + close.len(),
            _ => j += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_takes_the_base_name() {
        let units = normalize_sources(
            "U42_1700000000000",
            vec![(
                "Main.java".into(),
                "public class Main {\n  public Main() {}\n  public static void main(String[] a) {}\n}".into(),
            )],
        );

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].file_name, "U42_1700000000000.java");
        assert_eq!(units[0].class_name.as_deref(), Some("U42_1700000000000"));
        assert!(units[0].source.contains("public class U42_1700000000000 {"));
        assert!(units[0].source.contains("public U42_1700000000000() {}"));
        assert!(units[0].has_entry_point());
    }

    #[test]
    fn literals_and_comments_keep_the_old_name() {
        let units = normalize_sources(
            "U42_1",
            vec![(
                "Hello.java".into(),
                concat!(
                    "// Hello prints its own name\n",
                    "public class Hello {\n",
                    "  /* new Hello() is never needed */\n",
                    "  static char q = '\"';\n",
                    "  public static void main(String[] a) {\n",
                    "    Hello h = new Hello();\n",
                    "    System.out.println(\"Hello \\\"Hello\\\"\");\n",
                    "    System.out.println(\"\"\"\n      Hello\n      \"\"\");\n",
                    "  }\n",
                    "}\n",
                )
                .into(),
            )],
        );

        let src = &units[0].source;
        assert!(src.contains("public class U42_1 {"));
        assert!(src.contains("U42_1 h = new U42_1();"));
        assert!(src.contains("// Hello prints its own name"));
        assert!(src.contains("/* new Hello() is never needed */"));
        assert!(src.contains("println(\"Hello \\\"Hello\\\"\")"));
        assert!(src.contains("      Hello\n"));
    }

    #[test]
    fn declaration_inside_a_comment_is_ignored() {
        let units = normalize_sources(
            "U1_1",
            vec![(
                "Main.java".into(),
                "/* public class Old */ public class Main { String s = \"public class Fake\"; }".into(),
            )],
        );
        assert!(units[0].source.contains("/* public class Old */ public class U1_1 {"));
        assert!(units[0].source.contains("\"public class Fake\""));
    }

    #[test]
    fn archive_units_are_indexed_and_cross_referenced() {
        let units = normalize_sources(
            "U7_1",
            vec![
                ("Helper.java".into(), "public class Helper { static int two() { return 2; } }".into()),
                (
                    "App.java".into(),
                    "public class App { public static void main(String[] a) { System.out.println(Helper.two()); } }".into(),
                ),
            ],
        );

        assert_eq!(units[0].file_name, "U7_1_0.java");
        assert_eq!(units[1].file_name, "U7_1_1.java");
        assert!(units[1].source.contains("U7_1_0.two()"));
        assert!(!units[0].has_entry_point());
        assert!(units[1].has_entry_point());
    }

    #[test]
    fn units_without_public_class_keep_their_name() {
        let units = normalize_sources(
            "U1_1",
            vec![("Util.java".into(), "class Util {}".into())],
        );
        assert_eq!(units[0].file_name, "Util.java");
        assert_eq!(units[0].class_name, None);
    }

    #[test]
    fn identifiers_sharing_a_prefix_are_untouched() {
        let units = normalize_sources(
            "U1_1",
            vec![("Main.java".into(), "public class Main { int MainValue = 1; }".into())],
        );
        assert!(units[0].source.contains("int MainValue = 1;"));
    }

    #[test]
    fn class_base_is_a_valid_identifier() {
        assert_eq!(class_base("123-45", 99), "U123_45_99");
    }
}
