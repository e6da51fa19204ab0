use regex::Regex;
use std::sync::OnceLock;

/// Language reported when no signature matches
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Language given to code blocks without a tag
pub const PLAIN_TEXT: &str = "text";

/// Regex signatures of one language.
///
/// Every pattern is compiled in multi-line mode. A language scores one point
/// per pattern that matches anywhere in the content.
#[derive(Debug, Clone, Copy)]
pub struct LanguageSignature {
    pub language: &'static str,
    pub patterns: &'static [&'static str],
}

/// Signature table used for untagged code blocks.
///
/// Ties are broken by table order, so languages that extend another one
/// (TypeScript over JavaScript, C++ over C) come first.
pub const LANGUAGE_SIGNATURES: &[LanguageSignature] = &[
    LanguageSignature {
        language: "python",
        patterns: &[
            r"^\s*def \w+\(.*\)\s*(->\s*[\w\[\], .]+)?:\s*$",
            r"^\s*from [\w.]+ import ",
            r"^\s*class \w+(\(.*\))?:\s*$",
            r"\bself\.\w+",
            r"\b(None|True|False)\b",
            r"^\s*(elif|except)\b.*:\s*$",
            r"^\s*@\w+(\.\w+)*(\(.*\))?\s*$",
        ],
    },
    LanguageSignature {
        language: "rust",
        patterns: &[
            r"\bfn \w+(<[^>]*>)?\(",
            r"\blet (mut )?\w+(: [\w<>&]+)? = ",
            r"\b(pub(\(crate\))? )?(struct|enum|trait|impl)\b",
            r"\w+!\(",
            r"&(mut )?self\b",
            r"#\[(derive|cfg|test)",
            r"^\s*use [\w:]+(::\{[^}]*\})?;",
        ],
    },
    LanguageSignature {
        language: "typescript",
        patterns: &[
            r":\s*(string|number|boolean|any|void|unknown)\b",
            r"\binterface \w+\s*(extends [\w, ]+)?\{",
            r"^\s*(export )?type \w+\s*=",
            r"\bexport (default )?(class|interface|function|const|type)\b",
            r"\bimplements \w+",
            r"\b(private|public|readonly) \w+\s*:",
        ],
    },
    LanguageSignature {
        language: "javascript",
        patterns: &[
            r"\bfunction\s*\w*\s*\(",
            r"\b(const|let|var) \w+ = ",
            r"=>",
            r"\bconsole\.log\(",
            r#"\brequire\(['"]"#,
            r"\bmodule\.exports\b",
            r"\bdocument\.\w+",
        ],
    },
    LanguageSignature {
        language: "go",
        patterns: &[
            r"^\s*package \w+\s*$",
            r"\bfunc (\(\w+ \*?\w+\) )?\w+\(",
            r":=",
            r"\bfmt\.\w+\(",
            r"^\s*import \($",
            r"\b(chan|defer|go func)\b",
        ],
    },
    LanguageSignature {
        language: "java",
        patterns: &[
            r"\bpublic (static )?(final )?(class|void|interface)\b",
            r"\bSystem\.out\.print",
            r"@Override\b",
            r"^\s*import java\.",
            r"\bString\[\] args\b",
            r"\bprivate (final )?\w+(<[\w<>, ]+>)? \w+;",
        ],
    },
    LanguageSignature {
        language: "csharp",
        patterns: &[
            r"^\s*using System",
            r"\bConsole\.Write(Line)?\(",
            r"\{\s*get;\s*(set;)?\s*\}",
            r"\bvar \w+ = new\b",
            r"\bnamespace [\w.]+\s*[;{]?\s*$",
        ],
    },
    LanguageSignature {
        language: "cpp",
        patterns: &[
            r"^\s*#include\s*<\w+>",
            r"\bstd::\w+",
            r"\bcout\s*<<",
            r"\btemplate\s*<",
            r"\bnamespace \w+\s*\{",
        ],
    },
    LanguageSignature {
        language: "c",
        patterns: &[
            r"^\s*#include\s*<\w+\.h>",
            r"\bint main\s*\(",
            r"\bprintf\(",
            r"\b(malloc|free)\(",
            r"\b(unsigned|struct) \w+",
        ],
    },
    LanguageSignature {
        language: "ruby",
        patterns: &[
            r"^\s*def \w+[?!]?(\(.*\))?\s*$",
            r"^\s*end\s*$",
            r"\bputs\b",
            r"\battr_(accessor|reader|writer)\b",
            r"\.each do \|",
            r#"^\s*require ['"]"#,
        ],
    },
    LanguageSignature {
        language: "bash",
        patterns: &[
            r"^#!/(usr/)?bin/(env )?(ba)?sh",
            r"^\s*(sudo|apt|apt-get|brew|npm|pip|cargo|git|cd|export|echo) ",
            r"\$\{?[A-Za-z_]\w*\}?",
            r"^\s*(if \[|fi$|then$|done$)",
            r"\|\s*(grep|awk|sed|xargs)\b",
        ],
    },
    LanguageSignature {
        language: "sql",
        patterns: &[
            r"(?i)^\s*select\b.+\bfrom\b",
            r"(?i)^\s*(insert into|update \w+ set|delete from)\b",
            r"(?i)^\s*create (table|index|view)\b",
            r"(?i)\bwhere\b.+=",
            r"(?i)\b(inner|left|right|outer) join\b",
        ],
    },
    LanguageSignature {
        language: "html",
        patterns: &[
            r"(?i)<!DOCTYPE html>",
            r"</?(div|span|body|head|html|ul|li|table|section)\b[^>]*>",
            r#"<\w+ (class|id|href|src)=""#,
        ],
    },
    LanguageSignature {
        language: "css",
        patterns: &[
            r"^\s*[.#]?[\w-]+(\s*[>+~]?\s*[.#]?[\w-]+)*\s*\{\s*$",
            r"^\s*[\w-]+:\s*[^;]+;\s*$",
            r"@media\b",
            r"\b\d+(px|em|rem|vh|vw)\b",
        ],
    },
    LanguageSignature {
        language: "json",
        patterns: &[
            r#""[\w-]+"\s*:\s*("|\d|\{|\[|true|false|null)"#,
            r"^\s*[\[{]\s*$",
        ],
    },
    LanguageSignature {
        language: "yaml",
        patterns: &[
            r"^\s*[\w-]+:\s*$",
            r"^\s*- [\w-]+:",
            r"^[\w-]+: [^{;]+$",
            r"^---\s*$",
        ],
    },
    LanguageSignature {
        language: "dml",
        patterns: &[
            r"^\s*dml \d+\.\d+;",
            r"^\s*device \w+;",
            r"\b(bank|register|field|attribute|connect|implement) \w+",
        ],
    },
];

fn compiled_signatures() -> &'static [(&'static str, Vec<Regex>)] {
    static COMPILED: OnceLock<Vec<(&'static str, Vec<Regex>)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        LANGUAGE_SIGNATURES
            .iter()
            .map(|signature| {
                let patterns = signature
                    .patterns
                    .iter()
                    .filter_map(|pattern| match Regex::new(&format!("(?m){pattern}")) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            log::warn!(
                                "Skipping invalid {} signature {pattern:?}: {e}",
                                signature.language
                            );
                            None
                        }
                    })
                    .collect();
                (signature.language, patterns)
            })
            .collect()
    })
}

/// Score `content` against every language signature, in table order
#[must_use]
pub fn score_languages(content: &str) -> Vec<(&'static str, usize)> {
    compiled_signatures()
        .iter()
        .map(|(language, patterns)| {
            let score = patterns.iter().filter(|re| re.is_match(content)).count();
            (*language, score)
        })
        .collect()
}

/// Best-scoring language for `content`, or [`UNKNOWN_LANGUAGE`]
#[must_use]
pub fn detect_language(content: &str) -> &'static str {
    let mut best = (UNKNOWN_LANGUAGE, 0);
    for (language, score) in score_languages(content) {
        if score > best.1 {
            best = (language, score);
        }
    }
    best.0
}

/// Language of a code block: the explicit tag when it carries information,
/// otherwise the signature-table guess
#[must_use]
pub fn resolve_language(tag: &str, content: &str) -> String {
    let tag = tag.trim();
    if tag.is_empty()
        || tag.eq_ignore_ascii_case(UNKNOWN_LANGUAGE)
        || tag.eq_ignore_ascii_case(PLAIN_TEXT)
    {
        return detect_language(content).to_string();
    }
    normalize_tag(tag)
}

/// Canonical name for a fence info tag
#[must_use]
pub fn normalize_tag(tag: &str) -> String {
    let tag = tag
        .trim()
        .trim_start_matches(['{', '.'])
        .trim_end_matches('}')
        .to_lowercase();
    let canonical = match tag.as_str() {
        "" | "txt" | "plain" | "plaintext" => PLAIN_TEXT,
        "py" | "py3" | "python3" => "python",
        "rs" => "rust",
        "js" | "mjs" | "cjs" | "node" => "javascript",
        "ts" | "tsx" => "typescript",
        "golang" => "go",
        "c++" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" | "c#" => "csharp",
        "rb" => "ruby",
        "sh" | "shell" | "zsh" | "console" => "bash",
        "yml" => "yaml",
        "kt" | "kts" => "kotlin",
        other => return other.to_string(),
    };
    canonical.to_string()
}

fn version_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_+#-]*)\s+v?(\d+(?:\.\d+)+)\s*;?\s*$")
            .expect("version line regex is valid")
    })
}

/// Language named by a version declaration such as `dml 1.4;`
#[must_use]
pub fn language_from_version_line(line: &str) -> Option<String> {
    version_line_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_lowercase())
}
