//! Text clean-up applied to completion output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest excerpt quoted in parse errors, ellipsis included.
pub const EXCERPT_LIMIT: usize = 200;

static FENCED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A\s*```[A-Za-z0-9_+.\-]*[ \t]*\r?\n(.*?)\r?\n?[ \t]*```\s*\z")
        .expect("fence regex should be valid")
});

static OPEN_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\A\s*```[A-Za-z0-9_+.\-]*[ \t]*\r?\n").expect("open fence regex should be valid")
});

static DRAFT_TRUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?mi)^([ \t]*draft[ \t]*[:=][ \t]*)["']?true["']?[ \t]*(\r?)$"#)
        .expect("draft regex should be valid")
});

/// Removes a code fence wrapped around the whole text.
///
/// The opening fence may carry a language tag in any case. An opening fence
/// without a closing one is dropped as well.
pub fn strip_code_fences(text: &str) -> &str {
    if let Some(inner) = FENCED.captures(text).and_then(|caps| caps.get(1)) {
        return inner.as_str().trim();
    }
    if let Some(open) = OPEN_FENCE.find(text) {
        return text[open.end()..].trim();
    }
    text.trim()
}

/// Rewrites `draft: true` (YAML) or `draft = true` (TOML) in the frontmatter
/// block to `false`. The body is left alone.
pub fn force_draft_false(content: &str) -> String {
    match split_frontmatter(content) {
        Some((front, body)) => {
            let mut out = DRAFT_TRUE.replace_all(front, "${1}false${2}").into_owned();
            out.push_str(body);
            out
        }
        None => content.to_string(),
    }
}

/// Splits `content` after the closing frontmatter delimiter.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let delimiter = ["---", "+++"].into_iter().find(|d| content.starts_with(d))?;
    let body_start = content.find('\n')? + 1;
    let closing = format!("\n{delimiter}");
    let close = content[body_start - 1..].find(&closing)? + body_start - 1;
    Some(content.split_at(close + closing.len()))
}

/// At most [`EXCERPT_LIMIT`] characters of `text`, ending in `...` when cut.
pub fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= EXCERPT_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(EXCERPT_LIMIT - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```JSON\n{}\n```  \n"), "{}");
        assert_eq!(strip_code_fences("```\nplain\n```"), "plain");
        assert_eq!(strip_code_fences("```markdown\n---\ntitle: x\n---\nbody"), "---\ntitle: x\n---\nbody");
        assert_eq!(strip_code_fences("no fences here"), "no fences here");
    }

    #[test]
    fn test_inner_fences_survive() {
        let text = "```markdown\n# Title\n\n```rust\nfn main() {}\n```\n\nEnd\n```";
        assert_eq!(strip_code_fences(text), "# Title\n\n```rust\nfn main() {}\n```\n\nEnd");
    }

    #[test]
    fn test_force_draft_false_in_frontmatter_only() {
        let doc = "---\ntitle: Hi\ndraft: true\n---\nSet draft: true in your config.\n";
        let fixed = force_draft_false(doc);
        assert_eq!(fixed, "---\ntitle: Hi\ndraft: false\n---\nSet draft: true in your config.\n");

        let toml = "+++\nDraft = \"true\"\n+++\nbody";
        assert_eq!(force_draft_false(toml), "+++\nDraft = false\n+++\nbody");

        assert_eq!(force_draft_false("no frontmatter\ndraft: true"), "no frontmatter\ndraft: true");
    }

    #[test]
    fn test_excerpt_is_bounded() {
        assert_eq!(excerpt("short"), "short");
        let long = "x".repeat(500);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_LIMIT);
        assert!(cut.ends_with("..."));
    }
}
