//! String sanitization rules and the ordered chain that composes them.
//!
//! Every rule is a pure `&str -> String` transform and is idempotent on its
//! own output. The chain order is fixed: control stripping, SQL comment
//! stripping, HTML neutralization, then length bounding.

/// Entities produced by [`escape_html`]. Used to avoid leaving half an entity
/// behind when a string is truncated.
const HTML_ENTITIES: [&str; 4] = ["&lt;", "&gt;", "&quot;", "&#x27;"];

/// Sequences removed by [`strip_sql_meta`].
const SQL_META_SEQUENCES: [&str; 3] = ["--", "/*", "*/"];

/// A single sanitization step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizationRule {
    /// Remove control characters and NUL bytes. When `keep_whitespace` is
    /// set, tab, line feed and carriage return survive.
    StripControl { keep_whitespace: bool },
    /// Remove SQL comment openers/closers and backslashes.
    StripSqlMeta,
    /// Replace `<`, `>`, `"` and `'` with HTML entities.
    EscapeHtml,
    /// Bound the string to this many characters.
    Truncate(usize),
}

impl SanitizationRule {
    pub fn apply(&self, input: &str) -> String {
        match self {
            SanitizationRule::StripControl { keep_whitespace } => {
                strip_control(input, *keep_whitespace)
            }
            SanitizationRule::StripSqlMeta => strip_sql_meta(input),
            SanitizationRule::EscapeHtml => escape_html(input),
            SanitizationRule::Truncate(max) => truncate(input, *max),
        }
    }
}

/// Ordered list of rules applied left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleChain {
    rules: Vec<SanitizationRule>,
}

impl RuleChain {
    pub fn new(rules: Vec<SanitizationRule>) -> Self {
        Self { rules }
    }

    /// Chain used for request body, query and form values.
    pub fn for_request_text(max_length: usize, strip_sql: bool) -> Self {
        let mut rules = vec![SanitizationRule::StripControl {
            keep_whitespace: true,
        }];
        if strip_sql {
            rules.push(SanitizationRule::StripSqlMeta);
        }
        rules.push(SanitizationRule::EscapeHtml);
        rules.push(SanitizationRule::Truncate(max_length));
        Self { rules }
    }

    pub fn rules(&self) -> &[SanitizationRule] {
        &self.rules
    }

    pub fn apply(&self, input: &str) -> String {
        let mut current = input.to_string();
        for rule in &self.rules {
            current = rule.apply(&current);
        }
        current
    }
}

/// True for characters that can reorder or hide text when rendered.
fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{200E}' | '\u{200F}')
}

/// Remove control characters (including NUL) and bidi overrides.
pub fn strip_control(input: &str, keep_whitespace: bool) -> String {
    input
        .chars()
        .filter(|c| {
            if keep_whitespace && matches!(c, '\t' | '\n' | '\r') {
                return true;
            }
            !c.is_control() && !is_bidi_control(*c)
        })
        .collect()
}

/// Remove SQL comment markers and backslashes until none are left.
///
/// Removal can splice new markers together (`-/**/-` becomes `--`), so the
/// pass repeats until it reaches a fixed point.
pub fn strip_sql_meta(input: &str) -> String {
    let mut current = input.replace('\\', "");
    loop {
        let mut next = current.clone();
        for seq in SQL_META_SEQUENCES {
            next = next.replace(seq, "");
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Neutralize markup characters.
///
/// `&` is deliberately left as is: escaping it would turn `&lt;` into
/// `&amp;lt;` on a second pass.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Bound `input` to `max_chars` characters, dropping a trailing partial
/// entity left by the cut.
pub fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars).collect();
    if let Some(idx) = out.rfind('&') {
        let tail = &out[idx..];
        if HTML_ENTITIES
            .iter()
            .any(|entity| entity.len() > tail.len() && entity.starts_with(tail))
        {
            out.truncate(idx);
        }
    }
    out
}
