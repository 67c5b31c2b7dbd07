//! Injection detection heuristics.
//!
//! These are keyword/regex checks run on raw input before it is rewritten.
//! They produce false positives (legitimate text that mentions SQL keywords)
//! and miss obfuscated payloads. Parameterized queries and output encoding in
//! the data layer remain the real defense; a hit here only lets the request
//! layer refuse obvious attacks early.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Kind of injection a detector matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    PathTraversal,
    SqlInjection,
    Xss,
}

impl ThreatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatKind::PathTraversal => "path_traversal",
            ThreatKind::SqlInjection => "sql_injection",
            ThreatKind::Xss => "xss",
        }
    }
}

impl std::fmt::Display for ThreatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static detection pattern must compile"))
        .collect()
}

static SQL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\bunion\b(\s+all)?\s+\bselect\b",
        r"(?i)\bselect\b[\s\S]+\bfrom\b",
        r"(?i)\binsert\s+into\b[\s\S]+\bvalues\b",
        r"(?i)\b(drop|truncate|alter)\s+(table|database)\b",
        r"(?i)\bdelete\s+from\b",
        r"(?i)\bupdate\b\s+\w+\s+\bset\b",
        r#"(?i)['"]\s*(or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+"#,
        r#"['"]\s*(--|#|/\*)"#,
        r"(?i);\s*(drop|delete|insert|update|select|exec)\b",
        r"(?i)\b(sleep|benchmark|pg_sleep)\s*\(",
        r"(?i)\bwaitfor\s+delay\b",
    ])
});

static XSS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)<\s*/?\s*script\b",
        r"(?i)(javascript|vbscript)\s*:",
        r"(?i)\bon(error|load|click|mouseover|mouseenter|focus|blur|submit|change|input|keydown|keyup|animationstart)\s*=",
        r"(?i)<\s*(iframe|object|embed|svg|meta|base|link|style)\b",
        r"(?i)data\s*:\s*text/html",
        r"(?i)\bexpression\s*\(",
        r"(?i)%3c\s*script",
    ])
});

static PATH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(\.\./|\.\.\\)",
        r"(?i)%2e%2e(%2f|%5c|/|\\)",
        r"(?i)\.\.(%2f|%5c)",
        r"(?i)%00",
    ])
});

/// Heuristic SQL injection check.
pub fn detect_sql_injection(input: &str) -> bool {
    SQL_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Heuristic cross-site scripting check.
pub fn detect_xss(input: &str) -> bool {
    XSS_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Heuristic path traversal check, including percent-encoded forms.
pub fn detect_path_traversal(input: &str) -> bool {
    PATH_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Run every detector; path traversal is reported first, then SQL, then XSS.
pub fn detect(input: &str) -> Option<ThreatKind> {
    if detect_path_traversal(input) {
        Some(ThreatKind::PathTraversal)
    } else if detect_sql_injection(input) {
        Some(ThreatKind::SqlInjection)
    } else if detect_xss(input) {
        Some(ThreatKind::Xss)
    } else {
        None
    }
}

/// Detectors applicable to a URL path. SQL keywords are common in slugs, so
/// only traversal and script injection are checked.
pub fn detect_in_path(path: &str) -> Option<ThreatKind> {
    if detect_path_traversal(path) {
        Some(ThreatKind::PathTraversal)
    } else if detect_xss(path) {
        Some(ThreatKind::Xss)
    } else {
        None
    }
}

/// Scan every key and string value of a JSON document.
///
/// `skip` decides which object keys are exempt (their whole subtree is
/// ignored). Nesting past `max_depth` is not scanned; the sanitizer replaces
/// such subtrees anyway.
pub fn scan_value<F>(value: &Value, skip: &F, max_depth: usize) -> Option<ThreatKind>
where
    F: Fn(&str) -> bool,
{
    scan_value_at(value, skip, max_depth, 0)
}

fn scan_value_at<F>(value: &Value, skip: &F, max_depth: usize, depth: usize) -> Option<ThreatKind>
where
    F: Fn(&str) -> bool,
{
    if depth > max_depth {
        return None;
    }
    match value {
        Value::String(s) => detect(s),
        Value::Array(items) => items
            .iter()
            .find_map(|item| scan_value_at(item, skip, max_depth, depth + 1)),
        Value::Object(map) => map.iter().find_map(|(key, item)| {
            if skip(key) {
                return None;
            }
            detect(key).or_else(|| scan_value_at(item, skip, max_depth, depth + 1))
        }),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_skip(_: &str) -> bool {
        false
    }

    #[test]
    fn test_sql_patterns() {
        assert!(detect_sql_injection("1 UNION SELECT password FROM users"));
        assert!(detect_sql_injection("' or 1=1"));
        assert!(detect_sql_injection("admin'--"));
        assert!(detect_sql_injection("x'; DROP TABLE orders"));
        assert!(detect_sql_injection("1; select pg_sleep(5)"));
        assert!(detect_sql_injection("'; WAITFOR DELAY '0:0:5'"));
        assert!(!detect_sql_injection("Please select a size for delivery"));
        assert!(!detect_sql_injection("user@example.com"));
    }

    #[test]
    fn test_xss_patterns() {
        assert!(detect_xss("<script>alert(1)</script>"));
        assert!(detect_xss("<img src=x onerror=alert(1)>"));
        assert!(detect_xss("javascript:alert(document.cookie)"));
        assert!(detect_xss("<svg/onload=alert(1)>"));
        assert!(detect_xss("%3Cscript%3E"));
        assert!(!detect_xss("online delivery available"));
        assert!(!detect_xss("5 < 6 and 7 > 3"));
    }

    #[test]
    fn test_path_traversal_patterns() {
        assert!(detect_path_traversal("../../etc/passwd"));
        assert!(detect_path_traversal("..\\boot.ini"));
        assert!(detect_path_traversal("%2e%2e%2fetc"));
        assert!(detect_path_traversal("..%2fetc"));
        assert!(detect_path_traversal("file%00.png"));
        assert!(!detect_path_traversal("/api/v1/products/12"));
    }

    #[test]
    fn test_detect_priority() {
        assert_eq!(detect("../x' or 1=1"), Some(ThreatKind::PathTraversal));
        assert_eq!(detect("' or 1=1 <script>"), Some(ThreatKind::SqlInjection));
        assert_eq!(detect("<script>"), Some(ThreatKind::Xss));
        assert_eq!(detect("Blue kettle, 1.7L"), None);
    }

    #[test]
    fn test_detect_in_path_ignores_sql_keywords() {
        assert_eq!(detect_in_path("/api/select-from-catalog"), None);
        assert_eq!(detect_in_path("/static/../../secret"), Some(ThreatKind::PathTraversal));
    }

    #[test]
    fn test_scan_value_walks_nested_documents() {
        let doc = json!({
            "name": "Kettle",
            "tags": ["kitchen", {"note": "<script>x</script>"}],
        });
        assert_eq!(scan_value(&doc, &no_skip, 16), Some(ThreatKind::Xss));

        let clean = json!({"qty": 2, "notes": null, "gift": true});
        assert_eq!(scan_value(&clean, &no_skip, 16), None);
    }

    #[test]
    fn test_scan_value_honours_skip_and_keys() {
        let doc = json!({"password": "' or 1=1"});
        assert_eq!(scan_value(&doc, &|k: &str| k == "password", 16), None);

        let doc = json!({"<script>": 1});
        assert_eq!(scan_value(&doc, &no_skip, 16), Some(ThreatKind::Xss));
    }

    #[test]
    fn test_scan_value_stops_at_depth() {
        let doc = json!({"a": {"b": {"c": "<script>"}}});
        assert_eq!(scan_value(&doc, &no_skip, 1), None);
        assert_eq!(scan_value(&doc, &no_skip, 3), Some(ThreatKind::Xss));
    }
}
