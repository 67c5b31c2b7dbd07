//! Structural input sanitizer.
//!
//! Walks parsed request data (JSON documents, query/form pairs, plain text)
//! and applies the request rule chain to every string. The walk is total:
//! it never fails, and anything it cannot handle safely is replaced by a
//! placeholder instead of being passed through.

use std::collections::HashSet;

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::SanitizeConfig;
use crate::sanitize::detect::{self, ThreatKind};
use crate::sanitize::filename::sanitize_filename;
use crate::sanitize::rules::{strip_control, truncate, RuleChain};

/// Sanitizer built from [`SanitizeConfig`].
#[derive(Debug, Clone)]
pub struct InputSanitizer {
    chain: RuleChain,
    max_string_length: usize,
    max_depth: usize,
    detect_injection: bool,
    skip_fields: HashSet<String>,
    filename_fields: HashSet<String>,
    identity_fields: HashSet<String>,
}

impl InputSanitizer {
    pub fn new(config: &SanitizeConfig) -> Self {
        Self {
            chain: RuleChain::for_request_text(config.max_string_length, config.strip_sql_meta),
            max_string_length: config.max_string_length,
            max_depth: config.max_depth,
            detect_injection: config.detect_injection,
            skip_fields: lowercase_set(&config.skip_fields),
            filename_fields: lowercase_set(&config.filename_fields),
            identity_fields: lowercase_set(&config.identity_fields),
        }
    }

    /// Whether values under this key are left untouched.
    pub fn is_skipped(&self, key: &str) -> bool {
        self.skip_fields.contains(&key.to_lowercase())
    }

    fn is_filename(&self, key: &str) -> bool {
        self.filename_fields.contains(&key.to_lowercase())
    }

    fn is_identity(&self, key: &str) -> bool {
        self.identity_fields.contains(&key.to_lowercase())
    }

    /// Identifiers compared verbatim downstream (login emails) keep their
    /// characters; they only lose control characters and excess length.
    fn sanitize_identity(&self, input: &str) -> String {
        truncate(&strip_control(input, false), self.max_string_length)
    }

    /// Run the request chain over a single string.
    pub fn sanitize_str(&self, input: &str) -> String {
        self.chain.apply(input)
    }

    /// Object keys only lose control characters and excess length; escaping
    /// them would break deserialization into the handler's types. Field
    /// rules are picked from the cleaned key, the name the handler sees.
    pub fn sanitize_key(&self, key: &str) -> String {
        truncate(&strip_control(key, false), self.max_string_length)
    }

    /// Sanitize a JSON document. Subtrees nested deeper than the configured
    /// limit become `null`. When several keys clean to the same name, the
    /// first one in document order wins.
    pub fn sanitize_value(&self, value: Value) -> Value {
        self.sanitize_value_at(value, 0)
    }

    fn sanitize_value_at(&self, value: Value, depth: usize) -> Value {
        if depth > self.max_depth {
            return Value::Null;
        }
        match value {
            Value::String(s) => Value::String(self.sanitize_str(&s)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.sanitize_value_at(item, depth + 1))
                    .collect(),
            ),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    let key = self.sanitize_key(&key);
                    if out.contains_key(&key) {
                        continue;
                    }
                    let cleaned = if self.is_skipped(&key) {
                        item
                    } else {
                        match item {
                            Value::String(s) if self.is_filename(&key) => {
                                Value::String(sanitize_filename(&s))
                            }
                            Value::String(s) if self.is_identity(&key) => {
                                Value::String(self.sanitize_identity(&s))
                            }
                            other => self.sanitize_value_at(other, depth + 1),
                        }
                    };
                    out.insert(key, cleaned);
                }
                Value::Object(out)
            }
            primitive @ (Value::Null | Value::Bool(_) | Value::Number(_)) => primitive,
        }
    }

    /// Sanitize decoded `key=value` pairs from a query string or form body.
    pub fn sanitize_pairs(&self, pairs: Vec<(String, String)>) -> Vec<(String, String)> {
        pairs
            .into_iter()
            .map(|(key, value)| {
                let key = self.sanitize_key(&key);
                let cleaned = if self.is_skipped(&key) {
                    value
                } else if self.is_filename(&key) {
                    sanitize_filename(&value)
                } else if self.is_identity(&key) {
                    self.sanitize_identity(&value)
                } else {
                    self.sanitize_str(&value)
                };
                (key, cleaned)
            })
            .collect()
    }

    /// Decode, sanitize and re-encode an `application/x-www-form-urlencoded`
    /// string (query strings use the same encoding).
    pub fn sanitize_urlencoded(&self, encoded: &str) -> String {
        let pairs = decode_pairs(encoded);
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.sanitize_pairs(pairs) {
            serializer.append_pair(&key, &value);
        }
        serializer.finish()
    }

    /// Injection scan over a JSON document, honouring skip fields.
    pub fn scan_value(&self, value: &Value) -> Option<ThreatKind> {
        if !self.detect_injection {
            return None;
        }
        detect::scan_value(
            value,
            &|key: &str| self.is_skipped(&self.sanitize_key(key)),
            self.max_depth,
        )
    }

    /// Injection scan over urlencoded data, honouring skip fields.
    pub fn scan_urlencoded(&self, encoded: &str) -> Option<ThreatKind> {
        if !self.detect_injection {
            return None;
        }
        decode_pairs(encoded)
            .iter()
            .filter(|(key, _)| !self.is_skipped(&self.sanitize_key(key)))
            .find_map(|(key, value)| detect::detect(key).or_else(|| detect::detect(value)))
    }

    /// Injection scan over free text.
    pub fn scan_text(&self, text: &str) -> Option<ThreatKind> {
        if !self.detect_injection {
            return None;
        }
        detect::detect(text)
    }

    /// Injection scan over the request path.
    pub fn scan_path(&self, path: &str) -> Option<ThreatKind> {
        if !self.detect_injection {
            return None;
        }
        detect::detect_in_path(path)
    }
}

impl Default for InputSanitizer {
    fn default() -> Self {
        Self::new(&SanitizeConfig::default())
    }
}

fn lowercase_set(values: &[String]) -> HashSet<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

fn decode_pairs(encoded: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(encoded.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
