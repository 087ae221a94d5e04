//! Configuration validation.
//!
//! Detects unknown/misspelled fields and bridge wiring mistakes that would
//! otherwise only surface as silently unbridged messages at runtime.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
};

use crate::schema::LightningConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "bridge", "content",
    /// "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "bridges[0].channels[1]"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Array(Box<KnownKeys>),
    /// Free-form subtree (plugin settings) or scalar.
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Struct};

    let channel = Struct(HashMap::from([("platform", Leaf), ("channel", Leaf)]));

    Struct(HashMap::from([
        ("database", Struct(HashMap::from([("path", Leaf)]))),
        (
            "bridges",
            Array(Box::new(Struct(HashMap::from([
                ("name", Leaf),
                ("channels", Array(Box::new(channel))),
            ])))),
        ),
        (
            "content",
            Struct(HashMap::from([
                ("max_content_chars", Leaf),
                ("attachment_quota_mb", Leaf),
                ("sticker_probe_timeout_secs", Leaf),
            ])),
        ),
        ("plugins", Leaf),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, excluding exact matches.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered default.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => crate::loader::find_or_default_config_path(),
    };

    if !config_path.exists() {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    }

    let mut result = match crate::loader::load_config(&config_path) {
        Ok(config) => validate_config(&config),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: e.to_string(),
            }],
            config_path: None,
        },
    };

    // Unknown-field detection needs the raw TOML tree.
    if config_path.extension().and_then(|e| e.to_str()) == Some("toml")
        && let Ok(raw) = std::fs::read_to_string(&config_path)
        && let Ok(value) = toml::from_str::<toml::Value>(&raw)
    {
        check_unknown_fields(&value, &build_schema_map(), "", &mut result.diagnostics);
    }

    result.config_path = Some(config_path);
    result
}

/// Validate a TOML string without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    category: "syntax",
                    path: String::new(),
                    message: format!("TOML syntax error: {e}"),
                }],
                config_path: None,
            };
        },
    };

    let mut diagnostics = Vec::new();
    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<LightningConfig>(toml_str) {
        Ok(config) => diagnostics.extend(validate_config(&config).diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on an already parsed config.
#[must_use]
pub fn validate_config(config: &LightningConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_bridges(config, &mut diagnostics);
    check_content(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let known: Vec<&str> = fields.keys().copied().collect();
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match fields.get(key.as_str()) {
                    Some(child_schema) => {
                        check_unknown_fields(child, child_schema, &path, diagnostics);
                    },
                    None => {
                        let message = match suggest(key, &known, 3) {
                            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                            None => "unknown field".to_string(),
                        };
                        diagnostics.push(Diagnostic {
                            severity: Severity::Error,
                            category: "unknown-field",
                            path,
                            message,
                        });
                    },
                }
            }
        },
        (toml::Value::Array(items), KnownKeys::Array(item_schema)) => {
            for (i, item) in items.iter().enumerate() {
                check_unknown_fields(item, item_schema, &format!("{prefix}[{i}]"), diagnostics);
            }
        },
        _ => {},
    }
}

fn check_bridges(config: &LightningConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.bridges.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "bridge",
            path: "bridges".into(),
            message: "no bridges configured; messages will not be mirrored".into(),
        });
    }

    for (i, set) in config.bridges.iter().enumerate() {
        let path = format!("bridges[{i}]");
        if set.channels.len() < 2 {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "bridge",
                path: path.clone(),
                message: "bridge has fewer than two channels and mirrors nothing".into(),
            });
        }

        let mut platforms = HashSet::new();
        for (j, channel) in set.channels.iter().enumerate() {
            let channel_path = format!("{path}.channels[{j}]");
            if channel.platform.trim().is_empty() || channel.channel.trim().is_empty() {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "bridge",
                    path: channel_path.clone(),
                    message: "platform and channel must both be non-empty".into(),
                });
            }
            if !platforms.insert(channel.platform.as_str()) {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "bridge",
                    path: channel_path,
                    message: format!(
                        "platform \"{}\" appears more than once in this bridge",
                        channel.platform
                    ),
                });
            }
        }
    }
}

fn check_content(config: &LightningConfig, diagnostics: &mut Vec<Diagnostic>) {
    let content = &config.content;
    if content.max_content_chars < 4 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "content",
            path: "content.max_content_chars".into(),
            message: "must leave room for the ellipsis (at least 4)".into(),
        });
    }
    if content.attachment_quota_mb <= 0.0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "content",
            path: "content.attachment_quota_mb".into(),
            message: "non-positive quota drops every attachment".into(),
        });
    }
    if content.sticker_probe_timeout_secs == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "content",
            path: "content.sticker_probe_timeout_secs".into(),
            message: "probe timeout must be at least one second".into(),
        });
    }
}
