/*!
 * Dangerous Operation Scanner
 * Static pre-screen for generated tool source before it is handed to a scope
 *
 * Generated mock functions are produced by a model and cannot be trusted;
 * the pipeline scans each one for dangerous imports and calls and quarantines
 * anything flagged for regeneration.
 */

use serde::{Deserialize, Serialize};

/// Modules whose import marks a function as dangerous
const DANGEROUS_MODULES: &[(&str, &str)] = &[
    ("os", "operating system interface"),
    ("subprocess", "subprocess execution"),
    ("socket", "network operations"),
    ("ctypes", "C library access"),
    ("multiprocessing", "process manipulation"),
    ("importlib", "dynamic imports"),
    ("shutil", "high-level file operations"),
    ("pickle", "serialization that can execute code"),
    ("marshal", "serialization that can execute code"),
];

/// Builtin-style calls that are dangerous regardless of imports
const DANGEROUS_CALLS: &[(&str, &str)] = &[
    ("eval", "dynamic code evaluation"),
    ("exec", "dynamic code execution"),
    ("compile", "code compilation"),
    ("__import__", "dynamic imports"),
    ("open", "file operations"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    ModuleImport,
    DangerousCall,
}

/// A single flagged occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub name: String,
    pub detail: String,
    pub line: usize,
}

/// Scan result for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub source_name: String,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `line[idx..]` starts a free-standing call of `name`
fn is_call_at(line: &str, idx: usize, name: &str) -> bool {
    // Preceding character must not extend an identifier or attribute path.
    if let Some(prev) = line[..idx].chars().next_back() {
        if is_ident_char(prev) || prev == '.' {
            return false;
        }
    }
    let rest = &line[idx + name.len()..];
    let mut chars = rest.chars();
    match chars.next() {
        Some('(') => true,
        Some(c) if c.is_whitespace() => rest.trim_start().starts_with('('),
        _ => false,
    }
}

fn module_head(part: &str) -> Option<&str> {
    let head = part
        .trim_start()
        .split(|c: char| c == '.' || c.is_whitespace())
        .next()?;
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// Module heads of an import statement, if the line is one.
///
/// `import a, b` names two modules; `from a.b import c` names one.
fn imported_modules(line: &str) -> Option<Vec<&str>> {
    if let Some(rest) = line.strip_prefix("from ") {
        return module_head(rest).map(|head| vec![head]);
    }
    let rest = line.strip_prefix("import ")?;
    let heads: Vec<&str> = rest.split(',').filter_map(module_head).collect();
    if heads.is_empty() {
        None
    } else {
        Some(heads)
    }
}

/// Scan source text for dangerous imports and calls
#[must_use]
pub fn scan_source(name: &str, source: &str) -> ScanReport {
    let mut findings = Vec::new();

    for (line_no, raw) in source.lines().enumerate() {
        let line = raw.trim_start();
        if line.starts_with('#') {
            continue;
        }
        let line_no = line_no + 1;

        if let Some(modules) = imported_modules(line) {
            for module in modules {
                if let Some((name, detail)) = DANGEROUS_MODULES.iter().find(|(m, _)| *m == module)
                {
                    findings.push(Finding {
                        kind: FindingKind::ModuleImport,
                        name: (*name).to_string(),
                        detail: (*detail).to_string(),
                        line: line_no,
                    });
                }
            }
            continue;
        }

        for (call, detail) in DANGEROUS_CALLS {
            for (idx, _) in line.match_indices(call) {
                if is_call_at(line, idx, call) {
                    findings.push(Finding {
                        kind: FindingKind::DangerousCall,
                        name: (*call).to_string(),
                        detail: (*detail).to_string(),
                        line: line_no,
                    });
                    break;
                }
            }
        }
    }

    ScanReport {
        source_name: name.to_string(),
        findings,
    }
}
