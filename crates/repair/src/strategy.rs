// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three built-in repair strategies (§3's `RepairStrategy`, §4.G step 5):
//! EP001 null-guard insertion, EP004 whitelisted default file creation, and
//! EP010 progressive JSON repair.

use std::fs;
use std::path::{Path, PathBuf};

use triage_core::ErrorEvent;

/// One file mutation a strategy intends to make, paired with whether the
/// file already existed (so the engine knows whether to back it up or just
/// track it as created).
#[derive(Debug, Clone)]
pub struct TouchedFile {
    pub path: PathBuf,
    pub existed: bool,
}

/// What a strategy did, handed back to the engine for bookkeeping and then
/// to `validate`. Backup bookkeeping itself happens earlier, from
/// `files_to_touch`'s plan — by the time `repair` returns, the writes have
/// already happened.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub touched: Vec<PathBuf>,
    pub description: String,
}

/// A pattern-keyed repair plug-in (§3 `RepairStrategy`, §9 "closed enum
/// dispatch, not an open plugin system").
pub trait RepairStrategy: Send + Sync {
    fn pattern_id(&self) -> &'static str;

    /// Whether this strategy's result needs the project test command run
    /// before it can be trusted (§4.G step 6).
    fn test_required(&self) -> bool {
        false
    }

    fn can_repair(&self, event: &ErrorEvent) -> bool;

    /// Plan every file this strategy will write or create for `event`,
    /// without mutating anything (§4.G step 4). The engine backs up each
    /// entry that already exists — and records the rest as to-be-created —
    /// *before* calling `repair`, so backup always precedes the write it
    /// protects against.
    fn files_to_touch(&self, event: &ErrorEvent) -> Result<Vec<TouchedFile>, String>;

    /// Apply the fix. Errors are strategy-local text, not a typed enum —
    /// the engine treats any `Err` the same way (rollback + record failure).
    fn repair(&self, event: &ErrorEvent) -> Result<StrategyOutcome, String>;

    /// Strategy-declared post-check (§4.G step 6, runs before any test
    /// command). `Ok(())` means proceed to the test-command/minimal
    /// validator step.
    fn validate(&self, outcome: &StrategyOutcome) -> Result<(), String>;
}

/// EP001: insert a guard before the first property access on the offending
/// line so `foo.bar` becomes reachable only when `foo` is defined.
pub struct NullGuardStrategy;

impl NullGuardStrategy {
    /// Find `<ident>.` immediately before the reported column and return the
    /// identifier, so the guard checks the right receiver.
    fn receiver(line: &str) -> Option<String> {
        let dot = line.find('.')?;
        let start = line[..dot].rfind(|c: char| !c.is_alphanumeric() && c != '_').map(|i| i + 1).unwrap_or(0);
        let ident = &line[start..dot];
        if ident.is_empty() { None } else { Some(ident.to_string()) }
    }
}

impl RepairStrategy for NullGuardStrategy {
    fn pattern_id(&self) -> &'static str {
        "EP001"
    }

    fn can_repair(&self, event: &ErrorEvent) -> bool {
        event.source_file.is_some() && event.source_line.is_some()
    }

    fn files_to_touch(&self, event: &ErrorEvent) -> Result<Vec<TouchedFile>, String> {
        let path = event.source_file.as_ref().ok_or("EP001 requires a source file")?;
        Ok(vec![TouchedFile { path: path.clone(), existed: path.exists() }])
    }

    fn repair(&self, event: &ErrorEvent) -> Result<StrategyOutcome, String> {
        let path = event.source_file.as_ref().ok_or("EP001 requires a source file")?;
        let line_no = event.source_line.ok_or("EP001 requires a source line")? as usize;
        let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut lines: Vec<String> = contents.lines().map(String::from).collect();
        let idx = line_no.saturating_sub(1).min(lines.len());
        let target = lines.get(idx.min(lines.len().saturating_sub(1))).cloned().unwrap_or_default();
        let receiver = Self::receiver(&target).ok_or("could not find a property-access receiver on the reported line")?;
        let indent: String = target.chars().take_while(|c| c.is_whitespace()).collect();
        let guard = format!("{indent}if ({receiver} === undefined || {receiver} === null) {{ return; }}");
        lines.insert(idx, guard.clone());
        fs::write(path, lines.join("\n") + "\n").map_err(|e| e.to_string())?;

        Ok(StrategyOutcome {
            touched: vec![path.clone()],
            description: format!("inserted null guard for `{receiver}` before line {line_no}"),
        })
    }

    fn validate(&self, outcome: &StrategyOutcome) -> Result<(), String> {
        let path = &outcome.touched[0];
        let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
        if balance(&contents) {
            Ok(())
        } else {
            Err("braces/parens unbalanced after guard insertion".to_string())
        }
    }
}

/// EP004: create the missing file referenced by the error from a whitelisted
/// default appropriate to its extension.
pub struct MissingFileStrategy;

impl MissingFileStrategy {
    fn default_content(path: &Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => "{}\n",
            _ => "",
        }
    }
}

impl RepairStrategy for MissingFileStrategy {
    fn pattern_id(&self) -> &'static str {
        "EP004"
    }

    fn can_repair(&self, event: &ErrorEvent) -> bool {
        event.source_file.is_some()
    }

    fn files_to_touch(&self, event: &ErrorEvent) -> Result<Vec<TouchedFile>, String> {
        let path = event.source_file.as_ref().ok_or("EP004 requires a source file")?;
        if path.exists() {
            return Err(format!("{} already exists, nothing to create", path.display()));
        }
        Ok(vec![TouchedFile { path: path.clone(), existed: false }])
    }

    fn repair(&self, event: &ErrorEvent) -> Result<StrategyOutcome, String> {
        let path = event.source_file.as_ref().ok_or("EP004 requires a source file")?;
        if path.exists() {
            return Err(format!("{} already exists, nothing to create", path.display()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        fs::write(path, Self::default_content(path)).map_err(|e| e.to_string())?;
        Ok(StrategyOutcome {
            touched: vec![path.clone()],
            description: format!("created {} from a whitelisted default", path.display()),
        })
    }

    fn validate(&self, outcome: &StrategyOutcome) -> Result<(), String> {
        let path = &outcome.touched[0];
        if path.exists() {
            Ok(())
        } else {
            Err("created file is missing after repair".to_string())
        }
    }
}

/// EP010: progressively repair malformed JSON — strip trailing commas,
/// `//`/`/* */` comments, convert single-quoted strings to double-quoted,
/// quote bareword keys, fix `None`/`True`/`False` literals — falling back to
/// `{}` if the result still doesn't parse.
pub struct JsonRepairStrategy;

impl JsonRepairStrategy {
    fn strip_comments(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();
        let mut in_string = false;
        while let Some(c) = chars.next() {
            if in_string {
                out.push(c);
                if c == '"' {
                    in_string = false;
                } else if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                continue;
            }
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'/') => {
                    while let Some(&c) = chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '*' && chars.peek() == Some(&'/') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => out.push(c),
            }
        }
        out
    }

    fn strip_trailing_commas(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == ',' {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    i += 1;
                    continue;
                }
            }
            out.push(c);
            i += 1;
        }
        out
    }

    fn single_to_double_quotes(s: &str) -> String {
        s.replace('\'', "\"")
    }

    fn quote_bareword_keys(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '"' {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '"' {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                continue;
            }
            if c == '{' || c == ',' {
                out.push(c);
                i += 1;
                let start_ws = i;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                out.push_str(&chars[start_ws..i].iter().collect::<String>());
                let ident_start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if i > ident_start && chars.get(i).copied() == Some(':') {
                    out.push('"');
                    out.push_str(&chars[ident_start..i].iter().collect::<String>());
                    out.push('"');
                } else {
                    out.push_str(&chars[ident_start..i].iter().collect::<String>());
                }
                continue;
            }
            out.push(c);
            i += 1;
        }
        out
    }

    fn fix_literals(s: &str) -> String {
        let mut out = s.to_string();
        for (bad, good) in [("None", "null"), ("True", "true"), ("False", "false")] {
            out = out.replace(bad, good);
        }
        out
    }

    fn progressive_repair(original: &str) -> String {
        if serde_json::from_str::<serde_json::Value>(original).is_ok() {
            return original.to_string();
        }
        let steps: [fn(&str) -> String; 5] = [
            Self::strip_comments,
            Self::strip_trailing_commas,
            Self::single_to_double_quotes,
            Self::quote_bareword_keys,
            Self::fix_literals,
        ];
        let mut candidate = original.to_string();
        for step in steps {
            candidate = step(&candidate);
            if serde_json::from_str::<serde_json::Value>(&candidate).is_ok() {
                return candidate;
            }
        }
        "{}".to_string()
    }
}

impl RepairStrategy for JsonRepairStrategy {
    fn pattern_id(&self) -> &'static str {
        "EP010"
    }

    fn can_repair(&self, event: &ErrorEvent) -> bool {
        event.source_file.as_ref().map(|p| p.extension().and_then(|e| e.to_str()) == Some("json")).unwrap_or(false)
    }

    fn files_to_touch(&self, event: &ErrorEvent) -> Result<Vec<TouchedFile>, String> {
        let path = event.source_file.as_ref().ok_or("EP010 requires a .json source file")?;
        Ok(vec![TouchedFile { path: path.clone(), existed: path.exists() }])
    }

    fn repair(&self, event: &ErrorEvent) -> Result<StrategyOutcome, String> {
        let path = event.source_file.as_ref().ok_or("EP010 requires a .json source file")?;
        let original = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let repaired = Self::progressive_repair(&original);
        fs::write(path, &repaired).map_err(|e| e.to_string())?;
        Ok(StrategyOutcome {
            touched: vec![path.clone()],
            description: if repaired == "{}" {
                "JSON unrecoverable, fell back to an empty object".to_string()
            } else {
                "progressively repaired malformed JSON".to_string()
            },
        })
    }

    fn validate(&self, outcome: &StrategyOutcome) -> Result<(), String> {
        let path = &outcome.touched[0];
        let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str::<serde_json::Value>(&contents).map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Minimal syntactic validator used when a strategy has no `test_required`
/// step and no project test command is configured (§4.G step 6 "if no test
/// command is discoverable, run a minimal validator").
pub fn minimal_validate(path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str::<serde_json::Value>(&contents).map(|_| ()).map_err(|e| e.to_string())
    } else if balance(&contents) {
        Ok(())
    } else {
        Err("unbalanced braces/parens".to_string())
    }
}

fn balance(s: &str) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

/// Build the closed strategy registry (§9 "not an open trait-object plugin
/// system"): a `PatternId -> &dyn RepairStrategy` table built once at
/// startup.
pub fn builtin_strategies() -> Vec<Box<dyn RepairStrategy>> {
    vec![Box::new(NullGuardStrategy), Box::new(MissingFileStrategy), Box::new(JsonRepairStrategy)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::test_support::error_event_with_classification;
    use triage_core::Classification;

    fn event_with(source_file: Option<PathBuf>, source_line: Option<u32>) -> ErrorEvent {
        let mut event = error_event_with_classification("h", 1, "boom", Classification::unknown());
        event.source_file = source_file;
        event.source_line = source_line;
        event
    }

    #[test]
    fn null_guard_inserts_a_check_above_the_offending_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "function f() {\n  return foo.bar;\n}\n").unwrap();
        let event = event_with(Some(path.clone()), Some(2));
        let outcome = NullGuardStrategy.repair(&event).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("if (foo === undefined || foo === null) { return; }"));
        NullGuardStrategy.validate(&outcome).unwrap();
    }

    #[test]
    fn missing_file_creates_json_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let event = event_with(Some(path.clone()), None);
        let outcome = MissingFileStrategy.repair(&event).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        MissingFileStrategy.validate(&outcome).unwrap();
    }

    #[test]
    fn missing_file_refuses_to_overwrite_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{\"a\":1}").unwrap();
        let event = event_with(Some(path), None);
        assert!(MissingFileStrategy.repair(&event).is_err());
    }

    #[test]
    fn json_repair_strips_trailing_comma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "{\"a\": 1, \"b\": 2,}").unwrap();
        let event = event_with(Some(path.clone()), None);
        let outcome = JsonRepairStrategy.repair(&event).unwrap();
        JsonRepairStrategy.validate(&outcome).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn json_repair_quotes_bareword_keys_and_single_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "{a: 'x', b: 'y'}").unwrap();
        let event = event_with(Some(path.clone()), None);
        JsonRepairStrategy.repair(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["a"], "x");
        assert_eq!(value["b"], "y");
    }

    #[test]
    fn json_repair_falls_back_to_empty_object_when_unrecoverable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, "not json at all {{{").unwrap();
        let event = event_with(Some(path.clone()), None);
        JsonRepairStrategy.repair(&event).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn minimal_validate_catches_unbalanced_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "function f() { return 1;").unwrap();
        assert!(minimal_validate(&path).is_err());
    }
}
