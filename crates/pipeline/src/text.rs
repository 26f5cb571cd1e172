// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text normalization, fingerprinting, and edit-distance helpers shared by
//! the classifier (§4.C) and the grouping engine (§4.D).

use sha2::{Digest, Sha256};

/// Lower-case, collapse whitespace, and replace decimal numbers with `N`
/// and hex literals with `HEX` (§4.C step 1).
pub fn normalize(message: &str) -> String {
    let lowered = message.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut chars = lowered.chars().peekable();
    let mut last_was_space = false;

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        last_was_space = false;

        if c == '0' && matches!(chars.peek(), Some('x') | Some('X')) {
            chars.next();
            while matches!(chars.peek(), Some(c) if c.is_ascii_hexdigit()) {
                chars.next();
            }
            out.push_str("HEX");
            continue;
        }

        if c.is_ascii_digit() {
            while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || *c == '.') {
                chars.next();
            }
            out.push('N');
            continue;
        }

        out.push(c);
    }
    out.trim().to_string()
}

/// Short fingerprint of `level ‖ normalized(message) ‖ first-3-stack-lines`
/// (§4.C step 2). An 8-hex-char slice of SHA-256, matching the spec's "8-hex
/// char slice of MD5 or equivalent" with a hash that isn't deprecated.
pub fn fingerprint(level: &str, message: &str, stack_lines: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(level.as_bytes());
    hasher.update(b"\0");
    hasher.update(normalize(message).as_bytes());
    for line in stack_lines.iter().take(3) {
        hasher.update(b"\0");
        hasher.update(line.as_bytes());
    }
    let digest = hasher.finalize();
    format!("{:x}", digest)[..8].to_string()
}

/// Classic Levenshtein edit distance, O(len(a)*len(b)) time and O(len(b))
/// space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Similarity in `[0, 1]`: `1 - distance / max(len(a), len(b))`. Two empty
/// strings are identical (`1.0`).
pub fn message_similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    let max_len = na.chars().count().max(nb.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(&na, &nb) as f64 / max_len as f64)
}

/// Parse a stack frame's `(file, function)` pair (§4.D step 1's "stack"
/// term), mirroring the classifier's own `at fn (file:line:col)` / bare
/// `at file:line:col` shapes. The function name is `<anonymous>` when the
/// frame has no name before the parenthesized location.
pub fn stack_frame_pair(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim().trim_start_matches("at ").trim();
    match (trimmed.rfind('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let function = trimmed[..open].trim();
            let location = &trimmed[open + 1..close];
            let file = location.rsplitn(3, ':').last()?;
            if file.is_empty() {
                return None;
            }
            let function = if function.is_empty() { "<anonymous>" } else { function };
            Some((file.to_string(), function.to_string()))
        }
        _ => {
            let file = trimmed.rsplitn(3, ':').last()?;
            if file.is_empty() {
                return None;
            }
            Some((file.to_string(), "<anonymous>".to_string()))
        }
    }
}

/// Whether `line` names a vendored/third-party stack frame (§4.C/§4.D's
/// "non-vendored frames" rule), by substring match on `marker`.
pub fn is_vendored(line: &str, marker: &str) -> bool {
    line.contains(marker)
}
