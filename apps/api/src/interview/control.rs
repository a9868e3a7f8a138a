//! Control-signal extraction — the one place that parses the trailing
//! `{"action": "stay" | "next"}` token out of a model reply.
//!
//! The token rides inside free text, so parsing is defensive: we look for the
//! last brace-delimited JSON object anchored to the end of the reply. Anything
//! that fails to locate or parse degrades to `Stay` with the raw text returned
//! completely unmodified — ambiguity must never cause an unintended advance,
//! and we never half-strip a reply we could not parse.

use serde::Deserialize;

/// What the model asked the engine to do with the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Stay,
    Next,
}

/// Result of extraction. `parsed` distinguishes a genuine "stay" from a
/// malformed or missing token for observability; control behavior is the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    pub action: ControlAction,
    pub visible: String,
    pub parsed: bool,
}

#[derive(Debug, Deserialize)]
struct ControlToken {
    action: String,
}

/// Extracts the trailing control token from a raw model reply.
///
/// On success the token text is stripped from the visible reply. On any
/// failure (no object at the end, unparseable JSON, unknown action value) the
/// full raw text is returned untouched and the action defaults to `Stay`.
pub fn extract_control(raw: &str) -> ControlOutcome {
    let trimmed = raw.trim_end();
    if !trimmed.ends_with('}') {
        return unparsed(raw);
    }

    // Walk '{' positions from the end so the innermost trailing object (the
    // token itself) is tried before any enclosing prose braces.
    for (idx, ch) in trimmed.char_indices().rev() {
        if ch != '{' {
            continue;
        }
        let candidate = &trimmed[idx..];
        let Ok(token) = serde_json::from_str::<ControlToken>(candidate) else {
            continue;
        };
        let action = match token.action.as_str() {
            "next" => ControlAction::Next,
            "stay" => ControlAction::Stay,
            // A trailing object with an unrecognized action is malformed:
            // return the whole reply untouched rather than stripping it.
            _ => return unparsed(raw),
        };
        return ControlOutcome {
            action,
            visible: trimmed[..idx].trim_end().to_string(),
            parsed: true,
        };
    }

    unparsed(raw)
}

fn unparsed(raw: &str) -> ControlOutcome {
    ControlOutcome {
        action: ControlAction::Stay,
        visible: raw.to_string(),
        parsed: false,
    }
}
