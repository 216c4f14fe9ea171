//! Rule-based intent interpreter.
//!
//! Free text is normalized (lowercased, whitespace collapsed) and tried
//! against an ordered table of phrase rules. The first rule whose grammar
//! fully matches, and whose extracted paths are all non-empty, produces the
//! [`Action`]. Rules with more than one keyword sit ahead of single-keyword
//! rules, so "move x to y" is never read as a removal.

use crate::action::{Action, ActionKind, InterpretationResult, CURRENT_DIR};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static MOVE_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bmove\s+(?:(?:the|file|folder|directory)\s+)*(.+)\s+(?:to|into)\s+(.+)$")
        .expect("move pattern is valid")
});

static CREATE_FOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:create|make)\s+(?:(?:a|an|new)\s+)*(?:folder|directory|dir)\s+(?:(?:called|named)\s+)?(.+)$",
    )
    .expect("create pattern is valid")
});

static LIST_FILES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blist\s+(?:(?:all|the)\s+)*files\b(?:\s+(in|inside|under|from)\b\s*(.*))?")
        .expect("list pattern is valid")
});

static REMOVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:remove|delete)\s+(?:(?:the|file|folder|directory)\s+)*(.+)$")
        .expect("remove pattern is valid")
});

/// One entry of the rule table: a pattern, the kind it produces and how to
/// pull the path arguments out of the captures.
pub struct Rule {
    pub name: &'static str,
    pub kind: ActionKind,
    pattern: &'static Lazy<Regex>,
    extract: fn(&Captures<'_>) -> Option<Vec<String>>,
}

impl Rule {
    fn apply(&self, normalized: &str) -> Option<Action> {
        let captures = self.pattern.captures(normalized)?;
        let targets = (self.extract)(&captures)?;
        Action::new(self.kind, targets).ok()
    }
}

/// Priority order is the slice order.
static DEFAULT_RULES: [Rule; 4] = [
    Rule {
        name: "move_to",
        kind: ActionKind::MoveFile,
        pattern: &MOVE_TO,
        extract: extract_move,
    },
    Rule {
        name: "create_folder",
        kind: ActionKind::CreateFolder,
        pattern: &CREATE_FOLDER,
        extract: extract_single,
    },
    Rule {
        name: "list_files",
        kind: ActionKind::ListFiles,
        pattern: &LIST_FILES,
        extract: extract_list,
    },
    Rule {
        name: "remove",
        kind: ActionKind::Remove,
        pattern: &REMOVE,
        extract: extract_single,
    },
];

fn extract_move(captures: &Captures<'_>) -> Option<Vec<String>> {
    let from = clean_argument(captures.get(1)?.as_str())?;
    let to = clean_argument(captures.get(2)?.as_str())?;
    Some(vec![from, to])
}

fn extract_single(captures: &Captures<'_>) -> Option<Vec<String>> {
    Some(vec![clean_argument(captures.get(1)?.as_str())?])
}

fn extract_list(captures: &Captures<'_>) -> Option<Vec<String>> {
    // "in" given but nothing after it rejects the rule
    if captures.get(1).is_some() {
        let dir = clean_argument(captures.get(2).map_or("", |m| m.as_str()))?;
        return Some(vec![dir]);
    }
    Some(vec![CURRENT_DIR.to_string()])
}

const TRAILING_PUNCTUATION: &[char] = &[',', '!', '?', ';', ':'];

/// Trim, drop trailing sentence punctuation and surrounding quotes.
/// Returns `None` when nothing is left.
fn clean_argument(raw: &str) -> Option<String> {
    let mut arg = raw.trim().trim_end_matches(TRAILING_PUNCTUATION).trim_end();

    // a full stop ends the sentence, but "." and ".." are paths
    if arg.len() > 1 && arg.ends_with('.') && !arg.ends_with("..") {
        arg = &arg[..arg.len() - 1];
    }

    let arg = arg
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    let arg = arg.strip_prefix("the ").unwrap_or(arg).trim();

    if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}

/// Lowercase and collapse every whitespace run to a single space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Clone, Copy)]
pub struct IntentInterpreter {
    rules: &'static [Rule],
}

impl IntentInterpreter {
    pub fn with_default_rules() -> Self {
        Self {
            rules: &DEFAULT_RULES,
        }
    }

    /// Rule names in priority order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub fn interpret(&self, text: &str) -> InterpretationResult {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return InterpretationResult::NoMatch(text.to_string());
        }

        for rule in self.rules {
            if let Some(action) = rule.apply(&normalized) {
                tracing::debug!(rule = rule.name, %action, "Matched intent");
                return InterpretationResult::Matched(action);
            }
        }

        tracing::debug!(input = %normalized, "No intent rule matched");
        InterpretationResult::NoMatch(text.to_string())
    }
}

impl Default for IntentInterpreter {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Interpret one line with the default rule table.
pub fn interpret(text: &str) -> InterpretationResult {
    IntentInterpreter::with_default_rules().interpret(text)
}
