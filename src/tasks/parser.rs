//! Free-text task command parser.
//!
//! Turns `"Ask Praveen to prepare the EOD report"` into an assignee
//! (`praveen@rbsgo.com`) and a cleaned description (`"prepare the EOD
//! report"`). The roster is scanned in order and the first member whose first
//! name appears in the text wins; a command can only name one teammate.
//!
//! Matching is substring-based by default, so a first name hidden inside a
//! longer word still matches (`chris` in `Christmas`). `NameMatching::WordBoundary`
//! requires the name to stand alone instead.

use std::str::FromStr;

use regex::Regex;
use tracing::debug;

/// How roster tokens are located in the command text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMatching {
    /// Case-insensitive substring anywhere in the text.
    #[default]
    Substring,
    /// Case-insensitive, whole word only.
    WordBoundary,
}

impl FromStr for NameMatching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "substring" => Ok(Self::Substring),
            "word_boundary" | "word" => Ok(Self::WordBoundary),
            other => Err(format!("unknown name matching mode '{other}'")),
        }
    }
}

/// Result of parsing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub assignee: String,
    pub description: String,
}

/// One roster entry with its compiled matcher.
#[derive(Debug, Clone)]
struct RosterEntry {
    token: String,
    identity: String,
    pattern: Regex,
}

/// Parser over a fixed, ordered team roster.
#[derive(Debug, Clone)]
pub struct CommandParser {
    roster: Vec<RosterEntry>,
    leading_verbs: Regex,
}

impl CommandParser {
    /// Build a parser from member identities (emails). The token for each
    /// member is the local part of the email.
    pub fn new<I, S>(members: I, matching: NameMatching) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roster = members
            .into_iter()
            .filter_map(|identity| {
                let identity = identity.as_ref().trim().to_lowercase();
                let token = identity.split('@').next()?.to_string();
                if token.is_empty() {
                    return None;
                }
                let escaped = regex::escape(&token);
                let source = match matching {
                    NameMatching::Substring => format!("(?i){escaped}"),
                    NameMatching::WordBoundary => format!(r"(?i)\b{escaped}\b"),
                };
                // Escaped literal input always compiles.
                let pattern = Regex::new(&source).ok()?;
                Some(RosterEntry {
                    token,
                    identity,
                    pattern,
                })
            })
            .collect();

        Self {
            roster,
            leading_verbs: Regex::new(r"(?i)^\s*(?:(?:ask|tell|assign|to|request)(?:\s+|$))*")
                .expect("static verb pattern"),
        }
    }

    /// First-name tokens in scan order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.roster.iter().map(|e| e.token.as_str())
    }

    /// Resolve the assignee and strip the routing words from `command`.
    pub fn parse(&self, command: &str, current_user: &str) -> ParsedCommand {
        for entry in &self.roster {
            let Some(found) = entry.pattern.find(command) else {
                continue;
            };

            let before = command[..found.start()].trim_end();
            let after = command[found.end()..].trim_start();
            let joined = match (before.is_empty(), after.is_empty()) {
                (true, _) => after.to_string(),
                (_, true) => before.to_string(),
                _ => format!("{before} {after}"),
            };
            let description = self
                .leading_verbs
                .replace(&joined, "")
                .trim()
                .to_string();

            debug!(token = %entry.token, assignee = %entry.identity, "Command names a teammate");
            return ParsedCommand {
                assignee: entry.identity.clone(),
                description,
            };
        }

        ParsedCommand {
            assignee: current_user.to_string(),
            description: command.to_string(),
        }
    }
}
