use crate::config::ModerationConfig;
use anyhow::{Context as AnyhowContext, Result};
use regex::Regex;

/// Fixed reply for a rejected message
pub(crate) const TOXIC_REPLY: &str = "Usá un lenguaje respetuoso, por favor. Estoy para ayudarte.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Moderation {
    pub toxic: bool,
    pub reason: Option<String>,
}

impl Moderation {
    fn clean() -> Self {
        Self::default()
    }

    fn toxic(word: &str) -> Self {
        Self {
            toxic: true,
            reason: Some(format!("Contiene palabra prohibida: '{word}'")),
        }
    }
}

/// Screens a user message before it reaches the resolver
pub(crate) trait Moderator: Send + Sync {
    fn assess(&self, text: &str) -> Moderation;
}

enum Matcher {
    /// Single word, matched on word boundaries
    Word(Regex),
    /// Multi-word phrase, matched as a substring
    Phrase,
}

struct ForbiddenTerm {
    term: String,
    matcher: Matcher,
}

/// Case-insensitive keyword filter with a whitelist of procedure vocabulary.
///
/// A whitelisted phrase anywhere in the message clears it, even if it also contains a
/// forbidden word.
pub(crate) struct KeywordModerator {
    whitelist: Vec<String>,
    forbidden: Vec<ForbiddenTerm>,
}

impl KeywordModerator {
    pub(crate) fn new(config: &ModerationConfig) -> Result<Self> {
        let whitelist = config
            .whitelist
            .iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();

        let mut forbidden = Vec::with_capacity(config.forbidden.len());
        for raw in &config.forbidden {
            let term = raw.trim().to_lowercase();
            if term.is_empty() {
                continue;
            }
            let matcher = if term.contains(char::is_whitespace) {
                Matcher::Phrase
            } else {
                let pattern = format!(r"\b{}\b", regex::escape(&term));
                Matcher::Word(
                    Regex::new(&pattern)
                        .with_context(|| format!("Invalid forbidden word '{term}'"))?,
                )
            };
            forbidden.push(ForbiddenTerm { term, matcher });
        }

        Ok(Self {
            whitelist,
            forbidden,
        })
    }
}

impl Moderator for KeywordModerator {
    fn assess(&self, text: &str) -> Moderation {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return Moderation::clean();
        }
        if self.whitelist.iter().any(|word| text.contains(word.as_str())) {
            return Moderation::clean();
        }

        self.forbidden
            .iter()
            .find(|term| match &term.matcher {
                Matcher::Word(regex) => regex.is_match(&text),
                Matcher::Phrase => text.contains(term.term.as_str()),
            })
            .map_or_else(Moderation::clean, |term| Moderation::toxic(&term.term))
    }
}
