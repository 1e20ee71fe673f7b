//! logos-based bind spec parser.
//!
//! A bind spec is a `;`-separated list of rules, each of the form
//! `[selector //][attr:]slot`:
//!
//! ```text
//! title; class:kind; .price // amount; a // href:link
//! ```
//!
//! Without a selector a rule binds the element carrying the spec; with one it
//! binds every matching descendant. Without `attr:` it writes text content.

use logos::Logos;

use super::query::Selector;
use crate::widget::BindTarget;

/// Bind spec token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f]+")]
enum Token {
    /// `//` separating a selector from the rest of the rule.
    #[token("//")]
    Scope,

    /// `:` separating an attribute name from the slot.
    #[token(":")]
    Colon,

    /// `;` separating rules.
    #[token(";")]
    Semicolon,

    /// Selector, attribute name, or dotted slot path.
    #[regex(r"[#.]?[A-Za-z_][A-Za-z0-9_.\-]*")]
    Word,
}

/// Bind spec parse errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindSpecError {
    #[error("bind rule {rule}: unexpected `{found}`")]
    UnexpectedToken { rule: usize, found: String },
    #[error("bind rule {rule}: unexpected end of rule")]
    UnexpectedEnd { rule: usize },
    #[error("bind spec: invalid character at byte {position}")]
    InvalidCharacter { position: usize },
}

/// One parsed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindSpec {
    /// Descendant selector; `None` binds the element itself.
    pub selector: Option<Selector>,
    pub target: BindTarget,
    /// Dotted path into the record's data.
    pub slot: String,
}

/// Parse a full bind spec. Empty rules (stray `;`) are skipped.
pub fn parse(input: &str) -> Result<Vec<BindSpec>, BindSpecError> {
    let mut rules = Vec::new();
    let mut current: Vec<(Token, &str)> = Vec::new();
    let mut rule = 0;

    for (result, span) in Token::lexer(input).spanned() {
        let token = result.map_err(|_| BindSpecError::InvalidCharacter { position: span.start })?;
        if token == Token::Semicolon {
            if !current.is_empty() {
                rules.push(parse_rule(rule, &current)?);
                current.clear();
            }
            rule += 1;
            continue;
        }
        current.push((token, &input[span]));
    }
    if !current.is_empty() {
        rules.push(parse_rule(rule, &current)?);
    }
    Ok(rules)
}

/// Cursor over one rule's tokens.
struct Rule<'a> {
    tokens: &'a [(Token, &'a str)],
    pos: usize,
    index: usize,
}

impl<'a> Rule<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn word(&mut self) -> Result<&'a str, BindSpecError> {
        match self.tokens.get(self.pos) {
            Some((Token::Word, text)) => {
                self.pos += 1;
                Ok(text)
            }
            Some((_, text)) => Err(self.unexpected(text)),
            None => Err(BindSpecError::UnexpectedEnd { rule: self.index }),
        }
    }

    fn unexpected(&self, found: &str) -> BindSpecError {
        BindSpecError::UnexpectedToken {
            rule: self.index,
            found: found.to_owned(),
        }
    }

    /// `[attr:]slot`
    fn target_and_slot(&mut self) -> Result<(BindTarget, String), BindSpecError> {
        let first = self.word()?;
        if self.peek() == Some(Token::Colon) {
            self.pos += 1;
            let slot = self.word()?;
            return Ok((BindTarget::Attribute(first.to_owned()), slot.to_owned()));
        }
        Ok((BindTarget::Text, first.to_owned()))
    }
}

fn parse_rule(index: usize, tokens: &[(Token, &str)]) -> Result<BindSpec, BindSpecError> {
    let mut rule = Rule { tokens, pos: 0, index };
    let selector = if tokens.get(1).map(|(token, _)| *token) == Some(Token::Scope) {
        let selector = Selector::parse(rule.word()?);
        rule.pos += 1;
        Some(selector)
    } else {
        None
    };
    let (target, slot) = rule.target_and_slot()?;
    if let Some((_, text)) = tokens.get(rule.pos) {
        return Err(rule.unexpected(text));
    }
    Ok(BindSpec { selector, target, slot })
}
