//! Command Template Grammar
//!
//! Step commands are templates made of literal text and placeholders:
//!
//! - `{domain}` - the raw target string
//! - `{outputFile}` - this step's own output path
//! - `<step>.outputFile` - the output path of another step
//! - `<step>.outputFile*` - every historical artifact of another step
//!
//! A step name is the longest run of `[A-Za-z0-9_-]` directly before
//! `.outputFile`, so `httprobe.outputFile` never counts as a reference to a
//! step called `probe`.

/// Placeholder for the raw target.
pub const DOMAIN_PLACEHOLDER: &str = "{domain}";

/// Placeholder for the step's own output path.
pub const OUTPUT_PLACEHOLDER: &str = "{outputFile}";

/// Suffix marking a reference to another step's output.
pub const NAMED_OUTPUT_MARKER: &str = ".outputFile";

/// A lexical unit of a command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text copied verbatim
    Literal(String),
    /// `{domain}`
    Domain,
    /// `{outputFile}`
    SelfOutput,
    /// `<name>.outputFile`
    NamedOutput(String),
    /// `<name>.outputFile*`
    NamedOutputWildcard(String),
}

impl Token {
    /// Returns the template text this token was parsed from.
    pub fn to_template(&self) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Domain => DOMAIN_PLACEHOLDER.to_string(),
            Self::SelfOutput => OUTPUT_PLACEHOLDER.to_string(),
            Self::NamedOutput(name) => format!("{}{}", name, NAMED_OUTPUT_MARKER),
            Self::NamedOutputWildcard(name) => format!("{}{}*", name, NAMED_OUTPUT_MARKER),
        }
    }

    /// Returns the referenced step name for named-output tokens.
    pub fn referenced_step(&self) -> Option<&str> {
        match self {
            Self::NamedOutput(name) | Self::NamedOutputWildcard(name) => Some(name),
            _ => None,
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Returns true if `name` can be referenced as `<name>.outputFile`.
///
/// A name with any other character would be tokenised as a reference to its
/// trailing segment only.
pub fn is_valid_step_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_name_char)
}

fn flush_literal(tokens: &mut Vec<Token>, literal: &mut String) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

/// Splits a command template into tokens.
///
/// Concatenating [`Token::to_template`] over the result reproduces the input.
pub fn parse_template(template: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(DOMAIN_PLACEHOLDER) {
            flush_literal(&mut tokens, &mut literal);
            tokens.push(Token::Domain);
            rest = after;
            continue;
        }

        if let Some(after) = rest.strip_prefix(OUTPUT_PLACEHOLDER) {
            flush_literal(&mut tokens, &mut literal);
            tokens.push(Token::SelfOutput);
            rest = after;
            continue;
        }

        if let Some(after) = rest.strip_prefix(NAMED_OUTPUT_MARKER) {
            let wildcard = after.starts_with('*');
            let tail = if wildcard { &after[1..] } else { after };
            let at_boundary = wildcard
                || !tail
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');

            let name_start = literal
                .char_indices()
                .rev()
                .take_while(|(_, c)| is_name_char(*c))
                .last()
                .map(|(i, _)| i);

            if let (true, Some(start)) = (at_boundary, name_start) {
                let name = literal.split_off(start);
                flush_literal(&mut tokens, &mut literal);
                tokens.push(if wildcard {
                    Token::NamedOutputWildcard(name)
                } else {
                    Token::NamedOutput(name)
                });
                rest = tail;
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            literal.push(c);
        }
        rest = chars.as_str();
    }

    flush_literal(&mut tokens, &mut literal);
    tokens
}

/// Re-assembles tokens into template text.
pub fn render_template(tokens: &[Token]) -> String {
    tokens.iter().map(Token::to_template).collect()
}

/// Returns the names of all steps referenced by a template, in first-seen
/// order and without duplicates.
pub fn referenced_steps(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in parse_template(template) {
        if let Some(name) = token.referenced_step() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Returns true if the template references `step_name`'s output, in either
/// the single or the wildcard form.
pub fn references_step(template: &str, step_name: &str) -> bool {
    parse_template(template)
        .iter()
        .any(|token| token.referenced_step() == Some(step_name))
}
