//! Element selectors
//!
//! Compound selector lists (`type#id.class[attr=value], ...`) matched against a
//! single element. Combinators and pseudo-classes are not supported.

use std::iter::Peekable;
use std::str::Chars;

use crate::node::ElementData;

/// A single simple selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// Universal selector *
    Universal,
    /// Type selector (lowercase tag)
    Type(String),
    /// #id
    Id(String),
    /// .class
    Class(String),
    /// [name] or [name=value]
    Attribute { name: String, value: Option<String> },
}

impl SimpleSelector {
    fn matches(&self, elem: &ElementData) -> bool {
        match self {
            Self::Universal => true,
            Self::Type(tag) => elem.tag == *tag,
            Self::Id(id) => elem.id() == Some(id.as_str()),
            Self::Class(class) => elem.classes().any(|c| c == class),
            Self::Attribute { name, value } => match (elem.get_attr(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
        }
    }
}

/// Simple selectors that must all match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub parts: Vec<SimpleSelector>,
}

impl CompoundSelector {
    pub fn matches(&self, elem: &ElementData) -> bool {
        self.parts.iter().all(|part| part.matches(elem))
    }
}

/// Comma separated selector list; matches if any entry matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<CompoundSelector>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut selectors = Vec::new();
        let mut chars = input.chars().peekable();

        loop {
            skip_whitespace(&mut chars);
            selectors.push(parse_compound(&mut chars)?);
            skip_whitespace(&mut chars);
            match chars.next() {
                None => break,
                Some(',') => continue,
                Some(c @ ('>' | '+' | '~')) => return Err(SelectorError::UnsupportedCombinator(c)),
                Some(_) => return Err(SelectorError::UnsupportedCombinator(' ')),
            }
        }

        Ok(Self { selectors })
    }

    pub fn matches(&self, elem: &ElementData) -> bool {
        self.selectors.iter().any(|s| s.matches(elem))
    }
}

/// Selector parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected character in selector: {0:?}")]
    UnexpectedChar(char),

    #[error("Unsupported combinator: {0:?}")]
    UnsupportedCombinator(char),

    #[error("Unterminated attribute selector")]
    UnterminatedAttribute,
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn parse_name(chars: &mut Peekable<Chars<'_>>) -> Result<String, SelectorError> {
    let mut name = String::new();
    while let Some(c) = chars.next_if(|c| is_name_char(*c)) {
        name.push(c);
    }
    if name.is_empty() {
        return Err(match chars.peek() {
            Some(c) => SelectorError::UnexpectedChar(*c),
            None => SelectorError::Empty,
        });
    }
    Ok(name)
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>) -> Result<CompoundSelector, SelectorError> {
    let mut parts = Vec::new();

    while let Some(&c) = chars.peek() {
        match c {
            '*' => {
                chars.next();
                parts.push(SimpleSelector::Universal);
            }
            '#' => {
                chars.next();
                parts.push(SimpleSelector::Id(parse_name(chars)?));
            }
            '.' => {
                chars.next();
                parts.push(SimpleSelector::Class(parse_name(chars)?));
            }
            '[' => {
                chars.next();
                parts.push(parse_attribute(chars)?);
            }
            c if is_name_char(c) => {
                parts.push(SimpleSelector::Type(parse_name(chars)?.to_ascii_lowercase()));
            }
            c if c.is_whitespace() || matches!(c, ',' | '>' | '+' | '~') => break,
            c => return Err(SelectorError::UnexpectedChar(c)),
        }
    }

    if parts.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(CompoundSelector { parts })
}

fn parse_attribute(chars: &mut Peekable<Chars<'_>>) -> Result<SimpleSelector, SelectorError> {
    skip_whitespace(chars);
    let name = parse_name(chars)?;
    skip_whitespace(chars);

    let value = match chars.next() {
        Some(']') => return Ok(SimpleSelector::Attribute { name, value: None }),
        Some('=') => {
            skip_whitespace(chars);
            match chars.peek() {
                Some(&quote @ ('"' | '\'')) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some(c) => value.push(c),
                            None => return Err(SelectorError::UnterminatedAttribute),
                        }
                    }
                    value
                }
                _ => parse_name(chars)?,
            }
        }
        Some(c) => return Err(SelectorError::UnexpectedChar(c)),
        None => return Err(SelectorError::UnterminatedAttribute),
    };

    skip_whitespace(chars);
    match chars.next() {
        Some(']') => Ok(SimpleSelector::Attribute { name, value: Some(value) }),
        Some(c) => Err(SelectorError::UnexpectedChar(c)),
        None => Err(SelectorError::UnterminatedAttribute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(tag: &str, attrs: &[(&str, &str)]) -> ElementData {
        let mut e = ElementData::new(tag);
        for (name, value) in attrs {
            e.set_attr(name, value);
        }
        e
    }

    #[test]
    fn test_type_and_universal() {
        let list = SelectorList::parse("Header").unwrap();
        assert!(list.matches(&elem("header", &[])));
        assert!(!list.matches(&elem("footer", &[])));
        assert!(SelectorList::parse("*").unwrap().matches(&elem("div", &[])));
    }

    #[test]
    fn test_compound() {
        let list = SelectorList::parse("div#main.card[slot=top]").unwrap();
        let yes = elem("div", &[("id", "main"), ("class", "x card"), ("slot", "top")]);
        let no = elem("div", &[("id", "main"), ("class", "card")]);
        assert!(list.matches(&yes));
        assert!(!list.matches(&no));
    }

    #[test]
    fn test_list_and_quoted_attribute() {
        let list = SelectorList::parse("footer, [slot='a b']").unwrap();
        assert_eq!(list.selectors.len(), 2);
        assert!(list.matches(&elem("span", &[("slot", "a b")])));
        assert!(list.matches(&elem("footer", &[])));
        assert!(!list.matches(&elem("span", &[("slot", "a")])));
    }

    #[test]
    fn test_presence_attribute() {
        let list = SelectorList::parse("[hidden]").unwrap();
        assert!(list.matches(&elem("p", &[("hidden", "")])));
        assert!(!list.matches(&elem("p", &[])));
    }

    #[test]
    fn test_rejects_combinators() {
        assert_eq!(
            SelectorList::parse("div > p"),
            Err(SelectorError::UnsupportedCombinator('>'))
        );
        assert!(SelectorList::parse("div p").is_err());
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("[slot").is_err());
        assert!(SelectorList::parse("a,").is_err());
    }
}
