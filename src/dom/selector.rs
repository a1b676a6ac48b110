//! The CSS selector subset used by the DOM contract.
//!
//! Supported: selector lists (`a, b`), descendant and child combinators,
//! type selectors and `*`, `#id`, `.class`, attribute selectors
//! (`[attr]`, `[attr=v]`, `[attr*=v]`, `[attr^=v]`, `[attr$=v]`) and the
//! `:first-of-type` / `:last-of-type` pseudo-classes.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character '{found}' at offset {offset} in selector '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },

    #[error("unterminated attribute selector in '{0}'")]
    UnterminatedAttribute(String),

    #[error("unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub(crate) alternatives: Vec<Complex>,
}

/// Compound selectors joined by combinators, stored left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Complex {
    pub(crate) head: Compound,
    pub(crate) tail: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attributes: Vec<AttributeMatch>,
    pub(crate) pseudo: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttributeMatch {
    pub(crate) name: String,
    pub(crate) op: AttributeOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttributeOp {
    Exists,
    Equals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

impl AttributeOp {
    pub(crate) fn matches(&self, value: &str) -> bool {
        match self {
            AttributeOp::Exists => true,
            AttributeOp::Equals(expected) => value == expected,
            AttributeOp::Contains(needle) => !needle.is_empty() && value.contains(needle.as_str()),
            AttributeOp::StartsWith(prefix) => !prefix.is_empty() && value.starts_with(prefix.as_str()),
            AttributeOp::EndsWith(suffix) => !suffix.is_empty() && value.ends_with(suffix.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pseudo {
    FirstOfType,
    LastOfType,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(input: &str) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        for part in input.split(',') {
            alternatives.push(parse_complex(input, part)?);
        }
        Ok(Selector { alternatives })
    }
}

fn parse_complex(full: &str, part: &str) -> Result<Complex, SelectorError> {
    let mut compounds: Vec<Compound> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let chars: Vec<(usize, char)> = part.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            if !compounds.is_empty() && pending.is_none() {
                pending = Some(Combinator::Descendant);
            }
            i += 1;
            continue;
        }
        if c == '>' {
            if compounds.is_empty() {
                return Err(unexpected(full, c, offset));
            }
            pending = Some(Combinator::Child);
            i += 1;
            continue;
        }

        let (compound, next) = parse_compound(full, &chars, i)?;
        if let Some(combinator) = pending.take() {
            combinators.push(combinator);
        } else if !compounds.is_empty() {
            return Err(unexpected(full, c, offset));
        }
        compounds.push(compound);
        i = next;
    }

    if pending == Some(Combinator::Child) {
        return Err(SelectorError::Unexpected {
            selector: full.to_string(),
            found: '>',
            offset: full.len(),
        });
    }

    let mut compounds = compounds.into_iter();
    let head = compounds.next().ok_or(SelectorError::Empty)?;
    Ok(Complex {
        head,
        tail: combinators.into_iter().zip(compounds).collect(),
    })
}

fn parse_compound(
    full: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(Compound, usize), SelectorError> {
    let mut compound = Compound::default();
    let mut i = start;
    let mut any = false;

    if let Some(&(_, c)) = chars.get(i) {
        if c == '*' {
            i += 1;
            any = true;
        } else if is_ident_char(c) {
            let (name, next) = read_ident(chars, i);
            compound.tag = Some(name.to_ascii_lowercase());
            i = next;
            any = true;
        }
    }

    while let Some(&(offset, c)) = chars.get(i) {
        match c {
            '#' => {
                let (name, next) = read_ident(chars, i + 1);
                if name.is_empty() {
                    return Err(unexpected(full, c, offset));
                }
                compound.id = Some(name);
                i = next;
            }
            '.' => {
                let (name, next) = read_ident(chars, i + 1);
                if name.is_empty() {
                    return Err(unexpected(full, c, offset));
                }
                compound.classes.push(name);
                i = next;
            }
            '[' => {
                let (attribute, next) = parse_attribute(full, chars, i + 1)?;
                compound.attributes.push(attribute);
                i = next;
            }
            ':' => {
                let (name, next) = read_ident(chars, i + 1);
                let pseudo = match name.as_str() {
                    "first-of-type" => Pseudo::FirstOfType,
                    "last-of-type" => Pseudo::LastOfType,
                    _ => return Err(SelectorError::UnsupportedPseudo(name)),
                };
                compound.pseudo.push(pseudo);
                i = next;
            }
            _ => break,
        }
        any = true;
    }

    if !any {
        let (offset, c) = chars[start];
        return Err(unexpected(full, c, offset));
    }
    Ok((compound, i))
}

fn parse_attribute(
    full: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(AttributeMatch, usize), SelectorError> {
    let close = chars[start..]
        .iter()
        .position(|&(_, c)| c == ']')
        .map(|p| start + p)
        .ok_or_else(|| SelectorError::UnterminatedAttribute(full.to_string()))?;
    let body: String = chars[start..close].iter().map(|&(_, c)| c).collect();

    let (name, op) = match body.find('=') {
        None => (body.trim().to_string(), AttributeOp::Exists),
        Some(eq) => {
            let (lhs, rhs) = body.split_at(eq);
            let value = unquote(rhs[1..].trim()).to_string();
            let lhs = lhs.trim();
            match lhs.chars().last() {
                Some('*') => (lhs[..lhs.len() - 1].trim().to_string(), AttributeOp::Contains(value)),
                Some('^') => (lhs[..lhs.len() - 1].trim().to_string(), AttributeOp::StartsWith(value)),
                Some('$') => (lhs[..lhs.len() - 1].trim().to_string(), AttributeOp::EndsWith(value)),
                _ => (lhs.to_string(), AttributeOp::Equals(value)),
            }
        }
    };

    if name.is_empty() {
        let (offset, c) = chars[start.min(chars.len() - 1)];
        return Err(unexpected(full, c, offset));
    }

    Ok((
        AttributeMatch {
            name: name.to_ascii_lowercase(),
            op,
        },
        close + 1,
    ))
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[(usize, char)], start: usize) -> (String, usize) {
    let mut i = start;
    let mut name = String::new();
    while let Some(&(_, c)) = chars.get(i) {
        if !is_ident_char(c) {
            break;
        }
        name.push(c);
        i += 1;
    }
    (name, i)
}

fn unexpected(selector: &str, found: char, offset: usize) -> SelectorError {
    SelectorError::Unexpected {
        selector: selector.to_string(),
        found,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Compound Tests ====================

    #[test]
    fn test_parse_id() {
        let selector = Selector::parse("#language-switcher").expect("Should parse");
        let head = &selector.alternatives[0].head;
        assert_eq!(head.id.as_deref(), Some("language-switcher"));
        assert!(head.tag.is_none());
    }

    #[test]
    fn test_parse_tag_with_classes() {
        let selector = Selector::parse("a.github-link.ripple").expect("Should parse");
        let head = &selector.alternatives[0].head;
        assert_eq!(head.tag.as_deref(), Some("a"));
        assert_eq!(head.classes, vec!["github-link", "ripple"]);
    }

    #[test]
    fn test_parse_attribute_contains_quoted() {
        let selector = Selector::parse(".github-link[href*=\"docs\"]").expect("Should parse");
        let head = &selector.alternatives[0].head;
        assert_eq!(
            head.attributes,
            vec![AttributeMatch {
                name: "href".to_string(),
                op: AttributeOp::Contains("docs".to_string()),
            }]
        );
    }

    #[test]
    fn test_parse_attribute_variants() {
        let selector = Selector::parse("[data-processed][lang=zh][src^='/img'][href$=.svg]")
            .expect("Should parse");
        let ops: Vec<_> = selector.alternatives[0]
            .head
            .attributes
            .iter()
            .map(|a| a.op.clone())
            .collect();
        assert_eq!(
            ops,
            vec![
                AttributeOp::Exists,
                AttributeOp::Equals("zh".to_string()),
                AttributeOp::StartsWith("/img".to_string()),
                AttributeOp::EndsWith(".svg".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_pseudo() {
        let selector = Selector::parse("section:last-of-type").expect("Should parse");
        assert_eq!(selector.alternatives[0].head.pseudo, vec![Pseudo::LastOfType]);
    }

    // ==================== Combinator Tests ====================

    #[test]
    fn test_parse_descendant_chain() {
        let selector = Selector::parse(".api-section:last-of-type h3").expect("Should parse");
        let complex = &selector.alternatives[0];
        assert_eq!(complex.head.classes, vec!["api-section"]);
        assert_eq!(complex.tail.len(), 1);
        assert_eq!(complex.tail[0].0, Combinator::Descendant);
        assert_eq!(complex.tail[0].1.tag.as_deref(), Some("h3"));
    }

    #[test]
    fn test_parse_child_combinator_with_spaces() {
        let selector = Selector::parse("pre > code").expect("Should parse");
        let complex = &selector.alternatives[0];
        assert_eq!(complex.tail[0].0, Combinator::Child);
    }

    #[test]
    fn test_parse_list() {
        let selector = Selector::parse(".reveal, .scale-reveal, .code-reveal").expect("Should parse");
        assert_eq!(selector.alternatives.len(), 3);
        assert_eq!(selector.alternatives[2].head.classes, vec!["code-reveal"]);
    }

    // ==================== Error Tests ====================

    #[test]
    fn test_parse_empty_is_error() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert_eq!(Selector::parse("a,"), Err(SelectorError::Empty));
    }

    #[test]
    fn test_parse_unterminated_attribute() {
        assert!(matches!(
            Selector::parse("a[href"),
            Err(SelectorError::UnterminatedAttribute(_))
        ));
    }

    #[test]
    fn test_parse_unsupported_pseudo() {
        assert_eq!(
            Selector::parse("a:hover"),
            Err(SelectorError::UnsupportedPseudo("hover".to_string()))
        );
    }

    #[test]
    fn test_parse_dangling_child_combinator() {
        assert!(Selector::parse("pre >").is_err());
        assert!(Selector::parse("> code").is_err());
    }

    #[test]
    fn test_attribute_op_matches() {
        assert!(AttributeOp::Contains("docs".into()).matches("/docs/zh/"));
        assert!(!AttributeOp::Contains("docs".into()).matches("https://github.com"));
        assert!(!AttributeOp::Contains(String::new()).matches("anything"));
        assert!(AttributeOp::Exists.matches(""));
    }
}
