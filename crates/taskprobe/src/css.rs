//! CSS selector subset evaluated against [`DomSnapshot`](crate::DomSnapshot)s.
//!
//! Supported grammar, which covers the application's conventions:
//!
//! - type and universal selectors: `div`, `*`
//! - `#id`, `.class`
//! - attribute tests: `[attr]`, `[attr=v]`, `[attr*=v]`, `[attr^=v]`,
//!   `[attr$=v]`, `[attr~=v]` (values quoted or bare)
//! - the `:has-text("...")` pseudo-class (case-insensitive containment of the
//!   rendered text)
//! - descendant (whitespace) and child (`>`) combinators
//! - selector lists separated by commas

use crate::dom::{DomNode, NodePath};
use crate::result::{ProbeError, ProbeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrTest {
    fn matches(&self, node: &DomNode) -> bool {
        let joined_classes;
        let actual = if self.name == "class" {
            if node.classes.is_empty() {
                None
            } else {
                joined_classes = node.classes.join(" ");
                Some(joined_classes.as_str())
            }
        } else {
            node.attr(&self.name)
        };
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => actual.contains(&self.value),
            AttrOp::Prefix => actual.starts_with(&self.value),
            AttrOp::Suffix => actual.ends_with(&self.value),
            AttrOp::Word => actual.split_whitespace().any(|w| w == self.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
    has_text: Vec<String>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.has_text.is_empty()
    }

    fn matches(&self, node: &DomNode) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && *tag != node.tag {
                return false;
            }
        }
        if !self.ids.iter().all(|id| node.id.as_deref() == Some(id)) {
            return false;
        }
        if !self.classes.iter().all(|c| node.has_class(c)) {
            return false;
        }
        if !self.attrs.iter().all(|a| a.matches(node)) {
            return false;
        }
        if !self.has_text.is_empty() {
            let text = node.text_content().to_lowercase();
            if !self.has_text.iter().all(|t| text.contains(t.as_str())) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    // (combinator linking this compound to the previous one, compound)
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches_chain(&self, chain: &[&DomNode]) -> bool {
        match (self.parts.len(), chain.len()) {
            (0, _) | (_, 0) => false,
            (parts, nodes) => self.match_at(parts - 1, nodes - 1, chain),
        }
    }

    fn match_at(&self, part: usize, node: usize, chain: &[&DomNode]) -> bool {
        let (combinator, compound) = &self.parts[part];
        if !compound.matches(chain[node]) {
            return false;
        }
        if part == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => node > 0 && self.match_at(part - 1, node - 1, chain),
            Combinator::Descendant => (0..node).rev().any(|k| self.match_at(part - 1, k, chain)),
        }
    }
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSelector {
    source: String,
    alternatives: Vec<Complex>,
}

impl CssSelector {
    /// Parse a selector list
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidSelector`] for empty input or syntax
    /// outside the supported subset.
    pub fn parse(source: &str) -> ProbeResult<Self> {
        let mut alternatives = Vec::new();
        for piece in split_top_level(source) {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(invalid(source, "empty selector in list"));
            }
            alternatives.push(Parser::new(source, piece).complex()?);
        }
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    /// Selector source text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the node at `path` (relative to `root`) matches.
    ///
    /// Ancestor tests only see nodes from `root` downwards.
    #[must_use]
    pub fn matches(&self, root: &DomNode, path: &NodePath) -> bool {
        let Some(chain) = root.chain(path) else {
            return false;
        };
        self.alternatives.iter().any(|c| c.matches_chain(&chain))
    }
}

fn invalid(source: &str, message: impl Into<String>) -> ProbeError {
    ProbeError::InvalidSelector {
        selector: source.to_string(),
        message: message.into(),
    }
}

/// Split on commas that are outside quotes and parentheses
fn split_top_level(source: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in source.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                pieces.push(&source[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&source[start..]);
    pieces
}

struct Parser<'s> {
    source: &'s str,
    chars: Vec<char>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, piece: &str) -> Self {
        Self {
            source,
            chars: piece.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, wanted: char) -> ProbeResult<()> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(invalid(self.source, format!("expected '{wanted}', found '{c}'"))),
            None => Err(invalid(self.source, format!("expected '{wanted}', found end"))),
        }
    }

    fn complex(&mut self) -> ProbeResult<Complex> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        let _ = self.skip_ws();
        loop {
            let compound = self.compound()?;
            parts.push((combinator, compound));
            let saw_ws = self.skip_ws();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    let _ = self.skip_ws();
                    combinator = Combinator::Child;
                }
                Some(_) if saw_ws => combinator = Combinator::Descendant,
                Some(c) => return Err(invalid(self.source, format!("unexpected '{c}'"))),
            }
        }
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> ProbeResult<Compound> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    self.pos += 1;
                    compound.ids.push(self.ident()?);
                }
                '.' => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                '[' => {
                    self.pos += 1;
                    compound.attrs.push(self.attr_test()?);
                }
                ':' => {
                    self.pos += 1;
                    let name = self.ident()?;
                    if name != "has-text" {
                        return Err(invalid(self.source, format!("unsupported pseudo-class :{name}")));
                    }
                    self.expect('(')?;
                    let _ = self.skip_ws();
                    let text = self.string_or_ident()?;
                    let _ = self.skip_ws();
                    self.expect(')')?;
                    compound.has_text.push(text.to_lowercase());
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(invalid(self.source, "expected a simple selector"));
        }
        Ok(compound)
    }

    fn attr_test(&mut self) -> ProbeResult<AttrTest> {
        let _ = self.skip_ws();
        let name = self.ident()?;
        let _ = self.skip_ws();
        let op = match self.bump() {
            Some(']') => {
                return Ok(AttrTest {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                })
            }
            Some('=') => AttrOp::Equals,
            Some(prefix @ ('*' | '^' | '$' | '~')) => {
                self.expect('=')?;
                match prefix {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Word,
                }
            }
            Some(c) => return Err(invalid(self.source, format!("unexpected '{c}' in attribute test"))),
            None => return Err(invalid(self.source, "unterminated attribute test")),
        };
        let _ = self.skip_ws();
        let value = self.string_or_ident()?;
        let _ = self.skip_ws();
        self.expect(']')?;
        Ok(AttrTest { name, op, value })
    }

    fn ident(&mut self) -> ProbeResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(invalid(self.source, "expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn string_or_ident(&mut self) -> ProbeResult<String> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => {
                            if let Some(c) = self.bump() {
                                out.push(c);
                            }
                        }
                        Some(c) if c == q => return Ok(out),
                        Some(c) => out.push(c),
                        None => return Err(invalid(self.source, "unterminated string")),
                    }
                }
            }
            _ => self.ident(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn page() -> DomNode {
        DomNode::element("body")
            .with_child(
                DomNode::element("nav").with_child(
                    DomNode::element("button")
                        .with_attr("data-collapse-toggle", "navbar-default")
                        .with_attr("type", "button"),
                ),
            )
            .with_child(
                DomNode::element("form")
                    .with_child(DomNode::element("input").with_id("title").with_attr("required", ""))
                    .with_child(DomNode::element("select").with_id("priority"))
                    .with_child(
                        DomNode::element("button")
                            .with_attr("type", "submit")
                            .with_text("Add Task"),
                    ),
            )
            .with_child(
                DomNode::element("div")
                    .with_class("p-6 rounded-lg shadow-md")
                    .with_child(DomNode::element("button").with_text("Save Changes")),
            )
    }

    fn matching(selector: &str) -> Vec<NodePath> {
        let root = page();
        let css = CssSelector::parse(selector).unwrap();
        root.walk()
            .into_iter()
            .filter(|n| css.matches(&root, &n.path))
            .map(|n| n.path)
            .collect()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_rejects_empty() {
            assert!(CssSelector::parse("").is_err());
            assert!(CssSelector::parse("a,,b").is_err());
        }

        #[test]
        fn test_rejects_unsupported_pseudo() {
            let err = CssSelector::parse("button:hover").unwrap_err();
            assert!(err.to_string().contains(":hover"));
        }

        #[test]
        fn test_rejects_unterminated_attr() {
            assert!(CssSelector::parse("input[type=\"submit\"").is_err());
        }

        #[test]
        fn test_keeps_source() {
            let css = CssSelector::parse("input#email").unwrap();
            assert_eq!(css.source(), "input#email");
        }
    }

    mod match_tests {
        use super::*;

        #[test]
        fn test_tag_and_id() {
            assert_eq!(matching("input#title"), vec![NodePath(vec![1, 0])]);
            assert!(matching("textarea#title").is_empty());
        }

        #[test]
        fn test_attribute_equals() {
            assert_eq!(
                matching("button[type=\"submit\"]"),
                vec![NodePath(vec![1, 2])]
            );
            assert_eq!(
                matching("button[data-collapse-toggle='navbar-default']"),
                vec![NodePath(vec![0, 0])]
            );
        }

        #[test]
        fn test_attribute_exists() {
            assert_eq!(matching("[required]"), vec![NodePath(vec![1, 0])]);
        }

        #[test]
        fn test_compound_classes() {
            assert_eq!(
                matching("div.p-6.rounded-lg.shadow-md"),
                vec![NodePath(vec![2])]
            );
            assert!(matching("div.p-6.hidden").is_empty());
        }

        #[test]
        fn test_has_text_is_case_insensitive() {
            assert_eq!(
                matching("button:has-text(\"save changes\")"),
                vec![NodePath(vec![2, 0])]
            );
        }

        #[test]
        fn test_selector_list() {
            let found = matching("button:has-text(\"OK\"), button:has-text(\"Add\")");
            assert_eq!(found, vec![NodePath(vec![1, 2])]);
        }

        #[test]
        fn test_descendant_and_child_combinators() {
            assert_eq!(matching("form button"), vec![NodePath(vec![1, 2])]);
            assert_eq!(matching("body > form > select"), vec![NodePath(vec![1, 1])]);
            assert!(matching("nav > form button").is_empty());
        }

        #[test]
        fn test_class_attribute_contains() {
            assert_eq!(matching("[class*=\"shadow\"]"), vec![NodePath(vec![2])]);
        }
    }
}
