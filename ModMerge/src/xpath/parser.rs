//! Recursive-descent parser for the XPath subset
//!
//! ```text
//! path      := step ('/' step)*
//! step      := name predicate*
//! name      := NCName | '*'
//! predicate := '[' integer ']' | '[' term ('and' term)* ']'
//! term      := '@' name ('=' literal)? | path
//! literal   := "'" chars "'" | '"' chars '"'
//! ```

use crate::error::{Error, Result};

use super::escape::unescape;

/// Element name test of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// `*`
    Any,
    /// A literal element name
    Name(String),
}

/// One location step: a name test followed by predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: NameTest,
    pub predicates: Vec<Predicate>,
}

/// A bracketed predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[n]`, 1-based over the current candidate list
    Position(usize),
    /// `[a and b and ...]`
    All(Vec<Term>),
}

/// A boolean term inside a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// `@name='value'`
    AttrEquals(String, String),
    /// `@name`
    AttrExists(String),
    /// A relative child path; true if it selects anything
    Path(Vec<Step>),
}

pub(crate) struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Parse the whole input as a path.
    pub(crate) fn parse_path(mut self) -> Result<Vec<Step>> {
        self.skip_ws();
        let steps = self.path()?;
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(steps)
    }

    fn path(&mut self) -> Result<Vec<Step>> {
        let mut steps = vec![self.step()?];
        loop {
            self.skip_ws();
            if self.eat('/') {
                self.skip_ws();
                steps.push(self.step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn step(&mut self) -> Result<Step> {
        let name = if self.eat('*') {
            NameTest::Any
        } else {
            NameTest::Name(self.name()?)
        };
        let mut predicates = Vec::new();
        loop {
            self.skip_ws();
            if !self.eat('[') {
                break;
            }
            self.skip_ws();
            predicates.push(self.predicate()?);
            self.skip_ws();
            if !self.eat(']') {
                return Err(self.error("expected ']'"));
            }
        }
        Ok(Step { name, predicates })
    }

    fn predicate(&mut self) -> Result<Predicate> {
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            let n: usize = self.src[start..self.pos]
                .parse()
                .map_err(|_| self.error("position out of range"))?;
            if n == 0 {
                return Err(self.error("positions are 1-based"));
            }
            return Ok(Predicate::Position(n));
        }

        let mut terms = vec![self.term()?];
        loop {
            self.skip_ws();
            if self.eat_keyword("and") {
                self.skip_ws();
                terms.push(self.term()?);
            } else {
                return Ok(Predicate::All(terms));
            }
        }
    }

    fn term(&mut self) -> Result<Term> {
        if self.eat('@') {
            let name = self.name()?;
            self.skip_ws();
            if self.eat('=') {
                self.skip_ws();
                let value = self.literal()?;
                Ok(Term::AttrEquals(name, value))
            } else {
                Ok(Term::AttrExists(name))
            }
        } else {
            Ok(Term::Path(self.path()?))
        }
    }

    fn literal(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quoted literal")),
        };
        self.bump();
        let start = self.pos;
        let Some(len) = self.src[start..].find(quote) else {
            return Err(self.error("unterminated literal"));
        };
        self.pos = start + len + quote.len_utf8();
        Ok(unescape(&self.src[start..start + len]))
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => self.bump(),
            _ => return Err(self.error("expected a name")),
        }
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = &self.src[self.pos..];
        if rest.starts_with(keyword) && !rest[keyword.len()..].chars().next().is_some_and(is_name_char) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::SelectorSyntax {
            selector: self.src.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> Result<Vec<Step>> {
        Parser::new(s).parse_path()
    }

    fn name(s: &str) -> NameTest {
        NameTest::Name(s.to_string())
    }

    #[test]
    fn test_plain_tag() {
        let steps = parse("Object").unwrap();
        assert_eq!(
            steps,
            vec![Step {
                name: name("Object"),
                predicates: vec![]
            }]
        );
    }

    #[test]
    fn test_attribute_predicates() {
        let steps = parse("A[@x='1'][@y=\"two words\"]").unwrap();
        assert_eq!(
            steps[0].predicates,
            vec![
                Predicate::All(vec![Term::AttrEquals("x".into(), "1".into())]),
                Predicate::All(vec![Term::AttrEquals("y".into(), "two words".into())]),
            ]
        );
    }

    #[test]
    fn test_nested_and() {
        let steps = parse("T[C[1][@k='a'] and C[2][@k='b']]").unwrap();
        let Predicate::All(terms) = &steps[0].predicates[0] else {
            panic!("expected term list");
        };
        assert_eq!(terms.len(), 2);
        assert_eq!(
            terms[1],
            Term::Path(vec![Step {
                name: name("C"),
                predicates: vec![
                    Predicate::Position(2),
                    Predicate::All(vec![Term::AttrEquals("k".into(), "b".into())]),
                ],
            }])
        );
    }

    #[test]
    fn test_multi_step_with_slash_in_literal() {
        let steps = parse("Mod[@path='a/b']/Item").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[0].predicates,
            vec![Predicate::All(vec![Term::AttrEquals("path".into(), "a/b".into())])]
        );
    }

    #[test]
    fn test_escaped_literal() {
        let steps = parse("A[@n='it&apos;s']").unwrap();
        assert_eq!(
            steps[0].predicates,
            vec![Predicate::All(vec![Term::AttrEquals("n".into(), "it's".into())])]
        );
    }

    #[test]
    fn test_and_prefix_name_is_a_path() {
        let steps = parse("A[android]").unwrap();
        assert_eq!(
            steps[0].predicates,
            vec![Predicate::All(vec![Term::Path(vec![Step {
                name: name("android"),
                predicates: vec![]
            }])])]
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("A[").is_err());
        assert!(parse("A[@x='1'").is_err());
        assert!(parse("A[@x='1]").is_err());
        assert!(parse("A[0]").is_err());
        assert!(parse("A]").is_err());
    }
}
