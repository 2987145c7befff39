//! Predicates evaluated against a candidate match.
//!
//! Any `Fn(&MatchedSubgraph, &NodeMap) -> bool` is a [`Condition`]. Textual
//! conditions from the command line are parsed into a [`ConditionExpr`]:
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := atom ("and" atom)*
//! atom    := "(" expr ")" | "not" atom | operand OP operand
//! operand := symbol "." property | 'string' | "string" | number
//! OP      := == | != | < | <= | > | >=
//! ```

use std::cmp::Ordering;

use crate::{
    errors::GrayMatchError,
    matcher::NodeMap,
    subgraph::MatchedSubgraph,
};

pub trait Condition {
    fn evaluate(&self, subgraph: &MatchedSubgraph, nodemap: &NodeMap) -> bool;
}

impl<F> Condition for F
where
    F: Fn(&MatchedSubgraph, &NodeMap) -> bool,
{
    fn evaluate(&self, subgraph: &MatchedSubgraph, nodemap: &NodeMap) -> bool {
        self(subgraph, nodemap)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// `symbol.property` of the data vertex mapped to a query symbol.
    Attribute { symbol: String, property: String },
    Literal(String),
}

impl Operand {
    fn resolve(&self, subgraph: &MatchedSubgraph, nodemap: &NodeMap) -> Option<String> {
        match self {
            Operand::Literal(value) => Some(value.clone()),
            Operand::Attribute { symbol, property } => {
                let vertex = nodemap.get(symbol)?;
                let attrs = subgraph.vertex(*vertex)?;
                Some(attrs.get(property).to_string())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionExpr {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    And(Box<ConditionExpr>, Box<ConditionExpr>),
    Or(Box<ConditionExpr>, Box<ConditionExpr>),
    Not(Box<ConditionExpr>),
}

impl ConditionExpr {
    pub fn parse(input: &str) -> Result<Self, GrayMatchError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(GrayMatchError::query_parse("empty condition"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(GrayMatchError::query_parse(format!(
                "unexpected token {token:?} in condition"
            )));
        }
        Ok(expr)
    }

    /// Query symbols the expression refers to.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ConditionExpr::Compare { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Attribute { symbol, .. } = operand {
                        out.push(symbol);
                    }
                }
            }
            ConditionExpr::And(a, b) | ConditionExpr::Or(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            ConditionExpr::Not(inner) => inner.collect_symbols(out),
        }
    }
}

impl Condition for ConditionExpr {
    fn evaluate(&self, subgraph: &MatchedSubgraph, nodemap: &NodeMap) -> bool {
        match self {
            ConditionExpr::Compare { left, op, right } => {
                let (Some(l), Some(r)) = (
                    left.resolve(subgraph, nodemap),
                    right.resolve(subgraph, nodemap),
                ) else {
                    return false;
                };
                op.accepts(compare_values(&l, &r))
            }
            ConditionExpr::And(a, b) => {
                a.evaluate(subgraph, nodemap) && b.evaluate(subgraph, nodemap)
            }
            ConditionExpr::Or(a, b) => a.evaluate(subgraph, nodemap) || b.evaluate(subgraph, nodemap),
            ConditionExpr::Not(inner) => !inner.evaluate(subgraph, nodemap),
        }
    }
}

/// Numeric comparison when both sides parse as numbers, text otherwise.
fn compare_values(left: &str, right: &str) -> Ordering {
    match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.total_cmp(&b),
        _ => left.cmp(right),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Text(String),
    Number(String),
    Dot,
    Op(CompareOp),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, GrayMatchError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .ok_or_else(|| GrayMatchError::query_parse("unterminated string literal"))?;
                tokens.push(Token::Text(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '=' | '!' | '<' | '>' => {
                let next = chars.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    ('=', Some('=')) => (CompareOp::Eq, 2),
                    ('!', Some('=')) => (CompareOp::Ne, 2),
                    ('<', Some('=')) => (CompareOp::Le, 2),
                    ('>', Some('=')) => (CompareOp::Ge, 2),
                    ('<', _) => (CompareOp::Lt, 1),
                    ('>', _) => (CompareOp::Gt, 1),
                    _ => {
                        return Err(GrayMatchError::query_parse(format!(
                            "unknown operator at position {i}"
                        )));
                    }
                };
                tokens.push(Token::Op(op));
                i += width;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(GrayMatchError::query_parse(format!(
                    "unexpected character '{other}' in condition"
                )));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn keyword(&mut self, word: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case(word) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn parse_or(&mut self) -> Result<ConditionExpr, GrayMatchError> {
        let mut expr = self.parse_and()?;
        while self.keyword("or") {
            let rhs = self.parse_and()?;
            expr = ConditionExpr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<ConditionExpr, GrayMatchError> {
        let mut expr = self.parse_atom()?;
        while self.keyword("and") {
            let rhs = self.parse_atom()?;
            expr = ConditionExpr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<ConditionExpr, GrayMatchError> {
        if self.keyword("not") {
            return Ok(ConditionExpr::Not(Box::new(self.parse_atom()?)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let expr = self.parse_or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(expr),
                _ => Err(GrayMatchError::query_parse("missing closing parenthesis")),
            };
        }
        let left = self.parse_operand()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            other => {
                return Err(GrayMatchError::query_parse(format!(
                    "expected comparison operator, found {other:?}"
                )));
            }
        };
        let right = self.parse_operand()?;
        Ok(ConditionExpr::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, GrayMatchError> {
        match self.next() {
            Some(Token::Text(value)) | Some(Token::Number(value)) => Ok(Operand::Literal(value)),
            Some(Token::Ident(symbol)) => {
                if self.next() != Some(Token::Dot) {
                    return Err(GrayMatchError::query_parse(format!(
                        "expected '.' after symbol '{symbol}'"
                    )));
                }
                match self.next() {
                    Some(Token::Ident(property)) => Ok(Operand::Attribute { symbol, property }),
                    _ => Err(GrayMatchError::query_parse(format!(
                        "expected property name after '{symbol}.'"
                    ))),
                }
            }
            other => Err(GrayMatchError::query_parse(format!(
                "expected operand, found {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::VertexAttrs;

    fn sample() -> (MatchedSubgraph, NodeMap) {
        let mut sg = MatchedSubgraph::new(false);
        sg.add_vertex(1, VertexAttrs::labeled("person").prop("age", "42"));
        sg.add_vertex(2, VertexAttrs::labeled("person").prop("age", "7"));
        sg.add_edge(1, 2);
        let nodemap = NodeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
        (sg, nodemap)
    }

    #[test]
    fn numeric_and_text_comparisons() {
        let (sg, map) = sample();
        let expr = ConditionExpr::parse("a.age > b.age and a.label == 'person'").unwrap();
        assert!(expr.evaluate(&sg, &map));
        // "42" < "7" as text, so numbers must compare numerically
        let expr = ConditionExpr::parse("a.age <= 7 or not (b.label != \"person\")").unwrap();
        assert!(expr.evaluate(&sg, &map));
        assert_eq!(expr.symbols(), vec!["a", "b"]);
    }

    #[test]
    fn unknown_symbol_is_false() {
        let (sg, map) = sample();
        let expr = ConditionExpr::parse("z.age == 1").unwrap();
        assert!(!expr.evaluate(&sg, &map));
    }

    #[test]
    fn malformed_conditions_rejected() {
        assert!(ConditionExpr::parse("").is_err());
        assert!(ConditionExpr::parse("a.age =").is_err());
        assert!(ConditionExpr::parse("a.age == 'x").is_err());
        assert!(ConditionExpr::parse("(a.age == 1").is_err());
        assert!(ConditionExpr::parse("a == 1").is_err());
    }
}
