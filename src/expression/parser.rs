use super::ast::{Expr, Func};
use crate::error::ParseError;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Caret => "^".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }

    /// Tokens that may start an operand of an implicit product (`2x`, `3(x+1)`).
    fn starts_operand(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Ident(_) | Token::LParen)
    }
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' | '[' => Token::LParen,
            ')' | ']' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent suffix: 1e-3, 2.5E+4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                    text: text.clone(),
                    pos: start,
                })?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push((Token::Ident(name), start));
                continue;
            }
            other => return Err(ParseError::UnexpectedChar { ch: other, pos: start }),
        };
        tokens.push((token, start));
        i += 1;
    }

    Ok(tokens)
}

/// Deepest tree the parser will build, and the deepest grouping it will
/// recurse into. Derivatives and the compiler walk the tree recursively.
pub const MAX_DEPTH: usize = 256;

/// Subtree together with its height.
type Node = (Expr, usize);

/// Recursive-descent parser over the canonical expression grammar.
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/') unary | unary)*
/// unary   := ('-' | '+') unary | power
/// power   := primary ('^' unary)?
/// primary := number | ident | ident '(' expr ')' | '(' expr ')'
/// ```
pub(crate) struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    pub(crate) fn new(src: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(src)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Self {
            tokens,
            pos: 0,
            nesting: 0,
        })
    }

    pub(crate) fn parse(mut self) -> Result<Expr, ParseError> {
        let (expr, _) = self.parse_additive()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some((tok, pos)) => Err(ParseError::UnexpectedToken {
                expected: "operator or end of expression",
                found: tok.describe(),
                pos: *pos,
            }),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Source offset of the current token, or of the last one at the end.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map_or(0, |(_, pos)| *pos)
    }

    fn too_deep(&self) -> ParseError {
        ParseError::TooDeep {
            limit: MAX_DEPTH,
            pos: self.offset(),
        }
    }

    /// Height of a node built over children of height `child`.
    fn over(&self, child: usize) -> Result<usize, ParseError> {
        if child >= MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(child + 1)
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some((Token::RParen, _)) => Ok(()),
            Some((tok, pos)) => Err(ParseError::UnexpectedToken {
                expected: "')'",
                found: tok.describe(),
                pos,
            }),
            None => Err(ParseError::UnexpectedEnd { expected: "')'" }),
        }
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let (mut lhs, mut height) = self.parse_multiplicative()?;
        loop {
            let subtract = match self.peek() {
                Some(Token::Plus) => false,
                Some(Token::Minus) => true,
                _ => return Ok((lhs, height)),
            };
            self.pos += 1;
            let (rhs, rhs_height) = self.parse_multiplicative()?;
            height = self.over(height.max(rhs_height))?;
            lhs = if subtract {
                Expr::sub(lhs, rhs)
            } else {
                Expr::add(lhs, rhs)
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        let (mut lhs, mut height) = self.parse_unary()?;
        loop {
            let divide = matches!(self.peek(), Some(Token::Slash));
            let (rhs, rhs_height) = match self.peek() {
                Some(Token::Star | Token::Slash) => {
                    self.pos += 1;
                    self.parse_unary()?
                }
                Some(tok) if tok.starts_operand() => self.parse_power()?,
                _ => return Ok((lhs, height)),
            };
            height = self.over(height.max(rhs_height))?;
            lhs = if divide {
                Expr::div(lhs, rhs)
            } else {
                Expr::mul(lhs, rhs)
            };
        }
    }

    /// Every recursive path of the grammar passes through here, so the
    /// nesting guard lives at this level.
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        let node = self.parse_unary_inner();
        self.nesting -= 1;
        node
    }

    fn parse_unary_inner(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let (inner, height) = self.parse_unary()?;
                Ok((Expr::Neg(inner.boxed()), self.over(height)?))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let (base, base_height) = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.pos += 1;
            let (exponent, exp_height) = self.parse_unary()?;
            let height = self.over(base_height.max(exp_height))?;
            return Ok((Expr::pow(base, exponent), height));
        }
        Ok((base, base_height))
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let (tok, pos) = self.next().ok_or(ParseError::UnexpectedEnd {
            expected: "number, variable or '('",
        })?;

        match tok {
            Token::Number(value) => Ok((Expr::Const(value), 1)),
            Token::LParen => {
                let inner = self.parse_additive()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if let Some(Token::LParen) = self.peek() {
                    let func = Func::from_name(&name)
                        .ok_or(ParseError::UnknownFunction { name: name.clone(), pos })?;
                    self.pos += 1;
                    let (arg, height) = self.parse_additive()?;
                    self.expect_rparen()?;
                    return Ok((Expr::call(func, arg), self.over(height)?));
                }
                let leaf = match name.as_str() {
                    "pi" => Expr::Const(std::f64::consts::PI),
                    "e" => Expr::Const(std::f64::consts::E),
                    _ => Expr::Var(name),
                };
                Ok((leaf, 1))
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "number, variable or '('",
                found: other.describe(),
                pos,
            }),
        }
    }
}

/// Parse a canonical expression string into a tree.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    Parser::new(src)?.parse()
}
