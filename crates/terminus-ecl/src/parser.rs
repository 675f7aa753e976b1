//! Recursive-descent parser over the token stream.

use crate::ast::{AttributeName, Constraint, Operator, Refinement, RefinementItem, SetOp};
use crate::lexer::{tokenize, Spanned, Token};
use crate::EclError;

/// Parses an expression constraint into its AST.
///
/// ```
/// use terminus_ecl::{parse, Constraint, Operator};
///
/// let ast = parse("< 404684003")?;
/// assert_eq!(
///     ast,
///     Constraint::Hierarchy(Operator::Descendants, Box::new(Constraint::Concept(404684003)))
/// );
/// # Ok::<(), terminus_ecl::EclError>(())
/// ```
pub fn parse(input: &str) -> Result<Constraint, EclError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.len(),
    };
    let constraint = parser.expression()?;
    if let Some(trailing) = parser.peek() {
        return Err(EclError::Parse {
            position: trailing.position,
            message: format!("unexpected trailing {:?}", trailing.token),
        });
    }
    Ok(constraint)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<Spanned> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Spanned> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, message: impl Into<String>) -> EclError {
        let position = self
            .peek()
            .map(|s| s.position)
            .unwrap_or(self.input_len);
        EclError::Parse {
            position,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), EclError> {
        match self.peek() {
            Some(spanned) if spanned.token == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error_here(format!("expected {what}"))),
        }
    }

    /// expression := subexpression ((AND | OR | MINUS) subexpression)*
    fn expression(&mut self) -> Result<Constraint, EclError> {
        let mut left = self.subexpression()?;
        while let Some(spanned) = self.peek() {
            let op = match spanned.token {
                Token::And => SetOp::And,
                Token::Or => SetOp::Or,
                Token::Minus => SetOp::Minus,
                _ => break,
            };
            self.pos += 1;
            let right = self.subexpression()?;
            left = Constraint::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// subexpression := [hierarchy-op] primary [":" refinement-list]
    fn subexpression(&mut self) -> Result<Constraint, EclError> {
        let focus = self.operated_primary()?;

        if matches!(self.peek().map(|s| s.token), Some(Token::Colon)) {
            self.pos += 1;
            let refinements = self.refinement_list()?;
            return Ok(Constraint::Refined {
                focus: Box::new(focus),
                refinements,
            });
        }
        Ok(focus)
    }

    fn operated_primary(&mut self) -> Result<Constraint, EclError> {
        let operator = match self.peek().map(|s| s.token) {
            Some(Token::Lt) => Some(Operator::Descendants),
            Some(Token::LtLt) => Some(Operator::DescendantsOrSelf),
            Some(Token::Gt) => Some(Operator::Ancestors),
            Some(Token::GtGt) => Some(Operator::AncestorsOrSelf),
            Some(Token::LtBang) => Some(Operator::Children),
            Some(Token::GtBang) => Some(Operator::Parents),
            _ => None,
        };
        if operator.is_some() {
            self.pos += 1;
        }

        let primary = self.primary()?;
        Ok(match operator {
            Some(op) => Constraint::Hierarchy(op, Box::new(primary)),
            None => primary,
        })
    }

    /// primary := NUMBER | "*" | "^" NUMBER | "(" expression ")"
    fn primary(&mut self) -> Result<Constraint, EclError> {
        match self.bump() {
            Some(Spanned {
                token: Token::Number(id),
                ..
            }) => Ok(Constraint::Concept(id)),
            Some(Spanned {
                token: Token::Star, ..
            }) => Ok(Constraint::Wildcard),
            Some(Spanned {
                token: Token::Caret,
                ..
            }) => match self.bump() {
                Some(Spanned {
                    token: Token::Number(refset_id),
                    ..
                }) => Ok(Constraint::MemberOf(refset_id)),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    Err(self.error_here("expected refset id after '^'"))
                }
            },
            Some(Spanned {
                token: Token::LParen,
                ..
            }) => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(spanned) => Err(EclError::Parse {
                position: spanned.position,
                message: format!("expected a concept, '*', '^', or '(', found {:?}", spanned.token),
            }),
            None => Err(self.error_here("expected a focus concept")),
        }
    }

    /// refinement-list := refinement-item ("," refinement-item)*
    fn refinement_list(&mut self) -> Result<Vec<RefinementItem>, EclError> {
        let mut items = vec![self.refinement_item()?];
        while matches!(self.peek().map(|s| s.token), Some(Token::Comma)) {
            self.pos += 1;
            items.push(self.refinement_item()?);
        }
        Ok(items)
    }

    /// refinement-item := "{" attribute ("," attribute)* "}" | attribute
    fn refinement_item(&mut self) -> Result<RefinementItem, EclError> {
        if matches!(self.peek().map(|s| s.token), Some(Token::LBrace)) {
            self.pos += 1;
            let mut group = vec![self.attribute()?];
            while matches!(self.peek().map(|s| s.token), Some(Token::Comma)) {
                self.pos += 1;
                group.push(self.attribute()?);
            }
            self.expect(Token::RBrace, "'}'")?;
            Ok(RefinementItem::Group(group))
        } else {
            Ok(RefinementItem::Attribute(self.attribute()?))
        }
    }

    /// attribute := (NUMBER | "*") "=" attribute-value
    fn attribute(&mut self) -> Result<Refinement, EclError> {
        let attribute = match self.bump() {
            Some(Spanned {
                token: Token::Number(type_id),
                ..
            }) => AttributeName::Type(type_id),
            Some(Spanned {
                token: Token::Star, ..
            }) => AttributeName::Any,
            Some(spanned) => {
                return Err(EclError::Parse {
                    position: spanned.position,
                    message: format!("expected an attribute type, found {:?}", spanned.token),
                })
            }
            None => return Err(self.error_here("expected an attribute type")),
        };
        self.expect(Token::Equals, "'='")?;
        let value = self.operated_primary()?;
        Ok(Refinement { attribute, value })
    }
}
