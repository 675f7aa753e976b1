//! Tokeniser for expression constraints.

use terminus_types::SctId;

use crate::EclError;

/// A lexical token with its byte offset in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    Number(SctId),
    Lt,
    LtLt,
    LtBang,
    Gt,
    GtGt,
    GtBang,
    Caret,
    Star,
    Colon,
    Comma,
    Equals,
    LBrace,
    RBrace,
    LParen,
    RParen,
    And,
    Or,
    Minus,
}

/// Tokenises an expression. `|term|` annotations are trivia and vanish
/// here; keywords are case-insensitive.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, EclError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                pos += 1;
            }
            '|' => {
                // Skip a pipe-delimited term annotation.
                match input[pos + 1..].find('|') {
                    Some(end) => pos += end + 2,
                    None => {
                        return Err(EclError::Parse {
                            position: start,
                            message: "unterminated |term| annotation".to_string(),
                        })
                    }
                }
            }
            '<' => {
                pos += 1;
                let token = match bytes.get(pos).map(|b| *b as char) {
                    Some('<') => {
                        pos += 1;
                        Token::LtLt
                    }
                    Some('!') => {
                        pos += 1;
                        Token::LtBang
                    }
                    _ => Token::Lt,
                };
                tokens.push(Spanned { token, position: start });
            }
            '>' => {
                pos += 1;
                let token = match bytes.get(pos).map(|b| *b as char) {
                    Some('>') => {
                        pos += 1;
                        Token::GtGt
                    }
                    Some('!') => {
                        pos += 1;
                        Token::GtBang
                    }
                    _ => Token::Gt,
                };
                tokens.push(Spanned { token, position: start });
            }
            '^' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::Caret,
                    position: start,
                });
            }
            '*' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::Star,
                    position: start,
                });
            }
            ':' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::Colon,
                    position: start,
                });
            }
            ',' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::Comma,
                    position: start,
                });
            }
            '=' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::Equals,
                    position: start,
                });
            }
            '{' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::LBrace,
                    position: start,
                });
            }
            '}' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::RBrace,
                    position: start,
                });
            }
            '(' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::LParen,
                    position: start,
                });
            }
            ')' => {
                pos += 1;
                tokens.push(Spanned {
                    token: Token::RParen,
                    position: start,
                });
            }
            '0'..='9' => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let digits = &input[start..pos];
                let value = digits.parse::<u64>().map_err(|_| EclError::Parse {
                    position: start,
                    message: format!("concept id {digits:?} out of range"),
                })?;
                tokens.push(Spanned {
                    token: Token::Number(value),
                    position: start,
                });
            }
            c if c.is_ascii_alphabetic() => {
                while pos < bytes.len() && (bytes[pos] as char).is_ascii_alphabetic() {
                    pos += 1;
                }
                let word = &input[start..pos];
                let token = match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "MINUS" => Token::Minus,
                    _ => {
                        return Err(EclError::Parse {
                            position: start,
                            message: format!("unexpected word {word:?}"),
                        })
                    }
                };
                tokens.push(Spanned { token, position: start });
            }
            other => {
                return Err(EclError::Parse {
                    position: start,
                    message: format!("unexpected character {other:?}"),
                })
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn operators_and_numbers() {
        assert_eq!(
            kinds("<< 73211009"),
            vec![Token::LtLt, Token::Number(73211009)]
        );
        assert_eq!(
            kinds("<!404684003 >! 100"),
            vec![
                Token::LtBang,
                Token::Number(404684003),
                Token::GtBang,
                Token::Number(100)
            ]
        );
        assert_eq!(kinds("^ 900001 *"), vec![Token::Caret, Token::Number(900001), Token::Star]);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("1 AND 2 or 3 Minus 4"),
            vec![
                Token::Number(1),
                Token::And,
                Token::Number(2),
                Token::Or,
                Token::Number(3),
                Token::Minus,
                Token::Number(4)
            ]
        );
    }

    #[test]
    fn pipe_terms_are_trivia() {
        assert_eq!(
            kinds("<< 73211009 |Diabetes mellitus| : 363698007 |Finding site| = 100"),
            vec![
                Token::LtLt,
                Token::Number(73211009),
                Token::Colon,
                Token::Number(363698007),
                Token::Equals,
                Token::Number(100)
            ]
        );
    }

    #[test]
    fn errors_carry_positions() {
        match tokenize("100 ? 200").unwrap_err() {
            EclError::Parse { position, .. } => assert_eq!(position, 4),
            other => panic!("unexpected error {other}"),
        }
        match tokenize("100 |unterminated").unwrap_err() {
            EclError::Parse { position, .. } => assert_eq!(position, 4),
            other => panic!("unexpected error {other}"),
        }
        assert!(tokenize("100 BETWEEN 200").is_err());
    }
}
