use logos::Logos;

use crate::error::{AsmError, ErrorKind, Pos};

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r";[^\n]*")]
pub enum TokenKind {
  #[regex(r"\.[A-Za-z]+", |lex| lex.slice()[1..].to_ascii_lowercase())]
  Directive(String),

  /// `%define` and friends, handled before parsing.
  #[regex(r"%[A-Za-z]+", |lex| lex.slice()[1..].to_ascii_lowercase())]
  Preprocessor(String),

  #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
  Identifier(String),

  #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
  #[regex(r"\$[0-9A-Fa-f]+", |lex| u32::from_str_radix(&lex.slice()[1..], 16).ok())]
  #[regex(r"0[xX][0-9A-Fa-f]+", |lex| u32::from_str_radix(&lex.slice()[2..], 16).ok())]
  #[regex(r"%[01]+", |lex| u32::from_str_radix(&lex.slice()[1..], 2).ok())]
  #[regex(r"'[ -~]'", |lex| lex.slice().as_bytes()[1] as u32)]
  Number(u32),

  #[token("#")]
  Hash,
  #[token(",")]
  Comma,
  #[token(":")]
  Colon,
  #[token("=")]
  Equals,
  #[token("(")]
  LParen,
  #[token(")")]
  RParen,
  #[token("+")]
  Plus,
  #[token("-")]
  Minus,
  #[token("<")]
  Low,
  #[token(">")]
  High,
  #[token("*")]
  Star,
}

impl std::fmt::Display for TokenKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TokenKind::Directive(name) => write!(f, ".{name}"),
      TokenKind::Preprocessor(name) => write!(f, "%{name}"),
      TokenKind::Identifier(name) => f.write_str(name),
      TokenKind::Number(value) => write!(f, "{value}"),
      TokenKind::Hash => f.write_str("#"),
      TokenKind::Comma => f.write_str(","),
      TokenKind::Colon => f.write_str(":"),
      TokenKind::Equals => f.write_str("="),
      TokenKind::LParen => f.write_str("("),
      TokenKind::RParen => f.write_str(")"),
      TokenKind::Plus => f.write_str("+"),
      TokenKind::Minus => f.write_str("-"),
      TokenKind::Low => f.write_str("<"),
      TokenKind::High => f.write_str(">"),
      TokenKind::Star => f.write_str("*"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub pos: Pos,
}

/// Split a source line into tokens. `line` is 1-based and only used for positions.
pub fn tokenize_line(source: &str, line: usize) -> Result<Vec<Token>, AsmError> {
  let mut lexer = TokenKind::lexer(source);
  let mut tokens = Vec::new();
  while let Some(kind) = lexer.next() {
    let pos = Pos {
      line,
      col: lexer.span().start + 1,
    };
    match kind {
      Ok(kind) => tokens.push(Token { kind, pos }),
      Err(()) => {
        return Err(AsmError::new(
          pos,
          ErrorKind::UnexpectedCharacter(lexer.slice().to_owned()),
        ))
      }
    }
  }
  Ok(tokens)
}
