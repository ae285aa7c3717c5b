use std::str::FromStr;

use octet_core::runtime::Opcode;

use crate::error::{AsmError, ErrorKind, Pos};
use crate::preprocessor::Preprocessor;
use crate::token::{tokenize_line, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
  pub kind: ExprKind,
  pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
  Number(i64),
  Symbol(String),
  /// `*`, the address of the current statement.
  Here,
  Neg(Box<Expr>),
  Low(Box<Expr>),
  High(Box<Expr>),
  Add(Box<Expr>, Box<Expr>),
  Sub(Box<Expr>, Box<Expr>),
}

/// Operand syntax as written. The addressing mode is chosen later, once
/// symbol values are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  None,
  Accumulator,
  Immediate(Expr),
  Direct(Expr),
  IndexedX(Expr),
  IndexedY(Expr),
  Indirect(Expr),
  IndirectX(Expr),
  IndirectY(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
  Constant { name: String, value: Expr },
  Org(Expr),
  Byte(Vec<Expr>),
  Word(Vec<Expr>),
  Instruction { opcode: Opcode, operand: Operand },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
  pub label: Option<(String, Pos)>,
  pub statement: Option<(Statement, Pos)>,
}

/// Parse a whole source file, one statement per line, expanding macros as
/// they are defined.
pub fn parse(source: &str) -> Result<Vec<Line>, AsmError> {
  let mut preprocessor = Preprocessor::new();
  source
    .lines()
    .enumerate()
    .map(|(i, text)| {
      let tokens = preprocessor.process(tokenize_line(text, i + 1)?)?;
      Parser::new(&tokens, i + 1).line()
    })
    .collect()
}

struct Parser<'a> {
  tokens: &'a [Token],
  cursor: usize,
  line: usize,
}

impl<'a> Parser<'a> {
  fn new(tokens: &'a [Token], line: usize) -> Self {
    Self {
      tokens,
      cursor: 0,
      line,
    }
  }

  fn peek(&self) -> Option<&'a TokenKind> {
    self.peek_at(0)
  }

  fn peek_at(&self, ahead: usize) -> Option<&'a TokenKind> {
    self.tokens.get(self.cursor + ahead).map(|t| &t.kind)
  }

  fn bump(&mut self) -> Option<&'a Token> {
    let token = self.tokens.get(self.cursor);
    self.cursor += 1;
    token
  }

  fn pos(&self) -> Pos {
    match self.tokens.get(self.cursor) {
      Some(token) => token.pos,
      None => Pos {
        line: self.line,
        col: self.tokens.last().map_or(1, |t| t.pos.col + 1),
      },
    }
  }

  fn unexpected(&self) -> AsmError {
    let kind = match self.tokens.get(self.cursor) {
      Some(token) => ErrorKind::UnexpectedToken(token.kind.to_string()),
      None => ErrorKind::UnexpectedEndOfLine,
    };
    AsmError::new(self.pos(), kind)
  }

  fn expect(&mut self, kind: TokenKind) -> Result<(), AsmError> {
    if self.peek() != Some(&kind) {
      return Err(self.unexpected());
    }
    self.cursor += 1;
    Ok(())
  }

  /// Consume an `X` or `Y` index register name.
  fn index_register(&mut self) -> Result<char, AsmError> {
    match self.peek() {
      Some(TokenKind::Identifier(name)) if name.eq_ignore_ascii_case("x") => {
        self.cursor += 1;
        Ok('x')
      }
      Some(TokenKind::Identifier(name)) if name.eq_ignore_ascii_case("y") => {
        self.cursor += 1;
        Ok('y')
      }
      _ => Err(self.unexpected()),
    }
  }

  fn line(mut self) -> Result<Line, AsmError> {
    let mut label = None;
    if let (Some(TokenKind::Identifier(name)), Some(TokenKind::Colon)) =
      (self.peek(), self.peek_at(1))
    {
      label = Some((name.clone(), self.pos()));
      self.cursor += 2;
    }

    let pos = self.pos();
    let statement = match self.peek() {
      None => None,
      Some(TokenKind::Identifier(name)) if label.is_none() && self.peek_at(1) == Some(&TokenKind::Equals) => {
        self.cursor += 2;
        Some(Statement::Constant {
          name: name.clone(),
          value: self.expr()?,
        })
      }
      Some(TokenKind::Directive(directive)) => {
        self.cursor += 1;
        Some(match directive.as_str() {
          "org" => Statement::Org(self.expr()?),
          "byte" | "db" => Statement::Byte(self.expr_list()?),
          "word" | "dw" => Statement::Word(self.expr_list()?),
          _ => return Err(AsmError::new(pos, ErrorKind::UnknownDirective(directive.clone()))),
        })
      }
      Some(TokenKind::Identifier(name)) => {
        let opcode = Opcode::from_str(name)
          .map_err(|_| AsmError::new(pos, ErrorKind::UnknownMnemonic(name.clone())))?;
        self.cursor += 1;
        Some(Statement::Instruction {
          opcode,
          operand: self.operand()?,
        })
      }
      Some(_) => return Err(self.unexpected()),
    };

    if self.cursor < self.tokens.len() {
      return Err(self.unexpected());
    }
    Ok(Line {
      label,
      statement: statement.map(|s| (s, pos)),
    })
  }

  fn operand(&mut self) -> Result<Operand, AsmError> {
    match self.peek() {
      None => Ok(Operand::None),
      Some(TokenKind::Hash) => {
        self.cursor += 1;
        Ok(Operand::Immediate(self.expr()?))
      }
      Some(TokenKind::LParen) => {
        self.cursor += 1;
        let inner = self.expr()?;
        match self.bump().map(|t| &t.kind) {
          Some(TokenKind::Comma) => {
            if self.index_register()? != 'x' {
              self.cursor -= 1;
              return Err(self.unexpected());
            }
            self.expect(TokenKind::RParen)?;
            Ok(Operand::IndirectX(inner))
          }
          Some(TokenKind::RParen) => {
            if self.peek() == Some(&TokenKind::Comma) {
              self.cursor += 1;
              if self.index_register()? != 'y' {
                self.cursor -= 1;
                return Err(self.unexpected());
              }
              Ok(Operand::IndirectY(inner))
            } else {
              Ok(Operand::Indirect(inner))
            }
          }
          _ => {
            self.cursor -= 1;
            Err(self.unexpected())
          }
        }
      }
      Some(TokenKind::Identifier(name))
        if name.eq_ignore_ascii_case("a") && self.peek_at(1).is_none() =>
      {
        self.cursor += 1;
        Ok(Operand::Accumulator)
      }
      Some(_) => {
        let target = self.expr()?;
        if self.peek() == Some(&TokenKind::Comma) {
          self.cursor += 1;
          match self.index_register()? {
            'x' => Ok(Operand::IndexedX(target)),
            _ => Ok(Operand::IndexedY(target)),
          }
        } else {
          Ok(Operand::Direct(target))
        }
      }
    }
  }

  fn expr_list(&mut self) -> Result<Vec<Expr>, AsmError> {
    let mut exprs = vec![self.expr()?];
    while self.peek() == Some(&TokenKind::Comma) {
      self.cursor += 1;
      exprs.push(self.expr()?);
    }
    Ok(exprs)
  }

  fn expr(&mut self) -> Result<Expr, AsmError> {
    let mut lhs = self.unary()?;
    loop {
      let combine: fn(Box<Expr>, Box<Expr>) -> ExprKind = match self.peek() {
        Some(TokenKind::Plus) => ExprKind::Add,
        Some(TokenKind::Minus) => ExprKind::Sub,
        _ => return Ok(lhs),
      };
      self.cursor += 1;
      let rhs = self.unary()?;
      let pos = lhs.pos;
      lhs = Expr {
        kind: combine(Box::new(lhs), Box::new(rhs)),
        pos,
      };
    }
  }

  fn unary(&mut self) -> Result<Expr, AsmError> {
    let pos = self.pos();
    let wrap: fn(Box<Expr>) -> ExprKind = match self.peek() {
      Some(TokenKind::Minus) => ExprKind::Neg,
      Some(TokenKind::Low) => ExprKind::Low,
      Some(TokenKind::High) => ExprKind::High,
      _ => return self.primary(),
    };
    self.cursor += 1;
    let inner = self.unary()?;
    Ok(Expr {
      kind: wrap(Box::new(inner)),
      pos,
    })
  }

  fn primary(&mut self) -> Result<Expr, AsmError> {
    let pos = self.pos();
    let kind = match self.peek() {
      Some(TokenKind::Number(value)) => ExprKind::Number(*value as i64),
      Some(TokenKind::Identifier(name)) => ExprKind::Symbol(name.clone()),
      Some(TokenKind::Star) => ExprKind::Here,
      Some(TokenKind::LParen) => {
        self.cursor += 1;
        let inner = self.expr()?;
        self.expect(TokenKind::RParen)?;
        return Ok(inner);
      }
      _ => return Err(self.unexpected()),
    };
    self.cursor += 1;
    Ok(Expr { kind, pos })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn statement(source: &str) -> Statement {
    parse(source).unwrap().remove(0).statement.unwrap().0
  }

  fn num(value: i64, col: usize) -> Expr {
    Expr {
      kind: ExprKind::Number(value),
      pos: Pos { line: 1, col },
    }
  }

  #[test]
  fn labels_and_instructions() {
    let lines = parse("loop: dex\n\n  bne loop").unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].label, Some(("loop".to_string(), Pos { line: 1, col: 1 })));
    assert_eq!(
      lines[0].statement,
      Some((
        Statement::Instruction {
          opcode: Opcode::Dex,
          operand: Operand::None
        },
        Pos { line: 1, col: 7 }
      ))
    );
    assert_eq!(lines[1], Line { label: None, statement: None });
  }

  #[test]
  fn operand_syntaxes() {
    let operand = |source| match statement(source) {
      Statement::Instruction { operand, .. } => operand,
      other => panic!("not an instruction: {other:?}"),
    };
    assert_eq!(operand("lda #1"), Operand::Immediate(num(1, 6)));
    assert_eq!(operand("lda $10"), Operand::Direct(num(0x10, 5)));
    assert_eq!(operand("lda $10,x"), Operand::IndexedX(num(0x10, 5)));
    assert_eq!(operand("ldx $10,Y"), Operand::IndexedY(num(0x10, 5)));
    assert_eq!(operand("jmp ($1234)"), Operand::Indirect(num(0x1234, 6)));
    assert_eq!(operand("lda ($10,X)"), Operand::IndirectX(num(0x10, 6)));
    assert_eq!(operand("lda ($10),Y"), Operand::IndirectY(num(0x10, 6)));
    assert_eq!(operand("asl a"), Operand::Accumulator);
    assert_eq!(operand("rts"), Operand::None);
  }

  #[test]
  fn expressions() {
    let Statement::Byte(exprs) = statement(".byte <ADDR, >ADDR + 1, -2, *") else {
      panic!("not a .byte");
    };
    assert_eq!(exprs.len(), 4);
    assert!(matches!(exprs[0].kind, ExprKind::Low(_)));
    assert!(matches!(&exprs[1].kind, ExprKind::Add(lhs, _) if matches!(lhs.kind, ExprKind::High(_))));
    assert!(matches!(exprs[2].kind, ExprKind::Neg(_)));
    assert_eq!(exprs[3].kind, ExprKind::Here);
  }

  #[test]
  fn constants_and_directives() {
    assert_eq!(
      statement("N = $99"),
      Statement::Constant {
        name: "N".to_string(),
        value: num(0x99, 5)
      }
    );
    assert_eq!(statement(".org $1000"), Statement::Org(num(0x1000, 6)));
    assert!(matches!(statement(".dw 1, 2"), Statement::Word(v) if v.len() == 2));
  }

  #[test]
  fn errors_carry_positions() {
    assert_eq!(
      parse("  foo #1").unwrap_err(),
      AsmError::new(Pos { line: 1, col: 3 }, ErrorKind::UnknownMnemonic("foo".into()))
    );
    assert_eq!(
      parse("nop\n.bogus 1").unwrap_err(),
      AsmError::new(Pos { line: 2, col: 1 }, ErrorKind::UnknownDirective("bogus".into()))
    );
    assert_eq!(
      parse("lda #").unwrap_err(),
      AsmError::new(Pos { line: 1, col: 6 }, ErrorKind::UnexpectedEndOfLine)
    );
    assert_eq!(
      parse("lda ($10),X").unwrap_err(),
      AsmError::new(Pos { line: 1, col: 11 }, ErrorKind::UnexpectedToken("X".into()))
    );
    assert_eq!(
      parse("lda 1 2").unwrap_err(),
      AsmError::new(Pos { line: 1, col: 7 }, ErrorKind::UnexpectedToken("2".into()))
    );
  }
}
