//! Textual macros, expanded on the token stream before parsing.
//!
//! ```text
//! %define STACK $0100
//! %define push_at(a)    (STACK + a)
//! %define push_at(a, b) (push_at(a) + b)
//! ```
//!
//! A name followed directly by `(` defines a function macro; anything else is
//! a constant. Function macros are overloaded by their number of parameters,
//! and a later definition with the same arity replaces the earlier one.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AsmError, ErrorKind, Pos};
use crate::token::{Token, TokenKind};

/// How deep macro expansions may nest before giving up.
pub const RECURSION_LIMIT: usize = 10;

#[derive(Debug, Clone)]
struct Function {
  params: Vec<String>,
  body: Vec<Token>,
}

/// Every definition sharing one name.
#[derive(Debug, Default)]
struct MacroSet {
  constant: Option<Vec<Token>>,
  /// Keyed by parameter count.
  overloads: BTreeMap<usize, Function>,
}

#[derive(Debug, Default)]
pub struct Preprocessor {
  macros: HashMap<String, MacroSet>,
}

impl Preprocessor {
  pub fn new() -> Self {
    Default::default()
  }

  /// Process one tokenized line. Definitions are recorded and yield no
  /// tokens, every other line comes back with its macros expanded.
  pub fn process(&mut self, tokens: Vec<Token>) -> Result<Vec<Token>, AsmError> {
    if let Some(Token {
      kind: TokenKind::Preprocessor(directive),
      pos,
    }) = tokens.first()
    {
      return match directive.as_str() {
        "define" => {
          self.define(*pos, &tokens[1..])?;
          Ok(Vec::new())
        }
        _ => Err(AsmError::new(
          *pos,
          ErrorKind::UnknownPreprocessorDirective(directive.clone()),
        )),
      };
    }

    if self.macros.is_empty() {
      return Ok(tokens);
    }
    let mut out = Vec::with_capacity(tokens.len());
    self.expand(&tokens, 0, &mut out)?;
    Ok(out)
  }

  fn define(&mut self, at: Pos, tokens: &[Token]) -> Result<(), AsmError> {
    let (name, name_pos) = match tokens.first() {
      Some(Token {
        kind: TokenKind::Identifier(name),
        pos,
      }) => (name.clone(), *pos),
      Some(token) => {
        return Err(AsmError::new(
          token.pos,
          ErrorKind::UnexpectedToken(token.kind.to_string()),
        ))
      }
      None => return Err(AsmError::new(at, ErrorKind::UnexpectedEndOfLine)),
    };

    let set = self.macros.entry(name.clone()).or_default();
    match tokens.get(1) {
      // `name(` with no space in between opens a parameter list
      Some(Token {
        kind: TokenKind::LParen,
        pos,
      }) if pos.line == name_pos.line && pos.col == name_pos.col + name.len() => {
        let (params, rest) = parameters(*pos, &tokens[2..])?;
        tracing::trace!(%name, params = params.len(), "defined function macro");
        set.overloads.insert(
          params.len(),
          Function {
            params,
            body: rest.to_vec(),
          },
        );
      }
      _ => {
        tracing::trace!(%name, "defined constant macro");
        set.constant = Some(tokens[1..].to_vec());
      }
    }
    Ok(())
  }

  /// Expand `tokens` into `out`, rescanning every replacement.
  fn expand(&self, tokens: &[Token], depth: usize, out: &mut Vec<Token>) -> Result<(), AsmError> {
    let mut i = 0;
    while i < tokens.len() {
      let token = &tokens[i];
      i += 1;

      let (name, set) = match &token.kind {
        TokenKind::Identifier(name) => match self.macros.get(name) {
          Some(set) => (name, set),
          None => {
            out.push(token.clone());
            continue;
          }
        },
        _ => {
          out.push(token.clone());
          continue;
        }
      };

      let replacement = if !set.overloads.is_empty()
        && tokens.get(i).map(|t| &t.kind) == Some(&TokenKind::LParen)
      {
        let (args, consumed) = arguments(&tokens[i..])?;
        i += consumed;
        let function = set.overloads.get(&args.len()).ok_or_else(|| {
          AsmError::new(
            token.pos,
            ErrorKind::NoMacroOverload {
              name: name.clone(),
              args: args.len(),
            },
          )
        })?;
        substitute(function, &args)
      } else if let Some(body) = &set.constant {
        body.clone()
      } else {
        // a function macro named without arguments stays as is
        out.push(token.clone());
        continue;
      };

      if depth + 1 > RECURSION_LIMIT {
        return Err(AsmError::new(
          token.pos,
          ErrorKind::MacroRecursion(name.clone()),
        ));
      }
      // expansions report the position of the macro use
      let replacement: Vec<Token> = replacement
        .into_iter()
        .map(|t| Token {
          kind: t.kind,
          pos: token.pos,
        })
        .collect();
      self.expand(&replacement, depth + 1, out)?;
    }
    Ok(())
  }
}

/// Parse `a, b)` after the opening paren of a definition. Returns the names
/// and the tokens that follow the closing paren.
fn parameters(open: Pos, tokens: &[Token]) -> Result<(Vec<String>, &[Token]), AsmError> {
  let mut params: Vec<String> = Vec::new();
  let mut i = 0;
  if tokens.first().map(|t| &t.kind) == Some(&TokenKind::RParen) {
    return Ok((params, &tokens[1..]));
  }
  loop {
    match tokens.get(i) {
      Some(Token {
        kind: TokenKind::Identifier(param),
        pos,
      }) => {
        if params.contains(param) {
          return Err(AsmError::new(*pos, ErrorKind::DuplicateSymbol(param.clone())));
        }
        params.push(param.clone());
      }
      Some(token) => {
        return Err(AsmError::new(
          token.pos,
          ErrorKind::UnexpectedToken(token.kind.to_string()),
        ))
      }
      None => return Err(AsmError::new(open, ErrorKind::UnexpectedEndOfLine)),
    }
    match tokens.get(i + 1) {
      Some(Token {
        kind: TokenKind::Comma,
        ..
      }) => i += 2,
      Some(Token {
        kind: TokenKind::RParen,
        ..
      }) => return Ok((params, &tokens[i + 2..])),
      Some(token) => {
        return Err(AsmError::new(
          token.pos,
          ErrorKind::UnexpectedToken(token.kind.to_string()),
        ))
      }
      None => return Err(AsmError::new(open, ErrorKind::UnexpectedEndOfLine)),
    }
  }
}

/// Split the arguments of a call starting at its `(`. Commas inside nested
/// parentheses belong to the argument. Returns the arguments and the number
/// of tokens consumed, closing paren included.
fn arguments(tokens: &[Token]) -> Result<(Vec<Vec<Token>>, usize), AsmError> {
  let open = tokens[0].pos;
  if tokens.get(1).map(|t| &t.kind) == Some(&TokenKind::RParen) {
    return Ok((Vec::new(), 2));
  }

  let mut args = Vec::new();
  let mut current = Vec::new();
  let mut nesting = 0usize;
  for (i, token) in tokens.iter().enumerate().skip(1) {
    match token.kind {
      TokenKind::RParen if nesting == 0 => {
        args.push(current);
        return Ok((args, i + 1));
      }
      TokenKind::Comma if nesting == 0 => {
        args.push(std::mem::take(&mut current));
        continue;
      }
      TokenKind::LParen => nesting += 1,
      TokenKind::RParen => nesting -= 1,
      _ => {}
    }
    current.push(token.clone());
  }
  Err(AsmError::new(open, ErrorKind::UnexpectedEndOfLine))
}

fn substitute(function: &Function, args: &[Vec<Token>]) -> Vec<Token> {
  let mut tokens = Vec::with_capacity(function.body.len());
  for token in &function.body {
    let param = match &token.kind {
      TokenKind::Identifier(name) => function.params.iter().position(|p| p == name),
      _ => None,
    };
    match param {
      Some(index) => tokens.extend(args[index].iter().cloned()),
      None => tokens.push(token.clone()),
    }
  }
  tokens
}
