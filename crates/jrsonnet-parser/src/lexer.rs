//! Hand-written lexer: turns source bytes into a flat token stream with byte
//! spans. The parser never looks at raw source text again after this phase.
use std::{path::Path, rc::Rc};

use crate::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
	Ident,
	Number,
	/// A parsed (unescaped) string literal.
	Str,
	/// `local`, `if`, `self`, `$`-the-keyword, etc, spelled out as their text.
	Keyword,

	// Punctuation
	LeftBrace,
	RightBrace,
	LeftBracket,
	RightBracket,
	LeftParen,
	RightParen,
	Dot,
	Comma,
	Semi,
	Colon,
	DoubleColon,
	TripleColon,
	Dollar,
	Assign,

	Plus,
	Minus,
	Star,
	Slash,
	Percent,
	Tilde,
	Bang,
	Amp,
	Pipe,
	Caret,
	Shl,
	Shr,
	Lt,
	Gt,
	Lte,
	Gte,
	Eq,
	Neq,
	AndAnd,
	OrOr,

	Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
	pub kind: TokenKind,
	/// Parsed text: identifier name, or the unescaped contents of a string
	/// literal. Unused for punctuation.
	pub text: Rc<str>,
	/// Parsed numeric value, only set for `TokenKind::Number`.
	pub num: f64,
	pub start: usize,
	pub end: usize,
}

const KEYWORDS: &[&str] = &[
	"assert", "else", "error", "false", "for", "function", "if", "import", "importstr",
	"importbin", "in", "local", "null", "tailstrict", "then", "self", "super", "true",
];

pub struct Lexer<'a> {
	src: &'a str,
	bytes: &'a [u8],
	pos: usize,
	file_name: Rc<Path>,
}

impl<'a> Lexer<'a> {
	pub fn new(src: &'a str, file_name: Rc<Path>) -> Self {
		Self {
			src,
			bytes: src.as_bytes(),
			pos: 0,
			file_name,
		}
	}

	fn peek(&self) -> Option<u8> {
		self.bytes.get(self.pos).copied()
	}
	fn peek_at(&self, off: usize) -> Option<u8> {
		self.bytes.get(self.pos + off).copied()
	}
	fn bump(&mut self) -> Option<u8> {
		let b = self.peek()?;
		self.pos += 1;
		Some(b)
	}

	fn err(&self, start: usize, msg: impl Into<String>) -> ParseError {
		ParseError {
			file_name: self.file_name.clone(),
			offset: start,
			msg: msg.into(),
		}
	}

	fn skip_trivia(&mut self) -> Result<(), ParseError> {
		loop {
			match self.peek() {
				Some(b' ' | b'\t' | b'\r' | b'\n') => {
					self.pos += 1;
				}
				Some(b'#') => {
					while !matches!(self.peek(), None | Some(b'\n')) {
						self.pos += 1;
					}
				}
				Some(b'/') if self.peek_at(1) == Some(b'/') => {
					while !matches!(self.peek(), None | Some(b'\n')) {
						self.pos += 1;
					}
				}
				Some(b'/') if self.peek_at(1) == Some(b'*') => {
					let start = self.pos;
					self.pos += 2;
					loop {
						match self.peek() {
							None => return Err(self.err(start, "unterminated block comment")),
							Some(b'*') if self.peek_at(1) == Some(b'/') => {
								self.pos += 2;
								break;
							}
							_ => self.pos += 1,
						}
					}
				}
				_ => break,
			}
		}
		Ok(())
	}

	fn tok(&self, kind: TokenKind, start: usize) -> Token {
		Token {
			kind,
			text: Rc::from(""),
			num: 0.0,
			start,
			end: self.pos,
		}
	}

	pub fn next_token(&mut self) -> Result<Token, ParseError> {
		self.skip_trivia()?;
		let start = self.pos;
		let Some(c) = self.peek() else {
			return Ok(self.tok(TokenKind::Eof, start));
		};

		if is_ident_start(c) {
			while matches!(self.peek(), Some(b) if is_ident_continue(b)) {
				self.pos += 1;
			}
			let text = &self.src[start..self.pos];
			return Ok(if KEYWORDS.contains(&text) {
				Token {
					kind: TokenKind::Keyword,
					text: Rc::from(text),
					num: 0.0,
					start,
					end: self.pos,
				}
			} else {
				Token {
					kind: TokenKind::Ident,
					text: Rc::from(text),
					num: 0.0,
					start,
					end: self.pos,
				}
			});
		}

		if c.is_ascii_digit() {
			return self.lex_number(start);
		}

		match c {
			b'"' | b'\'' => self.lex_quoted(start, c),
			b'@' => self.lex_verbatim(start),
			b'|' if self.peek_at(1) == Some(b'|') && self.peek_at(2) == Some(b'|') => {
				self.lex_block_string(start)
			}
			_ => self.lex_operator(start),
		}
	}

	fn lex_number(&mut self, start: usize) -> Result<Token, ParseError> {
		while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
			self.pos += 1;
		}
		if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b) if b.is_ascii_digit()) {
			self.pos += 1;
			while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
				self.pos += 1;
			}
		}
		if matches!(self.peek(), Some(b'e' | b'E')) {
			let mark = self.pos;
			self.pos += 1;
			if matches!(self.peek(), Some(b'+' | b'-')) {
				self.pos += 1;
			}
			if matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
				while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
					self.pos += 1;
				}
			} else {
				self.pos = mark;
			}
		}
		let text = &self.src[start..self.pos];
		let num: f64 = text
			.parse()
			.map_err(|_| self.err(start, format!("invalid number literal: {text}")))?;
		Ok(Token {
			kind: TokenKind::Number,
			text: Rc::from(""),
			num,
			start,
			end: self.pos,
		})
	}

	fn lex_quoted(&mut self, start: usize, quote: u8) -> Result<Token, ParseError> {
		self.pos += 1;
		let mut out = String::new();
		loop {
			match self.bump() {
				None => return Err(self.err(start, "unterminated string literal")),
				Some(b) if b == quote => break,
				Some(b'\\') => {
					let esc_start = self.pos - 1;
					match self.bump() {
						Some(b'"') => out.push('"'),
						Some(b'\'') => out.push('\''),
						Some(b'\\') => out.push('\\'),
						Some(b'/') => out.push('/'),
						Some(b'b') => out.push('\u{8}'),
						Some(b'f') => out.push('\u{c}'),
						Some(b'n') => out.push('\n'),
						Some(b'r') => out.push('\r'),
						Some(b't') => out.push('\t'),
						Some(b'u') => {
							let cp = self.lex_hex4(esc_start)?;
							if (0xD800..=0xDBFF).contains(&cp) {
								if self.peek() == Some(b'\\') && self.peek_at(1) == Some(b'u') {
									self.pos += 2;
									let low = self.lex_hex4(esc_start)?;
									if (0xDC00..=0xDFFF).contains(&low) {
										let combined = 0x10000
											+ (cp - 0xD800) * 0x400 + (low - 0xDC00);
										out.push(char::from_u32(combined).ok_or_else(|| {
											self.err(esc_start, "invalid unicode surrogate pair")
										})?);
									} else {
										return Err(self.err(esc_start, "unpaired surrogate"));
									}
								} else {
									return Err(self.err(esc_start, "unpaired surrogate"));
								}
							} else {
								out.push(
									char::from_u32(cp)
										.ok_or_else(|| self.err(esc_start, "invalid codepoint"))?,
								);
							}
						}
						_ => return Err(self.err(esc_start, "invalid escape sequence")),
					}
				}
				// Re-decode UTF-8 starting at this byte: strings are otherwise
				// scanned byte-at-a-time, but source text is valid UTF-8.
				Some(_) => {
					self.pos -= 1;
					let ch = self.src[self.pos..].chars().next().expect("valid utf8");
					out.push(ch);
					self.pos += ch.len_utf8();
				}
			}
		}
		Ok(Token {
			kind: TokenKind::Str,
			text: Rc::from(out.as_str()),
			num: 0.0,
			start,
			end: self.pos,
		})
	}

	fn lex_hex4(&mut self, esc_start: usize) -> Result<u32, ParseError> {
		let mut v = 0u32;
		for _ in 0..4 {
			let b = self
				.bump()
				.ok_or_else(|| self.err(esc_start, "truncated \\u escape"))?;
			let digit = (b as char)
				.to_digit(16)
				.ok_or_else(|| self.err(esc_start, "invalid hex digit in \\u escape"))?;
			v = v * 16 + digit;
		}
		Ok(v)
	}

	fn lex_verbatim(&mut self, start: usize) -> Result<Token, ParseError> {
		self.pos += 1;
		let quote = match self.bump() {
			Some(q @ (b'"' | b'\'')) => q,
			_ => return Err(self.err(start, "expected quote after '@'")),
		};
		let mut out = String::new();
		loop {
			match self.bump() {
				None => return Err(self.err(start, "unterminated verbatim string")),
				Some(b) if b == quote => {
					if self.peek() == Some(quote) {
						self.pos += 1;
						out.push(quote as char);
					} else {
						break;
					}
				}
				Some(_) => {
					self.pos -= 1;
					let ch = self.src[self.pos..].chars().next().expect("valid utf8");
					out.push(ch);
					self.pos += ch.len_utf8();
				}
			}
		}
		Ok(Token {
			kind: TokenKind::Str,
			text: Rc::from(out.as_str()),
			num: 0.0,
			start,
			end: self.pos,
		})
	}

	/// `|||` block strings. The indentation of the first non-blank line sets
	/// the common prefix stripped from every subsequent line.
	fn lex_block_string(&mut self, start: usize) -> Result<Token, ParseError> {
		self.pos += 3;
		while matches!(self.peek(), Some(b' ' | b'\t')) {
			self.pos += 1;
		}
		if self.bump() != Some(b'\n') {
			return Err(self.err(start, "text after '|||' must be followed by a newline"));
		}
		let mut raw_lines = Vec::new();
		// Fixed by the first non-blank line's whitespace prefix; every later
		// non-blank line must match it exactly (leading whitespace, not
		// total length) or the block is malformed.
		let mut indent: Option<usize> = None;
		loop {
			let line_start = self.pos;
			while !matches!(self.peek(), None | Some(b'\n')) {
				self.pos += 1;
			}
			let line = &self.src[line_start..self.pos];
			if let Some(indent) = indent {
				if is_block_terminator(line, indent) {
					break;
				}
				if !line.trim().is_empty() {
					let ws = line.len() - line.trim_start_matches([' ', '\t']).len();
					if ws < indent {
						return Err(self.err(
							line_start,
							"text block line is indented less than the block's first line",
						));
					}
				}
			} else if !line.trim().is_empty() {
				indent = Some(line.len() - line.trim_start_matches([' ', '\t']).len());
			}
			raw_lines.push(line);
			if self.bump() != Some(b'\n') {
				return Err(self.err(start, "unterminated text block"));
			}
			if self.peek().is_none() {
				return Err(self.err(start, "unterminated text block"));
			}
		}
		let indent = indent.unwrap_or(0);
		let mut out = String::new();
		for line in &raw_lines {
			if line.trim().is_empty() {
				out.push('\n');
			} else {
				out.push_str(&line[indent.min(line.len())..]);
				out.push('\n');
			}
		}
		// consume the terminator line's leading whitespace + `|||`
		let term_start = self.pos;
		while !matches!(self.peek(), None | Some(b'|')) {
			self.pos += 1;
		}
		let _ = term_start;
		self.pos += 3;
		Ok(Token {
			kind: TokenKind::Str,
			text: Rc::from(out.as_str()),
			num: 0.0,
			start,
			end: self.pos,
		})
	}

	fn lex_operator(&mut self, start: usize) -> Result<Token, ParseError> {
		macro_rules! two {
			($second:expr, $kind2:expr, $kind1:expr) => {{
				self.pos += 1;
				if self.peek() == Some($second) {
					self.pos += 1;
					$kind2
				} else {
					$kind1
				}
			}};
		}
		let c = self.bytes[self.pos];
		let kind = match c {
			b'{' => {
				self.pos += 1;
				TokenKind::LeftBrace
			}
			b'}' => {
				self.pos += 1;
				TokenKind::RightBrace
			}
			b'[' => {
				self.pos += 1;
				TokenKind::LeftBracket
			}
			b']' => {
				self.pos += 1;
				TokenKind::RightBracket
			}
			b'(' => {
				self.pos += 1;
				TokenKind::LeftParen
			}
			b')' => {
				self.pos += 1;
				TokenKind::RightParen
			}
			b'.' => {
				self.pos += 1;
				TokenKind::Dot
			}
			b',' => {
				self.pos += 1;
				TokenKind::Comma
			}
			b';' => {
				self.pos += 1;
				TokenKind::Semi
			}
			b'$' => {
				self.pos += 1;
				TokenKind::Dollar
			}
			b'~' => {
				self.pos += 1;
				TokenKind::Tilde
			}
			b'+' => {
				self.pos += 1;
				TokenKind::Plus
			}
			b'-' => {
				self.pos += 1;
				TokenKind::Minus
			}
			b'*' => {
				self.pos += 1;
				TokenKind::Star
			}
			b'/' => {
				self.pos += 1;
				TokenKind::Slash
			}
			b'%' => {
				self.pos += 1;
				TokenKind::Percent
			}
			b'^' => {
				self.pos += 1;
				TokenKind::Caret
			}
			b':' => {
				self.pos += 1;
				if self.peek() == Some(b':') {
					self.pos += 1;
					if self.peek() == Some(b':') {
						self.pos += 1;
						TokenKind::TripleColon
					} else {
						TokenKind::DoubleColon
					}
				} else {
					TokenKind::Colon
				}
			}
			b'=' => two!(b'=', TokenKind::Eq, TokenKind::Assign),
			b'!' => two!(b'=', TokenKind::Neq, TokenKind::Bang),
			b'<' => match (self.peek_at(1), self.peek_at(2)) {
				(Some(b'<'), _) => {
					self.pos += 2;
					TokenKind::Shl
				}
				(Some(b'='), _) => {
					self.pos += 2;
					TokenKind::Lte
				}
				_ => {
					self.pos += 1;
					TokenKind::Lt
				}
			},
			b'>' => match (self.peek_at(1), self.peek_at(2)) {
				(Some(b'>'), _) => {
					self.pos += 2;
					TokenKind::Shr
				}
				(Some(b'='), _) => {
					self.pos += 2;
					TokenKind::Gte
				}
				_ => {
					self.pos += 1;
					TokenKind::Gt
				}
			},
			b'&' => two!(b'&', TokenKind::AndAnd, TokenKind::Amp),
			b'|' => two!(b'|', TokenKind::OrOr, TokenKind::Pipe),
			_ => {
				return Err(self.err(start, format!("unexpected character {:?}", c as char)));
			}
		};
		Ok(Token {
			kind,
			text: Rc::from(""),
			num: 0.0,
			start,
			end: self.pos,
		})
	}
}

fn is_ident_start(b: u8) -> bool {
	b == b'_' || b.is_ascii_alphabetic()
}
fn is_ident_continue(b: u8) -> bool {
	is_ident_start(b) || b.is_ascii_digit()
}

/// A closing `|||` must be indented less than the block's content prefix
/// (strictly fewer leading spaces/tabs than `indent`); a line indented to
/// meet or exceed the content prefix is ordinary content, not a terminator.
fn is_block_terminator(line: &str, indent: usize) -> bool {
	let ws = line.len() - line.trim_start_matches([' ', '\t']).len();
	let trimmed = line.trim_start();
	ws < indent && trimmed.starts_with("|||") && trimmed[3..].chars().all(|c| c == '|')
}

/// Tokenizes the whole input eagerly. The parser consumes this as a slice,
/// which keeps lookahead trivial.
pub fn lex(src: &str, file_name: Rc<Path>) -> Result<Vec<Token>, ParseError> {
	let mut lexer = Lexer::new(src, file_name);
	let mut out = Vec::new();
	loop {
		let tok = lexer.next_token()?;
		let eof = tok.kind == TokenKind::Eof;
		out.push(tok);
		if eof {
			break;
		}
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn toks(s: &str) -> Vec<TokenKind> {
		lex(s, PathBuf::from("/test.jsonnet").into())
			.unwrap()
			.into_iter()
			.map(|t| t.kind)
			.collect()
	}

	#[test]
	fn basic_operators() {
		assert_eq!(
			toks("2+2*2"),
			vec![
				TokenKind::Number,
				TokenKind::Plus,
				TokenKind::Number,
				TokenKind::Star,
				TokenKind::Number,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn colons() {
		assert_eq!(
			toks(": :: :::"),
			vec![
				TokenKind::Colon,
				TokenKind::DoubleColon,
				TokenKind::TripleColon,
				TokenKind::Eof
			]
		);
	}

	#[test]
	fn string_escape() {
		let t = lex(r#""Hello, \"world\"!""#, PathBuf::from("/t").into()).unwrap();
		assert_eq!(&*t[0].text, "Hello, \"world\"!");
	}

	#[test]
	fn keyword_vs_ident() {
		assert_eq!(toks("null"), vec![TokenKind::Keyword, TokenKind::Eof]);
		assert_eq!(toks("nulla"), vec![TokenKind::Ident, TokenKind::Eof]);
	}

	#[test]
	fn block_string_strips_common_indent() {
		let t = lex("|||\n    Hello world!\n     a\n|||", PathBuf::from("/t").into()).unwrap();
		assert_eq!(&*t[0].text, "Hello world!\n a\n");
	}

	#[test]
	fn line_comment_is_skipped() {
		assert_eq!(
			toks("2//comment\n+3"),
			vec![TokenKind::Number, TokenKind::Plus, TokenKind::Number, TokenKind::Eof]
		);
	}
}
