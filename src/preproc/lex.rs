//! Lexer: source text to `Lexeme`s
//!
//! Operates on `char`s (not bytes) so non-ASCII text inside comments and literals passes through untouched.
//! Comments are dropped here; only the line-start/whitespace flags on the following token record them.
use std::path::PathBuf;
use std::sync::Arc;

use crate::ast::{Pos,Span};
use crate::types::{IntClass,FloatClass,Signedness};
use super::token::{Token,Lexeme};

/// Lexical errors
///
/// Unterminated literals and comments are fatal (processing of the file stops). `MalformedLiteral` is never
/// returned from `get_token`: it is queued (see `Lexer::take_problems`) and a best-effort token is produced.
#[derive(Debug,Clone,thiserror::Error)]
pub enum Error
{
	#[error("unterminated string literal")]
	UnterminatedString(Span),
	#[error("unterminated character constant")]
	UnterminatedChar(Span),
	#[error("unterminated block comment")]
	UnterminatedComment(Span),
	#[error("malformed literal: {1}")]
	MalformedLiteral(Span, &'static str),
}
impl Error
{
	pub fn span(&self) -> &Span
	{
		match self
		{
		Error::UnterminatedString(s) => s,
		Error::UnterminatedChar(s) => s,
		Error::UnterminatedComment(s) => s,
		Error::MalformedLiteral(s, _) => s,
		}
	}
}

pub type Result<T> = ::std::result::Result<T,Error>;

/// Create a lexer over `source`; restartable via `Lexer::restart`
pub fn tokenize(file: Arc<PathBuf>, source: &str) -> Lexer
{
	Lexer::new(file, source.to_owned())
}

#[derive(Clone)]
pub struct Lexer
{
	src: String,
	file: Arc<PathBuf>,

	pos: Pos,
	/// No token has been returned since the last newline
	at_line_start: bool,
	/// Set after EOF or a fatal error (stops the iterator)
	done: bool,
	/// Recoverable errors not yet collected
	problems: Vec<Error>,
}

/// Consume the next character if it matches one of the patterns, otherwise yield the default
macro_rules! match_ch {
	($_self:ident, $def:expr, $( $($p:pat)|+ => $v:expr ),* $(,)*) => (
		match $_self.peekc()
		{
		$( Some($($p)|+) => { $_self.getc(); $v } ),*
		_ => $def,
		}
	);
}

impl Lexer
{
	pub fn new(file: Arc<PathBuf>, src: String) -> Lexer
	{
		Lexer {
			src: src,
			file: file,
			pos: Pos { line: 1, column: 1, offset: 0 },
			at_line_start: true,
			done: false,
			problems: Vec::new(),
		}
	}

	/// Rewind to the start of the input
	pub fn restart(&mut self)
	{
		self.pos = Pos { line: 1, column: 1, offset: 0 };
		self.at_line_start = true;
		self.done = false;
		self.problems.clear();
	}

	/// Take the malformed-literal errors seen since the last call
	pub fn take_problems(&mut self) -> Vec<Error>
	{
		::std::mem::replace(&mut self.problems, Vec::new())
	}
	fn malformed(&mut self, start: Pos, msg: &'static str)
	{
		let e = Error::MalformedLiteral(self.span_from(start), msg);
		debug!("{}: {}", e.span(), e);
		self.problems.push(e);
	}

	pub fn file(&self) -> &Arc<PathBuf>
	{
		&self.file
	}

	fn peekc(&self) -> Option<char>
	{
		self.src[self.pos.offset..].chars().next()
	}
	fn peekc2(&self) -> Option<char>
	{
		self.src[self.pos.offset..].chars().nth(1)
	}
	fn getc(&mut self) -> Option<char>
	{
		let ch = self.peekc()?;
		self.pos.offset += ch.len_utf8();
		if ch == '\n' {
			self.pos.line += 1;
			self.pos.column = 1;
		}
		else {
			self.pos.column += 1;
		}
		Some(ch)
	}

	fn span_from(&self, start: Pos) -> Span
	{
		Span::new(self.file.clone(), start, self.pos)
	}

	/// Skip whitespace, comments, and escaped newlines. Returns (saw_newline, saw_space)
	fn eat_whitespace(&mut self) -> Result<(bool, bool)>
	{
		let mut newline = false;
		let mut space = false;
		loop
		{
			match self.peekc()
			{
			Some('\n') => { self.getc(); newline = true; space = true; },
			Some(c) if c.is_whitespace() => { self.getc(); space = true; },
			Some('\\') if self.line_continuation_len().is_some() => {
				let n = self.line_continuation_len().unwrap_or(0);
				for _ in 0 .. n {
					self.getc();
				}
				space = true;
				},
			Some('/') => match self.peekc2()
				{
				Some('/') => {
					while let Some(c) = self.peekc() {
						if c == '\n' {
							break;
						}
						self.getc();
					}
					space = true;
					},
				Some('*') => {
					let start = self.pos;
					self.getc();
					self.getc();
					loop
					{
						match self.getc()
						{
						None => return Err(Error::UnterminatedComment(self.span_from(start))),
						Some('*') if self.peekc() == Some('/') => { self.getc(); break; },
						Some(_) => {},
						}
					}
					space = true;
					},
				_ => break,
				},
			_ => break,
			}
		}
		Ok( (newline, space) )
	}
	/// Length (in chars) of a `\` + optional trailing spaces + newline sequence at the cursor
	fn line_continuation_len(&self) -> Option<usize>
	{
		let mut it = self.src[self.pos.offset..].chars();
		if it.next() != Some('\\') {
			return None;
		}
		let mut n = 1;
		for c in it
		{
			n += 1;
			match c
			{
			'\n' => return Some(n),
			'\r' | ' ' | '\t' => {},
			_ => return None,
			}
		}
		None
	}

	// Read and return a sequence of "identifier" characters
	fn read_ident(&mut self) -> String
	{
		let mut name = String::new();
		while let Some(ch) = self.peekc()
		{
			if !(ch.is_alphanumeric() || ch == '_' || ch == '$') {
				break;
			}
			name.push(ch);
			self.getc();
		}
		name
	}

	// Read an integer in the given base (returns None on overflow)
	fn read_digits(&mut self, base: u32) -> (Option<u64>, usize)
	{
		let mut val: Option<u64> = Some(0);
		let mut count = 0;
		while let Some(ch) = self.peekc()
		{
			match ch.to_digit(base)
			{
			Some(d) => {
				val = val.and_then(|v| v.checked_mul(base as u64)).and_then(|v| v.checked_add(d as u64));
				count += 1;
				self.getc();
				},
			None => break,
			}
		}
		(val, count)
	}

	fn read_escape(&mut self, start: Pos, is_char: bool) -> Result<u32>
	{
		let unterminated = |s: &Self| if is_char {
				Error::UnterminatedChar(s.span_from(start))
			} else {
				Error::UnterminatedString(s.span_from(start))
			};
		let ch = match self.getc()
			{
			None => return Err(unterminated(self)),
			Some(c) => c,
			};
		Ok(match ch
		{
		'n' => '\n' as u32,
		't' => '\t' as u32,
		'r' => '\r' as u32,
		'a' => 7,
		'b' => 8,
		'f' => 12,
		'v' => 11,
		'e' => 27,
		'x' => {
			let (v, n) = self.read_digits(16);
			match v
			{
			_ if n == 0 => {
				self.malformed(start, "\\x used with no following hex digits");
				0
				},
			Some(v) if v <= 0x10FFFF => v as u32,
			_ => {
				self.malformed(start, "hex escape sequence out of range");
				0xFF
				},
			}
			},
		'0' ..= '7' => {
			let mut v = ch.to_digit(8).unwrap_or(0);
			for _ in 0 .. 2 {
				match self.peekc().and_then(|c| c.to_digit(8))
				{
				Some(d) => { self.getc(); v = v * 8 + d; },
				None => break,
				}
			}
			v
			},
		'\n' => return Err(unterminated(self)),
		// `\\`, `\'`, `\"`, `\?`, and unknown escapes map to the character itself
		c => c as u32,
		})
	}

	// Read a double-quoted string (opening quote eaten)
	fn read_string(&mut self, start: Pos) -> Result<String>
	{
		let mut ret = String::new();
		loop
		{
			match self.getc()
			{
			None | Some('\n') => return Err(Error::UnterminatedString(self.span_from(start))),
			Some('"') => break,
			Some('\\') => {
				let v = self.read_escape(start, false)?;
				ret.push( ::std::char::from_u32(v).unwrap_or('\u{FFFD}') );
				},
			Some(c) => ret.push(c),
			}
		}
		Ok(ret)
	}
	// Read a single-quoted character constant (opening quote eaten)
	fn read_charconst(&mut self, start: Pos) -> Result<u64>
	{
		let mut vals = Vec::new();
		loop
		{
			match self.getc()
			{
			None | Some('\n') => return Err(Error::UnterminatedChar(self.span_from(start))),
			Some('\'') => break,
			Some('\\') => vals.push( self.read_escape(start, true)? ),
			Some(c) => vals.push(c as u32),
			}
		}
		match vals.len()
		{
		0 => {
			self.malformed(start, "empty character constant");
			Ok(0)
			},
		1 => Ok(vals[0] as u64),
		// Multi-character constant: implementation-defined, packed big-endian (as GCC does)
		_ => Ok(vals.iter().fold(0u64, |a, &v| (a << 8) | (v as u64 & 0xFF))),
		}
	}

	fn read_number(&mut self, start: Pos) -> Result<Token>
	{
		let first = self.peekc().unwrap_or('0');
		let (base, whole, ndigits) = if first == '0' && (self.peekc2() == Some('x') || self.peekc2() == Some('X')) {
				self.getc(); self.getc();
				let (v, n) = self.read_digits(16);
				(16, v, n)
			}
			else if first == '0' && (self.peekc2() == Some('b') || self.peekc2() == Some('B')) {
				self.getc(); self.getc();
				let (v, n) = self.read_digits(2);
				(2, v, n)
			}
			else {
				let (v, n) = self.read_digits(10);
				(10, v, n)
			};
		if base != 10 && ndigits == 0 {
			self.malformed(start, "no digits after base prefix");
		}

		// Floating point?
		let is_float = base == 10 && match self.peekc()
			{
			Some('.') => true,
			Some('e') | Some('E') => true,
			_ => false,
			};
		if is_float
		{
			let mut reported = false;
			if self.peekc() == Some('.') {
				self.getc();
				self.read_digits(10);
			}
			if let Some('e') | Some('E') = self.peekc() {
				self.getc();
				if let Some('+') | Some('-') = self.peekc() {
					self.getc();
				}
				if self.read_digits(10).1 == 0 {
					self.malformed(start, "exponent has no digits");
					reported = true;
				}
			}
			let digits_end = self.pos.offset;
			let class = match_ch!(self, FloatClass::Double,
				'f' | 'F' => FloatClass::Float,
				'l' | 'L' => FloatClass::LongDouble,
				);
			let text = self.src[start.offset .. self.pos.offset].to_owned();
			let v: f64 = match self.src[start.offset .. digits_end].parse()
				{
				Ok(v) => v,
				Err(_) => {
					if !reported {
						self.malformed(start, "invalid floating point literal");
					}
					0.0
					},
				};
			return Ok(Token::Float(v, class, text));
		}

		// Decimal with a leading zero is octal
		let whole = if base == 10 && first == '0' && ndigits > 1 {
				let digits = &self.src[start.offset .. self.pos.offset];
				match u64::from_str_radix(digits, 8)
				{
				Ok(v) => Some(v),
				Err(_) if digits.chars().any(|c| c == '8' || c == '9') => {
					self.malformed(start, "invalid digit in octal constant");
					whole
					},
				Err(_) => None,
				}
			}
			else {
				whole
			};
		let whole = match whole
			{
			Some(v) => v,
			None => {
				self.malformed(start, "integer constant is too large");
				u64::max_value()
				},
			};

		// Integer suffixes (any order of `u` and `l`/`ll`)
		let mut is_unsigned = false;
		let mut longs = 0;
		loop
		{
			match self.peekc()
			{
			Some('u') | Some('U') if !is_unsigned => { self.getc(); is_unsigned = true; },
			Some('l') | Some('L') if longs < 2 => { self.getc(); longs += 1; },
			_ => break,
			}
		}
		if let Some(c) = self.peekc() {
			if c.is_alphanumeric() || c == '_' {
				// Swallow the rest so `123abc` is one (bad) token
				self.read_ident();
				self.malformed(start, "invalid suffix on integer constant");
			}
		}
		let s = Signedness::from_bool_signed(!is_unsigned);
		let class = match longs
			{
			0 => IntClass::Int(s),
			1 => IntClass::Long(s),
			_ => IntClass::LongLong(s),
			};
		Ok(Token::Integer(whole, class, self.src[start.offset .. self.pos.offset].to_owned()))
	}

	/// Read a single token from the stream
	pub fn get_token(&mut self) -> Result<Lexeme>
	{
		let (newline, space) = self.eat_whitespace()?;
		let start_of_line = self.at_line_start || newline;
		self.at_line_start = false;

		let start = self.pos;
		let ch = match self.getc()
			{
			Some(c) => c,
			None => {
				self.done = true;
				return Ok(Lexeme { token: Token::EOF, span: self.span_from(start), start_of_line: true, leading_space: space });
				},
			};
		let ret = match ch
		{
		'#' => match_ch!(self, Token::Hash,
			'#' => Token::DoubleHash,
			),
		'~' => Token::Tilde,
		'!' => match_ch!(self, Token::Exclamation,
			'=' => Token::NotEquals,
			),
		';' => Token::Semicolon,
		',' => Token::Comma,
		'?' => Token::QuestionMark,
		':' => Token::Colon,
		'.' => {
			if self.peekc().map(|c| c.is_ascii_digit()).unwrap_or(false) {
				// `.5` style float
				self.read_digits(10);
				if let Some('e') | Some('E') = self.peekc() {
					self.getc();
					if let Some('+') | Some('-') = self.peekc() {
						self.getc();
					}
					self.read_digits(10);
				}
				let digits_end = self.pos.offset;
				let class = match_ch!(self, FloatClass::Double,
					'f' | 'F' => FloatClass::Float,
					'l' | 'L' => FloatClass::LongDouble,
					);
				let text = self.src[start.offset .. self.pos.offset].to_owned();
				let v: f64 = match format!("0{}", &self.src[start.offset .. digits_end]).parse()
					{
					Ok(v) => v,
					Err(_) => {
						self.malformed(start, "invalid floating point literal");
						0.0
						},
					};
				Token::Float(v, class, text)
			}
			else if self.peekc() == Some('.') && self.peekc2() == Some('.') {
				self.getc();
				self.getc();
				Token::Vargs
			}
			else {
				Token::Period
			}
			},
		'=' => match_ch!(self, Token::Assign,
			'=' => Token::Equality,
			),
		'+' => match_ch!(self, Token::Plus,
			'+' => Token::DoublePlus,
			'=' => Token::AssignAdd,
			),
		'-' => match_ch!(self, Token::Minus,
			'-' => Token::DoubleMinus,
			'=' => Token::AssignSub,
			'>' => Token::DerefMember,
			),
		'>' => match_ch!(self, Token::Gt,
			'>' => match_ch!(self, Token::ShiftRight,
				'=' => Token::AssignShiftRight,
				),
			'=' => Token::GtE,
			),
		'<' => match_ch!(self, Token::Lt,
			'<' => match_ch!(self, Token::ShiftLeft,
				'=' => Token::AssignShiftLeft,
				),
			'=' => Token::LtE,
			),
		'|' => match_ch!(self, Token::Pipe,
			'|' => Token::DoublePipe,
			'=' => Token::AssignBitOr,
			),
		'&' => match_ch!(self, Token::Ampersand,
			'&' => Token::DoubleAmpersand,
			'=' => Token::AssignBitAnd,
			),
		'^' => match_ch!(self, Token::Caret,
			'=' => Token::AssignBitXor,
			),
		'(' => Token::ParenOpen,	')' => Token::ParenClose,
		'{' => Token::BraceOpen,	'}' => Token::BraceClose,
		'[' => Token::SquareOpen,	']' => Token::SquareClose,
		'%' => match_ch!(self, Token::Percent,
			'=' => Token::AssignMod,
			),
		'*' => match_ch!(self, Token::Star,
			'=' => Token::AssignMul,
			),
		'/' => match_ch!(self, Token::Slash,
			'=' => Token::AssignDiv,
			),

		'"' => Token::String( self.read_string(start)? ),
		'\'' => {
			let v = self.read_charconst(start)?;
			Token::Character(v, self.src[start.offset .. self.pos.offset].to_owned())
			},

		'0' ..= '9' => {
			// Rewind the first digit (it's ASCII, so one byte/column)
			self.pos = start;
			self.read_number(start)?
			},
		c if c.is_alphabetic() || c == '_' || c == '$' => {
			self.pos = start;
			Token::Ident(self.read_ident())
			},
		c => {
			debug!("{}: Bad character {:?}", self.span_from(start), c);
			Token::Invalid(c)
			},
		};
		let rv = Lexeme {
			token: ret,
			span: self.span_from(start),
			start_of_line: start_of_line,
			leading_space: space || start_of_line,
			};
		trace!("get_token: {:?}", rv.token);
		Ok(rv)
	}
}

impl Iterator for Lexer
{
	type Item = Result<Lexeme>;
	fn next(&mut self) -> Option<Result<Lexeme>>
	{
		if self.done {
			return None;
		}
		match self.get_token()
		{
		Ok(Lexeme { token: Token::EOF, .. }) => None,
		Ok(l) => Some(Ok(l)),
		Err(e) => {
			self.done = true;
			Some(Err(e))
			},
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn lex(s: &str) -> Vec<Token> {
		tokenize(Arc::new(PathBuf::from("t.c")), s).map(|r| r.expect("lex error").token).collect()
	}

	#[test]
	fn maximal_munch()
	{
		assert_eq!(lex("a <<= b >> c >= d"), vec![
			Token::Ident("a".into()), Token::AssignShiftLeft, Token::Ident("b".into()),
			Token::ShiftRight, Token::Ident("c".into()), Token::GtE, Token::Ident("d".into()),
			]);
		assert_eq!(lex("&& & &= || |= ^= != == ->"), vec![
			Token::DoubleAmpersand, Token::Ampersand, Token::AssignBitAnd, Token::DoublePipe,
			Token::AssignBitOr, Token::AssignBitXor, Token::NotEquals, Token::Equality, Token::DerefMember,
			]);
		assert_eq!(lex("x+++y"), vec![Token::Ident("x".into()), Token::DoublePlus, Token::Plus, Token::Ident("y".into())]);
	}

	#[test]
	fn numbers()
	{
		let toks = lex("0x90 144 017 0b101 10UL 3.14159 5.0f 1e3");
		assert_eq!(toks[0], Token::Integer(0x90, IntClass::int(), "0x90".into()));
		assert_eq!(toks[1], Token::Integer(144, IntClass::int(), "144".into()));
		assert_eq!(toks[2], Token::Integer(15, IntClass::int(), "017".into()));
		assert_eq!(toks[3], Token::Integer(5, IntClass::int(), "0b101".into()));
		assert_eq!(toks[4], Token::Integer(10, IntClass::Long(Signedness::Unsigned), "10UL".into()));
		assert_eq!(toks[5], Token::Float(3.14159, FloatClass::Double, "3.14159".into()));
		assert_eq!(toks[6], Token::Float(5.0, FloatClass::Float, "5.0f".into()));
		assert_eq!(toks[7], Token::Float(1000.0, FloatClass::Double, "1e3".into()));
	}

	#[test]
	fn strings_and_chars()
	{
		let toks = lex(r#""DEBUG: %s\n" 'a' '\n' '\x41' '\0'"#);
		assert_eq!(toks[0], Token::String("DEBUG: %s\n".into()));
		assert_eq!(toks[1], Token::Character(97, "'a'".into()));
		assert_eq!(toks[2], Token::Character(10, "'\\n'".into()));
		assert_eq!(toks[3], Token::Character(0x41, "'\\x41'".into()));
		assert_eq!(toks[4], Token::Character(0, "'\\0'".into()));
	}

	#[test]
	fn comments_with_cyrillic()
	{
		let src = "/* Тестовый файл */\nsfr P1 = 0x90;    // Порт P1\nsbit EA = 0xAF;";
		let lexemes: Vec<_> = tokenize(Arc::new(PathBuf::from("t.c")), src).map(|r| r.unwrap()).collect();
		let toks: Vec<_> = lexemes.iter().map(|l| l.token.clone()).collect();
		assert_eq!(toks, vec![
			Token::Ident("sfr".into()), Token::Ident("P1".into()), Token::Assign, Token::Integer(0x90, IntClass::int(), "0x90".into()), Token::Semicolon,
			Token::Ident("sbit".into()), Token::Ident("EA".into()), Token::Assign, Token::Integer(0xAF, IntClass::int(), "0xAF".into()), Token::Semicolon,
			]);
		// Columns count characters, not bytes
		assert_eq!(lexemes[0].span.lo.line, 2);
		assert_eq!(lexemes[5].span.lo.line, 3);
		assert_eq!(lexemes[5].span.lo.column, 1);
		assert!(lexemes[0].start_of_line);
		assert!(!lexemes[1].start_of_line);
		assert!(lexemes[5].start_of_line);
	}

	#[test]
	fn column_after_unicode_string()
	{
		let src = "x = \"Привет\"; y";
		let lexemes: Vec<_> = tokenize(Arc::new(PathBuf::from("t.c")), src).map(|r| r.unwrap()).collect();
		assert_eq!(lexemes[2].token, Token::String("Привет".into()));
		assert_eq!(lexemes[4].token, Token::Ident("y".into()));
		assert_eq!(lexemes[4].span.lo.column, 15);
	}

	#[test]
	fn unterminated_is_fatal()
	{
		let mut l = tokenize(Arc::new(PathBuf::from("t.c")), "int x; /* never closed");
		for _ in 0 .. 3 {
			assert!(l.next().unwrap().is_ok());
		}
		match l.next()
		{
		Some(Err(Error::UnterminatedComment(sp))) => { assert_eq!(sp.lo.column, 8); },
		r => panic!("unexpected {:?}", r.map(|v| v.map(|l| l.token))),
		}
		assert!(l.next().is_none());

		let mut l = tokenize(Arc::new(PathBuf::from("t.c")), "\"abc\nx");
		match l.next()
		{
		Some(Err(Error::UnterminatedString(sp))) => { assert_eq!(sp.lo.line, 1); },
		_ => panic!("expected unterminated string"),
		}
	}

	#[test]
	fn malformed_literals_are_recoverable()
	{
		let mut l = tokenize(Arc::new(PathBuf::from("t.c")), "08 0x 1e 123abc '' \"\\x\" 7");
		let toks: Vec<_> = l.by_ref().map(|r| r.expect("lex error").token).collect();
		assert_eq!(toks, vec![
			Token::Integer(8, IntClass::int(), "08".into()),
			Token::Integer(0, IntClass::int(), "0x".into()),
			Token::Float(0.0, FloatClass::Double, "1e".into()),
			Token::Integer(123, IntClass::int(), "123abc".into()),
			Token::Character(0, "''".into()),
			Token::String("\0".into()),
			Token::Integer(7, IntClass::int(), "7".into()),
			]);
		let msgs: Vec<_> = l.take_problems().iter().map(|e| e.to_string()).collect();
		assert_eq!(msgs, vec![
			"malformed literal: invalid digit in octal constant",
			"malformed literal: no digits after base prefix",
			"malformed literal: exponent has no digits",
			"malformed literal: invalid suffix on integer constant",
			"malformed literal: empty character constant",
			"malformed literal: \\x used with no following hex digits",
			]);
		assert!(l.take_problems().is_empty());
	}

	#[test]
	fn oversized_hex_escape()
	{
		let mut l = tokenize(Arc::new(PathBuf::from("t.c")), "'\\x110000' '\\x10000000000000000' 'a'");
		let toks: Vec<_> = l.by_ref().map(|r| r.expect("lex error").token).collect();
		assert_eq!(toks.len(), 3);
		assert_eq!(toks[0], Token::Character(0xFF, "'\\x110000'".into()));
		assert_eq!(toks[1], Token::Character(0xFF, "'\\x10000000000000000'".into()));
		let problems = l.take_problems();
		assert_eq!(problems.len(), 2);
		assert!(problems.iter().all(|e| e.to_string().contains("out of range")));
		assert_eq!(problems[1].span().lo.column, 12);
	}

	#[test]
	fn bad_character_is_recoverable()
	{
		assert_eq!(lex("a @ b"), vec![Token::Ident("a".into()), Token::Invalid('@'), Token::Ident("b".into())]);
	}

	#[test]
	fn line_continuation()
	{
		let lexemes: Vec<_> = tokenize(Arc::new(PathBuf::from("t.c")), "#define X \\\n  1\nY").map(|r| r.unwrap()).collect();
		assert!(lexemes[0].start_of_line);
		assert!(!lexemes[3].start_of_line, "continued line is the same logical line");
		assert!(lexemes[4].start_of_line);
	}

	#[test]
	fn restartable()
	{
		let mut l = tokenize(Arc::new(PathBuf::from("t.c")), "a b");
		let first: Vec<_> = l.by_ref().map(|r| r.unwrap().token).collect();
		l.restart();
		let second: Vec<_> = l.map(|r| r.unwrap().token).collect();
		assert_eq!(first, second);
	}
}
