//! `#if`/`#elif` constant expression evaluation
//!
//! Runs over tokens that have already been macro-expanded (with `defined` resolved), so any identifier left
//! over evaluates to zero.
use super::token::Token;

#[derive(Debug,Clone,PartialEq,thiserror::Error)]
pub enum Error
{
	#[error("unexpected `{0}`")]
	Unexpected(String),
	#[error("unexpected end of expression")]
	UnexpectedEnd,
	#[error("expected `{0}`")]
	Expected(&'static str),
	#[error("division by zero")]
	DivideByZero,
	#[error("floating constant in preprocessor expression")]
	Float,
}

type Value = i64;
type Result = ::std::result::Result<Value,Error>;

/// Evaluate a complete expression
pub fn evaluate(tokens: &[Token]) -> Result
{
	let mut p = Parser { tokens: tokens, pos: 0 };
	let rv = p.evaluate_expr()?;
	match p.get_tok()
	{
	Some(t) => Err(Error::Unexpected(t.to_string())),
	None => Ok(rv),
	}
}

struct Parser<'a>
{
	tokens: &'a [Token],
	pos: usize,
}

impl<'a> Parser<'a>
{
	fn peek_tok(&self) -> Option<&'a Token> {
		self.tokens.get(self.pos)
	}
	fn get_tok(&mut self) -> Option<&'a Token> {
		let rv = self.tokens.get(self.pos);
		if rv.is_some() {
			self.pos += 1;
		}
		rv
	}

	fn evaluate_expr_value(&mut self) -> Result {
		Ok(match self.get_tok()
		{
		Some(&Token::Integer(v,_,_)) => v as Value,
		Some(&Token::Character(v,_)) => v as Value,
		Some(&Token::Float(..)) => return Err(Error::Float),
		Some(&Token::Ident(ref n)) => {
			trace!("#if: undefined identifier {}, evaluating to 0", n);
			0
			},
		Some(&Token::ParenOpen) => {
			let rv = self.evaluate_expr()?;
			match self.get_tok()
			{
			Some(&Token::ParenClose) => {},
			Some(t) => return Err(Error::Unexpected(t.to_string())),
			None => return Err(Error::Expected(")")),
			}
			rv
			},
		Some(t) => return Err(Error::Unexpected(t.to_string())),
		None => return Err(Error::UnexpectedEnd),
		})
	}
	fn evaluate_expr_unary(&mut self) -> Result {
		let cur = Self::evaluate_expr_unary;
		let next = Self::evaluate_expr_value;
		match self.peek_tok()
		{
		Some(Token::Exclamation) => { self.get_tok(); Ok( (cur(self)? == 0) as _ ) },
		Some(Token::Minus) => { self.get_tok(); Ok( cur(self)?.wrapping_neg() ) },
		Some(Token::Plus) => { self.get_tok(); cur(self) },
		Some(Token::Tilde) => { self.get_tok(); Ok( !cur(self)? ) },
		_ => next(self),
		}
	}
	fn evaluate_expr_muldiv(&mut self) -> Result {
		let next = Self::evaluate_expr_unary;
		let mut v = next(self)?;
		loop
		{
			v = match self.peek_tok()
				{
				Some(Token::Star ) => { self.get_tok(); v.wrapping_mul(next(self)?) },
				Some(Token::Slash) => {
					self.get_tok();
					let d = next(self)?;
					if d == 0 {
						return Err(Error::DivideByZero);
					}
					v.wrapping_div(d)
					},
				Some(Token::Percent) => {
					self.get_tok();
					let d = next(self)?;
					if d == 0 {
						return Err(Error::DivideByZero);
					}
					v.wrapping_rem(d)
					},
				_ => return Ok(v),
				};
		}
	}
	fn evaluate_expr_addsub(&mut self) -> Result {
		let next = Self::evaluate_expr_muldiv;
		let mut v = next(self)?;
		loop
		{
			v = match self.peek_tok()
				{
				Some(Token::Plus ) => { self.get_tok(); v.wrapping_add(next(self)?) },
				Some(Token::Minus) => { self.get_tok(); v.wrapping_sub(next(self)?) },
				_ => return Ok(v),
				};
		}
	}
	fn evaluate_expr_shift(&mut self) -> Result {
		let next = Self::evaluate_expr_addsub;
		let mut v = next(self)?;
		loop
		{
			v = match self.peek_tok()
				{
				Some(Token::ShiftLeft) => { self.get_tok(); v.wrapping_shl(next(self)? as u32) },
				Some(Token::ShiftRight) => { self.get_tok(); v.wrapping_shr(next(self)? as u32) },
				_ => return Ok(v),
				};
		}
	}
	fn evaluate_expr_cmp(&mut self) -> Result {
		let next = Self::evaluate_expr_shift;
		let mut v = next(self)?;
		loop
		{
			v = match self.peek_tok()
				{
				Some(Token::Lt ) => { self.get_tok(); (v <  next(self)?) as _ },
				Some(Token::LtE) => { self.get_tok(); (v <= next(self)?) as _ },
				Some(Token::Gt ) => { self.get_tok(); (v >  next(self)?) as _ },
				Some(Token::GtE) => { self.get_tok(); (v >= next(self)?) as _ },
				_ => return Ok(v),
				};
		}
	}
	fn evaluate_expr_equality(&mut self) -> Result {
		let next = Self::evaluate_expr_cmp;
		let mut v = next(self)?;
		loop
		{
			v = match self.peek_tok()
				{
				Some(Token::Equality) => { self.get_tok(); (v == next(self)?) as _ },
				Some(Token::NotEquals) => { self.get_tok(); (v != next(self)?) as _ },
				_ => return Ok(v),
				};
		}
	}
	fn evaluate_expr_bitand(&mut self) -> Result {
		let next = Self::evaluate_expr_equality;
		let mut v = next(self)?;
		while let Some(Token::Ampersand) = self.peek_tok() {
			self.get_tok();
			v &= next(self)?;
		}
		Ok(v)
	}
	fn evaluate_expr_bitxor(&mut self) -> Result {
		let next = Self::evaluate_expr_bitand;
		let mut v = next(self)?;
		while let Some(Token::Caret) = self.peek_tok() {
			self.get_tok();
			v ^= next(self)?;
		}
		Ok(v)
	}
	fn evaluate_expr_bitor(&mut self) -> Result {
		let next = Self::evaluate_expr_bitxor;
		let mut v = next(self)?;
		while let Some(Token::Pipe) = self.peek_tok() {
			self.get_tok();
			v |= next(self)?;
		}
		Ok(v)
	}
	fn evaluate_expr_bool(&mut self) -> Result {
		let next = Self::evaluate_expr_bitor;
		let mut v = next(self)?;
		loop
		{
			v = match self.peek_tok()
				{
				Some(Token::DoubleAmpersand) => { self.get_tok(); let oth = next(self)?; (oth != 0 && v != 0) as _ },
				_ => return Ok(v),
				};
		}
	}
	fn evaluate_expr_boolor(&mut self) -> Result {
		let next = Self::evaluate_expr_bool;
		let mut v = next(self)?;
		loop
		{
			v = match self.peek_tok()
				{
				Some(Token::DoublePipe) => { self.get_tok(); let oth = next(self)?; (oth != 0 || v != 0) as _ },
				_ => return Ok(v),
				};
		}
	}
	fn evaluate_expr_ternary(&mut self) -> Result {
		let v = self.evaluate_expr_boolor()?;
		match self.peek_tok()
		{
		Some(Token::QuestionMark) => {
			self.get_tok();
			let a = self.evaluate_expr()?;
			match self.get_tok()
			{
			Some(Token::Colon) => {},
			_ => return Err(Error::Expected(":")),
			}
			// Right-associative: `a ? b : c ? d : e`
			let b = self.evaluate_expr_ternary()?;
			Ok(if v != 0 { a } else { b })
			},
		_ => Ok(v),
		}
	}
	fn evaluate_expr(&mut self) -> Result {
		self.evaluate_expr_ternary()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use std::path::PathBuf;
	use std::sync::Arc;

	fn eval(s: &str) -> Result {
		let toks: Vec<Token> = super::super::lex::tokenize(Arc::new(PathBuf::from("t.c")), s)
			.map(|l| l.expect("lex").token)
			.collect();
		evaluate(&toks)
	}

	#[test]
	fn precedence()
	{
		assert_eq!(eval("1 + 2 * 3"), Ok(7));
		assert_eq!(eval("(1 + 2) * 3"), Ok(9));
		assert_eq!(eval("1 << 2 + 1"), Ok(8));
		assert_eq!(eval("1 | 2 ^ 3 & 1"), Ok(1 | (2 ^ (3 & 1))));
		assert_eq!(eval("2 > 1 == 1"), Ok(1));
		assert_eq!(eval("0 || 1 && 0"), Ok(0));
		assert_eq!(eval("-1 < 0"), Ok(1));
		assert_eq!(eval("!0 + ~0"), Ok(0));
	}

	#[test]
	fn ternary_is_right_associative()
	{
		assert_eq!(eval("0 ? 1 : 0 ? 2 : 3"), Ok(3));
		assert_eq!(eval("1 ? 1 : 0 ? 2 : 3"), Ok(1));
	}

	#[test]
	fn leftovers()
	{
		assert_eq!(eval("UNDEFINED_NAME"), Ok(0));
		assert_eq!(eval("'A' == 65"), Ok(1));
		assert_eq!(eval("1 / 0"), Err(Error::DivideByZero));
		assert_eq!(eval("1 +"), Err(Error::UnexpectedEnd));
		assert_eq!(eval("(1"), Err(Error::Expected(")")));
		assert_eq!(eval("1 2"), Err(Error::Unexpected("2".to_owned())));
	}
}
