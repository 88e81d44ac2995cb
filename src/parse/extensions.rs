//! 8051 / vendor declaration extensions
//!
//! `sfr` and `sbit` declarations, the Keil-style `interrupt N [using B]` function suffix, and GCC-style
//! `__attribute__((...))` lists. Both interrupt spellings end up as the same `InterruptAttribute`.
use super::ParseResult;
use super::expr::const_eval;
use crate::preproc::token::Token;
use crate::ast::{self,Span,Item,InterruptAttribute,InterruptVector,Attribute,BitAddress};
use crate::symbols::{Symbol,SymbolKind};
use crate::types::{Type,BaseType,IntClass,Signedness};

/// Largest address reachable by direct `sfr`/`sbit` addressing
const MAX_DIRECT_ADDRESS: u64 = 0xFF;
/// Register banks selectable with `using`
const NUM_REGISTER_BANKS: u64 = 4;

/// A plain literal keeps its full unsigned value, anything else goes through `const_eval`
fn constant_address(value: &ast::Node) -> Option<u64>
{
	value.literal_integer()
		.or_else(|| const_eval(value).filter(|v| *v >= 0).map(|v| v as u64))
}

/// Extension markers collected around a declaration
#[derive(Debug,Clone,Default)]
pub struct DeclExtensions
{
	pub interrupt: Option<InterruptAttribute>,
	/// Where the interrupt marker was written
	pub interrupt_span: Option<Span>,
	pub attributes: Vec<Attribute>,
}

impl<'ast> super::ParseState<'ast>
{
	/// `sfr NAME = ADDR;` (`sfr` already consumed)
	pub fn parse_sfr(&mut self) -> ParseResult<()>
	{
		let start = self.lex.last_span();
		let name = syntax_assert!(self.lex.get_token()?, Token::Ident(n) => n);
		syntax_assert!(self.lex => Token::Assign);
		let value = self.parse_expr_1()?;
		let address = match constant_address(&value)
			{
			Some(v) => v,
			None => syntax_error!("`sfr {}` needs an integer constant address", name),
			};
		self.expect_semicolon()?;
		let span = self.span_from(&start);

		if address > MAX_DIRECT_ADDRESS {
			self.warning(format!("address {:#X} of `sfr {}` is out of the 8-bit range", address, name), &value.span);
		}
		debug!("sfr {} = {:#X}", name, address);

		let mut sym = Symbol::new(name.clone(), SymbolKind::Sfr, register_type(), span.clone());
		sym.address = Some(address);
		sym.defined = true;
		self.declare(sym);
		self.unit.items.push(Item::SpecialRegister(ast::SpecialRegisterDecl {
			name: name,
			address: address,
			span: span,
			}));
		Ok( () )
	}

	/// `sbit NAME = ADDR;` or `sbit NAME = REG ^ BIT;` (`sbit` already consumed)
	pub fn parse_sbit(&mut self) -> ParseResult<()>
	{
		let start = self.lex.last_span();
		let name = syntax_assert!(self.lex.get_token()?, Token::Ident(n) => n);
		syntax_assert!(self.lex => Token::Assign);
		let value_start = self.lex.next_span()?;

		let address = match self.lex.get_token()?
			{
			Token::Ident(reg) if peek_token!(self.lex, Token::Caret) => {
				let bit_node = self.parse_expr_1()?;
				let bit = match const_eval(&bit_node)
					{
					Some(v) if v >= 0 && v < 8 => v as u8,
					_ => syntax_error!("bit number in `sbit {}` must be a constant from 0 to 7", name),
					};
				let reg_addr = match self.symbols.lookup(&reg)
					{
					Some(s) if s.kind == SymbolKind::Sfr => s.address,
					_ => None,
					};
				match reg_addr
				{
				None => self.warning(format!("`{}` is not a known `sfr`", reg), &value_start),
				Some(a) if a % 8 != 0 => self.warning(format!("`sfr {}` ({:#X}) is not bit-addressable", reg, a), &value_start),
				Some(_) => {},
				}
				BitAddress::RegisterBit {
					address: reg_addr.map(|a| a + bit as u64),
					register: reg,
					bit: bit,
					}
				},
			t @ _ => {
				self.lex.put_back(t);
				let value = self.parse_expr_1()?;
				match constant_address(&value)
				{
				Some(v) => BitAddress::Absolute(v),
				None => syntax_error!("`sbit {}` needs an integer constant address", name),
				}
				},
			};
		self.expect_semicolon()?;
		let span = self.span_from(&start);

		if let BitAddress::Absolute(a) = address {
			if a > MAX_DIRECT_ADDRESS {
				self.warning(format!("address {:#X} of `sbit {}` is out of the 8-bit range", a, name), &value_start);
			}
		}
		debug!("sbit {} = {:?}", name, address);

		let decl = ast::SpecialBitDecl {
			name: name.clone(),
			address: address,
			span: span.clone(),
			};
		let mut sym = Symbol::new(name, SymbolKind::Sbit, Type::new_bare(BaseType::Bool), span);
		sym.address = decl.bit_address();
		sym.defined = true;
		self.declare(sym);
		self.unit.items.push(Item::SpecialBit(decl));
		Ok( () )
	}

	/// Collect any `interrupt`/`__attribute__` markers at the current position
	pub fn parse_decl_extensions(&mut self, ext: &mut DeclExtensions) -> ParseResult<()>
	{
		loop
		{
			match self.lex.get_token()?
			{
			Token::Rword_interrupt => {
				let start = self.lex.last_span();
				let attr = self.parse_interrupt_suffix()?;
				let span = self.span_from(&start);
				self.set_interrupt(ext, attr, span);
				},
			Token::Rword_gcc_attribute => {
				self.parse_gcc_attributes(ext)?;
				},
			t @ _ => {
				self.lex.put_back(t);
				return Ok( () );
				},
			}
		}
	}

	fn set_interrupt(&mut self, ext: &mut DeclExtensions, attr: InterruptAttribute, span: Span)
	{
		match ext.interrupt
		{
		Some(ref prev) if *prev != attr => {
			self.semantic_error("conflicting interrupt markers on one function".to_owned(), &span);
			},
		_ => {},
		}
		debug!("interrupt: {:?}", attr);
		ext.interrupt = Some(attr);
		ext.interrupt_span = Some(span);
	}

	/// `interrupt N [using B]` (`interrupt` already consumed)
	fn parse_interrupt_suffix(&mut self) -> ParseResult<InterruptAttribute>
	{
		let parens = peek_token!(self.lex, Token::ParenOpen);
		let vector = match self.lex.get_token()?
			{
			Token::Integer(v, _, _) if v <= u32::max_value() as u64 => InterruptVector::Number(v as u32),
			Token::Ident(n) => {
				// Usually a vector constant from a vendor header that couldn't be included
				let span = self.lex.last_span();
				self.warning(format!("interrupt vector `{}` is not a constant, kept by name", n), &span);
				InterruptVector::Named(n)
				},
			t @ _ => syntax_error!("expected an interrupt vector number, found `{}`", t),
			};
		if parens {
			syntax_assert!(self.lex => Token::ParenClose);
		}

		let register_bank = if peek_token!(self.lex, Token::Ident(ref n) if n == "using" || n == "__using") {
				match self.lex.get_token()?
				{
				Token::Integer(v, _, _) if v < NUM_REGISTER_BANKS => Some(v as u8),
				t @ _ => syntax_error!("register bank must be 0 to {}, found `{}`", NUM_REGISTER_BANKS-1, t),
				}
			}
			else {
				None
			};
		Ok(InterruptAttribute {
			vector: Some(vector),
			register_bank: register_bank,
			})
	}

	/// `__attribute__((name, name(args), ...))` (`__attribute__` already consumed)
	pub fn parse_gcc_attributes(&mut self, ext: &mut DeclExtensions) -> ParseResult<()>
	{
		let start = self.lex.last_span();
		syntax_assert!(self.lex => Token::ParenOpen);
		syntax_assert!(self.lex => Token::ParenOpen);
		loop
		{
			if peek_token!(self.lex, Token::ParenClose) {
				break;
			}
			let name = match self.lex.get_token()?
				{
				Token::Ident(n) => n,
				// e.g. `interrupt`, `const`
				t @ _ => match t.to_string()
					{
					ref s if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => s.clone(),
					_ => syntax_error!("expected attribute name, found `{}`", t),
					},
				};
			let name = normalise_attribute_name(&name);
			let args = if peek_token!(self.lex, Token::ParenOpen) { self.get_attribute_args()? } else { Vec::new() };

			if name == "interrupt" {
				let vector = match &args[..]
					{
					[] => None,
					[Token::Integer(v, _, _)] if *v <= u32::max_value() as u64 => Some(InterruptVector::Number(*v as u32)),
					[Token::String(s)] => Some(InterruptVector::Named(s.clone())),
					[Token::Ident(s)] => Some(InterruptVector::Named(s.clone())),
					_ => syntax_error!("malformed `interrupt` attribute"),
					};
				let span = self.span_from(&start);
				self.set_interrupt(ext, InterruptAttribute { vector: vector, register_bank: None }, span);
			}
			else {
				trace!("opaque attribute {}({:?})", name, args);
				ext.attributes.push(Attribute {
					name: name,
					args: split_attribute_args(&args),
					});
			}

			if !peek_token!(self.lex, Token::Comma) {
				syntax_assert!(self.lex => Token::ParenClose);
				break;
			}
		}
		syntax_assert!(self.lex => Token::ParenClose);
		Ok( () )
	}

	/// Tokens up to the `)` closing an attribute's argument list
	fn get_attribute_args(&mut self) -> ParseResult<Vec<Token>>
	{
		let mut rv = Vec::new();
		let mut depth = 0usize;
		loop
		{
			match self.lex.get_token()?
			{
			Token::ParenClose if depth == 0 => return Ok(rv),
			Token::EOF => syntax_error!("unterminated `__attribute__` argument list"),
			t @ _ => {
				match t
				{
				Token::ParenOpen => depth += 1,
				Token::ParenClose => depth -= 1,
				_ => {},
				}
				rv.push(t);
				},
			}
		}
	}
}

/// `__packed__` and `packed` are the same attribute
fn normalise_attribute_name(name: &str) -> String
{
	if name.len() > 4 && name.starts_with("__") && name.ends_with("__") {
		name[2 .. name.len()-2].to_owned()
	}
	else {
		name.to_owned()
	}
}

/// Render attribute arguments as text, one entry per top-level comma-separated argument
fn split_attribute_args(tokens: &[Token]) -> Vec<String>
{
	let mut rv = Vec::new();
	let mut cur: Vec<String> = Vec::new();
	let mut depth = 0usize;
	for t in tokens
	{
		match t
		{
		Token::Comma if depth == 0 => {
			rv.push(cur.join(" "));
			cur.clear();
			continue ;
			},
		Token::ParenOpen => depth += 1,
		Token::ParenClose => depth = depth.saturating_sub(1),
		_ => {},
		}
		cur.push(t.to_string());
	}
	if !cur.is_empty() || !rv.is_empty() {
		rv.push(cur.join(" "));
	}
	rv
}

/// Type given to `sfr` symbols
fn register_type() -> Type
{
	let mut ty = Type::new_bare(BaseType::Integer(IntClass::Char(Some(Signedness::Unsigned))));
	ty.qualifiers.set_volatile();
	ty
}
