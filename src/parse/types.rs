//! Parser for types
use super::ParseResult;
use crate::preproc::token::Token;
use crate::ast::{self,Span,Param,FunctionSig};
use crate::types::{Type,BaseType,IntClass,FloatClass,Qualifiers,StorageClass,Signedness,ArraySize};

#[derive(Debug)]
enum TypeNode
{
	/// Inner identifier (e.g. `foo` in `int *foo[2]`), blank for abstract declarators
	Leaf(String, Span),
	/// A pointer (with qualifiers for the pointer value - not the pointee)
	Ptr(Box<TypeNode>, Qualifiers),
	/// Function type
	Fcn(Box<TypeNode>, ParamList),
	/// Array type, with optional size node
	Array(Box<TypeNode>, Option<ast::Node>),
}

#[derive(Debug,Clone)]
struct ParamList
{
	params: Vec<Param>,
	is_variadic: bool,
	unspecified: bool,
}

/// Declaration specifiers (`static const unsigned int`)
#[derive(Debug,Clone)]
pub struct BaseSpec
{
	pub storage: Option<StorageClass>,
	pub is_typedef: bool,
	pub ty: Type,
}

/// Result of parsing a declarator
#[derive(Debug)]
pub struct Declarator
{
	pub name: String,
	/// Span of the name (start of the declarator for abstract ones)
	pub name_span: Span,
	pub ty: Type,
	/// Set when the name is directly declared as a function
	pub sig: Option<FunctionSig>,
}

impl<'ast> super::ParseState<'ast>
{
	/// Parse a bare type name (no pointer handling)
	pub fn get_base_type(&mut self) -> ParseResult<BaseSpec> {
		match self.get_base_type_opt()?
		{
		Some(t) => Ok(t),
		None => {
			let t = self.lex.get_token()?;
			syntax_error!("expected a type, found `{}`", t)
			},
		}
	}

	/// Read a single basic type, along with any storage class
	/// - Could be a primitive or a typedef
	pub fn get_base_type_opt(&mut self) -> ParseResult<Option<BaseSpec>>
	{
		let mut qualifiers = Qualifiers::new();
		let mut storageclass = None;
		let mut is_typedef = false;

		let mut typeid = None;
		let mut is_signed: Option<bool> = None;
		let mut intsize: Option<u8> = None;
		let mut int_seen = false;
		let mut double_seen = false;

		// 1. Storage classes (extern, static, auto, register)
		loop
		{
			let sc = match self.lex.get_token()?
				{
				Token::Rword_typedef  => { is_typedef = true; continue; },
				Token::Rword_inline   => { continue; },
				Token::Rword_extern   => StorageClass::Extern,
				Token::Rword_auto     => StorageClass::Auto,
				Token::Rword_static   => StorageClass::Static,
				Token::Rword_register => StorageClass::Register,
				tok @ _ => {
					self.lex.put_back(tok);
					break;
					}
				};
			if storageclass.is_some() {
				syntax_error!("multiple storage classes in declaration");
			}
			storageclass = Some(sc);
		}
		// 2. Type (with const mixed in)
		loop
		{
			match self.lex.get_token()?
			{
			// Const/Volatile
			Token::Rword_const    => { qualifiers.set_const(); },
			Token::Rword_volatile => { qualifiers.set_volatile(); },
			Token::Rword_restrict => { qualifiers.set_restrict(); },
			// Primitives (Integer and Double)
			Token::Rword_signed   => { is_signed = Some(true ); },
			Token::Rword_unsigned => { is_signed = Some(false); },
			Token::Rword_int => {
				if typeid.is_some() { syntax_error!("multiple types in definition") }
				if int_seen { syntax_error!("multiple `int` keywords in type") }
				if intsize == Some(0) { syntax_error!("invalid use of `int`") }
				int_seen = true;
				if intsize.is_none() {
					intsize = Some(2);
				}
				},
			Token::Rword_char => {
				if typeid.is_some() { syntax_error!("multiple types in definition") }
				if intsize.is_some() { syntax_error!("invalid use of `char`") }
				intsize = Some(0);
				},
			Token::Rword_short => {
				if typeid.is_some() { syntax_error!("multiple types in definition") }
				intsize = match intsize
					{
					None => Some(1),	// none => 'short'
					Some(2) => Some(1),	// 'int' => 'short'
					_ => syntax_error!("invalid use of `short`")
					};
				},
			Token::Rword_long => {
				if double_seen {
					typeid = Some(BaseType::Float(FloatClass::LongDouble));
					double_seen = false;
				}
				else {
					if typeid.is_some() { syntax_error!("multiple types in definition") }
					intsize = match intsize
						{
						None => Some(3),	// no size yet, set to 'long'
						Some(2) => Some(3),	// 'int' => 'long'
						Some(3) => Some(4),	// 'long' => 'long long'
						_ => syntax_error!("invalid use of `long`")
						};
				}
				},
			Token::Rword_float => {
				if typeid.is_some() || int_seen { syntax_error!("multiple types in definition") }
				typeid = Some(BaseType::Float(FloatClass::Float));
				},
			Token::Rword_double => {
				if typeid.is_some() || int_seen { syntax_error!("multiple types in definition") }
				if intsize == Some(3) {
					typeid = Some(BaseType::Float(FloatClass::LongDouble));
					intsize = None;
				}
				else {
					typeid = Some(BaseType::Float(FloatClass::Double));
					double_seen = true;
				}
				},
			// Simple types
			Token::Rword_Bool => {
				if typeid.is_some() { syntax_error!("multiple types in definition") }
				typeid = Some(BaseType::Bool);
				},
			Token::Rword_void => {
				if typeid.is_some() { syntax_error!("multiple types in definition") }
				typeid = Some(BaseType::Void);
				},
			Token::Ident(n) => {
				if typeid.is_some() || intsize.is_some() || is_signed.is_some() {
					self.lex.put_back( Token::Ident(n) );
					break;
				}
				match self.symbols.typedef(&n)
				{
				Some(v) => {
					typeid = Some(v.basetype.clone());
					qualifiers.merge_from( &v.qualifiers );
					},
				None => {
					trace!("get_base_type_opt: non-type ident {:?}", n);
					self.lex.put_back( Token::Ident(n) );
					break;
					}
				}
				},
			tok @ _ => {
				self.lex.put_back(tok);
				break;
				}
			}
		}

		let rv = match (typeid, intsize)
			{
			(Some(t), _) => t,
			(None, Some(size)) => {
				let signedness = Signedness::from_bool_signed(is_signed.unwrap_or(true));
				BaseType::Integer( match size
					{
					0 => IntClass::Char(is_signed.map(|_| signedness)),
					1 => IntClass::Short(signedness),
					2 => IntClass::Int(signedness),
					3 => IntClass::Long(signedness),
					_ => IntClass::LongLong(signedness),
					})
				},
			(None, None) =>
				if let Some(is_signed) = is_signed {
					BaseType::Integer( IntClass::Int( Signedness::from_bool_signed(is_signed) ) )
				}
				else if qualifiers != Qualifiers::new() || storageclass.is_some() || is_typedef {
					// If any tokens were consumed during this function, we have to error
					let t = self.lex.get_token()?;
					syntax_error!("expected a type, found `{}`", t);
				}
				else {
					// Otherwise, leave it up to the caller
					return Ok( None )
				},
			};

		Ok( Some(BaseSpec {
			storage: storageclass,
			is_typedef: is_typedef,
			ty: Type::new(rv, qualifiers),
			}) )
	}

	/// Parse a full type (Pointers, arrays, and functions) from a base (starting) type
	///
	/// Implements a separate recursive-descent parser, to handle function types correctly
	pub fn get_full_type(&mut self, basetype: Type) -> ParseResult<Declarator>
	{
		let mut typenode = self.get_fulltype_ptr()?;
		trace!("get_full_type: typenode={:?}", typenode);
		let mut rettype = basetype;
		let mut sig = None;
		loop
		{
			typenode = match typenode
				{
				TypeNode::Leaf(name, span) => {
					return Ok(Declarator {
						name: name,
						name_span: span,
						ty: rettype,
						sig: sig,
						});
					},
				TypeNode::Ptr(sub, qual) => {
					sig = None;
					rettype = Type::new( BaseType::Pointer(Box::new(rettype)), qual );
					*sub
					},
				TypeNode::Fcn(sub, args) => {
					let arg_types = args.params.iter().map(|p| p.ty.clone()).collect();
					let s = FunctionSig {
						ret: rettype.clone(),
						params: args.params,
						is_variadic: args.is_variadic,
						unspecified_params: args.unspecified,
						};
					sig = Some(s);
					rettype = Type::new_bare( BaseType::Function(Box::new(rettype), arg_types) );
					*sub
					},
				TypeNode::Array(sub, size) => {
					sig = None;
					let array_size = match size
						{
						None => ArraySize::None,
						Some(size_expr) => match super::expr::const_eval(&size_expr)
							{
							Some(v) if v >= 0 => ArraySize::Fixed(v as u64),
							_ => {
								self.warning("array size is not an integer constant".to_owned(), &size_expr.span);
								ArraySize::None
								},
							},
						};
					rettype = Type::new_bare( BaseType::Array(Box::new(rettype), array_size) );
					*sub
					},
				};
		}
	}

	/// Handle pointers in types
	fn get_fulltype_ptr(&mut self) -> ParseResult<TypeNode>
	{
		match self.lex.get_token()?
		{
		Token::Star => {
			// Get const/volatile
			let mut qualifiers = Qualifiers::new();
			loop
			{
				match self.lex.get_token()?
				{
				Token::Rword_const    => { qualifiers.set_const(); }
				Token::Rword_volatile => { qualifiers.set_volatile(); }
				Token::Rword_restrict => { qualifiers.set_restrict(); }
				tok @ _ => {
					self.lex.put_back(tok);
					break;
					}
				}
			}
			Ok( TypeNode::Ptr( Box::new(self.get_fulltype_ptr()?), qualifiers ) )
			},
		tok @ _ => {
			self.lex.put_back(tok);
			let rv = self.get_fulltype_bottom()?;
			let rv = self.get_fulltype_fcn(rv)?;
			let rv = self.get_fulltype_array(rv)?;
			Ok( rv )
			}
		}
	}
	/// Handle the bottom layer (either parentheses, or an identifier)
	fn get_fulltype_bottom(&mut self) -> ParseResult<TypeNode>
	{
		match self.lex.get_token()?
		{
		// `(` followed by a type is a parameter list of an abstract declarator, not grouping
		Token::ParenOpen if !self.starts_type()? && !peek_token_nc!(self.lex, Token::ParenClose) => {
			trace!("get_fulltype_bottom - Parentheses");
			let rv = self.get_fulltype_ptr()?;
			syntax_assert!(self.lex => Token::ParenClose);
			Ok(rv)
			},
		Token::Ident(v) => {
			Ok(TypeNode::Leaf(v, self.lex.last_span()))
			},
		tok @ _ => {
			self.lex.put_back(tok);
			let span = self.lex.next_span()?;
			Ok(TypeNode::Leaf(String::new(), span))
			}
		}
	}
	/// Handle function types (parentheses after identifier)
	fn get_fulltype_fcn(&mut self, inner: TypeNode) -> ParseResult<TypeNode>
	{
		if !peek_token!(self.lex, Token::ParenOpen) {
			return Ok(inner);
		}
		trace!("get_fulltype_fcn - Parentheses");
		let mut rv = ParamList { params: Vec::new(), is_variadic: false, unspecified: false };
		if peek_token!(self.lex, Token::ParenClose) {
			// `f()` - Old-style, says nothing about the arguments
			rv.unspecified = true;
			return Ok( TypeNode::Fcn(Box::new(inner), rv) );
		}
		// Arguments!
		loop
		{
			if peek_token!(self.lex, Token::Vargs) {
				rv.is_variadic = true;
				break;
			}
			let base = self.get_base_type()?;
			if base.is_typedef {
				syntax_error!("`typedef` in a parameter list");
			}
			let d = self.get_full_type(base.ty)?;
			rv.params.push(Param {
				ty: d.ty,
				name: if d.name == "" { None } else { Some(d.name) },
				});
			if !peek_token!(self.lex, Token::Comma) {
				break;
			}
		}
		// Special case handling of (void)
		if rv.params.len() == 1 && rv.params[0].name.is_none() && rv.params[0].ty.is_void() && !rv.is_variadic {
			rv.params.clear();
		}
		syntax_assert!(self.lex => Token::ParenClose);
		Ok( TypeNode::Fcn(Box::new(inner), rv) )
	}
	/// Handle array definition
	fn get_fulltype_array(&mut self, inner: TypeNode) -> ParseResult<TypeNode>
	{
		let mut rv = inner;
		while peek_token!(self.lex, Token::SquareOpen)
		{
			// If next token == Token::SquareClose, return an array with null node
			let sizenode = if peek_token!(self.lex, Token::SquareClose) {
					None
				}
				else {
					let size = self.parse_expr_1()?;
					syntax_assert!(self.lex => Token::SquareClose);
					Some( size )
				};
			rv = TypeNode::Array(Box::new(rv), sizenode);
		}
		Ok( rv )
	}

	/// The next token begins a type name (keyword or typedef)
	pub fn starts_type(&mut self) -> ParseResult<bool>
	{
		let tok = self.lex.get_token()?;
		let rv = match tok
			{
			Token::Rword_const | Token::Rword_volatile | Token::Rword_restrict
			| Token::Rword_signed | Token::Rword_unsigned
			| Token::Rword_void | Token::Rword_Bool
			| Token::Rword_char | Token::Rword_short | Token::Rword_int | Token::Rword_long
			| Token::Rword_float | Token::Rword_double => true,
			Token::Ident(ref n) => self.symbols.typedef(n).is_some(),
			_ => false,
			};
		self.lex.put_back(tok);
		Ok(rv)
	}

	/// Type name, as used in casts and `sizeof`
	pub fn get_type_name(&mut self) -> ParseResult<Type>
	{
		let base = self.get_base_type()?;
		if base.storage.is_some() || base.is_typedef {
			syntax_error!("storage class in a type name");
		}
		let d = self.get_full_type(base.ty)?;
		if d.name != "" {
			syntax_error!("unexpected `{}` in type name", d.name);
		}
		Ok(d.ty)
	}
}

#[cfg(test)]
mod tests
{
	use crate::types::{Type,BaseType,IntClass,Signedness,ArraySize};
	use crate::ast::Item;
	use crate::test_util::parse_str;

	fn var_type(src: &str, name: &str) -> Type {
		let (unit, _) = parse_str(src);
		let rv = unit.variables().find(|v| v.name == name).map(|v| v.ty.clone()).expect("variable");
		rv
	}

	#[test]
	fn integer_specifiers()
	{
		assert_eq!(var_type("unsigned char c;", "c").basetype, BaseType::Integer(IntClass::Char(Some(Signedness::Unsigned))));
		assert_eq!(var_type("char c;", "c").basetype, BaseType::Integer(IntClass::Char(None)));
		assert_eq!(var_type("long int l;", "l").basetype, BaseType::Integer(IntClass::Long(Signedness::Signed)));
		assert_eq!(var_type("unsigned long long u;", "u").basetype, BaseType::Integer(IntClass::LongLong(Signedness::Unsigned)));
		assert_eq!(var_type("short int s;", "s").basetype, BaseType::Integer(IntClass::Short(Signedness::Signed)));
		assert_eq!(var_type("unsigned u;", "u").basetype, BaseType::Integer(IntClass::Int(Signedness::Unsigned)));
		assert!(var_type("const volatile int r;", "r").qualifiers.is_volatile());
	}

	#[test]
	fn declarators()
	{
		let t = var_type("int *p[4];", "p");
		match t.basetype
		{
		BaseType::Array(ref inner, ArraySize::Fixed(4)) => assert_eq!(**inner, Type::int().pointer_to()),
		_ => panic!("{:?}", t),
		}
		let t = var_type("int (*fp)(int, char);", "fp");
		match t.basetype
		{
		BaseType::Pointer(ref inner) => match inner.basetype
			{
			BaseType::Function(_, ref args) => assert_eq!(args.len(), 2),
			_ => panic!("{:?}", t),
			},
		_ => panic!("{:?}", t),
		}
	}

	#[test]
	fn typedef_names()
	{
		let (unit, diag) = parse_str("typedef unsigned char u8; u8 x; void f(void) { u8 y = 1; y = y * 2; }");
		assert!(diag.all().is_empty(), "{:?}", diag.all());
		assert!(unit.items.iter().any(|i| match i { Item::Typedef(n, _, _) => n == "u8", _ => false }));
		assert_eq!(unit.variables().next().map(|v| v.ty.to_string()), Some("unsigned char".to_owned()));
	}

	#[test]
	fn parameter_lists()
	{
		let (unit, _) = parse_str("int a(void); int b(); int c(int x, ...); int d(char *, int n);");
		let sig = |n: &str| unit.prototypes().find(|p| p.name == n).map(|p| p.sig.clone()).expect("proto");
		assert!(sig("a").params.is_empty() && !sig("a").unspecified_params);
		assert!(sig("b").unspecified_params);
		assert!(sig("c").is_variadic);
		let d = sig("d");
		assert_eq!(d.params[0].name, None);
		assert_eq!(d.params[1].name.as_ref().map(|s| &s[..]), Some("n"));
	}
}
