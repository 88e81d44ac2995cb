//! Expression parsing
use super::ParseResult;
use crate::preproc::token::Token;
use crate::ast::{Node,NodeKind,BinOp,UniOp,Literal};

macro_rules! node {
	($span:expr, $ty:ident $($args:tt)*) => {
		Node::new( NodeKind::$ty $($args)*, $span )
		};
}

/// Binding power and operator for binary (non-assignment) operators, lowest first
fn binop_info(tok: &Token) -> Option<(u8, BinOp)>
{
	Some(match tok
	{
	Token::DoublePipe      => (1, BinOp::LogicOr),
	Token::DoubleAmpersand => (2, BinOp::LogicAnd),
	Token::Pipe      => (3, BinOp::BitOr),
	Token::Caret     => (4, BinOp::BitXor),
	Token::Ampersand => (5, BinOp::BitAnd),
	Token::Equality  => (6, BinOp::CmpEqu),
	Token::NotEquals => (6, BinOp::CmpNEqu),
	Token::Lt  => (7, BinOp::CmpLt),
	Token::LtE => (7, BinOp::CmpLtE),
	Token::Gt  => (7, BinOp::CmpGt),
	Token::GtE => (7, BinOp::CmpGtE),
	Token::ShiftLeft  => (8, BinOp::ShiftLeft),
	Token::ShiftRight => (8, BinOp::ShiftRight),
	Token::Plus  => (9, BinOp::Add),
	Token::Minus => (9, BinOp::Sub),
	Token::Star    => (10, BinOp::Mul),
	Token::Slash   => (10, BinOp::Div),
	Token::Percent => (10, BinOp::Mod),
	_ => return None,
	})
}

impl<'ast> super::ParseState<'ast>
{
	/// Parse a full expression (including the comma operator)
	pub fn parse_expr(&mut self) -> ParseResult<Node>
	{
		let first = self.parse_expr_0()?;
		if !peek_token_nc!(self.lex, Token::Comma) {
			return Ok(first);
		}
		let mut list = vec![first];
		while peek_token!(self.lex, Token::Comma)
		{
			list.push( self.parse_expr_0()? );
		}
		let span = list[0].span.to(&list[list.len()-1].span);
		Ok( node!(span, Comma(list)) )
	}

	/// Variable initialiser: an assignment expression, or a braced list
	pub fn parse_initialiser(&mut self) -> ParseResult<Node>
	{
		if !peek_token!(self.lex, Token::BraceOpen) {
			return self.parse_expr_0();
		}
		let start = self.lex.last_span();
		let mut items = Vec::new();
		loop
		{
			if peek_token!(self.lex, Token::BraceClose) {
				break;
			}
			items.push( self.parse_initialiser()? );
			if !peek_token!(self.lex, Token::Comma) {
				syntax_assert!(self.lex => Token::BraceClose);
				break;
			}
		}
		Ok( node!(self.span_from(&start), ListLiteral(items)) )
	}

	/// Assignment (right associative)
	pub fn parse_expr_0(&mut self) -> ParseResult<Node>
	{
		let lhs = self.parse_expr_1()?;
		let op = match self.lex.get_token()?
			{
			Token::Assign => None,
			Token::AssignAdd => Some(BinOp::Add),
			Token::AssignSub => Some(BinOp::Sub),
			Token::AssignMul => Some(BinOp::Mul),
			Token::AssignDiv => Some(BinOp::Div),
			Token::AssignMod => Some(BinOp::Mod),
			Token::AssignBitOr  => Some(BinOp::BitOr),
			Token::AssignBitAnd => Some(BinOp::BitAnd),
			Token::AssignBitXor => Some(BinOp::BitXor),
			Token::AssignShiftLeft  => Some(BinOp::ShiftLeft),
			Token::AssignShiftRight => Some(BinOp::ShiftRight),
			t @ _ => {
				self.lex.put_back(t);
				return Ok(lhs);
				},
			};
		let rhs = self.parse_expr_0()?;
		let span = lhs.span.to(&rhs.span);
		Ok(match op
		{
		None => node!(span, Assignment(Box::new(lhs), Box::new(rhs))),
		Some(op) => node!(span, CompoundAssignment(op, Box::new(lhs), Box::new(rhs))),
		})
	}

	/// Ternary (right associative)
	pub fn parse_expr_1(&mut self) -> ParseResult<Node>
	{
		let cond = self.parse_expr_binop(1)?;
		if !peek_token!(self.lex, Token::QuestionMark) {
			return Ok(cond);
		}
		let true_val = self.parse_expr_0()?;
		syntax_assert!(self.lex => Token::Colon);
		let false_val = self.parse_expr_1()?;
		let span = cond.span.to(&false_val.span);
		Ok( node!(span, Ternary(Box::new(cond), Box::new(true_val), Box::new(false_val))) )
	}

	/// Binary operators from `||` down to `*`, by precedence climbing
	fn parse_expr_binop(&mut self, min_prec: u8) -> ParseResult<Node>
	{
		let mut lhs = self.parse_expr_unary()?;
		loop
		{
			let tok = self.lex.get_token()?;
			match binop_info(&tok)
			{
			Some((prec, op)) if prec >= min_prec => {
				// All left associative
				let rhs = self.parse_expr_binop(prec + 1)?;
				let span = lhs.span.to(&rhs.span);
				lhs = node!(span, BinaryOp(op, Box::new(lhs), Box::new(rhs)));
				},
			_ => {
				self.lex.put_back(tok);
				return Ok(lhs);
				},
			}
		}
	}

	/// Unary prefix operators (and sizeof)
	fn parse_expr_unary(&mut self) -> ParseResult<Node>
	{
		let op = match self.lex.get_token()?
			{
			Token::Minus => UniOp::Neg,
			Token::Plus => UniOp::Plus,
			Token::Tilde => UniOp::BitNot,
			Token::Exclamation => UniOp::LogicNot,
			Token::Star => UniOp::Deref,
			Token::Ampersand => UniOp::Address,
			Token::DoublePlus => UniOp::PreInc,
			Token::DoubleMinus => UniOp::PreDec,
			Token::Rword_sizeof => {
				let start = self.lex.last_span();
				if peek_token!(self.lex, Token::ParenOpen) {
					if self.starts_type()? {
						let ty = self.get_type_name()?;
						syntax_assert!(self.lex => Token::ParenClose);
						return Ok( node!(self.span_from(&start), SizeofType(ty)) );
					}
					self.lex.put_back(Token::ParenOpen);
				}
				let inner = self.parse_expr_unary()?;
				let span = start.to(&inner.span);
				return Ok( node!(span, SizeofExpr(Box::new(inner))) );
				},
			t @ _ => {
				self.lex.put_back(t);
				return self.parse_expr_member();
				},
			};
		let start = self.lex.last_span();
		let inner = self.parse_expr_unary()?;
		let span = start.to(&inner.span);
		Ok( node!(span, UnaryOp(op, Box::new(inner))) )
	}

	/// Postfix operators: calls, indexing, member access, `++`/`--`
	fn parse_expr_member(&mut self) -> ParseResult<Node>
	{
		let mut rv = self.parse_expr_p()?;
		loop
		{
			rv = match self.lex.get_token()?
				{
				Token::ParenOpen => {
					let mut args = Vec::new();
					if !peek_token!(self.lex, Token::ParenClose) {
						loop
						{
							args.push( self.parse_expr_0()? );
							if !peek_token!(self.lex, Token::Comma) {
								break;
							}
						}
						syntax_assert!(self.lex => Token::ParenClose);
					}
					let span = self.span_from(&rv.span);
					node!(span, Call(Box::new(rv), args))
					},
				Token::SquareOpen => {
					let idx = self.parse_expr()?;
					syntax_assert!(self.lex => Token::SquareClose);
					let span = self.span_from(&rv.span);
					node!(span, Index(Box::new(rv), Box::new(idx)))
					},
				Token::Period => {
					let name = syntax_assert!(self.lex.get_token()?, Token::Ident(n) => n);
					let span = self.span_from(&rv.span);
					node!(span, Member(Box::new(rv), name))
					},
				Token::DerefMember => {
					let name = syntax_assert!(self.lex.get_token()?, Token::Ident(n) => n);
					let span = self.span_from(&rv.span);
					node!(span, DerefMember(Box::new(rv), name))
					},
				Token::DoublePlus => {
					let span = self.span_from(&rv.span);
					node!(span, UnaryOp(UniOp::PostInc, Box::new(rv)))
					},
				Token::DoubleMinus => {
					let span = self.span_from(&rv.span);
					node!(span, UnaryOp(UniOp::PostDec, Box::new(rv)))
					},
				t @ _ => {
					self.lex.put_back(t);
					return Ok(rv);
					},
				};
		}
	}

	/// Parentheses: a cast, or a grouped expression
	fn parse_expr_p(&mut self) -> ParseResult<Node>
	{
		if !peek_token!(self.lex, Token::ParenOpen) {
			return self.parse_expr_z();
		}
		let start = self.lex.last_span();
		if self.starts_type()? {
			let ty = self.get_type_name()?;
			syntax_assert!(self.lex => Token::ParenClose);
			let inner = self.parse_expr_unary()?;
			let span = start.to(&inner.span);
			Ok( node!(span, Cast(ty, Box::new(inner))) )
		}
		else {
			let mut rv = self.parse_expr()?;
			syntax_assert!(self.lex => Token::ParenClose);
			// The group's span includes the parentheses
			rv.span = self.span_from(&start);
			Ok(rv)
		}
	}

	/// Leaf nodes
	fn parse_expr_z(&mut self) -> ParseResult<Node>
	{
		let kind = match self.lex.get_token()?
			{
			Token::Integer(v, cls, _) => NodeKind::Literal(Literal::Integer(v, cls)),
			Token::Float(v, cls, _) => NodeKind::Literal(Literal::Float(v, cls)),
			Token::Character(v, _) => NodeKind::Literal(Literal::Character(v)),
			Token::String(s) => {
				let start = self.lex.last_span();
				let mut val = s;
				// Adjacent string literals are concatenated
				loop
				{
					match self.lex.get_token()?
					{
					Token::String(s) => val.push_str(&s),
					t @ _ => {
						self.lex.put_back(t);
						break;
						},
					}
				}
				return Ok( node!(self.span_from(&start), Literal(Literal::String(val))) );
				},
			Token::Ident(name) => {
				let span = self.lex.last_span();
				let binding = self.symbols.binding(&name);
				if binding.is_none() {
					if peek_token_nc!(self.lex, Token::ParenOpen) {
						// Might be declared later in the file
						self.symbols.defer_call(name.clone(), span.clone());
					}
					else {
						self.warning(format!("use of undeclared identifier `{}`", name), &span);
					}
				}
				return Ok( node!(span, Identifier(name, binding)) );
				},
			t @ _ => {
				if t.is_statement_boundary() {
					self.lex.put_back(t.clone());
					syntax_error!("expected an expression before `{}`", t);
				}
				syntax_error!("unexpected `{}` in expression", t)
				},
			};
		Ok( Node::new(kind, self.lex.last_span()) )
	}
}

/// Fold an integer constant expression
pub fn const_eval(node: &Node) -> Option<i64>
{
	Some(match node.kind
	{
	NodeKind::Literal(Literal::Integer(v, _)) => v as i64,
	NodeKind::Literal(Literal::Character(v)) => v as i64,
	NodeKind::Cast(_, ref v) => const_eval(v)?,
	NodeKind::UnaryOp(op, ref v) => {
		let v = const_eval(v)?;
		match op
		{
		UniOp::Neg => v.wrapping_neg(),
		UniOp::Plus => v,
		UniOp::BitNot => !v,
		UniOp::LogicNot => (v == 0) as i64,
		_ => return None,
		}
		},
	NodeKind::Ternary(ref c, ref t, ref f) => if const_eval(c)? != 0 { const_eval(t)? } else { const_eval(f)? },
	NodeKind::BinaryOp(op, ref l, ref r) => {
		let l = const_eval(l)?;
		let r = const_eval(r)?;
		match op
		{
		BinOp::LogicOr  => (l != 0 || r != 0) as i64,
		BinOp::LogicAnd => (l != 0 && r != 0) as i64,
		BinOp::BitOr  => l | r,
		BinOp::BitXor => l ^ r,
		BinOp::BitAnd => l & r,
		BinOp::CmpEqu  => (l == r) as i64,
		BinOp::CmpNEqu => (l != r) as i64,
		BinOp::CmpLt  => (l <  r) as i64,
		BinOp::CmpLtE => (l <= r) as i64,
		BinOp::CmpGt  => (l >  r) as i64,
		BinOp::CmpGtE => (l >= r) as i64,
		BinOp::ShiftLeft  => l.wrapping_shl(r as u32),
		BinOp::ShiftRight => l.wrapping_shr(r as u32),
		BinOp::Add => l.wrapping_add(r),
		BinOp::Sub => l.wrapping_sub(r),
		BinOp::Mul => l.wrapping_mul(r),
		BinOp::Div => if r == 0 { return None } else { l.wrapping_div(r) },
		BinOp::Mod => if r == 0 { return None } else { l.wrapping_rem(r) },
		}
		},
	_ => return None,
	})
}

#[cfg(test)]
mod tests
{
	use super::const_eval;
	use crate::ast::{NodeKind,BinOp,UniOp};
	use crate::test_util::{expr,parse_str};

	fn same(a: &str, b: &str) {
		let (na, nb) = (expr(a), expr(b));
		assert!(na.same_shape(&nb), "`{}` => {:?}\n`{}` => {:?}", a, na, b, nb);
	}

	#[test]
	fn precedence()
	{
		same("a + b * c - d / a", "(a + (b * c)) - (d / a)");
		same("a & b | c ^ d", "(a & b) | (c ^ d)");
		same("a << 2 | b >> 1", "(a << 2) | (b >> 1)");
		same("a < b && c > d || a + b == c", "((a < b) && (c > d)) || ((a + b) == c)");
		same("a == b < c", "a == (b < c)");
		same("-a * b", "(-a) * b");
		same("!(a > b) && (c <= d || a != 0)", "(!(a > b)) && ((c <= d) || (a != 0))");
		same("*p++", "*(p++)");
		same("a = b = c", "a = (b = c)");
		same("a += b * c", "a += (b * c)");
	}

	#[test]
	fn left_associative()
	{
		let n = expr("a - b - c");
		match n.kind
		{
		NodeKind::BinaryOp(BinOp::Sub, ref l, _) => match l.kind
			{
			NodeKind::BinaryOp(BinOp::Sub, _, _) => {},
			_ => panic!("{:?}", n),
			},
		_ => panic!("{:?}", n),
		}
	}

	#[test]
	fn ternary()
	{
		same("a ? b : c ? d : e", "a ? b : (c ? d : e)");
		same("x = a > b ? c : d", "x = ((a > b) ? c : d)");
		same("(a < b) ? (c > d ? a : b) : (c < d ? c : d)", "(a < b) ? ((c > d) ? a : b) : ((c < d) ? c : d)");
	}

	#[test]
	fn postfix_and_casts()
	{
		match expr("(unsigned char)x + 1").kind
		{
		NodeKind::BinaryOp(BinOp::Add, ref l, _) => match l.kind
			{
			NodeKind::Cast(ref ty, _) => assert_eq!(ty.to_string(), "unsigned char"),
			_ => panic!("{:?}", l),
			},
		ref k => panic!("{:?}", k),
		}
		match expr("f(a, b)[2]").kind
		{
		NodeKind::Index(ref f, _) => match f.kind
			{
			NodeKind::Call(_, ref args) => assert_eq!(args.len(), 2),
			_ => panic!("{:?}", f),
			},
		ref k => panic!("{:?}", k),
		}
		match expr("sizeof(int) + sizeof x").kind
		{
		NodeKind::BinaryOp(BinOp::Add, ref l, ref r) => {
			assert!(match l.kind { NodeKind::SizeofType(_) => true, _ => false });
			assert!(match r.kind { NodeKind::SizeofExpr(_) => true, _ => false });
			},
		ref k => panic!("{:?}", k),
		}
		match expr("~P1").kind
		{
		NodeKind::UnaryOp(UniOp::BitNot, _) => {},
		ref k => panic!("{:?}", k),
		}
	}

	#[test]
	fn spans_nest()
	{
		fn check(n: &crate::ast::Node) {
			for c in n.children() {
				assert!(n.span.contains(&c.span), "{:?} not in {:?}", c.span, n.span);
				check(c);
			}
		}
		let n = expr("result = ((a + b) * c) / (d - (a * b))");
		check(&n);
		assert_eq!((n.span.lo.line, n.span.lo.column), (2, 1));
	}

	#[test]
	fn strings_concatenate()
	{
		let (unit, _) = parse_str("char *s = \"ab\" \"cd\";");
		let init = unit.variables().next().and_then(|v| v.init.clone()).expect("init");
		assert_eq!(init.kind, NodeKind::Literal(crate::ast::Literal::String("abcd".to_owned())));
	}

	#[test]
	fn constant_folding()
	{
		assert_eq!(const_eval(&expr("(1 << 4) + 2 * 3")), Some(22));
		assert_eq!(const_eval(&expr("-1 ? 0x10 : 0")), Some(16));
		assert_eq!(const_eval(&expr("1 / 0")), None);
		assert_eq!(const_eval(&expr("a + 1")), None);
	}
}
