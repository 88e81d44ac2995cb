//! Top-level declarations and statements
use super::{ParseResult,Error};
use super::types::{BaseSpec,Declarator};
use super::extensions::DeclExtensions;
use crate::preproc::token::Token;
use crate::ast::{self,Span,Item,Block,Statement,StatementKind,ForInit,VarDecl,FunctionDecl,FunctionSig};
use crate::symbols::{Symbol,SymbolKind};
use crate::types::{Type,BaseType,StorageClass};

impl<'ast> super::ParseState<'ast>
{
	/// Handle the root of the AST
	pub fn parseroot(&mut self) -> ParseResult<()>
	{
		loop
		{
			let rv = match self.lex.get_token()?
				{
				Token::EOF => break,
				// Empty declarations (e.g. from a macro that expanded to nothing)
				Token::Semicolon => Ok( () ),
				Token::Rword_sfr => self.parse_sfr(),
				Token::Rword_sbit => self.parse_sbit(),
				Token::BraceClose => {
					self.report_syntax("unexpected `}` at file scope".to_owned());
					Ok( () )
					},
				t @ _ => {
					self.lex.put_back(t);
					self.do_definition()
					},
				};
			match rv
			{
			Ok(()) => {},
			Err(Error::SyntaxError(msg)) => {
				self.report_syntax(msg);
				self.skip_statement(true)?;
				},
			Err(e) => return Err(e),
			}
		}
		self.end_of_unit();
		Ok( () )
	}

	/// Checks that need the whole file
	fn end_of_unit(&mut self)
	{
		for (name, span) in self.symbols.take_deferred_calls()
		{
			match self.symbols.lookup(&name)
			{
			// Defined later in the file
			Some(s) if s.kind == SymbolKind::Function => {},
			Some(_) => self.warning(format!("use of undeclared identifier `{}`", name), &span),
			None => self.warning(format!("implicit declaration of function `{}`", name), &span),
			}
		}

		let file = self.unit.file.clone();
		let mut undefined: Vec<(String,Span)> = self.symbols.globals()
			.filter(|s| s.kind == SymbolKind::Function && !s.defined)
			.filter(|s| s.storage != Some(StorageClass::Extern) && s.span.file == file)
			.map(|s| (s.name.clone(), s.span.clone()))
			.collect();
		undefined.sort_by(|a,b| a.1.lo.cmp(&b.1.lo));
		for (name, span) in undefined
		{
			self.warning(format!("function `{}` is declared but never defined", name), &span);
		}
	}

	/// Handle a top-level definition (function, variable, typedef, or prototype)
	fn do_definition(&mut self) -> ParseResult<()>
	{
		let start = self.lex.next_span()?;
		let mut lead = DeclExtensions::default();
		self.parse_decl_extensions(&mut lead)?;

		// 1. Get base type
		let base = match self.get_base_type_opt()?
			{
			Some(b) => b,
			None => return self.do_implicit_int(start, lead),
			};
		debug!("do_definition: base={:?}", base);
		if peek_token!(self.lex, Token::Semicolon) {
			self.warning("declaration does not declare anything".to_owned(), &start);
			return Ok( () );
		}

		// 2. Get extended type and identifier
		let d = self.get_full_type(base.ty.clone())?;
		let mut ext = lead.clone();
		self.parse_decl_extensions(&mut ext)?;

		// 3. Function bodies
		if !base.is_typedef && d.sig.is_some() && peek_token_nc!(self.lex, Token::BraceOpen) {
			return self.parse_function_def(start, base.storage, d, ext);
		}

		for item in self.parse_variable_list(&start, &base, &lead, d, ext)?
		{
			debug!("do_definition: {:?}", item);
			self.unit.items.push(item);
		}
		Ok( () )
	}

	/// `name(...) { ... }` with no type - old-style implicit `int`
	fn do_implicit_int(&mut self, start: Span, lead: DeclExtensions) -> ParseResult<()>
	{
		if !peek_token_nc!(self.lex, Token::Ident(_)) {
			let t = self.lex.get_token()?;
			syntax_error!("expected a declaration, found `{}`", t);
		}
		let d = self.get_full_type(Type::int())?;
		let mut ext = lead;
		self.parse_decl_extensions(&mut ext)?;
		if d.sig.is_none() || !peek_token_nc!(self.lex, Token::BraceOpen) {
			syntax_error!("unknown type name `{}`", d.name);
		}
		self.warning(format!("return type of `{}` defaults to `int`", d.name), &d.name_span);
		self.parse_function_def(start, None, d, ext)
	}

	/// Comma-separated declarators, up to and including the `;`
	///
	/// `first` is the already-parsed first declarator (and the extensions written after it).
	fn parse_variable_list(&mut self, start: &Span, base: &BaseSpec, lead: &DeclExtensions, first: Declarator, first_ext: DeclExtensions) -> ParseResult<Vec<Item>>
	{
		let mut rv = Vec::new();
		let mut d = first;
		let mut ext = first_ext;
		loop
		{
			rv.push( self.declare_item(start, base, d, ext)? );
			if !peek_token!(self.lex, Token::Comma) {
				break;
			}
			d = self.get_full_type(base.ty.clone())?;
			ext = lead.clone();
			self.parse_decl_extensions(&mut ext)?;
		}
		self.expect_semicolon()?;
		Ok(rv)
	}

	/// A single declarator: typedef, function prototype, or variable (with optional initialiser)
	fn declare_item(&mut self, start: &Span, base: &BaseSpec, d: Declarator, ext: DeclExtensions) -> ParseResult<Item>
	{
		if d.name == "" {
			syntax_error!("expected an identifier in declaration");
		}

		if base.is_typedef {
			if peek_token_nc!(self.lex, Token::Assign) {
				syntax_error!("typedef `{}` cannot be initialised", d.name);
			}
			let span = self.span_from(start);
			self.declare( Symbol::new(d.name.clone(), SymbolKind::Typedef, d.ty.clone(), span.clone()) );
			return Ok( Item::Typedef(d.name, d.ty, span) );
		}

		if let Some(sig) = d.sig {
			let mut decl = FunctionDecl {
				name: d.name,
				sig: sig,
				storage: base.storage,
				interrupt: ext.interrupt,
				attributes: ext.attributes,
				span: self.span_from(start),
				};
			self.declare_function(&mut decl, false);
			return Ok( Item::FunctionDecl(decl) );
		}

		if let Some(ref sp) = ext.interrupt_span {
			self.semantic_error(format!("interrupt marker on `{}`, which is not a function", d.name), sp);
		}
		if d.ty.is_void() {
			self.semantic_error(format!("variable `{}` declared void", d.name), &d.name_span);
		}
		let init = if peek_token!(self.lex, Token::Assign) {
				Some( self.parse_initialiser()? )
			}
			else {
				None
			};
		let span = self.span_from(start);

		let mut sym = Symbol::new(d.name.clone(), SymbolKind::Variable, d.ty.clone(), d.name_span);
		sym.storage = base.storage;
		sym.defined = init.is_some();
		self.declare(sym);
		Ok( Item::VarDecl(VarDecl {
			name: d.name,
			ty: d.ty,
			storage: base.storage,
			init: init,
			span: span,
			}) )
	}

	/// Add a symbol to the current scope, reporting conflicting redeclarations
	pub fn declare(&mut self, mut sym: Symbol)
	{
		let at_file_scope = self.symbols.depth() == 0;
		let conflict = match self.symbols.lookup_local(&sym.name)
			{
			None => None,
			Some(prev) => {
				let is_extern = |s: &Symbol| s.storage == Some(StorageClass::Extern);
				let compatible = match (prev.kind, sym.kind)
					{
					(SymbolKind::Typedef, SymbolKind::Typedef) => prev.ty == sym.ty,
					(SymbolKind::Variable, SymbolKind::Variable) =>
						prev.ty == sym.ty
						&& (at_file_scope || (is_extern(prev) && is_extern(&sym)))
						&& !(prev.defined && sym.defined),
					_ => false,
					};
				if compatible {
					sym.defined |= prev.defined;
					None
				}
				else {
					Some(prev.span.clone())
				}
				},
			};
		if let Some(prev_span) = conflict {
			let span = sym.span.clone();
			self.semantic_error(format!("redeclaration of `{}` (previous declaration at {})", sym.name, prev_span), &span);
		}
		self.symbols.insert(sym);
	}

	/// Record a function declaration/definition, returning the span of an earlier prototype
	///
	/// A signature that disagrees with an earlier declaration is a warning, and the newer one is kept.
	/// Interrupt markers and attributes only written on an earlier declaration are carried over to `decl`.
	fn declare_function(&mut self, decl: &mut FunctionDecl, is_definition: bool) -> Option<Span>
	{
		let mut prototype = None;
		let mut defined = is_definition;
		match self.symbols.lookup_local(&decl.name).cloned()
		{
		None => {},
		Some(ref prev) if prev.kind == SymbolKind::Function => {
			if is_definition && prev.defined {
				self.semantic_error(format!("redefinition of `{}` (previous definition at {})", decl.name, prev.span), &decl.span);
			}
			else if let Some(ref prev_sig) = prev.sig {
				if !prev_sig.matches(&decl.sig) {
					self.warning(format!("conflicting types for `{}`: `{}` here, `{}` at {}",
						decl.name, sig_type(&decl.sig), sig_type(prev_sig), prev.span), &decl.span);
				}
			}
			if !prev.defined {
				prototype = Some(prev.span.clone());
			}
			defined |= prev.defined;

			let inherited = match (&decl.interrupt, &prev.interrupt)
				{
				(None, Some(p)) => Some(p.clone()),
				(Some(a), Some(p)) if a != p => {
					self.warning(format!("conflicting interrupt markers for `{}` (previous declaration at {})", decl.name, prev.span), &decl.span);
					None
					},
				_ => None,
				};
			if inherited.is_some() {
				decl.interrupt = inherited;
			}
			for a in &prev.attributes
			{
				if !decl.attributes.contains(a) {
					decl.attributes.push(a.clone());
				}
			}
			},
		Some(prev) => {
			self.semantic_error(format!("`{}` redeclared as a function (previous declaration at {})", decl.name, prev.span), &decl.span);
			},
		}

		let mut sym = Symbol::new(decl.name.clone(), SymbolKind::Function, sig_type(&decl.sig), decl.span.clone());
		sym.sig = Some(decl.sig.clone());
		sym.storage = decl.storage;
		sym.defined = defined;
		sym.interrupt = decl.interrupt.clone();
		sym.attributes = decl.attributes.clone();
		self.symbols.insert(sym);
		prototype
	}

	/// Function body (next token is the `{`)
	fn parse_function_def(&mut self, start: Span, storage: Option<StorageClass>, d: Declarator, ext: DeclExtensions) -> ParseResult<()>
	{
		let sig = match d.sig
			{
			Some(s) => s,
			None => syntax_error!("`{}` is not a function", d.name),
			};
		let mut decl = FunctionDecl {
			name: d.name,
			sig: sig,
			storage: storage,
			interrupt: ext.interrupt,
			attributes: ext.attributes,
			span: self.span_from(&start),
			};
		if let Some(ref sp) = ext.interrupt_span {
			if !decl.sig.params.is_empty() || !decl.sig.ret.is_void() {
				self.warning(format!("interrupt handler `{}` should take no arguments and return void", decl.name), sp);
			}
		}
		let prototype = self.declare_function(&mut decl, true);
		info!("Function {} ({})", decl.name, sig_type(&decl.sig));

		syntax_assert!(self.lex => Token::BraceOpen);
		let open = self.lex.last_span();
		self.symbols.push_scope();
		for p in &decl.sig.params
		{
			if let Some(ref name) = p.name {
				let mut sym = Symbol::new(name.clone(), SymbolKind::Variable, p.ty.clone(), decl.span.clone());
				sym.defined = true;
				self.declare(sym);
			}
		}
		let body = self.parse_block(&open);
		self.symbols.pop_scope();
		let body = body?;

		let span = self.span_from(&start);
		self.unit.items.push(Item::FunctionDef(ast::FunctionDef {
			decl: decl,
			body: body,
			prototype: prototype,
			span: span,
			}));
		Ok( () )
	}

	/// Parse a brace-enclosed block (the opening brace is already consumed)
	///
	/// A syntax error inside a statement is reported, and parsing continues with the next statement.
	pub fn parse_block(&mut self, open: &Span) -> ParseResult<Block>
	{
		let mut statements = Vec::new();
		loop
		{
			match self.lex.get_token()?
			{
			Token::BraceClose => return Ok(statements),
			Token::EOF => return Err(Error::Unbalanced(open.clone(), self.lex.last_span())),
			t @ _ => {
				self.lex.put_back(t);
				match self.parse_block_line()
				{
				Ok(Some(s)) => statements.push(s),
				Ok(None) => {},
				Err(Error::SyntaxError(msg)) => {
					self.report_syntax(msg);
					self.skip_statement(false)?;
					},
				Err(e) => return Err(e),
				}
				},
			}
		}
	}

	/// A nested block with its own scope (the opening brace is already consumed)
	fn parse_scoped_block(&mut self) -> ParseResult<Block>
	{
		let open = self.lex.last_span();
		self.symbols.push_scope();
		let rv = self.parse_block(&open);
		self.symbols.pop_scope();
		rv
	}

	/// Parse a block, or a single statement
	fn parse_opt_block(&mut self) -> ParseResult<Block>
	{
		if peek_token!(self.lex, Token::BraceOpen) {
			self.parse_scoped_block()
		}
		else {
			Ok( self.parse_block_line()?.into_iter().collect() )
		}
	}

	/// `( expr )`
	fn parse_condition(&mut self) -> ParseResult<ast::Node>
	{
		syntax_assert!(self.lex => Token::ParenOpen);
		let rv = self.parse_expr()?;
		syntax_assert!(self.lex => Token::ParenClose);
		Ok(rv)
	}

	/// Parse a single statement
	///
	/// Returns `None` for declarations that don't produce a statement (local typedefs and prototypes)
	fn parse_block_line(&mut self) -> ParseResult<Option<Statement>>
	{
		let start = self.lex.next_span()?;
		let kind = match self.lex.get_token()?
			{
			Token::Semicolon => StatementKind::Empty,
			Token::BraceOpen => StatementKind::Block( self.parse_scoped_block()? ),
			Token::Rword_return => {
				let val = if peek_token_nc!(self.lex, Token::Semicolon | Token::BraceClose) {
						None
					}
					else {
						Some( self.parse_expr()? )
					};
				self.expect_semicolon()?;
				StatementKind::Return(val)
				},
			Token::Rword_break => {
				self.expect_semicolon()?;
				StatementKind::Break
				},
			Token::Rword_continue => {
				self.expect_semicolon()?;
				StatementKind::Continue
				},
			Token::Rword_while => {
				let cond = self.parse_condition()?;
				let body = self.parse_opt_block()?;
				StatementKind::WhileLoop { cond: cond, body: body }
				},
			Token::Rword_do => {
				let body = self.parse_opt_block()?;
				syntax_assert!(self.lex => Token::Rword_while);
				let cond = self.parse_condition()?;
				self.expect_semicolon()?;
				StatementKind::DoWhileLoop { body: body, cond: cond }
				},
			Token::Rword_for => {
				syntax_assert!(self.lex => Token::ParenOpen);
				self.symbols.push_scope();
				let rv = self.parse_for_loop();
				self.symbols.pop_scope();
				rv?
				},
			Token::Rword_if => {
				let cond = self.parse_condition()?;
				let true_arm = self.parse_opt_block()?;
				// `else` binds to the innermost `if`
				let else_arm = if peek_token!(self.lex, Token::Rword_else) {
						Some( self.parse_opt_block()? )
					}
					else {
						None
					};
				StatementKind::IfStatement { cond: cond, true_arm: true_arm, else_arm: else_arm }
				},
			Token::Rword_switch => {
				let val = self.parse_condition()?;
				let body = self.parse_opt_block()?;
				StatementKind::Switch(val, body)
				},
			Token::Rword_case => {
				let val = self.parse_expr_1()?;
				syntax_assert!(self.lex => Token::Colon);
				StatementKind::Case(val)
				},
			Token::Rword_default => {
				syntax_assert!(self.lex => Token::Colon);
				StatementKind::Default
				},
			Token::Rword_else => syntax_error!("`else` without a matching `if`"),
			t @ Token::Rword_sfr | t @ Token::Rword_sbit => syntax_error!("`{}` is only allowed at file scope", t),
			t @ _ => {
				self.lex.put_back(t);
				match self.try_parse_local_var()?
				{
				Some(vars) => {
					if vars.is_empty() {
						return Ok(None);
					}
					StatementKind::VarDef(vars)
					},
				None => {
					let e = self.parse_expr()?;
					self.expect_semicolon()?;
					StatementKind::Expr(e)
					},
				}
				},
			};
		Ok(Some(Statement {
			kind: kind,
			span: self.span_from(&start),
			}))
	}

	/// `for` header and body (the `(` is consumed, and the header has its own scope)
	fn parse_for_loop(&mut self) -> ParseResult<StatementKind>
	{
		let init = if peek_token!(self.lex, Token::Semicolon) {
				None
			}
			else if let Some(vars) = self.try_parse_local_var()? {
				Some(ForInit::Definition(vars))
			}
			else {
				let e = self.parse_expr()?;
				syntax_assert!(self.lex => Token::Semicolon);
				Some(ForInit::Expr(e))
			};
		let cond = if peek_token!(self.lex, Token::Semicolon) {
				None
			}
			else {
				let e = self.parse_expr()?;
				syntax_assert!(self.lex => Token::Semicolon);
				Some(e)
			};
		let inc = if peek_token!(self.lex, Token::ParenClose) {
				None
			}
			else {
				let e = self.parse_expr()?;
				syntax_assert!(self.lex => Token::ParenClose);
				Some(e)
			};
		let body = self.parse_opt_block()?;
		Ok(StatementKind::ForLoop { init: init, cond: cond, inc: inc, body: body })
	}

	/// Local declaration, if the statement starts with a type
	fn try_parse_local_var(&mut self) -> ParseResult<Option<Vec<VarDecl>>>
	{
		let start = self.lex.next_span()?;
		let mut lead = DeclExtensions::default();
		self.parse_decl_extensions(&mut lead)?;
		let base = match self.get_base_type_opt()?
			{
			Some(b) => b,
			None => {
				if lead.interrupt.is_some() || !lead.attributes.is_empty() {
					let t = self.lex.get_token()?;
					syntax_error!("expected a declaration after `__attribute__`, found `{}`", t);
				}
				return Ok(None)
				},
			};
		if peek_token!(self.lex, Token::Semicolon) {
			self.warning("declaration does not declare anything".to_owned(), &start);
			return Ok(Some(Vec::new()));
		}
		let d = self.get_full_type(base.ty.clone())?;
		let mut ext = lead.clone();
		self.parse_decl_extensions(&mut ext)?;
		if d.sig.is_some() && peek_token_nc!(self.lex, Token::BraceOpen) {
			syntax_error!("function `{}` defined inside another function", d.name);
		}
		let vars = self.parse_variable_list(&start, &base, &lead, d, ext)?
			.into_iter()
			.filter_map(|i| match i { Item::VarDecl(v) => Some(v), _ => None })
			.collect();
		Ok(Some(vars))
	}
}

/// Type of a function with this signature
fn sig_type(sig: &FunctionSig) -> Type
{
	Type::new_bare( BaseType::Function(Box::new(sig.ret.clone()), sig.params.iter().map(|p| p.ty.clone()).collect()) )
}

#[cfg(test)]
mod tests
{
	use crate::ast::{Item,StatementKind,NodeKind,ForInit,InterruptAttribute,InterruptVector};
	use crate::diagnostics::{Category,Severity};
	use crate::symbols::SymbolKind;
	use crate::test_util::parse_str;

	#[test]
	fn prototype_and_definition_unify()
	{
		let (unit, diag) = parse_str("int sum(int a, int b);\nint sum(int a, int b) {\n return a + b;\n}\n");
		assert!(diag.all().is_empty(), "{:?}", diag.all());
		let f = unit.function("sum").expect("sum");
		assert!(f.prototype.is_some());
		assert_eq!(f.decl.sig.params.len(), 2);
	}

	#[test]
	fn prototype_mismatch_is_a_warning()
	{
		let (unit, diag) = parse_str("int f(int a);\nint f(int a, int b) { return a; }\n");
		let f = unit.function("f").expect("f");
		// Definition wins
		assert_eq!(f.decl.sig.params.len(), 2);
		assert_eq!(diag.all().len(), 1);
		assert_eq!(diag.all()[0].severity, Severity::Warning);
		assert_eq!(diag.all()[0].line, 2);
	}

	#[test]
	fn definition_keeps_prototype_interrupt()
	{
		for src in &["__attribute__((interrupt(1))) void isr(void);\nvoid isr(void) { }\n", "void isr(void) interrupt 1;\nvoid isr(void) { }\n"]
		{
			let (unit, diag) = parse_str(src);
			assert!(diag.all().is_empty(), "{}: {:?}", src, diag.all());
			let f = unit.function("isr").expect("isr");
			assert!(f.prototype.is_some());
			assert_eq!(f.decl.interrupt, Some(InterruptAttribute { vector: Some(InterruptVector::Number(1)), register_bank: None }));
		}

		let (unit, diag) = parse_str("void isr(void) interrupt 2 using 1 __attribute__((naked));\nvoid isr(void) { }\n");
		assert!(diag.all().is_empty(), "{:?}", diag.all());
		let f = unit.function("isr").expect("isr");
		assert_eq!(f.decl.interrupt, Some(InterruptAttribute { vector: Some(InterruptVector::Number(2)), register_bank: Some(1) }));
		assert_eq!(f.decl.attributes.iter().map(|a| &a.name[..]).collect::<Vec<_>>(), vec!["naked"]);
	}

	#[test]
	fn conflicting_interrupt_on_definition()
	{
		let (unit, diag) = parse_str("void isr(void) interrupt 2;\nvoid isr(void) interrupt 3 { }\n");
		assert_eq!(diag.all().len(), 1, "{:?}", diag.all());
		assert_eq!(diag.all()[0].severity, Severity::Warning);
		assert_eq!(diag.all()[0].line, 2);
		// The definition's own marker is kept
		let f = unit.function("isr").expect("isr");
		assert_eq!(f.decl.interrupt.as_ref().and_then(|i| i.vector.clone()), Some(InterruptVector::Number(3)));
	}

	#[test]
	fn undefined_prototype()
	{
		let (_, diag) = parse_str("int g(void);\nextern int h(void);\nint main(void) { return g() + h(); }");
		assert_eq!(diag.all().len(), 1, "{:?}", diag.all());
		assert!(diag.all()[0].message.contains("`g`"));
	}

	#[test]
	fn forward_calls_and_undeclared_names()
	{
		let (unit, diag) = parse_str("int main(void) { later(); nowhere(); return x; }\nvoid later(void) { }\n");
		let msgs: Vec<_> = diag.all().iter().map(|d| d.message.clone()).collect();
		assert_eq!(msgs.len(), 2, "{:?}", msgs);
		assert!(msgs[0].contains("undeclared identifier `x`"));
		assert!(msgs[1].contains("implicit declaration of function `nowhere`"));
		assert_eq!(unit.functions().count(), 2);
	}

	#[test]
	fn redeclaration()
	{
		let (_, diag) = parse_str("int x = 1;\nint x = 2;\nint y;\nint y;\nvoid f(void) { int z; char z; }");
		let errs: Vec<_> = diag.all().iter().filter(|d| d.category == Category::Semantic).collect();
		assert_eq!(errs.len(), 2, "{:?}", errs);
		assert_eq!(errs[0].line, 2);
		assert_eq!(errs[1].line, 5);
		assert!(!diag.has_fatal());
	}

	#[test]
	fn bindings()
	{
		let (unit, _) = parse_str("int g;\nvoid f(int p) { int l = 0; { l = g + p; } }");
		let f = unit.function("f").expect("f");
		let inner = match f.body[1].kind { StatementKind::Block(ref b) => b, ref k => panic!("{:?}", k) };
		let e = match inner[0].kind { StatementKind::Expr(ref e) => e, ref k => panic!("{:?}", k) };
		let mut found = Vec::new();
		fn walk(n: &crate::ast::Node, out: &mut Vec<(String, usize)>) {
			if let NodeKind::Identifier(ref name, Some(b)) = n.kind {
				assert_eq!(b.kind, SymbolKind::Variable);
				out.push((name.clone(), b.scope_depth));
			}
			for c in n.children() {
				walk(c, out);
			}
		}
		walk(e, &mut found);
		assert_eq!(found, vec![("l".to_owned(), 1), ("g".to_owned(), 0), ("p".to_owned(), 1)]);
	}

	#[test]
	fn statements()
	{
		let src = "int main(void) {
			int i, n = 0;
			for (i = 0; i < 10; i++) { n += i; }
			for (int j = 0; ; ) break;
			do { n--; } while (n > 0);
			switch (n) { case 1: n = 2; break; default: ; }
			while (0) continue;
			return n;
		}";
		let (unit, diag) = parse_str(src);
		assert!(diag.all().is_empty(), "{:?}", diag.all());
		let body = &unit.function("main").expect("main").body;
		assert_eq!(body.len(), 7);
		match body[0].kind { StatementKind::VarDef(ref v) => assert_eq!(v.len(), 2), ref k => panic!("{:?}", k) }
		match body[2].kind
		{
		StatementKind::ForLoop { init: Some(ForInit::Definition(_)), cond: None, inc: None, .. } => {},
		ref k => panic!("{:?}", k),
		}
		match body[4].kind { StatementKind::Switch(_, ref b) => assert_eq!(b.len(), 5), ref k => panic!("{:?}", k) }
	}

	#[test]
	fn stray_tokens_recover()
	{
		let (unit, diag) = parse_str("int a;\n}\nint b = ;\nint c;\n");
		assert_eq!(diag.count(Category::Syntax), 2, "{:?}", diag.all());
		let names: Vec<_> = unit.items.iter().filter_map(|i| match i { Item::VarDecl(v) => Some(v.name.clone()), _ => None }).collect();
		assert_eq!(names, vec!["a".to_owned(), "c".to_owned()]);
	}

	#[test]
	fn unbalanced_braces_are_fatal()
	{
		let (unit, diag) = parse_str("int a;\nvoid f(void) {\n if (a) {\n a = 1;\n}\n");
		assert!(diag.has_fatal());
		assert!(unit.is_partial);
		assert_eq!(unit.items.len(), 1);
		assert_eq!(diag.all().last().map(|d| d.category), Some(Category::Syntax));
	}

	#[test]
	fn implicit_int()
	{
		let (unit, diag) = parse_str("main() { return 0; }");
		assert_eq!(unit.functions().count(), 1);
		assert_eq!(diag.all().len(), 1);
		assert_eq!(diag.all()[0].severity, Severity::Warning);
	}
}
