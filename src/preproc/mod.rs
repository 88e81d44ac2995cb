//! C Pre-processor handling
//!
//! Sits between the lexer and the parser: handles directives, conditional compilation and macro expansion,
//! and hands keyword-mapped tokens to the parser through `get_token`/`put_back`.
use std::collections::{BTreeMap,HashMap,HashSet};
use std::path::{Path,PathBuf};
use std::sync::Arc;

use crate::ast::Span;
use crate::diagnostics::{Reporter,Category};
use crate::types::IntClass;

pub use self::token::{Token,Lexeme};
pub mod token;
pub mod lex;
pub mod if_expr;

/// Nested `#include` limit (counts the root file)
const MAX_INCLUDE_DEPTH: usize = 200;
/// Nested macro expansion limit
const MAX_MACRO_DEPTH: usize = 256;

/// Fatal pre-processor errors (processing of the file stops)
#[derive(Debug,thiserror::Error)]
pub enum Error
{
	#[error(transparent)]
	Lex(#[from] lex::Error),
	#[error("cannot read {}: {}", .1.display(), .2)]
	Io(Span, PathBuf, #[source] ::std::io::Error),
	/// Malformed or unmatched directive, `#error`
	#[error("{1}")]
	Directive(Span, String),
	#[error("invalid #if expression: {1}")]
	IfExpr(Span, #[source] if_expr::Error),
	#[error("unterminated conditional directive")]
	UnterminatedConditional(Span),
	#[error("unterminated invocation of macro `{1}`")]
	UnterminatedInvocation(Span, String),
	#[error("#include nested too deeply")]
	IncludeDepth(Span),
}
impl Error
{
	pub fn span(&self) -> &Span
	{
		match self
		{
		Error::Lex(e) => e.span(),
		Error::Io(s, ..) => s,
		Error::Directive(s, _) => s,
		Error::IfExpr(s, _) => s,
		Error::UnterminatedConditional(s) => s,
		Error::UnterminatedInvocation(s, _) => s,
		Error::IncludeDepth(s) => s,
		}
	}
	pub fn category(&self) -> Category
	{
		match self
		{
		Error::Lex(_) => Category::Lex,
		_ => Category::Preprocess,
		}
	}
}

pub type Result<T> = ::std::result::Result<T,Error>;

/// Initial macro definitions: name (optionally with a parameter list, e.g. `SQUARE(x)`) to replacement text
pub type DefineTable = BTreeMap<String,String>;

trait ReadExt: ::std::io::Read {
	fn chars(self) -> ::utf8reader::UTF8Reader<Self> where Self: Sized;
}
impl<T: ::std::io::Read> ReadExt for T {
	fn chars(self) -> ::utf8reader::UTF8Reader<Self> {
		::utf8reader::UTF8Reader::new(self)
	}
}

/// Read a source file, rejecting invalid UTF-8
pub fn read_source(path: &Path) -> ::std::io::Result<String>
{
	let f = ::std::fs::File::open(path)?;
	let mut rv = String::new();
	for ch in ::std::io::BufReader::new(f).chars()
	{
		match ch
		{
		Ok(c) => rv.push(c),
		Err(e) => return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidData, format!("{:?}", e))),
		}
	}
	Ok(rv)
}

/// Split a `NAME[=value]` command-line define (a bare name is defined to `1`)
pub fn split_define_arg(s: &str) -> (String, String)
{
	match s.find('=')
	{
	Some(i) => (s[..i].to_owned(), s[i+1..].to_owned()),
	None => (s.to_owned(), "1".to_owned()),
	}
}

#[derive(Debug,Clone,Default)]
pub struct Options
{
	pub include_paths: Vec<PathBuf>,
	/// Don't interpret directives or expand macros (tokens are only keyword-mapped)
	pub passthrough: bool,
}

#[derive(Debug,Clone)]
pub struct MacroDefinition
{
	arg_names: Option<MacroArgs>,
	expansion: Vec<Lexeme>,
	/// Location of the `#define`
	span: Span,
}
#[derive(Debug,Clone,PartialEq)]
struct MacroArgs
{
	names: Vec<String>,
	va_args_name: Option<String>,
}
impl MacroDefinition
{
	pub fn is_function_like(&self) -> bool
	{
		self.arg_names.is_some()
	}
	pub fn span(&self) -> &Span
	{
		&self.span
	}

	/// Same parameters and replacement list (whitespace separation counts, spelling of the whitespace doesn't)
	fn same_as(&self, other: &MacroDefinition) -> bool
	{
		self.arg_names == other.arg_names
			&& self.expansion.len() == other.expansion.len()
			&& self.expansion.iter().zip(other.expansion.iter()).enumerate()
				.all(|(i, (a,b))| a.token == b.token && (i == 0 || a.leading_space == b.leading_space))
	}

	/// Index of a parameter (the variadic parameter is after the named ones)
	fn param_index(&self, name: &str) -> Option<usize>
	{
		let args = self.arg_names.as_ref()?;
		if let Some(i) = args.names.iter().position(|n| n == name) {
			return Some(i);
		}
		match args.va_args_name
		{
		Some(ref v) if v == name => Some(args.names.len()),
		_ => None,
		}
	}
}

/// The set of macros known at some point during pre-processing
#[derive(Debug,Clone,Default)]
pub struct MacroTable
{
	defs: HashMap<String,MacroDefinition>,
}
impl MacroTable
{
	pub fn contains(&self, name: &str) -> bool
	{
		self.defs.contains_key(name)
	}
	pub fn get(&self, name: &str) -> Option<&MacroDefinition>
	{
		self.defs.get(name)
	}
}

#[derive(Debug)]
struct Conditional
{
	is_else: bool,
	has_run: bool,	// no else/elif should run
	is_active: bool,	// If the contents of this block should be emitted.
	opened_at: Span,
}
impl Conditional {
	fn new(is_active: bool, opened_at: Span) -> Conditional {
		Conditional {
			is_else: false,
			has_run: is_active,
			is_active,
			opened_at,
			}
	}
	/// Nested inside an inactive region: no branch can become active
	fn new_dead(opened_at: Span) -> Conditional {
		Conditional {
			is_else: false,
			has_run: true,
			is_active: false,
			opened_at,
			}
	}
}

pub struct Preproc
{
	/// Stack of active token sources
	lexers: TokenSourceStack,
	/// Saved tokens for `put_back`
	saved: Vec<Lexeme>,
	/// Location info for the most recently returned tokens (so `put_back` can restore it)
	history: Vec<(Span, bool, bool)>,
	/// Parsed macros
	macros: MacroTable,
	/// Stack of active `#if`/`#else` statements
	if_stack: Vec<Conditional>,

	/// A hashset used to implement `#pragma once`
	pragma_once_set: HashSet<PathBuf>,

	/// User-provided pre-processor options
	options: Options,
	diag: Reporter,
}

struct TokenSourceStack
{
	lexers: Vec<InnerLexer>,
	/// Raw lexemes pushed back while looking ahead (popped from the end)
	pending: Vec<Lexeme>,
	root_file: Arc<PathBuf>,
	/// Malformed literals seen by the file lexers, not yet reported
	problems: Vec<lex::Error>,
}
enum InnerLexer
{
	File(lex::Lexer),
	MacroExpansion(MacroExpansion),
	Tokens(TokenList),
}
struct MacroExpansion
{
	name: String,
	tokens: ::std::vec::IntoIter<Lexeme>,
}
struct TokenList
{
	tokens: ::std::vec::IntoIter<Lexeme>,
	/// Yields EOF when exhausted instead of falling through to the source below
	is_barrier: bool,
	end: Span,
}

macro_rules! directive_error {
	($span:expr, $($fmt:tt)+) => { return Err(Error::Directive($span.clone(), format!($($fmt)+))) };
}

impl Preproc
{
	/// Pre-process in-memory source text (`file` is only used for spans and relative includes)
	pub fn from_source(file: Arc<PathBuf>, source: &str, options: Options) -> Preproc
	{
		let lexer = lex::tokenize(file.clone(), source);
		Preproc::with_source(TokenSourceStack {
			lexers: vec![ InnerLexer::File(lexer) ],
			pending: Vec::new(),
			root_file: file,
			problems: Vec::new(),
			}, options)
	}
	/// Pre-process an already-lexed token sequence
	pub fn from_tokens(file: Arc<PathBuf>, tokens: Vec<Lexeme>, options: Options) -> Preproc
	{
		let end = match tokens.last()
			{
			Some(l) => Span::new(l.span.file.clone(), l.span.hi, l.span.hi),
			None => Span::file_start(file.clone()),
			};
		Preproc::with_source(TokenSourceStack {
			lexers: vec![ InnerLexer::Tokens(TokenList { tokens: tokens.into_iter(), is_barrier: false, end: end }) ],
			pending: Vec::new(),
			root_file: file,
			problems: Vec::new(),
			}, options)
	}
	fn with_source(lexers: TokenSourceStack, options: Options) -> Preproc
	{
		Preproc {
			lexers: lexers,
			saved: Vec::new(),
			history: Vec::new(),
			macros: Default::default(),
			if_stack: Default::default(),
			pragma_once_set: Default::default(),
			options: options,
			diag: Reporter::new(),
			}
	}

	/// Define a macro as if by `#define <key> <value>`
	pub fn parse_define_str(&mut self, key: &str, value: &str) -> Result<()>
	{
		let file = Arc::new(PathBuf::from("<command-line>"));
		let text = format!("{} {}", key, value);
		let mut lexer = lex::tokenize(file.clone(), &text);
		let mut line = Vec::new();
		for lx in lexer.by_ref()
		{
			line.push(lx?);
		}
		for e in lexer.take_problems()
		{
			self.diag.error(Category::Lex, e.to_string(), e.span());
		}
		self.parse_define(&Span::file_start(file), line)
	}
	pub fn apply_defines(&mut self, defines: &DefineTable) -> Result<()>
	{
		for (k,v) in defines
		{
			self.parse_define_str(k, v)?;
		}
		Ok( () )
	}

	pub fn macros(&self) -> &MacroTable
	{
		&self.macros
	}
	pub fn set_macros(&mut self, macros: MacroTable)
	{
		self.macros = macros;
	}

	pub fn diagnostics(&self) -> &Reporter
	{
		&self.diag
	}
	pub fn diagnostics_mut(&mut self) -> &mut Reporter
	{
		&mut self.diag
	}
	pub fn take_diagnostics(&mut self) -> Reporter
	{
		::std::mem::replace(&mut self.diag, Reporter::new())
	}

	/// Path of the file currently being read
	pub fn cur_path(&self) -> &Path
	{
		self.lexers.cur_path()
	}

	// --- Parser interface

	pub fn get_token(&mut self) -> Result<Token>
	{
		let lx = match self.saved.pop()
			{
			Some(lx) => {
				trace!("get_token = {:?} (saved)", lx.token);
				lx
				},
			None => {
				let mut lx = self.get_lexeme()?;
				lx.token = token::map_keywords(lx.token);
				trace!("get_token = {:?} (new)", lx.token);
				lx
				},
			};
		if self.history.len() >= 8 {
			self.history.remove(0);
		}
		self.history.push( (lx.span, lx.start_of_line, lx.leading_space) );
		Ok(lx.token)
	}
	pub fn put_back(&mut self, tok: Token)
	{
		let (span, start_of_line, leading_space) = match self.history.pop()
			{
			Some(v) => v,
			None => (Span::file_start(self.lexers.root_file.clone()), false, false),
			};
		self.saved.push(Lexeme { token: tok, span, start_of_line, leading_space });
	}
	/// Span of the token most recently returned by `get_token`
	pub fn last_span(&self) -> Span
	{
		match self.history.last()
		{
		Some(h) => h.0.clone(),
		None => Span::file_start(self.lexers.root_file.clone()),
		}
	}
	/// Span of the next token (without consuming it)
	pub fn next_span(&mut self) -> Result<Span>
	{
		let tok = self.get_token()?;
		let rv = self.last_span();
		self.put_back(tok);
		Ok(rv)
	}
	/// The next token is the first on its line
	pub fn next_starts_line(&mut self) -> Result<bool>
	{
		let tok = self.get_token()?;
		let rv = self.history.last().map(|h| h.1).unwrap_or(true);
		self.put_back(tok);
		Ok(rv)
	}

	// --- Token stream

	/// Run the whole input through the pre-processor, returning the (un-mapped) output lexemes
	pub fn drain(&mut self) -> Result<Vec<Lexeme>>
	{
		let mut rv = Vec::new();
		loop
		{
			let lx = self.get_lexeme()?;
			if lx.token == Token::EOF {
				return Ok(rv);
			}
			rv.push(lx);
		}
	}

	fn is_conditional_active(&self) -> bool
	{
		self.if_stack.iter()
			.all(|v| v.is_active)
	}

	/// Next fully pre-processed lexeme (keywords not yet mapped)
	pub fn get_lexeme(&mut self) -> Result<Lexeme>
	{
		loop
		{
			let lx = self.lexers.get_token()?;
			let active = self.options.passthrough || self.is_conditional_active();
			self.report_lex_problems(active);

			if self.options.passthrough {
				match lx.token
				{
				Token::Invalid(c) => self.diag.error(Category::Lex, format!("unrecognised character {:?}", c), &lx.span),
				_ => return Ok(lx),
				}
				continue ;
			}

			// ---
			// Handle #if-ed out blocks
			// ---
			if ! self.is_conditional_active() {
				match lx.token
				{
				Token::EOF => return Err(self.unterminated_conditional()),
				Token::Hash if lx.start_of_line => {
					self.handle_directive(lx)?;
					self.report_lex_problems(active);
					},
				_ => {},
				}
				continue ;
			}

			match lx.token
			{
			Token::EOF => {
				if !self.if_stack.is_empty() {
					return Err(self.unterminated_conditional());
				}
				return Ok(lx);
				},
			Token::Hash if lx.start_of_line => {
				self.handle_directive(lx)?;
				self.report_lex_problems(active);
				},
			Token::Invalid(c) => self.diag.error(Category::Lex, format!("unrecognised character {:?}", c), &lx.span),
			Token::Ident(_) => {
				if let Some(lx) = self.expand_ident(lx)? {
					return Ok(lx);
				}
				},
			_ => return Ok(lx),
			}
		}
	}

	/// Malformed literals become (non-fatal) lexical errors; in skipped groups they are dropped
	fn report_lex_problems(&mut self, active: bool)
	{
		for e in self.lexers.problems.drain(..)
		{
			if active {
				self.diag.error(Category::Lex, e.to_string(), e.span());
			}
		}
	}

	fn unterminated_conditional(&self) -> Error
	{
		match self.if_stack.last()
		{
		Some(c) => Error::UnterminatedConditional(c.opened_at.clone()),
		None => Error::UnterminatedConditional(Span::file_start(self.lexers.root_file.clone())),
		}
	}

	/// Macro-expand without directive handling (used for arguments and `#if` expressions)
	fn next_expanded(&mut self) -> Result<Lexeme>
	{
		loop
		{
			let lx = self.lexers.get_token()?;
			match lx.token
			{
			Token::Ident(_) => {
				if let Some(lx) = self.expand_ident(lx)? {
					return Ok(lx);
				}
				},
			_ => return Ok(lx),
			}
		}
	}

	/// Fully expand an isolated token list, within the current expansion context
	fn expand_list(&mut self, tokens: Vec<Lexeme>, end: &Span) -> Result<Vec<Lexeme>>
	{
		if !tokens.iter().any(|l| match l.token { Token::Ident(_) => true, _ => false }) {
			return Ok(tokens);
		}
		let saved_pending = ::std::mem::replace(&mut self.lexers.pending, Vec::new());
		self.lexers.lexers.push(InnerLexer::Tokens(TokenList { tokens: tokens.into_iter(), is_barrier: true, end: end.clone() }));
		let mut out = Vec::new();
		let rv = loop
			{
				match self.next_expanded()
				{
				Ok(Lexeme { token: Token::EOF, .. }) => break Ok(out),
				Ok(lx) => out.push(lx),
				Err(e) => break Err(e),
				}
			};
		self.lexers.pop_barrier();
		self.lexers.pending = saved_pending;
		rv
	}

	/// Attempt to expand the identifier `lx` as a macro.
	///
	/// Returns the lexeme to emit, or `None` if the expansion was pushed as a new token source.
	fn expand_ident(&mut self, lx: Lexeme) -> Result<Option<Lexeme>>
	{
		let name = match lx.token
			{
			Token::Ident(ref v) => v.clone(),
			_ => return Ok(Some(lx)),
			};
		match &name[..]
		{
		"__FILE__" => {
			let path = lx.span.path().display().to_string();
			return Ok(Some(Lexeme { token: Token::String(path), ..lx }));
			},
		"__LINE__" => {
			let line = lx.span.lo.line as u64;
			return Ok(Some(Lexeme { token: Token::Integer(line, IntClass::int(), line.to_string()), ..lx }));
			},
		_ => {},
		}

		let macro_def = match self.macros.get(&name)
			{
			Some(d) if !self.lexers.is_expanding(&name) => d.clone(),
			_ => return Ok(Some(lx)),
			};
		if self.lexers.expansion_depth() >= MAX_MACRO_DEPTH {
			self.diag.error(Category::Preprocess, format!("macro expansion of `{}` nested too deeply", name), &lx.span);
			return Ok(Some(lx));
		}

		let (args_raw, args_exp, invocation) = if let Some(ref params) = macro_def.arg_names
			{
				let next = self.lexers.get_token()?;
				if next.token != Token::ParenOpen {
					// Function-like macro name without arguments, it's just an identifier
					self.lexers.put_back(next);
					return Ok(Some(lx));
				}
				let (mut args, consumed, close) = self.parse_macro_args(&lx, &name)?;

				let n_named = params.names.len();
				if n_named == 0 && args.len() == 1 && args[0].is_empty() {
					args.clear();
				}
				let count_ok = if params.va_args_name.is_some() { args.len() >= n_named } else { args.len() == n_named };
				if !count_ok {
					self.diag.error(Category::Preprocess,
						format!("macro `{}` expects {} argument(s), {} given", name, n_named, args.len()),
						&lx.span.to(&close));
					for t in consumed.into_iter().rev() {
						self.lexers.put_back(t);
					}
					self.lexers.put_back(next);
					return Ok(Some(lx));
				}
				let invocation = lx.span.to(&close);
				if params.va_args_name.is_some() {
					let rest = args.split_off(n_named);
					let mut va = Vec::new();
					for (i,a) in rest.into_iter().enumerate()
					{
						if i > 0 {
							va.push(Lexeme { token: Token::Comma, span: invocation.clone(), start_of_line: false, leading_space: false });
						}
						va.extend(a);
					}
					args.push(va);
				}
				let mut exp = Vec::with_capacity(args.len());
				for a in &args
				{
					exp.push( self.expand_list(a.clone(), &close)? );
				}
				(args, exp, invocation)
			}
			else
			{
				(Vec::new(), Vec::new(), lx.span.clone())
			};

		debug!("{}: Expand `{}` args={}", invocation, name, args_raw.len());
		let output = self.do_macro_expansion(&macro_def, &args_raw, &args_exp, &invocation, lx.leading_space);
		trace!("=> {:?}", output.iter().map(|l| &l.token).collect::<Vec<_>>());
		if !output.is_empty() {
			self.lexers.push_macro(name, output);
		}
		Ok(None)
	}

	/// Read the (comma-separated, paren-balanced) arguments of a macro invocation, after the opening paren.
	///
	/// Returns the arguments, every token consumed, and the span of the closing paren.
	fn parse_macro_args(&mut self, name_lx: &Lexeme, name: &str) -> Result<(Vec<Vec<Lexeme>>, Vec<Lexeme>, Span)>
	{
		let mut args = vec![ Vec::new() ];
		let mut consumed = Vec::new();
		let mut paren_level: usize = 0;
		loop
		{
			let lx = self.lexers.get_token()?;
			match lx.token
			{
			Token::EOF => {
				self.lexers.put_back(lx);
				return Err(Error::UnterminatedInvocation(name_lx.span.clone(), name.to_owned()));
				},
			Token::ParenClose if paren_level == 0 => {
				let close = lx.span.clone();
				consumed.push(lx);
				return Ok( (args, consumed, close) );
				},
			Token::Comma if paren_level == 0 => {
				args.push(Vec::new());
				consumed.push(lx);
				continue ;
				},
			Token::ParenOpen => paren_level += 1,
			Token::ParenClose => paren_level -= 1,
			_ => {},
			}
			consumed.push(lx.clone());
			if let Some(a) = args.last_mut() {
				a.push(lx);
			}
		}
	}

	fn do_macro_expansion(&mut self, macro_def: &MacroDefinition, args_raw: &[Vec<Lexeme>], args_exp: &[Vec<Lexeme>], invocation: &Span, leading_space: bool) -> Vec<Lexeme>
	{
		let body = &macro_def.expansion;
		let mut output_tokens: Vec<Lexeme> = Vec::new();
		let param = |lx: &Lexeme| match lx.token
			{
			Token::Ident(ref i) => macro_def.param_index(i),
			_ => None,
			};

		let mut i = 0;
		while i < body.len()
		{
			let lx = &body[i];
			match lx.token
			{
			// Stringify
			Token::Hash if macro_def.is_function_like() => {
				match body.get(i+1).and_then(|n| param(n))
				{
				Some(idx) => {
					output_tokens.push(Lexeme { token: Token::String(stringify(&args_raw[idx])), ..lx.clone() });
					i += 2;
					},
				None => {
					self.diag.error(Category::Preprocess, "'#' is not followed by a macro parameter".to_owned(), invocation);
					output_tokens.push(lx.clone());
					i += 1;
					},
				}
				continue ;
				},
			// Concatenate
			Token::DoubleHash => {
				let next = match body.get(i+1)
					{
					Some(n) => n,
					None => {
						self.diag.error(Category::Preprocess, "'##' cannot appear at the end of a macro expansion".to_owned(), invocation);
						i += 1;
						continue ;
						},
					};
				i += 2;
				let rhs = match param(next)
					{
					Some(idx) => args_raw[idx].clone(),
					None => vec![next.clone()],
					};
				let mut rhs = rhs.into_iter();
				let first = match rhs.next()
					{
					Some(v) => v,
					None => {
						// `, ## __VA_ARGS__` with no variable arguments drops the comma
						let is_va = macro_def.arg_names.as_ref().map(|a| a.names.len()) == param(next);
						if is_va && output_tokens.last().map(|l| l.token == Token::Comma).unwrap_or(false) {
							output_tokens.pop();
						}
						continue ;
						},
					};
				match output_tokens.pop()
				{
				Some(left) =>
					match paste(&left, &first)
					{
					Some(tok) => output_tokens.push(Lexeme { token: tok, ..left }),
					None => {
						self.diag.error(Category::Preprocess,
							format!("pasting `{}` and `{}` does not give a valid token", left.token, first.token),
							invocation);
						output_tokens.push(left);
						output_tokens.push(first);
						},
					},
				None => output_tokens.push(first),
				}
				output_tokens.extend(rhs);
				continue ;
				},
			_ => {},
			}

			match param(lx)
			{
			Some(idx) => {
				// Operands of `##` are not expanded
				let before_paste = body.get(i+1).map(|n| n.token == Token::DoubleHash).unwrap_or(false);
				let src = if before_paste { &args_raw[idx] } else { &args_exp[idx] };
				output_tokens.extend( src.iter().cloned() );
				},
			None => output_tokens.push(lx.clone()),
			}
			i += 1;
		}

		for (i,t) in output_tokens.iter_mut().enumerate()
		{
			t.span = invocation.clone();
			t.start_of_line = false;
			if i == 0 {
				t.leading_space = leading_space;
			}
		}
		output_tokens
	}

	// --- Directives

	/// Read the remainder of a directive line
	fn read_line(&mut self) -> Result<Vec<Lexeme>>
	{
		let mut rv = Vec::new();
		loop
		{
			let lx = self.lexers.get_token()?;
			if lx.start_of_line || lx.token == Token::EOF {
				self.lexers.put_back(lx);
				return Ok(rv);
			}
			rv.push(lx);
		}
	}

	fn handle_directive(&mut self, hash: Lexeme) -> Result<()>
	{
		let name_lx = self.lexers.get_token()?;
		if name_lx.start_of_line || name_lx.token == Token::EOF {
			// Null directive
			self.lexers.put_back(name_lx);
			return Ok( () );
		}
		let span = hash.span.to(&name_lx.span);
		let line = self.read_line()?;
		let name = match name_lx.token
			{
			Token::Ident(n) => n,
			// GNU line marker `# 12 "file.c"`
			Token::Integer(..) => "line".to_owned(),
			ref t => {
				if self.is_conditional_active() {
					directive_error!(span, "invalid preprocessing directive #{}", t);
				}
				return Ok( () );
				},
			};

		if ! self.is_conditional_active() {
			return self.handle_inactive_directive(&name, span, line);
		}

		match &name[..]
		{
		"include" => self.do_include(&span, line)?,

		// ---
		// Conditionals
		// ---
		"ifdef" | "ifndef" => {
			let ident = self.single_ident(&span, &name, line)?;
			let is_true = self.macros.contains(&ident) == (name == "ifdef");
			debug!("{}: #{} {} = {}", span, name, ident, is_true);
			self.if_stack.push(Conditional::new(is_true, span));
			},
		"if" => {
			let is_true = self.eval_condition(&span, line)?;
			self.if_stack.push(Conditional::new(is_true, span));
			},
		// NOTE: In the active region the current branch was the one taken, so the expression doesn't matter.
		"elif" =>
			match self.if_stack.last_mut()
			{
			None => directive_error!(span, "#elif without #if"),
			Some(ref v) if v.is_else => directive_error!(span, "#elif after #else"),
			Some(v) => { v.has_run = true; v.is_active = false; },
			},
		"else" =>
			match self.if_stack.last_mut()
			{
			None => directive_error!(span, "#else without #if"),
			Some(ref v) if v.is_else => directive_error!(span, "#else after #else"),
			Some(v) => { v.is_else = true; v.has_run = true; v.is_active = false; },
			},
		"endif" =>
			match self.if_stack.pop()
			{
			None => directive_error!(span, "#endif without #if"),
			Some(_) => {},
			},

		// ---
		// Macro definition
		// ---
		"define" => self.parse_define(&span, line)?,
		"undef" => {
			let ident = self.single_ident(&span, &name, line)?;
			debug!("{}: #undef {}", span, ident);
			self.macros.defs.remove(&ident);
			},

		"pragma" =>
			match line.first().map(|l| &l.token)
			{
			Some(Token::Ident(n)) if n == "once" => {
				let key = file_key(self.lexers.cur_path());
				self.pragma_once_set.insert(key);
				},
			_ => debug!("{}: Ignoring #pragma {}", span, join_tokens(&line)),
			},
		"error" => directive_error!(span, "#error {}", join_tokens(&line)),
		"warning" => self.diag.warning(Category::Preprocess, format!("#warning {}", join_tokens(&line)), &span),
		"line" => {},
		_ => directive_error!(span, "invalid preprocessing directive #{}", name),
		}
		Ok( () )
	}

	fn handle_inactive_directive(&mut self, name: &str, span: Span, line: Vec<Lexeme>) -> Result<()>
	{
		match name
		{
		"if" | "ifdef" | "ifndef" => {
			self.if_stack.push(Conditional::new_dead(span));
			},
		"elif" => {
			let n = self.if_stack.len();
			let (is_else, has_run) = match self.if_stack.last()
				{
				None => directive_error!(span, "#elif without #if"),
				Some(v) => (v.is_else, v.has_run),
				};
			if is_else {
				directive_error!(span, "#elif after #else");
			}
			let parent_active = self.if_stack[..n-1].iter().all(|v| v.is_active);
			if !has_run && parent_active {
				let is_true = self.eval_condition(&span, line)?;
				if let Some(v) = self.if_stack.last_mut() {
					v.is_active = is_true;
					v.has_run = is_true;
				}
			}
			},
		"else" =>
			match self.if_stack.last_mut()
			{
			None => directive_error!(span, "#else without #if"),
			Some(ref v) if v.is_else => directive_error!(span, "#else after #else"),
			Some(v) => {
				v.is_else = true;
				if !v.has_run {
					v.is_active = true;
					v.has_run = true;
				}
				},
			},
		"endif" =>
			match self.if_stack.pop()
			{
			None => directive_error!(span, "#endif without #if"),
			Some(_) => {},
			},
		_ => {},
		}
		Ok( () )
	}

	/// `#ifdef NAME` / `#undef NAME`
	fn single_ident(&mut self, span: &Span, directive: &str, line: Vec<Lexeme>) -> Result<String>
	{
		let mut it = line.into_iter();
		let rv = match it.next()
			{
			Some(Lexeme { token: Token::Ident(n), .. }) => n,
			_ => directive_error!(span, "macro name missing in #{}", directive),
			};
		if let Some(extra) = it.next() {
			self.diag.warning(Category::Preprocess, format!("extra tokens at end of #{} directive", directive), &extra.span);
		}
		Ok(rv)
	}

	fn do_include(&mut self, span: &Span, line: Vec<Lexeme>) -> Result<()>
	{
		let (was_angle, path) = match line.first().map(|l| &l.token)
			{
			Some(Token::String(s)) => (false, s.clone()),
			// `#include <foo>`: re-assemble the path from the tokens
			Some(Token::Lt) => {
				let mut s = String::new();
				let mut closed = false;
				for lx in &line[1..]
				{
					if lx.token == Token::Gt {
						closed = true;
						break;
					}
					s += &lx.token.to_string();
				}
				if !closed {
					directive_error!(span, "missing terminating > character");
				}
				(true, s)
				},
			_ => directive_error!(span, "#include expects \"FILENAME\" or <FILENAME>"),
			};

		// Search the including file's directory (quoted form only), then the include directories
		let mut candidates = Vec::new();
		if !was_angle {
			let dir = self.lexers.cur_path().parent().map(|p| p.to_owned()).unwrap_or_else(|| PathBuf::from("."));
			candidates.push(dir.join(&path));
		}
		for include_path in &self.options.include_paths
		{
			candidates.push(include_path.join(&path));
		}
		let file_path = match candidates.into_iter().find(|p| p.is_file())
			{
			Some(p) => p,
			None => {
				let shown = if was_angle { format!("<{}>", path) } else { format!("\"{}\"", path) };
				self.diag.warning(Category::Preprocess, format!("cannot find include file {}, skipping", shown), span);
				return Ok( () );
				},
			};

		if self.pragma_once_set.contains(&file_key(&file_path)) {
			debug!("{}: Skipping {} (#pragma once)", span, file_path.display());
			return Ok( () );
		}
		if self.lexers.include_depth() >= MAX_INCLUDE_DEPTH {
			return Err(Error::IncludeDepth(span.clone()));
		}
		let src = match read_source(&file_path)
			{
			Ok(v) => v,
			Err(e) => return Err(Error::Io(span.clone(), file_path, e)),
			};
		info!("{}: Including {}", span, file_path.display());
		self.lexers.push_file(file_path, &src);
		Ok( () )
	}

	fn parse_define(&mut self, span: &Span, line: Vec<Lexeme>) -> Result<()>
	{
		let mut it = line.into_iter().peekable();
		let ident = match it.next()
			{
			Some(Lexeme { token: Token::Ident(n), .. }) => n,
			_ => directive_error!(span, "macro names must be identifiers"),
			};
		// `NAME(` with no space is a function-like macro, `NAME (` is object-like
		let is_function = match it.peek()
			{
			Some(l) => l.token == Token::ParenOpen && !l.leading_space,
			None => false,
			};
		let args = if is_function
			{
				it.next();
				let mut names = Vec::new();
				let mut variable = None;
				loop
				{
					match it.next().map(|l| l.token)
					{
					Some(Token::ParenClose) if names.is_empty() => break,
					Some(Token::Ident(s)) => names.push(s),
					Some(Token::Vargs) => {
						variable = Some("__VA_ARGS__".to_owned());
						match it.next().map(|l| l.token)
						{
						Some(Token::ParenClose) => break,
						_ => directive_error!(span, "expected ')' after \"...\" in macro parameter list"),
						}
						},
					tok => directive_error!(span, "unexpected {} in macro parameter list", tok.unwrap_or(Token::EOF)),
					}
					match it.next().map(|l| l.token)
					{
					Some(Token::Vargs) => {
						// GNU named variadic `name...`
						match it.next().map(|l| l.token)
						{
						Some(Token::ParenClose) => {},
						_ => directive_error!(span, "expected ')' after \"...\" in macro parameter list"),
						}
						variable = names.pop();
						break
						},
					Some(Token::ParenClose) => break,
					Some(Token::Comma) => {},
					tok => directive_error!(span, "unexpected {} in macro parameter list", tok.unwrap_or(Token::EOF)),
					}
				}
				Some(MacroArgs { names: names, va_args_name: variable })
			}
			else
			{
				None
			};
		let def = MacroDefinition {
			arg_names: args,
			expansion: it.collect(),
			span: span.clone(),
			};
		if let Some(prev) = self.macros.get(&ident) {
			if !prev.same_as(&def) {
				self.diag.error(Category::Preprocess, format!("`{}` redefined (previous definition at {})", ident, prev.span), span);
			}
		}
		debug!("{}: #define {} {:?} = {}", span, ident, def.arg_names, join_tokens(&def.expansion));
		self.macros.defs.insert(ident, def);
		Ok( () )
	}

	/// Evaluate the expression of an `#if`/`#elif`
	fn eval_condition(&mut self, dspan: &Span, line: Vec<Lexeme>) -> Result<bool>
	{
		// `defined` is resolved before macro expansion, so its operand isn't expanded
		let mut resolved = Vec::with_capacity(line.len());
		let mut it = line.into_iter();
		while let Some(lx) = it.next()
		{
			let is_defined = match lx.token { Token::Ident(ref n) => n == "defined", _ => false };
			if !is_defined {
				resolved.push(lx);
				continue ;
			}
			let (name, last) = match it.next()
				{
				Some(Lexeme { token: Token::Ident(n), span, .. }) => (n, span),
				Some(Lexeme { token: Token::ParenOpen, .. }) =>
					match (it.next(), it.next())
					{
					(Some(Lexeme { token: Token::Ident(n), .. }), Some(Lexeme { token: Token::ParenClose, span, .. })) => (n, span),
					_ => directive_error!(dspan, "operator \"defined\" requires an identifier"),
					},
				_ => directive_error!(dspan, "operator \"defined\" requires an identifier"),
				};
			let v = self.macros.contains(&name) as u64;
			resolved.push(Lexeme {
				token: Token::Integer(v, IntClass::int(), v.to_string()),
				span: lx.span.to(&last),
				start_of_line: false,
				leading_space: lx.leading_space,
				});
		}

		let expanded = self.expand_list(resolved, dspan)?;
		let tokens: Vec<Token> = expanded.into_iter().map(|l| l.token).collect();
		match if_expr::evaluate(&tokens)
		{
		Ok(v) => {
			debug!("{}: #if {:?} = {}", dspan, tokens, v);
			Ok(v != 0)
			},
		Err(e) => Err(Error::IfExpr(dspan.clone(), e)),
		}
	}
}

/// Canonical key for `#pragma once` tracking
fn file_key(p: &Path) -> PathBuf
{
	p.canonicalize().unwrap_or_else(|_| p.to_owned())
}

/// Source-like rendering of a token list (single spaces where the source had whitespace)
fn join_tokens(tokens: &[Lexeme]) -> String
{
	let mut s = String::new();
	for (i,t) in tokens.iter().enumerate()
	{
		if i > 0 && t.leading_space {
			s.push(' ');
		}
		s += &t.token.to_string();
	}
	s
}

/// `#x` - the argument's spelling as a string literal's contents
fn stringify(tokens: &[Lexeme]) -> String
{
	join_tokens(tokens)
}

/// `a ## b` - re-lex the joined spelling, which must form exactly one token
fn paste(left: &Lexeme, right: &Lexeme) -> Option<Token>
{
	let text = format!("{}{}", left.token, right.token);
	let mut lexer = lex::tokenize(left.span.file.clone(), &text);
	let first = match lexer.next()
		{
		Some(Ok(l)) => l.token,
		_ => return None,
		};
	if let Token::Invalid(_) = first {
		return None;
	}
	if !lexer.take_problems().is_empty() {
		return None;
	}
	match lexer.next()
	{
	None => Some(first),
	Some(_) => None,
	}
}

impl ::std::fmt::Display for Preproc
{
	fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result
	{
		write!(f, "{}", self.last_span())
	}
}

impl TokenSourceStack
{
	fn push_file(&mut self, path: PathBuf, src: &str)
	{
		self.lexers.push(InnerLexer::File(lex::tokenize(Arc::new(path), src)));
	}
	fn push_macro(&mut self, name: String, tokens: Vec<Lexeme>)
	{
		self.lexers.push(InnerLexer::MacroExpansion(MacroExpansion {
			name: name,
			tokens: tokens.into_iter(),
			}));
	}
	/// Remove the innermost barrier (and anything left above it)
	fn pop_barrier(&mut self)
	{
		while let Some(l) = self.lexers.pop()
		{
			if let InnerLexer::Tokens(TokenList { is_barrier: true, .. }) = l {
				break;
			}
		}
	}

	fn put_back(&mut self, lx: Lexeme)
	{
		self.pending.push(lx);
	}

	fn is_expanding(&self, name: &str) -> bool
	{
		self.lexers.iter().any(|l| match l
			{
			InnerLexer::MacroExpansion(me) => me.name == name,
			_ => false,
			})
	}
	fn expansion_depth(&self) -> usize
	{
		self.lexers.iter().filter(|l| match l { InnerLexer::MacroExpansion(_) => true, _ => false }).count()
	}
	fn include_depth(&self) -> usize
	{
		self.lexers.iter().filter(|l| match l { InnerLexer::File(_) => true, _ => false }).count()
	}

	fn cur_path(&self) -> &Path
	{
		for e in self.lexers.iter().rev()
		{
			match e
			{
			InnerLexer::File(h) => return h.file(),
			InnerLexer::MacroExpansion(_) => {},
			InnerLexer::Tokens(_) => {},
			}
		}
		&self.root_file
	}

	fn get_token(&mut self) -> Result<Lexeme>
	{
		if let Some(lx) = self.pending.pop() {
			return Ok(lx);
		}
		loop
		{
			let depth = self.lexers.len();
			let t = match self.lexers.last_mut()
				{
				None => return Ok(Lexeme { token: Token::EOF, span: Span::file_start(self.root_file.clone()), start_of_line: true, leading_space: false }),
				Some(InnerLexer::File(h)) => {
					let t = h.get_token()?;
					self.problems.extend(h.take_problems());
					t
					},
				Some(InnerLexer::MacroExpansion(h)) => match h.tokens.next()
					{
					Some(t) => t,
					None => { self.lexers.pop(); continue },
					},
				Some(InnerLexer::Tokens(h)) => match h.tokens.next()
					{
					Some(t) => t,
					None if h.is_barrier || depth == 1 => return Ok(Lexeme { token: Token::EOF, span: h.end.clone(), start_of_line: true, leading_space: false }),
					None => { self.lexers.pop(); continue },
					},
				};
			match t.token
			{
			Token::EOF if depth > 1 => {
				// EOF on inner file: Pop and continue
				self.lexers.pop();
				},
			_ => return Ok(t),
			}
		}
	}
}

/// Expand `tokens` (directives included) starting from the given definitions
pub fn expand(file: Arc<PathBuf>, tokens: Vec<Lexeme>, defines: &DefineTable, diag: &mut Reporter) -> Result<Vec<Lexeme>>
{
	let mut pp = Preproc::from_tokens(file, tokens, Options::default());
	let rv = match pp.apply_defines(defines)
		{
		Ok(()) => pp.drain(),
		Err(e) => Err(e),
		};
	diag.absorb(pp.take_diagnostics());
	rv
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn file() -> Arc<PathBuf> {
		Arc::new(PathBuf::from("t.c"))
	}
	fn pp(src: &str) -> Preproc {
		Preproc::from_source(file(), src, Options::default())
	}
	fn text(lexemes: &[Lexeme]) -> String {
		lexemes.iter().map(|l| l.token.to_string()).collect::<Vec<_>>().join(" ")
	}
	fn run(src: &str) -> String {
		text(&pp(src).drain().expect("preprocess"))
	}

	#[test]
	fn ifdef_without_defines()
	{
		let src = "#ifdef DEBUG\nint a;\n#else\nint b;\n#endif\n";
		assert_eq!(run(src), "int b ;");

		let mut p = pp(src);
		p.parse_define_str("DEBUG", "1").unwrap();
		assert_eq!(text(&p.drain().unwrap()), "int a ;");
	}

	#[test]
	fn malformed_literals_reported_when_active()
	{
		let mut p = pp("#if 0\nint a = 08;\n#endif\nint b = 0x;\n#define BAD 1e\nint c;\n");
		assert_eq!(text(&p.drain().expect("preprocess")), "int b = 0x ; int c ;");
		let msgs: Vec<_> = p.diagnostics().all().iter().map(|d| (d.category, d.line)).collect();
		assert_eq!(msgs, vec![(Category::Lex, 4), (Category::Lex, 5)]);
		assert!(!p.diagnostics().has_fatal());
	}

	#[test]
	fn nested_conditionals()
	{
		let src = "#define A\n#if 0\n#ifdef A\nx\n#else\ny\n#endif\n#elif defined(A) && !defined B\nz\n#else\nw\n#endif\n";
		assert_eq!(run(src), "z");
		assert_eq!(run("#if 1\na\n#elif 1\nb\n#else\nc\n#endif\n"), "a");
		assert_eq!(run("#define V 3\n#if V * 2 == 6 ? 0 : 1\na\n#elif V >> 1\nb\n#endif\n"), "b");
	}

	#[test]
	fn object_and_function_macros()
	{
		assert_eq!(run("#define PI 3.14159\nx = PI;"), "x = 3.14159 ;");
		assert_eq!(run("#define SQUARE(x) ((x) * (x))\nSQUARE(a+1)"), "( ( a + 1 ) * ( a + 1 ) )");
		// Not an invocation without the parens
		assert_eq!(run("#define F(x) x\nF + 1"), "F + 1");
		// `NAME (` is object-like
		assert_eq!(run("#define G (x)\nG"), "( x )");
		assert_eq!(run("#define LOG(msg)\nLOG(\"hi\"); a"), "; a");
	}

	#[test]
	fn nested_invocations()
	{
		let out = run("#define MAX(a,b) ((a) > (b) ? (a) : (b))\nMAX(1, MAX(2, 3))");
		assert!(!out.contains("MAX"), "{}", out);
		// Name produced by an expansion picks up arguments from after it
		assert_eq!(run("#define F(x) [x]\n#define G F\nG(1)"), "[ 1 ]");
	}

	#[test]
	fn self_reference_is_not_reexpanded()
	{
		assert_eq!(run("#define foo foo + 1\nfoo"), "foo + 1");
		assert_eq!(run("#define A B\n#define B A\nA B"), "A B");
		assert_eq!(run("#define f(x) f(x + 1)\nf(2)"), "f ( 2 + 1 )");
	}

	#[test]
	fn stringify_and_paste()
	{
		let out = pp("#define STR(x) #x\n#define CAT(a,b) a ## b\nSTR(hello  world) CAT(foo, 1)").drain().unwrap();
		assert_eq!(out[0].token, Token::String("hello world".to_owned()));
		assert_eq!(out[1].token, Token::Ident("foo1".to_owned()));
		assert_eq!(out.len(), 2);
	}

	#[test]
	fn variadic()
	{
		assert_eq!(run("#define P(fmt, ...) printf(fmt, __VA_ARGS__)\nP(\"%d\", 1, 2)"), "printf ( \"%d\" , 1 , 2 )");
		assert_eq!(run("#define P(fmt, ...) printf(fmt, ## __VA_ARGS__)\nP(\"x\")"), "printf ( \"x\" )");
	}

	#[test]
	fn argument_count_mismatch()
	{
		let mut p = pp("#define ADD(a,b) a+b\nADD(1)");
		let out = p.drain().unwrap();
		assert_eq!(text(&out), "ADD ( 1 )");
		assert_eq!(p.diagnostics().count(Category::Preprocess), 1);
	}

	#[test]
	fn redefinition()
	{
		let mut p = pp("#define A 1\n#define A  1\n#define B 1\n#define B 2\nA B");
		assert_eq!(text(&p.drain().unwrap()), "1 2");
		assert_eq!(p.diagnostics().all().len(), 1);
		assert!(!p.diagnostics().has_fatal());
	}

	#[test]
	fn unmatched_conditionals_are_fatal()
	{
		assert!(pp("#else\n").drain().is_err());
		assert!(pp("#elif 1\n").drain().is_err());
		assert!(pp("#endif\n").drain().is_err());
		assert!(pp("#if 1\n#else\n#else\n#endif\n").drain().is_err());
		match pp("int a;\n#ifdef X\nint b;\n").drain()
		{
		Err(Error::UnterminatedConditional(s)) => assert_eq!(s.lo.line, 2),
		r => panic!("{:?}", r.map(|v| text(&v))),
		}
	}

	#[test]
	fn missing_include_is_a_warning()
	{
		let mut p = pp("#include <reg2051.h>\n#include \"nope.h\"\nint x;");
		assert_eq!(text(&p.drain().unwrap()), "int x ;");
		let d = p.diagnostics().all();
		assert_eq!(d.len(), 2);
		assert!(d[0].message.contains("<reg2051.h>"));
		assert!(!p.diagnostics().has_fatal());
	}

	#[test]
	fn error_directive()
	{
		match pp("#error stop here\n").drain()
		{
		Err(Error::Directive(_, m)) => assert_eq!(m, "#error stop here"),
		r => panic!("{:?}", r.map(|v| text(&v))),
		}
		assert!(pp("#bogus\n").drain().is_err());
		// Unknown directives in skipped regions are fine
		assert_eq!(run("#if 0\n#bogus\n#endif\nx"), "x");
	}

	#[test]
	fn expansion_spans_point_at_invocation()
	{
		let out = pp("#define PI 3.14\nint x =\n  PI;").drain().unwrap();
		let pi = &out[3];
		assert_eq!(pi.token.to_string(), "3.14");
		assert_eq!(pi.span.lo.line, 3);
		assert_eq!(pi.span.lo.column, 3);
	}

	#[test]
	fn builtin_macros()
	{
		let out = pp("\n__LINE__ __FILE__").drain().unwrap();
		assert_eq!(out[0].token.to_string(), "2");
		assert_eq!(out[1].token, Token::String("t.c".to_owned()));
	}

	#[test]
	fn invalid_character_is_recoverable()
	{
		let mut p = pp("int @ x;");
		assert_eq!(text(&p.drain().unwrap()), "int x ;");
		assert_eq!(p.diagnostics().count(Category::Lex), 1);
	}

	#[test]
	fn command_line_defines()
	{
		assert_eq!(split_define_arg("FOO"), ("FOO".to_owned(), "1".to_owned()));
		assert_eq!(split_define_arg("N=0x10"), ("N".to_owned(), "0x10".to_owned()));
		let mut defs = DefineTable::new();
		defs.insert("SQUARE(x)".to_owned(), "((x)*(x))".to_owned());
		defs.insert("N".to_owned(), "4".to_owned());
		let toks: Vec<_> = lex::tokenize(file(), "SQUARE(N)").map(|l| l.unwrap()).collect();
		let mut diag = Reporter::new();
		let out = expand(file(), toks, &defs, &mut diag).unwrap();
		assert_eq!(text(&out), "( ( 4 ) * ( 4 ) )");
	}

	#[test]
	fn expansion_is_stable()
	{
		let mut p = pp("#define PI 3.14159\n#define SQUARE(x) ((x) * (x))\ndouble a = SQUARE(PI);\n");
		let once = p.drain().unwrap();
		let mut again = Preproc::from_tokens(file(), once.clone(), Options::default());
		again.set_macros(p.macros().clone());
		let twice = again.drain().unwrap();
		assert_eq!(text(&once), text(&twice));
	}

	#[test]
	fn put_back_restores_location()
	{
		let mut p = pp("a\n  b");
		assert_eq!(p.get_token().unwrap(), Token::Ident("a".to_owned()));
		let t = p.get_token().unwrap();
		assert_eq!(p.last_span().lo.line, 2);
		p.put_back(t);
		assert_eq!(p.last_span().lo.line, 1);
		assert!(p.next_starts_line().unwrap());
		assert_eq!(p.next_span().unwrap().lo.column, 3);
		assert_eq!(p.get_token().unwrap(), Token::Ident("b".to_owned()));
		assert_eq!(p.get_token().unwrap(), Token::EOF);
	}
}
