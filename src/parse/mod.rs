//! C parser
//!
//! Recursive descent over the pre-processor's token stream. Syntax errors inside a statement or top-level
//! declaration are recorded and parsing resumes at the next statement boundary; anything coming out of the
//! pre-processor (and running out of file inside a block) stops the translation unit.
use std::path::PathBuf;
use std::sync::Arc;

use crate::ast;
use crate::ast::Span;
use crate::diagnostics::{Category,Reporter};
use crate::preproc::{self,Preproc,DefineTable};
use crate::preproc::token::{Token,Lexeme};
use crate::symbols::SymbolTable;

/// Return a (recoverable) syntax error, located at the most recently read token
macro_rules! syntax_error {
	($($fmt:tt)+) => {
		return Err( crate::parse::Error::SyntaxError( format!($($fmt)+) ) )
		};
}
/// Require a token
///
/// - `syntax_assert!(self.lex => Token::Semicolon)` - the next token must be exactly this
/// - `syntax_assert!(self.lex.get_token()?, Token::Ident(n) => n)` - match and extract
macro_rules! syntax_assert {
	($lex:expr => $tok:expr) => {{
		let tok = $tok;
		match $lex.get_token()?
		{
		ref t if *t == tok => {},
		t => {
			// Leave statement boundaries for error recovery
			if t.is_statement_boundary() {
				$lex.put_back(t.clone());
			}
			syntax_error!("expected `{}`, found `{}`", tok, t)
			},
		}
		}};
	($tok:expr, $pat:pat => $val:expr) => {
		match $tok
		{
		$pat => $val,
		t => syntax_error!("unexpected `{}`", t),
		}
		};
}
/// Consume the next token if it matches, returning `true`
macro_rules! peek_token {
	($lex:expr, $($pat:pat)|+ if $cond:expr) => {
		match $lex.get_token()?
		{
		$($pat)|+ if $cond => true,
		t => { $lex.put_back(t); false },
		}
		};
	($lex:expr, $($pat:pat)|+) => {
		match $lex.get_token()?
		{
		$($pat)|+ => true,
		t => { $lex.put_back(t); false },
		}
		};
}
/// Check the next token without consuming it
macro_rules! peek_token_nc {
	($lex:expr, $($pat:pat)|+) => {{
		let t = $lex.get_token()?;
		let rv = match t { $($pat)|+ => true, _ => false, };
		$lex.put_back(t);
		rv
		}};
}

mod types;
mod expr;
mod extensions;
mod parsing;

#[derive(Debug,thiserror::Error)]
pub enum Error
{
	/// Grammar violation, recovered from at the next statement boundary
	#[error("{0}")]
	SyntaxError(String),
	/// End of file inside a block (opened at the first span)
	#[error("expected `}}` before end of file (block opened at {0})")]
	Unbalanced(Span, Span),
	#[error(transparent)]
	Preproc(#[from] preproc::Error),
}
impl Error
{
	fn category(&self) -> Category
	{
		match self
		{
		Error::SyntaxError(..) | Error::Unbalanced(..) => Category::Syntax,
		Error::Preproc(e) => e.category(),
		}
	}
}

pub type ParseResult<T> = Result<T,Error>;

/// Parser state for one translation unit
pub struct ParseState<'ast>
{
	unit: &'ast mut ast::TranslationUnit,
	lex: Preproc,
	symbols: SymbolTable,
}

/// Pre-process and parse a source file
pub fn parse(file: Arc<PathBuf>, source: &str, options: preproc::Options, defines: &DefineTable) -> (ast::TranslationUnit, Reporter)
{
	let mut lex = Preproc::from_source(file.clone(), source, options);
	if let Err(e) = lex.apply_defines(defines) {
		// A bad `-D` doesn't stop the file
		let sp = e.span().clone();
		lex.diagnostics_mut().error(e.category(), e.to_string(), &sp);
	}
	run(file, lex)
}

/// Parse an already pre-processed token stream (directives and macros are not interpreted)
pub fn parse_tokens(file: Arc<PathBuf>, tokens: Vec<Lexeme>) -> (ast::TranslationUnit, Reporter)
{
	let options = preproc::Options { passthrough: true, ..Default::default() };
	let lex = Preproc::from_tokens(file.clone(), tokens, options);
	run(file, lex)
}

fn run(file: Arc<PathBuf>, lex: Preproc) -> (ast::TranslationUnit, Reporter)
{
	let mut unit = ast::TranslationUnit::new(file);
	let (res, mut diag, last) = {
		let mut state = ParseState {
			unit: &mut unit,
			lex: lex,
			symbols: SymbolTable::new(),
			};
		let res = state.parseroot();
		let last = state.lex.last_span();
		(res, state.lex.take_diagnostics(), last)
		};

	if let Err(e) = res
	{
		let span = match e
			{
			Error::SyntaxError(_) => last,
			Error::Unbalanced(_, ref eof) => eof.clone(),
			Error::Preproc(ref e) => e.span().clone(),
			};
		diag.fatal(e.category(), e.to_string(), &span);
		unit.is_partial = true;
	}
	if let (Some(first), Some(last)) = (unit.items.first(), unit.items.last()) {
		unit.span = first.span().to(last.span());
	}
	info!("{}: {} items, {} diagnostics{}", unit.file.display(), unit.items.len(), diag.all().len(),
		if unit.is_partial { " (partial)" } else { "" });
	(unit, diag)
}

impl<'ast> ParseState<'ast>
{
	fn diag(&mut self) -> &mut Reporter
	{
		self.lex.diagnostics_mut()
	}
	/// Record a recovered syntax error at the last token read
	fn report_syntax(&mut self, msg: String)
	{
		let span = self.lex.last_span();
		self.diag().error(Category::Syntax, msg, &span);
	}
	fn warning(&mut self, msg: String, span: &Span)
	{
		self.diag().warning(Category::Semantic, msg, span);
	}
	fn semantic_error(&mut self, msg: String, span: &Span)
	{
		self.diag().error(Category::Semantic, msg, span);
	}

	/// Span from `start` to the end of the last token read
	fn span_from(&self, start: &Span) -> Span
	{
		start.to(&self.lex.last_span())
	}

	/// Statement terminator
	///
	/// A missing `;` directly before a new line (or a `}`) is reported and parsing carries on as if it was
	/// there, so one forgotten semicolon costs one diagnostic.
	fn expect_semicolon(&mut self) -> ParseResult<()>
	{
		if peek_token!(self.lex, Token::Semicolon) {
			return Ok( () );
		}
		if self.lex.next_starts_line()? || peek_token_nc!(self.lex, Token::BraceClose | Token::EOF) {
			let after = self.lex.last_span();
			let next = self.lex.get_token()?;
			self.lex.put_back(next.clone());
			self.diag().error(Category::Syntax, format!("expected `;` before `{}`", next), &after);
			Ok( () )
		}
		else {
			let t = self.lex.get_token()?;
			syntax_error!("expected `;`, found `{}`", t)
		}
	}

	/// Skip to the end of the current statement after a syntax error
	///
	/// Stops after a `;` or a balanced `{ }` group. A `}` closing the enclosing block is left for the block,
	/// except at file scope where there is no such block and it is skipped too.
	fn skip_statement(&mut self, at_file_scope: bool) -> ParseResult<()>
	{
		let mut depth = 0usize;
		loop
		{
			match self.lex.get_token()?
			{
			Token::Semicolon if depth == 0 => return Ok( () ),
			Token::BraceOpen => depth += 1,
			Token::BraceClose => {
				if depth == 0 {
					if !at_file_scope {
						self.lex.put_back(Token::BraceClose);
					}
					return Ok( () );
				}
				depth -= 1;
				if depth == 0 {
					return Ok( () );
				}
				},
			Token::EOF => {
				self.lex.put_back(Token::EOF);
				return Ok( () );
				},
			_ => {},
			}
		}
	}
}
