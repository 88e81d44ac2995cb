//! Diagnostic collection
//!
//! Every stage reports through a `Reporter` instead of aborting. The reporter itself never fails; it records
//! in detection order and answers `has_fatal`.
use std::path::PathBuf;

use crate::ast::Span;

#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum Severity
{
	Error,
	Warning,
}

/// Which stage produced a diagnostic
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum Category
{
	Lex,
	Preprocess,
	Syntax,
	Semantic,
}

#[derive(Debug,Clone,PartialEq)]
pub struct Diagnostic
{
	pub severity: Severity,
	pub category: Category,
	/// Processing of the file stopped here
	pub is_fatal: bool,
	pub message: String,
	pub file: PathBuf,
	pub line: u32,
	pub column: u32,
}
impl ::std::fmt::Display for Diagnostic
{
	fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result
	{
		write!(f, "{}:{}:{}: {}: {}",
			self.file.display(), self.line, self.column,
			match (self.severity, self.is_fatal)
			{
			(_, true) => "fatal error",
			(Severity::Error, false) => "error",
			(Severity::Warning, false) => "warning",
			},
			self.message
			)
	}
}

/// Overall result of processing one translation unit
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum Status
{
	Success,
	SuccessWithWarnings,
	Failed,
}

#[derive(Debug,Default)]
pub struct Reporter
{
	diags: Vec<Diagnostic>,
}

impl Reporter
{
	pub fn new() -> Reporter
	{
		Default::default()
	}

	pub fn report(&mut self, severity: Severity, category: Category, message: String, span: &Span)
	{
		self.push(severity, category, false, message, span);
	}
	pub fn error(&mut self, category: Category, message: String, span: &Span)
	{
		self.push(Severity::Error, category, false, message, span);
	}
	pub fn warning(&mut self, category: Category, message: String, span: &Span)
	{
		self.push(Severity::Warning, category, false, message, span);
	}
	/// Record an error that stops processing of the current file
	pub fn fatal(&mut self, category: Category, message: String, span: &Span)
	{
		self.push(Severity::Error, category, true, message, span);
	}

	fn push(&mut self, severity: Severity, category: Category, is_fatal: bool, message: String, span: &Span)
	{
		let d = Diagnostic {
			severity,
			category,
			is_fatal,
			message,
			file: span.path().to_owned(),
			line: span.lo.line,
			column: span.lo.column,
			};
		match severity
		{
		Severity::Error => error!("{}", d),
		Severity::Warning => warn!("{}", d),
		}
		self.diags.push(d);
	}

	/// Append the diagnostics from another reporter (keeping their order)
	pub fn absorb(&mut self, other: Reporter)
	{
		self.diags.extend(other.diags);
	}

	pub fn has_fatal(&self) -> bool
	{
		self.diags.iter().any(|d| d.is_fatal)
	}
	pub fn all(&self) -> &[Diagnostic]
	{
		&self.diags
	}
	pub fn count(&self, category: Category) -> usize
	{
		self.diags.iter().filter(|d| d.category == category).count()
	}
	pub fn into_vec(self) -> Vec<Diagnostic>
	{
		self.diags
	}

	pub fn status(&self) -> Status
	{
		if self.has_fatal() {
			Status::Failed
		}
		else if self.diags.is_empty() {
			Status::Success
		}
		else {
			Status::SuccessWithWarnings
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use std::sync::Arc;
	use crate::ast::Pos;

	fn span(line: u32, column: u32) -> Span {
		let p = Pos { line, column, offset: 0 };
		Span::new(Arc::new(PathBuf::from("t.c")), p, p)
	}

	#[test]
	fn keeps_insertion_order()
	{
		let mut r = Reporter::new();
		r.warning(Category::Semantic, "second line".to_owned(), &span(2, 1));
		r.error(Category::Syntax, "first line".to_owned(), &span(1, 4));
		let all = r.all();
		assert_eq!(all.len(), 2);
		assert_eq!(all[0].line, 2);
		assert_eq!(all[1].line, 1);
		assert_eq!(all[1].column, 4);
		assert_eq!(all[1].to_string(), "t.c:1:4: error: first line");
	}

	#[test]
	fn status_from_fatality()
	{
		let mut r = Reporter::new();
		assert_eq!(r.status(), Status::Success);
		r.error(Category::Syntax, "x".to_owned(), &span(1, 1));
		assert_eq!(r.status(), Status::SuccessWithWarnings);
		assert!(!r.has_fatal());
		r.fatal(Category::Lex, "y".to_owned(), &span(3, 1));
		assert!(r.has_fatal());
		assert_eq!(r.status(), Status::Failed);
		assert_eq!(r.count(Category::Lex), 1);
	}
}
