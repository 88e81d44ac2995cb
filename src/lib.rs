/*!
 * C parser for 8051-family embedded code
 *
 * Source text goes through the lexer and pre-processor (`preproc`), then the parser (`parse`), which also
 * recognises the Keil-style `sfr`/`sbit`/`interrupt` extensions. Every stage reports into one
 * `diagnostics::Reporter` per file, and the result is a `TranslationUnit` plus that list of diagnostics.
 *
 * Files share nothing mutable, so separate files can be processed on separate threads with one `Config`.
 */
#[macro_use]
extern crate log;

pub mod diagnostics;
pub mod types;
pub mod ast;
pub mod symbols;
pub mod preproc;
pub mod parse;

use std::path::Path;
use std::sync::Arc;

pub use crate::diagnostics::{Diagnostic,Severity,Status};

/// Settings shared (read-only) by every file being processed
#[derive(Debug,Clone,Default)]
pub struct Config
{
	pub options: preproc::Options,
	/// Initial macro definitions (e.g. from `-D`)
	pub defines: preproc::DefineTable,
}

/// Result of processing one file
#[derive(Debug)]
pub struct Outcome
{
	pub unit: ast::TranslationUnit,
	/// In the order they were detected
	pub diagnostics: Vec<Diagnostic>,
	pub status: Status,
}
impl Outcome
{
	pub fn has_fatal(&self) -> bool
	{
		self.diagnostics.iter().any(|d| d.is_fatal)
	}
}

/// Run the whole pipeline over source text
pub fn process_source(path: &Path, source: &str, config: &Config) -> Outcome
{
	info!("Processing {}", path.display());
	let (unit, diag) = parse::parse(Arc::new(path.to_owned()), source, config.options.clone(), &config.defines);
	let status = diag.status();
	Outcome {
		unit: unit,
		diagnostics: diag.into_vec(),
		status: status,
		}
}

/// Read and process a file
pub fn process_file(path: &Path, config: &Config) -> ::std::io::Result<Outcome>
{
	let source = preproc::read_source(path)?;
	Ok( process_source(path, &source, config) )
}
