//! Scoped symbol table
//!
//! Only as much as parsing needs: typedef names, telling calls from declarators, redeclaration checks, and
//! the `sfr` addresses that `sbit REG ^ N` resolves against.
use std::collections::HashMap;

use crate::ast::{Span,Binding,FunctionSig,InterruptAttribute,Attribute};
use crate::types::{Type,StorageClass};

#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum SymbolKind
{
	Variable,
	Function,
	/// `sfr` - special function register
	Sfr,
	/// `sbit` - addressable bit
	Sbit,
	Typedef,
}

#[derive(Debug,Clone)]
pub struct Symbol
{
	pub name: String,
	pub kind: SymbolKind,
	pub ty: Type,
	/// Where it was (most recently) declared
	pub span: Span,
	pub storage: Option<StorageClass>,
	/// Function signature (functions only)
	pub sig: Option<FunctionSig>,
	/// A function body (or a non-`extern` variable definition) has been seen
	pub defined: bool,
	/// Address of an `sfr`/`sbit`
	pub address: Option<u64>,
	/// Interrupt marker and attributes from any declaration so far (functions only)
	pub interrupt: Option<InterruptAttribute>,
	pub attributes: Vec<Attribute>,
}
impl Symbol
{
	pub fn new(name: String, kind: SymbolKind, ty: Type, span: Span) -> Symbol
	{
		Symbol {
			name: name,
			kind: kind,
			ty: ty,
			span: span,
			storage: None,
			sig: None,
			defined: false,
			address: None,
			interrupt: None,
			attributes: Vec::new(),
		}
	}
}

pub struct SymbolTable
{
	/// Innermost scope last, the file scope is always present
	scopes: Vec<HashMap<String,Symbol>>,
	/// Calls to functions that weren't declared at the point of the call
	deferred_calls: Vec<(String,Span)>,
}

impl SymbolTable
{
	pub fn new() -> SymbolTable
	{
		SymbolTable {
			scopes: vec![ HashMap::new() ],
			deferred_calls: Vec::new(),
		}
	}

	/// Current nesting depth (0 is file scope)
	pub fn depth(&self) -> usize
	{
		self.scopes.len() - 1
	}
	pub fn push_scope(&mut self)
	{
		self.scopes.push(HashMap::new());
	}
	pub fn pop_scope(&mut self)
	{
		if self.scopes.len() > 1 {
			self.scopes.pop();
		}
	}

	/// Innermost symbol with this name, along with the depth of the scope it's in
	pub fn lookup_with_depth(&self, name: &str) -> Option<(&Symbol, usize)>
	{
		self.scopes.iter().enumerate().rev()
			.filter_map(|(d,s)| s.get(name).map(|v| (v, d)))
			.next()
	}
	pub fn lookup(&self, name: &str) -> Option<&Symbol>
	{
		self.lookup_with_depth(name).map(|v| v.0)
	}
	/// Lookup in the current scope only
	pub fn lookup_local(&self, name: &str) -> Option<&Symbol>
	{
		self.scopes.last().and_then(|s| s.get(name))
	}

	/// Add to the current scope, returning any symbol it replaced
	pub fn insert(&mut self, sym: Symbol) -> Option<Symbol>
	{
		let depth = self.depth();
		trace!("symbols: {} = {:?} (depth {})", sym.name, sym.kind, depth);
		match self.scopes.last_mut()
		{
		Some(s) => s.insert(sym.name.clone(), sym),
		None => None,
		}
	}

	/// Binding recorded on an identifier expression
	pub fn binding(&self, name: &str) -> Option<Binding>
	{
		self.lookup_with_depth(name).map(|(s, d)| Binding { kind: s.kind, scope_depth: d })
	}

	/// The type named by a typedef (if `name` is one in scope)
	pub fn typedef(&self, name: &str) -> Option<&Type>
	{
		match self.lookup(name)
		{
		Some(s) if s.kind == SymbolKind::Typedef => Some(&s.ty),
		_ => None,
		}
	}

	pub fn defer_call(&mut self, name: String, span: Span)
	{
		self.deferred_calls.push( (name, span) );
	}
	pub fn take_deferred_calls(&mut self) -> Vec<(String,Span)>
	{
		::std::mem::replace(&mut self.deferred_calls, Vec::new())
	}

	/// File-scope symbols (in no particular order)
	pub fn globals(&self) -> impl Iterator<Item=&Symbol>
	{
		self.scopes[0].values()
	}
}
