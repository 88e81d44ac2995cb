//! Abstract syntax tree
//!
//! The tree is strictly owning (no cycles). Every node carries the `Span` of the source it was built from, and a
//! parent's span always covers its children.
use std::path::{Path,PathBuf};
use std::sync::Arc;

use crate::types::{Type,StorageClass,IntClass,FloatClass};

/// A location in a source file
#[derive(Debug,Copy,Clone,PartialEq,Eq,PartialOrd,Ord,Default)]
pub struct Pos
{
	/// 1-based line
	pub line: u32,
	/// 1-based column, counted in characters (not bytes)
	pub column: u32,
	/// Byte offset into the file
	pub offset: usize,
}

/// Source range, `lo` inclusive and `hi` exclusive
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct Span
{
	pub file: Arc<PathBuf>,
	pub lo: Pos,
	pub hi: Pos,
}
impl Span
{
	pub fn new(file: Arc<PathBuf>, lo: Pos, hi: Pos) -> Span {
		Span { file, lo, hi }
	}
	/// Zero-width span at the start of a file
	pub fn file_start(file: Arc<PathBuf>) -> Span {
		let p = Pos { line: 1, column: 1, offset: 0 };
		Span { file, lo: p, hi: p }
	}
	/// Span from the start of `self` to the end of `end`
	pub fn to(&self, end: &Span) -> Span {
		if self.file != end.file || end.hi < self.lo {
			return self.clone();
		}
		Span { file: self.file.clone(), lo: self.lo, hi: end.hi }
	}
	pub fn contains(&self, other: &Span) -> bool {
		self.file == other.file && self.lo <= other.lo && other.hi <= self.hi
	}
	pub fn path(&self) -> &Path {
		&self.file
	}
}
impl ::std::fmt::Display for Span
{
	fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
		write!(f, "{}:{}:{}", self.file.display(), self.lo.line, self.lo.column)
	}
}

/// Root of a parsed file
#[derive(Debug)]
pub struct TranslationUnit
{
	pub file: Arc<PathBuf>,
	pub items: Vec<Item>,
	/// Set when a fatal diagnostic stopped parsing; `items` then only holds what was completed before that point.
	pub is_partial: bool,
	pub span: Span,
}
impl TranslationUnit
{
	pub fn new(file: Arc<PathBuf>) -> TranslationUnit {
		TranslationUnit {
			span: Span::file_start(file.clone()),
			file: file,
			items: Vec::new(),
			is_partial: false,
		}
	}

	pub fn functions(&self) -> impl Iterator<Item=&FunctionDef> {
		self.items.iter().filter_map(|i| match i { Item::FunctionDef(f) => Some(f), _ => None })
	}
	pub fn function(&self, name: &str) -> Option<&FunctionDef> {
		self.functions().find(|f| f.decl.name == name)
	}
	pub fn prototypes(&self) -> impl Iterator<Item=&FunctionDecl> {
		self.items.iter().filter_map(|i| match i { Item::FunctionDecl(f) => Some(f), _ => None })
	}
	pub fn variables(&self) -> impl Iterator<Item=&VarDecl> {
		self.items.iter().filter_map(|i| match i { Item::VarDecl(v) => Some(v), _ => None })
	}
	pub fn registers(&self) -> impl Iterator<Item=&SpecialRegisterDecl> {
		self.items.iter().filter_map(|i| match i { Item::SpecialRegister(v) => Some(v), _ => None })
	}
	pub fn bits(&self) -> impl Iterator<Item=&SpecialBitDecl> {
		self.items.iter().filter_map(|i| match i { Item::SpecialBit(v) => Some(v), _ => None })
	}
}

/// Top-level item
#[derive(Debug,Clone,PartialEq)]
pub enum Item
{
	/// Prototype (no body)
	FunctionDecl(FunctionDecl),
	FunctionDef(FunctionDef),
	VarDecl(VarDecl),
	/// `typedef <type> NAME;`
	Typedef(String, Type, Span),
	/// `sfr NAME = ADDR;`
	SpecialRegister(SpecialRegisterDecl),
	/// `sbit NAME = ADDR;`
	SpecialBit(SpecialBitDecl),
}
impl Item
{
	pub fn span(&self) -> &Span {
		match self
		{
		Item::FunctionDecl(v) => &v.span,
		Item::FunctionDef(v) => &v.span,
		Item::VarDecl(v) => &v.span,
		Item::Typedef(_, _, s) => s,
		Item::SpecialRegister(v) => &v.span,
		Item::SpecialBit(v) => &v.span,
		}
	}
}

#[derive(Debug,Clone,PartialEq)]
pub struct Param
{
	pub ty: Type,
	pub name: Option<String>,
}

#[derive(Debug,Clone,PartialEq)]
pub struct FunctionSig
{
	pub ret: Type,
	pub params: Vec<Param>,
	pub is_variadic: bool,
	/// `f()` - old-style declaration, argument list is not checked
	pub unspecified_params: bool,
}
impl FunctionSig
{
	/// Compare parameter/return types, ignoring names
	pub fn matches(&self, other: &FunctionSig) -> bool {
		if self.ret != other.ret {
			return false;
		}
		if self.unspecified_params || other.unspecified_params {
			return true;
		}
		self.is_variadic == other.is_variadic
			&& self.params.len() == other.params.len()
			&& self.params.iter().zip(other.params.iter()).all(|(a,b)| a.ty == b.ty)
	}
}

/// Hardware interrupt vector serviced by a handler
#[derive(Debug,Clone,PartialEq,Eq)]
pub enum InterruptVector
{
	Number(u32),
	/// Symbolic vector that could not be resolved to a number (e.g. from an unavailable vendor header)
	Named(String),
}

/// Interrupt handler marker.
///
/// Both `void f(void) interrupt 1` and `__attribute__((interrupt(1))) void f(void)` produce the same value here.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct InterruptAttribute
{
	/// `None` for a bare `__attribute__((interrupt))`
	pub vector: Option<InterruptVector>,
	/// `using N` register bank
	pub register_bank: Option<u8>,
}

/// An `__attribute__` entry that isn't understood by the parser, kept verbatim
#[derive(Debug,Clone,PartialEq)]
pub struct Attribute
{
	pub name: String,
	/// Argument tokens, rendered back to text
	pub args: Vec<String>,
}

#[derive(Debug,Clone,PartialEq)]
pub struct FunctionDecl
{
	pub name: String,
	pub sig: FunctionSig,
	pub storage: Option<StorageClass>,
	pub interrupt: Option<InterruptAttribute>,
	pub attributes: Vec<Attribute>,
	pub span: Span,
}

#[derive(Debug,Clone,PartialEq)]
pub struct FunctionDef
{
	pub decl: FunctionDecl,
	pub body: Block,
	/// Span of the earlier prototype this definition was unified with
	pub prototype: Option<Span>,
	pub span: Span,
}

#[derive(Debug,Clone,PartialEq)]
pub struct VarDecl
{
	pub name: String,
	pub ty: Type,
	pub storage: Option<StorageClass>,
	pub init: Option<Node>,
	pub span: Span,
}

#[derive(Debug,Clone,PartialEq)]
pub struct SpecialRegisterDecl
{
	pub name: String,
	pub address: u64,
	pub span: Span,
}

#[derive(Debug,Clone,PartialEq)]
pub enum BitAddress
{
	/// `sbit X = 0xAF;`
	Absolute(u64),
	/// `sbit X = REG ^ BIT;` - `address` is filled when `REG` is a known `sfr`
	RegisterBit {
		register: String,
		bit: u8,
		address: Option<u64>,
	},
}

#[derive(Debug,Clone,PartialEq)]
pub struct SpecialBitDecl
{
	pub name: String,
	pub address: BitAddress,
	pub span: Span,
}
impl SpecialBitDecl
{
	/// Resolved bit address, if known
	pub fn bit_address(&self) -> Option<u64> {
		match self.address
		{
		BitAddress::Absolute(v) => Some(v),
		BitAddress::RegisterBit { address, .. } => address,
		}
	}
}

pub type Block = Vec<Statement>;

#[derive(Debug,Clone,PartialEq)]
pub struct Statement
{
	pub kind: StatementKind,
	pub span: Span,
}

#[derive(Debug,Clone,PartialEq)]
pub enum StatementKind
{
	Empty,
	VarDef(Vec<VarDecl>),
	Expr(Node),
	Block(Block),

	IfStatement {
		cond: Node,
		true_arm: Block,
		else_arm: Option<Block>,
	},
	WhileLoop {
		cond: Node,
		body: Block,
	},
	DoWhileLoop {
		body: Block,
		cond: Node,
	},
	ForLoop {
		init: Option<ForInit>,
		cond: Option<Node>,
		inc: Option<Node>,
		body: Block,
	},
	Switch(Node, Block),
	Case(Node),
	Default,

	Break,
	Continue,
	Return(Option<Node>),
}

#[derive(Debug,Clone,PartialEq)]
pub enum ForInit
{
	Expr(Node),
	Definition(Vec<VarDecl>),
}

/// Binding of an identifier to the symbol it referred to when parsed
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct Binding
{
	pub kind: crate::symbols::SymbolKind,
	pub scope_depth: usize,
}

#[derive(Debug,Clone,PartialEq)]
pub enum Literal
{
	Integer(u64, IntClass),
	Float(f64, FloatClass),
	Character(u64),
	String(String),
}

/// Expression node
#[derive(Debug,Clone,PartialEq)]
pub struct Node
{
	pub kind: NodeKind,
	pub span: Span,
}

#[derive(Debug,Clone,PartialEq)]
pub enum NodeKind
{
	/// Identifier, with the symbol it resolved to (`None` if not declared at the point of use)
	Identifier(String, Option<Binding>),
	Literal(Literal),
	/// `{ a, b, c }` initialiser
	ListLiteral(Vec<Node>),

	/// `a, b`
	Comma(Vec<Node>),
	Assignment(Box<Node>, Box<Node>),
	CompoundAssignment(BinOp, Box<Node>, Box<Node>),
	Ternary(Box<Node>, Box<Node>, Box<Node>),
	BinaryOp(BinOp, Box<Node>, Box<Node>),
	UnaryOp(UniOp, Box<Node>),
	Call(Box<Node>, Vec<Node>),

	Cast(Type, Box<Node>),
	SizeofType(Type),
	SizeofExpr(Box<Node>),
	Index(Box<Node>, Box<Node>),
	Member(Box<Node>, String),
	DerefMember(Box<Node>, String),
}

#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum BinOp
{
	LogicOr,
	LogicAnd,

	BitOr,
	BitXor,
	BitAnd,

	CmpEqu,
	CmpNEqu,
	CmpLt,
	CmpLtE,
	CmpGt,
	CmpGtE,

	ShiftLeft,
	ShiftRight,

	Add,
	Sub,

	Mul,
	Div,
	Mod,
}

#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum UniOp
{
	PostInc,
	PostDec,
	PreInc,
	PreDec,
	Neg,
	Plus,
	BitNot,
	LogicNot,
	Deref,
	Address,
}

impl Node
{
	pub fn new(kind: NodeKind, span: Span) -> Node {
		Node { kind, span }
	}

	/// Value of an integer/character literal node
	pub fn literal_integer(&self) -> Option<u64> {
		match self.kind
		{
		NodeKind::Literal(Literal::Integer(v, _)) => Some(v),
		NodeKind::Literal(Literal::Character(v)) => Some(v),
		_ => None,
		}
	}

	/// Structural equality, ignoring spans and identifier bindings
	pub fn same_shape(&self, other: &Node) -> bool {
		use self::NodeKind::*;
		fn all(a: &[Node], b: &[Node]) -> bool {
			a.len() == b.len() && a.iter().zip(b.iter()).all(|(a,b)| a.same_shape(b))
		}
		match (&self.kind, &other.kind)
		{
		(Identifier(a, _), Identifier(b, _)) => a == b,
		(Literal(a), Literal(b)) => a == b,
		(ListLiteral(a), ListLiteral(b)) => all(a, b),
		(Comma(a), Comma(b)) => all(a, b),
		(Assignment(a1, a2), Assignment(b1, b2)) => a1.same_shape(b1) && a2.same_shape(b2),
		(CompoundAssignment(o1, a1, a2), CompoundAssignment(o2, b1, b2)) => o1 == o2 && a1.same_shape(b1) && a2.same_shape(b2),
		(Ternary(a1, a2, a3), Ternary(b1, b2, b3)) => a1.same_shape(b1) && a2.same_shape(b2) && a3.same_shape(b3),
		(BinaryOp(o1, a1, a2), BinaryOp(o2, b1, b2)) => o1 == o2 && a1.same_shape(b1) && a2.same_shape(b2),
		(UnaryOp(o1, a), UnaryOp(o2, b)) => o1 == o2 && a.same_shape(b),
		(Call(a, aa), Call(b, ba)) => a.same_shape(b) && all(aa, ba),
		(Cast(t1, a), Cast(t2, b)) => t1 == t2 && a.same_shape(b),
		(SizeofType(a), SizeofType(b)) => a == b,
		(SizeofExpr(a), SizeofExpr(b)) => a.same_shape(b),
		(Index(a1, a2), Index(b1, b2)) => a1.same_shape(b1) && a2.same_shape(b2),
		(Member(a, n1), Member(b, n2)) => n1 == n2 && a.same_shape(b),
		(DerefMember(a, n1), DerefMember(b, n2)) => n1 == n2 && a.same_shape(b),
		_ => false,
		}
	}

	/// Iterate the direct children of this node
	pub fn children(&self) -> Vec<&Node> {
		use self::NodeKind::*;
		match &self.kind
		{
		Identifier(..) | Literal(_) | SizeofType(_) => vec![],
		ListLiteral(v) | Comma(v) => v.iter().collect(),
		Assignment(a, b) | CompoundAssignment(_, a, b) | BinaryOp(_, a, b) | Index(a, b) => vec![a, b],
		Ternary(a, b, c) => vec![a, b, c],
		UnaryOp(_, a) | Cast(_, a) | SizeofExpr(a) | Member(a, _) | DerefMember(a, _) => vec![a],
		Call(f, args) => ::std::iter::once(&**f).chain(args.iter()).collect(),
		}
	}

	/// Total number of nodes in this subtree
	pub fn count(&self) -> usize {
		1 + self.children().into_iter().map(|c| c.count()).sum::<usize>()
	}
}
