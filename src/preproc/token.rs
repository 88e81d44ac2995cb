use crate::ast::Span;

#[allow(non_camel_case_types)]
#[derive(Debug,PartialEq,Clone)]
/// Token type (result of lexing/pre-processor)
pub enum Token
{
	EOF,

	/// A character the lexer doesn't recognise (reported and dropped by the pre-processor)
	Invalid(char),

	// -- Expression leaves
	Integer(u64, crate::types::IntClass, String),
	Float(f64, crate::types::FloatClass, String),
	Character(u64, String),
	String(String),
	Ident(String),

	// -- Symbols
	Hash,
	DoubleHash,
	Tilde,
	Exclamation,
	Period,
	DerefMember,
	Comma,
	Semicolon,
	Star,
	Slash,
	Vargs,
	QuestionMark,
	Colon,

	Assign,
	AssignAdd,
	AssignSub,
	AssignMul,
	AssignDiv,
	AssignMod,
	AssignBitOr,
	AssignBitAnd,
	AssignBitXor,
	AssignShiftLeft,
	AssignShiftRight,

	ShiftRight,
	ShiftLeft,

	Equality,
	NotEquals,
	Lt,
	Gt,
	LtE,
	GtE,

	Percent,
	Plus,
	Minus,
	DoublePlus,	// ungood (bad joke, sorry)
	DoubleMinus,

	Ampersand,
	Pipe,
	Caret,
	DoubleAmpersand,
	DoublePipe,

	// -- Brackets
	BraceOpen,
	BraceClose,
	ParenOpen,
	ParenClose,
	SquareOpen,
	SquareClose,

	// -- Reserved Words
	// - Storage classes
	Rword_typedef,
	Rword_auto,
	Rword_extern,
	Rword_static,
	Rword_register,
	Rword_inline,
	// - Qualifiers
	Rword_const,
	Rword_volatile,
	Rword_restrict,
	// - Types
	Rword_void,
	Rword_Bool,
	Rword_signed,
	Rword_unsigned,
	Rword_char,
	Rword_short,
	Rword_int,
	Rword_long,
	Rword_float,
	Rword_double,
	// - Blocks
	Rword_if,
	Rword_else,
	Rword_while,
	Rword_do,
	Rword_for,
	Rword_switch,
	// - Flow
	Rword_continue,
	Rword_break,
	Rword_return,
	Rword_case,
	Rword_default,
	// - Meta
	Rword_sizeof,
	// - 8051 / vendor extensions
	Rword_sfr,
	Rword_sbit,
	Rword_interrupt,
	Rword_gcc_attribute,
}

/// A token along with where it came from
#[derive(Debug,Clone,PartialEq)]
pub struct Lexeme
{
	pub token: Token,
	pub span: Span,
	/// First token on its (logical) line
	pub start_of_line: bool,
	/// Whitespace (or a comment) separates this from the previous token
	pub leading_space: bool,
}

/// Convert identifiers that are reserved words into their token (done after pre-processing, so macros can shadow them)
pub fn map_keywords(tok: Token) -> Token
{
	match tok
	{
	Token::Ident(ident) => match &ident[..]
		{
		"typedef" => Token::Rword_typedef,
		"auto"    => Token::Rword_auto,
		"extern"  => Token::Rword_extern,
		"static"  => Token::Rword_static,
		"register"=> Token::Rword_register,
		"inline"  => Token::Rword_inline,
		"__inline"=> Token::Rword_inline,

		"const"    => Token::Rword_const,
		"volatile" => Token::Rword_volatile,
		"restrict" => Token::Rword_restrict,

		"void"  => Token::Rword_void,
		"_Bool" => Token::Rword_Bool,
		"signed"   => Token::Rword_signed,
		"unsigned" => Token::Rword_unsigned,
		"char"  => Token::Rword_char,
		"short" => Token::Rword_short,
		"int"   => Token::Rword_int,
		"long"  => Token::Rword_long,
		"float"  => Token::Rword_float,
		"double" => Token::Rword_double,

		"if"    => Token::Rword_if,
		"else"  => Token::Rword_else,
		"do"    => Token::Rword_do,
		"while" => Token::Rword_while,
		"for"   => Token::Rword_for,
		"switch" => Token::Rword_switch,

		"case" => Token::Rword_case,
		"default" => Token::Rword_default,
		"return" => Token::Rword_return,
		"break"  => Token::Rword_break,
		"continue" => Token::Rword_continue,

		"sizeof" => Token::Rword_sizeof,

		"sfr"  => Token::Rword_sfr,
		"sbit" => Token::Rword_sbit,
		"interrupt" => Token::Rword_interrupt,
		"__interrupt" => Token::Rword_interrupt,
		"__attribute__" => Token::Rword_gcc_attribute,
		"__attribute" => Token::Rword_gcc_attribute,
		_ => Token::Ident(ident),
		},
	t => t,
	}
}

impl Token
{
	/// Tokens that error recovery resynchronises on
	pub fn is_statement_boundary(&self) -> bool
	{
		match self
		{
		Token::Semicolon | Token::BraceOpen | Token::BraceClose | Token::EOF => true,
		_ => false,
		}
	}

	/// Source text of a reserved word
	fn rword_str(&self) -> Option<&'static str>
	{
		Some(match self
		{
		Token::Rword_typedef => "typedef",
		Token::Rword_auto => "auto",
		Token::Rword_extern => "extern",
		Token::Rword_static => "static",
		Token::Rword_register => "register",
		Token::Rword_inline => "inline",
		Token::Rword_const => "const",
		Token::Rword_volatile => "volatile",
		Token::Rword_restrict => "restrict",
		Token::Rword_void => "void",
		Token::Rword_Bool => "_Bool",
		Token::Rword_signed => "signed",
		Token::Rword_unsigned => "unsigned",
		Token::Rword_char => "char",
		Token::Rword_short => "short",
		Token::Rword_int => "int",
		Token::Rword_long => "long",
		Token::Rword_float => "float",
		Token::Rword_double => "double",
		Token::Rword_if => "if",
		Token::Rword_else => "else",
		Token::Rword_while => "while",
		Token::Rword_do => "do",
		Token::Rword_for => "for",
		Token::Rword_switch => "switch",
		Token::Rword_continue => "continue",
		Token::Rword_break => "break",
		Token::Rword_return => "return",
		Token::Rword_case => "case",
		Token::Rword_default => "default",
		Token::Rword_sizeof => "sizeof",
		Token::Rword_sfr => "sfr",
		Token::Rword_sbit => "sbit",
		Token::Rword_interrupt => "interrupt",
		Token::Rword_gcc_attribute => "__attribute__",
		_ => return None,
		})
	}
}

/// Renders the token as (approximately) the source text it came from
impl ::std::fmt::Display for Token
{
	fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result
	{
		if let Some(s) = self.rword_str() {
			return f.write_str(s);
		}
		f.write_str(match self
		{
		Token::EOF => "<eof>",
		Token::Invalid(c) => return write!(f, "{}", c),
		// -- Expression leaves
		Token::Integer(_, _, s) => s,
		Token::Float(_, _, s) => s,
		Token::Character(_, s) => s,
		Token::String(s) => return write!(f, "{:?}", s),
		Token::Ident(n) => n,

		// -- Symbols
		Token::Hash => "#",
		Token::DoubleHash => "##",
		Token::Tilde => "~",
		Token::Exclamation => "!",
		Token::Period => ".",
		Token::DerefMember => "->",
		Token::Comma => ",",
		Token::Semicolon => ";",
		Token::Star => "*",
		Token::Slash => "/",
		Token::Vargs => "...",
		Token::QuestionMark => "?",
		Token::Colon => ":",

		Token::Assign => "=",
		Token::AssignAdd => "+=",
		Token::AssignSub => "-=",
		Token::AssignMul => "*=",
		Token::AssignDiv => "/=",
		Token::AssignMod => "%=",
		Token::AssignBitOr => "|=",
		Token::AssignBitAnd => "&=",
		Token::AssignBitXor => "^=",
		Token::AssignShiftLeft => "<<=",
		Token::AssignShiftRight => ">>=",

		Token::ShiftRight => ">>",
		Token::ShiftLeft => "<<",

		Token::Equality => "==",
		Token::NotEquals => "!=",
		Token::Lt => "<",
		Token::Gt => ">",
		Token::LtE => "<=",
		Token::GtE => ">=",

		Token::Percent => "%",
		Token::Plus => "+",
		Token::Minus => "-",
		Token::DoublePlus => "++",
		Token::DoubleMinus => "--",

		Token::Ampersand => "&",
		Token::Pipe => "|",
		Token::Caret => "^",
		Token::DoubleAmpersand => "&&",
		Token::DoublePipe => "||",

		// -- Brackets
		Token::BraceOpen => "{",
		Token::BraceClose => "}",
		Token::ParenOpen => "(",
		Token::ParenClose => ")",
		Token::SquareOpen => "[",
		Token::SquareClose => "]",

		_ => return write!(f, "{:?}", self),
		})
	}
}
