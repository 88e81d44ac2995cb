//! C types
//!
//! Deliberately coarse: enough to tell integers, floats, pointers, arrays and function signatures apart for
//! redeclaration checks. No struct/union/enum layouts.

#[derive(PartialEq,Clone)]
pub struct Type
{
	pub basetype: BaseType,
	pub qualifiers: Qualifiers,
}

#[derive(PartialEq,Clone)]	/* Debug impl is manual */
pub enum BaseType
{
	Void,
	Bool,
	Float(FloatClass),
	Integer(IntClass),

	Pointer(Box<Type>),
	Array(Box<Type>, ArraySize),
	/// Return type and parameter types
	Function(Box<Type>, Vec<Type>),
}
#[derive(Clone,PartialEq)]
pub enum ArraySize
{
	None,
	Fixed(u64),
}

/// Boolean signedness
#[derive(Debug,PartialEq,Clone,Copy)]
pub enum Signedness
{
	Signed,
	Unsigned,
}
pub use self::Signedness::*;
impl Signedness {
	pub fn from_bool_signed(s: bool) -> Self {
		if s {
			Signedness::Signed
		}
		else {
			Signedness::Unsigned
		}
	}
	pub fn is_unsigned(&self) -> bool { *self == Signedness::Unsigned }
}
/// Qualifiers on a type (const, volatile, restrict)
// NOTE: `const volatile` is valid and has meaning (code can't change it, but hardware could)
#[derive(PartialEq,Clone,Default)]
pub struct Qualifiers {
	v: u8,
}
impl Qualifiers {
	pub fn new() -> Self { Qualifiers { v: 0 } }

	pub fn set_const(&mut self) -> &mut Self { self.v |= 1; self }
	pub fn set_volatile(&mut self) -> &mut Self { self.v |= 2; self }
	pub fn set_restrict(&mut self) -> &mut Self { self.v |= 4; self }

	pub fn is_const(&self) -> bool { self.v & 1 != 0 }
	pub fn is_volatile(&self) -> bool { self.v & 2 != 0 }
	pub fn is_restrict(&self) -> bool { self.v & 4 != 0 }

	pub fn merge_from(&mut self, other: &Qualifiers) {
		self.v |= other.v;
	}
}
impl ::std::fmt::Debug for Qualifiers {
	fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
		write!(f, "{}{}{}",
			if self.is_const() { "const " } else { "" },
			if self.is_volatile() { "volatile " } else { "" },
			if self.is_restrict() { "restrict " } else { "" },
			)
	}
}

/// Various integer types
#[derive(Debug,PartialEq,Clone,Copy)]
pub enum IntClass
{
	/// `char` (three variants: char, signed char, and unsigned char)
	Char(Option<Signedness>),
	/// `[un]signed short [int]`
	Short(Signedness),
	/// `[un]signed int`
	Int(Signedness),
	/// `[un]signed long [int]`
	Long(Signedness),
	/// `[un]signed long long [int]`
	LongLong(Signedness),
}
impl IntClass {
	pub fn char() -> Self { IntClass::Char(None) }
	pub const fn int() -> Self { IntClass::Int(Signed) }
}

#[derive(Debug,PartialEq,Clone,Copy)]
pub enum FloatClass
{
	Float,
	Double,
	LongDouble,
}

#[derive(Debug,PartialEq,Clone,Copy)]
pub enum StorageClass
{
	Auto,
	Extern,
	Static,
	Register,
}

impl ::std::fmt::Debug for Type
{
	fn fmt(&self, fmt: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error>
	{
		write!(fmt, "{:?}{:?}", self.qualifiers, self.basetype)
	}
}

impl ::std::fmt::Debug for BaseType
{
	fn fmt(&self, fmt: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error>
	{
		match self
		{
		&BaseType::Void => write!(fmt, "void"),
		&BaseType::Bool => write!(fmt, "_Bool"),
		&BaseType::Float(ref fc) => write!(fmt, "{:?}", fc),
		&BaseType::Integer(ref ic) => write!(fmt, "{:?}", ic),
		&BaseType::Array(ref typeref, ref size) => write!(fmt, "{:?}{}", typeref, size),
		&BaseType::Pointer(ref typeref) => write!(fmt, "*{:?}", typeref),
		&BaseType::Function(ref ret, ref args) => write!(fmt, "Fcn({:?}, {:?})", ret, args),
		}
	}
}

impl ::std::fmt::Display for ArraySize
{
	fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result
	{
		match self
		{
		&ArraySize::None => f.write_str("[]"),
		&ArraySize::Fixed(v) => write!(f, "[{}]", v),
		}
	}
}

/// C-ish rendering, used in diagnostics
impl ::std::fmt::Display for Type
{
	fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result
	{
		match self.basetype
		{
		BaseType::Pointer(ref inner) => write!(f, "{}*{:?}", inner, self.qualifiers),
		BaseType::Array(ref inner, ref size) => write!(f, "{}{}", inner, size),
		BaseType::Function(ref ret, ref args) => {
			write!(f, "{}(", ret)?;
			for (i,a) in args.iter().enumerate() {
				if i > 0 {
					f.write_str(", ")?;
				}
				write!(f, "{}", a)?;
			}
			f.write_str(")")
			},
		BaseType::Void => write!(f, "{:?}void", self.qualifiers),
		BaseType::Bool => write!(f, "{:?}_Bool", self.qualifiers),
		BaseType::Float(fc) => write!(f, "{:?}{}", self.qualifiers, match fc
			{
			FloatClass::Float => "float",
			FloatClass::Double => "double",
			FloatClass::LongDouble => "long double",
			}),
		BaseType::Integer(ic) => {
			write!(f, "{:?}", self.qualifiers)?;
			match ic
			{
			IntClass::Char(s) => write!(f, "{}char", match s { None => "", Some(Signed) => "signed ", Some(Unsigned) => "unsigned " }),
			IntClass::Short(s) => write!(f, "{}short", if s.is_unsigned() { "unsigned " } else { "" }),
			IntClass::Int(s) => write!(f, "{}int", if s.is_unsigned() { "unsigned " } else { "" }),
			IntClass::Long(s) => write!(f, "{}long", if s.is_unsigned() { "unsigned " } else { "" }),
			IntClass::LongLong(s) => write!(f, "{}long long", if s.is_unsigned() { "unsigned " } else { "" }),
			}
			},
		}
	}
}

impl Type
{
	pub fn new(basetype: BaseType, qualifiers: Qualifiers) -> Type
	{
		Type {
			basetype: basetype,
			qualifiers: qualifiers,
			}
	}
	pub fn new_bare(basetype: BaseType) -> Type
	{
		Type::new(basetype, Qualifiers::new())
	}
	pub fn int() -> Type
	{
		Type::new_bare(BaseType::Integer(IntClass::int()))
	}
	pub fn void() -> Type
	{
		Type::new_bare(BaseType::Void)
	}
	pub fn pointer_to(self) -> Type
	{
		Type::new_bare(BaseType::Pointer(Box::new(self)))
	}

	pub fn is_void(&self) -> bool
	{
		self.basetype == BaseType::Void
	}
	pub fn is_integer(&self) -> bool
	{
		match self.basetype
		{
		BaseType::Integer(_) | BaseType::Bool => true,
		_ => false,
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn display_types()
	{
		let uc = Type::new_bare(BaseType::Integer(IntClass::Char(Some(Unsigned))));
		assert_eq!(uc.to_string(), "unsigned char");
		assert_eq!(uc.clone().pointer_to().to_string(), "unsigned char*");
		let mut q = Qualifiers::new();
		q.set_volatile();
		let vi = Type::new(BaseType::Integer(IntClass::int()), q);
		assert_eq!(vi.to_string(), "volatile int");
		let f = Type::new_bare(BaseType::Function(Box::new(Type::int()), vec![uc, Type::int()]));
		assert_eq!(f.to_string(), "int(unsigned char, int)");
	}

	#[test]
	fn qualifiers_affect_equality()
	{
		let mut q = Qualifiers::new();
		q.set_const();
		assert!(Type::new(BaseType::Integer(IntClass::int()), q) != Type::int());
		assert!(Type::int().is_integer());
		assert!(Type::void().is_void());
	}
}
