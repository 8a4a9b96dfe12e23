use std::{
	fmt::{Debug, Display},
	ops::Deref,
	path::{Path, PathBuf},
	rc::Rc,
};

use jrsonnet_interner::IStr;

/// Field hiddenness, in increasing order of "stubbornness":
/// a `Normal` field can be hidden by a later `Hidden` one, but a later
/// `Unhide` always wins over both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
	/// `:`
	Normal,
	/// `::`
	Hidden,
	/// `:::`
	Unhide,
}

impl Visibility {
	pub fn is_visible(&self) -> bool {
		matches!(self, Self::Normal | Self::Unhide)
	}
}

#[derive(Debug, PartialEq)]
pub enum FieldName {
	/// `{fixed: 2}`
	Fixed(IStr),
	/// `{["dyn"+"amic"]: 3}`
	Dyn(LocExpr),
}

#[derive(Debug, PartialEq)]
pub struct AssertStmt(pub LocExpr, pub Option<LocExpr>);

#[derive(Debug, PartialEq)]
pub struct FieldMember {
	pub name: FieldName,
	pub plus: bool,
	pub params: Option<ParamsDesc>,
	pub visibility: Visibility,
	pub value: LocExpr,
}

#[derive(Debug, PartialEq)]
pub enum Member {
	Field(FieldMember),
	BindStmt(BindSpec),
	AssertStmt(AssertStmt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpType {
	Plus,
	Minus,
	BitNot,
	Not,
}

impl Display for UnaryOpType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use UnaryOpType::*;
		write!(
			f,
			"{}",
			match self {
				Plus => "+",
				Minus => "-",
				BitNot => "~",
				Not => "!",
			}
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpType {
	Mul,
	Div,
	Mod,

	Add,
	Sub,

	Lhs,
	Rhs,

	Lt,
	Gt,
	Lte,
	Gte,

	BitAnd,
	BitOr,
	BitXor,

	Eq,
	Neq,

	And,
	Or,

	/// `a in b`, equivalent to `std.objectHasEx(b, a, true)`
	In,
}

impl Display for BinaryOpType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use BinaryOpType::*;
		write!(
			f,
			"{}",
			match self {
				Mul => "*",
				Div => "/",
				Mod => "%",
				Add => "+",
				Sub => "-",
				Lhs => "<<",
				Rhs => ">>",
				Lt => "<",
				Gt => ">",
				Lte => "<=",
				Gte => ">=",
				BitAnd => "&",
				BitOr => "|",
				BitXor => "^",
				Eq => "==",
				Neq => "!=",
				And => "&&",
				Or => "||",
				In => "in",
			}
		)
	}
}

/// name, default value
#[derive(Debug, PartialEq)]
pub struct Param(pub IStr, pub Option<LocExpr>);

/// Defined function parameters, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsDesc(pub Rc<Vec<Param>>);

impl Deref for ParamsDesc {
	type Target = Vec<Param>;
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

#[derive(Debug, PartialEq)]
pub struct ArgsDesc {
	pub unnamed: Vec<LocExpr>,
	pub named: Vec<(IStr, LocExpr)>,
}
impl ArgsDesc {
	pub fn new(unnamed: Vec<LocExpr>, named: Vec<(IStr, LocExpr)>) -> Self {
		Self { unnamed, named }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindSpec {
	pub name: IStr,
	pub params: Option<ParamsDesc>,
	pub value: LocExpr,
}

#[derive(Debug, PartialEq)]
pub struct IfSpecData(pub LocExpr);

#[derive(Debug, PartialEq)]
pub struct ForSpecData(pub IStr, pub LocExpr);

#[derive(Debug, PartialEq)]
pub enum CompSpec {
	IfSpec(IfSpecData),
	ForSpec(ForSpecData),
}

#[derive(Debug, PartialEq)]
pub struct ObjComp {
	pub pre_locals: Vec<BindSpec>,
	pub key: LocExpr,
	pub plus: bool,
	pub value: LocExpr,
	pub post_locals: Vec<BindSpec>,
	pub compspecs: Vec<CompSpec>,
}

#[derive(Debug, PartialEq)]
pub enum ObjBody {
	MemberList(Vec<Member>),
	ObjComp(ObjComp),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum LiteralType {
	This,
	Super,
	Dollar,
	Null,
	True,
	False,
}

#[derive(Debug, PartialEq)]
pub struct SliceDesc {
	pub start: Option<LocExpr>,
	pub end: Option<LocExpr>,
	pub step: Option<LocExpr>,
}

/// Surface syntax tree, produced directly by the parser. Desugaring to the
/// evaluator's core representation happens one layer up, in
/// `jrsonnet-evaluator`.
#[derive(Debug, PartialEq)]
pub enum Expr {
	Literal(LiteralType),

	/// String value: `"hello"`
	Str(IStr),
	/// Number: `1`, `2.0`, `2e+20`
	Num(f64),
	/// Variable name: `test`
	Var(IStr),

	/// Array of expressions: `[1, 2, "Hello"]`
	Arr(Vec<LocExpr>),
	/// Array comprehension: `[x * 2 for x in arr]`
	ArrComp(LocExpr, Vec<CompSpec>),

	/// Object: `{a: 2}`
	Obj(ObjBody),
	/// Object extension: `var1 {b: 2}`
	ObjExtend(LocExpr, ObjBody),

	/// `(obj)`
	Parened(LocExpr),

	/// `-2`
	UnaryOp(UnaryOpType, LocExpr),
	/// `2 - 2`
	BinaryOp(LocExpr, BinaryOpType, LocExpr),
	/// `assert 2 == 2 : "Math is broken"; rest`
	AssertExpr(AssertStmt, LocExpr),
	/// `local a = 2; { b: a }`
	LocalExpr(Vec<BindSpec>, LocExpr),

	/// `import "hello.libsonnet"`
	Import(PathBuf),
	/// `importstr "file.txt"`
	ImportStr(PathBuf),
	/// `importbin "file.bin"`
	ImportBin(PathBuf),
	/// `error "I'm broken"`
	ErrorStmt(LocExpr),
	/// `a(b, c)`
	Apply(LocExpr, ArgsDesc, bool),
	/// `a[b]`
	Index(LocExpr, LocExpr),
	/// `a[b:c:d]`
	Slice(LocExpr, SliceDesc),
	/// `function(x) x`
	Function(ParamsDesc, LocExpr),
	/// `if true == false then 1 else 2`
	IfElse {
		cond: IfSpecData,
		cond_then: LocExpr,
		cond_else: Option<LocExpr>,
	},
}

/// file, begin byte offset, end byte offset. `line`/`col` are computed from
/// the offset on demand (only error paths need them), so spans stay cheap to
/// construct and clone.
#[derive(Clone, PartialEq)]
pub struct ExprLocation(pub Rc<Path>, pub usize, pub usize);

impl Debug for ExprLocation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}:{:?}-{:?}", self.0, self.1, self.2)
	}
}

/// Holds an AST expression together with its location in the source file.
#[derive(Clone, PartialEq)]
pub struct LocExpr(pub Rc<Expr>, pub Option<ExprLocation>);

impl Debug for LocExpr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if f.alternate() {
			write!(f, "{:#?}", self.0)?;
		} else {
			write!(f, "{:?}", self.0)?;
		}
		if let Some(loc) = &self.1 {
			write!(f, " from {:?}", loc)?;
		}
		Ok(())
	}
}

/// Creates a `LocExpr` from an `Expr` and its location components.
#[macro_export]
macro_rules! loc_expr {
	($expr:expr, $need_loc:expr, ($name:expr, $start:expr, $end:expr)) => {
		$crate::LocExpr(
			std::rc::Rc::new($expr),
			if $need_loc {
				Some($crate::ExprLocation($name, $start, $end))
			} else {
				None
			},
		)
	};
}

/// Creates a `LocExpr` without location info. Only used in hand-written
/// fixtures (tests, desugared synthetic nodes).
#[macro_export]
macro_rules! el {
	($expr:expr) => {
		$crate::LocExpr(std::rc::Rc::new($expr), None)
	};
}
