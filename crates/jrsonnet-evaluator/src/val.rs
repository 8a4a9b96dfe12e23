//! The runtime value representation: primitives, lazily-forced thunks,
//! functions (closures, intrinsics, native callbacks) and the object model
//! (see [`crate::obj`]).
use std::{cell::RefCell, fmt, rc::Rc};

use jrsonnet_interner::IStr;
use jrsonnet_parser::{ExprLocation, LocExpr, ParamsDesc};

use crate::{
	ctx::Context,
	error::{Error::*, Result},
	function::call_function,
	obj::ObjValue,
	throw,
};

/// Distinguishes what a [`Val`] actually holds, used by `std.type` and by
/// error messages when an operation gets the wrong kind of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValType {
	Bool,
	Null,
	Str,
	Num,
	Arr,
	Obj,
	Func,
}
impl ValType {
	pub fn name(self) -> &'static str {
		match self {
			Self::Bool => "boolean",
			Self::Null => "null",
			Self::Str => "string",
			Self::Num => "number",
			Self::Arr => "array",
			Self::Obj => "object",
			Self::Func => "function",
		}
	}
}
impl fmt::Display for ValType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name())
	}
}

/// The states a [`Thunk`] moves through. Forcing is idempotent: once
/// `Evaluated`/`Failed`, re-forcing just returns the cached outcome.
/// Re-entering a thunk still in `Evaluating` is the only cycle that can
/// occur in a pure, non-recursive-without-function language -- it is
/// `local x = x; x`, and is reported as `InfiniteRecursionDetected`.
enum ThunkState {
	Unevaluated(Box<dyn FnOnce() -> Result<Val>>),
	Evaluating,
	Evaluated(Val),
	Failed(crate::error::LocError),
}

struct ThunkInternals(RefCell<ThunkState>);

/// A suspended, memoized computation with reference identity. Cloning a
/// `Thunk` is cheap (`Rc` bump) and shares the same memo cell, which is what
/// makes `local x = expensive(); [x, x]` compute `expensive()` once.
#[derive(Clone)]
pub struct Thunk(Rc<ThunkInternals>);

impl fmt::Debug for Thunk {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Thunk")
	}
}

impl Thunk {
	pub fn new(f: impl FnOnce() -> Result<Val> + 'static) -> Self {
		Self(Rc::new(ThunkInternals(RefCell::new(ThunkState::Unevaluated(
			Box::new(f),
		)))))
	}

	pub fn evaluated(v: Val) -> Self {
		Self(Rc::new(ThunkInternals(RefCell::new(ThunkState::Evaluated(v)))))
	}

	/// Forces the thunk, memoizing the result (value or error) on first
	/// call. Detects the infinite-recursion cycle via the `Evaluating`
	/// sentinel state rather than a separate graph walk.
	pub fn force(&self) -> Result<Val> {
		{
			let state = self.0 .0.borrow();
			match &*state {
				ThunkState::Evaluated(v) => return Ok(v.clone()),
				ThunkState::Failed(e) => return Err(e.clone()),
				ThunkState::Evaluating => throw!(InfiniteRecursionDetected),
				ThunkState::Unevaluated(_) => {}
			}
		}
		let f = match self.0 .0.replace(ThunkState::Evaluating) {
			ThunkState::Unevaluated(f) => f,
			_ => unreachable!("checked above"),
		};
		match f() {
			Ok(v) => {
				*self.0 .0.borrow_mut() = ThunkState::Evaluated(v.clone());
				Ok(v)
			}
			Err(e) => {
				*self.0 .0.borrow_mut() = ThunkState::Failed(e.clone());
				Err(e)
			}
		}
	}
}

/// A normal (non-builtin) Jsonnet function: captured defining environment,
/// declared parameters (with optional default-value expressions), and body.
#[derive(Debug)]
pub struct FuncDesc {
	pub name: IStr,
	pub ctx: Context,
	pub params: ParamsDesc,
	pub body: LocExpr,
}

impl PartialEq for FuncDesc {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.ctx == other.ctx && self.params == other.params
	}
}
pub type NativeFn = Rc<dyn Fn(&[Val]) -> Result<Val>>;

/// A native function registered through `std.native`: declares a
/// parameter list (so normal call-argument binding still applies) and
/// receives already-forced values, per §6.4.
pub struct NativeFunction {
	pub name: IStr,
	pub params: Vec<IStr>,
	pub func: NativeFn,
}
impl fmt::Debug for NativeFunction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NativeFunction").field("name", &self.name).finish()
	}
}

pub type IntrinsicFn = fn(Context, Option<&ExprLocation>, &[Thunk]) -> Result<Val>;

/// A `std.*` builtin's registration: its declared parameter names, so named
/// calls (`std.substr(str = s, from = 0, len = 3)`) bind the same way a
/// [`NativeFunction`] does, plus the bare function pointer.
pub struct IntrinsicDesc {
	pub name: IStr,
	pub params: Vec<IStr>,
	pub func: IntrinsicFn,
}
impl fmt::Debug for IntrinsicDesc {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("IntrinsicDesc").field("name", &self.name).finish()
	}
}

#[derive(Clone)]
pub enum FuncVal {
	/// `function(x) ...` written in Jsonnet source.
	Normal(Rc<FuncDesc>),
	/// A `std.*` builtin implemented natively in Rust.
	Intrinsic(Rc<IntrinsicDesc>),
	/// A function registered by the embedder via `std.native`.
	Native(Rc<NativeFunction>),
}

impl fmt::Debug for FuncVal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "FuncVal({})", self.name())
	}
}

impl PartialEq for FuncVal {
	// Functions are never equal to each other (spec §4.5); this impl exists
	// only so `Val` can derive-free `PartialEq` on the other variants
	// without hand-rolling a match everywhere -- the evaluator's `==`
	// operator rejects function comparisons before reaching here.
	fn eq(&self, _other: &Self) -> bool {
		false
	}
}

impl FuncVal {
	pub fn name(&self) -> IStr {
		match self {
			Self::Normal(f) => f.name.clone(),
			Self::Intrinsic(desc) => format!("std.{}", desc.name).into(),
			Self::Native(n) => format!("native.{}", n.name).into(),
		}
	}

	pub fn params_len(&self) -> usize {
		match self {
			Self::Normal(f) => f.params.len(),
			Self::Intrinsic(desc) => desc.params.len(),
			Self::Native(n) => n.params.len(),
		}
	}

	pub fn call(&self, ctx: Context, loc: Option<&ExprLocation>, args: &crate::function::Args) -> Result<Val> {
		call_function(self, ctx, loc, args)
	}

	/// Invokes with already-evaluated positional values, used by stdlib
	/// combinators (`std.map`, `std.filter`, `std.sort`, ...) that already
	/// hold forced values and don't need lazy argument passing.
	pub fn call_values(&self, ctx: Context, args: &[Val]) -> Result<Val> {
		let thunks: Vec<Thunk> = args.iter().cloned().map(Thunk::evaluated).collect();
		let args = crate::function::Args {
			positional: thunks,
			named: Vec::new(),
		};
		self.call(ctx, None, &args)
	}
}

/// Tagged union of every runtime value kind (spec §3).
#[derive(Debug, Clone)]
pub enum Val {
	Null,
	Bool(bool),
	Num(f64),
	Str(Rc<str>),
	Arr(Rc<Vec<Thunk>>),
	Obj(ObjValue),
	Func(Rc<FuncVal>),
}

impl Val {
	pub fn value_type(&self) -> ValType {
		match self {
			Self::Null => ValType::Null,
			Self::Bool(_) => ValType::Bool,
			Self::Num(_) => ValType::Num,
			Self::Str(_) => ValType::Str,
			Self::Arr(_) => ValType::Arr,
			Self::Obj(_) => ValType::Obj,
			Self::Func(_) => ValType::Func,
		}
	}

	pub fn checked_num(n: f64) -> Result<Self> {
		if n.is_finite() {
			Ok(Self::Num(n))
		} else {
			throw!(RuntimeError(format!("not a finite double: {n}")))
		}
	}

	pub fn assert_type(&self, context: &'static str, ty: ValType) -> Result<()> {
		if self.value_type() != ty {
			throw!(TypeMismatch(context, vec![ty], self.value_type()))
		}
		Ok(())
	}

	pub fn as_bool(&self, context: &'static str) -> Result<bool> {
		match self {
			Self::Bool(b) => Ok(*b),
			_ => throw!(TypeMismatch(context, vec![ValType::Bool], self.value_type())),
		}
	}
	pub fn as_str(&self, context: &'static str) -> Result<Rc<str>> {
		match self {
			Self::Str(s) => Ok(s.clone()),
			_ => throw!(TypeMismatch(context, vec![ValType::Str], self.value_type())),
		}
	}
	pub fn as_num(&self, context: &'static str) -> Result<f64> {
		match self {
			Self::Num(n) => Ok(*n),
			_ => throw!(TypeMismatch(context, vec![ValType::Num], self.value_type())),
		}
	}
	pub fn as_arr(&self, context: &'static str) -> Result<Rc<Vec<Thunk>>> {
		match self {
			Self::Arr(a) => Ok(a.clone()),
			_ => throw!(TypeMismatch(context, vec![ValType::Arr], self.value_type())),
		}
	}
	pub fn as_obj(&self, context: &'static str) -> Result<ObjValue> {
		match self {
			Self::Obj(o) => Ok(o.clone()),
			_ => throw!(TypeMismatch(context, vec![ValType::Obj], self.value_type())),
		}
	}
	pub fn as_func(&self, context: &'static str) -> Result<Rc<FuncVal>> {
		match self {
			Self::Func(f) => Ok(f.clone()),
			_ => throw!(TypeMismatch(context, vec![ValType::Func], self.value_type())),
		}
	}

	/// `std.toString`/implicit string coercion used by `+` when mixing a
	/// string with a primitive.
	pub fn to_display_string(&self) -> Result<Rc<str>> {
		Ok(match self {
			Self::Bool(true) => "true".into(),
			Self::Bool(false) => "false".into(),
			Self::Null => "null".into(),
			Self::Str(s) => s.clone(),
			_ => crate::manifest::manifest_json(self, "", crate::manifest::JsonFormat::ToString)?.into(),
		})
	}
}

/// Native implementation of `std.primitiveEquals`: only compares primitive
/// kinds, and raises on arrays/objects/functions.
pub fn primitive_equals(a: &Val, b: &Val) -> Result<bool> {
	Ok(match (a, b) {
		(Val::Bool(a), Val::Bool(b)) => a == b,
		(Val::Null, Val::Null) => true,
		(Val::Str(a), Val::Str(b)) => a == b,
		(Val::Num(a), Val::Num(b)) => a == b,
		(Val::Func(_), Val::Func(_)) => throw!(RuntimeError("cannot test equality of functions".into())),
		(a, b) if a.value_type() != b.value_type() => false,
		_ => throw!(RuntimeError(
			"primitiveEquals operates on primitive types, got a composite value".into()
		)),
	})
}

/// Structural equality used by `==`/`!=` (spec §4.5): forces arrays/visible
/// object fields recursively; `NaN != NaN`; functions never compare equal
/// (and comparing them is an error).
pub fn equals(a: &Val, b: &Val) -> Result<bool> {
	if a.value_type() != b.value_type() {
		return Ok(false);
	}
	match (a, b) {
		(Val::Arr(a), Val::Arr(b)) => {
			if a.len() != b.len() {
				return Ok(false);
			}
			for (a, b) in a.iter().zip(b.iter()) {
				if !equals(&a.force()?, &b.force()?)? {
					return Ok(false);
				}
			}
			Ok(true)
		}
		(Val::Obj(a), Val::Obj(b)) => {
			let mut af = a.visible_fields();
			let mut bf = b.visible_fields();
			af.sort();
			bf.sort();
			if af != bf {
				return Ok(false);
			}
			for field in af {
				let av = a.get(field.clone())?.expect("field exists");
				let bv = b.get(field)?.expect("field exists");
				if !equals(&av, &bv)? {
					return Ok(false);
				}
			}
			Ok(true)
		}
		(Val::Func(_), Val::Func(_)) => throw!(RuntimeError("cannot test equality of functions".into())),
		(a, b) => primitive_equals(a, b),
	}
}

/// Ordering used by `<`/`<=`/`>`/`>=`: numbers, strings, and arrays
/// (lexicographically by element) only.
pub fn compare(a: &Val, b: &Val) -> Result<std::cmp::Ordering> {
	use std::cmp::Ordering;
	Ok(match (a, b) {
		(Val::Num(a), Val::Num(b)) => a.partial_cmp(b).unwrap_or(Ordering::Greater),
		(Val::Str(a), Val::Str(b)) => a.cmp(b),
		(Val::Arr(a), Val::Arr(b)) => {
			for (a, b) in a.iter().zip(b.iter()) {
				let ord = compare(&a.force()?, &b.force()?)?;
				if ord != Ordering::Equal {
					return Ok(ord);
				}
			}
			a.len().cmp(&b.len())
		}
		(a, b) => throw!(RuntimeError(format!(
			"{} and {} are not comparable",
			a.value_type(),
			b.value_type()
		))),
	})
}
