//! The evaluator proper: dispatches over the (already desugared) core AST,
//! assembles object literals into [`ObjValue`]s, and implements `+` across
//! every value kind it's defined for (spec §4.5).
use std::{cell::Cell, cell::RefCell, rc::Rc};

use jrsonnet_interner::IStr;
use jrsonnet_parser::{BinaryOpType, Expr, FieldName, LiteralType, Member, ObjBody, UnaryOpType};
use rustc_hash::FxHashMap;

use crate::{
	ctx::Context,
	error::{Error::*, Result},
	function::Args,
	obj::{FieldSpec, ObjValue, ObjValueBuilder},
	throw,
	val::{FuncDesc, FuncVal, Thunk, Val, ValType},
};

thread_local! {
	static STACK_DEPTH: Cell<usize> = const { Cell::new(0) };
	static MAX_STACK_DEPTH: Cell<usize> = const { Cell::new(500) };
}

/// Overrides the call-stack depth limit (spec §5); the default of 500
/// matches the reference implementation's default.
pub fn set_max_stack_depth(n: usize) {
	MAX_STACK_DEPTH.with(|d| d.set(n));
}

/// Runs `f` with the call-stack depth counter incremented by one, failing
/// with [`Error::MaxStackFramesExceeded`] instead of overflowing the native
/// stack when a Jsonnet program recurses too deeply.
pub(crate) fn with_stack_frame<R>(f: impl FnOnce() -> Result<R>) -> Result<R> {
	let depth = STACK_DEPTH.with(|d| {
		let v = d.get() + 1;
		d.set(v);
		v
	});
	let result = if depth > MAX_STACK_DEPTH.with(Cell::get) {
		Err(MaxStackFramesExceeded.into())
	} else {
		f()
	};
	STACK_DEPTH.with(|d| d.set(d.get() - 1));
	result
}

pub fn evaluate(ctx: Context, expr: &jrsonnet_parser::LocExpr) -> Result<Val> {
	evaluate_inner(ctx, &expr.0, &expr.1)
}

fn evaluate_inner(ctx: Context, expr: &Expr, loc: &Option<jrsonnet_parser::ExprLocation>) -> Result<Val> {
	Ok(match expr {
		Expr::Literal(LiteralType::Null) => Val::Null,
		Expr::Literal(LiteralType::True) => Val::Bool(true),
		Expr::Literal(LiteralType::False) => Val::Bool(false),
		Expr::Literal(LiteralType::This) => {
			Val::Obj(ctx.this().cloned().ok_or(CantUseSelfOutsideOfObject)?)
		}
		Expr::Literal(LiteralType::Super) => {
			Val::Obj(ctx.super_obj().cloned().ok_or(CantUseSuperOutsideOfObject)?)
		}
		Expr::Literal(LiteralType::Dollar) => {
			Val::Obj(ctx.dollar().cloned().ok_or(NoTopLevelObjectFound)?)
		}
		Expr::Str(s) => Val::Str(Rc::from(s.as_str())),
		Expr::Num(n) => Val::Num(*n),
		Expr::Var(name) => ctx.binding(name)?.force()?,

		Expr::Arr(items) => {
			let arr = items
				.iter()
				.map(|item| {
					let ctx = ctx.clone();
					let item = item.clone();
					Thunk::new(move || evaluate(ctx.clone(), &item))
				})
				.collect();
			Val::Arr(Rc::new(arr))
		}
		Expr::ArrComp(..) => unreachable!("array comprehensions are removed by desugaring"),

		Expr::Obj(body) => evaluate_object(&ctx, body)?,
		Expr::ObjExtend(base, body) => {
			let base = evaluate(ctx.clone(), base)?.as_obj("left side of +")?;
			let ext = evaluate_object(&ctx, body)?.as_obj("right side of +")?;
			Val::Obj(ext.extend_from(base))
		}

		Expr::Parened(inner) => evaluate(ctx, inner)?,

		Expr::UnaryOp(op, inner) => evaluate_unary(*op, &evaluate(ctx, inner)?)?,
		Expr::BinaryOp(a, op, b) => evaluate_binary(ctx, *op, a, b)?,

		Expr::AssertExpr(..) => unreachable!("bare asserts are removed by desugaring"),
		Expr::LocalExpr(binds, rest) => {
			let inner_ctx = bind_locals(&ctx, binds);
			evaluate(inner_ctx, rest)?
		}

		Expr::Import(path) => crate::import::import_value(path, loc.as_ref())?,
		Expr::ImportStr(path) => Val::Str(crate::import::import_str(path, loc.as_ref())?),
		Expr::ImportBin(path) => {
			let bytes = crate::import::import_bin(path, loc.as_ref())?;
			let arr: Vec<Thunk> = bytes
				.iter()
				.map(|b| Thunk::evaluated(Val::Num(f64::from(*b))))
				.collect();
			Val::Arr(Rc::new(arr))
		}
		Expr::ErrorStmt(inner) => {
			let msg = evaluate(ctx, inner)?.to_display_string()?;
			throw!(RuntimeError(msg.to_string()))
		}
		Expr::Apply(f, args, tailstrict) => {
			let func = evaluate(ctx.clone(), f)?.as_func("function application")?;
			let args = evaluate_args(&ctx, args, *tailstrict)?;
			with_stack_frame(|| func.call(ctx, loc.as_ref(), &args))?
		}
		Expr::Index(a, b) => evaluate_index(ctx, a, b)?,
		Expr::Slice(..) => unreachable!("slices are removed by desugaring"),
		Expr::Function(params, body) => Val::Func(Rc::new(FuncVal::Normal(Rc::new(FuncDesc {
			name: "anonymous".into(),
			ctx,
			params: params.clone(),
			body: body.clone(),
		})))),
		Expr::IfElse {
			cond,
			cond_then,
			cond_else,
		} => {
			if evaluate(ctx.clone(), &cond.0)?.as_bool("if condition")? {
				evaluate(ctx, cond_then)?
			} else {
				match cond_else {
					Some(e) => evaluate(ctx, e)?,
					None => Val::Null,
				}
			}
		}
	})
}

fn evaluate_unary(op: UnaryOpType, val: &Val) -> Result<Val> {
	Ok(match (op, val) {
		(UnaryOpType::Not, Val::Bool(b)) => Val::Bool(!b),
		(UnaryOpType::Minus, Val::Num(n)) => Val::Num(-n),
		(UnaryOpType::BitNot, Val::Num(n)) => Val::Num(!(*n as i64) as f64),
		(UnaryOpType::Plus, Val::Num(n)) => Val::Num(*n),
		(op, v) => throw!(UnaryOperatorDoesNotOperateOnType(op, v.value_type())),
	})
}

fn evaluate_binary(
	ctx: Context,
	op: BinaryOpType,
	a: &jrsonnet_parser::LocExpr,
	b: &jrsonnet_parser::LocExpr,
) -> Result<Val> {
	// `&&`/`||` short-circuit, so `b` must stay unevaluated until we know
	// we need it.
	match op {
		BinaryOpType::And => {
			return Ok(Val::Bool(
				evaluate(ctx.clone(), a)?.as_bool("&& left side")?
					&& evaluate(ctx, b)?.as_bool("&& right side")?,
			));
		}
		BinaryOpType::Or => {
			return Ok(Val::Bool(
				evaluate(ctx.clone(), a)?.as_bool("|| left side")?
					|| evaluate(ctx, b)?.as_bool("|| right side")?,
			));
		}
		_ => {}
	}

	let av = evaluate(ctx.clone(), a)?;
	let bv = evaluate(ctx, b)?;
	Ok(match op {
		BinaryOpType::Add => add_values(&av, &bv)?,
		BinaryOpType::Sub => Val::checked_num(av.as_num("- left side")? - bv.as_num("- right side")?)?,
		BinaryOpType::Mul => Val::checked_num(av.as_num("* left side")? * bv.as_num("* right side")?)?,
		BinaryOpType::Div => {
			let divisor = bv.as_num("/ right side")?;
			if divisor == 0.0 {
				throw!(DivisionByZero);
			}
			Val::checked_num(av.as_num("/ left side")? / divisor)?
		}
		BinaryOpType::Mod => mod_values(&av, &bv)?,

		BinaryOpType::Eq => Val::Bool(crate::val::equals(&av, &bv)?),
		BinaryOpType::Neq => Val::Bool(!crate::val::equals(&av, &bv)?),
		BinaryOpType::Lt => Val::Bool(crate::val::compare(&av, &bv)? == std::cmp::Ordering::Less),
		BinaryOpType::Lte => Val::Bool(crate::val::compare(&av, &bv)? != std::cmp::Ordering::Greater),
		BinaryOpType::Gt => Val::Bool(crate::val::compare(&av, &bv)? == std::cmp::Ordering::Greater),
		BinaryOpType::Gte => Val::Bool(crate::val::compare(&av, &bv)? != std::cmp::Ordering::Less),

		BinaryOpType::BitAnd => int_op(&av, &bv, "&", |a, b| a & b)?,
		BinaryOpType::BitOr => int_op(&av, &bv, "|", |a, b| a | b)?,
		BinaryOpType::BitXor => int_op(&av, &bv, "^", |a, b| a ^ b)?,
		BinaryOpType::Lhs => int_op(&av, &bv, "<<", |a, b| a << (b & 31))?,
		BinaryOpType::Rhs => int_op(&av, &bv, ">>", |a, b| a >> (b & 31))?,

		BinaryOpType::In => Val::Bool(match &bv {
			Val::Obj(o) => o.has_field(&IStr::from(av.as_str("in left side")?.as_ref())),
			_ => throw!(BinaryOperatorDoesNotOperateOnValues(op, av.value_type(), bv.value_type())),
		}),
	})
}

/// `%`: string formatting when the left side is a string, numeric
/// remainder otherwise. Shared with `std.mod`'s native implementation.
pub fn mod_values(av: &Val, bv: &Val) -> Result<Val> {
	if let (Val::Str(_), _) = (av, bv) {
		return crate::format::format_str(av.as_str("% left side")?.as_ref(), bv);
	}
	let divisor = bv.as_num("% right side")?;
	if divisor == 0.0 {
		throw!(DivisionByZero);
	}
	Val::checked_num(av.as_num("% left side")? % divisor)
}

/// Integer bitwise ops truncate both operands to 32-bit integers, operate
/// on those, and zero-extend the `u32` result back to a double -- so the
/// result is always in `[0, 2^32)`, never negative.
fn int_op(av: &Val, bv: &Val, name: &'static str, f: impl Fn(u32, u32) -> u32) -> Result<Val> {
	let a = av.as_num(name)?;
	let b = bv.as_num(name)?;
	if a.fract() != 0.0 || b.fract() != 0.0 {
		throw!(FractionalIndex);
	}
	Val::checked_num(f64::from(f(a as i64 as u32, b as i64 as u32)))
}

/// `+`, across every type pair that defines it (spec §4.5): numeric and
/// string addition, array/object concatenation/composition, and implicit
/// string coercion when exactly one side is a string.
pub fn add_values(a: &Val, b: &Val) -> Result<Val> {
	Ok(match (a, b) {
		(Val::Num(a), Val::Num(b)) => Val::checked_num(a + b)?,
		(Val::Str(_), _) | (_, Val::Str(_)) => {
			let mut s = String::new();
			s.push_str(&a.to_display_string()?);
			s.push_str(&b.to_display_string()?);
			Val::Str(s.into())
		}
		(Val::Arr(a), Val::Arr(b)) => {
			let mut out = Vec::with_capacity(a.len() + b.len());
			out.extend(a.iter().cloned());
			out.extend(b.iter().cloned());
			Val::Arr(Rc::new(out))
		}
		(Val::Obj(a), Val::Obj(b)) => Val::Obj(b.extend_from(a.clone())),
		(a, b) => throw!(BinaryOperatorDoesNotOperateOnValues(
			BinaryOpType::Add,
			a.value_type(),
			b.value_type()
		)),
	})
}

fn evaluate_args(ctx: &Context, args: &jrsonnet_parser::ArgsDesc, tailstrict: bool) -> Result<Args> {
	let positional = args
		.unnamed
		.iter()
		.map(|e| {
			let ctx = ctx.clone();
			let e = e.clone();
			let thunk = Thunk::new(move || evaluate(ctx.clone(), &e));
			if tailstrict {
				thunk.force()?;
			}
			Ok(thunk)
		})
		.collect::<Result<Vec<_>>>()?;
	let named = args
		.named
		.iter()
		.map(|(name, e)| {
			let ctx = ctx.clone();
			let e = e.clone();
			let thunk = Thunk::new(move || evaluate(ctx.clone(), &e));
			if tailstrict {
				thunk.force()?;
			}
			Ok((name.clone(), thunk))
		})
		.collect::<Result<Vec<_>>>()?;
	Ok(Args { positional, named })
}

fn evaluate_index(ctx: Context, a: &jrsonnet_parser::LocExpr, b: &jrsonnet_parser::LocExpr) -> Result<Val> {
	let av = evaluate(ctx.clone(), a)?;
	match &av {
		Val::Obj(obj) => {
			let name = IStr::from(evaluate(ctx, b)?.as_str("object index")?.as_ref());
			obj.get(name.clone())?.ok_or_else(|| NoSuchField(name.to_string()).into())
		}
		Val::Arr(items) => {
			let idx = evaluate(ctx, b)?.as_num("array index")?;
			if idx.fract() != 0.0 {
				throw!(FractionalIndex);
			}
			let idx = idx as i64;
			if idx < 0 || idx as usize >= items.len() {
				throw!(ArrayBoundsError(idx as usize, items.len()));
			}
			items[idx as usize].force()?
		}
		Val::Str(s) => {
			let idx = evaluate(ctx, b)?.as_num("string index")?;
			if idx.fract() != 0.0 {
				throw!(FractionalIndex);
			}
			let chars: Vec<char> = s.chars().collect();
			let idx = idx as i64;
			if idx < 0 || idx as usize >= chars.len() {
				throw!(ArrayBoundsError(idx as usize, chars.len()));
			}
			Val::Str(chars[idx as usize].to_string().into())
		}
		_ => throw!(CantIndexInto(av.value_type())),
	}
}

/// Binds a `local` block's names all at once, each thunk able to see every
/// other binding in the same block (mutual recursion within one `local`).
fn bind_locals(ctx: &Context, binds: &[jrsonnet_parser::BindSpec]) -> Context {
	let final_ctx: Rc<RefCell<Option<Context>>> = Rc::new(RefCell::new(None));
	let mut map = FxHashMap::with_capacity_and_hasher(binds.len(), Default::default());
	for bind in binds {
		let cell = final_ctx.clone();
		match &bind.params {
			None => {
				let value = bind.value.clone();
				map.insert(
					bind.name.clone(),
					Thunk::new(move || {
						let ctx = cell.borrow().clone().expect("final context set before forcing");
						evaluate(ctx, &value)
					}),
				);
			}
			Some(params) => {
				let params = params.clone();
				let body = bind.value.clone();
				let name = bind.name.clone();
				map.insert(
					bind.name.clone(),
					Thunk::new(move || {
						let ctx = cell.borrow().clone().expect("final context set before forcing");
						Ok(Val::Func(Rc::new(FuncVal::Normal(Rc::new(FuncDesc {
							name: name.clone(),
							ctx,
							params: params.clone(),
							body: body.clone(),
						})))))
					}),
				);
			}
		}
	}
	let inner = ctx.extend(map);
	*final_ctx.borrow_mut() = Some(inner.clone());
	inner
}

/// Assembles an object literal's members into an [`ObjValue`]: `local`
/// members become a lazily-bound scope wrapping every field/assert body
/// (spec's "every field sees the object's locals" rule), `assert` members
/// become deferred [`crate::obj::ObjectAssertion`]s, and `f(x): ...` field
/// sugar turns the field's value into a function closed over the
/// self/super-bound scope rather than evaluating it directly.
fn evaluate_object(ctx: &Context, body: &ObjBody) -> Result<Val> {
	let ObjBody::MemberList(members) = body else {
		unreachable!("object comprehensions are removed by desugaring")
	};

	let locals: Vec<&jrsonnet_parser::BindSpec> = members
		.iter()
		.filter_map(|m| match m {
			Member::BindStmt(b) => Some(b),
			_ => None,
		})
		.collect();
	let make_dollar = ctx.dollar().is_none();
	let lexical_ctx = if locals.is_empty() {
		ctx.clone()
	} else {
		bind_locals(ctx, &locals.iter().map(|b| (*b).clone()).collect::<Vec<_>>())
	};

	let mut builder = ObjValueBuilder::new();
	for member in members {
		match member {
			Member::BindStmt(_) => {}
			Member::AssertStmt(assert) => {
				let lexical_ctx = lexical_ctx.clone();
				let cond = assert.0.clone();
				let msg = assert.1.clone();
				builder.assert(move |this: ObjValue, super_obj: Option<ObjValue>| -> Result<()> {
					let dollar = if make_dollar { Some(this.clone()) } else { None };
					let field_ctx = lexical_ctx.with_object(dollar, this, super_obj);
					if !evaluate(field_ctx.clone(), &cond)?.as_bool("object assert condition")? {
						let message = match &msg {
							Some(e) => evaluate(field_ctx, e)?.to_display_string()?.to_string(),
							None => "Assertion failed".to_string(),
						};
						throw!(AssertionFailed(message));
					}
					Ok(())
				});
			}
			Member::Field(field) => {
				let name = match &field.name {
					FieldName::Fixed(n) => Some(n.clone()),
					FieldName::Dyn(e) => {
						let key = evaluate(lexical_ctx.clone(), e)?;
						match key {
							Val::Null => None,
							Val::Str(s) => Some(s.as_ref().into()),
							other => throw!(FieldMustBeStringGot(other.value_type())),
						}
					}
				};
				let Some(name) = name else { continue };
				let lexical_ctx = lexical_ctx.clone();
				let params = field.params.clone();
				let value = field.value.clone();
				let field_name = name.clone();
				builder.field(
					name,
					field.plus,
					field.visibility,
					move |this: ObjValue, super_obj: Option<ObjValue>| -> Result<Val> {
						let dollar = if make_dollar { Some(this.clone()) } else { None };
						let field_ctx = lexical_ctx.with_object(dollar, this, super_obj);
						match &params {
							None => with_stack_frame(|| evaluate(field_ctx, &value))
								.map_err(|e| e.push_frame(value.1.clone(), format!("object <{field_name}>"))),
							Some(params) => Ok(Val::Func(Rc::new(FuncVal::Normal(Rc::new(FuncDesc {
								name: field_name.clone(),
								ctx: field_ctx,
								params: params.clone(),
								body: value.clone(),
							}))))),
						}
					},
				);
			}
		}
	}
	let obj = builder.build();
	Ok(Val::Obj(obj.with_this(obj.clone())))
}
