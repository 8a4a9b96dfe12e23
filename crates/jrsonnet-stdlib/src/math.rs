//! Numeric builtins: `abs, sign, max, min, pow, exp, log, sqrt, floor,
//! ceil, round, mod`.
use jrsonnet_evaluator::{
	error::Error::RuntimeError, obj::ObjValueBuilder, throw, val::Val, Context, ExprLocation, Result, Thunk,
};

use crate::util::{arg, install};

fn num(func: &str, args: &[Thunk], n: usize) -> Result<f64> {
	arg(func, args, n)?.as_num(func_ctx(func))
}

// `as_num`'s context string must be `'static`; every call site below names
// its own function, so a single leaked constant per function is simplest.
fn func_ctx(func: &str) -> &'static str {
	match func {
		"abs" => "std.abs",
		"sign" => "std.sign",
		"max" => "std.max",
		"min" => "std.min",
		"pow" => "std.pow",
		"exp" => "std.exp",
		"log" => "std.log",
		"sqrt" => "std.sqrt",
		"floor" => "std.floor",
		"ceil" => "std.ceil",
		"round" => "std.round",
		"mod" => "std.mod",
		_ => "std.<math>",
	}
}

fn abs(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("abs", args, 0)?.abs())
}
fn sign(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let n = num("sign", args, 0)?;
	Val::checked_num(if n == 0.0 { 0.0 } else { n.signum() })
}
fn max(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("max", args, 0)?.max(num("max", args, 1)?))
}
fn min(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("min", args, 0)?.min(num("min", args, 1)?))
}
fn pow(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("pow", args, 0)?.powf(num("pow", args, 1)?))
}
fn exp(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("exp", args, 0)?.exp())
}
fn log(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("log", args, 0)?.ln())
}
fn sqrt(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let n = num("sqrt", args, 0)?;
	if n < 0.0 {
		throw!(RuntimeError(format!("std.sqrt: argument must be non-negative, got {n}")));
	}
	Val::checked_num(n.sqrt())
}
fn floor(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("floor", args, 0)?.floor())
}
fn ceil(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("ceil", args, 0)?.ceil())
}
fn round(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Val::checked_num(num("round", args, 0)?.round())
}
fn mod_(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let a = arg("mod", args, 0)?;
	let b = arg("mod", args, 1)?;
	jrsonnet_evaluator::evaluate::mod_values(&a, &b)
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "abs", &["n"], abs);
	install(builder, "sign", &["n"], sign);
	install(builder, "max", &["a", "b"], max);
	install(builder, "min", &["a", "b"], min);
	install(builder, "pow", &["x", "n"], pow);
	install(builder, "exp", &["x"], exp);
	install(builder, "log", &["x"], log);
	install(builder, "sqrt", &["x"], sqrt);
	install(builder, "floor", &["x"], floor);
	install(builder, "ceil", &["x"], ceil);
	install(builder, "round", &["x"], round);
	install(builder, "mod", &["a", "b"], mod_);
}
