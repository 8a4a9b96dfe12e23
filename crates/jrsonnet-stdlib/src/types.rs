//! `std.type` and the `isX` family.
use jrsonnet_evaluator::{error::Error::RuntimeError, obj::ObjValueBuilder, throw, val::Val, Context, ExprLocation, Result, Thunk};

use crate::util::{arg, install};

fn type_(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let v = arg("type", args, 0)?;
	Ok(Val::Str(v.value_type().name().into()))
}

fn assert_equal(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let a = arg("assertEqual", args, 0)?;
	let b = arg("assertEqual", args, 1)?;
	if jrsonnet_evaluator::val::equals(&a, &b)? {
		Ok(Val::Bool(true))
	} else {
		throw!(RuntimeError(format!(
			"Assert failed: {} != {}",
			a.to_display_string()?,
			b.to_display_string()?
		)));
	}
}

fn is_string(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Ok(Val::Bool(matches!(arg("isString", args, 0)?, Val::Str(_))))
}
fn is_number(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Ok(Val::Bool(matches!(arg("isNumber", args, 0)?, Val::Num(_))))
}
fn is_boolean(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Ok(Val::Bool(matches!(arg("isBoolean", args, 0)?, Val::Bool(_))))
}
fn is_object(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Ok(Val::Bool(matches!(arg("isObject", args, 0)?, Val::Obj(_))))
}
fn is_array(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Ok(Val::Bool(matches!(arg("isArray", args, 0)?, Val::Arr(_))))
}
fn is_function(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	Ok(Val::Bool(matches!(arg("isFunction", args, 0)?, Val::Func(_))))
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "type", &["x"], type_);
	install(builder, "assertEqual", &["a", "b"], assert_equal);
	install(builder, "isString", &["v"], is_string);
	install(builder, "isNumber", &["v"], is_number);
	install(builder, "isBoolean", &["v"], is_boolean);
	install(builder, "isObject", &["v"], is_object);
	install(builder, "isArray", &["v"], is_array);
	install(builder, "isFunction", &["v"], is_function);
}
