//! Shared plumbing for every builtin module: argument extraction and the
//! `ObjValueBuilder` registration helper. Each builtin declares its
//! parameter names at registration time, so `jrsonnet-evaluator`'s
//! `call_function` can bind named arguments the same way it does for
//! ordinary Jsonnet functions; the function body itself still just reads
//! "the n-th positional argument" via [`arg`]/[`opt_arg`], since by the time
//! it runs, named arguments have already been reordered into position.
use std::rc::Rc;

use jrsonnet_evaluator::{
	error::Error::RuntimeError,
	obj::ObjValueBuilder,
	throw,
	val::{IntrinsicDesc, IntrinsicFn, Val},
	Result, Thunk,
};
use jrsonnet_interner::IStr;
use jrsonnet_parser::Visibility;

/// Registers one native builtin, under `name`, taking parameters `params`
/// (in declaration order), as a non-`+`, visible field on `builder`.
pub fn install(builder: &mut ObjValueBuilder, name: &'static str, params: &[&'static str], f: IntrinsicFn) {
	let desc = Rc::new(IntrinsicDesc {
		name: IStr::from(name),
		params: params.iter().map(|p| IStr::from(*p)).collect(),
		func: f,
	});
	builder.field(IStr::from(name), false, Visibility::Normal, move |_this, _super| {
		Ok(Val::Func(Rc::new(jrsonnet_evaluator::val::FuncVal::Intrinsic(desc.clone()))))
	});
}

/// The n-th positional argument, forced, or an error naming `func`/`n`.
pub fn arg(func: &str, args: &[Thunk], n: usize) -> Result<Val> {
	match args.get(n) {
		Some(t) => t.force(),
		None => throw!(RuntimeError(format!("std.{func}: missing argument {n}"))),
	}
}

/// The n-th positional argument's thunk, unforced (for callbacks that
/// shouldn't be called unless actually needed, and for `onEmpty`-style
/// lazily-evaluated fallback values).
pub fn arg_thunk<'a>(func: &str, args: &'a [Thunk], n: usize) -> Result<&'a Thunk> {
	args.get(n)
		.ok_or_else(|| RuntimeError(format!("std.{func}: missing argument {n}")).into())
}

pub fn opt_arg(args: &[Thunk], n: usize) -> Result<Option<Val>> {
	match args.get(n) {
		Some(t) => Ok(Some(t.force()?)),
		None => Ok(None),
	}
}

/// Forces every element of an already-forced `Val::Arr` argument.
pub fn arr_values(context: &'static str, v: &Val) -> Result<Vec<Val>> {
	let arr = v.as_arr(context)?;
	arr.iter().map(Thunk::force).collect()
}
