//! `length`, `sort`, and the `set`/`setMember`/`setInter`/`setUnion`/
//! `setDiff` family: every set here is just a sorted, deduplicated array,
//! per spec -- there is no dedicated set representation.
use std::{cmp::Ordering, rc::Rc};

use jrsonnet_evaluator::{error::Error::RuntimeError, obj::ObjValueBuilder, throw, val::Val, Context, ExprLocation, Result, Thunk};

use crate::util::{arg, opt_arg, install};

fn length(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let v = arg("length", args, 0)?;
	let n = match &v {
		Val::Str(s) => s.chars().count(),
		Val::Arr(a) => a.len(),
		Val::Obj(o) => o.visible_fields().len(),
		Val::Func(f) => f.params_len(),
		other => throw!(RuntimeError(format!("std.length: expected string, array, object or function, got {}", other.value_type()))),
	};
	Val::checked_num(n as f64)
}

/// Applies an optional key function (arg index 1, default identity) to every
/// element, returning `(key, original)` pairs still in input order.
fn keyed(func: &str, arr: &[Thunk], key_f: Option<&Val>) -> Result<Vec<(Val, Val)>> {
	let mut out = Vec::with_capacity(arr.len());
	for item in arr {
		let v = item.force()?;
		let key = match key_f {
			Some(f) => f.as_func(func)?.call_values(Context::new(), &[v.clone()])?,
			None => v.clone(),
		};
		out.push((key, v));
	}
	Ok(out)
}

fn sort(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let arr = arg("sort", args, 0)?.as_arr("std.sort array")?;
	let key_f = opt_arg(args, 1)?;
	let mut pairs = keyed("std.sort", &arr, key_f.as_ref())?;
	let mut err = None;
	pairs.sort_by(|(a, _), (b, _)| match jrsonnet_evaluator::val::compare(a, b) {
		Ok(o) => o,
		Err(e) => {
			err = Some(e);
			Ordering::Equal
		}
	});
	if let Some(e) = err {
		return Err(e);
	}
	Ok(Val::Arr(Rc::new(pairs.into_iter().map(|(_, v)| Thunk::evaluated(v)).collect())))
}

/// `std.set(arr, keyF=id)`: sorted, deduplicated by key.
fn set(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let arr = arg("set", args, 0)?.as_arr("std.set array")?;
	let key_f = opt_arg(args, 1)?;
	let mut pairs = keyed("std.set", &arr, key_f.as_ref())?;
	let mut err = None;
	pairs.sort_by(|(a, _), (b, _)| match jrsonnet_evaluator::val::compare(a, b) {
		Ok(o) => o,
		Err(e) => {
			err = Some(e);
			Ordering::Equal
		}
	});
	if let Some(e) = err {
		return Err(e);
	}
	let mut out = Vec::new();
	for (key, value) in pairs {
		if let Some((last_key, _)) = out.last() {
			if jrsonnet_evaluator::val::equals(last_key, &key)? {
				continue;
			}
		}
		out.push((key, value));
	}
	Ok(Val::Arr(Rc::new(out.into_iter().map(|(_, v)| Thunk::evaluated(v)).collect())))
}

fn set_member(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let x = arg("setMember", args, 0)?;
	let arr = arg("setMember", args, 1)?.as_arr("std.setMember array")?;
	let key_f = opt_arg(args, 2)?;
	let key = match &key_f {
		Some(f) => f.as_func("std.setMember")?.call_values(Context::new(), &[x.clone()])?,
		None => x.clone(),
	};
	for item in arr.iter() {
		let v = item.force()?;
		let item_key = match &key_f {
			Some(f) => f.as_func("std.setMember")?.call_values(Context::new(), &[v])?,
			None => v,
		};
		if jrsonnet_evaluator::val::equals(&key, &item_key)? {
			return Ok(Val::Bool(true));
		}
	}
	Ok(Val::Bool(false))
}

fn set_of(func: &str, args: &[Thunk]) -> Result<(Vec<(Val, Val)>, Vec<(Val, Val)>)> {
	let a = arg(func, args, 0)?.as_arr(func)?;
	let b = arg(func, args, 1)?.as_arr(func)?;
	let key_f = opt_arg(args, 2)?;
	let mut a = keyed(func, &a, key_f.as_ref())?;
	let mut b = keyed(func, &b, key_f.as_ref())?;
	let cmp = |a: &(Val, Val), b: &(Val, Val)| jrsonnet_evaluator::val::compare(&a.0, &b.0).unwrap_or(Ordering::Equal);
	a.sort_by(cmp);
	b.sort_by(cmp);
	Ok((a, b))
}

fn set_union(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let (a, b) = set_of("std.setUnion", args)?;
	let mut merged = a;
	merged.extend(b);
	merged.sort_by(|a, b| jrsonnet_evaluator::val::compare(&a.0, &b.0).unwrap_or(Ordering::Equal));
	let mut out = Vec::new();
	for (key, value) in merged {
		if let Some((last_key, _)) = out.last() {
			if jrsonnet_evaluator::val::equals(last_key, &key)? {
				continue;
			}
		}
		out.push((key, value));
	}
	Ok(Val::Arr(Rc::new(out.into_iter().map(|(_, v)| Thunk::evaluated(v)).collect())))
}

fn set_inter(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let (a, b) = set_of("std.setInter", args)?;
	let mut out = Vec::new();
	for (key, value) in a {
		let mut present = false;
		for (bk, _) in &b {
			if jrsonnet_evaluator::val::equals(&key, bk)? {
				present = true;
				break;
			}
		}
		if present && !out.iter().any(|(k, _): &(Val, Val)| jrsonnet_evaluator::val::equals(k, &key).unwrap_or(false)) {
			out.push((key, value));
		}
	}
	Ok(Val::Arr(Rc::new(out.into_iter().map(|(_, v)| Thunk::evaluated(v)).collect())))
}

fn set_diff(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let (a, b) = set_of("std.setDiff", args)?;
	let mut out = Vec::new();
	for (key, value) in a {
		let mut present = false;
		for (bk, _) in &b {
			if jrsonnet_evaluator::val::equals(&key, bk)? {
				present = true;
				break;
			}
		}
		if !present && !out.iter().any(|(k, _): &(Val, Val)| jrsonnet_evaluator::val::equals(k, &key).unwrap_or(false)) {
			out.push((key, value));
		}
	}
	Ok(Val::Arr(Rc::new(out.into_iter().map(|(_, v)| Thunk::evaluated(v)).collect())))
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "length", &["x"], length);
	install(builder, "sort", &["arr", "keyF"], sort);
	install(builder, "set", &["arr", "keyF"], set);
	install(builder, "setMember", &["x", "arr", "keyF"], set_member);
	install(builder, "setUnion", &["a", "b", "keyF"], set_union);
	install(builder, "setInter", &["a", "b", "keyF"], set_inter);
	install(builder, "setDiff", &["a", "b", "keyF"], set_diff);
}
