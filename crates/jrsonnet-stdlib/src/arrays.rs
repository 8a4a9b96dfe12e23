//! Array builtins: `makeArray, map, flatMap, filter, foldl, foldr, range,
//! join, lines, member, mapWithIndex, slice`.
//!
//! `slice` isn't in the required builtin surface but is structurally
//! mandatory: `jrsonnet-evaluator`'s desugaring pass rewrites every slice
//! expression (`a[i:j:k]`) into an unconditional call to `std.slice`, so an
//! implementation without it can't evaluate any program that slices.
use std::rc::Rc;

use jrsonnet_evaluator::{error::Error::RuntimeError, obj::ObjValueBuilder, throw, val::Val, Context, ExprLocation, Result, Thunk};

use crate::util::{arg, install};

fn call1(f: &Val, a: Val) -> Result<Val> {
	f.as_func("callback")?.call_values(Context::new(), &[a])
}
fn call2(f: &Val, a: Val, b: Val) -> Result<Val> {
	f.as_func("callback")?.call_values(Context::new(), &[a, b])
}

fn make_array(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let n = arg("makeArray", args, 0)?.as_num("std.makeArray length")?;
	if n < 0.0 || n.fract() != 0.0 {
		throw!(RuntimeError(format!("std.makeArray: length must be a non-negative integer, got {n}")));
	}
	let func = arg("makeArray", args, 1)?;
	let mut out = Vec::with_capacity(n as usize);
	for i in 0..n as u64 {
		out.push(Thunk::evaluated(call1(&func, Val::Num(i as f64))?));
	}
	Ok(Val::Arr(Rc::new(out)))
}

fn map_(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let func = arg("map", args, 0)?;
	let arr = arg("map", args, 1)?.as_arr("std.map array")?;
	let mut out = Vec::with_capacity(arr.len());
	for item in arr.iter() {
		out.push(Thunk::evaluated(call1(&func, item.force()?)?));
	}
	Ok(Val::Arr(Rc::new(out)))
}

fn map_with_index(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let func = arg("mapWithIndex", args, 0)?;
	let arr = arg("mapWithIndex", args, 1)?.as_arr("std.mapWithIndex array")?;
	let mut out = Vec::with_capacity(arr.len());
	for (i, item) in arr.iter().enumerate() {
		out.push(Thunk::evaluated(call2(&func, Val::Num(i as f64), item.force()?)?));
	}
	Ok(Val::Arr(Rc::new(out)))
}

/// Concatenates `func(item)`'s results across the iterable: per-element
/// arrays are spliced together; `Val::Null` results are skipped; a string
/// iterable instead concatenates `func`'s per-character string results.
/// Anything else `func` returns is an error -- mirroring the teacher's
/// `builtin_flatmap`.
fn flat_map(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let func = arg("flatMap", args, 0)?;
	match arg("flatMap", args, 1)? {
		Val::Arr(arr) => {
			let mut out = Vec::new();
			for item in arr.iter() {
				match call1(&func, item.force()?)? {
					Val::Arr(piece) => out.extend(piece.iter().cloned()),
					Val::Null => {}
					other => throw!(RuntimeError(format!(
						"std.flatMap: function must return an array, got {}",
						other.value_type()
					))),
				}
			}
			Ok(Val::Arr(Rc::new(out)))
		}
		Val::Str(s) => {
			let mut out = String::new();
			for c in s.chars() {
				match call1(&func, Val::Str(c.to_string().into()))? {
					Val::Str(piece) => out.push_str(&piece),
					Val::Null => {}
					other => throw!(RuntimeError(format!(
						"std.flatMap: function must return a string, got {}",
						other.value_type()
					))),
				}
			}
			Ok(Val::Str(out.into()))
		}
		other => throw!(RuntimeError(format!("std.flatMap: expected array or string, got {}", other.value_type()))),
	}
}

fn filter(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let func = arg("filter", args, 0)?;
	let arr = arg("filter", args, 1)?.as_arr("std.filter array")?;
	let mut out = Vec::new();
	for item in arr.iter() {
		let v = item.force()?;
		if call1(&func, v.clone())?.as_bool("std.filter function result")? {
			out.push(Thunk::evaluated(v));
		}
	}
	Ok(Val::Arr(Rc::new(out)))
}

fn foldl(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let func = arg("foldl", args, 0)?;
	let arr = arg("foldl", args, 1)?.as_arr("std.foldl array")?;
	let mut acc = arg("foldl", args, 2)?;
	for item in arr.iter() {
		acc = call2(&func, acc, item.force()?)?;
	}
	Ok(acc)
}

fn foldr(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let func = arg("foldr", args, 0)?;
	let arr = arg("foldr", args, 1)?.as_arr("std.foldr array")?;
	let mut acc = arg("foldr", args, 2)?;
	for item in arr.iter().rev() {
		acc = call2(&func, item.force()?, acc)?;
	}
	Ok(acc)
}

fn range(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let from = arg("range", args, 0)?.as_num("std.range from")?;
	let to = arg("range", args, 1)?.as_num("std.range to")?;
	if from.fract() != 0.0 || to.fract() != 0.0 {
		throw!(RuntimeError("std.range: bounds must be integers".into()));
	}
	let (from, to) = (from as i64, to as i64);
	let mut out = Vec::new();
	let mut i = from;
	while i <= to {
		out.push(Thunk::evaluated(Val::Num(i as f64)));
		i += 1;
	}
	Ok(Val::Arr(Rc::new(out)))
}

fn join(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let sep = arg("join", args, 0)?;
	let items = arg("join", args, 1)?.as_arr("std.join array")?;
	match &sep {
		Val::Str(sep) => {
			let mut out = String::new();
			let mut first = true;
			for item in items.iter() {
				match item.force()? {
					Val::Null => continue,
					Val::Str(s) => {
						if !first {
							out.push_str(sep);
						}
						out.push_str(&s);
						first = false;
					}
					other => throw!(RuntimeError(format!("std.join: expected string, got {}", other.value_type()))),
				}
			}
			Ok(Val::Str(out.into()))
		}
		Val::Arr(sep) => {
			let mut out: Vec<Thunk> = Vec::new();
			let mut first = true;
			for item in items.iter() {
				match item.force()? {
					Val::Null => continue,
					Val::Arr(a) => {
						if !first {
							out.extend(sep.iter().cloned());
						}
						out.extend(a.iter().cloned());
						first = false;
					}
					other => throw!(RuntimeError(format!("std.join: expected array, got {}", other.value_type()))),
				}
			}
			Ok(Val::Arr(Rc::new(out)))
		}
		other => throw!(RuntimeError(format!("std.join: separator must be string or array, got {}", other.value_type()))),
	}
}

fn lines(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let arr = arg("lines", args, 0)?.as_arr("std.lines array")?;
	let mut out = String::new();
	for item in arr.iter() {
		out.push_str(&item.force()?.as_str("std.lines element")?);
		out.push('\n');
	}
	Ok(Val::Str(out.into()))
}

fn member(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let container = arg("member", args, 0)?;
	let x = arg("member", args, 1)?;
	match container {
		Val::Arr(arr) => {
			for item in arr.iter() {
				if jrsonnet_evaluator::val::equals(&item.force()?, &x)? {
					return Ok(Val::Bool(true));
				}
			}
			Ok(Val::Bool(false))
		}
		Val::Str(s) => {
			let needle = x.as_str("std.member needle")?;
			Ok(Val::Bool(s.contains(needle.as_ref())))
		}
		other => throw!(RuntimeError(format!("std.member: expected array or string, got {}", other.value_type()))),
	}
}

/// `std.slice(indexable, start, end, step)`: `null` for any bound means
/// "omitted" (begin/length-of-indexable/1 respectively), matching what the
/// desugarer emits for `a[i:j:k]`'s missing parts.
fn slice(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let indexable = arg("slice", args, 0)?;
	let bound = |v: Val, default: i64| -> Result<i64> {
		match v {
			Val::Null => Ok(default),
			Val::Num(n) if n.fract() == 0.0 => Ok(n as i64),
			_ => throw!(RuntimeError("std.slice: index must be an integer or null".into())),
		}
	};
	let len = match &indexable {
		Val::Arr(a) => a.len() as i64,
		Val::Str(s) => s.chars().count() as i64,
		other => throw!(RuntimeError(format!("std.slice: expected array or string, got {}", other.value_type()))),
	};
	let clamp = |i: i64| -> i64 {
		let i = if i < 0 { (len + i).max(0) } else { i };
		i.min(len)
	};
	let start = clamp(bound(arg("slice", args, 1)?, 0)?);
	let end = clamp(bound(arg("slice", args, 2)?, len)?);
	let step = bound(arg("slice", args, 3)?, 1)?;
	if step <= 0 {
		throw!(RuntimeError("std.slice: step must be a positive integer".into()));
	}
	match indexable {
		Val::Arr(a) => {
			let mut out = Vec::new();
			let mut i = start;
			while i < end {
				out.push(a[i as usize].clone());
				i += step;
			}
			Ok(Val::Arr(Rc::new(out)))
		}
		Val::Str(s) => {
			let chars: Vec<char> = s.chars().collect();
			let mut out = String::new();
			let mut i = start;
			while i < end {
				out.push(chars[i as usize]);
				i += step;
			}
			Ok(Val::Str(out.into()))
		}
		_ => unreachable!("checked above"),
	}
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "makeArray", &["sz", "func"], make_array);
	install(builder, "map", &["func", "arr"], map_);
	install(builder, "mapWithIndex", &["func", "arr"], map_with_index);
	install(builder, "flatMap", &["func", "arr"], flat_map);
	install(builder, "filter", &["func", "arr"], filter);
	install(builder, "foldl", &["func", "arr", "init"], foldl);
	install(builder, "foldr", &["func", "arr", "init"], foldr);
	install(builder, "range", &["from", "to"], range);
	install(builder, "join", &["sep", "arr"], join);
	install(builder, "lines", &["arr"], lines);
	install(builder, "member", &["arr", "x"], member);
	install(builder, "slice", &["indexable", "index", "end", "step"], slice);
}
