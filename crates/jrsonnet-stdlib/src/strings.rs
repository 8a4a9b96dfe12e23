//! String builtins: `codepoint, char, substr, findSubstr, startsWith,
//! endsWith, asciiUpper, asciiLower, stringChars, escapeStringJson,
//! escapeStringBash, split, splitLimit, strReplace, parseInt, parseOctal,
//! parseHex, toString, format`.
use std::rc::Rc;

use jrsonnet_evaluator::{
	error::Error::{InvalidUnicodeCodepointGot, RuntimeError},
	obj::ObjValueBuilder,
	throw,
	val::Val,
	Context, ExprLocation, Result, Thunk,
};

use crate::util::{arg, install};

fn codepoint(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("codepoint", args, 0)?.as_str("std.codepoint argument")?;
	let c = s.chars().next().ok_or_else(|| RuntimeError("std.codepoint: argument must be a single character".into()))?;
	Val::checked_num(c as u32 as f64)
}

fn char_(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let n = arg("char", args, 0)?.as_num("std.char argument")?;
	let c = char::from_u32(n as u32).ok_or(InvalidUnicodeCodepointGot(n as u32))?;
	Ok(Val::Str(c.to_string().into()))
}

fn substr(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("substr", args, 0)?.as_str("std.substr string")?;
	let from = arg("substr", args, 1)?.as_num("std.substr from")? as usize;
	let len = arg("substr", args, 2)?.as_num("std.substr len")? as usize;
	let chars: Vec<char> = s.chars().collect();
	let end = (from + len).min(chars.len());
	let start = from.min(chars.len());
	Ok(Val::Str(chars[start..end].iter().collect::<String>().into()))
}

fn find_substr(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let pat = arg("findSubstr", args, 0)?.as_str("std.findSubstr pattern")?;
	let s = arg("findSubstr", args, 1)?.as_str("std.findSubstr string")?;
	if pat.is_empty() {
		return Ok(Val::Arr(Rc::new(Vec::new())));
	}
	let chars: Vec<char> = s.chars().collect();
	let pat_chars: Vec<char> = pat.chars().collect();
	let mut out = Vec::new();
	if pat_chars.len() <= chars.len() {
		for i in 0..=chars.len() - pat_chars.len() {
			if chars[i..i + pat_chars.len()] == pat_chars[..] {
				out.push(Thunk::evaluated(Val::Num(i as f64)));
			}
		}
	}
	Ok(Val::Arr(Rc::new(out)))
}

fn starts_with(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let a = arg("startsWith", args, 0)?.as_str("std.startsWith a")?;
	let b = arg("startsWith", args, 1)?.as_str("std.startsWith b")?;
	Ok(Val::Bool(a.starts_with(b.as_ref())))
}
fn ends_with(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let a = arg("endsWith", args, 0)?.as_str("std.endsWith a")?;
	let b = arg("endsWith", args, 1)?.as_str("std.endsWith b")?;
	Ok(Val::Bool(a.ends_with(b.as_ref())))
}

fn ascii_upper(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("asciiUpper", args, 0)?.as_str("std.asciiUpper argument")?;
	Ok(Val::Str(s.to_ascii_uppercase().into()))
}
fn ascii_lower(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("asciiLower", args, 0)?.as_str("std.asciiLower argument")?;
	Ok(Val::Str(s.to_ascii_lowercase().into()))
}

fn string_chars(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("stringChars", args, 0)?.as_str("std.stringChars argument")?;
	Ok(Val::Arr(Rc::new(
		s.chars().map(|c| Thunk::evaluated(Val::Str(c.to_string().into()))).collect(),
	)))
}

fn escape_string_json(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("escapeStringJson", args, 0)?.as_str("std.escapeStringJson argument")?;
	let mut out = String::new();
	jrsonnet_evaluator::manifest::write_json_string(&s, &mut out);
	Ok(Val::Str(out.into()))
}

/// Escapes for safe embedding inside single-quoted POSIX shell words:
/// `'` becomes `'"'"'`, everything else is passed through, and the whole
/// result is wrapped in a fresh pair of single quotes.
fn escape_string_bash(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("escapeStringBash", args, 0)?.as_str("std.escapeStringBash argument")?;
	let mut out = String::from("'");
	for c in s.chars() {
		if c == '\'' {
			out.push_str("'\"'\"'");
		} else {
			out.push(c);
		}
	}
	out.push('\'');
	Ok(Val::Str(out.into()))
}

fn split_impl(s: &str, sep: &str, limit: Option<usize>) -> Result<Vec<Thunk>> {
	if sep.is_empty() {
		throw!(RuntimeError("std.split: separator must not be empty".into()));
	}
	let parts: Vec<&str> = match limit {
		Some(n) => s.splitn(n + 1, sep).collect(),
		None => s.split(sep).collect(),
	};
	Ok(parts.into_iter().map(|p| Thunk::evaluated(Val::Str(p.into()))).collect())
}

fn split(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("split", args, 0)?.as_str("std.split string")?;
	let sep = arg("split", args, 1)?.as_str("std.split separator")?;
	Ok(Val::Arr(Rc::new(split_impl(&s, &sep, None)?)))
}

fn split_limit(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("splitLimit", args, 0)?.as_str("std.splitLimit string")?;
	let sep = arg("splitLimit", args, 1)?.as_str("std.splitLimit separator")?;
	let limit = arg("splitLimit", args, 2)?.as_num("std.splitLimit maxsplits")?;
	let limit = if limit < 0.0 { None } else { Some(limit as usize) };
	Ok(Val::Arr(Rc::new(split_impl(&s, &sep, limit)?)))
}

fn str_replace(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("strReplace", args, 0)?.as_str("std.strReplace string")?;
	let from = arg("strReplace", args, 1)?.as_str("std.strReplace from")?;
	let to = arg("strReplace", args, 2)?.as_str("std.strReplace to")?;
	if from.is_empty() {
		throw!(RuntimeError("std.strReplace: 'from' must not be empty".into()));
	}
	Ok(Val::Str(s.replace(from.as_ref(), &to).into()))
}

fn parse_int(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("parseInt", args, 0)?.as_str("std.parseInt argument")?;
	let n: i64 = s
		.trim()
		.parse()
		.map_err(|_| RuntimeError(format!("std.parseInt: not an integer: {s}")))?;
	Val::checked_num(n as f64)
}

fn parse_octal(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("parseOctal", args, 0)?.as_str("std.parseOctal argument")?;
	let n = i64::from_str_radix(s.trim(), 8).map_err(|_| RuntimeError(format!("std.parseOctal: not an octal number: {s}")))?;
	Val::checked_num(n as f64)
}

fn parse_hex(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("parseHex", args, 0)?.as_str("std.parseHex argument")?;
	let n = i64::from_str_radix(s.trim(), 16).map_err(|_| RuntimeError(format!("std.parseHex: not a hex number: {s}")))?;
	Val::checked_num(n as f64)
}

/// Ambient supplement: `std.toString` has ready machinery in
/// `Val::to_display_string` (used internally for implicit string
/// coercion); exposing it as a callable builtin is a thin wrapper.
fn to_string(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let v = arg("toString", args, 0)?;
	Ok(Val::Str(v.to_display_string()?))
}

fn format(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let fmt = arg("format", args, 0)?.as_str("std.format string")?;
	let rest = arg("format", args, 1)?;
	jrsonnet_evaluator::format::format_str(&fmt, &rest)
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "codepoint", &["str"], codepoint);
	install(builder, "char", &["n"], char_);
	install(builder, "substr", &["str", "from", "len"], substr);
	install(builder, "findSubstr", &["pat", "str"], find_substr);
	install(builder, "startsWith", &["a", "b"], starts_with);
	install(builder, "endsWith", &["a", "b"], ends_with);
	install(builder, "asciiUpper", &["str"], ascii_upper);
	install(builder, "asciiLower", &["str"], ascii_lower);
	install(builder, "stringChars", &["str"], string_chars);
	install(builder, "escapeStringJson", &["str"], escape_string_json);
	install(builder, "escapeStringBash", &["str"], escape_string_bash);
	install(builder, "split", &["str", "c"], split);
	install(builder, "splitLimit", &["str", "c", "maxsplits"], split_limit);
	install(builder, "strReplace", &["str", "from", "to"], str_replace);
	install(builder, "parseInt", &["str"], parse_int);
	install(builder, "parseOctal", &["str"], parse_octal);
	install(builder, "parseHex", &["str"], parse_hex);
	install(builder, "toString", &["a"], to_string);
	install(builder, "format", &["str", "vals"], format);
}
