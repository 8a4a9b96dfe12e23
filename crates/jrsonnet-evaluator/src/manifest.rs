//! Manifestation: turning a forced [`Val`] into JSON, YAML, or a multi-file
//! JSON tree (spec §4.6). Every path here forces the whole value graph and
//! runs every object's assertions before producing output, since
//! manifestation is the point at which laziness ends.
use std::{fmt::Write as _, rc::Rc};

use crate::{
	error::{Error::*, Result},
	throw,
	val::Val,
};

/// How a JSON manifestation should be laid out.
#[derive(Debug, Clone)]
pub enum JsonFormat {
	/// Pretty-printed, repeating `indent` once per nesting level. A plain
	/// space-count (the CLI's `-n`) and an arbitrary string (`std.
	/// manifestJsonEx`'s second argument, e.g. `"\t"`) are the same knob.
	Json(Rc<str>),
	/// Single line, minimal whitespace -- used for implicit string
	/// coercion (`+` mixing a string with a composite value) and
	/// `std.toString`.
	ToString,
}

pub fn manifest_json(val: &Val, cur_indent: &str, format: JsonFormat) -> Result<String> {
	let mut out = String::new();
	write_json(val, cur_indent, &format, &mut out)?;
	Ok(out)
}

fn step_indent(cur: &str, format: &JsonFormat) -> String {
	match format {
		JsonFormat::Json(unit) => format!("{cur}{unit}"),
		JsonFormat::ToString => String::new(),
	}
}

fn write_json(val: &Val, cur_indent: &str, format: &JsonFormat, out: &mut String) -> Result<()> {
	match val {
		Val::Null => out.push_str("null"),
		Val::Bool(true) => out.push_str("true"),
		Val::Bool(false) => out.push_str("false"),
		Val::Num(n) => write_number(*n, out)?,
		Val::Str(s) => write_json_string(s, out),
		Val::Func(_) => throw!(CouldntManifestFunction),
		Val::Arr(items) => {
			if items.is_empty() {
				out.push_str("[]");
				return Ok(());
			}
			let inner_indent = step_indent(cur_indent, format);
			out.push('[');
			for (i, item) in items.iter().enumerate() {
				if i != 0 {
					out.push(',');
				}
				newline_and_indent(out, format, &inner_indent);
				write_json(&item.force()?, &inner_indent, format, out)?;
			}
			newline_and_indent(out, format, cur_indent);
			out.push(']');
		}
		Val::Obj(obj) => {
			obj.run_assertions()?;
			let fields = obj.visible_fields();
			if fields.is_empty() {
				out.push_str("{}");
				return Ok(());
			}
			let inner_indent = step_indent(cur_indent, format);
			out.push('{');
			for (i, field) in fields.iter().enumerate() {
				if i != 0 {
					out.push(',');
				}
				newline_and_indent(out, format, &inner_indent);
				write_json_string(field, out);
				out.push(':');
				if matches!(format, JsonFormat::Json(_)) {
					out.push(' ');
				}
				let value = obj.get(field.clone())?.expect("field listed by visible_fields exists");
				write_json(&value, &inner_indent, format, out)?;
			}
			newline_and_indent(out, format, cur_indent);
			out.push('}');
		}
	}
	Ok(())
}

fn newline_and_indent(out: &mut String, format: &JsonFormat, indent: &str) {
	if matches!(format, JsonFormat::Json(_)) {
		out.push('\n');
		out.push_str(indent);
	}
}

/// Renders a finite f64 the way Jsonnet does: integral values with no
/// fractional part print without a decimal point, everything else uses
/// the shortest round-tripping decimal (which Rust's `Display` already
/// produces).
fn write_number(n: f64, out: &mut String) -> Result<()> {
	if !n.is_finite() {
		throw!(RuntimeError(format!("not a finite double: {n}")));
	}
	if n == 0.0 {
		out.push('0');
	} else {
		write!(out, "{n}").expect("String write is infallible");
	}
	Ok(())
}

pub fn write_json_string(s: &str, out: &mut String) {
	out.push('"');
	for c in s.chars() {
		match c {
			'"' => out.push_str("\\\""),
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			'\u{8}' => out.push_str("\\b"),
			'\u{c}' => out.push_str("\\f"),
			c if (c as u32) < 0x20 => {
				write!(out, "\\u{:04x}", c as u32).expect("String write is infallible");
			}
			c => out.push(c),
		}
	}
	out.push('"');
}

/// `std.manifestYamlDoc`: a minimal-but-correct YAML emitter covering the
/// subset of YAML that any JSON value maps onto (block sequences/mappings,
/// quoted scalars when a bare scalar would be ambiguous). `quote_keys`
/// forces every mapping key to be a quoted string, matching the stdlib
/// flag of the same name.
pub fn manifest_yaml_doc(val: &Val, indent_array_in_object: bool, quote_keys: bool) -> Result<String> {
	let mut out = String::new();
	write_yaml(val, "", indent_array_in_object, quote_keys, &mut out, true)?;
	if out.is_empty() {
		out.push_str("null");
	}
	Ok(out)
}

fn write_yaml(
	val: &Val,
	indent: &str,
	indent_array_in_object: bool,
	quote_keys: bool,
	out: &mut String,
	top: bool,
) -> Result<()> {
	match val {
		Val::Null | Val::Bool(_) | Val::Num(_) => {
			write_json(val, indent, JsonFormat::ToString, out)?;
		}
		Val::Str(s) => {
			if s.is_empty() || needs_yaml_quoting(s) {
				write_json_string(s, out);
			} else if s.contains('\n') {
				write_yaml_block_scalar(s, indent, out);
			} else {
				out.push_str(s);
			}
		}
		Val::Func(_) => throw!(CouldntManifestFunction),
		Val::Arr(items) => {
			if items.is_empty() {
				out.push_str("[]");
				return Ok(());
			}
			let item_indent = if indent_array_in_object { format!("{indent}  ") } else { indent.to_string() };
			for (i, item) in items.iter().enumerate() {
				if i != 0 || !top {
					out.push('\n');
					out.push_str(indent);
				}
				out.push_str("- ");
				write_yaml(&item.force()?, &item_indent, indent_array_in_object, quote_keys, out, false)?;
			}
		}
		Val::Obj(obj) => {
			obj.run_assertions()?;
			let fields = obj.visible_fields();
			if fields.is_empty() {
				out.push_str("{}");
				return Ok(());
			}
			let field_indent = format!("{indent}  ");
			for (i, field) in fields.iter().enumerate() {
				if i != 0 || !top {
					out.push('\n');
					out.push_str(indent);
				}
				if quote_keys || needs_yaml_quoting(field) {
					write_json_string(field, out);
				} else {
					out.push_str(field);
				}
				out.push(':');
				let value = obj.get(field.clone())?.expect("field listed by visible_fields exists");
				match &value {
					Val::Arr(items) if !items.is_empty() => {
						if indent_array_in_object {
							out.push('\n');
							out.push_str(&field_indent);
						} else {
							out.push('\n');
							out.push_str(indent);
						}
						write_yaml(&value, indent, indent_array_in_object, quote_keys, out, true)?;
					}
					Val::Obj(o) if !o.visible_fields().is_empty() => {
						out.push('\n');
						out.push_str(&field_indent);
						write_yaml(&value, &field_indent, indent_array_in_object, quote_keys, out, true)?;
					}
					_ => {
						out.push(' ');
						write_yaml(&value, &field_indent, indent_array_in_object, quote_keys, out, true)?;
					}
				}
			}
		}
	}
	Ok(())
}

fn write_yaml_block_scalar(s: &str, indent: &str, out: &mut String) {
	out.push('|');
	let body_indent = format!("{indent}  ");
	for line in s.split('\n') {
		out.push('\n');
		out.push_str(&body_indent);
		out.push_str(line);
	}
}

fn needs_yaml_quoting(s: &str) -> bool {
	matches!(s, "null" | "true" | "false" | "~" | "Null" | "True" | "False" | "")
		|| s.parse::<f64>().is_ok()
		|| s.starts_with(|c: char| " -?:,[]{}#&*!|>'\"%@`".contains(c))
		|| s.trim() != s
		|| s.contains(": ")
		|| s.contains(" #")
}

/// `std.manifestJsonMulti`/the CLI's `-m` mode: the top-level value must be
/// an object whose fields are themselves manifestable; each becomes one
/// output file named by the field's key.
pub fn manifest_multi(val: &Val) -> Result<Vec<(String, String)>> {
	let Val::Obj(obj) = val else {
		throw!(MultiManifestOutputIsNotAObject);
	};
	obj.run_assertions()?;
	let mut out = Vec::new();
	for field in obj.visible_fields() {
		let value = obj.get(field.clone())?.expect("field listed by visible_fields exists");
		let mut rendered = manifest_json(&value, "", JsonFormat::Json(Rc::from("    ")))?;
		rendered.push('\n');
		out.push((field.to_string(), rendered));
	}
	Ok(out)
}

/// `std.manifestJsonMulti`'s stream sibling (the CLI's `-S` / YAML-stream
/// mode): the top-level value must be an array, each element manifested
/// independently.
pub fn manifest_stream(val: &Val) -> Result<Vec<String>> {
	let Val::Arr(items) = val else {
		throw!(StreamManifestOutputIsNotAArray);
	};
	items
		.iter()
		.map(|i| manifest_json(&i.force()?, "", JsonFormat::Json(Rc::from("    "))))
		.collect()
}
