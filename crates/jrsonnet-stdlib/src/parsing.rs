//! `parseJson, parseYaml, manifestJsonEx, manifestYamlDoc, trace, extVar,
//! native`: the builtins that cross into the embedding layer, either by
//! parsing foreign data formats (`serde_json`/`serde_yaml`) or by calling
//! back into the active [`jrsonnet_evaluator::Vm`].
use std::rc::Rc;

use jrsonnet_evaluator::{
	error::Error::RuntimeError, obj::ObjValueBuilder, val::Val, Context, ExprLocation, Result, Thunk,
};
use jrsonnet_interner::IStr;

use crate::util::{arg, opt_arg, install};

fn json_to_val(v: &serde_json::Value) -> Val {
	match v {
		serde_json::Value::Null => Val::Null,
		serde_json::Value::Bool(b) => Val::Bool(*b),
		serde_json::Value::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
		serde_json::Value::String(s) => Val::Str(s.as_str().into()),
		serde_json::Value::Array(items) => Val::Arr(Rc::new(items.iter().map(|i| Thunk::evaluated(json_to_val(i))).collect())),
		serde_json::Value::Object(fields) => Val::Obj(jrsonnet_evaluator::obj::simple_object(
			fields.iter().map(|(k, v)| (IStr::from(k.as_str()), json_to_val(v))),
		)),
	}
}

fn yaml_to_val(v: &serde_yaml::Value) -> Result<Val> {
	Ok(match v {
		serde_yaml::Value::Null => Val::Null,
		serde_yaml::Value::Bool(b) => Val::Bool(*b),
		serde_yaml::Value::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
		serde_yaml::Value::String(s) => Val::Str(s.as_str().into()),
		serde_yaml::Value::Sequence(items) => {
			let mut out = Vec::with_capacity(items.len());
			for item in items {
				out.push(Thunk::evaluated(yaml_to_val(item)?));
			}
			Val::Arr(Rc::new(out))
		}
		serde_yaml::Value::Mapping(fields) => {
			let mut out = Vec::with_capacity(fields.len());
			for (k, v) in fields {
				let key = k.as_str().ok_or_else(|| RuntimeError("std.parseYaml: only string mapping keys are supported".into()))?;
				out.push((IStr::from(key), yaml_to_val(v)?));
			}
			Val::Obj(jrsonnet_evaluator::obj::simple_object(out))
		}
		serde_yaml::Value::Tagged(t) => yaml_to_val(&t.value)?,
	})
}

fn parse_json(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("parseJson", args, 0)?.as_str("std.parseJson argument")?;
	let value: serde_json::Value = serde_json::from_str(&s).map_err(|e| RuntimeError(format!("std.parseJson: {e}")))?;
	Ok(json_to_val(&value))
}

fn parse_yaml(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("parseYaml", args, 0)?.as_str("std.parseYaml argument")?;
	let value: serde_yaml::Value = serde_yaml::from_str(&s).map_err(|e| RuntimeError(format!("std.parseYaml: {e}")))?;
	yaml_to_val(&value)
}

/// Simplification from `DESIGN.md`: the real `std.manifestJsonEx` also
/// accepts custom `newline`/`key_val_sep` strings; this builds on the same
/// indent-only JSON writer the CLI's `--format json` output uses.
fn manifest_json_ex(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let v = arg("manifestJsonEx", args, 0)?;
	let indent = arg("manifestJsonEx", args, 1)?.as_str("std.manifestJsonEx indent")?;
	let rendered = jrsonnet_evaluator::manifest::manifest_json(&v, "", jrsonnet_evaluator::manifest::JsonFormat::Json(indent))?;
	Ok(Val::Str(rendered.into()))
}

fn manifest_yaml_doc(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let v = arg("manifestYamlDoc", args, 0)?;
	let indent_array_in_object = match opt_arg(args, 1)? {
		Some(v) => v.as_bool("std.manifestYamlDoc indent_array_in_object")?,
		None => false,
	};
	let quote_keys = match opt_arg(args, 2)? {
		Some(v) => v.as_bool("std.manifestYamlDoc quote_keys")?,
		None => true,
	};
	let rendered = jrsonnet_evaluator::manifest::manifest_yaml_doc(&v, indent_array_in_object, quote_keys)?;
	Ok(Val::Str(rendered.into()))
}

/// `std.trace(str, rest)`: writes `str` to the active trace sink and
/// returns `rest` unchanged.
fn trace(_: Context, loc: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let msg = arg("trace", args, 0)?.as_str("std.trace message")?;
	let rest = arg("trace", args, 1)?;
	let location = loc.map(|l| format!("{}:{}", l.0.display(), l.1)).unwrap_or_else(|| "<unknown>".to_string());
	jrsonnet_evaluator::emit_trace(&format!("TRACE: {location} {msg}"));
	Ok(rest)
}

fn ext_var(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let name = arg("extVar", args, 0)?.as_str("std.extVar name")?;
	jrsonnet_evaluator::ext_var(&IStr::from(name.as_ref()))
}

fn native(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let name = arg("native", args, 0)?.as_str("std.native name")?;
	jrsonnet_evaluator::native(&IStr::from(name.as_ref()))
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "parseJson", &["str"], parse_json);
	install(builder, "parseYaml", &["str"], parse_yaml);
	install(builder, "manifestJsonEx", &["value", "indent"], manifest_json_ex);
	install(
		builder,
		"manifestYamlDoc",
		&["value", "indent_array_in_object", "quote_keys"],
		manifest_yaml_doc,
	);
	install(builder, "trace", &["str", "rest"], trace);
	install(builder, "extVar", &["x"], ext_var);
	install(builder, "native", &["name"], native);
}
