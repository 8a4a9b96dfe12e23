//! Object builtins: `objectHas/Fields/Values/KeysValues` (+ `...All`
//! variants), `get`, `mergePatch`, `mapWithKey`, `prune`.
use std::rc::Rc;

use jrsonnet_evaluator::{obj::ObjValueBuilder, val::Val, Context, ExprLocation, Result, Thunk};
use jrsonnet_interner::IStr;

use crate::util::{arg, install, opt_arg};

fn key_istr(s: &Val, context: &'static str) -> Result<IStr> {
	Ok(IStr::from(s.as_str(context)?.as_ref()))
}

fn object_has_impl(_: Context, _: Option<&ExprLocation>, args: &[Thunk], include_hidden: bool) -> Result<Val> {
	let func = if include_hidden { "objectHasAll" } else { "objectHas" };
	let obj = arg(func, args, 0)?.as_obj(func)?;
	let key = key_istr(&arg(func, args, 1)?, func)?;
	Ok(Val::Bool(obj.has_field_ex(&key, include_hidden)))
}
fn object_has(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_has_impl(c, l, a, false)
}
fn object_has_all(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_has_impl(c, l, a, true)
}

fn object_fields_impl(_: Context, _: Option<&ExprLocation>, args: &[Thunk], include_hidden: bool) -> Result<Val> {
	let func = if include_hidden { "objectFieldsAll" } else { "objectFields" };
	let obj = arg(func, args, 0)?.as_obj(func)?;
	let fields = obj.fields_ex(include_hidden);
	Ok(Val::Arr(Rc::new(
		fields.into_iter().map(|f| Thunk::evaluated(Val::Str(f.as_str().into()))).collect(),
	)))
}
fn object_fields(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_fields_impl(c, l, a, false)
}
fn object_fields_all(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_fields_impl(c, l, a, true)
}

fn object_values_impl(_: Context, _: Option<&ExprLocation>, args: &[Thunk], include_hidden: bool) -> Result<Val> {
	let func = if include_hidden { "objectValuesAll" } else { "objectValues" };
	let obj = arg(func, args, 0)?.as_obj(func)?;
	let mut out = Vec::new();
	for field in obj.fields_ex(include_hidden) {
		let value = obj.get(field)?.expect("field listed by fields_ex exists");
		out.push(Thunk::evaluated(value));
	}
	Ok(Val::Arr(Rc::new(out)))
}
fn object_values(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_values_impl(c, l, a, false)
}
fn object_values_all(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_values_impl(c, l, a, true)
}

fn object_keys_values_impl(_: Context, _: Option<&ExprLocation>, args: &[Thunk], include_hidden: bool) -> Result<Val> {
	let func = if include_hidden { "objectKeysValuesAll" } else { "objectKeysValues" };
	let obj = arg(func, args, 0)?.as_obj(func)?;
	let mut out = Vec::new();
	for field in obj.fields_ex(include_hidden) {
		let value = obj.get(field.clone())?.expect("field listed by fields_ex exists");
		out.push(Thunk::evaluated(Val::Obj(jrsonnet_evaluator::obj::simple_object([
			(IStr::from("key"), Val::Str(field.as_str().into())),
			(IStr::from("value"), value),
		]))));
	}
	Ok(Val::Arr(Rc::new(out)))
}
fn object_keys_values(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_keys_values_impl(c, l, a, false)
}
fn object_keys_values_all(c: Context, l: Option<&ExprLocation>, a: &[Thunk]) -> Result<Val> {
	object_keys_values_impl(c, l, a, true)
}

/// `std.get(o, f, default=null, inc_hidden=true)`: `default` is only
/// forced if the field is actually absent.
fn get(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let obj = arg("get", args, 0)?.as_obj("std.get object")?;
	let key = key_istr(&arg("get", args, 1)?, "std.get field")?;
	let include_hidden = match opt_arg(args, 3)? {
		Some(v) => v.as_bool("std.get inc_hidden")?,
		None => true,
	};
	if !obj.has_field_ex(&key, include_hidden) {
		return match opt_arg(args, 2)? {
			Some(v) => Ok(v),
			None => Ok(Val::Null),
		};
	}
	Ok(obj.get(key)?.expect("has_field_ex confirmed presence"))
}

fn map_with_key(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let func = arg("mapWithKey", args, 0)?.as_func("std.mapWithKey function")?;
	let obj = arg("mapWithKey", args, 1)?.as_obj("std.mapWithKey object")?;
	let mut fields = Vec::new();
	for field in obj.visible_fields() {
		let value = obj.get(field.clone())?.expect("field listed by visible_fields exists");
		let mapped = func.call_values(Context::new(), &[Val::Str(field.as_str().into()), value])?;
		fields.push((field, mapped));
	}
	Ok(Val::Obj(jrsonnet_evaluator::obj::simple_object(fields)))
}

/// RFC 7396-style JSON Merge Patch: a non-object patch replaces the target
/// outright; an object patch is applied key-by-key, `null` deleting a key
/// and recursing when both sides are objects.
fn merge_patch_val(target: &Val, patch: &Val) -> Result<Val> {
	let Val::Obj(patch_obj) = patch else {
		return Ok(patch.clone());
	};
	let mut fields: Vec<(IStr, Val)> = Vec::new();
	if let Val::Obj(target_obj) = target {
		for field in target_obj.visible_fields() {
			if !patch_obj.has_field(&field) {
				let value = target_obj.get(field.clone())?.expect("field listed by visible_fields exists");
				fields.push((field, value));
			}
		}
	}
	for field in patch_obj.visible_fields() {
		let patch_value = patch_obj.get(field.clone())?.expect("field listed by visible_fields exists");
		if matches!(patch_value, Val::Null) {
			continue;
		}
		let target_value = match target {
			Val::Obj(target_obj) if target_obj.has_field(&field) => target_obj.get(field.clone())?,
			_ => None,
		};
		let merged = match target_value {
			Some(t) => merge_patch_val(&t, &patch_value)?,
			None => merge_patch_val(&Val::Null, &patch_value)?,
		};
		fields.retain(|(f, _)| f != &field);
		fields.push((field, merged));
	}
	Ok(Val::Obj(jrsonnet_evaluator::obj::simple_object(fields)))
}

fn merge_patch(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let target = arg("mergePatch", args, 0)?;
	let patch = arg("mergePatch", args, 1)?;
	merge_patch_val(&target, &patch)
}

fn is_empty_container(v: &Val) -> bool {
	matches!(v, Val::Null) || matches!(v, Val::Arr(a) if a.is_empty()) || matches!(v, Val::Obj(o) if o.visible_fields().is_empty())
}

/// Recursively strips `null` values and empty arrays/objects, the
/// byproduct of filtering or merging structures built from another
/// `prune`d tree.
fn prune_val(v: &Val) -> Result<Val> {
	Ok(match v {
		Val::Arr(items) => {
			let mut out = Vec::new();
			for item in items.iter() {
				let pruned = prune_val(&item.force()?)?;
				if !is_empty_container(&pruned) {
					out.push(Thunk::evaluated(pruned));
				}
			}
			Val::Arr(Rc::new(out))
		}
		Val::Obj(obj) => {
			let mut fields = Vec::new();
			for field in obj.visible_fields() {
				let value = obj.get(field.clone())?.expect("field listed by visible_fields exists");
				let pruned = prune_val(&value)?;
				if !is_empty_container(&pruned) {
					fields.push((field, pruned));
				}
			}
			Val::Obj(jrsonnet_evaluator::obj::simple_object(fields))
		}
		other => other.clone(),
	})
}

fn prune(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	prune_val(&arg("prune", args, 0)?)
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "objectHas", &["o", "f"], object_has);
	install(builder, "objectHasAll", &["o", "f"], object_has_all);
	install(builder, "objectFields", &["o"], object_fields);
	install(builder, "objectFieldsAll", &["o"], object_fields_all);
	install(builder, "objectValues", &["o"], object_values);
	install(builder, "objectValuesAll", &["o"], object_values_all);
	install(builder, "objectKeysValues", &["o"], object_keys_values);
	install(builder, "objectKeysValuesAll", &["o"], object_keys_values_all);
	install(builder, "get", &["o", "f", "default", "inc_hidden"], get);
	install(builder, "mapWithKey", &["func", "obj"], map_with_key);
	install(builder, "mergePatch", &["target", "patch"], merge_patch);
	install(builder, "prune", &["a"], prune);
}
