//! Hashing/encoding builtins: `md5, sha1, sha256, sha512, base64,
//! base64Decode, base64DecodeBytes`.
use std::rc::Rc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use jrsonnet_evaluator::{error::Error::RuntimeError, obj::ObjValueBuilder, throw, val::Val, Context, ExprLocation, Result, Thunk};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::util::{arg, install};

fn hex_encode(bytes: &[u8]) -> String {
	let mut out = String::with_capacity(bytes.len() * 2);
	for b in bytes {
		out.push_str(&format!("{b:02x}"));
	}
	out
}

fn md5(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("md5", args, 0)?.as_str("std.md5 argument")?;
	Ok(Val::Str(format!("{:x}", md5::compute(s.as_bytes())).into()))
}

fn sha1(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("sha1", args, 0)?.as_str("std.sha1 argument")?;
	let mut hasher = Sha1::new();
	hasher.update(s.as_bytes());
	Ok(Val::Str(hex_encode(&hasher.finalize()).into()))
}

fn sha256(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("sha256", args, 0)?.as_str("std.sha256 argument")?;
	let mut hasher = Sha256::new();
	hasher.update(s.as_bytes());
	Ok(Val::Str(hex_encode(&hasher.finalize()).into()))
}

fn sha512(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("sha512", args, 0)?.as_str("std.sha512 argument")?;
	let mut hasher = Sha512::new();
	hasher.update(s.as_bytes());
	Ok(Val::Str(hex_encode(&hasher.finalize()).into()))
}

/// `std.base64(input)`: accepts either a string (encoded as its UTF-8 bytes)
/// or an array of byte-valued numbers, matching the two call shapes the
/// real stdlib documents.
fn base64_encode(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let bytes = match arg("base64", args, 0)? {
		Val::Str(s) => s.as_bytes().to_vec(),
		Val::Arr(items) => {
			let mut out = Vec::with_capacity(items.len());
			for item in items.iter() {
				out.push(item.force()?.as_num("std.base64 array element")? as u8);
			}
			out
		}
		other => throw!(RuntimeError(format!("std.base64: expected string or array, got {}", other.value_type()))),
	};
	Ok(Val::Str(STANDARD.encode(bytes).into()))
}

fn base64_decode_bytes(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("base64DecodeBytes", args, 0)?.as_str("std.base64DecodeBytes argument")?;
	let bytes = STANDARD
		.decode(s.as_bytes())
		.map_err(|e| RuntimeError(format!("std.base64DecodeBytes: {e}")))?;
	Ok(Val::Arr(Rc::new(bytes.into_iter().map(|b| Thunk::evaluated(Val::Num(b as f64))).collect())))
}

fn base64_decode(_: Context, _: Option<&ExprLocation>, args: &[Thunk]) -> Result<Val> {
	let s = arg("base64Decode", args, 0)?.as_str("std.base64Decode argument")?;
	let bytes = STANDARD
		.decode(s.as_bytes())
		.map_err(|e| RuntimeError(format!("std.base64Decode: {e}")))?;
	let s = String::from_utf8(bytes).map_err(|_| RuntimeError("std.base64Decode: decoded bytes are not valid utf-8".into()))?;
	Ok(Val::Str(s.into()))
}

pub fn install_all(builder: &mut ObjValueBuilder) {
	install(builder, "md5", &["s"], md5);
	install(builder, "sha1", &["s"], sha1);
	install(builder, "sha256", &["s"], sha256);
	install(builder, "sha512", &["s"], sha512);
	install(builder, "base64", &["input"], base64_encode);
	install(builder, "base64Decode", &["str"], base64_decode);
	install(builder, "base64DecodeBytes", &["str"], base64_decode_bytes);
}
