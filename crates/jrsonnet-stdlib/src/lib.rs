//! Native implementation of the `std` object every Jsonnet program sees in
//! its root scope (spec §4.7): one [`jrsonnet_evaluator::obj::ObjValueBuilder`]
//! field per builtin, assembled by [`stdlib`] and handed to
//! [`jrsonnet_evaluator::Vm::install_stdlib`].
//!
//! `std.thisFile` isn't installed here: it's per-file, so
//! `jrsonnet_evaluator::Vm::root_context_for_file` layers it on top of this
//! object for every evaluated file instead.
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]

mod arrays;
mod hash;
mod math;
mod objects;
mod parsing;
mod sets;
mod strings;
mod types;
mod util;

use jrsonnet_evaluator::obj::{ObjValue, ObjValueBuilder};

pub fn stdlib() -> ObjValue {
	let mut builder = ObjValueBuilder::new();
	types::install_all(&mut builder);
	arrays::install_all(&mut builder);
	math::install_all(&mut builder);
	objects::install_all(&mut builder);
	strings::install_all(&mut builder);
	sets::install_all(&mut builder);
	hash::install_all(&mut builder);
	parsing::install_all(&mut builder);
	builder.build()
}
