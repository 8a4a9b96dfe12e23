//! Call-argument binding (spec §4.5): positional arguments bind to
//! parameters left-to-right, named arguments bind by name, defaults are
//! evaluated lazily in an environment where every other parameter -- bound
//! or defaulted -- is already visible.
use std::{cell::RefCell, rc::Rc};

use jrsonnet_interner::IStr;
use jrsonnet_parser::ExprLocation;
use rustc_hash::FxHashMap;

use crate::{
	ctx::Context,
	error::{
		Error::{
			BindingParameterASecondTime, FunctionParameterNotBoundInCall, TooManyArgsFunctionHas,
			UnknownFunctionParameter,
		},
		Result,
	},
	throw,
	val::{FuncVal, Thunk, Val},
};

/// Already-lowered call arguments: every argument expression has already
/// been wrapped in a [`Thunk`] in the caller's environment, so binding never
/// forces a value the callee doesn't end up using.
#[derive(Debug, Default)]
pub struct Args {
	pub positional: Vec<Thunk>,
	pub named: Vec<(IStr, Thunk)>,
}

impl Args {
	pub fn positional(args: Vec<Thunk>) -> Self {
		Self {
			positional: args,
			named: Vec::new(),
		}
	}
}

pub fn call_function(func: &FuncVal, ctx: Context, loc: Option<&ExprLocation>, args: &Args) -> Result<Val> {
	match func {
		FuncVal::Normal(desc) => {
			let call_ctx = bind_normal(desc, args)?;
			crate::evaluate::evaluate(call_ctx, &desc.body)
				.map_err(|e| e.push_frame(loc.cloned(), format!("function <{}>", desc.name)))
		}
		FuncVal::Intrinsic(desc) => {
			let positional = bind_intrinsic(&desc.params, args)?;
			let result = (desc.func)(ctx, loc, &positional)?;
			// Forcing every native call's arguments just to notify is wasted
			// work (and would force thunks the caller never needed) when
			// nothing is listening.
			if crate::notifier_installed() {
				if let Ok(forced) = positional.iter().map(Thunk::force).collect::<Result<Vec<_>>>() {
					crate::notify(&desc.name, &forced, &result);
				}
			}
			Ok(result)
		}
		FuncVal::Native(native) => {
			let values = bind_native(&native.params, args)?;
			(native.func)(&values)
		}
	}
}

fn bind_normal(desc: &Rc<crate::val::FuncDesc>, args: &Args) -> Result<Context> {
	let params = &desc.params;
	if args.positional.len() > params.len() {
		throw!(TooManyArgsFunctionHas(params.len()));
	}

	// Every slot is filled in with a thunk that may itself reference the
	// final, fully-bound context (for default expressions) -- so the
	// context this cell holds is only populated once every slot's thunk
	// has been constructed, never while a thunk is running.
	let final_ctx: Rc<RefCell<Option<Context>>> = Rc::new(RefCell::new(None));
	let mut bound: FxHashMap<IStr, Thunk> = FxHashMap::with_capacity_and_hasher(params.len(), Default::default());

	for (i, param) in params.iter().enumerate() {
		if let Some(thunk) = args.positional.get(i) {
			bound.insert(param.0.clone(), thunk.clone());
		}
	}

	for (name, thunk) in &args.named {
		if !params.iter().any(|p| &p.0 == name) {
			throw!(UnknownFunctionParameter(name.to_string()));
		}
		if bound.insert(name.clone(), thunk.clone()).is_some() {
			throw!(BindingParameterASecondTime(name.to_string()));
		}
	}

	for param in params.iter() {
		if bound.contains_key(&param.0) {
			continue;
		}
		match &param.1 {
			Some(default) => {
				let default = default.clone();
				let cell = final_ctx.clone();
				bound.insert(
					param.0.clone(),
					Thunk::new(move || {
						let ctx = cell.borrow().clone().expect("final context set before forcing");
						crate::evaluate::evaluate(ctx, &default)
					}),
				);
			}
			None => throw!(FunctionParameterNotBoundInCall(param.0.to_string())),
		}
	}

	let ctx = desc.ctx.extend(bound);
	*final_ctx.borrow_mut() = Some(ctx.clone());
	Ok(ctx)
}

/// Binds a call against a `std.*` intrinsic's declared parameter names,
/// keeping thunks unforced (intrinsics lazily force only the arguments they
/// actually need, e.g. `std.get`'s `default`). Unlike [`bind_native`],
/// intrinsics have no default-value expressions to fall back to, so a
/// trailing run of unbound parameters is just omitted from the result
/// (callers use `util::opt_arg` to detect that), while a gap before the
/// last bound parameter is an error -- there's no value to put there.
fn bind_intrinsic(params: &[IStr], args: &Args) -> Result<Vec<Thunk>> {
	if args.positional.len() > params.len() {
		throw!(TooManyArgsFunctionHas(params.len()));
	}
	let mut slots: Vec<Option<Thunk>> = vec![None; params.len()];
	for (i, thunk) in args.positional.iter().enumerate() {
		slots[i] = Some(thunk.clone());
	}
	for (name, thunk) in &args.named {
		let Some(i) = params.iter().position(|p| p == name) else {
			throw!(UnknownFunctionParameter(name.to_string()));
		};
		if slots[i].is_some() {
			throw!(BindingParameterASecondTime(name.to_string()));
		}
		slots[i] = Some(thunk.clone());
	}
	let Some(last_bound) = slots.iter().rposition(Option::is_some) else {
		return Ok(Vec::new());
	};
	let mut out = Vec::with_capacity(last_bound + 1);
	for (i, slot) in slots.into_iter().enumerate().take(last_bound + 1) {
		match slot {
			Some(t) => out.push(t),
			None => throw!(FunctionParameterNotBoundInCall(params[i].to_string())),
		}
	}
	Ok(out)
}

fn bind_native(params: &[IStr], args: &Args) -> Result<Vec<Val>> {
	if args.positional.len() > params.len() {
		throw!(TooManyArgsFunctionHas(params.len()));
	}
	let mut values = Vec::with_capacity(params.len());
	for (i, name) in params.iter().enumerate() {
		if let Some(thunk) = args.positional.get(i) {
			values.push(thunk.force()?);
			continue;
		}
		if let Some((_, thunk)) = args.named.iter().find(|(n, _)| n == name) {
			values.push(thunk.force()?);
			continue;
		}
		throw!(FunctionParameterNotBoundInCall(name.to_string()));
	}
	for (name, _) in &args.named {
		if !params.iter().any(|p| p == name) {
			throw!(UnknownFunctionParameter(name.to_string()));
		}
	}
	Ok(values)
}
