//! The lexical environment a core-AST node is evaluated in: an immutable,
//! structurally-shared chain of name -> thunk bindings plus the two
//! distinguished `self`/`super` slots.
use std::{fmt, rc::Rc};

use jrsonnet_interner::IStr;
use rustc_hash::FxHashMap;

use crate::{
	error::{Error::VariableIsNotDefined, Result},
	obj::ObjValue,
	val::Thunk,
};

/// A hash map that structurally shares its parent's entries: extending a
/// context only allocates a new map for the newly-bound names, falling back
/// to the parent for everything else. Kept as a simple linked list of small
/// maps rather than a persistent trie since each `local`/call frame only
/// ever introduces a handful of names.
#[derive(Clone)]
enum Bindings {
	Empty,
	Layer(Rc<FxHashMap<IStr, Thunk>>, Rc<Bindings>),
}

impl Bindings {
	fn get(&self, name: &IStr) -> Option<Thunk> {
		match self {
			Self::Empty => None,
			Self::Layer(map, parent) => map.get(name).cloned().or_else(|| parent.get(name)),
		}
	}
}

struct ContextInternals {
	dollar: Option<ObjValue>,
	this: Option<ObjValue>,
	super_obj: Option<ObjValue>,
	bindings: Bindings,
}

/// Cheaply-cloned (`Rc`), immutable lexical environment.
#[derive(Clone)]
pub struct Context(Rc<ContextInternals>);

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("has_this", &self.0.this.is_some())
			.finish_non_exhaustive()
	}
}

impl PartialEq for Context {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Default for Context {
	fn default() -> Self {
		Self::new()
	}
}

impl Context {
	pub fn new() -> Self {
		Self(Rc::new(ContextInternals {
			dollar: None,
			this: None,
			super_obj: None,
			bindings: Bindings::Empty,
		}))
	}

	pub fn dollar(&self) -> Option<&ObjValue> {
		self.0.dollar.as_ref()
	}

	pub fn this(&self) -> Option<&ObjValue> {
		self.0.this.as_ref()
	}

	pub fn super_obj(&self) -> Option<&ObjValue> {
		self.0.super_obj.as_ref()
	}

	pub fn binding(&self, name: &IStr) -> Result<Thunk> {
		self.0
			.bindings
			.get(name)
			.ok_or_else(|| VariableIsNotDefined(name.to_string()).into())
	}

	pub fn has_binding(&self, name: &IStr) -> bool {
		self.0.bindings.get(name).is_some()
	}

	/// A context with `self`/`super`/`$` set for evaluating a field body on
	/// composite object `this`, whose lexically-left composition is `super`.
	pub fn with_object(&self, dollar: Option<ObjValue>, this: ObjValue, super_obj: Option<ObjValue>) -> Self {
		Self(Rc::new(ContextInternals {
			dollar: dollar.or_else(|| self.0.dollar.clone()),
			this: Some(this),
			super_obj,
			bindings: self.0.bindings.clone(),
		}))
	}

	/// Binds one variable, reusing the rest of the chain.
	pub fn with_var(&self, name: IStr, value: Thunk) -> Self {
		let mut map = FxHashMap::with_capacity_and_hasher(1, Default::default());
		map.insert(name, value);
		self.extend(map)
	}

	/// Extends the binding chain with a whole new layer of (mutually
	/// visible) bindings, e.g. for a `local` block or function call.
	pub fn extend(&self, new_bindings: FxHashMap<IStr, Thunk>) -> Self {
		if new_bindings.is_empty() {
			return self.clone();
		}
		Self(Rc::new(ContextInternals {
			dollar: self.0.dollar.clone(),
			this: self.0.this.clone(),
			super_obj: self.0.super_obj.clone(),
			bindings: Bindings::Layer(Rc::new(new_bindings), Rc::new(self.0.bindings.clone())),
		}))
	}
}
