//! The object model: composite objects built by `+`, field lookup with
//! self/super binding and three-level hiddenness, and assertion running.
use std::{
	cell::RefCell,
	fmt,
	hash::{Hash, Hasher},
	rc::Rc,
};

use jrsonnet_interner::IStr;
use jrsonnet_parser::Visibility;
use rustc_hash::FxHashMap;

use crate::{error::Result, val::Val};

/// A single field's definition on one constituent (simple) object: whether
/// it's a `+:` field, its resolved hiddenness, and a closure producing its
/// value given the composite's `self`/`super`.
#[derive(Clone)]
pub struct FieldSpec {
	pub plus: bool,
	pub visibility: Visibility,
	/// Takes (self, super) and produces the field's value, lazily.
	pub body: Rc<dyn Fn(ObjValue, Option<ObjValue>) -> Result<Val>>,
}

impl fmt::Debug for FieldSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldSpec")
			.field("plus", &self.plus)
			.field("visibility", &self.visibility)
			.finish_non_exhaustive()
	}
}

pub trait ObjectAssertion {
	fn run(&self, this: ObjValue, super_obj: Option<ObjValue>) -> Result<()>;
}
impl<F: Fn(ObjValue, Option<ObjValue>) -> Result<()>> ObjectAssertion for F {
	fn run(&self, this: ObjValue, super_obj: Option<ObjValue>) -> Result<()> {
		self(this, super_obj)
	}
}

type CacheKey = (IStr, usize);

struct ObjValueInternals {
	/// Everything to the left of this constituent in the `+` chain.
	super_obj: Option<ObjValue>,
	fields: Rc<FxHashMap<IStr, FieldSpec>>,
	assertions: Rc<Vec<Rc<dyn ObjectAssertion>>>,
	/// The outermost composite this field was looked up through: set once,
	/// the first time `get`/`with_this` establishes it.
	this_obj: Option<ObjValue>,
	assertions_ran: RefCell<bool>,
	value_cache: RefCell<FxHashMap<CacheKey, Option<Val>>>,
}

/// A (possibly composite) Jsonnet object. Cloning is an `Rc` bump; `+`
/// builds a *new* `ObjValue` that links to the left-hand side as
/// `super_obj` rather than merging fields eagerly, per spec §3/§4.5.
#[derive(Clone)]
pub struct ObjValue(Rc<ObjValueInternals>);

impl fmt::Debug for ObjValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut s = f.debug_struct("ObjValue");
		s.field("fields", &self.0.fields.keys().collect::<Vec<_>>());
		if self.0.super_obj.is_some() {
			s.field("super", &"..");
		}
		s.finish()
	}
}

impl PartialEq for ObjValue {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for ObjValue {}
impl Hash for ObjValue {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_usize(Rc::as_ptr(&self.0) as *const () as usize);
	}
}

impl ObjValue {
	pub fn new(
		super_obj: Option<Self>,
		fields: Rc<FxHashMap<IStr, FieldSpec>>,
		assertions: Rc<Vec<Rc<dyn ObjectAssertion>>>,
	) -> Self {
		Self(Rc::new(ObjValueInternals {
			super_obj,
			fields,
			assertions,
			this_obj: None,
			assertions_ran: RefCell::new(false),
			value_cache: RefCell::new(FxHashMap::new()),
		}))
	}

	pub fn new_empty() -> Self {
		Self::new(None, Rc::new(FxHashMap::new()), Rc::new(Vec::new()))
	}

	/// Implements `left + right`: appends `self` (`left`) as the `super` of
	/// a fresh copy of `other` (`right`), recursing down `other`'s own
	/// super chain so composition stays left-to-right no matter how deep
	/// either side already is.
	pub fn extend_from(&self, left: Self) -> Self {
		match &self.0.super_obj {
			None => Self::new(Some(left), self.0.fields.clone(), self.0.assertions.clone()),
			Some(s) => Self::new(Some(s.extend_from(left)), self.0.fields.clone(), self.0.assertions.clone()),
		}
	}

	/// Binds `self` for lookup purposes: used once, at the point an object
	/// literal is evaluated into a value, so that every field body sees the
	/// outermost composite as `self` (spec invariant: "self inside a field
	/// always denotes the outermost composite").
	pub fn with_this(&self, this_obj: Self) -> Self {
		Self(Rc::new(ObjValueInternals {
			super_obj: self.0.super_obj.clone(),
			fields: self.0.fields.clone(),
			assertions: self.0.assertions.clone(),
			this_obj: Some(this_obj),
			assertions_ran: RefCell::new(false),
			value_cache: RefCell::new(FxHashMap::new()),
		}))
	}

	pub fn is_empty(&self) -> bool {
		self.0.fields.is_empty() && self.0.super_obj.as_ref().map_or(true, Self::is_empty)
	}

	fn enum_fields(&self, visit: &mut impl FnMut(&IStr, &FieldSpec)) {
		if let Some(s) = &self.0.super_obj {
			s.enum_fields(visit);
		}
		for (name, field) in self.0.fields.iter() {
			visit(name, field);
		}
	}

	/// Resolved visibility of every field ever defined on this composite,
	/// applying the rule that the right-most explicit `::`/`:::` wins and
	/// `:::` always forces visible (spec §4.5).
	fn fields_visibility(&self) -> FxHashMap<IStr, bool> {
		let mut out = FxHashMap::new();
		self.enum_fields(&mut |name, field| match field.visibility {
			Visibility::Normal => {
				out.entry(name.clone()).or_insert(true);
			}
			Visibility::Hidden => {
				out.insert(name.clone(), false);
			}
			Visibility::Unhide => {
				out.insert(name.clone(), true);
			}
		});
		out
	}

	pub fn fields_ex(&self, include_hidden: bool) -> Vec<IStr> {
		let mut fields: Vec<IStr> = self
			.fields_visibility()
			.into_iter()
			.filter(|(_, visible)| include_hidden || *visible)
			.map(|(k, _)| k)
			.collect();
		fields.sort();
		fields
	}

	/// Visible fields, in Unicode-code-point-sorted order (manifestation
	/// order, spec §4.5).
	pub fn visible_fields(&self) -> Vec<IStr> {
		self.fields_ex(false)
	}

	pub fn has_field_ex(&self, name: &IStr, include_hidden: bool) -> bool {
		if include_hidden {
			self.has_field_include_hidden(name)
		} else {
			self.fields_visibility().get(name).copied().unwrap_or(false)
		}
	}
	fn has_field_include_hidden(&self, name: &IStr) -> bool {
		self.0.fields.contains_key(name)
			|| self.0.super_obj.as_ref().is_some_and(|s| s.has_field_include_hidden(name))
	}
	pub fn has_field(&self, name: &IStr) -> bool {
		self.has_field_ex(name, false)
	}

	/// Forces and returns every constituent's assertions exactly once per
	/// distinct outermost `self` (the spec requires they fire at least once
	/// before manifestation; this implementation fires eagerly on first
	/// field access, which satisfies that and also `std.assertEqual`-style
	/// direct calls).
	pub fn run_assertions(&self) -> Result<()> {
		let real_this = self.0.this_obj.clone().unwrap_or_else(|| self.clone());
		self.run_assertions_raw(&real_this)
	}
	fn run_assertions_raw(&self, real_this: &Self) -> Result<()> {
		if !*self.0.assertions_ran.borrow() {
			*self.0.assertions_ran.borrow_mut() = true;
			for assertion in self.0.assertions.iter() {
				assertion.run(real_this.clone(), self.0.super_obj.clone())?;
			}
		}
		if let Some(super_obj) = &self.0.super_obj {
			super_obj.run_assertions_raw(real_this)?;
		}
		Ok(())
	}

	/// Looks up `key`, running this composite's assertions first (per the
	/// spec's "fire before any manifestation, eager firing permitted"
	/// contract).
	pub fn get(&self, key: IStr) -> Result<Option<Val>> {
		self.run_assertions()?;
		let real_this = self.0.this_obj.clone().unwrap_or_else(|| self.clone());
		self.get_raw(key, &real_this)
	}

	fn get_raw(&self, key: IStr, real_this: &Self) -> Result<Option<Val>> {
		let cache_key = (key.clone(), Rc::as_ptr(&real_this.0) as *const () as usize);
		if let Some(v) = self.0.value_cache.borrow().get(&cache_key) {
			return Ok(v.clone());
		}
		let value = match (self.0.fields.get(&key), &self.0.super_obj) {
			(Some(field), None) => Some((field.body)(real_this.clone(), None)?),
			(Some(field), Some(super_obj)) => {
				let ours = (field.body)(real_this.clone(), Some(super_obj.with_this(real_this.clone())))?;
				if field.plus {
					match super_obj.get_raw(key, real_this)? {
						Some(left) => Some(crate::evaluate::add_values(&left, &ours)?),
						None => Some(ours),
					}
				} else {
					Some(ours)
				}
			}
			(None, Some(super_obj)) => super_obj.get_raw(key, real_this)?,
			(None, None) => None,
		};
		self.0.value_cache.borrow_mut().insert(cache_key, value.clone());
		Ok(value)
	}

	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Rc::ptr_eq(&a.0, &b.0)
	}
}

/// Incrementally builds a simple (non-composite) object literal's field map
/// and assertion list, then seals it with [`ObjValueBuilder::build`].
pub struct ObjValueBuilder {
	super_obj: Option<ObjValue>,
	fields: FxHashMap<IStr, FieldSpec>,
	assertions: Vec<Rc<dyn ObjectAssertion>>,
}
impl Default for ObjValueBuilder {
	fn default() -> Self {
		Self::new()
	}
}
impl ObjValueBuilder {
	pub fn new() -> Self {
		Self {
			super_obj: None,
			fields: FxHashMap::new(),
			assertions: Vec::new(),
		}
	}
	pub fn with_super(&mut self, super_obj: ObjValue) -> &mut Self {
		self.super_obj = Some(super_obj);
		self
	}
	pub fn assert(&mut self, assertion: impl ObjectAssertion + 'static) -> &mut Self {
		self.assertions.push(Rc::new(assertion));
		self
	}
	pub fn field(
		&mut self,
		name: IStr,
		plus: bool,
		visibility: Visibility,
		body: impl Fn(ObjValue, Option<ObjValue>) -> Result<Val> + 'static,
	) -> &mut Self {
		self.fields.insert(
			name,
			FieldSpec {
				plus,
				visibility,
				body: Rc::new(body),
			},
		);
		self
	}
	pub fn build(self) -> ObjValue {
		ObjValue::new(self.super_obj, Rc::new(self.fields), Rc::new(self.assertions))
	}
}

/// Produces an object whose fields come from an already-materialized map
/// of visible values -- used by `std.prune`/`mergePatch`/`mapWithKey` and
/// similar stdlib functions that build a plain result object.
pub fn simple_object(fields: impl IntoIterator<Item = (IStr, Val)>) -> ObjValue {
	let mut builder = ObjValueBuilder::new();
	for (name, value) in fields {
		let value = value.clone();
		builder.field(name, false, Visibility::Normal, move |_this, _super| Ok(value.clone()));
	}
	builder.build()
}
