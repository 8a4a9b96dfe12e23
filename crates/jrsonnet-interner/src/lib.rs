//! Interned strings used for identifiers and field names throughout the
//! parser and evaluator. Interning gives O(1) equality/hashing and cheap
//! clones, which matters because the same identifier (`self`, a field name,
//! a parameter name) is looked up and compared many times per evaluation.
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_const_for_fn)]

use std::{
	borrow::Cow,
	cell::RefCell,
	fmt::{self, Display},
	hash::{BuildHasherDefault, Hash, Hasher},
	ops::Deref,
	rc::Rc,
};

use hashbrown::HashMap;
use rustc_hash::FxHasher;

/// Interned string.
///
/// All `IStr`s sharing the same text share the same allocation: equality and
/// hashing are pointer-based, not content-based.
#[derive(Clone, Eq)]
pub struct IStr(Rc<str>);

impl IStr {
	#[must_use]
	pub fn empty() -> Self {
		"".into()
	}
	#[must_use]
	pub fn as_str(&self) -> &str {
		self
	}
}

impl Deref for IStr {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl PartialEq for IStr {
	fn eq(&self, other: &Self) -> bool {
		// Every IStr is obtained from the thread-local pool, so two IStrs
		// with equal contents always share the same allocation.
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl PartialEq<str> for IStr {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}
impl PartialOrd for IStr {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for IStr {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		// Unicode-code-point order, used directly by object-key sorting during manifestation.
		(*self.0).cmp(&*other.0)
	}
}

impl Hash for IStr {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_usize(Rc::as_ptr(&self.0).cast::<()>() as usize);
	}
}

impl Drop for IStr {
	fn drop(&mut self) {
		maybe_unpool(&self.0);
	}
}

impl fmt::Debug for IStr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.0, f)
	}
}
impl Display for IStr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl<'c> From<Cow<'c, str>> for IStr {
	fn from(v: Cow<'c, str>) -> Self {
		intern(&v)
	}
}
impl From<&str> for IStr {
	fn from(v: &str) -> Self {
		intern(v)
	}
}
impl From<String> for IStr {
	fn from(s: String) -> Self {
		intern(&s)
	}
}
impl From<&String> for IStr {
	fn from(s: &String) -> Self {
		intern(s)
	}
}
impl From<char> for IStr {
	fn from(value: char) -> Self {
		let mut buf = [0; 4];
		Self::from(&*value.encode_utf8(&mut buf))
	}
}

thread_local! {
	// Pure memory-deduplication cache, not part of any evaluation's observable
	// state: two VMs running on the same thread share it transparently.
	static POOL: RefCell<HashMap<Rc<str>, (), BuildHasherDefault<FxHasher>>> =
		RefCell::new(HashMap::with_capacity_and_hasher(200, BuildHasherDefault::default()));
}

fn maybe_unpool(rc: &Rc<str>) {
	// First reference is `rc` itself, second is the pool's own copy.
	if Rc::strong_count(rc) <= 2 {
		POOL.with(|pool| {
			pool.borrow_mut().remove(rc);
		});
	}
}

#[must_use]
pub fn intern(s: &str) -> IStr {
	POOL.with(|pool| {
		let mut pool = pool.borrow_mut();
		if let Some((k, ())) = pool.get_key_value(s) {
			return IStr(k.clone());
		}
		let rc: Rc<str> = Rc::from(s);
		pool.insert(rc.clone(), ());
		IStr(rc)
	})
}

#[cfg(test)]
mod tests {
	use super::IStr;

	#[test]
	fn interned_strings_share_allocation() {
		let a = IStr::from("hello");
		let b = IStr::from("hello");
		assert_eq!(a, b);
		assert!(std::rc::Rc::ptr_eq(&a.0, &b.0));
	}

	#[test]
	fn distinct_strings_differ() {
		let a = IStr::from("a");
		let b = IStr::from("b");
		assert_ne!(a, b);
	}

	#[test]
	fn ordering_is_by_codepoint() {
		let mut v = vec![IStr::from("b"), IStr::from("a"), IStr::from("c")];
		v.sort();
		assert_eq!(v, vec![IStr::from("a"), IStr::from("b"), IStr::from("c")]);
	}
}
