//! Import resolution and the program cache (spec §4.6/§6.2). Resolution
//! (turning a relative path plus an importing file into a canonical path)
//! and loading (turning a canonical path into bytes) are kept as separate
//! trait methods so an embedder can swap in an in-memory resolver (e.g.
//! for tests, or a sandboxed build where imports come from a bundle)
//! without touching path semantics.
use std::{
	cell::RefCell,
	collections::HashMap,
	path::{Path, PathBuf},
	rc::Rc,
};

use crate::{
	error::{
		Error::{ImportBadFileUtf8, ImportFileNotFound, ImportSyntaxError, ResolvedFileNotFound},
		Result,
	},
	throw,
	val::Val,
};

pub trait ImportResolver {
	/// Resolves `path` (as written in an `import`/`importstr`/`importbin`
	/// expression) relative to `from` (the importing file's own resolved
	/// path, or `None` for a top-level snippet with no file identity) into
	/// a canonical path used both as the cache key and as the next
	/// `from` if the imported file itself imports something.
	fn resolve(&self, from: Option<&Path>, path: &Path) -> Result<PathBuf>;
	/// Loads the raw bytes at an already-resolved path.
	fn load(&self, resolved: &Path) -> Result<Vec<u8>>;
}

/// Resolves relative to the importing file's directory, falling back to
/// each of `library_paths` in order (the `-J`/`JSONNET_PATH` search path),
/// and finally to the process's current directory for a path-less
/// top-level snippet; loads straight from the filesystem.
#[derive(Debug, Default)]
pub struct FileImportResolver {
	pub library_paths: Vec<PathBuf>,
}

impl ImportResolver for FileImportResolver {
	fn resolve(&self, from: Option<&Path>, path: &Path) -> Result<PathBuf> {
		let base = from.and_then(Path::parent).unwrap_or_else(|| Path::new("."));
		if let Ok(c) = base.join(path).canonicalize() {
			return Ok(c);
		}
		for lib in &self.library_paths {
			if let Ok(c) = lib.join(path).canonicalize() {
				return Ok(c);
			}
		}
		path.canonicalize()
			.map_err(|_| ImportFileNotFound(from.map(Path::to_path_buf).unwrap_or_default(), path.to_path_buf()).into())
	}

	fn load(&self, resolved: &Path) -> Result<Vec<u8>> {
		std::fs::read(resolved).map_err(|e| ResolvedFileNotFound(resolved.to_path_buf(), e.to_string()).into())
	}
}

/// An in-memory resolver for embedding and tests: `path` keys are used
/// verbatim, with no directory-relative resolution.
#[derive(Debug, Default)]
pub struct MemoryImportResolver {
	pub files: HashMap<PathBuf, Vec<u8>>,
}

impl ImportResolver for MemoryImportResolver {
	fn resolve(&self, _from: Option<&Path>, path: &Path) -> Result<PathBuf> {
		if self.files.contains_key(path) {
			Ok(path.to_path_buf())
		} else {
			throw!(ImportFileNotFound(PathBuf::new(), path.to_path_buf()))
		}
	}

	fn load(&self, resolved: &Path) -> Result<Vec<u8>> {
		self.files
			.get(resolved)
			.cloned()
			.ok_or_else(|| ResolvedFileNotFound(resolved.to_path_buf(), "not present in memory resolver".into()).into())
	}
}

enum CacheEntry {
	Evaluating,
	Done(Val),
}

/// Memoizes `import` by resolved path, per spec §4.6: importing the same
/// file twice (however it was reached) evaluates it once and shares the
/// resulting (still-lazy) value. `importstr`/`importbin` bypass this --
/// they never produce a `Val` worth memoizing as one, so they re-read
/// through the resolver's `load` every time (which a caching resolver can
/// still short-circuit on its own).
#[derive(Default)]
pub struct ImportCache {
	entries: RefCell<HashMap<PathBuf, CacheEntry>>,
}

impl ImportCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get_or_eval(
		&self,
		resolved: PathBuf,
		eval: impl FnOnce() -> Result<Val>,
	) -> Result<Val> {
		if let Some(entry) = self.entries.borrow().get(&resolved) {
			return match entry {
				CacheEntry::Done(v) => Ok(v.clone()),
				CacheEntry::Evaluating => throw!(crate::error::Error::RuntimeError(format!(
					"import cycle detected: {}",
					resolved.display()
				))),
			};
		}
		self.entries.borrow_mut().insert(resolved.clone(), CacheEntry::Evaluating);
		let result = eval();
		match &result {
			Ok(v) => {
				self.entries.borrow_mut().insert(resolved, CacheEntry::Done(v.clone()));
			}
			Err(_) => {
				self.entries.borrow_mut().remove(&resolved);
			}
		}
		result
	}
}

pub fn import_value(path: &Path, loc: Option<&crate::ExprLocation>) -> Result<Val> {
	let vm = crate::current_vm()?;
	let from = loc.map(|l| l.0.as_ref());
	let resolved = vm.0.resolver.resolve(from, path)?;
	vm.0.import_cache.get_or_eval(resolved.clone(), || {
		let bytes = vm.0.resolver.load(&resolved)?;
		let code = String::from_utf8(bytes).map_err(|_| ImportBadFileUtf8(resolved.clone()))?;
		let settings = jrsonnet_parser::ParserSettings {
			loc_data: true,
			file_name: Rc::from(resolved.as_path()),
		};
		let parsed =
			jrsonnet_parser::parse(&code, &settings).map_err(|e| ImportSyntaxError(Box::new(e)))?;
		crate::analyze::check_unknown_vars(&parsed, &vm.known_globals())?;
		let desugared = crate::desugar::desugar(&parsed);
		crate::evaluate::evaluate(vm.root_context_for_file(&resolved), &desugared)
	})
}

pub fn import_str(path: &Path, loc: Option<&crate::ExprLocation>) -> Result<Rc<str>> {
	let vm = crate::current_vm()?;
	let from = loc.map(|l| l.0.as_ref());
	let resolved = vm.0.resolver.resolve(from, path)?;
	let bytes = vm.0.resolver.load(&resolved)?;
	let s = String::from_utf8(bytes).map_err(|_| ImportBadFileUtf8(resolved))?;
	Ok(s.into())
}

pub fn import_bin(path: &Path, loc: Option<&crate::ExprLocation>) -> Result<Vec<u8>> {
	let vm = crate::current_vm()?;
	let from = loc.map(|l| l.0.as_ref());
	let resolved = vm.0.resolver.resolve(from, path)?;
	vm.0.resolver.load(&resolved)
}
