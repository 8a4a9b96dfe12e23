//! `jrsonnet-evaluator`: lexical environment, value representation, object
//! model, desugaring, tree-walking evaluator, manifestation, and the VM
//! facade (program cache, external variables, top-level arguments,
//! notifier hook) described in spec §4.5-§4.8.
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]

pub mod analyze;
pub mod ctx;
pub mod desugar;
pub mod error;
pub mod evaluate;
pub mod format;
pub mod function;
pub mod import;
pub mod manifest;
pub mod obj;
pub mod val;

use std::{
	cell::RefCell,
	collections::{HashMap, HashSet},
	path::{Path, PathBuf},
	rc::Rc,
};

use jrsonnet_interner::IStr;
pub use jrsonnet_parser::ExprLocation;
use jrsonnet_parser::LocExpr;

pub use crate::{
	ctx::Context,
	error::{Error, LocError, Result},
	import::ImportResolver,
	obj::ObjValue,
	val::{FuncVal, NativeFunction, Thunk, Val, ValType},
};
use crate::{
	error::Error::{TopLevelIsNotAFunction, UndefinedExternalVariable},
	function::Args,
	import::{FileImportResolver, ImportCache},
	throw,
};

/// A registered external variable/top-level argument: kept as a thunk
/// factory rather than a `Val` directly since ext-code/ext-node bindings
/// must be evaluated in the root context, not the caller's.
#[derive(Clone)]
enum ExtVal {
	Str(IStr),
	Code(Rc<str>),
	Node(LocExpr),
}

impl ExtVal {
	fn into_thunk(self) -> Thunk {
		match self {
			Self::Str(s) => Thunk::evaluated(Val::Str(Rc::from(s.as_str()))),
			Self::Code(code) => Thunk::new(move || {
				let settings = jrsonnet_parser::ParserSettings {
					loc_data: true,
					file_name: Rc::from(Path::new("<ext-code>")),
				};
				let parsed = jrsonnet_parser::parse(&code, &settings)
					.map_err(|e| error::Error::ImportSyntaxError(Box::new(e)))?;
				let vm = current_vm()?;
				analyze::check_unknown_vars(&parsed, &vm.known_globals())?;
				evaluate::evaluate(vm.root_context_for_file(Path::new("<ext-code>")), &desugar::desugar(&parsed))
			}),
			Self::Node(node) => Thunk::new(move || {
				let vm = current_vm()?;
				analyze::check_unknown_vars(&node, &vm.known_globals())?;
				evaluate::evaluate(vm.root_context_for_file(Path::new("<ext-node>")), &node)
			}),
		}
	}
}

/// One observed notification: spec §4.8's leaves-first native-call
/// observer. Fired once per native-function return, after the object
/// field (if any) that call contributed to has finished resolving its
/// own `+` chain: `value` is what the native function itself returned,
/// `merged_value` is that same position after any enclosing `field+:`
/// merge has completed, `partial` says whether such a merge happened,
/// and `path` is the access path (field names/array indices, outermost
/// first) at which the value will appear in the final JSON. A call made
/// outside any object field or array element (e.g. the whole program is
/// a single native call) reports an empty path.
pub struct NotifierEvent<'a> {
	pub function: &'a str,
	pub args: &'a [Val],
	pub value: &'a Val,
	pub merged_value: &'a Val,
	pub partial: bool,
	pub path: &'a [String],
}

pub type NotifierFn = Box<dyn Fn(&NotifierEvent)>;

/// A native call observed while no notifier consumer has read it yet:
/// queued by [`queue_notification`] at call time, finalized (and only
/// then actually dispatched) once the enclosing field/array position's
/// merge has completed.
struct PendingNotification {
	function: String,
	args: Vec<Val>,
	value: Val,
	path: Vec<String>,
}

thread_local! {
	static NOTIFY_PATH: RefCell<Vec<(String, bool)>> = const { RefCell::new(Vec::new()) };
	static NOTIFY_PENDING: RefCell<Vec<PendingNotification>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard pushing one path component (and whether it's a `field+:`
/// position) onto the current-evaluation path stack; popped on drop so
/// an error unwinding out of a field body still leaves the stack clean.
pub(crate) struct NotifyPathGuard;
impl NotifyPathGuard {
	pub(crate) fn push(component: String, plus: bool) -> Self {
		NOTIFY_PATH.with(|p| p.borrow_mut().push((component, plus)));
		Self
	}
}
impl Drop for NotifyPathGuard {
	fn drop(&mut self) {
		NOTIFY_PATH.with(|p| {
			p.borrow_mut().pop();
		});
	}
}

fn current_notify_path() -> Vec<String> {
	NOTIFY_PATH.with(|p| p.borrow().iter().map(|(c, _)| c.clone()).collect())
}

pub(crate) fn pending_notification_count() -> usize {
	NOTIFY_PENDING.with(|p| p.borrow().len())
}

/// Discards any notifications queued since `mark`: used when the body
/// that queued them errored out, so a sibling field's later finalize
/// doesn't inherit orphaned entries.
pub(crate) fn discard_pending_notifications_from(mark: usize) {
	NOTIFY_PENDING.with(|p| p.borrow_mut().truncate(mark));
}

/// Records that `function(args...)` returned `value` at the current
/// path. Not dispatched to the notifier yet -- see
/// [`finalize_pending_notifications`].
pub(crate) fn queue_notification(function: &str, args: Vec<Val>, value: Val) {
	NOTIFY_PENDING.with(|p| {
		p.borrow_mut().push(PendingNotification {
			function: function.to_string(),
			args,
			value,
			path: current_notify_path(),
		});
	});
}

/// Dispatches every notification queued since `mark` to the active VM's
/// notifier, now that `merged_value`/`partial` are known for the
/// position they were queued at. A no-op if no notifier is installed.
pub(crate) fn finalize_pending_notifications(mark: usize, merged_value: &Val, partial: bool) {
	let pending = NOTIFY_PENDING.with(|p| p.borrow_mut().split_off(mark));
	if pending.is_empty() {
		return;
	}
	let Ok(vm) = current_vm() else {
		return;
	};
	if !vm.notifier_installed() {
		return;
	}
	for p in pending {
		vm.notify(&NotifierEvent {
			function: &p.function,
			args: &p.args,
			value: &p.value,
			merged_value,
			partial,
			path: &p.path,
		});
	}
}

struct VmState {
	resolver: Box<dyn ImportResolver>,
	import_cache: ImportCache,
	ext_vars: RefCell<HashMap<IStr, ExtVal>>,
	tlas: RefCell<HashMap<IStr, ExtVal>>,
	tla_positional: RefCell<Vec<ExtVal>>,
	natives: RefCell<HashMap<IStr, Rc<NativeFunction>>>,
	globals: RefCell<HashMap<IStr, LocExpr>>,
	notifier: RefCell<Option<NotifierFn>>,
	std_obj: RefCell<Option<ObjValue>>,
	trace_sink: RefCell<Box<dyn Fn(&str)>>,
}

fn default_trace_sink(line: &str) {
	eprintln!("{line}");
}

/// The embedding API: owns the program cache, importer, ext-var/TLA
/// tables, native-function table, and the pre-loaded standard library.
/// Cheaply cloned (`Rc`); every clone shares the same cache and tables.
#[derive(Clone)]
pub struct Vm(Rc<VmState>);

impl Default for Vm {
	fn default() -> Self {
		Self::new()
	}
}

impl Vm {
	pub fn new() -> Self {
		Self(Rc::new(VmState {
			resolver: Box::new(FileImportResolver::default()),
			import_cache: ImportCache::new(),
			ext_vars: RefCell::new(HashMap::new()),
			tlas: RefCell::new(HashMap::new()),
			tla_positional: RefCell::new(Vec::new()),
			natives: RefCell::new(HashMap::new()),
			globals: RefCell::new(HashMap::new()),
			notifier: RefCell::new(None),
			std_obj: RefCell::new(None),
			trace_sink: RefCell::new(Box::new(default_trace_sink)),
		}))
	}

	pub fn with_resolver(resolver: impl ImportResolver + 'static) -> Self {
		Self(Rc::new(VmState {
			resolver: Box::new(resolver),
			import_cache: ImportCache::new(),
			ext_vars: RefCell::new(HashMap::new()),
			tlas: RefCell::new(HashMap::new()),
			tla_positional: RefCell::new(Vec::new()),
			natives: RefCell::new(HashMap::new()),
			globals: RefCell::new(HashMap::new()),
			notifier: RefCell::new(None),
			std_obj: RefCell::new(None),
			trace_sink: RefCell::new(Box::new(default_trace_sink)),
		}))
	}

	/// Installs the native standard library object bound to the `std`
	/// identifier in every evaluated program's root scope.
	pub fn install_stdlib(&self, std_obj: ObjValue) {
		*self.0.std_obj.borrow_mut() = Some(std_obj);
	}

	pub fn add_ext_str(&self, name: impl Into<IStr>, value: impl Into<IStr>) {
		self.0.ext_vars.borrow_mut().insert(name.into(), ExtVal::Str(value.into()));
	}
	pub fn add_ext_code(&self, name: impl Into<IStr>, code: impl Into<Rc<str>>) {
		self.0.ext_vars.borrow_mut().insert(name.into(), ExtVal::Code(code.into()));
	}
	pub fn add_ext_node(&self, name: impl Into<IStr>, node: LocExpr) {
		self.0.ext_vars.borrow_mut().insert(name.into(), ExtVal::Node(node));
	}
	pub fn reset_ext_vars(&self) {
		self.0.ext_vars.borrow_mut().clear();
	}

	pub fn add_tla_str(&self, name: impl Into<IStr>, value: impl Into<IStr>) {
		self.0.tlas.borrow_mut().insert(name.into(), ExtVal::Str(value.into()));
	}
	pub fn add_tla_code(&self, name: impl Into<IStr>, code: impl Into<Rc<str>>) {
		self.0.tlas.borrow_mut().insert(name.into(), ExtVal::Code(code.into()));
	}
	pub fn reset_tlas(&self) {
		self.0.tlas.borrow_mut().clear();
		self.0.tla_positional.borrow_mut().clear();
	}

	pub fn add_native(&self, name: impl Into<IStr>, params: Vec<IStr>, func: val::NativeFn) {
		let name = name.into();
		self.0.natives.borrow_mut().insert(
			name.clone(),
			Rc::new(NativeFunction {
				name,
				params,
				func,
			}),
		);
	}

	/// Looks up a function registered through [`Vm::add_native`], for
	/// `std.native(name)` (spec §6.4).
	pub fn native(&self, name: &IStr) -> Result<Val> {
		self.0
			.natives
			.borrow()
			.get(name)
			.cloned()
			.map(|n| Val::Func(Rc::new(FuncVal::Native(n))))
			.ok_or_else(|| error::Error::UndefinedExternalFunction(name.to_string()).into())
	}

	/// Binds an additional global identifier to pre-parsed Jsonnet source,
	/// visible to every evaluated program (spec §6.2).
	pub fn bind_global(&self, name: impl Into<IStr>, code: &str) -> Result<()> {
		let settings = jrsonnet_parser::ParserSettings {
			loc_data: true,
			file_name: Rc::from(Path::new("<global>")),
		};
		let parsed = jrsonnet_parser::parse(code, &settings).map_err(|e| error::Error::ImportSyntaxError(Box::new(e)))?;
		analyze::check_unknown_vars(&parsed, &self.known_globals())?;
		self.0.globals.borrow_mut().insert(name.into(), desugar::desugar(&parsed));
		Ok(())
	}

	/// The names visible as free variables in any program this VM evaluates:
	/// `std` plus everything registered through [`Vm::bind_global`]. Used by
	/// [`analyze::check_unknown_vars`] as the static pass's starting scope.
	pub fn known_globals(&self) -> HashSet<IStr> {
		let mut globals: HashSet<IStr> = self.0.globals.borrow().keys().cloned().collect();
		globals.insert("std".into());
		globals
	}

	pub fn set_max_stack(&self, n: usize) {
		evaluate::set_max_stack_depth(n);
	}

	pub fn set_notifier(&self, f: impl Fn(&NotifierEvent) + 'static) {
		*self.0.notifier.borrow_mut() = Some(Box::new(f));
	}

	pub(crate) fn notify(&self, event: &NotifierEvent) {
		if let Some(f) = self.0.notifier.borrow().as_ref() {
			f(event);
		}
	}

	pub(crate) fn notifier_installed(&self) -> bool {
		self.0.notifier.borrow().is_some()
	}

	/// Redirects `std.trace`'s output (spec §6.2's "trace output sink");
	/// defaults to printing one line per call to stderr.
	pub fn set_trace_sink(&self, f: impl Fn(&str) + 'static) {
		*self.0.trace_sink.borrow_mut() = Box::new(f);
	}

	pub(crate) fn trace(&self, line: &str) {
		(self.0.trace_sink.borrow())(line);
	}

	fn ext_var(&self, name: &IStr) -> Result<Thunk> {
		let vars = self.0.ext_vars.borrow();
		let Some(v) = vars.get(name) else {
			throw!(UndefinedExternalVariable(name.to_string()));
		};
		Ok(v.clone().into_thunk())
	}

	/// Root lexical environment for a file: the global `std` binding
	/// (overridden per-file with `std.thisFile`), plus any globals
	/// registered through [`Vm::bind_global`].
	pub fn root_context_for_file(&self, file: &Path) -> Context {
		let base_std = self.0.std_obj.borrow().clone().unwrap_or_else(ObjValue::new_empty);
		let mut this_file_builder = obj::ObjValueBuilder::new();
		let file_str: Rc<str> = Rc::from(file.to_string_lossy().as_ref());
		this_file_builder.field(
			"thisFile".into(),
			false,
			jrsonnet_parser::Visibility::Hidden,
			move |_this, _super| Ok(Val::Str(file_str.clone())),
		);
		let std_obj = this_file_builder.build().extend_from(base_std);

		let mut ctx = Context::new().with_var("std".into(), Thunk::evaluated(Val::Obj(std_obj)));
		for (name, node) in self.0.globals.borrow().iter() {
			let node = node.clone();
			ctx = ctx.with_var(
				name.clone(),
				Thunk::new(move || evaluate::evaluate(current_vm()?.root_context_for_file(Path::new("<global>")), &node)),
			);
		}
		ctx
	}

	fn apply_tlas(&self, val: Val, loc: Option<&ExprLocation>) -> Result<Val> {
		let named: Vec<(IStr, Thunk)> = self
			.0
			.tlas
			.borrow_mut()
			.drain()
			.map(|(name, v)| (name, v.into_thunk()))
			.collect();
		let positional: Vec<Thunk> = self.0.tla_positional.borrow_mut().drain(..).map(ExtVal::into_thunk).collect();
		if named.is_empty() && positional.is_empty() {
			return Ok(val);
        }
		let func = val.as_func("top-level value").map_err(|_| TopLevelIsNotAFunction.into())?;
		let args = Args { positional, named };
		function::call_function(&func, Context::new(), loc, &args)
	}

	/// Evaluates a snippet with no file identity (the anonymous entry
	/// point, spec §6.2): never cached, imports inside it resolve
	/// relative to the process's current directory.
	pub fn evaluate_snippet(&self, file_name: impl AsRef<Path>, code: &str) -> Result<Val> {
		let _guard = CurrentVmGuard::install(self.0.clone());
		let settings = jrsonnet_parser::ParserSettings {
			loc_data: true,
			file_name: Rc::from(file_name.as_ref()),
		};
		let parsed = jrsonnet_parser::parse(code, &settings).map_err(|e| error::Error::ImportSyntaxError(Box::new(e)))?;
		analyze::check_unknown_vars(&parsed, &self.known_globals())?;
		let desugared = desugar::desugar(&parsed);
		let mark = pending_notification_count();
		let val = evaluate::evaluate(self.root_context_for_file(file_name.as_ref()), &desugared)
			.map_err(|e| e.push_frame(desugared.1.clone(), "$".to_string()))?;
		let val = self.apply_tlas(val, desugared.1.as_ref())?;
		finalize_pending_notifications(mark, &val, false);
		Ok(val)
	}

	/// Evaluates a file, resolved and cached the same way `import` would
	/// resolve and cache it (spec §6.2).
	pub fn evaluate_file(&self, path: impl AsRef<Path>) -> Result<Val> {
		let _guard = CurrentVmGuard::install(self.0.clone());
		log::debug!("resolving entry file {}", path.as_ref().display());
		let resolved = self.0.resolver.resolve(None, path.as_ref())?;
		let val = self.0.import_cache.get_or_eval(resolved.clone(), || {
			log::debug!("loading entry file {}", resolved.display());
			let bytes = self.0.resolver.load(&resolved)?;
			let code = String::from_utf8(bytes).map_err(|_| error::Error::ImportBadFileUtf8(resolved.clone()))?;
			let settings = jrsonnet_parser::ParserSettings {
				loc_data: true,
				file_name: Rc::from(resolved.as_path()),
			};
			let parsed = jrsonnet_parser::parse(&code, &settings).map_err(|e| error::Error::ImportSyntaxError(Box::new(e)))?;
			analyze::check_unknown_vars(&parsed, &self.known_globals())?;
			let desugared = desugar::desugar(&parsed);
			evaluate::evaluate(self.root_context_for_file(&resolved), &desugared)
				.map_err(|e| e.push_frame(desugared.1.clone(), "$".to_string()))
		})?;
		let mark = pending_notification_count();
		let val = self.apply_tlas(val, None)?;
		finalize_pending_notifications(mark, &val, false);
		Ok(val)
	}

	pub fn manifest_json(&self, val: &Val, indent: usize) -> Result<String> {
		manifest::manifest_json(val, "", manifest::JsonFormat::Json(Rc::from(" ".repeat(indent))))
	}
	pub fn manifest_yaml(&self, val: &Val) -> Result<String> {
		manifest::manifest_yaml_doc(val, true, false)
	}
	pub fn manifest_multi(&self, val: &Val) -> Result<Vec<(String, String)>> {
		manifest::manifest_multi(val)
	}
	pub fn manifest_stream(&self, val: &Val) -> Result<Vec<String>> {
		manifest::manifest_stream(val)
	}
}

thread_local! {
	static CURRENT_VM: RefCell<Vec<Rc<VmState>>> = const { RefCell::new(Vec::new()) };
}

/// Installs `vm` as the active VM for the duration of one top-level
/// evaluation (a stack, not a single cell, so an import callback that
/// itself drives a nested `Vm::evaluate_*` -- forbidden by spec §5's "must
/// not re-enter the evaluator" contract, but harmless to support -- still
/// unwinds correctly).
struct CurrentVmGuard;
impl CurrentVmGuard {
	fn install(vm: Rc<VmState>) -> Self {
		CURRENT_VM.with(|c| c.borrow_mut().push(vm));
		Self
	}
}
impl Drop for CurrentVmGuard {
	fn drop(&mut self) {
		CURRENT_VM.with(|c| {
			c.borrow_mut().pop();
		});
	}
}

/// The VM installed for the innermost evaluation currently running on
/// this thread. `Err` rather than a panic when nothing is evaluating --
/// embedding code that calls `std.extVar`/`std.native`/the notifier
/// helpers outside a `Vm::evaluate_*` call gets a catchable error, not
/// an abort.
pub(crate) fn current_vm() -> Result<Vm> {
	CURRENT_VM.with(|c| {
		c.borrow()
			.last()
			.cloned()
			.map(Vm)
			.ok_or_else(|| error::Error::RuntimeError("no VM is currently evaluating".to_string()).into())
	})
}

/// `std.extVar` (spec §6.3): looks up the active VM's ext-var table.
pub fn ext_var(name: &IStr) -> Result<Val> {
	current_vm()?.ext_var(name)?.force()
}

/// `std.native` (spec §6.4): looks up the active VM's native-function
/// table.
pub fn native(name: &IStr) -> Result<Val> {
	current_vm()?.native(name)
}

/// Whether a notifier is installed, so callers can skip forcing arguments
/// they'd otherwise only need for a no-op notification. `false` (rather
/// than propagating an error) if no VM is active: this is a best-effort
/// observability hook, not a correctness-load-bearing call.
pub fn notifier_installed() -> bool {
	match current_vm() {
		Ok(vm) => vm.notifier_installed(),
		Err(_) => {
			log::warn!("notifier_installed() called with no VM active");
			false
		}
	}
}

/// `std.trace` (spec's scenario 6): writes one line to the active VM's
/// trace sink and returns nothing itself -- the builtin that calls this
/// returns its second argument unchanged.
pub fn emit_trace(line: &str) {
	match current_vm() {
		Ok(vm) => vm.trace(line),
		Err(_) => log::warn!("emit_trace() called with no VM active: {line}"),
	}
}
