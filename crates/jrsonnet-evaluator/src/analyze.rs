//! Static analysis (spec §4.3): a pre-evaluation walk over the surface AST
//! that resolves every variable reference against its lexical scope plus a
//! caller-supplied set of global names, rejecting unknown variables before
//! evaluation begins. This is what makes an unbound variable a
//! `STATIC ERROR` with a single span and no stack (spec §7), rather than a
//! `RUNTIME ERROR` discovered mid-evaluation -- §4.5 assumes this pass has
//! already run, so `evaluate::evaluate`'s `Expr::Var` case should never see
//! a name this pass would have rejected.
use std::{collections::HashSet, rc::Rc};

use jrsonnet_parser::{
	BindSpec, CompSpec, Expr, FieldName, ForSpecData, IfSpecData, LocExpr, Member, ObjBody, ObjComp,
	ParamsDesc,
};
use jrsonnet_interner::IStr;

use crate::error::{Error, Result};

/// An immutable, structurally-shared set of names in scope: the same
/// cons-list shape `ctx::Bindings` uses for thunks, carrying names instead
/// since this pass never needs to hold a value.
#[derive(Clone)]
enum Scope {
	Empty,
	Layer(Rc<HashSet<IStr>>, Rc<Scope>),
}

impl Scope {
	fn contains(&self, name: &IStr) -> bool {
		match self {
			Self::Empty => false,
			Self::Layer(set, parent) => set.contains(name) || parent.contains(name),
		}
	}

	fn extend(&self, names: impl IntoIterator<Item = IStr>) -> Self {
		let set: HashSet<IStr> = names.into_iter().collect();
		if set.is_empty() {
			return self.clone();
		}
		Self::Layer(Rc::new(set), Rc::new(self.clone()))
	}
}

fn unknown_variable(expr: &LocExpr, name: &IStr) -> Error {
	let msg = match &expr.1 {
		Some(loc) => {
			let (line, col) = jrsonnet_parser::location::line_col(&loc.0, loc.1);
			format!("{}:{}:{}: Unknown variable: {}", loc.0.display(), line, col, name)
		}
		None => format!("Unknown variable: {name}"),
	};
	Error::StaticError(msg)
}

/// Checks `expr`, and everything reachable from it, for variable references
/// that resolve to neither an enclosing lexical binding nor `globals` (the
/// names the embedder has pre-declared, e.g. `std` and anything bound
/// through [`crate::Vm::bind_global`]).
pub fn check_unknown_vars(expr: &LocExpr, globals: &HashSet<IStr>) -> Result<()> {
	let root = Scope::Empty.extend(globals.iter().cloned());
	walk(expr, &root)
}

fn walk_all(items: &[LocExpr], scope: &Scope) -> Result<()> {
	for item in items {
		walk(item, scope)?;
	}
	Ok(())
}

/// Parameter defaults and the function body both see every parameter,
/// matching `function::bind_normal`'s "every slot inserted as a thunk
/// before any default is forced" binding order -- so a default referencing
/// a sibling parameter, in either direction, is not an unknown variable.
fn walk_params(params: &ParamsDesc, scope: &Scope) -> Result<Scope> {
	let inner = scope.extend(params.iter().map(|p| p.0.clone()));
	for param in params.iter() {
		if let Some(default) = &param.1 {
			walk(default, &inner)?;
		}
	}
	Ok(inner)
}

/// Binds a `local` block's names (mutually visible, matching
/// `evaluate::bind_locals`) and checks every binding's value/defaults.
/// `scope` must already include the bound names themselves.
fn walk_binds(binds: &[BindSpec], scope: &Scope) -> Result<()> {
	for bind in binds {
		match &bind.params {
			None => walk(&bind.value, scope)?,
			Some(params) => {
				let inner = walk_params(params, scope)?;
				walk(&bind.value, &inner)?;
			}
		}
	}
	Ok(())
}

/// Folds a comprehension's `for`/`if` chain left to right, checking each
/// clause against the scope accumulated so far and returning the scope the
/// comprehension's body/key/value should see.
fn scope_after_comp_specs(specs: &[CompSpec], scope: &Scope) -> Result<Scope> {
	let mut cur = scope.clone();
	for spec in specs {
		match spec {
			CompSpec::ForSpec(ForSpecData(name, iter)) => {
				walk(iter, &cur)?;
				cur = cur.extend([name.clone()]);
			}
			CompSpec::IfSpec(IfSpecData(cond)) => {
				walk(cond, &cur)?;
			}
		}
	}
	Ok(cur)
}

fn walk_obj_body(body: &ObjBody, scope: &Scope) -> Result<()> {
	match body {
		ObjBody::MemberList(members) => {
			let local_names = members.iter().filter_map(|m| match m {
				Member::BindStmt(b) => Some(b.name.clone()),
				_ => None,
			});
			let inner = scope.extend(local_names);
			for member in members {
				match member {
					Member::BindStmt(bind) => walk_binds(std::slice::from_ref(bind), &inner)?,
					Member::AssertStmt(assert) => {
						walk(&assert.0, &inner)?;
						if let Some(msg) = &assert.1 {
							walk(msg, &inner)?;
						}
					}
					Member::Field(field) => {
						if let FieldName::Dyn(key) = &field.name {
							walk(key, &inner)?;
						}
						match &field.params {
							None => walk(&field.value, &inner)?,
							Some(params) => {
								let p_inner = walk_params(params, &inner)?;
								walk(&field.value, &p_inner)?;
							}
						}
					}
				}
			}
			Ok(())
		}
		ObjBody::ObjComp(comp) => walk_obj_comp(comp, scope),
	}
}

fn walk_obj_comp(comp: &ObjComp, scope: &Scope) -> Result<()> {
	let after_specs = scope_after_comp_specs(&comp.compspecs, scope)?;
	let mut binds: Vec<&BindSpec> = comp.pre_locals.iter().collect();
	binds.extend(comp.post_locals.iter());
	let local_names = binds.iter().map(|b| b.name.clone());
	let inner = after_specs.extend(local_names);
	for bind in binds {
		match &bind.params {
			None => walk(&bind.value, &inner)?,
			Some(params) => {
				let p_inner = walk_params(params, &inner)?;
				walk(&bind.value, &p_inner)?;
			}
		}
	}
	walk(&comp.key, &inner)?;
	walk(&comp.value, &inner)
}

fn walk(expr: &LocExpr, scope: &Scope) -> Result<()> {
	match &*expr.0 {
		Expr::Literal(_) | Expr::Str(_) | Expr::Num(_) => Ok(()),
		Expr::Var(name) => {
			if scope.contains(name) {
				Ok(())
			} else {
				Err(unknown_variable(expr, name).into())
			}
		}

		Expr::Arr(items) => walk_all(items, scope),
		Expr::ArrComp(body, specs) => {
			let inner = scope_after_comp_specs(specs, scope)?;
			walk(body, &inner)
		}

		Expr::Obj(body) => walk_obj_body(body, scope),
		Expr::ObjExtend(base, body) => {
			walk(base, scope)?;
			walk_obj_body(body, scope)
		}

		Expr::Parened(inner) | Expr::UnaryOp(_, inner) | Expr::ErrorStmt(inner) => walk(inner, scope),
		Expr::BinaryOp(a, _, b) | Expr::Index(a, b) => {
			walk(a, scope)?;
			walk(b, scope)
		}

		Expr::AssertExpr(assert, rest) => {
			walk(&assert.0, scope)?;
			if let Some(msg) = &assert.1 {
				walk(msg, scope)?;
			}
			walk(rest, scope)
		}
		Expr::LocalExpr(binds, rest) => {
			let inner = scope.extend(binds.iter().map(|b| b.name.clone()));
			walk_binds(binds, &inner)?;
			walk(rest, &inner)
		}

		Expr::Import(_) | Expr::ImportStr(_) | Expr::ImportBin(_) => Ok(()),
		Expr::Apply(f, args, _) => {
			walk(f, scope)?;
			walk_all(&args.unnamed, scope)?;
			for (_, e) in &args.named {
				walk(e, scope)?;
			}
			Ok(())
		}
		Expr::Slice(a, slice) => {
			walk(a, scope)?;
			for part in [&slice.start, &slice.end, &slice.step] {
				if let Some(e) = part {
					walk(e, scope)?;
				}
			}
			Ok(())
		}
		Expr::Function(params, body) => {
			let inner = walk_params(params, scope)?;
			walk(body, &inner)
		}
		Expr::IfElse {
			cond,
			cond_then,
			cond_else,
		} => {
			walk(&cond.0, scope)?;
			walk(cond_then, scope)?;
			if let Some(e) = cond_else {
				walk(e, scope)?;
			}
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use jrsonnet_parser::ParserSettings;

	use super::*;

	fn parse(src: &str) -> LocExpr {
		let settings = ParserSettings {
			loc_data: true,
			file_name: Rc::from(PathBuf::from("<test>")),
		};
		jrsonnet_parser::parse(src, &settings).expect("parses")
	}

	fn globals() -> HashSet<IStr> {
		let mut set = HashSet::new();
		set.insert(IStr::from("std"));
		set
	}

	#[test]
	fn rejects_unknown_variable() {
		let expr = parse("x + 1");
		let err = check_unknown_vars(&expr, &globals()).unwrap_err();
		assert!(matches!(err.error(), Error::StaticError(_)));
		assert!(err.is_static());
	}

	#[test]
	fn accepts_local_and_function_scoping() {
		let expr = parse("local x = 1, f(y) = x + y; [f(1), std.length([1,2])]");
		check_unknown_vars(&expr, &globals()).expect("should resolve every name");
	}

	#[test]
	fn accepts_comprehension_variables() {
		let expr = parse("[x * 2 for x in [1, 2, 3] if x > 1]");
		check_unknown_vars(&expr, &globals()).expect("for-bound name should be visible");
	}

	#[test]
	fn accepts_object_locals_and_self_reference() {
		let expr = parse("{ local helper = 1, a: helper, b: self.a }");
		check_unknown_vars(&expr, &globals()).expect("object locals should be visible to every field");
	}

	#[test]
	fn rejects_unknown_variable_inside_function_body() {
		let expr = parse("function(a) a + b");
		let err = check_unknown_vars(&expr, &globals()).unwrap_err();
		assert!(matches!(err.error(), Error::StaticError(_)));
	}
}
