use jrsonnet_evaluator::{val::Val, Vm};

fn vm() -> Vm {
	let vm = Vm::new();
	vm.install_stdlib(jrsonnet_stdlib::stdlib());
	vm
}

fn eval(code: &str) -> Val {
	vm().evaluate_snippet("<test>", code).unwrap_or_else(|e| panic!("{e}"))
}

fn eval_err(code: &str) -> String {
	vm().evaluate_snippet("<test>", code).unwrap_err().to_string()
}

#[test]
fn assert_positive() {
	assert!(matches!(eval("assert 1 == 1: 'fail'; null"), Val::Null));
	assert!(matches!(eval("std.assertEqual(1, 1)"), Val::Bool(true)));
}

#[test]
fn assert_negative() {
	let e = eval_err("assert 1 == 2: 'fail'; null");
	assert!(e.starts_with("RUNTIME ERROR: fail"), "{e}");
}

#[test]
fn object_composition_right_wins() {
	let v = eval("({ a: 1, b: 2 } + { b: 3 }).b");
	assert!(matches!(v, Val::Num(n) if n == 3.0));
}

#[test]
fn object_plus_field_adds_across_composition() {
	let v = eval("({ a: [1, 2] } + { a+: [3] }).a");
	let Val::Arr(a) = v else { panic!("not an array") };
	assert_eq!(a.len(), 3);
}

#[test]
fn self_refers_to_outermost_composite() {
	let v = eval("({ a: 1, b: self.a + 1 } + { a: 10 }).b");
	assert!(matches!(v, Val::Num(n) if n == 11.0));
}

#[test]
fn super_refers_to_left_hand_side() {
	let v = eval("({ a: 1 } + { a: super.a + 1 }).a");
	assert!(matches!(v, Val::Num(n) if n == 2.0));
}

#[test]
fn hidden_fields_excluded_from_equality_and_manifestation() {
	assert!(matches!(eval("{ a: 1, b:: 2 } == { a: 1 }"), Val::Bool(true)));
	let rendered = vm().manifest_json(&eval("{ a: 1, b:: 2 }"), 0).unwrap();
	assert_eq!(rendered, "{\"a\":1}");
}

#[test]
fn unhide_via_triple_colon() {
	let rendered = vm().manifest_json(&eval("{ a:: 1 } + { a::: 1 }"), 0).unwrap();
	assert_eq!(rendered, "{\"a\":1}");
}

#[test]
fn assertions_fire_before_manifestation() {
	let e = vm()
		.evaluate_snippet("<test>", "local o = { assert self.a > 0: 'must be positive', a: -1 }; std.manifestJsonEx(o, '')")
		.unwrap_err()
		.to_string();
	assert!(e.contains("must be positive"), "{e}");
}

#[test]
fn top_level_error_gets_a_dollar_frame() {
	let e = eval_err("error 'boom'");
	assert!(e.contains("$"), "{e}");
}

#[test]
fn nested_function_calls_each_push_a_frame() {
	let e = eval_err("local f(n) = if n == 0 then error 'bottomed out' else f(n - 1); f(3)");
	let count = e.matches("function <f>").count();
	assert_eq!(count, 4, "{e}");
}

#[test]
fn object_field_error_gets_its_own_frame() {
	let e = eval_err("{ x: error 'bad field' }.x");
	assert!(e.contains("object <x>"), "{e}");
}

#[test]
fn bitwise_ops_truncate_to_32_bits() {
	assert!(matches!(eval("(1 << 31)"), Val::Num(n) if n == -2147483648.0));
}

#[test]
fn lexicographic_array_ordering() {
	assert!(matches!(eval("[1, 2] < [1, 3]"), Val::Bool(true)));
	assert!(matches!(eval("[1, 2] < [1, 2, 0]"), Val::Bool(true)));
}

#[test]
fn format_string_percent_operator() {
	let v = eval("'%d-%s' % [5, 'x']");
	assert!(matches!(v, Val::Str(s) if &*s == "5-x"));
}
