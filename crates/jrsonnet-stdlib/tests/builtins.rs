use jrsonnet_evaluator::{val::Val, Vm};

fn vm() -> Vm {
    let vm = Vm::new();
    vm.install_stdlib(jrsonnet_stdlib::stdlib());
    vm
}

fn eval(code: &str) -> Val {
    vm().evaluate_snippet("<test>", code).unwrap_or_else(|e| panic!("{e}"))
}

fn eval_str(code: &str) -> String {
    match eval(code) {
        Val::Str(s) => s.to_string(),
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn length_across_types() {
    assert!(matches!(eval("std.length('abc')"), Val::Num(n) if n == 3.0));
    assert!(matches!(eval("std.length([1, 2, 3, 4])"), Val::Num(n) if n == 4.0));
    assert!(matches!(eval("std.length({ a: 1, b: 2 })"), Val::Num(n) if n == 2.0));
    assert!(matches!(eval("std.length(function(a, b) a)"), Val::Num(n) if n == 2.0));
}

#[test]
fn sort_default_and_keyed() {
    let Val::Arr(a) = eval("std.sort([3, 1, 2])") else { panic!("not an array") };
    let nums: Vec<f64> = a.iter().map(|v| match v { Val::Num(n) => *n, _ => panic!() }).collect();
    assert_eq!(nums, vec![1.0, 2.0, 3.0]);

    let Val::Arr(a) = eval("std.sort([{n: 3}, {n: 1}, {n: 2}], function(x) x.n)") else { panic!() };
    assert_eq!(a.len(), 3);
}

#[test]
fn set_operations() {
    assert!(matches!(eval("std.setMember(2, std.set([3, 1, 2, 1]))"), Val::Bool(true)));
    let Val::Arr(u) = eval("std.setUnion([1, 2], [2, 3])") else { panic!() };
    assert_eq!(u.len(), 3);
    let Val::Arr(i) = eval("std.setInter([1, 2, 3], [2, 3, 4])") else { panic!() };
    assert_eq!(i.len(), 2);
    let Val::Arr(d) = eval("std.setDiff([1, 2, 3], [2])") else { panic!() };
    assert_eq!(d.len(), 2);
}

#[test]
fn hashing_builtins() {
    assert_eq!(eval_str("std.md5('')"), "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(eval_str("std.sha1('')"), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    assert_eq!(
        eval_str("std.sha256('')"),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn base64_round_trip() {
    assert_eq!(eval_str("std.base64('hello')"), "aGVsbG8=");
    assert_eq!(eval_str("std.base64Decode('aGVsbG8=')"), "hello");
    let Val::Arr(bytes) = eval("std.base64DecodeBytes('aGk=')") else { panic!() };
    let vals: Vec<f64> = bytes.iter().map(|v| match v { Val::Num(n) => *n, _ => panic!() }).collect();
    assert_eq!(vals, vec![104.0, 105.0]);
}

#[test]
fn parse_json_round_trip() {
    let v = eval("std.parseJson('{\"a\": [1, 2, true, null]}')");
    let Val::Obj(o) = v else { panic!("not an object") };
    assert!(o.has_field(&"a".into()));
}

#[test]
fn parse_yaml_round_trip() {
    let v = eval("std.parseYaml('a: 1\\nb:\\n  - x\\n  - y\\n')");
    let Val::Obj(o) = v else { panic!("not an object") };
    assert!(o.has_field(&"a".into()));
    assert!(o.has_field(&"b".into()));
}

#[test]
fn manifest_json_ex_uses_given_indent() {
    let rendered = eval_str("std.manifestJsonEx({ a: 1 }, '  ')");
    assert!(rendered.contains("\n  \"a\""), "{rendered}");
}

#[test]
fn manifest_yaml_doc_renders_mapping() {
    let rendered = eval_str("std.manifestYamlDoc({ a: 1, b: 'x' })");
    assert!(rendered.contains("a: 1"), "{rendered}");
    assert!(rendered.contains("b: \"x\"") || rendered.contains("b: x"), "{rendered}");
}

#[test]
fn trace_returns_second_argument_unchanged() {
    assert!(matches!(eval("std.trace('debug message', 42)"), Val::Num(n) if n == 42.0));
}

#[test]
fn ext_var_reads_back_registered_value() {
    let vm = vm();
    vm.add_ext_str("who".into(), "world".into());
    let v = vm.evaluate_snippet("<test>", "std.extVar('who')").unwrap();
    assert!(matches!(v, Val::Str(s) if &*s == "world"));
}
