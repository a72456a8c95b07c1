use std::collections::HashSet;

use crate::*;

fn leaf(name: &str) -> Function {
    Function::parse(&format!("double {name}(double x){{ return x; }}")).unwrap()
}

#[test]
fn builder_stores_parts() {
    let function = Function::define()
        .return_type("void")
        .name("reset")
        .parameters(vec!["global double* x".parse().unwrap()])
        .body("x[0] = 0;")
        .extra("#define ZERO 0")
        .call()
        .unwrap();

    assert!(function.is_void());
    assert_eq!(function.extra(), Some("#define ZERO 0"));
    assert_eq!(function.parameter("x").map(Parameter::signature).as_deref(), Some("global double* x"));
    assert!(function.parameter("y").is_none());
}

#[test]
fn duplicate_parameters_are_rejected() {
    let err = Function::parse("void f(double x, int x){}").unwrap_err();
    assert_eq!(err, Error::DuplicateParameter { function: "f".into(), name: "x".into() });
}

#[test]
fn self_dependency_is_a_cycle() {
    let inner = leaf("f");
    let err = Function::parse_with("double f(double x){ return f(x); }", vec![inner], None).unwrap_err();
    assert_eq!(err, Error::DependencyCycle { path: vec!["f".into(), "f".into()] });
}

#[test]
fn transitive_name_cycle_reports_path() {
    let a = leaf("a");
    let b = Function::parse_with("double b(double x){ return a(x); }", vec![a], None).unwrap();
    let err = Function::parse_with("double a(double x){ return b(x); }", vec![b], None).unwrap_err();
    assert_eq!(err, Error::DependencyCycle { path: vec!["a".into(), "b".into(), "a".into()] });
    assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
}

#[test]
fn equality_is_structural() {
    let first = leaf("g");
    let second = leaf("g");
    assert!(!first.ptr_eq(&second));
    assert_eq!(first, second);
    assert_eq!(first.content_hash(), second.content_hash());

    let set: HashSet<Function> = [first.clone(), second].into_iter().collect();
    assert_eq!(set.len(), 1);

    let other_body = Function::parse("double g(double x){ return -x; }").unwrap();
    assert_ne!(first, other_body);
    assert_ne!(first.content_hash(), other_body.content_hash());
}

#[test]
fn equality_includes_dependencies() {
    let with_a = Function::parse_with("double h(double x){ return x; }", vec![leaf("a")], None).unwrap();
    let with_b = Function::parse_with("double h(double x){ return x; }", vec![leaf("b")], None).unwrap();
    let with_a_again = Function::parse_with("double h(double x){ return x; }", vec![leaf("a")], None).unwrap();
    assert_ne!(with_a, with_b);
    assert_eq!(with_a, with_a_again);
}

#[test]
fn differently_named_functions_differ() {
    assert_ne!(leaf("p"), leaf("q"));
}
