use test_case::test_case;

use crate::parser::{Compound, parse_declaration};
use crate::*;

#[test]
fn parses_simple_function() {
    let function = Function::parse("double square(double x){ return x*x; }").unwrap();
    assert_eq!(function.return_type(), "double");
    assert_eq!(function.name(), "square");
    assert_eq!(function.parameters().len(), 1);
    assert_eq!(function.parameters()[0].signature(), "double x");
    assert_eq!(function.body(), " return x*x; ");
}

#[test]
fn nested_blocks_stay_verbatim() {
    let source = "void f(global double* x){\n    if(x[0] > 0){\n        for(int i = 0; i < 2; i++){ x[i] = 0; }\n    }\n}";
    let declaration = parse_declaration(source).unwrap();
    assert_eq!(declaration.body.depth(), 3);
    assert_eq!(
        declaration.body.inner_text(),
        "\n    if(x[0] > 0){\n        for(int i = 0; i < 2; i++){ x[i] = 0; }\n    }\n"
    );
}

#[test]
fn compound_structure_is_recursive() {
    let declaration = parse_declaration("void f(){a{b}c}").unwrap();
    assert_eq!(
        declaration.body,
        Compound::Block(vec![
            Compound::Text("a".into()),
            Compound::Block(vec![Compound::Text("b".into())]),
            Compound::Text("c".into()),
        ])
    );
}

#[test_case("double* get(int i){ return 0; }", "double*"; "pointer return")]
#[test_case("global float4 * get(int i){ return 0; }", "global float4*"; "address space and spaced star")]
#[test_case("unsigned int get(int i){ return 0; }", "unsigned int"; "multi word return")]
fn return_type_tokens(source: &str, return_type: &str) {
    let function = Function::parse(source).unwrap();
    assert_eq!(function.return_type(), return_type);
    assert_eq!(function.name(), "get");
}

#[test_case("void f(){}"; "empty")]
#[test_case("void f( ){}"; "blank")]
#[test_case("void f(void){}"; "void")]
fn no_arguments(source: &str) {
    assert!(Function::parse(source).unwrap().parameters().is_empty());
}

#[test]
fn multiple_arguments_keep_order() {
    let function = Function::parse("void f(double a, global int* b, private float4* c){}").unwrap();
    let names: Vec<_> = function.parameters().iter().map(Parameter::name).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test_case("double square(double x){ return x*x; "; "unclosed body")]
#[test_case("double square(double x) return x*x; }"; "missing open brace")]
#[test_case("square(double x){}"; "missing return type")]
#[test_case("double square(double x, ){}"; "empty argument")]
#[test_case("double *(double x){}"; "missing name")]
#[test_case("double f(double x){} trailing"; "trailing text")]
fn syntax_errors(source: &str) {
    assert!(matches!(Function::parse(source), Err(Error::Syntax { .. })), "{source}");
}

#[test]
fn argument_errors_surface() {
    assert!(matches!(Function::parse("void f(double){}"), Err(Error::InvalidParameter { .. })));
}
