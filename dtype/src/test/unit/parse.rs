use test_case::test_case;

use crate::*;

#[test_case("double", "double", None, false, None; "plain scalar")]
#[test_case("global double*", "double", None, true, Some(AddrSpace::Global); "global pointer")]
#[test_case("__local float4 *", "float", Some(VectorWidth::Four), true, Some(AddrSpace::Local); "prefixed local vector pointer")]
#[test_case("private devfn_float_type*", FLOAT_TYPE_ALIAS, None, true, Some(AddrSpace::Private); "alias pointer")]
#[test_case("__constant uint16", "uint", Some(VectorWidth::Sixteen), false, Some(AddrSpace::Constant); "constant vector")]
#[test_case("my_t1", "my_t1", None, false, None; "digit suffix outside width set")]
fn parses_fields(
    declaration: &str,
    raw_type: &str,
    width: Option<VectorWidth>,
    pointer: bool,
    space: Option<AddrSpace>,
) {
    let descriptor = TypeDescriptor::from_declaration(declaration).unwrap();
    assert_eq!(descriptor.raw_type(), raw_type);
    assert_eq!(descriptor.vector_width(), width);
    assert_eq!(descriptor.is_pointer(), pointer);
    assert_eq!(descriptor.address_space(), space);
}

#[test]
fn parses_qualifiers_on_both_sides() {
    let descriptor = TypeDescriptor::from_declaration("global const restrict float4* const").unwrap();
    assert_eq!(descriptor.pre_qualifiers(), &[Qualifier::Const, Qualifier::Restrict]);
    assert_eq!(descriptor.post_qualifier(), Some(Qualifier::Const));
    assert_eq!(descriptor.declaration(), "global const restrict float4* const");
}

#[test]
fn prefixed_address_space_normalizes() {
    let descriptor: TypeDescriptor = "__global int*".parse().unwrap();
    assert_eq!(descriptor.declaration(), "global int*");
}

#[test_case("global double* x y", "x"; "trailing tokens")]
#[test_case("double**", "*"; "double pointer")]
#[test_case("double global", "global"; "late address space")]
#[test_case("global local int", "local"; "two address spaces")]
#[test_case("4float", "4float"; "base starts with digit")]
#[test_case("float-4", "float-4"; "bad character")]
fn rejects_with_offending_token(declaration: &str, token: &str) {
    let err = TypeDescriptor::from_declaration(declaration).unwrap_err();
    assert_eq!(err, Error::Syntax { token: token.to_string(), declaration: declaration.to_string() });
    assert!(err.to_string().contains(token));
}

#[test_case(""; "empty")]
#[test_case("global const"; "qualifiers only")]
fn rejects_missing_base(declaration: &str) {
    assert!(matches!(TypeDescriptor::from_declaration(declaration), Err(Error::MissingBaseType { .. })));
}
