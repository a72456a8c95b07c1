use test_case::test_case;

use crate::*;

#[test_case("double x", "double", "x"; "plain")]
#[test_case("global const double* data", "global const double*", "data"; "qualified pointer")]
#[test_case("double *x", "double*", "x"; "star glued to name")]
#[test_case("  private float4   model.params ", "private float4", "model.params"; "dotted name and padding")]
fn splits_type_and_name(declaration: &str, dtype: &str, name: &str) {
    let parameter = Parameter::from_declaration(declaration).unwrap();
    assert_eq!(parameter.dtype().declaration(), dtype);
    assert_eq!(parameter.name(), name);
}

#[test_case("x"; "no type")]
#[test_case("double 1x"; "name starts with digit")]
#[test_case("double x."; "dangling dot")]
fn rejects_bad_names(declaration: &str) {
    assert!(matches!(Parameter::from_declaration(declaration), Err(Error::InvalidParameter { .. })));
}

#[test]
fn bad_type_reports_declaration() {
    let err = Parameter::from_declaration("double double x").unwrap_err();
    assert!(matches!(err, Error::ParameterType { ref declaration, .. } if declaration == "double double x"));
}

#[test]
fn dotted_names_lower_to_underscores() {
    let parameter: Parameter = "global double* model.x".parse().unwrap();
    assert_eq!(parameter.cl_name(), "model_x");
    assert_eq!(parameter.signature(), "global double* model_x");
}

#[test]
fn renaming_copies() {
    let original: Parameter = "double x".parse().unwrap();
    let renamed = original.renamed("y");
    assert_eq!(original.name(), "x");
    assert_eq!(renamed.name(), "y");
    assert_eq!(renamed.dtype(), original.dtype());
}
