use test_case::test_case;

use crate::{Error, ErrorKind};

#[test_case(Error::Configuration { reason: "x".into() }, ErrorKind::Configuration; "configuration")]
#[test_case(Error::Ir { source: devfn_ir::Error::Syntax { offset: 3, reason: "x".into() } }, ErrorKind::Syntax; "syntax")]
#[test_case(Error::Ir { source: devfn_ir::Error::DependencyCycle { path: vec!["f".into(), "f".into()] } }, ErrorKind::Configuration; "cycle")]
#[test_case(Error::Codegen { source: devfn_codegen::Error::MissingData { name: "x".into() } }, ErrorKind::Configuration; "codegen")]
#[test_case(Error::Device { source: devfn_device::Error::Compile { device: "d".into(), log: "x".into() } }, ErrorKind::Compile; "compile")]
#[test_case(Error::Device { source: devfn_device::Error::Launch { device: "d".into(), reason: "x".into() } }, ErrorKind::Runtime; "launch")]
#[test_case(Error::Device { source: devfn_device::Error::Transfer { device: "d".into(), reason: "x".into() } }, ErrorKind::Runtime; "transfer")]
fn error_kinds(error: Error, kind: ErrorKind) {
    assert_eq!(error.kind(), kind);
}
