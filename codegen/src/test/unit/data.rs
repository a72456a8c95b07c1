use test_case::test_case;

use crate::*;
use devfn_dtype::{FLOAT_TYPE_ALIAS, ScalarDType};

#[test]
fn shape_must_match_values() {
    let err = HostBuffer::from_slice(&[1.0f64, 2.0, 3.0], vec![2, 2]).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { len: 3, .. }));
}

#[test]
fn rows_and_row_length() {
    let matrix = HostBuffer::from_slice(&[0i32; 12], vec![4, 3]).unwrap();
    assert_eq!((matrix.rows(), matrix.row_len(), matrix.len()), (4, 3, 12));

    let single = HostBuffer::from_slice(&[7u8], Vec::<usize>::new()).unwrap();
    assert_eq!((single.rows(), single.row_len()), (1, 1));
}

#[test]
fn typed_access_checks_element_type() {
    let buffer = HostBuffer::from_vec(vec![1.0f32, 2.0]);
    assert_eq!(buffer.to_vec::<f32>().unwrap(), vec![1.0, 2.0]);
    let err = buffer.to_vec::<f64>().unwrap_err();
    assert!(matches!(err, Error::ElementType { expected: ScalarDType::Double, found: ScalarDType::Float }));
}

#[test]
fn conversion_keeps_shape() {
    let buffer = HostBuffer::from_slice(&[1i32, -2, 3, 4], vec![2, 2]).unwrap();
    let converted = buffer.converted(ScalarDType::Double);
    assert_eq!(converted.shape(), &[2, 2]);
    assert_eq!(converted.to_vec::<f64>().unwrap(), vec![1.0, -2.0, 3.0, 4.0]);
}

#[test]
fn half_values_decode() {
    let buffer = HostBuffer::from_vec(vec![half::f16::from_f32(1.5), half::f16::from_f32(-2.0)]);
    assert_eq!(buffer.to_f64(), vec![1.5, -2.0]);
}

#[test]
fn host_array_clones_share_data() {
    let array = HostArray::from(vec![1.0f64, 2.0]);
    let alias = array.clone();
    *alias.write() = HostBuffer::from_vec(vec![5.0f64]);
    assert!(array.ptr_eq(&alias));
    assert_eq!(array.to_vec::<f64>().unwrap(), vec![5.0]);
}

#[test_case("r", AccessMode::ReadOnly, true, false)]
#[test_case("w", AccessMode::WriteOnly, false, true)]
#[test_case("rw", AccessMode::ReadWrite, true, true)]
fn access_modes(text: &str, mode: AccessMode, readable: bool, writable: bool) {
    assert_eq!(text.parse::<AccessMode>().unwrap(), mode);
    assert_eq!(mode.to_string(), text);
    assert_eq!((mode.is_readable(), mode.is_writable()), (readable, writable));
}

#[test]
fn plain_scalar_uses_float_alias() {
    let data = KernelData::scalar(2.5);
    assert_eq!(data.ctype().raw_type(), FLOAT_TYPE_ALIAS);
    assert!(!data.loaded_as_pointer());
    assert!(!data.read_data_back());
    assert_eq!(data.rows(), None);
}

#[test]
fn read_back_follows_mode() {
    let read_only = KernelData::array(vec![1.0f64], "double", AccessMode::ReadOnly).unwrap();
    let read_write = KernelData::array(vec![1.0f64], "double", AccessMode::ReadWrite).unwrap();
    let zeros = KernelData::zeros(vec![3], "int").unwrap();
    assert!(!read_only.read_data_back());
    assert!(read_write.read_data_back());
    assert!(zeros.read_data_back() && zeros.loaded_as_pointer());
    assert_eq!(zeros.rows(), Some(3));
}

#[test]
fn array_like_takes_element_type() {
    let data = KernelData::array_like(vec![1u32, 2, 3], AccessMode::ReadOnly);
    assert_eq!(data.ctype().ctype(), "uint");
    assert_eq!(data.rows(), Some(3));
}

#[test]
fn invalid_ctype_is_rejected() {
    let err = KernelData::zeros(vec![1], "double double").unwrap_err();
    assert!(matches!(err, Error::InvalidType { .. }));
}
