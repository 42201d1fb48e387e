//! # Code Extraction Tests
//!
//! Pulling the executable section out of relocatable object files.

use npusim_core::RuntimeError;
use npusim_core::exec::extract_code_section;

use crate::common::{RETURN_42_CODE, elf_object_with_text, elf_object_without_text};

#[test]
fn test_extracts_text_section_bytes() {
    let object = elf_object_with_text(RETURN_42_CODE);
    let code = extract_code_section(&object).unwrap();
    assert_eq!(code, RETURN_42_CODE);
}

#[test]
fn test_object_without_code_section() {
    let object = elf_object_without_text();
    let err = extract_code_section(&object).unwrap_err();
    assert!(matches!(err, RuntimeError::NoCodeSection));
}

#[test]
fn test_garbage_bytes_fail_to_parse() {
    let err = extract_code_section(b"not an object file").unwrap_err();
    assert!(matches!(err, RuntimeError::Load(_)));
}

#[test]
fn test_empty_input_fails_to_parse() {
    let err = extract_code_section(&[]).unwrap_err();
    assert!(matches!(err, RuntimeError::Load(_)));
}

#[test]
fn test_extracted_code_survives_mapping() {
    let object = elf_object_with_text(RETURN_42_CODE);
    let code = extract_code_section(&object).unwrap();
    let buf = npusim_core::exec::ExecBuffer::new(&code).unwrap();
    assert_eq!(buf.len(), RETURN_42_CODE.len());
}
