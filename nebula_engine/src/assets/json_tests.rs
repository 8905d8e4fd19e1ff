use super::*;

#[test]
fn parses_nested_object_with_mixed_types() {
    let src = br#"{"a": 1, "b": [true, false, null], "c": {"d": "hi\n"}}"#;
    let value = parse(src).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.get("a").unwrap().as_f64(), Some(1.0));
    let arr = obj.get("b").unwrap().as_array().unwrap();
    assert_eq!(arr[0].as_bool(), Some(true));
    assert_eq!(arr[1].as_bool(), Some(false));
    assert_eq!(obj.get("c").unwrap().get("d").unwrap().as_str(), Some("hi\n"));
}

#[test]
fn parses_negative_and_exponent_numbers() {
    let value = parse(b"[-1.5, 2e3, -4.2E-1]").unwrap();
    let arr = value.as_array().unwrap();
    assert_eq!(arr[0].as_f64(), Some(-1.5));
    assert_eq!(arr[1].as_f64(), Some(2000.0));
    assert!((arr[2].as_f64().unwrap() - (-0.42)).abs() < 1e-9);
}

#[test]
fn rejects_trailing_garbage() {
    let err = parse(b"{} garbage").unwrap_err();
    assert_eq!(err, EngineError::InvalidFile);
}

#[test]
fn rejects_unterminated_string() {
    let err = parse(b"\"abc").unwrap_err();
    assert_eq!(err, EngineError::InvalidFile);
}

#[test]
fn empty_object_and_array_parse() {
    let value = parse(b"{\"a\": [], \"b\": {}}").unwrap();
    assert_eq!(value.get("a").unwrap().as_array().unwrap().len(), 0);
    assert_eq!(value.get("b").unwrap().as_object().unwrap().len(), 0);
}
