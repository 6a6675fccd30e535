mod common;

use caress_raw::{
    CaressError, ElementKind, ParseStatus, RawfileSession, ReadOptions, TypeCode, Values,
};
use common::*;

fn next(session: &mut RawfileSession) -> caress_raw::DataUnit {
    match session.next_unit() {
        Ok(ParseStatus::Unit(unit)) => unit,
        other => panic!("expected a data unit, got {:?}", other),
    }
}

fn expect_eof(session: &mut RawfileSession) {
    match session.next_unit() {
        Ok(ParseStatus::Eof) => {}
        other => panic!("expected end of file, got {:?}", other),
    }
}

#[test]
fn minimal_step_file() {
    let (_dir, path) = write_file(&step_file().padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let unit = next(&mut session);
    assert_eq!(unit.element, "STEP");
    assert_eq!(unit.node, "X");
    assert_eq!(unit.value_type, TypeCode::Int16Le);
    assert_eq!(unit.count, 1);
    assert_eq!(unit.element_number, 1);
    assert_eq!(unit.element_kind, Some(ElementKind::Data));
    assert!(session.is_last_of_element());

    let bytes = session.copy_unit(&unit).unwrap();
    assert_eq!(bytes, 42i16.to_ne_bytes().to_vec());
    assert_eq!(session.read_values(&unit).unwrap(), Values::Int16(vec![42]));

    expect_eof(&mut session);
    expect_eof(&mut session);
    assert_eq!(session.descriptor_count(), 1);
    session.close();
}

#[test]
fn big_endian_int32_converts_to_native() {
    let mut w = RawWriter::new();
    w.define("DEFDAT CNT(MON)").label("CNT").int32_be(&[1]).nil().eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let unit = next(&mut session);
    assert_eq!(unit.value_type, TypeCode::Int32Be);
    assert_eq!(session.copy_unit(&unit).unwrap(), 1i32.to_ne_bytes().to_vec());
    assert_eq!(session.read_values(&unit).unwrap(), Values::Int32(vec![1]));
}

#[test]
fn copy_unit_is_idempotent() {
    let mut w = RawWriter::new();
    w.define("DEFDAT MM1(OMGS TTHS)")
        .label("MM1")
        .f64_be(&[12.5, -3.0])
        .vax(&[1.5])
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let unit = next(&mut session);
    assert_eq!(unit.node, "OMGS");
    let first = session.copy_unit(&unit).unwrap();
    let second = session.copy_unit(&unit).unwrap();
    assert_eq!(first, second);
    assert_eq!(session.payload(&unit).unwrap().len(), 16);

    let unit = next(&mut session);
    assert_eq!(unit.node, "TTHS");
    assert_eq!(session.copy_unit(&unit).unwrap(), 1.5f32.to_ne_bytes().to_vec());
    assert!(session.is_last_of_element());
}

#[test]
fn every_type_decodes_to_its_values() {
    let nodes = "A B C D E F G H I J K L";
    let mut w = RawWriter::new();
    w.define(&format!("DEFDAT VALS({})", nodes))
        .label("VALS")
        .int16(&[-2, 300])
        .int16_be(&[7, -7])
        .int32(&[-100_000, 5])
        .int32_be(&[i32::MAX])
        .int64(&[i64::MIN, 1])
        .int64_be(&[1 << 40])
        .f32(&[0.25, -8.5])
        .f32_be(&[3.0e5])
        .f64(&[std::f64::consts::PI])
        .f64_be(&[-1.0e-9])
        .vax(&[-2.75, 1024.0])
        .chars("sample 7")
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let expected = vec![
        ("A", Values::Int16(vec![-2, 300])),
        ("B", Values::Int16(vec![7, -7])),
        ("C", Values::Int32(vec![-100_000, 5])),
        ("D", Values::Int32(vec![i32::MAX])),
        ("E", Values::Int64(vec![i64::MIN, 1])),
        ("F", Values::Int64(vec![1 << 40])),
        ("G", Values::Float32(vec![0.25, -8.5])),
        ("H", Values::Float32(vec![3.0e5])),
        ("I", Values::Float64(vec![std::f64::consts::PI])),
        ("J", Values::Float64(vec![-1.0e-9])),
        ("K", Values::Float32(vec![-2.75, 1024.0])),
        ("L", Values::Text("sample 7".to_string())),
    ];
    for (node, values) in expected {
        let unit = next(&mut session);
        assert_eq!(unit.node, node, "node order");
        assert_eq!(session.read_values(&unit).unwrap(), values, "values of node {}", node);
    }
    assert!(session.is_last_of_element());
    expect_eof(&mut session);
}

#[test]
fn int64_as_double_option() {
    let mut w = RawWriter::new();
    w.define("DEFDAT TIM(T)").label("TIM").int64_be(&[123_456_789]).nil().eof();
    let (_dir, path) = write_file(&w.padded());
    let options = ReadOptions::new().int64_as_double(true);
    let mut session = RawfileSession::open_with(&path, options).unwrap();

    let unit = next(&mut session);
    assert_eq!(session.value_class(&unit), caress_raw::ValueClass::Float64);
    assert_eq!(session.value_class(&unit).code(), 11);
    assert_eq!(unit.value_type.value_class(false), caress_raw::ValueClass::Int64);
    assert_eq!(
        session.copy_unit(&unit).unwrap(),
        123_456_789f64.to_ne_bytes().to_vec()
    );
    assert_eq!(session.read_values(&unit).unwrap(), Values::Float64(vec![123_456_789.0]));
}

#[test]
fn empty_node_yields_empty_unit() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X Y Z)")
        .label("STEP")
        .int16(&[1])
        .nil()
        .int16(&[3])
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let x = next(&mut session);
    assert_eq!(x.node, "X");
    assert!(!session.is_last_of_element());

    let y = next(&mut session);
    assert_eq!(y.node, "Y");
    assert_eq!(y.value_type, TypeCode::Empty);
    assert_eq!(y.count, 0);
    assert_eq!(session.read_values(&y).unwrap(), Values::Empty);

    let z = next(&mut session);
    assert_eq!(z.node, "Z");
    assert_eq!(session.read_values(&z).unwrap(), Values::Int16(vec![3]));
    assert!(session.is_last_of_element());
    expect_eof(&mut session);
}

#[test]
fn redefinition_replaces_keys() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X)")
        .define("DEFDAT STEP(A B)")
        .label("STEP")
        .int16(&[1])
        .int16(&[2])
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    assert_eq!(next(&mut session).node, "A");
    assert_eq!(next(&mut session).node, "B");
    assert_eq!(session.descriptor_count(), 1);
}

#[test]
fn command_elements_and_numbering() {
    let mut w = RawWriter::new();
    w.define("DEFCMD MM(OMGS)")
        .define("DEFDAT COM(TEXT)")
        .label("COM")
        .chars("calibration run")
        .nil()
        .label("MM")
        .f32(&[45.0])
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let com = next(&mut session);
    assert_eq!((com.element_number, com.element.as_str()), (1, "COM"));
    assert_eq!(com.element_kind, Some(ElementKind::Data));

    let mm = next(&mut session);
    assert_eq!((mm.element_number, mm.element.as_str(), mm.node.as_str()), (2, "MM", "OMGS"));
    assert_eq!(mm.element_kind, Some(ElementKind::Command));
    expect_eof(&mut session);
}

#[test]
fn stale_unit_is_rejected() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X Y)").label("STEP").int16(&[1]).int16(&[2]).nil().eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let first = next(&mut session);
    let _second = next(&mut session);
    assert!(matches!(session.copy_unit(&first), Err(CaressError::StaleCursor)));
}

#[test]
fn payload_spanning_blocks() {
    let values: Vec<i32> = (0..700).map(|i| i * 3 - 1000).collect();
    let mut w = RawWriter::new();
    w.define("DEFDAT HIST(DATA)").label("HIST").int32(&values).nil().eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let unit = next(&mut session);
    assert_eq!(unit.count, 700);
    assert_eq!(unit.byte_len(), 2800);
    assert_eq!(session.read_values(&unit).unwrap(), Values::Int32(values));
    expect_eof(&mut session);
}

#[test]
fn truncated_file_ends_without_error() {
    let values: Vec<i16> = (0..400).collect();
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X Y)").label("STEP").int16(&[5]).int16(&values).nil().eof();
    let mut bytes = w.unpadded();
    bytes.truncate(BLOCK + 100);
    let (_dir, path) = write_file(&bytes);
    let mut session = RawfileSession::open(&path).unwrap();

    let unit = next(&mut session);
    assert_eq!(unit.node, "X");
    expect_eof(&mut session);
    expect_eof(&mut session);
}

#[test]
fn empty_and_missing_files() {
    let (_dir, path) = write_file(&[]);
    let mut session = RawfileSession::open(&path).unwrap();
    expect_eof(&mut session);

    let missing = path.with_file_name("missing.dat");
    assert!(matches!(
        RawfileSession::open(&missing),
        Err(CaressError::CannotOpen { .. })
    ));
}

#[test]
fn unsupported_type_fails_only_its_call() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X Y)")
        .label("STEP")
        .raw(&[7, 0])
        .int16(&[9])
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let err = session.next_unit().unwrap_err();
    assert!(matches!(err, CaressError::UnsupportedType(7)), "got {:?}", err);
    assert!(!err.is_fatal());

    let unit = next(&mut session);
    assert_eq!(session.read_values(&unit).unwrap(), Values::Int16(vec![9]));
}

#[test]
fn malformed_description_closes_session() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X)").label("STEP").raw(&[PAREN, INT16_LE, END_OF_FILE]);
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let err = session.next_unit().unwrap_err();
    assert!(matches!(err, CaressError::MalformedUnit(_)), "got {:?}", err);
    assert!(err.is_fatal());
    expect_eof(&mut session);
}

#[test]
fn unknown_type_with_items_is_malformed() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X Y)")
        .label("STEP")
        .raw(&[7, 3, 0xaa, 0xbb, 0xcc])
        .int16(&[9])
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let err = session.next_unit().unwrap_err();
    assert!(matches!(err, CaressError::MalformedUnit(_)), "got {:?}", err);
    expect_eof(&mut session);
}

#[test]
fn huge_count_is_malformed() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X)")
        .label("STEP")
        .raw(&[INT64_LE])
        .count_as(0x1fff_ffff_ffff_ffff, INT64_LE)
        .raw(&[1, 2, 3, 4])
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();

    let err = session.next_unit().unwrap_err();
    assert!(matches!(err, CaressError::MalformedUnit(_)), "got {:?}", err);
    expect_eof(&mut session);
}

#[test]
fn negative_count_is_malformed() {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X)")
        .label("STEP")
        .raw(&[INT16_LE])
        .count_as(-1, INT16_LE)
        .eof();
    let (_dir, path) = write_file(&w.padded());
    let mut session = RawfileSession::open(&path).unwrap();
    assert!(matches!(session.next_unit(), Err(CaressError::MalformedUnit(_))));
}

#[test]
fn text_element_lookup() {
    let mut w = RawWriter::new();
    w.define("DEFDAT COM(TEXT)")
        .define("DEFDAT DATE(D)")
        .label("COM")
        .chars("vanadium reference")
        .nil()
        .label("DATE")
        .chars("17-OCT-26")
        .nil()
        .eof();
    let (_dir, path) = write_file(&w.padded());

    assert_eq!(
        caress_raw::read_text_element(&path, "DATE").unwrap().as_deref(),
        Some("17-OCT-26")
    );
    assert_eq!(
        caress_raw::read_text_element(&path, "COM").unwrap().as_deref(),
        Some("vanadium reference")
    );
    assert_eq!(caress_raw::read_text_element(&path, "TIME").unwrap(), None);
}
