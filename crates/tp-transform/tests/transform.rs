use approx::assert_relative_eq;
use tp_tensor::{Dimension, ElementType, StreamConfig, TensorInfo};
use tp_transform::{ErrorCategory, TransformElement};

fn uint8_stream(dims: &str) -> StreamConfig {
    StreamConfig::new(TensorInfo::new(ElementType::Uint8, Dimension::parse(dims).unwrap()))
}

fn configured(mode: &str, option: &str, acceleration: bool) -> TransformElement {
    let mut e = TransformElement::new();
    e.set_property("mode", mode).unwrap();
    e.set_property("option", option).unwrap();
    e.set_acceleration(acceleration);
    e.configure(&uint8_stream("5")).unwrap();
    e
}

fn f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn f64s(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|c| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(c);
            f64::from_ne_bytes(raw)
        })
        .collect()
}

const INPUT: [u8; 5] = [1, 2, 3, 4, 5];

#[test]
fn test_typecast_uint8_to_uint32() {
    for acceleration in [false, true] {
        let e = configured("typecast", "uint32", acceleration);
        assert_eq!(e.output_config().unwrap().info.byte_size().unwrap(), 20);
        let out = e.process(&INPUT).unwrap();
        let expected: Vec<u8> = INPUT.iter().flat_map(|&v| u32::from(v).to_ne_bytes()).collect();
        assert_eq!(out, expected);
    }
}

#[test]
fn test_chain_order_is_significant() {
    for acceleration in [false, true] {
        let e = configured("arithmetic", "typecast:float32,add:.5,mul:0.2", acceleration);
        assert_eq!(e.output_config().unwrap().info.element_type, ElementType::Float32);
        let out = f32s(&e.process(&INPUT).unwrap());
        assert_eq!(out.len(), 5);
        for (got, &x) in out.iter().zip(&INPUT) {
            assert_relative_eq!(*got, (f32::from(x) + 0.5) * 0.2, max_relative = 1e-6);
        }
    }
}

#[test]
fn test_trailing_typecast_is_ignored() {
    for acceleration in [false, true] {
        let e = configured(
            "arithmetic",
            "typecast:float64,add:0.2,add:0.1,typecast:uint16",
            acceleration,
        );
        assert_eq!(e.output_config().unwrap().info.element_type, ElementType::Float64);
        let out = f64s(&e.process(&INPUT).unwrap());
        let expected = [1.3, 2.3, 3.3, 4.3, 5.3];
        assert_eq!(out.len(), expected.len());
        for (got, want) in out.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_integer_round_trip_chain() {
    for acceleration in [false, true] {
        let e = configured("arithmetic", "typecast:int32,mul:2,div:2,add:-1", acceleration);
        let out = e.process(&INPUT).unwrap();
        let expected: Vec<u8> = INPUT
            .iter()
            .flat_map(|&v| (i32::from(v) - 1).to_ne_bytes())
            .collect();
        assert_eq!(out, expected);
    }
}

#[test]
fn test_float_to_unsigned_wraps_through_signed() {
    let mut e = TransformElement::new();
    e.set_property("mode", "arithmetic").unwrap();
    e.set_property("option", "typecast:float32,add:-2,typecast:uint8").unwrap();
    let out_config = e.configure(&uint8_stream("5")).unwrap();
    assert_eq!(out_config.info.element_type, ElementType::Float32);

    let mut cast = TransformElement::new();
    cast.set_property("mode", "typecast").unwrap();
    cast.set_property("option", "uint8").unwrap();
    let float_stream = StreamConfig::new(TensorInfo::new(
        ElementType::Float32,
        Dimension::parse("5").unwrap(),
    ));
    cast.configure(&float_stream).unwrap();
    let input: Vec<u8> = [-1.0f32, 200.0, 255.9, 256.0, -0.5]
        .iter()
        .flat_map(|v| v.to_ne_bytes())
        .collect();
    assert_eq!(cast.process(&input).unwrap(), vec![255, 200, 255, 0, 0]);
}

#[test]
fn test_uint32_max_reads_as_minus_one() {
    let mut e = TransformElement::new();
    e.set_property("mode", "typecast").unwrap();
    e.set_property("option", "float32").unwrap();
    e.configure(&StreamConfig::new(TensorInfo::new(
        ElementType::Uint32,
        Dimension::parse("1").unwrap(),
    )))
    .unwrap();
    let out = f32s(&e.process(&u32::MAX.to_ne_bytes()).unwrap());
    assert_eq!(out, vec![-1.0]);
}

#[test]
fn test_wrong_buffer_size_is_a_processing_error() {
    let e = configured("typecast", "int16", true);
    let err = e.process(&[1, 2, 3, 4]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Processing);
}

#[test]
fn test_multi_axis_stream() {
    let mut e = TransformElement::new();
    e.set_property("mode", "arithmetic").unwrap();
    e.set_property("option", "typecast:int16,mul:-3").unwrap();
    let out = e.configure(&uint8_stream("2:3:2")).unwrap();
    assert_eq!(out.info.dimension.to_string(), "2:3:2:1");
    assert_eq!(out.info.byte_size().unwrap(), 24);

    let input: Vec<u8> = (0..12).collect();
    let result = e.process(&input).unwrap();
    let expected: Vec<u8> = (0i16..12).flat_map(|v| (v * -3).to_ne_bytes()).collect();
    assert_eq!(result, expected);
}
