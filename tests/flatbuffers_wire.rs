//! Wire-framing tests: the `ARROW1` file magic, footer block bookkeeping,
//! schema/field metadata passthrough, and the FlatBuffers vtable-dedup
//! property at the whole-message level (the `writer` module already has a
//! unit test exercising the builder directly).

use lightstream_ipc::batch::{Batch, PrimitiveBatch};
use lightstream_ipc::buffer::Buffer;
use lightstream_ipc::table::table_from_columns;
use lightstream_ipc::wire::footer;
use lightstream_ipc::{decode_ipc, table_to_ipc, DataType, Field, IpcFormat, Schema};

fn int_table(n_cols: usize, n_rows: i32) -> lightstream_ipc::Table {
    let fields: Vec<Field> = (0..n_cols).map(|i| Field::new(format!("c{i}"), DataType::int32(), false, None)).collect();
    let schema = Schema::new(fields);
    let batches = (0..n_cols).map(|_| Batch::Int32(PrimitiveBatch::new(Buffer::from((0..n_rows).collect::<Vec<_>>()), None))).collect();
    table_from_columns(schema, batches).unwrap()
}

#[test]
fn file_format_starts_and_ends_with_arrow1_magic() {
    let table = int_table(2, 3);
    let bytes = table_to_ipc(&table, IpcFormat::File, None).unwrap();
    assert_eq!(&bytes[0..6], footer::FILE_MAGIC);
    assert_eq!(&bytes[bytes.len() - 6..], footer::FILE_MAGIC);
}

#[test]
fn footer_block_directory_points_at_every_written_message() {
    let table = int_table(2, 3);
    let bytes = table_to_ipc(&table, IpcFormat::File, None).unwrap();
    let footer_bytes = footer::extract_footer_bytes(&bytes).unwrap();
    let parsed = footer::decode_footer(footer_bytes).unwrap();

    assert_eq!(parsed.schema.fields.len(), 2);
    assert_eq!(parsed.record_batches.len(), 1);
    assert!(parsed.dictionaries.is_empty());
    for block in &parsed.record_batches {
        assert!((block.offset as usize) < bytes.len());
    }
}

#[test]
fn field_and_schema_metadata_round_trips_in_order() {
    // Deliberately not alphabetical: a BTreeMap-backed metadata store would
    // re-sort these and this test would pass for the wrong reason.
    let field_meta = vec![("z_extra".to_string(), "1".to_string()), ("pandas_type".to_string(), "int64".to_string())];
    let schema_meta = vec![
        ("written_by".to_string(), "lightstream-ipc".to_string()),
        ("pandas".to_string(), "{\"index_columns\": []}".to_string()),
    ];

    let field = Field::new("id", DataType::int32(), false, Some(field_meta.clone()));
    let schema = Schema::new(vec![field]).with_metadata(schema_meta.clone());
    let batch = Batch::Int32(PrimitiveBatch::new(Buffer::from(vec![1, 2, 3]), None));
    let table = table_from_columns(schema, vec![batch]).unwrap();

    let bytes = table_to_ipc(&table, IpcFormat::File, None).unwrap();
    let decoded = decode_ipc(&bytes).unwrap();

    assert_eq!(decoded.schema().metadata, schema_meta);
    assert_eq!(decoded.schema().fields[0].metadata, field_meta);
}

#[test]
fn repeated_identical_field_shapes_produce_a_smaller_schema_than_naive_duplication() {
    // Every field here shares an identical vtable layout (name, type, nullable,
    // no children, no metadata); if vtable dedup is working the FlatBuffers
    // schema message grows roughly linearly in field *data* and not in
    // per-field vtable bytes. A regression to "one vtable per field" would
    // make a 64-field schema detectably larger per field than a 2-field one.
    let small = int_table(2, 1);
    let large = int_table(64, 1);

    let small_bytes = table_to_ipc(&small, IpcFormat::Stream, None).unwrap();
    let large_bytes = table_to_ipc(&large, IpcFormat::Stream, None).unwrap();

    let per_field_small = small_bytes.len() as f64 / 2.0;
    let per_field_large = large_bytes.len() as f64 / 64.0;
    // Generous bound: with dedup, per-field overhead should not grow; without
    // it (one vtable per field), per-field bytes would climb noticeably.
    assert!(
        per_field_large < per_field_small * 1.5,
        "per-field size grew too much ({per_field_small} -> {per_field_large}), vtable dedup may have regressed"
    );
}

#[test]
fn stream_format_has_no_arrow1_magic() {
    let table = int_table(1, 1);
    let bytes = table_to_ipc(&table, IpcFormat::Stream, None).unwrap();
    assert_ne!(&bytes[0..6.min(bytes.len())], footer::FILE_MAGIC);
    assert_eq!(lightstream_ipc::ipc::detect_format(&bytes), IpcFormat::Stream);
}
