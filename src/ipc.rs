//! # **IPC Module** - *Top-level stream/file decode and encode entry points*
//!
//! Drives [`crate::wire::message`]/[`crate::wire::footer`] message-by-message
//! and [`crate::decode`] batch-by-batch to turn a whole IPC stream or file
//! into a [`Table`], and the reverse. Format detection follows the `ARROW1`
//! magic the way [`crate::wire::footer`] documents it: present at both ends
//! of a File-format buffer, absent from a Stream-format one.

use std::sync::Arc;

use crate::batch::Batch;
use crate::column::Column;
use crate::datatype::DataType;
use crate::decode::{decode_record_batch_fields, encode_batches_to_body, DictionaryContext};
use crate::error::{ArrowIpcError, Result};
use crate::field::Field;
use crate::hashmap::{HashMap, HashSet};
use crate::schema::{MetadataVersion, Schema};
use crate::table::Table;
use crate::wire::batch_codec::DictionaryBatchMeta;
use crate::wire::encode::{write_end_of_stream, write_file_footer, write_message};
use crate::wire::footer;
use crate::wire::message::{self, MessageHeader};

pub use crate::compression::{get_compression_codec, set_compression_codec, CompressionCodecId};

/// Which of the two IPC framings a buffer is written in.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum IpcFormat {
    Stream,
    File,
}

/// Detects the framing by checking for the leading `ARROW1` magic; a Stream
/// buffer starts directly with its first message.
pub fn detect_format(bytes: &[u8]) -> IpcFormat {
    if bytes.len() >= footer::FILE_MAGIC.len() && &bytes[0..footer::FILE_MAGIC.len()] == footer::FILE_MAGIC {
        IpcFormat::File
    } else {
        IpcFormat::Stream
    }
}

/// Decodes a whole IPC buffer (stream or file, auto-detected) into a
/// [`Table`]: every `RecordBatch` message contributes one more batch to each
/// column, and dictionary batches are resolved as they're seen.
pub fn decode_ipc(bytes: &[u8]) -> Result<Table> {
    match detect_format(bytes) {
        IpcFormat::Stream => decode_stream(bytes),
        IpcFormat::File => decode_file(bytes),
    }
}

/// Alias for [`decode_ipc`], named to pair with [`table_to_ipc`].
pub fn table_from_ipc(bytes: &[u8]) -> Result<Table> {
    decode_ipc(bytes)
}

fn decode_stream(bytes: &[u8]) -> Result<Table> {
    let mut pos = 0usize;
    let mut schema: Option<Schema> = None;
    let mut dict_types: HashMap<i64, DataType> = HashMap::new();
    let mut dictionaries: DictionaryContext = HashMap::new();
    let mut per_field_batches: Vec<Vec<Batch>> = Vec::new();

    while let Some(msg) = message::read_next_message(bytes, pos)? {
        pos = msg.next_pos;
        match msg.message.header {
            MessageHeader::Schema(s) => {
                dict_types = collect_dictionary_value_types(&s);
                per_field_batches = s.fields.iter().map(|_| Vec::new()).collect();
                schema = Some(s);
            }
            MessageHeader::DictionaryBatch(meta) => {
                handle_dictionary_batch(&mut dictionaries, &dict_types, meta, msg.body, msg.message.version)?;
            }
            MessageHeader::RecordBatch(meta) => {
                let schema_ref = schema
                    .as_ref()
                    .ok_or_else(|| ArrowIpcError::format("record batch message arrived before the schema message"))?;
                let body: Arc<[u8]> = Arc::from(msg.body.to_vec().into_boxed_slice());
                let batches = decode_record_batch_fields(schema_ref, &meta, body, msg.message.version, &dictionaries)?;
                for (i, batch) in batches.into_iter().enumerate() {
                    per_field_batches[i].push(batch);
                }
            }
        }
    }

    let schema = schema.ok_or_else(|| ArrowIpcError::format("stream contained no schema message"))?;
    build_table(schema, per_field_batches)
}

fn decode_file(bytes: &[u8]) -> Result<Table> {
    let footer_bytes = footer::extract_footer_bytes(bytes)?;
    let parsed_footer = footer::decode_footer(footer_bytes)?;
    let dict_types = collect_dictionary_value_types(&parsed_footer.schema);
    let mut dictionaries: DictionaryContext = HashMap::new();

    for block in &parsed_footer.dictionaries {
        let msg = message::read_next_message(bytes, block.offset as usize)?
            .ok_or_else(|| ArrowIpcError::format("footer points at a dictionary block with no message there"))?;
        match msg.message.header {
            MessageHeader::DictionaryBatch(meta) => {
                handle_dictionary_batch(&mut dictionaries, &dict_types, meta, msg.body, msg.message.version)?;
            }
            _ => return Err(ArrowIpcError::format("footer dictionary block does not point at a DictionaryBatch message")),
        }
    }

    let mut per_field_batches: Vec<Vec<Batch>> = parsed_footer.schema.fields.iter().map(|_| Vec::new()).collect();
    for block in &parsed_footer.record_batches {
        let msg = message::read_next_message(bytes, block.offset as usize)?
            .ok_or_else(|| ArrowIpcError::format("footer points at a record batch block with no message there"))?;
        match msg.message.header {
            MessageHeader::RecordBatch(meta) => {
                let body: Arc<[u8]> = Arc::from(msg.body.to_vec().into_boxed_slice());
                let batches =
                    decode_record_batch_fields(&parsed_footer.schema, &meta, body, msg.message.version, &dictionaries)?;
                for (i, batch) in batches.into_iter().enumerate() {
                    per_field_batches[i].push(batch);
                }
            }
            _ => return Err(ArrowIpcError::format("footer record batch block does not point at a RecordBatch message")),
        }
    }

    build_table(parsed_footer.schema, per_field_batches)
}

fn build_table(schema: Schema, per_field_batches: Vec<Vec<Batch>>) -> Result<Table> {
    let columns = schema
        .fields
        .iter()
        .cloned()
        .zip(per_field_batches)
        .map(|(field, batches)| Column::new(field, batches))
        .collect();
    Table::new(schema, columns)
}

fn handle_dictionary_batch(
    dictionaries: &mut DictionaryContext,
    dict_types: &HashMap<i64, DataType>,
    meta: DictionaryBatchMeta,
    body: &[u8],
    version: MetadataVersion,
) -> Result<()> {
    let value_type = dict_types
        .get(&meta.id)
        .ok_or_else(|| ArrowIpcError::dictionary(format!("dictionary batch for unknown id {}", meta.id)))?;
    let synthetic_field = Field::new("dictionary", value_type.clone(), true, None);
    let body_arc: Arc<[u8]> = Arc::from(body.to_vec().into_boxed_slice());
    let mut decoded = decode_record_batch_fields(
        &Schema::new(vec![synthetic_field.clone()]),
        &meta.data,
        body_arc,
        version,
        dictionaries,
    )?;
    let new_values = decoded.pop().expect("decode_record_batch_fields returns one batch per field");

    let combined = if meta.is_delta {
        let old = dictionaries
            .get(&meta.id)
            .cloned()
            .ok_or_else(|| ArrowIpcError::dictionary(format!("delta dictionary batch for id {} with no prior batch", meta.id)))?;
        let column = Column::from_shared(synthetic_field, vec![old, Arc::new(new_values)]);
        column.to_array()?
    } else {
        Arc::new(new_values)
    };
    dictionaries.insert(meta.id, combined);
    Ok(())
}

/// Walks a schema's field tree collecting each dictionary id's value type,
/// so an out-of-band `DictionaryBatch` message (which carries only the id)
/// can be decoded against the right schema.
fn collect_dictionary_value_types(schema: &Schema) -> HashMap<i64, DataType> {
    let mut map = HashMap::new();
    for field in &schema.fields {
        visit_dictionary_types(&field.dtype, &mut map);
    }
    map
}

fn visit_dictionary_types(dtype: &DataType, map: &mut HashMap<i64, DataType>) {
    match dtype {
        DataType::Dictionary { value_type, id, .. } => {
            map.entry(*id).or_insert_with(|| (**value_type).clone());
        }
        DataType::List { field, .. } | DataType::ListView { field, .. } | DataType::FixedSizeList { field, .. } => {
            visit_dictionary_types(&field.dtype, map);
        }
        DataType::Struct { fields } | DataType::Union { fields, .. } => {
            for f in fields.iter() {
                visit_dictionary_types(&f.dtype, map);
            }
        }
        DataType::Map { entries, .. } => visit_dictionary_types(&entries.dtype, map),
        DataType::RunEndEncoded { run_ends, values } => {
            visit_dictionary_types(&run_ends.dtype, map);
            visit_dictionary_types(&values.dtype, map);
        }
        _ => {}
    }
}

/// Encodes a [`Table`] as a whole IPC buffer in the requested framing.
/// Multi-batch columns are materialized to a single array first (via
/// [`Column::to_array`]), so the result is always exactly one `RecordBatch`
/// message (plus one `DictionaryBatch` message per distinct dictionary id
/// reachable from the schema).
pub fn table_to_ipc(table: &Table, format: IpcFormat, codec: Option<CompressionCodecId>) -> Result<Vec<u8>> {
    let schema = table.schema().clone();
    let materialized: Vec<Batch> = table
        .columns()
        .iter()
        .map(|c| c.to_array().map(|arc| (*arc).clone()))
        .collect::<Result<Vec<_>>>()?;

    let mut seen_dict_ids = HashSet::new();
    let mut dict_messages: Vec<(i64, DataType, Batch)> = Vec::new();
    for (field, batch) in schema.fields.iter().zip(&materialized) {
        collect_dictionary_batches(&field.dtype, batch, &mut seen_dict_ids, &mut dict_messages)?;
    }

    let mut out = Vec::new();
    if format == IpcFormat::File {
        out.extend_from_slice(footer::FILE_MAGIC);
    }

    write_message(&mut out, &MessageHeader::Schema(schema.clone()), &[])?;

    let mut dictionary_blocks = Vec::with_capacity(dict_messages.len());
    for (id, value_type, values_batch) in &dict_messages {
        let synthetic_field = Field::new("dictionary", value_type.clone(), true, None);
        let (meta, body) = encode_batches_to_body(&[synthetic_field], std::slice::from_ref(values_batch), codec)?;
        let header = MessageHeader::DictionaryBatch(DictionaryBatchMeta { id: *id, data: meta, is_delta: false });
        dictionary_blocks.push(write_message(&mut out, &header, &body)?);
    }

    let (rb_meta, rb_body) = encode_batches_to_body(&schema.fields, &materialized, codec)?;
    let record_batch_block = write_message(&mut out, &MessageHeader::RecordBatch(rb_meta), &rb_body)?;

    write_end_of_stream(&mut out);

    if format == IpcFormat::File {
        write_file_footer(&mut out, &schema, &dictionary_blocks, &[record_batch_block])?;
    }

    Ok(out)
}

/// Walks a batch tree collecting `(id, value_type, values)` once per
/// distinct dictionary id, in first-seen order, mirroring
/// [`visit_dictionary_types`]'s descent through nested children.
fn collect_dictionary_batches(
    dtype: &DataType,
    batch: &Batch,
    seen: &mut HashSet<i64>,
    out: &mut Vec<(i64, DataType, Batch)>,
) -> Result<()> {
    match (dtype, batch) {
        (DataType::Dictionary { value_type, .. }, Batch::Dictionary(d)) => {
            if seen.insert(d.id) {
                out.push((d.id, (**value_type).clone(), (*d.values).clone()));
            }
            Ok(())
        }
        (DataType::List { field, .. }, Batch::List(b)) => collect_dictionary_batches(&field.dtype, &b.child, seen, out),
        (DataType::List { field, .. }, Batch::LargeList(b)) => collect_dictionary_batches(&field.dtype, &b.child, seen, out),
        (DataType::ListView { field, .. }, Batch::ListView(b)) => {
            collect_dictionary_batches(&field.dtype, &b.child, seen, out)
        }
        (DataType::ListView { field, .. }, Batch::LargeListView(b)) => {
            collect_dictionary_batches(&field.dtype, &b.child, seen, out)
        }
        (DataType::FixedSizeList { field, .. }, Batch::FixedSizeList(b)) => {
            collect_dictionary_batches(&field.dtype, &b.child, seen, out)
        }
        (DataType::Struct { fields }, Batch::Struct(b)) => {
            for (f, child) in fields.iter().zip(&b.children) {
                collect_dictionary_batches(&f.dtype, child, seen, out)?;
            }
            Ok(())
        }
        (DataType::Union { fields, .. }, Batch::Union(b)) => {
            for (f, child) in fields.iter().zip(&b.children) {
                collect_dictionary_batches(&f.dtype, child, seen, out)?;
            }
            Ok(())
        }
        (DataType::Map { entries, .. }, Batch::Map(b)) => collect_dictionary_batches(&entries.dtype, &b.list.child, seen, out),
        (DataType::RunEndEncoded { values, .. }, Batch::RunEndEncoded(b)) => {
            collect_dictionary_batches(&values.dtype, &b.values, seen, out)
        }
        _ => Ok(()),
    }
}
