//! Type inference profiler: tallies a [`Value`] slice by category and
//! derives the narrowest `DataType` that covers every row, or fails with
//! [`ArrowIpcError::mixed`] when the row shapes genuinely disagree.

use crate::datatype::DataType;
use crate::error::{ArrowIpcError, Result};
use crate::field::Field;

use super::Value;

#[derive(Default)]
struct Profile {
    null: usize,
    bool_count: usize,
    int_count: usize,
    bigint_count: usize,
    float_count: usize,
    string_count: usize,
    list_count: usize,
    list_len: Option<usize>,
    list_len_uniform: bool,
    struct_count: usize,
    min_int: i64,
    max_int: i64,
}

fn profile(values: &[Value]) -> Profile {
    let mut p = Profile { list_len_uniform: true, min_int: i64::MAX, max_int: i64::MIN, ..Profile::default() };
    for v in values {
        match v {
            Value::Null => p.null += 1,
            Value::Boolean(_) => p.bool_count += 1,
            Value::Int(i) => {
                p.int_count += 1;
                p.min_int = p.min_int.min(*i);
                p.max_int = p.max_int.max(*i);
            }
            Value::UInt(u) => {
                p.bigint_count += 1;
                let as_i = i64::try_from(*u).unwrap_or(i64::MAX);
                p.min_int = p.min_int.min(as_i);
                p.max_int = p.max_int.max(as_i);
            }
            Value::Float(_) => p.float_count += 1,
            Value::Bytes(_) | Value::Utf8(_) => p.string_count += 1,
            Value::List(items) => {
                p.list_count += 1;
                match p.list_len {
                    None => p.list_len = Some(items.len()),
                    Some(len) if len != items.len() => p.list_len_uniform = false,
                    _ => {}
                }
            }
            Value::Struct(_) => p.struct_count += 1,
        }
    }
    p
}

/// Smallest signed integer width whose range covers `[min, max]`.
fn narrowest_int_width(min: i64, max: i64) -> u8 {
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        8
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        16
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        32
    } else {
        64
    }
}

/// Infers a `DataType` for a column of ordinary values, following the
/// category-tally rules: all-null columns are untyped `Null`, all-integer
/// columns get the narrowest signed int width, any float mixed with
/// integers promotes the whole column to `Float64`, homogeneous strings
/// become a `Dictionary<Int32, Utf8>`, uniform-length arrays become a
/// `FixedSizeList`, ragged arrays become a `List`, and struct rows recurse
/// field-by-field. Anything left over (a genuine mix of incompatible
/// categories) is a [`ArrowIpcError::mixed`] error rather than a silent
/// coercion.
pub fn infer_type(values: &[Value]) -> Result<DataType> {
    let total = values.len();
    let p = profile(values);
    let non_null = total - p.null;

    if non_null == 0 {
        return Ok(DataType::Null);
    }
    if p.bool_count == non_null {
        return Ok(DataType::Boolean);
    }
    if p.int_count == non_null {
        return DataType::int(narrowest_int_width(p.min_int, p.max_int), true);
    }
    if p.bigint_count == non_null {
        return Ok(DataType::int64());
    }
    if p.int_count + p.bigint_count + p.float_count == non_null {
        return Ok(DataType::float64());
    }
    if p.string_count == non_null {
        return DataType::dictionary(DataType::utf8(), DataType::int32(), false, -1);
    }
    if p.struct_count == non_null {
        return infer_struct_fields(values).map(DataType::struct_);
    }
    if p.list_count == non_null {
        let elem = infer_list_element(values)?;
        let field = Field::new("item", elem, true, None);
        return if p.list_len_uniform {
            Ok(DataType::fixed_size_list(field, p.list_len.unwrap_or(0) as i32))
        } else {
            Ok(DataType::list(field))
        };
    }

    Err(ArrowIpcError::mixed(format!(
        "cannot infer a single data type for {non_null} non-null values spanning more than one value category"
    )))
}

fn infer_list_element(values: &[Value]) -> Result<DataType> {
    let elements: Vec<Value> = values
        .iter()
        .filter_map(|v| match v {
            Value::List(items) => Some(items.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    infer_type(&elements)
}

fn infer_struct_fields(values: &[Value]) -> Result<Vec<Field>> {
    let mut names: Vec<String> = Vec::new();
    for v in values {
        if let Value::Struct(entries) = v {
            for (name, _) in entries {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
    }
    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let column: Vec<Value> = values
            .iter()
            .map(|v| match v {
                Value::Struct(entries) => entries.iter().find(|(n, _)| n == &name).map(|(_, v)| v.clone()).unwrap_or(Value::Null),
                _ => Value::Null,
            })
            .collect();
        let dtype = infer_type(&column)?;
        let nullable = column.iter().any(|v| matches!(v, Value::Null));
        fields.push(Field::new(name, dtype, nullable, None));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_null_infers_null_type() {
        let values = vec![Value::Null, Value::Null];
        assert_eq!(infer_type(&values).unwrap(), DataType::Null);
    }

    #[test]
    fn small_ints_infer_the_narrowest_width() {
        let values = vec![Value::Int(1), Value::Int(-5), Value::Null];
        assert_eq!(infer_type(&values).unwrap(), DataType::int8());
    }

    #[test]
    fn mixed_int_and_string_is_an_error() {
        let values = vec![Value::Int(1), Value::Utf8("x".to_string())];
        assert!(infer_type(&values).is_err());
    }

    #[test]
    fn homogeneous_strings_infer_a_dictionary() {
        let values = vec![Value::Utf8("a".to_string()), Value::Utf8("b".to_string())];
        match infer_type(&values).unwrap() {
            DataType::Dictionary { .. } => {}
            other => panic!("expected Dictionary, got {other:?}"),
        }
    }

    #[test]
    fn uniform_length_arrays_infer_fixed_size_list() {
        let values = vec![Value::List(vec![Value::Int(1), Value::Int(2)]), Value::List(vec![Value::Int(3), Value::Int(4)])];
        match infer_type(&values).unwrap() {
            DataType::FixedSizeList { size, .. } => assert_eq!(size, 2),
            other => panic!("expected FixedSizeList, got {other:?}"),
        }
    }

    #[test]
    fn ragged_arrays_infer_list() {
        let values = vec![Value::List(vec![Value::Int(1)]), Value::List(vec![Value::Int(2), Value::Int(3)])];
        match infer_type(&values).unwrap() {
            DataType::List { .. } => {}
            other => panic!("expected List, got {other:?}"),
        }
    }
}
