use model::{
    core::{data_type::DataType, document::Document, value::Value},
    transform::mapping::{CollectionMapping, ColumnMapping},
};

/// Pre-resolved view of one column mapping.
#[derive(Debug, Clone)]
struct ColumnRule {
    source_field: String,
    target_type: DataType,
    identifier: bool,
    requires_transformation: bool,
}

impl From<&ColumnMapping> for ColumnRule {
    fn from(column: &ColumnMapping) -> Self {
        Self {
            source_field: column.source_field.clone(),
            target_type: column.target_type(),
            identifier: column.is_identifier(),
            requires_transformation: column.requires_transformation,
        }
    }
}

/// Turns source documents into INSERT parameter rows, one value per mapped
/// column in mapping order.
///
/// Transcoding never fails: serialization problems fall back to `{}` or `[]`.
/// A missing field goes through the rules as an explicit null. Nulls for non-nullable columns are left
/// for the target to reject.
#[derive(Debug, Clone)]
pub struct Transcoder {
    columns: Vec<ColumnRule>,
}

impl Transcoder {
    pub fn new(mapping: &CollectionMapping) -> Self {
        Self {
            columns: mapping.columns.iter().map(ColumnRule::from).collect(),
        }
    }

    pub fn transcode_all(&self, documents: &[Document]) -> Vec<Vec<Value>> {
        documents.iter().map(|doc| self.transcode(doc)).collect()
    }

    pub fn transcode(&self, doc: &Document) -> Vec<Value> {
        self.columns
            .iter()
            .map(|rule| transcode_field(rule, doc.get(&rule.source_field)))
            .collect()
    }
}

fn transcode_field(rule: &ColumnRule, value: Option<&Value>) -> Value {
    let null = Value::Null;
    let value = value.unwrap_or(&null);

    if rule.identifier
        && let Value::ObjectId(oid) = value
    {
        return if rule.target_type.is_uuid() {
            Value::Uuid(oid.name_uuid())
        } else {
            // the bare hex string, even for JSON columns
            Value::String(oid.to_hex())
        };
    }

    match value {
        Value::ObjectId(oid) => {
            let hex = oid.to_hex();
            if rule.target_type.is_json() {
                Value::String(serde_json::Value::String(hex).to_string())
            } else {
                Value::String(hex)
            }
        }
        Value::Document(doc) => Value::String(canonical_text(doc)),
        _ if rule.requires_transformation && !rule.identifier => {
            Value::String(plain_json_text(value, "{}"))
        }
        Value::Array(_) if rule.target_type.is_json() && !rule.identifier => {
            Value::String(plain_json_text(value, "[]"))
        }
        other => other.clone(),
    }
}

fn canonical_text(doc: &Document) -> String {
    doc.iter()
        .map(|(k, v)| (k.clone(), v.clone().stringify_object_ids()))
        .collect::<Document>()
        .to_canonical_json()
}

fn plain_json_text(value: &Value, fallback: &str) -> String {
    value
        .clone()
        .stringify_object_ids()
        .to_plain_json()
        .map(|json| json.to_string())
        .unwrap_or_else(|_| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::object_id::ObjectId;

    const HEX: &str = "507f1f77bcf86cd799439011";

    fn oid() -> ObjectId {
        ObjectId::parse_str(HEX).unwrap()
    }

    fn single(column: ColumnMapping, value: Value) -> Value {
        let field = column.source_field.clone();
        let transcoder = Transcoder::new(&CollectionMapping::new("c", "t").column(column));
        let mut doc = Document::new();
        doc.insert(field, value);
        transcoder.transcode(&doc).remove(0)
    }

    #[test]
    fn test_identifier_to_uuid_is_deterministic() {
        let column = ColumnMapping::new("id", "_id", "UUID");
        let a = single(column.clone(), Value::ObjectId(oid()));
        let b = single(column, Value::ObjectId(oid()));

        assert_eq!(a, b);
        assert_eq!(a, Value::Uuid(oid().name_uuid()));
    }

    #[test]
    fn test_identifier_stays_bare_hex_for_json_columns() {
        let out = single(ColumnMapping::new("id", "_id", "JSONB"), Value::ObjectId(oid()));
        assert_eq!(out, Value::String(HEX.to_string()));

        let out = single(ColumnMapping::new("id", "_id", "VARCHAR(24)"), Value::ObjectId(oid()));
        assert_eq!(out, Value::String(HEX.to_string()));
    }

    #[test]
    fn test_non_identifier_object_id_quoted_only_for_json() {
        let out = single(ColumnMapping::new("user_id", "userId", "JSONB"), Value::ObjectId(oid()));
        assert_eq!(out, Value::String(format!("\"{HEX}\"")));

        let out = single(ColumnMapping::new("user_id", "userId", "TEXT"), Value::ObjectId(oid()));
        assert_eq!(out, Value::String(HEX.to_string()));
    }

    #[test]
    fn test_nested_document_uses_canonical_text() {
        let mut inner = Document::new();
        inner.insert("ref", oid());
        inner.insert("qty", 2i64);
        let mut nested = Document::new();
        nested.insert("item", inner);

        let out = single(ColumnMapping::new("meta", "meta", "JSONB"), Value::Document(nested));
        assert_eq!(
            out,
            Value::String(format!(r#"{{"item":{{"ref":"{HEX}","qty":2}}}}"#))
        );
    }

    #[test]
    fn test_transformed_field_serializes_to_json() {
        let column = ColumnMapping::new("tags", "tags", "TEXT").transformed();
        let out = single(
            column.clone(),
            Value::Array(vec![Value::ObjectId(oid()), "red".into()]),
        );
        assert_eq!(out, Value::String(format!(r#"["{HEX}","red"]"#)));

        assert_eq!(single(column.clone(), Value::Null), Value::String("null".into()));
        assert_eq!(
            single(column, Value::Array(vec![Value::Float(f64::NAN)])),
            Value::String("{}".into())
        );
    }

    #[test]
    fn test_missing_and_null_transcode_alike() {
        let mapping = CollectionMapping::new("c", "t")
            .column(ColumnMapping::new("meta", "meta", "JSONB").transformed())
            .column(ColumnMapping::new("note", "note", "TEXT"));
        let transcoder = Transcoder::new(&mapping);

        let mut explicit = Document::new();
        explicit.insert("meta", Value::Null);
        explicit.insert("note", Value::Null);

        let missing = transcoder.transcode(&Document::new());
        assert_eq!(missing, transcoder.transcode(&explicit));
        assert_eq!(missing, vec![Value::String("null".into()), Value::Null]);
    }

    #[test]
    fn test_array_into_json_column() {
        let column = ColumnMapping::new("scores", "scores", "JSON");
        let out = single(column.clone(), Value::Array(vec![1i64.into(), 2i64.into()]));
        assert_eq!(out, Value::String("[1,2]".into()));

        let out = single(column, Value::Array(vec![Value::Float(f64::INFINITY)]));
        assert_eq!(out, Value::String("[]".into()));
    }

    #[test]
    fn test_array_into_non_json_column_passes_through() {
        let arr = Value::Array(vec!["a".into()]);
        assert_eq!(single(ColumnMapping::new("t", "t", "TEXT[]"), arr.clone()), arr);
    }

    #[test]
    fn test_identifier_of_other_type_passes_through() {
        let out = single(ColumnMapping::new("id", "_id", "UUID"), Value::Int(7));
        assert_eq!(out, Value::Int(7));

        let out = single(
            ColumnMapping::new("id", "_id", "JSONB").transformed(),
            Value::Array(vec![1i64.into()]),
        );
        assert_eq!(out, Value::Array(vec![1i64.into()]));
    }

    #[test]
    fn test_missing_field_and_column_order() {
        let mapping = CollectionMapping::new("orders", "orders")
            .column(ColumnMapping::new("amount", "amount", "NUMERIC"))
            .column(ColumnMapping::new("note", "note", "TEXT").not_null())
            .column(ColumnMapping::new("order", "order", "INTEGER"));
        let mut doc = Document::new();
        doc.insert("order", 3i64);
        doc.insert("amount", 9.5);

        let row = Transcoder::new(&mapping).transcode(&doc);
        assert_eq!(row, vec![Value::Float(9.5), Value::Null, Value::Int(3)]);
    }
}
