//! JSON <-> BSON document conversion
//!
//! Documents cross the library boundary as relaxed Extended JSON, so
//! ObjectIds surface as `{"$oid": "..."}` and parse back on the way in.

use crate::database::types::Document;
use crate::error::{DbError, Result};
use mongodb::bson::{doc, Bson, Document as BsonDocument};

/// Convert a JSON document to BSON
pub(crate) fn bson_from_json(document: Document) -> Result<BsonDocument> {
    let bson = Bson::try_from(serde_json::Value::Object(document))
        .map_err(|e| DbError::Conversion(format!("JSON to BSON error: {}", e)))?;

    if let Bson::Document(doc) = bson {
        Ok(doc)
    } else {
        Err(DbError::Conversion("Expected BSON document".to_string()))
    }
}

/// Convert a BSON document to JSON
pub(crate) fn json_from_bson(document: BsonDocument) -> Result<Document> {
    match Bson::Document(document).into_relaxed_extjson() {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(DbError::Conversion(format!(
            "Expected JSON object, got {}",
            other
        ))),
    }
}

/// Wrap an update payload as a merge-set operation
pub(crate) fn set_operator(payload: BsonDocument) -> BsonDocument {
    doc! { "$set": payload }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    fn object(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_object_id_survives_extended_json() {
        let id = ObjectId::new();
        let json = json_from_bson(doc! { "_id": id, "test": "test" }).unwrap();

        assert_eq!(json["_id"], json!({ "$oid": id.to_hex() }));
        assert_eq!(json["test"], json!("test"));

        let back = bson_from_json(json).unwrap();
        assert_eq!(back.get_object_id("_id").unwrap(), id);
    }

    #[test]
    fn test_scalar_values() {
        let bson = bson_from_json(object(json!({
            "small": 1,
            "large": 5_000_000_000i64,
            "ratio": 0.5,
            "flag": true,
            "none": null,
            "list": [1, "two"],
            "nested": { "a": 1 }
        })))
        .unwrap();

        assert_eq!(bson.get_i32("small").unwrap(), 1);
        assert_eq!(bson.get_i64("large").unwrap(), 5_000_000_000);
        assert_eq!(bson.get_f64("ratio").unwrap(), 0.5);
        assert!(bson.get_bool("flag").unwrap());
        assert_eq!(bson.get("none"), Some(&Bson::Null));
        assert_eq!(bson.get_array("list").unwrap().len(), 2);
        assert_eq!(bson.get_document("nested").unwrap().get_i32("a").unwrap(), 1);
    }

    #[test]
    fn test_operator_filter_stays_nested() {
        let filter = bson_from_json(object(json!({ "age": { "$gt": 5 } }))).unwrap();
        assert_eq!(filter, doc! { "age": { "$gt": 5 } });
    }

    #[test]
    fn test_set_operator_wraps_payload() {
        let update = set_operator(doc! { "b": 2 });
        assert_eq!(update, doc! { "$set": { "b": 2 } });
    }
}
