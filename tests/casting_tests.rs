use chrono::{Datelike, NaiveDate, TimeZone, Timelike, Utc};
use modelschema::cast::{CastAs, CastTo};
use modelschema::{AttributeDef, Model, ModelDefinition, Schema, Value};
use serde_json::json;
use std::sync::Arc;

fn definition(date_format: &str) -> Arc<ModelDefinition> {
    ModelDefinition::builder("event")
        .date_format(date_format)
        .schema(
            Schema::new()
                .with("id", AttributeDef::new())
                .with("title", AttributeDef::new().cast("string"))
                .with("seats", AttributeDef::new().cast("int"))
                .with("ratio", AttributeDef::new().cast("double"))
                .with("price", AttributeDef::new().cast("decimal:2"))
                .with("starts_on", AttributeDef::new().cast("date"))
                .with("starts_at", AttributeDef::new().cast("datetime"))
                .with("imported_at", AttributeDef::new().cast("datetime:%d.%m.%Y"))
                .with("ends_at", AttributeDef::new().cast("timestamp"))
                .with("tags", AttributeDef::new().cast("collection"))
                .with("options", AttributeDef::new().cast("object"))
                .with("flags", AttributeDef::new().cast("array"))
                .with("external_id", AttributeDef::new().cast("uuid"))
                .with("free_text", AttributeDef::new().cast("markdown")),
        )
        .build()
        .unwrap()
}

#[test]
fn test_cast_methods_by_attribute() {
    let model = Model::new(definition("%Y-%m-%d %H:%M:%S"));

    assert_eq!(model.get_cast_as_method("id"), Some(CastAs::Int));
    assert_eq!(model.get_cast_as_method("external_id"), Some(CastAs::String));
    assert_eq!(model.get_cast_as_method("flags"), Some(CastAs::FromJson));
    assert_eq!(model.get_cast_as_method("free_text"), None);

    assert_eq!(model.get_cast_to_method("starts_on"), Some(CastTo::DateTime));
    assert_eq!(model.get_cast_to_method("tags"), Some(CastTo::Json));
    assert_eq!(model.get_cast_to_method("seats"), None);
}

#[test]
fn test_scalar_reads() {
    let mut model = Model::new(definition("%Y-%m-%d %H:%M:%S"));
    model.set_attribute("seats", "42 seats").unwrap();
    model.set_attribute("ratio", "0.75").unwrap();
    model.set_attribute("price", "19.999").unwrap();
    model.set_attribute("title", 12).unwrap();
    model.set_attribute("free_text", "*as is*").unwrap();

    assert_eq!(model.get_attribute("seats").unwrap(), Value::Integer(42));
    assert_eq!(model.get_attribute("ratio").unwrap(), Value::Float(0.75));
    assert_eq!(model.get_attribute("price").unwrap(), Value::from("20.00"));
    assert_eq!(model.get_attribute("title").unwrap(), Value::from("12"));
    assert_eq!(model.get_attribute("free_text").unwrap(), Value::from("*as is*"));
}

#[test]
fn test_dates_use_storage_format() {
    let mut model = Model::new(definition("%d/%m/%Y %H:%M"));
    model.set_attribute("starts_at", "2024-01-31 10:30:00").unwrap();

    assert_eq!(model.get_raw("starts_at"), Some(&Value::from("31/01/2024 10:30")));

    let Value::Timestamp(ts) = model.get_attribute("starts_at").unwrap() else {
        panic!("expected a timestamp");
    };
    assert_eq!((ts.year(), ts.month(), ts.day(), ts.hour(), ts.minute()), (2024, 1, 31, 10, 30));
}

#[test]
fn test_date_and_timestamp_casts() {
    let mut model = Model::new(definition("%Y-%m-%d %H:%M:%S"));
    let moment = Utc.with_ymd_and_hms(2023, 6, 15, 8, 0, 0).unwrap();

    model.set_attribute("starts_on", Value::Timestamp(moment)).unwrap();
    model.set_attribute("ends_at", Value::Timestamp(moment)).unwrap();

    assert_eq!(
        model.get_attribute("starts_on").unwrap(),
        Value::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
    );
    assert_eq!(model.get_raw("ends_at"), Some(&Value::Integer(moment.timestamp())));
    assert_eq!(model.get_attribute("ends_at").unwrap(), Value::Integer(moment.timestamp()));
}

#[test]
fn test_datetime_parameter_format_on_read() {
    let stored = [("imported_at".to_string(), Value::from("05.12.2022"))]
        .into_iter()
        .collect();
    let model = Model::from_storage(definition("%Y-%m-%d %H:%M:%S"), stored);

    let Value::Timestamp(ts) = model.get_attribute("imported_at").unwrap() else {
        panic!("expected a timestamp");
    };
    assert_eq!((ts.year(), ts.month(), ts.day()), (2022, 12, 5));
}

#[test]
fn test_json_casts() {
    let mut model = Model::new(definition("%Y-%m-%d %H:%M:%S"));
    model.set_attribute("options", Value::Json(json!({"colour": "red"}))).unwrap();
    model.set_attribute("flags", "[1,2,3]").unwrap();
    model.set_attribute("tags", "solo").unwrap();

    assert_eq!(model.get_raw("options"), Some(&Value::from(r#"{"colour":"red"}"#)));
    assert_eq!(model.get_attribute("options").unwrap(), Value::Json(json!({"colour": "red"})));
    assert_eq!(model.get_attribute("flags").unwrap(), Value::Json(json!([1, 2, 3])));
    assert_eq!(model.get_attribute("tags").unwrap(), Value::Json(json!(["solo"])));
    assert_eq!(model.get_attribute("missing").unwrap(), Value::Null);
}

#[test]
fn test_null_passes_through() {
    let mut model = Model::new(definition("%Y-%m-%d %H:%M:%S"));
    model.set_attribute("starts_at", Value::Null).unwrap();
    model.set_attribute("options", Value::Null).unwrap();

    assert_eq!(model.get_raw("starts_at"), Some(&Value::Null));
    assert_eq!(model.get_attribute("starts_at").unwrap(), Value::Null);
    assert_eq!(model.get_attribute("options").unwrap(), Value::Null);
}

#[test]
fn test_bad_date_is_cast_error() {
    let mut model = Model::new(definition("%Y-%m-%d %H:%M:%S"));
    assert!(model.set_attribute("starts_at", "next tuesday").is_err());
    assert!(model.get_raw("starts_at").is_none());
}
