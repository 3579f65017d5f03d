use async_trait::async_trait;
use modelschema::{
    AttributeDef, MemoryStore, Model, ModelDefinition, ModelError, ModelStore, Record, Result,
    Schema, Value,
};
use std::sync::{Arc, Mutex};

fn definition() -> Arc<ModelDefinition> {
    ModelDefinition::builder("invoice")
        .table("invoices")
        .schema(
            Schema::new()
                .with("id", AttributeDef::new().cast("integer").guarded())
                .with(
                    "number",
                    AttributeDef::new().cast("string").rules("required").guarded_update(),
                )
                .with("customer", AttributeDef::new().cast("string").rules("required"))
                .with("total", AttributeDef::new().cast("float").default_value(0.0))
                .with("paid", AttributeDef::new().cast("boolean").default_value(false))
                .with("notes", AttributeDef::new().cast("array").hidden())
                .with("created_at", AttributeDef::new().cast("datetime"))
                .with("updated_at", AttributeDef::new().cast("datetime")),
        )
        .build()
        .unwrap()
}

/// Records every call so tests can check what reached the host.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<String>>,
}

impl RecordingStore {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelStore for RecordingStore {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn insert(
        &self,
        table: &str,
        key_name: &str,
        incrementing: bool,
        record: Record,
    ) -> Result<Option<Value>> {
        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("insert {} {}", table, columns.join(",")));
        self.inner.insert(table, key_name, incrementing, record).await
    }

    async fn update(
        &self,
        table: &str,
        key_name: &str,
        key: &Value,
        changes: Record,
    ) -> Result<()> {
        let columns: Vec<&str> = changes.keys().map(String::as_str).collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("update {} {} {}", table, key, columns.join(",")));
        self.inner.update(table, key_name, key, changes).await
    }

    async fn find(&self, table: &str, key_name: &str, key: &Value) -> Result<Option<Record>> {
        self.calls.lock().unwrap().push(format!("find {} {}", table, key));
        self.inner.find(table, key_name, key).await
    }
}

#[tokio::test]
async fn test_create_fills_defaults_and_timestamps() {
    let store = RecordingStore::default();
    let definition = definition();

    let mut model = Model::new(Arc::clone(&definition));
    definition
        .unguarded(|| {
            model
                .fill([("number", "INV-1"), ("customer", "Acme")])
                .map(|_| ())
        })
        .unwrap();
    model.save(&store).await.unwrap();

    assert_eq!(
        store.calls(),
        vec!["insert invoices created_at,customer,number,paid,total,updated_at"]
    );
    assert_eq!(model.key(), Some(&Value::Integer(1)));
    assert_eq!(model.get_attribute("paid").unwrap(), Value::Boolean(false));
    assert_eq!(model.get_attribute("total").unwrap(), Value::Float(0.0));
    assert!(model.get_dirty().is_empty());
}

#[tokio::test]
async fn test_update_sends_only_dirty() {
    let store = RecordingStore::default();
    let definition = definition();

    let mut model = Model::new(Arc::clone(&definition));
    model.set_attribute("number", "INV-2").unwrap();
    model.set_attribute("customer", "Globex").unwrap();
    model.save(&store).await.unwrap();

    let mut found = Model::find(Arc::clone(&definition), &store, 1).await.unwrap().unwrap();
    assert!(found.exists());

    // Number is frozen once stored.
    assert!(!found.set("number", "INV-999").unwrap());
    assert!(found.set("paid", true).unwrap());
    found.save(&store).await.unwrap();

    // updated_at only shows up when the clock moved past the insert's second.
    let calls = store.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1], "find invoices 1");
    assert!(calls[2].starts_with("update invoices 1 paid"));
    assert!(!calls[2].contains("number"));

    let reloaded = Model::find(definition, &store, 1).await.unwrap().unwrap();
    assert_eq!(reloaded.get_attribute("paid").unwrap(), Value::Boolean(true));
    assert_eq!(reloaded.get_attribute("number").unwrap(), Value::from("INV-2"));
}

#[tokio::test]
async fn test_clean_model_is_not_saved_again() {
    let store = RecordingStore::default();
    let mut model = Model::new(definition());
    model.set_attribute("number", "INV-3").unwrap();
    model.set_attribute("customer", "Initech").unwrap();
    model.save(&store).await.unwrap();
    model.save(&store).await.unwrap();

    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn test_failed_validation_stops_insert() {
    let store = RecordingStore::default();
    let mut model = Model::new(definition());
    model.set_attribute("number", "INV-4").unwrap();

    let err = model.save(&store).await.unwrap_err();
    assert!(matches!(err, ModelError::Validation { .. }));
    assert_eq!(model.get_invalid_message(), vec!["The customer field is required."]);
    assert!(store.calls().is_empty());
    assert!(!model.exists());
}

#[tokio::test]
async fn test_mass_assignment_on_create() {
    let store = MemoryStore::new();
    let definition = definition();

    // No fillable list: everything not guarded is fillable.
    let model = Model::create(
        Arc::clone(&definition),
        [
            ("number", Value::from("INV-5")),
            ("customer", Value::from("Umbrella")),
            ("id", Value::Integer(77)),
        ],
        &store,
    )
    .await
    .unwrap();

    assert_eq!(model.key(), Some(&Value::Integer(1)));
    assert_eq!(model.get_attribute("number").unwrap(), Value::from("INV-5"));
}

#[tokio::test]
async fn test_hidden_attributes_left_out_of_output() {
    let store = MemoryStore::new();
    let mut model = Model::new(definition());
    model.set_attribute("number", "INV-6").unwrap();
    model.set_attribute("customer", "Hooli").unwrap();
    model.set_attribute("notes", "[\"rush\"]").unwrap();
    model.save(&store).await.unwrap();

    let output = model.to_array().unwrap();
    assert!(!output.contains_key("notes"));
    assert_eq!(output["number"], "INV-6");

    model.make_visible(&["notes"]).unwrap();
    assert_eq!(model.to_array().unwrap()["notes"], serde_json::json!(["rush"]));
}
