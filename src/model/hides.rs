use super::Model;
use crate::core::Result;
use crate::schema::SchemaEntry;
use serde_json::{Map, Value as JsonValue};

fn merge_unique(mut base: Vec<String>, extra: &[String]) -> Vec<String> {
    for name in extra {
        if !base.contains(name) {
            base.push(name.clone());
        }
    }
    base
}

fn owned<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|name| name.as_ref().to_string()).collect()
}

impl Model {
    pub fn get_hidden(&self) -> Result<Vec<String>> {
        Ok(self.schema.names_with(SchemaEntry::Hidden)?.to_vec())
    }

    pub fn set_hidden<S: AsRef<str>>(&mut self, hidden: &[S]) -> Result<&mut Self> {
        self.schema.update_structure(SchemaEntry::Hidden, hidden, true)?;
        Ok(self)
    }

    pub fn add_hidden<S: AsRef<str>>(&mut self, attributes: &[S]) -> Result<&mut Self> {
        let hidden = merge_unique(self.get_hidden()?, &owned(attributes));
        self.set_hidden(&hidden)
    }

    pub fn get_visible(&self) -> Result<Vec<String>> {
        Ok(self.schema.names_with(SchemaEntry::Visible)?.to_vec())
    }

    pub fn set_visible<S: AsRef<str>>(&mut self, visible: &[S]) -> Result<&mut Self> {
        self.schema.update_structure(SchemaEntry::Visible, visible, true)?;
        Ok(self)
    }

    pub fn add_visible<S: AsRef<str>>(&mut self, attributes: &[S]) -> Result<&mut Self> {
        let visible = merge_unique(self.get_visible()?, &owned(attributes));
        self.set_visible(&visible)
    }

    /// Unhide the attributes; when a visible list is in use they join it.
    pub fn make_visible<S: AsRef<str>>(&mut self, attributes: &[S]) -> Result<&mut Self> {
        let attributes = owned(attributes);
        let hidden: Vec<String> = self
            .get_hidden()?
            .into_iter()
            .filter(|name| !attributes.contains(name))
            .collect();
        self.set_hidden(&hidden)?;

        if !self.get_visible()?.is_empty() {
            self.add_visible(&attributes)?;
        }
        Ok(self)
    }

    /// Drop the attributes from the visible list and hide them.
    pub fn make_hidden<S: AsRef<str>>(&mut self, attributes: &[S]) -> Result<&mut Self> {
        let attributes = owned(attributes);
        let visible: Vec<String> = self
            .get_visible()?
            .into_iter()
            .filter(|name| !attributes.contains(name))
            .collect();
        self.set_visible(&visible)?;

        let hidden = merge_unique(self.get_hidden()?, &attributes);
        self.set_hidden(&hidden)
    }

    /// Serialise the model's attributes through their read casts.
    ///
    /// A non-empty visible list restricts the output to it; hidden
    /// attributes are always left out.
    pub fn to_array(&self) -> Result<Map<String, JsonValue>> {
        let visible = self.get_visible()?;
        let hidden = self.get_hidden()?;

        let schema_order = self.valid_attributes();
        let extra = self
            .attributes
            .keys()
            .filter(|key| !schema_order.contains(key))
            .cloned();

        let mut output = Map::new();
        for key in schema_order.iter().cloned().chain(extra) {
            if !self.attributes.contains_key(&key) {
                continue;
            }
            if (!visible.is_empty() && !visible.contains(&key)) || hidden.contains(&key) {
                continue;
            }
            let value = self.get_attribute(&key)?;
            output.insert(key, value.to_json());
        }
        Ok(output)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_array()?)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Model, ModelDefinition};
    use crate::schema::{AttributeDef, Schema};
    use serde_json::{Value as JsonValue, json};

    fn model() -> Model {
        let definition = ModelDefinition::builder("member")
            .timestamps(false)
            .schema(
                Schema::new()
                    .with("id", AttributeDef::new().cast("integer"))
                    .with("email", AttributeDef::new().cast("string"))
                    .with("password", AttributeDef::new().cast("string").hidden())
                    .with("token", AttributeDef::new().cast("string").hidden()),
            )
            .build()
            .unwrap();
        Model::new(definition)
    }

    #[test]
    fn test_add_and_set_hidden() {
        let mut model = model();
        model.add_hidden(&["email", "password"]).unwrap();
        assert_eq!(model.get_hidden().unwrap(), vec!["email", "password", "token"]);

        model.set_hidden(&["id"]).unwrap();
        assert_eq!(model.get_hidden().unwrap(), vec!["id"]);
    }

    #[test]
    fn test_make_visible_without_visible_list() {
        let mut model = model();
        model.make_visible(&["password"]).unwrap();
        assert_eq!(model.get_hidden().unwrap(), vec!["token"]);
        assert!(model.get_visible().unwrap().is_empty());
    }

    #[test]
    fn test_make_visible_with_visible_list() {
        let mut model = model();
        model.set_visible(&["email"]).unwrap();
        model.make_visible(&["token"]).unwrap();
        assert_eq!(model.get_visible().unwrap(), vec!["email", "token"]);
        assert_eq!(model.get_hidden().unwrap(), vec!["password"]);
    }

    #[test]
    fn test_make_hidden() {
        let mut model = model();
        model.set_visible(&["id", "email"]).unwrap();
        model.make_hidden(&["email", "password"]).unwrap();
        assert_eq!(model.get_visible().unwrap(), vec!["id"]);
        assert_eq!(model.get_hidden().unwrap(), vec!["email", "password", "token"]);
    }

    #[test]
    fn test_to_array_filters() {
        let mut model = model();
        model.set_attribute("id", "7").unwrap();
        model.set_attribute("email", "a@b.io").unwrap();
        model.set_attribute("password", "secret").unwrap();

        assert_eq!(
            JsonValue::Object(model.to_array().unwrap()),
            json!({"id": 7, "email": "a@b.io"})
        );

        model.set_visible(&["email"]).unwrap();
        assert_eq!(model.to_json().unwrap(), r#"{"email":"a@b.io"}"#);
    }
}
