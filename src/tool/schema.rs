//! Tool descriptor schemas
//!
//! Descriptors are built from a small tagged structure instead of raw JSON
//! blobs so the registry can validate every schema once at startup and
//! convert to the wire form on demand. The wire form is plain JSON Schema as
//! published in the `tools/list` response.
//!
//! Strictness rules enforced by [`InputSchema::validate`]:
//!
//! - a property declares a type or an `anyOf` list, never both and never
//!   neither (hosts reject schemas mixing the two at one level);
//! - enum values require a `string` type;
//! - `array` properties declare `items`, non-objects carry no nested
//!   `properties`, and `required` lists only declared names.

use serde_json::{Map, Value, json};

/// JSON Schema primitive type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    /// `string`
    String,
    /// `integer`
    Integer,
    /// `number`
    Number,
    /// `boolean`
    Boolean,
    /// `object`
    Object,
    /// `array`
    Array,
}

impl SchemaType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Whether `value` structurally matches this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// Schema of a single property
#[derive(Debug, Clone, Default)]
pub struct PropertySchema {
    /// Declared type; mutually exclusive with `any_of`
    pub schema_type: Option<SchemaType>,
    /// Alternative schemas; mutually exclusive with `schema_type`
    pub any_of: Vec<PropertySchema>,
    /// Human-readable description
    pub description: Option<String>,
    /// Allowed values (string properties only)
    pub enum_values: Vec<String>,
    /// Default value advertised to the client
    pub default: Option<Value>,
    /// Element schema for arrays
    pub items: Option<Box<PropertySchema>>,
    /// Nested properties for objects
    pub properties: Vec<(String, PropertySchema)>,
    /// Required nested property names for objects
    pub required: Vec<String>,
}

impl PropertySchema {
    /// A `string` property.
    #[must_use]
    pub fn string(description: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::String),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    /// An `integer` property.
    #[must_use]
    pub fn integer(description: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::Integer),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    /// A `boolean` property.
    #[must_use]
    pub fn boolean(description: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::Boolean),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    /// An `object` property.
    #[must_use]
    pub fn object(description: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::Object),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    /// An `array` property with the given element schema.
    #[must_use]
    pub fn array(description: &str, items: PropertySchema) -> Self {
        Self {
            schema_type: Some(SchemaType::Array),
            description: Some(description.to_string()),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// Restrict a string property to the given values.
    #[must_use]
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(ToString::to_string).collect();
        self
    }

    /// Advertise a default value.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Add a nested property (objects only).
    #[must_use]
    pub fn property(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.push((name.to_string(), schema));
        self
    }

    /// Mark nested properties as required (objects only).
    #[must_use]
    pub fn require(mut self, names: &[&str]) -> Self {
        self.required = names.iter().map(ToString::to_string).collect();
        self
    }

    /// Convert to the JSON Schema wire form.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut out = Map::new();

        if let Some(ty) = self.schema_type {
            out.insert("type".to_string(), json!(ty.as_str()));
        }
        if !self.any_of.is_empty() {
            let alts: Vec<Value> = self.any_of.iter().map(PropertySchema::to_wire).collect();
            out.insert("anyOf".to_string(), Value::Array(alts));
        }
        if let Some(ref desc) = self.description {
            out.insert("description".to_string(), json!(desc));
        }
        if !self.enum_values.is_empty() {
            out.insert("enum".to_string(), json!(self.enum_values));
        }
        if let Some(ref default) = self.default {
            out.insert("default".to_string(), default.clone());
        }
        if let Some(ref items) = self.items {
            out.insert("items".to_string(), items.to_wire());
        }
        if !self.properties.is_empty() {
            let mut props = Map::new();
            for (name, schema) in &self.properties {
                props.insert(name.clone(), schema.to_wire());
            }
            out.insert("properties".to_string(), Value::Object(props));
        }
        if !self.required.is_empty() {
            out.insert("required".to_string(), json!(self.required));
        }

        Value::Object(out)
    }

    fn validate(&self, path: &str) -> Result<(), String> {
        match (self.schema_type, self.any_of.is_empty()) {
            (Some(_), false) => {
                return Err(format!(
                    "{path}: declares both 'type' and 'anyOf' at the same level"
                ));
            }
            (None, true) => {
                return Err(format!("{path}: declares neither 'type' nor 'anyOf'"));
            }
            _ => {}
        }

        if !self.enum_values.is_empty() && self.schema_type != Some(SchemaType::String) {
            return Err(format!("{path}: enum values require a string type"));
        }

        match self.schema_type {
            Some(SchemaType::Array) => {
                let Some(ref items) = self.items else {
                    return Err(format!("{path}: array property is missing 'items'"));
                };
                items.validate(&format!("{path}[]"))?;
            }
            Some(SchemaType::Object) => {
                for (name, schema) in &self.properties {
                    schema.validate(&format!("{path}.{name}"))?;
                }
                for name in &self.required {
                    if !self.properties.iter().any(|(n, _)| n == name) {
                        return Err(format!(
                            "{path}: requires undeclared nested property '{name}'"
                        ));
                    }
                }
            }
            _ => {
                if !self.properties.is_empty() || !self.required.is_empty() {
                    return Err(format!(
                        "{path}: nested properties are only valid on objects"
                    ));
                }
                if self.items.is_some() {
                    return Err(format!("{path}: 'items' is only valid on arrays"));
                }
            }
        }

        for (idx, alt) in self.any_of.iter().enumerate() {
            alt.validate(&format!("{path}.anyOf[{idx}]"))?;
        }

        Ok(())
    }
}

/// Input schema of a tool: a typed property set plus a required list
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    /// Properties in declaration order (stable wire order)
    pub properties: Vec<(String, PropertySchema)>,
    /// Required property names
    pub required: Vec<String>,
}

impl InputSchema {
    /// Start an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property.
    #[must_use]
    pub fn property(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.push((name.to_string(), schema));
        self
    }

    /// Mark property names as required.
    #[must_use]
    pub fn require(mut self, names: &[&str]) -> Self {
        self.required = names.iter().map(ToString::to_string).collect();
        self
    }

    /// Find a property schema by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertySchema> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Strict structural validation; run once at registry build.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for (name, schema) in &self.properties {
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate property '{name}'"));
            }
            schema.validate(name)?;
        }
        for name in &self.required {
            if self.get(name).is_none() {
                return Err(format!("required property '{name}' is not declared"));
            }
        }
        Ok(())
    }

    /// Convert to the JSON Schema wire form, appending the shared
    /// `sessionCredentials` property every tool accepts.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut props = Map::new();
        for (name, schema) in &self.properties {
            props.insert(name.clone(), schema.to_wire());
        }
        props.insert(
            "sessionCredentials".to_string(),
            session_credentials_schema().to_wire(),
        );

        let mut out = Map::new();
        out.insert("type".to_string(), json!("object"));
        out.insert("properties".to_string(), Value::Object(props));
        if !self.required.is_empty() {
            out.insert("required".to_string(), json!(self.required));
        }
        Value::Object(out)
    }
}

/// Immutable descriptor published for one tool
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Unique, identifier-safe tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Input contract
    pub input: InputSchema,
}

impl ToolDescriptor {
    /// Create a descriptor.
    #[must_use]
    pub fn new(name: &str, description: &str, input: InputSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input,
        }
    }

    /// Strict validation of the name and the whole schema tree.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.len() > 128 {
            return Err("tool name must be 1-128 characters".to_string());
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!("tool name '{}' is not identifier-safe", self.name));
        }
        if self.description.trim().is_empty() {
            return Err(format!("tool '{}' has an empty description", self.name));
        }
        self.input.validate()
    }
}

/// Schema of the shared per-invocation credential override.
fn session_credentials_schema() -> PropertySchema {
    PropertySchema::object(
        "Optional credential override scoped to this call only. \
         Fields not supplied fall back to the server's configured defaults.",
    )
    .property("baseUrl", PropertySchema::string("DX API base URL"))
    .property("tokenUrl", PropertySchema::string("OAuth2 token endpoint"))
    .property("clientId", PropertySchema::string("OAuth2 client id"))
    .property("clientSecret", PropertySchema::string("OAuth2 client secret"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Wire conversion ───────────────────────────────────────────────

    #[test]
    fn wire_form_has_object_envelope() {
        let schema = InputSchema::new()
            .property("caseID", PropertySchema::string("Full case handle"))
            .require(&["caseID"]);
        let wire = schema.to_wire();

        assert_eq!(wire["type"], "object");
        assert_eq!(wire["properties"]["caseID"]["type"], "string");
        assert_eq!(wire["required"], json!(["caseID"]));
    }

    #[test]
    fn wire_form_appends_session_credentials() {
        let wire = InputSchema::new().to_wire();
        let creds = &wire["properties"]["sessionCredentials"];

        assert_eq!(creds["type"], "object");
        assert!(creds["properties"]["clientSecret"].is_object());
    }

    #[test]
    fn enum_and_default_serialize() {
        let schema = PropertySchema::string("View")
            .one_of(&["form", "page"])
            .default_value(json!("form"));
        let wire = schema.to_wire();

        assert_eq!(wire["enum"], json!(["form", "page"]));
        assert_eq!(wire["default"], "form");
    }

    #[test]
    fn array_items_serialize() {
        let schema = PropertySchema::array(
            "Attachments",
            PropertySchema::object("One attachment")
                .property("type", PropertySchema::string("Kind")),
        );
        let wire = schema.to_wire();

        assert_eq!(wire["type"], "array");
        assert_eq!(wire["items"]["properties"]["type"]["type"], "string");
    }

    // ── Strict validation ─────────────────────────────────────────────

    #[test]
    fn type_and_any_of_together_is_rejected() {
        let mut prop = PropertySchema::string("bad");
        prop.any_of = vec![PropertySchema::integer("alt")];
        let schema = InputSchema::new().property("x", prop);

        let err = schema.validate().unwrap_err();
        assert!(err.contains("both 'type' and 'anyOf'"), "error: {err}");
    }

    #[test]
    fn neither_type_nor_any_of_is_rejected() {
        let schema = InputSchema::new().property("x", PropertySchema::default());
        let err = schema.validate().unwrap_err();
        assert!(err.contains("neither"), "error: {err}");
    }

    #[test]
    fn any_of_alone_is_accepted() {
        let mut prop = PropertySchema::default();
        prop.any_of = vec![
            PropertySchema::string("as text"),
            PropertySchema::integer("as number"),
        ];
        let schema = InputSchema::new().property("x", prop);

        assert!(schema.validate().is_ok());
    }

    #[test]
    fn enum_on_non_string_is_rejected() {
        let mut prop = PropertySchema::integer("count");
        prop.enum_values = vec!["1".to_string()];
        let schema = InputSchema::new().property("x", prop);

        assert!(schema.validate().is_err());
    }

    #[test]
    fn array_without_items_is_rejected() {
        let mut prop = PropertySchema::object("pretend array");
        prop.schema_type = Some(SchemaType::Array);
        let schema = InputSchema::new().property("x", prop);

        let err = schema.validate().unwrap_err();
        assert!(err.contains("items"), "error: {err}");
    }

    #[test]
    fn required_must_reference_declared_properties() {
        let schema = InputSchema::new()
            .property("a", PropertySchema::string("a"))
            .require(&["b"]);

        let err = schema.validate().unwrap_err();
        assert!(err.contains("'b'"), "error: {err}");
    }

    #[test]
    fn duplicate_properties_are_rejected() {
        let schema = InputSchema::new()
            .property("a", PropertySchema::string("first"))
            .property("a", PropertySchema::string("second"));

        let err = schema.validate().unwrap_err();
        assert!(err.contains("duplicate"), "error: {err}");
    }

    // ── Descriptor validation ─────────────────────────────────────────

    #[test]
    fn descriptor_rejects_unsafe_names() {
        for bad in ["", "has space", "semi;colon", "dot.dot"] {
            let desc = ToolDescriptor::new(bad, "desc", InputSchema::new());
            assert!(desc.validate().is_err(), "name '{bad}' should be rejected");
        }
    }

    #[test]
    fn descriptor_accepts_snake_case_names() {
        let desc = ToolDescriptor::new("perform_case_action", "Runs an action", InputSchema::new());
        assert!(desc.validate().is_ok());
    }
}
