//! Request payloads, form data and parsed response bodies.

use crate::error::FetchError;
use bytes::Bytes;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Payload supplied by the caller.
///
/// With a JSON content type any variant is serialized to JSON text before
/// it reaches the transport; otherwise it is handed over untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
    Bytes(Bytes),
    Form(FormData),
}

impl RequestBody {
    /// Serialize any value into a JSON body
    ///
    /// # Errors
    /// Returns `FetchError::Json` if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, FetchError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Render the payload as JSON text
    ///
    /// # Errors
    /// Returns `FetchError::Json` if serialization fails.
    pub fn to_json_text(&self) -> Result<String, FetchError> {
        Ok(serde_json::to_string(self)?)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "json",
            RequestBody::Text(_) => "text",
            RequestBody::Bytes(_) => "bytes",
            RequestBody::Form(_) => "form",
        }
    }
}

impl Serialize for RequestBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RequestBody::Json(value) => value.serialize(serializer),
            RequestBody::Text(text) => serializer.serialize_str(text),
            RequestBody::Bytes(bytes) => serializer.serialize_bytes(bytes),
            RequestBody::Form(form) => form.serialize(serializer),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<FormData> for RequestBody {
    fn from(form: FormData) -> Self {
        Self::Form(form)
    }
}

/// One value of a form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    },
}

impl FormValue {
    /// Text content, `None` for file parts
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File { .. } => None,
        }
    }
}

impl Serialize for FormValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FormValue::Text(text) => serializer.serialize_str(text),
            FormValue::File {
                file_name,
                content_type,
                data,
            } => {
                let mut file = serializer.serialize_struct("File", 3)?;
                file.serialize_field("name", file_name)?;
                file.serialize_field("type", content_type)?;
                file.serialize_field("size", &data.len())?;
                file.end()
            }
        }
    }
}

/// Ordered multipart form fields; a name may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, FormValue)>,
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: FormValue) {
        self.fields.push((name.into(), value));
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.append(name, FormValue::Text(value.into()));
    }

    pub fn append_file(
        &mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: Bytes,
    ) {
        self.append(
            name,
            FormValue::File {
                file_name: Some(file_name.into()),
                content_type,
                data,
            },
        );
    }

    /// First value stored under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Every value stored under `name`, in insertion order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.fields
            .iter()
            .filter(move |(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Text fields only, in order; file parts are skipped
    pub(crate) fn text_pairs(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_text().map(|text| (name.as_str(), text)))
            .collect()
    }
}

/// A map keyed by field name in first-seen order; a repeated name maps to
/// an array of its values
impl Serialize for FormData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut grouped: Vec<(&str, Vec<&FormValue>)> = Vec::new();
        for (name, value) in &self.fields {
            match grouped.iter_mut().find(|(seen, _)| *seen == name.as_str()) {
                Some((_, values)) => values.push(value),
                None => grouped.push((name.as_str(), vec![value])),
            }
        }

        let mut map = serializer.serialize_map(Some(grouped.len()))?;
        for (name, values) in &grouped {
            match values.as_slice() {
                [single] => map.serialize_entry(name, single)?,
                many => map.serialize_entry(name, many)?,
            }
        }
        map.end()
    }
}

/// URL-encoded text fields, e.g. `a=1&b=two`
impl fmt::Display for FormData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_urlencoded::to_string(self.text_pairs()).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

/// Response payload parsed according to the response content type
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    FormData(FormData),
    Text(String),
}

impl ResponseBody {
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_form_data(&self) -> Option<&FormData> {
        match self {
            ResponseBody::FormData(form) => Some(form),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Deserialize a JSON body into `T`
    ///
    /// # Errors
    /// Returns `FetchError::Json` if the body is not JSON or does not match `T`.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, FetchError> {
        match self {
            ResponseBody::Json(value) => Ok(T::deserialize(value)?),
            ResponseBody::Text(text) => Ok(serde_json::from_str(text)?),
            ResponseBody::FormData(form) => Ok(serde_json::from_value(serde_json::to_value(form)?)?),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ResponseBody::Json(_) => "json",
            ResponseBody::FormData(_) => "form-data",
            ResponseBody::Text(_) => "text",
        }
    }
}

/// JSON strings render without quotes; other JSON values render as JSON text.
impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(Value::String(text)) | ResponseBody::Text(text) => f.write_str(text),
            ResponseBody::Json(value) => write!(f, "{value}"),
            ResponseBody::FormData(form) => write!(f, "{form}"),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_text_of_each_variant() {
        let body = RequestBody::Json(json!({"foo": "bar"}));
        assert_eq!(body.to_json_text().unwrap(), r#"{"foo":"bar"}"#);

        let body = RequestBody::from("BODY");
        assert_eq!(body.to_json_text().unwrap(), r#""BODY""#);

        let body = RequestBody::Bytes(Bytes::from_static(&[1, 2]));
        assert_eq!(body.to_json_text().unwrap(), "[1,2]");

        let mut form = FormData::new();
        form.append_text("a", "1");
        assert_eq!(RequestBody::Form(form).to_json_text().unwrap(), r#"{"a":"1"}"#);
    }

    #[test]
    fn test_json_constructor_serializes_structs() {
        #[derive(Serialize)]
        struct NewUser<'a> {
            name: &'a str,
        }

        let body = RequestBody::json(&NewUser { name: "Alice" }).unwrap();
        assert_eq!(body, RequestBody::Json(json!({"name": "Alice"})));
    }

    #[test]
    fn test_form_data_keeps_order_and_repeats() {
        let mut form = FormData::new();
        form.append_text("tag", "a");
        form.append_file("upload", "notes.txt", Some("text/plain".into()), Bytes::from("hi"));
        form.append_text("tag", "b");

        assert_eq!(form.len(), 3);
        assert_eq!(form.get("tag").and_then(FormValue::as_text), Some("a"));
        let tags: Vec<_> = form.get_all("tag").filter_map(FormValue::as_text).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(form.to_string(), "tag=a&tag=b");
    }

    #[test]
    fn test_repeated_form_names_serialize_as_array() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Tags {
            tag: Vec<String>,
            title: String,
        }

        let mut form = FormData::new();
        form.append_text("tag", "a");
        form.append_text("title", "t");
        form.append_text("tag", "b");

        assert_eq!(
            serde_json::to_value(&form).unwrap(),
            json!({"tag": ["a", "b"], "title": "t"})
        );

        let body = ResponseBody::FormData(form);
        assert_eq!(
            body.deserialize::<Tags>().unwrap(),
            Tags {
                tag: vec!["a".into(), "b".into()],
                title: "t".into(),
            }
        );
    }

    #[test]
    fn test_response_body_display() {
        assert_eq!(ResponseBody::Text("ERROR BODY".into()).to_string(), "ERROR BODY");
        assert_eq!(ResponseBody::Json(json!("plain")).to_string(), "plain");
        assert_eq!(ResponseBody::Json(json!({"a": 1})).to_string(), r#"{"a":1}"#);
    }

    #[test]
    fn test_response_body_deserialize() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Data {
            value: i32,
        }

        let body = ResponseBody::Json(json!({"value": 42}));
        assert_eq!(body.deserialize::<Data>().unwrap(), Data { value: 42 });

        let body = ResponseBody::Text("not json".into());
        assert!(matches!(body.deserialize::<Data>(), Err(FetchError::Json(_))));
    }
}
