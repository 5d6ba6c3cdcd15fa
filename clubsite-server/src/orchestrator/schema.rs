//! Resource schema descriptors and form validation
//!
//! A `ResourceSchema` says which form fields a resource accepts, how each is
//! converted into a document value, which file fields are uploaded and where
//! the resulting URL is stored, and how the document id is chosen.
//! `validate` turns a `FormData` into a `Validation`: either a ready record
//! or every field problem found, without any I/O. Rules that depend on
//! whether the document already exists (files required on creation, derived
//! defaults) are applied by the orchestrator once that is known.

use chrono::{DateTime, NaiveDate};
use clubsite_common::models::FaqItem;
use clubsite_common::sanitize::{is_content_field_name, normalize_slug};
use serde_json::Value;
use std::collections::HashSet;

use super::form::FormData;
use crate::db::{Document, WriteMode};

/// How list-valued text is split when it is not a JSON array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSyntax {
    Lines,
    Commas,
}

/// Conversion applied to a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed string
    Text,
    /// Stored verbatim, never trimmed or unquoted
    Html,
    Email,
    /// `YYYY-MM-DD` or RFC 3339, stored as sent
    Date,
    /// Integer >= 0; an empty optional value is not written
    Integer,
    /// `true`/`false`, `on`/`off`, `1`/`0`; empty means false
    Boolean,
    /// Normalized with `normalize_slug`; must keep at least one character
    Slug,
    /// JSON array or delimited text, stored as an array of strings
    List(ListSyntax),
    /// JSON array or lines, stored as one newline-joined string
    DelimitedText,
    /// Unique ids (JSON array or comma separated), at most `max`
    IdList { max: usize },
    /// JSON array of FAQ items, accepted all-or-nothing
    FaqItems,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Form field name, also the document key
    pub name: &'static str,
    /// Human readable name used in messages
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
        }
    }
}

/// A file field and the document field receiving its public URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub field: &'static str,
    pub target: &'static str,
    pub label: &'static str,
    /// A new document must carry this file; updates keep the stored URL
    pub required_on_create: bool,
}

/// Where the document id comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdStrategy {
    /// Backend-generated id unless the form carries this field
    GeneratedUnlessField(&'static str),
    /// Always taken from this (required) form field
    FromField(&'static str),
    /// Always this id
    Fixed(String),
}

/// Computes defaults for fields the form did not send
///
/// Defaults are written only where the stored document has no value yet.
pub type DeriveHook = fn(&Document) -> Result<Document, FieldError>;

/// Descriptor for one admin-writable resource
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// Resource name used in routes and logs
    pub name: String,
    pub collection: &'static str,
    pub id: IdStrategy,
    pub fields: Vec<FieldSpec>,
    pub files: Vec<FileSpec>,
    /// Object key prefix for uploads
    pub key_prefix: &'static str,
    pub write_mode: WriteMode,
    /// Accept undeclared text fields with valid names as plain text
    pub free_form: bool,
    pub derive: Option<DeriveHook>,
    /// Success message, e.g. "Sponsor saved"
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A record ready for upload and persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord {
    /// Document id; `None` means insert with a generated id
    pub id: Option<String>,
    pub data: Document,
    /// Derived values, not yet checked against the stored document
    pub defaults: Document,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(ValidRecord),
    Invalid(Vec<FieldError>),
}

impl ResourceSchema {
    fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
            || self.files.iter().any(|f| f.field == name)
            || matches!(&self.id, IdStrategy::GeneratedUnlessField(f) if *f == name)
    }

    /// Validate a form against this schema
    pub fn validate(&self, form: &FormData) -> Validation {
        let mut errors = Vec::new();
        let mut data = Document::new();

        for spec in &self.fields {
            let raw = form.text(spec.name);
            let blank = raw.map_or(true, |v| v.trim().is_empty());

            if blank {
                if spec.required {
                    errors.push(FieldError::new(spec.name, format!("{} is required", spec.label)));
                    continue;
                }
                // Absent fields are never written; blank ones clear the value
                // unless the kind has no sensible empty form
                if raw.is_none()
                    || matches!(
                        spec.kind,
                        FieldKind::Integer | FieldKind::Date | FieldKind::Email | FieldKind::Slug
                    )
                {
                    continue;
                }
            }

            if let Some(raw) = raw {
                match convert(spec, raw) {
                    Ok(value) => {
                        data.insert(spec.name.to_string(), value);
                    }
                    Err(message) => errors.push(FieldError::new(spec.name, message)),
                }
            }
        }

        if self.free_form {
            for (name, value) in form.text_fields() {
                if self.declares(name) {
                    continue;
                }
                if is_content_field_name(name) {
                    data.insert(name.to_string(), Value::String(value.to_string()));
                } else {
                    errors.push(FieldError::new(name, format!("Invalid field name '{}'", name)));
                }
            }
        }

        let id = match &self.id {
            IdStrategy::Fixed(id) => Some(id.clone()),
            IdStrategy::FromField(field) | IdStrategy::GeneratedUnlessField(field) => {
                match form.text(field).map(str::trim).filter(|v| !v.is_empty()) {
                    Some(id) => match check_document_id(id) {
                        Ok(()) => Some(id.to_string()),
                        Err(message) => {
                            errors.push(FieldError::new(field, message));
                            None
                        }
                    },
                    // Already reported as a required field
                    None => None,
                }
            }
        };

        let defaults = match self.derive {
            Some(derive) if errors.is_empty() => derive(&data).unwrap_or_else(|error| {
                errors.push(error);
                Document::new()
            }),
            _ => Document::new(),
        };

        if !errors.is_empty() {
            return Validation::Invalid(errors);
        }

        Validation::Valid(ValidRecord { id, data, defaults })
    }

    /// File fields a new document needs but the form lacks
    pub fn missing_files(&self, form: &FormData) -> Vec<FieldError> {
        self.files
            .iter()
            .filter(|file| file.required_on_create && form.file(file.field).is_none())
            .map(|file| FieldError::new(file.field, format!("{} file is required", file.label)))
            .collect()
    }
}

fn check_document_id(id: &str) -> Result<(), String> {
    let reserved = id.len() > 4 && id.starts_with("__") && id.ends_with("__");
    if id.contains('/') || id == "." || id == ".." || reserved {
        return Err(format!("Invalid document id '{}'", id));
    }
    if id.len() > 1500 {
        return Err("Document id is too long".to_string());
    }
    Ok(())
}

fn convert(spec: &FieldSpec, raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    match spec.kind {
        FieldKind::Text => Ok(Value::String(trimmed.to_string())),
        FieldKind::Html => Ok(Value::String(raw.to_string())),
        FieldKind::Email => {
            let valid = trimmed
                .split_once('@')
                .map_or(false, |(local, domain)| {
                    !local.is_empty() && domain.contains('.') && !domain.contains('@')
                });
            if valid {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(format!("{} must be a valid email address", spec.label))
            }
        }
        FieldKind::Date => {
            let valid = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok()
                || DateTime::parse_from_rfc3339(trimmed).is_ok();
            if valid {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(format!("{} must be an ISO date (YYYY-MM-DD)", spec.label))
            }
        }
        FieldKind::Integer => match trimmed.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(Value::from(n)),
            _ => Err(format!("{} must be a whole number of at least 0", spec.label)),
        },
        FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "off" | "0" | "no" | "" => Ok(Value::Bool(false)),
            _ => Err(format!("{} must be true or false", spec.label)),
        },
        FieldKind::Slug => match normalize_slug(trimmed) {
            slug if slug.is_empty() => Err(format!("{} must contain letters or digits", spec.label)),
            slug => Ok(Value::String(slug)),
        },
        FieldKind::List(syntax) => {
            let items = parse_list(spec, trimmed, syntax)?;
            Ok(Value::from(items))
        }
        FieldKind::DelimitedText => {
            let items = parse_list(spec, trimmed, ListSyntax::Lines)?;
            Ok(Value::String(items.join("\n")))
        }
        FieldKind::IdList { max } => {
            let ids = parse_list(spec, trimmed, ListSyntax::Commas)?;
            if ids.len() > max {
                return Err(format!(
                    "At most {} {} allowed",
                    max,
                    spec.label.to_lowercase()
                ));
            }
            let mut seen = HashSet::new();
            if !ids.iter().all(|id| seen.insert(id.as_str())) {
                return Err(format!("{} must be unique", spec.label));
            }
            Ok(Value::from(ids))
        }
        FieldKind::FaqItems => parse_faq_items(spec, trimmed),
    }
}

/// JSON array of strings, or text split by the given syntax
fn parse_list(spec: &FieldSpec, value: &str, syntax: ListSyntax) -> Result<Vec<String>, String> {
    if value.starts_with('[') {
        let items: Vec<String> = serde_json::from_str(value)
            .map_err(|e| format!("{} must be a JSON array of strings: {}", spec.label, e))?;
        return Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect());
    }

    let separator = match syntax {
        ListSyntax::Lines => '\n',
        ListSyntax::Commas => ',',
    };
    Ok(value
        .split(separator)
        .map(|s| s.trim().trim_end_matches('\r').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_faq_items(spec: &FieldSpec, value: &str) -> Result<Value, String> {
    if value.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    let items: Vec<FaqItem> = serde_json::from_str(value)
        .map_err(|e| format!("{} must be valid JSON: {}", spec.label, e))?;

    let mut seen = HashSet::new();
    for item in &items {
        if item.id.trim().is_empty() {
            return Err(format!("Every entry in {} needs an id", spec.label));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(format!("Duplicate id '{}' in {}", item.id, spec.label));
        }
        if item.display_order < 0 {
            return Err(format!("displayOrder in {} must be at least 0", spec.label));
        }
    }

    serde_json::to_value(&items).map_err(|e| format!("{} could not be encoded: {}", spec.label, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UploadedFile;
    use serde_json::json;

    fn schema(fields: Vec<FieldSpec>) -> ResourceSchema {
        ResourceSchema {
            name: "test".to_string(),
            collection: "tests",
            id: IdStrategy::GeneratedUnlessField("id"),
            fields,
            files: vec![FileSpec {
                field: "logo",
                target: "logoUrl",
                label: "Logo",
                required_on_create: false,
            }],
            key_prefix: "tests",
            write_mode: WriteMode::Merge,
            free_form: false,
            derive: None,
            message: "Saved",
        }
    }

    fn valid(validation: Validation) -> ValidRecord {
        match validation {
            Validation::Valid(record) => record,
            Validation::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }
    }

    fn invalid(validation: Validation) -> Vec<FieldError> {
        match validation {
            Validation::Valid(record) => panic!("unexpectedly valid: {:?}", record),
            Validation::Invalid(errors) => errors,
        }
    }

    #[test]
    fn test_required_and_absent_fields() {
        let schema = schema(vec![
            FieldSpec::required("name", "Name", FieldKind::Text),
            FieldSpec::optional("term", "Term", FieldKind::Text),
        ]);

        let errors = invalid(schema.validate(&FormData::new().with_text("name", "  ")));
        assert_eq!(errors, vec![FieldError::new("name", "Name is required")]);

        let record = valid(schema.validate(&FormData::new().with_text("name", " Anna ")));
        assert_eq!(record.data.get("name"), Some(&json!("Anna")));
        assert!(!record.data.contains_key("term"));
        assert!(!record.data.contains_key("logoUrl"));
        assert_eq!(record.id, None);
    }

    #[test]
    fn test_integer_rules() {
        let schema = schema(vec![FieldSpec::optional("order", "Order", FieldKind::Integer)]);

        let record = valid(schema.validate(&FormData::new().with_text("order", "3")));
        assert_eq!(record.data["order"], json!(3));

        let record = valid(schema.validate(&FormData::new().with_text("order", "")));
        assert!(!record.data.contains_key("order"));

        assert_eq!(invalid(schema.validate(&FormData::new().with_text("order", "two"))).len(), 1);
        assert_eq!(invalid(schema.validate(&FormData::new().with_text("order", "-1"))).len(), 1);
    }

    #[test]
    fn test_id_list_limits() {
        let schema = schema(vec![FieldSpec::optional(
            "contactPersonIds",
            "Contact persons",
            FieldKind::IdList { max: 4 },
        )]);
        let form = |v: &str| FormData::new().with_text("contactPersonIds", v);

        let errors = invalid(schema.validate(&form(r#"["a","b","c","d","e"]"#)));
        assert_eq!(errors[0].message, "At most 4 contact persons allowed");

        let errors = invalid(schema.validate(&form("a,b,a,c")));
        assert_eq!(errors[0].message, "Contact persons must be unique");

        let record = valid(schema.validate(&form("a, b, c, d")));
        assert_eq!(record.data["contactPersonIds"], json!(["a", "b", "c", "d"]));
    }

    #[test]
    fn test_lists_accept_json_or_text() {
        let schema = schema(vec![
            FieldSpec::optional("categories", "Categories", FieldKind::List(ListSyntax::Commas)),
            FieldSpec::optional("achievements", "Achievements", FieldKind::DelimitedText),
        ]);

        let record = valid(schema.validate(
            &FormData::new()
                .with_text("categories", "Verein, Wettkampf")
                .with_text("achievements", "[\"1. Platz\", \"Pokal\"]"),
        ));
        assert_eq!(record.data["categories"], json!(["Verein", "Wettkampf"]));
        assert_eq!(record.data["achievements"], json!("1. Platz\nPokal"));

        let record = valid(schema.validate(
            &FormData::new().with_text("achievements", "Meister 2022\r\n\r\nVize 2023"),
        ));
        assert_eq!(record.data["achievements"], json!("Meister 2022\nVize 2023"));
    }

    #[test]
    fn test_faq_items_all_or_nothing() {
        let schema = schema(vec![FieldSpec::optional("faqItems", "FAQ items", FieldKind::FaqItems)]);

        let errors = invalid(schema.validate(
            &FormData::new().with_text("faqItems", r#"[{"id":"1","question":"Q","answer":"A"},"#),
        ));
        assert_eq!(errors[0].field, "faqItems");

        let errors = invalid(schema.validate(&FormData::new().with_text(
            "faqItems",
            r#"[{"id":"1","question":"Q","answer":"A"},{"id":"1","question":"Q2","answer":"A2"}]"#,
        )));
        assert!(errors[0].message.contains("Duplicate id"));

        let record = valid(schema.validate(&FormData::new().with_text(
            "faqItems",
            r#"[{"id":"1","question":"Q","answer":"A","displayOrder":2}]"#,
        )));
        assert_eq!(record.data["faqItems"][0]["displayOrder"], json!(2));
    }

    #[test]
    fn test_required_file() {
        let mut schema = schema(vec![]);
        assert!(schema.missing_files(&FormData::new()).is_empty());

        schema.files[0].required_on_create = true;
        // Validation alone cannot tell a create from an update
        assert!(matches!(schema.validate(&FormData::new()), Validation::Valid(_)));
        assert_eq!(
            schema.missing_files(&FormData::new()),
            vec![FieldError::new("logo", "Logo file is required")]
        );

        let form = FormData::new().with_file("logo", UploadedFile::new("l.png", None, vec![1u8]));
        assert!(schema.missing_files(&form).is_empty());
    }

    #[test]
    fn test_slug_fields() {
        let schema = schema(vec![FieldSpec::optional("slug", "Slug", FieldKind::Slug)]);

        let record = valid(schema.validate(&FormData::new().with_text("slug", " Über Uns ")));
        assert_eq!(record.data["slug"], json!("ueber-uns"));

        let record = valid(schema.validate(&FormData::new().with_text("slug", "")));
        assert!(!record.data.contains_key("slug"));

        let errors = invalid(schema.validate(&FormData::new().with_text("slug", "!!!")));
        assert_eq!(errors, vec![FieldError::new("slug", "Slug must contain letters or digits")]);
    }

    #[test]
    fn test_derive_hook_fills_defaults() {
        fn shout(data: &Document) -> Result<Document, FieldError> {
            match data.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => {
                    let mut defaults = Document::new();
                    defaults.insert("slug".to_string(), Value::String(name.to_lowercase()));
                    Ok(defaults)
                }
                _ => Err(FieldError::new("slug", "Slug is required")),
            }
        }

        let mut schema = schema(vec![FieldSpec::optional("name", "Name", FieldKind::Text)]);
        schema.derive = Some(shout);

        let record = valid(schema.validate(&FormData::new().with_text("name", "Anna")));
        assert!(!record.data.contains_key("slug"));
        assert_eq!(record.defaults["slug"], json!("anna"));

        let errors = invalid(schema.validate(&FormData::new()));
        assert_eq!(errors, vec![FieldError::new("slug", "Slug is required")]);
    }

    #[test]
    fn test_free_form_fields() {
        let mut schema = schema(vec![]);
        schema.free_form = true;

        let record = valid(schema.validate(
            &FormData::new().with_text("heroTitle", "Willkommen").with_text("id", "x"),
        ));
        assert_eq!(record.data["heroTitle"], json!("Willkommen"));
        assert!(!record.data.contains_key("id"));

        let errors = invalid(schema.validate(&FormData::new().with_text("hero-title", "x")));
        assert_eq!(errors[0].field, "hero-title");
    }

    #[test]
    fn test_document_id_checks() {
        let schema = schema(vec![]);
        let record = valid(schema.validate(&FormData::new().with_text("id", " abc ")));
        assert_eq!(record.id.as_deref(), Some("abc"));

        let errors = invalid(schema.validate(&FormData::new().with_text("id", "a/b")));
        assert_eq!(errors[0].field, "id");

        assert_eq!(invalid(schema.validate(&FormData::new().with_text("id", "__meta__"))).len(), 1);
        let record = valid(schema.validate(&FormData::new().with_text("id", "sponsor#2024")));
        assert_eq!(record.id.as_deref(), Some("sponsor#2024"));
    }

    #[test]
    fn test_email_and_date() {
        let schema = schema(vec![
            FieldSpec::required("email", "Email", FieldKind::Email),
            FieldSpec::required("date", "Date", FieldKind::Date),
        ]);
        let errors = invalid(schema.validate(
            &FormData::new().with_text("email", "nobody").with_text("date", "01.02.2024"),
        ));
        assert_eq!(errors.len(), 2);

        let record = valid(schema.validate(
            &FormData::new()
                .with_text("email", "vorstand@club.de")
                .with_text("date", "2024-02-01"),
        ));
        assert_eq!(record.data["date"], json!("2024-02-01"));
    }
}
