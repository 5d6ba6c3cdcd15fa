//! Descriptors for every admin-writable resource

use clubsite_common::sanitize::normalize_slug;
use serde_json::Value;

use super::schema::{FieldError, FieldKind, FieldSpec, FileSpec, IdStrategy, ListSyntax, ResourceSchema};
use crate::db::{Document, WriteMode};

/// Static content pages stored in `siteContent`
pub const CONTENT_PAGES: [&str; 6] = ["home", "about", "faq", "membership", "training", "contact"];

/// Id of the site settings singleton
pub const GENERAL_SETTINGS: &str = "general";

/// Maximum number of contact persons on the site settings
pub const MAX_CONTACT_PERSONS: usize = 4;

/// Names accepted by `POST /api/admin/:resource`
pub const RESOURCE_NAMES: [&str; 4] = ["news", "pilots", "sponsors", "board"];

pub fn is_content_page(name: &str) -> bool {
    CONTENT_PAGES.contains(&name)
}

/// Descriptor for a list resource (`news`, `pilots`, `sponsors`, `board`)
pub fn resource_schema(name: &str) -> Option<ResourceSchema> {
    match name {
        "news" => Some(news()),
        "pilots" => Some(pilots()),
        "sponsors" => Some(sponsors()),
        "board" => Some(board()),
        _ => None,
    }
}

/// Descriptor for a settings singleton: `general` or a content page
pub fn settings_schema(name: &str) -> Option<ResourceSchema> {
    if name == GENERAL_SETTINGS {
        Some(general_settings())
    } else if is_content_page(name) {
        Some(content_page(name))
    } else {
        None
    }
}

/// `slug` derived from `source` when the form did not send one
///
/// A source that normalizes to nothing cannot name the document, so the
/// caller has to supply the slug explicitly.
fn default_slug(data: &Document, source: &str) -> Result<Document, FieldError> {
    let mut defaults = Document::new();
    if data.contains_key("slug") {
        return Ok(defaults);
    }
    let slug = match data.get(source) {
        Some(Value::String(value)) => normalize_slug(value),
        _ => String::new(),
    };
    if slug.is_empty() {
        return Err(FieldError::new("slug", "Slug is required"));
    }
    defaults.insert("slug".to_string(), Value::String(slug));
    Ok(defaults)
}

fn news_slug(data: &Document) -> Result<Document, FieldError> {
    default_slug(data, "title")
}

fn board_slug(data: &Document) -> Result<Document, FieldError> {
    default_slug(data, "id")
}

fn news() -> ResourceSchema {
    ResourceSchema {
        name: "news".to_string(),
        collection: "news",
        id: IdStrategy::GeneratedUnlessField("id"),
        fields: vec![
            FieldSpec::required("title", "Title", FieldKind::Text),
            FieldSpec::required("date", "Date", FieldKind::Date),
            FieldSpec::required("content", "Content", FieldKind::Html),
            FieldSpec::optional("slug", "Slug", FieldKind::Slug),
            FieldSpec::optional("categories", "Categories", FieldKind::List(ListSyntax::Commas)),
            FieldSpec::optional("excerpt", "Excerpt", FieldKind::Text),
            FieldSpec::optional("youtubeEmbed", "YouTube embed", FieldKind::Text),
        ],
        files: vec![FileSpec {
            field: "heroImage",
            target: "heroImageUrl",
            label: "Hero image",
            required_on_create: false,
        }],
        key_prefix: "news",
        write_mode: WriteMode::Merge,
        free_form: false,
        derive: Some(news_slug),
        message: "News article saved",
    }
}

fn pilots() -> ResourceSchema {
    ResourceSchema {
        name: "pilots".to_string(),
        collection: "pilots",
        id: IdStrategy::GeneratedUnlessField("id"),
        fields: vec![
            FieldSpec::required("name", "Name", FieldKind::Text),
            FieldSpec::optional("profileSlug", "Profile slug", FieldKind::Slug),
            FieldSpec::optional("bio", "Bio", FieldKind::Html),
            FieldSpec::optional("achievements", "Achievements", FieldKind::DelimitedText),
        ],
        files: vec![FileSpec {
            field: "image",
            target: "imageUrl",
            label: "Image",
            required_on_create: false,
        }],
        key_prefix: "pilots",
        write_mode: WriteMode::Merge,
        free_form: false,
        derive: None,
        message: "Pilot saved",
    }
}

fn sponsors() -> ResourceSchema {
    ResourceSchema {
        name: "sponsors".to_string(),
        collection: "sponsors",
        id: IdStrategy::FromField("id"),
        fields: vec![
            FieldSpec::required("id", "Id", FieldKind::Text),
            FieldSpec::required("name", "Name", FieldKind::Text),
            FieldSpec::required("level", "Level", FieldKind::Text),
            FieldSpec::optional("websiteUrl", "Website", FieldKind::Text),
            FieldSpec::optional("dataAiHint", "Image hint", FieldKind::Text),
            FieldSpec::optional("isActive", "Active", FieldKind::Boolean),
            FieldSpec::optional("displayOrder", "Display order", FieldKind::Integer),
        ],
        files: vec![FileSpec {
            field: "logo",
            target: "logoUrl",
            label: "Logo",
            required_on_create: true,
        }],
        key_prefix: "sponsors",
        write_mode: WriteMode::Merge,
        free_form: false,
        derive: None,
        message: "Sponsor saved",
    }
}

fn board() -> ResourceSchema {
    ResourceSchema {
        name: "board".to_string(),
        collection: "boardMembers",
        id: IdStrategy::FromField("id"),
        fields: vec![
            FieldSpec::required("id", "Id", FieldKind::Text),
            FieldSpec::required("name", "Name", FieldKind::Text),
            FieldSpec::required("role", "Role", FieldKind::Text),
            FieldSpec::required("email", "Email", FieldKind::Email),
            FieldSpec::optional("term", "Term", FieldKind::Text),
            FieldSpec::optional("slug", "Slug", FieldKind::Slug),
            FieldSpec::optional("description", "Description", FieldKind::Html),
            FieldSpec::optional("order", "Order", FieldKind::Integer),
        ],
        files: vec![FileSpec {
            field: "image",
            target: "imageUrl",
            label: "Image",
            required_on_create: false,
        }],
        key_prefix: "board",
        write_mode: WriteMode::Merge,
        free_form: false,
        derive: Some(board_slug),
        message: "Board member saved",
    }
}

fn general_settings() -> ResourceSchema {
    ResourceSchema {
        name: GENERAL_SETTINGS.to_string(),
        collection: "siteSettings",
        id: IdStrategy::Fixed(GENERAL_SETTINGS.to_string()),
        fields: vec![FieldSpec::optional(
            "contactPersonIds",
            "Contact persons",
            FieldKind::IdList {
                max: MAX_CONTACT_PERSONS,
            },
        )],
        files: vec![
            FileSpec {
                field: "logo",
                target: "logoUrl",
                label: "Logo",
                required_on_create: false,
            },
            FileSpec {
                field: "heroImage",
                target: "homepageHeroImageUrl",
                label: "Homepage hero image",
                required_on_create: false,
            },
        ],
        key_prefix: "settings",
        write_mode: WriteMode::Merge,
        free_form: false,
        derive: None,
        message: "Settings saved",
    }
}

/// Content pages replace list fields wholesale so a shortened FAQ list
/// does not keep stale trailing entries
fn content_page(page: &str) -> ResourceSchema {
    ResourceSchema {
        name: page.to_string(),
        collection: "siteContent",
        id: IdStrategy::Fixed(page.to_string()),
        fields: vec![
            FieldSpec::optional("faqItems", "FAQ items", FieldKind::FaqItems),
            FieldSpec::optional(
                "futurePossibilities",
                "Future possibilities",
                FieldKind::List(ListSyntax::Lines),
            ),
        ],
        files: vec![FileSpec {
            field: "heroImage",
            target: "heroImageUrl",
            label: "Hero image",
            required_on_create: false,
        }],
        key_prefix: "content",
        write_mode: WriteMode::Replace,
        free_form: true,
        derive: None,
        message: "Page content saved",
    }
}
