//! Domain models.
//!
//! Typed views of the records the management tooling works with. The schema
//! itself is defined by the migration files under `migrations/`; these
//! structs mirror the fixture `fields` payloads and carry the natural keys
//! the initialization command gates on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document style: rendering rules applied to documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStyle {
    /// Human-readable style name.
    pub title: String,
    /// URL-safe identifier.
    pub slug: String,
    /// The style definition consumed by the front end.
    pub contents: serde_json::Value,
}

impl DocumentStyle {
    /// The app label this model belongs to.
    pub const APP_LABEL: &'static str = "style";
    /// The model name.
    pub const MODEL_NAME: &'static str = "documentstyle";
}

/// A CMS flat page, such as the terms of service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatPage {
    /// The URL path for this page (e.g. "/terms/").
    pub url: String,
    /// The page title.
    pub title: String,
    /// The page content (HTML).
    pub content: String,
}

impl FlatPage {
    /// The app label this model belongs to.
    pub const APP_LABEL: &'static str = "base";
    /// The model name.
    pub const MODEL_NAME: &'static str = "flatpage";
}

/// A template used when exporting documents to external formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportTemplate {
    /// The template file name.
    pub file_name: String,
    /// The export format (e.g. "docx", "odt").
    pub file_type: String,
    /// The template definition.
    pub template_definition: serde_json::Value,
}

impl ExportTemplate {
    /// The app label this model belongs to.
    pub const APP_LABEL: &'static str = "document";
    /// The model name.
    pub const MODEL_NAME: &'static str = "exporttemplate";
}

/// A collaborative document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The document title.
    pub title: String,
    /// The document body.
    pub contents: serde_json::Value,
    /// The owning user's id.
    pub owner: i64,
    /// Creation timestamp.
    pub added: DateTime<Utc>,
    /// Last update timestamp.
    pub updated: DateTime<Utc>,
}

/// An account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The login name.
    pub username: String,
    /// The contact address.
    pub email: String,
}

impl User {
    /// The app label this model belongs to.
    pub const APP_LABEL: &'static str = "user";
    /// The model name.
    pub const MODEL_NAME: &'static str = "user";
}

/// An invitation for someone without an account yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInvite {
    /// The invited name.
    pub username: String,
    /// The address the invitation was sent to.
    pub email: String,
    /// The id of the inviting user.
    pub by: i64,
}

impl UserInvite {
    /// The app label this model belongs to.
    pub const APP_LABEL: &'static str = "user";
    /// The model name.
    pub const MODEL_NAME: &'static str = "userinvite";
}

/// The level of access a holder has on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRightLevel {
    /// Full write access.
    Write,
    /// Read-only access.
    Read,
    /// May suggest changes.
    Review,
    /// May add comments.
    Comment,
}

/// An access grant on a document.
///
/// The holder is polymorphic: `holder_type` references the content-type
/// registry and is restricted (by the schema) to accounts and invitations,
/// `holder_id` is the id within the holder's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRight {
    /// The document the right applies to.
    pub document: i64,
    /// The content-type id of the holder.
    pub holder_type: i64,
    /// The holder's id within its own table.
    pub holder_id: i64,
    /// The granted access level.
    pub rights: AccessRightLevel,
}

impl AccessRight {
    /// The app label this model belongs to.
    pub const APP_LABEL: &'static str = "document";
    /// The model name.
    pub const MODEL_NAME: &'static str = "accessright";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_style_fixture_shape() {
        let style: DocumentStyle = serde_json::from_value(json!({
            "title": "Default",
            "slug": "default",
            "contents": {"body_font": "serif"}
        }))
        .unwrap();
        assert_eq!(style.slug, "default");
    }

    #[test]
    fn test_document_timestamps_roundtrip() {
        let doc: Document = serde_json::from_value(json!({
            "title": "Paper",
            "contents": {"type": "doc", "content": []},
            "owner": 1,
            "added": "2026-01-01T00:00:00Z",
            "updated": "2026-01-02T12:30:00Z"
        }))
        .unwrap();
        assert!(doc.updated > doc.added);
        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["owner"], 1);
    }

    #[test]
    fn test_access_right_levels_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&AccessRightLevel::Write).unwrap(),
            "\"write\""
        );
        let level: AccessRightLevel = serde_json::from_str("\"review\"").unwrap();
        assert_eq!(level, AccessRightLevel::Review);
    }

    #[test]
    fn test_access_right_fixture_shape() {
        let right: AccessRight = serde_json::from_value(json!({
            "document": 1,
            "holder_type": 2,
            "holder_id": 7,
            "rights": "read"
        }))
        .unwrap();
        assert_eq!(right.rights, AccessRightLevel::Read);
    }
}
