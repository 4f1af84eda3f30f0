//! Store-level request shapes: what a composed listing request looks like
//! once it reaches a document store adapter.

use serde::{Deserialize, Serialize};

use crate::db::models::{to_micros, ContentItem, ContentStatus};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    Views,
    Likes,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Views => "views",
            SortField::Likes => "likes",
        }
    }

    /// The integer this field sorts by for a given item.
    pub fn value_of(&self, item: &ContentItem) -> i64 {
        match self {
            SortField::CreatedAt => to_micros(&item.created_at),
            SortField::Views => item.views,
            SortField::Likes => item.likes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

/// Equality filters the store must evaluate against indexed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Status(ContentStatus),
    Category(String),
    Owner(String),
    Premium(bool),
    Short(bool),
}

impl Filter {
    pub fn matches(&self, item: &ContentItem) -> bool {
        match self {
            Filter::Status(status) => item.status == *status,
            Filter::Category(category) => item.category == *category,
            Filter::Owner(owner) => item.owner_id == *owner,
            Filter::Premium(flag) => item.is_premium == *flag,
            Filter::Short(flag) => item.is_short == *flag,
        }
    }
}

/// Keyset position: the sort value and id of the last document of a page.
///
/// Opaque to callers; travels as a hex-encoded JSON token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub field: SortField,
    pub value: i64,
    pub id: String,
}

impl Cursor {
    pub fn after(field: SortField, item: &ContentItem) -> Self {
        Self {
            field,
            value: field.value_of(item),
            id: item.id.clone(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing a plain struct of an enum, an integer and a string cannot fail.
        hex::encode(serde_json::to_vec(self).unwrap_or_default())
    }

    pub fn decode(token: &str) -> AppResult<Self> {
        let bytes = hex::decode(token)
            .map_err(|_| AppError::BadRequest("Malformed continuation cursor".into()))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| AppError::BadRequest("Malformed continuation cursor".into()))
    }

    /// True when `item` sorts strictly after this position.
    pub fn precedes(&self, item: &ContentItem, order: SortOrder) -> bool {
        let key = (self.field.value_of(item), item.id.as_str());
        let mark = (self.value, self.id.as_str());
        match order {
            SortOrder::Asc => key > mark,
            SortOrder::Desc => key < mark,
        }
    }
}

/// A single read request against the content collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub filters: Vec<Filter>,
    pub sort: Sort,
    pub limit: usize,
    pub start_after: Option<Cursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_token_round_trips() {
        let cursor = Cursor {
            field: SortField::Views,
            value: 42,
            id: "0191-abc".into(),
        };
        let token = cursor.encode();
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn garbage_cursor_is_a_bad_request() {
        assert!(matches!(
            Cursor::decode("not-hex"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            Cursor::decode(&hex::encode(b"{\"nope\":1}")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn sort_field_parses_from_camel_case() {
        let field: SortField = serde_json::from_str("\"createdAt\"").unwrap();
        assert_eq!(field, SortField::CreatedAt);
        let order: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
    }
}
