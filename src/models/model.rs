//! Model entity model
//!
//! This module contains the SeaORM entity model for the models table. A row
//! is identified by its globally unique `api_string` and is soft-deleted via
//! `is_archived`, never removed.

use std::collections::BTreeSet;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

use super::provider::Entity as Provider;

/// Chat application tier a model is offered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ChatAppTier {
    #[sea_orm(string_value = "Free")]
    Free,
    #[sea_orm(string_value = "Pro")]
    Pro,
}

impl ChatAppTier {
    /// Parses a desired-state value; anything but `Free` or `Pro` is `None`.
    pub fn coerce(value: &str) -> Option<Self> {
        match value {
            "Free" => Some(Self::Free),
            "Pro" => Some(Self::Pro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
        }
    }
}

/// Model entity representing one priced model offered by a provider
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "models")]
pub struct Model {
    /// Generated identifier (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Vendor API identifier, unique across the whole store (natural key)
    #[sea_orm(unique)]
    pub api_string: String,

    /// Owning provider
    pub provider_id: Uuid,

    /// Display name
    pub name: String,

    /// Price in USD per million input tokens
    pub cost_per_million_token_input: f64,

    /// Price in USD per million output tokens
    pub cost_per_million_token_output: f64,

    /// Capability tags, stored as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub capabilities: JsonValue,

    /// Chat application tier, if offered there
    pub available_for_chat_app: Option<ChatAppTier>,

    /// Free-form description
    pub description: String,

    /// Release date derived from the api string
    pub release_date: Option<Date>,

    /// Soft-delete flag
    pub is_archived: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Stored capabilities as a set. `None` when the column is not an array
    /// of strings.
    pub fn capability_set(&self) -> Option<BTreeSet<String>> {
        capability_set(&self.capabilities)
    }
}

/// Interprets a JSON value as a set of capability tags.
pub fn capability_set(value: &JsonValue) -> Option<BTreeSet<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Provider",
        from = "Column::ProviderId",
        to = "super::provider::Column::Id"
    )]
    Provider,
}

impl Related<Provider> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_accepts_only_known_tiers() {
        assert_eq!(ChatAppTier::coerce("Free"), Some(ChatAppTier::Free));
        assert_eq!(ChatAppTier::coerce("Pro"), Some(ChatAppTier::Pro));
        assert_eq!(ChatAppTier::coerce("pro"), None);
        assert_eq!(ChatAppTier::coerce("Enterprise"), None);
        assert_eq!(ChatAppTier::coerce(""), None);
    }

    #[test]
    fn capability_set_ignores_order_and_duplicates() {
        let a = capability_set(&json!(["vision", "pdf", "vision"])).unwrap();
        let b = capability_set(&json!(["pdf", "vision"])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn capability_set_rejects_non_string_arrays() {
        assert!(capability_set(&json!(["vision", 3])).is_none());
        assert!(capability_set(&json!({"vision": true})).is_none());
        assert!(capability_set(&JsonValue::Null).is_none());
    }
}
