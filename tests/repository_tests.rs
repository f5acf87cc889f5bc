//! Integration tests for the provider and model repositories.

use anyhow::Result;
use catalog_sync::models::{ChatAppTier, model, provider};
use catalog_sync::repositories::{ModelRepository, ProviderRepository};
use chrono::Utc;
use sea_orm::{NotSet, Set};
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::setup_test_db_arc;

fn new_provider(name: &str) -> provider::ActiveModel {
    let now = Utc::now();
    provider::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        api_endpoint: Set(String::new()),
        icon: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

fn new_model(provider_id: Uuid, api_string: &str) -> model::ActiveModel {
    let now = Utc::now();
    model::ActiveModel {
        id: Set(Uuid::new_v4()),
        api_string: Set(api_string.to_string()),
        provider_id: Set(provider_id),
        name: Set(api_string.to_string()),
        cost_per_million_token_input: Set(0.5),
        cost_per_million_token_output: Set(1.5),
        capabilities: Set(serde_json::json!(["vision"])),
        available_for_chat_app: Set(Some(ChatAppTier::Pro)),
        description: Set(String::new()),
        release_date: Set(None),
        is_archived: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

#[tokio::test]
async fn create_and_find_provider_by_name() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = ProviderRepository::new(db.clone());

    let created = repo.create(new_provider("openai")).await?;
    assert_eq!(created.name, "openai");
    assert_eq!(created.icon, None);

    let found = repo.find_by_name("openai").await?.expect("provider exists");
    assert_eq!(found.id, created.id);
    assert!(repo.find_by_name("anthropic").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn provider_names_are_unique() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = ProviderRepository::new(db.clone());

    repo.create(new_provider("openai")).await?;
    assert!(repo.create(new_provider("openai")).await.is_err());
    Ok(())
}

#[tokio::test]
async fn find_all_orders_by_name() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = ProviderRepository::new(db.clone());

    repo.create(new_provider("openai")).await?;
    repo.create(new_provider("anthropic")).await?;

    let names: Vec<String> = repo.find_all().await?.into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["anthropic", "openai"]);
    Ok(())
}

#[tokio::test]
async fn update_by_name_writes_only_set_columns() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = ProviderRepository::new(db.clone());
    let created = repo.create(new_provider("openai")).await?;

    let changes = provider::ActiveModel {
        id: NotSet,
        name: NotSet,
        api_endpoint: NotSet,
        icon: Set(Some("https://cdn.example/openai.svg".to_string())),
        created_at: NotSet,
        updated_at: Set(Utc::now().into()),
    };
    repo.update_by_name("openai", changes).await?;

    let updated = repo.find_by_name("openai").await?.unwrap();
    assert_eq!(updated.icon.as_deref(), Some("https://cdn.example/openai.svg"));
    assert_eq!(updated.api_endpoint, created.api_endpoint);
    assert_eq!(updated.created_at, created.created_at);
    Ok(())
}

#[tokio::test]
async fn update_of_missing_provider_fails() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = ProviderRepository::new(db);

    let changes = provider::ActiveModel {
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    let err = repo.update_by_name("ghost", changes).await.unwrap_err();
    assert!(err.to_string().contains("ghost"));
    Ok(())
}

#[tokio::test]
async fn models_round_trip_and_list_by_provider() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let providers = ProviderRepository::new(db.clone());
    let models = ModelRepository::new(db.clone());

    let openai = providers.create(new_provider("openai")).await?;
    let anthropic = providers.create(new_provider("anthropic")).await?;
    models.create(new_model(openai.id, "gpt-4o")).await?;
    models.create(new_model(openai.id, "gpt-4o-mini")).await?;
    models.create(new_model(anthropic.id, "claude-3")).await?;

    let stored = models.find_by_api_string("gpt-4o").await?.unwrap();
    assert_eq!(stored.available_for_chat_app, Some(ChatAppTier::Pro));
    assert_eq!(stored.capabilities, serde_json::json!(["vision"]));
    assert_eq!(stored.cost_per_million_token_output, 1.5);

    let owned: Vec<String> = models
        .find_by_provider(openai.id)
        .await?
        .into_iter()
        .map(|m| m.api_string)
        .collect();
    assert_eq!(owned, vec!["gpt-4o", "gpt-4o-mini"]);
    Ok(())
}

#[tokio::test]
async fn api_strings_are_globally_unique() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let providers = ProviderRepository::new(db.clone());
    let models = ModelRepository::new(db.clone());

    let openai = providers.create(new_provider("openai")).await?;
    let azure = providers.create(new_provider("azure")).await?;
    models.create(new_model(openai.id, "gpt-4o")).await?;
    assert!(models.create(new_model(azure.id, "gpt-4o")).await.is_err());
    Ok(())
}

#[tokio::test]
async fn archiving_a_model_leaves_other_columns() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let providers = ProviderRepository::new(db.clone());
    let models = ModelRepository::new(db.clone());

    let openai = providers.create(new_provider("openai")).await?;
    let created = models.create(new_model(openai.id, "gpt-4o")).await?;

    let changes = model::ActiveModel {
        is_archived: Set(true),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    models.update_by_api_string("gpt-4o", changes).await?;

    let archived = models.find_by_api_string("gpt-4o").await?.unwrap();
    assert!(archived.is_archived);
    assert_eq!(archived.name, created.name);
    assert_eq!(archived.capabilities, created.capabilities);
    assert_eq!(archived.available_for_chat_app, created.available_for_chat_app);
    Ok(())
}
