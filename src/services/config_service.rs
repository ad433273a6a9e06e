use std::sync::Arc;
use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;
use crate::models::ApiError;
use crate::models::catalog::{CatalogItem, ConfigSection, PlatformConfig, Service, CONFIG, PLATFORM_DOC};
use crate::services::store::DocumentStore;
use crate::utils::firestore_codec;

/// Reads and edits the single platform configuration document.
pub struct ConfigService {
    store: Arc<dyn DocumentStore>,
}

impl ConfigService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The stored config, or the built-in catalog when nothing usable is stored.
    pub async fn get(&self) -> Result<PlatformConfig, ApiError> {
        match self.store.get(CONFIG, PLATFORM_DOC).await? {
            Some(doc) => match doc.decode::<PlatformConfig>() {
                Ok(config) => Ok(config),
                Err(e) => {
                    warn!("Stored platform config is unreadable, serving defaults: {}", e);
                    Ok(PlatformConfig::default())
                }
            },
            None => {
                info!("No platform config stored yet, serving defaults");
                Ok(PlatformConfig::default())
            }
        }
    }

    async fn save(&self, config: &PlatformConfig) -> Result<(), ApiError> {
        self.store
            .set(CONFIG, PLATFORM_DOC, firestore_codec::encode(config)?)
            .await?;
        Ok(())
    }

    pub async fn section(&self, section: ConfigSection) -> Result<JsonValue, ApiError> {
        let config = self.get().await?;
        let value = match section {
            ConfigSection::Categories => serde_json::to_value(&config.categories),
            ConfigSection::Filters => serde_json::to_value(&config.filters),
            ConfigSection::Services => serde_json::to_value(&config.services),
            ConfigSection::Settings => serde_json::to_value(&config.settings),
        };
        value.map_err(|e| ApiError::InternalError(e.to_string()))
    }

    pub async fn add_item(&self, section: ConfigSection, item: JsonValue) -> Result<JsonValue, ApiError> {
        let mut config = self.get().await?;
        let added = match section {
            ConfigSection::Categories => insert_item(&mut config.categories, item)?,
            ConfigSection::Filters => insert_item(&mut config.filters, item)?,
            ConfigSection::Services => insert_item(&mut config.services, item)?,
            ConfigSection::Settings => {
                return Err(ApiError::ValidationError("Settings are updated with PUT".to_string()))
            }
        };
        self.save(&config).await?;
        info!("Added {} item {}", section.as_str(), added["id"]);
        Ok(added)
    }

    pub async fn update_item(&self, section: ConfigSection, id: &str, item: JsonValue) -> Result<JsonValue, ApiError> {
        let mut config = self.get().await?;
        let updated = match section {
            ConfigSection::Categories => replace_item(&mut config.categories, id, item)?,
            ConfigSection::Filters => replace_item(&mut config.filters, id, item)?,
            ConfigSection::Services => replace_item(&mut config.services, id, item)?,
            ConfigSection::Settings => {
                return Err(ApiError::ValidationError("Use settings to update platform settings".to_string()))
            }
        };
        self.save(&config).await?;
        Ok(updated)
    }

    /// Shallow-merge `changes` into the settings object.
    pub async fn update_settings(&self, changes: Map<String, JsonValue>) -> Result<JsonValue, ApiError> {
        let mut config = self.get().await?;
        let mut current = match serde_json::to_value(&config.settings) {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        };
        current.extend(changes);
        config.settings = serde_json::from_value(JsonValue::Object(current))
            .map_err(|e| ApiError::ValidationError(format!("Invalid settings: {}", e)))?;
        self.save(&config).await?;
        serde_json::to_value(&config.settings).map_err(|e| ApiError::InternalError(e.to_string()))
    }

    pub async fn delete_item(&self, section: ConfigSection, id: &str) -> Result<(), ApiError> {
        let mut config = self.get().await?;
        match section {
            ConfigSection::Categories => remove_item(&mut config.categories, id)?,
            ConfigSection::Filters => remove_item(&mut config.filters, id)?,
            ConfigSection::Services => remove_item(&mut config.services, id)?,
            ConfigSection::Settings => {
                return Err(ApiError::ValidationError("Settings cannot be deleted".to_string()))
            }
        }
        self.save(&config).await?;
        info!("Deleted {} item {}", section.as_str(), id);
        Ok(())
    }

    /// Active catalog services, optionally narrowed to one category.
    pub async fn services(&self, category: Option<&str>) -> Result<Vec<Service>, ApiError> {
        let config = self.get().await?;
        Ok(config
            .services
            .into_iter()
            .filter(|s| s.active)
            .filter(|s| category.map_or(true, |c| s.category.eq_ignore_ascii_case(c)))
            .collect())
    }

    pub async fn find_service(&self, id: &str) -> Result<Option<Service>, ApiError> {
        Ok(self.get().await?.services.into_iter().find(|s| s.id == id))
    }
}

fn parse_item<T: DeserializeOwned>(item: JsonValue) -> Result<T, ApiError> {
    serde_json::from_value(item).map_err(|e| ApiError::ValidationError(format!("Invalid item: {}", e)))
}

fn to_json<T: Serialize>(item: &T) -> Result<JsonValue, ApiError> {
    serde_json::to_value(item).map_err(|e| ApiError::InternalError(e.to_string()))
}

fn insert_item<T>(items: &mut Vec<T>, raw: JsonValue) -> Result<JsonValue, ApiError>
where
    T: CatalogItem + DeserializeOwned + Serialize,
{
    let mut item: T = parse_item(raw)?;
    if item.id().trim().is_empty() {
        item.set_id(Uuid::new_v4().simple().to_string()[..8].to_string());
    }
    if items.iter().any(|existing| existing.id() == item.id()) {
        return Err(ApiError::Duplicate(format!("An item with id {} already exists", item.id())));
    }
    let json = to_json(&item)?;
    items.push(item);
    Ok(json)
}

fn replace_item<T>(items: &mut [T], id: &str, raw: JsonValue) -> Result<JsonValue, ApiError>
where
    T: CatalogItem + DeserializeOwned + Serialize,
{
    let slot = items
        .iter_mut()
        .find(|existing| existing.id() == id)
        .ok_or_else(|| ApiError::NotFound(format!("No item with id {}", id)))?;
    let mut item: T = parse_item(raw)?;
    // the path id wins over whatever the body carried
    item.set_id(id.to_string());
    let json = to_json(&item)?;
    *slot = item;
    Ok(json)
}

fn remove_item<T: CatalogItem>(items: &mut Vec<T>, id: &str) -> Result<(), ApiError> {
    let before = items.len();
    items.retain(|item| item.id() != id);
    if items.len() == before {
        return Err(ApiError::NotFound(format!("No item with id {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::services::MemoryStore;

    fn service() -> ConfigService {
        ConfigService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let config = service();
        let cfg = config.get().await.unwrap();
        assert_eq!(cfg, PlatformConfig::default());
        assert!(config.find_service("kra-pin").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_update_delete_service() {
        let config = service();
        let added = config
            .add_item(
                ConfigSection::Services,
                json!({ "name": "Passport Application", "price": 4500, "category": "government" }),
            )
            .await
            .unwrap();
        let id = added["id"].as_str().unwrap().to_string();
        assert_eq!(id.len(), 8);

        let government = config.services(Some("Government")).await.unwrap();
        assert!(government.iter().any(|s| s.id == id));

        config
            .update_item(
                ConfigSection::Services,
                &id,
                json!({ "name": "Passport Application", "price": 5000, "category": "government", "active": false }),
            )
            .await
            .unwrap();
        assert!(!config.services(None).await.unwrap().iter().any(|s| s.id == id));
        assert_eq!(config.find_service(&id).await.unwrap().unwrap().price, 5000.0);

        config.delete_item(ConfigSection::Services, &id).await.unwrap();
        assert!(matches!(
            config.delete_item(ConfigSection::Services, &id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_and_duplicate_items() {
        let config = service();
        assert!(matches!(
            config.add_item(ConfigSection::Services, json!({ "name": "No price" })).await,
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            config.add_item(ConfigSection::Categories, json!({ "id": "jobs", "name": "Jobs again" })).await,
            Err(ApiError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_update_settings_merges() {
        let config = service();
        let mut changes = Map::new();
        changes.insert("minimumWithdrawal".to_string(), json!(250));
        changes.insert("bannerText".to_string(), json!("Holiday hours"));
        let settings = config.update_settings(changes).await.unwrap();

        assert_eq!(settings["minimumWithdrawal"], json!(250.0));
        assert_eq!(settings["currency"], json!("KES"));
        assert_eq!(settings["bannerText"], json!("Holiday hours"));

        let stored = config.get().await.unwrap();
        assert_eq!(stored.settings.minimum_withdrawal, 250.0);
    }
}
