use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, error};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use crate::handlers::require_admin;
use crate::models::{ApiError, ConfigSection};
use crate::services::{ConfigService, UserService};

#[derive(Debug, Deserialize)]
pub struct SectionQuery {
    pub section: Option<String>,
    pub id: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub section: String,
    pub item: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub section: String,
    pub id: Option<String>,
    pub item: Option<JsonValue>,
    pub settings: Option<Map<String, JsonValue>>,
}

fn parse_section(raw: &str) -> Result<ConfigSection, ApiError> {
    raw.parse::<ConfigSection>().map_err(ApiError::ValidationError)
}

pub async fn get_config(
    config_service: web::Data<ConfigService>,
    query: web::Query<SectionQuery>,
) -> Result<HttpResponse, ApiError> {
    match query.section.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(section) => {
            let section = parse_section(section)?;
            info!("Getting config section {}", section.as_str());
            let data = config_service.section(section).await?;
            Ok(HttpResponse::Ok().json(json!({ "success": true, "section": section.as_str(), "data": data })))
        }
        None => {
            info!("Getting platform config");
            let config = config_service.get().await?;
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": config })))
        }
    }
}

pub async fn add_config_item(
    config_service: web::Data<ConfigService>,
    user_service: web::Data<UserService>,
    payload: web::Json<AddItemRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&user_service, &req).await?;
    let payload = payload.into_inner();
    let section = parse_section(&payload.section)?;
    info!("Admin {} adding {} item", admin.phone, section.as_str());

    match config_service.add_item(section, payload.item).await {
        Ok(item) => Ok(HttpResponse::Created().json(json!({ "success": true, "item": item }))),
        Err(e) => {
            error!("Failed to add {} item: {}", section.as_str(), e);
            Err(e)
        }
    }
}

pub async fn update_config(
    config_service: web::Data<ConfigService>,
    user_service: web::Data<UserService>,
    payload: web::Json<UpdateConfigRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&user_service, &req).await?;
    let payload = payload.into_inner();
    let section = parse_section(&payload.section)?;
    info!("Admin {} updating config section {}", admin.phone, section.as_str());

    let result = match (section, payload.id, payload.item, payload.settings) {
        (ConfigSection::Settings, _, _, Some(settings)) => config_service.update_settings(settings).await,
        (ConfigSection::Settings, _, _, None) => {
            Err(ApiError::ValidationError("settings object is required".to_string()))
        }
        (section, Some(id), Some(item), _) => config_service.update_item(section, &id, item).await,
        _ => Err(ApiError::ValidationError("id and item are required".to_string())),
    };

    match result {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => {
            error!("Failed to update config: {}", e);
            Err(e)
        }
    }
}

pub async fn delete_config_item(
    config_service: web::Data<ConfigService>,
    user_service: web::Data<UserService>,
    query: web::Query<SectionQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&user_service, &req).await?;
    let (section, id) = match (query.section.as_deref(), query.id.as_deref()) {
        (Some(section), Some(id)) => (parse_section(section)?, id),
        _ => return Err(ApiError::ValidationError("section and id are required".to_string())),
    };
    info!("Admin {} deleting {} item {}", admin.phone, section.as_str(), id);

    config_service.delete_item(section, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Item deleted" })))
}

// Public catalog listing
pub async fn get_services(
    config_service: web::Data<ConfigService>,
    query: web::Query<SectionQuery>,
) -> Result<HttpResponse, ApiError> {
    let category = query.category.as_deref().filter(|c| !c.trim().is_empty());
    info!("Listing services (category {:?})", category);

    let services = config_service.services(category).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": services.len(),
        "services": services,
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};
    use crate::handlers::test_support::{seed_user, services_at, wednesday};

    #[actix_web::test]
    async fn test_catalog_editing() {
        let services = services_at(wednesday());
        seed_user(&services, "0700000099", "admin").await;
        let app = test_app!(services);

        let req = test::TestRequest::get().uri("/api/services?category=education").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["services"][0]["id"], "helb-application");

        let new_service = json!({
            "section": "services",
            "item": { "name": "KUCCPS placement", "price": 700, "category": "education" }
        });
        let req = test::TestRequest::post().uri("/api/config").set_json(&new_service).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/config")
            .insert_header(("X-User-Phone", "0700000099"))
            .set_json(&new_service)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["item"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::put()
            .uri("/api/config")
            .insert_header(("X-User-Phone", "0700000099"))
            .set_json(json!({ "section": "settings", "settings": { "minimumWithdrawal": 250 } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["minimumWithdrawal"], 250.0);
        assert_eq!(body["data"]["currency"], "KES");

        let req = test::TestRequest::get().uri("/api/services?category=education").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 2);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/config?section=services&id={}", id))
            .insert_header(("X-User-Phone", "0700000099"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/config?section=services&id={}", id))
            .insert_header(("X-User-Phone", "0700000099"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/config?section=categories").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
    }
}
