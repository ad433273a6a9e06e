use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, error};
use serde_json::json;
use crate::handlers::require_admin;
use crate::models::{ApiError, CreateTicketRequest, UpdateTicketRequest};
use crate::models::support::SupportQuery;
use crate::services::{Clock, SupportService, UserService};

pub async fn get_tickets(
    support_service: web::Data<SupportService>,
    user_service: web::Data<UserService>,
    query: web::Query<SupportQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let phone = query.phone.as_deref().filter(|p| !p.trim().is_empty());
    if phone.is_none() {
        require_admin(&user_service, &req).await?;
    }
    info!("Listing support tickets for {:?}", phone);

    let tickets = support_service.list(phone).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": tickets.len(),
        "tickets": tickets,
    })))
}

pub async fn create_ticket(
    support_service: web::Data<SupportService>,
    clock: web::Data<Clock>,
    payload: web::Json<CreateTicketRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Opening support ticket for {}", payload.user_phone);

    match support_service.create(payload.into_inner(), clock.now()).await {
        Ok(ticket) => Ok(HttpResponse::Created().json(json!({ "success": true, "ticket": ticket }))),
        Err(e) => {
            error!("Failed to open ticket: {}", e);
            Err(e)
        }
    }
}

pub async fn update_ticket(
    support_service: web::Data<SupportService>,
    clock: web::Data<Clock>,
    ticket_id: web::Path<String>,
    payload: web::Json<UpdateTicketRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Updating support ticket {}", ticket_id);

    match support_service.update(&ticket_id, payload.into_inner(), clock.now()).await {
        Ok(ticket) => Ok(HttpResponse::Ok().json(json!({ "success": true, "ticket": ticket }))),
        Err(e) => {
            error!("Failed to update ticket {}: {}", ticket_id, e);
            Err(e)
        }
    }
}
