use std::sync::Arc;
use chrono::{DateTime, Utc};
use log::info;
use crate::models::{ApiError, CreateTicketRequest, SupportTicket, TicketResponse, TicketStatus, UpdateTicketRequest};
use crate::models::support::SUPPORT_TICKETS;
use crate::services::store::{decode_all, DocumentStore};
use crate::utils::firestore_codec::{self, Fields, Value};
use crate::utils::phone::normalize_phone;

pub struct SupportService {
    store: Arc<dyn DocumentStore>,
}

impl SupportService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, phone: Option<&str>) -> Result<Vec<SupportTicket>, ApiError> {
        let docs = match phone {
            Some(phone) => {
                self.store
                    .find_by(SUPPORT_TICKETS, "userPhone", &Value::from(normalize_phone(phone)))
                    .await?
            }
            None => self.store.list(SUPPORT_TICKETS).await?,
        };
        let mut tickets: Vec<SupportTicket> = decode_all(SUPPORT_TICKETS, docs);
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    pub async fn create(&self, req: CreateTicketRequest, now: DateTime<Utc>) -> Result<SupportTicket, ApiError> {
        if req.subject.trim().is_empty() || req.message.trim().is_empty() {
            return Err(ApiError::ValidationError("subject and message are required".to_string()));
        }

        let ticket = SupportTicket {
            id: String::new(),
            user_phone: normalize_phone(&req.user_phone),
            subject: req.subject.trim().to_string(),
            message: req.message,
            category: req.category.unwrap_or_else(|| "general".to_string()),
            priority: req.priority.unwrap_or_else(|| "normal".to_string()),
            status: TicketStatus::Open,
            responses: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        let doc = self
            .store
            .create(SUPPORT_TICKETS, None, firestore_codec::encode(&ticket)?)
            .await?;
        info!("Support ticket {} opened by {}", doc.id, ticket.user_phone);
        Ok(doc.decode()?)
    }

    pub async fn update(&self, id: &str, req: UpdateTicketRequest, now: DateTime<Utc>) -> Result<SupportTicket, ApiError> {
        let mut ticket: SupportTicket = match self.store.get(SUPPORT_TICKETS, id).await? {
            Some(doc) => doc.decode()?,
            None => return Err(ApiError::NotFound(format!("Ticket {} not found", id))),
        };

        let mut changes = Fields::new();
        if let Some(status) = req.status.as_deref() {
            let status: TicketStatus = status.parse().map_err(ApiError::ValidationError)?;
            changes.insert("status".to_string(), Value::from(status.as_str()));
        }
        if let Some(message) = req.response.filter(|m| !m.trim().is_empty()) {
            ticket.responses.push(TicketResponse {
                from: req.responder.unwrap_or_else(|| "support".to_string()),
                message,
                created_at: Some(now),
            });
            changes.insert("responses".to_string(), firestore_codec::to_value(&ticket.responses)?);
        }

        if changes.is_empty() {
            return Err(ApiError::ValidationError("Nothing to update".to_string()));
        }
        changes.insert("updatedAt".to_string(), Value::from(now));

        let doc = self.store.update(SUPPORT_TICKETS, id, changes).await?;
        info!("Support ticket {} updated", id);
        Ok(doc.decode()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;
    use crate::services::user_service::tests::now;

    fn ticket(phone: &str) -> CreateTicketRequest {
        CreateTicketRequest {
            user_phone: phone.to_string(),
            subject: "KRA PIN not received".to_string(),
            message: "Paid two days ago".to_string(),
            category: None,
            priority: Some("high".to_string()),
        }
    }

    #[tokio::test]
    async fn test_open_and_respond() {
        let support = SupportService::new(Arc::new(MemoryStore::new()));
        let opened = support.create(ticket("0700000001"), now()).await.unwrap();
        assert_eq!(opened.status, TicketStatus::Open);
        assert_eq!(opened.category, "general");
        assert_eq!(opened.user_phone, "+254700000001");

        let updated = support
            .update(
                &opened.id,
                UpdateTicketRequest {
                    status: Some("in progress".to_string()),
                    response: Some("Looking into it".to_string()),
                    responder: Some("+254700000099".to_string()),
                },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TicketStatus::InProgress);
        assert_eq!(updated.responses.len(), 1);
        assert_eq!(updated.responses[0].from, "+254700000099");
        assert_eq!(updated.responses[0].created_at, Some(now()));

        let resolved = support
            .update(&opened.id, UpdateTicketRequest { response: Some("Done".to_string()), ..Default::default() }, now())
            .await
            .unwrap();
        assert_eq!(resolved.responses.len(), 2);
        assert_eq!(resolved.responses[1].from, "support");
    }

    #[tokio::test]
    async fn test_list_and_errors() {
        let support = SupportService::new(Arc::new(MemoryStore::new()));
        support.create(ticket("0700000001"), now()).await.unwrap();
        support.create(ticket("0700000002"), now()).await.unwrap();

        assert_eq!(support.list(Some("0700000001")).await.unwrap().len(), 1);
        assert_eq!(support.list(None).await.unwrap().len(), 2);

        let mut empty = ticket("0700000001");
        empty.subject = " ".to_string();
        assert!(matches!(support.create(empty, now()).await, Err(ApiError::ValidationError(_))));

        assert!(matches!(
            support.update("missing", UpdateTicketRequest::default(), now()).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
