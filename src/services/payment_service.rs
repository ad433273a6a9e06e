use std::sync::Arc;
use chrono::{DateTime, Utc};
use log::info;
use rand::Rng;
use crate::models::{ApiError, CreatePaymentRequest, Payment, PaymentStatus};
use crate::models::payment::PAYMENTS;
use crate::services::store::{decode_all, DocumentStore};
use crate::services::TaskService;
use crate::utils::firestore_codec::{self, Value};
use crate::utils::phone::normalize_phone;

const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ0123456789";
const REFERENCE_LEN: usize = 10;

/// Receipt-style reference, e.g. `SIM4K7PQ2XZ9A`.
fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let body: String = (0..REFERENCE_LEN)
        .map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char)
        .collect();
    format!("SIM{}", body)
}

/// Records simulated payments against tasks.
pub struct PaymentService {
    store: Arc<dyn DocumentStore>,
    tasks: Arc<TaskService>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn DocumentStore>, tasks: Arc<TaskService>) -> Self {
        Self { store, tasks }
    }

    pub async fn create(&self, req: CreatePaymentRequest, now: DateTime<Utc>) -> Result<Payment, ApiError> {
        let task = self.tasks.get(&req.task_id).await?;
        if task.is_paid() {
            return Err(ApiError::Duplicate(format!("Task {} is already paid", task.id)));
        }

        let amount = req.amount.unwrap_or(task.price);
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ApiError::ValidationError(format!("Invalid amount: {}", amount)));
        }

        let payment = Payment {
            id: String::new(),
            task_id: task.id.clone(),
            payer_phone: normalize_phone(&req.payer_phone),
            amount,
            method: req.method.unwrap_or_else(|| "mpesa".to_string()),
            status: PaymentStatus::Completed,
            reference: generate_reference(),
            created_at: Some(now),
        };

        let doc = self
            .store
            .create(PAYMENTS, None, firestore_codec::encode(&payment)?)
            .await?;
        self.tasks.mark_paid(&task.id, now).await?;
        info!("Payment {} ({}) of {} recorded for task {}", doc.id, payment.reference, amount, task.id);
        Ok(doc.decode()?)
    }

    pub async fn list(&self, task_id: Option<&str>, phone: Option<&str>) -> Result<Vec<Payment>, ApiError> {
        let docs = match (task_id, phone) {
            (Some(task_id), _) => self.store.find_by(PAYMENTS, "taskId", &Value::from(task_id)).await?,
            (None, Some(phone)) => {
                self.store
                    .find_by(PAYMENTS, "payerPhone", &Value::from(normalize_phone(phone)))
                    .await?
            }
            (None, None) => self.store.list(PAYMENTS).await?,
        };
        let mut payments: Vec<Payment> = decode_all(PAYMENTS, docs);
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}
