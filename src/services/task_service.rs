use std::sync::Arc;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::info;
use crate::models::{ApiError, CreateTaskRequest, Role, Task, TaskStatus, UpdateTaskRequest};
use crate::models::task::TASKS;
use crate::services::store::{decode_all, DocumentStore};
use crate::services::{ConfigService, UserService};
use crate::utils::firestore_codec::{self, Fields, Value};
use crate::utils::phone::normalize_phone;

pub struct TaskService {
    store: Arc<dyn DocumentStore>,
    users: Arc<UserService>,
    config: Arc<ConfigService>,
}

fn newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl TaskService {
    pub fn new(store: Arc<dyn DocumentStore>, users: Arc<UserService>, config: Arc<ConfigService>) -> Self {
        Self { store, users, config }
    }

    async fn find(&self, field: &str, value: &str) -> Result<Vec<Task>, ApiError> {
        let docs = self.store.find_by(TASKS, field, &Value::from(value)).await?;
        Ok(decode_all(TASKS, docs))
    }

    pub async fn all(&self) -> Result<Vec<Task>, ApiError> {
        let mut tasks: Vec<Task> = decode_all(TASKS, self.store.list(TASKS).await?);
        newest_first(&mut tasks);
        Ok(tasks)
    }

    pub async fn for_customer(&self, phone: &str) -> Result<Vec<Task>, ApiError> {
        self.find("customerPhone", &normalize_phone(phone)).await
    }

    pub async fn for_worker(&self, phone: &str) -> Result<Vec<Task>, ApiError> {
        self.find("assignedWorkerPhone", &normalize_phone(phone)).await
    }

    /// Tasks assigned to any agent reporting to `manager_phone`.
    pub async fn for_team(&self, manager_phone: &str) -> Result<Vec<Task>, ApiError> {
        let team = self.users.team_of(manager_phone).await?;
        let per_agent = try_join_all(team.iter().map(|agent| self.find("assignedWorkerPhone", &agent.phone))).await?;
        Ok(per_agent.into_iter().flatten().collect())
    }

    /// Role-scoped listing used by every dashboard.
    pub async fn list_for(
        &self,
        role: Role,
        phone: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<Task>, ApiError> {
        let require_phone = || {
            phone
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| ApiError::ValidationError(format!("phone is required for role {}", role)))
        };

        let mut tasks = match role {
            Role::User => self.for_customer(require_phone()?).await?,
            Role::Worker => self.for_worker(require_phone()?).await?,
            Role::Manager => self.for_team(require_phone()?).await?,
            Role::Admin => self.all().await?,
        };

        if let Some(status) = status.filter(|s| !s.trim().is_empty()) {
            let wanted = TaskStatus::parse_known(status).map_err(ApiError::ValidationError)?;
            tasks.retain(|t| t.status == wanted);
        }
        newest_first(&mut tasks);
        Ok(tasks)
    }

    pub async fn get(&self, id: &str) -> Result<Task, ApiError> {
        match self.store.get(TASKS, id).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(ApiError::NotFound(format!("Task {} not found", id))),
        }
    }

    pub async fn create(&self, req: CreateTaskRequest, now: DateTime<Utc>) -> Result<Task, ApiError> {
        let customer = self
            .users
            .find_by_phone(&req.customer_phone)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Customer {} not found", req.customer_phone)))?;

        let catalog_entry = match req.service_id.as_deref() {
            Some(id) => Some(
                self.config
                    .find_service(id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("Service {} not found", id)))?,
            ),
            None => None,
        };

        let service_name = match (&catalog_entry, req.service_name) {
            (Some(service), _) => service.name.clone(),
            (None, Some(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return Err(ApiError::ValidationError("serviceId or serviceName is required".to_string())),
        };

        let price = match (req.price, &catalog_entry) {
            (Some(price), _) => price,
            (None, Some(service)) => service.price,
            (None, None) => return Err(ApiError::ValidationError("price is required".to_string())),
        };
        if !price.is_finite() || price <= 0.0 {
            return Err(ApiError::ValidationError(format!("Invalid price: {}", price)));
        }

        let task = Task {
            id: String::new(),
            customer_phone: customer.phone.clone(),
            customer_name: req.customer_name.or_else(|| Some(customer.name.clone()).filter(|n| !n.is_empty())),
            service_id: catalog_entry.map(|s| s.id),
            service_name,
            description: req.description.unwrap_or_default(),
            price,
            status: TaskStatus::Pending,
            progress: 0,
            assigned_worker_phone: None,
            payment_status: "unpaid".to_string(),
            created_at: Some(now),
            updated_at: Some(now),
            completed_at: None,
        };

        let doc = self.store.create(TASKS, None, firestore_codec::encode(&task)?).await?;
        info!("Created task {} for {} ({} @ {})", doc.id, task.customer_phone, task.service_name, task.price);
        Ok(doc.decode()?)
    }

    pub async fn update(&self, id: &str, req: UpdateTaskRequest, now: DateTime<Utc>) -> Result<Task, ApiError> {
        let task = self.get(id).await?;
        let mut changes = Fields::new();
        let mut assigned = task.assigned_worker_phone.clone();
        let mut status = task.status.clone();

        if let Some(worker_phone) = req.assigned_worker_phone.as_deref() {
            let worker = self
                .users
                .find_by_phone(worker_phone)
                .await?
                .ok_or_else(|| ApiError::ValidationError(format!("Unknown worker: {}", worker_phone)))?;
            if !worker.role.earns_commission() {
                return Err(ApiError::ValidationError(format!("{} is not an agent", worker.phone)));
            }
            changes.insert("assignedWorkerPhone".to_string(), Value::from(worker.phone.as_str()));
            if status == TaskStatus::Pending {
                status = TaskStatus::Assigned;
            }
            assigned = Some(worker.phone);
        }

        if let Some(requested) = req.status.as_deref() {
            status = TaskStatus::parse_known(requested).map_err(ApiError::ValidationError)?;
        }

        if task.is_completed() && status != TaskStatus::Completed {
            return Err(ApiError::ValidationError("Task is already completed".to_string()));
        }

        if let Some(progress) = req.progress {
            if !(0..=100).contains(&progress) {
                return Err(ApiError::ValidationError(format!("Progress must be between 0 and 100, got {}", progress)));
            }
            changes.insert("progress".to_string(), Value::Integer(progress));
        }

        if status != task.status {
            if status == TaskStatus::Completed {
                if assigned.is_none() {
                    return Err(ApiError::ValidationError("Cannot complete an unassigned task".to_string()));
                }
                changes.insert("progress".to_string(), Value::Integer(100));
                changes.insert("completedAt".to_string(), Value::from(now));
            }
            changes.insert("status".to_string(), Value::from(status.label()));
        }

        if let Some(description) = req.description {
            changes.insert("description".to_string(), Value::from(description));
        }

        if changes.is_empty() {
            return Ok(task);
        }
        changes.insert("updatedAt".to_string(), Value::from(now));

        let doc = self.store.update(TASKS, id, changes).await?;
        info!("Updated task {} (status {})", id, status);
        Ok(doc.decode()?)
    }

    pub async fn mark_paid(&self, id: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
        let mut changes = Fields::new();
        changes.insert("paymentStatus".to_string(), Value::from("paid"));
        changes.insert("updatedAt".to_string(), Value::from(now));
        self.store.update(TASKS, id, changes).await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.get(id).await?;
        self.store.delete(TASKS, id).await?;
        info!("Deleted task {}", id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::MemoryStore;
    use crate::services::user_service::tests::{now, signup};

    pub(crate) struct Fixture {
        pub users: Arc<UserService>,
        pub tasks: TaskService,
    }

    pub(crate) async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let users = Arc::new(UserService::new(store.clone()).with_bcrypt_cost(4));
        let config = Arc::new(ConfigService::new(store.clone()));
        let tasks = TaskService::new(store, users.clone(), config);

        users.create(signup("0700000001", "user"), now()).await.unwrap();
        users.create(signup("0700000010", "manager"), now()).await.unwrap();
        let mut agent = signup("0700000002", "worker");
        agent.manager_phone = Some("0700000010".to_string());
        users.create(agent, now()).await.unwrap();
        users.create(signup("0700000003", "worker"), now()).await.unwrap();

        Fixture { users, tasks }
    }

    pub(crate) fn order(price: f64) -> CreateTaskRequest {
        CreateTaskRequest {
            customer_phone: "0700000001".to_string(),
            customer_name: None,
            service_id: None,
            service_name: Some("Custom paperwork".to_string()),
            description: None,
            price: Some(price),
        }
    }

    pub(crate) async fn completed_task(tasks: &TaskService, price: f64, worker: &str) -> Task {
        let task = tasks.create(order(price), now()).await.unwrap();
        tasks
            .update(
                &task.id,
                UpdateTaskRequest {
                    assigned_worker_phone: Some(worker.to_string()),
                    status: Some("completed".to_string()),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_from_catalog() {
        let f = fixture().await;
        let task = f
            .tasks
            .create(
                CreateTaskRequest {
                    customer_phone: "+254700000001".to_string(),
                    customer_name: None,
                    service_id: Some("kra-pin".to_string()),
                    service_name: None,
                    description: Some("New PIN".to_string()),
                    price: None,
                },
                now(),
            )
            .await
            .unwrap();

        assert_eq!(task.service_name, "KRA PIN Registration");
        assert_eq!(task.price, 500.0);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert_eq!(task.payment_status, "unpaid");
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = fixture().await;
        let mut unknown_customer = order(100.0);
        unknown_customer.customer_phone = "0799999999".to_string();
        assert!(matches!(f.tasks.create(unknown_customer, now()).await, Err(ApiError::NotFound(_))));

        assert!(matches!(f.tasks.create(order(0.0), now()).await, Err(ApiError::ValidationError(_))));

        let mut unknown_service = order(100.0);
        unknown_service.service_id = Some("moon-landing".to_string());
        assert!(matches!(f.tasks.create(unknown_service, now()).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_assign_then_complete() {
        let f = fixture().await;
        let task = f.tasks.create(order(1000.0), now()).await.unwrap();

        let assigned = f
            .tasks
            .update(
                &task.id,
                UpdateTaskRequest { assigned_worker_phone: Some("0700000002".to_string()), ..Default::default() },
                now(),
            )
            .await
            .unwrap();
        assert_eq!(assigned.status, TaskStatus::Assigned);
        assert_eq!(assigned.assigned_worker_phone.as_deref(), Some("+254700000002"));

        let progressed = f
            .tasks
            .update(&task.id, UpdateTaskRequest { status: Some("in progress".to_string()), progress: Some(40), ..Default::default() }, now())
            .await
            .unwrap();
        assert_eq!(progressed.progress, 40);

        let done = f
            .tasks
            .update(&task.id, UpdateTaskRequest { status: Some("completed".to_string()), ..Default::default() }, now())
            .await
            .unwrap();
        assert!(done.is_completed());
        assert_eq!(done.progress, 100);
        assert_eq!(done.completed_at, Some(now()));

        let reopen = f
            .tasks
            .update(&task.id, UpdateTaskRequest { status: Some("pending".to_string()), ..Default::default() }, now())
            .await;
        assert!(matches!(reopen, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_input() {
        let f = fixture().await;
        let task = f.tasks.create(order(1000.0), now()).await.unwrap();

        let customer_as_worker = UpdateTaskRequest { assigned_worker_phone: Some("0700000001".to_string()), ..Default::default() };
        assert!(f.tasks.update(&task.id, customer_as_worker, now()).await.is_err());

        let unassigned_complete = UpdateTaskRequest { status: Some("completed".to_string()), ..Default::default() };
        assert!(f.tasks.update(&task.id, unassigned_complete, now()).await.is_err());

        let too_far = UpdateTaskRequest { progress: Some(140), ..Default::default() };
        assert!(f.tasks.update(&task.id, too_far, now()).await.is_err());

        let made_up = UpdateTaskRequest { status: Some("teleported".to_string()), ..Default::default() };
        assert!(f.tasks.update(&task.id, made_up, now()).await.is_err());

        assert!(matches!(
            f.tasks.update("missing", UpdateTaskRequest::default(), now()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_role_scoped_listing() {
        let f = fixture().await;
        completed_task(&f.tasks, 1000.0, "0700000002").await;
        completed_task(&f.tasks, 500.0, "0700000003").await;
        f.tasks.create(order(200.0), now()).await.unwrap();

        assert_eq!(f.tasks.list_for(Role::User, Some("0700000001"), None).await.unwrap().len(), 3);
        assert_eq!(f.tasks.list_for(Role::Worker, Some("0700000002"), None).await.unwrap().len(), 1);
        assert_eq!(f.tasks.list_for(Role::Manager, Some("0700000010"), None).await.unwrap().len(), 1);
        assert_eq!(f.tasks.list_for(Role::Admin, None, None).await.unwrap().len(), 3);
        assert_eq!(f.tasks.list_for(Role::Admin, None, Some("pending")).await.unwrap().len(), 1);
        assert!(f.tasks.list_for(Role::Worker, None, None).await.is_err());
        assert!(f.users.find_by_phone("0700000002").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture().await;
        let task = f.tasks.create(order(300.0), now()).await.unwrap();
        f.tasks.delete(&task.id).await.unwrap();
        assert!(matches!(f.tasks.delete(&task.id).await, Err(ApiError::NotFound(_))));
    }
}
