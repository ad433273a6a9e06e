use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use serde::Serialize;
use crate::models::{ApiError, Role, Task};
use crate::services::{FinancialService, TaskService, UserService};
use crate::utils::commission::{self, CommissionTotals};

const TOP_WORKERS: usize = 5;
const RECENT_TASKS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRanking {
    pub phone: String,
    pub name: Option<String>,
    pub completed_tasks: usize,
    pub earnings: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAnalytics {
    pub total_users: usize,
    pub users_by_role: BTreeMap<String, usize>,
    pub total_tasks: usize,
    pub tasks_by_status: BTreeMap<String, usize>,
    pub completion_rate: f64,
    pub revenue: CommissionTotals,
    pub top_workers: Vec<WorkerRanking>,
    pub recent_tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAnalytics {
    pub total_tasks: usize,
    pub tasks_by_status: BTreeMap<String, usize>,
    pub completion_rate: f64,
    pub total_earnings: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAnalytics {
    pub total_orders: usize,
    pub orders_by_status: BTreeMap<String, usize>,
    pub total_spent: f64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Analytics {
    Admin(AdminAnalytics),
    Agent(AgentAnalytics),
    Customer(CustomerAnalytics),
}

fn count_by_status(tasks: &[Task]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for task in tasks {
        *counts.entry(task.status.label().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Completed share in percent, one decimal place.
fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|t| t.is_completed()).count() as f64;
    (completed / tasks.len() as f64 * 1000.0).round() / 10.0
}

/// Dashboard aggregates, scoped by role.
pub struct AnalyticsService {
    users: Arc<UserService>,
    tasks: Arc<TaskService>,
    financial: Arc<FinancialService>,
}

impl AnalyticsService {
    pub fn new(users: Arc<UserService>, tasks: Arc<TaskService>, financial: Arc<FinancialService>) -> Self {
        Self { users, tasks, financial }
    }

    pub async fn for_role(&self, role: Role, phone: Option<&str>) -> Result<Analytics, ApiError> {
        match role {
            Role::Admin => Ok(Analytics::Admin(self.admin().await?)),
            Role::Worker | Role::Manager => Ok(Analytics::Agent(self.agent(role, phone).await?)),
            Role::User => Ok(Analytics::Customer(self.customer(phone).await?)),
        }
    }

    pub async fn admin(&self) -> Result<AdminAnalytics, ApiError> {
        let users = self.users.list(None).await?;
        let tasks = self.tasks.all().await?;

        let mut users_by_role = BTreeMap::new();
        for user in &users {
            *users_by_role.entry(user.role.to_string()).or_insert(0) += 1;
        }

        let completed: Vec<&Task> = tasks.iter().filter(|t| t.is_completed()).collect();
        let mut per_worker: HashMap<&str, (usize, f64)> = HashMap::new();
        for task in &completed {
            if let Some(worker) = task.assigned_worker_phone.as_deref() {
                let entry = per_worker.entry(worker).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += commission::agent_commission(task.price);
            }
        }

        let mut top_workers: Vec<WorkerRanking> = per_worker
            .into_iter()
            .map(|(phone, (completed_tasks, earnings))| WorkerRanking {
                phone: phone.to_string(),
                name: users.iter().find(|u| u.phone == phone).map(|u| u.name.clone()),
                completed_tasks,
                earnings,
            })
            .collect();
        top_workers.sort_by(|a, b| b.completed_tasks.cmp(&a.completed_tasks).then_with(|| a.phone.cmp(&b.phone)));
        top_workers.truncate(TOP_WORKERS);

        Ok(AdminAnalytics {
            total_users: users.len(),
            users_by_role,
            total_tasks: tasks.len(),
            tasks_by_status: count_by_status(&tasks),
            completion_rate: completion_rate(&tasks),
            revenue: commission::totals(completed.iter().map(|t| t.price)),
            top_workers,
            recent_tasks: tasks.iter().take(RECENT_TASKS).cloned().collect(),
        })
    }

    async fn agent(&self, role: Role, phone: Option<&str>) -> Result<AgentAnalytics, ApiError> {
        let tasks = self.tasks.list_for(role, phone, None).await?;
        let report = self.financial.commission_report(role, phone).await?;
        Ok(AgentAnalytics {
            total_tasks: tasks.len(),
            tasks_by_status: count_by_status(&tasks),
            completion_rate: completion_rate(&tasks),
            total_earnings: report.total_earned,
        })
    }

    async fn customer(&self, phone: Option<&str>) -> Result<CustomerAnalytics, ApiError> {
        let tasks = self.tasks.list_for(Role::User, phone, None).await?;
        Ok(CustomerAnalytics {
            total_orders: tasks.len(),
            orders_by_status: count_by_status(&tasks),
            total_spent: tasks.iter().filter(|t| t.is_paid()).map(|t| t.price).sum(),
        })
    }
}
