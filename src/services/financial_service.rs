use std::sync::Arc;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use crate::models::{
    ApiError, Payment, PaymentStatus, ProcessWithdrawalRequest, Role, Task, User, Withdrawal,
    WithdrawalRequest, WithdrawalStatus,
};
use crate::models::payment::PAYMENTS;
use crate::models::withdrawal::WITHDRAWALS;
use crate::services::store::{decode_all, DocumentStore};
use crate::services::{Clock, TaskService, UserService};
use crate::utils::commission::{self, CommissionSplit, CommissionTotals};
use crate::utils::firestore_codec::{self, Fields, Value};
use crate::utils::phone::normalize_phone;
use crate::utils::withdrawal_schedule::{
    day_name, is_withdrawal_day, local_weekday, next_withdrawal_day, CLOSED_MESSAGE, PROCESSING_DAYS,
};

/// One completed task and what it paid out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionEntry {
    pub task_id: String,
    pub service_name: String,
    pub assigned_worker_phone: Option<String>,
    #[serde(with = "crate::models::timestamp_opt")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub split: CommissionSplit,
    /// The share credited to the user the report was built for.
    pub earned: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionReport {
    pub role: Role,
    pub commissions: Vec<CommissionEntry>,
    pub totals: CommissionTotals,
    pub total_earned: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_size: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub total_earnings: f64,
    pub total_withdrawn: f64,
    pub pending_withdrawals: f64,
    pub available_balance: f64,
    pub withdrawals: Vec<Withdrawal>,
    pub can_withdraw_today: bool,
    pub next_withdrawal: String,
    pub processing_days: &'static str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTotals {
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalTotals {
    pub pending: StatusTotals,
    pub approved: StatusTotals,
    pub rejected: StatusTotals,
    pub completed: StatusTotals,
}

impl WithdrawalTotals {
    fn add(&mut self, w: &Withdrawal) {
        let bucket = match w.status {
            WithdrawalStatus::Pending => &mut self.pending,
            WithdrawalStatus::Approved => &mut self.approved,
            WithdrawalStatus::Rejected => &mut self.rejected,
            WithdrawalStatus::Completed => &mut self.completed,
        };
        bucket.count += 1;
        bucket.amount += w.amount;
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub task_count: usize,
    pub completed_tasks: usize,
    pub commissions: CommissionTotals,
    pub payments_received: f64,
    pub payment_count: usize,
    pub withdrawals: WithdrawalTotals,
}

/// Earnings, balances and the withdrawal workflow.
pub struct FinancialService {
    store: Arc<dyn DocumentStore>,
    users: Arc<UserService>,
    tasks: Arc<TaskService>,
    clock: Clock,
    tz_offset_hours: i32,
    min_withdrawal: f64,
}

impl FinancialService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        users: Arc<UserService>,
        tasks: Arc<TaskService>,
        clock: Clock,
        tz_offset_hours: i32,
        min_withdrawal: f64,
    ) -> Self {
        Self { store, users, tasks, clock, tz_offset_hours, min_withdrawal }
    }

    fn entry(task: &Task, earned: impl Fn(&CommissionSplit) -> f64) -> CommissionEntry {
        let split = commission::split(task.price);
        CommissionEntry {
            task_id: task.id.clone(),
            service_name: task.service_name.clone(),
            assigned_worker_phone: task.assigned_worker_phone.clone(),
            completed_at: task.completed_at,
            earned: earned(&split),
            split,
        }
    }

    /// Completed tasks that pay `user`, with the share they earn from each.
    async fn earning_entries(&self, user: &User) -> Result<(Vec<CommissionEntry>, Option<usize>), ApiError> {
        let own = self.tasks.for_worker(&user.phone).await?;
        let mut entries: Vec<CommissionEntry> = own
            .iter()
            .filter(|t| t.is_completed())
            .map(|t| Self::entry(t, |s| s.agent_commission))
            .collect();

        if user.role != Role::Manager {
            return Ok((entries, None));
        }

        let team = self.users.team_of(&user.phone).await?;
        let team_tasks = self.tasks.for_team(&user.phone).await?;
        entries.extend(
            team_tasks
                .iter()
                .filter(|t| t.is_completed())
                .map(|t| Self::entry(t, |s| s.manager_commission)),
        );
        Ok((entries, Some(team.len())))
    }

    pub async fn commission_report(&self, role: Role, phone: Option<&str>) -> Result<CommissionReport, ApiError> {
        let (commissions, team_size) = match role {
            Role::Admin => {
                let entries: Vec<CommissionEntry> = self
                    .tasks
                    .all()
                    .await?
                    .iter()
                    .filter(|t| t.is_completed())
                    .map(|t| Self::entry(t, |s| s.platform_revenue))
                    .collect();
                (entries, None)
            }
            Role::Worker | Role::Manager => {
                let user = self.earner(phone).await?;
                self.earning_entries(&user).await?
            }
            Role::User => {
                return Err(ApiError::Forbidden("Customers do not earn commission".to_string()));
            }
        };

        let totals = commission::totals(commissions.iter().map(|e| e.split.price));
        let total_earned: f64 = commissions.iter().map(|e| e.earned).sum();
        Ok(CommissionReport { role, commissions, totals, total_earned, team_size })
    }

    async fn earner(&self, phone: Option<&str>) -> Result<User, ApiError> {
        let phone = phone
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::ValidationError("phone is required".to_string()))?;
        let user = self
            .users
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        if !user.role.earns_commission() {
            return Err(ApiError::Forbidden(format!("{} does not earn commission", user.phone)));
        }
        Ok(user)
    }

    pub async fn total_earnings(&self, user: &User) -> Result<f64, ApiError> {
        let (entries, _) = self.earning_entries(user).await?;
        Ok(entries.iter().map(|e| e.earned).sum())
    }

    pub async fn withdrawals_of(&self, phone: &str) -> Result<Vec<Withdrawal>, ApiError> {
        let docs = self
            .store
            .find_by(WITHDRAWALS, "userPhone", &Value::from(normalize_phone(phone)))
            .await?;
        let mut withdrawals: Vec<Withdrawal> = decode_all(WITHDRAWALS, docs);
        withdrawals.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(withdrawals)
    }

    fn schedule(&self) -> (bool, String) {
        let today = local_weekday(self.clock.now(), self.tz_offset_hours);
        (is_withdrawal_day(today), day_name(next_withdrawal_day(today)).to_string())
    }

    pub async fn balance_summary(&self, phone: Option<&str>) -> Result<BalanceSummary, ApiError> {
        let user = self.earner(phone).await?;
        let total_earnings = self.total_earnings(&user).await?;
        let withdrawals = self.withdrawals_of(&user.phone).await?;

        let sum_of = |pred: fn(&WithdrawalStatus) -> bool| -> f64 {
            withdrawals.iter().filter(|w| pred(&w.status)).map(|w| w.amount).sum()
        };
        let total_withdrawn = sum_of(|s| *s == WithdrawalStatus::Completed);
        let pending_withdrawals = sum_of(|s| matches!(s, WithdrawalStatus::Pending | WithdrawalStatus::Approved));
        let committed = sum_of(WithdrawalStatus::holds_funds);

        let (can_withdraw_today, next_withdrawal) = self.schedule();
        Ok(BalanceSummary {
            total_earnings,
            total_withdrawn,
            pending_withdrawals,
            available_balance: total_earnings - committed,
            withdrawals,
            can_withdraw_today,
            next_withdrawal,
            processing_days: PROCESSING_DAYS,
        })
    }

    /// Record a withdrawal request. With `enforce_schedule` set the request is refused
    /// outside the processing days before anything else is checked.
    pub async fn request_withdrawal(
        &self,
        req: WithdrawalRequest,
        enforce_schedule: bool,
    ) -> Result<Withdrawal, ApiError> {
        if enforce_schedule {
            let (open, next_withdrawal) = self.schedule();
            if !open {
                return Err(ApiError::WithdrawalClosed {
                    message: CLOSED_MESSAGE.to_string(),
                    next_withdrawal,
                });
            }
        }

        let claimed_role = req.user_role.parse::<Role>().map_err(ApiError::ValidationError)?;
        if !req.amount.is_finite() || req.amount <= 0.0 {
            return Err(ApiError::ValidationError(format!("Invalid amount: {}", req.amount)));
        }
        if req.amount < self.min_withdrawal {
            return Err(ApiError::ValidationError(format!(
                "Minimum withdrawal is {}",
                self.min_withdrawal
            )));
        }

        let summary = self.balance_summary(Some(req.user_phone.as_str())).await?;
        if req.amount > summary.available_balance {
            return Err(ApiError::ValidationError(format!(
                "Insufficient balance: {} available",
                summary.available_balance
            )));
        }

        let user_phone = normalize_phone(&req.user_phone);
        let user_role = match self.users.find_by_phone(&user_phone).await? {
            Some(user) if user.role != claimed_role => {
                warn!("{} claimed role {} but is {}", user.phone, claimed_role, user.role);
                user.role
            }
            _ => claimed_role,
        };

        let withdrawal = Withdrawal {
            id: String::new(),
            user_phone,
            user_role,
            amount: req.amount,
            method: req.method,
            status: WithdrawalStatus::Pending,
            requested_at: Some(self.clock.now()),
            processed_at: None,
            admin_note: None,
        };
        let doc = self
            .store
            .create(WITHDRAWALS, None, firestore_codec::encode(&withdrawal)?)
            .await?;
        info!("Withdrawal {} of {} requested by {}", doc.id, withdrawal.amount, withdrawal.user_phone);
        Ok(doc.decode()?)
    }

    pub async fn process_withdrawal(&self, req: ProcessWithdrawalRequest) -> Result<Withdrawal, ApiError> {
        let status = match req.status.trim().to_ascii_lowercase().as_str() {
            "approved" => WithdrawalStatus::Approved,
            "rejected" => WithdrawalStatus::Rejected,
            "completed" => WithdrawalStatus::Completed,
            other => {
                return Err(ApiError::ValidationError(format!(
                    "Status must be approved, rejected or completed, got {}",
                    other
                )))
            }
        };

        let existing: Withdrawal = match self.store.get(WITHDRAWALS, &req.withdrawal_id).await? {
            Some(doc) => doc.decode()?,
            None => return Err(ApiError::NotFound(format!("Withdrawal {} not found", req.withdrawal_id))),
        };
        if existing.status.is_final() {
            return Err(ApiError::ValidationError(format!(
                "Withdrawal {} is already {}",
                existing.id, existing.status
            )));
        }

        let mut changes = Fields::new();
        changes.insert("status".to_string(), Value::from(status.to_string()));
        changes.insert("processedAt".to_string(), Value::from(self.clock.now()));
        if let Some(note) = req.admin_note {
            changes.insert("adminNote".to_string(), Value::from(note));
        }
        let doc = self.store.update(WITHDRAWALS, &existing.id, changes).await?;
        info!("Withdrawal {} marked {}", existing.id, status);
        Ok(doc.decode()?)
    }

    pub async fn platform_summary(&self) -> Result<PlatformSummary, ApiError> {
        let tasks = self.tasks.all().await?;
        let completed: Vec<&Task> = tasks.iter().filter(|t| t.is_completed()).collect();
        let payments: Vec<Payment> = decode_all(PAYMENTS, self.store.list(PAYMENTS).await?);
        let withdrawals: Vec<Withdrawal> = decode_all(WITHDRAWALS, self.store.list(WITHDRAWALS).await?);

        let received: Vec<&Payment> = payments.iter().filter(|p| p.status == PaymentStatus::Completed).collect();
        let mut by_status = WithdrawalTotals::default();
        withdrawals.iter().for_each(|w| by_status.add(w));

        Ok(PlatformSummary {
            task_count: tasks.len(),
            completed_tasks: completed.len(),
            commissions: commission::totals(completed.iter().map(|t| t.price)),
            payments_received: received.iter().map(|p| p.amount).sum(),
            payment_count: received.len(),
            withdrawals: by_status,
        })
    }
}
