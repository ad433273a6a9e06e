use std::sync::Arc;
use chrono::{DateTime, Utc};
use log::{info, warn, error};
use crate::models::{ApiError, CreateUserRequest, PasswordLoginRequest, Role, UpdateUserRequest, User};
use crate::models::user::USERS;
use crate::services::google_auth::GoogleProfile;
use crate::services::store::{decode_all, DocumentStore};
use crate::utils::firestore_codec::{self, Fields, Value};
use crate::utils::phone::{is_plausible_phone, normalize_phone};
use crate::utils::referral_code::{generate_referral_code, looks_like_referral_code, normalize_referral_code};

const MIN_PASSWORD_LEN: usize = 6;
const REFERRAL_CODE_ATTEMPTS: usize = 5;

/// Outcome of a Google sign-in.
#[derive(Debug)]
pub enum GoogleSync {
    Linked(User),
    Created(User),
    NeedsPhone(GoogleProfile),
}

pub struct UserService {
    store: Arc<dyn DocumentStore>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    async fn find_one(&self, field: &str, value: &str) -> Result<Option<User>, ApiError> {
        let docs = self.store.find_by(USERS, field, &Value::from(value)).await?;
        if docs.len() > 1 {
            warn!("{} users share {} = {}; using the first", docs.len(), field, value);
        }
        match docs.into_iter().next() {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, ApiError> {
        let normalized = normalize_phone(phone);
        if let Some(user) = self.find_one("phone", &normalized).await? {
            return Ok(Some(user));
        }
        // records created before normalisation keep whatever was typed
        let raw = phone.trim();
        if raw != normalized {
            return self.find_one("phone", raw).await;
        }
        Ok(None)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        self.find_one("email", &email.trim().to_lowercase()).await
    }

    pub async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, ApiError> {
        self.find_one("referralCode", &normalize_referral_code(code)).await
    }

    pub async fn get(&self, id: &str) -> Result<User, ApiError> {
        match self.store.get(USERS, id).await? {
            Some(doc) => Ok(doc.decode()?),
            None => Err(ApiError::NotFound(format!("User {} not found", id))),
        }
    }

    pub async fn list(&self, role: Option<Role>) -> Result<Vec<User>, ApiError> {
        let docs = match role {
            Some(role) => self.store.find_by(USERS, "role", &Value::from(role.as_str())).await?,
            None => self.store.list(USERS).await?,
        };
        let mut users: Vec<User> = decode_all(USERS, docs);
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Agents reporting to a manager. A record pointing at itself is never part of its own team.
    pub async fn team_of(&self, manager_phone: &str) -> Result<Vec<User>, ApiError> {
        let manager_phone = normalize_phone(manager_phone);
        let docs = self
            .store
            .find_by(USERS, "managerPhone", &Value::from(manager_phone.as_str()))
            .await?;
        let mut team: Vec<User> = decode_all(USERS, docs);
        team.retain(|u| u.phone != manager_phone);
        Ok(team)
    }

    pub async fn create(&self, req: CreateUserRequest, now: DateTime<Utc>) -> Result<User, ApiError> {
        if !is_plausible_phone(&req.phone) {
            return Err(ApiError::ValidationError(format!("Invalid phone number: {}", req.phone)));
        }
        let phone = normalize_phone(&req.phone);
        let role = match req.role.as_deref() {
            Some(r) => r.parse::<Role>().map_err(ApiError::ValidationError)?,
            None => Role::User,
        };
        let email = req
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(ApiError::ValidationError(format!("Invalid email: {}", email)));
            }
        }

        if self.find_by_phone(&phone).await?.is_some() {
            return Err(ApiError::Duplicate(format!("User with phone {} already exists", phone)));
        }
        if let Some(email) = &email {
            if self.find_by_email(email).await?.is_some() {
                return Err(ApiError::Duplicate(format!("User with email {} already exists", email)));
            }
        }

        let referred_by = match req.referred_by.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => Some(self.resolve_referrer(reference).await?.phone),
            None => None,
        };

        let manager_phone = match req.manager_phone.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(manager) => {
                let manager = self
                    .find_by_phone(manager)
                    .await?
                    .ok_or_else(|| ApiError::ValidationError(format!("Unknown manager: {}", manager)))?;
                if manager.role != Role::Manager {
                    return Err(ApiError::ValidationError(format!("{} is not a manager", manager.phone)));
                }
                Some(manager.phone)
            }
            None => None,
        };

        let password_hash = match req.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };

        let user = User {
            id: String::new(),
            phone,
            email,
            name: req.name.trim().to_string(),
            role,
            balance: 0.0,
            referred_by,
            referral_code: Some(self.unique_referral_code().await?),
            manager_phone,
            password_hash,
            google_id: None,
            status: "active".to_string(),
            created_at: Some(now),
            updated_at: Some(now),
        };

        let doc = self
            .store
            .create(USERS, None, firestore_codec::encode(&user)?)
            .await?;
        info!("Created {} user {} ({})", user.role, doc.id, user.phone);
        Ok(doc.decode()?)
    }

    async fn resolve_referrer(&self, reference: &str) -> Result<User, ApiError> {
        let referrer = if looks_like_referral_code(reference) {
            self.find_by_referral_code(reference).await?
        } else {
            self.find_by_phone(reference).await?
        };
        referrer.ok_or_else(|| ApiError::ValidationError(format!("Unknown referrer: {}", reference)))
    }

    async fn unique_referral_code(&self) -> Result<String, ApiError> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = generate_referral_code();
            if self.find_one("referralCode", &code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(ApiError::InternalError("Could not allocate a referral code".to_string()))
    }

    async fn hash_password(&self, password: String) -> Result<String, ApiError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ApiError::InternalError(e.to_string()))?
            .map_err(|e| ApiError::InternalError(format!("Failed to hash password: {}", e)))
    }

    pub async fn login_with_password(&self, req: PasswordLoginRequest) -> Result<User, ApiError> {
        let user = match (req.phone.as_deref(), req.email.as_deref()) {
            (Some(phone), _) if !phone.trim().is_empty() => self.find_by_phone(phone).await?,
            (_, Some(email)) if !email.trim().is_empty() => self.find_by_email(email).await?,
            _ => return Err(ApiError::ValidationError("Phone or email is required".to_string())),
        }
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let hash = user
            .password_hash
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("Password login is not set up for this account".to_string()))?;

        let password = req.password;
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| ApiError::InternalError(e.to_string()))?
            .unwrap_or_else(|e| {
                error!("Stored password hash for {} is unreadable: {}", user.phone, e);
                false
            });

        if !valid {
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
        info!("Password login for {}", user.phone);
        Ok(user)
    }

    pub async fn update(
        &self,
        id: &str,
        req: UpdateUserRequest,
        actor_is_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<User, ApiError> {
        let existing = self.get(id).await?;
        let mut changes = Fields::new();

        if let Some(name) = req.name {
            changes.insert("name".to_string(), Value::from(name.trim()));
        }
        if let Some(email) = req.email {
            let email = email.trim().to_lowercase();
            if !email.contains('@') {
                return Err(ApiError::ValidationError(format!("Invalid email: {}", email)));
            }
            if let Some(other) = self.find_by_email(&email).await? {
                if other.id != existing.id {
                    return Err(ApiError::Duplicate(format!("User with email {} already exists", email)));
                }
            }
            changes.insert("email".to_string(), Value::from(email));
        }
        if let Some(role) = req.role {
            if !actor_is_admin {
                return Err(ApiError::Forbidden("Only admins can change roles".to_string()));
            }
            let role = role.parse::<Role>().map_err(ApiError::ValidationError)?;
            changes.insert("role".to_string(), Value::from(role.as_str()));
        }
        if let Some(manager) = req.manager_phone {
            let manager = self
                .find_by_phone(&manager)
                .await?
                .filter(|m| m.role == Role::Manager)
                .ok_or_else(|| ApiError::ValidationError(format!("Unknown manager: {}", manager)))?;
            if manager.phone == existing.phone {
                return Err(ApiError::ValidationError(format!("{} cannot manage themselves", manager.phone)));
            }
            changes.insert("managerPhone".to_string(), Value::from(manager.phone));
        }
        if let Some(status) = req.status {
            changes.insert("status".to_string(), Value::from(status.trim()));
        }

        if changes.is_empty() {
            return Ok(existing);
        }
        changes.insert("updatedAt".to_string(), Value::from(now));

        let doc = self.store.update(USERS, id, changes).await?;
        Ok(doc.decode()?)
    }

    /// The user behind `phone` and everyone they referred.
    pub async fn referrals(&self, phone: &str) -> Result<(User, Vec<User>), ApiError> {
        let user = self
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        let docs = self
            .store
            .find_by(USERS, "referredBy", &Value::from(user.phone.as_str()))
            .await?;
        let mut referred: Vec<User> = decode_all(USERS, docs);
        referred.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok((user, referred))
    }

    /// Match a Google identity to a phone-keyed user record, creating one when a phone is supplied.
    pub async fn sync_google(
        &self,
        profile: GoogleProfile,
        phone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<GoogleSync, ApiError> {
        if let Some(user) = self.find_by_email(&profile.email).await? {
            if user.google_id.as_deref() == Some(profile.subject.as_str()) {
                return Ok(GoogleSync::Linked(user));
            }
            let mut changes = Fields::new();
            changes.insert("googleId".to_string(), Value::from(profile.subject.as_str()));
            changes.insert("updatedAt".to_string(), Value::from(now));
            let doc = self.store.update(USERS, &user.id, changes).await?;
            info!("Linked Google account to {}", user.phone);
            return Ok(GoogleSync::Linked(doc.decode()?));
        }

        let phone = match phone.filter(|p| !p.trim().is_empty()) {
            Some(phone) => phone,
            None => return Ok(GoogleSync::NeedsPhone(profile)),
        };

        // the phone may already belong to an account that never recorded an email
        if let Some(user) = self.find_by_phone(phone).await? {
            if user.email.is_some() {
                return Err(ApiError::Duplicate(format!("Phone {} is linked to another email", user.phone)));
            }
            let mut changes = Fields::new();
            changes.insert("email".to_string(), Value::from(profile.email.as_str()));
            changes.insert("googleId".to_string(), Value::from(profile.subject.as_str()));
            changes.insert("updatedAt".to_string(), Value::from(now));
            let doc = self.store.update(USERS, &user.id, changes).await?;
            return Ok(GoogleSync::Linked(doc.decode()?));
        }

        let created = self
            .create(
                CreateUserRequest {
                    phone: phone.to_string(),
                    email: Some(profile.email.clone()),
                    name: profile.name.clone().unwrap_or_default(),
                    role: None,
                    password: None,
                    referred_by: None,
                    manager_phone: None,
                },
                now,
            )
            .await?;

        let mut changes = Fields::new();
        changes.insert("googleId".to_string(), Value::from(profile.subject.as_str()));
        let doc = self.store.update(USERS, &created.id, changes).await?;
        Ok(GoogleSync::Created(doc.decode()?))
    }

    /// Resolve the acting user from the phone they presented and check their role.
    pub async fn require_role(&self, acting_phone: Option<&str>, allowed: &[Role]) -> Result<User, ApiError> {
        let phone = acting_phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Phone header".to_string()))?;

        let user = self
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(format!("Unknown user {}", phone)))?;

        if !allowed.contains(&user.role) {
            warn!("{} ({}) attempted an action reserved for {:?}", user.phone, user.role, allowed);
            return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
        }
        Ok(user)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::services::MemoryStore;

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap()
    }

    pub(crate) fn signup(phone: &str, role: &str) -> CreateUserRequest {
        CreateUserRequest {
            phone: phone.to_string(),
            email: None,
            name: format!("User {}", phone),
            role: Some(role.to_string()),
            password: None,
            referred_by: None,
            manager_phone: None,
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new())).with_bcrypt_cost(4)
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let users = service();
        let user = users.create(signup("0712345678", "worker"), now()).await.unwrap();
        assert_eq!(user.phone, "+254712345678");
        assert_eq!(user.role, Role::Worker);
        assert!(user.referral_code.as_deref().unwrap().starts_with("VC"));
        assert!(!user.id.is_empty());

        let dup = users.create(signup("+254 712 345 678", "user"), now()).await;
        assert!(matches!(dup, Err(ApiError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_lookup_missing_user_is_none() {
        let users = service();
        assert!(users.find_by_phone("+254700000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_unknown_role_and_bad_phone() {
        let users = service();
        assert!(matches!(
            users.create(signup("0712345678", "overlord"), now()).await,
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            users.create(signup("123", "user"), now()).await,
            Err(ApiError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_referral_by_code_and_phone() {
        let users = service();
        let referrer = users.create(signup("0711000001", "worker"), now()).await.unwrap();
        let code = referrer.referral_code.clone().unwrap();

        let mut by_code = signup("0711000002", "user");
        by_code.referred_by = Some(code.to_lowercase());
        let a = users.create(by_code, now()).await.unwrap();
        assert_eq!(a.referred_by.as_deref(), Some("+254711000001"));

        let mut by_phone = signup("0711000003", "user");
        by_phone.referred_by = Some("0711000001".to_string());
        users.create(by_phone, now()).await.unwrap();

        let (who, referred) = users.referrals("0711000001").await.unwrap();
        assert_eq!(who.id, referrer.id);
        assert_eq!(referred.len(), 2);

        let mut unknown = signup("0711000004", "user");
        unknown.referred_by = Some("VCZZZZZZZ".to_string());
        assert!(matches!(users.create(unknown, now()).await, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_password_login() {
        let users = service();
        let mut req = signup("0722000001", "user");
        req.email = Some("Achieng@Example.com".to_string());
        req.password = Some("s3cret-pass".to_string());
        let created = users.create(req, now()).await.unwrap();
        assert_ne!(created.password_hash.as_deref(), Some("s3cret-pass"));

        let ok = users
            .login_with_password(PasswordLoginRequest {
                phone: None,
                email: Some("achieng@example.com".to_string()),
                password: "s3cret-pass".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ok.id, created.id);

        let bad = users
            .login_with_password(PasswordLoginRequest {
                phone: Some("0722000001".to_string()),
                email: None,
                password: "wrong-pass".to_string(),
            })
            .await;
        assert!(matches!(bad, Err(ApiError::Unauthorized(_))));

        let missing = users
            .login_with_password(PasswordLoginRequest {
                phone: Some("0722999999".to_string()),
                email: None,
                password: "whatever".to_string(),
            })
            .await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let users = service();
        let mut req = signup("0722000002", "user");
        req.password = Some("abc".to_string());
        assert!(matches!(users.create(req, now()).await, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_role_change_requires_admin() {
        let users = service();
        let user = users.create(signup("0733000001", "user"), now()).await.unwrap();
        let req = || UpdateUserRequest { role: Some("worker".to_string()), ..Default::default() };

        assert!(matches!(
            users.update(&user.id, req(), false, now()).await,
            Err(ApiError::Forbidden(_))
        ));
        let updated = users.update(&user.id, req(), true, now()).await.unwrap();
        assert_eq!(updated.role, Role::Worker);
    }

    #[tokio::test]
    async fn test_manager_cannot_manage_themselves() {
        let users = service();
        let manager = users.create(signup("0733000010", "manager"), now()).await.unwrap();
        let req = UpdateUserRequest { manager_phone: Some("0733000010".to_string()), ..Default::default() };

        assert!(matches!(
            users.update(&manager.id, req, false, now()).await,
            Err(ApiError::ValidationError(_))
        ));
        assert!(users.team_of("0733000010").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_team_and_require_role() {
        let users = service();
        users.create(signup("0744000001", "manager"), now()).await.unwrap();
        let mut agent = signup("0744000002", "worker");
        agent.manager_phone = Some("0744000001".to_string());
        users.create(agent, now()).await.unwrap();
        users.create(signup("0744000003", "admin"), now()).await.unwrap();

        let team = users.team_of("+254744000001").await.unwrap();
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].phone, "+254744000002");

        assert!(users.require_role(Some("0744000003"), &[Role::Admin]).await.is_ok());
        assert!(matches!(
            users.require_role(Some("0744000002"), &[Role::Admin]).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(users.require_role(None, &[Role::Admin]).await, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_google_sync_flows() {
        let users = service();
        let profile = GoogleProfile {
            subject: "g-1".to_string(),
            email: "otieno@example.com".to_string(),
            name: Some("Otieno".to_string()),
        };

        match users.sync_google(profile.clone(), None, now()).await.unwrap() {
            GoogleSync::NeedsPhone(p) => assert_eq!(p.email, "otieno@example.com"),
            other => panic!("expected NeedsPhone, got {:?}", other),
        }

        let created = match users.sync_google(profile.clone(), Some("0755000001"), now()).await.unwrap() {
            GoogleSync::Created(user) => user,
            other => panic!("expected Created, got {:?}", other),
        };
        assert_eq!(created.google_id.as_deref(), Some("g-1"));
        assert_eq!(created.name, "Otieno");

        match users.sync_google(profile, None, now()).await.unwrap() {
            GoogleSync::Linked(user) => assert_eq!(user.id, created.id),
            other => panic!("expected Linked, got {:?}", other),
        }
    }
}
