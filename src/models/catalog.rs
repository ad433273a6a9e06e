use std::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub const CONFIG: &str = "config";
pub const PLATFORM_DOC: &str = "platform";

/// Anything stored in one of the id-keyed config lists.
pub trait CatalogItem {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_active() -> bool {
    true
}

/// A catalog entry customers can order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

macro_rules! catalog_item {
    ($($ty:ty),*) => {
        $(impl CatalogItem for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })*
    };
}

catalog_item!(Category, Filter, Service);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSettings {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_minimum_withdrawal")]
    pub minimum_withdrawal: f64,
    #[serde(default)]
    pub support_phone: Option<String>,
    #[serde(default)]
    pub support_email: Option<String>,
    #[serde(default)]
    pub maintenance_mode: bool,
    /// Free-form keys the admin console adds over time.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_currency() -> String {
    "KES".to_string()
}

fn default_minimum_withdrawal() -> f64 {
    100.0
}

impl Default for PlatformSettings {
    fn default() -> Self {
        PlatformSettings {
            currency: default_currency(),
            minimum_withdrawal: default_minimum_withdrawal(),
            support_phone: None,
            support_email: None,
            maintenance_mode: false,
            extra: Map::new(),
        }
    }
}

/// The single `config/platform` document edited from the admin console.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub settings: PlatformSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Categories,
    Filters,
    Services,
    Settings,
}

impl ConfigSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSection::Categories => "categories",
            ConfigSection::Filters => "filters",
            ConfigSection::Services => "services",
            ConfigSection::Settings => "settings",
        }
    }
}

impl FromStr for ConfigSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "categories" => Ok(ConfigSection::Categories),
            "filters" => Ok(ConfigSection::Filters),
            "services" => Ok(ConfigSection::Services),
            "settings" => Ok(ConfigSection::Settings),
            other => Err(format!("Unknown config section: {}", other)),
        }
    }
}

fn service(id: &str, name: &str, price: f64, category: &str, description: &str) -> Service {
    Service {
        id: id.to_string(),
        name: name.to_string(),
        price,
        category: category.to_string(),
        description: description.to_string(),
        active: true,
    }
}

fn category(id: &str, name: &str, icon: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: Some(icon.to_string()),
        description: None,
    }
}

impl Default for PlatformConfig {
    /// Catalog served before an admin has saved anything.
    fn default() -> Self {
        PlatformConfig {
            categories: vec![
                category("government", "Government Services", "landmark"),
                category("jobs", "Job Applications", "briefcase"),
                category("business", "Business Services", "building"),
                category("education", "Education", "graduation-cap"),
            ],
            filters: vec![
                Filter {
                    id: "price".to_string(),
                    name: "Price range".to_string(),
                    options: vec!["Under 1000".to_string(), "1000 - 2500".to_string(), "Over 2500".to_string()],
                },
                Filter {
                    id: "category".to_string(),
                    name: "Category".to_string(),
                    options: vec!["government".to_string(), "jobs".to_string(), "business".to_string(), "education".to_string()],
                },
            ],
            services: vec![
                service("kra-pin", "KRA PIN Registration", 500.0, "government", "Register a new KRA PIN and receive the certificate."),
                service("good-conduct", "Certificate of Good Conduct", 1000.0, "government", "Apply for a police clearance certificate."),
                service("sha-registration", "SHA Registration", 500.0, "government", "Register with the Social Health Authority."),
                service("cv-writing", "Professional CV Writing", 1500.0, "jobs", "A rewritten CV and cover letter template."),
                service("job-bundle", "Job Application Bundle", 2500.0, "jobs", "CV, cover letter and five tailored applications."),
                service("business-name", "Business Name Registration", 2000.0, "business", "Search and register a business name on eCitizen."),
                service("helb-application", "HELB Loan Application", 800.0, "education", "Complete and submit a HELB loan application."),
            ],
            settings: PlatformSettings::default(),
        }
    }
}
