//! Identity domain models.
//!
//! The four identity collections share no base schema. A record is one of the
//! [`CredentialRecord`] variants, and the collection that holds it is chosen
//! by its [`Role`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Document;
use crate::ids::fixed_time;

/// Principal role. Selects the authoritative collection and the rules that apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
    Seller,
    Deliverer,
}

/// Per-role facts, looked up once instead of branching on the role everywhere.
#[derive(Debug)]
pub struct RoleStrategy {
    pub role: Role,
    /// Collection holding this role's credential records.
    pub collection: &'static str,
    /// Capitalised name used in user-facing messages.
    pub label: &'static str,
    /// Seller and deliverer accounts must be approved before they can log in.
    pub requires_approval: bool,
    /// Admins are seeded, never self-registered.
    pub self_registration: bool,
}

static STRATEGIES: [RoleStrategy; 4] = [
    RoleStrategy {
        role: Role::Admin,
        collection: "admins",
        label: "Admin",
        requires_approval: false,
        self_registration: false,
    },
    RoleStrategy {
        role: Role::Customer,
        collection: "customers",
        label: "Customer",
        requires_approval: false,
        self_registration: true,
    },
    RoleStrategy {
        role: Role::Seller,
        collection: "sellers",
        label: "Seller",
        requires_approval: true,
        self_registration: true,
    },
    RoleStrategy {
        role: Role::Deliverer,
        collection: "deliverers",
        label: "Deliverer",
        requires_approval: true,
        self_registration: true,
    },
];

impl Role {
    /// Every role, in the order login probes collections when no role is given.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Customer, Role::Seller, Role::Deliverer];

    pub fn strategy(self) -> &'static RoleStrategy {
        &STRATEGIES[self as usize]
    }

    pub fn collection(self) -> &'static str {
        self.strategy().collection
    }

    pub fn requires_approval(self) -> bool {
        self.strategy().requires_approval
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
            Role::Seller => "seller",
            Role::Deliverer => "deliverer",
        }
    }

    /// Names of all four identity collections.
    pub fn collections() -> Vec<&'static str> {
        Role::ALL.iter().map(|r| r.collection()).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            "seller" => Ok(Role::Seller),
            "deliverer" => Ok(Role::Deliverer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Approval state of seller and deliverer accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

fn default_true() -> bool {
    true
}

/// Fields every credential record carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Lower-cased and trimmed; unique across all four collections.
    pub email: String,
    #[serde(rename = "passwordHash")]
    pub password_hash: String,
    #[serde(rename = "isActive", default = "default_true")]
    pub active: bool,
    #[serde(rename = "createdAt", with = "fixed_time")]
    pub created_at: DateTime<Utc>,
}

/// Approval bookkeeping shared by sellers and deliverers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub status: ApprovalStatus,
    #[serde(rename = "approvedBy", default)]
    pub approved_by: Option<String>,
    #[serde(rename = "approvedAt", default, with = "fixed_time::option")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(rename = "rejectionReason", default)]
    pub rejection_reason: Option<String>,
}

impl Approval {
    pub fn pending() -> Self {
        Self {
            status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
    #[serde(flatten)]
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    #[serde(flatten)]
    pub account: Account,
    pub phone_no: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerRecord {
    #[serde(flatten)]
    pub account: Account,
    #[serde(rename = "shopName")]
    pub shop_name: String,
    pub phone_no: String,
    pub address: String,
    #[serde(flatten)]
    pub approval: Approval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelivererRecord {
    #[serde(flatten)]
    pub account: Account,
    pub phone_no: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub vehicle_no: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(flatten)]
    pub approval: Approval,
}

/// One credential record from one of the four identity collections.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialRecord {
    Admin(AdminRecord),
    Customer(CustomerRecord),
    Seller(SellerRecord),
    Deliverer(DelivererRecord),
}

impl CredentialRecord {
    pub fn role(&self) -> Role {
        match self {
            CredentialRecord::Admin(_) => Role::Admin,
            CredentialRecord::Customer(_) => Role::Customer,
            CredentialRecord::Seller(_) => Role::Seller,
            CredentialRecord::Deliverer(_) => Role::Deliverer,
        }
    }

    pub fn account(&self) -> &Account {
        match self {
            CredentialRecord::Admin(r) => &r.account,
            CredentialRecord::Customer(r) => &r.account,
            CredentialRecord::Seller(r) => &r.account,
            CredentialRecord::Deliverer(r) => &r.account,
        }
    }

    pub fn id(&self) -> &str {
        &self.account().id
    }

    pub fn email(&self) -> &str {
        &self.account().email
    }

    pub fn is_active(&self) -> bool {
        self.account().active
    }

    pub fn approval(&self) -> Option<&Approval> {
        match self {
            CredentialRecord::Seller(r) => Some(&r.approval),
            CredentialRecord::Deliverer(r) => Some(&r.approval),
            _ => None,
        }
    }

    /// Roles without an approval workflow always count as approved.
    pub fn is_approved(&self) -> bool {
        self.approval()
            .is_none_or(|a| a.status == ApprovalStatus::Approved)
    }

    /// Role-shaped public view of the record. Never includes the password hash.
    pub fn profile(&self) -> PublicProfile {
        let account = self.account();
        let mut profile = PublicProfile {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: self.role(),
            is_active: None,
            phone_no: None,
            address: None,
            shop_name: None,
            vehicle_no: None,
            vehicle_type: None,
            status: None,
        };
        match self {
            CredentialRecord::Admin(_) => {
                profile.is_active = Some(account.active);
            }
            CredentialRecord::Customer(r) => {
                profile.phone_no = Some(r.phone_no.clone());
                profile.address = Some(r.address.clone());
            }
            CredentialRecord::Seller(r) => {
                profile.shop_name = Some(r.shop_name.clone());
                profile.phone_no = Some(r.phone_no.clone());
                profile.address = Some(r.address.clone());
                profile.status = Some(r.approval.status);
            }
            CredentialRecord::Deliverer(r) => {
                profile.phone_no = Some(r.phone_no.clone());
                profile.vehicle_no = Some(r.vehicle_no.clone());
                profile.vehicle_type = Some(r.vehicle_type.clone());
                profile.status = Some(r.approval.status);
            }
        }
        profile
    }

    /// Serialize into the stored document shape.
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        let value = match self {
            CredentialRecord::Admin(r) => serde_json::to_value(r)?,
            CredentialRecord::Customer(r) => serde_json::to_value(r)?,
            CredentialRecord::Seller(r) => serde_json::to_value(r)?,
            CredentialRecord::Deliverer(r) => serde_json::to_value(r)?,
        };
        match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "credential record serialized to non-object: {other}"
            ))),
        }
    }

    /// Parse a stored document from the collection owned by `role`.
    pub fn from_document(role: Role, doc: Document) -> Result<Self, serde_json::Error> {
        let value = serde_json::Value::Object(doc);
        Ok(match role {
            Role::Admin => CredentialRecord::Admin(serde_json::from_value(value)?),
            Role::Customer => CredentialRecord::Customer(serde_json::from_value(value)?),
            Role::Seller => CredentialRecord::Seller(serde_json::from_value(value)?),
            Role::Deliverer => CredentialRecord::Deliverer(serde_json::from_value(value)?),
        })
    }
}

/// Role-shaped profile returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isActive", default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "shopName", default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
}

/// The authenticated identity attached to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub active: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Claims embedded in session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal id.
    pub id: String,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Random token id; keeps tokens issued in the same second distinct.
    pub jti: String,
}

/// Raw registration input. Every field is optional so validation can report
/// all missing fields at once.
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationInput {
    pub role: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "phone")]
    pub phone_no: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "shopName", alias = "shop_name")]
    pub shop_name: Option<String>,
    #[serde(alias = "vehicleNo")]
    pub vehicle_no: Option<String>,
    #[serde(alias = "vehicleType")]
    pub vehicle_type: Option<String>,
}

impl fmt::Debug for RegistrationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationInput")
            .field("role", &self.role)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("phone_no", &self.phone_no)
            .field("address", &self.address)
            .field("shop_name", &self.shop_name)
            .field("vehicle_no", &self.vehicle_no)
            .field("vehicle_type", &self.vehicle_type)
            .finish()
    }
}

/// Raw login input.
#[derive(Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn account(id: &str) -> Account {
        Account {
            id: id.to_string(),
            name: "Sam Seller".to_string(),
            email: "sam@shop.test".to_string(),
            password_hash: "hash".to_string(),
            active: true,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn strategy_table_is_indexed_by_role() {
        for role in Role::ALL {
            assert_eq!(role.strategy().role, role);
        }
        assert_eq!(Role::Seller.collection(), "sellers");
        assert!(!Role::Admin.strategy().self_registration);
        assert!(Role::Deliverer.requires_approval());
        assert!(!Role::Customer.requires_approval());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(" Seller ".parse::<Role>(), Ok(Role::Seller));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn seller_document_shape() {
        let record = CredentialRecord::Seller(SellerRecord {
            account: account("aaaaaaaaaaaaaaaaaaaaaaaa"),
            shop_name: "Sam's".to_string(),
            phone_no: "0711234567".to_string(),
            address: "1 Main St".to_string(),
            approval: Approval::pending(),
        });
        let doc = record.to_document().unwrap();
        assert_eq!(doc["shopName"], "Sam's");
        assert_eq!(doc["status"], "pending");
        assert_eq!(doc["isActive"], true);
        assert_eq!(doc["createdAt"], "2024-05-01T12:00:00.000Z");
        assert!(doc.contains_key("passwordHash"));

        let back = CredentialRecord::from_document(Role::Seller, doc).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn profile_never_carries_password_hash() {
        let record = CredentialRecord::Admin(AdminRecord {
            account: account("bbbbbbbbbbbbbbbbbbbbbbbb"),
        });
        let json = serde_json::to_value(record.profile()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["isActive"], true);
        assert!(json.get("shopName").is_none());
    }

    #[test]
    fn customer_is_always_approved() {
        let record = CredentialRecord::Customer(CustomerRecord {
            account: account("cccccccccccccccccccccccc"),
            phone_no: "0711234567".to_string(),
            address: String::new(),
        });
        assert!(record.is_approved());
        assert!(record.approval().is_none());
    }

    #[test]
    fn registration_input_accepts_aliases() {
        let input: RegistrationInput = serde_json::from_value(serde_json::json!({
            "role": "deliverer",
            "phone": "0711234567",
            "vehicleNo": "KA-01",
            "vehicleType": "bike"
        }))
        .unwrap();
        assert_eq!(input.phone_no.as_deref(), Some("0711234567"));
        assert_eq!(input.vehicle_no.as_deref(), Some("KA-01"));
        assert_eq!(input.vehicle_type.as_deref(), Some("bike"));
    }

    #[test]
    fn debug_redacts_password() {
        let input = LoginInput {
            email: Some("a@b.co".into()),
            password: Some("hunter22".into()),
            role: None,
        };
        assert!(!format!("{input:?}").contains("hunter22"));
    }
}
