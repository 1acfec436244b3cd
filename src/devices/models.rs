use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Push service a device registers with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Apns,
    Gcm,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Apns => "apns",
            Platform::Gcm => "gcm",
        }
    }

    /// Backing table for this platform's registrations
    pub fn table(&self) -> &'static str {
        match self {
            Platform::Apns => "apns_devices",
            Platform::Gcm => "gcm_devices",
        }
    }
}

/// Hardware identifier reported by the device.
///
/// APNS devices send a UUID; GCM devices send ANDROID_ID as a hex string,
/// which is stored and returned as an integer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(untagged)]
pub enum DeviceId {
    Uuid(Uuid),
    Android(i64),
}

/// A registered device
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct Device {
    #[serde(skip)]
    pub id: i64,

    #[serde(skip)]
    pub platform: Platform,

    /// Optional display name
    pub name: Option<String>,

    /// Push token issued by APNS or GCM
    pub registration_id: String,

    pub device_id: Option<DeviceId>,

    /// Whether the device should receive notifications
    pub active: bool,

    /// Set once when the registration is stored
    pub date_created: DateTime<Utc>,

    /// User the registration belongs to
    #[serde(skip)]
    pub owner: Option<String>,
}

impl Device {
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner.as_deref() == Some(user)
    }
}

/// A registration ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    pub platform: Platform,
    pub name: Option<String>,
    pub registration_id: String,
    pub device_id: Option<DeviceId>,
    pub active: bool,
    pub owner: Option<String>,
}

/// Which records a request may see and modify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerScope {
    /// Every record, regardless of owner
    All,
    /// Only records owned by this user
    Owner(String),
}

impl OwnerScope {
    pub fn owner(&self) -> Option<&str> {
        match self {
            OwnerScope::All => None,
            OwnerScope::Owner(user) => Some(user),
        }
    }

    /// Object-level permission check
    pub fn permits(&self, device: &Device) -> bool {
        match self {
            OwnerScope::All => true,
            OwnerScope::Owner(user) => device.is_owned_by(user),
        }
    }
}

/// Request body for create and update operations.
///
/// Fields stay as raw JSON so that type errors are reported per field.
/// A field that is absent is `None`; an explicit `null` is `Some(Value::Null)`.
/// Read-only fields such as `date_created` or an owner are ignored.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct DevicePayload {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub registration_id: Option<Value>,

    /// APNS: UUID. GCM: hex string such as "0x01"
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub device_id: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<bool>)]
    pub active: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
