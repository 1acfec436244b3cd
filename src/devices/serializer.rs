use serde_json::Value;

use super::models::{Device, DeviceId, DevicePayload, NewDevice, Platform};
use super::validation::{
    parse_bool, validate_apns_token, validate_hex_device_id, validate_name,
    validate_uuid_device_id, FieldErrors, BLANK, NOT_A_STRING, NOT_NULL, REQUIRED,
};

/// How a payload is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: registration_id required, `active` defaults to true
    Create,
    /// PUT: same requirements as create; omitted optional fields are kept
    Replace,
    /// PATCH: only supplied fields change
    Partial,
}

impl WriteMode {
    fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Validated field values. `None` means "leave unchanged".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeviceChanges {
    pub name: Option<Option<String>>,
    pub registration_id: Option<String>,
    pub device_id: Option<Option<DeviceId>>,
    pub active: Option<bool>,
}

impl DeviceChanges {
    /// Copy the changed fields onto an existing record
    pub fn apply(self, device: &mut Device) {
        if let Some(name) = self.name {
            device.name = name;
        }
        if let Some(registration_id) = self.registration_id {
            device.registration_id = registration_id;
        }
        if let Some(device_id) = self.device_id {
            device.device_id = device_id;
        }
        if let Some(active) = self.active {
            device.active = active;
        }
    }

    /// Build an insertable record; `owner` comes from the request identity only
    pub fn into_new_device(self, platform: Platform, owner: Option<String>) -> NewDevice {
        NewDevice {
            platform,
            name: self.name.flatten(),
            registration_id: self.registration_id.unwrap_or_default(),
            device_id: self.device_id.flatten(),
            active: self.active.unwrap_or(true),
            owner,
        }
    }
}

/// Run every field validator over a request payload.
///
/// All failures are collected so the client sees them together.
pub fn validate_payload(
    platform: Platform,
    payload: &DevicePayload,
    mode: WriteMode,
) -> Result<DeviceChanges, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut changes = DeviceChanges::default();

    match &payload.name {
        None => {}
        Some(Value::Null) => changes.name = Some(None),
        Some(Value::String(name)) => match validate_name(name) {
            Ok(name) => changes.name = Some(Some(name)),
            Err(e) => errors.add("name", e.to_string()),
        },
        Some(_) => errors.add("name", NOT_A_STRING),
    }

    match &payload.registration_id {
        None if mode.requires_all() => errors.add("registration_id", REQUIRED),
        None => {}
        Some(Value::Null) => errors.add("registration_id", NOT_NULL),
        Some(Value::String(token)) => match validate_registration_id(platform, token) {
            Ok(token) => changes.registration_id = Some(token),
            Err(message) => errors.add("registration_id", message),
        },
        Some(_) => errors.add("registration_id", NOT_A_STRING),
    }

    match &payload.device_id {
        None => {}
        Some(Value::Null) => match platform {
            Platform::Apns => changes.device_id = Some(None),
            Platform::Gcm => errors.add("device_id", NOT_NULL),
        },
        Some(value) => {
            let parsed = match platform {
                Platform::Apns => validate_uuid_device_id(value).map(DeviceId::Uuid),
                Platform::Gcm => validate_hex_device_id(value).map(DeviceId::Android),
            };
            match parsed {
                Ok(device_id) => changes.device_id = Some(Some(device_id)),
                Err(e) => errors.add("device_id", e.to_string()),
            }
        }
    }

    match &payload.active {
        None if mode.requires_all() => changes.active = Some(true),
        None => {}
        Some(Value::Null) => errors.add("active", NOT_NULL),
        Some(value) => match parse_bool(value) {
            Ok(active) => changes.active = Some(active),
            Err(e) => errors.add("active", e.to_string()),
        },
    }

    errors.into_result().map(|()| changes)
}

fn validate_registration_id(platform: Platform, token: &str) -> Result<String, String> {
    let token = token.trim();
    if token.is_empty() {
        return Err(BLANK.to_string());
    }
    if platform == Platform::Apns {
        validate_apns_token(token).map_err(|e| e.to_string())?;
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::validation::FieldError;
    use chrono::Utc;
    use serde_json::json;

    fn payload(value: Value) -> DevicePayload {
        serde_json::from_value(value).unwrap()
    }

    fn apns_token() -> String {
        "0123456789abcdef".repeat(4)
    }

    #[test]
    fn test_create_gcm_with_hex_device_id() {
        let changes = validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": "gcm-token", "device_id": "0x1A"})),
            WriteMode::Create,
        )
        .unwrap();

        assert_eq!(changes.registration_id.as_deref(), Some("gcm-token"));
        assert_eq!(changes.device_id, Some(Some(DeviceId::Android(26))));
        assert_eq!(changes.active, Some(true));
        assert_eq!(changes.name, None);
    }

    #[test]
    fn test_create_requires_registration_id() {
        let errors =
            validate_payload(Platform::Gcm, &payload(json!({"name": "x"})), WriteMode::Create)
                .unwrap_err();
        assert_eq!(errors.get("registration_id").unwrap(), &[REQUIRED]);

        let errors = validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": null, "active": null})),
            WriteMode::Replace,
        )
        .unwrap_err();
        assert_eq!(errors.get("registration_id").unwrap(), &[NOT_NULL]);
        assert_eq!(errors.get("active").unwrap(), &[NOT_NULL]);
    }

    #[test]
    fn test_partial_allows_missing_fields() {
        let changes =
            validate_payload(Platform::Apns, &payload(json!({"active": false})), WriteMode::Partial)
                .unwrap();
        assert_eq!(
            changes,
            DeviceChanges {
                active: Some(false),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_blank_registration_id() {
        let errors = validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": "   "})),
            WriteMode::Create,
        )
        .unwrap_err();
        assert_eq!(errors.get("registration_id").unwrap(), &[BLANK]);
    }

    #[test]
    fn test_apns_token_checked() {
        let errors = validate_payload(
            Platform::Apns,
            &payload(json!({"registration_id": "abc"})),
            WriteMode::Create,
        )
        .unwrap_err();
        assert_eq!(
            errors.get("registration_id").unwrap(),
            &[FieldError::InvalidApnsToken.to_string()]
        );

        let changes = validate_payload(
            Platform::Apns,
            &payload(json!({"registration_id": apns_token()})),
            WriteMode::Create,
        )
        .unwrap();
        assert_eq!(changes.registration_id, Some(apns_token()));
    }

    #[test]
    fn test_gcm_registration_id_is_not_hex_checked() {
        let changes = validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": "APA91b-opaque:token"})),
            WriteMode::Create,
        )
        .unwrap();
        assert_eq!(changes.registration_id.as_deref(), Some("APA91b-opaque:token"));
    }

    #[test]
    fn test_collects_every_field_error() {
        let errors = validate_payload(
            Platform::Gcm,
            &payload(json!({
                "name": 42,
                "registration_id": "token",
                "device_id": "zz",
                "active": "perhaps"
            })),
            WriteMode::Create,
        )
        .unwrap_err();

        assert_eq!(errors.get("name").unwrap(), &[NOT_A_STRING]);
        assert_eq!(
            errors.get("device_id").unwrap(),
            &["ValidationError Device ID is not a valid hex number"]
        );
        assert_eq!(errors.get("active").unwrap(), &["Must be a valid boolean."]);
        assert!(!errors.contains("registration_id"));
    }

    #[test]
    fn test_device_id_out_of_range() {
        let errors = validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": "t", "device_id": "0x8000000000000000"})),
            WriteMode::Create,
        )
        .unwrap_err();
        assert_eq!(
            errors.get("device_id").unwrap(),
            &["ValidationError Device ID is out of range"]
        );
    }

    #[test]
    fn test_apns_device_id_is_uuid() {
        let errors = validate_payload(
            Platform::Apns,
            &payload(json!({"registration_id": apns_token(), "device_id": "0x1A"})),
            WriteMode::Create,
        )
        .unwrap_err();
        assert_eq!(errors.get("device_id").unwrap(), &["Must be a valid UUID."]);
    }

    #[test]
    fn test_null_device_id_rejected_for_gcm_only() {
        let errors = validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": "t", "device_id": null})),
            WriteMode::Create,
        )
        .unwrap_err();
        assert_eq!(errors.get("device_id").unwrap(), &[NOT_NULL]);

        let errors = validate_payload(
            Platform::Gcm,
            &payload(json!({"device_id": null})),
            WriteMode::Partial,
        )
        .unwrap_err();
        assert_eq!(errors.get("device_id").unwrap(), &[NOT_NULL]);

        let changes = validate_payload(
            Platform::Apns,
            &payload(json!({"registration_id": apns_token(), "device_id": null})),
            WriteMode::Create,
        )
        .unwrap();
        assert_eq!(changes.device_id, Some(None));
    }

    #[test]
    fn test_replace_keeps_omitted_optional_fields() {
        let mut device = Device {
            id: 7,
            platform: Platform::Gcm,
            name: Some("Pixel".to_string()),
            registration_id: "old".to_string(),
            device_id: Some(DeviceId::Android(1)),
            active: false,
            date_created: Utc::now(),
            owner: Some("alice".to_string()),
        };

        validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": "new"})),
            WriteMode::Replace,
        )
        .unwrap()
        .apply(&mut device);

        assert_eq!(device.registration_id, "new");
        assert_eq!(device.name.as_deref(), Some("Pixel"));
        assert_eq!(device.device_id, Some(DeviceId::Android(1)));
        assert!(device.active);
        assert_eq!(device.owner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_into_new_device_uses_given_owner() {
        let new_device = validate_payload(
            Platform::Gcm,
            &payload(json!({"registration_id": "t", "name": null, "user": "mallory"})),
            WriteMode::Create,
        )
        .unwrap()
        .into_new_device(Platform::Gcm, Some("alice".to_string()));

        assert_eq!(new_device.owner.as_deref(), Some("alice"));
        assert_eq!(new_device.name, None);
        assert!(new_device.active);
    }
}
