//! # Domain Entities
//!
//! The resources managed by the registry.
//!
//! ## Capabilities
//!
//! | Resource | Secured | Integral |
//! |----------|---------|----------|
//! | `ServiceBroker` | yes | yes |
//! | `Platform` | yes | yes |
//! | `ServiceBinding` | yes | yes |
//! | everything else | no | no |

use crate::errors::StorageError;
use crate::object::{Base, Integral, Object, ObjectType, Secured};
use serde::{Deserialize, Serialize};
use std::any::Any;

macro_rules! impl_object {
    ($ty:ident, $object_type:expr) => {
        impl_object!(@impl $ty, $object_type, {});
    };
    ($ty:ident, $object_type:expr, secured) => {
        impl_object!(@impl $ty, $object_type, {
            fn as_secured(&self) -> Option<&dyn Secured> {
                Some(self)
            }

            fn as_secured_mut(&mut self) -> Option<&mut dyn Secured> {
                Some(self)
            }

            fn as_integral(&self) -> Option<&dyn Integral> {
                Some(self)
            }

            fn as_integral_mut(&mut self) -> Option<&mut dyn Integral> {
                Some(self)
            }
        });
    };
    (@impl $ty:ident, $object_type:expr, { $($capabilities:tt)* }) => {
        impl Object for $ty {
            fn object_type(&self) -> ObjectType {
                $object_type
            }

            fn base(&self) -> &Base {
                &self.base
            }

            fn base_mut(&mut self) -> &mut Base {
                &mut self.base
            }

            fn to_value(&self) -> Result<serde_json::Value, StorageError> {
                Ok(serde_json::to_value(self)?)
            }

            fn clone_object(&self) -> Box<dyn Object> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            $($capabilities)*
        }
    };
}

/// Implements `Secured` and `Integral` for resources holding
/// `credentials: Option<Credentials>`, `checksum` and `integrity` fields.
macro_rules! impl_credentials_capabilities {
    ($ty:ident) => {
        impl Secured for $ty {
            fn secrets(&self) -> Vec<&str> {
                self.credentials
                    .as_ref()
                    .map(Credentials::secrets)
                    .unwrap_or_default()
            }

            fn secrets_mut(&mut self) -> Vec<&mut String> {
                self.credentials
                    .as_mut()
                    .map(Credentials::secrets_mut)
                    .unwrap_or_default()
            }

            fn checksum(&self) -> &str {
                &self.checksum
            }

            fn set_checksum_value(&mut self, checksum: String) {
                self.checksum = checksum;
            }

            fn scrub(&mut self) {
                self.credentials = None;
            }
        }

        impl Integral for $ty {
            fn integral_data(&self) -> Vec<u8> {
                self.secrets().join(":").into_bytes()
            }

            fn integrity(&self) -> &[u8] {
                &self.integrity
            }

            fn set_integrity(&mut self, integrity: Vec<u8>) {
                self.integrity = integrity;
            }
        }
    };
}

/// Username/password pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Credentials used to talk to a broker or authenticate a platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            basic: Some(BasicCredentials {
                username: username.into(),
                password: password.into(),
            }),
            token: None,
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            basic: None,
            token: Some(token.into()),
        }
    }

    fn secrets(&self) -> Vec<&str> {
        let mut secrets = Vec::with_capacity(2);
        if let Some(basic) = &self.basic {
            secrets.push(basic.password.as_str());
        }
        if let Some(token) = &self.token {
            secrets.push(token.as_str());
        }
        secrets
    }

    fn secrets_mut(&mut self) -> Vec<&mut String> {
        let mut secrets = Vec::with_capacity(2);
        if let Some(basic) = &mut self.basic {
            secrets.push(&mut basic.password);
        }
        if let Some(token) = &mut self.token {
            secrets.push(token);
        }
        secrets
    }
}

/// A registered service broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBroker {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub broker_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub integrity: Vec<u8>,
}

impl ServiceBroker {
    pub fn new(name: impl Into<String>, broker_url: impl Into<String>) -> Self {
        Self {
            base: Base::new(),
            name: name.into(),
            broker_url: broker_url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

impl_object!(ServiceBroker, ObjectType::ServiceBroker, secured);
impl_credentials_capabilities!(ServiceBroker);

/// A platform (Cloud Foundry, Kubernetes, ...) consuming the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    #[serde(rename = "type")]
    pub platform_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub integrity: Vec<u8>,
}

impl Platform {
    pub fn new(name: impl Into<String>, platform_type: impl Into<String>) -> Self {
        Self {
            base: Base::new(),
            name: name.into(),
            platform_type: platform_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

impl_object!(Platform, ObjectType::Platform, secured);
impl_credentials_capabilities!(Platform);

/// A service offered by a broker's catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub broker_id: String,
    pub catalog_id: String,
    #[serde(default)]
    pub bindable: bool,
}

impl_object!(ServiceOffering, ObjectType::ServiceOffering);

/// A plan of a service offering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePlan {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    pub catalog_id: String,
    pub service_offering_id: String,
    #[serde(default)]
    pub free: bool,
}

impl_object!(ServicePlan, ObjectType::ServicePlan);

/// A provisioned service instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    pub service_plan_id: String,
    #[serde(default)]
    pub platform_id: String,
    #[serde(default)]
    pub usable: bool,
}

impl ServiceInstance {
    pub fn new(name: impl Into<String>, service_plan_id: impl Into<String>) -> Self {
        Self {
            base: Base::new(),
            name: name.into(),
            service_plan_id: service_plan_id.into(),
            usable: true,
            ..Default::default()
        }
    }
}

impl_object!(ServiceInstance, ObjectType::ServiceInstance);

/// A binding to a service instance. Credentials are an opaque JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceBinding {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
    pub service_instance_id: String,
    #[serde(default)]
    pub credentials: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub integrity: Vec<u8>,
}

impl ServiceBinding {
    pub fn new(
        name: impl Into<String>,
        service_instance_id: impl Into<String>,
        credentials: impl Into<String>,
    ) -> Self {
        Self {
            base: Base::new(),
            name: name.into(),
            service_instance_id: service_instance_id.into(),
            credentials: credentials.into(),
            ..Default::default()
        }
    }
}

impl_object!(ServiceBinding, ObjectType::ServiceBinding, secured);

impl Secured for ServiceBinding {
    fn secrets(&self) -> Vec<&str> {
        vec![self.credentials.as_str()]
    }

    fn secrets_mut(&mut self) -> Vec<&mut String> {
        vec![&mut self.credentials]
    }

    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn set_checksum_value(&mut self, checksum: String) {
        self.checksum = checksum;
    }

    fn scrub(&mut self) {
        self.credentials.clear();
    }
}

impl Integral for ServiceBinding {
    fn integral_data(&self) -> Vec<u8> {
        self.credentials.as_bytes().to_vec()
    }

    fn integrity(&self) -> &[u8] {
        &self.integrity
    }

    fn set_integrity(&mut self, integrity: Vec<u8>) {
        self.integrity = integrity;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    #[default]
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    #[default]
    InProgress,
    Succeeded,
    Failed,
}

/// Record of an asynchronous operation on a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(flatten)]
    pub base: Base,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub state: OperationState,
    pub resource_id: String,
    pub resource_type: Option<ObjectType>,
    #[serde(default)]
    pub description: String,
}

impl_object!(Operation, ObjectType::Operation);

/// Kind of change a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Created,
    Modified,
    Deleted,
}

/// A record announcing a change to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(flatten)]
    pub base: Base,
    pub resource: ObjectType,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub revision: i64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(
        resource: ObjectType,
        notification_type: NotificationType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            base: Base::new(),
            resource,
            notification_type,
            platform_id: None,
            revision: 0,
            payload,
        }
    }
}

impl_object!(Notification, ObjectType::Notification);
