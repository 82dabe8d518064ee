//! Customer payment entity: a billing-provider customer record.

use crate::model::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind};
use crate::model::{Entity, EntityId};
use serde::{Deserialize, Serialize};

pub static CUSTOMER_PAYMENT: EntityDescriptor = EntityDescriptor {
    name: "CustomerPayment",
    collection: "customerPayments",
    fields: &[
        FieldDescriptor::required("provider", FieldKind::String),
        FieldDescriptor::required("customerReference", FieldKind::String),
        FieldDescriptor::optional("status", FieldKind::String),
    ],
    relations: &[],
    immutable_fields: &[],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayment {
    pub id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub provider: String,
    pub customer_reference: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerPayment {
    pub provider: String,
    pub customer_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NewCustomerPayment {
    pub fn new(provider: impl Into<String>, customer_reference: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            customer_reference: customer_reference.into(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPaymentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Option<String>>,
}

impl Entity for CustomerPayment {
    type Create = NewCustomerPayment;
    type Patch = CustomerPaymentPatch;

    fn descriptor() -> &'static EntityDescriptor {
        &CUSTOMER_PAYMENT
    }

    fn id(&self) -> EntityId {
        self.id
    }
}
