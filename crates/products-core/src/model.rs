use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder returned instead of an empty list.
pub const NO_PRODUCTS: &str = "Sorry there are no products.";

/// Placeholder returned when a single product lookup matches nothing.
pub const NO_SUCH_PRODUCT: &str = "Sorry that product ID does not exist.";

/// A stored product. `id` and `created_at` are assigned by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub created_at: NaiveDateTime,
}

/// Request body for create and update.
///
/// The outer `Option` records whether the key was sent at all, the inner one
/// whether it was `null`. Nothing is validated here: create binds absent and
/// null alike as NULL, update writes only the keys that were sent, and the
/// storage constraints decide what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<f64>>,
}

impl ProductInput {
    pub fn new(name: &str, description: &str, price: f64) -> Self {
        Self {
            name: Some(Some(name.into())),
            description: Some(Some(description.into())),
            price: Some(Some(price)),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|v| v.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_ref().and_then(|v| v.as_deref())
    }

    pub fn price(&self) -> Option<f64> {
        self.price.flatten()
    }

    /// True when no key was sent.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }
}

// Only called for keys that are present, so `null` maps to `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Uniform `{status, data}` wrapper used for every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: Status,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data,
        }
    }

    pub fn error(data: T) -> Self {
        Self {
            status: Status::Error,
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Success payload: either the affected rows or a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Products(Vec<Product>),
    Message(String),
}

impl Payload {
    /// Rows as-is, or `message` when there are none.
    pub fn or_message(products: Vec<Product>, message: &str) -> Self {
        if products.is_empty() {
            Payload::Message(message.to_string())
        } else {
            Payload::Products(products)
        }
    }

    pub fn products(&self) -> Option<&[Product]> {
        match self {
            Payload::Products(p) => Some(p),
            Payload::Message(_) => None,
        }
    }
}

impl From<Vec<Product>> for Payload {
    fn from(products: Vec<Product>) -> Self {
        Payload::Products(products)
    }
}
