use std::{any::Any, sync::Arc};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque value stored in the per-request attribute store.
pub type AttributeValue = Arc<dyn Any + Send + Sync>;
