// Domain-level faults raised while ticking a single entity.

/// A corrupt entity. The world skips it for the tick instead of aborting the whole update.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntityFault {
    #[error("non-finite {field}: {value}")]
    NonFinite { field: &'static str, value: f64 },
}
