use authhub_core::CorrelationId;

use crate::principal::Principal;

/// Request-scoped identity holder.
///
/// Immutable after construction. The correlation id is generated at pipeline
/// entry and released with the request scope on every exit path; the
/// principal (if any) travels as an explicit value through the handler chain
/// rather than via ambient thread-local state.
#[derive(Debug, Clone)]
pub struct IdentityContext {
    principal: Option<Principal>,
    correlation_id: CorrelationId,
}

impl IdentityContext {
    pub fn new(principal: Option<Principal>, correlation_id: CorrelationId) -> Self {
        Self {
            principal,
            correlation_id,
        }
    }

    pub fn anonymous(correlation_id: CorrelationId) -> Self {
        Self::new(None, correlation_id)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}
