use crate::registry::{OperationDescriptor, OperationName};

/// Operations that fail deterministically without a live org connection.
pub const REQUIRES_LIVE_CONNECTION: [OperationName; 4] = [
    OperationName::CreateRecord,
    OperationName::DeleteObjectFields,
    OperationName::CreateTab,
    OperationName::CreateCustomApp,
];

pub fn requires_live_connection(name: &str) -> bool {
    REQUIRES_LIVE_CONNECTION.iter().any(|restricted| restricted.as_str() == name)
}

/// Descriptors safe to advertise for the given liveness. Call once per listing; the
/// connection may come and go between requests.
pub fn filter(all: &[OperationDescriptor], live: bool) -> Vec<OperationDescriptor> {
    if live {
        return all.to_vec();
    }

    all.iter().filter(|descriptor| !requires_live_connection(&descriptor.name)).cloned().collect()
}
