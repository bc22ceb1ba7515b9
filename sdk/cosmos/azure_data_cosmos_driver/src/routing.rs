// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Chooses the transport for a request.

use crate::request::OperationType;
use crate::resource_context::ResourceType;
use std::fmt;

/// The transport a request is sent over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// The HTTP gateway, which serves every request.
    Gateway,
    /// The data-plane transport to the replica owning the partition.
    Direct,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Gateway => f.write_str("gateway"),
            TransportKind::Direct => f.write_str("direct"),
        }
    }
}

/// Maps a request to the transport that is allowed to serve it.
///
/// Control-plane operations must go through the gateway. Everything else may go direct; whether
/// it actually does depends on the client's transport strategy.
pub struct RequestRouter;

impl RequestRouter {
    pub fn route(
        resource_type: ResourceType,
        operation: OperationType,
        force_gateway: bool,
    ) -> TransportKind {
        use OperationType::*;
        use ResourceType::*;

        if force_gateway {
            return TransportKind::Gateway;
        }

        match (resource_type, operation) {
            (Offer, _) | (PartitionKeyRange, _) => TransportKind::Gateway,
            (r, op) if r.is_script() && op != Execute => TransportKind::Gateway,
            (Database | User | Collection | Permission, Create | Upsert | Delete) => {
                TransportKind::Gateway
            }
            (Collection, Replace | Read) => TransportKind::Gateway,
            _ => TransportKind::Direct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATIONS: [OperationType; 7] = [
        OperationType::Create,
        OperationType::Read,
        OperationType::Replace,
        OperationType::Delete,
        OperationType::Upsert,
        OperationType::Query,
        OperationType::Execute,
    ];

    #[test]
    fn forced_requests_always_use_gateway() {
        for op in OPERATIONS {
            assert_eq!(
                RequestRouter::route(ResourceType::Document, op, true),
                TransportKind::Gateway
            );
        }
    }

    #[test]
    fn offers_and_partition_key_ranges_use_gateway() {
        for op in OPERATIONS {
            assert_eq!(
                RequestRouter::route(ResourceType::Offer, op, false),
                TransportKind::Gateway
            );
            assert_eq!(
                RequestRouter::route(ResourceType::PartitionKeyRange, op, false),
                TransportKind::Gateway
            );
        }
    }

    #[test]
    fn scripts_use_gateway_except_execution() {
        for script in [
            ResourceType::StoredProcedure,
            ResourceType::Trigger,
            ResourceType::UserDefinedFunction,
        ] {
            for op in [
                OperationType::Create,
                OperationType::Read,
                OperationType::Replace,
                OperationType::Delete,
                OperationType::Upsert,
                OperationType::Query,
            ] {
                assert_eq!(
                    RequestRouter::route(script, op, false),
                    TransportKind::Gateway,
                    "{script:?} {op:?}"
                );
            }
        }
        assert_eq!(
            RequestRouter::route(ResourceType::StoredProcedure, OperationType::Execute, false),
            TransportKind::Direct
        );
    }

    #[test]
    fn topology_changes_use_gateway() {
        for resource in [
            ResourceType::Database,
            ResourceType::User,
            ResourceType::Collection,
            ResourceType::Permission,
        ] {
            for op in [
                OperationType::Create,
                OperationType::Upsert,
                OperationType::Delete,
            ] {
                assert_eq!(
                    RequestRouter::route(resource, op, false),
                    TransportKind::Gateway
                );
            }
        }
    }

    #[test]
    fn collection_reads_and_replaces_use_gateway() {
        for op in [OperationType::Read, OperationType::Replace] {
            assert_eq!(
                RequestRouter::route(ResourceType::Collection, op, false),
                TransportKind::Gateway
            );
        }
        assert_eq!(
            RequestRouter::route(ResourceType::Collection, OperationType::Query, false),
            TransportKind::Direct
        );
    }

    #[test]
    fn data_plane_operations_go_direct() {
        for op in OPERATIONS {
            assert_eq!(
                RequestRouter::route(ResourceType::Document, op, false),
                TransportKind::Direct
            );
        }
        assert_eq!(
            RequestRouter::route(ResourceType::Database, OperationType::Read, false),
            TransportKind::Direct
        );
        assert_eq!(
            RequestRouter::route(ResourceType::Attachment, OperationType::Replace, false),
            TransportKind::Direct
        );
    }
}
