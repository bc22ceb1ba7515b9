// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! The logical request submitted to the driver.

use crate::error::{Error, ErrorKind, Result};
use crate::http::{Headers, Method};
use crate::models::CollectionProperties;
use crate::partition_key::PartitionKeyInternal;
use crate::resource_context::{ResourceLink, ResourceType};
use crate::CollectionIdentity;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// The kind of operation a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Create,
    Read,
    Replace,
    Delete,
    Upsert,
    Query,
    /// Executes a stored procedure.
    Execute,
}

impl OperationType {
    /// The HTTP verb the operation is sent with.
    pub fn method(&self) -> Method {
        match self {
            OperationType::Create
            | OperationType::Upsert
            | OperationType::Query
            | OperationType::Execute => Method::Post,
            OperationType::Read => Method::Get,
            OperationType::Replace => Method::Put,
            OperationType::Delete => Method::Delete,
        }
    }

    /// Returns `true` for operations that read data and so carry the tracked session token.
    /// Stored procedures count, since a script may read before it writes.
    pub fn reads_session(&self) -> bool {
        matches!(
            self,
            OperationType::Read | OperationType::Query | OperationType::Execute
        )
    }

    /// Returns `true` for operations that write a resource body.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            OperationType::Create | OperationType::Upsert | OperationType::Replace
        )
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State the driver resolves for a request while processing it.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// The collection the request targets, once resolved through the collection cache.
    pub resolved_collection: Option<Arc<CollectionProperties>>,
    /// The resolved partition key, once known.
    pub partition_key: Option<PartitionKeyInternal>,
    /// Route to the gateway regardless of the routing table.
    pub force_gateway: bool,
    /// Do not attach the tracked session token to the next attempt.
    pub suppress_session_token: bool,
}

/// A request for one operation on one resource.
#[derive(Clone, Debug)]
pub struct CosmosRequest {
    operation: OperationType,
    link: ResourceLink,
    headers: Headers,
    body: Option<Bytes>,
    context: RequestContext,
}

impl CosmosRequest {
    pub fn new(operation: OperationType, link: ResourceLink) -> Self {
        Self {
            operation,
            link,
            headers: Headers::new(),
            body: None,
            context: RequestContext::default(),
        }
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON request body.
    pub fn with_json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_body(body))
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    pub fn link(&self) -> &ResourceLink {
        &self.link
    }

    pub fn resource_type(&self) -> ResourceType {
        self.link.resource_type()
    }

    pub fn method(&self) -> Method {
        self.operation.method()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Parses the body as JSON, if there is one.
    pub fn body_json(&self) -> Result<Option<serde_json::Value>> {
        self.body
            .as_ref()
            .map(|body| serde_json::from_slice(body).map_err(Error::from))
            .transpose()
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    /// The identity the session tracker knows this request's collection by.
    ///
    /// Only available once the collection has been resolved.
    pub fn collection_identity(&self) -> Option<CollectionIdentity> {
        let collection = self.context.resolved_collection.as_ref()?;
        let resource_id = collection.resource_id()?.clone();
        Some(CollectionIdentity::new(
            self.link.collection_link(),
            resource_id,
        ))
    }

    /// Checks the request is well formed. Runs before any network call.
    pub fn validate(&self) -> Result<()> {
        let resource_type = self.resource_type();

        if self.operation == OperationType::Execute
            && resource_type != ResourceType::StoredProcedure
        {
            return Err(Error::new(
                ErrorKind::Argument,
                format!("only stored procedures can be executed, not {}", resource_type),
            ));
        }

        // Reads may target a feed (`dbs/db1/colls`); these may not.
        let needs_item = matches!(
            self.operation,
            OperationType::Replace | OperationType::Delete | OperationType::Execute
        );
        if needs_item && !self.link.is_item() {
            return Err(Error::new(
                ErrorKind::Argument,
                format!(
                    "{} requires a link to a single resource, got '{}'",
                    self.operation, self.link
                ),
            ));
        }

        if matches!(
            self.operation,
            OperationType::Create | OperationType::Upsert | OperationType::Query
        ) && self.link.is_item()
        {
            return Err(Error::new(
                ErrorKind::Argument,
                format!("{} requires a feed link, got '{}'", self.operation, self.link),
            ));
        }

        if (self.operation.is_write() || self.operation == OperationType::Query)
            && self.body.is_none()
        {
            return Err(Error::new(
                ErrorKind::Argument,
                format!("{} on {} requires a body", self.operation, resource_type),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> ResourceLink {
        ResourceLink::parse("dbs/db1/colls/c1/docs").unwrap()
    }

    #[test]
    fn verbs() {
        assert_eq!(OperationType::Create.method(), Method::Post);
        assert_eq!(OperationType::Upsert.method(), Method::Post);
        assert_eq!(OperationType::Query.method(), Method::Post);
        assert_eq!(OperationType::Execute.method(), Method::Post);
        assert_eq!(OperationType::Read.method(), Method::Get);
        assert_eq!(OperationType::Replace.method(), Method::Put);
        assert_eq!(OperationType::Delete.method(), Method::Delete);
    }

    #[test]
    fn only_reads_and_scripts_carry_session_tokens() {
        assert!(OperationType::Read.reads_session());
        assert!(OperationType::Query.reads_session());
        assert!(OperationType::Execute.reads_session());
        assert!(!OperationType::Create.reads_session());
        assert!(!OperationType::Replace.reads_session());
        assert!(!OperationType::Upsert.reads_session());
        assert!(!OperationType::Delete.reads_session());
    }

    #[test]
    fn create_requires_a_body() {
        let request = CosmosRequest::new(OperationType::Create, docs());
        assert_eq!(request.validate().unwrap_err().kind(), &ErrorKind::Argument);

        let request = request.with_body(r#"{"id":"1"}"#);
        request.validate().unwrap();
    }

    #[test]
    fn create_targets_a_feed() {
        let request = CosmosRequest::new(OperationType::Create, docs().item("1"))
            .with_body(r#"{"id":"1"}"#);
        assert_eq!(request.validate().unwrap_err().kind(), &ErrorKind::Argument);
    }

    #[test]
    fn delete_targets_an_item() {
        CosmosRequest::new(OperationType::Delete, docs().item("1"))
            .validate()
            .unwrap();
        let err = CosmosRequest::new(OperationType::Delete, docs())
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Argument);
    }

    #[test]
    fn only_stored_procedures_execute() {
        let sproc = ResourceLink::parse("dbs/db1/colls/c1/sprocs/s1").unwrap();
        CosmosRequest::new(OperationType::Execute, sproc)
            .validate()
            .unwrap();

        let err = CosmosRequest::new(OperationType::Execute, docs().item("1"))
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Argument);
    }

    #[test]
    fn collection_identity_requires_resolution() {
        let mut request = CosmosRequest::new(OperationType::Read, docs().item("1"));
        assert!(request.collection_identity().is_none());

        request.context_mut().resolved_collection = Some(Arc::new(CollectionProperties::new(
            "c1",
            crate::ResourceId::new("Zk5uAMSFmQA="),
        )));
        let identity = request.collection_identity().unwrap();
        assert_eq!(identity.name_link.as_deref(), Some("dbs/db1/colls/c1"));
        assert_eq!(identity.resource_id.value(), "Zk5uAMSFmQA=");
    }

    #[test]
    fn json_bodies() {
        let request = CosmosRequest::new(OperationType::Upsert, docs())
            .with_json(&serde_json::json!({ "id": "1", "pk": "a" }))
            .unwrap();
        assert_eq!(request.body_json().unwrap().unwrap()["pk"], "a");
    }
}
