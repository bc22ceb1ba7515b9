// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Resource kinds and the links that address them.

use crate::error::{Error, ErrorKind, Result};
use base64::Engine;
use std::fmt;

/// The kind of resource a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Database,
    Collection,
    Document,
    StoredProcedure,
    Trigger,
    UserDefinedFunction,
    Permission,
    User,
    Conflict,
    Offer,
    Attachment,
    PartitionKeyRange,
}

impl ResourceType {
    /// The path segment naming a feed of this resource type, which is also the resource type
    /// string included in master key signatures.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceType::Database => "dbs",
            ResourceType::Collection => "colls",
            ResourceType::Document => "docs",
            ResourceType::StoredProcedure => "sprocs",
            ResourceType::Trigger => "triggers",
            ResourceType::UserDefinedFunction => "udfs",
            ResourceType::Permission => "permissions",
            ResourceType::User => "users",
            ResourceType::Conflict => "conflicts",
            ResourceType::Offer => "offers",
            ResourceType::Attachment => "attachments",
            ResourceType::PartitionKeyRange => "pkranges",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Some(match segment {
            "dbs" => ResourceType::Database,
            "colls" => ResourceType::Collection,
            "docs" => ResourceType::Document,
            "sprocs" => ResourceType::StoredProcedure,
            "triggers" => ResourceType::Trigger,
            "udfs" => ResourceType::UserDefinedFunction,
            "permissions" => ResourceType::Permission,
            "users" => ResourceType::User,
            "conflicts" => ResourceType::Conflict,
            "offers" => ResourceType::Offer,
            "attachments" => ResourceType::Attachment,
            "pkranges" => ResourceType::PartitionKeyRange,
            _ => return None,
        })
    }

    /// The resource type whose items contain feeds of this type, or `None` for account-level feeds.
    pub fn parent(&self) -> Option<ResourceType> {
        match self {
            ResourceType::Database | ResourceType::Offer => None,
            ResourceType::Collection | ResourceType::User => Some(ResourceType::Database),
            ResourceType::Document
            | ResourceType::StoredProcedure
            | ResourceType::Trigger
            | ResourceType::UserDefinedFunction
            | ResourceType::Conflict
            | ResourceType::PartitionKeyRange => Some(ResourceType::Collection),
            ResourceType::Permission => Some(ResourceType::User),
            ResourceType::Attachment => Some(ResourceType::Document),
        }
    }

    /// Server-side scripts.
    pub fn is_script(&self) -> bool {
        matches!(
            self,
            ResourceType::StoredProcedure
                | ResourceType::Trigger
                | ResourceType::UserDefinedFunction
        )
    }

    /// Resource types that live inside a collection and therefore share its session and
    /// partitioning.
    pub fn is_collection_child(&self) -> bool {
        let mut current = self.parent();
        while let Some(parent) = current {
            if parent == ResourceType::Collection {
                return true;
            }
            current = parent.parent();
        }
        false
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// How a link identifies its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addressing {
    /// By the user-assigned ids, e.g. `dbs/Orders/colls/Lines`.
    Name,
    /// By the service-assigned resource ids, e.g. `dbs/Zk5uAA==/colls/Zk5uAMSFmQA=`.
    ResourceId,
}

/// A link to a resource or a feed of resources.
///
/// A link either names a single item (`dbs/db1/colls/coll1`) or a feed of items under a parent
/// (`dbs/db1/colls/coll1/docs`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLink {
    parent: Option<String>,
    resource_type: ResourceType,
    item_id: Option<String>,
}

impl ResourceLink {
    /// A feed at the root of the account, such as `dbs` or `offers`.
    pub fn root(resource_type: ResourceType) -> Self {
        debug_assert!(resource_type.parent().is_none());
        Self {
            parent: None,
            resource_type,
            item_id: None,
        }
    }

    /// A feed of `resource_type` under the item this link names.
    pub fn feed(&self, resource_type: ResourceType) -> Self {
        Self {
            parent: Some(self.path()),
            resource_type,
            item_id: None,
        }
    }

    /// The item with the given id in the feed this link names.
    pub fn item(&self, item_id: impl Into<String>) -> Self {
        Self {
            parent: self.parent.clone(),
            resource_type: self.resource_type,
            item_id: Some(item_id.into()),
        }
    }

    /// Parses a resource path such as `dbs/db1/colls/coll1/docs/doc1` or `/dbs/db1/users/`.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::new(
                ErrorKind::Argument,
                format!("'{}' is not a valid resource path", path),
            ));
        }

        let mut link: Option<ResourceLink> = None;
        for chunk in segments.chunks(2) {
            let resource_type = ResourceType::from_path_segment(chunk[0]).ok_or_else(|| {
                Error::new(
                    ErrorKind::Argument,
                    format!("unknown resource type '{}' in path '{}'", chunk[0], path),
                )
            })?;

            let expected_parent = link.as_ref().map(|l| l.resource_type);
            if resource_type.parent() != expected_parent {
                return Err(Error::new(
                    ErrorKind::Argument,
                    format!(
                        "'{}' cannot appear at this position in path '{}'",
                        chunk[0], path
                    ),
                ));
            }

            let feed = match &link {
                Some(parent) => parent.feed(resource_type),
                None => ResourceLink::root(resource_type),
            };
            link = Some(match chunk.get(1) {
                Some(id) => feed.item(*id),
                None => feed,
            });
        }

        link.ok_or_else(|| Error::new(ErrorKind::Argument, "resource path is empty"))
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    /// Returns `true` if this link names a single item rather than a feed.
    pub fn is_item(&self) -> bool {
        self.item_id.is_some()
    }

    /// The full path of the link, without leading or trailing slashes.
    pub fn path(&self) -> String {
        let mut path = String::new();
        if let Some(parent) = &self.parent {
            path.push_str(parent);
            path.push('/');
        }
        path.push_str(self.resource_type.path_segment());
        if let Some(id) = &self.item_id {
            path.push('/');
            path.push_str(id);
        }
        path
    }

    /// The resource address used for authorization: the item path for item links, the parent
    /// path for feed links (empty for root feeds).
    pub fn resource_address(&self) -> String {
        match &self.item_id {
            Some(_) => self.path(),
            None => self.parent.clone().unwrap_or_default(),
        }
    }

    /// The link of the collection this link is in (or is), if any.
    pub fn collection_link(&self) -> Option<String> {
        let path = self.path();
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() >= 4 && segments[2] == ResourceType::Collection.path_segment() {
            Some(segments[..4].join("/"))
        } else {
            None
        }
    }

    /// Determines whether the ids in this link are user-assigned names or resource ids.
    pub fn addressing(&self) -> Addressing {
        if self.resource_type == ResourceType::Offer && self.parent.is_none() {
            return Addressing::ResourceId;
        }

        let path = self.path();
        match path.split('/').nth(1) {
            Some(database_id) if is_database_resource_id(database_id) => Addressing::ResourceId,
            _ => Addressing::Name,
        }
    }
}

impl fmt::Display for ResourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Database resource ids are the base64 form (with `/` written as `-`) of a 4-byte identifier.
fn is_database_resource_id(segment: &str) -> bool {
    let normalized = segment.replace('-', "/");
    base64::engine::general_purpose::STANDARD
        .decode(normalized.as_bytes())
        .map(|bytes| bytes.len() == 4)
        .unwrap_or(false)
}
