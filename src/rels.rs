//! Relationships between package parts.
//!
//! Every part that references another part owns a [`Relationships`] registry, which is
//! serialized to the part's `_rels/*.rels` companion. The registry is the only place
//! relationship ids are issued, so ids are unique within a part by construction.
use crate::types::{Result, XlsxError};
use crate::xml::{Attr, ToXml, XmlWriter, NS_PACKAGE_RELATIONSHIPS};
use std::fmt;
use tracing::debug;

/// Relationship types this crate knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    OfficeDocument,
    CoreProperties,
    ExtendedProperties,
    Worksheet,
    Styles,
    SharedStrings,
    Theme,
    Drawing,
    Chart,
    Image,
    Hyperlink,
    Table,
    Comments,
    VmlDrawing,
}

impl RelationshipType {
    pub fn uri(&self) -> &'static str {
        match self {
            RelationshipType::OfficeDocument => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument"
            }
            RelationshipType::CoreProperties => {
                "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties"
            }
            RelationshipType::ExtendedProperties => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties"
            }
            RelationshipType::Worksheet => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet"
            }
            RelationshipType::Styles => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles"
            }
            RelationshipType::SharedStrings => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings"
            }
            RelationshipType::Theme => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme"
            }
            RelationshipType::Drawing => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing"
            }
            RelationshipType::Chart => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart"
            }
            RelationshipType::Image => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image"
            }
            RelationshipType::Hyperlink => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink"
            }
            RelationshipType::Table => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/table"
            }
            RelationshipType::Comments => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments"
            }
            RelationshipType::VmlDrawing => {
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing"
            }
        }
    }

    /// Only hyperlinks may point outside the package.
    pub fn allows_external(&self) -> bool {
        matches!(self, RelationshipType::Hyperlink)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    #[default]
    Internal,
    External,
}

/// Relationship id issued by a [`Relationships`] registry (`rId1`, `rId2`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipId(u32);

impl RelationshipId {
    pub const PREFIX: &'static str = "rId";

    /// The 1-based sequence number behind the id
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

/// A typed reference from the owning part to `target`.
///
/// A relationship has no id of its own; the id is issued when it is pushed into a
/// registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    rel_type: RelationshipType,
    target: String,
    target_mode: TargetMode,
}

impl Relationship {
    /// Create an internal relationship. `target` is relative to the owning part.
    pub fn new(rel_type: RelationshipType, target: impl Into<String>) -> Result<Self> {
        Self::with_mode(rel_type, target, TargetMode::Internal)
    }

    /// Create an external relationship (hyperlinks only).
    pub fn external(rel_type: RelationshipType, target: impl Into<String>) -> Result<Self> {
        Self::with_mode(rel_type, target, TargetMode::External)
    }

    pub fn with_mode(
        rel_type: RelationshipType,
        target: impl Into<String>,
        target_mode: TargetMode,
    ) -> Result<Self> {
        let target = target.into();

        if target.trim().is_empty() {
            return Err(XlsxError::validation(
                "Relationship.target",
                "target cannot be empty",
            ));
        }

        if target_mode == TargetMode::External && !rel_type.allows_external() {
            return Err(XlsxError::validation(
                "Relationship.target_mode",
                format!("{:?} relationships cannot be external", rel_type),
            ));
        }

        Ok(Self {
            rel_type,
            target,
            target_mode,
        })
    }

    #[inline]
    pub fn rel_type(&self) -> RelationshipType {
        self.rel_type
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub fn target_mode(&self) -> TargetMode {
        self.target_mode
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == TargetMode::External
    }
}

/// Ordered relationship registry for a single source part.
///
/// Ids come from an append-only counter: with no removals the n-th pushed
/// relationship is `rId{n}`, and a removed id is never handed out again.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    entries: Vec<(RelationshipId, Relationship)>,
    issued: u32,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `rel` and return the id issued for it.
    pub fn push(&mut self, rel: Relationship) -> RelationshipId {
        self.issued += 1;
        let id = RelationshipId(self.issued);
        debug!(id = %id, rel_type = ?rel.rel_type, target = %rel.target, "relationship added");
        self.entries.push((id, rel));
        id
    }

    /// Shorthand for pushing a freshly validated internal relationship.
    pub fn add(
        &mut self,
        rel_type: RelationshipType,
        target: impl Into<String>,
    ) -> Result<RelationshipId> {
        Ok(self.push(Relationship::new(rel_type, target)?))
    }

    pub fn get(&self, id: RelationshipId) -> Option<&Relationship> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, rel)| rel)
    }

    /// Id of the first relationship of `rel_type` pointing at `target`.
    pub fn find(&self, rel_type: RelationshipType, target: &str) -> Option<RelationshipId> {
        self.entries
            .iter()
            .find(|(_, rel)| rel.rel_type == rel_type && rel.target == target)
            .map(|(id, _)| *id)
    }

    pub fn remove(&mut self, id: RelationshipId) -> Option<Relationship> {
        let pos = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        debug!(id = %id, "relationship removed");
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RelationshipId, &Relationship)> {
        self.entries.iter().map(|(id, rel)| (*id, rel))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ToXml for Relationships {
    fn to_xml(&self, xml: &mut XmlWriter) {
        xml.declaration();
        xml.element(
            "Relationships",
            &[("xmlns", Attr::Str(NS_PACKAGE_RELATIONSHIPS))],
            |xml| {
                for (id, rel) in &self.entries {
                    let id = id.to_string();
                    let mut attrs = vec![
                        ("Id", Attr::Str(&id)),
                        ("Type", Attr::Str(rel.rel_type.uri())),
                        ("Target", Attr::Str(&rel.target)),
                    ];
                    if rel.is_external() {
                        attrs.push(("TargetMode", Attr::Str("External")));
                    }
                    xml.empty("Relationship", &attrs);
                }
            },
        );
    }
}
