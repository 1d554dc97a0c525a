//! Declared links between entity types.
//!
//! A [`RelationDef`] is the declaration; [`Relation`] is the resolved form
//! with both keys filled in. Keys that are not given explicitly are
//! inferred from the primary-key names of the two entities:
//!
//! | kind | local | foreign |
//! |---|---|---|
//! | `belongsTo` | `<foreign>_<foreign pk>` | foreign pk |
//! | others | owner pk | `<owner>_<owner pk>` |

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    HasManyToMany,
    /// The link is carried by an array column on one of the two sides.
    HasManyList,
}

impl RelationKind {
    /// Whether the relation resolves to a list of records.
    #[must_use]
    pub const fn is_multiple(self) -> bool {
        !matches!(self, Self::BelongsTo | Self::HasOne)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongsTo",
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
            Self::HasManyToMany => "hasManyToMany",
            Self::HasManyList => "hasManyList",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The join entity of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    entity: String,
    local: Option<String>,
    foreign: Option<String>,
}

impl LinkDef {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            local: None,
            foreign: None,
        }
    }

    /// Owner column matched by the link rows.
    #[must_use]
    pub fn local(mut self, key: impl Into<String>) -> Self {
        self.local = Some(key.into());
        self
    }

    /// Link-row column holding the owner key.
    #[must_use]
    pub fn foreign(mut self, key: impl Into<String>) -> Self {
        self.foreign = Some(key.into());
        self
    }
}

/// A relation declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    kind: RelationKind,
    entity: String,
    local: Option<String>,
    foreign: Option<String>,
    link: Option<LinkDef>,
}

impl RelationDef {
    fn of(kind: RelationKind, entity: impl Into<String>) -> Self {
        Self {
            kind,
            entity: entity.into(),
            local: None,
            foreign: None,
            link: None,
        }
    }

    pub fn belongs_to(entity: impl Into<String>) -> Self {
        Self::of(RelationKind::BelongsTo, entity)
    }

    pub fn has_one(entity: impl Into<String>) -> Self {
        Self::of(RelationKind::HasOne, entity)
    }

    pub fn has_many(entity: impl Into<String>) -> Self {
        Self::of(RelationKind::HasMany, entity)
    }

    pub fn has_many_list(entity: impl Into<String>) -> Self {
        Self::of(RelationKind::HasManyList, entity)
    }

    /// Many-to-many through the rows of `link`. The relation's own keys
    /// describe the second hop: link-row column → foreign column.
    pub fn has_many_to_many(entity: impl Into<String>, link: LinkDef) -> Self {
        Self {
            link: Some(link),
            ..Self::of(RelationKind::HasManyToMany, entity)
        }
    }

    #[must_use]
    pub fn local(mut self, key: impl Into<String>) -> Self {
        self.local = Some(key.into());
        self
    }

    #[must_use]
    pub fn foreign(mut self, key: impl Into<String>) -> Self {
        self.foreign = Some(key.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }
}

/// A resolved relation, shared by every record of the owning entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    /// Owning entity.
    pub entity: String,
    pub foreign_entity: String,
    /// Column read from the owning row (or from the link rows).
    pub local: String,
    /// Column matched on the foreign rows.
    pub foreign: String,
    /// Primary-key name of the foreign entity; identifies related records.
    pub foreign_primary: String,
    /// First hop of a many-to-many relation.
    pub link: Option<Box<Relation>>,
    pub multiple: bool,
}

fn generate_key(entity: &str, primary: &str, full: bool) -> String {
    if full {
        format!("{}_{}", entity.to_lowercase(), primary)
    } else {
        primary.to_string()
    }
}

impl Relation {
    /// Resolves `def` declared as `name` on `owner`. `primaries` maps every
    /// registered entity to its primary-key name.
    pub fn resolve(
        name: &str,
        owner: &str,
        def: &RelationDef,
        primaries: &HashMap<String, String>,
    ) -> ModelResult<Self> {
        let primary_of = |entity: &str| {
            primaries
                .get(entity)
                .cloned()
                .ok_or_else(|| ModelError::UnknownEntity(entity.to_string()))
        };
        let owner_pk = primary_of(owner)?;
        let foreign_pk = primary_of(&def.entity)?;

        let link = match &def.link {
            Some(link_def) => {
                let link_pk = primary_of(&link_def.entity)?;
                Some(Box::new(Self {
                    name: format!("{name}.{}", link_def.entity),
                    kind: RelationKind::HasMany,
                    entity: owner.to_string(),
                    foreign_entity: link_def.entity.clone(),
                    local: link_def
                        .local
                        .clone()
                        .unwrap_or_else(|| generate_key(owner, &owner_pk, false)),
                    foreign: link_def
                        .foreign
                        .clone()
                        .unwrap_or_else(|| generate_key(owner, &owner_pk, true)),
                    foreign_primary: link_pk,
                    link: None,
                    multiple: true,
                }))
            }
            None => None,
        };

        let belongs_style = def.kind == RelationKind::BelongsTo || link.is_some();
        let (local, foreign) = if belongs_style {
            (
                generate_key(&def.entity, &foreign_pk, true),
                generate_key(&def.entity, &foreign_pk, false),
            )
        } else {
            (
                generate_key(owner, &owner_pk, false),
                generate_key(owner, &owner_pk, true),
            )
        };

        Ok(Self {
            name: name.to_string(),
            kind: def.kind,
            entity: owner.to_string(),
            foreign_entity: def.entity.clone(),
            local: def.local.clone().unwrap_or(local),
            foreign: def.foreign.clone().unwrap_or(foreign),
            foreign_primary: foreign_pk,
            link,
            multiple: def.kind.is_multiple(),
        })
    }
}
