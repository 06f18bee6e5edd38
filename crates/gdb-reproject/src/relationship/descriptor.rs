//! Relationship descriptor extraction from the store's own description.

use std::path::Path;

use serde::Serialize;

use crate::core::schema::RelationshipDescription;
use crate::core::traits::GeoStore;
use crate::error::{MigrateError, Result};

use super::params::{
    Attributed, Cardinality, MessageDirection, RelationshipClassParameters,
    RelationshipParamsBuilder, RelationshipType,
};

/// Declared role of a relationship key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    OriginPrimary,
    OriginForeign,
    DestinationPrimary,
    DestinationForeign,
}

impl KeyRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OriginPrimary" => Some(KeyRole::OriginPrimary),
            "OriginForeign" => Some(KeyRole::OriginForeign),
            "DestinationPrimary" => Some(KeyRole::DestinationPrimary),
            "DestinationForeign" => Some(KeyRole::DestinationForeign),
            _ => None,
        }
    }
}

/// Structural metadata of one source relationship class, translated into
/// parameter vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub origin_class_name: String,
    pub destination_class_name: String,
    pub cardinality: Cardinality,
    pub is_composite: bool,
    pub is_attributed: bool,
    pub forward_label: String,
    pub backward_label: String,
    pub message_direction: MessageDirection,
    pub origin_primary_key: String,
    pub origin_foreign_key: String,
    pub destination_primary_key: String,
    pub destination_foreign_key: String,
    /// Join table name, set only for attributed relationships.
    pub attributed_table: Option<String>,
}

fn single_class(relationship: &str, role: &str, classes: &[String]) -> Result<String> {
    match classes {
        [only] => Ok(only.clone()),
        [] => Err(MigrateError::not_found(
            format!("{} class of relationship", role),
            relationship.to_string(),
        )),
        many => Err(MigrateError::Ambiguity {
            relationship: relationship.to_string(),
            role: role.to_string(),
            classes: many.to_vec(),
        }),
    }
}

impl RelationshipDescriptor {
    /// Read and extract the relationship class at `path`.
    pub fn read(store: &dyn GeoStore, path: &Path) -> Result<Self> {
        Self::extract(&store.describe_relationship(path)?)
    }

    /// Translate a store description.
    ///
    /// Fails with [`MigrateError::Ambiguity`] when more than one origin or
    /// destination class is named and [`MigrateError::Translation`] for an
    /// unknown cardinality or notification value.
    pub fn extract(desc: &RelationshipDescription) -> Result<Self> {
        let origin_class_name = single_class(&desc.name, "origin", &desc.origin_class_names)?;
        let destination_class_name =
            single_class(&desc.name, "destination", &desc.destination_class_names)?;

        let cardinality = Cardinality::from_collapsed(&desc.cardinality).ok_or_else(|| {
            MigrateError::Translation {
                field: "cardinality".into(),
                value: desc.cardinality.clone(),
            }
        })?;
        let message_direction = MessageDirection::parse(&desc.notification).ok_or_else(|| {
            MigrateError::Translation {
                field: "notification".into(),
                value: desc.notification.clone(),
            }
        })?;

        let mut descriptor = Self {
            name: desc.name.clone(),
            origin_class_name,
            destination_class_name,
            cardinality,
            is_composite: desc.is_composite,
            is_attributed: desc.is_attributed,
            forward_label: desc.forward_path_label.clone(),
            backward_label: desc.backward_path_label.clone(),
            message_direction,
            origin_primary_key: String::new(),
            origin_foreign_key: String::new(),
            destination_primary_key: String::new(),
            destination_foreign_key: String::new(),
            attributed_table: None,
        };

        // Keys with an unexpected role stay unassigned
        for key in desc
            .origin_class_keys
            .iter()
            .chain(desc.destination_class_keys.iter())
        {
            let slot = match KeyRole::parse(&key.role) {
                Some(KeyRole::OriginPrimary) => &mut descriptor.origin_primary_key,
                Some(KeyRole::OriginForeign) => &mut descriptor.origin_foreign_key,
                Some(KeyRole::DestinationPrimary) => &mut descriptor.destination_primary_key,
                Some(KeyRole::DestinationForeign) => &mut descriptor.destination_foreign_key,
                None => continue,
            };
            *slot = key.field.clone();
        }

        if desc.is_attributed {
            descriptor.attributed_table = Some(
                desc.attributed_table
                    .clone()
                    .unwrap_or_else(|| desc.name.clone()),
            );
        }

        Ok(descriptor)
    }

    /// Parameters that recreate this relationship.
    pub fn to_parameters(&self) -> Result<RelationshipClassParameters> {
        let relationship_type = if self.is_composite {
            RelationshipType::Composite
        } else {
            RelationshipType::Simple
        };

        let mut builder = RelationshipParamsBuilder::new()
            .relationship_type(relationship_type.as_str())
            .cardinality(self.cardinality.as_str())
            .attributed(Attributed::from_flag(self.is_attributed).as_str())
            .message_direction(self.message_direction.as_str())
            .notification(self.message_direction.as_str())
            .forward_label(self.forward_label.as_str())
            .backward_label(self.backward_label.as_str())
            .origin_primary_key(self.origin_primary_key.as_str())
            .origin_foreign_key(self.origin_foreign_key.as_str())
            .destination_primary_key(self.destination_primary_key.as_str())
            .destination_foreign_key(self.destination_foreign_key.as_str());
        if let Some(ref table) = self.attributed_table {
            builder = builder.attributed_table(table.as_str());
        }

        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ClassKey;

    fn description() -> RelationshipDescription {
        RelationshipDescription {
            name: "Boroughs_Neighborhoods_Rel".into(),
            data_type: "RelationshipClass".into(),
            origin_class_names: vec!["nybb".into()],
            destination_class_names: vec!["NEIGHBORHOODS".into()],
            cardinality: "OneToMany".into(),
            is_composite: false,
            is_attributed: false,
            forward_path_label: "Neighborhoods".into(),
            backward_path_label: "Borough".into(),
            notification: "Forward".into(),
            origin_class_keys: vec![
                ClassKey::new("BoroCode", "OriginPrimary"),
                ClassKey::new("BOROCODE", "OriginForeign"),
            ],
            destination_class_keys: vec![],
            attributed_table: None,
        }
    }

    #[test]
    fn test_extract_simple_relationship() {
        let d = RelationshipDescriptor::extract(&description()).unwrap();
        assert_eq!(d.origin_class_name, "nybb");
        assert_eq!(d.destination_class_name, "NEIGHBORHOODS");
        assert_eq!(d.cardinality, Cardinality::OneToMany);
        assert_eq!(d.message_direction, MessageDirection::Forward);
        assert_eq!(d.origin_primary_key, "BoroCode");
        assert_eq!(d.origin_foreign_key, "BOROCODE");
        assert_eq!(d.destination_primary_key, "");
        assert_eq!(d.destination_foreign_key, "");
        assert_eq!(d.attributed_table, None);
    }

    #[test]
    fn test_cardinality_translation() {
        for (store, expected) in [
            ("OneToOne", "ONE_TO_ONE"),
            ("ONETOMANY", "ONE_TO_MANY"),
            ("manytomany", "MANY_TO_MANY"),
        ] {
            let mut desc = description();
            desc.cardinality = store.into();
            let d = RelationshipDescriptor::extract(&desc).unwrap();
            assert_eq!(d.cardinality.as_str(), expected);
        }

        let mut desc = description();
        desc.cardinality = "OneToSome".into();
        let err = RelationshipDescriptor::extract(&desc).unwrap_err();
        assert!(matches!(err, MigrateError::Translation { ref field, .. } if field == "cardinality"));
    }

    #[test]
    fn test_two_origins_is_ambiguous() {
        let mut desc = description();
        desc.origin_class_names = vec!["nybb".into(), "nybbwi".into()];
        let err = RelationshipDescriptor::extract(&desc).unwrap_err();
        match err {
            MigrateError::Ambiguity { role, classes, .. } => {
                assert_eq!(role, "origin");
                assert_eq!(classes.len(), 2);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_two_destinations_is_ambiguous() {
        let mut desc = description();
        desc.destination_class_names = vec!["A".into(), "B".into()];
        assert!(matches!(
            RelationshipDescriptor::extract(&desc),
            Err(MigrateError::Ambiguity { .. })
        ));
    }

    #[test]
    fn test_attributed_adds_join_table() {
        let mut desc = description();
        desc.is_attributed = true;
        desc.cardinality = "ManyToMany".into();
        desc.destination_class_keys = vec![
            ClassKey::new("BOROCODE", "DestinationPrimary"),
            ClassKey::new("HoodFK", "DestinationForeign"),
        ];
        let d = RelationshipDescriptor::extract(&desc).unwrap();
        assert_eq!(d.attributed_table.as_deref(), Some("Boroughs_Neighborhoods_Rel"));
        assert_eq!(d.destination_primary_key, "BOROCODE");
        assert_eq!(d.destination_foreign_key, "HoodFK");

        let params = d.to_parameters().unwrap();
        assert!(params.is_attributed());
        assert_eq!(params.cardinality(), Cardinality::ManyToMany);
    }

    #[test]
    fn test_unknown_key_role_is_ignored() {
        let mut desc = description();
        desc.origin_class_keys.push(ClassKey::new("GLOBALID", "Mystery"));
        let d = RelationshipDescriptor::extract(&desc).unwrap();
        assert_eq!(d.origin_primary_key, "BoroCode");
    }

    #[test]
    fn test_to_parameters_composite() {
        let mut desc = description();
        desc.is_composite = true;
        let params = RelationshipDescriptor::extract(&desc)
            .unwrap()
            .to_parameters()
            .unwrap();
        assert_eq!(params.relationship_type(), RelationshipType::Composite);
        assert_eq!(params.message_direction(), MessageDirection::Forward);
        assert_eq!(params.forward_label(), "Neighborhoods");
    }
}
