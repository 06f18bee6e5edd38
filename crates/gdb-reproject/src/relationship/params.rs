//! Relationship class parameters: sanitising, validation and the validated
//! value type passed to the store primitive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Simple or composite ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Simple,
    Composite,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Simple => "SIMPLE",
            RelationshipType::Composite => "COMPOSITE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SIMPLE" => Some(RelationshipType::Simple),
            "COMPOSITE" => Some(RelationshipType::Composite),
            _ => None,
        }
    }
}

/// Relationship cardinality in parameter vocabulary (`ONE_TO_MANY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "ONE_TO_ONE",
            Cardinality::OneToMany => "ONE_TO_MANY",
            Cardinality::ManyToMany => "MANY_TO_MANY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ONE_TO_ONE" => Some(Cardinality::OneToOne),
            "ONE_TO_MANY" => Some(Cardinality::OneToMany),
            "MANY_TO_MANY" => Some(Cardinality::ManyToMany),
            _ => None,
        }
    }

    /// Translate the collapsed store form (`ONETOMANY`, any case).
    pub fn from_collapsed(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ONETOONE" => Some(Cardinality::OneToOne),
            "ONETOMANY" => Some(Cardinality::OneToMany),
            "MANYTOMANY" => Some(Cardinality::ManyToMany),
            _ => None,
        }
    }
}

/// Whether the relationship is backed by a join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Attributed {
    None,
    Attributed,
}

impl Attributed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attributed::None => "NONE",
            Attributed::Attributed => "ATTRIBUTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(Attributed::None),
            "ATTRIBUTED" => Some(Attributed::Attributed),
            _ => None,
        }
    }

    pub fn from_flag(attributed: bool) -> Self {
        if attributed {
            Attributed::Attributed
        } else {
            Attributed::None
        }
    }
}

/// Message propagation between related objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageDirection {
    None,
    Forward,
    Backward,
    Both,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::None => "NONE",
            MessageDirection::Forward => "FORWARD",
            MessageDirection::Backward => "BACKWARD",
            MessageDirection::Both => "BOTH",
        }
    }

    /// Parse, case-insensitively. Accepts the store's `Forward` as well as
    /// the parameter form `FORWARD`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Some(MessageDirection::None),
            "FORWARD" => Some(MessageDirection::Forward),
            "BACKWARD" => Some(MessageDirection::Backward),
            "BOTH" => Some(MessageDirection::Both),
            _ => None,
        }
    }
}

macro_rules! impl_display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_as_str!(RelationshipType, Cardinality, Attributed, MessageDirection);

/// Unvalidated relationship parameters, as supplied by a caller.
///
/// Every field is optional; [`sanitize`] fills the defaults and
/// [`RelationshipParamsBuilder::build`] runs sanitise then validate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipParamsBuilder {
    pub relationship_type: Option<String>,
    pub cardinality: Option<String>,
    pub attributed: Option<String>,
    pub origin_primary_key: Option<String>,
    pub origin_foreign_key: Option<String>,
    pub destination_primary_key: Option<String>,
    pub destination_foreign_key: Option<String>,
    pub attributed_table: Option<String>,
    pub message_direction: Option<String>,
    pub notification: Option<String>,
    pub forward_label: Option<String>,
    pub backward_label: Option<String>,
}

macro_rules! setter {
    ($($name:ident),*) => {
        $(pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.$name = Some(value.into());
            self
        })*
    };
}

impl RelationshipParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(
        relationship_type,
        cardinality,
        attributed,
        origin_primary_key,
        origin_foreign_key,
        destination_primary_key,
        destination_foreign_key,
        attributed_table,
        message_direction,
        notification,
        forward_label,
        backward_label
    );

    /// Sanitise and validate.
    pub fn build(&self) -> std::result::Result<RelationshipClassParameters, ValidationError> {
        validate(&sanitize(self))
    }
}

/// Parameters after defaults and upper-casing, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedParams {
    pub relationship_type: String,
    pub cardinality: String,
    pub attributed: String,
    pub origin_primary_key: String,
    pub origin_foreign_key: String,
    pub destination_primary_key: String,
    pub destination_foreign_key: String,
    pub attributed_table: Option<String>,
    pub message_direction: String,
    pub notification: String,
    pub forward_label: String,
    pub backward_label: String,
}

fn enum_or(value: &Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_ascii_uppercase(),
        _ => default.to_string(),
    }
}

fn text_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Apply defaults and upper-case the enumerated fields.
///
/// Relationship type defaults to `SIMPLE`, cardinality to `ONE_TO_MANY`,
/// attribution, message direction and notification to `NONE`; keys and
/// labels default to the empty string and keep their case.
pub fn sanitize(raw: &RelationshipParamsBuilder) -> SanitizedParams {
    SanitizedParams {
        relationship_type: enum_or(&raw.relationship_type, "SIMPLE"),
        cardinality: enum_or(&raw.cardinality, "ONE_TO_MANY"),
        attributed: enum_or(&raw.attributed, "NONE"),
        origin_primary_key: text_or_empty(&raw.origin_primary_key),
        origin_foreign_key: text_or_empty(&raw.origin_foreign_key),
        destination_primary_key: text_or_empty(&raw.destination_primary_key),
        destination_foreign_key: text_or_empty(&raw.destination_foreign_key),
        attributed_table: raw.attributed_table.clone().filter(|t| !t.is_empty()),
        message_direction: enum_or(&raw.message_direction, "NONE"),
        notification: enum_or(&raw.notification, "NONE"),
        forward_label: text_or_empty(&raw.forward_label),
        backward_label: text_or_empty(&raw.backward_label),
    }
}

/// Check sanitised parameters, producing the validated value type.
pub fn validate(
    p: &SanitizedParams,
) -> std::result::Result<RelationshipClassParameters, ValidationError> {
    let relationship_type = RelationshipType::parse(&p.relationship_type)
        .ok_or_else(|| ValidationError::InvalidRelationshipType(p.relationship_type.clone()))?;
    let cardinality = Cardinality::parse(&p.cardinality)
        .ok_or_else(|| ValidationError::InvalidCardinality(p.cardinality.clone()))?;
    let attributed = Attributed::parse(&p.attributed)
        .ok_or_else(|| ValidationError::InvalidAttributed(p.attributed.clone()))?;
    let message_direction = MessageDirection::parse(&p.message_direction)
        .ok_or_else(|| ValidationError::InvalidMessageDirection(p.message_direction.clone()))?;
    let notification = MessageDirection::parse(&p.notification)
        .ok_or_else(|| ValidationError::InvalidMessageDirection(p.notification.clone()))?;

    if attributed == Attributed::Attributed && p.origin_foreign_key.is_empty() {
        return Err(ValidationError::MissingOriginForeignKey);
    }

    Ok(RelationshipClassParameters {
        relationship_type,
        cardinality,
        attributed,
        origin_primary_key: p.origin_primary_key.clone(),
        origin_foreign_key: p.origin_foreign_key.clone(),
        destination_primary_key: p.destination_primary_key.clone(),
        destination_foreign_key: p.destination_foreign_key.clone(),
        attributed_table: p.attributed_table.clone(),
        message_direction,
        notification,
        forward_label: p.forward_label.clone(),
        backward_label: p.backward_label.clone(),
    })
}

/// Validated relationship class parameters.
///
/// Only obtainable through [`RelationshipParamsBuilder::build`] or
/// [`validate`], so every instance satisfies the validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipClassParameters {
    relationship_type: RelationshipType,
    cardinality: Cardinality,
    attributed: Attributed,
    origin_primary_key: String,
    origin_foreign_key: String,
    destination_primary_key: String,
    destination_foreign_key: String,
    attributed_table: Option<String>,
    message_direction: MessageDirection,
    notification: MessageDirection,
    forward_label: String,
    backward_label: String,
}

impl RelationshipClassParameters {
    pub fn relationship_type(&self) -> RelationshipType {
        self.relationship_type
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn attributed(&self) -> Attributed {
        self.attributed
    }

    pub fn is_attributed(&self) -> bool {
        self.attributed == Attributed::Attributed
    }

    pub fn origin_primary_key(&self) -> &str {
        &self.origin_primary_key
    }

    pub fn origin_foreign_key(&self) -> &str {
        &self.origin_foreign_key
    }

    pub fn destination_primary_key(&self) -> &str {
        &self.destination_primary_key
    }

    pub fn destination_foreign_key(&self) -> &str {
        &self.destination_foreign_key
    }

    pub fn attributed_table(&self) -> Option<&str> {
        self.attributed_table.as_deref()
    }

    pub fn message_direction(&self) -> MessageDirection {
        self.message_direction
    }

    pub fn notification(&self) -> MessageDirection {
        self.notification
    }

    pub fn forward_label(&self) -> &str {
        &self.forward_label
    }

    pub fn backward_label(&self) -> &str {
        &self.backward_label
    }
}

impl Default for RelationshipClassParameters {
    fn default() -> Self {
        Self {
            relationship_type: RelationshipType::Simple,
            cardinality: Cardinality::OneToMany,
            attributed: Attributed::None,
            origin_primary_key: String::new(),
            origin_foreign_key: String::new(),
            destination_primary_key: String::new(),
            destination_foreign_key: String::new(),
            attributed_table: None,
            message_direction: MessageDirection::None,
            notification: MessageDirection::None,
            forward_label: String::new(),
            backward_label: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_applies_defaults() {
        let p = sanitize(&RelationshipParamsBuilder::new());
        assert_eq!(p.relationship_type, "SIMPLE");
        assert_eq!(p.cardinality, "ONE_TO_MANY");
        assert_eq!(p.attributed, "NONE");
        assert_eq!(p.message_direction, "NONE");
        assert_eq!(p.notification, "NONE");
        assert_eq!(p.origin_primary_key, "");
        assert_eq!(p.forward_label, "");
        assert_eq!(p.attributed_table, None);
    }

    #[test]
    fn test_sanitize_upper_cases_enums_not_keys() {
        let raw = RelationshipParamsBuilder::new()
            .relationship_type("composite")
            .cardinality("one_to_one")
            .attributed("attributed")
            .message_direction("forward")
            .origin_primary_key("BoroCode")
            .forward_label("Neighborhoods");
        let p = sanitize(&raw);
        assert_eq!(p.relationship_type, "COMPOSITE");
        assert_eq!(p.cardinality, "ONE_TO_ONE");
        assert_eq!(p.attributed, "ATTRIBUTED");
        assert_eq!(p.message_direction, "FORWARD");
        assert_eq!(p.origin_primary_key, "BoroCode");
        assert_eq!(p.forward_label, "Neighborhoods");
    }

    #[test]
    fn test_validate_accepts_every_enum_combination() {
        for rt in ["SIMPLE", "COMPOSITE"] {
            for card in ["ONE_TO_ONE", "ONE_TO_MANY", "MANY_TO_MANY"] {
                for attr in ["NONE", "ATTRIBUTED"] {
                    let params = RelationshipParamsBuilder::new()
                        .relationship_type(rt)
                        .cardinality(card)
                        .attributed(attr)
                        .origin_foreign_key("OBJECTID")
                        .build()
                        .unwrap();
                    assert_eq!(params.relationship_type().as_str(), rt);
                    assert_eq!(params.cardinality().as_str(), card);
                    assert_eq!(params.attributed().as_str(), attr);
                }
            }
        }
    }

    #[test]
    fn test_validate_rejects_with_named_errors() {
        let err = RelationshipParamsBuilder::new()
            .relationship_type("WEAK")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidRelationshipType("WEAK".into()));

        let err = RelationshipParamsBuilder::new()
            .cardinality("ONETOMANY")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidCardinality("ONETOMANY".into()));

        let err = RelationshipParamsBuilder::new()
            .attributed("YES")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidAttributed("YES".into()));

        let err = RelationshipParamsBuilder::new()
            .message_direction("SIDEWAYS")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidMessageDirection("SIDEWAYS".into()));
    }

    #[test]
    fn test_attributed_requires_origin_foreign_key() {
        let err = RelationshipParamsBuilder::new()
            .attributed("ATTRIBUTED")
            .origin_primary_key("BoroCode")
            .destination_foreign_key("BOROCODE")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingOriginForeignKey);
    }

    #[test]
    fn test_cardinality_from_collapsed() {
        assert_eq!(Cardinality::from_collapsed("OneToMany"), Some(Cardinality::OneToMany));
        assert_eq!(Cardinality::from_collapsed("manytomany"), Some(Cardinality::ManyToMany));
        assert_eq!(Cardinality::from_collapsed("ONE_TO_ONE"), None);
    }

    #[test]
    fn test_parameters_serialize_in_parameter_vocabulary() {
        let params = RelationshipClassParameters::default();
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"cardinality\":\"ONE_TO_MANY\""));
        assert!(json.contains("\"attributed\":\"NONE\""));
    }
}
