//! Target schema of the POD print template.
//!
//! The schema is static: ten fields in a fixed output order, eight of them
//! required. Three fields carry a closed value domain:
//!
//! - [`FieldKey::PaperType`] - paper stock specifications
//! - [`FieldKey::BindingStyle`] - `Limp` or `Cased`
//! - [`FieldKey::Lamination`] - `Gloss`, `Matt` or `None`
//!
//! Field keys are a closed enumeration, so maps keyed by [`FieldKey`] can
//! never reference a field that does not exist.

use serde::{Deserialize, Serialize};

// =============================================================================
// Value Domains
// =============================================================================

/// Allowed paper types.
pub const PAPER_TYPES: &[&str] = &[
    "Amber Preprint 80 gsm",
    "Woodfree 80 gsm",
    "Munken Print Cream 70 gsm",
    "Munken Print Cream 80 gsm",
    "Navigator 80 gsm",
    "LetsGo Silk 90 gsm",
    "Matt 115 gsm",
    "Holmen Book Cream 60 gsm",
    "Enso 70 gsm",
    "Holmen Bulky 52 gsm",
    "Holmen Book 55 gsm",
    "Holmen Cream 65 gsm",
    "Holmen Book 52 gsm",
    "Premium Mono 90 gsm",
    "Premium Colour 90 gsm",
];

/// Allowed binding styles.
pub const BINDING_STYLES: &[&str] = &["Limp", "Cased"];

/// Allowed lamination finishes.
pub const LAMINATIONS: &[&str] = &["Gloss", "Matt", "None"];

/// Maximum title length accepted by the print template.
pub const MAX_TITLE_LENGTH: usize = 58;

/// Length of an ISBN-13 once separators are stripped.
pub const ISBN_LENGTH: usize = 13;

// =============================================================================
// Field Key
// =============================================================================

/// Identity of a schema field.
///
/// Declaration order is the canonical output order, so `Ord` on this type
/// sorts fields the way the exported sheet lays them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKey {
    #[serde(rename = "ISBN")]
    Isbn,
    #[serde(rename = "Title")]
    Title,
    #[serde(rename = "Trim Height")]
    TrimHeight,
    #[serde(rename = "Trim Width")]
    TrimWidth,
    #[serde(rename = "Paper Type")]
    PaperType,
    #[serde(rename = "Binding Style")]
    BindingStyle,
    #[serde(rename = "Page Extent")]
    PageExtent,
    #[serde(rename = "Lamination")]
    Lamination,
    #[serde(rename = "Plate Section 1")]
    PlateSection1,
    #[serde(rename = "Plate Section 2")]
    PlateSection2,
}

impl FieldKey {
    /// All keys in output order.
    pub const ALL: [FieldKey; 10] = [
        FieldKey::Isbn,
        FieldKey::Title,
        FieldKey::TrimHeight,
        FieldKey::TrimWidth,
        FieldKey::PaperType,
        FieldKey::BindingStyle,
        FieldKey::PageExtent,
        FieldKey::Lamination,
        FieldKey::PlateSection1,
        FieldKey::PlateSection2,
    ];

    /// The key as it appears in configuration documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isbn => "ISBN",
            Self::Title => "Title",
            Self::TrimHeight => "Trim Height",
            Self::TrimWidth => "Trim Width",
            Self::PaperType => "Paper Type",
            Self::BindingStyle => "Binding Style",
            Self::PageExtent => "Page Extent",
            Self::Lamination => "Lamination",
            Self::PlateSection1 => "Plate Section 1",
            Self::PlateSection2 => "Plate Section 2",
        }
    }

    /// Parse a key string. Exact match only; unknown keys yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Static definition of this field.
    pub fn field(&self) -> &'static SchemaField {
        // SCHEMA is declared in key order
        &SCHEMA[*self as usize]
    }

    pub fn label(&self) -> &'static str {
        self.field().label
    }

    pub fn is_required(&self) -> bool {
        self.field().required
    }

    /// Closed set of canonical values, if the field has one.
    pub fn value_domain(&self) -> Option<&'static [&'static str]> {
        self.field().value_domain
    }

    pub fn has_value_domain(&self) -> bool {
        self.field().value_domain.is_some()
    }

    /// Fields validated as strictly positive numbers.
    pub fn is_positive_numeric(&self) -> bool {
        matches!(self, Self::TrimHeight | Self::TrimWidth | Self::PageExtent)
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Schema Field
// =============================================================================

/// One canonical output column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub key: FieldKey,
    pub label: &'static str,
    pub required: bool,
    /// 1-based output position, unique across the schema.
    pub order: u8,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_domain: Option<&'static [&'static str]>,
}

const PLATE_SECTION_DESCRIPTION: &str = "Optional: Insert after p[page]-[pages]pp-[paper type]";

/// The schema, in output order.
pub static SCHEMA: [SchemaField; 10] = [
    SchemaField {
        key: FieldKey::Isbn,
        label: "ISBN",
        required: true,
        order: 1,
        description: "13-digit ISBN number",
        value_domain: None,
    },
    SchemaField {
        key: FieldKey::Title,
        label: "Title",
        required: true,
        order: 2,
        description: "Book title (max 58 characters)",
        value_domain: None,
    },
    SchemaField {
        key: FieldKey::TrimHeight,
        label: "Trim Height",
        required: true,
        order: 3,
        description: "Height in mm",
        value_domain: None,
    },
    SchemaField {
        key: FieldKey::TrimWidth,
        label: "Trim Width",
        required: true,
        order: 4,
        description: "Width in mm",
        value_domain: None,
    },
    SchemaField {
        key: FieldKey::PaperType,
        label: "Paper Type",
        required: true,
        order: 5,
        description: "Paper specification",
        value_domain: Some(PAPER_TYPES),
    },
    SchemaField {
        key: FieldKey::BindingStyle,
        label: "Binding Style",
        required: true,
        order: 6,
        description: "Limp or Cased",
        value_domain: Some(BINDING_STYLES),
    },
    SchemaField {
        key: FieldKey::PageExtent,
        label: "Page Extent",
        required: true,
        order: 7,
        description: "Number of pages",
        value_domain: None,
    },
    SchemaField {
        key: FieldKey::Lamination,
        label: "Lamination",
        required: true,
        order: 8,
        description: "Gloss, Matt, or None",
        value_domain: Some(LAMINATIONS),
    },
    SchemaField {
        key: FieldKey::PlateSection1,
        label: "Plate Section 1",
        required: false,
        order: 9,
        description: PLATE_SECTION_DESCRIPTION,
        value_domain: None,
    },
    SchemaField {
        key: FieldKey::PlateSection2,
        label: "Plate Section 2",
        required: false,
        order: 10,
        description: PLATE_SECTION_DESCRIPTION,
        value_domain: None,
    },
];

// =============================================================================
// Registry Queries
// =============================================================================

/// All fields sorted by output order.
pub fn fields() -> impl Iterator<Item = &'static SchemaField> {
    SCHEMA.iter()
}

/// Look up a field by its key string.
pub fn field(key: &str) -> Option<&'static SchemaField> {
    FieldKey::from_key(key).map(|k| k.field())
}

/// Required fields in output order.
pub fn required_fields() -> impl Iterator<Item = &'static SchemaField> {
    SCHEMA.iter().filter(|f| f.required)
}

/// Fields that declare a closed value domain.
pub fn domain_fields() -> impl Iterator<Item = &'static SchemaField> {
    SCHEMA.iter().filter(|f| f.value_domain.is_some())
}

/// Number of required fields.
pub fn required_count() -> usize {
    required_fields().count()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_declared_in_key_order() {
        for (i, field) in SCHEMA.iter().enumerate() {
            assert_eq!(field.key as usize, i);
            assert_eq!(field.order as usize, i + 1);
            assert_eq!(field.key.as_str(), field.label);
        }
    }

    #[test]
    fn test_required_and_domain_subsets() {
        assert_eq!(required_count(), 8);
        let domains: Vec<FieldKey> = domain_fields().map(|f| f.key).collect();
        assert_eq!(
            domains,
            vec![FieldKey::PaperType, FieldKey::BindingStyle, FieldKey::Lamination]
        );
        assert!(!FieldKey::PlateSection1.is_required());
    }

    #[test]
    fn test_from_key_is_exact() {
        assert_eq!(FieldKey::from_key("Trim Height"), Some(FieldKey::TrimHeight));
        assert_eq!(FieldKey::from_key("trim height"), None);
        assert!(field("Colour").is_none());
    }

    #[test]
    fn test_key_serializes_as_label() {
        let json = serde_json::to_string(&FieldKey::BindingStyle).unwrap();
        assert_eq!(json, "\"Binding Style\"");
        let parsed: FieldKey = serde_json::from_str("\"Plate Section 2\"").unwrap();
        assert_eq!(parsed, FieldKey::PlateSection2);
    }

    #[test]
    fn test_domains() {
        assert_eq!(FieldKey::PaperType.value_domain().map(|d| d.len()), Some(15));
        assert_eq!(FieldKey::Lamination.value_domain(), Some(LAMINATIONS));
        assert!(FieldKey::Title.value_domain().is_none());
    }
}
