use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the citizen lost the item or found it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Lost,
    Found,
}

impl ReportKind {
    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Lost => "Lost Item",
            ReportKind::Found => "Found Item",
        }
    }

    /// Label of the location field, which depends on the kind of report
    pub fn location_label(&self) -> &'static str {
        match self {
            ReportKind::Lost => "Last Seen Location",
            ReportKind::Found => "Found Location",
        }
    }
}

/// Generic fallback subcategory permitted under every category
pub const OTHER_SUBCATEGORY: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Documents,
    Bags,
    #[serde(rename = "Personal Items")]
    PersonalItems,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Documents,
        Category::Bags,
        Category::PersonalItems,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Documents => "Documents",
            Category::Bags => "Bags",
            Category::PersonalItems => "Personal Items",
            Category::Other => "Other",
        }
    }

    /// Subcategories selectable under this category, "Other" always last
    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            Category::Electronics => &["Mobile Phone", "Laptop", "Camera", "Headphones", "Other"],
            Category::Documents => &["Wallet", "ID Card", "Passport", "Keys", "Other"],
            Category::Bags => &["Backpack", "Handbag", "Luggage", "Other"],
            Category::PersonalItems => &["Watch", "Jewelry", "Glasses", "Umbrella", "Other"],
            Category::Other => &[OTHER_SUBCATEGORY],
        }
    }

    pub fn permits(&self, subcategory: &str) -> bool {
        self.subcategories().contains(&subcategory)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.as_str()).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Supported cities. A draft always carries one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum City {
    #[default]
    Ujjain,
    Indore,
    Bhopal,
    Gwalior,
    Jabalpur,
}

impl City {
    pub const ALL: [City; 5] = [
        City::Ujjain,
        City::Indore,
        City::Bhopal,
        City::Gwalior,
        City::Jabalpur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            City::Ujjain => "Ujjain",
            City::Indore => "Indore",
            City::Bhopal => "Bhopal",
            City::Gwalior => "Gwalior",
            City::Jabalpur => "Jabalpur",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported city: {0}")]
pub struct UnknownCity(pub String);

impl FromStr for City {
    type Err = UnknownCity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_other_fallback() {
        for category in Category::ALL {
            assert!(category.permits(OTHER_SUBCATEGORY), "{category} lacks Other");
            assert_eq!(category.subcategories().last(), Some(&OTHER_SUBCATEGORY));
        }
    }

    #[test]
    fn test_subcategory_membership() {
        assert!(Category::Electronics.permits("Laptop"));
        assert!(!Category::Documents.permits("Laptop"));
        assert!(Category::Documents.permits("Passport"));
        assert!(!Category::Electronics.permits(""));
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Electronics".parse::<Category>(), Ok(Category::Electronics));
        assert_eq!(
            "personal items".parse::<Category>(),
            Ok(Category::PersonalItems)
        );
        assert!("Furniture".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_display_names() {
        let json = serde_json::to_string(&Category::PersonalItems).unwrap();
        assert_eq!(json, "\"Personal Items\"");
        let parsed: Category = serde_json::from_str("\"Bags\"").unwrap();
        assert_eq!(parsed, Category::Bags);
    }

    #[test]
    fn test_city_default_and_parsing() {
        assert_eq!(City::default(), City::Ujjain);
        assert_eq!("bhopal".parse::<City>(), Ok(City::Bhopal));
        assert!("Mumbai".parse::<City>().is_err());
    }

    #[test]
    fn test_report_kind_labels() {
        assert_eq!(ReportKind::default(), ReportKind::Lost);
        assert_eq!(ReportKind::Found.label(), "Found Item");
        assert_eq!(ReportKind::Lost.location_label(), "Last Seen Location");
    }
}
