//! In-progress report data and the rules for editing it.

use crate::analysis::AnalysisSuggestion;
use crate::taxonomy::{Category, City, ReportKind};
use crate::validation::FieldErrors;
use base64::Engine;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DraftField {
    Kind,
    Category,
    Subcategory,
    Title,
    Description,
    Location,
    City,
    SerialNumber,
    Tags,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Invalid report details: {0}")]
    Validation(FieldErrors<DraftField>),
}

impl DraftError {
    fn single(field: DraftField, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field, message);
        DraftError::Validation(errors)
    }

    pub fn field_errors(&self) -> &FieldErrors<DraftField> {
        match self {
            DraftError::Validation(errors) => errors,
        }
    }
}

/// Photo of the item as uploaded by the user
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    bytes: Vec<u8>,
    mime_type: String,
    file_name: Option<String>,
}

impl std::fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl ImageAttachment {
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Result<Self, DraftError> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(DraftError::single(
                DraftField::Image,
                "Please choose an image file.",
            ));
        }
        if bytes.is_empty() {
            return Err(DraftError::single(DraftField::Image, "The image file is empty."));
        }
        Ok(Self {
            bytes,
            mime_type,
            file_name: None,
        })
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URL usable directly as an image source
    pub fn preview_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// A single user edit to the draft
#[derive(Debug, Clone, PartialEq)]
pub enum DraftEdit {
    Kind(ReportKind),
    Category(Option<Category>),
    Subcategory(String),
    Title(String),
    Description(String),
    Location(String),
    City(City),
    SerialNumber(String),
    Tags(String),
    AttachImage(ImageAttachment),
    RemoveImage,
}

impl DraftEdit {
    pub fn field(&self) -> DraftField {
        match self {
            DraftEdit::Kind(_) => DraftField::Kind,
            DraftEdit::Category(_) => DraftField::Category,
            DraftEdit::Subcategory(_) => DraftField::Subcategory,
            DraftEdit::Title(_) => DraftField::Title,
            DraftEdit::Description(_) => DraftField::Description,
            DraftEdit::Location(_) => DraftField::Location,
            DraftEdit::City(_) => DraftField::City,
            DraftEdit::SerialNumber(_) => DraftField::SerialNumber,
            DraftEdit::Tags(_) => DraftField::Tags,
            DraftEdit::AttachImage(_) | DraftEdit::RemoveImage => DraftField::Image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportDraft {
    kind: ReportKind,
    category: Option<Category>,
    subcategory: String,
    title: String,
    description: String,
    location: String,
    city: City,
    serial_number: String,
    tags: String,
    image: Option<ImageAttachment>,
    image_preview: Option<String>,
}

impl ReportDraft {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn city(&self) -> City {
        self.city
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Raw comma-separated keyword text as entered
    pub fn tags_text(&self) -> &str {
        &self.tags
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    pub fn image_preview(&self) -> Option<&str> {
        self.image_preview.as_deref()
    }

    /// Subcategories the user may currently choose from; empty until a
    /// category is selected
    pub fn available_subcategories(&self) -> &'static [&'static str] {
        self.category.map(|c| c.subcategories()).unwrap_or(&[])
    }

    pub fn apply_edit(&mut self, edit: DraftEdit) -> Result<(), DraftError> {
        match edit {
            DraftEdit::Kind(kind) => self.kind = kind,
            DraftEdit::Category(category) => self.set_category(category),
            DraftEdit::Subcategory(subcategory) => self.set_subcategory(subcategory)?,
            DraftEdit::Title(title) => self.title = title,
            DraftEdit::Description(description) => self.description = description,
            DraftEdit::Location(location) => self.location = location,
            DraftEdit::City(city) => self.city = city,
            DraftEdit::SerialNumber(serial) => self.serial_number = serial,
            DraftEdit::Tags(tags) => self.tags = tags,
            DraftEdit::AttachImage(image) => {
                self.image_preview = Some(image.preview_data_url());
                self.image = Some(image);
            }
            DraftEdit::RemoveImage => {
                self.image = None;
                self.image_preview = None;
            }
        }
        Ok(())
    }

    /// Change the category, keeping the subcategory only when the new
    /// category still permits it
    fn set_category(&mut self, category: Option<Category>) {
        let keep = category.is_some_and(|c| c.permits(&self.subcategory));
        if !keep && !self.subcategory.is_empty() {
            log::debug!(
                "Clearing subcategory '{}' after category change",
                self.subcategory
            );
            self.subcategory.clear();
        }
        self.category = category;
    }

    fn set_subcategory(&mut self, subcategory: String) -> Result<(), DraftError> {
        if subcategory.is_empty() {
            self.subcategory.clear();
            return Ok(());
        }
        match self.category {
            None => Err(DraftError::single(
                DraftField::Subcategory,
                "Select a category first.",
            )),
            Some(category) if !category.permits(&subcategory) => Err(DraftError::single(
                DraftField::Subcategory,
                format!("'{subcategory}' is not a subcategory of {category}."),
            )),
            Some(_) => {
                self.subcategory = subcategory;
                Ok(())
            }
        }
    }

    /// Fold an image-analysis suggestion into the draft in one step.
    ///
    /// Title, description and category are overwritten only by non-empty
    /// suggested values. Subcategory always takes the suggested value, even
    /// when that clears it, since it only has meaning relative to the
    /// category. Every other field is left alone.
    pub fn merge_suggestion(&mut self, suggestion: &AnalysisSuggestion) {
        fn non_empty(value: &Option<String>) -> Option<String> {
            value.clone().filter(|v| !v.is_empty())
        }

        let title = non_empty(&suggestion.title);
        let description = non_empty(&suggestion.description);
        let category = suggestion.category;
        let subcategory = suggestion.subcategory.clone().unwrap_or_default();

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(category) = category {
            self.category = Some(category);
        }
        self.subcategory = subcategory;
    }

    /// Checks required before the draft may move on to confirmation. All
    /// problems are reported together.
    pub fn validate(&self) -> Result<(), DraftError> {
        let mut errors = FieldErrors::new();

        match self.category {
            None => errors.insert(DraftField::Category, "Please select a category."),
            Some(category) => {
                if self.subcategory.is_empty() {
                    errors.insert(DraftField::Subcategory, "Please select a subcategory.");
                } else if !category.permits(&self.subcategory) {
                    errors.insert(
                        DraftField::Subcategory,
                        format!(
                            "'{}' is not a subcategory of {category}.",
                            self.subcategory
                        ),
                    );
                }
            }
        }

        let required = [
            (DraftField::Title, &self.title, "Please enter an item name."),
            (
                DraftField::Description,
                &self.description,
                "Please describe the item.",
            ),
            (
                DraftField::Location,
                &self.location,
                "Please enter the location.",
            ),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.insert(field, message);
            }
        }

        errors.into_result().map_err(DraftError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn electronics_laptop() -> ReportDraft {
        let mut draft = ReportDraft::default();
        draft
            .apply_edit(DraftEdit::Category(Some(Category::Electronics)))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Subcategory("Laptop".to_string()))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Description("old".to_string()))
            .unwrap();
        draft
    }

    fn complete_draft() -> ReportDraft {
        let mut draft = electronics_laptop();
        draft
            .apply_edit(DraftEdit::Title("Grey Dell laptop".to_string()))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Location("Near Ram Ghat".to_string()))
            .unwrap();
        draft
    }

    #[test]
    fn test_defaults() {
        let draft = ReportDraft::default();
        assert_eq!(draft.kind(), ReportKind::Lost);
        assert_eq!(draft.city(), City::Ujjain);
        assert!(draft.category().is_none());
        assert!(draft.available_subcategories().is_empty());
        assert!(draft.image().is_none());
    }

    #[test]
    fn test_merge_clears_subcategory_and_keeps_description() {
        let mut draft = electronics_laptop();
        let suggestion = AnalysisSuggestion {
            title: None,
            description: None,
            category: Some(Category::Electronics),
            subcategory: Some(String::new()),
        };

        draft.merge_suggestion(&suggestion);

        assert_eq!(draft.category(), Some(Category::Electronics));
        assert_eq!(draft.subcategory(), "");
        assert_eq!(draft.description(), "old");
    }

    #[test]
    fn test_merge_overwrites_with_non_empty_values_only() {
        let mut draft = complete_draft();
        draft.apply_edit(DraftEdit::City(City::Indore)).unwrap();
        draft
            .apply_edit(DraftEdit::Tags("dell, grey".to_string()))
            .unwrap();

        let suggestion = AnalysisSuggestion {
            title: Some(String::new()),
            description: Some("A pair of black over-ear headphones".to_string()),
            category: None,
            subcategory: Some("Headphones".to_string()),
        };
        draft.merge_suggestion(&suggestion);

        assert_eq!(draft.title(), "Grey Dell laptop");
        assert_eq!(draft.description(), "A pair of black over-ear headphones");
        assert_eq!(draft.category(), Some(Category::Electronics));
        assert_eq!(draft.subcategory(), "Headphones");
        // Fields outside the suggestion are untouched
        assert_eq!(draft.location(), "Near Ram Ghat");
        assert_eq!(draft.city(), City::Indore);
        assert_eq!(draft.tags_text(), "dell, grey");
    }

    #[test]
    fn test_merge_stores_suggested_text_verbatim() {
        let mut draft = complete_draft();
        let suggestion = AnalysisSuggestion {
            title: Some(" Black Wallet ".to_string()),
            description: Some("  ".to_string()),
            category: Some(Category::Documents),
            subcategory: Some(" Wallet".to_string()),
        };

        draft.merge_suggestion(&suggestion);

        assert_eq!(draft.title(), " Black Wallet ");
        assert_eq!(draft.description(), "  ");
        assert_eq!(draft.subcategory(), " Wallet");
    }

    #[test]
    fn test_merge_reapplies_from_current_state() {
        let mut draft = complete_draft();
        let suggestion = AnalysisSuggestion {
            title: Some("Mock: Black Headphones".to_string()),
            description: None,
            category: Some(Category::Electronics),
            subcategory: Some("Headphones".to_string()),
        };

        draft.merge_suggestion(&suggestion);
        draft
            .apply_edit(DraftEdit::Description("edited after analysis".to_string()))
            .unwrap();
        draft.merge_suggestion(&suggestion);

        assert_eq!(draft.title(), "Mock: Black Headphones");
        assert_eq!(draft.description(), "edited after analysis");
    }

    #[test]
    fn test_category_change_clears_incompatible_subcategory() {
        let mut draft = electronics_laptop();
        draft
            .apply_edit(DraftEdit::Category(Some(Category::Documents)))
            .unwrap();
        assert_eq!(draft.subcategory(), "");

        draft
            .apply_edit(DraftEdit::Subcategory("Other".to_string()))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Category(Some(Category::Bags)))
            .unwrap();
        assert_eq!(draft.subcategory(), "Other");

        draft.apply_edit(DraftEdit::Category(None)).unwrap();
        assert_eq!(draft.subcategory(), "");
    }

    #[test]
    fn test_subcategory_requires_matching_category() {
        let mut draft = ReportDraft::default();
        let err = draft
            .apply_edit(DraftEdit::Subcategory("Laptop".to_string()))
            .unwrap_err();
        assert!(err.field_errors().contains(&DraftField::Subcategory));

        draft
            .apply_edit(DraftEdit::Category(Some(Category::Documents)))
            .unwrap();
        assert!(draft
            .apply_edit(DraftEdit::Subcategory("Laptop".to_string()))
            .is_err());
        assert_eq!(draft.subcategory(), "");
    }

    #[test]
    fn test_validate_reports_all_missing_fields() {
        let err = ReportDraft::default().validate().unwrap_err();
        let errors = err.field_errors();
        assert!(errors.contains(&DraftField::Category));
        assert!(errors.contains(&DraftField::Title));
        assert!(errors.contains(&DraftField::Description));
        assert!(errors.contains(&DraftField::Location));
        assert!(!errors.contains(&DraftField::SerialNumber));
        assert!(!errors.contains(&DraftField::Tags));

        assert!(complete_draft().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unlisted_suggested_subcategory() {
        let mut draft = complete_draft();
        draft.merge_suggestion(&AnalysisSuggestion {
            title: None,
            description: None,
            category: Some(Category::Electronics),
            subcategory: Some("Smartphone".to_string()),
        });
        let err = draft.validate().unwrap_err();
        assert!(err.field_errors().contains(&DraftField::Subcategory));
    }

    #[test]
    fn test_tags_are_split_and_trimmed() {
        let mut draft = ReportDraft::default();
        draft
            .apply_edit(DraftEdit::Tags(" samsung, phone ,,black ".to_string()))
            .unwrap();
        assert_eq!(draft.tags(), vec!["samsung", "phone", "black"]);
    }

    #[test]
    fn test_image_attach_and_remove() {
        assert!(ImageAttachment::new(vec![1, 2, 3], "application/pdf").is_err());
        assert!(ImageAttachment::new(Vec::new(), "image/png").is_err());

        let image = ImageAttachment::new(vec![0xff, 0xd8, 0xff], "image/JPEG")
            .unwrap()
            .with_file_name("wallet.jpg");
        assert_eq!(image.mime_type(), "image/jpeg");

        let mut draft = ReportDraft::default();
        draft.apply_edit(DraftEdit::AttachImage(image)).unwrap();
        assert_eq!(draft.image_preview(), Some("data:image/jpeg;base64,/9j/"));
        assert_eq!(draft.image().and_then(|i| i.file_name()), Some("wallet.jpg"));

        draft.apply_edit(DraftEdit::RemoveImage).unwrap();
        assert!(draft.image().is_none());
        assert!(draft.image_preview().is_none());
    }
}
