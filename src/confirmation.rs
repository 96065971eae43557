//! Review of a frozen draft before submission, and what is shown after it.

use crate::draft::ReportDraft;
use crate::submission::{ReportId, SubmissionError};
use crate::taxonomy::Category;
use serde::Serialize;

pub const NO_IMAGE_TEXT: &str = "No image uploaded.";

const CEIR_NOTICE: &str = "In case of a Lost Mobile Handset, after registering the complaint \
    here, please proceed to the Central Equipment Identity Register (CEIR) website \
    (https://www.ceir.gov.in/Home/index.jsp) for blocking the handset and for all-India \
    traceability.";

const STANDARD_NOTES: [&str; 3] = [
    "This is a digitally signed document and requires no signature as per IT Act 2008.",
    "If required, approach the concerned Police Station for a Police Stamp/Signature.",
    "This application is for lodging reports of Articles Lost / Found in the respective City only.",
];

pub const DISCLAIMERS: [&str; 3] = [
    "The report lodged with this application is not a subject matter of enquiry/investigation.",
    "In case the loss is due to theft or any other crime, contact the nearest police station.",
    "A false report to the police is a punishable offence as per the IPC & IT Act.",
];

/// One labelled line of the review screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

/// Review rows in display order. Rows whose value is blank are left out.
pub fn review_rows(draft: &ReportDraft) -> Vec<DetailRow> {
    let category = draft
        .category()
        .map(|c| format!("{} - {}", c, draft.subcategory()))
        .unwrap_or_default();

    [
        ("Report Type", draft.kind().label().to_string()),
        ("Item Name", draft.title().to_string()),
        ("Category", category),
        ("Description", draft.description().to_string()),
        ("Location", draft.location().to_string()),
        ("City", draft.city().to_string()),
        ("Serial Number", draft.serial_number().to_string()),
        ("Tags", draft.tags_text().to_string()),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .map(|(label, value)| DetailRow { label, value })
    .collect()
}

/// Notes shown once a report has been accepted
pub fn success_notices(draft: &ReportDraft) -> Vec<&'static str> {
    let mut notices = Vec::with_capacity(STANDARD_NOTES.len() + 1);
    let handset = draft.category() == Some(Category::Electronics)
        && matches!(draft.subcategory(), "Mobile Phone" | "Other");
    if handset {
        notices.push(CEIR_NOTICE);
    }
    notices.extend(STANDARD_NOTES);
    notices
}

/// Confirm stage: the draft is read-only here
#[derive(Debug, Clone)]
pub struct Confirmation {
    draft: ReportDraft,
    last_error: Option<SubmissionError>,
    attempts: u32,
}

impl Confirmation {
    pub fn new(draft: ReportDraft) -> Self {
        Self {
            draft,
            last_error: None,
            attempts: 0,
        }
    }

    pub fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    pub fn rows(&self) -> Vec<DetailRow> {
        review_rows(&self.draft)
    }

    pub fn has_image(&self) -> bool {
        self.draft.image().is_some()
    }

    pub fn last_error(&self) -> Option<&SubmissionError> {
        self.last_error.as_ref()
    }

    /// Submission attempts made from this stage
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn record_attempt(&mut self, result: Result<(), SubmissionError>) {
        self.attempts += 1;
        self.last_error = result.err();
    }
}

/// A report the submission service accepted
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedReport {
    id: ReportId,
    draft: ReportDraft,
}

impl SubmittedReport {
    pub fn new(id: ReportId, draft: ReportDraft) -> Self {
        Self { id, draft }
    }

    pub fn id(&self) -> &ReportId {
        &self.id
    }

    pub fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    pub fn message(&self) -> String {
        format!(
            "Your report for the {} has been submitted. You will receive notifications via \
             Email and SMS. You can track the status of your report on your profile page.",
            self.draft.title()
        )
    }

    pub fn notices(&self) -> Vec<&'static str> {
        success_notices(&self.draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{DraftEdit, ImageAttachment};
    use crate::taxonomy::ReportKind;

    fn draft_with(category: Category, subcategory: &str) -> ReportDraft {
        let mut draft = ReportDraft::new(ReportKind::Lost);
        draft.apply_edit(DraftEdit::Category(Some(category))).unwrap();
        draft
            .apply_edit(DraftEdit::Subcategory(subcategory.to_string()))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Title("Redmi Note 12".to_string()))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Description("Blue back cover".to_string()))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Location("Freeganj bus stand".to_string()))
            .unwrap();
        draft
    }

    #[test]
    fn test_rows_omit_blank_values() {
        let draft = draft_with(Category::Electronics, "Mobile Phone");
        let rows = review_rows(&draft);
        let labels: Vec<&str> = rows.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec!["Report Type", "Item Name", "Category", "Description", "Location", "City"]
        );
        assert_eq!(rows[0].value, "Lost Item");
        assert_eq!(rows[2].value, "Electronics - Mobile Phone");
        assert_eq!(rows[5].value, "Ujjain");
    }

    #[test]
    fn test_rows_include_optional_fields_when_present() {
        let mut draft = draft_with(Category::Electronics, "Mobile Phone");
        draft
            .apply_edit(DraftEdit::SerialNumber("IMEI 356938035643809".to_string()))
            .unwrap();
        draft
            .apply_edit(DraftEdit::Tags("redmi, blue".to_string()))
            .unwrap();
        let rows = review_rows(&draft);
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[6].value, "IMEI 356938035643809");
        assert_eq!(rows[7].value, "redmi, blue");
    }

    #[test]
    fn test_ceir_notice_for_handsets_only() {
        let phone = success_notices(&draft_with(Category::Electronics, "Mobile Phone"));
        assert_eq!(phone.len(), 4);
        assert!(phone[0].contains("CEIR"));

        let other = success_notices(&draft_with(Category::Electronics, "Other"));
        assert!(other[0].contains("CEIR"));

        let laptop = success_notices(&draft_with(Category::Electronics, "Laptop"));
        assert_eq!(laptop.len(), 3);
        assert!(!laptop.iter().any(|n| n.contains("CEIR")));

        let bag = success_notices(&draft_with(Category::Bags, "Other"));
        assert!(!bag.iter().any(|n| n.contains("CEIR")));
    }

    #[test]
    fn test_confirmation_tracks_attempts() {
        let mut draft = draft_with(Category::Bags, "Backpack");
        draft
            .apply_edit(DraftEdit::AttachImage(
                ImageAttachment::new(vec![7; 4], "image/webp").unwrap(),
            ))
            .unwrap();

        let mut confirmation = Confirmation::new(draft.clone());
        assert!(confirmation.has_image());
        confirmation.record_attempt(Err(SubmissionError::Network("timeout".to_string())));
        assert_eq!(confirmation.attempts(), 1);
        assert!(confirmation.last_error().is_some());
        confirmation.record_attempt(Ok(()));
        assert!(confirmation.last_error().is_none());
        assert_eq!(confirmation.draft(), &draft);
    }

    #[test]
    fn test_submitted_message_names_item() {
        let report = SubmittedReport::new(
            ReportId::new("LF-1"),
            draft_with(Category::Electronics, "Mobile Phone"),
        );
        assert!(report.message().contains("Redmi Note 12"));
        assert_eq!(report.id().as_str(), "LF-1");
    }
}
