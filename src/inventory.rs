// SPDX-License-Identifier: MIT

//! In-memory inventory and the per-analysis state machine
//!
//! One `Inventory` owns everything the UI renders: the prepend-only item
//! list, the staged image, the in-flight flag, and the last error message.
//! All mutation goes through the explicit operations below; the in-flight
//! flag is a real guard, not a disabled button.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::encoder::StagedImage;
use crate::gemini::Recognition;
use crate::{PlatescanError, Result};

/// One recognized equipment entry. Immutable once created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub item_name: String,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub description: String,
    /// Preview data URI; local to this session, never part of the AI response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Build an item from a validated recognition plus the local preview.
    pub fn from_recognition(recognition: Recognition, image: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            item_name: recognition.item_name,
            model_number: recognition.model_number,
            serial_number: recognition.serial_number,
            manufacturer: recognition.manufacturer,
            description: recognition.description,
            image,
            created_at: Utc::now(),
        }
    }
}

/// Analysis lifecycle: idle -> analyzing -> idle, on both outcomes.
#[derive(Default)]
pub struct Inventory {
    /// Newest first
    items: Vec<InventoryItem>,
    staged: Option<StagedImage>,
    analyzing: bool,
    last_error: Option<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an image for the next analysis, replacing any previous one.
    /// Clears the error display, as picking a new image starts fresh.
    pub fn stage(&mut self, image: StagedImage) -> Result<()> {
        if self.analyzing {
            return Err(PlatescanError::AnalysisInFlight);
        }
        self.staged = Some(image);
        self.last_error = None;
        Ok(())
    }

    /// Drop the staged image without analyzing it.
    pub fn clear_staged(&mut self) -> Result<()> {
        if self.analyzing {
            return Err(PlatescanError::AnalysisInFlight);
        }
        self.staged = None;
        self.last_error = None;
        Ok(())
    }

    /// Transition idle -> analyzing.
    ///
    /// This is the single-flight guard: it rejects re-entry while a request
    /// is outstanding and rejects a start with nothing staged, in both cases
    /// before any outbound request exists. Returns the payload to analyze.
    pub fn begin_analysis(&mut self) -> Result<StagedImage> {
        if self.analyzing {
            return Err(PlatescanError::AnalysisInFlight);
        }
        let staged = self.staged.clone().ok_or(PlatescanError::NoStagedImage)?;
        self.analyzing = true;
        self.last_error = None;
        Ok(staged)
    }

    /// Success path: mint the item, prepend it, clear the staged image.
    pub fn complete_analysis(&mut self, recognition: Recognition) -> InventoryItem {
        let image = self.staged.take().map(|s| s.preview);
        let item = InventoryItem::from_recognition(recognition, image);
        self.items.insert(0, item.clone());
        self.analyzing = false;
        item
    }

    /// Failure path: record the message, keep the staged image for a retry.
    pub fn fail_analysis(&mut self, message: impl Into<String>) {
        self.analyzing = false;
        self.last_error = Some(message.into());
    }

    /// All items, newest first
    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn staged(&self) -> Option<&StagedImage> {
        self.staged.as_ref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged() -> StagedImage {
        StagedImage {
            data: "AAAA".to_string(),
            mime_type: "image/png".to_string(),
            preview: "data:image/png;base64,AAAA".to_string(),
        }
    }

    fn recognition(name: &str) -> Recognition {
        Recognition {
            item_name: name.to_string(),
            model_number: Some("M-100".to_string()),
            serial_number: None,
            manufacturer: Some("Siemens".to_string()),
            description: "A test item.".to_string(),
        }
    }

    #[test]
    fn test_begin_requires_staged_image() {
        let mut inv = Inventory::new();
        let err = inv.begin_analysis().unwrap_err();
        assert!(matches!(err, PlatescanError::NoStagedImage));
        assert!(!inv.is_analyzing());
    }

    #[test]
    fn test_begin_rejects_reentry() {
        let mut inv = Inventory::new();
        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();

        let err = inv.begin_analysis().unwrap_err();
        assert!(matches!(err, PlatescanError::AnalysisInFlight));
    }

    #[test]
    fn test_success_prepends_and_clears_staged() {
        let mut inv = Inventory::new();

        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();
        let first = inv.complete_analysis(recognition("Electric Motor"));

        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();
        let second = inv.complete_analysis(recognition("Control Panel"));

        assert_eq!(inv.len(), 2);
        assert_eq!(inv.items()[0].id, second.id);
        assert_eq!(inv.items()[1].id, first.id);
        assert_eq!(inv.items()[1].item_name, "Electric Motor");
        assert!(inv.staged().is_none());
        assert!(!inv.is_analyzing());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_item_retains_recognition_fields() {
        let mut inv = Inventory::new();
        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();
        let item = inv.complete_analysis(recognition("Hydraulic Pump"));

        assert_eq!(item.item_name, "Hydraulic Pump");
        assert_eq!(item.model_number.as_deref(), Some("M-100"));
        assert_eq!(item.serial_number, None);
        assert_eq!(item.manufacturer.as_deref(), Some("Siemens"));
        assert!(item.image.as_deref().unwrap().starts_with("data:image/png"));
    }

    #[test]
    fn test_failure_keeps_staged_and_items() {
        let mut inv = Inventory::new();
        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();
        inv.complete_analysis(recognition("Gearbox"));

        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();
        inv.fail_analysis("Failed to analyze the image.");

        assert_eq!(inv.len(), 1);
        assert!(inv.staged().is_some(), "staged image survives for a retry");
        assert!(!inv.is_analyzing());
        assert_eq!(inv.last_error(), Some("Failed to analyze the image."));

        // Retry works on the same staged image
        inv.begin_analysis().unwrap();
        inv.complete_analysis(recognition("Gearbox"));
        assert_eq!(inv.len(), 2);
    }

    #[test]
    fn test_staging_clears_error() {
        let mut inv = Inventory::new();
        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();
        inv.fail_analysis("boom");

        inv.stage(staged()).unwrap();
        assert_eq!(inv.last_error(), None);
    }

    #[test]
    fn test_no_staging_while_analyzing() {
        let mut inv = Inventory::new();
        inv.stage(staged()).unwrap();
        inv.begin_analysis().unwrap();

        assert!(matches!(
            inv.stage(staged()).unwrap_err(),
            PlatescanError::AnalysisInFlight
        ));
        assert!(matches!(
            inv.clear_staged().unwrap_err(),
            PlatescanError::AnalysisInFlight
        ));
    }

    #[test]
    fn test_clear_staged() {
        let mut inv = Inventory::new();
        inv.stage(staged()).unwrap();
        inv.clear_staged().unwrap();
        assert!(inv.staged().is_none());
        assert!(matches!(
            inv.begin_analysis().unwrap_err(),
            PlatescanError::NoStagedImage
        ));
    }
}
