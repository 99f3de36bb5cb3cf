//! Edit requests produced by the visual editor.

use serde::{Deserialize, Serialize};

/// One element selected on the canvas, with enough markup for the model
/// to locate it in the source files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementTarget {
    pub selector: String,
    pub markup: String,
}

/// A user intent from the editing surface. Immutable; constructed by the
/// caller and consumed once by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditRequest {
    /// A CSS property changed through a property editor (slider, color
    /// picker, dropdown).
    StyleChange {
        selector: String,
        property: String,
        old_value: Option<String>,
        new_value: String,
        element_markup: String,
    },

    /// A text node retyped inline.
    TextChange {
        selector: String,
        old_text: String,
        new_text: String,
        element_markup: String,
    },

    /// An image source swapped through the picker.
    ImageChange {
        selector: String,
        old_src: Option<String>,
        new_src: String,
        element_markup: String,
    },

    /// A freeform instruction typed against one selected element.
    FreeformEdit {
        prompt: String,
        selector: String,
        element_markup: String,
    },

    /// A freeform instruction spanning several selected elements.
    MultiElementEdit {
        prompt: String,
        elements: Vec<ElementTarget>,
    },
}

impl EditRequest {
    /// Burst-style inputs (slider drags, rapid retyping) are debounced;
    /// single deliberate actions are not.
    pub fn is_burst_input(&self) -> bool {
        matches!(
            self,
            EditRequest::StyleChange { .. }
                | EditRequest::TextChange { .. }
                | EditRequest::ImageChange { .. }
        )
    }

    /// Short label used in traces and status summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            EditRequest::StyleChange { .. } => "style",
            EditRequest::TextChange { .. } => "text",
            EditRequest::ImageChange { .. } => "image",
            EditRequest::FreeformEdit { .. } => "freeform",
            EditRequest::MultiElementEdit { .. } => "multi",
        }
    }
}
