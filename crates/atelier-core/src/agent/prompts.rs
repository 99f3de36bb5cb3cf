//! Prompt builders: turn a typed edit request into a conversation seed.
//!
//! Pure and deterministic - no I/O, no failure path. The system message
//! fixes the model's operating contract; the user message embeds the
//! concrete before/after values and a size-bounded excerpt of the target
//! element's markup.

use crate::ai::types::ChatMessage;

use super::request::EditRequest;

/// Character budget for one element's markup excerpt. Truncation is a
/// plain char-boundary cut; it does not need to be markup-aware.
const MARKUP_EXCERPT_BUDGET: usize = 800;

const SYSTEM_PROMPT: &str = "You are the edit engine of Atelier, a visual editor for web projects. \
You apply the user's requested change to the project source files using the provided tools.\n\
\n\
Rules:\n\
- Make the change with tools. Never describe or narrate an edit instead of performing it.\n\
- Read a file with read_file before patching it, so your anchors match the real content.\n\
- Prefer minimal patch_file edits over rewriting whole files with write_file.\n\
- Use list_files when you are unsure which file owns a style or element.\n\
- Do not ask for confirmation; the user already made this decision in the editor.\n\
- When the change is applied, reply with one short sentence describing what changed.";

/// Build the (system, user) conversation seed for a request.
pub fn build_prompt(request: &EditRequest) -> (ChatMessage, ChatMessage) {
    let user = match request {
        EditRequest::StyleChange {
            selector,
            property,
            old_value,
            new_value,
            element_markup,
        } => {
            let mut text = format!(
                "Change the CSS property `{}` of the element matching `{}` to `{}`.",
                property, selector, new_value
            );
            if let Some(old) = old_value {
                text.push_str(&format!(" Its current value is `{}`.", old));
            }
            push_markup(&mut text, element_markup);
            text
        }
        EditRequest::TextChange {
            selector,
            old_text,
            new_text,
            element_markup,
        } => {
            let mut text = format!(
                "Replace the text content of the element matching `{}`.\nOld text: {}\nNew text: {}",
                selector, old_text, new_text
            );
            push_markup(&mut text, element_markup);
            text
        }
        EditRequest::ImageChange {
            selector,
            old_src,
            new_src,
            element_markup,
        } => {
            let mut text = format!(
                "Change the image source of the element matching `{}` to `{}`.",
                selector, new_src
            );
            if let Some(old) = old_src {
                text.push_str(&format!(" Its current source is `{}`.", old));
            }
            push_markup(&mut text, element_markup);
            text
        }
        EditRequest::FreeformEdit {
            prompt,
            selector,
            element_markup,
        } => {
            let mut text = format!(
                "Apply this instruction to the element matching `{}`: {}",
                selector, prompt
            );
            push_markup(&mut text, element_markup);
            text
        }
        EditRequest::MultiElementEdit { prompt, elements } => {
            let mut text = format!(
                "Apply this instruction across the {} selected elements: {}",
                elements.len(),
                prompt
            );
            for (index, element) in elements.iter().enumerate() {
                text.push_str(&format!(
                    "\n\nElement {} (`{}`):\n{}",
                    index + 1,
                    element.selector,
                    truncate_markup(&element.markup)
                ));
            }
            text
        }
    };

    (ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user))
}

fn push_markup(text: &mut String, markup: &str) {
    text.push_str("\n\nElement markup:\n");
    text.push_str(&truncate_markup(markup));
}

/// Cut an excerpt at the char budget, backing off to a char boundary.
fn truncate_markup(markup: &str) -> String {
    if markup.len() <= MARKUP_EXCERPT_BUDGET {
        return markup.to_string();
    }
    let cut = floor_char_boundary(markup, MARKUP_EXCERPT_BUDGET);
    format!("{}…", &markup[..cut])
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut boundary = index.min(text.len());
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}
