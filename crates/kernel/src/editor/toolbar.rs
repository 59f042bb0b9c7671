//! Toolbar button bindings.

use serde::Serialize;

use super::command::{ActiveQuery, Command, Mark};
use super::config::EditorConfig;

/// How a button's command receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonInput {
    /// The command runs as-is.
    None,
    /// The client prompts for a URL, pre-filled with the current link.
    UrlPrompt,
}

/// One toolbar button: what it runs and when it renders pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarButton {
    pub id: &'static str,
    pub aria_label: &'static str,
    pub tooltip: &'static str,
    pub command: Command,
    pub input: ButtonInput,
    /// `None` for buttons that never render pressed (image insertion).
    pub active: Option<ActiveQuery>,
}

impl ToolbarButton {
    fn toggle(
        id: &'static str,
        aria_label: &'static str,
        tooltip: &'static str,
        command: Command,
        active: ActiveQuery,
    ) -> Self {
        Self {
            id,
            aria_label,
            tooltip,
            command,
            input: ButtonInput::None,
            active: Some(active),
        }
    }
}

fn mark_button(mark: Mark) -> Option<ToolbarButton> {
    let (aria_label, tooltip) = match mark {
        Mark::Bold => ("Toggle Bold", "Bold"),
        Mark::Italic => ("Toggle Italic", "Italic"),
        Mark::Underline => ("Toggle Underline", "Underline"),
        Mark::Strike => ("Toggle Strikethrough", "Strikethrough"),
        Mark::Subscript => ("Toggle Subscript", "Subscript"),
        Mark::Superscript => ("Toggle Superscript", "Superscript"),
        // No toolbar button; reachable through keyboard shortcuts only.
        Mark::Highlight | Mark::Code => return None,
    };

    Some(ToolbarButton::toggle(
        mark.as_str(),
        aria_label,
        tooltip,
        Command::ToggleMark { mark },
        ActiveQuery::Mark { mark },
    ))
}

fn heading_button(level: u8) -> Option<ToolbarButton> {
    let (id, aria_label, tooltip) = match level {
        1 => ("heading1", "Toggle Heading 1", "Heading 1"),
        2 => ("heading2", "Toggle Heading 2", "Heading 2"),
        3 => ("heading3", "Toggle Heading 3", "Heading 3"),
        _ => return None,
    };

    Some(ToolbarButton::toggle(
        id,
        aria_label,
        tooltip,
        Command::ToggleHeading { level },
        ActiveQuery::Heading { level },
    ))
}

/// Toolbar buttons for the enabled features, in display order.
pub fn toolbar(config: &EditorConfig) -> Vec<ToolbarButton> {
    let mut buttons: Vec<ToolbarButton> = config
        .heading_levels
        .iter()
        .filter_map(|&level| heading_button(level))
        .collect();

    buttons.extend(
        [Mark::Bold, Mark::Italic, Mark::Underline, Mark::Strike]
            .into_iter()
            .filter(|&mark| config.mark_enabled(mark))
            .filter_map(mark_button),
    );

    if config.bullet_list.is_some() {
        buttons.push(ToolbarButton::toggle(
            "bulletList",
            "Toggle Bullet List",
            "Bullet List",
            Command::ToggleBulletList,
            ActiveQuery::BulletList,
        ));
    }
    if config.ordered_list.is_some() {
        buttons.push(ToolbarButton::toggle(
            "orderedList",
            "Toggle Number List",
            "Number List",
            Command::ToggleOrderedList,
            ActiveQuery::OrderedList,
        ));
    }

    buttons.extend(
        [Mark::Subscript, Mark::Superscript]
            .into_iter()
            .filter(|&mark| config.mark_enabled(mark))
            .filter_map(mark_button),
    );

    if config.link.is_some() {
        buttons.push(ToolbarButton {
            id: "link",
            aria_label: "Toggle Link",
            tooltip: "Insert Link",
            command: Command::SetLink { url: None },
            input: ButtonInput::UrlPrompt,
            active: Some(ActiveQuery::Link),
        });
    }
    if config.images {
        buttons.push(ToolbarButton {
            id: "image",
            aria_label: "Toggle Image",
            tooltip: "Insert Image (from URL)",
            command: Command::InsertImage { url: String::new() },
            input: ButtonInput::UrlPrompt,
            active: None,
        });
    }

    buttons
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::editor::command::{EditorState, apply};

    #[test]
    fn default_toolbar_layout() {
        let ids: Vec<&str> = toolbar(&EditorConfig::default())
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(
            ids,
            [
                "heading1",
                "heading2",
                "heading3",
                "bold",
                "italic",
                "underline",
                "strike",
                "bulletList",
                "orderedList",
                "subscript",
                "superscript",
                "link",
                "image",
            ]
        );
    }

    #[test]
    fn every_toggle_button_reports_pressed_after_running() {
        let config = EditorConfig::default();
        for button in toolbar(&config) {
            let (Some(active), ButtonInput::None) = (button.active, button.input) else {
                continue;
            };
            let state = apply(&config, &EditorState::new(), &button.command).unwrap();
            assert!(state.is_active(active), "{} not pressed", button.id);
        }
    }

    #[test]
    fn disabled_features_have_no_buttons() {
        let config = EditorConfig {
            link: None,
            images: false,
            heading_levels: [1].into(),
            ..EditorConfig::default()
        };
        let ids: Vec<&str> = toolbar(&config).iter().map(|b| b.id).collect();
        assert!(ids.contains(&"heading1"));
        assert!(!ids.contains(&"heading2"));
        assert!(!ids.contains(&"link"));
        assert!(!ids.contains(&"image"));
    }
}
