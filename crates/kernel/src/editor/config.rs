//! Rich-text editor configuration served to the client.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::command::Mark;

/// Link extension settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkConfig {
    pub open_on_click: bool,
    pub autolink: bool,
}

/// List extension settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    /// Carry active marks into a newly created list.
    pub keep_marks: bool,
    pub keep_attributes: bool,
}

/// Which editor features are enabled, and how.
///
/// `None` for an optional extension means it is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    pub marks: BTreeSet<Mark>,
    pub heading_levels: BTreeSet<u8>,
    pub link: Option<LinkConfig>,
    pub text_color: bool,
    pub bullet_list: Option<ListConfig>,
    pub ordered_list: Option<ListConfig>,
    pub images: bool,
    pub initial_content: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let list = ListConfig {
            keep_marks: true,
            keep_attributes: false,
        };

        Self {
            marks: Mark::ALL.into_iter().collect(),
            heading_levels: BTreeSet::from([1, 2, 3]),
            link: Some(LinkConfig {
                open_on_click: false,
                autolink: true,
            }),
            text_color: true,
            bullet_list: Some(list),
            ordered_list: Some(list),
            images: true,
            initial_content: "Hello World! 🌎️".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn mark_enabled(&self, mark: Mark) -> bool {
        self.marks.contains(&mark)
    }

    pub fn heading_enabled(&self, level: u8) -> bool {
        self.heading_levels.contains(&level)
    }
}
