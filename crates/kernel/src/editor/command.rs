//! Toolbar commands as pure transitions over the editor state.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{EditorConfig, ListConfig};

/// An inline formatting mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Subscript,
    Superscript,
    Highlight,
    Code,
}

impl Mark {
    pub const ALL: [Mark; 8] = [
        Mark::Bold,
        Mark::Italic,
        Mark::Underline,
        Mark::Strike,
        Mark::Subscript,
        Mark::Superscript,
        Mark::Highlight,
        Mark::Code,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Strike => "strike",
            Mark::Subscript => "subscript",
            Mark::Superscript => "superscript",
            Mark::Highlight => "highlight",
            Mark::Code => "code",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block type of the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    #[default]
    Paragraph,
    Heading {
        level: u8,
    },
    BulletList,
    OrderedList,
}

/// Formatting state at the cursor, plus inserted images.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub marks: BTreeSet<Mark>,
    pub block: Block,
    pub link: Option<String>,
    pub color: Option<String>,
    pub images: Vec<String>,
}

/// A toolbar action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    ToggleMark {
        mark: Mark,
    },
    ToggleHeading {
        level: u8,
    },
    ToggleBulletList,
    ToggleOrderedList,
    /// Result of the link prompt; `None` means the prompt was cancelled.
    SetLink {
        url: Option<String>,
    },
    InsertImage {
        url: String,
    },
    SetColor {
        color: String,
    },
    UnsetColor,
}

/// Query used to render a toolbar button as pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActiveQuery {
    Mark { mark: Mark },
    Heading { level: u8 },
    BulletList,
    OrderedList,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("mark '{0}' is not enabled")]
    MarkDisabled(Mark),

    #[error("heading level {0} is not enabled")]
    HeadingLevelUnavailable(u8),

    #[error("{0} are not enabled")]
    FeatureDisabled(&'static str),
}

impl EditorState {
    /// Initial state: a plain paragraph with nothing active.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, query: ActiveQuery) -> bool {
        match query {
            ActiveQuery::Mark { mark } => self.marks.contains(&mark),
            ActiveQuery::Heading { level } => self.block == Block::Heading { level },
            ActiveQuery::BulletList => self.block == Block::BulletList,
            ActiveQuery::OrderedList => self.block == Block::OrderedList,
            ActiveQuery::Link => self.link.is_some(),
        }
    }
}

/// Apply `command` to `state`, returning the new state.
///
/// The input state is never modified; a rejected command leaves the caller
/// with the state it already had.
pub fn apply(
    config: &EditorConfig,
    state: &EditorState,
    command: &Command,
) -> Result<EditorState, EditorError> {
    let mut next = state.clone();

    match command {
        Command::ToggleMark { mark } => {
            if !config.mark_enabled(*mark) {
                return Err(EditorError::MarkDisabled(*mark));
            }
            if !next.marks.remove(mark) {
                next.marks.insert(*mark);
            }
        }
        Command::ToggleHeading { level } => {
            if !config.heading_enabled(*level) {
                return Err(EditorError::HeadingLevelUnavailable(*level));
            }
            let heading = Block::Heading { level: *level };
            next.block = if next.block == heading {
                Block::Paragraph
            } else {
                heading
            };
        }
        Command::ToggleBulletList => {
            let list = config
                .bullet_list
                .ok_or(EditorError::FeatureDisabled("bullet lists"))?;
            toggle_list(&mut next, Block::BulletList, list);
        }
        Command::ToggleOrderedList => {
            let list = config
                .ordered_list
                .ok_or(EditorError::FeatureDisabled("ordered lists"))?;
            toggle_list(&mut next, Block::OrderedList, list);
        }
        Command::SetLink { url } => {
            if config.link.is_none() {
                return Err(EditorError::FeatureDisabled("links"));
            }
            match url.as_deref() {
                None => {}
                Some("") => next.link = None,
                Some(url) => next.link = Some(url.to_string()),
            }
        }
        Command::InsertImage { url } => {
            if !config.images {
                return Err(EditorError::FeatureDisabled("images"));
            }
            if !url.is_empty() {
                next.images.push(url.clone());
            }
        }
        Command::SetColor { color } => {
            if !config.text_color {
                return Err(EditorError::FeatureDisabled("text colors"));
            }
            next.color = Some(color.clone()).filter(|c| !c.is_empty());
        }
        Command::UnsetColor => {
            if !config.text_color {
                return Err(EditorError::FeatureDisabled("text colors"));
            }
            next.color = None;
        }
    }

    Ok(next)
}

fn toggle_list(state: &mut EditorState, kind: Block, list: ListConfig) {
    if state.block == kind {
        state.block = Block::Paragraph;
        return;
    }

    state.block = kind;
    if !list.keep_marks {
        state.marks.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn run(state: &EditorState, command: Command) -> EditorState {
        apply(&EditorConfig::default(), state, &command).unwrap()
    }

    #[test]
    fn toggling_any_mark_twice_restores_state() {
        let mut start = EditorState::new();
        start.marks.insert(Mark::Italic);
        start.block = Block::Heading { level: 2 };

        for mark in Mark::ALL {
            let once = run(&start, Command::ToggleMark { mark });
            assert_ne!(once, start, "{mark} should change the state");
            let twice = run(&once, Command::ToggleMark { mark });
            assert_eq!(twice, start, "{mark} toggle is not idempotent");
        }
    }

    #[test]
    fn heading_toggles_back_to_paragraph() {
        let state = run(&EditorState::new(), Command::ToggleHeading { level: 1 });
        assert!(state.is_active(ActiveQuery::Heading { level: 1 }));
        assert!(!state.is_active(ActiveQuery::Heading { level: 2 }));

        let state = run(&state, Command::ToggleHeading { level: 2 });
        assert_eq!(state.block, Block::Heading { level: 2 });

        let state = run(&state, Command::ToggleHeading { level: 2 });
        assert_eq!(state.block, Block::Paragraph);
    }

    #[test]
    fn heading_level_outside_config_rejected() {
        for level in [0, 4, 6] {
            let err = apply(
                &EditorConfig::default(),
                &EditorState::new(),
                &Command::ToggleHeading { level },
            )
            .unwrap_err();
            assert_eq!(err, EditorError::HeadingLevelUnavailable(level));
        }
    }

    #[test]
    fn switching_list_kind_replaces_the_list() {
        let state = run(&EditorState::new(), Command::ToggleBulletList);
        assert!(state.is_active(ActiveQuery::BulletList));

        let state = run(&state, Command::ToggleOrderedList);
        assert!(state.is_active(ActiveQuery::OrderedList));
        assert!(!state.is_active(ActiveQuery::BulletList));

        let state = run(&state, Command::ToggleOrderedList);
        assert_eq!(state.block, Block::Paragraph);
    }

    #[test]
    fn lists_keep_marks_when_configured() {
        let mut start = EditorState::new();
        start.marks.insert(Mark::Bold);
        assert!(run(&start, Command::ToggleBulletList).marks.contains(&Mark::Bold));

        let mut config = EditorConfig::default();
        config.bullet_list = Some(ListConfig {
            keep_marks: false,
            keep_attributes: false,
        });
        let state = apply(&config, &start, &Command::ToggleBulletList).unwrap();
        assert!(state.marks.is_empty());
    }

    #[test]
    fn cancelled_link_prompt_changes_nothing() {
        let mut start = EditorState::new();
        start.link = Some("https://example.com".to_string());
        assert_eq!(run(&start, Command::SetLink { url: None }), start);
    }

    #[test]
    fn empty_link_removes_it() {
        let mut start = EditorState::new();
        start.link = Some("https://example.com".to_string());
        let state = run(
            &start,
            Command::SetLink {
                url: Some(String::new()),
            },
        );
        assert_eq!(state.link, None);
        assert!(!state.is_active(ActiveQuery::Link));
    }

    #[test]
    fn link_is_set_verbatim() {
        let state = run(
            &EditorState::new(),
            Command::SetLink {
                url: Some("not even a url".to_string()),
            },
        );
        assert_eq!(state.link.as_deref(), Some("not even a url"));
        assert!(state.is_active(ActiveQuery::Link));
    }

    #[test]
    fn empty_image_url_is_ignored() {
        let start = EditorState::new();
        assert_eq!(
            run(&start, Command::InsertImage { url: String::new() }),
            start
        );

        let state = run(
            &start,
            Command::InsertImage {
                url: "https://example.com/cat.png".to_string(),
            },
        );
        assert_eq!(state.images, vec!["https://example.com/cat.png".to_string()]);
    }

    #[test]
    fn color_set_and_unset() {
        let state = run(
            &EditorState::new(),
            Command::SetColor {
                color: "#958DF1".to_string(),
            },
        );
        assert_eq!(state.color.as_deref(), Some("#958DF1"));
        assert_eq!(run(&state, Command::UnsetColor).color, None);
    }

    #[test]
    fn disabled_features_are_rejected() {
        let config = EditorConfig {
            marks: BTreeSet::from([Mark::Bold]),
            link: None,
            images: false,
            text_color: false,
            bullet_list: None,
            ..EditorConfig::default()
        };
        let state = EditorState::new();

        let cases = [
            (
                Command::ToggleMark { mark: Mark::Code },
                EditorError::MarkDisabled(Mark::Code),
            ),
            (
                Command::SetLink { url: None },
                EditorError::FeatureDisabled("links"),
            ),
            (
                Command::InsertImage {
                    url: "x".to_string(),
                },
                EditorError::FeatureDisabled("images"),
            ),
            (
                Command::UnsetColor,
                EditorError::FeatureDisabled("text colors"),
            ),
            (
                Command::ToggleBulletList,
                EditorError::FeatureDisabled("bullet lists"),
            ),
        ];
        for (command, expected) in cases {
            assert_eq!(apply(&config, &state, &command).unwrap_err(), expected);
        }
    }

    #[test]
    fn commands_deserialize_from_client_json() {
        let command: Command =
            serde_json::from_str(r#"{"command":"toggleMark","mark":"superscript"}"#).unwrap();
        assert_eq!(
            command,
            Command::ToggleMark {
                mark: Mark::Superscript
            }
        );

        let command: Command =
            serde_json::from_str(r#"{"command":"setLink","url":null}"#).unwrap();
        assert_eq!(command, Command::SetLink { url: None });
    }
}
