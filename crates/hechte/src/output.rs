//! Message rendering: plain lines (optionally colored) or JSON.

use std::io::{self, IsTerminal};

use chrono::Local;
use owo_colors::OwoColorize;
use serde::Serialize;

use hechte_core::{FeedEntry, Mark, Message, Timeline};

use crate::cli::{ColorMode, OutputFormat};

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// JSON shape for one message.
#[derive(Serialize)]
struct JsonLine<'a> {
    timeline: Timeline,
    #[serde(skip_serializing_if = "Option::is_none")]
    mark: Option<Mark>,
    #[serde(flatten)]
    message: &'a Message,
}

/// Render one message as a single line.
pub fn render_message(
    format: OutputFormat,
    timeline: Timeline,
    message: &Message,
    mark: Option<Mark>,
    color: bool,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(&JsonLine {
            timeline,
            mark,
            message,
        }),
        OutputFormat::Plain => Ok(render_plain(message, mark, color)),
    }
}

pub fn render_entry(
    format: OutputFormat,
    timeline: Timeline,
    entry: &FeedEntry,
    color: bool,
) -> Result<String, serde_json::Error> {
    render_message(format, timeline, &entry.message, entry.mark, color)
}

fn render_plain(message: &Message, mark: Option<Mark>, color: bool) -> String {
    let time = message.created_at.with_timezone(&Local).format("%H:%M");
    let author = format!("@{}", message.author.screen_name);
    // Line breaks inside a status would break the one-line-per-message layout.
    let text = message.text.replace(['\r', '\n'], " ");

    if !color {
        let tag = match mark {
            Some(Mark::Mine) => " (you)",
            Some(Mark::Reply) => " (to you)",
            None => "",
        };
        return format!("{time} {author}{tag}: {text}");
    }

    let author = match mark {
        Some(Mark::Mine) => author.green().bold().to_string(),
        Some(Mark::Reply) => author.yellow().bold().to_string(),
        None => author.cyan().to_string(),
    };
    format!("{} {author}: {text}", time.to_string().dimmed())
}

/// Render a fetch error line for stderr.
pub fn render_error(timeline: Timeline, message: &str, color: bool) -> String {
    let label = format!("[{timeline}]");
    if color {
        format!("{} {} {message}", "error".red().bold(), label.dimmed())
    } else {
        format!("error {label} {message}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use hechte_core::User;

    use super::*;

    fn message(text: &str) -> Message {
        Message {
            id: 42,
            created_at: chrono::DateTime::default(),
            text: text.into(),
            author: Arc::new(User {
                id: 1,
                name: "Ada".into(),
                screen_name: "ada".into(),
                location: None,
                description: None,
                profile_image_url: None,
                url: None,
                protected: false,
            }),
            favorited: false,
            source: None,
        }
    }

    #[test]
    fn plain_lines_flatten_newlines_and_tag_marks() {
        let line = render_plain(&message("one\ntwo"), Some(Mark::Reply), false);
        assert!(line.ends_with("@ada (to you): one two"), "{line}");
    }

    #[test]
    fn json_lines_carry_timeline_and_message() {
        let line = render_message(
            OutputFormat::Json,
            Timeline::Everyone,
            &message("hi"),
            None,
            false,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["timeline"], "everyone");
        assert_eq!(value["id"], 42);
        assert_eq!(value["author"]["screen_name"], "ada");
        assert!(value.get("mark").is_none());
    }
}
