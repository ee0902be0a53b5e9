//! Output formatting for received records
//!
//! Chat-message records get a one-line summary in text mode; anything else
//! falls back to compact JSON.

use owo_colors::{OwoColorize, Style};
use serde_json::Value;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable text (default)
    Text,
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON, as received
    Compact,
}

impl Format {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text" | "t" => Format::Text,
            "json" | "j" => Format::Json,
            "compact" | "c" => Format::Compact,
            _ => Format::Text, // Text is default for human readability
        }
    }
}

/// Output formatter
pub struct Formatter {
    format: Format,
    use_color: bool,
}

/// Color styles for terminal output
struct ColorStyles {
    location: Style,
    author: Style,
    discriminator: Style,
    bot: Style,
    attachment: Style,
}

impl ColorStyles {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                location: Style::new().dimmed(),
                author: Style::new().bold(),
                discriminator: Style::new().dimmed(),
                bot: Style::new().cyan(),
                attachment: Style::new().blue().underline(),
            }
        } else {
            Self {
                location: Style::new(),
                author: Style::new(),
                discriminator: Style::new(),
                bot: Style::new(),
                attachment: Style::new(),
            }
        }
    }
}

impl Formatter {
    /// Create a new formatter
    pub fn new(format: &str) -> Self {
        Self {
            format: Format::from_str(format),
            use_color: true, // Default on, caller sets based on TTY
        }
    }

    /// Enable or disable color output
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Print a record to stdout
    pub fn print(&self, record: &Value) {
        println!("{}", self.render(record));
    }

    /// Render a record without the trailing newline
    pub fn render(&self, record: &Value) -> String {
        match self.format {
            Format::Text => self
                .render_text(record)
                .unwrap_or_else(|| record.to_string()),
            Format::Json => {
                serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string())
            }
            Format::Compact => record.to_string(),
        }
    }

    /// `[guild channel] author#hash: content`, then one attachment per line
    ///
    /// `None` when the record is not a chat message.
    fn render_text(&self, record: &Value) -> Option<String> {
        let styles = ColorStyles::new(self.use_color);

        let guild = record.get("guild")?.as_str()?;
        let channel = record.get("channel")?.as_str()?;
        let author = record.get("author")?.as_str()?;
        let content = record.get("content").and_then(Value::as_str).unwrap_or("");
        let hash = record
            .get("author_hash")
            .and_then(Value::as_str)
            .unwrap_or("0");

        let location = format!("[{guild} {channel}]");
        let mut line = format!(
            "{} {}{}",
            location.style(styles.location),
            author.style(styles.author),
            format!("#{hash}").style(styles.discriminator),
        );
        if record.get("author_bot").and_then(Value::as_bool) == Some(true) {
            line.push_str(&format!(" {}", "BOT".style(styles.bot)));
        }
        line.push_str(": ");
        line.push_str(content);

        let attachments = record
            .get("attachments")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for url in attachments {
            line.push('\n');
            line.push_str(&url.style(styles.attachment).to_string());
        }

        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> Value {
        json!({
            "author": "ada",
            "author_hash": "1815",
            "content": "hello world",
            "guild": "EleutherAI",
            "channel": "general",
            "author_bot": false,
            "attachments": [],
        })
    }

    fn plain(format: &str) -> Formatter {
        Formatter::new(format).with_color(false)
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(Format::from_str("JSON"), Format::Json);
        assert_eq!(Format::from_str("c"), Format::Compact);
        assert_eq!(Format::from_str("whatever"), Format::Text);
    }

    #[test]
    fn test_text_message_line() {
        assert_eq!(
            plain("text").render(&message()),
            "[EleutherAI general] ada#1815: hello world"
        );
    }

    #[test]
    fn test_text_attachments_on_own_lines() {
        let mut record = message();
        record["attachments"] = json!(["https://cdn.example.com/a.png", "https://cdn.example.com/b.mp4"]);

        assert_eq!(
            plain("text").render(&record),
            "[EleutherAI general] ada#1815: hello world\n\
             https://cdn.example.com/a.png\n\
             https://cdn.example.com/b.mp4"
        );
    }

    #[test]
    fn test_text_marks_bots() {
        let mut record = message();
        record["author_bot"] = json!(true);
        assert_eq!(
            plain("text").render(&record),
            "[EleutherAI general] ada#1815 BOT: hello world"
        );
    }

    #[test]
    fn test_text_falls_back_to_json() {
        let record = json!({"seq": 1});
        assert_eq!(plain("text").render(&record), r#"{"seq":1}"#);
    }

    #[test]
    fn test_compact_and_pretty_json() {
        let record = json!({"seq": 1});
        assert_eq!(plain("compact").render(&record), r#"{"seq":1}"#);
        assert_eq!(plain("json").render(&record), "{\n  \"seq\": 1\n}");
    }
}
