use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A chat message as the server sends it in structured mode.
///
/// Messages without an author are server notices; they are still displayed,
/// just without the `author >` prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// An authorless message stamped with the current time.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// An empty author counts as no author.
    pub fn has_author(&self) -> bool {
        self.author.as_deref().is_some_and(|author| !author.is_empty())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.timestamp.format(DATE_FORMAT))?;
        match &self.author {
            Some(author) if !author.is_empty() => write!(f, "{author} > {}", self.content),
            _ => f.write_str(&self.content),
        }
    }
}

/// Extracts `author` from a rendered `"[date] author > content"` line.
///
/// Returns `None` for lines that lack either the closing bracket or the `>`
/// separator, or where the two are not laid out in that order.
pub fn parse_author(line: &str) -> Option<&str> {
    let bracket = line.find(']')?;
    let separator = line.find('>')?;
    let author = line.get(bracket + 2..separator.checked_sub(1)?)?;
    (!author.is_empty()).then_some(author)
}

/// Everything after the first `>` of a rendered line, or the whole line when
/// it carries no author separator.
pub fn parse_content(line: &str) -> &str {
    match line.split_once('>') {
        Some((_, content)) => content.strip_prefix(' ').unwrap_or(content),
        None => line,
    }
}

/// One unit handed to a graphical front end: the text to append and the
/// author it belongs to, so the front end can pick a colour per author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub text: String,
    pub author: Option<String>,
}

impl DisplayLine {
    pub fn from_text(line: &str) -> Self {
        Self {
            text: line.to_string(),
            author: parse_author(line).map(str::to_string),
        }
    }
}

impl From<&Message> for DisplayLine {
    fn from(message: &Message) -> Self {
        Self {
            text: message.to_string(),
            author: message.author.clone().filter(|author| !author.is_empty()),
        }
    }
}
