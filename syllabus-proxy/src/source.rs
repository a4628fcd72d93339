use std::path::Path;

use scraper::{ElementRef, Html};
use syllabus_parser::{Error, Result};

const SKIPPED: &[&str] = &["head", "script", "style", "noscript", "template"];
const LINE_BREAKS: &[&str] = &[
    "div", "li", "tr", "dt", "dd", "h1", "h2", "h3", "h4", "h5", "h6", "header", "footer",
    "section", "article",
];
const PARAGRAPHS: &[&str] = &["p", "ul", "ol", "table", "dl", "blockquote", "pre"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Html,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "text" | "md" | "markdown" => Ok(Self::Text),
            "html" | "htm" => Ok(Self::Html),
            "pdf" | "docx" | "doc" => Err(Error::source_read(
                path.display().to_string(),
                format!("no text converter for .{extension} files"),
            )),
            _ => Err(Error::source_read(
                path.display().to_string(),
                "unsupported file type",
            )),
        }
    }

    /// A missing content type is read as plain text.
    pub fn from_content_type(source_name: &str, content_type: Option<&str>) -> Result<Self> {
        let mime = content_type
            .and_then(|value| value.split(';').next())
            .map(|mime| mime.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match mime.as_str() {
            "" | "text/plain" | "text/markdown" => Ok(Self::Text),
            "text/html" | "application/xhtml+xml" => Ok(Self::Html),
            other => Err(Error::source_read(
                source_name,
                format!("no text converter for {other}"),
            )),
        }
    }

    pub fn to_text(self, content: String) -> String {
        match self {
            Self::Text => content,
            Self::Html => html_to_text(&content),
        }
    }
}

pub async fn read_file(path: &Path) -> Result<String> {
    let format = Format::from_path(path)?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| Error::source_read(path.display().to_string(), err))?;

    Ok(format.to_text(content))
}

pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| Error::source_read(url, err))?;

    let format = Format::from_content_type(
        url,
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
    )?;

    let body = response
        .text()
        .await
        .map_err(|err| Error::source_read(url, err))?;

    Ok(format.to_text(body))
}

/// Flattens a document to lines of text. Block elements end a line, paragraph-like
/// blocks end with a blank line, and script or style content is dropped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut flat = String::new();
    flatten(document.root_element(), &mut flat);

    let mut lines: Vec<String> = Vec::new();
    for line in flat.split('\n') {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().map_or(true, String::is_empty) {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    lines.join("\n")
}

fn flatten(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(&text.replace(['\n', '\r', '\t'], " "));
            continue;
        }

        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };

        let name = child.value().name();
        if SKIPPED.contains(&name) {
            continue;
        }
        if name == "br" {
            end_line(out);
            continue;
        }

        let breaks = LINE_BREAKS.contains(&name);
        let paragraph = PARAGRAPHS.contains(&name);

        if breaks || paragraph {
            end_line(out);
        }

        flatten(child, out);

        if paragraph {
            end_paragraph(out);
        } else if breaks {
            end_line(out);
        }
    }
}

/// Starts a new line unless the current one is still empty.
fn end_line(out: &mut String) {
    let len = out.trim_end_matches(' ').len();
    out.truncate(len);

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn end_paragraph(out: &mut String) {
    end_line(out);

    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}
