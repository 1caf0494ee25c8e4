use crate::{
    locale::{MessageKey, Messages, AUTHOR},
    manifest::{ManifestRecord, Outcome, ScanReport, ScanSummary},
};
use crossterm::{
    queue,
    style::{Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Cell, Row, Table, Widget},
};
use serde::Serialize;
use std::{
    io::{self, Write},
    path::Path,
};

const INDEX_COLUMN_WIDTH: u16 = 6;
const MIN_TABLE_WIDTH: u16 = 40;
const MAX_TABLE_WIDTH: u16 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Bold,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Plain => Style::default(),
            Tone::Bold => Style::default().add_modifier(Modifier::BOLD),
            Tone::Success => Style::default().fg(Color::Green),
            Tone::Warning => Style::default().fg(Color::Yellow),
            Tone::Error => Style::default().fg(Color::Red),
        }
    }
}

fn outcome_tone(outcome: Outcome) -> Tone {
    match outcome {
        Outcome::AlreadyEnabled | Outcome::JustEnabled => Tone::Success,
        Outcome::PermissionError => Tone::Warning,
        Outcome::FormatError | Outcome::OtherError => Tone::Error,
    }
}

pub fn status_text(record: &ManifestRecord, messages: &Messages) -> String {
    match record.outcome {
        Outcome::AlreadyEnabled => messages.text(MessageKey::StatusEnabled),
        Outcome::JustEnabled => messages.text(MessageKey::StatusTurnedOn),
        Outcome::FormatError => messages.text(MessageKey::StatusError),
        Outcome::PermissionError => messages.text(MessageKey::StatusWarning),
        Outcome::OtherError => messages.format(
            MessageKey::StatusErrorDetail,
            &[("error_msg", record.error_detail.as_deref().unwrap_or_default())],
        ),
    }
}

/// Per-file line printed ahead of the table, `None` for successful records.
pub fn error_line(record: &ManifestRecord, messages: &Messages) -> Option<String> {
    let file_path = record.path.display().to_string();
    let line = match record.outcome {
        Outcome::AlreadyEnabled | Outcome::JustEnabled => return None,
        Outcome::FormatError => {
            messages.format(MessageKey::JsonError, &[("file_path", file_path.as_str())])
        }
        Outcome::PermissionError => {
            messages.format(MessageKey::PermissionError, &[("file_path", file_path.as_str())])
        }
        Outcome::OtherError => messages.format(
            MessageKey::ProcessFail,
            &[
                ("file_path", file_path.as_str()),
                ("error_msg", record.error_detail.as_deref().unwrap_or_default()),
            ],
        ),
    };
    Some(line)
}

fn text_width(text: &str) -> u16 {
    u16::try_from(Span::raw(text).width()).unwrap_or(u16::MAX)
}

pub fn render_table(records: &[ManifestRecord], messages: &Messages, width: u16) -> Buffer {
    let width = width.clamp(MIN_TABLE_WIDTH, MAX_TABLE_WIDTH);
    let header_status = messages.text(MessageKey::TableHeaderStatus);
    let statuses: Vec<String> = records
        .iter()
        .map(|record| status_text(record, messages))
        .collect();
    let status_width = statuses
        .iter()
        .map(|status| text_width(status))
        .chain(std::iter::once(text_width(&header_status)))
        .max()
        .unwrap_or(0)
        .min(width / 2);

    let header = Row::new(vec![
        Cell::from(messages.text(MessageKey::TableHeaderIndex)),
        Cell::from(messages.text(MessageKey::TableHeaderModName)),
        Cell::from(header_status),
    ])
    .style(Tone::Bold.style());

    let rows: Vec<Row> = records
        .iter()
        .zip(statuses)
        .enumerate()
        .map(|(index, (record, status))| {
            Row::new(vec![
                Cell::from((index + 1).to_string()),
                Cell::from(record.display_name(messages)),
                Cell::from(Span::styled(status, outcome_tone(record.outcome).style())),
            ])
        })
        .collect();

    let height = u16::try_from(records.len())
        .unwrap_or(u16::MAX)
        .saturating_add(3);
    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    let table = Table::new(
        rows,
        [
            Constraint::Length(INDEX_COLUMN_WIDTH),
            Constraint::Fill(1),
            Constraint::Length(status_width),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    table.render(area, &mut buffer);
    buffer
}

type Segment = (String, Style);

/// Collapses each buffer row into runs of equally styled text. Cells hidden
/// behind wide characters are skipped.
fn buffer_lines(buffer: &Buffer) -> Vec<Vec<Segment>> {
    let area = buffer.area;
    let mut lines = Vec::with_capacity(area.height as usize);
    for y in area.top()..area.bottom() {
        let mut segments: Vec<Segment> = Vec::new();
        let mut x = area.left();
        while x < area.right() {
            let cell = buffer.get(x, y);
            let symbol = cell.symbol();
            let style = Style::default().fg(cell.fg).add_modifier(cell.modifier);
            match segments.last_mut() {
                Some((text, last)) if *last == style => text.push_str(symbol),
                _ => segments.push((symbol.to_string(), style)),
            }
            x = x.saturating_add(text_width(symbol).max(1));
        }
        if let Some((text, _)) = segments.last_mut() {
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
        }
        lines.push(segments);
    }
    lines
}

fn term_color(color: Color) -> Option<TermColor> {
    match color {
        Color::Reset => None,
        Color::Black => Some(TermColor::Black),
        Color::Red => Some(TermColor::DarkRed),
        Color::Green => Some(TermColor::DarkGreen),
        Color::Yellow => Some(TermColor::DarkYellow),
        Color::Blue => Some(TermColor::DarkBlue),
        Color::Magenta => Some(TermColor::DarkMagenta),
        Color::Cyan => Some(TermColor::DarkCyan),
        Color::Gray => Some(TermColor::Grey),
        Color::DarkGray => Some(TermColor::DarkGrey),
        Color::LightRed => Some(TermColor::Red),
        Color::LightGreen => Some(TermColor::Green),
        Color::LightYellow => Some(TermColor::Yellow),
        Color::LightBlue => Some(TermColor::Blue),
        Color::LightMagenta => Some(TermColor::Magenta),
        Color::LightCyan => Some(TermColor::Cyan),
        Color::White => Some(TermColor::White),
        Color::Rgb(r, g, b) => Some(TermColor::Rgb { r, g, b }),
        Color::Indexed(value) => Some(TermColor::AnsiValue(value)),
    }
}

pub struct Console<W: Write> {
    out: W,
    messages: Messages,
    color: bool,
    width: u16,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, messages: Messages, color: bool, width: u16) -> Self {
        Self {
            out,
            messages,
            color,
            width,
        }
    }

    fn write_segment(&mut self, text: &str, style: Style) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if !self.color {
            return queue!(self.out, Print(text));
        }
        let color = style.fg.and_then(term_color);
        let bold = style.add_modifier.contains(Modifier::BOLD);
        if let Some(color) = color {
            queue!(self.out, SetForegroundColor(color))?;
        }
        if bold {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        queue!(self.out, Print(text))?;
        if bold {
            queue!(self.out, SetAttribute(Attribute::Reset))?;
        }
        if color.is_some() {
            queue!(self.out, ResetColor)?;
        }
        Ok(())
    }

    pub fn line(&mut self, text: &str, tone: Tone) -> io::Result<()> {
        self.write_segment(text, tone.style())?;
        queue!(self.out, Print("\n"))?;
        self.out.flush()
    }

    pub fn blank(&mut self) -> io::Result<()> {
        self.line("", Tone::Plain)
    }

    pub fn detecting(&mut self) -> io::Result<()> {
        let text = self.messages.text(MessageKey::DetectingMods);
        self.line(&text, Tone::Bold)?;
        self.blank()
    }

    pub fn directory_not_found(&mut self, path: &Path) -> io::Result<()> {
        let error = self.messages.text(MessageKey::ErrorDirNotFound);
        self.line(&format!("{error}: {}", path.display()), Tone::Error)?;
        let hint = self.messages.text(MessageKey::ConfirmDirExists);
        self.line(&hint, Tone::Plain)
    }

    pub fn record_errors(&mut self, records: &[ManifestRecord]) -> io::Result<()> {
        for record in records {
            if let Some(text) = error_line(record, &self.messages) {
                self.line(&text, outcome_tone(record.outcome))?;
            }
        }
        Ok(())
    }

    pub fn table(&mut self, records: &[ManifestRecord]) -> io::Result<()> {
        let buffer = render_table(records, &self.messages, self.width);
        for segments in buffer_lines(&buffer) {
            for (text, style) in &segments {
                self.write_segment(text, *style)?;
            }
            queue!(self.out, Print("\n"))?;
        }
        self.out.flush()
    }

    /// Bold line with the substituted placeholder values in green.
    fn highlighted_line(&mut self, key: MessageKey, args: &[(&str, &str)]) -> io::Result<()> {
        let base = Tone::Bold.style();
        let value_style = base.fg(Color::Green);
        let mut rest = self.messages.template(key);
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
                break;
            };
            let name = &rest[open + 1..close];
            match args.iter().find(|(arg, _)| *arg == name) {
                Some((_, value)) => {
                    self.write_segment(&rest[..open], base)?;
                    self.write_segment(value, value_style)?;
                }
                None => self.write_segment(&rest[..=close], base)?,
            }
            rest = &rest[close + 1..];
        }
        self.write_segment(rest, base)?;
        queue!(self.out, Print("\n"))?;
        self.out.flush()
    }

    pub fn summary(&mut self, summary: &ScanSummary) -> io::Result<()> {
        let total = summary.total_count.to_string();
        let modified = summary.modified_count.to_string();
        if summary.total_count == 0 {
            let none = self.messages.text(MessageKey::ResultNoFiles);
            self.line(&none, Tone::Warning)?;
            return self.highlighted_line(
                MessageKey::ResultNoModified,
                &[("modified", modified.as_str())],
            );
        }
        if summary.modified_count == 0 {
            self.highlighted_line(MessageKey::ResultAllEnabled, &[("total", total.as_str())])
        } else {
            self.highlighted_line(
                MessageKey::ResultModified,
                &[("total", total.as_str()), ("modified", modified.as_str())],
            )
        }
    }

    pub fn report(&mut self, report: &ScanReport) -> io::Result<()> {
        self.record_errors(&report.records)?;
        if !report.records.is_empty() {
            self.table(&report.records)?;
        }
        self.summary(&report.summary())
    }

    pub fn closing(&mut self, prompt: bool) -> io::Result<()> {
        let author = self.messages.text(MessageKey::AuthorDesc);
        self.blank()?;
        self.line(&format!("{author} By: {AUTHOR}"), Tone::Plain)?;
        if prompt {
            self.blank()?;
            let press = self.messages.text(MessageKey::PressEnterClose);
            self.line(&press, Tone::Plain)?;
        }
        Ok(())
    }

    pub fn program_error(&mut self, error: &anyhow::Error) -> io::Result<()> {
        let detail = format!("{error:#}");
        let text = self
            .messages
            .format(MessageKey::ProgramError, &[("error_msg", detail.as_str())]);
        self.line(&text, Tone::Error)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    display_name: String,
    status: String,
    #[serde(flatten)]
    record: &'a ManifestRecord,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    root: &'a Path,
    language: &'static str,
    summary: ScanSummary,
    records: Vec<JsonRecord<'a>>,
}

pub fn to_json(report: &ScanReport, messages: &Messages) -> serde_json::Result<String> {
    let output = JsonReport {
        root: &report.root,
        language: messages.language().code(),
        summary: report.summary(),
        records: report
            .records
            .iter()
            .map(|record| JsonRecord {
                display_name: record.display_name(messages),
                status: status_text(record, messages),
                record,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&output)
}
