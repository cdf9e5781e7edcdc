use commute_pro::{
    celebration::Celebration, model::Commute, timing::TimingPhase, util::format_duration,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

const HORIZONTAL_MARGIN: u16 = 5;

/// Feedback shown under the clock until the next submit
#[derive(Debug, Clone)]
pub enum Notice {
    Celebration(Celebration),
    Info(String),
    Error(String),
}

/// Everything the timer screen draws
pub struct TimerScreen<'a> {
    pub commute: &'a Commute,
    pub mode: &'a str,
    pub phase: TimingPhase,
    pub elapsed_secs: f64,
    pub best_secs: Option<f64>,
    pub notice: Option<&'a Notice>,
}

impl Widget for &TimerScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let clock_style = match self.phase {
            TimingPhase::Idle => dim_style.patch(bold_style),
            TimingPhase::Running => bold_style.fg(Color::Green),
            TimingPhase::AwaitingSubmit => bold_style.fg(Color::Yellow),
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(area.height.saturating_sub(8) / 2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        Paragraph::new(Line::from(vec![
            Span::styled(self.commute.name.as_str(), bold_style),
            Span::styled(format!("  ({})", self.mode), italic_style),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        Paragraph::new(Span::styled(format_duration(self.elapsed_secs), clock_style))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        let best = match self.best_secs {
            Some(best) => format!("best {}", format_duration(best)),
            None => "no trips yet".to_string(),
        };
        Paragraph::new(Span::styled(best, dim_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        if let Some(notice) = self.notice {
            let line = match notice {
                Notice::Celebration(c) if c.is_record() => Line::from(vec![
                    Span::styled(
                        c.headline.as_str(),
                        bold_style.fg(Color::Magenta),
                    ),
                    Span::raw("  "),
                    Span::raw(c.detail.as_str()),
                ]),
                Notice::Celebration(c) => Line::from(vec![
                    Span::styled(c.headline.as_str(), bold_style),
                    Span::raw("  "),
                    Span::raw(c.detail.as_str()),
                ]),
                Notice::Info(msg) => Line::from(Span::styled(msg.as_str(), italic_style)),
                Notice::Error(msg) => {
                    Line::from(Span::styled(msg.as_str(), bold_style.fg(Color::Red)))
                }
            };
            Paragraph::new(line)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(chunks[4], buf);
        }

        let hints = match self.phase {
            TimingPhase::Idle => "(space) start / (q) quit",
            TimingPhase::Running => "(space) stop / (r) reset / (q) quit",
            TimingPhase::AwaitingSubmit => "(enter) save / (r) discard / (q) quit",
        };
        Paragraph::new(Span::styled(hints, italic_style))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }
}
