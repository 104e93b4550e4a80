use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::data::DatasetKind;
use crate::map::MapLayers;
use crate::status::StatusKind;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

const LGV_COLOR: Color = Color::Green;
const TUNNEL_COLOR: Color = Color::Red;
const OUTLINE_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_COLOR: Color = Color::Yellow;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Popup
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_map(frame, app, chunks[0]);
    render_popup(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    if app.loading {
        render_loading(frame, app, chunks[0]);
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " LGV France ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 pixels per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.renderer.render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        app.selected.as_ref(),
    );

    let cursor = app.mouse_pixel_pos().and_then(|(px, py)| {
        let (cx, cy) = ((px / 2) as u16, (py / 4) as u16);
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, cursor }, inner);
}

/// Braille map layers plus the cursor marker
struct MapWidget {
    layers: MapLayers,
    cursor: Option<(u16, u16)>,
}

fn paint_canvas(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
    let rows = canvas.height().min(area.height as usize);
    let cols = canvas.width().min(area.width as usize);
    for row in 0..rows {
        for col in 0..cols {
            match canvas.cell(col, row) {
                Some(ch) if ch != '\u{2800}' => {
                    let (x, y) = (area.x + col as u16, area.y + row as u16);
                    buf[(x, y)].set_char(ch).set_fg(color);
                }
                _ => {}
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front
        paint_canvas(&self.layers.outline, OUTLINE_COLOR, area, buf);
        paint_canvas(&self.layers.lgv, LGV_COLOR, area, buf);
        paint_canvas(&self.layers.tunnels, TUNNEL_COLOR, area, buf);
        paint_canvas(&self.layers.highlight, HIGHLIGHT_COLOR, area, buf);

        if let Some((cx, cy)) = self.cursor {
            let (x, y) = (area.x + cx, area.y + cy);
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::White);
            }
        }
    }
}

fn render_popup(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.selected_label() {
        Some(label) => Line::from(vec![
            Span::styled(" ▶ ", Style::default().fg(HIGHLIGHT_COLOR)),
            Span::styled(label.to_string(), Style::default().fg(Color::White)),
        ]),
        None => Line::from(Span::styled(
            " click a line for details",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn count_span(
    app: &App,
    kind: DatasetKind,
    label: &str,
    color: Color,
    shown: bool,
) -> Span<'static> {
    let (visible, total) = app.counts(kind);
    let style = if shown {
        Style::default().fg(color)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!("{label} {visible}/{total} "), style)
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.renderer.settings;

    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        count_span(app, DatasetKind::Lgv, "[G]LGV", LGV_COLOR, settings.show_lgv),
        count_span(app, DatasetKind::Tunnels, "[T]unnels", TUNNEL_COLOR, settings.show_tunnels),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
    ];

    match app.status.current() {
        Some(msg) => {
            let color = match msg.kind {
                StatusKind::Progress => Color::Yellow,
                StatusKind::Success => Color::Green,
                StatusKind::Error => Color::Red,
            };
            spans.push(Span::styled(msg.text.clone(), Style::default().fg(color)));
            if !msg.detail.is_empty() {
                spans.push(Span::styled(
                    format!(": {}", msg.detail),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        None => spans.push(Span::styled(
            "hjkl:pan +/-:zoom u:update r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Centered box shown while the first load blocks the UI
fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let (title, detail) = app
        .status
        .current()
        .map(|m| (m.text.as_str(), m.detail.as_str()))
        .unwrap_or(("Loading", ""));

    let width = (title.len().max(detail.len()) as u16 + 6).min(area.width);
    let height = 4.min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    let text = vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(detail.to_string(), Style::default().fg(Color::DarkGray))),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}
