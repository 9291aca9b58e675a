use ratatui::style::{Color, Modifier, Style};

// ── Surfaces ──
pub const BG: Color = Color::Rgb(16, 17, 21);
pub const SURFACE: Color = Color::Rgb(23, 25, 31);
pub const PANEL: Color = Color::Rgb(30, 33, 40);
pub const BORDER: Color = Color::Rgb(48, 53, 64);

// ── Text ──
pub const TEXT: Color = Color::Rgb(205, 209, 216);
pub const DIM: Color = Color::Rgb(98, 104, 118);
pub const MUTED: Color = Color::Rgb(140, 147, 161);
pub const BRIGHT: Color = Color::Rgb(236, 239, 244);

// ── Accents ──
pub const BLUE: Color = Color::Rgb(97, 175, 239);
pub const CYAN: Color = Color::Rgb(86, 182, 194);
pub const GREEN: Color = Color::Rgb(152, 195, 121);
pub const YELLOW: Color = Color::Rgb(229, 192, 123);
pub const RED: Color = Color::Rgb(224, 108, 117);
pub const PURPLE: Color = Color::Rgb(198, 120, 221);
pub const ORANGE: Color = Color::Rgb(209, 154, 102);
pub const PINK: Color = Color::Rgb(230, 130, 180);

// ── Lane colors ──
const LANES: [Color; 8] = [BLUE, GREEN, ORANGE, PURPLE, CYAN, PINK, YELLOW, RED];

/// Color for a palette index; palettes larger than the table wrap around
pub fn lane_color(index: usize) -> Color {
    LANES[index % LANES.len()]
}

// ── Styles ──

pub fn default_style() -> Style {
    Style::default().fg(TEXT).bg(BG)
}

pub fn surface_style() -> Style {
    Style::default().fg(TEXT).bg(SURFACE)
}

pub fn dim_style() -> Style {
    Style::default().fg(DIM)
}

pub fn selected_style() -> Style {
    Style::default().fg(BLUE).bg(Color::Rgb(38, 50, 68))
}

/// The row marked as the other side of a comparison
pub fn marked_style() -> Style {
    Style::default().bg(Color::Rgb(48, 36, 16))
}

pub fn key_hint_style() -> Style {
    Style::default().fg(MUTED).add_modifier(Modifier::BOLD)
}

pub fn head_label() -> Style {
    Style::default().fg(GREEN).add_modifier(Modifier::BOLD)
}

pub fn remote_label() -> Style {
    Style::default().fg(RED)
}

pub fn tag_label() -> Style {
    Style::default().fg(YELLOW)
}

pub fn stash_label() -> Style {
    Style::default().fg(PURPLE)
}

pub fn status_added() -> Style {
    Style::default().fg(GREEN).add_modifier(Modifier::BOLD)
}

pub fn status_deleted() -> Style {
    Style::default().fg(RED).add_modifier(Modifier::BOLD)
}

pub fn status_modified() -> Style {
    Style::default().fg(YELLOW).add_modifier(Modifier::BOLD)
}
