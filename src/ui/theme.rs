use ratatui::style::Color;

use crate::store::Theme;

pub const BAR_BG: Color = Color::Rgb(23, 52, 127);
pub const BAR_TEXT: Color = Color::Rgb(235, 240, 255);
pub const BAR_HIGHLIGHT_BG: Color = Color::Rgb(73, 102, 177);
pub const BAR_HIGHLIGHT_TEXT: Color = Color::Rgb(255, 255, 255);

pub const BANNER_ERROR_BG: Color = Color::Rgb(150, 30, 30);
pub const BANNER_WARN_BG: Color = Color::Rgb(140, 100, 0);
pub const BANNER_TEXT: Color = Color::Rgb(255, 255, 255);

pub const STATUS_OK: Color = Color::Rgb(80, 180, 100);
pub const STATUS_ACTIVE: Color = Color::Rgb(120, 160, 255);
pub const STATUS_FAILED: Color = Color::Rgb(220, 80, 80);

/// Colors that change with the light/dark preference.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub panel_bg: Color,
    pub fg: Color,
    pub fg_dim: Color,
    pub border: Color,
    pub border_focus: Color,
    pub highlight_bg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: Color::Rgb(0, 0, 0),
                panel_bg: Color::Rgb(12, 12, 12),
                fg: Color::Rgb(190, 190, 190),
                fg_dim: Color::Rgb(128, 128, 128),
                border: Color::Rgb(61, 120, 120),
                border_focus: Color::Rgb(187, 94, 0),
                highlight_bg: Color::Rgb(108, 108, 108),
            },
            Theme::Light => Self {
                bg: Color::Rgb(250, 250, 250),
                panel_bg: Color::Rgb(238, 238, 238),
                fg: Color::Rgb(30, 30, 30),
                fg_dim: Color::Rgb(110, 110, 110),
                border: Color::Rgb(90, 140, 140),
                border_focus: Color::Rgb(200, 110, 0),
                highlight_bg: Color::Rgb(208, 208, 208),
            },
        }
    }
}
