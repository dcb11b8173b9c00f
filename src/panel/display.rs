use iced::alignment;
use iced::widget::canvas::{Frame, Text};
use iced::{Color, Point, Rectangle, Size};

// LCD layout, in panel coordinates
pub const LCD_LEFT: f32 = 238.0;
pub const LCD_TOP: f32 = 121.0;
pub const LCD_WIDTH: f32 = 157.0;
pub const LCD_HEIGHT: f32 = 141.0;

const START_X: f32 = 245.0;
const START_Y: f32 = 139.0;
const FONT_WIDTH: f32 = 8.0;
const FONT_HEIGHT: f32 = 11.0;
const NEW_LINE: f32 = 16.0;
const V_SPLIT: f32 = LCD_WIDTH / 2.0;

pub const FONT_SIZE: f32 = 12.0;

/**
 * One value cell on the LCD, keyed by the action whose result it renders.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Temperature,
    Light,
    Steps,
    Sound,
    Time,
    PlotMode,
}

impl Zone {
    /** Text baseline origin of the zone's value cell. */
    pub fn origin(self) -> Point {
        match self {
            Zone::Temperature => Point::new(START_X + FONT_WIDTH * 5.0, START_Y),
            Zone::Light => Point::new(START_X + V_SPLIT + FONT_WIDTH * 5.0, START_Y),
            Zone::Steps => Point::new(START_X + FONT_WIDTH * 5.0, START_Y + NEW_LINE),
            Zone::Sound => Point::new(START_X + V_SPLIT + FONT_WIDTH * 6.0, START_Y + NEW_LINE),
            Zone::Time => Point::new(START_X + FONT_WIDTH * 5.0, START_Y + NEW_LINE * 7.0),
            Zone::PlotMode => Point::new(START_X, START_Y + NEW_LINE * 4.0),
        }
    }

    fn cell(self) -> Size {
        let width = match self {
            Zone::Temperature | Zone::Light => FONT_WIDTH + 3.0,
            Zone::Steps | Zone::Sound => FONT_WIDTH,
            Zone::Time => FONT_WIDTH * 3.0,
            Zone::PlotMode => FONT_WIDTH * 6.0,
        };

        Size::new(width, FONT_HEIGHT)
    }

    pub fn color(self) -> Color {
        match self {
            Zone::Temperature => Color::from_rgb8(0x38, 0xF4, 0x41),
            Zone::Light => Color::from_rgb8(0x63, 0xFF, 0x4F),
            Zone::Steps => Color::from_rgb8(0xFA, 0xFF, 0x00),
            Zone::Sound => Color::from_rgb8(0x00, 0xFF, 0xED),
            Zone::Time => Color::from_rgb8(0xED, 0xDB, 0x55),
            Zone::PlotMode => Color::from_rgb8(0x7B, 0xC9, 0xD8),
        }
    }

    /**
     * The area blanked before a fresh value is drawn. Oversized relative to
     * the cell so a shorter value fully covers a longer stale one.
     */
    pub fn clear_rect(self) -> Rectangle {
        let origin = self.origin();
        let cell = self.cell();

        Rectangle {
            x: origin.x - FONT_WIDTH / 2.0,
            y: origin.y - FONT_HEIGHT,
            width: cell.width * 3.0,
            height: cell.height * 1.5,
        }
    }
}

/**
 * Latest values shown on the LCD; `None` renders as "N/A".
 */
#[derive(Debug, Clone, Default)]
pub struct LcdValues {
    pub temperature: Option<u32>,
    pub light: Option<u32>,
    pub sound: Option<u32>,
    pub time: Option<u32>,
    pub steps: Option<i16>,
    pub plot_mode: Option<u8>,
}

/** The time characteristic reports tenths of a second. */
pub fn format_time(raw: u32) -> String {
    format!("{}.{}", raw / 10, raw % 10)
}

pub fn plot_mode_label(mode: u8) -> &'static str {
    match mode {
        1 => "Sound vs Time",
        2 => "Temp vs Time",
        _ => "Accel. vs Time",
    }
}

/**
 * Erase-then-draw: blank the zone's clear area, then draw the new value at
 * the fixed baseline. Never drawn incrementally, so variable-width stale
 * text cannot bleed through.
 */
pub fn draw_zone_value(frame: &mut Frame, zone: Zone, text: &str) {
    let clear = zone.clear_rect();
    frame.fill_rectangle(Point::new(clear.x, clear.y), clear.size(), Color::BLACK);

    frame.fill_text(Text {
        content: text.to_string(),
        position: zone.origin(),
        color: zone.color(),
        size: FONT_SIZE.into(),
        vertical_alignment: alignment::Vertical::Bottom,
        ..Text::default()
    });
}
