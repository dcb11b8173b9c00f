use iced::alignment;
use iced::mouse;
use iced::widget::canvas::{self, event, Event, Frame, Geometry, Path, Stroke, Text};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::gui::types::Message;
use crate::panel::display::{
    draw_zone_value, format_time, plot_mode_label, LcdValues, Zone, FONT_SIZE, LCD_HEIGHT,
    LCD_LEFT, LCD_TOP, LCD_WIDTH,
};
use crate::panel::regions::{Action, RegionMap, Shape};

/** Hover hint shown while the pointer is over no enabled region. */
pub const NO_FEATURE_HINT: &str = "No Feature";

const PANEL_BACKGROUND: Color = Color {
    r: 0x6B as f32 / 255.0,
    g: 0x5E as f32 / 255.0,
    b: 0x5E as f32 / 255.0,
    a: 1.0,
};

/**
 * The control panel canvas: draws the LCD and the interactive regions, and
 * turns pointer events into hover/click messages through region hit
 * testing. Disabled and unresolved clicks never leave this type.
 */
pub struct PanelSurface<'a> {
    pub regions: &'a RegionMap,
    pub lcd: &'a LcdValues,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceState {
    hover: Option<Action>,
}

impl<'a> PanelSurface<'a> {
    fn hover_at(&self, position: Point) -> Option<Action> {
        self.regions
            .resolve(position)
            .filter(|region| region.enabled)
            .map(|region| region.action)
    }
}

impl<'a> canvas::Program<Message> for PanelSurface<'a> {
    type State = SurfaceState;

    fn update(
        &self,
        state: &mut SurfaceState,
        event: Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (event::Status, Option<Message>) {
        let Some(position) = cursor.position_in(bounds) else {
            if state.hover.take().is_some() {
                return (event::Status::Ignored, Some(Message::PanelHover(None)));
            }
            return (event::Status::Ignored, None);
        };

        match event {
            Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                let hover = self.hover_at(position);
                if hover != state.hover {
                    state.hover = hover;
                    return (event::Status::Captured, Some(Message::PanelHover(hover)));
                }

                (event::Status::Ignored, None)
            },
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                match self.regions.resolve(position) {
                    Some(region) if region.enabled => {
                        (event::Status::Captured, Some(Message::PanelPressed(region.action)))
                    },
                    // disabled or unresolved clicks are no-ops
                    _ => (event::Status::Ignored, None),
                }
            },
            _ => (event::Status::Ignored, None),
        }
    }

    fn draw(
        &self,
        _state: &SurfaceState,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());

        frame.fill_rectangle(Point::ORIGIN, frame.size(), PANEL_BACKGROUND);
        frame.fill_rectangle(
            Point::new(LCD_LEFT, LCD_TOP),
            Size::new(LCD_WIDTH, LCD_HEIGHT),
            Color::BLACK,
        );

        draw_lcd_labels(&mut frame);
        draw_lcd_values(&mut frame, self.lcd);
        draw_regions(&mut frame, self.regions);

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        _state: &SurfaceState,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if let Some(position) = cursor.position_in(bounds) {
            if self.hover_at(position).is_some() {
                return mouse::Interaction::Pointer;
            }
        }

        mouse::Interaction::default()
    }
}

fn lcd_label(frame: &mut Frame, text: &str, zone: Zone, label_offset: f32) {
    let value_origin = zone.origin();

    frame.fill_text(Text {
        content: text.to_string(),
        position: Point::new(value_origin.x - label_offset, value_origin.y),
        color: Color::WHITE,
        size: FONT_SIZE.into(),
        vertical_alignment: alignment::Vertical::Bottom,
        ..Text::default()
    });
}

fn draw_lcd_labels(frame: &mut Frame) {
    lcd_label(frame, "Temp= ", Zone::Temperature, 40.0);
    lcd_label(frame, "Light= ", Zone::Light, 40.0);
    lcd_label(frame, "Step= ", Zone::Steps, 40.0);
    lcd_label(frame, "Sound= ", Zone::Sound, 48.0);
    lcd_label(frame, "Time= ", Zone::Time, 40.0);
}

fn draw_lcd_values(frame: &mut Frame, lcd: &LcdValues) {
    let value = |raw: Option<String>| raw.unwrap_or_else(|| String::from("N/A"));

    draw_zone_value(frame, Zone::Temperature, &value(lcd.temperature.map(|v| v.to_string())));
    draw_zone_value(frame, Zone::Light, &value(lcd.light.map(|v| v.to_string())));
    draw_zone_value(frame, Zone::Steps, &value(lcd.steps.map(|v| v.to_string())));
    draw_zone_value(frame, Zone::Sound, &value(lcd.sound.map(|v| v.to_string())));
    draw_zone_value(frame, Zone::Time, &value(lcd.time.map(format_time)));

    if let Some(mode) = lcd.plot_mode {
        draw_zone_value(frame, Zone::PlotMode, &format!("Plot State: {}", plot_mode_label(mode)));
    }
}

fn draw_regions(frame: &mut Frame, regions: &RegionMap) {
    for region in regions.iter() {
        let path = match region.shape {
            Shape::Rect { top, left, width, height } => Path::rectangle(
                Point::new(left, top),
                Size::new(width, height),
            ),
            Shape::Circle { cx, cy, radius } => Path::circle(Point::new(cx, cy), radius),
        };

        let color = if region.enabled {
            Color::from_rgb8(0x9E, 0xE4, 0x93)
        } else {
            Color::from_rgb8(0x4A, 0x42, 0x42)
        };

        frame.stroke(&path, Stroke::default().with_color(color).with_width(1.5));
    }
}

#[cfg(test)]
mod tests {
    use iced::widget::canvas::Program;

    use super::*;

    fn bounds() -> Rectangle {
        Rectangle::new(Point::ORIGIN, Size::new(560.0, 320.0))
    }

    fn press() -> Event {
        Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left))
    }

    fn moved(position: Point) -> Event {
        Event::Mouse(mouse::Event::CursorMoved { position })
    }

    // inside the time rectangle
    const TIME_POINT: Point = Point { x: 300.0, y: 150.0 };
    // center of the sound circle
    const SOUND_POINT: Point = Point { x: 184.0, y: 254.0 };

    #[test]
    fn clicks_on_disabled_regions_are_dropped() {
        let regions = RegionMap::panel();
        let lcd = LcdValues::default();
        let surface = PanelSurface { regions: &regions, lcd: &lcd };
        let mut state = SurfaceState::default();

        let (status, message) =
            surface.update(&mut state, press(), bounds(), mouse::Cursor::Available(TIME_POINT));

        assert_eq!(status, event::Status::Ignored);
        assert!(message.is_none());
    }

    #[test]
    fn clicks_on_enabled_regions_dispatch_their_action() {
        let mut regions = RegionMap::panel();
        regions.enable(Action::ReadTime);
        let lcd = LcdValues::default();
        let surface = PanelSurface { regions: &regions, lcd: &lcd };
        let mut state = SurfaceState::default();

        let (status, message) =
            surface.update(&mut state, press(), bounds(), mouse::Cursor::Available(TIME_POINT));

        assert_eq!(status, event::Status::Captured);
        assert!(matches!(message, Some(Message::PanelPressed(Action::ReadTime))));
    }

    #[test]
    fn hovering_a_disabled_region_clears_the_hint() {
        let mut regions = RegionMap::panel();
        regions.enable(Action::ReadTime);
        let lcd = LcdValues::default();
        let surface = PanelSurface { regions: &regions, lcd: &lcd };
        let mut state = SurfaceState::default();

        let (_, message) = surface.update(
            &mut state,
            moved(TIME_POINT),
            bounds(),
            mouse::Cursor::Available(TIME_POINT),
        );
        assert!(matches!(message, Some(Message::PanelHover(Some(Action::ReadTime)))));

        // the sound circle was never enabled
        let (_, message) = surface.update(
            &mut state,
            moved(SOUND_POINT),
            bounds(),
            mouse::Cursor::Available(SOUND_POINT),
        );
        assert!(matches!(message, Some(Message::PanelHover(None))));
    }
}
