use iced::Point;

/**
 * The user-facing action a panel region is bound to.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadTime,
    ReadSound,
    ReadTemperature,
    ReadLight,
    ToggleSteps,
    PlotModeUp,
    PlotModeDown,
}

/**
 * Hit-test geometry of one panel control.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect { top: f32, left: f32, width: f32, height: f32 },
    Circle { cx: f32, cy: f32, radius: f32 },
}

impl Shape {
    /**
     * Rectangle containment is half-open: the left/top edges are inside,
     * the right/bottom edges are not. Circle containment excludes the
     * boundary.
     */
    pub fn contains(&self, point: Point) -> bool {
        match *self {
            Shape::Rect { top, left, width, height } => {
                point.x >= left && point.x < left + width
                    && point.y >= top && point.y < top + height
            },
            Shape::Circle { cx, cy, radius } => {
                let dx = point.x - cx;
                let dy = point.y - cy;
                dx * dx + dy * dy < radius * radius
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    pub shape: Shape,
    pub action: Action,
    pub hint: &'static str,
    pub enabled: bool,
}

/**
 * The fixed, ordered region registry. Geometry never changes after
 * construction; only `enabled` is toggled, by discovery outcomes and by
 * power-down.
 */
pub struct RegionMap {
    regions: Vec<Region>,
}

impl RegionMap {
    /** The control panel layout, in registration order. */
    pub fn panel() -> Self {
        let region = |shape, action, hint| Region { shape, action, hint, enabled: false };

        RegionMap {
            regions: vec![
                region(
                    Shape::Rect { top: 90.0, left: 266.0, width: 11.0, height: 11.0 },
                    Action::ReadLight,
                    "Click: Read light",
                ),
                region(
                    Shape::Rect { top: 125.0, left: 439.0, width: 18.0, height: 18.0 },
                    Action::ToggleSteps,
                    "Subscribe Steps Notification",
                ),
                region(
                    Shape::Rect { top: 121.0, left: 238.0, width: 156.0, height: 141.0 },
                    Action::ReadTime,
                    "Click: Read Time",
                ),
                region(
                    Shape::Rect { top: 85.0, left: 346.0, width: 14.0, height: 14.0 },
                    Action::ReadTemperature,
                    "Click: Read Temperature",
                ),
                region(
                    Shape::Circle { cx: 184.0, cy: 254.0, radius: 15.0 },
                    Action::ReadSound,
                    "Click: Read Sound",
                ),
                region(
                    Shape::Circle { cx: 499.0, cy: 129.0, radius: 10.0 },
                    Action::PlotModeUp,
                    "Change Plot Mode (Up)",
                ),
                region(
                    Shape::Circle { cx: 499.0, cy: 186.0, radius: 10.0 },
                    Action::PlotModeDown,
                    "Change Plot Mode (Down)",
                ),
            ],
        }
    }

    /** The first region, in registration order, containing the point. */
    pub fn resolve(&self, point: Point) -> Option<&Region> {
        self.regions.iter().find(|region| region.shape.contains(point))
    }

    pub fn enable(&mut self, action: Action) {
        for region in &mut self.regions {
            if region.action == action {
                region.enabled = true;
            }
        }
    }

    pub fn disable_all(&mut self) {
        for region in &mut self.regions {
            region.enabled = false;
        }
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        self.regions.iter().any(|region| region.action == action && region.enabled)
    }

    pub fn hint(&self, action: Action) -> Option<&'static str> {
        self.regions.iter().find(|region| region.action == action).map(|region| region.hint)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_containment_is_half_open() {
        let rect = Shape::Rect { top: 10.0, left: 20.0, width: 5.0, height: 6.0 };

        assert!(rect.contains(Point::new(20.0, 10.0)));
        assert!(rect.contains(Point::new(24.9, 15.9)));
        assert!(!rect.contains(Point::new(25.0, 12.0)));
        assert!(!rect.contains(Point::new(22.0, 16.0)));
        assert!(!rect.contains(Point::new(19.9, 12.0)));
    }

    #[test]
    fn circle_containment_excludes_the_boundary() {
        let circle = Shape::Circle { cx: 0.0, cy: 0.0, radius: 5.0 };

        assert!(circle.contains(Point::new(0.0, 0.0)));
        assert!(circle.contains(Point::new(3.0, 3.9)));
        // distance exactly equal to the radius is outside
        assert!(!circle.contains(Point::new(3.0, 4.0)));
        assert!(!circle.contains(Point::new(0.0, 5.0)));
    }

    #[test]
    fn resolution_is_exclusive_for_non_overlapping_regions() {
        let panel = RegionMap::panel();

        let light = panel.resolve(Point::new(270.0, 95.0)).expect("light region");
        assert_eq!(light.action, Action::ReadLight);

        let time = panel.resolve(Point::new(300.0, 200.0)).expect("time region");
        assert_eq!(time.action, Action::ReadTime);

        let sound = panel.resolve(Point::new(184.0, 254.0)).expect("sound region");
        assert_eq!(sound.action, Action::ReadSound);

        assert!(panel.resolve(Point::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn resolution_prefers_registration_order() {
        let overlapping = RegionMap {
            regions: vec![
                Region {
                    shape: Shape::Rect { top: 0.0, left: 0.0, width: 10.0, height: 10.0 },
                    action: Action::ReadLight,
                    hint: "first",
                    enabled: false,
                },
                Region {
                    shape: Shape::Rect { top: 0.0, left: 0.0, width: 20.0, height: 20.0 },
                    action: Action::ReadTime,
                    hint: "second",
                    enabled: false,
                },
            ],
        };

        assert_eq!(overlapping.resolve(Point::new(5.0, 5.0)).unwrap().action, Action::ReadLight);
        assert_eq!(overlapping.resolve(Point::new(15.0, 15.0)).unwrap().action, Action::ReadTime);
    }

    #[test]
    fn enablement_is_mutable_and_power_down_clears_it() {
        let mut panel = RegionMap::panel();
        assert!(!panel.is_enabled(Action::ReadTime));

        panel.enable(Action::ReadTime);
        panel.enable(Action::PlotModeUp);
        assert!(panel.is_enabled(Action::ReadTime));
        assert!(panel.is_enabled(Action::PlotModeUp));
        assert!(!panel.is_enabled(Action::ReadSound));

        panel.disable_all();
        assert!(!panel.is_enabled(Action::ReadTime));
        assert!(!panel.is_enabled(Action::PlotModeUp));
    }
}
