use iced::Event;

use crate::device::types::DeviceEvent;
use crate::panel::regions::Action;

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    ToggleConnection(bool),
    DeviceEvent(DeviceEvent),
    PanelHover(Option<Action>),
    PanelPressed(Action),
    GraderCodeChange(String),
    GraderSubmit,
    CommandSent(()),
}
