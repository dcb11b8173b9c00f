use std::sync::{Arc, Mutex};
use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::SinkExt;
use iced::event::{self, Event};
use iced::widget::canvas::Canvas;
use iced::widget::{button, column, container, row, text, text_input, toggler};
use iced::{window, Alignment, Application, Command, Element, Length, Settings, Size, Subscription, Theme};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::device::connection::session_subscription;
use crate::device::types::{DeviceCommand, DeviceEvent, DeviceState, Feature, PlotDirection};
use crate::error::AppRunError;
use crate::gui::types::Message;
use crate::panel::display::LcdValues;
use crate::panel::regions::{Action, RegionMap};
use crate::panel::surface::{PanelSurface, NO_FEATURE_HINT};
use crate::PanelOptions;

pub struct ApplicationFlags {
    options: PanelOptions,
}

pub struct PanelApplication {
    // this token is cancelled upon exit
    app_cancel: CancellationToken,

    device_prefix: String,

    // commands for the device worker; the receiver is handed to the
    // subscription once the runtime starts it
    commands: Sender<DeviceCommand>,
    command_feed: Arc<Mutex<Option<Receiver<DeviceCommand>>>>,

    regions: RegionMap,
    lcd: LcdValues,
    hint: String,

    device_state: DeviceState,
    switched_on: bool,
    steps_notifying: bool,

    grader_code: String,
    grader_enabled: bool,
}

/** Grader codes are exactly 4 hex digits ("1a2B" activates 0x1A2B). */
pub fn parse_grader_code(code: &str) -> Option<u16> {
    let code = code.trim();

    if code.len() == 4 && code.chars().all(|c| c.is_ascii_hexdigit()) {
        u16::from_str_radix(code, 16).ok()
    } else {
        None
    }
}

impl PanelApplication {
    fn before_close(&mut self) {
        self.app_cancel.cancel();
    }

    fn send_command(&self, command: DeviceCommand) -> Command<Message> {
        let mut sender = self.commands.clone();

        let fut = async move {
            if let Err(err) = sender.send(command).await {
                error!("Failed to send device command: {:?}", err);
            }
        };

        Command::perform(fut, Message::CommandSent)
    }

    /**
     * The uniform power-down: toggle off, every region and the grader
     * submit disabled. The LCD keeps its last values, like the original
     * panel.
     */
    fn power_down(&mut self) {
        self.switched_on = false;
        self.steps_notifying = false;
        self.grader_enabled = false;
        self.regions.disable_all();
        self.hint = NO_FEATURE_HINT.to_string();
        self.device_state = DeviceState::Idle;
    }

    fn apply_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::StateChange(DeviceState::Idle) => {
                self.power_down();
            },
            DeviceEvent::StateChange(state) => {
                self.device_state = state;
            },
            DeviceEvent::FeatureFound(feature) => match feature {
                Feature::PlotState => {
                    self.regions.enable(Action::PlotModeUp);
                    self.regions.enable(Action::PlotModeDown);
                },
                Feature::Time => self.regions.enable(Action::ReadTime),
                Feature::Sound => self.regions.enable(Action::ReadSound),
                Feature::Temperature => self.regions.enable(Action::ReadTemperature),
                Feature::Light => self.regions.enable(Action::ReadLight),
                Feature::Steps => self.regions.enable(Action::ToggleSteps),
                Feature::Grader => self.grader_enabled = true,
            },
            DeviceEvent::Reading { feature, value } => match feature {
                Feature::Time => self.lcd.time = Some(value),
                Feature::Sound => self.lcd.sound = Some(value),
                Feature::Temperature => self.lcd.temperature = Some(value),
                Feature::Light => self.lcd.light = Some(value),
                _ => warn!("Unexpected reading for the {} feature", feature),
            },
            DeviceEvent::PlotMode(mode) => {
                self.lcd.plot_mode = Some(mode);
            },
            DeviceEvent::Steps(steps) => {
                self.lcd.steps = Some(steps);
            },
            DeviceEvent::StepsNotifying(notifying) => {
                self.steps_notifying = notifying;
            },
        }
    }

    fn panel_command(&self, action: Action) -> DeviceCommand {
        match action {
            Action::ReadTime => DeviceCommand::ReadFeature(Feature::Time),
            Action::ReadSound => DeviceCommand::ReadFeature(Feature::Sound),
            Action::ReadTemperature => DeviceCommand::ReadFeature(Feature::Temperature),
            Action::ReadLight => DeviceCommand::ReadFeature(Feature::Light),
            Action::ToggleSteps => DeviceCommand::ToggleStepsNotification,
            Action::PlotModeUp => DeviceCommand::ChangePlotMode(PlotDirection::Up),
            Action::PlotModeDown => DeviceCommand::ChangePlotMode(PlotDirection::Down),
        }
    }
}

impl Application for PanelApplication {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (PanelApplication, Command<Message>) {
        let (command_sender, command_receiver) = channel::<DeviceCommand>(8);

        let app = PanelApplication {
            app_cancel: CancellationToken::new(),
            device_prefix: flags.options.device_prefix,
            commands: command_sender,
            command_feed: Arc::new(Mutex::new(Some(command_receiver))),
            regions: RegionMap::panel(),
            lcd: LcdValues::default(),
            hint: NO_FEATURE_HINT.to_string(),
            device_state: DeviceState::Idle,
            switched_on: false,
            steps_notifying: false,
            grader_code: String::new(),
            grader_enabled: false,
        };

        (app, Command::none())
    }

    fn title(&self) -> String {
        String::from(concat!("Shape The World Panel ", env!("CARGO_PKG_VERSION")))
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                self.before_close();
                return window::close(id);
            },
            Message::EventOccurred(_) => {},
            Message::ToggleConnection(on) => {
                self.switched_on = on;
                if !on {
                    self.power_down();
                }
                return self.send_command(DeviceCommand::ToggleConnection);
            },
            Message::DeviceEvent(event) => {
                self.apply_device_event(event);
            },
            Message::PanelHover(Some(action)) => {
                if let Some(hint) = self.regions.hint(action) {
                    self.hint = hint.to_string();
                }
            },
            Message::PanelHover(None) => {
                self.hint = NO_FEATURE_HINT.to_string();
            },
            Message::PanelPressed(action) => {
                return self.send_command(self.panel_command(action));
            },
            Message::GraderCodeChange(code) => {
                self.grader_code = code;
            },
            Message::GraderSubmit => {
                if !self.grader_enabled {
                    warn!("No grader characteristic found - check ble connection");
                } else if let Some(code) = parse_grader_code(&self.grader_code) {
                    return self.send_command(DeviceCommand::ActivateGrader(code));
                } else {
                    warn!("Invalid grader code {:?}; expected 4 hex digits", self.grader_code);
                }
            },
            Message::CommandSent(()) => {},
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            event::listen().map(Message::EventOccurred),
            session_subscription(
                self.app_cancel.clone(),
                self.device_prefix.clone(),
                self.command_feed.clone(),
            )
            .map(Message::DeviceEvent),
        ])
    }

    fn view(&self) -> Element<Message> {
        let status = match &self.device_state {
            DeviceState::Idle => "Off".to_string(),
            DeviceState::Scanning => "Scanning…".to_string(),
            DeviceState::Connecting => "Connecting…".to_string(),
            DeviceState::Discovering => "Discovering…".to_string(),
            DeviceState::Ready => {
                if self.steps_notifying {
                    "Ready (steps notifications on)".to_string()
                } else {
                    "Ready".to_string()
                }
            },
        };

        let panel = Canvas::new(PanelSurface {
            regions: &self.regions,
            lcd: &self.lcd,
        })
        .width(Length::Fixed(560.0))
        .height(Length::Fixed(320.0));

        let grader_submit = button(text("Submit"))
            .on_press_maybe(self.grader_enabled.then_some(Message::GraderSubmit));

        container(
            column![
                row![
                    toggler(Some("Power".to_string()), self.switched_on, Message::ToggleConnection)
                        .width(Length::Shrink),
                    text(status),
                ]
                .align_items(Alignment::Center)
                .spacing(20),

                panel,

                text(&self.hint).size(14),

                row![
                    text("Grader code:"),
                    text_input("4 hex digits", &self.grader_code)
                        .on_input(Message::GraderCodeChange)
                        .width(100),
                    grader_submit,
                ]
                .align_items(Alignment::Center)
                .spacing(10),
            ]
            .align_items(Alignment::Center)
            .spacing(15),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }
}

pub fn run_application(options: PanelOptions) -> Result<(), AppRunError> {
    let flags = ApplicationFlags { options };
    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested)
    settings.id = Some("shapepanel".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(600.0, 520.0);
    settings.window.resizable = false;

    // this function will call process::exit() unless there was a startup error
    PanelApplication::run(settings)?;
    Ok(())
}
