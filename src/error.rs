use std::fmt::Display;
use thiserror::Error;
use msgbox::IconType;
use btleplug;
use iced;

use crate::device::types::Feature;

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (iced): {source}")]
    Iced { #[from] source: iced::Error },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No usable bluetooth adapter")]
    NoAdapter,

    #[error("No matching peripheral found before the scan window expired")]
    DeviceNotFound,

    #[error("No peripheral is attached to the session")]
    NotConnected,

    #[error("The fitness service is not present on the peripheral")]
    MissingService,

    #[error("The {0} characteristic is not present on the peripheral")]
    MissingCharacteristic(Feature),
}

pub fn error_msgbox<T: Display>(message: &'static str, error: &T) {
    let message = format!("{}: {}", message, error);
    eprintln!("{}", &message);
    if let Err(err) = msgbox::create(concat!("Shape The World Panel ", env!("CARGO_PKG_VERSION")), &message, IconType::Error) {
        eprintln!("Failed to create msgbox: {:?}", err);
    }
}
