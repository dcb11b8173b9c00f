use clap::Parser;
use log::info;
use shapepanel::device::constants::DEVICE_NAME_PREFIX;
use shapepanel::error::{error_msgbox, AppRunError};
use shapepanel::{init_logging, run, PanelOptions};

#[derive(Debug, Parser)]
#[command(version, about = "Remote control panel for the Shape The World fitness device")]
struct Args {
    /// Advertised name prefix used to select the peripheral.
    #[arg(long, default_value = DEVICE_NAME_PREFIX)]
    device_prefix: String,
}

fn main() -> Result<(), AppRunError> {
    init_logging();
    info!(concat!("Shape The World Panel ", env!("CARGO_PKG_VERSION")));

    let args = Args::parse();

    match run(PanelOptions { device_prefix: args.device_prefix }) {
        Err(err) => {
            error_msgbox("Unexpected error", &err);
            Err(err)
        },
        Ok(()) => Ok(()),
    }
}
