//! Interroge un équipement TR-064 et affiche ses services et informations
//!
//! ```text
//! PMOTR064_CONFIG__DEVICE__USERNAME=admin \
//! PMOTR064_CONFIG__DEVICE__PASSWORD=secret \
//! cargo run -p pmotr064 --example device_info [config.yaml]
//! ```

use std::path::PathBuf;

use pmotr064::{ActionOptions, Tr064Client, Tr064Config};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = Tr064Config::load(path.as_deref())?;
    println!("Connecting to {:?}", config.endpoint());

    let client = Tr064Client::from_config(&config);
    let services = client.init()?;

    println!("Discovered {} services:", services.len());
    for (service, control_url) in services.iter() {
        println!("  {service} -> {control_url}");
    }

    let info = client.action(
        "urn:dslforum-org:service:DeviceInfo:1",
        "GetInfo",
        ActionOptions::default(),
    )?;

    let fields = ["NewModelName", "NewSoftwareVersion", "NewUpTime"];
    for (name, value) in fields.iter().zip(info.values(&fields)) {
        println!("{name}: {}", value.unwrap_or("<absent>"));
    }

    Ok(())
}
