//! Bakes network settings from `.env` into the firmware and adds the esp-hal
//! linker script.

const KEYS: [&str; 4] = ["WIFI_SSID", "WIFI_PASSWORD", "MQTT_HOST", "MQTT_PORT"];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    // A missing .env is fine: every key has a compiled-in default.
    let _ = dotenvy::dotenv();

    for key in KEYS {
        if let Ok(value) = std::env::var(key) {
            if key == "MQTT_PORT" && value.parse::<u16>().is_err() {
                panic!("MQTT_PORT must be a port number, got {value:?}");
            }
            println!("cargo:rustc-env={key}={value}");
        }
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
