use std::env;

use crate::config::Settings;

pub const ENV_LISTEN_HOST: &str = "CREDITKITD_LISTEN_HOST";
pub const ENV_LISTEN_PORT: &str = "CREDITKITD_LISTEN_PORT";
pub const ENV_WEBHOOK_SECRET: &str = "CREDITKITD_WEBHOOK_SECRET";

impl Settings {
    pub fn from_env(mut self) -> Self {
        if let Ok(host) = env::var(ENV_LISTEN_HOST) {
            self.info.listen_host = host;
        }

        if let Ok(port_str) = env::var(ENV_LISTEN_PORT) {
            if let Ok(port) = port_str.parse() {
                self.info.listen_port = port;
            }
        }

        if let Ok(secret) = env::var(ENV_WEBHOOK_SECRET) {
            self.firma_plus.webhook_secret = secret;
        }

        self
    }
}
