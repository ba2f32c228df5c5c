// config.rs - configuration
//
// stonechat-ircd - single-server IRC daemon
// Copyright (C) 2024  The stonechat-ircd authors
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;

use serde_derive::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(clap::Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[clap(short, long, help = "Configuration file path")]
    pub(crate) config: Option<String>,
    #[clap(short, long, help = "Listen bind address")]
    listen: Option<IpAddr>,
    #[clap(short, long, help = "Listen port")]
    port: Option<u16>,
    #[clap(short = 'n', long, help = "Server name")]
    name: Option<String>,
    #[clap(short = 'N', long, help = "Network name")]
    network: Option<String>,
}

pub(crate) fn validate_nickname(nick: &str) -> Result<(), ValidationError> {
    if nick.is_empty() || nick.as_bytes()[0] == b'#' || nick.as_bytes()[0] == b'&' {
        Err(ValidationError::new(
            "Nickname must not be empty or have channel prefix.",
        ))
    } else if !nick.contains('.')
        && !nick.contains(':')
        && !nick.contains(',')
        && !nick.contains(' ')
    {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Nickname must not contains '.', ',', ':' or spaces.",
        ))
    }
}

pub(crate) fn validate_channel(channel: &str) -> Result<(), ValidationError> {
    if !channel.is_empty()
        && !channel.contains(':')
        && !channel.contains(',')
        && !channel.contains(' ')
        && (channel.as_bytes()[0] == b'#' || channel.as_bytes()[0] == b'&')
    {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Channel name must have '#' or '&' at start and \
                must not contains ',', ':' or spaces.",
        ))
    }
}

#[derive(PartialEq, Eq, Serialize, Deserialize, Debug, Clone, Validate)]
pub(crate) struct OperatorConfig {
    #[validate(custom = "validate_nickname")]
    pub(crate) name: String,
    // argon2 hash in PHC string form
    #[validate(length(min = 6))]
    pub(crate) password: String,
    pub(crate) mask: Option<String>,
}

/// Main configuration structure.
#[derive(PartialEq, Eq, Serialize, Deserialize, Debug, Clone, Validate)]
pub(crate) struct MainConfig {
    #[validate(contains = ".")]
    pub(crate) name: String,
    pub(crate) network: String,
    pub(crate) info: String,
    pub(crate) listen: IpAddr,
    pub(crate) port: u16,
    pub(crate) motd: Option<Vec<String>>,
    pub(crate) password: Option<String>,
    pub(crate) max_connections: Option<usize>,
    pub(crate) max_nickname_len: usize,
    pub(crate) ping_timeout: u64,
    pub(crate) pong_timeout: u64,
    #[validate]
    pub(crate) operators: Option<Vec<OperatorConfig>>,
}

impl MainConfig {
    pub(crate) fn new(cli: Cli) -> Result<MainConfig, Box<dyn Error>> {
        let config_path = cli.config.as_deref().unwrap_or("stonechat-ircd.toml");
        let mut config_file = File::open(config_path)?;
        let mut config_str = String::new();
        config_file.read_to_string(&mut config_str)?;
        // modify configuration by CLI options
        let mut config: MainConfig = toml::from_str(&config_str)?;
        if let Some(addr) = cli.listen {
            config.listen = addr;
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(name) = cli.name {
            config.name = name;
        }
        if let Some(network) = cli.network {
            config.network = network;
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for MainConfig {
    fn default() -> Self {
        MainConfig {
            name: "irc.localhost".to_string(),
            network: "IRCnetwork".to_string(),
            info: "This is IRC server".to_string(),
            listen: "127.0.0.1".parse().unwrap(),
            port: 6667,
            motd: None,
            password: None,
            max_connections: None,
            max_nickname_len: 20,
            ping_timeout: 120,
            pong_timeout: 20,
            operators: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::env::temp_dir;
    use std::fs;

    struct TempFileHandle {
        path: String,
    }

    impl TempFileHandle {
        fn new(path: &str) -> TempFileHandle {
            TempFileHandle {
                path: temp_dir().join(path).to_string_lossy().to_string(),
            }
        }
    }

    impl Drop for TempFileHandle {
        fn drop(&mut self) {
            fs::remove_file(self.path.as_str()).unwrap();
        }
    }

    fn cli_with_config(path: &str) -> Cli {
        Cli {
            config: Some(path.to_string()),
            listen: None,
            port: None,
            name: None,
            network: None,
        }
    }

    #[test]
    fn test_validate_nickname() {
        assert!(validate_nickname("alice").is_ok());
        assert!(validate_nickname("alice_b0b").is_ok());
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname("#alice").is_err());
        assert!(validate_nickname("&alice").is_err());
        assert!(validate_nickname("ali.ce").is_err());
        assert!(validate_nickname("ali,ce").is_err());
        assert!(validate_nickname("ali:ce").is_err());
        assert!(validate_nickname("ali ce").is_err());
    }

    #[test]
    fn test_validate_channel() {
        assert!(validate_channel("#chat").is_ok());
        assert!(validate_channel("&local").is_ok());
        assert!(validate_channel("").is_err());
        assert!(validate_channel("chat").is_err());
        assert!(validate_channel("#cha,t").is_err());
        assert!(validate_channel("#cha:t").is_err());
        assert!(validate_channel("#cha t").is_err());
    }

    #[test]
    fn test_mainconfig_new() {
        let file_handle = TempFileHandle::new("temp_stonechat_config.toml");
        fs::write(
            file_handle.path.as_str(),
            r##"
name = "stone.localhost"
network = "StoneNet"
info = "Test server"
listen = "127.0.0.1"
port = 6667
max_connections = 4000
max_nickname_len = 20
ping_timeout = 100
pong_timeout = 30
motd = [ "first line", "second line" ]

[[operators]]
name = "rocky"
password = "$argon2id$v=19$m=4096,t=3,p=1$c2FsdHNhbHQ$aaaaaaaaaaaaaaaaaaaaaa"
mask = "*!*@127.0.0.1"
"##,
        )
        .unwrap();

        let result =
            MainConfig::new(cli_with_config(&file_handle.path)).map_err(|e| e.to_string());
        assert_eq!(
            Ok(MainConfig {
                name: "stone.localhost".to_string(),
                network: "StoneNet".to_string(),
                info: "Test server".to_string(),
                listen: "127.0.0.1".parse().unwrap(),
                port: 6667,
                motd: Some(vec![
                    "first line".to_string(),
                    "second line".to_string()
                ]),
                password: None,
                max_connections: Some(4000),
                max_nickname_len: 20,
                ping_timeout: 100,
                pong_timeout: 30,
                operators: Some(vec![OperatorConfig {
                    name: "rocky".to_string(),
                    password: "$argon2id$v=19$m=4096,t=3,p=1$c2FsdHNhbHQ\
$aaaaaaaaaaaaaaaaaaaaaa"
                        .to_string(),
                    mask: Some("*!*@127.0.0.1".to_string()),
                }]),
            }),
            result
        );
    }

    #[test]
    fn test_mainconfig_cli_overrides() {
        let file_handle = TempFileHandle::new("temp_stonechat_config2.toml");
        fs::write(
            file_handle.path.as_str(),
            r##"
name = "stone.localhost"
network = "StoneNet"
info = "Test server"
listen = "127.0.0.1"
port = 6667
max_nickname_len = 20
ping_timeout = 100
pong_timeout = 30
"##,
        )
        .unwrap();

        let cli = Cli {
            config: Some(file_handle.path.clone()),
            listen: Some("192.168.1.4".parse().unwrap()),
            port: Some(6668),
            name: Some("other.localhost".to_string()),
            network: Some("OtherNet".to_string()),
        };
        let config = MainConfig::new(cli).unwrap();
        assert_eq!("other.localhost", config.name);
        assert_eq!("OtherNet", config.network);
        assert_eq!("192.168.1.4".parse::<IpAddr>().unwrap(), config.listen);
        assert_eq!(6668, config.port);
    }

    #[test]
    fn test_mainconfig_validation_error() {
        let file_handle = TempFileHandle::new("temp_stonechat_config3.toml");
        fs::write(
            file_handle.path.as_str(),
            r##"
name = "stonelocalhost"
network = "StoneNet"
info = "Test server"
listen = "127.0.0.1"
port = 6667
max_nickname_len = 20
ping_timeout = 100
pong_timeout = 30
"##,
        )
        .unwrap();

        let result = MainConfig::new(cli_with_config(&file_handle.path));
        assert!(result.is_err());

        fs::write(
            file_handle.path.as_str(),
            r##"
name = "stone.localhost"
network = "StoneNet"
info = "Test server"
listen = "127.0.0.1"
port = 6667
max_nickname_len = 20
ping_timeout = 100
pong_timeout = 30

[[operators]]
name = "roc.ky"
password = "longenough"
"##,
        )
        .unwrap();

        let result = MainConfig::new(cli_with_config(&file_handle.path));
        assert!(result.is_err());
    }
}
