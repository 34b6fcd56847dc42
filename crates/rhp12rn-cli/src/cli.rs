//! Command-line arguments and command dispatch.

use crate::error::{CliError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rhp12rn_connector::{
    scan, Connection, ConnectionConfig, Gripper, ScanOptions, DEFAULT_SCAN_BAUD_RATES,
};
use rhp12rn_control_table::{DeviceModel, FieldRegistry};
use rhp12rn_sim::{SimBus, SimDevice};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(version, about = "Read and write RH-P12-RN gripper fields", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(long, value_enum, default_value = "rna", help = "Gripper model")]
    pub model: ModelArg,

    #[clap(long, help = "Serial device (overrides the config file)")]
    pub device: Option<String>,

    #[clap(long, help = "Baud rate (overrides the config file)")]
    pub baud: Option<u32>,

    #[clap(long, help = "Dynamixel id (overrides the config file)")]
    pub bus_id: Option<u8>,

    #[clap(long, help = "YAML connection config")]
    pub config: Option<PathBuf>,

    #[clap(long, help = "YAML field table to use instead of the built-in one")]
    pub fields: Option<PathBuf>,

    #[clap(
        long,
        value_enum,
        help = "Log level (error, warn, info, debug, trace); defaults to RUST_LOG"
    )]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "List the field table")]
    Fields {
        #[clap(long, help = "Print as YAML")]
        yaml: bool,
    },
    #[command(about = "Read one or more fields (pipelined)")]
    Read {
        #[clap(required = true, help = "Field names")]
        names: Vec<String>,
    },
    #[command(about = "Write a field")]
    Write {
        #[clap(help = "Field name")]
        name: String,
        #[clap(allow_negative_numbers = true, help = "Value")]
        value: i64,
    },
    #[command(about = "Read the bulk status block")]
    Status,
    #[command(about = "Read the model number and name the gripper")]
    Identify,
    #[command(about = "Sweep baud rates and ids for grippers")]
    Scan {
        #[clap(long, value_delimiter = ',', help = "Baud rates to try")]
        baud_rates: Option<Vec<u32>>,
        #[clap(long, default_value_t = 16, help = "Highest id to probe")]
        max_id: u8,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelArg {
    Rn,
    Rna,
}

impl From<ModelArg> for DeviceModel {
    fn from(model: ModelArg) -> Self {
        match model {
            ModelArg::Rn => DeviceModel::RhP12Rn,
            ModelArg::Rna => DeviceModel::RhP12RnA,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Cli {
    /// Connection settings: config file first, then flags.
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let model = DeviceModel::from(self.model);
        let mut config = match &self.config {
            Some(path) => ConnectionConfig::from_yaml_str(&read_file(path)?)?,
            None => ConnectionConfig::for_model(model),
        };
        if config.model_number.is_none() {
            config.model_number = Some(model.model_number());
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(bus_id) = self.bus_id {
            config.bus_id = bus_id;
        }
        Ok(config)
    }

    /// Field table: from `--fields`, or the model's built-in one.
    pub fn registry(&self) -> Result<FieldRegistry> {
        match &self.fields {
            Some(path) => Ok(FieldRegistry::from_yaml_str(&read_file(path)?)?),
            None => Ok(DeviceModel::from(self.model).registry()),
        }
    }

    /// A simulated bus with one gripper matching the settings.
    fn sim_bus(&self, config: &ConnectionConfig) -> SimBus {
        let bus = SimBus::new();
        let device = SimDevice::from_model(self.model.into()).with_baud_rate(config.baud_rate);
        bus.add_device(config.bus_id, device);
        bus
    }

    /// Run the selected command, writing results to `out`.
    pub fn run(&self, out: &mut impl Write) -> Result<()> {
        let config = self.connection_config()?;
        let registry = self.registry()?;
        let bus = self.sim_bus(&config);
        debug!(?config, "resolved connection config");

        match &self.command {
            Command::Fields { yaml } => {
                if *yaml {
                    write_out(out, &registry.to_yaml_string()?)?;
                } else {
                    for field in registry.iter() {
                        write_out(out, &format!("{field}  {}\n", field.description))?;
                    }
                }
                return Ok(());
            }
            Command::Scan { baud_rates, max_id } => {
                if *max_id == 0 {
                    return Err(CliError::Usage("--max-id must be at least 1".to_string()));
                }
                let options = ScanOptions {
                    device: config.device.clone(),
                    baud_rates: baud_rates
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SCAN_BAUD_RATES.to_vec()),
                    ids: 1..=*max_id,
                    drain: config.drain,
                };
                let found = scan(&bus, &options)?;
                info!(count = found.len(), "scan finished");
                for device in found {
                    write_out(out, &format!("{device}\n"))?;
                }
                return Ok(());
            }
            _ => {}
        }

        let model = DeviceModel::from(self.model);
        let mut conn = match model.group_layout() {
            Some(layout) if self.fields.is_none() => {
                Connection::new(bus, registry, config).with_group_layout(layout)
            }
            _ => Connection::new(bus, registry, config),
        };
        conn.connect_configured()?;

        match &self.command {
            Command::Read { names } => {
                let handles = names
                    .iter()
                    .map(|name| conn.read_field_async(name))
                    .collect::<rhp12rn_connector::Result<Vec<_>>>()?;
                for (name, handle) in names.iter().zip(handles) {
                    let value = conn.result(handle)?;
                    write_out(out, &format!("{name} = {value}\n"))?;
                }
            }
            Command::Write { name, value } => {
                conn.write_field(name, *value)?;
                write_out(out, &format!("{name} <- {value}\n"))?;
            }
            Command::Status => {
                let status = Gripper::new(&mut conn).status()?;
                write_out(out, &format!("{status:#?}\n"))?;
            }
            Command::Identify => {
                let model = conn.identify()?;
                write_out(out, &format!("{model} (model number {})\n", model.model_number()))?;
            }
            Command::Fields { .. } | Command::Scan { .. } => {}
        }
        conn.disconnect();
        Ok(())
    }
}

fn write_out(out: &mut impl Write, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).map_err(|source| CliError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("rhp12rn").chain(args.iter().copied()))
            .expect("valid arguments");
        let mut out = Vec::new();
        cli.run(&mut out)?;
        Ok(String::from_utf8(out).expect("utf-8"))
    }

    #[test]
    fn test_read_pipelined() {
        let out = run(&["read", "model_number", "max_position_limit"]).expect("read");
        assert_eq!(out, "model_number = 35074\nmax_position_limit = 1150\n");
    }

    #[test]
    fn test_write_negative() {
        let out = run(&["write", "goal_current", "-50"]).expect("write");
        assert_eq!(out, "goal_current <- -50\n");
    }

    #[test]
    fn test_identify_rn() {
        let out = run(&["--model", "rn", "identify"]).expect("identify");
        assert_eq!(out, "RH-P12-RN (model number 35073)\n");
    }

    #[test]
    fn test_status_unsupported_on_rn() {
        let err = run(&["--model", "rn", "status"]).expect_err("no bulk layout");
        assert!(err.to_string().contains("unsupported device"));
    }

    #[test]
    fn test_scan_uses_flags() {
        let out = run(&[
            "--bus-id",
            "3",
            "--baud",
            "115200",
            "scan",
            "--baud-rates",
            "57600,115200",
            "--max-id",
            "4",
        ])
        .expect("scan");
        assert_eq!(out, "RH-P12-RN(A) with ID 3 at baud rate 115200\n");
    }

    #[test]
    fn test_unknown_field() {
        let err = run(&["read", "goal_torque"]).expect_err("unknown");
        assert_eq!(err.to_string(), "unknown field: goal_torque");
    }

    #[test]
    fn test_log_level_parses() {
        let cli = Cli::try_parse_from(["rhp12rn", "--log-level", "debug", "status"]).expect("parse");
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.model, ModelArg::Rna);
    }
}
