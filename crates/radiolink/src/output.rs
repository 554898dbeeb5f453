use std::io::{IsTerminal, Write};
use std::time::SystemTime;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use radiolink_link::host::{characteristic_data, unix_seconds};
use radiolink_link::{
    Characteristic, CharacteristicMessage, LinkState, ServiceAnnouncement, StateReport,
};
use serde::Serialize;

use crate::sink::ADAPTOR_ID;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One serial port found on the host.
#[derive(Debug, Clone, Serialize)]
pub struct PortOutput {
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
}

/// Result of a one-shot send.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutput {
    pub port: String,
    pub subscriber: String,
    pub payload_size: usize,
    pub status: &'static str,
}

pub fn print_state(state: LinkState, format: OutputFormat) {
    let report = StateReport::new(ADAPTOR_ID, state);
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            let mut table = table(vec!["ADAPTOR", "STATUS", "STATE"]);
            table.add_row(vec![report.id, report.status, state.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("state={state}"),
        OutputFormat::Raw => {}
    }
}

pub fn print_characteristic(
    characteristic: Characteristic,
    payload: &[u8],
    timestamp: SystemTime,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            print_json(&CharacteristicMessage::new(
                ADAPTOR_ID,
                characteristic,
                payload,
                timestamp,
            ));
        }
        OutputFormat::Table => {
            let mut table = table(vec!["CHARACTERISTIC", "SIZE", "DATA", "TIME"]);
            table.add_row(vec![
                characteristic.to_string(),
                payload.len().to_string(),
                data_text(characteristic, payload),
                format!("{:.3}", unix_seconds(timestamp)),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "characteristic={} size={} data={}",
                characteristic,
                payload.len(),
                data_text(characteristic, payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

pub fn print_services(characteristics: &[Characteristic], format: OutputFormat) {
    let announcement = ServiceAnnouncement::new(ADAPTOR_ID, characteristics);
    match format {
        OutputFormat::Json => print_json(&announcement),
        OutputFormat::Pretty => {
            let names: Vec<_> = characteristics.iter().map(|c| c.as_str()).collect();
            println!("services={}", names.join(","));
        }
        OutputFormat::Table | OutputFormat::Raw => {}
    }
}

pub fn print_ports(ports: &[PortOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ports),
        OutputFormat::Table => {
            let mut table = table(vec!["PORT", "TYPE", "DESCRIPTION"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.clone(),
                    port.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                println!("port={} type={}", port.name, port.kind);
            }
        }
        OutputFormat::Raw => {
            for port in ports {
                println!("{}", port.name);
            }
        }
    }
}

pub fn print_sent(output: &SendOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut table = table(vec!["PORT", "SUBSCRIBER", "SIZE", "STATUS"]);
            table.add_row(vec![
                output.port.clone(),
                output.subscriber.clone(),
                output.payload_size.to_string(),
                output.status.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "port={} size={} status={}",
                output.port, output.payload_size, output.status
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn data_text(characteristic: Characteristic, payload: &[u8]) -> String {
    match characteristic_data(characteristic, payload) {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}
