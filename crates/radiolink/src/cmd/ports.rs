use serialport::{SerialPortInfo, SerialPortType};

use crate::cmd::PortsArgs;
use crate::exit::{CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_ports, OutputFormat, PortOutput};

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = serialport::available_ports()
        .map_err(|err| CliError::new(TRANSPORT_ERROR, format!("port enumeration failed: {err}")))?;

    let rows: Vec<PortOutput> = ports.iter().map(port_output).collect();
    print_ports(&rows, format);
    Ok(SUCCESS)
}

fn port_output(info: &SerialPortInfo) -> PortOutput {
    let (kind, description) = match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            let mut parts = vec![format!("{:04x}:{:04x}", usb.vid, usb.pid)];
            parts.extend(usb.manufacturer.clone());
            parts.extend(usb.product.clone());
            ("usb", Some(parts.join(" ")))
        }
        SerialPortType::PciPort => ("pci", None),
        SerialPortType::BluetoothPort => ("bluetooth", None),
        SerialPortType::Unknown => ("unknown", None),
    };

    PortOutput {
        name: info.port_name.clone(),
        kind: kind.to_string(),
        description,
    }
}
