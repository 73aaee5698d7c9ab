// Serial port frame source
//
// Opens the port 8N1 (unless configured otherwise), raises DTR so boards like
// the Arduino reset on connect, purges stale bytes and then reads one
// fixed-size frame per call.

use super::{fill_frame, FrameSource};
use crate::error::{SourceError, SourceResult};
use serde::Serialize;
use std::time::Duration;
use tokio_serial::{ClearBuffer, DataBits, Parity, SerialPort, SerialPortType, StopBits};

pub struct SerialFrameSource {
    port_name: String,
    baud_rate: u32,
    frame_size: usize,
    port: Box<dyn SerialPort>,
}

impl SerialFrameSource {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        frame_size: usize,
        data_bits: Option<u8>,
        stop_bits: Option<u8>,
        read_timeout: Duration,
    ) -> SourceResult<Self> {
        log::info!("Opening serial port: {} at {} baud", port_name, baud_rate);

        let mut port = tokio_serial::new(port_name, baud_rate)
            .data_bits(to_data_bits(data_bits.unwrap_or(8))?)
            .stop_bits(to_stop_bits(stop_bits.unwrap_or(1))?)
            .parity(Parity::None)
            .timeout(read_timeout)
            .open()
            .map_err(|e| SourceError::Open(port_name.to_string(), e.to_string()))?;

        port.write_data_terminal_ready(true)
            .map_err(|e| SourceError::Serial(format!("Failed to set DTR: {}", e)))?;
        port.clear(ClearBuffer::All)
            .map_err(|e| SourceError::Serial(format!("Failed to purge buffers: {}", e)))?;

        log::info!("Serial port {} opened successfully", port_name);

        Ok(Self {
            port_name: port_name.to_string(),
            baud_rate,
            frame_size,
            port,
        })
    }
}

impl FrameSource for SerialFrameSource {
    fn read_frame(&mut self) -> SourceResult<Vec<u8>> {
        let mut frame = vec![0u8; self.frame_size];
        let read = fill_frame(&mut self.port, &mut frame)?;
        if read != self.frame_size {
            return Err(SourceError::ShortFrame {
                expected: self.frame_size,
                actual: read,
            });
        }
        Ok(frame)
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn describe(&self) -> String {
        format!("serial:{}@{}", self.port_name, self.baud_rate)
    }
}

fn to_data_bits(bits: u8) -> SourceResult<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(SourceError::InvalidConfig(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

fn to_stop_bits(bits: u8) -> SourceResult<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(SourceError::InvalidConfig(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

/// A serial port visible on this machine
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

/// Enumerate serial ports
pub fn list_ports() -> SourceResult<Vec<PortInfo>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| SourceError::Serial(format!("Failed to enumerate ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            name: p.port_name,
            kind: match p.port_type {
                SerialPortType::UsbPort(usb) => match usb.product {
                    Some(product) => format!("usb ({})", product),
                    None => "usb".to_string(),
                },
                SerialPortType::PciPort => "pci".to_string(),
                SerialPortType::BluetoothPort => "bluetooth".to_string(),
                _ => "unknown".to_string(),
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_conversions() {
        assert_eq!(to_data_bits(8).unwrap(), DataBits::Eight);
        assert_eq!(to_data_bits(5).unwrap(), DataBits::Five);
        assert!(to_data_bits(9).is_err());
        assert_eq!(to_stop_bits(2).unwrap(), StopBits::Two);
        assert!(to_stop_bits(0).is_err());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialFrameSource::open(
            "/dev/serial-analyzer-does-not-exist",
            9600,
            10,
            None,
            None,
            Duration::from_millis(100),
        );
        assert!(matches!(result, Err(SourceError::Open(_, _))));
    }
}
