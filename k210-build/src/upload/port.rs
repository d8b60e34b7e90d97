//! Serial port discovery for uploaders talking to the board bootloader.

use std::path::PathBuf;

/// Lists the serial ports a board could be attached to.
pub trait PortScanner {
    fn serial_ports(&self) -> std::io::Result<Vec<PathBuf>>;
}

/// Scans the serial ports of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPorts;

impl PortScanner for SerialPorts {
    fn serial_ports(&self) -> std::io::Result<Vec<PathBuf>> {
        serial2::SerialPort::available_ports()
    }
}

/// Picks the port an upload should use.
///
/// A configured port always wins. Otherwise the first USB serial adapter is
/// preferred over built-in UARTs, which are rarely a development board.
pub fn select_port(configured: Option<&str>, candidates: &[PathBuf]) -> Option<String> {
    if let Some(port) = configured {
        return Some(port.to_owned());
    }

    candidates
        .iter()
        .find(|port| is_usb_serial(port))
        .or_else(|| candidates.first())
        .map(|port| port.display().to_string())
}

fn is_usb_serial(port: &std::path::Path) -> bool {
    port.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            ["ttyUSB", "ttyACM", "cu.usbserial", "cu.usbmodem", "cu.wchusbserial"]
                .iter()
                .any(|prefix| name.starts_with(prefix))
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn configured_port_wins() {
        let candidates = [PathBuf::from("/dev/ttyUSB0")];
        assert_eq!(
            select_port(Some("/dev/ttyS1"), &candidates).as_deref(),
            Some("/dev/ttyS1")
        );
    }

    #[test]
    fn usb_adapters_are_preferred() {
        let candidates = [
            PathBuf::from("/dev/ttyS0"),
            PathBuf::from("/dev/ttyUSB0"),
            PathBuf::from("/dev/ttyACM0"),
        ];
        assert_eq!(
            select_port(None, &candidates).as_deref(),
            Some("/dev/ttyUSB0")
        );
    }

    #[test]
    fn falls_back_to_the_first_port() {
        let candidates = [PathBuf::from("COM4"), PathBuf::from("COM7")];
        assert_eq!(select_port(None, &candidates).as_deref(), Some("COM4"));
        assert_eq!(select_port(None, &[]), None);
    }
}
