//! Parser for `adb devices` output.
//!
//! ```text
//! List of devices attached
//! emulator-5554	device
//! R58M123ABC	unauthorized
//! ```

use super::types::Device;

/// Parse the device table. The first line is always the banner.
pub fn parse_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let id = fields.next()?;
            let status = fields.next()?;
            Some(Device {
                id: id.to_string(),
                status: status.to_string(),
            })
        })
        .collect()
}
