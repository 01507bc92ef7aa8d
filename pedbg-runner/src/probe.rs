//! Detection of P&E Micro probes connected over USB
//!
//! Uses the host's native enumeration command (`lsusb` or `pnputil`) and
//! pattern matches the serial numbers out of its text output, so no USB
//! library or elevated permissions are needed.

use regex::Regex;
use tracing::{debug, info};

use crate::error::{Result, RunnerError};
use crate::platform::HostOs;
use crate::process::ProcessRunner;
use crate::selection::{self, RequireUnique};

/// P&E Micro USB vendor identifier
pub const PEDBG_USB_VID: u16 = 0x1357;
/// OpenSDA / Multilink USB product identifier
pub const PEDBG_USB_PID: u16 = 0x0089;

const PEDBG_USB_CLASS: &str = "usb";
/// `lsusb -d` exit status when no device matches the filter
const LSUSB_NO_MATCH: i32 = 1;
const SERIAL_ID_PATTERN: &str = r"sdafd[0-9a-f]{6}";

/// Command line that lists connected probes on `host`
pub fn enumeration_command(host: &HostOs) -> Vec<String> {
    match host {
        HostOs::Windows => vec![
            "pnputil".to_string(),
            "/enum-devices".to_string(),
            "/connected".to_string(),
            "/class".to_string(),
            PEDBG_USB_CLASS.to_string(),
        ],
        _ => vec![
            "lsusb".to_string(),
            "-v".to_string(),
            "-d".to_string(),
            format!("{:04x}:{:04x}", PEDBG_USB_VID, PEDBG_USB_PID),
        ],
    }
}

fn serial_pattern(host: &HostOs) -> String {
    match host {
        HostOs::Windows => format!(
            r"instance id:\s+usb\\vid_{:04x}&pid_{:04x}\\({})",
            PEDBG_USB_VID, PEDBG_USB_PID, SERIAL_ID_PATTERN
        ),
        _ => format!(r"iserial\s+\d+\s+({})", SERIAL_ID_PATTERN),
    }
}

/// Extract probe serial numbers from enumeration output, sorted
pub fn parse_probe_serials(host: &HostOs, output: &str) -> Result<Vec<String>> {
    let out = output.trim().to_lowercase();
    if out.is_empty() || out.contains("no devices were found") {
        return Ok(Vec::new());
    }

    let regex = Regex::new(&serial_pattern(host))
        .map_err(|e| RunnerError::InvalidConfig(format!("Invalid probe pattern: {}", e)))?;

    let mut serials: Vec<String> = regex
        .captures_iter(&out)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    serials.sort();
    serials.dedup();
    Ok(serials)
}

/// List the serial numbers of probes connected to this host
pub async fn find_usb_probes(host: &HostOs, runner: &dyn ProcessRunner) -> Result<Vec<String>> {
    let cmd = enumeration_command(host);
    debug!("Enumerating debug probes with {:?}", cmd);

    let output = match runner.check_output(&cmd).await {
        Ok(output) => output,
        Err(RunnerError::ProcessFailed { code: Some(LSUSB_NO_MATCH), .. }) if *host == HostOs::Linux => {
            debug!("lsusb found no device matching {:04x}:{:04x}", PEDBG_USB_VID, PEDBG_USB_PID);
            return Ok(Vec::new());
        }
        Err(e) => return Err(RunnerError::ProbeEnumeration(e.to_string())),
    };

    parse_probe_serials(host, &String::from_utf8_lossy(&output))
}

/// Find the single connected probe and return its serial number.
///
/// Several connected probes are never auto-resolved: the user has to
/// disconnect the ones not needed.
pub async fn get_probe(host: &HostOs, runner: &dyn ProcessRunner) -> Result<String> {
    let probes = find_usb_probes(host, runner).await?;
    let selected = selection::select("debug probes connected", probes, &mut RequireUnique);
    if let Err(RunnerError::Ambiguous { .. }) = &selected {
        info!("Please disconnect any unnecessary probes and leave only one connected.");
    }
    selected
}
