//! Parsing of /proc/<pid>/status and /proc/<pid>/task/<tid>/status.

use crate::process::affinity::{AffinityError, CpuMask};
use serde::Serialize;

/// Fields picked out of a status record. Missing lines stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusFields {
    pub name: Option<String>,
    pub state: Option<String>,
    pub tgid: Option<u32>,
    pub ppid: Option<u32>,
    pub threads: Option<u32>,
    pub cpus_allowed: Option<CpuMask>,
    pub cpus_allowed_list: Option<String>,
    pub voluntary_ctxt_switches: Option<u64>,
    pub nonvoluntary_ctxt_switches: Option<u64>,
}

/// Parse result plus the raw `Cpus_allowed` value if it could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatus {
    pub fields: StatusFields,
    pub mask_error: Option<(String, AffinityError)>,
}

/// Parses a status record line by line. Unrecognised lines are skipped.
pub fn parse_status(content: &str) -> ParsedStatus {
    let mut fields = StatusFields::default();
    let mut mask_error = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key {
            "Name" => fields.name = Some(value.to_string()),
            "State" => fields.state = Some(value.to_string()),
            "Tgid" => fields.tgid = value.parse().ok(),
            "PPid" => fields.ppid = value.parse().ok(),
            "Threads" => fields.threads = value.parse().ok(),
            "Cpus_allowed" => match CpuMask::from_hex(value) {
                Ok(mask) => fields.cpus_allowed = Some(mask),
                Err(e) => mask_error = Some((value.to_string(), e)),
            },
            "Cpus_allowed_list" => fields.cpus_allowed_list = Some(value.to_string()),
            "voluntary_ctxt_switches" => fields.voluntary_ctxt_switches = value.parse().ok(),
            "nonvoluntary_ctxt_switches" => {
                fields.nonvoluntary_ctxt_switches = value.parse().ok()
            }
            _ => {}
        }
    }

    ParsedStatus { fields, mask_error }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Name:\tnginx\n\
Umask:\t0022\n\
State:\tS (sleeping)\n\
Tgid:\t1234\n\
Ngid:\t0\n\
Pid:\t1234\n\
PPid:\t1\n\
Threads:\t3\n\
Cpus_allowed:\tf\n\
Cpus_allowed_list:\t0-3\n\
Mems_allowed:\t00000000,00000001\n\
voluntary_ctxt_switches:\t150\n\
nonvoluntary_ctxt_switches:\t7\n";

    #[test]
    fn test_parse_full_status() {
        let parsed = parse_status(SAMPLE);
        assert!(parsed.mask_error.is_none());

        let f = parsed.fields;
        assert_eq!(f.name.as_deref(), Some("nginx"));
        assert_eq!(f.state.as_deref(), Some("S (sleeping)"));
        assert_eq!(f.tgid, Some(1234));
        assert_eq!(f.ppid, Some(1));
        assert_eq!(f.threads, Some(3));
        assert_eq!(f.cpus_allowed_list.as_deref(), Some("0-3"));
        assert_eq!(f.voluntary_ctxt_switches, Some(150));
        assert_eq!(f.nonvoluntary_ctxt_switches, Some(7));

        let mask = f.cpus_allowed.expect("mask decoded");
        assert_eq!(mask.count(), 4);
        assert_eq!(mask.render(), "00001111");
    }

    #[test]
    fn test_prefix_does_not_confuse_list_with_mask() {
        let parsed = parse_status("Cpus_allowed_list:\t0-1\n");
        assert!(parsed.fields.cpus_allowed.is_none());
        assert_eq!(parsed.fields.cpus_allowed_list.as_deref(), Some("0-1"));
    }

    #[test]
    fn test_unknown_and_malformed_lines_are_ignored() {
        let parsed = parse_status("garbage line\nVmRSS:\t100 kB\n\nState:\tR (running)\n");
        assert_eq!(parsed.fields.state.as_deref(), Some("R (running)"));
        assert!(parsed.fields.name.is_none());
    }

    #[test]
    fn test_invalid_mask_is_reported_not_fatal() {
        let parsed = parse_status("Name:\tx\nCpus_allowed:\tzz\n");
        assert_eq!(parsed.fields.name.as_deref(), Some("x"));
        assert!(parsed.fields.cpus_allowed.is_none());
        let copy = parsed.clone();
        let (raw, err) = parsed.mask_error.expect("mask error recorded");
        assert_eq!(raw, "zz");
        assert_eq!(err, AffinityError::InvalidDigit('z'));
        assert_eq!(copy.mask_error, Some(("zz".to_string(), err)));
    }

    #[test]
    fn test_empty_status() {
        assert_eq!(parse_status("").fields, StatusFields::default());
    }
}
