//! Log record formatting

use crate::error::ParseSeverityError;
use chrono::{SecondsFormat, Utc};
use std::fmt::{self, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// Render one line: `<RFC 3339 UTC timestamp> [SEVERITY] <message>\n`
pub fn format_record(severity: Severity, args: fmt::Arguments<'_>) -> String {
    let mut line = String::with_capacity(64);
    // Writing into a String cannot fail
    let _ = writeln!(
        line,
        "{} [{}] {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        severity,
        args
    );
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_and_names() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("info".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!(" WARN ".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("Error".parse::<Severity>(), Ok(Severity::Error));
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_format_record() {
        let line = format_record(Severity::Error, format_args!("disk {} at {}%", "sda", 97));
        assert!(line.ends_with(" [ERROR] disk sda at 97%\n"), "{line:?}");

        let (stamp, _) = line.split_once(' ').unwrap();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
