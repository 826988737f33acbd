//! Per-device control files.
//!
//! - `blkio.*_device` files list one `major:minor value` entry per line.
//! - `devices.list` lists one access rule per line in the form
//!   `type major:minor access`, e.g. `c 1:3 rwm` or `a *:* rwm`.

use std::fmt;

use super::ParseError;

/// One `major:minor value` entry of a blkio per-device file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIoValue {
    pub major: i64,
    pub minor: i64,
    pub value: u64,
}

pub fn parse_device_io(line: &str, lineno: usize) -> Result<DeviceIoValue, ParseError> {
    let malformed = || ParseError::MalformedDeviceValue {
        line: lineno,
        content: line.to_owned(),
    };

    let mut tokens = line.split_whitespace();
    let (Some(device), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(malformed());
    };
    let (major, minor) = device.split_once(':').ok_or_else(malformed)?;

    Ok(DeviceIoValue {
        major: major.parse().map_err(|_| malformed())?,
        minor: minor.parse().map_err(|_| malformed())?,
        value: value.parse().map_err(|_| malformed())?,
    })
}

/// Device class a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// `a`: all devices.
    All,
    /// `c`: character devices.
    Char,
    /// `b`: block devices.
    Block,
}

impl DeviceType {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "a" => Some(DeviceType::All),
            "c" => Some(DeviceType::Char),
            "b" => Some(DeviceType::Block),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            DeviceType::All => 'a',
            DeviceType::Char => 'c',
            DeviceType::Block => 'b',
        };
        write!(f, "{c}")
    }
}

/// A major or minor device number, or `*` for any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceNumber {
    Any,
    Number(u64),
}

impl DeviceNumber {
    fn from_token(token: &str) -> Option<Self> {
        if token == "*" {
            return Some(DeviceNumber::Any);
        }
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        token.parse().ok().map(DeviceNumber::Number)
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceNumber::Any => write!(f, "*"),
            DeviceNumber::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Permitted operations of a rule: read, write, mknod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub write: bool,
    pub mknod: bool,
}

impl Access {
    fn from_token(token: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        let mut access = Access::default();
        for c in token.chars() {
            match c {
                'r' => access.read = true,
                'w' => access.write = true,
                'm' => access.mknod = true,
                _ => return None,
            }
        }
        Some(access)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, c) in [(self.read, 'r'), (self.write, 'w'), (self.mknod, 'm')] {
            if set {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// One line of `devices.list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAccessRule {
    pub devtype: DeviceType,
    pub major: DeviceNumber,
    pub minor: DeviceNumber,
    pub access: Access,
}

pub fn parse_device_rule(line: &str, lineno: usize) -> Result<DeviceAccessRule, ParseError> {
    parse_rule_tokens(line).ok_or_else(|| ParseError::MalformedDeviceRule {
        line: lineno,
        content: line.to_owned(),
    })
}

fn parse_rule_tokens(line: &str) -> Option<DeviceAccessRule> {
    let mut tokens = line.split_whitespace();
    let (Some(devtype), Some(device), Some(access), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return None;
    };
    let (major, minor) = device.split_once(':')?;

    Some(DeviceAccessRule {
        devtype: DeviceType::from_token(devtype)?,
        major: DeviceNumber::from_token(major)?,
        minor: DeviceNumber::from_token(minor)?,
        access: Access::from_token(access)?,
    })
}
