//! Hostfiles and the client roster.
//!
//! A hostfile lists one machine per line as whitespace-separated fields. The
//! second field is the address we reach the machine at; the first is kept as
//! an alias for display. The position of a line in the file is the client id
//! of the worker launched there.

use std::collections::HashSet;
use std::fmt;
use std::fs;

use colored::*;
use colourado::{Color, ColorPalette, PaletteType};
use itertools::zip;

use crate::error::LauncherError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// First field of the line. Often a numeric id.
    pub alias: String,
    /// Address passed to the remote channel.
    pub address: String,
}

impl HostEntry {
    /// The `Display` form of the host, in the given color.
    pub fn prettify(&self, color: Color) -> ColoredString {
        let r = (color.red * 256.0) as u8;
        let g = (color.green * 256.0) as u8;
        let b = (color.blue * 256.0) as u8;
        format!("{}", self).truecolor(r, g, b)
    }
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} {}]", self.alias, self.address)
    }
}

/// Parse hostfile contents into a roster. Index in the result is client id.
///
/// Blank lines are skipped. Fields after the address are ignored. Any other
/// line with fewer than two fields fails the whole parse.
pub fn parse_hostfile(contents: &str) -> Result<Vec<HostEntry>, LauncherError> {
    let mut roster = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let alias = match fields.next() {
            Some(alias) => alias,
            None => continue,
        };
        let address = fields
            .next()
            .ok_or_else(|| LauncherError::MalformedHostLine {
                line: index + 1,
                content: line.to_string(),
            })?;
        roster.push(HostEntry {
            alias: alias.to_string(),
            address: address.to_string(),
        });
    }

    // Several clients on one machine is legal, but usually a typo.
    let mut seen = HashSet::new();
    for host in &roster {
        if !seen.insert(host.address.as_str()) {
            tracing::warn!("Address {} appears more than once in the hostfile", host.address);
        }
    }

    Ok(roster)
}

/// Read and parse a hostfile, rejecting one that lists no hosts.
pub fn read_hostfile(path: &str) -> Result<Vec<HostEntry>, LauncherError> {
    let contents = fs::read_to_string(path).map_err(|source| LauncherError::HostfileRead {
        path: path.to_string(),
        source,
    })?;
    let roster = parse_hostfile(&contents)?;
    if roster.is_empty() {
        return Err(LauncherError::EmptyRoster(path.to_string()));
    }
    tracing::info!("Hosts detected:\n{:#?}", &roster);
    Ok(roster)
}

/// One colored tag per host, for log lines.
pub fn tags(roster: &[HostEntry]) -> Vec<ColoredString> {
    if roster.is_empty() {
        return vec![];
    }
    let colors = ColorPalette::new(roster.len() as u32, PaletteType::Pastel, false).colors;
    zip(roster, colors)
        .map(|(host, color)| host.prettify(color))
        .collect()
}
