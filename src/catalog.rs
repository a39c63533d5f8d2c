/// Error descriptions from the protocol, indexed by code.
const ERROR_CODES: [&str; 8] = [
    "Not defined, see error message (if any).",
    "File not found.",
    "Access violation.",
    "Disk full or allocation exceeded.",
    "Illegal TFTP operation.",
    "Unknown transfer ID.",
    "File already exists.",
    "No such user.",
];

pub fn describe(code: u16) -> Option<&'static str> {
    ERROR_CODES.get(usize::from(code)).copied()
}

/// Total version of [`describe`]; unknown codes get a generic description.
pub fn describe_or_unknown(code: u16) -> String {
    match describe(code) {
        Some(description) => description.to_string(),
        None => format!("Unknown error code {code}."),
    }
}
