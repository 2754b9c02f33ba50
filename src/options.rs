use crate::fstrcmp::best_match;
use std::sync::LazyLock;
use tracing::warn;

pub static OPTIONS: LazyLock<Options> = LazyLock::new(Options::from_env);

pub fn options() -> &'static Options {
    &OPTIONS
}

const NAMES: &[&str] = &[
    "assemble-program-name",
    "debug",
    "dialect-specific",
    "extra-device-info",
    "hanging-indent",
    "internal-strerror",
    "numeric-errno",
    "program-name",
    "symbolic-mode-bits",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// add notes about undocumented errors
    pub debug: bool,
    /// include the errno number next to its name
    pub numeric_errno: bool,
    /// allow Linux specific detail (capabilities, limits) in the text
    pub dialect_specific: bool,
    /// prefix fatal messages with the program name
    pub program_name: bool,
    /// print permission modes as S_IRUSR | ... instead of octal
    pub symbolic_mode_bits: bool,
    /// use the built in errno descriptions instead of the C library's
    pub internal_strerror: bool,
    /// name device drivers and USB devices
    pub extra_device_info: bool,
    pub hanging_indent: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            debug: false,
            numeric_errno: true,
            dialect_specific: true,
            program_name: true,
            symbolic_mode_bits: false,
            internal_strerror: false,
            extra_device_info: true,
            hanging_indent: 0,
        }
    }
}

impl Options {
    pub fn from_env() -> Self {
        match std::env::var("EXPLAIN_OPTIONS").or_else(|_| std::env::var("LIBEXPLAIN_OPTIONS")) {
            Ok(text) => Options::parse(&text),
            Err(_) => Options::default(),
        }
    }

    /// Parses a comma separated list such as `debug,no-numeric-errno,hanging-indent=4`.
    /// A `no-` prefix negates a flag and misspelled names are corrected when the match is close.
    pub fn parse(text: &str) -> Self {
        let mut options = Options::default();
        for item in text.split(',') {
            let item = item.trim().to_lowercase();
            if item.is_empty() {
                continue;
            }
            let (name, value) = match item.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (item.as_str(), None),
            };
            let (name, negated) = match name.strip_prefix("no-") {
                Some(rest) => (rest, true),
                None => (name, false),
            };
            if let Some(name) = resolve_name(name) {
                options.set(name, value, negated);
            }
        }
        options
    }

    fn set(&mut self, name: &str, value: Option<&str>, negated: bool) {
        if name == "hanging-indent" {
            self.hanging_indent = match (negated, value.map(str::parse::<usize>)) {
                (true, _) => 0,
                (false, Some(Ok(indent))) => indent,
                (false, _) => {
                    warn!("option hanging-indent needs a number, ignored");
                    return;
                }
            };
            return;
        }
        let flag = match value.map(parse_bool) {
            None => true,
            Some(Some(flag)) => flag,
            Some(None) => {
                warn!("option {name} has an unrecognised value, ignored");
                return;
            }
        } != negated;
        match name {
            "assemble-program-name" | "program-name" => self.program_name = flag,
            "debug" => self.debug = flag,
            "dialect-specific" => self.dialect_specific = flag,
            "extra-device-info" => self.extra_device_info = flag,
            "internal-strerror" => self.internal_strerror = flag,
            "numeric-errno" => self.numeric_errno = flag,
            "symbolic-mode-bits" => self.symbolic_mode_bits = flag,
            _ => {}
        }
    }

    /// The hanging indent to use for text wrapped to `width` columns.
    pub fn hanging_indent(&self, width: usize) -> usize {
        self.hanging_indent.min((width + 5) / 10)
    }
}

fn resolve_name(name: &str) -> Option<&'static str> {
    if let Some(known) = NAMES.iter().copied().find(|known| *known == name) {
        return Some(known);
    }
    match best_match(name, NAMES.iter().copied(), 0.6) {
        Some(known) => {
            warn!("option {name:?} unknown, assuming you meant {known:?} instead");
            Some(known)
        }
        None => {
            warn!("option {name:?} unknown");
            None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        assert_eq!(Options::parse(""), Options::default());
        assert_eq!(Options::parse(" , ,"), Options::default());
    }

    #[test]
    fn flags_values_and_negation() {
        let options = Options::parse("Debug, no-numeric-errno,dialect-specific=false,hanging-indent=4");
        assert!(options.debug);
        assert!(!options.numeric_errno);
        assert!(!options.dialect_specific);
        assert_eq!(options.hanging_indent, 4);
        assert!(options.extra_device_info);
    }

    #[test]
    fn misspelled_names_are_corrected() {
        let options = Options::parse("symbolic-mode-bit,internal-sterror=yes");
        assert!(options.symbolic_mode_bits);
        assert!(options.internal_strerror);
    }

    #[test]
    fn unknown_names_are_ignored() {
        assert_eq!(Options::parse("frobnicate"), Options::default());
    }

    #[test]
    fn hanging_indent_is_capped_by_width() {
        let options = Options::parse("hanging-indent=20");
        assert_eq!(options.hanging_indent(75), 8);
        assert_eq!(options.hanging_indent(300), 20);
    }
}
