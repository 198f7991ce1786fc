//! Chat text helpers. Chat lines carry `§x` colour escapes.

pub const ESCAPE: char = '§';

const ANSI_RESET: &str = "\x1b[21m\x1b[39m";

/// Remove colour escapes
pub fn strip_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Translate colour escapes into ANSI terminal sequences. The result always
/// ends with a reset.
pub fn ansi_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + ANSI_RESET.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        if let Some(seq) = chars.next().and_then(ansi_sequence) {
            out.push_str(seq);
        }
    }
    out.push_str(ANSI_RESET);
    out
}

fn ansi_sequence(code: char) -> Option<&'static str> {
    let seq = match code.to_ascii_lowercase() {
        '0' => "\x1b[21m\x1b[30m",
        '1' => "\x1b[21m\x1b[34m",
        '2' => "\x1b[21m\x1b[32m",
        '3' => "\x1b[21m\x1b[36m",
        '4' => "\x1b[21m\x1b[31m",
        '5' => "\x1b[21m\x1b[35m",
        '6' => "\x1b[21m\x1b[33m",
        '7' => "\x1b[21m\x1b[37m",
        '8' => "\x1b[1m\x1b[30m",
        '9' => "\x1b[1m\x1b[34m",
        'a' => "\x1b[1m\x1b[32m",
        'b' => "\x1b[1m\x1b[36m",
        'c' => "\x1b[1m\x1b[31m",
        'd' => "\x1b[1m\x1b[35m",
        'e' => "\x1b[1m\x1b[33m",
        'f' => "\x1b[1m\x1b[37m",
        _ => return None,
    };
    Some(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_escapes() {
        assert_eq!(strip_escapes("§e<Notch>§f hello"), "<Notch> hello");
        assert_eq!(strip_escapes("plain"), "plain");
        assert_eq!(strip_escapes("dangling§"), "dangling");
    }

    #[test]
    fn test_ansi_escapes() {
        assert_eq!(ansi_escapes("§chi"), "\x1b[1m\x1b[31mhi\x1b[21m\x1b[39m");
        assert_eq!(ansi_escapes("§Chi"), ansi_escapes("§chi"));
        assert_eq!(ansi_escapes("a§0b"), "a\x1b[21m\x1b[30mb\x1b[21m\x1b[39m");
    }

    #[test]
    fn test_ansi_unknown_code_dropped() {
        assert_eq!(ansi_escapes("§kx"), "x\x1b[21m\x1b[39m");
    }
}
