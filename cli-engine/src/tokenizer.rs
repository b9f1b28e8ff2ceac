//! In-place argument tokenizer.
//!
//! Splits on spaces, keeps `"quoted text"` together and copies the byte after
//! a backslash verbatim. Tokens are packed to the front of the buffer and
//! separated by single NUL bytes.

const SEPARATOR: u8 = 0;

/// Tokenize `buf[..len]` in place and return the length of the packed tokens.
pub(crate) fn tokenize(buf: &mut [u8], len: usize) -> usize {
    let mut quoted = false;
    let mut escaped = false;
    let mut insert = 0;

    for read in 0..len {
        let mut c = buf[read];

        if escaped {
            escaped = false;
        } else if c == b'\\' {
            escaped = true;
            continue;
        } else if c == b'"' {
            quoted = !quoted;
            c = SEPARATOR;
        } else if !quoted && c == b' ' {
            c = SEPARATOR;
        }

        // Separators collapse, and never lead
        if c != SEPARATOR || (insert > 0 && buf[insert - 1] != SEPARATOR) {
            buf[insert] = c;
            insert += 1;
        }
    }

    insert
}

/// Iterate the NUL-separated tokens of a packed buffer.
pub(crate) fn split(packed: &[u8]) -> impl Iterator<Item = &str> {
    packed
        .split(|&b| b == SEPARATOR)
        .filter(|token| !token.is_empty())
        .map(|token| core::str::from_utf8(token).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    fn tokens(input: &str) -> Vec<std::string::String> {
        let mut buf: Vec<u8> = input.as_bytes().to_vec();
        let len = tokenize(&mut buf, input.len());
        split(&buf[..len]).map(std::string::String::from).collect()
    }

    #[test]
    fn test_splits_on_spaces() {
        assert_eq!(tokens("set led on"), ["set", "led", "on"]);
    }

    #[test]
    fn test_collapses_repeated_spaces() {
        assert_eq!(tokens("  a   b  "), ["a", "b"]);
    }

    #[test]
    fn test_quotes_group_words() {
        assert_eq!(tokens("name \"My Device\" x"), ["name", "My Device", "x"]);
    }

    #[test]
    fn test_backslash_escapes_quote_and_space() {
        assert_eq!(tokens("say \\\"hi\\\""), ["say", "\"hi\""]);
        assert_eq!(tokens("path a\\ b"), ["path", "a b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokens("").is_empty());
        assert!(tokens("   ").is_empty());
    }
}
