use unicode_normalization::UnicodeNormalization as _;

const REPLACEMENT: char = '_';

/// Splits a remote folder path on the server's hierarchy separator and turns every segment
/// into a name that is safe on common filesystems.
///
/// The mapping is deterministic but not injective: distinct remote names may end up with the
/// same local name.
pub fn encode(remote_path: &str, separator: &str) -> Vec<String> {
    if remote_path.is_empty() {
        return Vec::new();
    }
    if separator.is_empty() {
        return vec![encode_segment(remote_path)];
    }

    remote_path.split(separator).map(encode_segment).collect()
}

fn encode_segment(segment: &str) -> String {
    let encoded: String = segment
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if is_allowed(c) { c } else { REPLACEMENT })
        .collect();

    // "", "." and ".." would address the parent or the folder itself
    if encoded.chars().all(|c| c == '.') {
        let len = encoded.len().max(1);
        std::iter::repeat_n(REPLACEMENT, len).collect()
    } else {
        encoded
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')' | '[' | ']' | '{' | '}')
}
