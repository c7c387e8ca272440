//! Signature authoring: derive a common-prefix `??`-wildcarded signature
//! from entry-point windows of several sample binaries (spec.md §4.6).

use log::warn;

use crate::error::{Error, Result};
use crate::exe::open_exe;
use crate::sigdb::record::Token;

pub struct AuthoringOptions {
    pub min_length: usize,
    pub max_length: usize,
    pub threshold: f64,
}

impl Default for AuthoringOptions {
    fn default() -> Self {
        AuthoringOptions { min_length: 16, max_length: 64, threshold: 0.5 }
    }
}

/// Reads up to `max_length` bytes at the entry point of each file in `paths`
/// (skipping, with a warning, any that fail to open) and derives a
/// consensus signature: the longest common prefix with `??` substituted for
/// positions that disagree, subject to `threshold`.
pub fn find_ep_only_signature(paths: &[String], opts: &AuthoringOptions) -> Result<String> {
    let mut data: Vec<Vec<u8>> = Vec::new();
    let mut max_length = opts.max_length;

    for path in paths {
        match read_entry_point_window(path, max_length) {
            Ok(window) => {
                max_length = window.len().min(max_length).max(opts.min_length);
                data.push(window);
            }
            Err(e) => warn!("{path}: {e}"),
        }
    }
    if data.is_empty() {
        return Err(Error::NoSignatureFound { count: 0 });
    }

    match derive_consensus(&data, max_length, opts.min_length, opts.threshold) {
        Some(sig) => Ok(sig.iter().map(Token::to_string).collect::<Vec<_>>().join(" ")),
        None => Err(Error::NoSignatureFound { count: data.len() }),
    }
}

/// Column-wise consensus over `data`, descending `length` from `max_length`
/// down to `min_length` until the wildcard ratio clears `threshold`.
///
/// A column that disagrees is wildcarded together with the column right
/// after it: most disagreement among packer sample entry points comes from
/// a multi-byte little-endian immediate or relative offset operand, and
/// wildcarding only the first byte of such an operand leaves a second byte
/// that is frequently still a coincidental literal match, which would be
/// reported as part of the signature despite not being load-bearing.
fn derive_consensus(data: &[Vec<u8>], max_length: usize, min_length: usize, threshold: f64) -> Option<Vec<Token>> {
    let mut length = max_length;
    while length >= min_length {
        let mut sig: Vec<Token> = Vec::with_capacity(length);
        for i in 0..length {
            for d in data {
                if i >= d.len() {
                    continue;
                }
                if sig.len() <= i {
                    sig.push(Token::Byte(d[i]));
                } else if Token::Byte(d[i]) != sig[i] {
                    sig[i] = Token::Wildcard;
                    break;
                }
            }
        }
        pair_wildcards(&mut sig);
        right_trim_wildcards(&mut sig, min_length);

        if sig.is_empty() {
            length -= 1;
            continue;
        }
        let wildcards = sig.iter().filter(|t| **t == Token::Wildcard).count();
        if (wildcards as f64) / (sig.len() as f64) <= 1.0 - threshold {
            right_trim_wildcards(&mut sig, min_length);
            return Some(sig);
        }
        length -= 1;
    }
    None
}

/// Extends each wildcard one column to the right, folding a lone trailing
/// byte of a disagreeing multi-byte operand into the same wildcard run.
fn pair_wildcards(sig: &mut [Token]) {
    let originally_wildcard: Vec<bool> = sig.iter().map(|t| *t == Token::Wildcard).collect();
    for i in 0..sig.len().saturating_sub(1) {
        if originally_wildcard[i] {
            sig[i + 1] = Token::Wildcard;
        }
    }
}

fn right_trim_wildcards(sig: &mut Vec<Token>, min_length: usize) {
    while sig.len() > min_length && sig.last() == Some(&Token::Wildcard) {
        sig.pop();
    }
}

fn read_entry_point_window(path: &str, max_length: usize) -> Result<Vec<u8>> {
    let mut exe = open_exe(path)?;
    let ep = exe.entrypoint_offset()?;
    let mut window = Vec::new();
    exe.for_each_window(max_length, &[ep], |_, bytes| {
        window = bytes.to_vec();
        Ok(false)
    })?;
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus(data: Vec<Vec<u8>>, min_length: usize, threshold: f64) -> Option<String> {
        let max_length = data.iter().map(Vec::len).min().unwrap_or(0).max(min_length);
        derive_consensus(&data, max_length, min_length, threshold)
            .map(|sig| sig.iter().map(Token::to_string).collect::<Vec<_>>().join(" "))
    }

    #[test]
    fn derives_common_prefix_with_wildcards() {
        // spec.md §8 scenario S4.
        let data = vec![
            vec![0x60, 0xBE, 0x10, 0x00, 0x40, 0x00],
            vec![0x60, 0xBE, 0x20, 0x00, 0x40, 0x00],
            vec![0x60, 0xBE, 0x30, 0x00, 0x40, 0x00],
        ];
        assert_eq!(consensus(data, 4, 0.5), Some("60 BE ?? ?? 40 00".to_string()));
    }

    #[test]
    fn single_sample_is_returned_verbatim() {
        let data = vec![vec![0x60, 0xBE, 0x10, 0x00]];
        assert_eq!(consensus(data, 4, 0.5), Some("60 BE 10 00".to_string()));
    }
}
