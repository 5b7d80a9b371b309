use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Width, in hex characters, of an address-sized placeholder.
pub const PLACEHOLDER_WIDTH: usize = 40;
/// Longest library name prefix kept in a placeholder symbol.
pub const MAX_LIBRARY_NAME: usize = 36;
const SYMBOL_PREFIX: &str = "__";
const SYMBOL_PAD: char = '_';

/// `evm.bytecode.linkReferences`: declaring file -> library name -> occurrences.
pub type LinkReferences = BTreeMap<String, BTreeMap<String, Vec<LinkOffset>>>;

/// Byte offsets of one unlinked library reference, as reported by solc.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOffset {
  pub start: usize,
  pub length: usize,
}

/// A placeholder span in hex-character units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkReference {
  pub library: String,
  pub start: usize,
  pub length: usize,
}

impl LinkReference {
  pub fn end(&self) -> usize {
    self.start + self.length
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("link reference for {library} at {start}..{end} lies outside bytecode of length {len}")]
pub struct LinkSpanError {
  pub library: String,
  pub start: usize,
  pub end: usize,
  pub len: usize,
}

/// Flatten `references` into hex spans, in declaring-file then library order.
pub fn collect_link_references(references: &LinkReferences) -> Vec<LinkReference> {
  references
    .values()
    .flat_map(|libraries| libraries.iter())
    .flat_map(|(library, offsets)| {
      offsets.iter().map(move |offset| LinkReference {
        library: library.clone(),
        start: offset.start * 2,
        length: offset.length * 2,
      })
    })
    .collect()
}

/// `__` + up to 36 characters of `library`, right padded with `_` to 40 characters.
pub fn placeholder_symbol(library: &str) -> String {
  fitted_symbol(library, PLACEHOLDER_WIDTH)
}

fn fitted_symbol(library: &str, width: usize) -> String {
  let mut symbol = String::with_capacity(width);
  symbol.push_str(SYMBOL_PREFIX);
  symbol.extend(library.chars().take(MAX_LIBRARY_NAME));
  let mut symbol: String = symbol.chars().take(width).collect();
  let padding = width.saturating_sub(symbol.chars().count());
  symbol.extend(std::iter::repeat(SYMBOL_PAD).take(padding));
  symbol
}

/// Replace every link reference span in `bytecode` with its library symbol.
///
/// Spans are rewritten in place by slicing, so the output always has the input's length: a
/// regular 20 byte reference receives the full 40 character symbol, and an unusually sized span
/// receives the symbol cut or padded to its width. Overlapping spans are not expected from solc
/// and produce unspecified (but in-bounds) content.
pub fn resolve_link_references(
  bytecode: &str,
  references: Option<&LinkReferences>,
) -> Result<String, LinkSpanError> {
  let Some(references) = references else {
    return Ok(bytecode.to_owned());
  };

  let mut resolved = bytecode.to_owned();
  for reference in collect_link_references(references) {
    let end = reference.end();
    let in_bounds = end <= resolved.len()
      && resolved.is_char_boundary(reference.start)
      && resolved.is_char_boundary(end);
    if !in_bounds {
      return Err(LinkSpanError {
        library: reference.library,
        start: reference.start,
        end,
        len: resolved.len(),
      });
    }
    let symbol = fitted_symbol(&reference.library, reference.length);
    resolved.replace_range(reference.start..end, &symbol);
  }
  Ok(resolved)
}

/// Library names of placeholder symbols left in `bytecode`, in order of first appearance.
/// Hex digits never contain `_`, so any `__` run marks a placeholder.
pub fn unlinked_libraries(bytecode: &str) -> Vec<String> {
  let mut names: Vec<String> = Vec::new();
  let mut cursor = 0;
  while let Some(found) = bytecode[cursor..].find(SYMBOL_PREFIX) {
    let start = cursor + found;
    let end = (start + PLACEHOLDER_WIDTH).min(bytecode.len());
    let symbol = bytecode.get(start..end).unwrap_or(&bytecode[start..]);
    let name = symbol
      .trim_start_matches(SYMBOL_PAD)
      .trim_end_matches(SYMBOL_PAD)
      .to_owned();
    if !name.is_empty() && !names.contains(&name) {
      names.push(name);
    }
    cursor = start + symbol.len().max(SYMBOL_PREFIX.len());
  }
  names
}
