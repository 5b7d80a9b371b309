use std::collections::HashSet;

use super::output::{Diagnostic, DiagnosticSource, RawDiagnostic};

impl Diagnostic {
  /// Reduce a raw solc error entry to `{message, severity, source}`. The formatted message is
  /// preferred; `source` is only set when the location names a file, and `offset` only when it
  /// carries a start position.
  pub fn from_raw(raw: RawDiagnostic) -> Self {
    let RawDiagnostic {
      message,
      formatted_message,
      severity,
      source_location,
    } = raw;
    let source = source_location.and_then(|location| {
      location.file.map(|file| DiagnosticSource {
        file,
        offset: location.start,
      })
    });
    Diagnostic {
      message: formatted_message.or(message).unwrap_or_default(),
      severity,
      source,
    }
  }

  /// Stable content hash over the normalised record. Every field is length-prefixed and optional
  /// fields carry a presence tag, so distinct records never share an encoding.
  pub fn content_hash(&self) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    update_str(&mut hasher, &self.message);
    update_str(&mut hasher, self.severity.as_str());
    match &self.source {
      Some(source) => {
        hasher.update(&[1]);
        update_str(&mut hasher, &source.file);
        match source.offset {
          Some(offset) => {
            hasher.update(&[1]);
            hasher.update(&offset.to_le_bytes());
          }
          None => {
            hasher.update(&[0]);
          }
        }
      }
      None => {
        hasher.update(&[0]);
      }
    }
    hasher.finalize()
  }
}

fn update_str(hasher: &mut blake3::Hasher, value: &str) {
  hasher.update(&(value.len() as u64).to_le_bytes());
  hasher.update(value.as_bytes());
}

/// Ordered, content-deduplicated diagnostics of one `compile` call.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticSet {
  seen: HashSet<blake3::Hash>,
  entries: Vec<Diagnostic>,
}

impl DiagnosticSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append `diagnostic` unless an identical one was already recorded. Returns whether it was
  /// kept.
  pub fn insert(&mut self, diagnostic: Diagnostic) -> bool {
    if !self.seen.insert(diagnostic.content_hash()) {
      tracing::trace!(message = %diagnostic.message, "suppressing duplicate diagnostic");
      return false;
    }
    self.entries.push(diagnostic);
    true
  }

  pub fn extend_raw(&mut self, raw: impl IntoIterator<Item = RawDiagnostic>) {
    for entry in raw {
      self.insert(Diagnostic::from_raw(entry));
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn as_slice(&self) -> &[Diagnostic] {
    &self.entries
  }

  pub fn into_vec(self) -> Vec<Diagnostic> {
    self.entries
  }
}
