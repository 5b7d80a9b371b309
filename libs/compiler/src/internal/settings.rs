use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output facets requested for every file/contract pair unless the configuration overrides them.
pub const DEFAULT_OUTPUT_SELECTION: [&str; 4] = [
  "metadata",
  "evm.bytecode",
  "evm.bytecode.sourceMap",
  "legacyAST",
];

/// Wildcard used by solc's output selection for "every file" and "every contract".
pub(crate) const SELECT_ALL: &str = "*";

/// `outputSelection` as sent to solc: file -> contract -> facets.
pub type OutputSelection = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Language tag of the input document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLanguage {
  #[default]
  Solidity,
  Yul,
}

/// Settings block of the standard-JSON input document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSettings {
  pub optimizer: OptimizerSettings,
  pub evm_version: EvmVersion,
  pub metadata: SettingsMetadata,
  pub output_selection: OutputSelection,
}

impl InputSettings {
  pub fn new(
    optimizer: OptimizerSettings,
    evm_version: EvmVersion,
    use_literal_content: bool,
    facets: &[String],
  ) -> Self {
    Self {
      optimizer,
      evm_version,
      metadata: SettingsMetadata {
        use_literal_content,
      },
      output_selection: select_for_all(facets),
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerSettings {
  pub enabled: bool,
  pub runs: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsMetadata {
  pub use_literal_content: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvmVersion {
  Homestead,
  TangerineWhistle,
  SpuriousDragon,
  #[default]
  Byzantium,
  Constantinople,
  Petersburg,
  Istanbul,
  Berlin,
  London,
  Paris,
  Shanghai,
  Cancun,
  Prague,
}

impl EvmVersion {
  pub fn as_str(&self) -> &'static str {
    match self {
      EvmVersion::Homestead => "homestead",
      EvmVersion::TangerineWhistle => "tangerineWhistle",
      EvmVersion::SpuriousDragon => "spuriousDragon",
      EvmVersion::Byzantium => "byzantium",
      EvmVersion::Constantinople => "constantinople",
      EvmVersion::Petersburg => "petersburg",
      EvmVersion::Istanbul => "istanbul",
      EvmVersion::Berlin => "berlin",
      EvmVersion::London => "london",
      EvmVersion::Paris => "paris",
      EvmVersion::Shanghai => "shanghai",
      EvmVersion::Cancun => "cancun",
      EvmVersion::Prague => "prague",
    }
  }
}

impl fmt::Display for EvmVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EvmVersion {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.to_ascii_lowercase().as_str() {
      "homestead" => Ok(EvmVersion::Homestead),
      "tangerinewhistle" => Ok(EvmVersion::TangerineWhistle),
      "spuriousdragon" => Ok(EvmVersion::SpuriousDragon),
      "byzantium" => Ok(EvmVersion::Byzantium),
      "constantinople" => Ok(EvmVersion::Constantinople),
      "petersburg" => Ok(EvmVersion::Petersburg),
      "istanbul" => Ok(EvmVersion::Istanbul),
      "berlin" => Ok(EvmVersion::Berlin),
      "london" => Ok(EvmVersion::London),
      "paris" => Ok(EvmVersion::Paris),
      "shanghai" => Ok(EvmVersion::Shanghai),
      "cancun" => Ok(EvmVersion::Cancun),
      "prague" => Ok(EvmVersion::Prague),
      other => Err(format!("Unsupported EVM version \"{other}\"")),
    }
  }
}

/// Request `facets` for every contract of every file. Blank entries are dropped and an
/// effectively empty list falls back to [`DEFAULT_OUTPUT_SELECTION`], since solc would otherwise
/// emit no bytecode at all.
pub fn select_for_all(facets: &[String]) -> OutputSelection {
  let mut requested: Vec<String> = facets
    .iter()
    .map(|facet| facet.trim())
    .filter(|facet| !facet.is_empty())
    .map(str::to_owned)
    .collect();
  if requested.is_empty() {
    requested = default_facets();
  }
  BTreeMap::from([(
    SELECT_ALL.to_string(),
    BTreeMap::from([(SELECT_ALL.to_string(), requested)]),
  )])
}

pub fn default_facets() -> Vec<String> {
  DEFAULT_OUTPUT_SELECTION
    .iter()
    .map(|facet| facet.to_string())
    .collect()
}
