//! Compiled contract artifacts in the Hardhat layout.
//!
//! ```text
//! artifacts/
//!   build-info/<id>.json               solc input and version
//!   contracts/Foo.sol/Foo.json         abi + bytecode
//!   contracts/Foo.sol/Foo.dbg.json     pointer to the build-info file
//! ```

use std::path::{Path, PathBuf};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::ArtifactError;

/// Locates and loads artifacts below a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    abi: JsonAbi,
    bytecode: String,
    deployed_bytecode: String,
    #[serde(default)]
    link_references: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: String,
}

/// Compiler input and version used to produce an artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_version: String,
    pub solc_long_version: String,
    /// Standard JSON input, submitted as-is for verification.
    pub input: serde_json::Value,
}

/// A compiled contract ready for deployment.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    pub path: PathBuf,
    bytecode: Bytes,
    deployed_bytecode: Bytes,
}

/// Maximum runtime code size (EIP-170).
pub const MAX_DEPLOYED_SIZE: usize = 24_576;
/// Maximum initcode size (EIP-3860).
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_DEPLOYED_SIZE;

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load a contract by name (`NftMarketPlace`) or fully qualified name
    /// (`contracts/NftMarketPlace.sol:NftMarketPlace`).
    pub fn load(&self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        let path = self.find(name)?;
        let raw: HardhatArtifact = read_json(&path)?;

        if !raw.link_references.is_empty() {
            return Err(ArtifactError::UnlinkedLibraries {
                contract: raw.contract_name,
            });
        }

        let bytecode = decode_bytecode(&raw.contract_name, &raw.bytecode)?;
        if bytecode.is_empty() {
            return Err(ArtifactError::InvalidBytecode {
                contract: raw.contract_name,
                reason: "empty bytecode (abstract contract or interface?)".to_string(),
            });
        }
        let deployed_bytecode = decode_bytecode(&raw.contract_name, &raw.deployed_bytecode)?;

        tracing::debug!(
            contract = %raw.contract_name,
            path = %path.display(),
            bytecode_len = bytecode.len(),
            "Loaded artifact"
        );

        Ok(ContractArtifact {
            name: raw.contract_name,
            source_name: raw.source_name,
            abi: raw.abi,
            path,
            bytecode,
            deployed_bytecode,
        })
    }

    /// Build info of a loaded artifact, found through its `.dbg.json` file.
    pub fn build_info(&self, artifact: &ContractArtifact) -> Result<BuildInfo, ArtifactError> {
        let dbg_path = artifact.path.with_extension("dbg.json");
        let dbg: DebugFile = read_json(&dbg_path)?;

        let base = dbg_path.parent().unwrap_or(Path::new("."));
        read_json(&base.join(dbg.build_info))
    }

    /// Ensure `artifact` was compiled with the project's solc version.
    pub fn check_compiler(
        &self,
        artifact: &ContractArtifact,
        expected: &str,
    ) -> Result<BuildInfo, ArtifactError> {
        let info = self.build_info(artifact)?;
        if info.solc_version != expected {
            return Err(ArtifactError::CompilerMismatch {
                contract: artifact.name.clone(),
                expected: expected.to_string(),
                found: info.solc_version,
            });
        }
        Ok(info)
    }

    fn find(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        if let Some((source, contract)) = name.rsplit_once(':') {
            let path = self.root.join(source).join(format!("{contract}.json"));
            return if path.is_file() {
                Ok(path)
            } else {
                Err(ArtifactError::NotFound(name.to_string()))
            };
        }

        let pattern = format!(
            "{}/**/{}.json",
            glob::Pattern::escape(&self.root.to_string_lossy()),
            glob::Pattern::escape(name)
        );

        let mut candidates: Vec<PathBuf> = glob::glob(&pattern)?
            .filter_map(Result::ok)
            .filter(|p| !p.components().any(|c| c.as_os_str() == "build-info"))
            .collect();

        match candidates.len() {
            0 => Err(ArtifactError::NotFound(name.to_string())),
            1 => Ok(candidates.remove(0)),
            _ => Err(ArtifactError::Ambiguous {
                name: name.to_string(),
                candidates,
            }),
        }
    }
}

impl ContractArtifact {
    /// `sourceName:contractName`, the form explorers expect.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.name)
    }

    pub fn deployed_size(&self) -> usize {
        self.deployed_bytecode.len()
    }

    pub fn initcode_size(&self) -> usize {
        self.bytecode.len()
    }

    /// ABI-encode constructor arguments given as strings.
    ///
    /// Each string is coerced through the type of the matching constructor
    /// parameter (`"1000"` for `uint256`, `"0xabc..."` for `address`, ...).
    pub fn encode_constructor_args(&self, args: &[String]) -> Result<Bytes, ArtifactError> {
        let Some(constructor) = self.abi.constructor() else {
            if args.is_empty() {
                return Ok(Bytes::new());
            }
            return Err(ArtifactError::ConstructorArity {
                contract: self.name.clone(),
                expected: 0,
                got: args.len(),
            });
        };

        if constructor.inputs.len() != args.len() {
            return Err(ArtifactError::ConstructorArity {
                contract: self.name.clone(),
                expected: constructor.inputs.len(),
                got: args.len(),
            });
        }

        let arg_error = |param: String, reason: String| ArtifactError::ConstructorArg {
            contract: self.name.clone(),
            param,
            reason,
        };

        let mut values = Vec::<DynSolValue>::with_capacity(args.len());
        for (arg, param) in args.iter().zip(constructor.inputs.iter()) {
            let ty = param
                .resolve()
                .map_err(|e| arg_error(param.to_string(), e.to_string()))?;
            let value = ty
                .coerce_str(arg)
                .map_err(|e| arg_error(param.to_string(), e.to_string()))?;
            values.push(value);
        }

        constructor
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| arg_error("constructor".to_string(), e.to_string()))
    }

    /// Creation bytecode followed by the encoded constructor arguments.
    pub fn creation_code(&self, args: &[String]) -> Result<Bytes, ArtifactError> {
        let encoded = self.encode_constructor_args(args)?;
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encoded);
        Ok(code.into())
    }
}

fn decode_bytecode(contract: &str, hex_code: &str) -> Result<Bytes, ArtifactError> {
    let trimmed = hex_code.trim().trim_start_matches("0x");
    if trimmed.contains("__") {
        return Err(ArtifactError::UnlinkedLibraries {
            contract: contract.to_string(),
        });
    }

    hex::decode(trimmed)
        .map(Bytes::from)
        .map_err(|e| ArtifactError::InvalidBytecode {
            contract: contract.to_string(),
            reason: e.to_string(),
        })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
