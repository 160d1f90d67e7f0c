//! Shader bytecode loading.
//!
//! Shaders are consumed as precompiled SPIR-V blobs read from disk at
//! startup. A missing or malformed file is a fatal bring-up error.

use crate::error::{GpuError, Result};
use ash::vk;
use std::path::Path;

/// SPIR-V magic number (little-endian first word).
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Convert a raw byte blob to SPIR-V words, validating alignment and magic.
pub fn bytes_to_spirv(path: &Path, bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(GpuError::InvalidSpirv {
            path: path.to_owned(),
            reason: format!("length {} is not a positive multiple of 4", bytes.len()),
        });
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        return Err(GpuError::InvalidSpirv {
            path: path.to_owned(),
            reason: format!("bad magic number {:#010x}", words[0]),
        });
    }

    Ok(words)
}

/// Read a SPIR-V file fully into memory.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let bytes = std::fs::read(path).map_err(|_| GpuError::ShaderNotFound(path.to_owned()))?;
    bytes_to_spirv(path, &bytes)
}

/// Create a shader module from SPIR-V words.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    let module = unsafe { device.create_shader_module(&create_info, None)? };
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spirv_blob(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quartz-shader-{}-{name}", std::process::id()))
    }

    #[test]
    fn valid_blob_round_trips() {
        let words = [SPIRV_MAGIC, 0x0001_0000, 42, 0, 7];
        let recovered = bytes_to_spirv(Path::new("vert.spv"), &spirv_blob(&words)).unwrap();
        assert_eq!(recovered, words);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let mut bytes = spirv_blob(&[SPIRV_MAGIC, 1]);
        bytes.pop();
        assert!(matches!(
            bytes_to_spirv(Path::new("vert.spv"), &bytes),
            Err(GpuError::InvalidSpirv { .. })
        ));
    }

    #[test]
    fn empty_blob_is_rejected() {
        assert!(bytes_to_spirv(Path::new("vert.spv"), &[]).is_err());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = spirv_blob(&[0xdead_beef, 1, 2]);
        assert!(matches!(
            bytes_to_spirv(Path::new("frag.spv"), &bytes),
            Err(GpuError::InvalidSpirv { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_shader_not_found() {
        let path = temp_path("does-not-exist.spv");
        assert!(matches!(
            load_spirv(&path),
            Err(GpuError::ShaderNotFound(p)) if p == path
        ));
    }

    #[test]
    fn file_load_round_trips() {
        let path = temp_path("ok.spv");
        let words = [SPIRV_MAGIC, 0x0001_0300, 9, 8, 7, 6];
        std::fs::write(&path, spirv_blob(&words)).unwrap();
        let recovered = load_spirv(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(recovered, words);
    }
}
