//! Host-visible vertex buffer.
//!
//! Created once at startup, uploaded once, never updated. The buffer lives
//! in host-visible, host-coherent memory so the upload is a plain write
//! through the mapped pointer with no explicit flush.

use crate::error::Result;
use ash::vk;
use quartz_gpu::{GpuAllocator, GpuBuffer};

/// GPU vertex buffer plus its host-side staging copy.
pub struct VertexBuffer {
    buffer: GpuBuffer,
    staging: Vec<u8>,
}

impl VertexBuffer {
    /// Create a buffer sized to `data` and keep a staging copy of it.
    pub fn new(allocator: &mut GpuAllocator, data: &[u8]) -> Result<Self> {
        let buffer = allocator.create_buffer(
            data.len() as u64,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            gpu_allocator::MemoryLocation::CpuToGpu,
            "vertex buffer",
        )?;

        Ok(Self {
            buffer,
            staging: data.to_vec(),
        })
    }

    /// Number of bytes in the staged payload.
    pub fn len(&self) -> usize {
        self.staging.len()
    }

    /// True when there is no staged payload.
    pub fn is_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// The staged bytes as uploaded to the GPU.
    pub fn staged_bytes(&self) -> &[u8] {
        &self.staging
    }

    /// Synchronously copy the staged bytes into the mapped GPU memory.
    pub fn upload(&self) -> Result<()> {
        self.buffer.write_bytes(&self.staging)?;
        Ok(())
    }

    /// Bind the buffer to binding 0 at offset 0.
    ///
    /// # Safety
    /// The device and command buffer must be valid and the buffer must not
    /// have been freed.
    pub unsafe fn bind(&self, device: &ash::Device, cmd: vk::CommandBuffer) {
        let buffers = [self.buffer.buffer];
        let offsets = [0_u64];
        unsafe { device.cmd_bind_vertex_buffers(cmd, 0, &buffers, &offsets) };
    }

    /// Free the GPU resources: memory first, then the buffer handle.
    /// Safe to call more than once; freeing an already-freed buffer is a
    /// no-op.
    pub fn destroy(&mut self, allocator: &mut GpuAllocator) -> Result<()> {
        allocator.free_buffer(&mut self.buffer)?;
        Ok(())
    }

    /// True once the GPU resources have been released.
    pub fn is_freed(&self) -> bool {
        self.buffer.is_freed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freed_buffer(staging: Vec<u8>) -> VertexBuffer {
        VertexBuffer {
            buffer: GpuBuffer {
                buffer: vk::Buffer::null(),
                allocation: None,
                size: staging.len() as u64,
            },
            staging,
        }
    }

    #[test]
    fn staging_copy_preserves_payload() {
        let payload: Vec<u8> = (0..72).collect();
        let vb = freed_buffer(payload.clone());
        assert_eq!(vb.staged_bytes(), payload.as_slice());
        assert_eq!(vb.len(), 72);
        assert!(!vb.is_empty());
    }

    #[test]
    fn freed_buffer_rejects_upload_but_reports_freed() {
        let vb = freed_buffer(vec![1, 2, 3, 4]);
        assert!(vb.is_freed());
        // No mapped memory once freed; the upload must fail rather than
        // write through a dangling pointer.
        assert!(vb.upload().is_err());
    }
}
