//! Frame renderer.
//!
//! Owns every swapchain-sized resource and drives the acquire, record,
//! submit, present loop. Rendering is single-buffered: after each present
//! the presentation queue is drained, so one semaphore pair and one
//! command buffer per swapchain image are enough.

use crate::error::Result;
use crate::pipeline::{create_framebuffers, create_render_pass, TrianglePipeline};
use crate::vertex::TRIANGLE;
use crate::vertex_buffer::VertexBuffer;
use ash::vk;
use quartz_gpu::command::{
    begin_command_buffer, end_command_buffer, submit_command_buffers, CommandPool,
};
use quartz_gpu::shader::load_spirv;
use quartz_gpu::{FrameSync, GpuContext, GpuError, QueueRole, Swapchain};
use std::path::Path;
use tracing::info;

const CLEAR_COLOR: [f32; 4] = [0.02, 0.02, 0.03, 1.0];

/// Renderer for the triangle scene.
pub struct Renderer {
    swapchain: Swapchain,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    pipeline: TrianglePipeline,
    command_pool: CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    vertex_buffer: VertexBuffer,
    sync: FrameSync,
    // Kept so swapchain recreation can relink the pipeline without
    // touching the filesystem again.
    vertex_spirv: Vec<u32>,
    fragment_spirv: Vec<u32>,
    // False between the destroy and rebuild phases of `recreate`. A failed
    // rebuild leaves it false so `destroy` does not touch handles that are
    // already gone.
    sized_resources_alive: bool,
}

impl Renderer {
    /// Create the renderer and every resource it owns.
    ///
    /// `shader_dir` must contain `triangle.vert.spv` and
    /// `triangle.frag.spv`.
    pub fn new(
        gpu: &GpuContext,
        window_width: u32,
        window_height: u32,
        shader_dir: &Path,
    ) -> Result<Self> {
        let vertex_spirv = load_spirv(&shader_dir.join("triangle.vert.spv"))?;
        let fragment_spirv = load_spirv(&shader_dir.join("triangle.frag.spv"))?;

        let swapchain = unsafe { gpu.create_swapchain(window_width, window_height)? };
        info!(
            width = swapchain.extent.width,
            height = swapchain.extent.height,
            images = swapchain.images.len(),
            "Swapchain created"
        );

        let device = gpu.device();
        let render_pass = unsafe { create_render_pass(device, swapchain.format)? };
        let framebuffers = unsafe {
            create_framebuffers(device, render_pass, &swapchain.image_views, swapchain.extent)?
        };
        let pipeline = unsafe {
            TrianglePipeline::new(
                device,
                render_pass,
                swapchain.extent,
                &vertex_spirv,
                &fragment_spirv,
            )?
        };

        let command_pool = unsafe {
            CommandPool::new(
                device,
                gpu.queue_family(QueueRole::Graphics).family,
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )?
        };
        let command_buffers = unsafe {
            command_pool.allocate_command_buffers(device, swapchain.images.len() as u32)?
        };

        let vertex_buffer = {
            let mut allocator = gpu.allocator().lock();
            let buffer = VertexBuffer::new(&mut allocator, bytemuck::cast_slice(&TRIANGLE))?;
            buffer.upload()?;
            buffer
        };

        let sync = unsafe { FrameSync::new(device)? };

        Ok(Self {
            swapchain,
            render_pass,
            framebuffers,
            pipeline,
            command_pool,
            command_buffers,
            vertex_buffer,
            sync,
            vertex_spirv,
            fragment_spirv,
            sized_resources_alive: true,
        })
    }

    /// Current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    /// Render one frame.
    ///
    /// Returns an error for which
    /// [`is_swapchain_out_of_date`](crate::error::RenderError::is_swapchain_out_of_date)
    /// holds when the surface changed under the swapchain; the caller then
    /// calls [`recreate`](Self::recreate) and tries again next frame.
    pub fn draw_frame(&mut self, gpu: &GpuContext) -> Result<()> {
        if !self.sized_resources_alive {
            return Err(
                GpuError::InvalidState("Swapchain resources are gone".to_string()).into(),
            );
        }

        let device = gpu.device();
        let loader = gpu.swapchain_loader();

        let image_index = unsafe {
            self.swapchain
                .acquire_next_image(loader, self.sync.image_available, u64::MAX)?
        };

        let cmd = self.command_buffers[image_index as usize];
        unsafe {
            self.record_commands(device, cmd, image_index)?;

            submit_command_buffers(
                device,
                gpu.graphics_queue(),
                &[cmd],
                &[self.sync.image_available],
                &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
                &[self.sync.render_finished],
                vk::Fence::null(),
            )?;

            self.swapchain.present(
                loader,
                gpu.presentation_queue(),
                image_index,
                &[self.sync.render_finished],
            )?;
        }

        // One frame in flight: drain presentation before reusing the
        // command buffer and semaphores.
        gpu.wait_presentation_idle()?;

        Ok(())
    }

    unsafe fn record_commands(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        image_index: u32,
    ) -> Result<()> {
        unsafe {
            begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            }];
            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.framebuffers[image_index as usize])
                .render_area(
                    vk::Rect2D::default()
                        .offset(vk::Offset2D::default())
                        .extent(self.swapchain.extent),
                )
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);
            device.cmd_bind_pipeline(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.pipeline,
            );
            self.vertex_buffer.bind(device, cmd);
            device.cmd_draw(cmd, TRIANGLE.len() as u32, 1, 0, 0);
            device.cmd_end_render_pass(cmd);

            end_command_buffer(device, cmd)?;
        }
        Ok(())
    }

    /// Tear down and rebuild everything sized to the swapchain.
    ///
    /// The pipeline bakes its viewport at the swapchain extent, so it is
    /// rebuilt along with the framebuffers and command buffers.
    pub fn recreate(&mut self, gpu: &GpuContext, window_width: u32, window_height: u32) -> Result<()> {
        gpu.wait_idle()?;

        let device = gpu.device();
        unsafe {
            self.command_pool
                .free_command_buffers(device, &self.command_buffers);
            self.pipeline.destroy(device);
            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            device.destroy_render_pass(self.render_pass, None);
            self.swapchain.destroy(device, gpu.swapchain_loader());
        }
        self.sized_resources_alive = false;

        self.swapchain = unsafe { gpu.create_swapchain(window_width, window_height)? };
        self.render_pass = unsafe { create_render_pass(device, self.swapchain.format)? };
        self.framebuffers = unsafe {
            create_framebuffers(
                device,
                self.render_pass,
                &self.swapchain.image_views,
                self.swapchain.extent,
            )?
        };
        self.pipeline = unsafe {
            TrianglePipeline::new(
                device,
                self.render_pass,
                self.swapchain.extent,
                &self.vertex_spirv,
                &self.fragment_spirv,
            )?
        };
        self.command_buffers = unsafe {
            self.command_pool
                .allocate_command_buffers(device, self.swapchain.images.len() as u32)?
        };
        self.sized_resources_alive = true;

        info!(
            width = self.swapchain.extent.width,
            height = self.swapchain.extent.height,
            "Swapchain recreated"
        );
        Ok(())
    }

    /// Destroy all renderer resources in reverse creation order.
    ///
    /// Must be called before the [`GpuContext`] is dropped.
    pub fn destroy(&mut self, gpu: &GpuContext) -> Result<()> {
        gpu.wait_idle()?;

        let device = gpu.device();
        unsafe {
            self.sync.destroy(device);
            self.command_pool.destroy(device);
        }

        {
            let mut allocator = gpu.allocator().lock();
            self.vertex_buffer.destroy(&mut allocator)?;
        }

        if self.sized_resources_alive {
            unsafe {
                self.pipeline.destroy(device);
                for &framebuffer in &self.framebuffers {
                    device.destroy_framebuffer(framebuffer, None);
                }
                // Views go before the render pass, the swapchain handle last
                self.swapchain.destroy_views(device);
                device.destroy_render_pass(self.render_pass, None);
                gpu.swapchain_loader()
                    .destroy_swapchain(self.swapchain.swapchain, None);
            }
            self.sized_resources_alive = false;
        }

        Ok(())
    }
}
