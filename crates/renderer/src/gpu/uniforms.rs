use anyhow::{anyhow, Context, Result};
use wgpu::util::DeviceExt;

/// Uniform buffer for one program's parameter block.
///
/// Writes go straight through the queue. Reads copy the requested range
/// into a mappable staging buffer so callers observe what the GPU holds.
pub(crate) struct UniformBlock {
    pub buffer: wgpu::Buffer,
    size: u64,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, size: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fractal params"),
            size,
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Self { buffer, size }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn write(&self, queue: &wgpu::Queue, offset: u64, bytes: &[u8]) {
        queue.write_buffer(&self.buffer, offset, bytes);
    }

    pub fn read(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>> {
        let aligned_len = len.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fractal params readback"),
            size: aligned_len,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("uniform readback encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, offset, &staging, 0, aligned_len);
        queue.submit(std::iter::once(encoder.finish()));

        let mut bytes = map_read(device, &staging)?;
        bytes.truncate(len as usize);
        Ok(bytes)
    }
}

/// Read-only storage buffer holding the packed colour table.
///
/// Smaller tables are written in place; the entry count at the front tells
/// the shader where the live entries end.
pub(crate) struct PaletteBuffer {
    pub buffer: wgpu::Buffer,
}

impl PaletteBuffer {
    pub fn new(device: &wgpu::Device, bytes: &[u8]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fractal palette"),
            contents: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        Self { buffer }
    }

    pub fn fits(&self, len: usize) -> bool {
        len as u64 <= self.buffer.size()
    }

    pub fn write(&self, queue: &wgpu::Queue, bytes: &[u8]) {
        queue.write_buffer(&self.buffer, 0, bytes);
    }
}

/// Maps a `MAP_READ` buffer, blocks until the GPU is idle and copies it out.
pub(crate) fn map_read(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
    let slice = buffer.slice(..);
    let (tx, rx) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| anyhow!("failed to wait for GPU readback: {err}"))?;
    rx.recv()
        .context("readback callback dropped")?
        .map_err(|err| anyhow!("failed to map readback buffer: {err}"))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}
